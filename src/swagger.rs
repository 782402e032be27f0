use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::me,
        handlers::auth::update_avatar,
        handlers::auth::update_account,
        handlers::admin::game_start,
        handlers::admin::game_stop,
        handlers::admin::game_resume,
        handlers::admin::game_restart,
        handlers::admin::game_reset,
        handlers::admin::get_params,
        handlers::admin::update_params,
        handlers::admin::list_users,
        handlers::admin::update_user,
        handlers::admin::delete_user,
        handlers::admin::list_events,
        handlers::admin::create_event,
        handlers::admin::update_event,
        handlers::admin::delete_event,
        handlers::admin::generate_script,
        handlers::admin::export_script,
        handlers::admin::import_script,
        handlers::admin::list_quiz_questions,
        handlers::admin::create_quiz_question,
        handlers::admin::update_quiz_question,
        handlers::admin::delete_quiz_question,
        handlers::admin::list_minority_questions,
        handlers::admin::create_minority_question,
        handlers::admin::update_minority_question,
        handlers::admin::delete_minority_question,
        handlers::admin::list_red_envelope_items,
        handlers::admin::create_red_envelope_item,
        handlers::admin::update_red_envelope_item,
        handlers::admin::delete_red_envelope_item,
    ),
    components(
        schemas(
            ApiError,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            UserResponse,
            UserRole,
            UpdateAvatarRequest,
            UpdateAccountRequest,
            AdminUpdateUserRequest,
            GameStateResponse,
            GameParamsResponse,
            UpdateParamsRequest,
            EventRequest,
            Trend,
            GenerateParams,
            ScriptDayRow,
            QuizQuestionRequest,
            MinorityQuestionRequest,
            RedEnvelopeItemRequest,
            PrizeType,
            ContractType,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "健康检查"),
        (name = "auth", description = "注册登录与账号资料"),
        (name = "admin", description = "管理端: 生命周期/参数/目录维护")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    );
}
