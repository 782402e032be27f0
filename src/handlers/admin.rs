use crate::error::{AppError, AppResult};
use crate::handlers::auth::current_auth;
use crate::models::*;
use crate::services::{CatalogueService, GameService, ScriptService, UserService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

/// 管理接口统一的角色校验, 返回操作者 ID
fn require_admin(req: &HttpRequest) -> AppResult<i64> {
    let auth = current_auth(req).ok_or_else(|| AppError::Auth("Missing identity".to_string()))?;
    if auth.role != UserRole::Admin {
        return Err(AppError::Permission);
    }
    Ok(auth.user_id)
}

// ------------------------------
// 游戏生命周期
// ------------------------------

#[utoipa::path(
    post,
    path = "/api/admin/game/start",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "游戏已开始"),
        (status = 400, description = "前置条件不满足"),
        (status = 403, description = "需要管理员")
    )
)]
pub async fn game_start(service: web::Data<GameService>, req: HttpRequest) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.start().await {
        Ok(state) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": state }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/game/stop",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "游戏已暂停"),
        (status = 400, description = "前置条件不满足")
    )
)]
pub async fn game_stop(service: web::Data<GameService>, req: HttpRequest) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.stop().await {
        Ok(state) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": state }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/game/resume",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "游戏已继续"),
        (status = 400, description = "前置条件不满足")
    )
)]
pub async fn game_resume(
    service: web::Data<GameService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.resume().await {
        Ok(state) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": state }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/game/restart",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "已重开一局"),
        (status = 400, description = "前置条件不满足")
    )
)]
pub async fn game_restart(
    service: web::Data<GameService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.restart().await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "重开完成" }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/game/reset",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "出厂重置完成"),
        (status = 400, description = "前置条件不满足")
    )
)]
pub async fn game_reset(service: web::Data<GameService>, req: HttpRequest) -> Result<HttpResponse> {
    let admin_id = match require_admin(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.reset(admin_id).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "重置完成" }))),
        Err(e) => Ok(e.error_response()),
    }
}

// ------------------------------
// 参数
// ------------------------------

#[utoipa::path(
    get,
    path = "/api/admin/params",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "当前游戏参数", body = GameParamsResponse)
    )
)]
pub async fn get_params(service: web::Data<GameService>, req: HttpRequest) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.status().await {
        Ok(status) => Ok(HttpResponse::Ok().json(
            json!({ "success": true, "data": GameParamsResponse::from(&status) }),
        )),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/api/admin/params",
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = UpdateParamsRequest,
    responses(
        (status = 200, description = "参数已更新"),
        (status = 400, description = "参数校验失败")
    )
)]
pub async fn update_params(
    service: web::Data<GameService>,
    req: HttpRequest,
    body: web::Json<UpdateParamsRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.update_params(body.into_inner()).await {
        Ok(state) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": state }))),
        Err(e) => Ok(e.error_response()),
    }
}

// ------------------------------
// 用户管理
// ------------------------------

#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("page" = Option<u32>, Query, description = "页码 (默认1)"),
        ("page_size" = Option<u32>, Query, description = "每页数量 (默认20)")
    ),
    responses(
        (status = 200, description = "用户列表", body = PaginatedResponse<UserResponse>)
    )
)]
pub async fn list_users(
    service: web::Data<UserService>,
    req: HttpRequest,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.list_users(&query.into_inner()).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = AdminUpdateUserRequest,
    responses(
        (status = 200, description = "用户已更新", body = UserResponse),
        (status = 404, description = "用户不存在")
    )
)]
pub async fn update_user(
    service: web::Data<UserService>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<AdminUpdateUserRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service
        .admin_update_user(path.into_inner(), body.into_inner())
        .await
    {
        Ok(user) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": user }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "用户已删除"),
        (status = 404, description = "用户不存在")
    )
)]
pub async fn delete_user(
    service: web::Data<UserService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.delete_user(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "success": true }))),
        Err(e) => Ok(e.error_response()),
    }
}

// ------------------------------
// 剧本事件
// ------------------------------

#[utoipa::path(
    get,
    path = "/api/admin/events",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "事件列表"))
)]
pub async fn list_events(
    service: web::Data<CatalogueService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.list_events().await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/events",
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = EventRequest,
    responses((status = 201, description = "事件已创建"))
)]
pub async fn create_event(
    service: web::Data<CatalogueService>,
    req: HttpRequest,
    body: web::Json<EventRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.create_event(body.into_inner()).await {
        Ok(m) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": m }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/api/admin/events/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = EventRequest,
    responses((status = 200, description = "事件已更新"))
)]
pub async fn update_event(
    service: web::Data<CatalogueService>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<EventRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.update_event(path.into_inner(), body.into_inner()).await {
        Ok(m) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": m }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/api/admin/events/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "事件已删除"))
)]
pub async fn delete_event(
    service: web::Data<CatalogueService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.delete_event(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "success": true }))),
        Err(e) => Ok(e.error_response()),
    }
}

// ------------------------------
// 剧本生成 / 导入导出
// ------------------------------

#[utoipa::path(
    post,
    path = "/api/admin/script/generate",
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = GenerateParams,
    responses((status = 200, description = "剧本已生成"))
)]
pub async fn generate_script(
    game: web::Data<GameService>,
    script: web::Data<ScriptService>,
    req: HttpRequest,
    body: Option<web::Json<GenerateParams>>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    let params = body.map(|b| b.into_inner()).unwrap_or_default();
    let status = match game.status().await {
        Ok(s) => s,
        Err(e) => return Ok(e.error_response()),
    };
    match script
        .generate(
            &params,
            status.total_days,
            status.initial_price,
            status.time_ratio,
        )
        .await
    {
        Ok(count) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "generated_days": count }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/script/export",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "完整剧本", body = [ScriptDayRow]))
)]
pub async fn export_script(
    script: web::Data<ScriptService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match script.export().await {
        Ok(rows) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": rows }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/script/import",
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = Vec<ScriptDayRow>,
    responses((status = 200, description = "剧本已导入"))
)]
pub async fn import_script(
    script: web::Data<ScriptService>,
    req: HttpRequest,
    body: web::Json<Vec<ScriptDayRow>>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match script.import(body.into_inner()).await {
        Ok(count) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "imported_days": count }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

// ------------------------------
// 抢答题 / 少数派题 / 红包奖品
// ------------------------------

#[utoipa::path(
    get,
    path = "/api/admin/quiz-questions",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "抢答题列表"))
)]
pub async fn list_quiz_questions(
    service: web::Data<CatalogueService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.list_quiz_questions().await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/quiz-questions",
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = QuizQuestionRequest,
    responses((status = 201, description = "抢答题已创建"))
)]
pub async fn create_quiz_question(
    service: web::Data<CatalogueService>,
    req: HttpRequest,
    body: web::Json<QuizQuestionRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.create_quiz_question(body.into_inner()).await {
        Ok(m) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": m }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/api/admin/quiz-questions/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = QuizQuestionRequest,
    responses((status = 200, description = "抢答题已更新"))
)]
pub async fn update_quiz_question(
    service: web::Data<CatalogueService>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<QuizQuestionRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service
        .update_quiz_question(path.into_inner(), body.into_inner())
        .await
    {
        Ok(m) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": m }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/api/admin/quiz-questions/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "抢答题已删除"))
)]
pub async fn delete_quiz_question(
    service: web::Data<CatalogueService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.delete_quiz_question(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "success": true }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/minority-questions",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "少数派题列表"))
)]
pub async fn list_minority_questions(
    service: web::Data<CatalogueService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.list_minority_questions().await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/minority-questions",
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = MinorityQuestionRequest,
    responses((status = 201, description = "少数派题已创建"))
)]
pub async fn create_minority_question(
    service: web::Data<CatalogueService>,
    req: HttpRequest,
    body: web::Json<MinorityQuestionRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.create_minority_question(body.into_inner()).await {
        Ok(m) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": m }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/api/admin/minority-questions/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = MinorityQuestionRequest,
    responses((status = 200, description = "少数派题已更新"))
)]
pub async fn update_minority_question(
    service: web::Data<CatalogueService>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<MinorityQuestionRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service
        .update_minority_question(path.into_inner(), body.into_inner())
        .await
    {
        Ok(m) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": m }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/api/admin/minority-questions/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "少数派题已删除"))
)]
pub async fn delete_minority_question(
    service: web::Data<CatalogueService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.delete_minority_question(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "success": true }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/red-envelope-items",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "红包奖品列表"))
)]
pub async fn list_red_envelope_items(
    service: web::Data<CatalogueService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.list_red_envelope_items().await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/red-envelope-items",
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = RedEnvelopeItemRequest,
    responses((status = 201, description = "红包奖品已创建"))
)]
pub async fn create_red_envelope_item(
    service: web::Data<CatalogueService>,
    req: HttpRequest,
    body: web::Json<RedEnvelopeItemRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.create_red_envelope_item(body.into_inner()).await {
        Ok(m) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": m }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/api/admin/red-envelope-items/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = RedEnvelopeItemRequest,
    responses((status = 200, description = "红包奖品已更新"))
)]
pub async fn update_red_envelope_item(
    service: web::Data<CatalogueService>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<RedEnvelopeItemRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service
        .update_red_envelope_item(path.into_inner(), body.into_inner())
        .await
    {
        Ok(m) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": m }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/api/admin/red-envelope-items/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "红包奖品已删除"))
)]
pub async fn delete_red_envelope_item(
    service: web::Data<CatalogueService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.delete_red_envelope_item(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "success": true }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/game/start", web::post().to(game_start))
            .route("/game/stop", web::post().to(game_stop))
            .route("/game/resume", web::post().to(game_resume))
            .route("/game/restart", web::post().to(game_restart))
            .route("/game/reset", web::post().to(game_reset))
            .route("/params", web::get().to(get_params))
            .route("/params", web::put().to(update_params))
            .route("/users", web::get().to(list_users))
            .route("/users/{id}", web::put().to(update_user))
            .route("/users/{id}", web::delete().to(delete_user))
            .route("/events", web::get().to(list_events))
            .route("/events", web::post().to(create_event))
            .route("/events/{id}", web::put().to(update_event))
            .route("/events/{id}", web::delete().to(delete_event))
            .route("/script/generate", web::post().to(generate_script))
            .route("/script/export", web::get().to(export_script))
            .route("/script/import", web::post().to(import_script))
            .route("/quiz-questions", web::get().to(list_quiz_questions))
            .route("/quiz-questions", web::post().to(create_quiz_question))
            .route("/quiz-questions/{id}", web::put().to(update_quiz_question))
            .route("/quiz-questions/{id}", web::delete().to(delete_quiz_question))
            .route("/minority-questions", web::get().to(list_minority_questions))
            .route("/minority-questions", web::post().to(create_minority_question))
            .route(
                "/minority-questions/{id}",
                web::put().to(update_minority_question),
            )
            .route(
                "/minority-questions/{id}",
                web::delete().to(delete_minority_question),
            )
            .route("/red-envelope-items", web::get().to(list_red_envelope_items))
            .route("/red-envelope-items", web::post().to(create_red_envelope_item))
            .route(
                "/red-envelope-items/{id}",
                web::put().to(update_red_envelope_item),
            )
            .route(
                "/red-envelope-items/{id}",
                web::delete().to(delete_red_envelope_item),
            ),
    );
}
