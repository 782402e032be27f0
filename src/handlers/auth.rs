use crate::error::AppError;
use crate::middlewares::AuthContext;
use crate::models::*;
use crate::services::AuthService;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

/// 从请求扩展中获取鉴权身份 (中间件注入)
pub fn current_auth(req: &HttpRequest) -> Option<AuthContext> {
    req.extensions().get::<AuthContext>().copied()
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "注册成功", body = AuthResponse),
        (status = 400, description = "参数校验失败"),
        (status = 403, description = "管理密钥不匹配"),
        (status = 409, description = "用户名已被占用")
    )
)]
pub async fn register(
    service: web::Data<AuthService>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    match service.register(body.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "登录成功", body = AuthResponse),
        (status = 401, description = "用户名或密码错误")
    )
)]
pub async fn login(
    service: web::Data<AuthService>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    match service.login(body.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "当前用户信息", body = UserResponse),
        (status = 401, description = "未授权")
    )
)]
pub async fn me(service: web::Data<AuthService>, req: HttpRequest) -> Result<HttpResponse> {
    let Some(auth) = current_auth(&req) else {
        return Ok(AppError::Auth("Missing identity".to_string()).error_response());
    };
    match service.me(auth.user_id).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    patch,
    path = "/api/auth/avatar",
    tag = "auth",
    security(("bearer_auth" = [])),
    request_body = UpdateAvatarRequest,
    responses(
        (status = 200, description = "头像已更新", body = UserResponse),
        (status = 401, description = "未授权")
    )
)]
pub async fn update_avatar(
    service: web::Data<AuthService>,
    req: HttpRequest,
    body: web::Json<UpdateAvatarRequest>,
) -> Result<HttpResponse> {
    let Some(auth) = current_auth(&req) else {
        return Ok(AppError::Auth("Missing identity".to_string()).error_response());
    };
    match service.update_avatar(auth.user_id, body.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    patch,
    path = "/api/auth/account",
    tag = "auth",
    security(("bearer_auth" = [])),
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "账号资料已更新", body = UserResponse),
        (status = 400, description = "参数校验失败"),
        (status = 401, description = "未授权")
    )
)]
pub async fn update_account(
    service: web::Data<AuthService>,
    req: HttpRequest,
    body: web::Json<UpdateAccountRequest>,
) -> Result<HttpResponse> {
    let Some(auth) = current_auth(&req) else {
        return Ok(AppError::Auth("Missing identity".to_string()).error_response());
    };
    match service.update_account(auth.user_id, body.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn auth_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/me", web::get().to(me))
            .route("/avatar", web::patch().to(update_avatar))
            .route("/account", web::patch().to(update_account)),
    );
}
