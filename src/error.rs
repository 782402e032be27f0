use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Store(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Permission denied")]
    Permission,

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Game is not running")]
    GameNotRunning,

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Insufficient holdings")]
    InsufficientHoldings,

    #[error("Daily loan quota exceeded")]
    QuotaExceeded,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// 错误种类代码, HTTP 响应与 WS 错误消息共用同一套
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Store(_) => "STORE_ERROR",
            AppError::Validation(_) => "INVALID_INPUT",
            AppError::Auth(_) => "AUTH_ERROR",
            AppError::Permission => "PERMISSION_DENIED",
            AppError::Precondition(_) => "PRECONDITION_FAILED",
            AppError::Conflict(_) => "CONFLICT",
            AppError::GameNotRunning => "GAME_NOT_RUNNING",
            AppError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            AppError::InsufficientHoldings => "INSUFFICIENT_HOLDINGS",
            AppError::QuotaExceeded => "QUOTA_EXCEEDED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Jwt(_) => "AUTH_ERROR",
            AppError::Config(_) => "INTERNAL_ERROR",
            AppError::SerdeJson(_) => "INTERNAL_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;

        let message = self.to_string();
        let (status_code, error_code) = match self {
            AppError::Validation(msg) => {
                log::warn!("Validation error: {msg}");
                (StatusCode::BAD_REQUEST, self.kind())
            }
            AppError::Auth(msg) => {
                log::warn!("Authentication error: {msg}");
                (StatusCode::UNAUTHORIZED, self.kind())
            }
            AppError::Jwt(err) => {
                log::warn!("JWT error: {err}");
                (StatusCode::UNAUTHORIZED, self.kind())
            }
            AppError::Permission => {
                log::warn!("Permission denied");
                (StatusCode::FORBIDDEN, self.kind())
            }
            AppError::Precondition(msg) => {
                log::warn!("Precondition failed: {msg}");
                (StatusCode::BAD_REQUEST, self.kind())
            }
            AppError::Conflict(msg) => {
                log::warn!("Conflict: {msg}");
                (StatusCode::CONFLICT, self.kind())
            }
            AppError::GameNotRunning
            | AppError::InsufficientFunds
            | AppError::InsufficientHoldings
            | AppError::QuotaExceeded => (StatusCode::BAD_REQUEST, self.kind()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.kind()),
            AppError::Store(err) => {
                log::error!("Database error: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, self.kind())
            }
            _ => {
                log::error!("Internal error: {self}");
                (StatusCode::INTERNAL_SERVER_ERROR, self.kind())
            }
        };

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message
            }
        }))
    }
}
