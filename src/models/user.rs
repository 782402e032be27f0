use crate::entities::user_entity;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::StringLen;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum UserRole {
    #[sea_orm(string_value = "USER")]
    #[serde(rename = "USER")]
    User,
    #[sea_orm(string_value = "ADMIN")]
    #[serde(rename = "ADMIN")]
    Admin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::User => write!(f, "USER"),
            UserRole::Admin => write!(f, "ADMIN"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "player01")]
    pub username: String,
    #[schema(example = "Password123")]
    pub password: String,
    #[schema(example = "张三")]
    pub display_name: Option<String>,
    /// 与 ADMIN_SECRET 一致时创建管理员账号
    pub admin_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub avatar: String,
    pub role: UserRole,
    pub cash: Decimal,
    pub stocks: i64,
    pub debt: Decimal,
    pub daily_borrowed: Decimal,
    pub is_employee: bool,
    pub avatar_update_count: i32,
    pub loan_shark_visit_count: i32,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<user_entity::Model> for UserResponse {
    fn from(m: user_entity::Model) -> Self {
        Self {
            id: m.id,
            username: m.username,
            display_name: m.display_name,
            avatar: m.avatar,
            role: m.role,
            cash: m.cash,
            stocks: m.stocks,
            debt: m.debt,
            daily_borrowed: m.daily_borrowed,
            is_employee: m.is_employee,
            avatar_update_count: m.avatar_update_count,
            loan_shark_visit_count: m.loan_shark_visit_count,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateAvatarRequest {
    pub avatar: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateAccountRequest {
    pub display_name: Option<String>,
    pub password: Option<String>,
}

/// 管理端用户编辑 (仅提供的字段会被更新)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminUpdateUserRequest {
    pub display_name: Option<String>,
    pub cash: Option<Decimal>,
    pub stocks: Option<i64>,
    pub debt: Option<Decimal>,
    pub is_employee: Option<bool>,
    pub role: Option<UserRole>,
}

/// WS: ASSETS_UPDATE
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetsPayload {
    pub cash: Decimal,
    pub stocks: i64,
    pub debt: Decimal,
    pub daily_borrowed: Decimal,
}

impl From<&user_entity::Model> for AssetsPayload {
    fn from(m: &user_entity::Model) -> Self {
        Self {
            cash: m.cash,
            stocks: m.stocks,
            debt: m.debt,
            daily_borrowed: m.daily_borrowed,
        }
    }
}
