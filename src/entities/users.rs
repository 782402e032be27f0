use crate::models::UserRole;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 玩家实体
/// - cash/debt/daily_borrowed: 两位小数, 任何已提交事务后都不为负
/// - stocks: 现货持仓数量
/// - is_employee: 是否参与线下小游戏 (红包参与名单来源)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: String,
    pub avatar: String,
    pub role: UserRole,
    pub cash: Decimal,
    pub stocks: i64,
    pub debt: Decimal,
    pub daily_borrowed: Decimal,
    pub first_sign_in: bool,
    pub is_employee: bool,
    pub avatar_update_count: i32,
    pub loan_shark_visit_count: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
