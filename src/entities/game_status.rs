use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const GAME_STATUS_ID: i32 = 1;

/// 全局游戏状态单行表 (id 恒为 1)
/// 不变量: paused_at 非空 ⇔ 未开始且 game_start_time 非空
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "game_status")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub is_started: bool,
    pub game_start_time: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    /// 一个游戏日等于多少真实秒
    pub time_ratio: i64,
    pub total_days: i32,
    pub initial_price: Decimal,
    pub initial_cash: Decimal,
    pub max_leverage: i32,
    pub daily_interest_rate: Decimal,
    pub max_loan_amount: Decimal,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
