use crate::models::Trend;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 剧本日: 某个游戏日的价格/走势/新闻
/// title 为空表示当日无新闻; publish_offset 为当日内第几秒发布
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "script_days")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub day: i32,
    pub price: Decimal,
    pub title: Option<String>,
    pub news: Option<String>,
    pub effective_trend: Trend,
    pub publish_offset: Option<i64>,
    pub is_broadcasted: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
