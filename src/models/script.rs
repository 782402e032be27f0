use crate::entities::script_day_entity;
use rust_decimal::Decimal;
use sea_orm::sea_query::StringLen;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 走势标签, 作为当日目标涨跌幅的系数
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum Trend {
    #[sea_orm(string_value = "STRONG_UP")]
    #[serde(rename = "STRONG_UP")]
    StrongUp,
    #[sea_orm(string_value = "UP")]
    #[serde(rename = "UP")]
    Up,
    #[sea_orm(string_value = "FLAT")]
    #[serde(rename = "FLAT")]
    Flat,
    #[sea_orm(string_value = "DOWN")]
    #[serde(rename = "DOWN")]
    Down,
    #[sea_orm(string_value = "STRONG_DOWN")]
    #[serde(rename = "STRONG_DOWN")]
    StrongDown,
    #[sea_orm(string_value = "NO_EFFECT")]
    #[serde(rename = "NO_EFFECT")]
    NoEffect,
}

impl Trend {
    /// 事件落地当日的趋势强度系数
    pub fn strength(&self) -> f64 {
        match self {
            Trend::StrongUp => 1.0,
            Trend::Up => 0.5,
            Trend::Flat => 0.0,
            Trend::Down => -0.5,
            Trend::StrongDown => -1.0,
            Trend::NoEffect => 0.0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventRequest {
    pub day: i32,
    pub title: String,
    pub news: Option<String>,
    pub trend: Trend,
}

/// 生成器参数 (缺省值与线上脚本一致)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerateParams {
    #[serde(default = "GenerateParams::default_target_daily_change")]
    pub target_daily_change: f64,
    #[serde(default = "GenerateParams::default_bull_drift")]
    pub bull_drift: f64,
    #[serde(default = "GenerateParams::default_decay")]
    pub decay: f64,
}

impl GenerateParams {
    fn default_target_daily_change() -> f64 {
        0.05
    }
    fn default_bull_drift() -> f64 {
        0.1
    }
    fn default_decay() -> f64 {
        0.9
    }
}

impl Default for GenerateParams {
    fn default() -> Self {
        Self {
            target_daily_change: Self::default_target_daily_change(),
            bull_drift: Self::default_bull_drift(),
            decay: Self::default_decay(),
        }
    }
}

/// 剧本导出/导入行 (is_broadcasted 导入时重置)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScriptDayRow {
    pub day: i32,
    pub price: Decimal,
    pub title: Option<String>,
    pub news: Option<String>,
    pub effective_trend: Trend,
    pub publish_offset: Option<i64>,
}

impl From<&script_day_entity::Model> for ScriptDayRow {
    fn from(m: &script_day_entity::Model) -> Self {
        Self {
            day: m.day,
            price: m.price,
            title: m.title.clone(),
            news: m.news.clone(),
            effective_trend: m.effective_trend,
            publish_offset: m.publish_offset,
        }
    }
}

/// PRICE_UPDATE.history 中的一行, title/news 受广播标记门控
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistoryItem {
    pub day: i32,
    pub price: Decimal,
    pub title: Option<String>,
    pub news: Option<String>,
    pub effective_trend: Trend,
}

/// WS: PRICE_UPDATE
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdatePayload {
    pub day: i32,
    pub price: Decimal,
    pub history: Vec<PriceHistoryItem>,
}

/// WS: NEWS_UPDATE
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewsUpdatePayload {
    pub day: i32,
    pub title: String,
    pub content: Option<String>,
}
