use crate::entities::game_status_entity;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 时钟派生状态, 每个 tick 推送一次
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameStateResponse {
    pub is_started: bool,
    pub is_paused: bool,
    pub current_day: i32,
    pub seconds_to_next_day: i64,
    pub total_days: i32,
    pub time_ratio: i64,
    pub initial_price: Decimal,
    pub initial_cash: Decimal,
    pub max_leverage: i32,
    pub daily_interest_rate: Decimal,
    pub max_loan_amount: Decimal,
}

/// WS: GAME_STATE_UPDATE (精简的每秒推送)
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameStateUpdatePayload {
    pub current_day: i32,
    pub is_game_started: bool,
    pub countdown: i64,
    pub total_days: i32,
    pub max_leverage: i32,
}

impl From<&GameStateResponse> for GameStateUpdatePayload {
    fn from(s: &GameStateResponse) -> Self {
        Self {
            current_day: s.current_day,
            is_game_started: s.is_started,
            countdown: s.seconds_to_next_day,
            total_days: s.total_days,
            max_leverage: s.max_leverage,
        }
    }
}

/// PUT /api/admin/params 请求体, 仅提供的字段会被更新
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateParamsRequest {
    pub time_ratio: Option<i64>,
    pub total_days: Option<i32>,
    pub initial_price: Option<Decimal>,
    pub initial_cash: Option<Decimal>,
    pub max_leverage: Option<i32>,
    pub daily_interest_rate: Option<Decimal>,
    pub max_loan_amount: Option<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameParamsResponse {
    pub time_ratio: i64,
    pub total_days: i32,
    pub initial_price: Decimal,
    pub initial_cash: Decimal,
    pub max_leverage: i32,
    pub daily_interest_rate: Decimal,
    pub max_loan_amount: Decimal,
}

impl From<&game_status_entity::Model> for GameParamsResponse {
    fn from(m: &game_status_entity::Model) -> Self {
        Self {
            time_ratio: m.time_ratio,
            total_days: m.total_days,
            initial_price: m.initial_price,
            initial_cash: m.initial_cash,
            max_leverage: m.max_leverage,
            daily_interest_rate: m.daily_interest_rate,
            max_loan_amount: m.max_loan_amount,
        }
    }
}

/// WS: LOAN_CONFIG_UPDATE
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoanConfigPayload {
    pub daily_interest_rate: Decimal,
    pub max_loan_amount: Decimal,
}

/// WS: LEADERBOARD_UPDATE 中的一行
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: i64,
    pub display_name: String,
    pub avatar: String,
    pub total_assets: Decimal,
    pub rank: usize,
}
