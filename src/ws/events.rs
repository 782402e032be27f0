//! 实时消息的事件名与信封格式。
//!
//! 所有双向消息统一为 `{"event": <名称>, "payload": <对象>}`。

use serde::{Deserialize, Serialize};

// 服务端 → 客户端
pub const FULL_SYNC_STATE: &str = "FULL_SYNC_STATE";
pub const GAME_STATE_UPDATE: &str = "GAME_STATE_UPDATE";
pub const PRICE_UPDATE: &str = "PRICE_UPDATE";
pub const NEWS_UPDATE: &str = "NEWS_UPDATE";
pub const CLEAR_NEWS: &str = "CLEAR_NEWS";
pub const LEADERBOARD_UPDATE: &str = "LEADERBOARD_UPDATE";
pub const CONTRACT_SETTLED: &str = "CONTRACT_SETTLED";
pub const ASSETS_UPDATE: &str = "ASSETS_UPDATE";
pub const TRADE_SUCCESS: &str = "TRADE_SUCCESS";
pub const TRADE_ERROR: &str = "TRADE_ERROR";
pub const MINIGAME_SYNC: &str = "MINIGAME_SYNC";
pub const MINIGAME_EVENT: &str = "MINIGAME_EVENT";
pub const MINIGAME_COUNTDOWN: &str = "MINIGAME_COUNTDOWN";
pub const FORCE_LOGOUT: &str = "FORCE_LOGOUT";
pub const LOAN_CONFIG_UPDATE: &str = "LOAN_CONFIG_UPDATE";
pub const LOAN_SHARK_VISIT_UPDATE: &str = "LOAN_SHARK_VISIT_UPDATE";
pub const USER_DATA_UPDATED: &str = "USER_DATA_UPDATED";

// 客户端 → 服务端
pub const BUY_STOCK: &str = "BUY_STOCK";
pub const SELL_STOCK: &str = "SELL_STOCK";
pub const BUY_CONTRACT: &str = "BUY_CONTRACT";
pub const CANCEL_CONTRACT: &str = "CANCEL_CONTRACT";
pub const BORROW_MONEY: &str = "BORROW_MONEY";
pub const REPAY_MONEY: &str = "REPAY_MONEY";
pub const VISIT_LOAN_SHARK: &str = "VISIT_LOAN_SHARK";
pub const MINIGAME_ACTION: &str = "MINIGAME_ACTION";
pub const ADMIN_MINIGAME_ACTION: &str = "ADMIN_MINIGAME_ACTION";

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// 序列化一条下行消息
pub fn envelope<P: Serialize>(event: &str, payload: &P) -> String {
    serde_json::json!({ "event": event, "payload": payload }).to_string()
}
