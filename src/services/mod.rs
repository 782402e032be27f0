pub mod auth_service;
pub mod catalogue_service;
pub mod game_service;
pub mod leaderboard_service;
pub mod minigame;
pub mod script_service;
pub mod settlement_service;
pub mod trade_service;
pub mod user_service;

pub use auth_service::AuthService;
pub use catalogue_service::CatalogueService;
pub use game_service::GameService;
pub use leaderboard_service::LeaderboardService;
pub use minigame::MiniGameEngine;
pub use script_service::ScriptService;
pub use settlement_service::SettlementService;
pub use trade_service::TradeService;
pub use user_service::UserService;

use crate::entities::{contract_order_entity as orders, user_entity as users};
use crate::error::{AppError, AppResult};
use crate::models::{AssetsPayload, ContractOrderResponse};
use crate::services::game_service::{compute_clock, state_of};
use crate::ws::Hub;
use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde_json::json;

/// 会话层需要的全部服务句柄
#[derive(Clone)]
pub struct AppContext {
    pub pool: DatabaseConnection,
    pub hub: Hub,
    pub game: GameService,
    pub trade: TradeService,
    pub script: ScriptService,
    pub settlement: SettlementService,
    pub leaderboard: LeaderboardService,
    pub users: UserService,
    pub minigame: MiniGameEngine,
}

impl AppContext {
    /// 连接建立时下发的一次性完整快照
    pub async fn full_sync_state(&self, user_id: i64) -> AppResult<serde_json::Value> {
        let status = self.game.status().await?;
        let now = Utc::now();
        let state = state_of(&status, now);
        let clock = compute_clock(&status, now);
        let price = self
            .script
            .price_for_day(clock.current_day, status.initial_price);

        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;

        let contracts: Vec<ContractOrderResponse> = orders::Entity::find()
            .filter(orders::Column::UserId.eq(user_id))
            .filter(orders::Column::Day.eq(clock.current_day))
            .filter(orders::Column::IsSettled.eq(false))
            .filter(orders::Column::IsCancelled.eq(false))
            .all(&self.pool)
            .await?
            .iter()
            .map(ContractOrderResponse::from)
            .collect();

        let leaderboard = self.leaderboard.top(clock.current_day, price).await?;

        Ok(json!({
            "gameStatus": state,
            "price": price,
            "history": self.script.history(clock.current_day),
            "assets": AssetsPayload::from(&user),
            "contracts": contracts,
            "news": self.script.visible_news(clock.current_day),
            "leaderboard": leaderboard,
        }))
    }
}
