use crate::entities::{contract_order_entity as orders, user_entity as users};
use crate::error::AppResult;
use crate::models::LeaderboardEntry;
use crate::utils::round2;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::collections::HashMap;

pub const LEADERBOARD_SIZE: usize = 100;

/// 排行榜: 现金 + 持仓市值 + 当日未结算保证金 − 负债
#[derive(Clone)]
pub struct LeaderboardService {
    pool: DatabaseConnection,
}

impl LeaderboardService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn top(&self, current_day: i32, price: Decimal) -> AppResult<Vec<LeaderboardEntry>> {
        self.top_n(current_day, price, LEADERBOARD_SIZE).await
    }

    pub async fn top_n(
        &self,
        current_day: i32,
        price: Decimal,
        limit: usize,
    ) -> AppResult<Vec<LeaderboardEntry>> {
        let players = users::Entity::find().all(&self.pool).await?;

        // 当日仍持有的合约保证金计入总资产
        let open_orders = orders::Entity::find()
            .filter(orders::Column::Day.eq(current_day))
            .filter(orders::Column::IsSettled.eq(false))
            .filter(orders::Column::IsCancelled.eq(false))
            .all(&self.pool)
            .await?;
        let mut margin_by_user: HashMap<i64, Decimal> = HashMap::new();
        for o in &open_orders {
            *margin_by_user.entry(o.user_id).or_insert(Decimal::ZERO) += o.margin;
        }

        let mut rows: Vec<LeaderboardEntry> = players
            .into_iter()
            .map(|u| {
                let margins = margin_by_user.get(&u.id).copied().unwrap_or(Decimal::ZERO);
                let total = round2(
                    u.cash + Decimal::from(u.stocks) * price + margins - u.debt,
                );
                LeaderboardEntry {
                    user_id: u.id,
                    display_name: u.display_name,
                    avatar: u.avatar,
                    total_assets: total,
                    rank: 0,
                }
            })
            .collect();

        rows.sort_by(|a, b| b.total_assets.cmp(&a.total_assets));
        rows.truncate(limit);
        for (i, row) in rows.iter_mut().enumerate() {
            row.rank = i + 1;
        }
        Ok(rows)
    }
}
