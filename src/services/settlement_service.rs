use crate::config::GameDefaults;
use crate::entities::{contract_order_entity as orders, user_entity as users};
use crate::error::{AppError, AppResult};
use crate::models::{
    AssetsPayload, ContractSettledPayload, ContractType, PriceUpdatePayload,
};
use crate::services::game_service::fetch_or_init_status;
use crate::services::leaderboard_service::LeaderboardService;
use crate::services::script_service::ScriptService;
use crate::utils::round2;
use crate::ws::{Hub, events as evt};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait,
};
use serde_json::json;
use std::collections::HashMap;

/// 单张合约的盈亏与兑付额
/// payout = margin + pnl, pnl = 方向盈亏 · 数量 · 杠杆
pub fn contract_payout(
    order_type: ContractType,
    entry_price: Decimal,
    exit_price: Decimal,
    quantity: i64,
    leverage: i32,
    margin: Decimal,
) -> (Decimal, Decimal) {
    let pnl_per_unit = match order_type {
        ContractType::Long => exit_price - entry_price,
        ContractType::Short => entry_price - exit_price,
    };
    let pnl = round2(pnl_per_unit * Decimal::from(quantity) * Decimal::from(leverage));
    let payout = round2(margin + pnl);
    (pnl, payout)
}

/// 日界结算管线
///
/// 六个步骤严格按序执行; 单个用户/订单失败只记日志并跳过,
/// 绝不让整个日界中止
#[derive(Clone)]
pub struct SettlementService {
    pool: DatabaseConnection,
    script: ScriptService,
    hub: Hub,
    leaderboard: LeaderboardService,
    defaults: GameDefaults,
}

impl SettlementService {
    pub fn new(
        pool: DatabaseConnection,
        script: ScriptService,
        hub: Hub,
        leaderboard: LeaderboardService,
        defaults: GameDefaults,
    ) -> Self {
        Self {
            pool,
            script,
            hub,
            leaderboard,
            defaults,
        }
    }

    /// 日界管线入口: prev_day 的合约按 new_day 的价格结算
    pub async fn run_day_boundary(&self, prev_day: i32, new_day: i32) {
        log::info!("Day boundary: {prev_day} -> {new_day}");

        let status = match fetch_or_init_status(&self.pool, &self.defaults).await {
            Ok(s) => s,
            Err(e) => {
                log::error!("Day boundary aborted, cannot read game status: {e}");
                return;
            }
        };
        let new_price = self
            .script
            .price_for_day(new_day, status.initial_price);

        // 1. 负债计息
        if let Err(e) = self.accrue_interest(status.daily_interest_rate).await {
            log::error!("Interest accrual failed: {e}");
        }

        // 2. 当日借款额度清零
        if let Err(e) = self.reset_daily_borrowed().await {
            log::error!("Daily borrow reset failed: {e}");
        }

        // 3. 结算昨日合约
        if prev_day >= 1 {
            self.settle_contracts(prev_day, new_price).await;
        }

        // 4. 广播新价
        self.hub.global_emit(
            evt::PRICE_UPDATE,
            &PriceUpdatePayload {
                day: new_day,
                price: new_price,
                history: self.script.history(new_day),
            },
        );

        // 5. 广播排行榜
        match self.leaderboard.top(new_day, new_price).await {
            Ok(rows) => self
                .hub
                .global_emit(evt::LEADERBOARD_UPDATE, &json!({ "data": rows })),
            Err(e) => log::error!("Leaderboard computation failed: {e}"),
        }

        // 6. 给每个在线连接推送个人资产
        if let Err(e) = self.push_assets_to_connected().await {
            log::error!("Per-user assets push failed: {e}");
        }
    }

    /// debt ← debt·(1+rate), 两位小数
    async fn accrue_interest(&self, rate: Decimal) -> AppResult<()> {
        if rate <= Decimal::ZERO {
            return Ok(());
        }
        let txn = self.pool.begin().await?;
        let debtors = users::Entity::find()
            .filter(users::Column::Debt.gt(Decimal::ZERO))
            .lock_exclusive()
            .all(&txn)
            .await?;
        for user in debtors {
            let new_debt = round2(user.debt * (Decimal::ONE + rate));
            let mut am: users::ActiveModel = user.into();
            am.debt = Set(new_debt);
            am.updated_at = Set(Some(Utc::now()));
            am.update(&txn).await?;
        }
        txn.commit().await?;
        Ok(())
    }

    async fn reset_daily_borrowed(&self) -> AppResult<()> {
        users::Entity::update_many()
            .col_expr(users::Column::DailyBorrowed, Expr::value(Decimal::ZERO))
            .exec(&self.pool)
            .await?;
        Ok(())
    }

    /// 每张订单独立事务: 锁订单持有人行, 盈利入现金, 亏损入负债
    async fn settle_contracts(&self, day: i32, exit_price: Decimal) {
        let open = match orders::Entity::find()
            .filter(orders::Column::Day.eq(day))
            .filter(orders::Column::IsSettled.eq(false))
            .filter(orders::Column::IsCancelled.eq(false))
            .all(&self.pool)
            .await
        {
            Ok(list) => list,
            Err(e) => {
                log::error!("Cannot list open contracts for day {day}: {e}");
                return;
            }
        };

        for order in open {
            match self.settle_one(&order, exit_price).await {
                Ok(payload) => {
                    self.hub
                        .to_user(order.user_id, evt::CONTRACT_SETTLED, &payload);
                }
                Err(e) => {
                    log::error!(
                        "Settling contract {} for user {} failed: {e}",
                        order.id,
                        order.user_id
                    );
                }
            }
        }
    }

    async fn settle_one(
        &self,
        order: &orders::Model,
        exit_price: Decimal,
    ) -> AppResult<ContractSettledPayload> {
        let txn = self.pool.begin().await?;

        // 事务内重读订单, 防止重复结算
        let fresh = orders::Entity::find_by_id(order.id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("contract {}", order.id)))?;
        if !fresh.is_open() {
            return Err(AppError::Conflict(format!(
                "contract {} already terminal",
                fresh.id
            )));
        }

        let user = users::Entity::find_by_id(fresh.user_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", fresh.user_id)))?;

        let (pnl, payout) = contract_payout(
            fresh.order_type,
            fresh.entry_price,
            exit_price,
            fresh.quantity,
            fresh.leverage,
            fresh.margin,
        );

        let (new_cash, new_debt) = if payout >= Decimal::ZERO {
            (round2(user.cash + payout), user.debt)
        } else {
            (user.cash, round2(user.debt - payout))
        };

        let mut uam: users::ActiveModel = user.into();
        uam.cash = Set(new_cash);
        uam.debt = Set(new_debt);
        uam.updated_at = Set(Some(Utc::now()));
        uam.update(&txn).await?;

        let order_type = fresh.order_type;
        let quantity = fresh.quantity;
        let entry_price = fresh.entry_price;
        let mut oam: orders::ActiveModel = fresh.into();
        oam.is_settled = Set(true);
        oam.update(&txn).await?;

        txn.commit().await?;

        Ok(ContractSettledPayload {
            order_type,
            quantity,
            entry_price,
            exit_price,
            pnl,
            new_cash,
            new_debt,
        })
    }

    async fn push_assets_to_connected(&self) -> AppResult<()> {
        let sessions = self.hub.connected_sessions();
        if sessions.is_empty() {
            return Ok(());
        }
        let ids: Vec<i64> = {
            let mut v: Vec<i64> = sessions.iter().map(|(_, uid)| *uid).collect();
            v.sort_unstable();
            v.dedup();
            v
        };
        let rows = users::Entity::find()
            .filter(users::Column::Id.is_in(ids))
            .all(&self.pool)
            .await?;
        let by_id: HashMap<i64, &users::Model> = rows.iter().map(|u| (u.id, u)).collect();
        for (sid, uid) in sessions {
            if let Some(user) = by_id.get(&uid) {
                self.hub
                    .to_session(sid, evt::ASSETS_UPDATE, &AssetsPayload::from(*user));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_long_contract_profit() {
        // 开多 q=4 lev=5, 10 → 12: pnl=40, payout=48
        let (pnl, payout) =
            contract_payout(ContractType::Long, dec("10"), dec("12"), 4, 5, dec("8"));
        assert_eq!(pnl, dec("40.00"));
        assert_eq!(payout, dec("48.00"));
    }

    #[test]
    fn test_short_loss_exceeding_margin() {
        // 开空 q=10 lev=10, 10 → 13: pnl=-300, payout=-290
        let (pnl, payout) =
            contract_payout(ContractType::Short, dec("10"), dec("13"), 10, 10, dec("10"));
        assert_eq!(pnl, dec("-300.00"));
        assert_eq!(payout, dec("-290.00"));
    }

    #[test]
    fn test_short_contract_profit() {
        let (pnl, payout) =
            contract_payout(ContractType::Short, dec("20"), dec("18"), 2, 3, dec("13.33"));
        assert_eq!(pnl, dec("12.00"));
        assert_eq!(payout, dec("25.33"));
    }

    #[test]
    fn test_interest_accrual_rounding() {
        // debt=1000, rate=0.0001 → 1000.10
        let rate = Decimal::new(1, 4);
        assert_eq!(
            round2(dec("1000") * (Decimal::ONE + rate)),
            dec("1000.10")
        );
    }

    #[test]
    fn test_flat_price_returns_margin() {
        let (pnl, payout) =
            contract_payout(ContractType::Long, dec("15"), dec("15"), 7, 2, dec("52.50"));
        assert_eq!(pnl, dec("0.00"));
        assert_eq!(payout, dec("52.50"));
    }
}
