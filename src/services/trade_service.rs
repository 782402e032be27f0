use crate::config::GameDefaults;
use crate::entities::{contract_order_entity as orders, user_entity as users};
use crate::error::{AppError, AppResult};
use crate::models::{ContractOrderResponse, ContractType, TradeSuccessPayload};
use crate::services::game_service::{compute_clock, fetch_or_init_status};
use crate::services::script_service::ScriptService;
use crate::utils::round2;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QuerySelect, Set, TransactionTrait,
};

/// 合约开仓所需保证金: price·quantity/leverage
pub fn required_margin(price: Decimal, quantity: i64, leverage: i32) -> Decimal {
    round2(price * Decimal::from(quantity) / Decimal::from(leverage))
}

/// 交易核心: 现货买卖 / 合约开平 / 借还款
///
/// 每个操作一个事务, 入口处 SELECT ... FOR UPDATE 锁定用户行,
/// 与结算管线共用同一把行锁, 保证单用户资金操作串行
#[derive(Clone)]
pub struct TradeService {
    pool: DatabaseConnection,
    script: ScriptService,
    defaults: GameDefaults,
}

impl TradeService {
    pub fn new(pool: DatabaseConnection, script: ScriptService, defaults: GameDefaults) -> Self {
        Self {
            pool,
            script,
            defaults,
        }
    }

    async fn lock_user(&self, txn: &DatabaseTransaction, user_id: i64) -> AppResult<users::Model> {
        users::Entity::find_by_id(user_id)
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))
    }

    /// 现货买入
    pub async fn buy_stock(&self, user_id: i64, quantity: i64) -> AppResult<TradeSuccessPayload> {
        if quantity < 1 {
            return Err(AppError::Validation("数量必须 ≥ 1".to_string()));
        }

        let txn = self.pool.begin().await?;
        let status = fetch_or_init_status(&txn, &self.defaults).await?;
        let clock = compute_clock(&status, Utc::now());
        let price = self
            .script
            .price_for_day(clock.current_day, status.initial_price);

        let user = self.lock_user(&txn, user_id).await?;
        let cost = round2(price * Decimal::from(quantity));
        if user.cash < cost {
            return Err(AppError::InsufficientFunds);
        }

        let new_cash = round2(user.cash - cost);
        let new_stocks = user.stocks + quantity;
        let mut am: users::ActiveModel = user.into();
        am.cash = Set(new_cash);
        am.stocks = Set(new_stocks);
        am.updated_at = Set(Some(Utc::now()));
        let updated = am.update(&txn).await?;
        txn.commit().await?;

        Ok(success("BUY_STOCK", &updated, None, None))
    }

    /// 现货卖出
    pub async fn sell_stock(&self, user_id: i64, quantity: i64) -> AppResult<TradeSuccessPayload> {
        if quantity < 1 {
            return Err(AppError::Validation("数量必须 ≥ 1".to_string()));
        }

        let txn = self.pool.begin().await?;
        let status = fetch_or_init_status(&txn, &self.defaults).await?;
        let clock = compute_clock(&status, Utc::now());
        let price = self
            .script
            .price_for_day(clock.current_day, status.initial_price);

        let user = self.lock_user(&txn, user_id).await?;
        if user.stocks < quantity {
            return Err(AppError::InsufficientHoldings);
        }

        let proceeds = round2(price * Decimal::from(quantity));
        let new_cash = round2(user.cash + proceeds);
        let new_stocks = user.stocks - quantity;
        let mut am: users::ActiveModel = user.into();
        am.cash = Set(new_cash);
        am.stocks = Set(new_stocks);
        am.updated_at = Set(Some(Utc::now()));
        let updated = am.update(&txn).await?;
        txn.commit().await?;

        Ok(success("SELL_STOCK", &updated, None, None))
    }

    /// 合约开仓: 冻结保证金 price·q/leverage, 次日按新价结算
    pub async fn open_contract(
        &self,
        user_id: i64,
        order_type: ContractType,
        leverage: i32,
        quantity: i64,
    ) -> AppResult<TradeSuccessPayload> {
        if quantity < 1 {
            return Err(AppError::Validation("数量必须 ≥ 1".to_string()));
        }

        let txn = self.pool.begin().await?;
        let status = fetch_or_init_status(&txn, &self.defaults).await?;
        if leverage < 1 || leverage > status.max_leverage {
            return Err(AppError::Validation(format!(
                "杠杆必须在 1..={} 之间",
                status.max_leverage
            )));
        }
        let clock = compute_clock(&status, Utc::now());
        let price = self
            .script
            .price_for_day(clock.current_day, status.initial_price);

        let user = self.lock_user(&txn, user_id).await?;
        let margin = required_margin(price, quantity, leverage);
        if user.cash < margin {
            return Err(AppError::InsufficientFunds);
        }

        let new_cash = round2(user.cash - margin);
        let mut am: users::ActiveModel = user.into();
        am.cash = Set(new_cash);
        am.updated_at = Set(Some(Utc::now()));
        let updated = am.update(&txn).await?;

        let order = orders::ActiveModel {
            user_id: Set(user_id),
            day: Set(clock.current_day),
            order_type: Set(order_type),
            leverage: Set(leverage),
            quantity: Set(quantity),
            margin: Set(margin),
            entry_price: Set(price),
            is_settled: Set(false),
            is_cancelled: Set(false),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        Ok(success(
            "BUY_CONTRACT",
            &updated,
            Some(ContractOrderResponse::from(&order)),
            None,
        ))
    }

    /// 撤销当日全部未结算合约, 退还保证金
    pub async fn cancel_contracts(&self, user_id: i64) -> AppResult<TradeSuccessPayload> {
        let txn = self.pool.begin().await?;
        let status = fetch_or_init_status(&txn, &self.defaults).await?;
        let clock = compute_clock(&status, Utc::now());

        let user = self.lock_user(&txn, user_id).await?;
        let open = orders::Entity::find()
            .filter(orders::Column::UserId.eq(user_id))
            .filter(orders::Column::Day.eq(clock.current_day))
            .filter(orders::Column::IsSettled.eq(false))
            .filter(orders::Column::IsCancelled.eq(false))
            .lock_exclusive()
            .all(&txn)
            .await?;
        if open.is_empty() {
            return Err(AppError::NotFound("当日没有可撤销的合约".to_string()));
        }

        let refund: Decimal = open.iter().map(|o| o.margin).sum();
        let ids: Vec<i64> = open.iter().map(|o| o.id).collect();
        orders::Entity::update_many()
            .col_expr(
                orders::Column::IsCancelled,
                sea_orm::sea_query::Expr::value(true),
            )
            .filter(orders::Column::Id.is_in(ids))
            .exec(&txn)
            .await?;

        let new_cash = round2(user.cash + refund);
        let mut am: users::ActiveModel = user.into();
        am.cash = Set(new_cash);
        am.updated_at = Set(Some(Utc::now()));
        let updated = am.update(&txn).await?;
        txn.commit().await?;

        Ok(success("CANCEL_CONTRACT", &updated, None, Some(refund)))
    }

    /// 借款: 计入当日额度, 本金同时进现金与负债
    pub async fn borrow(&self, user_id: i64, amount: Decimal) -> AppResult<TradeSuccessPayload> {
        let amount = round2(amount);
        if amount <= Decimal::ZERO {
            return Err(AppError::Validation("金额必须为正".to_string()));
        }

        let txn = self.pool.begin().await?;
        let status = fetch_or_init_status(&txn, &self.defaults).await?;
        if self.defaults.require_started_for_loans && !status.is_started {
            return Err(AppError::GameNotRunning);
        }

        let user = self.lock_user(&txn, user_id).await?;
        if user.daily_borrowed + amount > status.max_loan_amount {
            return Err(AppError::QuotaExceeded);
        }

        let mut am: users::ActiveModel = user.clone().into();
        am.cash = Set(round2(user.cash + amount));
        am.debt = Set(round2(user.debt + amount));
        am.daily_borrowed = Set(round2(user.daily_borrowed + amount));
        am.updated_at = Set(Some(Utc::now()));
        let updated = am.update(&txn).await?;
        txn.commit().await?;

        Ok(success("BORROW_MONEY", &updated, None, None))
    }

    /// 还款: 实还 min(请求额, 负债)
    pub async fn repay(&self, user_id: i64, amount: Decimal) -> AppResult<TradeSuccessPayload> {
        let amount = round2(amount);
        if amount <= Decimal::ZERO {
            return Err(AppError::Validation("金额必须为正".to_string()));
        }

        let txn = self.pool.begin().await?;
        let status = fetch_or_init_status(&txn, &self.defaults).await?;
        if self.defaults.require_started_for_loans && !status.is_started {
            return Err(AppError::GameNotRunning);
        }

        let user = self.lock_user(&txn, user_id).await?;
        if user.cash < amount {
            return Err(AppError::InsufficientFunds);
        }
        let actual = amount.min(user.debt);

        let mut am: users::ActiveModel = user.clone().into();
        am.cash = Set(round2(user.cash - actual));
        am.debt = Set(round2(user.debt - actual));
        am.updated_at = Set(Some(Utc::now()));
        let updated = am.update(&txn).await?;
        txn.commit().await?;

        Ok(success("REPAY_MONEY", &updated, None, None))
    }
}

fn success(
    action: &str,
    user: &users::Model,
    order: Option<ContractOrderResponse>,
    refunded: Option<Decimal>,
) -> TradeSuccessPayload {
    TradeSuccessPayload {
        action: action.to_string(),
        cash: user.cash,
        stocks: user.stocks,
        debt: user.debt,
        daily_borrowed: user.daily_borrowed,
        order,
        refunded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_required_margin() {
        // P=10, q=4, lev=5 → 8
        assert_eq!(
            required_margin(Decimal::new(10, 0), 4, 5),
            Decimal::from_str("8.00").unwrap()
        );
        // P=10, q=10, lev=10 → 10
        assert_eq!(
            required_margin(Decimal::new(10, 0), 10, 10),
            Decimal::from_str("10.00").unwrap()
        );
        // 非整除情况: 10·1/3 = 3.33
        assert_eq!(
            required_margin(Decimal::new(10, 0), 1, 3),
            Decimal::from_str("3.33").unwrap()
        );
    }
}
