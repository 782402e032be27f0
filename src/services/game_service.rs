use crate::config::GameDefaults;
use crate::entities::{
    GAME_STATUS_ID, contract_order_entity as orders, event_entity as events,
    game_status_entity as status, script_day_entity as days, user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    GameStateResponse, GameStateUpdatePayload, LoanConfigPayload, UpdateParamsRequest, UserRole,
};
use crate::services::ScriptService;
use crate::utils::round2;
use crate::ws::{Hub, events as evt};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};

/// 时钟派生值; second_in_day 用于新闻定点发布
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockView {
    pub current_day: i32,
    pub seconds_to_next_day: i64,
    pub second_in_day: i64,
}

/// 读取 game_status 单行, 不存在则以默认参数初始化
pub async fn fetch_or_init_status<C: ConnectionTrait>(
    conn: &C,
    defaults: &GameDefaults,
) -> AppResult<status::Model> {
    if let Some(m) = status::Entity::find_by_id(GAME_STATUS_ID).one(conn).await? {
        return Ok(m);
    }
    let am = status::ActiveModel {
        id: Set(GAME_STATUS_ID),
        is_started: Set(false),
        game_start_time: Set(None),
        paused_at: Set(None),
        time_ratio: Set(defaults.time_ratio),
        total_days: Set(defaults.total_days),
        initial_price: Set(defaults.initial_price),
        initial_cash: Set(defaults.initial_cash),
        max_leverage: Set(defaults.max_leverage),
        daily_interest_rate: Set(defaults.daily_interest_rate),
        max_loan_amount: Set(defaults.max_loan_amount),
        updated_at: Set(Some(Utc::now())),
    };
    Ok(am.insert(conn).await?)
}

/// 从持久化状态推导当前游戏日与日内秒数
///
/// 暂停时以 paused_at 为参考时间, 时钟停走; 超过总天数后
/// current_day 钳制在 total_days, 倒计时归零
pub fn compute_clock(m: &status::Model, now: DateTime<Utc>) -> ClockView {
    let Some(start) = m.game_start_time else {
        return ClockView {
            current_day: 0,
            seconds_to_next_day: 0,
            second_in_day: 0,
        };
    };
    let ratio = m.time_ratio.max(1);
    let reference = m.paused_at.unwrap_or(now);
    let elapsed = (reference - start).num_seconds().max(0);
    let total = i64::from(m.total_days.max(0));

    let current_day = (elapsed / ratio + 1).min(total).max(0) as i32;
    let second_in_day = elapsed % ratio;
    let seconds_to_next_day = if elapsed >= total * ratio {
        0
    } else {
        ratio - second_in_day
    };
    ClockView {
        current_day,
        seconds_to_next_day,
        second_in_day,
    }
}

pub fn state_of(m: &status::Model, now: DateTime<Utc>) -> GameStateResponse {
    let clock = compute_clock(m, now);
    GameStateResponse {
        is_started: m.is_started,
        is_paused: m.paused_at.is_some(),
        current_day: clock.current_day,
        seconds_to_next_day: clock.seconds_to_next_day,
        total_days: m.total_days,
        time_ratio: m.time_ratio,
        initial_price: m.initial_price,
        initial_cash: m.initial_cash,
        max_leverage: m.max_leverage,
        daily_interest_rate: m.daily_interest_rate,
        max_loan_amount: m.max_loan_amount,
    }
}

/// time_ratio 变更时平移 game_start_time, 保持当前游戏日与日内剩余秒数;
/// 新比例容纳不下剩余秒数时截断为 new_ratio - 1 (立即临近翻日, 绝不跳日)
pub fn rebase_start_time(
    start: DateTime<Utc>,
    reference: DateTime<Utc>,
    old_ratio: i64,
    new_ratio: i64,
) -> DateTime<Utc> {
    let old_ratio = old_ratio.max(1);
    let new_ratio = new_ratio.max(1);
    let elapsed = (reference - start).num_seconds().max(0);
    let day_index = elapsed / old_ratio;
    let mut remaining = old_ratio - elapsed % old_ratio;
    if new_ratio < remaining {
        remaining = new_ratio - 1;
    }
    let new_elapsed = day_index * new_ratio + (new_ratio - remaining);
    reference - Duration::seconds(new_elapsed)
}

/// 游戏时钟与生命周期操作
///
/// 所有操作先校验前置条件再落库, 失败不产生部分写入
#[derive(Clone)]
pub struct GameService {
    pool: DatabaseConnection,
    script: ScriptService,
    hub: Hub,
    defaults: GameDefaults,
}

impl GameService {
    pub fn new(pool: DatabaseConnection, script: ScriptService, hub: Hub, defaults: GameDefaults) -> Self {
        Self {
            pool,
            script,
            hub,
            defaults,
        }
    }

    pub fn defaults(&self) -> &GameDefaults {
        &self.defaults
    }

    pub async fn status(&self) -> AppResult<status::Model> {
        fetch_or_init_status(&self.pool, &self.defaults).await
    }

    pub async fn state(&self) -> AppResult<GameStateResponse> {
        let m = self.status().await?;
        Ok(state_of(&m, Utc::now()))
    }

    /// 开始游戏: 时钟归零起跑, 清广播标记, 清玩家计数器
    pub async fn start(&self) -> AppResult<GameStateResponse> {
        let txn = self.pool.begin().await?;
        let m = fetch_or_init_status(&txn, &self.defaults).await?;
        if m.is_started {
            return Err(AppError::Precondition("游戏已在进行中".to_string()));
        }

        let mut am: status::ActiveModel = m.into();
        am.is_started = Set(true);
        am.game_start_time = Set(Some(Utc::now()));
        am.paused_at = Set(None);
        am.updated_at = Set(Some(Utc::now()));
        let updated = am.update(&txn).await?;

        days::Entity::update_many()
            .col_expr(days::Column::IsBroadcasted, Expr::value(false))
            .exec(&txn)
            .await?;
        users::Entity::update_many()
            .col_expr(users::Column::AvatarUpdateCount, Expr::value(0))
            .col_expr(users::Column::LoanSharkVisitCount, Expr::value(0))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        self.script.reload().await?;

        let state = state_of(&updated, Utc::now());
        self.hub
            .global_emit(evt::GAME_STATE_UPDATE, &GameStateUpdatePayload::from(&state));
        log::info!("Game started, total_days={}", updated.total_days);
        Ok(state)
    }

    /// 暂停: 时钟停在 paused_at
    pub async fn stop(&self) -> AppResult<GameStateResponse> {
        let txn = self.pool.begin().await?;
        let m = fetch_or_init_status(&txn, &self.defaults).await?;
        if !m.is_started || m.game_start_time.is_none() {
            return Err(AppError::Precondition("游戏未在进行中".to_string()));
        }

        let mut am: status::ActiveModel = m.into();
        am.is_started = Set(false);
        am.paused_at = Set(Some(Utc::now()));
        am.updated_at = Set(Some(Utc::now()));
        let updated = am.update(&txn).await?;
        txn.commit().await?;

        let state = state_of(&updated, Utc::now());
        self.hub
            .global_emit(evt::GAME_STATE_UPDATE, &GameStateUpdatePayload::from(&state));
        log::info!("Game stopped at day {}", state.current_day);
        Ok(state)
    }

    /// 继续: 把暂停时长平移进开始时间, 时钟从停点继续
    pub async fn resume(&self) -> AppResult<GameStateResponse> {
        let txn = self.pool.begin().await?;
        let m = fetch_or_init_status(&txn, &self.defaults).await?;
        let Some(paused_at) = m.paused_at else {
            return Err(AppError::Precondition("游戏未处于暂停状态".to_string()));
        };
        if m.is_started {
            return Err(AppError::Precondition("游戏已在进行中".to_string()));
        }
        let start = m
            .game_start_time
            .ok_or_else(|| AppError::Precondition("游戏从未开始".to_string()))?;

        let now = Utc::now();
        let mut am: status::ActiveModel = m.into();
        am.game_start_time = Set(Some(start + (now - paused_at)));
        am.paused_at = Set(None);
        am.is_started = Set(true);
        am.updated_at = Set(Some(now));
        let updated = am.update(&txn).await?;
        txn.commit().await?;

        let state = state_of(&updated, Utc::now());
        self.hub
            .global_emit(evt::GAME_STATE_UPDATE, &GameStateUpdatePayload::from(&state));
        log::info!("Game resumed at day {}", state.current_day);
        Ok(state)
    }

    /// 重开一局: 清空玩家持仓与合约, 保留账号与剧本
    pub async fn restart(&self) -> AppResult<()> {
        let txn = self.pool.begin().await?;
        let m = fetch_or_init_status(&txn, &self.defaults).await?;
        if m.is_started {
            return Err(AppError::Precondition("请先停止游戏".to_string()));
        }
        let initial_cash = m.initial_cash;

        users::Entity::update_many()
            .col_expr(users::Column::Cash, Expr::value(initial_cash))
            .col_expr(users::Column::Stocks, Expr::value(0i64))
            .col_expr(users::Column::Debt, Expr::value(Decimal::ZERO))
            .col_expr(users::Column::DailyBorrowed, Expr::value(Decimal::ZERO))
            .col_expr(users::Column::FirstSignIn, Expr::value(false))
            .exec(&txn)
            .await?;
        orders::Entity::delete_many().exec(&txn).await?;
        days::Entity::update_many()
            .col_expr(days::Column::IsBroadcasted, Expr::value(false))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        self.script.reload().await?;

        self.hub.global_emit(evt::CLEAR_NEWS, &serde_json::json!({}));
        log::info!("Game restarted: balances reset, contracts wiped");
        Ok(())
    }

    /// 出厂重置: 删除剧本/事件/合约与所有非管理员账号, 参数回到默认
    pub async fn reset(&self, current_admin_id: i64) -> AppResult<()> {
        let txn = self.pool.begin().await?;
        let m = fetch_or_init_status(&txn, &self.defaults).await?;
        if m.is_started {
            return Err(AppError::Precondition("请先停止游戏".to_string()));
        }

        // 先删合约再删用户, 满足外键顺序
        orders::Entity::delete_many().exec(&txn).await?;
        days::Entity::delete_many().exec(&txn).await?;
        events::Entity::delete_many().exec(&txn).await?;
        users::Entity::delete_many()
            .filter(users::Column::Role.ne(UserRole::Admin))
            .filter(users::Column::Id.ne(current_admin_id))
            .exec(&txn)
            .await?;

        let mut am: status::ActiveModel = m.into();
        am.is_started = Set(false);
        am.game_start_time = Set(None);
        am.paused_at = Set(None);
        am.time_ratio = Set(self.defaults.time_ratio);
        am.total_days = Set(self.defaults.total_days);
        am.initial_price = Set(self.defaults.initial_price);
        am.initial_cash = Set(self.defaults.initial_cash);
        am.max_leverage = Set(self.defaults.max_leverage);
        am.daily_interest_rate = Set(self.defaults.daily_interest_rate);
        am.max_loan_amount = Set(self.defaults.max_loan_amount);
        am.updated_at = Set(Some(Utc::now()));
        am.update(&txn).await?;

        txn.commit().await?;
        self.script.reload().await?;
        log::info!("Factory reset done by admin {current_admin_id}");
        Ok(())
    }

    /// 更新游戏参数; time_ratio 变更时重定位开始时间保持当前日
    pub async fn update_params(&self, req: UpdateParamsRequest) -> AppResult<GameStateResponse> {
        validate_params(&req)?;

        let txn = self.pool.begin().await?;
        let m = fetch_or_init_status(&txn, &self.defaults).await?;

        let old_ratio = m.time_ratio;
        let mut loan_changed = false;

        let mut am: status::ActiveModel = m.clone().into();
        if let Some(ratio) = req.time_ratio {
            if ratio != old_ratio {
                if let Some(start) = m.game_start_time {
                    let reference = m.paused_at.unwrap_or_else(Utc::now);
                    am.game_start_time =
                        Set(Some(rebase_start_time(start, reference, old_ratio, ratio)));
                }
                am.time_ratio = Set(ratio);
            }
        }
        if let Some(v) = req.total_days {
            am.total_days = Set(v);
        }
        if let Some(v) = req.initial_price {
            am.initial_price = Set(round2(v));
        }
        if let Some(v) = req.initial_cash {
            am.initial_cash = Set(round2(v));
        }
        if let Some(v) = req.max_leverage {
            am.max_leverage = Set(v);
        }
        if let Some(v) = req.daily_interest_rate {
            am.daily_interest_rate = Set(v);
            loan_changed = true;
        }
        if let Some(v) = req.max_loan_amount {
            am.max_loan_amount = Set(round2(v));
            loan_changed = true;
        }
        am.updated_at = Set(Some(Utc::now()));
        let updated = am.update(&txn).await?;
        txn.commit().await?;

        let state = state_of(&updated, Utc::now());
        self.hub
            .global_emit(evt::GAME_STATE_UPDATE, &GameStateUpdatePayload::from(&state));
        if loan_changed {
            self.hub.global_emit(
                evt::LOAN_CONFIG_UPDATE,
                &LoanConfigPayload {
                    daily_interest_rate: updated.daily_interest_rate,
                    max_loan_amount: updated.max_loan_amount,
                },
            );
        }
        Ok(state)
    }
}

fn validate_params(req: &UpdateParamsRequest) -> AppResult<()> {
    if let Some(v) = req.time_ratio {
        if v < 1 {
            return Err(AppError::Validation("time_ratio 必须 ≥ 1".to_string()));
        }
    }
    if let Some(v) = req.total_days {
        if v < 1 {
            return Err(AppError::Validation("total_days 必须 ≥ 1".to_string()));
        }
    }
    if let Some(v) = req.initial_price {
        if v <= Decimal::ZERO {
            return Err(AppError::Validation("initial_price 必须为正".to_string()));
        }
    }
    if let Some(v) = req.initial_cash {
        if v < Decimal::ZERO {
            return Err(AppError::Validation("initial_cash 不能为负".to_string()));
        }
    }
    if let Some(v) = req.max_leverage {
        if v < 1 {
            return Err(AppError::Validation("max_leverage 必须 ≥ 1".to_string()));
        }
    }
    if let Some(v) = req.daily_interest_rate {
        if v < Decimal::ZERO {
            return Err(AppError::Validation("daily_interest_rate 不能为负".to_string()));
        }
    }
    if let Some(v) = req.max_loan_amount {
        if v < Decimal::ZERO {
            return Err(AppError::Validation("max_loan_amount 不能为负".to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn status_row(
        started: bool,
        start: Option<DateTime<Utc>>,
        paused: Option<DateTime<Utc>>,
        ratio: i64,
        total: i32,
    ) -> status::Model {
        status::Model {
            id: 1,
            is_started: started,
            game_start_time: start,
            paused_at: paused,
            time_ratio: ratio,
            total_days: total,
            initial_price: Decimal::new(100, 0),
            initial_cash: Decimal::new(10_000, 0),
            max_leverage: 10,
            daily_interest_rate: Decimal::ZERO,
            max_loan_amount: Decimal::ZERO,
            updated_at: None,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_clock_never_started() {
        let m = status_row(false, None, None, 60, 120);
        let c = compute_clock(&m, at(0));
        assert_eq!(c.current_day, 0);
        assert_eq!(c.seconds_to_next_day, 0);
    }

    #[test]
    fn test_clock_day_and_countdown() {
        let m = status_row(true, Some(at(0)), None, 60, 120);
        // 第 1 日的第 10 秒
        let c = compute_clock(&m, at(10));
        assert_eq!(c.current_day, 1);
        assert_eq!(c.second_in_day, 10);
        assert_eq!(c.seconds_to_next_day, 50);
        // 第 3 日开头
        let c = compute_clock(&m, at(120));
        assert_eq!(c.current_day, 3);
        assert_eq!(c.seconds_to_next_day, 60);
    }

    #[test]
    fn test_clock_clamped_at_end_of_run() {
        let m = status_row(true, Some(at(0)), None, 60, 3);
        let c = compute_clock(&m, at(600));
        assert_eq!(c.current_day, 3);
        assert_eq!(c.seconds_to_next_day, 0);
    }

    #[test]
    fn test_clock_monotonic() {
        let m = status_row(true, Some(at(0)), None, 37, 50);
        let mut last = 0;
        for s in 0..2000 {
            let c = compute_clock(&m, at(s));
            assert!(c.current_day >= last);
            last = c.current_day;
        }
    }

    #[test]
    fn test_clock_frozen_while_paused() {
        let m = status_row(false, Some(at(0)), Some(at(90)), 60, 120);
        let a = compute_clock(&m, at(100));
        let b = compute_clock(&m, at(5000));
        assert_eq!(a, b);
        assert_eq!(a.current_day, 2);
    }

    #[test]
    fn test_pause_resume_round_trip() {
        // stop 在 t=90, resume 在 t=150: 开始时间平移 60 秒
        let start = at(0);
        let paused = at(90);
        let resumed = at(150);
        let shifted = start + (resumed - paused);

        let m = status_row(true, Some(shifted), None, 60, 120);
        // 恢复后 t=200, 相当于未暂停时的 t=140
        let c = compute_clock(&m, at(200));
        let unpaused = status_row(true, Some(start), None, 60, 120);
        let expected = compute_clock(&unpaused, at(140));
        assert_eq!(c, expected);
    }

    #[test]
    fn test_rebase_preserves_day_and_remaining() {
        // 第 3 日 (day_index=2), 日内已过 10 秒, 剩 50 秒
        let start = at(0);
        let reference = at(130);
        let new_start = rebase_start_time(start, reference, 60, 300);
        let m = status_row(true, Some(new_start), None, 300, 120);
        let c = compute_clock(&m, reference);
        assert_eq!(c.current_day, 3);
        assert_eq!(c.seconds_to_next_day, 50);
    }

    #[test]
    fn test_rebase_truncates_when_ratio_shrinks() {
        // 剩 50 秒但新比例只有 20 秒: 截断为 19 秒
        let start = at(0);
        let reference = at(130);
        let new_start = rebase_start_time(start, reference, 60, 20);
        let m = status_row(true, Some(new_start), None, 20, 120);
        let c = compute_clock(&m, reference);
        assert_eq!(c.current_day, 3);
        assert_eq!(c.seconds_to_next_day, 19);
    }
}
