pub mod minority;
pub mod quiz;
pub mod red_envelope;

use crate::config::GameDefaults;
use crate::entities::{
    RUNTIME_KEY, minigame_runtime_entity as runtime, minority_question_entity as mq,
    quiz_question_entity as qq, red_envelope_item_entity as items, user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    AdminMiniGameActionPayload, AnswerRecord, AssetsPayload, MiniGameActionPayload, MiniGamePhase,
    MiniGameSyncPayload, MiniGameType, MinorityBet, MinorityRuntime, MinoritySettlement,
    MinorityStatus, MinorityUserResult, Participant, QuizRewards, QuizRuntime, QuizWinner,
    RedEnvelopeRuntime, UserRole,
};
use crate::services::game_service::{compute_clock, fetch_or_init_status};
use crate::services::leaderboard_service::LeaderboardService;
use crate::services::script_service::ScriptService;
use crate::utils::round2;
use crate::ws::{Hub, events as evt};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// 红包抢夺前的准备时长: 3 秒动画 + 3 秒倒计时
pub const TOTAL_PREP_TIME_SECS: i64 = 6;
pub const PREPARE_SECS: i64 = 5;
pub const COUNTDOWN_SECS: i64 = 3;
/// 抢答/投票截止后留给迟到消息的缓冲
pub const SETTLE_GRACE_SECS: i64 = 1;

/// 单一运行时槽位: 同一时刻至多一个小游戏
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiniGameState {
    pub game_type: MiniGameType,
    pub phase: MiniGamePhase,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub red: Option<RedEnvelopeRuntime>,
    pub quiz: Option<QuizRuntime>,
    pub minority: Option<MinorityRuntime>,
}

impl MiniGameState {
    pub fn idle() -> Self {
        Self {
            game_type: MiniGameType::None,
            phase: MiniGamePhase::Idle,
            start_time: None,
            end_time: None,
            red: None,
            quiz: None,
            minority: None,
        }
    }

    /// 对外完整视图; 抢答的正确答案与获胜名单在结算前不下发
    pub fn sync_payload(&self) -> MiniGameSyncPayload {
        MiniGameSyncPayload {
            game_type: self.game_type,
            phase: self.phase,
            start_time: self.start_time,
            end_time: self.end_time,
            red_envelope: self.red.clone(),
            quiz: self.quiz.as_ref().map(quiz_view),
            minority: self.minority.as_ref().map(minority_view),
        }
    }
}

fn quiz_view(q: &QuizRuntime) -> serde_json::Value {
    let mut v = json!({
        "questionId": q.question_id,
        "question": q.question,
        "options": q.options,
        "durationSecs": q.duration_secs,
        "answeredUserIds": q.answers.keys().collect::<Vec<_>>(),
        "nextCandidateId": q.next_candidate_id,
    });
    if q.settled {
        v["correctAnswer"] = json!(q.correct_answer);
        v["winners"] = json!(q.winners);
    }
    v
}

fn minority_view(m: &MinorityRuntime) -> serde_json::Value {
    let mut v = json!({
        "questionId": m.question_id,
        "question": m.question,
        "options": m.options,
        "durationSecs": m.duration_secs,
        "betCount": m.bets.len(),
    });
    if m.settled {
        v["settlementResult"] = json!(m.settlement_result);
    }
    v
}

struct EngineInner {
    pool: DatabaseConnection,
    hub: Hub,
    leaderboard: LeaderboardService,
    script: ScriptService,
    defaults: GameDefaults,
    state: Mutex<MiniGameState>,
    timer: StdMutex<Option<JoinHandle<()>>>,
}

/// 小游戏引擎: 三个状态机共用一个槽位
///
/// 所有状态变更都在 state 互斥锁内完成, 顺序固定为
/// 内存提交 → 落库快照 → 广播; 定时器从 end_time 推算,
/// 进程重启后可据快照重新布置
#[derive(Clone)]
pub struct MiniGameEngine {
    inner: Arc<EngineInner>,
}

impl MiniGameEngine {
    pub fn new(
        pool: DatabaseConnection,
        hub: Hub,
        leaderboard: LeaderboardService,
        script: ScriptService,
        defaults: GameDefaults,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                pool,
                hub,
                leaderboard,
                script,
                defaults,
                state: Mutex::new(MiniGameState::idle()),
                timer: StdMutex::new(None),
            }),
        }
    }

    // ------------------------------
    // 命令入口
    // ------------------------------

    /// 管理员命令; 非管理员来源记审计日志后忽略
    pub async fn handle_admin_action(
        &self,
        actor_id: i64,
        role: UserRole,
        payload: AdminMiniGameActionPayload,
    ) -> AppResult<()> {
        if role != UserRole::Admin {
            log::warn!(
                "Ignoring admin minigame action '{}' from non-admin user {actor_id}",
                payload.action
            );
            return Ok(());
        }

        match payload.action.as_str() {
            "RESET" => self.reset().await,
            "INIT" => {
                let game_type = payload
                    .game_type
                    .ok_or_else(|| AppError::Validation("缺少 gameType".to_string()))?;
                self.init(game_type, payload.question_id).await
            }
            "START_SHUFFLE" => self.start_shuffle().await,
            "START_GRAB" => self.start_grab().await,
            "REVEAL_RESULT" => self.reveal_result().await,
            "FORCE_REVEAL" => self.force_reveal().await,
            other => Err(AppError::Validation(format!("未知管理命令: {other}"))),
        }
    }

    /// 玩家动作
    pub async fn handle_action(
        &self,
        user_id: i64,
        payload: MiniGameActionPayload,
    ) -> AppResult<()> {
        match payload.action.as_str() {
            "GRAB_PACKET" => {
                let index = payload
                    .packet_index
                    .ok_or_else(|| AppError::Validation("缺少 packetIndex".to_string()))?;
                self.grab_packet(user_id, index).await
            }
            "SCRATCH_COMPLETE" => self.scratch_complete(user_id).await,
            "SUBMIT_ANSWER" => {
                let answer = payload
                    .answer
                    .ok_or_else(|| AppError::Validation("缺少 answer".to_string()))?;
                self.submit_answer(user_id, answer).await
            }
            "PLACE_BET" => {
                let option = payload
                    .option
                    .ok_or_else(|| AppError::Validation("缺少 option".to_string()))?;
                let amount = payload.amount.unwrap_or(Decimal::ZERO);
                self.place_bet(user_id, option, amount).await
            }
            other => Err(AppError::Validation(format!("未知玩家动作: {other}"))),
        }
    }

    // ------------------------------
    // 管理员命令实现
    // ------------------------------

    async fn reset(&self) -> AppResult<()> {
        self.cancel_timer();
        let mut state = self.inner.state.lock().await;
        *state = MiniGameState::idle();
        self.persist(&state).await?;
        self.broadcast_sync(&state);
        log::info!("Minigame slot reset");
        Ok(())
    }

    async fn init(&self, game_type: MiniGameType, question_id: Option<i64>) -> AppResult<()> {
        self.cancel_timer();
        match game_type {
            MiniGameType::RedEnvelope => self.init_red_envelope().await,
            MiniGameType::Quiz => {
                let qid = question_id
                    .ok_or_else(|| AppError::Validation("缺少 questionId".to_string()))?;
                self.init_quiz(qid).await
            }
            MiniGameType::Minority => {
                let qid = question_id
                    .ok_or_else(|| AppError::Validation("缺少 questionId".to_string()))?;
                self.init_minority(qid).await
            }
            MiniGameType::None => self.reset().await,
        }
    }

    async fn init_red_envelope(&self) -> AppResult<()> {
        let catalogue = items::Entity::find()
            .filter(items::Column::IsActive.eq(true))
            .order_by_asc(items::Column::DisplayOrder)
            .all(&self.inner.pool)
            .await?;
        let participants = self.load_participants().await?;

        let packets = {
            let mut rng = rand::rng();
            red_envelope::build_packets(
                &catalogue,
                participants.len(),
                &self.inner.defaults.consolation_prize,
                &mut rng,
            )
        };

        let mut state = self.inner.state.lock().await;
        *state = MiniGameState::idle();
        state.game_type = MiniGameType::RedEnvelope;
        state.red = Some(RedEnvelopeRuntime {
            packets,
            participants,
            prizes_credited: false,
        });
        self.persist(&state).await?;
        self.broadcast_sync(&state);
        Ok(())
    }

    async fn init_quiz(&self, question_id: i64) -> AppResult<()> {
        let question = qq::Entity::find_by_id(question_id)
            .one(&self.inner.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("quiz question {question_id}")))?;
        let next_candidate_id = self.next_quiz_candidate(&question).await?;

        let now = Utc::now();
        let mut state = self.inner.state.lock().await;
        *state = MiniGameState::idle();
        state.game_type = MiniGameType::Quiz;
        state.phase = MiniGamePhase::Prepare;
        state.start_time = Some(now);
        state.end_time = Some(now + Duration::seconds(PREPARE_SECS));
        state.quiz = Some(QuizRuntime {
            question_id: question.id,
            question: question.question.clone(),
            options: [
                question.option_a.clone(),
                question.option_b.clone(),
                question.option_c.clone(),
                question.option_d.clone(),
            ],
            correct_answer: question.correct_answer.clone(),
            duration_secs: question.duration_secs,
            rewards: QuizRewards {
                first: question.reward_first,
                second: question.reward_second,
                third: question.reward_third,
                others: question.reward_others,
            },
            next_candidate_id,
            answers: Default::default(),
            winners: Vec::new(),
            settled: false,
        });
        self.persist(&state).await?;
        self.broadcast_sync(&state);
        drop(state);

        self.arm_timer_at(now + Duration::seconds(PREPARE_SECS));
        Ok(())
    }

    /// 按 (sort_order, id) 排序取紧随当前题目的下一题
    async fn next_quiz_candidate(&self, current: &qq::Model) -> AppResult<Option<i64>> {
        let all = qq::Entity::find()
            .order_by_asc(qq::Column::SortOrder)
            .order_by_asc(qq::Column::Id)
            .all(&self.inner.pool)
            .await?;
        let next = all
            .iter()
            .find(|q| (q.sort_order, q.id) > (current.sort_order, current.id))
            .map(|q| q.id);
        Ok(next)
    }

    async fn init_minority(&self, question_id: i64) -> AppResult<()> {
        let question = mq::Entity::find_by_id(question_id)
            .one(&self.inner.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("minority question {question_id}")))?;

        let now = Utc::now();
        let mut state = self.inner.state.lock().await;
        *state = MiniGameState::idle();
        state.game_type = MiniGameType::Minority;
        state.phase = MiniGamePhase::Prepare;
        state.start_time = Some(now);
        state.end_time = Some(now + Duration::seconds(PREPARE_SECS));
        state.minority = Some(MinorityRuntime {
            question_id: question.id,
            question: question.question.clone(),
            options: [
                question.option_a.clone(),
                question.option_b.clone(),
                question.option_c.clone(),
                question.option_d.clone(),
            ],
            duration_secs: question.duration_secs,
            bets: Default::default(),
            settlement_result: None,
            settled: false,
        });
        self.persist(&state).await?;
        self.broadcast_sync(&state);
        drop(state);

        self.arm_timer_at(now + Duration::seconds(PREPARE_SECS));
        Ok(())
    }

    async fn start_shuffle(&self) -> AppResult<()> {
        let participants = self.load_participants().await?;
        let mut state = self.inner.state.lock().await;
        if state.game_type != MiniGameType::RedEnvelope {
            return Err(AppError::Precondition("当前不是红包游戏".to_string()));
        }
        let red = state
            .red
            .as_mut()
            .ok_or_else(|| AppError::Precondition("红包未初始化".to_string()))?;
        red.participants = participants;
        state.phase = MiniGamePhase::Shuffle;
        self.persist(&state).await?;
        self.broadcast_sync(&state);
        Ok(())
    }

    async fn start_grab(&self) -> AppResult<()> {
        let now = Utc::now();
        let end = now + Duration::seconds(TOTAL_PREP_TIME_SECS);
        {
            let mut state = self.inner.state.lock().await;
            if state.game_type != MiniGameType::RedEnvelope
                || state.phase != MiniGamePhase::Shuffle
            {
                return Err(AppError::Precondition("请先洗牌".to_string()));
            }
            state.phase = MiniGamePhase::Countdown;
            state.start_time = Some(now);
            state.end_time = Some(end);
            self.persist(&state).await?;
            self.broadcast_sync(&state);
        }
        self.arm_timer_at(end);
        Ok(())
    }

    /// 现金红包一次性入账并进入 REVEAL
    async fn reveal_result(&self) -> AppResult<()> {
        let mut state = self.inner.state.lock().await;
        if state.game_type != MiniGameType::RedEnvelope || state.phase != MiniGamePhase::Gaming {
            return Err(AppError::Precondition("当前不在抢红包阶段".to_string()));
        }
        let red = state
            .red
            .as_mut()
            .ok_or_else(|| AppError::Precondition("红包未初始化".to_string()))?;
        if red.prizes_credited {
            return Err(AppError::Precondition("奖励已发放".to_string()));
        }

        // 全部现金红包在同一个事务内入账
        let mut credited: Vec<(i64, AssetsPayload)> = Vec::new();
        let txn = self.inner.pool.begin().await?;
        for packet in red.packets.iter().filter(|p| {
            p.is_taken
                && p.prize_type == crate::models::PrizeType::Cash
                && p.prize_value > Decimal::ZERO
        }) {
            let Some(owner_id) = packet.owner_id else {
                continue;
            };
            let user = users::Entity::find_by_id(owner_id)
                .lock_exclusive()
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("user {owner_id}")))?;
            let new_cash = round2(user.cash + packet.prize_value);
            let mut am: users::ActiveModel = user.into();
            am.cash = Set(new_cash);
            am.updated_at = Set(Some(Utc::now()));
            let updated = am.update(&txn).await?;
            credited.push((owner_id, AssetsPayload::from(&updated)));
        }
        txn.commit().await?;

        red.prizes_credited = true;
        state.phase = MiniGamePhase::Reveal;
        self.persist(&state).await?;
        self.broadcast_sync(&state);
        for (user_id, assets) in credited {
            self.inner.hub.to_user(user_id, evt::ASSETS_UPDATE, &assets);
        }
        Ok(())
    }

    async fn force_reveal(&self) -> AppResult<()> {
        let mut state = self.inner.state.lock().await;
        if state.game_type != MiniGameType::RedEnvelope || state.phase != MiniGamePhase::Reveal {
            return Err(AppError::Precondition("当前不在开奖阶段".to_string()));
        }
        state.phase = MiniGamePhase::Result;
        self.persist(&state).await?;
        self.inner
            .hub
            .global_emit(evt::MINIGAME_EVENT, &json!({ "type": "ALL_SCRATCHED" }));
        self.broadcast_sync(&state);
        Ok(())
    }

    // ------------------------------
    // 玩家动作实现
    // ------------------------------

    /// 抢红包: 判定与写入在同一临界区, 每人至多一个
    async fn grab_packet(&self, user_id: i64, index: usize) -> AppResult<()> {
        let mut state = self.inner.state.lock().await;
        if state.game_type != MiniGameType::RedEnvelope || state.phase != MiniGamePhase::Gaming {
            return Err(AppError::Precondition("当前不在抢红包阶段".to_string()));
        }
        let red = state
            .red
            .as_mut()
            .ok_or_else(|| AppError::Precondition("红包未初始化".to_string()))?;

        if red.packets.iter().any(|p| p.owner_id == Some(user_id)) {
            return Err(AppError::Conflict("你已经抢到一个红包".to_string()));
        }
        let packet = red
            .packets
            .get_mut(index)
            .ok_or_else(|| AppError::Validation(format!("红包 {index} 不存在")))?;
        if packet.is_taken {
            return Err(AppError::Conflict("红包已被抢走".to_string()));
        }
        packet.is_taken = true;
        packet.owner_id = Some(user_id);

        self.persist(&state).await?;
        self.inner.hub.global_emit(
            evt::MINIGAME_EVENT,
            &json!({ "type": "PACKET_TAKEN", "packetIndex": index, "userId": user_id }),
        );
        self.broadcast_sync(&state);
        Ok(())
    }

    async fn scratch_complete(&self, user_id: i64) -> AppResult<()> {
        let mut state = self.inner.state.lock().await;
        if state.game_type != MiniGameType::RedEnvelope || state.phase != MiniGamePhase::Reveal {
            return Err(AppError::Precondition("当前不在开奖阶段".to_string()));
        }
        let red = state
            .red
            .as_mut()
            .ok_or_else(|| AppError::Precondition("红包未初始化".to_string()))?;
        let packet = red
            .packets
            .iter_mut()
            .find(|p| p.owner_id == Some(user_id))
            .ok_or_else(|| AppError::NotFound("你没有抢到红包".to_string()))?;
        packet.is_scratched = true;

        let all_done = red_envelope::all_taken_scratched(&red.packets);
        if all_done {
            state.phase = MiniGamePhase::Result;
        }
        self.persist(&state).await?;
        if all_done {
            self.inner
                .hub
                .global_emit(evt::MINIGAME_EVENT, &json!({ "type": "ALL_SCRATCHED" }));
        }
        self.broadcast_sync(&state);
        Ok(())
    }

    /// 抢答: 每人一次, 带时间戳
    async fn submit_answer(&self, user_id: i64, answer: String) -> AppResult<()> {
        if !matches!(answer.as_str(), "A" | "B" | "C" | "D") {
            return Err(AppError::Validation("答案必须是 A/B/C/D".to_string()));
        }
        let mut state = self.inner.state.lock().await;
        if state.game_type != MiniGameType::Quiz || state.phase != MiniGamePhase::Gaming {
            return Err(AppError::Precondition("当前不在答题阶段".to_string()));
        }
        let quiz = state
            .quiz
            .as_mut()
            .ok_or_else(|| AppError::Precondition("题目未初始化".to_string()))?;
        if quiz.answers.contains_key(&user_id) {
            return Err(AppError::Conflict("你已经作答".to_string()));
        }
        quiz.answers.insert(
            user_id,
            AnswerRecord {
                answer,
                answered_at: Utc::now(),
            },
        );
        self.persist(&state).await?;
        self.inner.hub.to_user(
            user_id,
            evt::MINIGAME_EVENT,
            &json!({ "type": "ANSWER_ACCEPTED" }),
        );
        Ok(())
    }

    /// 少数派投注: 可反复提交, 后注覆盖前注, 提交时不动钱
    async fn place_bet(&self, user_id: i64, option: String, amount: Decimal) -> AppResult<()> {
        if !matches!(option.as_str(), "A" | "B" | "C" | "D") {
            return Err(AppError::Validation("选项必须是 A/B/C/D".to_string()));
        }
        let amount = round2(amount);
        if amount < Decimal::ZERO {
            return Err(AppError::Validation("投注金额不能为负".to_string()));
        }
        if amount > Decimal::ZERO {
            // 提交时校验余额, 真正扣款发生在结算时以库内行为准
            let user = users::Entity::find_by_id(user_id)
                .one(&self.inner.pool)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;
            if user.cash < amount {
                return Err(AppError::InsufficientFunds);
            }
        }

        let mut state = self.inner.state.lock().await;
        if state.game_type != MiniGameType::Minority || state.phase != MiniGamePhase::Gaming {
            return Err(AppError::Precondition("当前不在投注阶段".to_string()));
        }
        let minority = state
            .minority
            .as_mut()
            .ok_or_else(|| AppError::Precondition("题目未初始化".to_string()))?;
        minority.bets.insert(
            user_id,
            MinorityBet {
                option: option.clone(),
                amount,
                placed_at: Utc::now(),
            },
        );
        self.persist(&state).await?;
        self.inner.hub.to_user(
            user_id,
            evt::MINIGAME_EVENT,
            &json!({ "type": "BET_ACCEPTED", "option": option, "amount": amount }),
        );
        Ok(())
    }

    // ------------------------------
    // 定时器与阶段推进
    // ------------------------------

    fn cancel_timer(&self) {
        let mut slot = self.inner.timer.lock().expect("timer lock poisoned");
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }

    /// 在指定时刻触发一次阶段推进; 已到期则立即触发
    fn arm_timer_at(&self, fire_at: DateTime<Utc>) {
        self.cancel_timer();
        let engine = self.clone();
        let handle = tokio::spawn(async move {
            let delay = (fire_at - Utc::now()).num_milliseconds().max(0) as u64;
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            engine.on_timer_fired().await;
        });
        *self.inner.timer.lock().expect("timer lock poisoned") = Some(handle);
    }

    async fn on_timer_fired(&self) {
        let (game_type, phase) = {
            let state = self.inner.state.lock().await;
            (state.game_type, state.phase)
        };
        let result = match (game_type, phase) {
            (MiniGameType::RedEnvelope, MiniGamePhase::Countdown) => self.red_enter_gaming().await,
            (MiniGameType::Quiz | MiniGameType::Minority, MiniGamePhase::Prepare) => {
                self.enter_countdown().await
            }
            // 进程重启后倒计时阶段直接推进到答题
            (MiniGameType::Quiz | MiniGameType::Minority, MiniGamePhase::Countdown) => {
                self.enter_gaming().await
            }
            (MiniGameType::Quiz, MiniGamePhase::Gaming) => self.settle_quiz().await,
            (MiniGameType::Minority, MiniGamePhase::Gaming) => self.settle_minority().await,
            _ => Ok(()),
        };
        if let Err(e) = result {
            // 失败不做部分推进, 等下一条管理命令或重启恢复来纠正
            log::error!("Minigame phase transition failed ({game_type:?}/{phase:?}): {e}");
        }
    }

    async fn red_enter_gaming(&self) -> AppResult<()> {
        let mut state = self.inner.state.lock().await;
        state.phase = MiniGamePhase::Gaming;
        state.start_time = Some(Utc::now());
        state.end_time = None;
        self.persist(&state).await?;
        self.broadcast_sync(&state);
        Ok(())
    }

    /// 进入 3 秒倒计时, 每秒广播一次 3..0
    async fn enter_countdown(&self) -> AppResult<()> {
        let now = Utc::now();
        {
            let mut state = self.inner.state.lock().await;
            state.phase = MiniGamePhase::Countdown;
            state.start_time = Some(now);
            state.end_time = Some(now + Duration::seconds(COUNTDOWN_SECS));
            self.persist(&state).await?;
            self.broadcast_sync(&state);
        }

        self.cancel_timer();
        let engine = self.clone();
        let handle = tokio::spawn(async move {
            for n in (0..=COUNTDOWN_SECS).rev() {
                engine
                    .inner
                    .hub
                    .global_emit(evt::MINIGAME_COUNTDOWN, &json!({ "countdown": n }));
                if n > 0 {
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                }
            }
            if let Err(e) = engine.enter_gaming().await {
                log::error!("Entering gaming phase failed: {e}");
            }
        });
        *self.inner.timer.lock().expect("timer lock poisoned") = Some(handle);
        Ok(())
    }

    async fn enter_gaming(&self) -> AppResult<()> {
        let now = Utc::now();
        let end = {
            let mut state = self.inner.state.lock().await;
            let duration = match state.game_type {
                MiniGameType::Quiz => state.quiz.as_ref().map(|q| q.duration_secs),
                MiniGameType::Minority => state.minority.as_ref().map(|m| m.duration_secs),
                _ => None,
            }
            .ok_or_else(|| AppError::Precondition("题目未初始化".to_string()))?;

            let end = now + Duration::seconds(duration.max(1));
            state.phase = MiniGamePhase::Gaming;
            state.start_time = Some(now);
            state.end_time = Some(end);
            self.persist(&state).await?;
            self.broadcast_sync(&state);
            end
        };
        self.arm_timer_at(end + Duration::seconds(SETTLE_GRACE_SECS));
        Ok(())
    }

    // ------------------------------
    // 结算
    // ------------------------------

    async fn settle_quiz(&self) -> AppResult<()> {
        let mut state = self.inner.state.lock().await;
        if state.game_type != MiniGameType::Quiz || state.phase != MiniGamePhase::Gaming {
            return Ok(());
        }
        let end_time = state.end_time.unwrap_or_else(Utc::now);
        let quiz = state
            .quiz
            .as_mut()
            .ok_or_else(|| AppError::Precondition("题目未初始化".to_string()))?;
        if quiz.settled {
            return Ok(());
        }

        // 答对者按提交时间排序
        let mut correct: Vec<(i64, DateTime<Utc>)> = quiz
            .answers
            .iter()
            .filter(|(_, rec)| rec.answer == quiz.correct_answer)
            .map(|(uid, rec)| (*uid, rec.answered_at))
            .collect();
        correct.sort_by_key(|(uid, ts)| (*ts, *uid));

        let duration = quiz.duration_secs;
        let rewards = quiz.rewards.clone();
        let planned: Vec<(i64, usize, Decimal, DateTime<Utc>)> = correct
            .iter()
            .enumerate()
            .map(|(rank, (uid, ts))| {
                (
                    *uid,
                    rank,
                    quiz::quiz_reward(rank, &rewards, duration, end_time, *ts),
                    *ts,
                )
            })
            .collect();

        // 一个事务内给全部答对者加钱
        let mut winners: Vec<QuizWinner> = Vec::new();
        let mut assets: Vec<(i64, AssetsPayload)> = Vec::new();
        let txn = self.inner.pool.begin().await?;
        for (uid, rank, reward, ts) in &planned {
            let user = users::Entity::find_by_id(*uid)
                .lock_exclusive()
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("user {uid}")))?;
            let new_cash = round2(user.cash + reward);
            let display_name = user.display_name.clone();
            let mut am: users::ActiveModel = user.into();
            am.cash = Set(new_cash);
            am.updated_at = Set(Some(Utc::now()));
            let updated = am.update(&txn).await?;
            winners.push(QuizWinner {
                user_id: *uid,
                display_name,
                rank: rank + 1,
                reward: *reward,
                answered_at: *ts,
            });
            assets.push((*uid, AssetsPayload::from(&updated)));
        }
        txn.commit().await?;

        quiz.winners = winners;
        quiz.settled = true;
        state.phase = MiniGamePhase::Result;
        self.persist(&state).await?;
        self.broadcast_sync(&state);
        drop(state);

        self.fresh_leaderboard().await;
        for (uid, payload) in assets {
            self.inner.hub.to_user(uid, evt::ASSETS_UPDATE, &payload);
        }
        Ok(())
    }

    async fn settle_minority(&self) -> AppResult<()> {
        let mut state = self.inner.state.lock().await;
        if state.game_type != MiniGameType::Minority || state.phase != MiniGamePhase::Gaming {
            return Ok(());
        }
        let minority = state
            .minority
            .as_mut()
            .ok_or_else(|| AppError::Precondition("题目未初始化".to_string()))?;
        if minority.settled {
            return Ok(());
        }

        let stats = minority::tally(&minority.bets);
        let (status, winner_options, loser_options) = minority::decide(&stats);

        let winner_pool: Decimal = stats
            .iter()
            .filter(|s| winner_options.contains(&s.option))
            .map(|s| s.total_bet)
            .sum();
        let loser_pool: Decimal = stats
            .iter()
            .filter(|s| loser_options.contains(&s.option))
            .map(|s| s.total_bet)
            .sum();

        // 所有资金变动在一个事务内, 以事务中读到的行为准
        let mut results: Vec<MinorityUserResult> = Vec::new();
        let mut assets: Vec<(i64, AssetsPayload)> = Vec::new();
        let txn = self.inner.pool.begin().await?;
        for (uid, bet) in &minority.bets {
            let user = users::Entity::find_by_id(*uid)
                .lock_exclusive()
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("user {uid}")))?;

            let (new_cash, new_debt, delta) = match status {
                MinorityStatus::Refund => (user.cash, user.debt, Decimal::ZERO),
                MinorityStatus::HouseWins => minority::apply_loss(user.cash, user.debt, bet.amount),
                MinorityStatus::Standard => {
                    if winner_options.contains(&bet.option) {
                        let profit = minority::winner_profit(bet.amount, winner_pool, loser_pool);
                        (round2(user.cash + profit), user.debt, profit)
                    } else {
                        minority::apply_loss(user.cash, user.debt, bet.amount)
                    }
                }
            };

            if new_cash != user.cash || new_debt != user.debt {
                let mut am: users::ActiveModel = user.clone().into();
                am.cash = Set(new_cash);
                am.debt = Set(new_debt);
                am.updated_at = Set(Some(Utc::now()));
                am.update(&txn).await?;
            }

            results.push(MinorityUserResult {
                user_id: *uid,
                option: bet.option.clone(),
                stake: bet.amount,
                delta,
            });
            assets.push((
                *uid,
                AssetsPayload {
                    cash: new_cash,
                    stocks: user.stocks,
                    debt: new_debt,
                    daily_borrowed: user.daily_borrowed,
                },
            ));
        }
        txn.commit().await?;

        minority.settlement_result = Some(MinoritySettlement {
            status,
            winner_options,
            loser_options,
            options: stats,
            results,
        });
        minority.settled = true;
        state.phase = MiniGamePhase::Result;
        self.persist(&state).await?;
        self.broadcast_sync(&state);
        drop(state);

        self.fresh_leaderboard().await;
        for (uid, payload) in assets {
            self.inner.hub.to_user(uid, evt::ASSETS_UPDATE, &payload);
        }
        Ok(())
    }

    async fn fresh_leaderboard(&self) {
        let status = match fetch_or_init_status(&self.inner.pool, &self.inner.defaults).await {
            Ok(s) => s,
            Err(e) => {
                log::error!("Leaderboard refresh failed, cannot read game status: {e}");
                return;
            }
        };
        let clock = compute_clock(&status, Utc::now());
        let price = self
            .inner
            .script
            .price_for_day(clock.current_day, status.initial_price);
        match self.inner.leaderboard.top(clock.current_day, price).await {
            Ok(rows) => self
                .inner
                .hub
                .global_emit(evt::LEADERBOARD_UPDATE, &json!({ "data": rows })),
            Err(e) => log::error!("Leaderboard refresh failed: {e}"),
        }
    }

    // ------------------------------
    // 快照与恢复
    // ------------------------------

    fn broadcast_sync(&self, state: &MiniGameState) {
        self.inner
            .hub
            .global_emit(evt::MINIGAME_SYNC, &state.sync_payload());
    }

    async fn persist(&self, state: &MiniGameState) -> AppResult<()> {
        let payload = json!({
            "red": state.red,
            "quiz": state.quiz,
            "minority": state.minority,
        });
        let existing = runtime::Entity::find_by_id(RUNTIME_KEY.to_string())
            .one(&self.inner.pool)
            .await?;
        match existing {
            Some(m) => {
                let mut am: runtime::ActiveModel = m.into();
                am.game_type = Set(state.game_type.as_str().to_string());
                am.phase = Set(state.phase.as_str().to_string());
                am.start_time = Set(state.start_time);
                am.end_time = Set(state.end_time);
                am.payload = Set(Some(payload));
                am.updated_at = Set(Some(Utc::now()));
                am.update(&self.inner.pool).await?;
            }
            None => {
                runtime::ActiveModel {
                    key: Set(RUNTIME_KEY.to_string()),
                    game_type: Set(state.game_type.as_str().to_string()),
                    phase: Set(state.phase.as_str().to_string()),
                    start_time: Set(state.start_time),
                    end_time: Set(state.end_time),
                    payload: Set(Some(payload)),
                    updated_at: Set(Some(Utc::now())),
                }
                .insert(&self.inner.pool)
                .await?;
            }
        }
        Ok(())
    }

    /// 进程启动时恢复快照并重新布置定时器;
    /// 已过期的阶段立即触发推进/结算
    pub async fn rehydrate(&self) -> AppResult<()> {
        let Some(row) = runtime::Entity::find_by_id(RUNTIME_KEY.to_string())
            .one(&self.inner.pool)
            .await?
        else {
            return Ok(());
        };

        let game_type = MiniGameType::parse(&row.game_type).unwrap_or(MiniGameType::None);
        let phase = MiniGamePhase::parse(&row.phase).unwrap_or(MiniGamePhase::Idle);
        if game_type == MiniGameType::None {
            return Ok(());
        }

        #[derive(Deserialize, Default)]
        struct PayloadParts {
            red: Option<RedEnvelopeRuntime>,
            quiz: Option<QuizRuntime>,
            minority: Option<MinorityRuntime>,
        }
        let parts: PayloadParts = row
            .payload
            .clone()
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();

        let end_time = row.end_time;
        {
            let mut state = self.inner.state.lock().await;
            *state = MiniGameState {
                game_type,
                phase,
                start_time: row.start_time,
                end_time,
                red: parts.red,
                quiz: parts.quiz,
                minority: parts.minority,
            };
        }

        if let Some(end) = end_time {
            match phase {
                MiniGamePhase::Prepare | MiniGamePhase::Countdown => self.arm_timer_at(end),
                MiniGamePhase::Gaming if game_type != MiniGameType::RedEnvelope => {
                    self.arm_timer_at(end + Duration::seconds(SETTLE_GRACE_SECS))
                }
                _ => {}
            }
        }
        log::info!("Minigame runtime rehydrated: {game_type:?}/{phase:?}");
        Ok(())
    }

    // ------------------------------
    // 辅助
    // ------------------------------

    async fn load_participants(&self) -> AppResult<Vec<Participant>> {
        let rows = users::Entity::find()
            .filter(users::Column::IsEmployee.eq(true))
            .order_by_asc(users::Column::Id)
            .all(&self.inner.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|u| Participant {
                user_id: u.id,
                display_name: u.display_name,
                avatar: u.avatar,
            })
            .collect())
    }

    /// 当前运行时视图 (连接同步等场景)
    pub async fn current_sync(&self) -> MiniGameSyncPayload {
        self.inner.state.lock().await.sync_payload()
    }
}
