use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::StringLen;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum MiniGameType {
    #[serde(rename = "NONE")]
    None,
    #[serde(rename = "RED_ENVELOPE")]
    RedEnvelope,
    #[serde(rename = "QUIZ")]
    Quiz,
    #[serde(rename = "MINORITY")]
    Minority,
}

impl MiniGameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MiniGameType::None => "NONE",
            MiniGameType::RedEnvelope => "RED_ENVELOPE",
            MiniGameType::Quiz => "QUIZ",
            MiniGameType::Minority => "MINORITY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NONE" => Some(MiniGameType::None),
            "RED_ENVELOPE" => Some(MiniGameType::RedEnvelope),
            "QUIZ" => Some(MiniGameType::Quiz),
            "MINORITY" => Some(MiniGameType::Minority),
            _ => None,
        }
    }
}

/// 各游戏共享同一组阶段名, 具体可达集合由游戏类型约束
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum MiniGamePhase {
    #[serde(rename = "IDLE")]
    Idle,
    #[serde(rename = "SHUFFLE")]
    Shuffle,
    #[serde(rename = "PREPARE")]
    Prepare,
    #[serde(rename = "COUNTDOWN")]
    Countdown,
    #[serde(rename = "GAMING")]
    Gaming,
    #[serde(rename = "REVEAL")]
    Reveal,
    #[serde(rename = "RESULT")]
    Result,
}

impl MiniGamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            MiniGamePhase::Idle => "IDLE",
            MiniGamePhase::Shuffle => "SHUFFLE",
            MiniGamePhase::Prepare => "PREPARE",
            MiniGamePhase::Countdown => "COUNTDOWN",
            MiniGamePhase::Gaming => "GAMING",
            MiniGamePhase::Reveal => "REVEAL",
            MiniGamePhase::Result => "RESULT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "IDLE" => Some(MiniGamePhase::Idle),
            "SHUFFLE" => Some(MiniGamePhase::Shuffle),
            "PREPARE" => Some(MiniGamePhase::Prepare),
            "COUNTDOWN" => Some(MiniGamePhase::Countdown),
            "GAMING" => Some(MiniGamePhase::Gaming),
            "REVEAL" => Some(MiniGamePhase::Reveal),
            "RESULT" => Some(MiniGamePhase::Result),
            _ => None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PrizeType {
    #[sea_orm(string_value = "PHYSICAL")]
    #[serde(rename = "PHYSICAL")]
    Physical,
    #[sea_orm(string_value = "CASH")]
    #[serde(rename = "CASH")]
    Cash,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: i64,
    pub display_name: String,
    pub avatar: String,
}

/// 红包中的一个逻辑份额, 洗牌后按 0..N-1 重新编号
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Packet {
    pub index: usize,
    pub name: String,
    pub prize_type: PrizeType,
    pub prize_value: Decimal,
    pub is_taken: bool,
    pub owner_id: Option<i64>,
    pub is_scratched: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedEnvelopeRuntime {
    pub packets: Vec<Packet>,
    pub participants: Vec<Participant>,
    /// 现金奖励只发放一次
    pub prizes_credited: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub answer: String,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizRewards {
    pub first: Decimal,
    pub second: Decimal,
    pub third: Decimal,
    pub others: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizWinner {
    pub user_id: i64,
    pub display_name: String,
    pub rank: usize,
    pub reward: Decimal,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRuntime {
    pub question_id: i64,
    pub question: String,
    pub options: [String; 4],
    pub correct_answer: String,
    pub duration_secs: i64,
    pub rewards: QuizRewards,
    /// 按 (sort_order, id) 排序后紧随当前题目的下一题
    pub next_candidate_id: Option<i64>,
    pub answers: BTreeMap<i64, AnswerRecord>,
    pub winners: Vec<QuizWinner>,
    pub settled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinorityBet {
    pub option: String,
    pub amount: Decimal,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum MinorityStatus {
    #[serde(rename = "REFUND")]
    Refund,
    #[serde(rename = "HOUSE_WINS")]
    HouseWins,
    #[serde(rename = "STANDARD")]
    Standard,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MinorityOptionStats {
    pub option: String,
    pub count: usize,
    pub total_bet: Decimal,
    pub user_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MinorityUserResult {
    pub user_id: i64,
    pub option: String,
    pub stake: Decimal,
    /// 正数为盈利, 负数为实际扣除 (含转入负债部分)
    pub delta: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MinoritySettlement {
    pub status: MinorityStatus,
    pub winner_options: Vec<String>,
    pub loser_options: Vec<String>,
    pub options: Vec<MinorityOptionStats>,
    pub results: Vec<MinorityUserResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinorityRuntime {
    pub question_id: i64,
    pub question: String,
    pub options: [String; 4],
    pub duration_secs: i64,
    pub bets: BTreeMap<i64, MinorityBet>,
    pub settlement_result: Option<MinoritySettlement>,
    pub settled: bool,
}

/// WS: MINIGAME_ACTION (玩家)
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MiniGameActionPayload {
    #[serde(rename = "type")]
    pub action: String,
    pub packet_index: Option<usize>,
    pub answer: Option<String>,
    pub option: Option<String>,
    pub amount: Option<Decimal>,
}

/// WS: ADMIN_MINIGAME_ACTION (管理员)
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminMiniGameActionPayload {
    #[serde(rename = "type")]
    pub action: String,
    pub game_type: Option<MiniGameType>,
    pub question_id: Option<i64>,
}

/// WS: MINIGAME_SYNC — 运行时完整视图
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniGameSyncPayload {
    pub game_type: MiniGameType,
    pub phase: MiniGamePhase,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub red_envelope: Option<RedEnvelopeRuntime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minority: Option<serde_json::Value>,
}
