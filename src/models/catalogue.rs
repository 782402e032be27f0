use crate::models::PrizeType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QuizQuestionRequest {
    pub question: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    /// A/B/C/D
    pub correct_answer: String,
    pub duration_secs: i64,
    #[serde(default)]
    pub sort_order: i32,
    pub reward_first: Decimal,
    pub reward_second: Decimal,
    pub reward_third: Decimal,
    pub reward_others: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MinorityQuestionRequest {
    pub question: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub duration_secs: i64,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RedEnvelopeItemRequest {
    pub name: String,
    pub prize_type: PrizeType,
    pub prize_value: Decimal,
    pub amount: i32,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}
