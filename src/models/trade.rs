use crate::entities::contract_order_entity;
use rust_decimal::Decimal;
use sea_orm::sea_query::StringLen;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
pub enum ContractType {
    #[sea_orm(string_value = "LONG")]
    #[serde(rename = "LONG")]
    Long,
    #[sea_orm(string_value = "SHORT")]
    #[serde(rename = "SHORT")]
    Short,
}

/// WS: BUY_STOCK / SELL_STOCK
#[derive(Debug, Deserialize, ToSchema)]
pub struct SpotPayload {
    pub quantity: i64,
}

/// WS: BUY_CONTRACT
#[derive(Debug, Deserialize, ToSchema)]
pub struct BuyContractPayload {
    #[serde(rename = "type")]
    pub order_type: ContractType,
    pub leverage: i32,
    pub quantity: i64,
}

/// WS: BORROW_MONEY / REPAY_MONEY
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoanPayload {
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContractOrderResponse {
    pub id: i64,
    pub day: i32,
    #[serde(rename = "type")]
    pub order_type: ContractType,
    pub leverage: i32,
    pub quantity: i64,
    pub margin: Decimal,
    pub entry_price: Decimal,
}

impl From<&contract_order_entity::Model> for ContractOrderResponse {
    fn from(m: &contract_order_entity::Model) -> Self {
        Self {
            id: m.id,
            day: m.day,
            order_type: m.order_type,
            leverage: m.leverage,
            quantity: m.quantity,
            margin: m.margin,
            entry_price: m.entry_price,
        }
    }
}

/// WS: TRADE_SUCCESS (动作相关字段按需填充)
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TradeSuccessPayload {
    pub action: String,
    pub cash: Decimal,
    pub stocks: i64,
    pub debt: Decimal,
    pub daily_borrowed: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<ContractOrderResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded: Option<Decimal>,
}

/// WS: CONTRACT_SETTLED
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContractSettledPayload {
    #[serde(rename = "type")]
    pub order_type: ContractType,
    pub quantity: i64,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub pnl: Decimal,
    pub new_cash: Decimal,
    pub new_debt: Decimal,
}
