use crate::models::ContractType;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 杠杆合约订单
/// is_settled 与 is_cancelled 互斥, 任一置位后订单进入终态
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contract_orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub day: i32,
    pub order_type: ContractType,
    pub leverage: i32,
    pub quantity: i64,
    pub margin: Decimal,
    pub entry_price: Decimal,
    pub is_settled: bool,
    pub is_cancelled: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Model {
    /// 是否仍持有 (未结算未撤销)
    pub fn is_open(&self) -> bool {
        !self.is_settled && !self.is_cancelled
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
