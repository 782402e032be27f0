use crate::entities::{contract_order_entity as orders, user_entity as users};
use crate::error::{AppError, AppResult};
use crate::models::{
    AdminUpdateUserRequest, AssetsPayload, PaginatedResponse, PaginationParams, UserResponse,
};
use crate::utils::round2;
use crate::ws::{Hub, events as evt};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::json;

#[derive(Clone)]
pub struct UserService {
    pool: DatabaseConnection,
    hub: Hub,
}

impl UserService {
    pub fn new(pool: DatabaseConnection, hub: Hub) -> Self {
        Self { pool, hub }
    }

    pub async fn list_users(
        &self,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<UserResponse>> {
        let base = users::Entity::find();
        let total = base.clone().count(&self.pool).await? as i64;

        let rows = base
            .order_by_asc(users::Column::Id)
            .limit(params.get_limit())
            .offset(params.get_offset())
            .all(&self.pool)
            .await?;

        let items: Vec<UserResponse> = rows.into_iter().map(Into::into).collect();
        Ok(PaginatedResponse::new(
            items,
            params.page.unwrap_or(1),
            params.page_size.unwrap_or(20) as u32,
            total,
        ))
    }

    /// 管理端编辑用户, 变更即时推送到该用户的房间
    pub async fn admin_update_user(
        &self,
        user_id: i64,
        req: AdminUpdateUserRequest,
    ) -> AppResult<UserResponse> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;

        let mut am: users::ActiveModel = user.into();
        if let Some(name) = req.display_name {
            am.display_name = Set(name);
        }
        if let Some(cash) = req.cash {
            if cash < Decimal::ZERO {
                return Err(AppError::Validation("现金不能为负".to_string()));
            }
            am.cash = Set(round2(cash));
        }
        if let Some(stocks) = req.stocks {
            if stocks < 0 {
                return Err(AppError::Validation("持仓不能为负".to_string()));
            }
            am.stocks = Set(stocks);
        }
        if let Some(debt) = req.debt {
            if debt < Decimal::ZERO {
                return Err(AppError::Validation("负债不能为负".to_string()));
            }
            am.debt = Set(round2(debt));
        }
        if let Some(is_employee) = req.is_employee {
            am.is_employee = Set(is_employee);
        }
        if let Some(role) = req.role {
            am.role = Set(role);
        }
        am.updated_at = Set(Some(Utc::now()));
        let updated = am.update(&self.pool).await?;

        self.hub.to_user(
            updated.id,
            evt::USER_DATA_UPDATED,
            &UserResponse::from(updated.clone()),
        );
        self.hub
            .to_user(updated.id, evt::ASSETS_UPDATE, &AssetsPayload::from(&updated));
        Ok(updated.into())
    }

    /// 删除用户, 先删其合约满足外键; 已连接的会话收到强制登出
    pub async fn delete_user(&self, user_id: i64) -> AppResult<()> {
        let txn = self.pool.begin().await?;
        let user = users::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;

        orders::Entity::delete_many()
            .filter(orders::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;
        users::Entity::delete_by_id(user.id).exec(&txn).await?;
        txn.commit().await?;

        self.hub
            .to_user(user_id, evt::FORCE_LOGOUT, &json!({ "reason": "账号已被删除" }));
        log::info!("User {user_id} deleted by admin");
        Ok(())
    }

    /// 放贷鼠窝串门计数, 回执当前次数
    pub async fn visit_loan_shark(&self, user_id: i64) -> AppResult<serde_json::Value> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;

        let count = user.loan_shark_visit_count + 1;
        let mut am: users::ActiveModel = user.into();
        am.loan_shark_visit_count = Set(count);
        am.updated_at = Set(Some(Utc::now()));
        am.update(&self.pool).await?;

        Ok(json!({ "visitCount": count }))
    }

    pub async fn get_user(&self, user_id: i64) -> AppResult<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))
    }
}
