use crate::config::GameDefaults;
use crate::entities::user_entity as users;
use crate::error::{AppError, AppResult};
use crate::models::{
    AuthResponse, LoginRequest, RegisterRequest, UpdateAccountRequest, UpdateAvatarRequest,
    UserResponse, UserRole,
};
use crate::services::game_service::fetch_or_init_status;
use crate::utils::{JwtService, hash_password, validate_password, verify_password};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

#[derive(Clone)]
pub struct AuthService {
    pool: DatabaseConnection,
    jwt: JwtService,
    admin_secret: String,
    defaults: GameDefaults,
}

impl AuthService {
    pub fn new(
        pool: DatabaseConnection,
        jwt: JwtService,
        admin_secret: String,
        defaults: GameDefaults,
    ) -> Self {
        Self {
            pool,
            jwt,
            admin_secret,
            defaults,
        }
    }

    /// 注册: 初始现金取当前游戏参数; 携带正确的 admin_key 时创建管理员
    pub async fn register(&self, req: RegisterRequest) -> AppResult<AuthResponse> {
        let username = req.username.trim();
        if username.len() < 2 || username.len() > 32 {
            return Err(AppError::Validation(
                "用户名长度必须在2-32字符之间".to_string(),
            ));
        }
        validate_password(&req.password)?;

        let role = match req.admin_key.as_deref() {
            None | Some("") => UserRole::User,
            Some(key) if !self.admin_secret.is_empty() && key == self.admin_secret => {
                UserRole::Admin
            }
            Some(_) => return Err(AppError::Permission),
        };

        let txn = self.pool.begin().await?;

        let exists = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&txn)
            .await?;
        if exists.is_some() {
            return Err(AppError::Conflict("用户名已被占用".to_string()));
        }

        let status = fetch_or_init_status(&txn, &self.defaults).await?;
        let display_name = req
            .display_name
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| username.to_string());

        let user = users::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(hash_password(&req.password)?),
            display_name: Set(display_name),
            avatar: Set(String::new()),
            role: Set(role),
            cash: Set(status.initial_cash),
            stocks: Set(0),
            debt: Set(Default::default()),
            daily_borrowed: Set(Default::default()),
            first_sign_in: Set(false),
            is_employee: Set(false),
            avatar_update_count: Set(0),
            loan_shark_visit_count: Set(0),
            created_at: Set(Some(Utc::now())),
            updated_at: Set(Some(Utc::now())),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        log::info!("User registered: {} ({})", user.username, user.role);
        self.issue(user)
    }

    pub async fn login(&self, req: LoginRequest) -> AppResult<AuthResponse> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(req.username.trim()))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::Auth("用户名或密码错误".to_string()))?;

        if !verify_password(&req.password, &user.password_hash)? {
            return Err(AppError::Auth("用户名或密码错误".to_string()));
        }

        // 首次登录打标, 重开一局时统一清除
        let user = if user.first_sign_in {
            user
        } else {
            let mut am: users::ActiveModel = user.into();
            am.first_sign_in = Set(true);
            am.updated_at = Set(Some(Utc::now()));
            am.update(&self.pool).await?
        };

        self.issue(user)
    }

    pub async fn me(&self, user_id: i64) -> AppResult<UserResponse> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;
        Ok(user.into())
    }

    pub async fn update_avatar(
        &self,
        user_id: i64,
        req: UpdateAvatarRequest,
    ) -> AppResult<UserResponse> {
        if req.avatar.len() > 255 {
            return Err(AppError::Validation("头像地址过长".to_string()));
        }
        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;

        let count = user.avatar_update_count;
        let mut am: users::ActiveModel = user.into();
        am.avatar = Set(req.avatar);
        am.avatar_update_count = Set(count + 1);
        am.updated_at = Set(Some(Utc::now()));
        Ok(am.update(&self.pool).await?.into())
    }

    pub async fn update_account(
        &self,
        user_id: i64,
        req: UpdateAccountRequest,
    ) -> AppResult<UserResponse> {
        if req.display_name.is_none() && req.password.is_none() {
            return Err(AppError::Validation("没有需要更新的字段".to_string()));
        }
        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;

        let mut am: users::ActiveModel = user.into();
        if let Some(name) = req.display_name {
            let name = name.trim().to_string();
            if name.is_empty() || name.len() > 64 {
                return Err(AppError::Validation("昵称长度必须在1-64字符之间".to_string()));
            }
            am.display_name = Set(name);
        }
        if let Some(password) = req.password {
            validate_password(&password)?;
            am.password_hash = Set(hash_password(&password)?);
        }
        am.updated_at = Set(Some(Utc::now()));
        Ok(am.update(&self.pool).await?.into())
    }

    fn issue(&self, user: users::Model) -> AppResult<AuthResponse> {
        let token = self.jwt.generate_token(user.id, user.role)?;
        Ok(AuthResponse {
            token,
            expires_in: self.jwt.expires_in(),
            user: user.into(),
        })
    }
}
