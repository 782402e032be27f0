use crate::entities::{
    event_entity as events, minority_question_entity as mq, quiz_question_entity as qq,
    red_envelope_item_entity as items,
};
use crate::error::{AppError, AppResult};
use crate::models::{EventRequest, MinorityQuestionRequest, QuizQuestionRequest, RedEnvelopeItemRequest};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};

/// 管理端目录维护: 剧本事件 / 抢答题 / 少数派题 / 红包奖品
#[derive(Clone)]
pub struct CatalogueService {
    pool: DatabaseConnection,
}

impl CatalogueService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    // ---- 剧本事件 ----

    pub async fn list_events(&self) -> AppResult<Vec<events::Model>> {
        Ok(events::Entity::find()
            .order_by_asc(events::Column::Day)
            .order_by_asc(events::Column::Id)
            .all(&self.pool)
            .await?)
    }

    pub async fn create_event(&self, req: EventRequest) -> AppResult<events::Model> {
        validate_event(&req)?;
        Ok(events::ActiveModel {
            day: Set(req.day),
            title: Set(req.title),
            news: Set(req.news),
            trend: Set(req.trend),
            created_at: Set(Some(Utc::now())),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?)
    }

    pub async fn update_event(&self, id: i64, req: EventRequest) -> AppResult<events::Model> {
        validate_event(&req)?;
        let model = events::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("event {id}")))?;
        let mut am: events::ActiveModel = model.into();
        am.day = Set(req.day);
        am.title = Set(req.title);
        am.news = Set(req.news);
        am.trend = Set(req.trend);
        Ok(am.update(&self.pool).await?)
    }

    pub async fn delete_event(&self, id: i64) -> AppResult<()> {
        let res = events::Entity::delete_by_id(id).exec(&self.pool).await?;
        if res.rows_affected == 0 {
            return Err(AppError::NotFound(format!("event {id}")));
        }
        Ok(())
    }

    // ---- 抢答题 ----

    pub async fn list_quiz_questions(&self) -> AppResult<Vec<qq::Model>> {
        Ok(qq::Entity::find()
            .order_by_asc(qq::Column::SortOrder)
            .order_by_asc(qq::Column::Id)
            .all(&self.pool)
            .await?)
    }

    pub async fn create_quiz_question(&self, req: QuizQuestionRequest) -> AppResult<qq::Model> {
        validate_question(&[&req.option_a, &req.option_b, &req.option_c, &req.option_d])?;
        if !matches!(req.correct_answer.as_str(), "A" | "B" | "C" | "D") {
            return Err(AppError::Validation("正确答案必须是 A/B/C/D".to_string()));
        }
        Ok(qq::ActiveModel {
            question: Set(req.question),
            option_a: Set(req.option_a),
            option_b: Set(req.option_b),
            option_c: Set(req.option_c),
            option_d: Set(req.option_d),
            correct_answer: Set(req.correct_answer),
            duration_secs: Set(req.duration_secs.max(1)),
            sort_order: Set(req.sort_order),
            reward_first: Set(req.reward_first),
            reward_second: Set(req.reward_second),
            reward_third: Set(req.reward_third),
            reward_others: Set(req.reward_others),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?)
    }

    pub async fn update_quiz_question(&self, id: i64, req: QuizQuestionRequest) -> AppResult<qq::Model> {
        validate_question(&[&req.option_a, &req.option_b, &req.option_c, &req.option_d])?;
        let model = qq::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("quiz question {id}")))?;
        let mut am: qq::ActiveModel = model.into();
        am.question = Set(req.question);
        am.option_a = Set(req.option_a);
        am.option_b = Set(req.option_b);
        am.option_c = Set(req.option_c);
        am.option_d = Set(req.option_d);
        am.correct_answer = Set(req.correct_answer);
        am.duration_secs = Set(req.duration_secs.max(1));
        am.sort_order = Set(req.sort_order);
        am.reward_first = Set(req.reward_first);
        am.reward_second = Set(req.reward_second);
        am.reward_third = Set(req.reward_third);
        am.reward_others = Set(req.reward_others);
        Ok(am.update(&self.pool).await?)
    }

    pub async fn delete_quiz_question(&self, id: i64) -> AppResult<()> {
        let res = qq::Entity::delete_by_id(id).exec(&self.pool).await?;
        if res.rows_affected == 0 {
            return Err(AppError::NotFound(format!("quiz question {id}")));
        }
        Ok(())
    }

    // ---- 少数派题 ----

    pub async fn list_minority_questions(&self) -> AppResult<Vec<mq::Model>> {
        Ok(mq::Entity::find()
            .order_by_asc(mq::Column::SortOrder)
            .order_by_asc(mq::Column::Id)
            .all(&self.pool)
            .await?)
    }

    pub async fn create_minority_question(&self, req: MinorityQuestionRequest) -> AppResult<mq::Model> {
        validate_question(&[&req.option_a, &req.option_b, &req.option_c, &req.option_d])?;
        Ok(mq::ActiveModel {
            question: Set(req.question),
            option_a: Set(req.option_a),
            option_b: Set(req.option_b),
            option_c: Set(req.option_c),
            option_d: Set(req.option_d),
            duration_secs: Set(req.duration_secs.max(1)),
            sort_order: Set(req.sort_order),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?)
    }

    pub async fn update_minority_question(&self, id: i64, req: MinorityQuestionRequest) -> AppResult<mq::Model> {
        validate_question(&[&req.option_a, &req.option_b, &req.option_c, &req.option_d])?;
        let model = mq::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("minority question {id}")))?;
        let mut am: mq::ActiveModel = model.into();
        am.question = Set(req.question);
        am.option_a = Set(req.option_a);
        am.option_b = Set(req.option_b);
        am.option_c = Set(req.option_c);
        am.option_d = Set(req.option_d);
        am.duration_secs = Set(req.duration_secs.max(1));
        am.sort_order = Set(req.sort_order);
        Ok(am.update(&self.pool).await?)
    }

    pub async fn delete_minority_question(&self, id: i64) -> AppResult<()> {
        let res = mq::Entity::delete_by_id(id).exec(&self.pool).await?;
        if res.rows_affected == 0 {
            return Err(AppError::NotFound(format!("minority question {id}")));
        }
        Ok(())
    }

    // ---- 红包奖品 ----

    pub async fn list_red_envelope_items(&self) -> AppResult<Vec<items::Model>> {
        Ok(items::Entity::find()
            .order_by_asc(items::Column::DisplayOrder)
            .order_by_asc(items::Column::Id)
            .all(&self.pool)
            .await?)
    }

    pub async fn create_red_envelope_item(&self, req: RedEnvelopeItemRequest) -> AppResult<items::Model> {
        if req.prize_value < Decimal::ZERO || req.amount < 0 {
            return Err(AppError::Validation("奖品面值与数量不能为负".to_string()));
        }
        Ok(items::ActiveModel {
            name: Set(req.name),
            prize_type: Set(req.prize_type),
            prize_value: Set(req.prize_value),
            amount: Set(req.amount),
            display_order: Set(req.display_order),
            is_active: Set(req.is_active),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?)
    }

    pub async fn update_red_envelope_item(&self, id: i64, req: RedEnvelopeItemRequest) -> AppResult<items::Model> {
        if req.prize_value < Decimal::ZERO || req.amount < 0 {
            return Err(AppError::Validation("奖品面值与数量不能为负".to_string()));
        }
        let model = items::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("red envelope item {id}")))?;
        let mut am: items::ActiveModel = model.into();
        am.name = Set(req.name);
        am.prize_type = Set(req.prize_type);
        am.prize_value = Set(req.prize_value);
        am.amount = Set(req.amount);
        am.display_order = Set(req.display_order);
        am.is_active = Set(req.is_active);
        Ok(am.update(&self.pool).await?)
    }

    pub async fn delete_red_envelope_item(&self, id: i64) -> AppResult<()> {
        let res = items::Entity::delete_by_id(id).exec(&self.pool).await?;
        if res.rows_affected == 0 {
            return Err(AppError::NotFound(format!("red envelope item {id}")));
        }
        Ok(())
    }
}

fn validate_event(req: &EventRequest) -> AppResult<()> {
    if req.day < 1 {
        return Err(AppError::Validation("事件日必须 ≥ 1".to_string()));
    }
    if req.title.trim().is_empty() {
        return Err(AppError::Validation("事件标题不能为空".to_string()));
    }
    Ok(())
}

fn validate_question(options: &[&String]) -> AppResult<()> {
    for opt in options {
        if opt.trim().is_empty() {
            return Err(AppError::Validation("选项不能为空".to_string()));
        }
    }
    let mut seen = std::collections::HashSet::new();
    for opt in options {
        if !seen.insert(opt.as_str()) {
            return Err(AppError::Validation("选项不能重复".to_string()));
        }
    }
    Ok(())
}
