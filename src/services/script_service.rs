use crate::entities::{event_entity as events, script_day_entity as days};
use crate::error::{AppError, AppResult};
use crate::models::{
    GenerateParams, NewsUpdatePayload, PriceHistoryItem, ScriptDayRow, Trend,
};
use crate::utils::round2;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::sync::{Arc, RwLock};

/// 剧本缓存行 (整份剧本常驻内存)
#[derive(Clone, Debug)]
pub struct CachedDay {
    pub day: i32,
    pub price: Decimal,
    pub title: Option<String>,
    pub news: Option<String>,
    pub effective_trend: Trend,
    pub publish_offset: Option<i64>,
    pub is_broadcasted: bool,
}

impl From<&days::Model> for CachedDay {
    fn from(m: &days::Model) -> Self {
        Self {
            day: m.day,
            price: m.price,
            title: m.title.clone(),
            news: m.news.clone(),
            effective_trend: m.effective_trend,
            publish_offset: m.publish_offset,
            is_broadcasted: m.is_broadcasted,
        }
    }
}

/// 生成器的一行输出
#[derive(Clone, Debug)]
pub struct GeneratedDay {
    pub day: i32,
    pub price: Decimal,
    pub title: Option<String>,
    pub news: Option<String>,
    pub effective_trend: Trend,
    pub publish_offset: i64,
}

/// 剧本服务: 店内唯一可信价格序列的缓存与写入口
///
/// 缓存整体替换 (copy-on-reload): 读方克隆 Arc, 重载期间可能读到旧快照,
/// 但不会读到撕裂的快照
#[derive(Clone)]
pub struct ScriptService {
    pool: DatabaseConnection,
    cache: Arc<RwLock<Arc<Vec<CachedDay>>>>,
}

impl ScriptService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self {
            pool,
            cache: Arc::new(RwLock::new(Arc::new(Vec::new()))),
        }
    }

    /// 从库中全量重载缓存
    pub async fn reload(&self) -> AppResult<()> {
        let list = days::Entity::find()
            .order_by_asc(days::Column::Day)
            .all(&self.pool)
            .await?;
        let snapshot: Vec<CachedDay> = list.iter().map(CachedDay::from).collect();
        *self.cache.write().expect("script cache lock poisoned") = Arc::new(snapshot);
        Ok(())
    }

    pub fn snapshot(&self) -> Arc<Vec<CachedDay>> {
        self.cache.read().expect("script cache lock poisoned").clone()
    }

    pub fn get_day(&self, day: i32) -> Option<CachedDay> {
        self.snapshot().iter().find(|d| d.day == day).cloned()
    }

    /// 当日成交价; 未开盘 (day 0) 或剧本缺失时回落到初始价
    pub fn price_for_day(&self, day: i32, initial_price: Decimal) -> Decimal {
        if day <= 0 {
            return initial_price;
        }
        self.get_day(day).map(|d| d.price).unwrap_or(initial_price)
    }

    /// 标记某日新闻已广播: 先写库, 再换缓存快照
    pub async fn mark_broadcasted(&self, day: i32) -> AppResult<()> {
        let model = days::Entity::find()
            .filter(days::Column::Day.eq(day))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("script day {day}")))?;

        let mut am: days::ActiveModel = model.into();
        am.is_broadcasted = Set(true);
        am.update(&self.pool).await?;

        let current = self.snapshot();
        let updated: Vec<CachedDay> = current
            .iter()
            .map(|d| {
                let mut d = d.clone();
                if d.day == day {
                    d.is_broadcasted = true;
                }
                d
            })
            .collect();
        *self.cache.write().expect("script cache lock poisoned") = Arc::new(updated);
        Ok(())
    }

    /// 全部广播标记清零 (开始/重开时)
    pub async fn reset_broadcast_flags(&self) -> AppResult<()> {
        use sea_orm::sea_query::Expr;
        days::Entity::update_many()
            .col_expr(days::Column::IsBroadcasted, Expr::value(false))
            .exec(&self.pool)
            .await?;
        self.reload().await
    }

    /// 1..=up_to_day 的价格历史, 新闻字段受广播标记门控
    pub fn history(&self, up_to_day: i32) -> Vec<PriceHistoryItem> {
        self.snapshot()
            .iter()
            .filter(|d| d.day <= up_to_day)
            .map(|d| PriceHistoryItem {
                day: d.day,
                price: d.price,
                title: if d.is_broadcasted { d.title.clone() } else { None },
                news: if d.is_broadcasted { d.news.clone() } else { None },
                effective_trend: d.effective_trend,
            })
            .collect()
    }

    /// 已广播的历史新闻 (连接时的初始快照用)
    pub fn visible_news(&self, up_to_day: i32) -> Vec<NewsUpdatePayload> {
        self.snapshot()
            .iter()
            .filter(|d| d.day <= up_to_day && d.is_broadcasted)
            .filter_map(|d| {
                d.title.as_ref().map(|t| NewsUpdatePayload {
                    day: d.day,
                    title: t.clone(),
                    content: d.news.clone(),
                })
            })
            .collect()
    }

    /// 依据事件列表生成整份剧本并落库 (整表替换)
    pub async fn generate(
        &self,
        params: &GenerateParams,
        total_days: i32,
        initial_price: Decimal,
        time_ratio: i64,
    ) -> AppResult<usize> {
        let event_list = events::Entity::find()
            .order_by_asc(events::Column::Day)
            .all(&self.pool)
            .await?;

        let series = {
            let mut rng = rand::rng();
            generate_series(
                &event_list,
                params,
                total_days,
                initial_price,
                time_ratio,
                &mut rng,
            )
        };
        let count = series.len();
        self.replace_all(series.into_iter().map(Into::into).collect())
            .await?;
        Ok(count)
    }

    /// 导出完整剧本
    pub async fn export(&self) -> AppResult<Vec<ScriptDayRow>> {
        let list = days::Entity::find()
            .order_by_asc(days::Column::Day)
            .all(&self.pool)
            .await?;
        Ok(list.iter().map(ScriptDayRow::from).collect())
    }

    /// 导入剧本: 整表替换, 广播标记重置
    pub async fn import(&self, rows: Vec<ScriptDayRow>) -> AppResult<usize> {
        for row in &rows {
            if row.day < 1 {
                return Err(AppError::Validation(format!("无效的剧本日: {}", row.day)));
            }
            if row.price <= Decimal::ZERO {
                return Err(AppError::Validation(format!(
                    "第 {} 日价格必须为正",
                    row.day
                )));
            }
        }
        let count = rows.len();
        self.replace_all(rows).await?;
        Ok(count)
    }

    async fn replace_all(&self, rows: Vec<ScriptDayRow>) -> AppResult<()> {
        let txn = self.pool.begin().await?;

        days::Entity::delete_many().exec(&txn).await?;

        if !rows.is_empty() {
            let models: Vec<days::ActiveModel> = rows
                .into_iter()
                .map(|r| days::ActiveModel {
                    day: Set(r.day),
                    price: Set(round2(r.price)),
                    title: Set(r.title),
                    news: Set(r.news),
                    effective_trend: Set(r.effective_trend),
                    publish_offset: Set(r.publish_offset),
                    is_broadcasted: Set(false),
                    ..Default::default()
                })
                .collect();
            days::Entity::insert_many(models).exec(&txn).await?;
        }

        txn.commit().await?;
        self.reload().await
    }
}

impl From<GeneratedDay> for ScriptDayRow {
    fn from(g: GeneratedDay) -> Self {
        Self {
            day: g.day,
            price: g.price,
            title: g.title,
            news: g.news,
            effective_trend: g.effective_trend,
            publish_offset: Some(g.publish_offset),
        }
    }
}

/// 价格序列生成: 衰减趋势 + 有界噪声 + 牛市漂移
///
/// 事件落在第 d 日时影响第 d+1 日起的趋势 (新闻先于行情);
/// 当日 effective_trend 记录的是当日实际生效的趋势
pub fn generate_series<R: Rng + ?Sized>(
    event_list: &[events::Model],
    params: &GenerateParams,
    total_days: i32,
    initial_price: Decimal,
    time_ratio: i64,
    rng: &mut R,
) -> Vec<GeneratedDay> {
    let mut price = initial_price.to_f64().unwrap_or(1.0);
    let mut trend_ratio = 0.0f64;
    let mut trend_name = Trend::Flat;
    let offset_bound = time_ratio.max(1);

    let mut series = Vec::with_capacity(total_days.max(0) as usize);
    for day in 1..=total_days {
        // 先算出明日趋势
        let mut next_ratio = trend_ratio * params.decay;
        let mut next_name = trend_name;
        let todays_event = event_list.iter().find(|e| e.day == day);
        if let Some(e) = todays_event {
            if e.trend != Trend::NoEffect {
                next_name = e.trend;
                next_ratio = e.trend.strength();
            }
        }

        // 今日价格更新
        let noise = rng.random_range(-0.4..0.4) * params.target_daily_change;
        price = price * (1.0 + params.target_daily_change * trend_ratio + noise)
            + params.bull_drift;
        if price < 1.0 {
            price = 1.0;
        }
        let price_dec = round2(Decimal::from_f64(price).unwrap_or(Decimal::ONE));
        price = price_dec.to_f64().unwrap_or(1.0);

        series.push(GeneratedDay {
            day,
            price: price_dec,
            title: todays_event.map(|e| e.title.clone()),
            news: todays_event.and_then(|e| e.news.clone()),
            effective_trend: trend_name,
            publish_offset: rng.random_range(0..offset_bound),
        });

        trend_ratio = next_ratio;
        trend_name = next_name;
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn event(day: i32, trend: Trend) -> events::Model {
        events::Model {
            id: day as i64,
            day,
            title: format!("event-{day}"),
            news: None,
            trend,
            created_at: None,
        }
    }

    #[test]
    fn test_series_is_deterministic_under_seed() {
        let evs = vec![event(3, Trend::StrongUp), event(7, Trend::Down)];
        let params = GenerateParams::default();
        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7);
        let a = generate_series(&evs, &params, 20, Decimal::new(100, 0), 60, &mut rng_a);
        let b = generate_series(&evs, &params, 20, Decimal::new(100, 0), 60, &mut rng_b);
        let pa: Vec<_> = a.iter().map(|d| d.price).collect();
        let pb: Vec<_> = b.iter().map(|d| d.price).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn test_event_trend_takes_effect_next_day() {
        let evs = vec![event(5, Trend::StrongUp)];
        let params = GenerateParams::default();
        let mut rng = StdRng::seed_from_u64(1);
        let series = generate_series(&evs, &params, 10, Decimal::new(100, 0), 60, &mut rng);

        // 事件当日记录的仍是此前趋势, 次日才切换
        assert_eq!(series[4].effective_trend, Trend::Flat);
        assert_eq!(series[5].effective_trend, Trend::StrongUp);
        assert_eq!(series[4].title.as_deref(), Some("event-5"));
        assert!(series[5].title.is_none());
    }

    #[test]
    fn test_price_never_below_floor() {
        let evs: Vec<events::Model> = (1..=30).map(|d| event(d, Trend::StrongDown)).collect();
        let params = GenerateParams {
            target_daily_change: 0.5,
            bull_drift: 0.0,
            decay: 1.0,
        };
        let mut rng = StdRng::seed_from_u64(3);
        let series = generate_series(&evs, &params, 30, Decimal::new(2, 0), 60, &mut rng);
        assert!(series.iter().all(|d| d.price >= Decimal::ONE));
    }

    #[test]
    fn test_publish_offset_within_day() {
        let params = GenerateParams::default();
        let mut rng = StdRng::seed_from_u64(11);
        let series = generate_series(&[], &params, 50, Decimal::new(100, 0), 60, &mut rng);
        assert!(series.iter().all(|d| (0..60).contains(&d.publish_offset)));
    }
}
