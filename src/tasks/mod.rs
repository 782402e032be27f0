//! Background scheduled tasks for the game engine.
//!
//! The only recurring job is the 1 Hz tick loop: it pushes the derived
//! clock to every connection, publishes scheduled news at its in-day
//! offset, and fires the day-boundary settlement pipeline on day change.
//! Call `spawn_all` once during startup; the loop never exits and
//! swallows (logs) per-tick errors.

use crate::error::AppResult;
use crate::models::{GameStateUpdatePayload, NewsUpdatePayload};
use crate::services::AppContext;
use crate::services::game_service::{compute_clock, state_of};
use crate::ws::events as evt;
use chrono::Utc;

/// Spawn all background tasks. Detaches via `tokio::spawn`, does not block.
pub fn spawn_all(ctx: AppContext) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
        // 每个循环实例自己的日界追踪; -1 表示尚未观察到任何游戏日
        let mut prev_day: i32 = -1;
        let mut prev_started = false;
        loop {
            interval.tick().await;
            if let Err(e) = tick(&ctx, &mut prev_day, &mut prev_started).await {
                log::error!("Tick failed: {e}");
            }
        }
    });
}

async fn tick(ctx: &AppContext, prev_day: &mut i32, prev_started: &mut bool) -> AppResult<()> {
    let status = ctx.game.status().await?;
    let now = Utc::now();
    let state = state_of(&status, now);
    let clock = compute_clock(&status, now);

    ctx.hub
        .global_emit(evt::GAME_STATE_UPDATE, &GameStateUpdatePayload::from(&state));

    // isStarted 由假变真时重置日界追踪
    if status.is_started && !*prev_started {
        *prev_day = -1;
    }
    *prev_started = status.is_started;

    if !status.is_started || clock.current_day <= 0 {
        return Ok(());
    }

    // 新闻到点发布: 库与缓存先落标记, 再全局广播
    if let Some(day) = ctx.script.get_day(clock.current_day) {
        if let (Some(title), Some(offset)) = (day.title.clone(), day.publish_offset) {
            if !day.is_broadcasted && clock.second_in_day >= offset {
                ctx.script.mark_broadcasted(day.day).await?;
                ctx.hub.global_emit(
                    evt::NEWS_UPDATE,
                    &NewsUpdatePayload {
                        day: day.day,
                        title,
                        content: day.news.clone(),
                    },
                );
                log::info!("News published for day {}", day.day);
            }
        }
    }

    if clock.current_day > *prev_day {
        ctx.settlement
            .run_day_boundary(*prev_day, clock.current_day)
            .await;
        *prev_day = clock.current_day;
    }
    Ok(())
}
