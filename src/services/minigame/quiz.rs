use crate::models::QuizRewards;
use crate::utils::round2;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

/// 答对者按名次发奖 (rank 从 0 起):
/// 前三名固定额, 第四名起在 others..third 之间按剩余时间线性插值
pub fn quiz_reward(
    rank: usize,
    rewards: &QuizRewards,
    duration_secs: i64,
    end_time: DateTime<Utc>,
    answered_at: DateTime<Utc>,
) -> Decimal {
    match rank {
        0 => rewards.first,
        1 => rewards.second,
        2 => rewards.third,
        _ => {
            let duration = duration_secs.max(1) as f64;
            let lead = (end_time - answered_at).num_milliseconds() as f64 / 1000.0;
            let frac = (lead / duration).clamp(0.0, 1.0);
            let base = rewards.others;
            let span = rewards.third - rewards.others;
            let bonus = span * Decimal::from_f64(frac).unwrap_or(Decimal::ZERO);
            round2(base + bonus)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rewards() -> QuizRewards {
        QuizRewards {
            first: Decimal::new(100, 0),
            second: Decimal::new(60, 0),
            third: Decimal::new(40, 0),
            others: Decimal::new(10, 0),
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_fixed_rewards_for_podium() {
        let r = rewards();
        let end = at(10);
        assert_eq!(quiz_reward(0, &r, 10, end, at(1)), Decimal::new(100, 0));
        assert_eq!(quiz_reward(1, &r, 10, end, at(1)), Decimal::new(60, 0));
        assert_eq!(quiz_reward(2, &r, 10, end, at(1)), Decimal::new(40, 0));
    }

    #[test]
    fn test_speed_bonus_interpolation() {
        // 第 5 名, 提前 7 秒作答: 10 + 30·0.7 = 31
        let r = rewards();
        let end = at(10);
        assert_eq!(
            quiz_reward(4, &r, 10, end, at(3)),
            Decimal::new(31, 0).round_dp(2)
        );
    }

    #[test]
    fn test_speed_bonus_clamped() {
        let r = rewards();
        let end = at(10);
        // 答题时间在截止之后 (理论不可能) → 下限 others
        assert_eq!(quiz_reward(3, &r, 10, end, at(12)), Decimal::new(10, 0).round_dp(2));
        // 提前量超过 duration → 上限 third
        assert_eq!(quiz_reward(3, &r, 10, end, at(-20)), Decimal::new(40, 0).round_dp(2));
    }
}
