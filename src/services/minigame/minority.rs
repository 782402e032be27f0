use crate::models::{MinorityBet, MinorityOptionStats, MinorityStatus};
use crate::utils::round2;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

pub const OPTIONS: [&str; 4] = ["A", "B", "C", "D"];

/// 按选项汇总投注
pub fn tally(bets: &BTreeMap<i64, MinorityBet>) -> Vec<MinorityOptionStats> {
    OPTIONS
        .iter()
        .map(|opt| {
            let mut count = 0;
            let mut total = Decimal::ZERO;
            let mut user_ids = Vec::new();
            for (uid, bet) in bets {
                if bet.option == *opt {
                    count += 1;
                    total += bet.amount;
                    user_ids.push(*uid);
                }
            }
            MinorityOptionStats {
                option: (*opt).to_string(),
                count,
                total_bet: total,
                user_ids,
            }
        })
        .collect()
}

/// 裁决:
/// - 仅一个选项有人投 → REFUND, 不动任何人
/// - 所有有人投的选项人数相同 (≥2 个选项) → HOUSE_WINS, 全员输掉注金
/// - 否则 STANDARD: 人数严格最少的选项获胜
pub fn decide(stats: &[MinorityOptionStats]) -> (MinorityStatus, Vec<String>, Vec<String>) {
    let voted: Vec<&MinorityOptionStats> = stats.iter().filter(|s| s.count > 0).collect();
    if voted.len() <= 1 {
        return (MinorityStatus::Refund, Vec::new(), Vec::new());
    }

    let min_count = voted.iter().map(|s| s.count).min().unwrap_or(0);
    let winners: Vec<String> = voted
        .iter()
        .filter(|s| s.count == min_count)
        .map(|s| s.option.clone())
        .collect();

    if winners.len() == voted.len() {
        // 无严格少数派
        let losers = voted.iter().map(|s| s.option.clone()).collect();
        return (MinorityStatus::HouseWins, Vec::new(), losers);
    }

    let losers: Vec<String> = voted
        .iter()
        .filter(|s| s.count != min_count)
        .map(|s| s.option.clone())
        .collect();
    (MinorityStatus::Standard, winners, losers)
}

/// 获胜方按注金占比瓜分败方彩池
pub fn winner_profit(stake: Decimal, winner_pool: Decimal, loser_pool: Decimal) -> Decimal {
    if winner_pool <= Decimal::ZERO || stake <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round2(stake / winner_pool * loser_pool)
}

/// 败方扣注: 现金不足的部分转入负债
/// 返回 (新现金, 新负债, 实际变动额)
pub fn apply_loss(cash: Decimal, debt: Decimal, stake: Decimal) -> (Decimal, Decimal, Decimal) {
    if cash >= stake {
        (round2(cash - stake), debt, -stake)
    } else {
        let shortfall = stake - cash;
        (Decimal::ZERO, round2(debt + shortfall), -stake)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bet(option: &str, amount: i64) -> MinorityBet {
        MinorityBet {
            option: option.to_string(),
            amount: Decimal::new(amount, 0),
            placed_at: Utc::now(),
        }
    }

    fn bets(entries: &[(i64, &str, i64)]) -> BTreeMap<i64, MinorityBet> {
        entries
            .iter()
            .map(|(uid, opt, amt)| (*uid, bet(opt, *amt)))
            .collect()
    }

    #[test]
    fn test_standard_case_scenario() {
        // A:1 人 100, B:3 人各 60, C:2 人各 50 → A 胜
        let b = bets(&[
            (1, "A", 100),
            (2, "B", 60),
            (3, "B", 60),
            (4, "B", 60),
            (5, "C", 50),
            (6, "C", 50),
        ]);
        let stats = tally(&b);
        let (status, winners, losers) = decide(&stats);
        assert_eq!(status, MinorityStatus::Standard);
        assert_eq!(winners, vec!["A".to_string()]);
        assert_eq!(losers, vec!["B".to_string(), "C".to_string()]);

        let winner_pool = Decimal::new(100, 0);
        let loser_pool = Decimal::new(180 + 100, 0);
        assert_eq!(
            winner_profit(Decimal::new(100, 0), winner_pool, loser_pool),
            Decimal::new(280, 0).round_dp(2)
        );
    }

    #[test]
    fn test_refund_single_voted_option() {
        let b = bets(&[(1, "B", 10), (2, "B", 20)]);
        let (status, winners, losers) = decide(&tally(&b));
        assert_eq!(status, MinorityStatus::Refund);
        assert!(winners.is_empty());
        assert!(losers.is_empty());
    }

    #[test]
    fn test_house_wins_on_tie() {
        let b = bets(&[(1, "A", 10), (2, "B", 20)]);
        let (status, winners, losers) = decide(&tally(&b));
        assert_eq!(status, MinorityStatus::HouseWins);
        assert!(winners.is_empty());
        assert_eq!(losers, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_tied_minority_both_win() {
        // A:1, B:1, C:2 → A 与 B 并列少数派
        let b = bets(&[(1, "A", 10), (2, "B", 20), (3, "C", 5), (4, "C", 5)]);
        let (status, winners, losers) = decide(&tally(&b));
        assert_eq!(status, MinorityStatus::Standard);
        assert_eq!(winners, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(losers, vec!["C".to_string()]);
    }

    #[test]
    fn test_zero_stake_winner_gets_nothing() {
        assert_eq!(
            winner_profit(Decimal::ZERO, Decimal::new(10, 0), Decimal::new(100, 0)),
            Decimal::ZERO
        );
        assert_eq!(
            winner_profit(Decimal::new(10, 0), Decimal::ZERO, Decimal::new(100, 0)),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_loss_spills_into_debt() {
        let (cash, debt, delta) =
            apply_loss(Decimal::new(30, 0), Decimal::new(5, 0), Decimal::new(50, 0));
        assert_eq!(cash, Decimal::ZERO);
        assert_eq!(debt, Decimal::new(25, 0).round_dp(2));
        assert_eq!(delta, Decimal::new(-50, 0));

        let (cash, debt, _) =
            apply_loss(Decimal::new(80, 0), Decimal::ZERO, Decimal::new(50, 0));
        assert_eq!(cash, Decimal::new(30, 0).round_dp(2));
        assert_eq!(debt, Decimal::ZERO);
    }
}
