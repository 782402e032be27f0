use rust_decimal::{Decimal, RoundingStrategy};

/// 所有落库金额统一的两位小数舍入 (四舍五入, 远离零)
pub fn round2(v: Decimal) -> Decimal {
    v.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_round2() {
        assert_eq!(round2(Decimal::from_str("1.005").unwrap()).to_string(), "1.01");
        assert_eq!(round2(Decimal::from_str("1.004").unwrap()).to_string(), "1.00");
        assert_eq!(round2(Decimal::from_str("-1.005").unwrap()).to_string(), "-1.01");
        // 小数位不足两位时保持原样
        assert_eq!(
            round2(Decimal::from_str("1000.1").unwrap()),
            Decimal::from_str("1000.1").unwrap()
        );
    }
}
