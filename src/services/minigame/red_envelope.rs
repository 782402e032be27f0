use crate::entities::red_envelope_item_entity as items;
use crate::models::{Packet, PrizeType};
use rand::Rng;
use rand::seq::SliceRandom;
use rust_decimal::Decimal;

/// 目录奖品展开成逐份红包:
/// 份数不足参与人数时用保底奖品补齐, 超出时裁掉多余的;
/// 洗牌后按 0..N-1 重新编号
pub fn build_packets<R: Rng + ?Sized>(
    catalogue: &[items::Model],
    participant_count: usize,
    consolation_name: &str,
    rng: &mut R,
) -> Vec<Packet> {
    let mut packets: Vec<Packet> = Vec::new();
    let mut ordered: Vec<&items::Model> = catalogue.iter().filter(|i| i.is_active).collect();
    ordered.sort_by_key(|i| (i.display_order, i.id));

    for item in ordered {
        for _ in 0..item.amount.max(0) {
            packets.push(Packet {
                index: 0,
                name: item.name.clone(),
                prize_type: item.prize_type,
                prize_value: item.prize_value,
                is_taken: false,
                owner_id: None,
                is_scratched: false,
            });
        }
    }

    if packets.len() < participant_count {
        let deficit = participant_count - packets.len();
        for _ in 0..deficit {
            packets.push(Packet {
                index: 0,
                name: consolation_name.to_string(),
                prize_type: PrizeType::Physical,
                prize_value: Decimal::ZERO,
                is_taken: false,
                owner_id: None,
                is_scratched: false,
            });
        }
    } else {
        packets.truncate(participant_count);
    }

    packets.shuffle(rng);
    for (i, p) in packets.iter_mut().enumerate() {
        p.index = i;
    }
    packets
}

/// 已被抢走的红包是否全部刮开
pub fn all_taken_scratched(packets: &[Packet]) -> bool {
    packets.iter().filter(|p| p.is_taken).all(|p| p.is_scratched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn item(id: i64, name: &str, prize_type: PrizeType, value: i64, amount: i32) -> items::Model {
        items::Model {
            id,
            name: name.to_string(),
            prize_type,
            prize_value: Decimal::new(value, 0),
            amount,
            display_order: id as i32,
            is_active: true,
        }
    }

    #[test]
    fn test_deficit_padded_with_consolation() {
        let catalogue = vec![item(1, "现金", PrizeType::Cash, 88, 3)];
        let mut rng = StdRng::seed_from_u64(1);
        let packets = build_packets(&catalogue, 10, "参与奖", &mut rng);
        assert_eq!(packets.len(), 10);
        assert_eq!(packets.iter().filter(|p| p.name == "参与奖").count(), 7);
    }

    #[test]
    fn test_surplus_trimmed_to_participants() {
        let catalogue = vec![item(1, "现金", PrizeType::Cash, 88, 20)];
        let mut rng = StdRng::seed_from_u64(2);
        let packets = build_packets(&catalogue, 5, "参与奖", &mut rng);
        assert_eq!(packets.len(), 5);
    }

    #[test]
    fn test_indices_are_dense_after_shuffle() {
        let catalogue = vec![
            item(1, "现金", PrizeType::Cash, 88, 4),
            item(2, "保温杯", PrizeType::Physical, 0, 4),
        ];
        let mut rng = StdRng::seed_from_u64(3);
        let packets = build_packets(&catalogue, 8, "参与奖", &mut rng);
        let indices: HashSet<usize> = packets.iter().map(|p| p.index).collect();
        assert_eq!(indices, (0..8).collect());
    }

    #[test]
    fn test_inactive_items_excluded() {
        let mut inactive = item(1, "现金", PrizeType::Cash, 88, 5);
        inactive.is_active = false;
        let mut rng = StdRng::seed_from_u64(4);
        let packets = build_packets(&[inactive], 3, "参与奖", &mut rng);
        assert!(packets.iter().all(|p| p.name == "参与奖"));
    }

    #[test]
    fn test_all_taken_scratched() {
        let catalogue = vec![item(1, "现金", PrizeType::Cash, 88, 2)];
        let mut rng = StdRng::seed_from_u64(5);
        let mut packets = build_packets(&catalogue, 2, "参与奖", &mut rng);
        assert!(all_taken_scratched(&packets)); // 无人抢时视为完成

        packets[0].is_taken = true;
        packets[0].owner_id = Some(9);
        assert!(!all_taken_scratched(&packets));

        packets[0].is_scratched = true;
        assert!(all_taken_scratched(&packets));
    }
}
