use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// One pot layer with its own eligible-winner set. Side pots arise whenever
/// contributions are uneven, typically from all-ins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pot {
    pub amount: u64,
    pub eligible: Vec<Uuid>,
}

/// Peel the minimum positive remaining contribution across all contributors
/// as one layer; a layer's eligible winners are the contributors still live.
/// Repeats until nothing remains, so the layer amounts always sum to the
/// total contribution.
pub fn build_side_pots(
    contrib: &HashMap<Uuid, u64>,
    live: &HashMap<Uuid, bool>,
) -> Vec<Pot> {
    let mut remain: Vec<(Uuid, u64)> = contrib
        .iter()
        .filter(|(_, &v)| v > 0)
        .map(|(&pid, &v)| (pid, v))
        .collect();
    // Stable layer ordering regardless of map iteration order.
    remain.sort_unstable_by_key(|&(pid, _)| pid);

    let mut pots = Vec::new();
    loop {
        let layer: Vec<usize> = remain
            .iter()
            .enumerate()
            .filter(|(_, (_, v))| *v > 0)
            .map(|(i, _)| i)
            .collect();
        if layer.is_empty() {
            break;
        }
        let floor = layer.iter().map(|&i| remain[i].1).min().unwrap_or(0);
        let amount = floor * layer.len() as u64;
        let eligible: Vec<Uuid> = layer
            .iter()
            .map(|&i| remain[i].0)
            .filter(|pid| live.get(pid).copied().unwrap_or(false))
            .collect();
        pots.push(Pot { amount, eligible });
        for &i in &layer {
            remain[i].1 -= floor;
        }
    }
    pots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    #[test]
    fn nested_side_pots_from_uneven_contributions() {
        let (a, b, c) = (pid(1), pid(2), pid(3));
        let contrib = HashMap::from([(a, 100), (b, 50), (c, 200)]);
        let live = HashMap::from([(a, true), (b, true), (c, true)]);
        let pots = build_side_pots(&contrib, &live);
        assert_eq!(pots.len(), 3);
        assert_eq!(pots[0].amount, 150);
        assert_eq!(pots[0].eligible, vec![a, b, c]);
        assert_eq!(pots[1].amount, 100);
        assert_eq!(pots[1].eligible, vec![a, c]);
        assert_eq!(pots[2].amount, 100);
        assert_eq!(pots[2].eligible, vec![c]);
        let total: u64 = pots.iter().map(|p| p.amount).sum();
        assert_eq!(total, contrib.values().sum::<u64>());
    }

    #[test]
    fn folded_contributor_funds_but_cannot_win() {
        let (a, b) = (pid(1), pid(2));
        let contrib = HashMap::from([(a, 100), (b, 100)]);
        let live = HashMap::from([(a, true), (b, false)]);
        let pots = build_side_pots(&contrib, &live);
        assert_eq!(pots.len(), 1);
        assert_eq!(pots[0].amount, 200);
        assert_eq!(pots[0].eligible, vec![a]);
    }

    #[test]
    fn empty_contributions_yield_no_pots() {
        assert!(build_side_pots(&HashMap::new(), &HashMap::new()).is_empty());
    }
}
