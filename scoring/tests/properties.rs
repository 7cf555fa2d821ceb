//! Property tests for the aggregator and termination rules (pure, no storage).

use proptest::prelude::*;
use scoring::games::SkyjoPolicy;
use scoring::{compute_standings, compute_totals, ScoringPolicy};
use types::{Placement, PlayerId, RoundEntry, RoundRecord};
use uuid::Uuid;

/// Rounds 1..=n where player i joins at `joins[i]`.
fn build_rounds(players: &[PlayerId], joins: &[u32], scores: &[Vec<i64>]) -> Vec<RoundRecord> {
    scores
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let round_number = idx as u32 + 1;
            let entries = players
                .iter()
                .zip(joins)
                .zip(row)
                .filter(|((_, join), _)| **join <= round_number)
                .map(|((&id, _), &points)| (id, RoundEntry::skyjo(points)));
            RoundRecord::new(round_number, entries)
        })
        .collect()
}

fn players(n: usize) -> Vec<PlayerId> {
    (0..n).map(|_| Uuid::new_v4()).collect()
}

proptest! {
    /// Totals are the sum of each player's values from the round they joined.
    #[test]
    fn prop_totals_exclude_rounds_before_join(
        scores in prop::collection::vec(prop::collection::vec(-24i64..=144, 4), 1..12),
        joins in prop::collection::vec(1u32..6, 4),
    ) {
        let policy = SkyjoPolicy { threshold: 10_000 };
        let ids = players(4);
        let rounds = build_rounds(&ids, &joins, &scores);
        let totals = compute_totals(&policy, &rounds);

        for (i, id) in ids.iter().enumerate() {
            let expected: i64 = scores
                .iter()
                .enumerate()
                .filter(|(idx, _)| joins[i] <= *idx as u32 + 1)
                .map(|(_, row)| row[i])
                .sum();
            let played = scores.len() as u32 >= joins[i];
            prop_assert_eq!(totals.get(id).copied(), played.then_some(expected));
        }
    }

    /// Dropping the newest round restores the previous standings exactly.
    #[test]
    fn prop_removing_last_round_is_inverse_of_append(
        scores in prop::collection::vec(prop::collection::vec(-24i64..=144, 3), 1..10),
        extra in prop::collection::vec(-24i64..=144, 3),
    ) {
        let policy = SkyjoPolicy { threshold: 10_000 };
        let ids = players(3);
        let joins = [1, 1, 1];
        let rounds = build_rounds(&ids, &joins, &scores);
        let before = compute_standings(&policy, &ids, &rounds);

        let mut extended = scores.clone();
        extended.push(extra);
        let mut appended = build_rounds(&ids, &joins, &extended);
        appended.pop();
        let after = compute_standings(&policy, &ids, &appended);
        prop_assert_eq!(before, after);
    }

    /// Every seated player is exactly one of winner / loser / neither.
    #[test]
    fn prop_ceiling_partition_is_total_and_disjoint(
        scores in prop::collection::vec(prop::collection::vec(0i64..=60, 4), 1..8),
    ) {
        let policy = SkyjoPolicy { threshold: 100 };
        let ids = players(4);
        let rounds = build_rounds(&ids, &[1, 1, 1, 1], &scores);
        let standings = compute_standings(&policy, &ids, &rounds);
        if let Some(outcome) = policy.outcome(&standings) {
            prop_assert!(!outcome.winners.is_empty());
            for id in &ids {
                let in_winners = outcome.winners.contains(id);
                let in_losers = outcome.losers.contains(id);
                prop_assert!(!(in_winners && in_losers));
                let placement = outcome.placement(id);
                prop_assert_eq!(placement == Placement::Winner, in_winners);
                prop_assert_eq!(placement == Placement::Loser, in_losers);
            }
        } else {
            prop_assert!(standings.players.iter().all(|p| p.total < 100));
        }
    }
}
