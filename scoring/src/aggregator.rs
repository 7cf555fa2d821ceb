//! Recomputes totals and per-player round history from the ledger.
//!
//! Everything here is a pure function of the rounds passed in. A player
//! contributes only to the rounds they have an entry in, so a late joiner is
//! excluded from earlier rounds instead of being counted as zero.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use types::{Direction, PlayerId, RoundRecord};

use crate::policy::{RoundScore, ScoringPolicy};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStanding {
    pub player_id: PlayerId,
    pub seat: usize,
    pub total: i64,
    pub rounds_played: u32,
    pub best_round: Option<i64>,
    pub worst_round: Option<i64>,
    pub rounds: Vec<(u32, RoundScore)>,
}

impl PlayerStanding {
    fn new(player_id: PlayerId, seat: usize) -> Self {
        Self {
            player_id,
            seat,
            total: 0,
            rounds_played: 0,
            best_round: None,
            worst_round: None,
            rounds: Vec::new(),
        }
    }

    fn record(&mut self, round_number: u32, score: RoundScore, direction: Direction) {
        self.total += score.value;
        self.rounds_played += 1;
        self.best_round = direction.fold_best(self.best_round, Some(score.value));
        self.worst_round = direction.fold_worst(self.worst_round, Some(score.value));
        self.rounds.push((round_number, score));
    }

    pub fn round_total(&self) -> i64 {
        self.rounds.iter().map(|(_, score)| score.value).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standings {
    pub direction: Direction,
    pub rounds_played: u32,
    /// In seat order.
    pub players: Vec<PlayerStanding>,
}

impl Standings {
    pub fn get(&self, player_id: &PlayerId) -> Option<&PlayerStanding> {
        self.players.iter().find(|p| &p.player_id == player_id)
    }

    pub fn totals(&self) -> BTreeMap<PlayerId, i64> {
        self.players.iter().map(|p| (p.player_id, p.total)).collect()
    }

    /// Players ordered best total first; seat order breaks ties.
    pub fn ranking(&self) -> Vec<&PlayerStanding> {
        self.players
            .iter()
            .sorted_by_key(|p| match self.direction {
                Direction::LowerIsBetter => (p.total, p.seat),
                Direction::HigherIsBetter => (-p.total, p.seat),
            })
            .collect()
    }
}

/// Standings of `participants` (in seat order) over `rounds`. Entries of
/// players who are no longer seated are ignored.
pub fn compute_standings(
    policy: &dyn ScoringPolicy,
    participants: &[PlayerId],
    rounds: &[RoundRecord],
) -> Standings {
    let direction = policy.direction();
    let mut players: Vec<PlayerStanding> = participants
        .iter()
        .enumerate()
        .map(|(seat, &id)| PlayerStanding::new(id, seat))
        .collect();
    let mut totals: BTreeMap<PlayerId, i64> = BTreeMap::new();

    for round in rounds.iter().sorted_by_key(|r| r.round_number) {
        let scores = policy.score_round(round, &totals);
        for (player_id, score) in scores {
            *totals.entry(player_id).or_default() += score.value;
            if let Some(standing) = players.iter_mut().find(|p| p.player_id == player_id) {
                standing.record(round.round_number, score, direction);
            }
        }
    }

    log::trace!(
        "Recomputed {} standings over {} rounds",
        players.len(),
        rounds.len()
    );
    Standings {
        direction,
        rounds_played: rounds.len() as u32,
        players,
    }
}

/// Cumulative score of every player that appears in `rounds`.
pub fn compute_totals(policy: &dyn ScoringPolicy, rounds: &[RoundRecord]) -> BTreeMap<PlayerId, i64> {
    let everyone: Vec<PlayerId> = rounds
        .iter()
        .flat_map(|r| r.entries.keys().copied())
        .unique()
        .collect();
    compute_standings(policy, &everyone, rounds).totals()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::{SkyjoPolicy, WizardPolicy};
    use types::RoundEntry;
    use uuid::Uuid;

    fn skyjo_round(n: u32, scores: &[(PlayerId, i64)]) -> RoundRecord {
        RoundRecord::new(n, scores.iter().map(|&(id, p)| (id, RoundEntry::skyjo(p))))
    }

    #[test]
    fn test_totals_sum_round_values() {
        let policy = SkyjoPolicy { threshold: 100 };
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let rounds = vec![
            skyjo_round(1, &[(a, 10), (b, 4)]),
            skyjo_round(2, &[(a, -2), (b, 30)]),
        ];
        let totals = compute_totals(&policy, &rounds);
        assert_eq!(totals[&a], 8);
        assert_eq!(totals[&b], 34);
    }

    #[test]
    fn test_late_joiner_is_excluded_from_earlier_rounds() {
        let policy = SkyjoPolicy { threshold: 100 };
        let (a, b, late) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let rounds = vec![
            skyjo_round(1, &[(a, 10), (b, 4)]),
            skyjo_round(2, &[(a, 3), (b, 5), (late, 7)]),
        ];
        let standings = compute_standings(&policy, &[a, b, late], &rounds);
        let late_standing = standings.get(&late).unwrap();
        assert_eq!(late_standing.total, 7);
        assert_eq!(late_standing.rounds_played, 1);
        assert_eq!(late_standing.rounds, vec![(2, RoundScore::points(7))]);
        assert_eq!(standings.get(&a).unwrap().rounds_played, 2);
    }

    #[test]
    fn test_best_and_worst_follow_direction() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let skyjo = SkyjoPolicy { threshold: 100 };
        let rounds = vec![
            skyjo_round(1, &[(a, 10), (b, 0)]),
            skyjo_round(2, &[(a, -2), (b, 0)]),
        ];
        let standing = compute_standings(&skyjo, &[a, b], &rounds);
        assert_eq!(standing.get(&a).unwrap().best_round, Some(-2));
        assert_eq!(standing.get(&a).unwrap().worst_round, Some(10));

        let wizard = WizardPolicy { rounds: 20 };
        let rounds = vec![
            RoundRecord::new(
                1,
                [
                    (a, RoundEntry::Wizard { bid: 1, tricks: 1 }),
                    (b, RoundEntry::Wizard { bid: 1, tricks: 0 }),
                ],
            ),
            RoundRecord::new(
                2,
                [
                    (a, RoundEntry::Wizard { bid: 0, tricks: 2 }),
                    (b, RoundEntry::Wizard { bid: 0, tricks: 0 }),
                ],
            ),
        ];
        let standing = compute_standings(&wizard, &[a, b], &rounds);
        assert_eq!(standing.get(&a).unwrap().best_round, Some(30));
        assert_eq!(standing.get(&a).unwrap().worst_round, Some(-20));
    }

    #[test]
    fn test_unseated_entries_are_ignored() {
        let policy = SkyjoPolicy { threshold: 100 };
        let (a, gone) = (Uuid::new_v4(), Uuid::new_v4());
        let rounds = vec![skyjo_round(1, &[(a, 10), (gone, 4)])];
        let standings = compute_standings(&policy, &[a], &rounds);
        assert_eq!(standings.players.len(), 1);
        assert_eq!(standings.rounds_played, 1);
    }

    #[test]
    fn test_ranking_orders_by_direction() {
        let policy = SkyjoPolicy { threshold: 100 };
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let rounds = vec![skyjo_round(1, &[(a, 10), (b, 4), (c, 4)])];
        let standings = compute_standings(&policy, &[a, b, c], &rounds);
        let order: Vec<_> = standings.ranking().iter().map(|p| p.player_id).collect();
        assert_eq!(order, vec![b, c, a]);
    }
}
