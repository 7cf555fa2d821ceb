use std::collections::BTreeMap;

use types::{
    round::MAX_THROWS_PER_TURN, DartTurn, Direction, GameType, Multiplier, PlayerId, RoundEntry,
    RoundRecord,
};

use crate::policy::{check_entry_kinds, PolicyError, RoundScore, ScoringPolicy, Termination};

/// Countdown darts (301/501). A round is one turn of up to three darts per
/// player; totals are points scored, the remaining score is `start - total`.
#[derive(Debug, Clone, Copy)]
pub struct DartPolicy {
    pub start: i64,
    pub double_out: bool,
}

impl DartPolicy {
    pub fn remaining(&self, total: i64) -> i64 {
        self.start - total
    }

    /// A turn busts when it would overshoot zero, or under double-out when it
    /// leaves one or checks out without a double.
    pub fn is_bust(&self, remaining: i64, turn: &DartTurn) -> bool {
        let left = remaining - turn.points();
        if left < 0 {
            return true;
        }
        if self.double_out {
            let finished_on_double = turn
                .last_throw()
                .map(|t| t.multiplier == Multiplier::Double)
                .unwrap_or(false);
            return left == 1 || (left == 0 && !finished_on_double);
        }
        false
    }
}

impl ScoringPolicy for DartPolicy {
    fn game_type(&self) -> GameType {
        GameType::Dart
    }

    fn direction(&self) -> Direction {
        Direction::HigherIsBetter
    }

    /// The end score is what is left to throw.
    fn end_direction(&self) -> Direction {
        Direction::LowerIsBetter
    }

    fn termination(&self) -> Termination {
        Termination::Countdown { start: self.start }
    }

    fn round_origin(&self) -> u32 {
        0
    }

    fn validate(&self, round: &RoundRecord) -> Result<(), PolicyError> {
        check_entry_kinds(GameType::Dart, round)?;
        for (&player_id, entry) in &round.entries {
            let RoundEntry::Dart(turn) = entry else {
                continue;
            };
            if turn.throws.len() > MAX_THROWS_PER_TURN {
                return Err(PolicyError::InvalidEntry {
                    player_id,
                    reason: format!("{} darts thrown in one turn", turn.throws.len()),
                });
            }
            if let Some(throw) = turn.throws.iter().find(|t| !t.is_valid()) {
                return Err(PolicyError::InvalidEntry {
                    player_id,
                    reason: format!("{throw} is not a board segment"),
                });
            }
        }
        Ok(())
    }

    fn score_round(
        &self,
        round: &RoundRecord,
        totals: &BTreeMap<PlayerId, i64>,
    ) -> BTreeMap<PlayerId, RoundScore> {
        round
            .entries
            .iter()
            .filter_map(|(&id, entry)| {
                let RoundEntry::Dart(turn) = entry else {
                    return None;
                };
                let remaining = self.remaining(totals.get(&id).copied().unwrap_or(0));
                let score = if self.is_bust(remaining, turn) {
                    log::debug!("Player {id} busted with {turn} on {remaining}");
                    RoundScore::bust()
                } else {
                    RoundScore::points(turn.points())
                };
                Some((id, score))
            })
            .collect()
    }

    fn end_score(&self, total: i64) -> i64 {
        self.remaining(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::compute_standings;
    use types::DartThrow;
    use uuid::Uuid;

    fn turn(throws: &[DartThrow]) -> RoundEntry {
        RoundEntry::Dart(DartTurn::new(throws.to_vec()))
    }

    fn t20s(darts: usize) -> RoundEntry {
        turn(&vec![DartThrow::triple(20); darts])
    }

    /// 180 then 120 leaves one point on 301.
    fn down_to_one(a: PlayerId, b: Option<PlayerId>) -> Vec<RoundRecord> {
        [t20s(3), t20s(2)]
            .into_iter()
            .enumerate()
            .map(|(n, entry)| {
                let mut entries = vec![(a, entry)];
                if let Some(b) = b {
                    entries.push((b, turn(&[DartThrow::single(1)])));
                }
                RoundRecord::new(n as u32, entries)
            })
            .collect()
    }

    #[test]
    fn test_exact_zero_wins() {
        let policy = DartPolicy {
            start: 301,
            double_out: false,
        };
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut rounds = down_to_one(a, Some(b));
        let standings = compute_standings(&policy, &[a, b], &rounds);
        assert_eq!(policy.remaining(standings.get(&a).unwrap().total), 1);
        assert_eq!(policy.outcome(&standings), None);

        rounds.push(RoundRecord::new(
            2,
            [(a, turn(&[DartThrow::single(1)])), (b, turn(&[DartThrow::miss()]))],
        ));
        let standings = compute_standings(&policy, &[a, b], &rounds);
        let outcome = policy.outcome(&standings).expect("a checked out");
        assert_eq!(outcome.winners, vec![a]);
        assert_eq!(outcome.losers, vec![b]);
        assert_eq!(policy.end_score(standings.get(&a).unwrap().total), 0);
        assert_eq!(policy.end_score(standings.get(&b).unwrap().total), 299);
    }

    #[test]
    fn test_overshoot_is_bust_and_does_not_terminate() {
        let policy = DartPolicy {
            start: 301,
            double_out: false,
        };
        let a = Uuid::new_v4();
        let mut rounds = down_to_one(a, None);
        rounds.push(RoundRecord::new(2, [(a, turn(&[DartThrow::single(5)]))]));

        let standings = compute_standings(&policy, &[a], &rounds);
        let standing = standings.get(&a).unwrap();
        assert_eq!(policy.remaining(standing.total), 1);
        assert_eq!(standing.rounds.last().unwrap().1, RoundScore::bust());
        assert_eq!(policy.outcome(&standings), None);
    }

    #[test]
    fn test_double_out_rules() {
        let policy = DartPolicy {
            start: 40,
            double_out: true,
        };
        let single_finish = DartTurn::new(vec![DartThrow::single(20), DartThrow::single(20)]);
        assert!(policy.is_bust(40, &single_finish));
        let double_finish = DartTurn::new(vec![DartThrow::double(20)]);
        assert!(!policy.is_bust(40, &double_finish));
        let leaves_one = DartTurn::new(vec![DartThrow::single(19), DartThrow::single(20)]);
        assert!(policy.is_bust(40, &leaves_one));
    }

    #[test]
    fn test_validate_throws() {
        let policy = DartPolicy {
            start: 301,
            double_out: false,
        };
        let a = Uuid::new_v4();
        let four = RoundRecord::new(0, [(a, turn(&[DartThrow::single(1); 4]))]);
        assert!(policy.validate(&four).is_err());
        let triple_bull = RoundRecord::new(0, [(a, turn(&[DartThrow::triple(25)]))]);
        assert!(policy.validate(&triple_bull).is_err());
        assert!(policy.validate(&RoundRecord::new(0, [(a, t20s(3))])).is_ok());
    }
}
