use std::collections::BTreeMap;

use types::{Direction, GameType, PlayerId, RoundEntry, RoundRecord};

use crate::policy::{check_entry_kinds, PolicyError, RoundScore, ScoringPolicy, Termination};

pub const FLIP_SEVEN_BONUS: i64 = 15;

#[derive(Debug, Clone, Copy)]
pub struct Flip7Policy {
    pub target: i64,
}

impl ScoringPolicy for Flip7Policy {
    fn game_type(&self) -> GameType {
        GameType::Flip7
    }

    fn direction(&self) -> Direction {
        Direction::HigherIsBetter
    }

    fn termination(&self) -> Termination {
        Termination::Target {
            target: self.target,
        }
    }

    fn validate(&self, round: &RoundRecord) -> Result<(), PolicyError> {
        check_entry_kinds(GameType::Flip7, round)?;
        for (&player_id, entry) in &round.entries {
            if let RoundEntry::Flip7 {
                points,
                busted,
                flip_seven,
            } = *entry
            {
                if points < 0 {
                    return Err(PolicyError::InvalidEntry {
                        player_id,
                        reason: format!("negative points {points}"),
                    });
                }
                if busted && flip_seven {
                    return Err(PolicyError::InvalidEntry {
                        player_id,
                        reason: "a busted hand cannot flip seven".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn score_round(
        &self,
        round: &RoundRecord,
        _totals: &BTreeMap<PlayerId, i64>,
    ) -> BTreeMap<PlayerId, RoundScore> {
        round
            .entries
            .iter()
            .filter_map(|(&id, entry)| match *entry {
                RoundEntry::Flip7 { busted: true, .. } => Some((id, RoundScore::bust())),
                RoundEntry::Flip7 {
                    points,
                    flip_seven,
                    ..
                } => {
                    let bonus = if flip_seven { FLIP_SEVEN_BONUS } else { 0 };
                    Some((id, RoundScore::points(points + bonus)))
                }
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::compute_standings;
    use uuid::Uuid;

    fn hand(points: i64) -> RoundEntry {
        RoundEntry::Flip7 {
            points,
            busted: false,
            flip_seven: false,
        }
    }

    #[test]
    fn test_bust_scores_nothing_and_bonus_applies() {
        let policy = Flip7Policy { target: 200 };
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let round = RoundRecord::new(
            1,
            [
                (
                    a,
                    RoundEntry::Flip7 {
                        points: 40,
                        busted: false,
                        flip_seven: true,
                    },
                ),
                (
                    b,
                    RoundEntry::Flip7 {
                        points: 30,
                        busted: true,
                        flip_seven: false,
                    },
                ),
            ],
        );
        let scores = policy.score_round(&round, &BTreeMap::new());
        assert_eq!(scores[&a], RoundScore::points(55));
        assert_eq!(scores[&b], RoundScore::bust());
    }

    #[test]
    fn test_target_reached() {
        let policy = Flip7Policy { target: 100 };
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let rounds = vec![
            RoundRecord::new(1, [(a, hand(60)), (b, hand(60)), (c, hand(10))]),
            RoundRecord::new(2, [(a, hand(45)), (b, hand(45)), (c, hand(5))]),
        ];
        let standings = compute_standings(&policy, &[a, b, c], &rounds);
        let outcome = policy.outcome(&standings).expect("target reached");
        assert_eq!(outcome.winners, vec![a, b]);
        assert_eq!(outcome.losers, vec![c]);
    }
}
