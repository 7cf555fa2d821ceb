use std::collections::BTreeMap;

use types::{Direction, GameType, PlayerId, RoundEntry, RoundRecord};

use crate::policy::{check_entry_kinds, PolicyError, RoundScore, ScoringPolicy, Termination};

/// Round n deals n cards to each player, so the tricks of round n sum to n.
#[derive(Debug, Clone, Copy)]
pub struct WizardPolicy {
    pub rounds: u32,
}

pub fn wizard_points(bid: u32, tricks: u32) -> i64 {
    if bid == tricks {
        20 + 10 * tricks as i64
    } else {
        -10 * (bid as i64 - tricks as i64).abs()
    }
}

impl ScoringPolicy for WizardPolicy {
    fn game_type(&self) -> GameType {
        GameType::Wizard
    }

    fn direction(&self) -> Direction {
        Direction::HigherIsBetter
    }

    fn termination(&self) -> Termination {
        Termination::FixedRounds {
            rounds: self.rounds,
        }
    }

    fn validate(&self, round: &RoundRecord) -> Result<(), PolicyError> {
        check_entry_kinds(GameType::Wizard, round)?;
        let cards = round.round_number;
        let mut tricks_taken = 0;
        for (&player_id, entry) in &round.entries {
            if let RoundEntry::Wizard { bid, tricks } = *entry {
                if bid > cards || tricks > cards {
                    return Err(PolicyError::InvalidEntry {
                        player_id,
                        reason: format!("bid {bid} / tricks {tricks} with {cards} cards dealt"),
                    });
                }
                tricks_taken += tricks;
            }
        }
        if tricks_taken != cards {
            return Err(PolicyError::InvalidRound {
                round_number: round.round_number,
                reason: format!("{tricks_taken} tricks taken but {cards} were played"),
            });
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
                RoundEntry::Wizard { bid, tricks } => {
                    Some((id, RoundScore::points(wizard_points(bid, tricks))))
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

    fn bid(bid: u32, tricks: u32) -> RoundEntry {
        RoundEntry::Wizard { bid, tricks }
    }

    #[test]
    fn test_points() {
        assert_eq!(wizard_points(0, 0), 20);
        assert_eq!(wizard_points(3, 3), 50);
        assert_eq!(wizard_points(1, 3), -20);
        assert_eq!(wizard_points(2, 0), -20);
    }

    #[test]
    fn test_tricks_must_match_cards_dealt() {
        let policy = WizardPolicy { rounds: 20 };
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let good = RoundRecord::new(2, [(a, bid(1, 2)), (b, bid(0, 0))]);
        assert!(policy.validate(&good).is_ok());
        let short = RoundRecord::new(2, [(a, bid(1, 1)), (b, bid(0, 0))]);
        assert!(matches!(
            policy.validate(&short),
            Err(PolicyError::InvalidRound { .. })
        ));
        let overbid = RoundRecord::new(1, [(a, bid(2, 1)), (b, bid(0, 0))]);
        assert!(matches!(
            policy.validate(&overbid),
            Err(PolicyError::InvalidEntry { .. })
        ));
    }

    #[test]
    fn test_highest_total_wins_after_last_round() {
        let policy = WizardPolicy { rounds: 2 };
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut rounds = vec![RoundRecord::new(1, [(a, bid(1, 1)), (b, bid(1, 0))])];
        let standings = compute_standings(&policy, &[a, b], &rounds);
        assert_eq!(policy.outcome(&standings), None);

        rounds.push(RoundRecord::new(2, [(a, bid(0, 0)), (b, bid(2, 2))]));
        let standings = compute_standings(&policy, &[a, b], &rounds);
        let outcome = policy.outcome(&standings).expect("two rounds played");
        assert_eq!(outcome.winners, vec![a]);
        assert_eq!(outcome.losers, vec![b]);
    }
}
