use std::collections::BTreeMap;

use types::{Direction, GameType, PlayerId, RoundEntry, RoundRecord};

use crate::policy::{check_entry_kinds, PolicyError, RoundScore, ScoringPolicy, Termination};

/// Penalty points over a fixed number of rounds. Going out with a hand-rommé
/// doubles everybody else's penalty.
#[derive(Debug, Clone, Copy)]
pub struct RommePolicy {
    pub rounds: u32,
}

impl ScoringPolicy for RommePolicy {
    fn game_type(&self) -> GameType {
        GameType::Romme
    }

    fn direction(&self) -> Direction {
        Direction::LowerIsBetter
    }

    fn termination(&self) -> Termination {
        Termination::FixedRounds {
            rounds: self.rounds,
        }
    }

    fn validate(&self, round: &RoundRecord) -> Result<(), PolicyError> {
        check_entry_kinds(GameType::Romme, round)?;
        let mut out = 0;
        for (&player_id, entry) in &round.entries {
            let RoundEntry::Romme {
                penalty,
                went_out,
                hand_romme,
            } = *entry
            else {
                continue;
            };
            let reason = if penalty < 0 {
                Some(format!("negative penalty {penalty}"))
            } else if went_out && penalty != 0 {
                Some(format!("went out holding {penalty} points"))
            } else if hand_romme && !went_out {
                Some("hand-rommé without going out".to_string())
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(PolicyError::InvalidEntry { player_id, reason });
            }
            out += went_out as usize;
        }
        if out > 1 {
            return Err(PolicyError::InvalidRound {
                round_number: round.round_number,
                reason: format!("{out} players went out"),
            });
        }
        Ok(())
    }

    fn score_round(
        &self,
        round: &RoundRecord,
        _totals: &BTreeMap<PlayerId, i64>,
    ) -> BTreeMap<PlayerId, RoundScore> {
        let doubled = round
            .entries
            .values()
            .any(|e| matches!(e, RoundEntry::Romme { hand_romme: true, .. }));
        round
            .entries
            .iter()
            .filter_map(|(&id, entry)| match *entry {
                RoundEntry::Romme {
                    went_out: true, ..
                } => Some((id, RoundScore::points(0))),
                RoundEntry::Romme { penalty, .. } if doubled => {
                    Some((id, RoundScore::points(penalty * 2)))
                }
                RoundEntry::Romme { penalty, .. } => Some((id, RoundScore::points(penalty))),
                _ => None,
            })
            .collect()
    }
}
