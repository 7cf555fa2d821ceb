use std::collections::BTreeMap;

use types::{Direction, GameType, PlayerId, RoundEntry, RoundRecord};

use crate::policy::{check_entry_kinds, PolicyError, RoundScore, ScoringPolicy, Termination};

/// Totals are lives lost; a player is out once they reach `lives`.
#[derive(Debug, Clone, Copy)]
pub struct SchwimmenPolicy {
    pub lives: i64,
}

impl ScoringPolicy for SchwimmenPolicy {
    fn game_type(&self) -> GameType {
        GameType::Schwimmen
    }

    fn direction(&self) -> Direction {
        Direction::LowerIsBetter
    }

    fn termination(&self) -> Termination {
        Termination::Ceiling {
            threshold: self.lives,
        }
    }

    fn validate(&self, round: &RoundRecord) -> Result<(), PolicyError> {
        check_entry_kinds(GameType::Schwimmen, round)?;
        for (&player_id, entry) in &round.entries {
            if let RoundEntry::Schwimmen { lives_lost } = *entry {
                if !(0..=self.lives).contains(&lives_lost) {
                    return Err(PolicyError::InvalidEntry {
                        player_id,
                        reason: format!("cannot lose {lives_lost} of {} lives", self.lives),
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
                RoundEntry::Schwimmen { lives_lost } => Some((id, RoundScore::points(lives_lost))),
                _ => None,
            })
            .collect()
    }
}
