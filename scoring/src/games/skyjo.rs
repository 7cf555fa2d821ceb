use std::collections::BTreeMap;

use types::{Direction, GameType, PlayerId, RoundEntry, RoundRecord};

use crate::policy::{check_entry_kinds, PolicyError, RoundScore, ScoringPolicy, Termination};

/// Twelve cards valued -2..=12.
const MIN_ROUND: i64 = -24;
const MAX_ROUND: i64 = 144;

#[derive(Debug, Clone, Copy)]
pub struct SkyjoPolicy {
    pub threshold: i64,
}

impl ScoringPolicy for SkyjoPolicy {
    fn game_type(&self) -> GameType {
        GameType::Skyjo
    }

    fn direction(&self) -> Direction {
        Direction::LowerIsBetter
    }

    fn termination(&self) -> Termination {
        Termination::Ceiling {
            threshold: self.threshold,
        }
    }

    fn validate(&self, round: &RoundRecord) -> Result<(), PolicyError> {
        check_entry_kinds(GameType::Skyjo, round)?;
        let mut closers = 0;
        for (&player_id, entry) in &round.entries {
            if let RoundEntry::Skyjo {
                points,
                closed_round,
            } = *entry
            {
                if !(MIN_ROUND..=MAX_ROUND).contains(&points) {
                    return Err(PolicyError::InvalidEntry {
                        player_id,
                        reason: format!("{points} is outside {MIN_ROUND}..={MAX_ROUND}"),
                    });
                }
                closers += closed_round as usize;
            }
        }
        if closers > 1 {
            return Err(PolicyError::InvalidRound {
                round_number: round.round_number,
                reason: format!("{closers} players closed the round"),
            });
        }
        Ok(())
    }

    fn score_round(
        &self,
        round: &RoundRecord,
        _totals: &BTreeMap<PlayerId, i64>,
    ) -> BTreeMap<PlayerId, RoundScore> {
        let points: Vec<(PlayerId, i64, bool)> = round
            .entries
            .iter()
            .filter_map(|(&id, entry)| match *entry {
                RoundEntry::Skyjo {
                    points,
                    closed_round,
                } => Some((id, points, closed_round)),
                _ => None,
            })
            .collect();

        points
            .iter()
            .map(|&(id, value, closed_round)| {
                // the closer pays double unless they are strictly lowest
                let undercut = points
                    .iter()
                    .any(|&(other, other_value, _)| other != id && other_value <= value);
                let value = if closed_round && value > 0 && undercut {
                    value * 2
                } else {
                    value
                };
                (id, RoundScore::points(value))
            })
            .collect()
    }
}
