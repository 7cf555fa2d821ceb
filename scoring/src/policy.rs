use std::{collections::BTreeMap, fmt::Debug};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use types::{Direction, GameConfig, GameType, Outcome, PlayerId, RoundRecord};

use crate::aggregator::{PlayerStanding, Standings};
use crate::games::{
    DartPolicy, Flip7Policy, RommePolicy, SchwimmenPolicy, SkyjoPolicy, WizardPolicy,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("{found} entry in a {expected} game")]
    WrongGame { expected: GameType, found: GameType },

    #[error("Invalid entry for player {player_id}: {reason}")]
    InvalidEntry { player_id: PlayerId, reason: String },

    #[error("Invalid round {round_number}: {reason}")]
    InvalidRound { round_number: u32, reason: String },
}

/// Value one player earned in one round after the game rules were applied.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundScore {
    pub value: i64,
    pub bust: bool,
}

impl RoundScore {
    pub fn points(value: i64) -> Self {
        Self { value, bust: false }
    }

    pub fn bust() -> Self {
        Self {
            value: 0,
            bust: true,
        }
    }
}

/// When a game is over and who won it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Ends once any total reaches the threshold; lowest total below it wins.
    Ceiling { threshold: i64 },
    /// Totals count down from `start`; reaching exactly zero wins.
    Countdown { start: i64 },
    /// Ends after a fixed number of rounds.
    FixedRounds { rounds: u32 },
    /// Ends once any total reaches the target; highest total wins.
    Target { target: i64 },
}

impl Termination {
    pub fn evaluate(&self, standings: &Standings) -> Option<Outcome> {
        let players = &standings.players;
        if players.is_empty() {
            return None;
        }
        match *self {
            Termination::Ceiling { threshold } => {
                let (over, under): (Vec<_>, Vec<_>) =
                    players.iter().partition(|p| p.total >= threshold);
                if over.is_empty() {
                    return None;
                }
                let losers = extreme_players(&over, Extreme::Max);
                let winners = if under.is_empty() {
                    extreme_players(&over, Extreme::Min)
                } else {
                    extreme_players(&under, Extreme::Min)
                };
                Some(Outcome::new(winners, losers))
            }
            Termination::Countdown { start } => {
                let (done, rest): (Vec<_>, Vec<_>) =
                    players.iter().partition(|p| p.total >= start);
                if done.is_empty() {
                    return None;
                }
                let winners = done.iter().map(|p| p.player_id).collect();
                Some(Outcome::new(winners, extreme_players(&rest, Extreme::Min)))
            }
            Termination::FixedRounds { rounds } => (standings.rounds_played >= rounds)
                .then(|| ranked_outcome(standings)),
            Termination::Target { target } => {
                let reached: Vec<_> = players.iter().filter(|p| p.total >= target).collect();
                if reached.is_empty() {
                    return None;
                }
                let all: Vec<_> = players.iter().collect();
                Some(Outcome::new(
                    extreme_players(&reached, Extreme::Max),
                    extreme_players(&all, Extreme::Min),
                ))
            }
        }
    }
}

/// Placement by total alone: every player sharing the best total wins,
/// every player sharing the worst total loses.
pub fn ranked_outcome(standings: &Standings) -> Outcome {
    let all: Vec<_> = standings.players.iter().collect();
    let (best, worst) = match standings.direction {
        Direction::LowerIsBetter => (Extreme::Min, Extreme::Max),
        Direction::HigherIsBetter => (Extreme::Max, Extreme::Min),
    };
    Outcome::new(extreme_players(&all, best), extreme_players(&all, worst))
}

#[derive(Copy, Clone)]
enum Extreme {
    Min,
    Max,
}

fn extreme_players(players: &[&PlayerStanding], extreme: Extreme) -> Vec<PlayerId> {
    let totals = players.iter().map(|p| p.total);
    let Some(target) = (match extreme {
        Extreme::Min => totals.min(),
        Extreme::Max => totals.max(),
    }) else {
        return Vec::new();
    };
    players
        .iter()
        .filter(|p| p.total == target)
        .map(|p| p.player_id)
        .collect()
}

/// The per-game rules the aggregator is parameterized with.
pub trait ScoringPolicy: Debug + Send + Sync {
    fn game_type(&self) -> GameType;

    fn direction(&self) -> Direction;

    /// Which way the end score improves, when it differs from the rounds.
    fn end_direction(&self) -> Direction {
        self.direction()
    }

    fn termination(&self) -> Termination;

    /// First round number of a fresh ledger.
    fn round_origin(&self) -> u32 {
        1
    }

    /// Checks a round against the rules before it is written to the ledger.
    fn validate(&self, round: &RoundRecord) -> Result<(), PolicyError>;

    /// Scores every entry of `round`. `totals` holds each player's total
    /// before this round.
    fn score_round(
        &self,
        round: &RoundRecord,
        totals: &BTreeMap<PlayerId, i64>,
    ) -> BTreeMap<PlayerId, RoundScore>;

    /// Score recorded as the player's end result.
    fn end_score(&self, total: i64) -> i64 {
        total
    }

    fn outcome(&self, standings: &Standings) -> Option<Outcome> {
        self.termination().evaluate(standings)
    }
}

pub fn policy_for(config: &GameConfig) -> Box<dyn ScoringPolicy> {
    match *config {
        GameConfig::Skyjo { threshold } => Box::new(SkyjoPolicy { threshold }),
        GameConfig::Dart { start, double_out } => Box::new(DartPolicy { start, double_out }),
        GameConfig::Schwimmen { lives } => Box::new(SchwimmenPolicy { lives }),
        GameConfig::Wizard { rounds } => Box::new(WizardPolicy { rounds }),
        GameConfig::Romme { rounds } => Box::new(RommePolicy { rounds }),
        GameConfig::Flip7 { target } => Box::new(Flip7Policy { target }),
    }
}

/// Rejects entries that belong to another game.
pub(crate) fn check_entry_kinds(game_type: GameType, round: &RoundRecord) -> Result<(), PolicyError> {
    if let Some(entry) = round.entries.values().find(|e| e.game_type() != game_type) {
        return Err(PolicyError::WrongGame {
            expected: game_type,
            found: entry.game_type(),
        });
    }
    Ok(())
}
