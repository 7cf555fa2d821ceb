use serde::{Deserialize, Serialize};

use crate::{Direction, GameType, Placement, PlayerId, SessionId};

/// Long-lived, per player and game type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatistics {
    pub player_id: PlayerId,
    pub game_type: GameType,
    pub games_played: u32,
    pub games_won: u32,
    pub games_lost: u32,
    pub rounds_played: u32,
    pub best_round: Option<i64>,
    pub worst_round: Option<i64>,
    pub best_end: Option<i64>,
    pub worst_end: Option<i64>,
    pub total_end: i64,
    pub total_round_score: i64,
}

/// One participant's contribution from a single finished session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub player_id: PlayerId,
    pub placement: Placement,
    pub rounds_played: u32,
    pub best_round: Option<i64>,
    pub worst_round: Option<i64>,
    pub round_total: i64,
    pub end_score: i64,
}

/// Everything the finalizer needs to fold a finished session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalSummary {
    pub session_id: SessionId,
    pub game_type: GameType,
    pub direction: Direction,
    /// Direction of `end_score`; countdown games end on points left.
    pub end_direction: Direction,
    pub rounds_played: u32,
    pub players: Vec<PlayerSummary>,
}

impl PlayerStatistics {
    pub fn empty(player_id: PlayerId, game_type: GameType) -> Self {
        Self {
            player_id,
            game_type,
            games_played: 0,
            games_won: 0,
            games_lost: 0,
            rounds_played: 0,
            best_round: None,
            worst_round: None,
            best_end: None,
            worst_end: None,
            total_end: 0,
            total_round_score: 0,
        }
    }

    /// `direction` orders round scores, `end_direction` orders end scores.
    pub fn fold(
        &mut self,
        summary: &PlayerSummary,
        direction: Direction,
        end_direction: Direction,
    ) {
        self.games_played += 1;
        match summary.placement {
            Placement::Winner => self.games_won += 1,
            Placement::Loser => self.games_lost += 1,
            Placement::Neither => {}
        }
        self.rounds_played += summary.rounds_played;
        self.best_round = direction.fold_best(self.best_round, summary.best_round);
        self.worst_round = direction.fold_worst(self.worst_round, summary.worst_round);
        self.best_end = end_direction.fold_best(self.best_end, Some(summary.end_score));
        self.worst_end = end_direction.fold_worst(self.worst_end, Some(summary.end_score));
        self.total_end += summary.end_score;
        self.total_round_score += summary.round_total;
    }

    pub fn reset(&mut self) {
        *self = Self::empty(self.player_id, self.game_type);
    }

    pub fn average_end(&self) -> Option<f64> {
        (self.games_played > 0).then(|| self.total_end as f64 / self.games_played as f64)
    }

    pub fn average_round(&self) -> Option<f64> {
        (self.rounds_played > 0)
            .then(|| self.total_round_score as f64 / self.rounds_played as f64)
    }

    pub fn win_rate(&self) -> Option<f64> {
        (self.games_played > 0).then(|| self.games_won as f64 / self.games_played as f64)
    }
}
