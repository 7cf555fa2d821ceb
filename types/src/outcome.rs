use serde::{Deserialize, Serialize};

use crate::PlayerId;

/// Which way a score improves.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    LowerIsBetter,
    HigherIsBetter,
}

impl Direction {
    pub fn better(self, a: i64, b: i64) -> i64 {
        match self {
            Direction::LowerIsBetter => a.min(b),
            Direction::HigherIsBetter => a.max(b),
        }
    }

    pub fn worse(self, a: i64, b: i64) -> i64 {
        match self {
            Direction::LowerIsBetter => a.max(b),
            Direction::HigherIsBetter => a.min(b),
        }
    }

    /// Folds an optional running best with a new optional value.
    pub fn fold_best(self, current: Option<i64>, value: Option<i64>) -> Option<i64> {
        match (current, value) {
            (Some(c), Some(v)) => Some(self.better(c, v)),
            (c, v) => c.or(v),
        }
    }

    pub fn fold_worst(self, current: Option<i64>, value: Option<i64>) -> Option<i64> {
        match (current, value) {
            (Some(c), Some(v)) => Some(self.worse(c, v)),
            (c, v) => c.or(v),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Winner,
    Loser,
    Neither,
}

/// End-of-game result. Ties are kept: every tied player is listed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub winners: Vec<PlayerId>,
    pub losers: Vec<PlayerId>,
}

impl Outcome {
    /// Builds an outcome where nobody is both winner and loser; a player
    /// listed in both keeps the win.
    pub fn new(winners: Vec<PlayerId>, losers: Vec<PlayerId>) -> Self {
        let losers = losers
            .into_iter()
            .filter(|id| !winners.contains(id))
            .collect();
        Self { winners, losers }
    }

    pub fn placement(&self, player_id: &PlayerId) -> Placement {
        if self.winners.contains(player_id) {
            Placement::Winner
        } else if self.losers.contains(player_id) {
            Placement::Loser
        } else {
            Placement::Neither
        }
    }

    pub fn is_winner(&self, player_id: &PlayerId) -> bool {
        self.placement(player_id) == Placement::Winner
    }

    pub fn is_loser(&self, player_id: &PlayerId) -> bool {
        self.placement(player_id) == Placement::Loser
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_direction_best_and_worst() {
        assert_eq!(Direction::LowerIsBetter.better(3, -2), -2);
        assert_eq!(Direction::HigherIsBetter.better(3, -2), 3);
        assert_eq!(Direction::LowerIsBetter.worse(3, -2), 3);
        assert_eq!(Direction::HigherIsBetter.fold_best(None, Some(4)), Some(4));
        assert_eq!(Direction::HigherIsBetter.fold_best(Some(9), None), Some(9));
        assert_eq!(Direction::LowerIsBetter.fold_worst(Some(9), Some(12)), Some(12));
    }

    #[test]
    fn test_outcome_never_overlaps() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let outcome = Outcome::new(vec![a], vec![a, b]);
        assert_eq!(outcome.losers, vec![b]);
        assert_eq!(outcome.placement(&a), Placement::Winner);
        assert_eq!(outcome.placement(&b), Placement::Loser);
        assert_eq!(outcome.placement(&Uuid::new_v4()), Placement::Neither);
    }
}
