use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use types::{
    Direction, FinalSummary, GameType, Outcome, PlayerId, PlayerSummary, RoundRecord, SessionId,
    SessionState,
};

use crate::aggregator::{compute_standings, Standings};
use crate::policy::ScoringPolicy;

/// Immutable snapshot of one session, rebuilt from persisted rows after
/// every mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub game_type: GameType,
    pub state: SessionState,
    pub participants: Vec<PlayerId>,
    pub rounds: Vec<RoundRecord>,
    pub standings: Standings,
    /// Score shown for each player (remaining points for countdown games).
    pub display_scores: BTreeMap<PlayerId, i64>,
    pub end_direction: Direction,
    pub dealer: Option<PlayerId>,
    pub next_round: u32,
    pub outcome: Option<Outcome>,
}

/// Dealer of the next round: seats rotate once per round played.
pub fn dealer_for(participants: &[PlayerId], rounds_played: u32) -> Option<PlayerId> {
    if participants.is_empty() {
        return None;
    }
    participants
        .get(rounds_played as usize % participants.len())
        .copied()
}

pub fn next_round_number(policy: &dyn ScoringPolicy, rounds: &[RoundRecord]) -> u32 {
    rounds
        .iter()
        .map(|r| r.round_number + 1)
        .max()
        .unwrap_or_else(|| policy.round_origin())
}

impl SessionView {
    /// `recorded` is the outcome stored at game end; without it the
    /// termination rules of `policy` are evaluated on the fresh standings.
    pub fn build(
        session_id: SessionId,
        state: SessionState,
        policy: &dyn ScoringPolicy,
        participants: Vec<PlayerId>,
        rounds: Vec<RoundRecord>,
        recorded: Option<Outcome>,
    ) -> Self {
        let standings = compute_standings(policy, &participants, &rounds);
        let display_scores = standings
            .players
            .iter()
            .map(|p| (p.player_id, policy.end_score(p.total)))
            .collect();
        let outcome = recorded.or_else(|| policy.outcome(&standings));
        Self {
            session_id,
            game_type: policy.game_type(),
            state,
            dealer: dealer_for(&participants, standings.rounds_played),
            next_round: next_round_number(policy, &rounds),
            participants,
            rounds,
            standings,
            display_scores,
            end_direction: policy.end_direction(),
            outcome,
        }
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn final_summary(&self, outcome: &Outcome) -> FinalSummary {
        let players = self
            .standings
            .players
            .iter()
            .map(|p| PlayerSummary {
                player_id: p.player_id,
                placement: outcome.placement(&p.player_id),
                rounds_played: p.rounds_played,
                best_round: p.best_round,
                worst_round: p.worst_round,
                round_total: p.round_total(),
                end_score: self.display_scores.get(&p.player_id).copied().unwrap_or(p.total),
            })
            .collect();
        FinalSummary {
            session_id: self.session_id,
            game_type: self.game_type,
            direction: self.standings.direction,
            end_direction: self.end_direction,
            rounds_played: self.standings.rounds_played,
            players,
        }
    }
}
