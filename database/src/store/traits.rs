use async_trait::async_trait;
use types::{
    FinalSummary, GameType, LifecycleEvent, Outcome, PlayerId, PlayerStatistics, RoundRecord,
    SessionId, SessionState,
};

use crate::models::{
    AppendOutcome, NewSession, ParticipationRecord, PlayerRecord, PresetRecord, SessionRecord,
    StatisticsOverview, StatisticsRow,
};
use crate::DatabaseError;

/// Persistence for players, sessions, round ledgers, statistics and presets.
///
/// Every method is atomic on its own. Callers that need a read-modify-write
/// across several methods serialize them per session.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    // Players
    async fn upsert_player(&self, name: &str) -> Result<PlayerRecord, DatabaseError>;
    async fn get_player(&self, id: PlayerId) -> Result<PlayerRecord, DatabaseError>;
    async fn get_player_by_name(&self, name: &str) -> Result<Option<PlayerRecord>, DatabaseError>;
    async fn list_players(&self) -> Result<Vec<PlayerRecord>, DatabaseError>;
    async fn rename_player(&self, id: PlayerId, name: &str) -> Result<(), DatabaseError>;
    /// Removes the player with their participations, statistics and preset
    /// memberships. Presets left without players are removed too.
    async fn delete_player(&self, id: PlayerId) -> Result<(), DatabaseError>;

    // Sessions
    async fn create_session(&self, new: &NewSession) -> Result<SessionRecord, DatabaseError>;
    async fn get_session(&self, id: SessionId) -> Result<SessionRecord, DatabaseError>;
    async fn list_sessions(
        &self,
        game_type: GameType,
        state: Option<SessionState>,
    ) -> Result<Vec<SessionRecord>, DatabaseError>;
    /// Applies a lifecycle event. A transition into `Deleted` purges the session.
    async fn transition(
        &self,
        id: SessionId,
        event: LifecycleEvent,
    ) -> Result<SessionState, DatabaseError>;
    async fn set_dealer(&self, id: SessionId, dealer: Option<PlayerId>)
        -> Result<(), DatabaseError>;
    /// Marks the session finished and records winner/loser flags.
    async fn finish_session(
        &self,
        id: SessionId,
        outcome: &Outcome,
    ) -> Result<SessionRecord, DatabaseError>;

    // Participants
    async fn add_participant(
        &self,
        id: SessionId,
        player_id: PlayerId,
    ) -> Result<ParticipationRecord, DatabaseError>;
    async fn remove_participant(
        &self,
        id: SessionId,
        player_id: PlayerId,
    ) -> Result<(), DatabaseError>;
    /// Ordered by seat.
    async fn list_participants(
        &self,
        id: SessionId,
    ) -> Result<Vec<ParticipationRecord>, DatabaseError>;

    // Ledger
    async fn append_round(
        &self,
        id: SessionId,
        round: &RoundRecord,
    ) -> Result<AppendOutcome, DatabaseError>;
    /// Returns the number of the removed round, or `None` on an empty ledger.
    async fn remove_last_round(&self, id: SessionId) -> Result<Option<u32>, DatabaseError>;
    async fn get_rounds(&self, id: SessionId) -> Result<Vec<RoundRecord>, DatabaseError>;
    async fn delete_all_rounds(&self, id: SessionId) -> Result<u64, DatabaseError>;

    // Statistics
    /// Folds a finished session into the statistics exactly once.
    async fn finalize(&self, summary: &FinalSummary) -> Result<(), DatabaseError>;
    async fn is_finalized(&self, id: SessionId) -> Result<bool, DatabaseError>;
    async fn get_statistics(&self, game_type: GameType)
        -> Result<Vec<StatisticsRow>, DatabaseError>;
    async fn get_player_statistics(
        &self,
        player_id: PlayerId,
        game_type: GameType,
    ) -> Result<Option<PlayerStatistics>, DatabaseError>;
    async fn statistics_overview(
        &self,
        game_type: GameType,
    ) -> Result<StatisticsOverview, DatabaseError>;
    async fn reset_all_stats(&self, game_type: GameType) -> Result<u64, DatabaseError>;

    // Presets
    async fn create_preset(
        &self,
        game_type: GameType,
        name: &str,
        players: &[PlayerId],
    ) -> Result<PresetRecord, DatabaseError>;
    async fn list_presets(&self, game_type: GameType) -> Result<Vec<PresetRecord>, DatabaseError>;
    async fn delete_preset(&self, id: i64) -> Result<(), DatabaseError>;
}
