use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use types::{GameConfig, GameType, PlayerId, PlayerStatistics, SessionId, SessionState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub game_type: GameType,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub state: SessionState,
    pub dealer_id: Option<PlayerId>,
    /// Number of the first round (0 for darts, 1 otherwise).
    pub round_origin: u32,
    pub config: GameConfig,
}

/// Everything needed to open a session. Seats follow the order of `players`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub config: GameConfig,
    pub players: Vec<PlayerId>,
    pub round_origin: u32,
    pub dealer_id: Option<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipationRecord {
    pub session_id: SessionId,
    pub player_id: PlayerId,
    pub seat_index: u32,
    pub is_winner: bool,
    pub is_loser: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetRecord {
    pub id: i64,
    pub game_type: GameType,
    pub name: String,
    pub players: Vec<PlayerId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// The round number matched the newest round, which was overwritten.
    Replaced,
}

/// One row of the statistics table, joined with the player's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsRow {
    pub player_name: String,
    pub stats: PlayerStatistics,
}

/// Aggregates over every player of one game type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsOverview {
    pub players: u32,
    pub finalized_sessions: u32,
    pub participations: u32,
    pub wins: u32,
    pub rounds_played: u32,
}
