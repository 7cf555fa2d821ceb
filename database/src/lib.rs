pub mod config;
pub mod error;
pub mod models;
pub mod retry;
pub mod store;

pub use config::DatabaseConfig;
pub use error::{DatabaseError, ErrorKind};
pub use models::{
    AppendOutcome, NewSession, ParticipationRecord, PlayerRecord, PresetRecord, SessionRecord,
    StatisticsOverview, StatisticsRow,
};
pub use retry::retry_with_backoff;
pub use store::{ScoreStore, SqliteStore};
