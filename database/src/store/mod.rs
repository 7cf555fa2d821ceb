mod sqlite_store;
mod traits;

pub use sqlite_store::SqliteStore;
pub use traits::ScoreStore;
