pub mod config;
pub mod game_type;
pub mod lifecycle;
pub mod outcome;
pub mod player;
pub mod round;
pub mod statistics;

pub use config::GameConfig;
pub use game_type::{GameType, ParseError};
pub use lifecycle::{LifecycleEvent, SessionState, TransitionError};
pub use outcome::{Direction, Outcome, Placement};
pub use player::{PlayerId, SessionId};
pub use round::{DartThrow, DartTurn, Multiplier, RoundEntry, RoundRecord};
pub use statistics::{FinalSummary, PlayerStatistics, PlayerSummary};
