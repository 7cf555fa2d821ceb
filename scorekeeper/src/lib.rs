pub mod config;
pub mod display;
pub mod error;
pub mod hub;
pub mod locks;
pub mod service;

pub use config::KeeperConfig;
pub use error::KeeperError;
pub use service::{ScoreKeeper, ViewReceiver};
