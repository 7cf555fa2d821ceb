use serde::{Deserialize, Serialize};

use crate::GameType;

pub const SKYJO_THRESHOLD: i64 = 100;
pub const DART_START: i64 = 301;
pub const SCHWIMMEN_LIVES: i64 = 4;
pub const WIZARD_CARDS: u32 = 60;
pub const ROMME_ROUNDS: u32 = 7;
pub const FLIP7_TARGET: i64 = 200;

/// Per-session game settings, stored alongside the session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum GameConfig {
    Skyjo { threshold: i64 },
    Dart { start: i64, double_out: bool },
    Schwimmen { lives: i64 },
    Wizard { rounds: u32 },
    Romme { rounds: u32 },
    Flip7 { target: i64 },
}

impl GameConfig {
    /// Standard settings for a table of `num_players`.
    pub fn default_for(game_type: GameType, num_players: usize) -> Self {
        match game_type {
            GameType::Skyjo => GameConfig::Skyjo {
                threshold: SKYJO_THRESHOLD,
            },
            GameType::Dart => GameConfig::Dart {
                start: DART_START,
                double_out: false,
            },
            GameType::Schwimmen => GameConfig::Schwimmen {
                lives: SCHWIMMEN_LIVES,
            },
            GameType::Wizard => GameConfig::Wizard {
                rounds: WIZARD_CARDS / num_players.max(1) as u32,
            },
            GameType::Romme => GameConfig::Romme {
                rounds: ROMME_ROUNDS,
            },
            GameType::Flip7 => GameConfig::Flip7 {
                target: FLIP7_TARGET,
            },
        }
    }

    pub fn game_type(&self) -> GameType {
        match self {
            GameConfig::Skyjo { .. } => GameType::Skyjo,
            GameConfig::Dart { .. } => GameType::Dart,
            GameConfig::Schwimmen { .. } => GameType::Schwimmen,
            GameConfig::Wizard { .. } => GameType::Wizard,
            GameConfig::Romme { .. } => GameType::Romme,
            GameConfig::Flip7 { .. } => GameType::Flip7,
        }
    }
}
