use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use types::{GameConfig, GameType};

use crate::KeeperError;

/// Settings loaded from a YAML file, e.g.
///
/// ```yaml
/// database_url: scores.db
/// finalize_retries: 3
/// finalize_delay_ms: 50
/// games:
///   - game: skyjo
///     threshold: 150
///   - game: dart
///     start: 501
///     double_out: true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeeperConfig {
    pub database_url: Option<String>,
    pub finalize_retries: usize,
    pub finalize_delay_ms: u64,
    /// Per-game overrides of the built-in defaults.
    pub games: Vec<GameConfig>,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            finalize_retries: 3,
            finalize_delay_ms: 50,
            games: Vec::new(),
        }
    }
}

impl KeeperConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, KeeperError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, KeeperError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Configured settings for `game_type`, or the defaults for that many players.
    pub fn game_config(&self, game_type: GameType, num_players: usize) -> GameConfig {
        self.games
            .iter()
            .find(|config| config.game_type() == game_type)
            .cloned()
            .unwrap_or_else(|| GameConfig::default_for(game_type, num_players))
    }

    pub fn finalize_delay(&self) -> Duration {
        Duration::from_millis(self.finalize_delay_ms)
    }
}
