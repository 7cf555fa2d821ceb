use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A stored or typed name that matches no known variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {kind}: {value}")]
pub struct ParseError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    Skyjo,
    Dart,
    Schwimmen,
    Wizard,
    Romme,
    Flip7,
}

impl GameType {
    pub const ALL: [GameType; 6] = [
        GameType::Skyjo,
        GameType::Dart,
        GameType::Schwimmen,
        GameType::Wizard,
        GameType::Romme,
        GameType::Flip7,
    ];

    /// Stable key used in storage columns.
    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::Skyjo => "skyjo",
            GameType::Dart => "dart",
            GameType::Schwimmen => "schwimmen",
            GameType::Wizard => "wizard",
            GameType::Romme => "romme",
            GameType::Flip7 => "flip7",
        }
    }
}

impl Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GameType::Skyjo => "Skyjo",
            GameType::Dart => "Dart",
            GameType::Schwimmen => "Schwimmen",
            GameType::Wizard => "Wizard",
            GameType::Romme => "Rommé",
            GameType::Flip7 => "Flip7",
        };
        write!(f, "{name}")
    }
}

impl FromStr for GameType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skyjo" => Ok(GameType::Skyjo),
            "dart" | "darts" => Ok(GameType::Dart),
            "schwimmen" => Ok(GameType::Schwimmen),
            "wizard" => Ok(GameType::Wizard),
            "romme" | "rommé" | "rummy" => Ok(GameType::Romme),
            "flip7" | "flip 7" => Ok(GameType::Flip7),
            _ => Err(ParseError::new("game type", s)),
        }
    }
}
