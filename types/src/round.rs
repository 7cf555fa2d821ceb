use std::{collections::BTreeMap, fmt::Display};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{GameType, PlayerId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplier {
    Single,
    Double,
    Triple,
}

impl Multiplier {
    pub fn factor(self) -> i64 {
        match self {
            Multiplier::Single => 1,
            Multiplier::Double => 2,
            Multiplier::Triple => 3,
        }
    }
}

pub const BULL: u8 = 25;

/// One dart. Segment 0 is a miss, 25 is the bull.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DartThrow {
    pub segment: u8,
    pub multiplier: Multiplier,
}

impl DartThrow {
    pub fn new(segment: u8, multiplier: Multiplier) -> Self {
        Self {
            segment,
            multiplier,
        }
    }

    pub fn single(segment: u8) -> Self {
        Self::new(segment, Multiplier::Single)
    }

    pub fn double(segment: u8) -> Self {
        Self::new(segment, Multiplier::Double)
    }

    pub fn triple(segment: u8) -> Self {
        Self::new(segment, Multiplier::Triple)
    }

    pub fn miss() -> Self {
        Self::single(0)
    }

    pub fn points(&self) -> i64 {
        self.segment as i64 * self.multiplier.factor()
    }

    pub fn is_valid(&self) -> bool {
        match self.segment {
            0..=20 => true,
            BULL => self.multiplier != Multiplier::Triple,
            _ => false,
        }
    }
}

impl Display for DartThrow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.multiplier {
            Multiplier::Single => write!(f, "{}", self.segment),
            Multiplier::Double => write!(f, "D{}", self.segment),
            Multiplier::Triple => write!(f, "T{}", self.segment),
        }
    }
}

pub const MAX_THROWS_PER_TURN: usize = 3;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DartTurn {
    pub throws: Vec<DartThrow>,
}

impl DartTurn {
    pub fn new(throws: Vec<DartThrow>) -> Self {
        Self { throws }
    }

    pub fn points(&self) -> i64 {
        self.throws.iter().map(DartThrow::points).sum()
    }

    pub fn last_throw(&self) -> Option<&DartThrow> {
        self.throws.iter().rev().find(|t| t.segment != 0)
    }
}

impl Display for DartTurn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.throws.iter().join(","))
    }
}

/// What one player scored in one round, shaped per game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoundEntry {
    Skyjo { points: i64, closed_round: bool },
    Dart(DartTurn),
    Schwimmen { lives_lost: i64 },
    Wizard { bid: u32, tricks: u32 },
    Romme { penalty: i64, went_out: bool, hand_romme: bool },
    Flip7 { points: i64, busted: bool, flip_seven: bool },
}

impl RoundEntry {
    pub fn skyjo(points: i64) -> Self {
        RoundEntry::Skyjo {
            points,
            closed_round: false,
        }
    }

    pub fn game_type(&self) -> GameType {
        match self {
            RoundEntry::Skyjo { .. } => GameType::Skyjo,
            RoundEntry::Dart(_) => GameType::Dart,
            RoundEntry::Schwimmen { .. } => GameType::Schwimmen,
            RoundEntry::Wizard { .. } => GameType::Wizard,
            RoundEntry::Romme { .. } => GameType::Romme,
            RoundEntry::Flip7 { .. } => GameType::Flip7,
        }
    }
}

impl Display for RoundEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundEntry::Skyjo {
                points,
                closed_round,
            } => write!(f, "{points}{}", if *closed_round { "*" } else { "" }),
            RoundEntry::Dart(turn) => write!(f, "{turn}"),
            RoundEntry::Schwimmen { lives_lost } => write!(f, "-{lives_lost}"),
            RoundEntry::Wizard { bid, tricks } => write!(f, "{bid}/{tricks}"),
            RoundEntry::Romme {
                penalty,
                went_out,
                hand_romme,
            } => match (went_out, hand_romme) {
                (true, true) => write!(f, "{penalty}!!"),
                (true, false) => write!(f, "{penalty}!"),
                _ => write!(f, "{penalty}"),
            },
            RoundEntry::Flip7 {
                points,
                busted,
                flip_seven,
            } => match (busted, flip_seven) {
                (true, _) => write!(f, "x"),
                (false, true) => write!(f, "{points}+"),
                (false, false) => write!(f, "{points}"),
            },
        }
    }
}

/// A single round of the ledger. Players absent from `entries` did not take
/// part in this round (e.g. they joined later).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round_number: u32,
    pub dealer: Option<PlayerId>,
    pub entries: BTreeMap<PlayerId, RoundEntry>,
}

impl RoundRecord {
    pub fn new(round_number: u32, entries: impl IntoIterator<Item = (PlayerId, RoundEntry)>) -> Self {
        Self {
            round_number,
            dealer: None,
            entries: entries.into_iter().collect(),
        }
    }

    pub fn with_dealer(mut self, dealer: Option<PlayerId>) -> Self {
        self.dealer = dealer;
        self
    }

    pub fn entry(&self, player_id: &PlayerId) -> Option<&RoundEntry> {
        self.entries.get(player_id)
    }
}
