use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered life phases. Difficulty rises with each stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Youth,
    MiddleAge,
    Fulfillment,
}

impl Stage {
    pub const ALL: [Self; 3] = [Self::Youth, Self::MiddleAge, Self::Fulfillment];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Youth => "youth",
            Self::MiddleAge => "middle_age",
            Self::Fulfillment => "fulfillment",
        }
    }

    /// Power added on top of a challenge's base power.
    #[must_use]
    pub const fn power_modifier(self) -> i32 {
        match self {
            Self::Youth => 0,
            Self::MiddleAge => 1,
            Self::Fulfillment => 2,
        }
    }

    /// Next stage, or `None` after the final one.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Youth => Some(Self::MiddleAge),
            Self::MiddleAge => Some(Self::Fulfillment),
            Self::Fulfillment => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "youth" => Ok(Self::Youth),
            "middle_age" => Ok(Self::MiddleAge),
            "fulfillment" => Ok(Self::Fulfillment),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    #[default]
    NotStarted,
    InProgress,
    Paused,
    GameOver,
    Victory,
}

impl GameStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Paused => "paused",
            Self::GameOver => "game_over",
            Self::Victory => "victory",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::GameOver | Self::Victory)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-state of a running turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Setup,
    Draw,
    Challenge,
    CardSelection,
    Resolution,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Draw => "draw",
            Self::Challenge => "challenge",
            Self::CardSelection => "card_selection",
            Self::Resolution => "resolution",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
