use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type MemberId = i64;
pub type ProjectId = i64;
pub type ActionId = i64;

/// Member rank. Set when the row is created and never changed by the
/// normal request flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Regular,
    Leader,
}

impl Rank {
    pub fn as_str(self) -> &'static str {
        match self {
            Rank::Regular => "regular",
            Rank::Leader => "leader",
        }
    }
}

/// The two kinds of action a member can file against a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Support,
    Protest,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Support => "support",
            ActionKind::Protest => "protest",
        }
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "support" => Ok(ActionKind::Support),
            "protest" => Ok(ActionKind::Protest),
            other => Err(format!("unknown action type '{other}'")),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single member's judgment on one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteDirection::Up => "up",
            VoteDirection::Down => "down",
        }
    }
}
