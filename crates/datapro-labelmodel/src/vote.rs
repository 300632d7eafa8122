//! The three-valued output of a labeling function.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LabelModelError;

/// A single source's opinion on a single example.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Vote {
    Negative,
    #[default]
    Abstain,
    Positive,
}

impl Vote {
    pub fn as_i8(self) -> i8 {
        match self {
            Vote::Negative => -1,
            Vote::Abstain => 0,
            Vote::Positive => 1,
        }
    }

    /// Signed weight used by the probability model (+1, 0, -1).
    #[inline]
    pub fn sign(self) -> f64 {
        self.as_i8() as f64
    }

    pub fn is_abstain(self) -> bool {
        self == Vote::Abstain
    }

    /// Whether two non-abstaining votes disagree.
    pub fn conflicts_with(self, other: Vote) -> bool {
        !self.is_abstain() && !other.is_abstain() && self != other
    }
}

impl TryFrom<i64> for Vote {
    type Error = LabelModelError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Vote::Negative),
            0 => Ok(Vote::Abstain),
            1 => Ok(Vote::Positive),
            other => Err(LabelModelError::InvalidVote(other)),
        }
    }
}

impl TryFrom<i8> for Vote {
    type Error = LabelModelError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        Vote::try_from(value as i64)
    }
}

impl From<Vote> for i8 {
    fn from(vote: Vote) -> Self {
        vote.as_i8()
    }
}

impl From<bool> for Vote {
    fn from(positive: bool) -> Self {
        if positive {
            Vote::Positive
        } else {
            Vote::Negative
        }
    }
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i8())
    }
}
