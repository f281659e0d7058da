//! The two per-item state machines and their allowed transitions.
//!
//! Pipeline status (processing stage):
//!
//! | from              | to                                                    |
//! |-------------------|-------------------------------------------------------|
//! | `new`             | `synced`                                              |
//! | `synced`          | `parsed`, `needs_info`                                |
//! | `parsed`          | `needs_info`, `suggested`, `no_availability`          |
//! | `needs_info`      | `parsed`, `suggested`, `no_availability`              |
//! | `error`           | `parsed`, `needs_info`, `suggested`, `no_availability`|
//! | `no_availability` | `suggested`                                           |
//! | `suggested`       | `no_availability`                                     |
//!
//! Every status may stay where it is and may move to `error`.
//!
//! Business status only moves forward:
//! `new → extracted → suggested → replied → closed` (steps may be skipped).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::UnknownValue;

/// Processing stage of a pipeline item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Ingested, not yet attached to an inquiry.
    New,
    /// Attached to an inquiry.
    Synced,
    /// Extracted; the gate found nothing missing.
    Parsed,
    /// Extracted; the gate reported gaps.
    NeedsInfo,
    /// Suggest ran and found nothing.
    NoAvailability,
    /// Suggest ran and found candidates.
    Suggested,
    /// A stage failed for this item.
    Error,
}

impl PipelineStatus {
    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Synced => "synced",
            Self::Parsed => "parsed",
            Self::NeedsInfo => "needs_info",
            Self::NoAvailability => "no_availability",
            Self::Suggested => "suggested",
            Self::Error => "error",
        }
    }

    /// Whether the transition table allows `self → next`.
    pub fn can_transition_to(self, next: Self) -> bool {
        use PipelineStatus::*;
        if self == next || next == Error {
            return true;
        }
        matches!(
            (self, next),
            (New, Synced)
                | (Synced, Parsed | NeedsInfo)
                | (Parsed, NeedsInfo | Suggested | NoAvailability)
                | (NeedsInfo, Parsed | Suggested | NoAvailability)
                | (Error, Parsed | NeedsInfo | Suggested | NoAvailability)
                | (NoAvailability, Suggested)
                | (Suggested, NoAvailability)
        )
    }
}

impl FromStr for PipelineStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "synced" => Ok(Self::Synced),
            "parsed" => Ok(Self::Parsed),
            "needs_info" => Ok(Self::NeedsInfo),
            "no_availability" => Ok(Self::NoAvailability),
            "suggested" => Ok(Self::Suggested),
            "error" => Ok(Self::Error),
            other => Err(UnknownValue {
                field: "pipeline_status",
                value: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guest-facing lifecycle stage of an inquiry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BusinessStatus {
    /// Received.
    #[default]
    New,
    /// Booking parameters are complete.
    Extracted,
    /// Candidates were found.
    Suggested,
    /// A reply went out.
    Replied,
    /// Done.
    Closed,
}

impl BusinessStatus {
    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Extracted => "extracted",
            Self::Suggested => "suggested",
            Self::Replied => "replied",
            Self::Closed => "closed",
        }
    }

    /// Forward-only: staying put or moving to a later stage.
    pub fn can_transition_to(self, next: Self) -> bool {
        next >= self
    }

    /// Automated stages must not touch business fields from here on.
    pub fn is_locked(self) -> bool {
        matches!(self, Self::Replied | Self::Closed)
    }

    /// Parsing is a no-op from here on.
    pub fn is_past_extraction(self) -> bool {
        self >= Self::Suggested
    }

    /// `self` or `next`, whichever is later.
    pub fn advance(self, next: Self) -> Self {
        self.max(next)
    }
}

impl FromStr for BusinessStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "extracted" => Ok(Self::Extracted),
            "suggested" => Ok(Self::Suggested),
            "replied" => Ok(Self::Replied),
            "closed" => Ok(Self::Closed),
            other => Err(UnknownValue {
                field: "business_status",
                value: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for BusinessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
