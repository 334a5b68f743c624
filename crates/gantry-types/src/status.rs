//! Run and job lifecycle status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status shared by runs and jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Unknown,
    Success,
    Failure,
    Cancelled,
    Skipped,
    Waiting,
    Running,
    Blocked,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Cancelled => "cancelled",
            Self::Skipped => "skipped",
            Self::Waiting => "waiting",
            Self::Running => "running",
            Self::Blocked => "blocked",
        }
    }

    /// Terminal statuses never change again.
    pub fn is_done(&self) -> bool {
        matches!(
            self,
            Self::Success | Self::Failure | Self::Cancelled | Self::Skipped
        )
    }

    /// Statuses a superseding dispatch is allowed to cancel.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Waiting | Self::Running | Self::Blocked)
    }

    /// All statuses a superseding dispatch looks for.
    pub fn active() -> &'static [Status] {
        &[Self::Waiting, Self::Running, Self::Blocked]
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored status string is not recognised.
#[derive(Debug, Error)]
#[error("unknown status '{0}'")]
pub struct ParseStatusError(pub String);

impl FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "unknown" => Self::Unknown,
            "success" => Self::Success,
            "failure" => Self::Failure,
            "cancelled" => Self::Cancelled,
            "skipped" => Self::Skipped,
            "waiting" => Self::Waiting,
            "running" => Self::Running,
            "blocked" => Self::Blocked,
            other => return Err(ParseStatusError(other.to_string())),
        })
    }
}
