//! Refresh status values reported by the remote service

use serde::Deserialize;

/// Status of the most recent refresh
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshStatus {
    /// Reported as `Unknown`, which the service also uses while a refresh runs
    Unknown,
    Disabled,
    Completed,
    Failed,
    /// Anything else; the raw value is kept for logging
    InProgress(String),
}

impl RefreshStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "Unknown" => Self::Unknown,
            "Disabled" => Self::Disabled,
            "Completed" => Self::Completed,
            "Failed" => Self::Failed,
            other => Self::InProgress(other.to_string()),
        }
    }

    /// Only `Completed` and `Failed` end the poll loop
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for RefreshStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => f.write_str("Unknown"),
            Self::Disabled => f.write_str("Disabled"),
            Self::Completed => f.write_str("Completed"),
            Self::Failed => f.write_str("Failed"),
            Self::InProgress(raw) => f.write_str(raw),
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct RefreshHistory {
    #[serde(default)]
    pub value: Vec<RefreshEntry>,
}

#[derive(Deserialize)]
pub(crate) struct RefreshEntry {
    #[serde(default)]
    pub status: Option<String>,
}

impl RefreshHistory {
    /// Status of the newest entry; an empty history reads as `Unknown`
    pub fn latest(&self) -> RefreshStatus {
        self.value
            .first()
            .and_then(|e| e.status.as_deref())
            .map_or(RefreshStatus::Unknown, RefreshStatus::parse)
    }
}
