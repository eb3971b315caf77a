/// Crawl job state definitions
///
/// This module defines every state a crawl job can be in between start and finish.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current state of a crawl job
///
/// `Started` through `Checking` are reported by the engine while it works;
/// `Completed` and `Failed` are terminal and are only ever set by the
/// orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlStatus {
    // ===== Active States =====
    /// Job registered, engine not yet fetching
    Started,

    /// Target page is being fetched
    Fetching,

    /// Response body is being parsed as HTML
    Parsing,

    /// Document is being analyzed
    Analyzing,

    /// Outbound links are being checked
    Checking,

    // ===== Terminal States =====
    /// Crawl finished and produced a result
    Completed,

    /// Crawl failed, was cancelled, or faulted
    Failed,
}

impl CrawlStatus {
    /// Returns true if this is a terminal state (no further transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if the job is still in flight
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Fetching => "fetching",
            Self::Parsing => "parsing",
            Self::Analyzing => "analyzing",
            Self::Checking => "checking",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "started" => Some(Self::Started),
            "fetching" => Some(Self::Fetching),
            "parsing" => Some(Self::Parsing),
            "analyzing" => Some(Self::Analyzing),
            "checking" => Some(Self::Checking),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all crawl states in pipeline order
    pub fn all_states() -> [Self; 7] {
        [
            Self::Started,
            Self::Fetching,
            Self::Parsing,
            Self::Analyzing,
            Self::Checking,
            Self::Completed,
            Self::Failed,
        ]
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
