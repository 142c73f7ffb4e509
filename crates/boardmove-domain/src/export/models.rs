//! Export data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::stats::BoardStats;

pub const EXPORT_FORMAT_VERSION: &str = "2.0.0";

/// A single exported board with its envelope metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardExport {
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_platform: Option<String>,
    pub board: Board,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<BoardStats>,
}

impl BoardExport {
    /// Wrap a board, stamping the current time and computing its stats.
    pub fn new(board: Board) -> Self {
        let stats = BoardStats::from_board(&board);
        Self {
            version: EXPORT_FORMAT_VERSION.to_string(),
            export_date: Some(Utc::now()),
            platform: None,
            target_platform: None,
            board,
            stats: Some(stats),
        }
    }

    pub fn with_platforms(mut self, platform: &str, target: &str) -> Self {
        self.platform = Some(platform.to_string());
        self.target_platform = Some(target.to_string());
        self
    }
}
