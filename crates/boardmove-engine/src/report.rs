use boardmove_core::{ErrorKind, LogEntry, Loggable, MigrationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One card or column that did not migrate cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemError {
    pub column: usize,
    pub column_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_title: Option<String>,
    pub kind: ErrorKind,
    pub message: String,
}

impl ItemError {
    pub fn column(column: usize, title: &str, error: &MigrationError) -> Self {
        Self {
            column,
            column_title: title.to_string(),
            card: None,
            card_title: None,
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    pub fn card(
        column: usize,
        column_title: &str,
        card: usize,
        card_title: &str,
        error: &MigrationError,
    ) -> Self {
        Self {
            card: Some(card),
            card_title: Some(card_title.to_string()),
            ..Self::column(column, column_title, error)
        }
    }
}

/// Outcome of one migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub columns_created: usize,
    pub cards_created: usize,
    pub per_item_errors: Vec<ItemError>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub log: Vec<LogEntry>,
}

impl Default for MigrationReport {
    fn default() -> Self {
        Self::start()
    }
}

impl MigrationReport {
    pub fn start() -> Self {
        Self {
            columns_created: 0,
            cards_created: 0,
            per_item_errors: Vec::new(),
            warnings: Vec::new(),
            cancelled: false,
            started_at: Utc::now(),
            finished_at: None,
            log: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn record_error(&mut self, error: ItemError) {
        self.add_log(LogEntry::error(match &error.card_title {
            Some(card) => format!("Card '{}' in '{}': {}", card, error.column_title, error.message),
            None => format!("Column '{}': {}", error.column_title, error.message),
        }));
        self.per_item_errors.push(error);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.add_log(LogEntry::warn(message.clone()));
        self.warnings.push(message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.add_log(LogEntry::info(message));
    }

    pub fn failed_items(&self) -> usize {
        self.per_item_errors.len()
    }

    /// Every item migrated and the run was not cancelled.
    pub fn is_complete(&self) -> bool {
        self.per_item_errors.is_empty() && !self.cancelled
    }

    pub fn summary(&self) -> String {
        let counts = format!(
            "{} {}, {} {}",
            self.columns_created,
            plural(self.columns_created, "column", "columns"),
            self.cards_created,
            plural(self.cards_created, "card", "cards"),
        );
        if self.is_complete() {
            return format!("Migration complete: {}", counts);
        }
        let mut summary = format!(
            "Migration partially complete: {}, {} failed {}",
            counts,
            self.failed_items(),
            plural(self.failed_items(), "item", "items"),
        );
        if self.cancelled {
            summary.push_str(" (cancelled)");
        }
        summary
    }
}

fn plural(count: usize, one: &'static str, many: &'static str) -> &'static str {
    if count == 1 {
        one
    } else {
        many
    }
}

impl Loggable for MigrationReport {
    fn add_log(&mut self, entry: LogEntry) {
        self.log.push(entry);
    }

    fn get_logs(&self) -> &[LogEntry] {
        &self.log
    }
}
