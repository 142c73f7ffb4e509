use std::path::Path;

use boardmove_core::{MigrationError, MigrationResult};

use super::models::BoardExport;

pub struct BoardImporter;

impl BoardImporter {
    /// Parse and validate an export document.
    ///
    /// Anything that would stop the migration before its first step is
    /// reported here as `MalformedInput`: unparseable JSON, a missing
    /// `board` field, an unrecognized board type, or a board whose
    /// collections contradict its type.
    pub fn import_from_json(json: &str) -> MigrationResult<BoardExport> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|err| MigrationError::malformed(format!("Invalid JSON: {}", err)))?;

        if matches!(value.get("board"), None | Some(serde_json::Value::Null)) {
            return Err(MigrationError::malformed(
                "Expected {\"version\", \"exportDate\", \"board\": {...}}; no board found",
            ));
        }

        let export: BoardExport = serde_json::from_value(value).map_err(|err| {
            MigrationError::malformed(format!("Board does not match the export format: {}", err))
        })?;

        export.board.layout()?;
        Ok(export)
    }

    pub fn import_from_file(path: &Path) -> MigrationResult<BoardExport> {
        let content = std::fs::read_to_string(path)?;
        Self::import_from_json(&content)
    }
}
