use std::path::Path;

use boardmove_core::MigrationResult;

use super::models::BoardExport;

pub struct BoardExporter;

impl BoardExporter {
    pub fn export_to_json(export: &BoardExport) -> MigrationResult<String> {
        Ok(serde_json::to_string_pretty(export)?)
    }

    pub fn export_to_file(export: &BoardExport, path: &Path) -> MigrationResult<()> {
        let json = Self::export_to_json(export)?;
        std::fs::write(path, json)?;
        tracing::info!("Exported board to: {}", path.display());
        Ok(())
    }

    /// File name that identifies the board, e.g.
    /// `board_kanban_Sprint_Plan_2024-05-01.json`.
    pub fn suggested_filename(export: &BoardExport) -> String {
        let title: String = export
            .board
            .title
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let date = export
            .export_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "undated".to_string());
        format!("board_{}_{}_{}.json", export.board.kind.label(), title, date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Board, Card, Column};
    use chrono::TimeZone;

    #[test]
    fn test_export_to_json() {
        let board = Board::kanban("Test", vec![Column::new("Todo", vec![Card::new("x", "y")])]);
        let export = BoardExport::new(board);

        let json = BoardExporter::export_to_json(&export).unwrap();
        assert!(json.contains("\"exportDate\""));
        assert!(json.contains("\"type\": \"kanban\""));
        assert!(json.contains("\"totalCards\": 1"));
    }

    #[test]
    fn test_suggested_filename() {
        let mut export = BoardExport::new(Board::whiteboard("Plan: Q3", vec![]));
        export.export_date = Some(chrono::Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());

        assert_eq!(
            BoardExporter::suggested_filename(&export),
            "board_whiteboard_Plan__Q3_2024-05-01.json"
        );
    }
}
