use boardmove_core::{MigrationError, MigrationResult};
use serde::{Deserialize, Serialize};

use crate::card::Card;
use crate::column::Column;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardKind {
    /// Free-form canvas of positioned cards. The source application calls it
    /// a chalkboard.
    #[serde(alias = "chalkboard")]
    Whiteboard,
    Kanban,
    #[default]
    #[serde(other)]
    Unknown,
}

impl BoardKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Whiteboard => "whiteboard",
            Self::Kanban => "kanban",
            Self::Unknown => "unknown",
        }
    }
}

/// A link drawn between two whiteboard cards.
///
/// Extracted for completeness; the destination has no equivalent, so it is
/// never migrated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub position: serde_json::Value,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub style: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Board {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: BoardKind,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub settings: serde_json::Value,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<Card>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connections: Option<Vec<Connection>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<Column>>,
}

/// Borrowed view of the one child collection a board owns.
#[derive(Debug, Clone, Copy)]
pub enum BoardLayout<'a> {
    Whiteboard {
        cards: &'a [Card],
        connections: &'a [Connection],
    },
    Kanban {
        columns: &'a [Column],
    },
}

impl Board {
    pub fn whiteboard(title: impl Into<String>, cards: Vec<Card>) -> Self {
        Self {
            title: title.into(),
            kind: BoardKind::Whiteboard,
            cards: Some(cards),
            connections: Some(Vec::new()),
            ..Default::default()
        }
    }

    pub fn kanban(title: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            title: title.into(),
            kind: BoardKind::Kanban,
            columns: Some(columns),
            ..Default::default()
        }
    }

    pub fn with_connections(mut self, connections: Vec<Connection>) -> Self {
        self.connections = Some(connections);
        self
    }

    /// Resolve the board's shape, checking it agrees with its type.
    ///
    /// A board owns either a flat card list (whiteboard) or a list of columns
    /// (kanban), never both.
    pub fn layout(&self) -> MigrationResult<BoardLayout<'_>> {
        match self.kind {
            BoardKind::Whiteboard => {
                if self.columns.as_ref().is_some_and(|c| !c.is_empty()) {
                    return Err(MigrationError::malformed(
                        "whiteboard board must not contain columns",
                    ));
                }
                let cards = self.cards.as_deref().ok_or_else(|| {
                    MigrationError::malformed("whiteboard board is missing its cards")
                })?;
                Ok(BoardLayout::Whiteboard {
                    cards,
                    connections: self.connections.as_deref().unwrap_or(&[]),
                })
            }
            BoardKind::Kanban => {
                if self.cards.as_ref().is_some_and(|c| !c.is_empty()) {
                    return Err(MigrationError::malformed(
                        "kanban board must keep its cards inside columns",
                    ));
                }
                let columns = self.columns.as_deref().ok_or_else(|| {
                    MigrationError::malformed("kanban board is missing its columns")
                })?;
                Ok(BoardLayout::Kanban { columns })
            }
            BoardKind::Unknown => Err(MigrationError::malformed(
                "unrecognized board type; expected whiteboard or kanban",
            )),
        }
    }

    /// Every card on the board, in stored order.
    pub fn all_cards(&self) -> Vec<&Card> {
        let mut cards: Vec<&Card> = self.cards.iter().flatten().collect();
        for column in self.columns.iter().flatten() {
            cards.extend(column.cards.iter());
        }
        cards
    }

    /// Copy with every generated identifier removed.
    ///
    /// Two extractions of the same page differ only in these ids.
    pub fn without_ids(&self) -> Self {
        let mut board = self.clone();
        board.id = None;
        for card in board.cards.iter_mut().flatten() {
            card.id = None;
        }
        for connection in board.connections.iter_mut().flatten() {
            connection.id = None;
        }
        for column in board.columns.iter_mut().flatten() {
            column.id = None;
            for card in column.cards.iter_mut() {
                card.id = None;
            }
        }
        board
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chalkboard_alias_parses_as_whiteboard() {
        let board: Board =
            serde_json::from_str(r#"{"title": "T", "type": "chalkboard", "cards": []}"#).unwrap();
        assert_eq!(board.kind, BoardKind::Whiteboard);
    }

    #[test]
    fn test_unrecognized_type_is_unknown() {
        let board: Board = serde_json::from_str(r#"{"title": "T", "type": "mindmap"}"#).unwrap();
        assert_eq!(board.kind, BoardKind::Unknown);
        assert!(matches!(
            board.layout(),
            Err(MigrationError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_kanban_layout() {
        let board = Board::kanban("K", vec![Column::new("Todo", vec![])]);
        match board.layout().unwrap() {
            BoardLayout::Kanban { columns } => assert_eq!(columns.len(), 1),
            other => panic!("unexpected layout {:?}", other),
        }
    }

    #[test]
    fn test_both_shapes_rejected() {
        let mut board = Board::kanban("K", vec![Column::new("Todo", vec![])]);
        board.cards = Some(vec![Card::new("stray", "")]);
        assert!(board.layout().is_err());

        let mut board = Board::whiteboard("W", vec![]);
        board.columns = Some(vec![Column::new("Todo", vec![])]);
        assert!(board.layout().is_err());
    }

    #[test]
    fn test_missing_collection_rejected() {
        let board: Board = serde_json::from_str(r#"{"title": "K", "type": "kanban"}"#).unwrap();
        assert!(board.layout().is_err());
    }

    #[test]
    fn test_without_ids() {
        let mut card = Card::new("a", "b");
        card.id = Some("id_1".to_string());
        let mut board = Board::whiteboard("W", vec![card]);
        board.id = Some("board".to_string());

        let stripped = board.without_ids();
        assert!(stripped.id.is_none());
        assert!(stripped.cards.unwrap()[0].id.is_none());
    }
}
