//! Ordered list of destination columns and cards derived from a board.

use boardmove_core::MigrationResult;
use serde::Serialize;

use crate::board::{Board, BoardKind, BoardLayout};
use crate::card::Card;

#[derive(Debug, Clone, Serialize)]
pub struct PlannedColumn<'a> {
    pub title: &'a str,
    pub cards: Vec<&'a Card>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationPlan<'a> {
    pub kind: BoardKind,
    pub columns: Vec<PlannedColumn<'a>>,
    /// Whiteboard connections the destination cannot represent.
    pub unsupported_connections: usize,
}

/// Titles only, for printing a plan.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnOutline {
    pub title: String,
    pub cards: Vec<String>,
}

impl<'a> MigrationPlan<'a> {
    /// Build the plan, failing with `MalformedInput` when the board's shape
    /// does not match its type.
    ///
    /// A whiteboard collapses into a single column named after the board,
    /// its cards ordered top to bottom by `position.y`. Cards without canvas
    /// coordinates keep their relative order after every positioned card.
    pub fn from_board(board: &'a Board) -> MigrationResult<Self> {
        match board.layout()? {
            BoardLayout::Kanban { columns } => Ok(Self {
                kind: BoardKind::Kanban,
                columns: columns
                    .iter()
                    .map(|column| PlannedColumn {
                        title: &column.title,
                        cards: column.cards.iter().collect(),
                    })
                    .collect(),
                unsupported_connections: 0,
            }),
            BoardLayout::Whiteboard { cards, connections } => {
                let mut ordered: Vec<&Card> = cards.iter().collect();
                ordered.sort_by(|a, b| match (a.canvas_y(), b.canvas_y()) {
                    (Some(ya), Some(yb)) => ya.total_cmp(&yb),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                });
                Ok(Self {
                    kind: BoardKind::Whiteboard,
                    columns: vec![PlannedColumn {
                        title: &board.title,
                        cards: ordered,
                    }],
                    unsupported_connections: connections.len(),
                })
            }
        }
    }

    pub fn total_cards(&self) -> usize {
        self.columns.iter().map(|c| c.cards.len()).sum()
    }

    pub fn outline(&self) -> Vec<ColumnOutline> {
        self.columns
            .iter()
            .map(|column| ColumnOutline {
                title: column.title.to_string(),
                cards: column.cards.iter().map(|c| c.title.clone()).collect(),
            })
            .collect()
    }
}
