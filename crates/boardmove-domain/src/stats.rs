use serde::{Deserialize, Serialize};

use crate::board::{Board, BoardKind};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoardStats {
    #[serde(rename = "type")]
    pub kind: BoardKind,
    pub total_columns: usize,
    pub total_cards: usize,
    pub total_connections: usize,
    pub total_attachments: usize,
    pub total_embeds: usize,
}

impl BoardStats {
    pub fn from_board(board: &Board) -> Self {
        let cards = board.all_cards();
        Self {
            kind: board.kind,
            total_columns: board.columns.as_ref().map_or(0, Vec::len),
            total_cards: cards.len(),
            total_connections: board.connections.as_ref().map_or(0, Vec::len),
            total_attachments: cards.iter().map(|c| c.attachments.len()).sum(),
            total_embeds: cards.iter().map(|c| c.embeds.len()).sum(),
        }
    }
}
