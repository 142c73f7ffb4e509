//! In-memory destination board.
//!
//! Models the behaviors the engine has to cope with on the real destination:
//! columns renumbered in place after an insertion, position attributes that
//! lag, add-card controls that only render for a hovered column, an open
//! card editor that disables the next add, column headers that re-render
//! and leave earlier references detached, and rich-text regions that accept
//! only some kinds of programmatic writes. Backs the engine's tests and dry
//! runs.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use boardmove_core::{MigrationError, MigrationResult};
use boardmove_domain::text::html_to_plain_text;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::surface::{EditCommand, NodeRef, Query, Rect, Surface, SyntheticEvent, Target};

const INDEX_ATTRIBUTE: &str = "data-testid";
const BOARD_WIDTH: f64 = 1200.0;
const BOARD_HEIGHT: f64 = 800.0;
const COLUMN_LEFT: f64 = 20.0;
const COLUMN_TOP: f64 = 60.0;
const COLUMN_WIDTH: f64 = 300.0;
const COLUMN_GAP: f64 = 20.0;
const COLUMN_HEIGHT: f64 = 700.0;

/// Quirks of the simulated destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimBehavior {
    /// New columns appear first and every existing column shifts right.
    pub insert_columns_at_front: bool,
    /// Column titles carry no position attribute and cannot be addressed by
    /// index.
    pub index_attribute_lags: bool,
    /// Add-card controls are hidden until their column is hovered.
    pub hover_gated_add_card: bool,
    /// Rich-text regions expose an editor instance.
    pub editor_api: bool,
    pub accept_command: bool,
    pub accept_keystrokes: bool,
    pub accept_direct: bool,
    pub add_column_control: bool,
    pub add_card_controls: bool,
    /// Clicks on an add-card control needed before a card appears.
    pub clicks_per_card: u32,
    pub card_title_fields: bool,
    /// Adding a card re-renders its column's title node. The old node is
    /// detached and any call that names it fails.
    pub rerender_title_on_card_add: bool,
}

impl Default for SimBehavior {
    fn default() -> Self {
        Self {
            insert_columns_at_front: false,
            index_attribute_lags: false,
            hover_gated_add_card: false,
            editor_api: true,
            accept_command: true,
            accept_keystrokes: true,
            accept_direct: true,
            add_column_control: true,
            add_card_controls: true,
            clicks_per_card: 1,
            card_title_fields: true,
            rerender_title_on_card_add: false,
        }
    }
}

impl SimBehavior {
    /// Everything the real destination does that gets in the way, while
    /// still accepting synthetic keystrokes.
    pub fn hostile() -> Self {
        Self {
            insert_columns_at_front: true,
            index_attribute_lags: false,
            hover_gated_add_card: true,
            editor_api: false,
            accept_command: false,
            accept_keystrokes: true,
            accept_direct: false,
            clicks_per_card: 2,
            ..Self::default()
        }
    }

    /// Rich-text regions that ignore every programmatic write.
    pub fn stale_editor() -> Self {
        Self {
            editor_api: false,
            accept_command: false,
            accept_keystrokes: false,
            accept_direct: false,
            ..Self::default()
        }
    }
}

/// A card as it ended up on the simulated board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimCard {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimColumn {
    pub title: String,
    pub cards: Vec<SimCard>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Board,
    AddColumn,
    ColumnTitle(u64),
    ColumnHost(u64),
    TitleField(u64),
    AddCard(u64),
    Card(u64),
    CardTitle(u64),
    Editor(u64),
}

#[derive(Debug)]
struct CardState {
    key: u64,
    host: NodeRef,
    title_field: Option<NodeRef>,
    editor: NodeRef,
    title: String,
    draft: Option<String>,
    body: String,
}

#[derive(Debug)]
struct ColumnState {
    key: u64,
    title_node: NodeRef,
    host: NodeRef,
    text_field: NodeRef,
    add_card: NodeRef,
    title: String,
    draft: Option<String>,
    hovered: bool,
    cards: Vec<CardState>,
}

#[derive(Debug)]
struct SimState {
    behavior: SimBehavior,
    next_id: u64,
    nodes: HashMap<NodeRef, NodeKind>,
    detached: HashSet<NodeRef>,
    board: NodeRef,
    add_column: NodeRef,
    columns: Vec<ColumnState>,
    active: Option<NodeRef>,
    selection: Option<NodeRef>,
    open_card: Option<u64>,
    editor_focused: bool,
    pending_clicks: u32,
    mutations: usize,
}

impl SimState {
    fn new(behavior: SimBehavior) -> Self {
        let mut state = Self {
            behavior,
            next_id: 1,
            nodes: HashMap::new(),
            detached: HashSet::new(),
            board: NodeRef(0),
            add_column: NodeRef(0),
            columns: Vec::new(),
            active: None,
            selection: None,
            open_card: None,
            editor_focused: false,
            pending_clicks: 0,
            mutations: 0,
        };
        state.board = state.alloc(NodeKind::Board);
        state.add_column = state.alloc(NodeKind::AddColumn);
        state
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeRef {
        let node = NodeRef(self.next_id);
        self.next_id += 1;
        self.nodes.insert(node, kind);
        node
    }

    fn key(&mut self) -> u64 {
        let key = self.next_id;
        self.next_id += 1;
        key
    }

    fn kind(&self, node: NodeRef) -> Option<NodeKind> {
        self.nodes.get(&node).copied()
    }

    /// Fails for a node that was removed from the board.
    fn live(&self, node: NodeRef) -> MigrationResult<()> {
        if self.detached.contains(&node) {
            return Err(MigrationError::Surface(format!(
                "node {} is no longer in the document",
                node.0
            )));
        }
        Ok(())
    }

    /// Replace a column's title node with a fresh one.
    fn rerender_title(&mut self, column_key: u64) -> Option<NodeRef> {
        self.column_pos(column_key)?;
        let fresh = self.alloc(NodeKind::ColumnTitle(column_key));
        let column = self.column(column_key)?;
        let old = std::mem::replace(&mut column.title_node, fresh);
        self.nodes.remove(&old);
        self.detached.insert(old);
        Some(fresh)
    }

    fn column_pos(&self, key: u64) -> Option<usize> {
        self.columns.iter().position(|c| c.key == key)
    }

    fn card_pos(&self, key: u64) -> Option<(usize, usize)> {
        self.columns.iter().enumerate().find_map(|(c, column)| {
            column
                .cards
                .iter()
                .position(|card| card.key == key)
                .map(|k| (c, k))
        })
    }

    fn column(&mut self, key: u64) -> Option<&mut ColumnState> {
        self.columns.iter_mut().find(|c| c.key == key)
    }

    fn card(&mut self, key: u64) -> Option<&mut CardState> {
        self.columns
            .iter_mut()
            .flat_map(|c| c.cards.iter_mut())
            .find(|card| card.key == key)
    }

    fn card_ref(&self, key: u64) -> Option<&CardState> {
        self.columns
            .iter()
            .flat_map(|c| c.cards.iter())
            .find(|card| card.key == key)
    }

    fn add_column(&mut self, title: &str) -> NodeRef {
        let key = self.key();
        let column = ColumnState {
            key,
            title_node: self.alloc(NodeKind::ColumnTitle(key)),
            host: self.alloc(NodeKind::ColumnHost(key)),
            text_field: self.alloc(NodeKind::TitleField(key)),
            add_card: self.alloc(NodeKind::AddCard(key)),
            title: title.to_string(),
            draft: None,
            hovered: false,
            cards: Vec::new(),
        };
        let title_node = column.title_node;
        if self.behavior.insert_columns_at_front {
            self.columns.insert(0, column);
        } else {
            self.columns.push(column);
        }
        self.mutations += 1;
        title_node
    }

    fn add_card(&mut self, column_key: u64) {
        let key = self.key();
        let host = self.alloc(NodeKind::Card(key));
        let title_field = self
            .behavior
            .card_title_fields
            .then(|| self.alloc(NodeKind::CardTitle(key)));
        let editor = self.alloc(NodeKind::Editor(key));
        if let Some(column) = self.column(column_key) {
            column.cards.push(CardState {
                key,
                host,
                title_field,
                editor,
                title: String::new(),
                draft: None,
                body: String::new(),
            });
            column.hovered = false;
        }
        self.open_card = Some(key);
        self.editor_focused = false;
        self.mutations += 1;
        if self.behavior.rerender_title_on_card_add {
            self.rerender_title(column_key);
        }
    }

    fn close_editor(&mut self) {
        self.open_card = None;
        self.editor_focused = false;
        if self
            .active
            .and_then(|a| self.kind(a))
            .is_some_and(|k| matches!(k, NodeKind::Editor(_)))
        {
            self.active = None;
        }
    }

    /// Apply a pending draft value; a field without one is left alone.
    fn commit(&mut self, node: NodeRef) {
        let committed = match self.kind(node) {
            Some(NodeKind::TitleField(key)) => self.column(key).and_then(|column| {
                let draft = column.draft.take()?;
                column.title = draft;
                Some(())
            }),
            Some(NodeKind::CardTitle(key)) => self.card(key).and_then(|card| {
                let draft = card.draft.take()?;
                card.title = draft;
                Some(())
            }),
            _ => None,
        };
        if committed.is_some() {
            self.mutations += 1;
        }
    }

    fn editor_body(&mut self, node: NodeRef) -> Option<&mut String> {
        match self.kind(node) {
            Some(NodeKind::Editor(key)) => self.card(key).map(|card| &mut card.body),
            _ => None,
        }
    }

    fn set_body(&mut self, node: NodeRef, text: String) -> bool {
        match self.editor_body(node) {
            Some(body) => {
                *body = text;
                self.mutations += 1;
                true
            }
            None => false,
        }
    }

    fn owning_column(&self, kind: NodeKind) -> Option<usize> {
        match kind {
            NodeKind::ColumnTitle(key)
            | NodeKind::ColumnHost(key)
            | NodeKind::TitleField(key)
            | NodeKind::AddCard(key) => self.column_pos(key),
            NodeKind::Card(key) | NodeKind::CardTitle(key) | NodeKind::Editor(key) => {
                self.card_pos(key).map(|(c, _)| c)
            }
            NodeKind::Board | NodeKind::AddColumn => None,
        }
    }

    /// Ancestor-or-self chain, nearest first.
    fn ancestors(&self, node: NodeRef) -> Vec<NodeRef> {
        let Some(kind) = self.kind(node) else {
            return Vec::new();
        };
        let mut chain = vec![node];
        match kind {
            NodeKind::Editor(key) | NodeKind::CardTitle(key) => {
                if let Some(card) = self.card_ref(key) {
                    chain.push(card.host);
                }
            }
            NodeKind::TitleField(key) => {
                if let Some(c) = self.column_pos(key) {
                    chain.push(self.columns[c].title_node);
                }
            }
            _ => {}
        }
        if let Some(c) = self.owning_column(kind) {
            let host = self.columns[c].host;
            if host != node {
                chain.push(host);
            }
        }
        if node != self.board {
            chain.push(self.board);
        }
        chain
    }

    fn matches(&self, node: NodeRef, query: &Query) -> bool {
        match (self.kind(node), query) {
            (Some(NodeKind::ColumnHost(_)), Query::ColumnHosts | Query::ColumnHost { .. }) => true,
            (Some(NodeKind::ColumnTitle(_)), Query::ColumnTitles | Query::ColumnTitle { .. }) => {
                true
            }
            (Some(NodeKind::Card(_)), Query::AnyCard | Query::Cards { .. }) => true,
            (Some(NodeKind::Board), Query::BoardSurface) => true,
            (
                Some(NodeKind::Editor(_)),
                Query::AnyRichText { .. } | Query::AnyEditable | Query::RichTextAt { .. },
            ) => true,
            _ => false,
        }
    }

    fn editors(&self, column: Option<usize>) -> Vec<NodeRef> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(c, _)| column.map_or(true, |wanted| wanted == *c))
            .flat_map(|(_, col)| col.cards.iter().map(|card| card.editor))
            .collect()
    }

    fn query_all(&self, query: &Query) -> Vec<NodeRef> {
        match query {
            Query::ColumnTitles => self.columns.iter().map(|c| c.title_node).collect(),
            Query::ColumnHosts => self.columns.iter().map(|c| c.host).collect(),
            Query::ColumnTitle { index } => {
                if self.behavior.index_attribute_lags {
                    Vec::new()
                } else {
                    self.columns.get(*index).map(|c| c.title_node).into_iter().collect()
                }
            }
            Query::ColumnHost { index } => self.columns.get(*index).map(|c| c.host).into_iter().collect(),
            Query::AddColumnControl => {
                if self.behavior.add_column_control {
                    vec![self.add_column]
                } else {
                    Vec::new()
                }
            }
            Query::AddCardControl { index } => self
                .columns
                .get(*index)
                .filter(|_| self.behavior.add_card_controls)
                .map(|c| c.add_card)
                .into_iter()
                .collect(),
            Query::AddCardControlWithin { host } => self
                .kind(*host)
                .and_then(|kind| self.owning_column(kind))
                .filter(|_| self.behavior.add_card_controls)
                .map(|c| self.columns[c].add_card)
                .into_iter()
                .collect(),
            Query::Cards { column } => self
                .columns
                .get(*column)
                .map(|c| c.cards.iter().map(|card| card.host).collect())
                .unwrap_or_default(),
            Query::CardTitleField { within } => {
                let fields = self
                    .columns
                    .iter()
                    .flat_map(|c| c.cards.iter())
                    .filter(|card| within.map_or(true, |w| w == card.host));
                fields.filter_map(|card| card.title_field).collect()
            }
            Query::RichTextAt { column, card } => self
                .columns
                .get(*column)
                .and_then(|c| c.cards.get(*card))
                .map(|card| card.editor)
                .into_iter()
                .collect(),
            Query::FocusedRichText => {
                if self.editor_focused {
                    self.open_card
                        .and_then(|key| self.card_ref(key))
                        .map(|card| card.editor)
                        .into_iter()
                        .collect()
                } else {
                    Vec::new()
                }
            }
            Query::AnyRichText { within } => {
                let column = within.and_then(|w| self.kind(w)).and_then(|k| self.owning_column(k));
                if within.is_some() && column.is_none() {
                    return Vec::new();
                }
                self.editors(column)
            }
            Query::AnyEditable => self.editors(None),
            Query::BoardSurface => vec![self.board],
            Query::AnyCard => self
                .columns
                .iter()
                .flat_map(|c| c.cards.iter().map(|card| card.host))
                .collect(),
            Query::TextField { within } => match self.kind(*within) {
                Some(NodeKind::ColumnTitle(key)) => self
                    .column_pos(key)
                    .map(|c| self.columns[c].text_field)
                    .into_iter()
                    .collect(),
                _ => Vec::new(),
            },
        }
    }

    fn attribute(&self, node: NodeRef, name: &str) -> Option<String> {
        let kind = self.kind(node)?;
        match name {
            INDEX_ATTRIBUTE => match kind {
                NodeKind::ColumnTitle(key) if !self.behavior.index_attribute_lags => {
                    self.column_pos(key).map(|c| format!("column-title-{}", c))
                }
                NodeKind::ColumnHost(key) => self.column_pos(key).map(|c| format!("board-column-{}", c)),
                NodeKind::AddCard(key) => {
                    self.column_pos(key).map(|c| format!("column-{}-add-card-btn", c))
                }
                NodeKind::Card(key) => self.card_pos(key).map(|(c, k)| format!("board-card-{}-{}", c, k)),
                NodeKind::Editor(key) => self
                    .card_pos(key)
                    .map(|(c, k)| format!("rich-text-edit-{}-{}-0", c, k)),
                _ => None,
            },
            "aria-disabled" => match kind {
                NodeKind::AddCard(_) => Some(self.open_card.is_some().to_string()),
                _ => None,
            },
            _ => None,
        }
    }

    fn text_content(&self, node: NodeRef) -> String {
        match self.kind(node) {
            Some(NodeKind::ColumnTitle(key)) | Some(NodeKind::TitleField(key)) => self
                .column_pos(key)
                .map(|c| self.columns[c].title.clone())
                .unwrap_or_default(),
            Some(NodeKind::Card(key)) => self
                .card_ref(key)
                .map(|card| format!("{}\n{}", card.title, card.body))
                .unwrap_or_default(),
            Some(NodeKind::CardTitle(key)) => self
                .card_ref(key)
                .map(|card| card.title.clone())
                .unwrap_or_default(),
            Some(NodeKind::Editor(key)) => self
                .card_ref(key)
                .map(|card| card.body.clone())
                .unwrap_or_default(),
            Some(NodeKind::AddColumn) => "Add column".to_string(),
            Some(NodeKind::AddCard(_)) => "Add card".to_string(),
            _ => String::new(),
        }
    }

    fn column_rect(&self, c: usize) -> Rect {
        Rect {
            left: COLUMN_LEFT + c as f64 * (COLUMN_WIDTH + COLUMN_GAP),
            top: COLUMN_TOP,
            width: COLUMN_WIDTH,
            height: COLUMN_HEIGHT,
        }
    }

    fn bounding_rect(&self, node: NodeRef) -> Rect {
        match self.kind(node) {
            Some(NodeKind::Board) | None => Rect {
                left: 0.0,
                top: 0.0,
                width: BOARD_WIDTH,
                height: BOARD_HEIGHT,
            },
            Some(kind) => self
                .owning_column(kind)
                .map(|c| self.column_rect(c))
                .unwrap_or_default(),
        }
    }

    fn hit_test(&self, x: f64, y: f64) -> Option<NodeRef> {
        let hit = (0..self.columns.len()).find(|c| self.column_rect(*c).contains(x, y));
        match hit {
            Some(c) => Some(self.columns[c].host),
            None if x >= 0.0 && x <= BOARD_WIDTH && y >= 0.0 && y <= BOARD_HEIGHT => {
                Some(self.board)
            }
            None => None,
        }
    }

    fn is_visible(&self, node: NodeRef) -> bool {
        match self.kind(node) {
            Some(NodeKind::AddCard(key)) => {
                !self.behavior.hover_gated_add_card
                    || self
                        .column_pos(key)
                        .is_some_and(|c| self.columns[c].hovered)
            }
            Some(_) => true,
            None => false,
        }
    }

    fn dispatch(&mut self, target: Target, event: &SyntheticEvent) {
        if let SyntheticEvent::Keyboard { name: "keydown", key, .. } = event {
            if key == "Escape" {
                self.close_editor();
                return;
            }
        }
        let Target::Node(node) = target else {
            return;
        };
        let Some(kind) = self.kind(node) else {
            return;
        };

        match (kind, event) {
            (NodeKind::ColumnHost(key), SyntheticEvent::Mouse { name, .. })
                if matches!(*name, "mouseenter" | "mouseover" | "mousemove") =>
            {
                if let Some(column) = self.column(key) {
                    column.hovered = true;
                }
            }
            (NodeKind::Board, SyntheticEvent::Mouse { name: "click", .. }) => self.close_editor(),
            (NodeKind::Editor(key), SyntheticEvent::Input { name: "input", input_type, data }) => {
                let accepts = self.behavior.accept_keystrokes
                    && self.open_card == Some(key)
                    && self.active == Some(node);
                if !accepts {
                    return;
                }
                let typed = match input_type.as_str() {
                    "insertParagraph" => Some("\n".to_string()),
                    _ => data.clone(),
                };
                if let (Some(typed), Some(body)) = (typed, self.editor_body(node)) {
                    body.push_str(&typed);
                    self.mutations += 1;
                }
            }
            (NodeKind::TitleField(_) | NodeKind::CardTitle(_), event)
                if matches!(event.name(), "input" | "change") =>
            {
                self.commit(node);
            }
            (NodeKind::TitleField(_), SyntheticEvent::Keyboard { name: "keydown", key, .. })
                if key == "Enter" =>
            {
                self.commit(node);
            }
            _ => {}
        }
    }

    fn click(&mut self, node: NodeRef) {
        match self.kind(node) {
            Some(NodeKind::AddColumn) => {
                self.add_column("");
            }
            Some(NodeKind::AddCard(key)) => {
                if self.open_card.is_some() || !self.is_visible(node) {
                    return;
                }
                self.pending_clicks += 1;
                if self.pending_clicks >= self.behavior.clicks_per_card.max(1) {
                    self.pending_clicks = 0;
                    self.add_card(key);
                }
            }
            Some(NodeKind::ColumnTitle(_)) | Some(NodeKind::Board) => self.close_editor(),
            Some(NodeKind::Card(key)) => self.open_card = Some(key),
            Some(NodeKind::Editor(key)) => {
                self.open_card = Some(key);
                self.editor_focused = true;
                self.active = Some(node);
            }
            _ => {}
        }
    }

    fn focus(&mut self, node: NodeRef) {
        self.active = Some(node);
        match self.kind(node) {
            Some(NodeKind::Editor(key)) => {
                self.open_card = Some(key);
                self.editor_focused = true;
            }
            _ => self.editor_focused = false,
        }
    }

    fn exec_command(&mut self, command: &EditCommand) -> bool {
        let Some(active) = self.active else {
            return false;
        };
        let selected = self.selection == Some(active);
        match command {
            EditCommand::SelectAll => {
                self.selection = Some(active);
                true
            }
            EditCommand::Delete => {
                let allowed = selected
                    && (self.behavior.accept_command || self.behavior.accept_keystrokes);
                allowed && self.set_body(active, String::new())
            }
            EditCommand::InsertText(text) => {
                if !self.behavior.accept_command {
                    return false;
                }
                match self.kind(active) {
                    Some(NodeKind::Editor(_)) if selected => self.set_body(active, text.clone()),
                    Some(NodeKind::TitleField(key)) => match self.column(key) {
                        Some(column) => {
                            column.title = text.clone();
                            self.mutations += 1;
                            true
                        }
                        None => false,
                    },
                    _ => false,
                }
            }
        }
    }

    fn set_value(&mut self, node: NodeRef, value: &str) {
        match self.kind(node) {
            Some(NodeKind::TitleField(key)) => {
                if let Some(column) = self.column(key) {
                    column.draft = Some(value.to_string());
                }
            }
            Some(NodeKind::CardTitle(key)) => {
                if let Some(card) = self.card(key) {
                    card.draft = Some(value.to_string());
                }
            }
            _ => {}
        }
    }

    fn snapshot(&self) -> Vec<SimColumn> {
        self.columns
            .iter()
            .map(|c| SimColumn {
                title: c.title.clone(),
                cards: c
                    .cards
                    .iter()
                    .map(|card| SimCard {
                        title: card.title.clone(),
                        body: card.body.clone(),
                    })
                    .collect(),
            })
            .collect()
    }
}

pub struct SimulatedBoard {
    state: Mutex<SimState>,
}

impl Default for SimulatedBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBoard {
    pub fn new() -> Self {
        Self::with_behavior(SimBehavior::default())
    }

    pub fn with_behavior(behavior: SimBehavior) -> Self {
        Self {
            state: Mutex::new(SimState::new(behavior)),
        }
    }

    pub fn behavior(&self) -> SimBehavior {
        self.state.lock().behavior.clone()
    }

    pub fn update_behavior(&self, update: impl FnOnce(&mut SimBehavior)) {
        update(&mut self.state.lock().behavior);
    }

    /// Add a column directly, as if another user had created it. Returns the
    /// column's title node.
    pub fn insert_column(&self, title: &str) -> NodeRef {
        self.state.lock().add_column(title)
    }

    /// Columns and cards currently on the board, in display order.
    pub fn columns(&self) -> Vec<SimColumn> {
        self.state.lock().snapshot()
    }

    /// Number of state changes made so far.
    pub fn mutations(&self) -> usize {
        self.state.lock().mutations
    }

    /// Whether a card editor is still open.
    pub fn editor_open(&self) -> bool {
        self.state.lock().open_card.is_some()
    }
}

#[async_trait]
impl Surface for SimulatedBoard {
    async fn query_all(&self, query: &Query) -> MigrationResult<Vec<NodeRef>> {
        Ok(self.state.lock().query_all(query))
    }

    async fn query(&self, query: &Query) -> MigrationResult<Option<NodeRef>> {
        Ok(self.state.lock().query_all(query).first().copied())
    }

    async fn closest(&self, node: NodeRef, query: &Query) -> MigrationResult<Option<NodeRef>> {
        let state = self.state.lock();
        state.live(node)?;
        Ok(state
            .ancestors(node)
            .into_iter()
            .find(|candidate| state.matches(*candidate, query)))
    }

    async fn attribute(&self, node: NodeRef, name: &str) -> MigrationResult<Option<String>> {
        let state = self.state.lock();
        state.live(node)?;
        Ok(state.attribute(node, name))
    }

    async fn text_content(&self, node: NodeRef) -> MigrationResult<String> {
        let state = self.state.lock();
        state.live(node)?;
        Ok(state.text_content(node))
    }

    async fn is_visible(&self, node: NodeRef) -> MigrationResult<bool> {
        let state = self.state.lock();
        state.live(node)?;
        Ok(state.is_visible(node))
    }

    async fn is_disabled(&self, node: NodeRef) -> MigrationResult<bool> {
        let state = self.state.lock();
        state.live(node)?;
        Ok(matches!(state.kind(node), Some(NodeKind::AddCard(_))) && state.open_card.is_some())
    }

    async fn bounding_rect(&self, node: NodeRef) -> MigrationResult<Rect> {
        let state = self.state.lock();
        state.live(node)?;
        Ok(state.bounding_rect(node))
    }

    async fn hit_test(&self, x: f64, y: f64) -> MigrationResult<Option<NodeRef>> {
        Ok(self.state.lock().hit_test(x, y))
    }

    async fn dispatch(&self, target: Target, event: &SyntheticEvent) -> MigrationResult<()> {
        let mut state = self.state.lock();
        if let Target::Node(node) = target {
            state.live(node)?;
        }
        state.dispatch(target, event);
        Ok(())
    }

    async fn click(&self, node: NodeRef) -> MigrationResult<()> {
        let mut state = self.state.lock();
        state.live(node)?;
        state.click(node);
        Ok(())
    }

    async fn focus(&self, node: NodeRef) -> MigrationResult<()> {
        let mut state = self.state.lock();
        state.live(node)?;
        state.focus(node);
        Ok(())
    }

    async fn blur_active(&self) -> MigrationResult<()> {
        let mut state = self.state.lock();
        state.active = None;
        state.editor_focused = false;
        Ok(())
    }

    async fn scroll_into_view(&self, node: NodeRef) -> MigrationResult<()> {
        self.state.lock().live(node)
    }

    async fn select_contents(&self, node: NodeRef) -> MigrationResult<()> {
        let mut state = self.state.lock();
        state.live(node)?;
        state.selection = Some(node);
        Ok(())
    }

    async fn exec_command(&self, command: &EditCommand) -> MigrationResult<bool> {
        Ok(self.state.lock().exec_command(command))
    }

    async fn set_value(&self, node: NodeRef, value: &str) -> MigrationResult<()> {
        let mut state = self.state.lock();
        state.live(node)?;
        state.set_value(node, value);
        Ok(())
    }

    async fn editor_set_data(&self, node: NodeRef, html: &str) -> MigrationResult<bool> {
        let mut state = self.state.lock();
        state.live(node)?;
        if !state.behavior.editor_api {
            return Ok(false);
        }
        Ok(state.set_body(node, html_to_plain_text(html)))
    }

    async fn replace_paragraph_text(&self, node: NodeRef, text: &str) -> MigrationResult<()> {
        let mut state = self.state.lock();
        state.live(node)?;
        if state.behavior.accept_direct {
            state.set_body(node, text.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_front_insertion_renumbers_in_place() {
        let board = SimulatedBoard::with_behavior(SimBehavior {
            insert_columns_at_front: true,
            ..SimBehavior::default()
        });
        let first = board.insert_column("first");
        assert_eq!(
            board.attribute(first, INDEX_ATTRIBUTE).await.unwrap().as_deref(),
            Some("column-title-0")
        );

        board.insert_column("second");
        assert_eq!(
            board.attribute(first, INDEX_ATTRIBUTE).await.unwrap().as_deref(),
            Some("column-title-1")
        );
        assert_eq!(
            board.query_all(&Query::ColumnTitles).await.unwrap()[1],
            first
        );
    }

    #[tokio::test]
    async fn test_open_editor_blocks_add_card() {
        let board = SimulatedBoard::new();
        board.insert_column("A");
        let add = board
            .query(&Query::AddCardControl { index: 0 })
            .await
            .unwrap()
            .unwrap();

        board.click(add).await.unwrap();
        assert!(board.is_disabled(add).await.unwrap());
        board.click(add).await.unwrap();
        assert_eq!(board.columns()[0].cards.len(), 1);

        board
            .dispatch(
                Target::Document,
                &SyntheticEvent::Keyboard {
                    name: "keydown",
                    key: "Escape".into(),
                    code: "Escape".into(),
                    key_code: 27,
                },
            )
            .await
            .unwrap();
        assert!(!board.editor_open());
        board.click(add).await.unwrap();
        assert_eq!(board.columns()[0].cards.len(), 2);
    }

    #[tokio::test]
    async fn test_hover_reveals_add_card() {
        let board = SimulatedBoard::with_behavior(SimBehavior {
            hover_gated_add_card: true,
            ..SimBehavior::default()
        });
        board.insert_column("A");
        let host = board.query(&Query::ColumnHost { index: 0 }).await.unwrap().unwrap();
        let add = board
            .query(&Query::AddCardControlWithin { host })
            .await
            .unwrap()
            .unwrap();

        assert!(!board.is_visible(add).await.unwrap());
        board
            .dispatch(
                Target::Node(host),
                &SyntheticEvent::Mouse {
                    name: "mouseover",
                    x: None,
                    y: None,
                },
            )
            .await
            .unwrap();
        assert!(board.is_visible(add).await.unwrap());
    }

    #[tokio::test]
    async fn test_title_commits_on_input_event() {
        let board = SimulatedBoard::new();
        let title = board.insert_column("");
        let field = board
            .query(&Query::TextField { within: title })
            .await
            .unwrap()
            .unwrap();

        board.set_value(field, "Done").await.unwrap();
        assert_eq!(board.columns()[0].title, "");
        board
            .dispatch(Target::Node(field), &SyntheticEvent::basic("input"))
            .await
            .unwrap();
        assert_eq!(board.columns()[0].title, "Done");
    }

    #[tokio::test]
    async fn test_closest_walks_to_host() {
        let board = SimulatedBoard::new();
        board.insert_column("A");
        let add = board.query(&Query::AddCardControl { index: 0 }).await.unwrap().unwrap();
        board.click(add).await.unwrap();
        let editor = board
            .query(&Query::RichTextAt { column: 0, card: 0 })
            .await
            .unwrap()
            .unwrap();

        let host = board.closest(editor, &Query::ColumnHosts).await.unwrap();
        assert_eq!(host, board.query(&Query::ColumnHost { index: 0 }).await.unwrap());
        assert!(board.closest(editor, &Query::AnyCard).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rerendered_title_detaches_old_node() {
        let board = SimulatedBoard::with_behavior(SimBehavior {
            rerender_title_on_card_add: true,
            ..SimBehavior::default()
        });
        let old = board.insert_column("A");
        let add = board.query(&Query::AddCardControl { index: 0 }).await.unwrap().unwrap();
        board.click(add).await.unwrap();

        let fresh = board.query(&Query::ColumnTitle { index: 0 }).await.unwrap().unwrap();
        assert_ne!(fresh, old);
        assert!(matches!(
            board.attribute(old, INDEX_ATTRIBUTE).await,
            Err(MigrationError::Surface(_))
        ));
        assert!(board.click(old).await.is_err());
        assert_eq!(
            board.attribute(fresh, INDEX_ATTRIBUTE).await.unwrap().as_deref(),
            Some("column-title-0")
        );
    }
}
