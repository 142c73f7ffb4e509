use async_trait::async_trait;
use boardmove_core::MigrationResult;
use serde::{Deserialize, Serialize};

/// Opaque handle to a live node on the destination.
///
/// Two handles are equal exactly when they refer to the same node. A handle
/// stays valid while the node is attached, even when the destination
/// renumbers its identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeRef(pub u64);

/// Where a synthetic event is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Target {
    Document,
    Node(NodeRef),
}

/// Client-space bounding rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right() && y >= self.top && y <= self.bottom()
    }
}

/// Logical node lookups the engine performs.
///
/// Backends translate each variant to whatever addressing the destination
/// offers. Indices are the destination's current numbering, which may drift
/// after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "query", rename_all = "camelCase")]
pub enum Query {
    /// Every column title node, in document order.
    ColumnTitles,
    /// Every column host, in document order.
    ColumnHosts,
    ColumnTitle { index: usize },
    ColumnHost { index: usize },
    AddColumnControl,
    /// The add-card control addressed by column index.
    AddCardControl { index: usize },
    /// An add-card control inside the given column host.
    AddCardControlWithin { host: NodeRef },
    /// Cards currently rendered in a column.
    Cards { column: usize },
    /// The plain title field of a card; `within` narrows the search.
    CardTitleField { within: Option<NodeRef> },
    /// The rich-text region of card `card` in column `column`.
    RichTextAt { column: usize, card: usize },
    FocusedRichText,
    AnyRichText { within: Option<NodeRef> },
    AnyEditable,
    BoardSurface,
    AnyCard,
    /// A text input inside a column title node.
    TextField { within: NodeRef },
}

/// Editing commands issued against the current selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", content = "value", rename_all = "camelCase")]
pub enum EditCommand {
    InsertText(String),
    SelectAll,
    Delete,
}

/// A user-input event to synthesize. Every event bubbles.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SyntheticEvent {
    Mouse {
        name: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        x: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        y: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    Keyboard {
        name: &'static str,
        key: String,
        code: String,
        key_code: u32,
    },
    #[serde(rename_all = "camelCase")]
    Input {
        name: &'static str,
        input_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<String>,
    },
    Basic {
        name: &'static str,
    },
}

impl SyntheticEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mouse { name, .. }
            | Self::Keyboard { name, .. }
            | Self::Input { name, .. }
            | Self::Basic { name } => name,
        }
    }

    pub fn bubbles(&self) -> bool {
        true
    }

    pub fn basic(name: &'static str) -> Self {
        Self::Basic { name }
    }
}

/// The destination board as the engine sees it.
///
/// Queries never fail because something is absent; they return `None` or an
/// empty list. Errors are reserved for the backend itself.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Surface: Send + Sync {
    /// All nodes matching `query`, in document order.
    async fn query_all(&self, query: &Query) -> MigrationResult<Vec<NodeRef>>;

    /// First node matching `query`.
    async fn query(&self, query: &Query) -> MigrationResult<Option<NodeRef>>;

    /// Nearest ancestor-or-self of `node` matching `query`.
    async fn closest(&self, node: NodeRef, query: &Query) -> MigrationResult<Option<NodeRef>>;

    async fn attribute(&self, node: NodeRef, name: &str) -> MigrationResult<Option<String>>;

    /// Rendered text of the node and its descendants.
    async fn text_content(&self, node: NodeRef) -> MigrationResult<String>;

    async fn is_visible(&self, node: NodeRef) -> MigrationResult<bool>;

    /// Disabled either natively or through `aria-disabled`.
    async fn is_disabled(&self, node: NodeRef) -> MigrationResult<bool>;

    async fn bounding_rect(&self, node: NodeRef) -> MigrationResult<Rect>;

    /// Topmost node at the client coordinates.
    async fn hit_test(&self, x: f64, y: f64) -> MigrationResult<Option<NodeRef>>;

    async fn dispatch(&self, target: Target, event: &SyntheticEvent) -> MigrationResult<()>;

    /// Native activation of the node.
    async fn click(&self, node: NodeRef) -> MigrationResult<()>;

    async fn focus(&self, node: NodeRef) -> MigrationResult<()>;

    /// Remove focus from whatever element holds it.
    async fn blur_active(&self) -> MigrationResult<()>;

    async fn scroll_into_view(&self, node: NodeRef) -> MigrationResult<()>;

    /// Select everything inside the node.
    async fn select_contents(&self, node: NodeRef) -> MigrationResult<()>;

    /// Run an editing command on the focused element. Returns whether the
    /// destination accepted it.
    async fn exec_command(&self, command: &EditCommand) -> MigrationResult<bool>;

    /// Assign the value of a plain input or textarea without events.
    async fn set_value(&self, node: NodeRef, value: &str) -> MigrationResult<()>;

    /// Hand markup to the rich-text editor instance bound to the node.
    /// Returns `false` when no editor instance is bound.
    async fn editor_set_data(&self, node: NodeRef, html: &str) -> MigrationResult<bool>;

    /// Set the text of the first paragraph inside the node, creating one
    /// when there is none.
    async fn replace_paragraph_text(&self, node: NodeRef, text: &str) -> MigrationResult<()>;
}

/// A node that went away between two calls makes a lookup find nothing
/// instead of failing the step. Unrecoverable errors still propagate.
pub(crate) fn or_nothing<T>(
    result: MigrationResult<Option<T>>,
    what: &str,
) -> MigrationResult<Option<T>> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_recoverable() => {
            tracing::debug!("{} failed, treating as absent: {}", what, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Run an action whose failure only costs the side effect.
pub(crate) fn best_effort(result: MigrationResult<()>, what: &str) -> MigrationResult<()> {
    or_nothing(result.map(Some), what).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_event_serializes_key_triple() {
        let event = SyntheticEvent::Keyboard {
            name: "keydown",
            key: "Escape".into(),
            code: "Escape".into(),
            key_code: 27,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "keyboard");
        assert_eq!(json["keyCode"], 27);
        assert_eq!(json["code"], "Escape");
        assert!(event.bubbles());
    }

    #[test]
    fn test_query_serializes_tagged() {
        let json = serde_json::to_value(Query::RichTextAt { column: 1, card: 2 }).unwrap();
        assert_eq!(json["query"], "richTextAt");
        assert_eq!(json["column"], 1);
    }

    #[test]
    fn test_rect_contains() {
        let rect = Rect {
            left: 10.0,
            top: 10.0,
            width: 100.0,
            height: 50.0,
        };
        assert!(rect.contains(20.0, 20.0));
        assert!(!rect.contains(5.0, 20.0));
        assert_eq!(rect.bottom(), 60.0);
    }
}
