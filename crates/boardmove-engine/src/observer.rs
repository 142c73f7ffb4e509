//! Optional action observer.
//!
//! Constructed explicitly and wrapped around a surface; while started it
//! broadcasts every action the engine performs on the destination.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use boardmove_core::MigrationResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::surface::{EditCommand, NodeRef, Query, Rect, Surface, SyntheticEvent, Target};

const TEXT_PREVIEW: usize = 120;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub at: DateTime<Utc>,
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeRef>,
    pub detail: String,
}

pub struct ActionObserver {
    tx: broadcast::Sender<ActionRecord>,
    observing: AtomicBool,
}

impl ActionObserver {
    /// The broadcast channel keeps the last 256 records for slow receivers.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            tx,
            observing: AtomicBool::new(false),
        }
    }

    pub fn start(&self) {
        if !self.observing.swap(true, Ordering::SeqCst) {
            tracing::info!("Action observer started");
        }
    }

    pub fn stop(&self) {
        if self.observing.swap(false, Ordering::SeqCst) {
            tracing::info!("Action observer stopped");
        }
    }

    pub fn is_observing(&self) -> bool {
        self.observing.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ActionRecord> {
        self.tx.subscribe()
    }

    pub fn record(&self, action: &'static str, node: Option<NodeRef>, detail: impl Into<String>) {
        if !self.is_observing() {
            return;
        }
        let record = ActionRecord {
            at: Utc::now(),
            action,
            node,
            detail: preview(&detail.into()),
        };
        tracing::debug!("{} {:?} {}", record.action, record.node, record.detail);
        let _ = self.tx.send(record);
    }
}

impl Default for ActionObserver {
    fn default() -> Self {
        Self::new()
    }
}

fn preview(text: &str) -> String {
    let collapsed = boardmove_domain::text::collapse_whitespace(text);
    match collapsed.char_indices().nth(TEXT_PREVIEW) {
        Some((cut, _)) => collapsed[..cut].to_string(),
        None => collapsed,
    }
}

/// A surface whose mutating actions are reported to an [`ActionObserver`].
pub struct ObservedSurface<S> {
    inner: S,
    observer: Arc<ActionObserver>,
}

impl<S: Surface> ObservedSurface<S> {
    pub fn new(inner: S, observer: Arc<ActionObserver>) -> Self {
        Self { inner, observer }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn observer(&self) -> &Arc<ActionObserver> {
        &self.observer
    }
}

#[async_trait]
impl<S: Surface> Surface for ObservedSurface<S> {
    async fn query_all(&self, query: &Query) -> MigrationResult<Vec<NodeRef>> {
        self.inner.query_all(query).await
    }

    async fn query(&self, query: &Query) -> MigrationResult<Option<NodeRef>> {
        self.inner.query(query).await
    }

    async fn closest(&self, node: NodeRef, query: &Query) -> MigrationResult<Option<NodeRef>> {
        self.inner.closest(node, query).await
    }

    async fn attribute(&self, node: NodeRef, name: &str) -> MigrationResult<Option<String>> {
        self.inner.attribute(node, name).await
    }

    async fn text_content(&self, node: NodeRef) -> MigrationResult<String> {
        self.inner.text_content(node).await
    }

    async fn is_visible(&self, node: NodeRef) -> MigrationResult<bool> {
        self.inner.is_visible(node).await
    }

    async fn is_disabled(&self, node: NodeRef) -> MigrationResult<bool> {
        self.inner.is_disabled(node).await
    }

    async fn bounding_rect(&self, node: NodeRef) -> MigrationResult<Rect> {
        self.inner.bounding_rect(node).await
    }

    async fn hit_test(&self, x: f64, y: f64) -> MigrationResult<Option<NodeRef>> {
        self.inner.hit_test(x, y).await
    }

    async fn dispatch(&self, target: Target, event: &SyntheticEvent) -> MigrationResult<()> {
        let node = match target {
            Target::Document => None,
            Target::Node(node) => Some(node),
        };
        self.observer.record("event", node, event.name());
        self.inner.dispatch(target, event).await
    }

    async fn click(&self, node: NodeRef) -> MigrationResult<()> {
        self.observer.record("click", Some(node), "");
        self.inner.click(node).await
    }

    async fn focus(&self, node: NodeRef) -> MigrationResult<()> {
        self.observer.record("focus", Some(node), "");
        self.inner.focus(node).await
    }

    async fn blur_active(&self) -> MigrationResult<()> {
        self.observer.record("blur", None, "");
        self.inner.blur_active().await
    }

    async fn scroll_into_view(&self, node: NodeRef) -> MigrationResult<()> {
        self.inner.scroll_into_view(node).await
    }

    async fn select_contents(&self, node: NodeRef) -> MigrationResult<()> {
        self.observer.record("select", Some(node), "");
        self.inner.select_contents(node).await
    }

    async fn exec_command(&self, command: &EditCommand) -> MigrationResult<bool> {
        let accepted = self.inner.exec_command(command).await?;
        let detail = match command {
            EditCommand::InsertText(text) => format!("insertText {} -> {}", text, accepted),
            EditCommand::SelectAll => format!("selectAll -> {}", accepted),
            EditCommand::Delete => format!("delete -> {}", accepted),
        };
        self.observer.record("command", None, detail);
        Ok(accepted)
    }

    async fn set_value(&self, node: NodeRef, value: &str) -> MigrationResult<()> {
        self.observer.record("value", Some(node), value);
        self.inner.set_value(node, value).await
    }

    async fn editor_set_data(&self, node: NodeRef, html: &str) -> MigrationResult<bool> {
        let applied = self.inner.editor_set_data(node, html).await?;
        self.observer
            .record("editor", Some(node), format!("{} -> {}", html, applied));
        Ok(applied)
    }

    async fn replace_paragraph_text(&self, node: NodeRef, text: &str) -> MigrationResult<()> {
        self.observer.record("paragraph", Some(node), text);
        self.inner.replace_paragraph_text(node, text).await
    }
}
