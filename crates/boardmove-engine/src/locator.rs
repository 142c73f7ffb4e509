//! Column and control resolution that tolerates index drift.
//!
//! The destination renumbers column identifiers in place after every
//! insertion, and sometimes updates those identifiers later than it inserts
//! nodes. A column's identity is therefore the bound title node, and its
//! index is re-read every time it is needed.

use boardmove_core::config::ms;
use boardmove_core::{LocatorConfig, MigrationResult, TimingConfig};
use serde::Serialize;

use crate::interaction::Interaction;
use crate::settle::SettleWaiter;
use crate::surface::{or_nothing, NodeRef, Query, Surface};

/// A destination column as the orchestrator holds it between steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnHandle {
    /// Index recorded when the column was created. Only trusted as a last
    /// resort.
    pub index: usize,
    pub title_node: Option<NodeRef>,
    pub title: String,
}

impl ColumnHandle {
    pub fn new(index: usize, title_node: Option<NodeRef>, title: impl Into<String>) -> Self {
        Self {
            index,
            title_node,
            title: title.into(),
        }
    }

    /// A handle that only knows an index, for columns the engine did not
    /// create itself.
    pub fn at_index(index: usize) -> Self {
        Self::new(index, None, "")
    }
}

/// Which fallback produced a column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LocatorTier {
    BoundAttribute,
    PositionScan,
    RecordedIndex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub index: usize,
    pub tier: LocatorTier,
    pub title_node: Option<NodeRef>,
    pub host: Option<NodeRef>,
}

pub struct ElementLocator<'a, S: Surface + ?Sized> {
    surface: &'a S,
    config: &'a LocatorConfig,
}

impl<'a, S: Surface + ?Sized> ElementLocator<'a, S> {
    pub fn new(surface: &'a S, config: &'a LocatorConfig) -> Self {
        Self { surface, config }
    }

    /// Current index of a column.
    ///
    /// 1. the bound title node's position attribute,
    /// 2. the bound title node's position among all column titles,
    /// 3. the index recorded in the handle.
    ///
    /// A bound node the destination has since removed fails the first two
    /// tiers on some backends; that counts as not found.
    pub async fn column_index(&self, handle: &ColumnHandle) -> MigrationResult<(usize, LocatorTier)> {
        if let Some(node) = handle.title_node {
            let by_attribute = self.index_from_attribute(node).await;
            if let Some(index) = or_nothing(by_attribute, "Reading the bound title's attribute")? {
                tracing::debug!("Column '{}' at index {} from attribute", handle.title, index);
                return Ok((index, LocatorTier::BoundAttribute));
            }
            let by_position = self.position_of(node).await;
            if let Some(index) = or_nothing(by_position, "Scanning column titles")? {
                tracing::debug!("Column '{}' at index {} from position scan", handle.title, index);
                return Ok((index, LocatorTier::PositionScan));
            }
        }
        tracing::debug!(
            "Column '{}' falls back to recorded index {}",
            handle.title,
            handle.index
        );
        Ok((handle.index, LocatorTier::RecordedIndex))
    }

    /// Resolve the index together with the column's title node and host.
    ///
    /// When only the recorded index is left, the bound node is no longer on
    /// the board and the title is looked up by that index instead.
    pub async fn resolve(&self, handle: &ColumnHandle) -> MigrationResult<ResolvedColumn> {
        let (index, tier) = self.column_index(handle).await?;
        let bound = handle.title_node.filter(|_| tier != LocatorTier::RecordedIndex);
        let title_node = match bound {
            Some(node) => Some(node),
            None => {
                self.surface
                    .query(&Query::ColumnTitle { index })
                    .await?
            }
        };
        let host = self.column_host(title_node, index).await?;
        Ok(ResolvedColumn {
            index,
            tier,
            title_node,
            host,
        })
    }

    /// Parse the index encoded in a title node's position attribute.
    pub async fn index_from_attribute(&self, node: NodeRef) -> MigrationResult<Option<usize>> {
        let value = self
            .surface
            .attribute(node, &self.config.index_attribute)
            .await?;
        Ok(value.as_deref().and_then(|v| self.parse_index(v)))
    }

    fn parse_index(&self, value: &str) -> Option<usize> {
        let start = value.find(&self.config.column_title_prefix)? + self.config.column_title_prefix.len();
        let digits: String = value[start..]
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        digits.parse().ok()
    }

    /// Position of `node` among all column title nodes, by identity.
    pub async fn position_of(&self, node: NodeRef) -> MigrationResult<Option<usize>> {
        let titles = self.surface.query_all(&Query::ColumnTitles).await?;
        Ok(titles.iter().position(|t| *t == node))
    }

    pub async fn column_host(
        &self,
        title_node: Option<NodeRef>,
        index: usize,
    ) -> MigrationResult<Option<NodeRef>> {
        if let Some(node) = title_node {
            let closest = self.surface.closest(node, &Query::ColumnHosts).await;
            if let Some(host) = or_nothing(closest, "Finding the title's column host")? {
                return Ok(Some(host));
            }
        }
        if let Some(host) = self.surface.query(&Query::ColumnHost { index }).await? {
            return Ok(Some(host));
        }
        let hosts = self.surface.query_all(&Query::ColumnHosts).await?;
        Ok(hosts.get(index).copied())
    }

    pub async fn board_surface(&self, host: Option<NodeRef>) -> MigrationResult<Option<NodeRef>> {
        if let Some(host) = host {
            if let Some(board) = self.surface.closest(host, &Query::BoardSurface).await? {
                return Ok(Some(board));
            }
        }
        self.surface.query(&Query::BoardSurface).await
    }

    /// The add-card control of a column, searched inside its host first.
    pub async fn find_add_card_control(
        &self,
        column: &ResolvedColumn,
    ) -> MigrationResult<Option<NodeRef>> {
        if let Some(host) = column.host {
            if let Some(control) = self
                .surface
                .query(&Query::AddCardControlWithin { host })
                .await?
            {
                return Ok(Some(control));
            }
        }
        self.surface
            .query(&Query::AddCardControl {
                index: column.index,
            })
            .await
    }

    /// Make the add-card control render, then wait for it to be visible.
    ///
    /// The destination only shows the control for a column that is in view
    /// and hovered. When it never becomes visible, any control found is
    /// returned anyway.
    pub async fn reveal_add_card_control(
        &self,
        column: &ResolvedColumn,
        waiter: &SettleWaiter,
        timing: &TimingConfig,
    ) -> MigrationResult<Option<NodeRef>> {
        let interaction = Interaction::new(self.surface);
        if let Some(host) = column.host {
            self.surface.scroll_into_view(host).await?;
            interaction.hover(host).await?;
        }
        if let Some(board) = self.board_surface(column.host).await? {
            interaction.hover(board).await?;
        }

        let visible = waiter
            .until(
                || async move {
                    match self.find_add_card_control(column).await? {
                        Some(control) if self.surface.is_visible(control).await? => {
                            Ok(Some(control))
                        }
                        _ => Ok(None),
                    }
                },
                ms(timing.add_card_visible_timeout_ms),
                ms(timing.poll_interval_ms),
            )
            .await?;

        match visible {
            Some(control) => Ok(Some(control)),
            None => self.find_add_card_control(column).await,
        }
    }

    /// The content region of a freshly created card, loosening the match
    /// until something editable turns up.
    pub async fn content_region(
        &self,
        column: usize,
        card: usize,
        host: Option<NodeRef>,
    ) -> MigrationResult<Option<NodeRef>> {
        let candidates = [
            Query::RichTextAt { column, card },
            Query::FocusedRichText,
            Query::AnyRichText { within: host },
            Query::AnyEditable,
        ];
        for query in &candidates {
            if let Some(node) = self.surface.query(query).await? {
                tracing::debug!("Content region for card {}-{} via {:?}", column, card, query);
                return Ok(Some(node));
            }
        }
        Ok(None)
    }
}
