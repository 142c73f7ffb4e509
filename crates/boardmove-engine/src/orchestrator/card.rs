use boardmove_core::config::ms;
use boardmove_core::{MigrationError, MigrationResult};
use boardmove_domain::Card;
use serde::Serialize;

use super::Migrator;
use crate::injector::{ContentInjector, InjectionOutcome};
use crate::interaction::{Interaction, Key};
use crate::locator::{ColumnHandle, ResolvedColumn};
use crate::report::MigrationReport;
use crate::surface::{best_effort, NodeRef, Query, Surface, Target};

/// What happened to a card that was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardOutcome {
    /// Column index the card was created in.
    pub column: usize,
    /// Position of the card inside that column.
    pub index: usize,
    pub title_set: bool,
    /// `None` when the card had no body or no content region was found.
    pub injection: Option<InjectionOutcome>,
}

impl<S: Surface> Migrator<S> {
    /// Add one card to `column` and fill in its title and body.
    ///
    /// The column index is re-resolved first since earlier steps may have
    /// renumbered it. A missing add-card control, or a card that never
    /// shows up after every retry, fails with `NotFound`. A missing title
    /// field or content region only produces a warning in `report`.
    pub async fn create_card(
        &self,
        column: &ColumnHandle,
        card: &Card,
        report: &mut MigrationReport,
    ) -> MigrationResult<CardOutcome> {
        let waiter = self.waiter().shielded();
        let timing = &self.config.timing;
        let surface = &self.surface;

        let resolved = self.locator().resolve(column).await?;
        let index = resolved.index;
        tracing::debug!(
            "Creating card '{}' in column {} ({:?})",
            card.title,
            index,
            resolved.tier
        );

        let add_card = self
            .ensure_ready(&resolved)
            .await?
            .ok_or_else(|| MigrationError::not_found(format!("add-card control for column {}", index)))?;

        let before = surface.query_all(&Query::Cards { column: index }).await?.len();
        let new_card = self
            .retry
            .run(&waiter, |attempt| {
                let waiter = &waiter;
                async move {
                    surface.click(add_card).await?;
                    if attempt == 1 {
                        waiter.pause(ms(timing.add_card_click_delay_ms)).await?;
                    }
                    waiter
                        .until(
                            || async move {
                                let cards = surface.query_all(&Query::Cards { column: index }).await?;
                                Ok(if cards.len() > before {
                                    cards.last().copied()
                                } else {
                                    None
                                })
                            },
                            ms(timing.card_appear_timeout_ms),
                            ms(timing.poll_interval_ms),
                        )
                        .await
                }
            })
            .await?
            .ok_or_else(|| {
                MigrationError::not_found(format!(
                    "new card in column {} after {} attempts",
                    index, self.retry.max_attempts
                ))
            })?;

        let title_set = self.fill_title(new_card, card).await?;
        if !title_set {
            report.warn(format!("Title field for card '{}' not found", card.title));
        }

        surface.click(new_card).await?;
        waiter.pause(ms(timing.field_focus_delay_ms)).await?;

        let injection = match card.body_text() {
            Some(body) => {
                let region = waiter
                    .until(
                        || {
                            let locator = self.locator();
                            let host = resolved.host;
                            async move { locator.content_region(index, before, host).await }
                        },
                        ms(timing.content_region_timeout_ms),
                        ms(timing.content_region_interval_ms),
                    )
                    .await?;
                match region {
                    Some(region) => Some(self.fill_body(region, &body).await?),
                    None => {
                        report.warn(format!(
                            "Content region for card '{}' not found, created with title only",
                            card.title
                        ));
                        None
                    }
                }
            }
            None => None,
        };

        // The destination persists the body asynchronously; closing the
        // editor too early drops it.
        waiter.pause(ms(timing.post_injection_settle_ms)).await?;
        self.close_card(&resolved, add_card).await?;

        tracing::info!("Created card '{}' in column {}", card.title, index);
        Ok(CardOutcome {
            column: index,
            index: before,
            title_set,
            injection,
        })
    }

    /// Put the column into a state where its add-card control is usable.
    ///
    /// A card editor left open hides or disables the control, so everything
    /// that might hold focus is dismissed first. Each dismissal is allowed to
    /// miss, since the node it targets may have been re-rendered meanwhile.
    pub(crate) async fn ensure_ready(
        &self,
        column: &ResolvedColumn,
    ) -> MigrationResult<Option<NodeRef>> {
        let waiter = self.waiter().shielded();
        let timing = &self.config.timing;
        let surface = &self.surface;
        let interaction = Interaction::new(surface);
        let locator = self.locator();
        let board = locator.board_surface(column.host).await?;

        best_effort(surface.blur_active().await, "Blurring the active element")?;
        interaction.press_key(Target::Document, Key::Escape).await?;
        let title = match surface.query(&Query::ColumnTitle { index: column.index }).await? {
            Some(node) => Some(node),
            None => column.title_node,
        };
        for node in [title, column.host, board].into_iter().flatten() {
            best_effort(surface.click(node).await, "Clicking away from the editor")?;
        }
        if let Some(board) = board {
            interaction.click_safe_point(board).await?;
        }
        waiter.pause(ms(timing.ready_settle_ms)).await?;

        let locator = &locator;
        let control = waiter
            .until(
                || async move { locator.find_add_card_control(column).await },
                ms(timing.ready_timeout_ms),
                ms(timing.ready_interval_ms),
            )
            .await?;

        let Some(control) = control else {
            return locator.find_add_card_control(column).await;
        };
        if surface.is_visible(control).await? {
            return Ok(Some(control));
        }

        tracing::debug!("Add-card control of column {} hidden, hovering", column.index);
        if let Some(host) = column.host {
            interaction.hover(host).await?;
        }
        if let Some(board) = board {
            interaction.hover(board).await?;
        }
        waiter.pause(ms(timing.hover_settle_ms)).await?;
        locator
            .reveal_add_card_control(column, &waiter, timing)
            .await
    }

    async fn fill_title(&self, new_card: NodeRef, card: &Card) -> MigrationResult<bool> {
        let waiter = self.waiter().shielded();
        let timing = &self.config.timing;
        let surface = &self.surface;

        let field = match surface
            .query(&Query::CardTitleField {
                within: Some(new_card),
            })
            .await?
        {
            Some(field) => field,
            None => return Ok(false),
        };
        surface.focus(field).await?;
        waiter.pause(ms(timing.field_focus_delay_ms)).await?;
        surface.set_value(field, &card.title).await?;
        Interaction::new(surface)
            .notify(field, &["input", "change"])
            .await?;
        waiter.pause(ms(timing.field_settle_ms)).await?;
        Ok(true)
    }

    async fn fill_body(&self, region: NodeRef, body: &str) -> MigrationResult<InjectionOutcome> {
        let waiter = self.waiter().shielded();
        let timing = &self.config.timing;

        self.surface.click(region).await?;
        waiter.pause(ms(timing.editor_activate_delay_ms)).await?;
        self.surface.focus(region).await?;

        let outcome = ContentInjector::new(&self.surface, timing, &waiter)
            .inject_detailed(region, body)
            .await?;
        waiter.pause(ms(timing.field_settle_ms)).await?;
        Ok(outcome)
    }

    /// Dismiss the card editor and wait until the column accepts a new card.
    async fn close_card(&self, column: &ResolvedColumn, add_card: NodeRef) -> MigrationResult<()> {
        let waiter = self.waiter().shielded();
        let timing = &self.config.timing;
        let surface = &self.surface;

        if let Some(title) = column.title_node {
            best_effort(surface.click(title).await, "Clicking the column title")?;
            waiter.pause(ms(timing.close_delay_ms)).await?;
        }
        Interaction::new(surface)
            .press_key(Target::Document, Key::Escape)
            .await?;
        if let Some(host) = column.host {
            best_effort(surface.click(host).await, "Clicking the column host")?;
        }
        waiter.pause(ms(timing.field_settle_ms)).await?;

        let closed = waiter
            .until(
                || async move {
                    if surface.query(&Query::FocusedRichText).await?.is_some() {
                        return Ok(None);
                    }
                    if surface.is_disabled(add_card).await? {
                        return Ok(None);
                    }
                    Ok(surface.is_visible(add_card).await?.then_some(()))
                },
                ms(timing.closed_timeout_ms),
                ms(timing.ready_interval_ms),
            )
            .await?;
        if closed.is_none() {
            tracing::debug!("Card editor in column {} still open after closing", column.index);
        }
        Ok(())
    }
}
