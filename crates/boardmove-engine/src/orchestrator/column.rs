use boardmove_core::config::ms;
use boardmove_core::{MigrationError, MigrationResult};

use super::Migrator;
use crate::interaction::{Interaction, Key};
use crate::locator::ColumnHandle;
use crate::surface::{EditCommand, NodeRef, Query, Surface, Target};

impl<S: Surface> Migrator<S> {
    /// Add a column at the destination and give it `title`.
    ///
    /// The new column is the title node that was not there before the
    /// click; its index comes from its position among all column titles.
    pub async fn create_column(&self, title: &str) -> MigrationResult<ColumnHandle> {
        let waiter = self.waiter().shielded();
        let timing = &self.config.timing;
        let surface = &self.surface;

        let before = surface.query_all(&Query::ColumnTitles).await?;
        tracing::debug!("{} columns before adding '{}'", before.len(), title);

        let control = surface
            .query(&Query::AddColumnControl)
            .await?
            .ok_or_else(|| MigrationError::not_found("add-column control"))?;

        let after = self
            .retry
            .run(&waiter, |_| {
                let before_count = before.len();
                let waiter = &waiter;
                async move {
                    surface.click(control).await?;
                    waiter
                        .until(
                            || async move {
                                let titles = surface.query_all(&Query::ColumnTitles).await?;
                                Ok((titles.len() > before_count).then_some(titles))
                            },
                            ms(timing.column_appear_timeout_ms),
                            ms(timing.poll_interval_ms),
                        )
                        .await
                }
            })
            .await?
            .ok_or_else(|| MigrationError::not_found("new column after clicking add-column"))?;

        let title_node = after
            .iter()
            .copied()
            .find(|node| !before.contains(node))
            .or_else(|| after.last().copied())
            .ok_or_else(|| MigrationError::not_found("new column title"))?;
        let index = self
            .locator()
            .position_of(title_node)
            .await?
            .unwrap_or(after.len() - 1);
        tracing::info!("Created column {} for '{}'", index, title);

        let handle = ColumnHandle::new(index, Some(title_node), title);
        if !title.is_empty() {
            self.set_column_title(&handle).await?;
        }
        Ok(handle)
    }

    /// Focus the title field, then try `insertText` before falling back to
    /// assigning the value directly.
    async fn set_column_title(&self, handle: &ColumnHandle) -> MigrationResult<()> {
        let waiter = self.waiter().shielded();
        let timing = &self.config.timing;
        let surface = &self.surface;
        let interaction = Interaction::new(surface);

        let (index, _) = self.locator().column_index(handle).await?;
        let title_host = waiter
            .until(
                || async move { surface.query(&Query::ColumnTitle { index }).await },
                ms(timing.column_title_timeout_ms),
                ms(timing.poll_interval_ms),
            )
            .await?
            .or(handle.title_node);
        let Some(title_host) = title_host else {
            tracing::warn!("Title field for column {} not found", index);
            return Ok(());
        };

        let input: NodeRef = surface
            .query(&Query::TextField { within: title_host })
            .await?
            .unwrap_or(title_host);
        surface.focus(input).await?;
        waiter.pause(ms(timing.title_focus_delay_ms)).await?;

        surface.select_contents(input).await?;
        let accepted = match surface
            .exec_command(&EditCommand::InsertText(handle.title.clone()))
            .await
        {
            Ok(accepted) => accepted,
            Err(e) if e.is_recoverable() => {
                tracing::debug!("insertText on column title failed: {}", e);
                false
            }
            Err(e) => return Err(e),
        };

        if accepted {
            interaction.notify(input, &["input", "change"]).await?;
        } else {
            surface.set_value(input, &handle.title).await?;
            interaction.notify_inserted(input, &handle.title).await?;
            interaction.notify(input, &["change", "blur"]).await?;
        }
        interaction.press_key(Target::Node(input), Key::Enter).await?;
        waiter.pause(ms(timing.title_commit_delay_ms)).await
    }
}
