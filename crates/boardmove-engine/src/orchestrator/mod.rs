//! Walks a board and recreates it column by column, card by card.
//!
//! Steps run strictly one after another. Each column or card step is
//! shielded from cancellation once started; the token is observed between
//! steps and during the delays that separate them.

mod card;
mod column;

pub use card::CardOutcome;

use boardmove_core::config::ms;
use boardmove_core::{MigrationConfig, MigrationError, MigrationResult};
use boardmove_domain::{Board, BoardImporter, MigrationPlan, PlannedColumn};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::injector::injection_error;
use crate::locator::ElementLocator;
use crate::report::{ItemError, MigrationReport};
use crate::retry::RetryPolicy;
use crate::settle::SettleWaiter;
use crate::surface::Surface;

/// Running tally sent while a migration proceeds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ProgressEvent {
    #[serde(rename_all = "camelCase")]
    ColumnCreated {
        column: usize,
        title: String,
        total_columns: usize,
    },
    #[serde(rename_all = "camelCase")]
    CardCreated {
        column: usize,
        card: usize,
        title: String,
        cards_created: usize,
        total_cards: usize,
    },
    ItemFailed(ItemError),
    #[serde(rename_all = "camelCase")]
    Finished {
        columns_created: usize,
        cards_created: usize,
        failed: usize,
        cancelled: bool,
    },
}

pub struct Migrator<S: Surface> {
    surface: S,
    config: MigrationConfig,
    retry: RetryPolicy,
    token: CancellationToken,
    progress: Option<UnboundedSender<ProgressEvent>>,
}

impl<S: Surface> Migrator<S> {
    pub fn new(surface: S, config: MigrationConfig) -> Self {
        let config = config.normalized();
        Self {
            surface,
            retry: RetryPolicy::from(&config.retry),
            config,
            token: CancellationToken::new(),
            progress: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn with_progress(mut self, progress: UnboundedSender<ProgressEvent>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Waiter observing the migration's cancellation token.
    fn waiter(&self) -> SettleWaiter {
        SettleWaiter::with_token(self.token.clone())
    }

    /// Locator bound to this migrator's surface and settings.
    pub fn locator(&self) -> ElementLocator<'_, S> {
        ElementLocator::new(&self.surface, &self.config.locator)
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(event);
        }
    }

    /// Parse an export document and migrate its board.
    pub async fn migrate_json(&self, json: &str) -> MigrationResult<MigrationReport> {
        let export = BoardImporter::import_from_json(json)?;
        self.migrate(&export.board).await
    }

    /// Recreate `board` on the destination.
    ///
    /// A board whose shape does not match its type is rejected with
    /// `MalformedInput` before anything is touched. Every other failure is
    /// recorded against the card or column it affected.
    pub async fn migrate(&self, board: &Board) -> MigrationResult<MigrationReport> {
        let plan = MigrationPlan::from_board(board)?;
        let mut report = MigrationReport::start();
        report.info(format!(
            "Migrating {} board '{}': {} columns, {} cards",
            plan.kind.label(),
            board.title,
            plan.columns.len(),
            plan.total_cards()
        ));
        tracing::info!(
            "Migrating {} board '{}' ({} cards)",
            plan.kind.label(),
            board.title,
            plan.total_cards()
        );
        self.warn_unsupported(&plan, &mut report);

        let total_columns = plan.columns.len();
        let total_cards = plan.total_cards();
        let waiter = self.waiter();

        'columns: for (position, planned) in plan.columns.iter().enumerate() {
            if waiter.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let handle = match self.create_column(planned.title).await {
                Ok(handle) => handle,
                Err(e) => {
                    tracing::warn!("Column '{}' failed: {}", planned.title, e);
                    self.fail(
                        &mut report,
                        ItemError::column(position, planned.title, &e),
                    );
                    if !planned.cards.is_empty() {
                        report.warn(format!(
                            "Skipped {} cards of column '{}'",
                            planned.cards.len(),
                            planned.title
                        ));
                    }
                    continue;
                }
            };
            report.columns_created += 1;
            report.info(format!("Created column '{}'", planned.title));
            self.emit(ProgressEvent::ColumnCreated {
                column: position,
                title: planned.title.to_string(),
                total_columns,
            });

            for (index, card) in planned.cards.iter().enumerate() {
                if waiter.is_cancelled() {
                    report.cancelled = true;
                    break 'columns;
                }

                match self.create_card(&handle, card, &mut report).await {
                    Ok(outcome) => {
                        report.cards_created += 1;
                        if let Some(injection) = outcome.injection.as_ref().filter(|i| !i.verified) {
                            let error = injection_error(injection);
                            self.fail(
                                &mut report,
                                ItemError::card(position, planned.title, index, &card.title, &error),
                            );
                        }
                        self.emit(ProgressEvent::CardCreated {
                            column: position,
                            card: index,
                            title: card.title.clone(),
                            cards_created: report.cards_created,
                            total_cards,
                        });
                    }
                    Err(e) => {
                        tracing::warn!("Card '{}' failed: {}", card.title, e);
                        self.fail(
                            &mut report,
                            ItemError::card(position, planned.title, index, &card.title, &e),
                        );
                    }
                }

                if index + 1 == planned.cards.len() {
                    break;
                }
                if let Err(MigrationError::Cancelled) =
                    waiter.pause(ms(self.config.timing.inter_card_delay_ms)).await
                {
                    report.cancelled = true;
                    break 'columns;
                }
            }

            // Pauses only separate steps; nothing waits after the last one.
            if position + 1 == total_columns {
                break;
            }
            if let Err(MigrationError::Cancelled) =
                waiter.pause(ms(self.config.timing.inter_column_delay_ms)).await
            {
                report.cancelled = true;
                break;
            }
        }

        report.finish();
        if report.cancelled {
            report.warn("Migration cancelled between steps");
        }
        tracing::info!("{}", report.summary());
        self.emit(ProgressEvent::Finished {
            columns_created: report.columns_created,
            cards_created: report.cards_created,
            failed: report.failed_items(),
            cancelled: report.cancelled,
        });
        Ok(report)
    }

    fn fail(&self, report: &mut MigrationReport, error: ItemError) {
        self.emit(ProgressEvent::ItemFailed(error.clone()));
        report.record_error(error);
    }

    fn warn_unsupported(&self, plan: &MigrationPlan<'_>, report: &mut MigrationReport) {
        if plan.unsupported_connections > 0 {
            report.warn(format!(
                "{} card connections have no destination equivalent and were not migrated",
                plan.unsupported_connections
            ));
        }
        for column in &plan.columns {
            warn_media(column, report);
        }
    }
}

fn warn_media(column: &PlannedColumn<'_>, report: &mut MigrationReport) {
    for card in column.cards.iter().filter(|c| c.has_unmigrated_media()) {
        report.warn(format!(
            "Card '{}' has {} attachments and {} embeds that were not migrated",
            card.title,
            card.attachments.len(),
            card.embeds.len()
        ));
    }
}
