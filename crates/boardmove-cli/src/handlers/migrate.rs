use std::sync::Arc;

use boardmove_chrome::{BrowserSession, ChromeSurface};
use boardmove_core::{MigrationConfig, TimingConfig};
use boardmove_domain::{Board, BoardImporter};
use boardmove_engine::{
    ActionObserver, MigrationReport, Migrator, ObservedSurface, ProgressEvent, SimColumn,
    SimulatedBoard, Surface,
};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cli::MigrateArgs;
use crate::context::{browser_target, CliContext};
use crate::output::output_success;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DryRunOutput {
    report: MigrationReport,
    simulated_columns: Vec<SimColumn>,
}

pub async fn handle(ctx: &CliContext, args: MigrateArgs) -> anyhow::Result<()> {
    let export = BoardImporter::import_from_file(&args.file)?;
    let observer = Arc::new(ActionObserver::new());
    let tracer = args.trace_actions.then(|| {
        observer.start();
        spawn_action_printer(&observer)
    });

    let token = CancellationToken::new();
    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, stopping after the current step");
            interrupt.cancel();
        }
    });

    if args.dry_run {
        let board = SimulatedBoard::new();
        let config = ctx.config.clone().with_timing(TimingConfig::immediate());
        let surface = ObservedSurface::new(board, observer.clone());
        let (report, surface) = run(surface, config, &export.board, token, args.quiet).await?;
        let simulated_columns = surface.inner().columns();
        drop(surface);
        finish_trace(observer, tracer).await;
        eprintln!("{}", report.summary());
        output_success(DryRunOutput {
            report,
            simulated_columns,
        });
        return Ok(());
    }

    let url = args
        .url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--url is required unless --dry-run is given"))?;
    let session = BrowserSession::open(&browser_target(&args.browser)).await?;
    let outcome = async {
        let page = session.page(Some(url)).await?;
        let chrome = ChromeSurface::attach(page, ctx.selectors.clone()).await?;
        let surface = ObservedSurface::new(chrome, observer.clone());
        let (report, _) = run(surface, ctx.config.clone(), &export.board, token, args.quiet).await?;
        Ok::<_, anyhow::Error>(report)
    }
    .await;
    session.close().await;
    finish_trace(observer, tracer).await;

    let report = outcome?;
    eprintln!("{}", report.summary());
    output_success(report);
    Ok(())
}

async fn run<S: Surface>(
    surface: S,
    config: MigrationConfig,
    board: &Board,
    token: CancellationToken,
    quiet: bool,
) -> anyhow::Result<(MigrationReport, S)> {
    let (tx, rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_progress(rx, quiet));

    let migrator = Migrator::new(surface, config)
        .with_cancellation(token)
        .with_progress(tx);
    let result = migrator.migrate(board).await;
    // Dropping the migrator closes the channel and lets the printer finish.
    let surface = migrator.into_surface();
    let _ = printer.await;

    Ok((result?, surface))
}

async fn print_progress(mut rx: mpsc::UnboundedReceiver<ProgressEvent>, quiet: bool) {
    while let Some(event) = rx.recv().await {
        if quiet {
            continue;
        }
        match event {
            ProgressEvent::ColumnCreated {
                column,
                title,
                total_columns,
            } => eprintln!("[column {}/{}] {}", column + 1, total_columns, title),
            ProgressEvent::CardCreated {
                title,
                cards_created,
                total_cards,
                ..
            } => eprintln!("  [card {}/{}] {}", cards_created, total_cards, title),
            ProgressEvent::ItemFailed(item) => match item.card_title {
                Some(card) => eprintln!("  ! {} / {}: {}", item.column_title, card, item.message),
                None => eprintln!("  ! {}: {}", item.column_title, item.message),
            },
            ProgressEvent::Finished { cancelled, .. } => {
                if cancelled {
                    eprintln!("Cancelled");
                }
            }
        }
    }
}

/// Stop observing and wait for the printer to drain what was recorded. The
/// printer ends once the last reference to the observer is gone.
async fn finish_trace(observer: Arc<ActionObserver>, tracer: Option<JoinHandle<()>>) {
    observer.stop();
    drop(observer);
    if let Some(tracer) = tracer {
        let _ = tracer.await;
    }
}

fn spawn_action_printer(observer: &ActionObserver) -> JoinHandle<()> {
    let mut rx = observer.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(record) => match record.node {
                    Some(node) => eprintln!("    > {} #{} {}", record.action, node.0, record.detail),
                    None => eprintln!("    > {} {}", record.action, record.detail),
                },
                Err(RecvError::Lagged(skipped)) => eprintln!("    > ({} actions skipped)", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    })
}
