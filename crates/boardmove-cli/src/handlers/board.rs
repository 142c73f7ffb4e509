use boardmove_domain::plan::ColumnOutline;
use boardmove_domain::{BoardImporter, BoardStats, MigrationPlan};
use serde::Serialize;

use crate::cli::InputArgs;
use crate::output::output_success;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Inspection {
    title: String,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    export_date: Option<String>,
    stats: BoardStats,
}

pub async fn handle_inspect(args: InputArgs) -> anyhow::Result<()> {
    let export = BoardImporter::import_from_file(&args.file)?;
    // Recomputed: the stats stored in a file are whatever its writer claimed.
    let stats = BoardStats::from_board(&export.board);
    output_success(Inspection {
        title: export.board.title.clone(),
        kind: export.board.kind.label(),
        platform: export.platform.clone(),
        export_date: export.export_date.map(|d| d.to_rfc3339()),
        stats,
    });
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanOutput {
    #[serde(rename = "type")]
    kind: &'static str,
    columns: Vec<ColumnOutline>,
    total_cards: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

pub async fn handle_plan(args: InputArgs) -> anyhow::Result<()> {
    let export = BoardImporter::import_from_file(&args.file)?;
    let plan = MigrationPlan::from_board(&export.board)?;

    let mut warnings = Vec::new();
    if plan.unsupported_connections > 0 {
        warnings.push(format!(
            "{} connections will not be migrated",
            plan.unsupported_connections
        ));
    }

    output_success(PlanOutput {
        kind: plan.kind.label(),
        columns: plan.outline(),
        total_cards: plan.total_cards(),
        warnings,
    });
    Ok(())
}
