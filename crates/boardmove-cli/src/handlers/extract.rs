use boardmove_chrome::BrowserSession;
use boardmove_domain::{BoardExporter, BoardExtractor};
use serde::Serialize;

use crate::cli::ExtractArgs;
use crate::context::browser_target;
use crate::output::output_success;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    export: Option<T>,
}

pub async fn handle(args: ExtractArgs) -> anyhow::Result<()> {
    let (html, page_url) = match (&args.html, &args.url) {
        (Some(path), _) => (std::fs::read_to_string(path)?, None),
        (None, Some(url)) => {
            let session = BrowserSession::open(&browser_target(&args.browser)).await?;
            let html = session.page_html(url).await;
            session.close().await;
            (html?, Some(url.clone()))
        }
        (None, None) => anyhow::bail!("either --html or --url is required"),
    };

    let mut extractor = BoardExtractor::new();
    if let Some(url) = page_url {
        extractor = extractor.with_page_url(url);
    }
    let export = extractor.extract(&html)?;
    tracing::info!(
        "Extracted {} board '{}'",
        export.board.kind.label(),
        export.board.title
    );

    match args.output {
        Some(path) => {
            BoardExporter::export_to_file(&export, &path)?;
            output_success(ExtractOutput::<()> {
                file: Some(path.display().to_string()),
                export: None,
            });
        }
        None => output_success(ExtractOutput {
            file: None,
            export: Some(export),
        }),
    }
    Ok(())
}
