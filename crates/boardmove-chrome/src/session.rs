//! Browser sessions: launching a browser or attaching to a running one.

use std::path::PathBuf;

use boardmove_core::{MigrationError, MigrationResult};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::Handler;
use chromiumoxide::Page;
use futures::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;

use crate::detect::find_chrome;

pub(crate) fn cdp_error(err: CdpError) -> MigrationError {
    MigrationError::Surface(err.to_string())
}

#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Show the browser window. A headless browser has no logged-in
    /// session, so this is the usual choice.
    pub headful: bool,
    pub executable: Option<PathBuf>,
    /// Reuse a profile directory, e.g. one that is already logged in.
    pub user_data_dir: Option<PathBuf>,
}

/// How to reach a browser.
#[derive(Debug, Clone)]
pub enum BrowserTarget {
    Launch(LaunchOptions),
    /// DevTools endpoint of a running browser, e.g. `http://127.0.0.1:9222`.
    Connect(String),
}

pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    attached: bool,
    _profile: Option<TempDir>,
}

impl BrowserSession {
    pub async fn open(target: &BrowserTarget) -> MigrationResult<Self> {
        match target {
            BrowserTarget::Launch(options) => Self::launch(options).await,
            BrowserTarget::Connect(url) => Self::connect(url).await,
        }
    }

    pub async fn launch(options: &LaunchOptions) -> MigrationResult<Self> {
        let executable = match &options.executable {
            Some(path) => path.clone(),
            None => {
                let location = find_chrome();
                location
                    .path
                    .clone()
                    .ok_or_else(|| MigrationError::Surface(location.describe_failure()))?
            }
        };

        let profile = match &options.user_data_dir {
            Some(_) => None,
            None => Some(TempDir::new()?),
        };
        let data_dir = options
            .user_data_dir
            .clone()
            .or_else(|| profile.as_ref().map(|dir| dir.path().to_path_buf()));

        let mut builder = BrowserConfig::builder()
            .chrome_executable(&executable)
            .window_size(1440, 900)
            .args(["--no-first-run", "--disable-default-apps"]);
        if let Some(dir) = data_dir {
            builder = builder.user_data_dir(dir);
        }
        if options.headful {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| MigrationError::Config(format!("browser config: {}", e)))?;

        tracing::info!("Launching browser {}", executable.display());
        let (browser, handler) = Browser::launch(config).await.map_err(cdp_error)?;
        Ok(Self {
            browser,
            handler: spawn_handler(handler),
            attached: false,
            _profile: profile,
        })
    }

    pub async fn connect(url: &str) -> MigrationResult<Self> {
        tracing::info!("Attaching to browser at {}", url);
        let (browser, handler) = Browser::connect(url).await.map_err(cdp_error)?;
        Ok(Self {
            browser,
            handler: spawn_handler(handler),
            attached: true,
            _profile: None,
        })
    }

    /// A page showing `url`.
    ///
    /// An open tab whose address starts with `url` is reused so an existing
    /// login carries over; otherwise a new tab is opened. Without a URL the
    /// first open tab is used.
    pub async fn page(&self, url: Option<&str>) -> MigrationResult<Page> {
        let pages = self.browser.pages().await.map_err(cdp_error)?;
        for page in pages.iter() {
            let current = page.url().await.map_err(cdp_error)?.unwrap_or_default();
            if url.map_or(true, |wanted| current.starts_with(wanted)) {
                tracing::debug!("Reusing tab at {}", current);
                return Ok(page.clone());
            }
        }

        let Some(url) = url else {
            return Err(MigrationError::not_found("open browser tab"));
        };
        tracing::debug!("Opening {}", url);
        let page = self.browser.new_page(url).await.map_err(cdp_error)?;
        page.wait_for_navigation().await.map_err(cdp_error)?;
        Ok(page)
    }

    /// Rendered markup of the page at `url`.
    pub async fn page_html(&self, url: &str) -> MigrationResult<String> {
        let page = self.page(Some(url)).await?;
        page.content().await.map_err(cdp_error)
    }

    /// Close a launched browser; an attached one is only detached from.
    pub async fn close(mut self) {
        if !self.attached {
            if let Err(e) = self.browser.close().await {
                tracing::debug!("Browser close failed: {}", e);
            }
        }
        self.handler.abort();
    }
}

/// Drive the DevTools connection until it closes.
fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            let Err(e) = event else {
                continue;
            };
            let message = e.to_string();
            // Newer browsers send messages the protocol bindings do not know.
            if message.contains("did not match any variant") {
                continue;
            }
            if message.contains("connection closed") || message.contains("websocket") {
                tracing::warn!("Browser connection lost: {}", e);
                break;
            }
            tracing::debug!("DevTools message error: {}", e);
        }
        tracing::debug!("DevTools handler finished");
    })
}
