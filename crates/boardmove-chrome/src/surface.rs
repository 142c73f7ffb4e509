use async_trait::async_trait;
use boardmove_core::{MigrationError, MigrationResult};
use boardmove_engine::{EditCommand, NodeRef, Query, Rect, Surface, SyntheticEvent, Target};
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::prelude::{call_script, install_script};
use crate::selectors::SelectorProfile;
use crate::session::cdp_error;

#[derive(Debug, Deserialize)]
struct CallReply {
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    value: Value,
}

/// The destination page, driven through the DevTools protocol.
pub struct ChromeSurface {
    page: Page,
    selectors: SelectorProfile,
}

impl ChromeSurface {
    /// Wrap `page` and install the node registry into it.
    pub async fn attach(page: Page, selectors: SelectorProfile) -> MigrationResult<Self> {
        let surface = Self { page, selectors };
        surface.install().await?;
        Ok(surface)
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    async fn install(&self) -> MigrationResult<()> {
        self.page
            .evaluate(install_script(&self.selectors)?)
            .await
            .map_err(cdp_error)?;
        tracing::debug!("Page prelude installed");
        Ok(())
    }

    async fn call<T: DeserializeOwned>(&self, name: &str, args: Value) -> MigrationResult<T> {
        let script = call_script(name, &args)?;
        let mut reply = self.evaluate(&script).await?;
        if reply.missing {
            // The page navigated and lost the registry; node ids from before
            // are gone with it.
            tracing::debug!("Prelude missing before {}, reinstalling", name);
            self.install().await?;
            reply = self.evaluate(&script).await?;
        }
        if reply.missing {
            return Err(MigrationError::Surface(format!(
                "page prelude unavailable for {}",
                name
            )));
        }
        Ok(serde_json::from_value(reply.value)?)
    }

    async fn evaluate(&self, script: &str) -> MigrationResult<CallReply> {
        self.page
            .evaluate(script.to_string())
            .await
            .map_err(cdp_error)?
            .into_value()
            .map_err(|e| MigrationError::Surface(format!("unexpected page reply: {}", e)))
    }

    async fn act(&self, name: &str, args: Value) -> MigrationResult<()> {
        self.call::<Value>(name, args).await.map(|_| ())
    }
}

#[async_trait]
impl Surface for ChromeSurface {
    async fn query_all(&self, query: &Query) -> MigrationResult<Vec<NodeRef>> {
        self.call("queryAll", json!([query])).await
    }

    async fn query(&self, query: &Query) -> MigrationResult<Option<NodeRef>> {
        Ok(self.query_all(query).await?.into_iter().next())
    }

    async fn closest(&self, node: NodeRef, query: &Query) -> MigrationResult<Option<NodeRef>> {
        self.call("closest", json!([node, query])).await
    }

    async fn attribute(&self, node: NodeRef, name: &str) -> MigrationResult<Option<String>> {
        self.call("attribute", json!([node, name])).await
    }

    async fn text_content(&self, node: NodeRef) -> MigrationResult<String> {
        self.call("textContent", json!([node])).await
    }

    async fn is_visible(&self, node: NodeRef) -> MigrationResult<bool> {
        self.call("isVisible", json!([node])).await
    }

    async fn is_disabled(&self, node: NodeRef) -> MigrationResult<bool> {
        self.call("isDisabled", json!([node])).await
    }

    async fn bounding_rect(&self, node: NodeRef) -> MigrationResult<Rect> {
        self.call("boundingRect", json!([node])).await
    }

    async fn hit_test(&self, x: f64, y: f64) -> MigrationResult<Option<NodeRef>> {
        self.call("hitTest", json!([x, y])).await
    }

    async fn dispatch(&self, target: Target, event: &SyntheticEvent) -> MigrationResult<()> {
        let target = match target {
            Target::Document => None,
            Target::Node(node) => Some(node),
        };
        self.act("dispatch", json!([target, event])).await
    }

    async fn click(&self, node: NodeRef) -> MigrationResult<()> {
        self.act("click", json!([node])).await
    }

    async fn focus(&self, node: NodeRef) -> MigrationResult<()> {
        self.act("focus", json!([node])).await
    }

    async fn blur_active(&self) -> MigrationResult<()> {
        self.act("blurActive", json!([])).await
    }

    async fn scroll_into_view(&self, node: NodeRef) -> MigrationResult<()> {
        self.act("scrollIntoView", json!([node])).await
    }

    async fn select_contents(&self, node: NodeRef) -> MigrationResult<()> {
        self.act("selectContents", json!([node])).await
    }

    async fn exec_command(&self, command: &EditCommand) -> MigrationResult<bool> {
        self.call("execCommand", json!([command])).await
    }

    async fn set_value(&self, node: NodeRef, value: &str) -> MigrationResult<()> {
        self.act("setValue", json!([node, value])).await
    }

    async fn editor_set_data(&self, node: NodeRef, html: &str) -> MigrationResult<bool> {
        self.call("editorSetData", json!([node, html])).await
    }

    async fn replace_paragraph_text(&self, node: NodeRef, text: &str) -> MigrationResult<()> {
        self.act("replaceParagraphText", json!([node, text])).await
    }
}
