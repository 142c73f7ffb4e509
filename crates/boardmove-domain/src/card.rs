use serde::{Deserialize, Serialize};

use crate::text::html_to_plain_text;

/// Where a card sat on its source board.
///
/// Whiteboard cards carry canvas coordinates; kanban exports store the
/// card's ordinal within its column instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CardPosition {
    Canvas {
        x: f64,
        y: f64,
        #[serde(default)]
        width: f64,
        #[serde(default)]
        height: f64,
    },
    Ordinal(u32),
}

impl CardPosition {
    pub fn canvas(x: f64, y: f64) -> Self {
        Self::Canvas {
            x,
            y,
            width: 0.0,
            height: 0.0,
        }
    }

    pub fn canvas_y(&self) -> Option<f64> {
        match self {
            Self::Canvas { y, .. } => Some(*y),
            Self::Ordinal(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alt: String,
}

/// Embedded object such as a link to another board or a video placeholder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_content: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<CardPosition>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub style: serde_json::Value,
}

impl Card {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html_content = Some(html.into());
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Some(CardPosition::canvas(x, y));
        self
    }

    /// Plain text to write into the destination's content editor.
    ///
    /// `content` wins; otherwise markup is stripped from `html_content`.
    /// `None` means the card has no body.
    pub fn body_text(&self) -> Option<String> {
        if !self.content.trim().is_empty() {
            return Some(self.content.clone());
        }
        let derived = self
            .html_content
            .as_deref()
            .map(html_to_plain_text)
            .unwrap_or_default();
        if derived.is_empty() {
            None
        } else {
            Some(derived)
        }
    }

    pub fn canvas_y(&self) -> Option<f64> {
        self.position.as_ref().and_then(CardPosition::canvas_y)
    }

    /// Whether the card carries content the destination cannot receive.
    pub fn has_unmigrated_media(&self) -> bool {
        !self.attachments.is_empty() || !self.embeds.is_empty()
    }
}
