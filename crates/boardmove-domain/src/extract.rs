//! Board extraction from a saved source page.
//!
//! Understands the markup of the source board application: a header with
//! the board title, either a chalkboard canvas of absolutely positioned
//! cards or a list of draggable kanban columns.

use boardmove_core::{MigrationError, MigrationResult};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::board::{Board, BoardKind, Connection};
use crate::card::{Attachment, Card, CardPosition, Embed};
use crate::column::Column;
use crate::export::BoardExport;

pub const SOURCE_PLATFORM: &str = "taskcards";
pub const TARGET_PLATFORM: &str = "niedersaechsische-bildungscloud";

const DEFAULT_CARD_WIDTH: f64 = 250.0;
const DEFAULT_CARD_HEIGHT: f64 = 200.0;
const TRENDSCORE_LABEL: &str = "Trendscore";
const LAST_MODIFIED_LABEL: &str = "Zuletzt geänderte";
const AUTHOR_PREFIX: &str = "Von";

struct SourceSelectors {
    title: Selector,
    description: Selector,
    author: Selector,
    trends: Selector,
    last_span: Selector,
    page_title: Selector,
    chalkboard_marker: Selector,
    kanban_marker: Selector,
    board_container: Selector,
    chalkboard_card: Selector,
    inner_card: Selector,
    card_title: Selector,
    card_content: Selector,
    connection: Selector,
    connection_label: Selector,
    path: Selector,
    kanban_column: Selector,
    column_title: Selector,
    kanban_card: Selector,
    attachment_image: Selector,
    content_image: Selector,
    thumbnail: Selector,
    thumbnail_title: Selector,
    thumbnail_author: Selector,
    video_placeholder: Selector,
    translate: Regex,
    board_id: Regex,
    filename: Regex,
}

fn selector(css: &str) -> MigrationResult<Selector> {
    Selector::parse(css)
        .map_err(|e| MigrationError::Internal(format!("invalid selector '{}': {}", css, e)))
}

fn regex(pattern: &str) -> MigrationResult<Regex> {
    Regex::new(pattern).map_err(|e| MigrationError::Internal(e.to_string()))
}

impl SourceSelectors {
    fn compile() -> MigrationResult<Self> {
        Ok(Self {
            title: selector(".board-header-container .text-h5, .board-information-title")?,
            description: selector(
                ".board-header-container .text-subtitle2, .board-information-description",
            )?,
            author: selector(".board-information-user")?,
            trends: selector(".board-information-trends")?,
            last_span: selector("span:last-child")?,
            page_title: selector("title")?,
            chalkboard_marker: selector(".board-container .chalkboard-card")?,
            kanban_marker: selector(".kanban-list-container")?,
            board_container: selector(".board-container")?,
            chalkboard_card: selector(".chalkboard-card")?,
            inner_card: selector(".board-card")?,
            card_title: selector(".board-card-header .contenteditable")?,
            card_content: selector(".board-card-content .contenteditable")?,
            connection: selector(".card-connection")?,
            connection_label: selector(".connection-label")?,
            path: selector("path")?,
            kanban_column: selector(".draggableList")?,
            column_title: selector(".board-list-header .contenteditable")?,
            kanban_card: selector(".draggableCard")?,
            attachment_image: selector(".board-card-content img[src*=\"taskcards.s3\"]")?,
            content_image: selector(".contenteditable img")?,
            thumbnail: selector(".board-thumbnail")?,
            thumbnail_title: selector(".text-subtitle1")?,
            thumbnail_author: selector(".text-caption b")?,
            video_placeholder: selector(".q-skeleton")?,
            translate: regex(r"translate\(([^,]+),\s*([^)]+)\)")?,
            board_id: regex(r"/board/([a-f0-9-]+)")?,
            filename: regex(r"filename[=%]([^&]+)")?,
        })
    }
}

/// Builds a [`BoardExport`] from the HTML of a source board page.
#[derive(Debug, Clone, Default)]
pub struct BoardExtractor {
    page_url: Option<String>,
}

impl BoardExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// URL the page was saved from; its `#/board/<id>` fragment becomes the
    /// board id.
    pub fn with_page_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = Some(url.into());
        self
    }

    pub fn extract(&self, html: &str) -> MigrationResult<BoardExport> {
        let sel = SourceSelectors::compile()?;
        let document = Html::parse_document(html);

        let title = first_text(&document, &sel.title)
            .or_else(|| {
                first_text(&document, &sel.page_title)
                    .map(|t| t.replace(" - TaskCards", "").trim().to_string())
                    .filter(|t| !t.is_empty())
            })
            .unwrap_or_else(|| "Untitled board".to_string());

        let kind = if document.select(&sel.chalkboard_marker).next().is_some() {
            BoardKind::Whiteboard
        } else if document.select(&sel.kanban_marker).next().is_some() {
            BoardKind::Kanban
        } else {
            BoardKind::Unknown
        };

        let mut board = Board {
            id: Some(self.board_id(&sel)),
            title,
            kind,
            author: first_text(&document, &sel.author)
                .map(|a| a.replacen(AUTHOR_PREFIX, "", 1).trim().to_string())
                .unwrap_or_default(),
            description: first_text(&document, &sel.description).unwrap_or_default(),
            metadata: extract_metadata(&document, &sel),
            settings: extract_settings(&document, &sel),
            ..Default::default()
        };

        match kind {
            BoardKind::Whiteboard => {
                board.cards = Some(
                    document
                        .select(&sel.chalkboard_card)
                        .map(|el| extract_whiteboard_card(el, &sel))
                        .collect(),
                );
                board.connections = Some(
                    document
                        .select(&sel.connection)
                        .map(|el| extract_connection(el, &sel))
                        .collect(),
                );
            }
            BoardKind::Kanban => {
                board.columns = Some(
                    document
                        .select(&sel.kanban_column)
                        .enumerate()
                        .map(|(index, el)| extract_column(el, index, &sel))
                        .collect(),
                );
            }
            BoardKind::Unknown => {
                tracing::warn!("Page contains neither a chalkboard nor a kanban board");
            }
        }

        tracing::info!(
            "Extracted {} board '{}' with {} cards",
            board.kind.label(),
            board.title,
            board.all_cards().len()
        );

        Ok(BoardExport::new(board).with_platforms(SOURCE_PLATFORM, TARGET_PLATFORM))
    }

    fn board_id(&self, sel: &SourceSelectors) -> String {
        self.page_url
            .as_deref()
            .and_then(|url| sel.board_id.captures(url))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(generate_id)
    }
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document.select(selector).next().map(text_of)
}

fn first_text_in(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element.select(selector).next().map(text_of)
}

/// Value of one property from an inline `style` attribute.
fn style_prop(element: ElementRef<'_>, property: &str) -> Option<String> {
    let style = element.value().attr("style")?;
    style.split(';').find_map(|decl| {
        let (name, value) = decl.split_once(':')?;
        if name.trim().eq_ignore_ascii_case(property) {
            Some(value.trim().to_string())
        } else {
            None
        }
    })
}

/// Integer prefix of a CSS length such as `120px` or `-4.5px`.
fn leading_int(value: &str) -> Option<i64> {
    let value = value.trim();
    let end = value
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(value.len(), |(i, _)| i);
    value[..end].parse().ok()
}

fn style_value(element: ElementRef<'_>, property: &str, default: &str) -> Value {
    Value::String(style_prop(element, property).unwrap_or_else(|| default.to_string()))
}

fn card_style(element: ElementRef<'_>) -> Value {
    json!({
        "backgroundColor": style_value(element, "background-color", ""),
        "color": style_value(element, "color", ""),
        "zoom": style_value(element, "zoom", "1"),
    })
}

fn extract_metadata(document: &Html, sel: &SourceSelectors) -> Value {
    let mut metadata = Map::new();
    for element in document.select(&sel.trends) {
        let text = text_of(element);
        let key = if text.contains(TRENDSCORE_LABEL) {
            "trendscore"
        } else if text.contains(LAST_MODIFIED_LABEL) {
            "lastModified"
        } else {
            continue;
        };
        let value = first_text_in(element, &sel.last_span)
            .map(Value::String)
            .unwrap_or(Value::Null);
        metadata.insert(key.to_string(), value);
    }
    Value::Object(metadata)
}

fn extract_settings(document: &Html, sel: &SourceSelectors) -> Value {
    match document.select(&sel.board_container).next() {
        Some(container) => json!({
            "backgroundImage": style_value(container, "background-image", ""),
            "backgroundColor": style_value(container, "background-color", ""),
            "backgroundSize": style_value(container, "background-size", "cover"),
            "backgroundAttachment": style_value(container, "background-attachment", "fixed"),
        }),
        None => Value::Null,
    }
}

fn extract_body(card: ElementRef<'_>, sel: &SourceSelectors, out: &mut Card) {
    out.title = first_text_in(card, &sel.card_title).unwrap_or_default();
    if let Some(content) = card.select(&sel.card_content).next() {
        out.content = text_of(content);
        out.html_content = Some(content.inner_html());
    }
    out.attachments = extract_attachments(card, sel);
    out.embeds = extract_embeds(card, sel);
}

fn extract_whiteboard_card(element: ElementRef<'_>, sel: &SourceSelectors) -> Card {
    let (x, y) = style_prop(element, "transform")
        .and_then(|t| {
            let caps = sel.translate.captures(&t)?;
            Some((
                leading_int(caps.get(1)?.as_str()).unwrap_or(0),
                leading_int(caps.get(2)?.as_str()).unwrap_or(0),
            ))
        })
        .unwrap_or((0, 0));
    let width = style_prop(element, "width")
        .and_then(|w| leading_int(&w))
        .filter(|w| *w != 0)
        .map_or(DEFAULT_CARD_WIDTH, |w| w as f64);
    let height = style_prop(element, "height")
        .and_then(|h| leading_int(&h))
        .filter(|h| *h != 0)
        .map_or(DEFAULT_CARD_HEIGHT, |h| h as f64);

    let mut card = Card {
        id: Some(generate_id()),
        position: Some(CardPosition::Canvas {
            x: x as f64,
            y: y as f64,
            width,
            height,
        }),
        style: element
            .select(&sel.inner_card)
            .next()
            .map(card_style)
            .unwrap_or_else(|| json!({})),
        ..Default::default()
    };
    extract_body(element, sel, &mut card);
    card
}

fn extract_connection(element: ElementRef<'_>, sel: &SourceSelectors) -> Connection {
    let length = |property: &str| {
        style_prop(element, property)
            .and_then(|v| leading_int(&v))
            .unwrap_or(0)
    };
    let style = element
        .select(&sel.path)
        .next()
        .map(|path| {
            let attr = |name: &str| {
                path.value()
                    .attr(name)
                    .map_or(Value::Null, |v| Value::String(v.to_string()))
            };
            json!({
                "d": attr("d"),
                "stroke": attr("stroke"),
                "strokeWidth": attr("stroke-width"),
                "strokeDasharray": attr("stroke-dasharray"),
            })
        })
        .unwrap_or_else(|| json!({}));

    Connection {
        id: Some(generate_id()),
        label: first_text_in(element, &sel.connection_label).unwrap_or_default(),
        position: json!({
            "left": length("left"),
            "top": length("top"),
            "width": length("width"),
            "height": length("height"),
        }),
        style,
    }
}

fn extract_column(element: ElementRef<'_>, index: usize, sel: &SourceSelectors) -> Column {
    let title = first_text_in(element, &sel.column_title)
        .unwrap_or_else(|| format!("Column {}", index + 1));

    let cards = element
        .select(&sel.kanban_card)
        .filter_map(|wrapper| wrapper.select(&sel.inner_card).next())
        .enumerate()
        .map(|(card_index, inner)| {
            let mut card = Card {
                id: Some(generate_id()),
                position: Some(CardPosition::Ordinal(card_index as u32)),
                style: card_style(inner),
                ..Default::default()
            };
            extract_body(inner, sel, &mut card);
            card
        })
        .collect();

    Column {
        id: Some(generate_id()),
        position: Some(index as u32),
        title,
        cards,
    }
}

fn filename_from_url(url: &str, sel: &SourceSelectors) -> String {
    if let Some(raw) = sel.filename.captures(url).and_then(|c| c.get(1)) {
        return urlencoding::decode(raw.as_str())
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| raw.as_str().to_string());
    }
    url.rsplit('/')
        .next()
        .and_then(|last| last.split('?').next())
        .unwrap_or_default()
        .to_string()
}

fn extract_attachments(card: ElementRef<'_>, sel: &SourceSelectors) -> Vec<Attachment> {
    let mut attachments: Vec<Attachment> = Vec::new();

    for img in card.select(&sel.attachment_image) {
        let Some(src) = img.value().attr("src") else {
            continue;
        };
        if src.contains("icon") || src.contains("avatar") {
            continue;
        }
        attachments.push(Attachment {
            kind: "image".to_string(),
            url: src.to_string(),
            filename: filename_from_url(src, sel),
            alt: img.value().attr("alt").unwrap_or_default().to_string(),
        });
    }

    for img in card.select(&sel.content_image) {
        let Some(src) = img.value().attr("src").filter(|s| !s.is_empty()) else {
            continue;
        };
        if src.contains("icon") || attachments.iter().any(|a| a.url == src) {
            continue;
        }
        let filename = filename_from_url(src, sel);
        attachments.push(Attachment {
            kind: "image".to_string(),
            url: src.to_string(),
            filename: if filename.is_empty() {
                "image".to_string()
            } else {
                filename
            },
            alt: img.value().attr("alt").unwrap_or_default().to_string(),
        });
    }

    attachments
}

fn extract_embeds(card: ElementRef<'_>, sel: &SourceSelectors) -> Vec<Embed> {
    let mut embeds = Vec::new();

    for thumb in card.select(&sel.thumbnail) {
        let Some(title) = first_text_in(thumb, &sel.thumbnail_title) else {
            continue;
        };
        let mut metadata = Map::new();
        metadata.insert("title".to_string(), Value::String(title));
        metadata.insert(
            "author".to_string(),
            Value::String(first_text_in(thumb, &sel.thumbnail_author).unwrap_or_default()),
        );
        metadata.insert(
            "backgroundImage".to_string(),
            style_value(thumb, "background-image", ""),
        );
        embeds.push(Embed {
            kind: "board-link".to_string(),
            metadata,
        });
    }

    let placeholders = card.select(&sel.video_placeholder).count();
    if placeholders > 0 {
        let mut metadata = Map::new();
        metadata.insert("count".to_string(), json!(placeholders));
        embeds.push(Embed {
            kind: "video-placeholder".to_string(),
            metadata,
        });
    }

    embeds
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHALKBOARD_PAGE: &str = r#"
        <html><head><title>Physik - TaskCards</title></head><body>
        <div class="board-header-container"><div class="text-h5">Physik 9b</div>
            <div class="text-subtitle2">Optik</div></div>
        <div class="board-information-user">Von Frau Sander</div>
        <div class="board-information-trends">Trendscore <span>x</span><span>42</span></div>
        <div class="board-container" style="background-color: rgb(1, 2, 3)">
          <div class="chalkboard-card" style="transform: translate(300px, 480px); width: 260px">
            <div class="board-card" style="color: red">
              <div class="board-card-header"><div class="contenteditable">Bottom</div></div>
              <div class="board-card-content"><div class="contenteditable"><p>Linsen</p>
                <img src="https://taskcards.s3.example/f?filename=lupe%20gross.png" alt="Lupe"></div></div>
            </div>
          </div>
          <div class="chalkboard-card" style="transform: translate(20px, 40px)">
            <div class="board-card">
              <div class="board-card-header"><div class="contenteditable">Top</div></div>
              <div class="board-card-content"><div class="contenteditable">Licht</div></div>
              <div class="board-thumbnail"><div class="text-subtitle1">Mehr</div>
                <div class="text-caption"><b>Kollegin</b></div></div>
              <div class="q-skeleton"></div>
            </div>
          </div>
          <div class="card-connection" style="left: 5px; top: 6px">
            <span class="connection-label">weiter</span><svg><path d="M0 0" stroke="red"></path></svg>
          </div>
        </div></body></html>
    "#;

    const KANBAN_PAGE: &str = r#"
        <html><head><title>Board - TaskCards</title></head><body>
        <div class="kanban-list-container">
          <div class="draggableList">
            <div class="board-list-header"><div class="contenteditable">Ideen</div></div>
            <div class="draggableCard"><div class="board-card">
              <div class="board-card-header"><div class="contenteditable">Eins</div></div>
              <div class="board-card-content"><div class="contenteditable">erste</div></div>
            </div></div>
            <div class="draggableCard"><div class="board-card">
              <div class="board-card-header"><div class="contenteditable">Zwei</div></div>
            </div></div>
          </div>
          <div class="draggableList"></div>
        </div></body></html>
    "#;

    #[test]
    fn test_extract_chalkboard() {
        let export = BoardExtractor::new()
            .with_page_url("https://example.org/#/board/ab12-cd34/view")
            .extract(CHALKBOARD_PAGE)
            .unwrap();
        let board = &export.board;

        assert_eq!(board.kind, BoardKind::Whiteboard);
        assert_eq!(board.id.as_deref(), Some("ab12-cd34"));
        assert_eq!(board.title, "Physik 9b");
        assert_eq!(board.description, "Optik");
        assert_eq!(board.author, "Frau Sander");
        assert_eq!(board.metadata["trendscore"], "42");

        let cards = board.cards.as_ref().unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].title, "Bottom");
        assert_eq!(
            cards[0].position,
            Some(CardPosition::Canvas {
                x: 300.0,
                y: 480.0,
                width: 260.0,
                height: 200.0
            })
        );
        assert_eq!(cards[0].attachments.len(), 1);
        assert_eq!(cards[0].attachments[0].filename, "lupe gross.png");
        assert_eq!(cards[1].embeds.len(), 2);
        assert_eq!(cards[1].embeds[0].kind, "board-link");
        assert_eq!(cards[1].embeds[1].metadata["count"], 1);

        let connections = board.connections.as_ref().unwrap();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].label, "weiter");
        assert_eq!(connections[0].position["left"], 5);
        assert_eq!(export.stats.as_ref().unwrap().total_connections, 1);
    }

    #[test]
    fn test_extract_kanban() {
        let export = BoardExtractor::new().extract(KANBAN_PAGE).unwrap();
        let board = &export.board;

        assert_eq!(board.kind, BoardKind::Kanban);
        assert_eq!(board.title, "Board");
        let columns = board.columns.as_ref().unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].title, "Ideen");
        assert_eq!(columns[1].title, "Column 2");
        assert_eq!(columns[0].cards[1].title, "Zwei");
        assert_eq!(columns[0].cards[1].position, Some(CardPosition::Ordinal(1)));
        assert!(board.layout().is_ok());
    }

    #[test]
    fn test_extraction_is_idempotent_apart_from_ids() {
        let extractor = BoardExtractor::new();
        let first = extractor.extract(CHALKBOARD_PAGE).unwrap();
        let second = extractor.extract(CHALKBOARD_PAGE).unwrap();

        assert_ne!(first.board.id, second.board.id);
        assert_eq!(first.board.without_ids(), second.board.without_ids());
        assert_eq!(first.stats, second.stats);
        assert_eq!(first.version, second.version);
    }

    #[test]
    fn test_unknown_page() {
        let export = BoardExtractor::new()
            .extract("<html><body><p>nothing</p></body></html>")
            .unwrap();
        assert_eq!(export.board.kind, BoardKind::Unknown);
        assert_eq!(export.board.title, "Untitled board");
    }

    #[test]
    fn test_leading_int() {
        assert_eq!(leading_int("120px"), Some(120));
        assert_eq!(leading_int(" -4.5px"), Some(-4));
        assert_eq!(leading_int("auto"), None);
    }
}
