//! Plain-text helpers shared by extraction and the migration engine.

use scraper::{ElementRef, Html, Node};

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "blockquote", "pre",
];

/// Strip markup from a rich-text fragment.
///
/// Block elements and `<br>` become line breaks; trailing whitespace on each
/// line is dropped and blank lines are collapsed.
pub fn html_to_plain_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(html);
    let mut out = String::new();
    collect_text(fragment.root_element(), &mut out);

    out.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    out.push('\n');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Collapse every run of whitespace to a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `haystack` shows `needle`, ignoring whitespace differences.
///
/// Rich-text editors re-flow whitespace (newlines become paragraphs,
/// consecutive spaces become `&nbsp;`), so the comparison is made on the
/// collapsed forms.
pub fn contains_text(haystack: &str, needle: &str) -> bool {
    let haystack = collapse_whitespace(&haystack.replace('\u{a0}', " "));
    let needle = collapse_whitespace(&needle.replace('\u{a0}', " "));
    haystack.contains(&needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_inline_markup() {
        assert_eq!(
            html_to_plain_text("<p>Hello <strong>bold</strong> world</p>"),
            "Hello bold world"
        );
    }

    #[test]
    fn test_paragraphs_become_lines() {
        assert_eq!(
            html_to_plain_text("<p>first</p><p>second</p>"),
            "first\nsecond"
        );
        assert_eq!(html_to_plain_text("one<br>two"), "one\ntwo");
    }

    #[test]
    fn test_decodes_entities() {
        assert_eq!(html_to_plain_text("<p>a &amp; b</p>"), "a & b");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(html_to_plain_text(""), "");
        assert_eq!(html_to_plain_text("<p></p>"), "");
    }

    #[test]
    fn test_contains_text_ignores_reflow() {
        assert!(contains_text("line one line two", "line one\nline two"));
        assert!(contains_text("a\u{a0}b", "a b"));
        assert!(!contains_text("stale", "fresh"));
    }
}
