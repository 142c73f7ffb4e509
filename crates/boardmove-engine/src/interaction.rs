//! Synthetic pointer and keyboard input.
//!
//! Events carry the fields destination frameworks inspect: coordinates for
//! pointer events, the key/code/keyCode triple for keyboard events.

use boardmove_core::MigrationResult;

use crate::surface::{NodeRef, Query, Surface, SyntheticEvent, Target};

const HOVER_SEQUENCE: [&str; 3] = ["mouseenter", "mouseover", "mousemove"];
const SAFE_POINT_INSET: f64 = 10.0;
const SAFE_POINT_MIN: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Enter,
    Char(char),
}

/// Physical key of a US layout for the punctuation it types. Characters
/// with no key of their own get an empty code.
fn punctuation_code(c: char) -> Option<&'static str> {
    let code = match c {
        '.' | '>' => "Period",
        ',' | '<' => "Comma",
        '-' | '_' => "Minus",
        '=' | '+' => "Equal",
        ';' | ':' => "Semicolon",
        '\'' | '"' => "Quote",
        '/' | '?' => "Slash",
        '\\' | '|' => "Backslash",
        '[' | '{' => "BracketLeft",
        ']' | '}' => "BracketRight",
        '`' | '~' => "Backquote",
        '\t' => "Tab",
        _ => return None,
    };
    Some(code)
}

impl Key {
    pub fn key(&self) -> String {
        match self {
            Self::Escape => "Escape".to_string(),
            Self::Enter => "Enter".to_string(),
            Self::Char(c) => c.to_string(),
        }
    }

    pub fn code(&self) -> String {
        match self {
            Self::Escape => "Escape".to_string(),
            Self::Enter => "Enter".to_string(),
            Self::Char(' ') => "Space".to_string(),
            Self::Char(c) if c.is_ascii_digit() => format!("Digit{}", c),
            Self::Char(c) if c.is_ascii_alphabetic() => format!("Key{}", c.to_ascii_uppercase()),
            Self::Char(c) => punctuation_code(*c).unwrap_or_default().to_string(),
        }
    }

    pub fn key_code(&self) -> u32 {
        match self {
            Self::Escape => 27,
            Self::Enter => 13,
            Self::Char(c) => *c as u32,
        }
    }

    fn event(&self, name: &'static str) -> SyntheticEvent {
        SyntheticEvent::Keyboard {
            name,
            key: self.key(),
            code: self.code(),
            key_code: self.key_code(),
        }
    }
}

pub struct Interaction<'a, S: Surface + ?Sized> {
    surface: &'a S,
}

impl<'a, S: Surface + ?Sized> Interaction<'a, S> {
    pub fn new(surface: &'a S) -> Self {
        Self { surface }
    }

    pub async fn hover(&self, node: NodeRef) -> MigrationResult<()> {
        for name in HOVER_SEQUENCE {
            self.surface
                .dispatch(
                    Target::Node(node),
                    &SyntheticEvent::Mouse {
                        name,
                        x: None,
                        y: None,
                    },
                )
                .await?;
        }
        Ok(())
    }

    pub async fn click_at(&self, node: NodeRef, x: f64, y: f64) -> MigrationResult<()> {
        self.surface
            .dispatch(
                Target::Node(node),
                &SyntheticEvent::Mouse {
                    name: "click",
                    x: Some(x),
                    y: Some(y),
                },
            )
            .await
    }

    /// Click a point of the board surface that is not covered by a card or
    /// a column.
    ///
    /// The four corners of the surface, inset slightly, are hit-tested in
    /// turn. When every corner is covered the surface gets a plain click.
    /// Returns the coordinates used, if any.
    pub async fn click_safe_point(&self, board: NodeRef) -> MigrationResult<Option<(f64, f64)>> {
        let rect = self.surface.bounding_rect(board).await?;
        let offsets = [
            (SAFE_POINT_INSET, SAFE_POINT_INSET),
            (rect.width - SAFE_POINT_INSET, SAFE_POINT_INSET),
            (SAFE_POINT_INSET, rect.height - SAFE_POINT_INSET),
            (rect.width - SAFE_POINT_INSET, rect.height - SAFE_POINT_INSET),
        ];

        for (dx, dy) in offsets {
            let x = (rect.left + dx).max(rect.left + SAFE_POINT_MIN);
            let y = (rect.top + dy).max(rect.top + SAFE_POINT_MIN);
            if let Some(hit) = self.surface.hit_test(x, y).await? {
                if self.is_occupied(hit).await? {
                    continue;
                }
            }
            self.click_at(board, x, y).await?;
            return Ok(Some((x, y)));
        }

        tracing::debug!("No free corner on the board surface, clicking it directly");
        self.surface.click(board).await?;
        Ok(None)
    }

    async fn is_occupied(&self, hit: NodeRef) -> MigrationResult<bool> {
        if self.surface.closest(hit, &Query::AnyCard).await?.is_some() {
            return Ok(true);
        }
        Ok(self
            .surface
            .closest(hit, &Query::ColumnHosts)
            .await?
            .is_some())
    }

    pub async fn press_key(&self, target: Target, key: Key) -> MigrationResult<()> {
        self.surface.dispatch(target, &key.event("keydown")).await
    }

    /// Full keystroke for one character: keydown, keypress, beforeinput,
    /// input, keyup.
    pub async fn type_char(&self, node: NodeRef, c: char) -> MigrationResult<()> {
        let (key, input_type, data) = if c == '\n' {
            (Key::Enter, "insertParagraph", None)
        } else {
            (Key::Char(c), "insertText", Some(c.to_string()))
        };
        let target = Target::Node(node);

        self.surface.dispatch(target, &key.event("keydown")).await?;
        self.surface.dispatch(target, &key.event("keypress")).await?;
        for name in ["beforeinput", "input"] {
            self.surface
                .dispatch(
                    target,
                    &SyntheticEvent::Input {
                        name,
                        input_type: input_type.to_string(),
                        data: data.clone(),
                    },
                )
                .await?;
        }
        self.surface.dispatch(target, &key.event("keyup")).await
    }

    /// Dispatch plain events such as `input` and `change` on a node.
    pub async fn notify(&self, node: NodeRef, names: &[&'static str]) -> MigrationResult<()> {
        for name in names {
            self.surface
                .dispatch(Target::Node(node), &SyntheticEvent::basic(name))
                .await?;
        }
        Ok(())
    }

    /// An `input` event describing inserted text.
    pub async fn notify_inserted(&self, node: NodeRef, text: &str) -> MigrationResult<()> {
        self.surface
            .dispatch(
                Target::Node(node),
                &SyntheticEvent::Input {
                    name: "input",
                    input_type: "insertText".to_string(),
                    data: Some(text.to_string()),
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{MockSurface, Rect};
    use mockall::predicate::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_key_triple() {
        assert_eq!(Key::Escape.key_code(), 27);
        assert_eq!(Key::Enter.code(), "Enter");
        assert_eq!(Key::Char('a').code(), "KeyA");
        assert_eq!(Key::Char('7').code(), "Digit7");
        assert_eq!(Key::Char('a').key_code(), 97);
    }

    #[test]
    fn test_codes_name_physical_keys() {
        assert_eq!(Key::Char('Q').code(), "KeyQ");
        assert_eq!(Key::Char('.').code(), "Period");
        assert_eq!(Key::Char('?').code(), "Slash");
        assert_eq!(Key::Char('\\').code(), "Backslash");
        assert_eq!(Key::Char('ä').code(), "");
        assert_eq!(Key::Char('Ä').code(), "");
        assert_eq!(Key::Char('é').key(), "é");
    }

    #[tokio::test]
    async fn test_type_char_dispatches_quintet() {
        let names = Arc::new(Mutex::new(Vec::new()));
        let seen = names.clone();
        let mut surface = MockSurface::new();
        surface.expect_dispatch().times(5).returning(move |_, event| {
            seen.lock().unwrap().push(event.name());
            Ok(())
        });

        Interaction::new(&surface)
            .type_char(NodeRef(1), 'x')
            .await
            .unwrap();

        assert_eq!(
            *names.lock().unwrap(),
            vec!["keydown", "keypress", "beforeinput", "input", "keyup"]
        );
    }

    #[tokio::test]
    async fn test_safe_point_skips_covered_corner() {
        let mut surface = MockSurface::new();
        surface.expect_bounding_rect().returning(|_| {
            Ok(Rect {
                left: 100.0,
                top: 50.0,
                width: 400.0,
                height: 300.0,
            })
        });
        // The top-left corner lies on a card, the top-right one is free.
        surface
            .expect_hit_test()
            .with(eq(110.0), eq(60.0))
            .returning(|_, _| Ok(Some(NodeRef(7))));
        surface
            .expect_hit_test()
            .with(eq(490.0), eq(60.0))
            .returning(|_, _| Ok(Some(NodeRef(1))));
        surface
            .expect_closest()
            .returning(|node, query| Ok((node == NodeRef(7) && *query == Query::AnyCard).then_some(NodeRef(8))));
        surface.expect_dispatch().times(1).returning(|target, event| {
            assert_eq!(target, Target::Node(NodeRef(1)));
            assert_eq!(
                *event,
                SyntheticEvent::Mouse {
                    name: "click",
                    x: Some(490.0),
                    y: Some(60.0)
                }
            );
            Ok(())
        });

        let point = Interaction::new(&surface)
            .click_safe_point(NodeRef(1))
            .await
            .unwrap();
        assert_eq!(point, Some((490.0, 60.0)));
    }

    #[tokio::test]
    async fn test_safe_point_falls_back_to_plain_click() {
        let mut surface = MockSurface::new();
        surface
            .expect_bounding_rect()
            .returning(|_| Ok(Rect::default()));
        surface
            .expect_hit_test()
            .times(4)
            .returning(|_, _| Ok(Some(NodeRef(3))));
        surface
            .expect_closest()
            .returning(|_, _| Ok(Some(NodeRef(4))));
        surface.expect_click().with(eq(NodeRef(1))).times(1).returning(|_| Ok(()));

        let point = Interaction::new(&surface)
            .click_safe_point(NodeRef(1))
            .await
            .unwrap();
        assert_eq!(point, None);
    }
}
