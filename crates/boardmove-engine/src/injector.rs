//! Writes plain text into a rich-text region through a chain of strategies.
//!
//! The editor's internal state is not reachable directly, so each strategy
//! after the first is verified against the region's rendered text before the
//! next one is tried.

use boardmove_core::config::ms;
use boardmove_core::{MigrationError, MigrationResult, TimingConfig};
use boardmove_domain::text::contains_text;
use serde::Serialize;

use crate::interaction::Interaction;
use crate::settle::SettleWaiter;
use crate::surface::{EditCommand, NodeRef, Surface};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InjectionTier {
    /// Data handed to the editor instance bound to the region.
    EditorApi,
    /// Select all, then the `insertText` editing command.
    Command,
    /// One synthetic keystroke per character.
    Keystrokes,
    /// Paragraph text replaced in place, followed by an `input` event.
    DirectMutation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionOutcome {
    pub verified: bool,
    /// The strategy that made the text appear.
    pub tier: Option<InjectionTier>,
    pub attempted: Vec<InjectionTier>,
}

pub struct ContentInjector<'a, S: Surface + ?Sized> {
    surface: &'a S,
    timing: &'a TimingConfig,
    waiter: SettleWaiter,
}

impl<'a, S: Surface + ?Sized> ContentInjector<'a, S> {
    /// Keystroke pacing is never interrupted, so the waiter is shielded.
    pub fn new(surface: &'a S, timing: &'a TimingConfig, waiter: &SettleWaiter) -> Self {
        Self {
            surface,
            timing,
            waiter: waiter.shielded(),
        }
    }

    /// Write `text` into `region`. True when the text is confirmed present.
    pub async fn inject(&self, region: NodeRef, text: &str) -> MigrationResult<bool> {
        Ok(self.inject_detailed(region, text).await?.verified)
    }

    pub async fn inject_detailed(
        &self,
        region: NodeRef,
        text: &str,
    ) -> MigrationResult<InjectionOutcome> {
        let mut attempted = Vec::with_capacity(4);

        attempted.push(InjectionTier::EditorApi);
        if self.recover(self.via_editor_api(region, text).await)? {
            tracing::debug!("Content set through the editor instance");
            return Ok(InjectionOutcome {
                verified: true,
                tier: Some(InjectionTier::EditorApi),
                attempted,
            });
        }

        for tier in [
            InjectionTier::Command,
            InjectionTier::Keystrokes,
            InjectionTier::DirectMutation,
        ] {
            attempted.push(tier);
            let applied = match tier {
                InjectionTier::Command => self.via_command(region, text).await,
                InjectionTier::Keystrokes => self.via_keystrokes(region, text).await,
                InjectionTier::DirectMutation => self.via_direct_mutation(region, text).await,
                InjectionTier::EditorApi => Ok(()),
            };
            self.recover(applied.map(|_| true))?;

            if self.recover(self.verify(region, text).await)? {
                tracing::debug!("Content verified after {:?}", tier);
                return Ok(InjectionOutcome {
                    verified: true,
                    tier: Some(tier),
                    attempted,
                });
            }
            tracing::debug!("Content not visible after {:?}", tier);
        }

        tracing::warn!("All content injection strategies exhausted");
        Ok(InjectionOutcome {
            verified: false,
            tier: None,
            attempted,
        })
    }

    /// A tier that fails on the backend counts as a tier that did not work.
    fn recover(&self, result: MigrationResult<bool>) -> MigrationResult<bool> {
        match result {
            Ok(value) => Ok(value),
            Err(e) if e.is_recoverable() => {
                tracing::debug!("Injection tier failed: {}", e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn verify(&self, region: NodeRef, text: &str) -> MigrationResult<bool> {
        let rendered = self.surface.text_content(region).await?;
        Ok(contains_text(&rendered, text))
    }

    async fn via_editor_api(&self, region: NodeRef, text: &str) -> MigrationResult<bool> {
        self.surface.focus(region).await?;
        self.surface.editor_set_data(region, &to_paragraphs(text)).await
    }

    async fn via_command(&self, region: NodeRef, text: &str) -> MigrationResult<()> {
        self.surface.focus(region).await?;
        self.surface.select_contents(region).await?;
        let accepted = self
            .surface
            .exec_command(&EditCommand::InsertText(text.to_string()))
            .await?;
        tracing::debug!("insertText accepted: {}", accepted);
        Ok(())
    }

    async fn via_keystrokes(&self, region: NodeRef, text: &str) -> MigrationResult<()> {
        self.surface.focus(region).await?;
        self.surface.exec_command(&EditCommand::SelectAll).await?;
        self.surface.exec_command(&EditCommand::Delete).await?;

        let interaction = Interaction::new(self.surface);
        let delay = ms(self.timing.keystroke_delay_ms);
        for c in text.chars() {
            interaction.type_char(region, c).await?;
            self.waiter.pause(delay).await?;
        }
        Ok(())
    }

    async fn via_direct_mutation(&self, region: NodeRef, text: &str) -> MigrationResult<()> {
        self.surface.replace_paragraph_text(region, text).await?;
        Interaction::new(self.surface).notify(region, &["input"]).await
    }
}

/// Escape `text` into editor markup, one paragraph per line.
fn to_paragraphs(text: &str) -> String {
    text.lines()
        .map(|line| format!("<p>{}</p>", html_escape::encode_text(line)))
        .collect()
}

/// The error recorded when a card's body could not be written.
pub fn injection_error(outcome: &InjectionOutcome) -> MigrationError {
    MigrationError::InjectionFailed(format!(
        "text not visible after {} strategies",
        outcome.attempted.len()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MockSurface;
    use mockall::predicate::*;

    fn permissive(surface: &mut MockSurface) {
        surface.expect_focus().returning(|_| Ok(()));
        surface.expect_select_contents().returning(|_| Ok(()));
        surface.expect_dispatch().returning(|_, _| Ok(()));
    }

    #[tokio::test]
    async fn test_editor_api_needs_no_verification() {
        let mut surface = MockSurface::new();
        permissive(&mut surface);
        surface
            .expect_editor_set_data()
            .with(eq(NodeRef(1)), eq("<p>a &lt; b</p><p>c</p>"))
            .times(1)
            .returning(|_, _| Ok(true));
        surface.expect_text_content().never();

        let timing = TimingConfig::immediate();
        let injector = ContentInjector::new(&surface, &timing, &SettleWaiter::new());
        let outcome = injector.inject_detailed(NodeRef(1), "a < b\nc").await.unwrap();

        assert!(outcome.verified);
        assert_eq!(outcome.tier, Some(InjectionTier::EditorApi));
    }

    #[tokio::test]
    async fn test_command_tier_verified() {
        let mut surface = MockSurface::new();
        permissive(&mut surface);
        surface.expect_editor_set_data().returning(|_, _| Ok(false));
        surface.expect_exec_command().returning(|_| Ok(true));
        surface
            .expect_text_content()
            .times(1)
            .returning(|_| Ok("hello\u{a0}world".to_string()));
        surface.expect_replace_paragraph_text().never();

        let timing = TimingConfig::immediate();
        let injector = ContentInjector::new(&surface, &timing, &SettleWaiter::new());
        let outcome = injector.inject_detailed(NodeRef(1), "hello world").await.unwrap();

        assert!(outcome.verified);
        assert_eq!(outcome.tier, Some(InjectionTier::Command));
        assert_eq!(
            outcome.attempted,
            vec![InjectionTier::EditorApi, InjectionTier::Command]
        );
    }

    #[tokio::test]
    async fn test_stale_region_exhausts_all_tiers() {
        let mut surface = MockSurface::new();
        permissive(&mut surface);
        surface.expect_editor_set_data().returning(|_, _| Ok(false));
        surface.expect_exec_command().returning(|_| Ok(false));
        surface
            .expect_text_content()
            .times(3)
            .returning(|_| Ok("stale".to_string()));
        surface
            .expect_replace_paragraph_text()
            .times(1)
            .returning(|_, _| Ok(()));

        let timing = TimingConfig::immediate();
        let injector = ContentInjector::new(&surface, &timing, &SettleWaiter::new());
        let outcome = injector.inject_detailed(NodeRef(1), "fresh").await.unwrap();

        assert!(!outcome.verified);
        assert_eq!(outcome.tier, None);
        assert_eq!(
            outcome.attempted,
            vec![
                InjectionTier::EditorApi,
                InjectionTier::Command,
                InjectionTier::Keystrokes,
                InjectionTier::DirectMutation
            ]
        );
    }

    #[tokio::test]
    async fn test_backend_failure_falls_through() {
        let mut surface = MockSurface::new();
        permissive(&mut surface);
        surface
            .expect_editor_set_data()
            .returning(|_, _| Err(MigrationError::Surface("script error".into())));
        surface.expect_exec_command().returning(|_| Ok(true));
        surface
            .expect_text_content()
            .returning(|_| Ok("body".to_string()));

        let timing = TimingConfig::immediate();
        let injector = ContentInjector::new(&surface, &timing, &SettleWaiter::new());
        assert!(injector.inject(NodeRef(1), "body").await.unwrap());
    }

    #[test]
    fn test_to_paragraphs() {
        assert_eq!(to_paragraphs("x & y"), "<p>x &amp; y</p>");
    }
}
