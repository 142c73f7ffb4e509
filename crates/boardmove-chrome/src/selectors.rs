//! Selectors describing the destination's DOM.
//!
//! The defaults match the board application the engine was built against.
//! They live in the `[selectors]` table of the config file so a markup change
//! on the destination does not need a rebuild.

use std::path::Path;

use boardmove_core::{LocatorConfig, MigrationError, MigrationResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorProfile {
    /// Attribute carrying position-encoded identifiers.
    pub index_attribute: String,
    pub column_title_prefix: String,
    pub column_host_prefix: String,
    /// Cards are `{card_prefix}{column}-{card}`.
    pub card_prefix: String,
    /// Rich-text regions are `{rich_text_prefix}{column}-{card}-0`.
    pub rich_text_prefix: String,
    /// Add-card controls are `{add_card_prefix}{column}{add_card_suffix}`.
    pub add_card_prefix: String,
    pub add_card_suffix: String,
    /// Substring of the identifier of any add-card control.
    pub add_card_fragment: String,
    pub add_card_text: String,
    pub add_column_text: String,
    pub card_title_field: String,
    pub editor_class: String,
    pub focused_class: String,
    pub content_fallback: String,
    /// Tried in order until one matches.
    pub board_surface: Vec<String>,
}

impl Default for SelectorProfile {
    fn default() -> Self {
        Self {
            index_attribute: "data-testid".into(),
            column_title_prefix: "column-title-".into(),
            column_host_prefix: "board-column-".into(),
            card_prefix: "board-card-".into(),
            rich_text_prefix: "rich-text-edit-".into(),
            add_card_prefix: "column-".into(),
            add_card_suffix: "-add-card-btn".into(),
            add_card_fragment: "add-card".into(),
            add_card_text: "Karte hinzufügen".into(),
            add_column_text: "Abschnitt hinzufügen".into(),
            card_title_field: r#"textarea[placeholder*="Titel hinzufügen"]"#.into(),
            editor_class: "ck-editor__editable_inline".into(),
            focused_class: "ck-focused".into(),
            content_fallback: r#".ck-content[contenteditable="true"]"#.into(),
            board_surface: vec![
                ".multi-column-board".into(),
                r#"[class*="multi-column-board"]"#.into(),
                r#"[class*="board"]"#.into(),
            ],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SelectorFile {
    #[serde(default)]
    selectors: SelectorProfile,
}

impl SelectorProfile {
    /// Read the `[selectors]` table of a config file. Other tables are
    /// ignored; a missing table yields the defaults.
    pub fn from_toml(content: &str) -> MigrationResult<Self> {
        toml::from_str::<SelectorFile>(content)
            .map(|file| file.selectors)
            .map_err(|e| MigrationError::Config(e.to_string()))
    }

    pub fn load_from(path: &Path) -> MigrationResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Keep the identifier scheme the locator parses in step with the one
    /// the page is queried with.
    pub fn with_locator(mut self, locator: &LocatorConfig) -> Self {
        self.index_attribute = locator.index_attribute.clone();
        self.column_title_prefix = locator.column_title_prefix.clone();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_table_gives_defaults() {
        let profile = SelectorProfile::from_toml("[timing]\npoll_interval_ms = 10\n").unwrap();
        assert_eq!(profile, SelectorProfile::default());
    }

    #[test]
    fn test_partial_table_overrides() {
        let profile = SelectorProfile::from_toml(
            r#"
            [selectors]
            add_column_text = "Add section"
            board_surface = [".board"]
            "#,
        )
        .unwrap();
        assert_eq!(profile.add_column_text, "Add section");
        assert_eq!(profile.board_surface, vec![".board".to_string()]);
        assert_eq!(profile.card_prefix, "board-card-");
    }

    #[test]
    fn test_locator_settings_win() {
        let locator = LocatorConfig {
            index_attribute: "data-qa".into(),
            column_title_prefix: "col-".into(),
        };
        let profile = SelectorProfile::default().with_locator(&locator);
        assert_eq!(profile.index_attribute, "data-qa");
        assert_eq!(profile.column_title_prefix, "col-");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = SelectorProfile::from_toml("[selectors]\ncard_prefix = 3").unwrap_err();
        assert!(matches!(err, MigrationError::Config(_)));
    }
}
