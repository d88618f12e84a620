//! Settings model for sync editing.
//!
//! Settings are organised in sections: one `[global]` section and zero or more
//! `[lang_<name>]` override sections, each a flat key/value table.
//!
//! ```toml
//! [global]
//! case_sensitive = "on"
//! identifier_regex = '\w+'
//!
//! [lang_Python]
//! case_sensitive = false
//! ```
//!
//! Values may be strings or native booleans/integers. Boolean strings are
//! matched case-insensitively against `0/1`, `false/true`, `off/on`, `no/yes`.
//!
//! # Loading
//!
//! [`SyncEditConfig::load`] layers (highest precedence last):
//! 1. The TOML settings file, if it exists.
//! 2. Environment variables prefixed `SYNCEDIT_`, with `__` separating the
//!    section from the key (`SYNCEDIT_GLOBAL__CASE_SENSITIVE=off`).

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{de::IgnoredAny, Deserialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;
use syncedit_foundation::{SyncEditError, SyncEditResult};
use tracing::{debug, warn};

/// Recognized setting keys.
pub mod keys {
    pub const USE_COLORS: &str = "use_colors";
    pub const CASE_SENSITIVE: &str = "case_sensitive";
    pub const USE_SIMPLE_NAIVE_MODE: &str = "use_simple_naive_mode";
    pub const IDENTIFIER_REGEX: &str = "identifier_regex";
    pub const IDENTIFIER_STYLE_INCLUDE: &str = "identifier_style_include";
    pub const IDENTIFIER_STYLE_EXCLUDE: &str = "identifier_style_exclude";

    pub const ALL: &[&str] = &[
        USE_COLORS,
        CASE_SENSITIVE,
        USE_SIMPLE_NAIVE_MODE,
        IDENTIFIER_REGEX,
        IDENTIFIER_STYLE_INCLUDE,
        IDENTIFIER_STYLE_EXCLUDE,
    ];
}

const GLOBAL_SECTION: &str = "global";
const LANGUAGE_SECTION_PREFIX: &str = "lang_";
const ENV_PREFIX: &str = "SYNCEDIT_";

/// A single raw setting value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl SettingValue {
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            SettingValue::Bool(b) => Cow::Owned(b.to_string()),
            SettingValue::Integer(i) => Cow::Owned(i.to_string()),
            SettingValue::Text(s) => Cow::Borrowed(s),
        }
    }

    /// Interpret the value as a boolean, `None` if it is not a boolean literal.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            SettingValue::Integer(0) => Some(false),
            SettingValue::Integer(1) => Some(true),
            SettingValue::Integer(_) => None,
            SettingValue::Text(s) => parse_bool(s),
        }
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Text(value.to_string())
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

/// Parse a boolean literal (`0/1`, `false/true`, `off/on`, `no/yes`).
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// One flat key/value section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SettingsSection(BTreeMap<String, SettingValue>);

impl SettingsSection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<SettingValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<SettingValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Parsed settings: the global section plus per-language overrides.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "RawSections")]
pub struct SyncEditConfig {
    pub global: SettingsSection,
    /// Keyed by language name as written after the `lang_` prefix.
    pub languages: BTreeMap<String, SettingsSection>,
}

#[derive(Deserialize)]
#[serde(transparent)]
struct RawSections(BTreeMap<String, RawEntry>);

/// A top-level entry: a flat table, or anything else (stray scalars,
/// arrays, nested tables) which is skipped.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Section(SettingsSection),
    Other(IgnoredAny),
}

impl From<RawSections> for SyncEditConfig {
    fn from(raw: RawSections) -> Self {
        let mut config = SyncEditConfig::default();
        for (name, entry) in raw.0 {
            let RawEntry::Section(section) = entry else {
                warn!(entry = %name, "Ignoring settings entry that is not a flat section");
                continue;
            };
            if name == GLOBAL_SECTION {
                config.global = section;
            } else if let Some(language) = name.strip_prefix(LANGUAGE_SECTION_PREFIX) {
                config.languages.insert(language.to_string(), section);
            } else {
                warn!(section = %name, "Ignoring unknown settings section");
            }
        }
        for key in config
            .global
            .keys()
            .chain(config.languages.values().flat_map(SettingsSection::keys))
        {
            if !keys::ALL.contains(&key) {
                warn!(key = %key, "Ignoring unknown setting");
            }
        }
        config
    }
}

impl SyncEditConfig {
    pub fn new(global: SettingsSection) -> Self {
        Self {
            global,
            languages: BTreeMap::new(),
        }
    }

    pub fn with_language(mut self, language: &str, section: SettingsSection) -> Self {
        self.languages.insert(language.to_string(), section);
        self
    }

    /// Override section for `language`; section names match case-insensitively.
    pub fn language_section(&self, language: &str) -> Option<&SettingsSection> {
        self.languages.get(language).or_else(|| {
            self.languages
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(language))
                .map(|(_, section)| section)
        })
    }

    /// Raw value for `key`: the language section wins over `[global]`.
    pub fn lookup(&self, language: Option<&str>, key: &str) -> Option<&SettingValue> {
        language
            .and_then(|language| self.language_section(language))
            .and_then(|section| section.get(key))
            .or_else(|| self.global.get(key))
    }

    pub fn from_toml_str(content: &str) -> SyncEditResult<Self> {
        toml::from_str(content)
            .map_err(|e| SyncEditError::config(format!("Invalid settings file: {}", e)))
    }

    /// Load settings from a TOML file layered with `SYNCEDIT_` environment
    /// variables. A missing file yields the defaults.
    pub fn load(path: &Path) -> SyncEditResult<Self> {
        debug!(path = %path.display(), "Loading sync-edit settings");
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| SyncEditError::config(format!("Failed to load settings: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_bool_literals() {
        for raw in ["1", "true", "TRUE", "yes", "On", " on "] {
            assert_eq!(parse_bool(raw), Some(true), "{raw}");
        }
        for raw in ["0", "false", "No", "OFF"] {
            assert_eq!(parse_bool(raw), Some(false), "{raw}");
        }
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn test_setting_value_as_bool() {
        assert_eq!(SettingValue::Bool(false).as_bool(), Some(false));
        assert_eq!(SettingValue::Integer(1).as_bool(), Some(true));
        assert_eq!(SettingValue::Integer(7).as_bool(), None);
        assert_eq!(SettingValue::from("Off").as_bool(), Some(false));
    }

    #[test]
    fn test_from_toml_sections() {
        let config = SyncEditConfig::from_toml_str(
            r#"
            [global]
            case_sensitive = "off"
            identifier_regex = '[A-Za-z_]+'

            [lang_Python]
            case_sensitive = true

            [colors]
            accent = "red"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.global.get(keys::CASE_SENSITIVE),
            Some(&SettingValue::from("off"))
        );
        assert_eq!(
            config.languages["Python"].get(keys::CASE_SENSITIVE),
            Some(&SettingValue::Bool(true))
        );
        assert_eq!(config.languages.len(), 1);
    }

    #[test]
    fn test_lookup_prefers_language_section() {
        let config = SyncEditConfig::new(
            SettingsSection::new()
                .with(keys::CASE_SENSITIVE, "on")
                .with(keys::USE_COLORS, "off"),
        )
        .with_language(
            "Python",
            SettingsSection::new().with(keys::CASE_SENSITIVE, "off"),
        );

        assert_eq!(
            config.lookup(Some("Python"), keys::CASE_SENSITIVE),
            Some(&SettingValue::from("off"))
        );
        assert_eq!(
            config.lookup(Some("python"), keys::CASE_SENSITIVE),
            Some(&SettingValue::from("off"))
        );
        assert_eq!(
            config.lookup(Some("Python"), keys::USE_COLORS),
            Some(&SettingValue::from("off"))
        );
        assert_eq!(
            config.lookup(Some("Rust"), keys::CASE_SENSITIVE),
            Some(&SettingValue::from("on"))
        );
        assert_eq!(config.lookup(None, keys::IDENTIFIER_REGEX), None);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = SyncEditConfig::from_toml_str("[global\ncase_sensitive = ").unwrap_err();
        assert!(matches!(err, SyncEditError::Config { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("syncedit.toml");
        std::fs::write(
            &path,
            "[global]\nuse_simple_naive_mode = \"yes\"\n\n[lang_HTML]\nuse_colors = 0\n",
        )
        .unwrap();

        let config = SyncEditConfig::load(&path).unwrap();
        assert_eq!(
            config
                .lookup(None, keys::USE_SIMPLE_NAIVE_MODE)
                .and_then(SettingValue::as_bool),
            Some(true)
        );
        assert_eq!(
            config
                .lookup(Some("HTML"), keys::USE_COLORS)
                .and_then(SettingValue::as_bool),
            Some(false)
        );
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        Jail::expect_with(|jail| {
            let config = SyncEditConfig::load(&jail.directory().join("absent.toml")).unwrap();
            assert!(config.global.is_empty());
            assert!(config.languages.is_empty());
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "syncedit.toml",
                "[global]\ncase_sensitive = \"on\"\nuse_colors = \"on\"\n",
            )?;
            jail.set_env("SYNCEDIT_GLOBAL__CASE_SENSITIVE", "off");
            jail.set_env("SYNCEDIT_LANG_PYTHON__IDENTIFIER_REGEX", r"\w+");

            let config = SyncEditConfig::load(Path::new("syncedit.toml")).unwrap();
            assert_eq!(
                config
                    .lookup(None, keys::CASE_SENSITIVE)
                    .and_then(SettingValue::as_bool),
                Some(false)
            );
            assert_eq!(
                config
                    .lookup(None, keys::USE_COLORS)
                    .and_then(SettingValue::as_bool),
                Some(true)
            );
            assert_eq!(
                config.lookup(Some("Python"), keys::IDENTIFIER_REGEX),
                Some(&SettingValue::from(r"\w+"))
            );
            Ok(())
        });
    }

    #[test]
    fn test_stray_entries_are_skipped() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "syncedit.toml",
                "version = 1\ntags = [\"a\"]\n\n[global]\nuse_colors = \"off\"\n",
            )?;
            jail.set_env("SYNCEDIT_PROFILE", "dev");

            let config = SyncEditConfig::load(Path::new("syncedit.toml")).unwrap();
            assert_eq!(
                config.global.get(keys::USE_COLORS),
                Some(&SettingValue::from("off"))
            );
            assert!(config.languages.is_empty());
            Ok(())
        });
    }
}
