//! Per-session matching policy.
//!
//! A [`Policy`] is resolved fresh from [`SyncEditConfig`] every time a session
//! starts and never changes afterwards. Resolution cannot fail: malformed
//! patterns and unrecognised boolean literals fall back to their defaults and
//! are reported as [`ConfigWarning`]s.

use crate::settings::{keys, SettingValue, SyncEditConfig};
use regex::Regex;
use std::borrow::Cow;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_IDENTIFIER_PATTERN: &str = r"\w+";
pub const DEFAULT_STYLE_INCLUDE_PATTERN: &str = r"(?i)id[\w\s]*";
pub const DEFAULT_STYLE_EXCLUDE_PATTERN: &str = r"(?i).*keyword.*";
pub const DEFAULT_CASE_SENSITIVE: bool = true;
pub const DEFAULT_USE_SIMPLE_NAIVE_MODE: bool = false;
pub const DEFAULT_USE_COLORS: bool = true;

/// Languages whose role labels are too coarse to be useful; always scanned in
/// pattern mode.
pub const PATTERN_MODE_LANGUAGES: &[&str] = &[
    "Markdown",
    "reStructuredText",
    "Textile",
    "ToDo",
    "Todo.txt",
    "JSON",
    "JSON ^",
    "Ini files ^",
];

/// Languages that label identifiers unconventionally, with the include
/// pattern used when no settings section provides one.
pub const LANGUAGE_STYLE_INCLUDE_DEFAULTS: &[(&str, &str)] = &[
    ("HTML", "Text|Tag id correct|Tag prop"),
    ("PHP", "Var"),
];

/// Whether `language` is forced into pattern mode.
pub fn forces_pattern_mode(language: Option<&str>) -> bool {
    match language {
        None => true,
        Some(language) => language.is_empty() || PATTERN_MODE_LANGUAGES.contains(&language),
    }
}

/// Default include pattern for `language`.
pub fn default_style_include(language: Option<&str>) -> &'static str {
    language
        .and_then(|language| {
            LANGUAGE_STYLE_INCLUDE_DEFAULTS
                .iter()
                .find(|(name, _)| *name == language)
                .map(|(_, pattern)| *pattern)
        })
        .unwrap_or(DEFAULT_STYLE_INCLUDE_PATTERN)
}

/// A recoverable problem found while resolving settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigWarning {
    #[error("Invalid pattern for {key} ({pattern:?}): {message}; using fallback")]
    InvalidPattern {
        key: String,
        pattern: String,
        message: String,
    },

    #[error("Invalid boolean for {key} ({value:?}); using default")]
    InvalidBool { key: String, value: String },
}

impl ConfigWarning {
    pub fn key(&self) -> &str {
        match self {
            ConfigWarning::InvalidPattern { key, .. } | ConfigWarning::InvalidBool { key, .. } => {
                key
            }
        }
    }
}

/// Compiled, immutable matching rules for one session.
#[derive(Debug, Clone)]
pub struct Policy {
    identifier: Regex,
    style_include: Regex,
    style_exclude: Regex,
    case_sensitive: bool,
    structural: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            identifier: compile(DEFAULT_IDENTIFIER_PATTERN).expect("default identifier pattern"),
            style_include: compile_full(DEFAULT_STYLE_INCLUDE_PATTERN)
                .expect("default include pattern"),
            style_exclude: compile_full(DEFAULT_STYLE_EXCLUDE_PATTERN)
                .expect("default exclude pattern"),
            case_sensitive: DEFAULT_CASE_SENSITIVE,
            structural: !DEFAULT_USE_SIMPLE_NAIVE_MODE,
        }
    }
}

impl Policy {
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_structural_mode(mut self, structural: bool) -> Self {
        self.structural = structural;
        self
    }

    pub fn with_identifier_pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.identifier = compile(pattern)?;
        Ok(self)
    }

    pub fn with_style_patterns(mut self, include: &str, exclude: &str) -> Result<Self, regex::Error> {
        self.style_include = compile_full(include)?;
        self.style_exclude = compile_full(exclude)?;
        Ok(self)
    }

    pub fn identifier_pattern(&self) -> &Regex {
        &self.identifier
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn uses_structural_mode(&self) -> bool {
        self.structural
    }

    /// A role label qualifies when it fully matches the include pattern and
    /// does not fully match the exclude pattern. Exclusion wins.
    pub fn accepts_role(&self, label: &str) -> bool {
        self.style_include.is_match(label) && !self.style_exclude.is_match(label)
    }

    /// Grouping key for an occurrence's text.
    pub fn normalize<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.case_sensitive {
            Cow::Borrowed(text)
        } else {
            Cow::Owned(text.to_lowercase())
        }
    }
}

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(pattern)
}

/// Compile a pattern with full-match semantics.
fn compile_full(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(pattern)?;
    Regex::new(&format!(r"\A(?:{})\z", pattern))
}

/// Display-only options that never influence matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayOptions {
    pub use_colors: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            use_colors: DEFAULT_USE_COLORS,
        }
    }
}

/// Outcome of resolving settings for one session.
#[derive(Debug, Clone)]
pub struct ResolvedPolicy {
    pub policy: Policy,
    pub display: DisplayOptions,
    pub warnings: Vec<ConfigWarning>,
}

struct Resolver<'a> {
    config: &'a SyncEditConfig,
    language: Option<&'a str>,
    warnings: Vec<ConfigWarning>,
}

impl<'a> Resolver<'a> {
    fn value(&self, key: &str) -> Option<&'a SettingValue> {
        self.config.lookup(self.language, key)
    }

    fn bool(&mut self, key: &str, default: bool) -> bool {
        match self.value(key) {
            None => default,
            Some(value) => value.as_bool().unwrap_or_else(|| {
                warn!(key, value = %value.as_text(), "Invalid boolean setting, using default");
                self.warnings.push(ConfigWarning::InvalidBool {
                    key: key.to_string(),
                    value: value.as_text().into_owned(),
                });
                default
            }),
        }
    }

    fn pattern(
        &mut self,
        key: &str,
        default: &str,
        compiler: fn(&str) -> Result<Regex, regex::Error>,
    ) -> Regex {
        let raw = self.value(key).map(SettingValue::as_text);
        let pattern = raw.as_deref().unwrap_or(default);
        match compiler(pattern) {
            Ok(regex) => regex,
            Err(e) => {
                warn!(key, pattern, error = %e, "Invalid pattern setting, using fallback");
                self.warnings.push(ConfigWarning::InvalidPattern {
                    key: key.to_string(),
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                });
                compiler(default).expect("built-in default patterns compile")
            }
        }
    }
}

/// Merge `[global]` with the override section for `language` into a policy.
pub fn resolve_policy(config: &SyncEditConfig, language: Option<&str>) -> ResolvedPolicy {
    let mut resolver = Resolver {
        config,
        language,
        warnings: Vec::new(),
    };

    let naive = resolver.bool(keys::USE_SIMPLE_NAIVE_MODE, DEFAULT_USE_SIMPLE_NAIVE_MODE);
    let structural = !(naive || forces_pattern_mode(language));
    let case_sensitive = resolver.bool(keys::CASE_SENSITIVE, DEFAULT_CASE_SENSITIVE);
    let use_colors = resolver.bool(keys::USE_COLORS, DEFAULT_USE_COLORS);

    let identifier = resolver.pattern(keys::IDENTIFIER_REGEX, DEFAULT_IDENTIFIER_PATTERN, compile);
    let style_include = resolver.pattern(
        keys::IDENTIFIER_STYLE_INCLUDE,
        default_style_include(language),
        compile_full,
    );
    let style_exclude = resolver.pattern(
        keys::IDENTIFIER_STYLE_EXCLUDE,
        DEFAULT_STYLE_EXCLUDE_PATTERN,
        compile_full,
    );

    debug!(
        language = language.unwrap_or("<none>"),
        structural,
        case_sensitive,
        identifier = identifier.as_str(),
        warnings = resolver.warnings.len(),
        "Resolved sync-edit policy"
    );

    ResolvedPolicy {
        policy: Policy {
            identifier,
            style_include,
            style_exclude,
            case_sensitive,
            structural,
        },
        display: DisplayOptions { use_colors },
        warnings: resolver.warnings,
    }
}

impl SyncEditConfig {
    /// Resolve the effective policy for a document in `language`.
    pub fn resolve(&self, language: Option<&str>) -> ResolvedPolicy {
        resolve_policy(self, language)
    }
}
