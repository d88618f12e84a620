//! Configuration management for syncedit
//!
//! - [`settings`]: the sectioned key/value settings and their loader
//! - [`policy`]: resolution of settings into an immutable per-session [`Policy`]
//! - [`logging`]: tracing subscriber setup shared by hosts

pub mod logging;
pub mod policy;
pub mod settings;

pub use logging::{LogFormat, LoggingConfig};
pub use policy::{resolve_policy, ConfigWarning, DisplayOptions, Policy, ResolvedPolicy};
pub use settings::{keys, parse_bool, SettingValue, SettingsSection, SyncEditConfig};
