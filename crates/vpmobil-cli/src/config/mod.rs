//! School settings stored in `vpmobil/config.toml`.
//!
//! Holds the school number, login name and connection overrides. The
//! password is never written here; it comes from `--password` or
//! `VPMOBIL_PASSWORD`. Values are checked with [`SchoolConfig::validate`]
//! both when `config init` writes them and before a fetch uses them.

#[allow(clippy::module_inception)]
mod config;
mod paths;

#[allow(clippy::module_name_repetitions)]
pub use config::{AppConfig, SchoolConfig};
pub use paths::resolve_config_path;
