//! Config file location.

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Directory name under the user's config root.
const APP_DIR: &str = "vpmobil";

/// File name inside the config directory.
const CONFIG_FILE: &str = "config.toml";

/// Resolves the config file path.
///
/// - `--dir <DIR>` gives `<DIR>/config.toml`.
/// - Otherwise `$XDG_CONFIG_HOME/vpmobil/config.toml`, falling back to
///   `~/.config/vpmobil/config.toml`.
///
/// # Errors
///
/// Returns an error if no `dir` is given and neither `XDG_CONFIG_HOME` nor
/// `HOME` is set.
pub fn resolve_config_path(dir: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(d) = dir {
        return Ok(d.join(CONFIG_FILE));
    }
    default_config_path(
        std::env::var_os("XDG_CONFIG_HOME"),
        std::env::var_os("HOME"),
    )
}

fn default_config_path(
    xdg_config_home: Option<OsString>,
    home: Option<OsString>,
) -> Result<PathBuf> {
    let root = xdg_config_home
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| home.map(|h| PathBuf::from(h).join(".config")))
        .context("neither XDG_CONFIG_HOME nor HOME is set")?;
    Ok(root.join(APP_DIR).join(CONFIG_FILE))
}
