use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::formatter::FormatOptions;
use crate::lexer::DEFAULT_TAB_WIDTH;
use crate::KansoError;

pub const CONFIG_FILE_NAME: &str = "kanso.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KansoConfig {
    #[serde(default)]
    pub parse: ParseConfig,
    #[serde(default)]
    pub format: FormatConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParseConfig {
    #[serde(default = "default_tab_width")]
    pub tab_width: usize,
    #[serde(default = "default_keep_comments")]
    pub keep_comments: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            tab_width: default_tab_width(),
            keep_comments: default_keep_comments(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormatConfig {
    #[serde(default = "default_indent_size")]
    pub indent_size: usize,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            indent_size: default_indent_size(),
        }
    }
}

impl From<&FormatConfig> for FormatOptions {
    fn from(config: &FormatConfig) -> Self {
        FormatOptions {
            indent_size: config.indent_size,
        }
    }
}

fn default_tab_width() -> usize {
    DEFAULT_TAB_WIDTH
}

fn default_keep_comments() -> bool {
    true
}

fn default_indent_size() -> usize {
    2
}

pub fn read_config(path: &Path) -> Result<KansoConfig, KansoError> {
    let text = std::fs::read_to_string(path)?;
    let config: KansoConfig = toml::from_str(&text)
        .map_err(|err| KansoError::Config(format!("failed to parse {}: {err}", path.display())))?;
    if config.parse.tab_width == 0 {
        return Err(KansoError::Config(format!(
            "{}: parse.tab_width must be at least 1",
            path.display()
        )));
    }
    if config.format.indent_size == 0 {
        return Err(KansoError::Config(format!(
            "{}: format.indent_size must be at least 1",
            path.display()
        )));
    }
    Ok(config)
}

/// Looks for `kanso.toml` in `start` (or its directory, for a file) and every ancestor.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut dir = if start.is_dir() {
        start.to_path_buf()
    } else {
        start.parent()?.to_path_buf()
    };
    if dir.as_os_str().is_empty() {
        dir = std::env::current_dir().ok()?;
    }
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// An explicit path must exist; otherwise the nearest `kanso.toml` above `target` is used,
/// falling back to defaults.
pub fn load_config(explicit: Option<&Path>, target: &Path) -> Result<KansoConfig, KansoError> {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "reading config");
        return read_config(path);
    }
    match find_config(target) {
        Some(path) => {
            debug!(path = %path.display(), "found config");
            read_config(&path)
        }
        None => Ok(KansoConfig::default()),
    }
}
