pub mod config;
pub mod cst;
pub mod diagnostics;
pub mod exports;
pub mod formatter;
pub mod layout;
pub mod lexer;
pub mod operators;
pub mod surface;
pub mod syntax;
pub mod token;

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info};
use walkdir::WalkDir;

pub use config::{load_config, KansoConfig};
pub use cst::{CstBundle, CstFile, CstToken};
pub use diagnostics::{render_diagnostics, Diagnostic, FileDiagnostic, Span};
pub use exports::exported_names;
pub use formatter::FormatOptions;
pub use operators::{Fixity, OperatorEntry, OperatorTable};
pub use surface::{parse_expression, parse_source, parse_source_with_cancel, ParsedSource};

/// File extensions picked up when a directory is given as a target.
pub const SOURCE_EXTENSIONS: &[&str] = &["kanso", "agda"];

#[derive(Debug, thiserror::Error)]
pub enum KansoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("diagnostics reported")]
    Diagnostics,
}

pub fn parse_target(target: &str, config: &KansoConfig) -> Result<CstBundle, KansoError> {
    let paths = expand_target(target)?;
    info!(target, files = paths.len(), "parsing target");
    let sources = paths
        .into_iter()
        .map(|path| {
            let content = fs::read_to_string(&path)?;
            Ok((path, content))
        })
        .collect::<Result<Vec<_>, KansoError>>()?;
    Ok(CstBundle {
        files: parse_sources(&sources, config),
    })
}

pub fn parse_file(path: &Path, config: &KansoConfig) -> Result<CstFile, KansoError> {
    let content = fs::read_to_string(path)?;
    Ok(parse_text(path, &content, config))
}

/// Parses independent sources in parallel. Each file gets its own token stream and
/// operator table, and the output keeps the input order.
pub fn parse_sources(sources: &[(PathBuf, String)], config: &KansoConfig) -> Vec<CstFile> {
    sources
        .par_iter()
        .map(|(path, content)| parse_text(path, content, config))
        .collect()
}

pub fn parse_text(path: &Path, content: &str, config: &KansoConfig) -> CstFile {
    let parsed = parse_source(path, content, config.parse.tab_width);
    debug!(
        path = %path.display(),
        decls = parsed.decls.len(),
        diagnostics = parsed.diagnostics.len(),
        "parsed file"
    );
    let exports = exported_names(&parsed.decls);
    let comments = if config.parse.keep_comments {
        parsed.comments.iter().map(CstToken::from).collect()
    } else {
        Vec::new()
    };
    CstFile {
        path: path.display().to_string(),
        byte_count: content.len(),
        line_count: content.lines().count(),
        decls: parsed.decls,
        diagnostics: parsed
            .diagnostics
            .into_iter()
            .map(|diag| diag.diagnostic)
            .collect(),
        exports,
        comments,
    }
}

/// The layout-processed token stream of `content`, comments excluded.
pub fn lex_tokens(content: &str, tab_width: usize) -> (Vec<CstToken>, Vec<Diagnostic>) {
    let tokenized = layout::tokenize(content, tab_width);
    debug!(tokens = tokenized.tokens.len(), "layout finished");
    let tokens = tokenized.tokens.iter().map(CstToken::from).collect();
    (tokens, tokenized.diagnostics)
}

/// Pretty-prints `content`. Sources with error diagnostics are not formatted; the errors
/// come back instead.
pub fn format_text(content: &str, config: &KansoConfig) -> Result<String, Vec<Diagnostic>> {
    let parsed = parse_source(Path::new("<input>"), content, config.parse.tab_width);
    let errors: Vec<Diagnostic> = parsed
        .diagnostics
        .into_iter()
        .map(|diag| diag.diagnostic)
        .filter(Diagnostic::is_error)
        .collect();
    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(formatter::format_decls(
        &parsed.decls,
        &parsed.comments,
        FormatOptions::from(&config.format),
    ))
}

/// `path` names a file or a directory; `dir/...` walks the directory recursively.
pub fn expand_target(target: &str) -> Result<Vec<PathBuf>, KansoError> {
    let (base, recursive) = match target.strip_suffix("/...") {
        Some(base) => (if base.is_empty() { "." } else { base }, true),
        None => (target, false),
    };

    let Some(path) = resolve_target_path(base) else {
        return Err(KansoError::InvalidPath(target.to_string()));
    };

    if path.is_file() {
        return Ok(vec![path]);
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut paths = Vec::new();
    for entry in WalkDir::new(&path).max_depth(max_depth) {
        let entry = entry.map_err(|err| KansoError::Io(std::io::Error::other(err)))?;
        if entry.file_type().is_file() && is_source_file(entry.path()) {
            paths.push(entry.into_path());
        }
    }

    paths.sort();
    if paths.is_empty() {
        return Err(KansoError::InvalidPath(target.to_string()));
    }
    Ok(paths)
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// Relative targets that do not exist from the working directory are retried against
/// every ancestor holding a `kanso.toml`.
fn resolve_target_path(target: &str) -> Option<PathBuf> {
    let target_path = Path::new(target);
    if target_path.exists() {
        return Some(target_path.to_path_buf());
    }
    if target_path.is_absolute() {
        return None;
    }

    let mut dir = std::env::current_dir().ok()?;
    loop {
        if dir.join(config::CONFIG_FILE_NAME).exists() {
            let candidate = dir.join(target);
            if candidate.exists() {
                return Some(candidate);
            }
        }
        if !dir.pop() {
            return None;
        }
    }
}
