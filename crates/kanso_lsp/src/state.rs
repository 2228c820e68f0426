use std::collections::HashMap;

use kanso::KansoConfig;
use tower_lsp::lsp_types::Url;

#[derive(Default)]
pub(super) struct DocumentState {
    pub(super) text: String,
    pub(super) version: Option<i32>,
}

#[derive(Default)]
pub(super) struct BackendState {
    pub(super) documents: HashMap<Url, DocumentState>,
    pub(super) config: KansoConfig,
    /// Set once `kanso.toml` was loaded or the client settings chose an indent size; the editor's
    /// tab size is ignored from then on.
    pub(super) indent_from_config: bool,
}
