use std::path::PathBuf;
use std::sync::Arc;

use kanso::{KansoConfig, Span};
use tokio::sync::Mutex;
use tower_lsp::lsp_types::{Position, Range, TextEdit, Url};
use tower_lsp::Client;

use crate::state::{BackendState, DocumentState};

pub(super) struct Backend {
    pub(super) client: Client,
    pub(super) state: Arc<Mutex<BackendState>>,
}

impl Backend {
    /// One edit replacing the whole document, or nothing when the source does not parse
    /// cleanly or is already formatted.
    pub(super) fn build_formatting_edits(text: &str, config: &KansoConfig) -> Vec<TextEdit> {
        match kanso::format_text(text, config) {
            Ok(formatted) if formatted != text => {
                vec![TextEdit::new(Self::full_document_range(text), formatted)]
            }
            _ => Vec::new(),
        }
    }

    pub(super) fn full_document_range(text: &str) -> Range {
        Range::new(Position::new(0, 0), Self::position_at(text, text.len()))
    }

    /// Spans are 1-based and end just past the last character; LSP ranges are 0-based
    /// with an exclusive end, counted in UTF-16 code units.
    pub(super) fn span_to_range(text: &str, span: Span) -> Range {
        Range::new(
            Self::position_at(text, span.start.offset),
            Self::position_at(text, span.end.offset),
        )
    }

    /// LSP position of a byte offset into `text`.
    pub(super) fn position_at(text: &str, offset: usize) -> Position {
        let mut offset = offset.min(text.len());
        while !text.is_char_boundary(offset) {
            offset -= 1;
        }
        let prefix = &text[..offset];
        let line = prefix.matches('\n').count() as u32;
        let line_start = prefix.rfind('\n').map_or(0, |index| index + 1);
        let character = prefix[line_start..]
            .chars()
            .map(|c| c.len_utf16() as u32)
            .sum();
        Position::new(line, character)
    }

    pub(super) fn path_from_uri(uri: &Url) -> PathBuf {
        uri.to_file_path()
            .unwrap_or_else(|_| PathBuf::from(uri.to_string()))
    }

    pub(super) async fn update_document(&self, uri: Url, text: String, version: Option<i32>) {
        let mut state = self.state.lock().await;
        state
            .documents
            .insert(uri, DocumentState { text, version });
    }

    pub(super) async fn remove_document(&self, uri: &Url) {
        let mut state = self.state.lock().await;
        state.documents.remove(uri);
    }

    pub(super) async fn with_document_text<F, R>(&self, uri: &Url, f: F) -> Option<R>
    where
        F: FnOnce(&str, &KansoConfig) -> R,
    {
        let state = self.state.lock().await;
        state
            .documents
            .get(uri)
            .map(|document| f(&document.text, &state.config))
    }

    /// Parses the document and sends its diagnostics, tagged with the document version.
    pub(super) async fn publish_document_diagnostics(&self, uri: Url) {
        let published = {
            let state = self.state.lock().await;
            state.documents.get(&uri).map(|document| {
                (
                    Self::build_diagnostics(&document.text, &uri, &state.config),
                    document.version,
                )
            })
        };
        if let Some((diagnostics, version)) = published {
            self.client
                .publish_diagnostics(uri, diagnostics, version)
                .await;
        }
    }
}
