use std::sync::Arc;

use kanso::config::{find_config, read_config};
use serde::Deserialize;
use tokio::sync::Mutex;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    DidChangeConfigurationParams, DidChangeTextDocumentParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, DocumentFormattingOptions, DocumentFormattingParams,
    DocumentSymbolParams, DocumentSymbolResponse, InitializeParams, InitializeResult,
    InitializedParams, MessageType, OneOf, ServerCapabilities, ServerInfo,
    TextDocumentSyncCapability, TextDocumentSyncKind, TextEdit,
};
use tower_lsp::{LanguageServer, LspService, Server};

use crate::backend::Backend;
use crate::state::BackendState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct KansoParseSettings {
    pub(super) tab_width: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct KansoFormatSettings {
    pub(super) indent_size: Option<usize>,
}

/// Client settings, e.g. `{ "format": { "indentSize": 4 } }`.
#[derive(Debug, Default, Deserialize)]
pub(super) struct KansoSettings {
    #[serde(default)]
    pub(super) parse: KansoParseSettings,
    #[serde(default)]
    pub(super) format: KansoFormatSettings,
}

impl KansoSettings {
    /// Applies the settings; returns whether an indent size was given. Zero values are
    /// ignored.
    pub(super) fn apply(&self, state: &mut BackendState) -> bool {
        if let Some(tab_width) = self.parse.tab_width.filter(|width| *width > 0) {
            state.config.parse.tab_width = tab_width;
        }
        match self.format.indent_size.filter(|size| *size > 0) {
            Some(indent_size) => {
                state.config.format.indent_size = indent_size;
                true
            }
            None => false,
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let root = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .and_then(|folder| folder.uri.to_file_path().ok())
            .or_else(|| params.root_uri.and_then(|uri| uri.to_file_path().ok()));

        if let Some(path) = root.as_deref().and_then(find_config) {
            match read_config(&path) {
                Ok(config) => {
                    let mut state = self.state.lock().await;
                    state.config = config;
                    state.indent_from_config = true;
                }
                Err(err) => {
                    self.client
                        .log_message(MessageType::WARNING, err.to_string())
                        .await;
                }
            }
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                document_symbol_provider: Some(OneOf::Left(true)),
                document_formatting_provider: Some(OneOf::Right(DocumentFormattingOptions {
                    work_done_progress_options: Default::default(),
                })),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: "kanso-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "kanso-lsp initialized")
            .await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let settings: KansoSettings = match serde_json::from_value(params.settings) {
            Ok(settings) => settings,
            Err(err) => {
                self.client
                    .log_message(
                        MessageType::WARNING,
                        format!("Failed to parse configuration: {err}"),
                    )
                    .await;
                return;
            }
        };

        let uris: Vec<_> = {
            let mut state = self.state.lock().await;
            if settings.apply(&mut state) {
                state.indent_from_config = true;
            }
            state.documents.keys().cloned().collect()
        };
        // Tab width changes columns, so open documents are re-checked.
        for uri in uris {
            self.publish_document_diagnostics(uri).await;
        }
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        self.update_document(document.uri.clone(), document.text, Some(document.version))
            .await;
        self.publish_document_diagnostics(document.uri).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;
        if let Some(change) = params.content_changes.into_iter().last() {
            self.update_document(uri.clone(), change.text, Some(version))
                .await;
            self.publish_document_diagnostics(uri).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.remove_document(&uri).await;
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let uri = params.text_document.uri;
        let symbols = self
            .with_document_text(&uri, |content, config| {
                Self::build_document_symbols(content, &uri, config)
            })
            .await
            .unwrap_or_default();
        Ok(Some(DocumentSymbolResponse::Nested(symbols)))
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        let uri = params.text_document.uri;
        let Some((source, mut config)) = self
            .with_document_text(&uri, |content, config| {
                (content.to_string(), config.clone())
            })
            .await
        else {
            return Ok(None);
        };
        let from_config = self.state.lock().await.indent_from_config;
        if !from_config && params.options.tab_size > 0 {
            config.format.indent_size = params.options.tab_size as usize;
        }
        Ok(Some(Backend::build_formatting_edits(&source, &config)))
    }
}

pub async fn run() {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    let (service, socket) = LspService::new(|client| Backend {
        client,
        state: Arc::new(Mutex::new(BackendState::default())),
    });
    Server::new(stdin, stdout, socket).serve(service).await;
}
