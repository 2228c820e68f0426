use kanso::diagnostics::DiagnosticSeverity as KansoSeverity;
use kanso::{FileDiagnostic, KansoConfig};
use tower_lsp::lsp_types::{
    Diagnostic, DiagnosticRelatedInformation, DiagnosticSeverity, Location, NumberOrString, Url,
};

use crate::backend::Backend;

impl Backend {
    pub(super) fn build_diagnostics(text: &str, uri: &Url, config: &KansoConfig) -> Vec<Diagnostic> {
        let path = Self::path_from_uri(uri);
        let parsed = kanso::parse_source(&path, text, config.parse.tab_width);
        parsed
            .diagnostics
            .into_iter()
            .map(|file_diag| Self::file_diag_to_lsp(text, uri, file_diag))
            .collect()
    }

    fn file_diag_to_lsp(text: &str, uri: &Url, file_diag: FileDiagnostic) -> Diagnostic {
        let related_information = (!file_diag.diagnostic.labels.is_empty()).then(|| {
            file_diag
                .diagnostic
                .labels
                .into_iter()
                .map(|label| DiagnosticRelatedInformation {
                    location: Location {
                        uri: uri.clone(),
                        range: Self::span_to_range(text, label.span),
                    },
                    message: label.message,
                })
                .collect()
        });

        Diagnostic {
            range: Self::span_to_range(text, file_diag.diagnostic.span),
            severity: Some(match file_diag.diagnostic.severity {
                KansoSeverity::Error => DiagnosticSeverity::ERROR,
                KansoSeverity::Warning => DiagnosticSeverity::WARNING,
            }),
            code: Some(NumberOrString::String(file_diag.diagnostic.code)),
            code_description: None,
            source: Some("kanso".to_string()),
            message: file_diag.diagnostic.message,
            related_information,
            tags: None,
            data: None,
        }
    }
}
