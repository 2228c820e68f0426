use serde::Serialize;

use crate::diagnostics::{Diagnostic, Span};
use crate::surface::Decl;
use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, Serialize)]
pub struct CstToken {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl From<&Token> for CstToken {
    fn from(token: &Token) -> Self {
        Self {
            kind: token.kind,
            text: token.text.clone(),
            span: token.span,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CstFile {
    pub path: String,
    pub byte_count: usize,
    pub line_count: usize,
    pub decls: Vec<Decl>,
    pub diagnostics: Vec<Diagnostic>,
    pub exports: Vec<String>,
    /// Empty unless `keep_comments` is set.
    pub comments: Vec<CstToken>,
}

impl CstFile {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

#[derive(Debug, Serialize)]
pub struct CstBundle {
    pub files: Vec<CstFile>,
}

impl CstBundle {
    pub fn has_errors(&self) -> bool {
        self.files.iter().any(CstFile::has_errors)
    }
}
