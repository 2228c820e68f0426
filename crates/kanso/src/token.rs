use serde::Serialize;

use crate::diagnostics::{Position, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Ident,
    Keyword,
    Symbol,
    Integer,
    Float,
    String,
    Pragma,
    Comment,
    Newline,
    Indent,
    Dedent,
    /// Produced where the lexer or layout pass already reported a diagnostic.
    Error,
    Eof,
}

/// A lexical token. Symbols carry their canonical spelling (`->` for `→`, `\` for `λ`,
/// `{{` for `⦃`) so consumers never deal with aliases; the span still points at the
/// original text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }

    /// Zero-width token inserted by the layout pass.
    pub fn synthetic(kind: TokenKind, at: Position) -> Self {
        let text = match kind {
            TokenKind::Newline => "<newline>",
            TokenKind::Indent => "<indent>",
            TokenKind::Dedent => "<dedent>",
            TokenKind::Eof => "<eof>",
            _ => "<error>",
        };
        Self::new(kind, text, Span::point(at))
    }

    pub fn is_symbol(&self, symbol: &str) -> bool {
        self.kind == TokenKind::Symbol && self.text == symbol
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == keyword
    }

    pub fn is_ident(&self, text: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == text
    }

    pub fn is_layout(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent
        )
    }

    pub fn column(&self) -> usize {
        self.span.start.column
    }

    pub fn line(&self) -> usize {
        self.span.start.line
    }
}

pub fn is_open_bracket(token: &Token) -> bool {
    token.kind == TokenKind::Symbol && matches!(token.text.as_str(), "(" | "{" | "{{" | "(|")
}

pub fn is_close_bracket(token: &Token) -> bool {
    token.kind == TokenKind::Symbol && matches!(token.text.as_str(), ")" | "}" | "}}" | "|)")
}

pub fn closing_for(open: &str) -> &'static str {
    match open {
        "(" => ")",
        "{" => "}",
        "{{" => "}}",
        "(|" => "|)",
        _ => "",
    }
}
