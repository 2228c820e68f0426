use crate::diagnostics::{Diagnostic, DiagnosticKind, FileDiagnostic, Span};
use crate::token::{Token, TokenKind};

use crate::surface::ast::Name;
use super::Parser;

impl Parser<'_> {
    pub(super) fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    pub(super) fn peek_nth(&self, n: usize) -> &Token {
        let index = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    pub(super) fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    pub(super) fn at_kind(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    pub(super) fn consume_kind(&mut self, kind: TokenKind) -> bool {
        if self.at_kind(kind) {
            self.bump();
            return true;
        }
        false
    }

    pub(super) fn check_symbol(&self, symbol: &str) -> bool {
        self.peek().is_symbol(symbol)
    }

    pub(super) fn consume_symbol(&mut self, symbol: &str) -> bool {
        if self.check_symbol(symbol) {
            self.bump();
            return true;
        }
        false
    }

    pub(super) fn check_keyword(&self, keyword: &str) -> bool {
        self.peek().is_keyword(keyword)
    }

    pub(super) fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.check_keyword(keyword) {
            self.bump();
            return true;
        }
        false
    }

    /// Contextual words such as `using` or `to` are plain identifiers to the lexer.
    pub(super) fn consume_word(&mut self, word: &str) -> bool {
        if self.peek().is_ident(word) {
            self.bump();
            return true;
        }
        false
    }

    pub(super) fn expect_symbol(&mut self, symbol: &str, context: &str) -> Option<Span> {
        if self.consume_symbol(symbol) {
            return Some(self.previous_span());
        }
        self.report_expected(&format!("`{symbol}` {context}"));
        None
    }

    pub(super) fn expect_keyword(&mut self, keyword: &str, context: &str) -> Option<Span> {
        if self.consume_keyword(keyword) {
            return Some(self.previous_span());
        }
        self.report_expected(&format!("`{keyword}` {context}"));
        None
    }

    pub(super) fn consume_name(&mut self) -> Option<Name> {
        let token = self.peek();
        if token.kind != TokenKind::Ident {
            return None;
        }
        let token = self.bump();
        Some(Name {
            text: token.text,
            span: token.span,
        })
    }

    /// Identifier or `_`, as accepted in binder position.
    pub(super) fn consume_binder_name(&mut self) -> Option<Name> {
        if self.check_symbol("_") {
            let token = self.bump();
            return Some(Name {
                text: token.text,
                span: token.span,
            });
        }
        self.consume_name()
    }

    pub(super) fn expect_name(&mut self, what: &str) -> Option<Name> {
        if let Some(name) = self.consume_name() {
            return Some(name);
        }
        if self.peek().kind != TokenKind::Error {
            let token = self.peek().clone();
            self.emit_diag(
                "E1204",
                format!("expected {what}, found `{}`", token.text),
                token.span,
            );
        }
        None
    }

    /// Reports a missing token unless the current token is an error the lexer or layout
    /// pass already reported.
    pub(super) fn report_expected(&mut self, expected: &str) {
        let token = self.peek().clone();
        if token.kind == TokenKind::Error {
            return;
        }
        self.emit_diag(
            "E1201",
            format!("expected {expected}, found {}", describe(&token)),
            token.span,
        );
    }

    pub(super) fn previous_span(&self) -> Span {
        if self.pos == 0 {
            return self.peek().span;
        }
        self.tokens[self.pos - 1].span
    }

    pub(super) fn emit_diag(&mut self, code: &str, message: impl Into<String>, span: Span) {
        self.emit(Diagnostic::error(code, DiagnosticKind::Syntax, message, span));
    }

    pub(super) fn emit(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(FileDiagnostic {
            path: self.path.clone(),
            diagnostic,
        });
    }

    /// Whether the current token ends the current item.
    pub(super) fn at_item_end(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Newline | TokenKind::Dedent | TokenKind::Eof | TokenKind::Error
        )
    }

    pub(super) fn at_eof_after_layout(&self) -> bool {
        let mut n = 0;
        loop {
            match self.peek_nth(n).kind {
                TokenKind::Eof => return true,
                TokenKind::Newline | TokenKind::Dedent => n += 1,
                _ => return false,
            }
        }
    }

    /// Skips to the next `NEWLINE` or `DEDENT` of the current block, stepping over any
    /// nested blocks. The boundary token itself is left in place.
    pub(super) fn recover_to_boundary(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek().kind {
                TokenKind::Eof => break,
                TokenKind::Indent => depth += 1,
                TokenKind::Dedent if depth == 0 => break,
                TokenKind::Dedent => depth -= 1,
                TokenKind::Newline if depth == 0 => break,
                _ => {}
            }
            self.bump();
        }
    }
}

pub(super) fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::Newline => "end of line".to_string(),
        TokenKind::Indent => "an indented block".to_string(),
        TokenKind::Dedent => "end of block".to_string(),
        TokenKind::Eof => "end of input".to_string(),
        _ => format!("`{}`", token.text),
    }
}
