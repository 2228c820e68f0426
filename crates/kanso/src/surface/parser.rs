use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::diagnostics::{file_diagnostics, Diagnostic, FileDiagnostic};
use crate::layout::tokenize;
use crate::operators::OperatorTable;
use crate::token::{Token, TokenKind};

use super::ast::*;

mod atoms;
mod bindings;
mod declarations;
mod expressions;
mod helpers;
mod modules;
mod records;

/// Result of parsing one source file.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub decls: Vec<Decl>,
    pub diagnostics: Vec<FileDiagnostic>,
    pub comments: Vec<Token>,
    /// Parsing stopped early because the cancellation flag was raised.
    pub cancelled: bool,
}

pub fn parse_source(path: &Path, content: &str, tab_width: usize) -> ParsedSource {
    parse_source_with_cancel(path, content, tab_width, None)
}

/// Like [`parse_source`], but checks `cancel` between top-level declarations and returns
/// whatever was parsed so far once it is set.
pub fn parse_source_with_cancel(
    path: &Path,
    content: &str,
    tab_width: usize,
    cancel: Option<&AtomicBool>,
) -> ParsedSource {
    let tokenized = tokenize(content, tab_width);
    let path_text = path.display().to_string();
    let mut diagnostics = file_diagnostics(&path_text, tokenized.diagnostics);
    let mut parser = Parser::new(tokenized.tokens, path, cancel);
    let decls = parser.parse_file();
    diagnostics.append(&mut parser.diagnostics);
    sort_diagnostics(&mut diagnostics);
    ParsedSource {
        decls,
        diagnostics,
        comments: tokenized.comments,
        cancelled: parser.cancelled,
    }
}

/// Parses an already laid-out token stream.
pub fn parse_tokens(path: &Path, tokens: Vec<Token>) -> (Vec<Decl>, Vec<FileDiagnostic>) {
    let mut parser = Parser::new(tokens, path, None);
    let decls = parser.parse_file();
    let mut diagnostics = parser.diagnostics;
    sort_diagnostics(&mut diagnostics);
    (decls, diagnostics)
}

/// Parses a single expression against a caller-supplied operator table.
pub fn parse_expression(
    content: &str,
    operators: &OperatorTable,
) -> (Option<Expr>, Vec<Diagnostic>) {
    let tokenized = tokenize(content, crate::lexer::DEFAULT_TAB_WIDTH);
    let mut diagnostics = tokenized.diagnostics;
    let mut parser = Parser::new(tokenized.tokens, Path::new("<expr>"), None);
    parser.operators = operators.clone();
    let expr = parser.parse_expr();
    if expr.is_some() && !parser.at_eof_after_layout() {
        let span = parser.peek().span;
        parser.emit_diag(
            "E1205",
            format!("unexpected `{}` after expression", parser.peek().text),
            span,
        );
    }
    diagnostics.extend(parser.diagnostics.into_iter().map(|d| d.diagnostic));
    (expr, diagnostics)
}

fn sort_diagnostics(diagnostics: &mut [FileDiagnostic]) {
    diagnostics.sort_by_key(|d| (d.diagnostic.span.start.line, d.diagnostic.span.start.column));
}

pub(super) struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Vec<FileDiagnostic>,
    path: String,
    operators: OperatorTable,
    cancel: Option<&'a AtomicBool>,
    cancelled: bool,
    module_header_seen: bool,
    block_depth: usize,
    expr_depth: usize,
}

impl<'a> Parser<'a> {
    fn new(mut tokens: Vec<Token>, path: &Path, cancel: Option<&'a AtomicBool>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let at = tokens
                .last()
                .map(|t| t.span.end)
                .unwrap_or(crate::diagnostics::Position::new(1, 1, 0));
            tokens.push(Token::synthetic(TokenKind::Eof, at));
        }
        Self {
            tokens,
            pos: 0,
            diagnostics: Vec::new(),
            path: path.display().to_string(),
            operators: OperatorTable::new(),
            cancel,
            cancelled: false,
            module_header_seen: false,
            block_depth: 0,
            expr_depth: 0,
        }
    }

    fn parse_file(&mut self) -> Vec<Decl> {
        let decls = self.parse_decl_sequence(false);
        group_clauses(decls)
    }

    fn check_cancelled(&mut self) -> bool {
        if self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            self.cancelled = true;
        }
        self.cancelled
    }

    /// Parses `INDENT decl (NEWLINE decl)* DEDENT`. Without a leading `INDENT` the block
    /// is empty.
    fn parse_block(&mut self, scoped: bool) -> Vec<Decl> {
        if !self.consume_kind(TokenKind::Indent) {
            return Vec::new();
        }
        if scoped {
            self.operators.push_scope();
        }
        self.block_depth += 1;
        let decls = self.parse_decl_sequence(true);
        self.block_depth -= 1;
        if scoped {
            self.operators.pop_scope();
        }
        group_clauses(decls)
    }

    /// Declarations separated by `NEWLINE`, up to the block's `DEDENT` (consumed) or the
    /// end of input.
    fn parse_decl_sequence(&mut self, in_block: bool) -> Vec<Decl> {
        let mut decls = Vec::new();
        loop {
            while self.consume_kind(TokenKind::Newline) {}
            match self.peek().kind {
                TokenKind::Eof => break,
                TokenKind::Dedent => {
                    self.bump();
                    if in_block {
                        break;
                    }
                    continue;
                }
                _ => {}
            }
            if !in_block && self.block_depth == 0 && self.check_cancelled() {
                break;
            }
            let decl = self.parse_decl_or_recover();
            decls.push(decl);
            match self.peek().kind {
                TokenKind::Newline | TokenKind::Dedent | TokenKind::Eof => {}
                TokenKind::Error => self.recover_to_boundary(),
                _ => {
                    let token = self.peek().clone();
                    self.emit_diag(
                        "E1205",
                        format!("unexpected `{}` after declaration", token.text),
                        token.span,
                    );
                    self.recover_to_boundary();
                }
            }
        }
        decls
    }

    fn parse_decl_or_recover(&mut self) -> Decl {
        let start = self.peek().span;
        let start_pos = self.pos;
        match self.parse_decl() {
            Some(decl) => decl,
            None => {
                self.recover_to_boundary();
                let span = if self.pos > start_pos {
                    start.merge(&self.previous_span())
                } else {
                    start
                };
                Decl::Error(ErrorDecl { span })
            }
        }
    }

    /// Body of a `module M where` whose declarations continue at the header's column: the
    /// rest of the enclosing sequence.
    fn parse_flush_body(&mut self) -> Vec<Decl> {
        self.operators.push_scope();
        let decls = self.parse_decl_sequence(false);
        self.operators.pop_scope();
        group_clauses(decls)
    }
}

/// Merges each single-name type signature with the clauses that follow it and define the
/// same name, and groups consecutive clauses of one function.
pub(crate) fn group_clauses(decls: Vec<Decl>) -> Vec<Decl> {
    let mut out: Vec<Decl> = Vec::with_capacity(decls.len());
    for decl in decls {
        let Decl::Clause(clause) = decl else {
            out.push(decl);
            continue;
        };
        let head = clause.lhs.head_name();
        if let Some(Decl::Function(function)) = out.last_mut() {
            if head.as_deref() == Some(function.name.as_str()) || head.as_deref() == Some("...")
            {
                function.span = function.span.merge(&clause.span);
                function.clauses.push(clause);
                continue;
            }
        }
        let signature = match out.last() {
            Some(Decl::TypeSignature(sig))
                if sig.names.len() == 1 && Some(&sig.names[0].text) == head.as_ref() =>
            {
                match out.pop() {
                    Some(Decl::TypeSignature(sig)) => Some(sig),
                    _ => None,
                }
            }
            _ => None,
        };
        let span = signature
            .as_ref()
            .map_or(clause.span, |sig| sig.span.merge(&clause.span));
        out.push(Decl::Function(Function {
            name: head.unwrap_or_default(),
            signature,
            clauses: vec![clause],
            span,
        }));
    }
    out
}
