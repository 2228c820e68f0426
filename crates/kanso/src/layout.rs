//! Layout resolution: turns the raw token stream into one with explicit `NEWLINE`,
//! `INDENT` and `DEDENT` tokens.
//!
//! A stack of frames tracks open blocks. Layout frames are opened by block keywords
//! (`where`, `let`, `do`, `postulate`, ...) at the column of the first token after the
//! keyword; explicit frames are opened by brackets and suspend column checks until their
//! closer, which also closes any layout blocks still open inside them.

use std::collections::VecDeque;
use std::iter::Peekable;
use std::vec::IntoIter;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Span};
use crate::lexer;
use crate::syntax;
use crate::token::{closing_for, is_close_bracket, is_open_bracket, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Base,
    Where,
    Let,
    Do,
    /// `postulate`, `mutual`, `field` and the other declaration-block keywords.
    Keyword,
}

#[derive(Debug, Clone)]
enum Frame {
    Layout { kind: BlockKind, column: usize },
    Explicit { open: String, span: Span },
}

#[derive(Debug)]
struct PendingBlock {
    kind: BlockKind,
    keyword: Token,
    flush_allowed: bool,
}

pub struct Layout {
    tokens: Peekable<IntoIter<Token>>,
    queue: VecDeque<Token>,
    stack: Vec<Frame>,
    pending: Option<PendingBlock>,
    /// Stack depths at which a `let` block was closed by indentation and may still be
    /// followed by its `in`.
    awaiting_in: Vec<usize>,
    quote_goals: usize,
    last_line: usize,
    base_line_head: Option<String>,
    module_header_seen: bool,
    diagnostics: Vec<Diagnostic>,
    finished: bool,
}

/// Output of running the lexer and the layout pass over a whole source file.
#[derive(Debug, Clone)]
pub struct TokenizedSource {
    pub tokens: Vec<Token>,
    pub comments: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn tokenize(content: &str, tab_width: usize) -> TokenizedSource {
    let (raw, mut diagnostics) = lexer::lex(content, tab_width);
    let (tokens, comments) = lexer::split_comments(raw);
    let mut layout = Layout::new(tokens);
    let tokens: Vec<Token> = layout.by_ref().collect();
    diagnostics.extend(layout.take_diagnostics());
    TokenizedSource {
        tokens,
        comments,
        diagnostics,
    }
}

impl Layout {
    pub fn new(tokens: Vec<Token>) -> Self {
        let tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|token| token.kind != TokenKind::Comment)
            .collect();
        Self {
            tokens: tokens.into_iter().peekable(),
            queue: VecDeque::new(),
            stack: Vec::new(),
            pending: None,
            awaiting_in: Vec::new(),
            quote_goals: 0,
            last_line: 0,
            base_line_head: None,
            module_header_seen: false,
            diagnostics: Vec::new(),
            finished: false,
        }
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn process(&mut self, token: Token) {
        let first = self.stack.is_empty();
        if first {
            self.stack.push(Frame::Layout {
                kind: BlockKind::Base,
                column: token.column(),
            });
            self.base_line_head = Some(token.text.clone());
        }
        let new_line = !first && token.line() > self.last_line;

        let mut opened = false;
        if let Some(pending) = self.pending.take() {
            let enclosing = self.enclosing_column();
            if !new_line || token.column() > enclosing {
                self.stack.push(Frame::Layout {
                    kind: pending.kind,
                    column: token.column(),
                });
                self.queue
                    .push_back(Token::synthetic(TokenKind::Indent, token.span.start));
                opened = true;
            } else if !(pending.flush_allowed && token.column() == enclosing) {
                self.diagnostics.push(
                    Diagnostic::error(
                        "E1101",
                        DiagnosticKind::Layout,
                        format!(
                            "expected an indented block after `{}`",
                            pending.keyword.text
                        ),
                        Span::point(token.span.start),
                    )
                    .with_label("block opened here", pending.keyword.span),
                );
            }
        }

        if new_line && !opened {
            self.line_start(&token);
        }

        if is_close_bracket(&token) {
            self.close_bracket(&token);
        } else if token.is_keyword("in") {
            self.close_let(&token);
        }

        if is_open_bracket(&token) {
            self.stack.push(Frame::Explicit {
                open: token.text.clone(),
                span: token.span,
            });
        } else if token.is_keyword("quoteGoal") {
            self.quote_goals += 1;
        } else if let Some(kind) = self.block_kind(&token) {
            let flush_allowed = kind == BlockKind::Where
                && self.stack.len() == 1
                && !self.module_header_seen
                && self.base_line_head.as_deref() == Some("module");
            if kind == BlockKind::Where
                && self.stack.len() == 1
                && self.base_line_head.as_deref() == Some("module")
            {
                self.module_header_seen = true;
            }
            self.pending = Some(PendingBlock {
                kind,
                keyword: token.clone(),
                flush_allowed,
            });
        }

        self.last_line = self.last_line.max(token.span.end.line);
        self.queue.push_back(token);
    }

    fn block_kind(&mut self, token: &Token) -> Option<BlockKind> {
        if token.kind != TokenKind::Keyword || !syntax::is_layout_keyword(&token.text) {
            return None;
        }
        let kind = match token.text.as_str() {
            "where" => BlockKind::Where,
            "let" => BlockKind::Let,
            "do" => BlockKind::Do,
            // `field : T` is an ordinary signature, not a field block.
            "field" if self.tokens.peek().is_some_and(|next| next.is_symbol(":")) => {
                return None
            }
            _ => BlockKind::Keyword,
        };
        Some(kind)
    }

    /// Column of the innermost layout frame, looking through explicit brackets.
    fn enclosing_column(&self) -> usize {
        self.stack
            .iter()
            .rev()
            .find_map(|frame| match frame {
                Frame::Layout { column, .. } => Some(*column),
                Frame::Explicit { .. } => None,
            })
            .unwrap_or(1)
    }

    fn line_start(&mut self, token: &Token) {
        let column = token.column();
        let mut popped = false;
        while let Some(Frame::Layout { kind, column: frame }) = self.stack.last().cloned() {
            if column == frame {
                self.newline(token);
                return;
            }
            if column > frame {
                if popped && !continues_after_dedent(token) {
                    self.misaligned(token);
                }
                return;
            }
            if kind == BlockKind::Base {
                self.misaligned(token);
                return;
            }
            self.pop_layout(token);
            popped = true;
        }
    }

    fn newline(&mut self, token: &Token) {
        let depth = self.stack.len();
        self.awaiting_in.retain(|marker| *marker < depth);
        if depth == 1 {
            self.base_line_head = Some(token.text.clone());
        }
        self.queue
            .push_back(Token::synthetic(TokenKind::Newline, token.span.start));
    }

    fn pop_layout(&mut self, at: &Token) {
        if let Some(Frame::Layout { kind, .. }) = self.stack.pop() {
            let depth = self.stack.len();
            self.awaiting_in.retain(|marker| *marker <= depth);
            if kind == BlockKind::Let {
                self.awaiting_in.push(depth);
            }
            self.queue
                .push_back(Token::synthetic(TokenKind::Dedent, at.span.start));
        }
    }

    fn misaligned(&mut self, token: &Token) {
        self.diagnostics.push(Diagnostic::error(
            "E1100",
            DiagnosticKind::Layout,
            format!(
                "misaligned line: column {} does not match any enclosing block",
                token.column()
            ),
            token.span,
        ));
        self.queue
            .push_back(Token::synthetic(TokenKind::Error, token.span.start));
    }

    fn close_bracket(&mut self, token: &Token) {
        let Some(index) = self
            .stack
            .iter()
            .rposition(|frame| matches!(frame, Frame::Explicit { .. }))
        else {
            self.diagnostics.push(Diagnostic::error(
                "E1003",
                DiagnosticKind::Lex,
                format!("unmatched closing `{}`", token.text),
                token.span,
            ));
            return;
        };
        while self.stack.len() > index + 1 {
            self.pop_layout(token);
        }
        if let Some(Frame::Explicit { open, span }) = self.stack.pop() {
            let expected = closing_for(&open);
            if expected != token.text {
                self.diagnostics.push(
                    Diagnostic::error(
                        "E1004",
                        DiagnosticKind::Lex,
                        format!("expected `{expected}` but found `{}`", token.text),
                        token.span,
                    )
                    .with_label(format!("`{open}` opened here"), span),
                );
            }
        }
        let depth = self.stack.len();
        self.awaiting_in.retain(|marker| *marker <= depth);
    }

    fn close_let(&mut self, token: &Token) {
        if self.quote_goals > 0 {
            self.quote_goals -= 1;
            return;
        }
        if self.awaiting_in.last() == Some(&self.stack.len()) {
            self.awaiting_in.pop();
            return;
        }
        let Some(index) = self.stack.iter().rposition(|frame| {
            matches!(
                frame,
                Frame::Layout {
                    kind: BlockKind::Let,
                    ..
                } | Frame::Explicit { .. }
            )
        }) else {
            return;
        };
        if !matches!(self.stack[index], Frame::Layout { .. }) {
            return;
        }
        while self.stack.len() > index {
            self.stack.pop();
            self.queue
                .push_back(Token::synthetic(TokenKind::Dedent, token.span.start));
        }
        let depth = self.stack.len();
        self.awaiting_in.retain(|marker| *marker <= depth);
    }

    fn finish(&mut self, eof: Token) {
        self.pending = None;
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Layout {
                    kind: BlockKind::Base,
                    ..
                } => {}
                Frame::Layout { .. } => {
                    self.queue
                        .push_back(Token::synthetic(TokenKind::Dedent, eof.span.start));
                }
                Frame::Explicit { open, span } => {
                    self.diagnostics.push(
                        Diagnostic::error(
                            "E1102",
                            DiagnosticKind::Layout,
                            format!("unterminated block: `{open}` is never closed"),
                            Span::point(eof.span.start),
                        )
                        .with_label(format!("`{open}` opened here"), span),
                    );
                }
            }
        }
        self.queue.push_back(eof);
        self.finished = true;
    }
}

impl Iterator for Layout {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            if let Some(token) = self.queue.pop_front() {
                return Some(token);
            }
            if self.finished {
                return None;
            }
            match self.tokens.next() {
                Some(token) if token.kind == TokenKind::Eof => self.finish(token),
                Some(token) => self.process(token),
                None => self.finished = true,
            }
        }
    }
}

/// Tokens that may sit between two block columns after a dedent because they can only
/// continue the construct of an enclosing block.
fn continues_after_dedent(token: &Token) -> bool {
    match token.kind {
        TokenKind::Keyword => matches!(token.text.as_str(), "in" | "where" | "with" | "rewrite"),
        TokenKind::Symbol => matches!(token.text.as_str(), "=" | "->" | "|" | ":"),
        _ => false,
    }
}
