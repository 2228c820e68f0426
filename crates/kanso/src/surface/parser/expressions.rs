use std::iter::Peekable;
use std::vec::IntoIter;

use tracing::trace;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Span};
use crate::operators::{Fixity, OperatorEntry, OperatorShape};
use crate::surface::ast::*;
use crate::token::TokenKind;

use super::Parser;

/// One element of an application run before operator grouping.
enum Item {
    Operand(Expr),
    Operator { entry: OperatorEntry, name: Name },
}

/// An application run after adjacent operands have been folded together.
enum Piece {
    Term(Expr),
    Infix(OperatorEntry, Name),
    Prefix(OperatorEntry, Name),
}

type Pieces = Peekable<IntoIter<Piece>>;

/// Everything left of an arrow.
enum Link {
    Domain(Expr),
    Telescope { bindings: Vec<Binding>, start: Span },
}

/// Nesting limit for parenthesised and other recursively parsed expressions.
const MAX_EXPR_DEPTH: usize = 100;

impl Parser<'_> {
    pub(super) fn parse_expr(&mut self) -> Option<Expr> {
        self.parse_expr_inner(true)
    }

    /// Expression where a top-level `|` separates alternatives instead of starting guards.
    pub(super) fn parse_expr_without_guards(&mut self) -> Option<Expr> {
        self.parse_expr_inner(false)
    }

    fn parse_expr_inner(&mut self, allow_guards: bool) -> Option<Expr> {
        if self.expr_depth >= MAX_EXPR_DEPTH {
            let span = self.peek().span;
            self.emit_diag(
                "E1206",
                format!("expression nested more than {MAX_EXPR_DEPTH} levels deep"),
                span,
            );
            return None;
        }
        self.expr_depth += 1;
        let expr = self.parse_arrow_chain(allow_guards);
        self.expr_depth -= 1;
        expr
    }

    /// `A -> (x : B) {y : C} -> D`, collected left to right and folded from the right.
    fn parse_arrow_chain(&mut self, allow_guards: bool) -> Option<Expr> {
        let mut links = Vec::new();
        let last = loop {
            if self.is_typed_binding_at(0) {
                let start = self.peek().span;
                let mut bindings = Vec::new();
                while self.is_typed_binding_at(0) {
                    bindings.push(self.parse_binding()?);
                }
                self.expect_symbol("->", "after telescope")?;
                links.push(Link::Telescope { bindings, start });
                continue;
            }
            let first = self.parse_application()?;
            if self.consume_symbol("->") {
                links.push(Link::Domain(first));
                continue;
            }
            break self.parse_guards(first, allow_guards)?;
        };
        Some(links.into_iter().rev().fold(last, |body, link| match link {
            Link::Domain(domain) => {
                let span = domain.span().merge(&body.span());
                Expr::Fun {
                    domain: Box::new(domain),
                    codomain: Box::new(body),
                    span,
                }
            }
            Link::Telescope { bindings, start } => {
                let span = start.merge(&body.span());
                Expr::Pi {
                    forall: false,
                    bindings,
                    body: Box::new(body),
                    span,
                }
            }
        }))
    }

    fn parse_guards(&mut self, first: Expr, allow_guards: bool) -> Option<Expr> {
        if !allow_guards || !self.check_symbol("|") {
            return Some(first);
        }
        let mut guards = vec![first];
        while self.consume_symbol("|") {
            guards.push(self.parse_application()?);
        }
        let body = guards.pop()?;
        let span = guards
            .first()
            .map_or(body.span(), |guard| guard.span().merge(&body.span()));
        Some(Expr::Guarded {
            guards,
            body: Box::new(body),
            span,
        })
    }

    /// A run of atoms, optionally ending in a form that extends as far right as possible
    /// (lambda, `forall`, `let`, `do`, `quoteGoal`, `tactic`), regrouped around declared
    /// operators.
    fn parse_application(&mut self) -> Option<Expr> {
        let mut items = Vec::new();
        loop {
            if self.at_tail_start() {
                items.push(Item::Operand(self.parse_tail()?));
                break;
            }
            if !self.at_atom_start() {
                break;
            }
            if let Some(item) = self.operator_item() {
                items.push(item);
                continue;
            }
            items.push(Item::Operand(self.parse_atom()?));
        }
        if items.is_empty() {
            self.expected_expression();
            return None;
        }
        self.resolve_operators(items)
    }

    fn expected_expression(&mut self) {
        let token = self.peek().clone();
        if token.kind == TokenKind::Error {
            return;
        }
        self.emit_diag(
            "E1202",
            format!(
                "expected an expression, found {}",
                super::helpers::describe(&token)
            ),
            token.span,
        );
    }

    fn operator_item(&mut self) -> Option<Item> {
        let token = self.peek();
        if token.kind != TokenKind::Ident || self.peek_nth(1).is_symbol("@") {
            return None;
        }
        let entry = self.operators.lookup(&token.text)?.clone();
        if !matches!(entry.shape, OperatorShape::Infix | OperatorShape::Prefix) {
            return None;
        }
        let token = self.bump();
        Some(Item::Operator {
            entry,
            name: Name {
                text: token.text,
                span: token.span,
            },
        })
    }

    fn at_tail_start(&self) -> bool {
        let token = self.peek();
        token.is_symbol("\\")
            || (token.kind == TokenKind::Keyword
                && matches!(
                    token.text.as_str(),
                    "forall" | "let" | "do" | "quoteGoal" | "tactic"
                ))
    }

    fn parse_tail(&mut self) -> Option<Expr> {
        let token = self.peek().clone();
        match token.text.as_str() {
            "\\" => self.parse_lambda(),
            "forall" => self.parse_forall(),
            "let" => self.parse_let(false),
            "do" => self.parse_do(),
            "quoteGoal" => self.parse_quote_goal(),
            _ => self.parse_tactic(),
        }
    }

    /// Groups an application run by the fixities currently in scope. Operators that
    /// cannot take operands where they stand are treated as ordinary identifiers.
    fn resolve_operators(&mut self, items: Vec<Item>) -> Option<Expr> {
        let total = items.len();
        let mut pieces = Vec::new();
        let mut run: Vec<Expr> = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            let has_next = index + 1 < total;
            match item {
                Item::Operand(expr) => run.push(expr),
                Item::Operator { entry, name } => {
                    let usable = has_next
                        && match entry.shape {
                            OperatorShape::Infix => !run.is_empty(),
                            OperatorShape::Prefix => run.is_empty(),
                            _ => false,
                        };
                    if !usable {
                        run.push(Expr::Ident { name });
                        continue;
                    }
                    if let Some(term) = fold_application(std::mem::take(&mut run)) {
                        pieces.push(Piece::Term(term));
                    }
                    if entry.shape == OperatorShape::Infix {
                        pieces.push(Piece::Infix(entry, name));
                    } else {
                        pieces.push(Piece::Prefix(entry, name));
                    }
                }
            }
        }
        if let Some(term) = fold_application(run) {
            pieces.push(Piece::Term(term));
        }
        if let [Piece::Term(_)] = pieces.as_slice() {
            return match pieces.pop() {
                Some(Piece::Term(term)) => Some(term),
                _ => None,
            };
        }
        let mut pieces = pieces.into_iter().peekable();
        self.climb(&mut pieces, 0, None)
    }

    /// Precedence climbing. `parent` is the operator whose right operand is being built;
    /// meeting an operator of the same level that cannot associate with it is an ambiguity.
    fn climb(
        &mut self,
        pieces: &mut Pieces,
        min_precedence: u32,
        parent: Option<(&OperatorEntry, Span)>,
    ) -> Option<Expr> {
        let mut lhs = self.climb_operand(pieces)?;
        let mut previous = parent.map(|(entry, span)| (entry.clone(), span));
        while let Some(Piece::Infix(entry, _)) = pieces.peek() {
            if entry.precedence < min_precedence {
                break;
            }
            let Some(Piece::Infix(entry, name)) = pieces.next() else {
                break;
            };
            if let Some((before, before_span)) = &previous {
                if before.precedence == entry.precedence
                    && (before.fixity != entry.fixity || entry.fixity == Fixity::Infix)
                {
                    self.report_ambiguity(before, *before_span, &entry, &name);
                }
            }
            let next_min = match entry.fixity {
                Fixity::InfixR => entry.precedence,
                Fixity::InfixL | Fixity::Infix => entry.precedence + 1,
            };
            let name_span = name.span;
            let rhs = self.climb(pieces, next_min, Some((&entry, name_span)))?;
            let span = lhs.span().merge(&rhs.span());
            lhs = Expr::OpApp {
                operator: entry.canonical_name(),
                op: name,
                operands: vec![lhs, rhs],
                span,
            };
            previous = Some((entry, name_span));
        }
        Some(lhs)
    }

    fn climb_operand(&mut self, pieces: &mut Pieces) -> Option<Expr> {
        match pieces.next()? {
            Piece::Term(term) => Some(term),
            Piece::Prefix(entry, name) => {
                let operand = self.climb(pieces, entry.precedence, None)?;
                let span = name.span.merge(&operand.span());
                Some(Expr::OpApp {
                    operator: entry.canonical_name(),
                    op: name,
                    operands: vec![operand],
                    span,
                })
            }
            Piece::Infix(_, name) => Some(Expr::Ident { name }),
        }
    }

    fn report_ambiguity(
        &mut self,
        before: &OperatorEntry,
        before_span: Span,
        entry: &OperatorEntry,
        name: &Name,
    ) {
        trace!(first = %before.name, second = %entry.name, "ambiguous operator run");
        self.emit(
            Diagnostic::error(
                "E1301",
                DiagnosticKind::Operator,
                format!(
                    "ambiguous use of `{}` ({} {}) next to `{}` ({} {}); add parentheses",
                    entry.symbol,
                    entry.fixity.keyword(),
                    entry.precedence,
                    before.symbol,
                    before.fixity.keyword(),
                    before.precedence
                ),
                name.span,
            )
            .with_label("conflicting operator", before_span),
        );
    }

    fn parse_lambda(&mut self) -> Option<Expr> {
        let start = self.bump().span;
        if self.consume_keyword("where") {
            let clauses = self.parse_lambda_where_clauses();
            return Some(Expr::ExtendedLambda {
                where_form: true,
                clauses,
                span: start.merge(&self.previous_span()),
            });
        }
        for (open, close, hiding) in [
            ("(", ")", Hiding::Visible),
            ("{", "}", Hiding::Hidden),
            ("{{", "}}", Hiding::Instance),
        ] {
            if self.check_symbol(open) && self.peek_nth(1).is_symbol(close) {
                self.bump();
                let end = self.bump().span;
                return Some(Expr::AbsurdLambda {
                    hiding,
                    span: start.merge(&end),
                });
            }
        }
        if self.check_symbol("{") && self.braces_hold_clauses() {
            self.bump();
            let mut clauses = vec![self.parse_lambda_clause()?];
            while self.consume_symbol(";") {
                clauses.push(self.parse_lambda_clause()?);
            }
            let end = self.expect_symbol("}", "to close extended lambda")?;
            return Some(Expr::ExtendedLambda {
                where_form: false,
                clauses,
                span: start.merge(&end),
            });
        }
        let bindings = self.parse_bindings()?;
        if bindings.is_empty() {
            self.expect_name("a lambda binder")?;
        }
        self.expect_symbol("->", "after lambda binders")?;
        let body = self.parse_expr()?;
        let span = start.merge(&body.span());
        Some(Expr::Lambda {
            bindings,
            body: Box::new(body),
            span,
        })
    }

    /// Whether the `{` at the cursor starts `λ { p → e ; ... }` rather than a hidden
    /// binder.
    fn braces_hold_clauses(&self) -> bool {
        if self.peek_nth(1).is_symbol("(") && self.peek_nth(2).is_symbol(")") {
            return true;
        }
        let mut depth = 0usize;
        let mut n = 1usize;
        loop {
            let token = self.peek_nth(n);
            match token.kind {
                TokenKind::Eof => return false,
                _ if crate::token::is_open_bracket(token) => depth += 1,
                _ if crate::token::is_close_bracket(token) => {
                    if depth == 0 {
                        return false;
                    }
                    depth -= 1;
                }
                _ if depth == 0 && (token.is_symbol("->") || token.is_symbol(";")) => {
                    return true
                }
                _ => {}
            }
            n += 1;
        }
    }

    fn parse_lambda_where_clauses(&mut self) -> Vec<LambdaClause> {
        let mut clauses = Vec::new();
        if !self.consume_kind(TokenKind::Indent) {
            return clauses;
        }
        loop {
            while self.consume_kind(TokenKind::Newline) {}
            match self.peek().kind {
                TokenKind::Dedent => {
                    self.bump();
                    break;
                }
                TokenKind::Eof => break,
                _ => {}
            }
            match self.parse_lambda_clause() {
                Some(clause) => clauses.push(clause),
                None => self.recover_to_boundary(),
            }
            if !self.at_item_end() {
                self.report_expected("end of lambda clause");
                self.recover_to_boundary();
            }
        }
        clauses
    }

    fn parse_lambda_clause(&mut self) -> Option<LambdaClause> {
        let lhs = self.parse_application()?;
        let body = if self.consume_symbol("->") {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let span = body
            .as_ref()
            .map_or(lhs.span(), |body| lhs.span().merge(&body.span()));
        Some(LambdaClause { lhs, body, span })
    }

    fn parse_forall(&mut self) -> Option<Expr> {
        let start = self.bump().span;
        let bindings = self.parse_bindings()?;
        if bindings.is_empty() {
            self.expect_name("a binder after `forall`")?;
        }
        self.expect_symbol("->", "after `forall` binders")?;
        let body = self.parse_expr()?;
        let span = start.merge(&body.span());
        Some(Expr::Pi {
            forall: true,
            bindings,
            body: Box::new(body),
            span,
        })
    }

    /// `let decls in e`. Inside `do` the `in` part may be left out.
    fn parse_let(&mut self, in_do: bool) -> Option<Expr> {
        let start = self.bump().span;
        let decls = self.parse_block(true);
        if self.at_kind(TokenKind::Newline) && self.peek_nth(1).is_keyword("in") {
            self.bump();
        }
        let body = if self.consume_keyword("in") {
            Some(Box::new(self.parse_expr()?))
        } else if in_do {
            None
        } else {
            self.report_expected("`in` after let block");
            return None;
        };
        Some(Expr::Let {
            decls,
            body,
            span: start.merge(&self.previous_span()),
        })
    }

    fn parse_do(&mut self) -> Option<Expr> {
        let start = self.bump().span;
        if !self.consume_kind(TokenKind::Indent) {
            self.report_expected("an indented block of statements after `do`");
            return None;
        }
        let mut stmts = Vec::new();
        loop {
            while self.consume_kind(TokenKind::Newline) {}
            match self.peek().kind {
                TokenKind::Dedent => {
                    self.bump();
                    break;
                }
                TokenKind::Eof => break,
                _ => {}
            }
            stmts.push(self.parse_do_stmt()?);
            if !self.at_item_end() {
                self.report_expected("end of statement");
                return None;
            }
        }
        Some(Expr::Do {
            stmts,
            span: start.merge(&self.previous_span()),
        })
    }

    fn parse_do_stmt(&mut self) -> Option<DoStmt> {
        if self.check_keyword("let") {
            let expr = self.parse_let(true)?;
            let span = expr.span();
            return Some(DoStmt::Expr { expr, span });
        }
        let expr = self.parse_expr()?;
        if self.consume_symbol("<-") {
            let value = self.parse_expr()?;
            let span = expr.span().merge(&value.span());
            return Some(DoStmt::Bind {
                pattern: expr,
                value,
                span,
            });
        }
        let span = expr.span();
        Some(DoStmt::Expr { expr, span })
    }

    fn parse_quote_goal(&mut self) -> Option<Expr> {
        let start = self.bump().span;
        let name = self.expect_name("a name after `quoteGoal`")?;
        self.expect_keyword("in", "after `quoteGoal` name")?;
        let body = self.parse_expr()?;
        let span = start.merge(&body.span());
        Some(Expr::QuoteGoal {
            name,
            body: Box::new(body),
            span,
        })
    }

    /// `tactic e | alt₁ | alt₂`
    fn parse_tactic(&mut self) -> Option<Expr> {
        let start = self.bump().span;
        let body = self.parse_application()?;
        let mut alternatives = Vec::new();
        while self.consume_symbol("|") {
            alternatives.push(self.parse_application()?);
        }
        let end = alternatives.last().map_or(body.span(), Expr::span);
        Some(Expr::Tactic {
            body: Box::new(body),
            alternatives,
            span: start.merge(&end),
        })
    }
}

/// Left-nested application of a run of operands.
fn fold_application(run: Vec<Expr>) -> Option<Expr> {
    let mut run = run.into_iter();
    let first = run.next()?;
    Some(run.fold(first, |func, arg| {
        let span = func.span().merge(&arg.span());
        Expr::App {
            func: Box::new(func),
            arg: Box::new(arg),
            span,
        }
    }))
}
