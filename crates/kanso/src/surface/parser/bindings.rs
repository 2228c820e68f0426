use crate::surface::ast::*;
use crate::token::TokenKind;

use super::Parser;

impl Parser<'_> {
    /// Binder groups up to the first token that cannot start one.
    pub(super) fn parse_bindings(&mut self) -> Option<Vec<Binding>> {
        let mut bindings = Vec::new();
        while self.at_binding_start() {
            bindings.push(self.parse_binding()?);
        }
        Some(bindings)
    }

    fn at_binding_start(&self) -> bool {
        let offset = usize::from(self.check_symbol(".") || self.check_symbol(".."));
        let token = self.peek_nth(offset);
        match token.kind {
            TokenKind::Ident => !token.text.contains('.'),
            TokenKind::Symbol => match token.text.as_str() {
                "_" => true,
                "(" => self.is_typed_binding_at(offset),
                "{" | "{{" => true,
                _ => false,
            },
            _ => false,
        }
    }

    /// Whether the bracket at `offset` opens `(x y : A)`, `{x : A}` or `{{x : A}}`.
    pub(super) fn is_typed_binding_at(&self, offset: usize) -> bool {
        let open = self.peek_nth(offset);
        if !(open.is_symbol("(") || open.is_symbol("{") || open.is_symbol("{{")) {
            return false;
        }
        let mut n = offset + 1;
        while self.peek_nth(n).is_symbol("@") {
            n += 2;
        }
        let mut names = 0usize;
        loop {
            let token = self.peek_nth(n);
            if token.is_symbol(".") || token.is_symbol("..") {
                n += 1;
                continue;
            }
            let is_name = (token.kind == TokenKind::Ident && !token.text.contains('.'))
                || token.is_symbol("_");
            if !is_name {
                break;
            }
            names += 1;
            n += 1;
        }
        names > 0 && self.peek_nth(n).is_symbol(":")
    }

    pub(super) fn parse_binding(&mut self) -> Option<Binding> {
        let start = self.peek().span;
        let relevance = if self.check_symbol(".") || self.check_symbol("..") {
            Some(self.bump().text)
        } else {
            None
        };
        let (hiding, close) = if self.consume_symbol("(") {
            (Hiding::Visible, Some(")"))
        } else if self.consume_symbol("{") {
            (Hiding::Hidden, Some("}"))
        } else if self.consume_symbol("{{") {
            (Hiding::Instance, Some("}}"))
        } else {
            (Hiding::Visible, None)
        };

        let Some(close) = close else {
            let name = match self.consume_binder_name() {
                Some(name) => name,
                None => self.expect_name("a binder")?,
            };
            return Some(Binding {
                hiding,
                relevance,
                attributes: Vec::new(),
                span: start.merge(&name.span),
                names: vec![name],
                name_relevance: Vec::new(),
                ty: None,
            });
        };

        let attributes = self.parse_attributes()?;
        let mut names = Vec::new();
        let mut name_relevance = Vec::new();
        loop {
            let marker = if self.check_symbol(".") || self.check_symbol("..") {
                Some(self.bump().text)
            } else {
                None
            };
            match self.consume_binder_name() {
                Some(name) => {
                    names.push(name);
                    name_relevance.push(marker);
                }
                None if marker.is_some() => {
                    self.expect_name("a binder after relevance marker");
                    return None;
                }
                None => break,
            }
        }
        if names.is_empty() {
            self.expect_name("a binder")?;
        }
        if name_relevance.iter().all(Option::is_none) {
            name_relevance.clear();
        }
        let ty = if self.consume_symbol(":") {
            Some(self.parse_expr()?)
        } else if hiding == Hiding::Visible {
            self.report_expected("`:` in typed binding");
            return None;
        } else {
            None
        };
        self.expect_symbol(close, "to close binding")?;
        Some(Binding {
            hiding,
            relevance,
            attributes,
            names,
            name_relevance,
            ty,
            span: start.merge(&self.previous_span()),
        })
    }
}
