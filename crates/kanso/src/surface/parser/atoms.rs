use crate::surface::ast::*;
use crate::syntax::{universe, FloatLiteral, IntegerLiteral};
use crate::token::TokenKind;

use super::Parser;

impl Parser<'_> {
    pub(super) fn at_atom_start(&self) -> bool {
        let token = self.peek();
        match token.kind {
            TokenKind::Ident | TokenKind::Integer | TokenKind::Float | TokenKind::String => true,
            TokenKind::Symbol => matches!(
                token.text.as_str(),
                "_" | "(" | "{" | "{{" | "(|" | "." | "..."
            ),
            TokenKind::Keyword => {
                QuoteForm::from_keyword(&token.text).is_some() || token.text == "record"
            }
            _ => false,
        }
    }

    pub(super) fn parse_atom(&mut self) -> Option<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Ident => {
                self.bump();
                if let Some((sort, level)) = universe(&token.text) {
                    return Some(Expr::Universe {
                        sort,
                        level,
                        text: token.text,
                        span: token.span,
                    });
                }
                let name = Name {
                    text: token.text,
                    span: token.span,
                };
                if self.consume_symbol("@") {
                    let pattern = self.parse_atom()?;
                    let span = name.span.merge(&pattern.span());
                    return Some(Expr::AsPattern {
                        name,
                        pattern: Box::new(pattern),
                        span,
                    });
                }
                Some(Expr::Ident { name })
            }
            TokenKind::Integer => {
                self.bump();
                let Some(value) = IntegerLiteral::parse(&token.text) else {
                    self.emit_diag(
                        "E1202",
                        format!("`{}` is not a valid integer literal", token.text),
                        token.span,
                    );
                    return None;
                };
                Some(Expr::Integer {
                    value,
                    text: token.text,
                    span: token.span,
                })
            }
            TokenKind::Float => {
                self.bump();
                Some(Expr::Float {
                    value: FloatLiteral { text: token.text },
                    span: token.span,
                })
            }
            TokenKind::String => {
                self.bump();
                Some(Expr::String {
                    text: token.text,
                    span: token.span,
                })
            }
            TokenKind::Keyword if token.text == "record" => self.parse_record_expr(),
            TokenKind::Keyword => {
                let form = QuoteForm::from_keyword(&token.text)?;
                self.bump();
                Some(Expr::Quote {
                    form,
                    span: token.span,
                })
            }
            TokenKind::Symbol => self.parse_symbol_atom(),
            _ => {
                self.report_expected("an expression");
                None
            }
        }
    }

    fn parse_symbol_atom(&mut self) -> Option<Expr> {
        let token = self.bump();
        let start = token.span;
        match token.text.as_str() {
            "_" => Some(Expr::Wildcard { span: start }),
            "..." => Some(Expr::Ellipsis { span: start }),
            "." => {
                let inner = self.parse_atom()?;
                let span = start.merge(&inner.span());
                Some(Expr::Dot {
                    inner: Box::new(inner),
                    span,
                })
            }
            "(" => {
                if self.check_symbol(")") {
                    let end = self.bump().span;
                    return Some(Expr::Absurd {
                        hiding: Hiding::Visible,
                        span: start.merge(&end),
                    });
                }
                let inner = self.parse_expr()?;
                let end = self.expect_symbol(")", "to close parenthesis")?;
                Some(Expr::Paren {
                    inner: Box::new(inner),
                    span: start.merge(&end),
                })
            }
            "{" => self.parse_braced(start, Hiding::Hidden, "}"),
            "{{" => self.parse_braced(start, Hiding::Instance, "}}"),
            "(|" => {
                let inner = self.parse_expr()?;
                let end = self.expect_symbol("|)", "to close idiom bracket")?;
                Some(Expr::Idiom {
                    inner: Box::new(inner),
                    span: start.merge(&end),
                })
            }
            _ => {
                self.emit_diag(
                    "E1202",
                    format!("expected an expression, found `{}`", token.text),
                    start,
                );
                None
            }
        }
    }

    /// `{}`, `{x = e}` or `{e}` and their instance counterparts. The opening brace has
    /// already been consumed.
    fn parse_braced(
        &mut self,
        start: crate::diagnostics::Span,
        hiding: Hiding,
        close: &str,
    ) -> Option<Expr> {
        if self.check_symbol(close) {
            let end = self.bump().span;
            return Some(Expr::Absurd {
                hiding,
                span: start.merge(&end),
            });
        }
        if self.at_kind(TokenKind::Ident) && self.peek_nth(1).is_symbol("=") {
            let name = self.consume_name()?;
            self.bump();
            let value = self.parse_expr()?;
            let end = self.expect_symbol(close, "to close named argument")?;
            return Some(Expr::NamedArg {
                hiding,
                name,
                value: Box::new(value),
                span: start.merge(&end),
            });
        }
        let inner = self.parse_expr()?;
        let end = self.expect_symbol(close, "to close braces")?;
        Some(Expr::Braces {
            hiding,
            inner: Box::new(inner),
            span: start.merge(&end),
        })
    }

    /// `record { f = e ; ... }` or the update form `record r { f = e }`.
    fn parse_record_expr(&mut self) -> Option<Expr> {
        let start = self.bump().span;
        let base = if self.check_symbol("{") {
            None
        } else {
            Some(Box::new(self.parse_atom()?))
        };
        self.expect_symbol("{", "after `record`")?;
        let mut fields = Vec::new();
        if !self.check_symbol("}") {
            loop {
                let name = self.expect_name("a field name")?;
                self.expect_symbol("=", "after field name")?;
                let value = self.parse_expr()?;
                let span = name.span.merge(&value.span());
                fields.push(FieldAssignment { name, value, span });
                if !self.consume_symbol(";") {
                    break;
                }
            }
        }
        let end = self.expect_symbol("}", "to close record expression")?;
        Some(Expr::Record {
            base,
            fields,
            span: start.merge(&end),
        })
    }
}
