use std::collections::HashSet;

use num_traits::ToPrimitive;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::operators::{Fixity, OperatorEntry};
use crate::surface::ast::*;
use crate::syntax::IntegerLiteral;
use crate::token::{is_close_bracket, is_open_bracket, TokenKind};

use super::helpers::describe;
use super::Parser;

/// What a function-like declaration turns out to be once the line is scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClauseShape {
    Signature,
    Clause,
}

impl Parser<'_> {
    pub(super) fn parse_decl(&mut self) -> Option<Decl> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Error => None,
            TokenKind::Pragma => {
                self.bump();
                Some(Decl::Pragma(Pragma {
                    catchall: token.text.contains("CATCHALL"),
                    text: token.text,
                    span: token.span,
                }))
            }
            TokenKind::Keyword => self.parse_keyword_decl(),
            TokenKind::Symbol if token.text == "@" => {
                let attributes = self.parse_attributes()?;
                self.parse_function_decl(attributes)
            }
            _ if self.at_atom_start() => self.parse_function_decl(Vec::new()),
            _ => {
                self.unexpected_at_decl();
                None
            }
        }
    }

    fn unexpected_at_decl(&mut self) {
        let token = self.peek().clone();
        if token.kind == TokenKind::Error {
            return;
        }
        self.emit_diag(
            "E1200",
            format!("unexpected {} at declaration position", describe(&token)),
            token.span,
        );
    }

    fn parse_keyword_decl(&mut self) -> Option<Decl> {
        let keyword = self.peek().text.clone();
        match keyword.as_str() {
            "data" | "codata" => self.parse_data(),
            "record" => self.parse_record(),
            "module" => self.parse_module(),
            "open" => self.parse_open(),
            "import" => self.parse_import(false, self.peek().span),
            "mutual" | "abstract" | "private" | "instance" | "macro" | "postulate" => {
                self.parse_block_decl()
            }
            "primitive" | "variable" | "field" => self.parse_signature_block(),
            "infix" | "infixl" | "infixr" => self.parse_infix(),
            "syntax" => self.parse_syntax(),
            "pattern" => self.parse_pattern_synonym(),
            "unquoteDecl" | "unquoteDef" => self.parse_unquote_decl(),
            "constructor" | "inductive" | "coinductive" | "eta-equality" | "no-eta-equality" => {
                self.parse_record_directive().map(Decl::Directive)
            }
            _ if self.at_atom_start() => self.parse_function_decl(Vec::new()),
            _ => {
                self.unexpected_at_decl();
                None
            }
        }
    }

    pub(super) fn parse_attributes(&mut self) -> Option<Vec<Attribute>> {
        let mut attributes = Vec::new();
        while self.check_symbol("@") {
            let at = self.bump().span;
            let expr = self.parse_atom()?;
            let span = at.merge(&expr.span());
            attributes.push(Attribute { expr, span });
        }
        Some(attributes)
    }

    fn parse_function_decl(&mut self, attributes: Vec<Attribute>) -> Option<Decl> {
        match self.scan_clause_shape() {
            ClauseShape::Signature => self
                .parse_type_signature(attributes)
                .map(Decl::TypeSignature),
            ClauseShape::Clause => self.parse_clause(attributes).map(Decl::Clause),
        }
    }

    /// Looks ahead to the end of the current line (outside brackets and nested blocks)
    /// for the first `:` or `=`.
    fn scan_clause_shape(&self) -> ClauseShape {
        let mut brackets = 0usize;
        let mut blocks = 0usize;
        let mut n = 0usize;
        loop {
            let token = self.peek_nth(n);
            match token.kind {
                TokenKind::Eof | TokenKind::Error => return ClauseShape::Clause,
                TokenKind::Indent => blocks += 1,
                TokenKind::Dedent if blocks == 0 => return ClauseShape::Clause,
                TokenKind::Dedent => blocks -= 1,
                TokenKind::Newline if blocks == 0 => return ClauseShape::Clause,
                _ if is_open_bracket(token) => brackets += 1,
                _ if is_close_bracket(token) => brackets = brackets.saturating_sub(1),
                _ if brackets == 0 && blocks == 0 => {
                    if token.is_symbol(":") {
                        return ClauseShape::Signature;
                    }
                    if token.is_symbol("=")
                        || token.is_keyword("where")
                        || token.is_keyword("with")
                        || token.is_keyword("rewrite")
                    {
                        return ClauseShape::Clause;
                    }
                }
                _ => {}
            }
            n += 1;
        }
    }

    pub(super) fn parse_type_signature(&mut self, attributes: Vec<Attribute>) -> Option<TypeSig> {
        let start = attributes
            .first()
            .map(|a| a.span)
            .unwrap_or(self.peek().span);
        let mut names = Vec::new();
        while let Some(name) = self.consume_binder_name() {
            names.push(name);
        }
        if names.is_empty() {
            self.expect_name("a name in type signature")?;
        }
        self.expect_symbol(":", "in type signature")?;
        let ty = self.parse_expr()?;
        let span = start.merge(&ty.span());
        Some(TypeSig {
            attributes,
            names,
            ty,
            span,
        })
    }

    fn parse_clause(&mut self, attributes: Vec<Attribute>) -> Option<Clause> {
        let start = attributes
            .first()
            .map(|a| a.span)
            .unwrap_or(self.peek().span);
        let lhs = self.parse_expr()?;
        let mut rewrite = Vec::new();
        if self.consume_keyword("rewrite") {
            rewrite = self.parse_bar_separated()?;
        }
        let mut with_exprs = Vec::new();
        if self.consume_keyword("with") {
            with_exprs = self.parse_bar_separated()?;
        }
        let rhs = if self.consume_symbol("=") {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let where_block = self.parse_where_block();
        let span = start.merge(&self.previous_span());
        Some(Clause {
            attributes,
            lhs,
            rewrite,
            with_exprs,
            rhs,
            where_block,
            span,
        })
    }

    /// `e₁ | e₂ | ...` as used after `with` and `rewrite`.
    fn parse_bar_separated(&mut self) -> Option<Vec<Expr>> {
        let mut exprs = vec![self.parse_expr_without_guards()?];
        while self.consume_symbol("|") {
            exprs.push(self.parse_expr_without_guards()?);
        }
        Some(exprs)
    }

    /// `where` block or `module M where` block after a clause.
    fn parse_where_block(&mut self) -> Option<WhereBlock> {
        let named = self.check_keyword("module")
            && self.peek_nth(1).kind == TokenKind::Ident
            && self.peek_nth(2).is_keyword("where");
        if !named && !self.check_keyword("where") {
            return None;
        }
        let start = self.bump().span;
        let module = if named {
            let name = self.consume_name();
            self.bump();
            name
        } else {
            None
        };
        let decls = self.parse_block(true);
        Some(WhereBlock {
            module,
            decls,
            span: start.merge(&self.previous_span()),
        })
    }

    fn parse_data(&mut self) -> Option<Decl> {
        let keyword_token = self.bump();
        let keyword = if keyword_token.text == "codata" {
            DataKind::Codata
        } else {
            DataKind::Data
        };
        let name = self.expect_name("a data type name")?;
        let params = self.parse_bindings()?;
        let ty = if self.consume_symbol(":") {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let constructors = if self.consume_keyword("where") {
            Some(self.parse_block(false))
        } else if ty.is_some() {
            None
        } else {
            self.report_expected("`where` or `:` after data type parameters");
            return None;
        };
        Some(Decl::Data(DataDecl {
            keyword,
            name,
            params,
            ty,
            constructors,
            span: keyword_token.span.merge(&self.previous_span()),
        }))
    }

    fn parse_block_decl(&mut self) -> Option<Decl> {
        let token = self.bump();
        let keyword = BlockKeyword::from_keyword(&token.text)?;
        let decls = self.parse_block(false);
        Some(Decl::Block(BlockDecl {
            keyword,
            decls,
            span: token.span.merge(&self.previous_span()),
        }))
    }

    fn parse_signature_block(&mut self) -> Option<Decl> {
        let token = self.bump();
        let keyword = match token.text.as_str() {
            "primitive" => SignatureKeyword::Primitive,
            "variable" => SignatureKeyword::Variable,
            _ => SignatureKeyword::Field,
        };
        if keyword == SignatureKeyword::Field && self.check_symbol(":") {
            self.bump();
            let ty = self.parse_expr()?;
            let span = token.span.merge(&ty.span());
            return Some(Decl::TypeSignature(TypeSig {
                attributes: Vec::new(),
                names: vec![Name {
                    text: token.text,
                    span: token.span,
                }],
                ty,
                span,
            }));
        }
        let mut sigs = Vec::new();
        for decl in self.parse_block(false) {
            match decl {
                Decl::TypeSignature(sig) => sigs.push(sig),
                Decl::Error(_) => {}
                other => self.emit_diag(
                    "E1200",
                    format!(
                        "only type signatures may appear in a `{}` block",
                        keyword.keyword()
                    ),
                    other.span(),
                ),
            }
        }
        Some(Decl::Signatures(SignatureBlock {
            keyword,
            sigs,
            span: token.span.merge(&self.previous_span()),
        }))
    }

    fn parse_infix(&mut self) -> Option<Decl> {
        let token = self.bump();
        let fixity = Fixity::from_keyword(&token.text)?;
        let precedence = self.parse_precedence()?;
        let mut names = Vec::new();
        while let Some(name) = self.consume_name() {
            names.push(name);
        }
        if names.is_empty() {
            self.expect_name("an operator name")?;
        }
        let span = token.span.merge(&self.previous_span());

        let mut seen = HashSet::new();
        let mut duplicate = false;
        for name in &names {
            let symbol = crate::operators::operator_shape(&name.text).0;
            if self.operators.declared_here(&name.text) || !seen.insert(symbol) {
                duplicate = true;
                self.emit(
                    Diagnostic::error(
                        "E1300",
                        DiagnosticKind::Operator,
                        format!(
                            "operator `{}` already has a fixity declaration in this scope",
                            name.text
                        ),
                        name.span,
                    )
                    .with_label("in this fixity declaration", span),
                );
            }
        }
        if duplicate {
            return Some(Decl::Error(ErrorDecl { span }));
        }
        for name in &names {
            let entry = OperatorEntry::new(&name.text, fixity, precedence);
            if let Err(err) = self.operators.declare(entry) {
                self.emit(Diagnostic::error(
                    "E1300",
                    DiagnosticKind::Operator,
                    err.to_string(),
                    name.span,
                ));
            }
        }
        Some(Decl::Infix(InfixDecl {
            fixity,
            precedence,
            names,
            span,
        }))
    }

    fn parse_precedence(&mut self) -> Option<u32> {
        let token = self.peek().clone();
        if token.kind != TokenKind::Integer {
            self.report_expected("a precedence level");
            return None;
        }
        self.bump();
        let literal = IntegerLiteral::parse(&token.text);
        match literal.and_then(|lit| {
            if lit.negative {
                None
            } else {
                lit.magnitude.to_u32()
            }
        }) {
            Some(level) => Some(level),
            None => {
                self.emit(Diagnostic::error(
                    "E1302",
                    DiagnosticKind::Operator,
                    format!("`{}` is not a valid precedence level", token.text),
                    token.span,
                ));
                None
            }
        }
    }

    fn parse_syntax(&mut self) -> Option<Decl> {
        let token = self.bump();
        let name = self.expect_name("the name the notation is for")?;
        let mut holes = Vec::new();
        while !self.check_symbol("=") && !self.at_item_end() {
            holes.push(self.parse_hole_name()?);
        }
        self.expect_symbol("=", "in syntax declaration")?;
        let mut notation = Vec::new();
        while let Some(part) = self.consume_binder_name() {
            notation.push(part);
        }
        if notation.is_empty() {
            self.expect_name("notation after `=`")?;
        }
        Some(Decl::Syntax(SyntaxDecl {
            name,
            holes,
            notation,
            span: token.span.merge(&self.previous_span()),
        }))
    }

    fn parse_hole_name(&mut self) -> Option<HoleName> {
        let start = self.peek().span;
        let (hiding, close) = if self.consume_symbol("{") {
            (Hiding::Hidden, Some("}"))
        } else if self.consume_symbol("{{") {
            (Hiding::Instance, Some("}}"))
        } else {
            (Hiding::Visible, None)
        };
        let label = if close.is_some()
            && self.peek().kind == TokenKind::Ident
            && self.peek_nth(1).is_symbol("=")
        {
            let label = self.consume_name();
            self.bump();
            label
        } else {
            None
        };
        let (binder, name) = self.parse_simple_hole()?;
        if let Some(close) = close {
            self.expect_symbol(close, "to close hole name")?;
        }
        Some(HoleName {
            hiding,
            label,
            binder,
            name,
            span: start.merge(&self.previous_span()),
        })
    }

    /// `x` or `(λ y → x)`.
    fn parse_simple_hole(&mut self) -> Option<(Option<Name>, Name)> {
        if self.consume_symbol("(") {
            self.expect_symbol("\\", "in binding hole")?;
            let binder = match self.consume_binder_name() {
                Some(binder) => binder,
                None => self.expect_name("a bound variable")?,
            };
            self.expect_symbol("->", "in binding hole")?;
            let name = self.expect_name("a hole name")?;
            self.expect_symbol(")", "to close binding hole")?;
            return Some((Some(binder), name));
        }
        let name = self.expect_name("a hole name")?;
        Some((None, name))
    }

    fn parse_pattern_synonym(&mut self) -> Option<Decl> {
        let token = self.bump();
        let name = self.expect_name("a pattern synonym name")?;
        let params = self.parse_bindings()?;
        self.expect_symbol("=", "in pattern synonym")?;
        let rhs = self.parse_expr()?;
        let span = token.span.merge(&rhs.span());
        Some(Decl::PatternSynonym(PatternSynonym {
            name,
            params,
            rhs,
            span,
        }))
    }

    fn parse_unquote_decl(&mut self) -> Option<Decl> {
        let token = self.bump();
        let form = if token.text == "unquoteDef" {
            UnquoteForm::Def
        } else {
            UnquoteForm::Decl
        };
        let mut names = Vec::new();
        while let Some(name) = self.consume_name() {
            names.push(name);
        }
        if form == UnquoteForm::Def && names.is_empty() {
            self.expect_name("a name to define")?;
        }
        self.expect_symbol("=", &format!("after `{}` names", token.text))?;
        let expr = self.parse_expr()?;
        let span = token.span.merge(&expr.span());
        Some(Decl::Unquote(UnquoteDecl {
            form,
            names,
            expr,
            span,
        }))
    }
}
