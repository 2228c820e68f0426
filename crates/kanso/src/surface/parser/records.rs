use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::surface::ast::*;

use super::Parser;

impl Parser<'_> {
    /// `record R params : T where body` or the signature form without `where`.
    pub(super) fn parse_record(&mut self) -> Option<Decl> {
        let start = self.bump().span;
        let name = self.expect_name("a record name")?;
        let params = self.parse_bindings()?;
        let ty = if self.consume_symbol(":") {
            Some(self.parse_expr()?)
        } else {
            None
        };
        if !self.consume_keyword("where") {
            if ty.is_none() {
                self.report_expected("`where` or `:` after record parameters");
                return None;
            }
            return Some(Decl::Record(RecordDecl {
                name,
                params,
                ty,
                directives: Vec::new(),
                body: None,
                span: start.merge(&self.previous_span()),
            }));
        }
        let decls = self.parse_block(true);
        let (directives, body) = self.split_record_body(decls);
        Some(Decl::Record(RecordDecl {
            name,
            params,
            ty,
            directives,
            body: Some(body),
            span: start.merge(&self.previous_span()),
        }))
    }

    /// Pulls the directives out of a record body. A directive after the first field is
    /// reported but still kept.
    fn split_record_body(&mut self, decls: Vec<Decl>) -> (Vec<RecordDirective>, Vec<Decl>) {
        let mut directives = Vec::new();
        let mut body = Vec::new();
        let mut seen_field = false;
        for decl in decls {
            let directive = match decl {
                Decl::Directive(directive) => directive,
                Decl::Block(block) if is_instance_constructor(&block) => {
                    match block.decls.into_iter().next() {
                        Some(Decl::Directive(directive)) => RecordDirective {
                            instance: true,
                            span: block.span,
                            ..directive
                        },
                        _ => continue,
                    }
                }
                other => {
                    if matches!(
                        &other,
                        Decl::TypeSignature(_)
                            | Decl::Signatures(SignatureBlock {
                                keyword: SignatureKeyword::Field,
                                ..
                            })
                    ) {
                        seen_field = true;
                    }
                    body.push(other);
                    continue;
                }
            };
            if seen_field {
                self.emit(Diagnostic::error(
                    "E1203",
                    DiagnosticKind::Syntax,
                    format!(
                        "record directive `{}` must come before the record's fields",
                        directive.form.keyword()
                    ),
                    directive.span,
                ));
            }
            directives.push(directive);
        }
        (directives, body)
    }

    /// `constructor C`, `inductive`, `coinductive`, `eta-equality` or `no-eta-equality`.
    pub(super) fn parse_record_directive(&mut self) -> Option<RecordDirective> {
        let token = self.bump();
        let form = DirectiveForm::from_keyword(&token.text)?;
        let name = if form == DirectiveForm::Constructor {
            Some(self.expect_name("a constructor name")?)
        } else {
            None
        };
        let span = name
            .as_ref()
            .map_or(token.span, |name| token.span.merge(&name.span));
        Some(RecordDirective {
            form,
            name,
            instance: false,
            span,
        })
    }
}

fn is_instance_constructor(block: &BlockDecl) -> bool {
    block.keyword == BlockKeyword::Instance
        && matches!(
            block.decls.as_slice(),
            [Decl::Directive(RecordDirective {
                form: DirectiveForm::Constructor,
                ..
            })]
        )
}
