use tracing::trace;

use crate::diagnostics::Span;
use crate::surface::ast::*;
use crate::token::TokenKind;

use super::Parser;

/// Contextual words that end a module application and start its directive list.
const DIRECTIVE_WORDS: &[&str] = &["as", "hiding", "public", "renaming", "using"];

impl Parser<'_> {
    /// `module M params where ...` or `module M params = N args directives`.
    pub(super) fn parse_module(&mut self) -> Option<Decl> {
        let start = self.bump().span;
        let name = self.expect_name("a module name")?;
        let params = self.parse_bindings()?;
        if self.consume_symbol("=") {
            return self.finish_module_macro(false, start, name, params);
        }
        self.expect_keyword("where", "after module header")?;

        let top_level = self.block_depth == 0;
        let flush = top_level && !self.module_header_seen && !self.at_kind(TokenKind::Indent);
        if top_level {
            self.module_header_seen = true;
        }
        trace!(module = %name.text, flush, "module header");
        let body = if flush {
            self.parse_flush_body()
        } else {
            self.parse_block(true)
        };
        Some(Decl::Module(ModuleDecl {
            name,
            params,
            body,
            flush,
            span: start.merge(&self.previous_span()),
        }))
    }

    /// `open M ...`, `open import M ...` or `open module M = N ...`.
    pub(super) fn parse_open(&mut self) -> Option<Decl> {
        let start = self.bump().span;
        if self.check_keyword("import") {
            return self.parse_import(true, start);
        }
        if self.consume_keyword("module") {
            let name = self.expect_name("a module name")?;
            let params = self.parse_bindings()?;
            self.expect_symbol("=", "in `open module` declaration")?;
            return self.finish_module_macro(true, start, name, params);
        }
        let module = self.expect_name("a module name after `open`")?;
        let args = self.parse_module_args()?;
        let directives = self.parse_import_directives()?;
        Some(Decl::Import(ImportDecl {
            open: true,
            import: false,
            module,
            args,
            alias: None,
            directives,
            span: start.merge(&self.previous_span()),
        }))
    }

    /// `import M args [as N] directives`; `start` is the span of `open` when present.
    pub(super) fn parse_import(&mut self, open: bool, start: Span) -> Option<Decl> {
        self.expect_keyword("import", "in import declaration")?;
        let module = self.expect_name("a module name after `import`")?;
        let args = self.parse_module_args()?;
        let alias = if self.consume_word("as") {
            Some(self.expect_name("an alias after `as`")?)
        } else {
            None
        };
        let directives = self.parse_import_directives()?;
        Some(Decl::Import(ImportDecl {
            open,
            import: true,
            module,
            args,
            alias,
            directives,
            span: start.merge(&self.previous_span()),
        }))
    }

    fn finish_module_macro(
        &mut self,
        open: bool,
        start: Span,
        name: Name,
        params: Vec<Binding>,
    ) -> Option<Decl> {
        let application = self.parse_module_application()?;
        let directives = self.parse_import_directives()?;
        Some(Decl::ModuleMacro(ModuleMacro {
            open,
            name,
            params,
            application,
            directives,
            span: start.merge(&self.previous_span()),
        }))
    }

    /// `N args` or `N {{...}}`.
    fn parse_module_application(&mut self) -> Option<ModuleApplication> {
        let module = self.expect_name("a module name")?;
        let start = module.span;
        if self.check_symbol("{{")
            && self.peek_nth(1).is_symbol("...")
            && self.peek_nth(2).is_symbol("}}")
        {
            self.bump();
            self.bump();
            let end = self.bump().span;
            return Some(ModuleApplication {
                module,
                args: Vec::new(),
                instance_ellipsis: true,
                span: start.merge(&end),
            });
        }
        let args = self.parse_module_args()?;
        let end = args.last().map_or(start, Expr::span);
        Some(ModuleApplication {
            module,
            args,
            instance_ellipsis: false,
            span: start.merge(&end),
        })
    }

    fn parse_module_args(&mut self) -> Option<Vec<Expr>> {
        let mut args = Vec::new();
        while self.at_atom_start() && !self.at_directive_word() {
            args.push(self.parse_atom()?);
        }
        Some(args)
    }

    fn at_directive_word(&self) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Ident && DIRECTIVE_WORDS.contains(&token.text.as_str())
    }

    fn parse_import_directives(&mut self) -> Option<Vec<ImportDirective>> {
        let mut directives = Vec::new();
        loop {
            let start = self.peek().span;
            if self.consume_word("public") {
                directives.push(ImportDirective::Public { span: start });
            } else if self.consume_word("using") {
                let names = self.parse_import_names()?;
                directives.push(ImportDirective::Using {
                    names,
                    span: start.merge(&self.previous_span()),
                });
            } else if self.consume_word("hiding") {
                let names = self.parse_import_names()?;
                directives.push(ImportDirective::Hiding {
                    names,
                    span: start.merge(&self.previous_span()),
                });
            } else if self.consume_word("renaming") {
                let renamings = self.parse_renamings()?;
                directives.push(ImportDirective::Renaming {
                    renamings,
                    span: start.merge(&self.previous_span()),
                });
            } else {
                break;
            }
        }
        Some(directives)
    }

    /// `(a ; module M ; _+_)`
    fn parse_import_names(&mut self) -> Option<Vec<ImportName>> {
        self.expect_symbol("(", "before name list")?;
        let mut names = Vec::new();
        if !self.check_symbol(")") {
            loop {
                names.push(self.parse_import_name()?);
                if !self.consume_symbol(";") {
                    break;
                }
            }
        }
        self.expect_symbol(")", "to close name list")?;
        Some(names)
    }

    fn parse_import_name(&mut self) -> Option<ImportName> {
        let module = self.consume_keyword("module");
        let name = self.expect_name("a name")?;
        Some(ImportName { module, name })
    }

    /// `(a to b ; module M to N)`
    fn parse_renamings(&mut self) -> Option<Vec<Renaming>> {
        self.expect_symbol("(", "after `renaming`")?;
        let mut renamings = Vec::new();
        if !self.check_symbol(")") {
            loop {
                let start = self.peek().span;
                let from = self.parse_import_name()?;
                if !self.consume_word("to") {
                    self.report_expected("`to` in renaming");
                    return None;
                }
                let to = self.expect_name("a new name after `to`")?;
                let span = start.merge(&to.span);
                renamings.push(Renaming { from, to, span });
                if !self.consume_symbol(";") {
                    break;
                }
            }
        }
        self.expect_symbol(")", "to close renaming list")?;
        Some(renamings)
    }
}
