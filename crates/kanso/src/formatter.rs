//! Pretty-printer for the concrete syntax tree.
//!
//! Output is laid out so the layout pass rebuilds the same blocks: every block body goes
//! on its own lines, one indentation step deeper than the line that opened it.

use crate::surface::*;
use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    pub indent_size: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self { indent_size: 2 }
    }
}

/// Prints `decls` as source text. Comments are emitted in front of the top-level
/// declaration they precede or sit inside.
pub fn format_decls(decls: &[Decl], comments: &[Token], options: FormatOptions) -> String {
    let mut printer = Printer {
        out: String::new(),
        indent: 0,
        step: options.indent_size.clamp(1, 16),
    };
    let mut pending = comments.iter().peekable();
    printer.top_level(decls, &mut pending);
    for comment in pending {
        printer.separate_top_level();
        printer.out.push_str(&comment.text);
    }
    if !printer.out.ends_with('\n') {
        printer.out.push('\n');
    }
    printer.out
}

pub fn format_expr(expr: &Expr) -> String {
    let mut printer = Printer {
        out: String::new(),
        indent: 0,
        step: FormatOptions::default().indent_size,
    };
    printer.expr(expr);
    printer.out
}

type Comments<'a> = std::iter::Peekable<std::slice::Iter<'a, Token>>;

struct Printer {
    out: String,
    /// Column (zero-based) of the innermost block being printed.
    indent: usize,
    step: usize,
}

impl Printer {
    fn top_level(&mut self, decls: &[Decl], comments: &mut Comments<'_>) {
        for decl in decls {
            if decl.is_error() {
                continue;
            }
            let last_line = decl.span().end.line;
            while let Some(comment) = comments.next_if(|c| c.line() <= last_line) {
                self.separate_top_level();
                self.out.push_str(&comment.text);
            }
            if let Decl::Module(module) = decl {
                if module.flush {
                    self.separate_top_level();
                    self.module_header(module);
                    self.top_level(&module.body, comments);
                    continue;
                }
            }
            self.separate_top_level();
            self.decl(decl);
        }
    }

    fn separate_top_level(&mut self) {
        if self.out.is_empty() {
            return;
        }
        if self.last_line_is_comment() {
            self.out.push('\n');
        } else {
            self.out.push_str("\n\n");
        }
    }

    fn last_line_is_comment(&self) -> bool {
        self.out
            .rsplit('\n')
            .next()
            .is_some_and(|line| line.trim_start().starts_with('#'))
    }

    fn newline(&mut self) {
        self.out.push('\n');
        self.out.push_str(&" ".repeat(self.indent));
    }

    /// Prints `decls` one per line, one step deeper than the current block.
    fn block(&mut self, decls: &[Decl]) {
        self.indent += self.step;
        for decl in decls.iter().filter(|decl| !decl.is_error()) {
            self.newline();
            self.decl(decl);
        }
        self.indent -= self.step;
    }

    fn decl(&mut self, decl: &Decl) {
        match decl {
            Decl::TypeSignature(sig) => self.type_sig(sig),
            Decl::Clause(clause) => self.clause(clause),
            Decl::Function(function) => {
                let mut first = true;
                if let Some(sig) = &function.signature {
                    self.type_sig(sig);
                    first = false;
                }
                for clause in &function.clauses {
                    if !first {
                        self.newline();
                    }
                    first = false;
                    self.clause(clause);
                }
            }
            Decl::Data(data) => {
                self.out.push_str(match data.keyword {
                    DataKind::Data => "data ",
                    DataKind::Codata => "codata ",
                });
                self.out.push_str(&data.name.text);
                self.bindings(&data.params);
                if let Some(ty) = &data.ty {
                    self.out.push_str(" : ");
                    self.expr(ty);
                }
                if let Some(constructors) = &data.constructors {
                    self.out.push_str(" where");
                    self.block(constructors);
                }
            }
            Decl::Record(record) => self.record(record),
            Decl::Directive(directive) => self.directive(directive),
            Decl::Module(module) => {
                self.module_header(module);
                if module.flush {
                    for decl in &module.body {
                        self.newline();
                        self.decl(decl);
                    }
                } else {
                    self.block(&module.body);
                }
            }
            Decl::ModuleMacro(macro_decl) => {
                if macro_decl.open {
                    self.out.push_str("open ");
                }
                self.out.push_str("module ");
                self.out.push_str(&macro_decl.name.text);
                self.bindings(&macro_decl.params);
                self.out.push_str(" = ");
                self.out.push_str(&macro_decl.application.module.text);
                if macro_decl.application.instance_ellipsis {
                    self.out.push_str(" {{...}}");
                }
                for arg in &macro_decl.application.args {
                    self.out.push(' ');
                    self.expr(arg);
                }
                self.import_directives(&macro_decl.directives);
            }
            Decl::Import(import) => {
                if import.open {
                    self.out.push_str("open ");
                }
                if import.import {
                    self.out.push_str("import ");
                }
                self.out.push_str(&import.module.text);
                for arg in &import.args {
                    self.out.push(' ');
                    self.expr(arg);
                }
                if let Some(alias) = &import.alias {
                    self.out.push_str(" as ");
                    self.out.push_str(&alias.text);
                }
                self.import_directives(&import.directives);
            }
            Decl::Pragma(pragma) => self.out.push_str(&pragma.text),
            Decl::Block(block) => {
                self.out.push_str(block.keyword.keyword());
                self.block(&block.decls);
            }
            Decl::Signatures(block) => {
                self.out.push_str(block.keyword.keyword());
                self.indent += self.step;
                for sig in &block.sigs {
                    self.newline();
                    self.type_sig(sig);
                }
                self.indent -= self.step;
            }
            Decl::Infix(infix) => {
                self.out.push_str(infix.fixity.keyword());
                self.out.push(' ');
                self.out.push_str(&infix.precedence.to_string());
                for name in &infix.names {
                    self.out.push(' ');
                    self.out.push_str(&name.text);
                }
            }
            Decl::Syntax(syntax) => {
                self.out.push_str("syntax ");
                self.out.push_str(&syntax.name.text);
                for hole in &syntax.holes {
                    self.out.push(' ');
                    self.hole(hole);
                }
                self.out.push_str(" =");
                for part in &syntax.notation {
                    self.out.push(' ');
                    self.out.push_str(&part.text);
                }
            }
            Decl::PatternSynonym(pattern) => {
                self.out.push_str("pattern ");
                self.out.push_str(&pattern.name.text);
                self.bindings(&pattern.params);
                self.out.push_str(" = ");
                self.expr(&pattern.rhs);
            }
            Decl::Unquote(unquote) => {
                self.out.push_str(match unquote.form {
                    UnquoteForm::Decl => "unquoteDecl",
                    UnquoteForm::Def => "unquoteDef",
                });
                for name in &unquote.names {
                    self.out.push(' ');
                    self.out.push_str(&name.text);
                }
                self.out.push_str(" = ");
                self.expr(&unquote.expr);
            }
            Decl::Error(_) => {}
        }
    }

    fn module_header(&mut self, module: &ModuleDecl) {
        self.out.push_str("module ");
        self.out.push_str(&module.name.text);
        self.bindings(&module.params);
        self.out.push_str(" where");
    }

    fn record(&mut self, record: &RecordDecl) {
        self.out.push_str("record ");
        self.out.push_str(&record.name.text);
        self.bindings(&record.params);
        if let Some(ty) = &record.ty {
            self.out.push_str(" : ");
            self.expr(ty);
        }
        let Some(body) = &record.body else {
            return;
        };
        self.out.push_str(" where");
        self.indent += self.step;
        for directive in &record.directives {
            self.newline();
            self.directive(directive);
        }
        self.indent -= self.step;
        self.block(body);
    }

    fn directive(&mut self, directive: &RecordDirective) {
        if directive.instance {
            self.out.push_str("instance");
            self.indent += self.step;
            self.newline();
        }
        self.out.push_str(directive.form.keyword());
        if let Some(name) = &directive.name {
            self.out.push(' ');
            self.out.push_str(&name.text);
        }
        if directive.instance {
            self.indent -= self.step;
        }
    }

    fn import_directives(&mut self, directives: &[ImportDirective]) {
        for directive in directives {
            self.out.push(' ');
            match directive {
                ImportDirective::Public { .. } => self.out.push_str("public"),
                ImportDirective::Using { names, .. } => {
                    self.out.push_str("using ");
                    self.import_names(names);
                }
                ImportDirective::Hiding { names, .. } => {
                    self.out.push_str("hiding ");
                    self.import_names(names);
                }
                ImportDirective::Renaming { renamings, .. } => {
                    self.out.push_str("renaming (");
                    for (index, renaming) in renamings.iter().enumerate() {
                        if index > 0 {
                            self.out.push_str(" ; ");
                        }
                        self.import_name(&renaming.from);
                        self.out.push_str(" to ");
                        self.out.push_str(&renaming.to.text);
                    }
                    self.out.push(')');
                }
            }
        }
    }

    fn import_names(&mut self, names: &[ImportName]) {
        self.out.push('(');
        for (index, name) in names.iter().enumerate() {
            if index > 0 {
                self.out.push_str(" ; ");
            }
            self.import_name(name);
        }
        self.out.push(')');
    }

    fn import_name(&mut self, name: &ImportName) {
        if name.module {
            self.out.push_str("module ");
        }
        self.out.push_str(&name.name.text);
    }

    fn hole(&mut self, hole: &HoleName) {
        let (open, close) = match hole.hiding {
            Hiding::Visible => ("", ""),
            hiding => brackets(hiding),
        };
        self.out.push_str(open);
        if let Some(label) = &hole.label {
            self.out.push_str(&label.text);
            self.out.push_str(" = ");
        }
        match &hole.binder {
            Some(binder) => {
                self.out.push_str("(\\ ");
                self.out.push_str(&binder.text);
                self.out.push_str(" -> ");
                self.out.push_str(&hole.name.text);
                self.out.push(')');
            }
            None => self.out.push_str(&hole.name.text),
        }
        self.out.push_str(close);
    }

    fn attributes(&mut self, attributes: &[Attribute]) {
        for attribute in attributes {
            self.out.push('@');
            self.expr(&attribute.expr);
            self.out.push(' ');
        }
    }

    fn type_sig(&mut self, sig: &TypeSig) {
        self.attributes(&sig.attributes);
        self.names(&sig.names);
        self.out.push_str(" : ");
        self.expr(&sig.ty);
    }

    fn names(&mut self, names: &[Name]) {
        for (index, name) in names.iter().enumerate() {
            if index > 0 {
                self.out.push(' ');
            }
            self.out.push_str(&name.text);
        }
    }

    fn clause(&mut self, clause: &Clause) {
        self.attributes(&clause.attributes);
        self.expr(&clause.lhs);
        if !clause.rewrite.is_empty() {
            self.out.push_str(" rewrite ");
            self.separated(&clause.rewrite, " | ");
        }
        if !clause.with_exprs.is_empty() {
            self.out.push_str(" with ");
            self.separated(&clause.with_exprs, " | ");
        }
        if let Some(rhs) = &clause.rhs {
            self.out.push_str(" = ");
            self.expr(rhs);
        }
        if let Some(where_block) = &clause.where_block {
            self.indent += self.step;
            self.newline();
            if let Some(module) = &where_block.module {
                self.out.push_str("module ");
                self.out.push_str(&module.text);
                self.out.push(' ');
            }
            self.out.push_str("where");
            self.block(&where_block.decls);
            self.indent -= self.step;
        }
    }

    fn separated(&mut self, exprs: &[Expr], separator: &str) {
        for (index, expr) in exprs.iter().enumerate() {
            if index > 0 {
                self.out.push_str(separator);
            }
            self.expr(expr);
        }
    }

    fn bindings(&mut self, bindings: &[Binding]) {
        for binding in bindings {
            self.out.push(' ');
            self.binding(binding);
        }
    }

    fn binding(&mut self, binding: &Binding) {
        if let Some(relevance) = &binding.relevance {
            self.out.push_str(relevance);
        }
        let bracketed = binding.ty.is_some()
            || binding.hiding != Hiding::Visible
            || !binding.attributes.is_empty();
        if !bracketed {
            self.names(&binding.names);
            return;
        }
        let (open, close) = brackets(binding.hiding);
        self.out.push_str(open);
        self.attributes(&binding.attributes);
        for (index, name) in binding.names.iter().enumerate() {
            if index > 0 {
                self.out.push(' ');
            }
            if let Some(Some(marker)) = binding.name_relevance.get(index) {
                self.out.push_str(marker);
            }
            self.out.push_str(&name.text);
        }
        if let Some(ty) = &binding.ty {
            self.out.push_str(" : ");
            self.expr(ty);
        }
        self.out.push_str(close);
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident { name } => self.out.push_str(&name.text),
            Expr::Wildcard { .. } => self.out.push('_'),
            Expr::Integer { text, .. } | Expr::String { text, .. } | Expr::Universe { text, .. } => {
                self.out.push_str(text)
            }
            Expr::Float { value, .. } => self.out.push_str(&value.text),
            Expr::Quote { form, .. } => self.out.push_str(form.keyword()),
            Expr::Ellipsis { .. } => self.out.push_str("..."),
            Expr::Paren { inner, .. } => {
                self.out.push('(');
                self.expr(inner);
                self.out.push(')');
            }
            Expr::Braces { hiding, inner, .. } => {
                let inner = self.nested(inner);
                self.bracketed(*hiding, &inner);
            }
            Expr::NamedArg {
                hiding,
                name,
                value,
                ..
            } => {
                let value = self.nested(value);
                self.bracketed(*hiding, &format!("{} = {value}", name.text));
            }
            Expr::Absurd { hiding, .. } => {
                let (open, close) = brackets(*hiding);
                self.out.push_str(open);
                self.out.push_str(close);
            }
            Expr::Idiom { inner, .. } => {
                self.out.push_str("(| ");
                self.expr(inner);
                self.out.push_str(" |)");
            }
            Expr::Dot { inner, .. } => {
                self.out.push('.');
                let inner = self.nested(inner);
                if inner.starts_with('.') {
                    self.out.push(' ');
                }
                self.out.push_str(&inner);
            }
            Expr::AsPattern { name, pattern, .. } => {
                self.out.push_str(&name.text);
                self.out.push('@');
                self.expr(pattern);
            }
            Expr::Record { base, fields, .. } => {
                self.out.push_str("record ");
                if let Some(base) = base {
                    self.expr(base);
                    self.out.push(' ');
                }
                if fields.is_empty() {
                    self.out.push_str("{}");
                    return;
                }
                self.out.push_str("{ ");
                for (index, field) in fields.iter().enumerate() {
                    if index > 0 {
                        self.out.push_str(" ; ");
                    }
                    self.out.push_str(&field.name.text);
                    self.out.push_str(" = ");
                    self.expr(&field.value);
                }
                self.out.push_str(" }");
            }
            Expr::App { func, arg, .. } => {
                self.expr(func);
                self.out.push(' ');
                self.expr(arg);
            }
            Expr::OpApp { op, operands, .. } => match operands.as_slice() {
                [operand] => {
                    self.out.push_str(&op.text);
                    self.out.push(' ');
                    self.expr(operand);
                }
                _ => {
                    for (index, operand) in operands.iter().enumerate() {
                        if index > 0 {
                            self.out.push(' ');
                            self.out.push_str(&op.text);
                            self.out.push(' ');
                        }
                        self.expr(operand);
                    }
                }
            },
            Expr::Guarded { guards, body, .. } => {
                for guard in guards {
                    self.expr(guard);
                    self.out.push_str(" | ");
                }
                self.expr(body);
            }
            Expr::Fun { .. } => {
                let mut current = expr;
                while let Expr::Fun {
                    domain, codomain, ..
                } = current
                {
                    self.expr(domain);
                    self.out.push_str(" -> ");
                    current = codomain;
                }
                self.expr(current);
            }
            Expr::Pi {
                forall,
                bindings,
                body,
                ..
            } => {
                if *forall {
                    self.out.push_str("forall");
                    self.bindings(bindings);
                } else {
                    for (index, binding) in bindings.iter().enumerate() {
                        if index > 0 {
                            self.out.push(' ');
                        }
                        self.binding(binding);
                    }
                }
                self.out.push_str(" -> ");
                self.expr(body);
            }
            Expr::Lambda { bindings, body, .. } => {
                self.out.push('\\');
                self.bindings(bindings);
                self.out.push_str(" -> ");
                self.expr(body);
            }
            Expr::ExtendedLambda {
                where_form,
                clauses,
                ..
            } => {
                if *where_form {
                    self.out.push_str("\\ where");
                    self.indent += self.step;
                    for clause in clauses {
                        self.newline();
                        self.lambda_clause(clause);
                    }
                    self.indent -= self.step;
                    return;
                }
                self.out.push_str("\\ { ");
                for (index, clause) in clauses.iter().enumerate() {
                    if index > 0 {
                        self.out.push_str(" ; ");
                    }
                    self.lambda_clause(clause);
                }
                self.out.push_str(" }");
            }
            Expr::AbsurdLambda { hiding, .. } => {
                let (open, close) = brackets(*hiding);
                self.out.push_str("\\ ");
                self.out.push_str(open);
                self.out.push_str(close);
            }
            Expr::Let { decls, body, .. } => {
                self.out.push_str("let");
                self.block(decls);
                if let Some(body) = body {
                    self.newline();
                    self.out.push_str("in ");
                    self.expr(body);
                }
            }
            Expr::Do { stmts, .. } => {
                self.out.push_str("do");
                self.indent += self.step;
                for stmt in stmts {
                    self.newline();
                    match stmt {
                        DoStmt::Bind { pattern, value, .. } => {
                            self.expr(pattern);
                            self.out.push_str(" <- ");
                            self.expr(value);
                        }
                        DoStmt::Expr { expr, .. } => self.expr(expr),
                    }
                }
                self.indent -= self.step;
            }
            Expr::QuoteGoal { name, body, .. } => {
                self.out.push_str("quoteGoal ");
                self.out.push_str(&name.text);
                self.out.push_str(" in ");
                self.expr(body);
            }
            Expr::Tactic {
                body, alternatives, ..
            } => {
                self.out.push_str("tactic ");
                self.expr(body);
                for alternative in alternatives {
                    self.out.push_str(" | ");
                    self.expr(alternative);
                }
            }
        }
    }

    fn lambda_clause(&mut self, clause: &LambdaClause) {
        self.expr(&clause.lhs);
        if let Some(body) = &clause.body {
            self.out.push_str(" -> ");
            self.expr(body);
        }
    }

    /// Prints `expr` into a separate buffer at the current indentation.
    fn nested(&mut self, expr: &Expr) -> String {
        let mut printer = Printer {
            out: String::new(),
            indent: self.indent,
            step: self.step,
        };
        printer.expr(expr);
        printer.out
    }

    /// `{inner}` with spaces where the braces would otherwise fuse into `{{`/`}}`.
    fn bracketed(&mut self, hiding: Hiding, inner: &str) {
        let (open, close) = brackets(hiding);
        let pad = inner.starts_with('{') || inner.ends_with('}');
        self.out.push_str(open);
        if pad {
            self.out.push(' ');
        }
        self.out.push_str(inner);
        if pad {
            self.out.push(' ');
        }
        self.out.push_str(close);
    }
}

fn brackets(hiding: Hiding) -> (&'static str, &'static str) {
    match hiding {
        Hiding::Visible => ("(", ")"),
        Hiding::Hidden => ("{", "}"),
        Hiding::Instance => ("{{", "}}"),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::surface::parse_source;

    fn reformat(src: &str) -> String {
        let parsed = parse_source(Path::new("test.kanso"), src, 8);
        assert!(
            parsed.diagnostics.is_empty(),
            "unexpected diagnostics: {:?}",
            parsed.diagnostics
        );
        format_decls(&parsed.decls, &parsed.comments, FormatOptions::default())
    }

    #[test]
    fn prints_signature_and_clauses_together() {
        let src = "id : {A : Set} → A → A\nid x = x\n";
        assert_eq!(reformat(src), "id : {A : Set} -> A -> A\nid x = x\n");
    }

    #[test]
    fn data_constructors_are_indented_one_step() {
        let src = "data Nat : Set where\n    zero : Nat\n    suc  : Nat → Nat\n";
        assert_eq!(
            reformat(src),
            "data Nat : Set where\n  zero : Nat\n  suc : Nat -> Nat\n"
        );
    }

    #[test]
    fn flush_module_body_stays_at_column_one() {
        let src = "module Main where\n\nopen import Data.Nat using (ℕ ; zero)\nx = zero\n";
        assert_eq!(
            reformat(src),
            "module Main where\n\nopen import Data.Nat using (ℕ ; zero)\n\nx = zero\n"
        );
    }

    #[test]
    fn let_body_goes_on_its_own_line() {
        let src = "f = let x = 1\n        y = 2\n    in x\n";
        assert_eq!(reformat(src), "f = let\n  x = 1\n  y = 2\nin x\n");
    }

    #[test]
    fn comments_precede_their_declaration() {
        let src = "# identity\nid x = x\n";
        assert_eq!(reformat(src), "# identity\nid x = x\n");
    }

    #[test]
    fn hidden_braces_do_not_fuse() {
        let src = "f = g { {x} }\n";
        assert_eq!(reformat(src), "f = g { {x} }\n");
    }

    #[test]
    fn indent_size_is_configurable() {
        let parsed = parse_source(Path::new("t.kanso"), "postulate\n  A : Set\n", 8);
        let text = format_decls(&parsed.decls, &[], FormatOptions { indent_size: 4 });
        assert_eq!(text, "postulate\n    A : Set\n");
    }
}
