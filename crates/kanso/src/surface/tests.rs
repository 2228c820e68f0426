use std::path::Path;
use std::sync::atomic::AtomicBool;

use crate::diagnostics::FileDiagnostic;
use crate::operators::{Fixity, OperatorEntry, OperatorTable};
use crate::surface::{
    parse_expression, parse_source, parse_source_with_cancel, Decl, DirectiveForm, DoStmt, Expr,
    Hiding, ImportDirective,
};

fn diag_codes(diags: &[FileDiagnostic]) -> Vec<String> {
    let mut codes: Vec<String> = diags.iter().map(|d| d.diagnostic.code.clone()).collect();
    codes.sort();
    codes
}

fn parse_ok(src: &str) -> Vec<Decl> {
    let parsed = parse_source(Path::new("test.kanso"), src, 8);
    assert!(
        parsed.diagnostics.is_empty(),
        "unexpected diagnostics: {:?}",
        diag_codes(&parsed.diagnostics)
    );
    parsed.decls
}

/// Renders an expression with every application and operator node parenthesised.
fn shape(expr: &Expr) -> String {
    match expr {
        Expr::Ident { name } => name.text.clone(),
        Expr::Integer { text, .. } => text.clone(),
        Expr::App { func, arg, .. } => format!("({} {})", shape(func), shape(arg)),
        Expr::OpApp {
            operator, operands, ..
        } => {
            let parts: Vec<String> = operands.iter().map(shape).collect();
            format!("[{operator} {}]", parts.join(" "))
        }
        Expr::Paren { inner, .. } => shape(inner),
        Expr::Fun {
            domain, codomain, ..
        } => format!("({} -> {})", shape(domain), shape(codomain)),
        other => format!("<{}>", serde_json::to_value(other).map_or_else(
            |_| "?".to_string(),
            |value| value["kind"].as_str().unwrap_or("?").to_string(),
        )),
    }
}

fn clause_rhs(decls: &[Decl], name: &str) -> Expr {
    decls
        .iter()
        .find_map(|decl| match decl {
            Decl::Function(function) if function.name == name => {
                function.clauses.first().and_then(|c| c.rhs.clone())
            }
            _ => None,
        })
        .expect("clause with right-hand side")
}

#[test]
fn signature_and_clause_group_into_a_function() {
    let decls = parse_ok("id : A -> A\nid x = x\n");
    assert_eq!(decls.len(), 1);
    let Decl::Function(function) = &decls[0] else {
        panic!("expected function, got {:?}", decls[0]);
    };
    assert_eq!(function.name, "id");
    let signature = function.signature.as_ref().expect("signature");
    assert_eq!(shape(&signature.ty), "(A -> A)");
    assert_eq!(function.clauses.len(), 1);
    assert_eq!(shape(&function.clauses[0].lhs), "(id x)");
    assert_eq!(
        function.clauses[0].rhs.as_ref().map(shape).as_deref(),
        Some("x")
    );
}

#[test]
fn consecutive_clauses_join_one_function() {
    let decls = parse_ok("not : Bool → Bool\nnot true = false\nnot false = true\nother = 1\n");
    assert_eq!(decls.len(), 2);
    let Decl::Function(function) = &decls[0] else {
        panic!("expected function");
    };
    assert_eq!(function.clauses.len(), 2);
    assert!(matches!(&decls[1], Decl::Function(f) if f.signature.is_none()));
}

#[test]
fn data_with_indented_constructors() {
    let decls = parse_ok("data Nat : Set where\n  zero : Nat\n  suc : Nat -> Nat\n");
    let Decl::Data(data) = &decls[0] else {
        panic!("expected data declaration");
    };
    assert_eq!(data.name.text, "Nat");
    let constructors = data.constructors.as_ref().expect("constructors");
    assert_eq!(constructors.len(), 2);
    assert!(constructors
        .iter()
        .all(|c| matches!(c, Decl::TypeSignature(_))));
}

#[test]
fn data_constructors_at_column_one_are_a_layout_error() {
    let src = "data Nat : Set where\nzero : Nat\nsuc : Nat -> Nat\n";
    let parsed = parse_source(Path::new("test.kanso"), src, 8);
    assert_eq!(diag_codes(&parsed.diagnostics), vec!["E1101"]);
    let Decl::Data(data) = &parsed.decls[0] else {
        panic!("expected data declaration");
    };
    assert_eq!(data.constructors.as_ref().map(Vec::len), Some(0));
    assert_eq!(parsed.decls.len(), 3);
}

#[test]
fn fixity_decides_the_tree_shape() {
    let left = parse_ok("infixl 5 _+_\nx = a + b + c\n");
    let right = parse_ok("infixr 5 _+_\nx = a + b + c\n");
    assert_eq!(shape(&clause_rhs(&left, "x")), "[_+_ [_+_ a b] c]");
    assert_eq!(shape(&clause_rhs(&right, "x")), "[_+_ a [_+_ b c]]");
}

#[test]
fn precedence_levels_nest_and_application_binds_tightest() {
    let decls = parse_ok("infixl 6 _+_\ninfixl 7 _*_\nx = f a + b * c\n");
    assert_eq!(shape(&clause_rhs(&decls, "x")), "[_+_ (f a) [_*_ b c]]");
}

#[test]
fn undeclared_operators_are_plain_identifiers() {
    let decls = parse_ok("x = a + b\n");
    assert_eq!(shape(&clause_rhs(&decls, "x")), "((a +) b)");
}

#[test]
fn prefix_operators_take_the_run_after_them() {
    let decls = parse_ok("infix 3 ¬_\ninfixr 6 _∧_\nx = ¬ a ∧ b\n");
    assert_eq!(shape(&clause_rhs(&decls, "x")), "[¬_ [_∧_ a b]]");
}

#[test]
fn mixed_associativity_at_one_level_is_ambiguous() {
    let src = "infixl 5 _+_\ninfixr 5 _∷_\nx = a + b ∷ c\n";
    let parsed = parse_source(Path::new("test.kanso"), src, 8);
    assert_eq!(diag_codes(&parsed.diagnostics), vec!["E1301"]);
    assert_eq!(shape(&clause_rhs(&parsed.decls, "x")), "[_∷_ [_+_ a b] c]");
}

#[test]
fn chained_non_associative_operator_is_ambiguous() {
    let parsed = parse_source(
        Path::new("test.kanso"),
        "infix 4 _≡_\nx = a ≡ b ≡ c\ny = (a ≡ b) ≡ c\n",
        8,
    );
    assert_eq!(diag_codes(&parsed.diagnostics), vec!["E1301"]);
}

#[test]
fn duplicate_fixity_is_an_error_node() {
    let src = "infixl 6 _+_\ninfixr 6 _+_\nx = a + b + c\n";
    let parsed = parse_source(Path::new("test.kanso"), src, 8);
    assert_eq!(diag_codes(&parsed.diagnostics), vec!["E1300"]);
    assert!(parsed.decls[1].is_error());
    assert_eq!(shape(&clause_rhs(&parsed.decls, "x")), "[_+_ [_+_ a b] c]");
}

#[test]
fn invalid_precedence_is_reported() {
    let parsed = parse_source(Path::new("test.kanso"), "infixl 99999999999 _+_\n", 8);
    assert_eq!(diag_codes(&parsed.diagnostics), vec!["E1302"]);
}

#[test]
fn fixities_are_scoped_to_their_block() {
    let src = "f = a + b\n  where\n    infixl 6 _+_\n    g = a + b\nh = a + b\n";
    let decls = parse_ok(src);
    assert_eq!(shape(&clause_rhs(&decls, "f")), "((a +) b)");
    assert_eq!(shape(&clause_rhs(&decls, "h")), "((a +) b)");
    let Decl::Function(f) = &decls[0] else {
        panic!("expected function");
    };
    let inner = &f.clauses[0].where_block.as_ref().expect("where block").decls;
    assert_eq!(shape(&clause_rhs(inner, "g")), "[_+_ a b]");
}

#[test]
fn record_directive_after_field_is_misplaced() {
    let src = "record R : Set where\n  field : A\n  constructor Mk\n  x = 1\n";
    let parsed = parse_source(Path::new("test.kanso"), src, 8);
    assert_eq!(diag_codes(&parsed.diagnostics), vec!["E1203"]);
    let Decl::Record(record) = &parsed.decls[0] else {
        panic!("expected record");
    };
    assert_eq!(record.directives.len(), 1);
    assert_eq!(record.directives[0].form, DirectiveForm::Constructor);
    assert_eq!(record.body.as_ref().map(Vec::len), Some(2));
}

#[test]
fn record_directives_before_fields() {
    let src = "record Pair (A B : Set) : Set where\n  instance\n    constructor _,_\n  no-eta-equality\n  field\n    fst : A\n    snd : B\n";
    let decls = parse_ok(src);
    let Decl::Record(record) = &decls[0] else {
        panic!("expected record");
    };
    assert_eq!(record.params.len(), 1);
    assert_eq!(record.params[0].names.len(), 2);
    assert_eq!(record.directives.len(), 2);
    assert!(record.directives[0].instance);
    assert_eq!(record.directives[1].form, DirectiveForm::NoEtaEquality);
}

#[test]
fn flush_module_owns_the_rest_of_the_file() {
    let decls = parse_ok("module Main where\n\nimport A\nx = 1\n");
    assert_eq!(decls.len(), 1);
    let Decl::Module(module) = &decls[0] else {
        panic!("expected module");
    };
    assert!(module.flush);
    assert_eq!(module.body.len(), 2);
}

#[test]
fn open_import_with_every_directive() {
    let src = "open import Data.List as L public using (map ; module All) hiding (foldr) renaming (_++_ to _⊕_ ; module Any to Some)\n";
    let decls = parse_ok(src);
    let Decl::Import(import) = &decls[0] else {
        panic!("expected import");
    };
    assert!(import.open && import.import);
    assert_eq!(import.module.text, "Data.List");
    assert_eq!(import.alias.as_ref().map(|n| n.text.as_str()), Some("L"));
    assert_eq!(import.directives.len(), 4);
    let ImportDirective::Renaming { renamings, .. } = &import.directives[3] else {
        panic!("expected renaming");
    };
    assert_eq!(renamings[1].to.text, "Some");
    assert!(renamings[1].from.module);
}

#[test]
fn module_macro_with_instance_ellipsis() {
    let decls = parse_ok("open module M = N {{...}}\nmodule P (A : Set) = Q A using (f)\n");
    let Decl::ModuleMacro(open) = &decls[0] else {
        panic!("expected module macro");
    };
    assert!(open.open && open.application.instance_ellipsis);
    let Decl::ModuleMacro(plain) = &decls[1] else {
        panic!("expected module macro");
    };
    assert_eq!(plain.application.args.len(), 1);
    assert_eq!(plain.directives.len(), 1);
}

#[test]
fn malformed_declaration_recovers_at_next_line() {
    let src = "f = \ng : A\n) oops\nh = 2\n";
    let parsed = parse_source(Path::new("test.kanso"), src, 8);
    assert!(!parsed.diagnostics.is_empty());
    assert!(parsed.decls.iter().any(Decl::is_error));
    assert!(parsed
        .decls
        .iter()
        .any(|d| matches!(d, Decl::Function(f) if f.name == "h")));
}

#[test]
fn lambdas_and_telescopes() {
    let decls = parse_ok(
        "f : (x y : A) {z : B} → ∀ {C} → C\nf = λ x → λ where\n  zero → a\n  (suc n) → b\ng = λ { (x , y) → x ; _ → c }\nh = λ ()\n",
    );
    let Decl::Function(f) = &decls[0] else {
        panic!("expected function");
    };
    let Some(Expr::Pi {
        forall: false,
        bindings,
        body,
        ..
    }) = f.signature.as_ref().map(|s| &s.ty)
    else {
        panic!("expected telescope");
    };
    assert_eq!(bindings.len(), 2);
    assert_eq!(bindings[1].hiding, Hiding::Hidden);
    assert!(matches!(body.as_ref(), Expr::Pi { forall: true, .. }));
    assert!(matches!(
        clause_rhs(&decls, "g"),
        Expr::ExtendedLambda {
            where_form: false,
            ref clauses,
            ..
        } if clauses.len() == 2
    ));
    assert!(matches!(
        clause_rhs(&decls, "h"),
        Expr::AbsurdLambda {
            hiding: Hiding::Visible,
            ..
        }
    ));
}

#[test]
fn do_block_with_binds_and_let() {
    let decls = parse_ok("main = do\n  x ← getLine\n  let y = x\n  putStrLn y\n");
    let Expr::Do { stmts, .. } = clause_rhs(&decls, "main") else {
        panic!("expected do block");
    };
    assert_eq!(stmts.len(), 3);
    assert!(matches!(stmts[0], DoStmt::Bind { .. }));
    assert!(matches!(
        &stmts[1],
        DoStmt::Expr {
            expr: Expr::Let { body: None, .. },
            ..
        }
    ));
}

#[test]
fn with_clauses_and_guards() {
    let decls = parse_ok("f x with p x | q\n... | true | _ = a\n... | false | _ = b\n");
    let Decl::Function(f) = &decls[0] else {
        panic!("expected function");
    };
    assert_eq!(f.clauses.len(), 3);
    assert_eq!(f.clauses[0].with_exprs.len(), 2);
    assert!(matches!(f.clauses[1].lhs, Expr::Guarded { ref guards, .. } if guards.len() == 2));
}

#[test]
fn atoms_cover_literals_and_brackets() {
    let decls = parse_ok(
        "x = f 0x1F -3 2.5e3 \"s\" Set₁ _ .y (| a b |) {{i}} {n = 1} record r { a = 1 ; b = 2 } p@(q r) quote z\n",
    );
    let rhs = clause_rhs(&decls, "x");
    let mut args = Vec::new();
    let mut head = &rhs;
    while let Expr::App { func, arg, .. } = head {
        args.push(arg.as_ref());
        head = func;
    }
    args.reverse();
    let kinds: Vec<String> = args
        .iter()
        .map(|e| {
            serde_json::to_value(e).expect("serialisable")["kind"]
                .as_str()
                .unwrap_or_default()
                .to_string()
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "integer", "integer", "float", "string", "universe", "wildcard", "dot", "idiom",
            "braces", "named_arg", "record", "as_pattern", "quote", "ident"
        ]
    );
}

#[test]
fn parse_expression_uses_the_given_table() {
    let mut table = OperatorTable::new();
    table
        .declare(OperatorEntry::new("_∘_", Fixity::InfixR, 9))
        .expect("fresh operator");
    let (expr, diags) = parse_expression("f ∘ g ∘ h", &table);
    assert!(diags.is_empty());
    assert_eq!(shape(&expr.expect("expression")), "[_∘_ f [_∘_ g h]]");

    let (_, diags) = parse_expression("f g )", &table);
    assert!(diags.iter().any(|d| d.code == "E1205" || d.code == "E1003"));
}

#[test]
fn cancellation_stops_between_declarations() {
    let flag = AtomicBool::new(true);
    let parsed =
        parse_source_with_cancel(Path::new("test.kanso"), "x = 1\ny = 2\n", 8, Some(&flag));
    assert!(parsed.cancelled);
    assert!(parsed.decls.is_empty());
}

#[test]
fn pragmas_syntax_and_pattern_synonyms() {
    let decls = parse_ok(
        "{-# CATCHALL #-}\nsyntax Σ A (λ x → B) = Σ[ x ∈ A ] B\npattern two = suc (suc zero)\nunquoteDecl f g = mk f g\n",
    );
    assert!(matches!(&decls[0], Decl::Pragma(p) if p.catchall));
    let Decl::Syntax(syntax) = &decls[1] else {
        panic!("expected syntax declaration");
    };
    assert_eq!(syntax.holes.len(), 2);
    assert!(syntax.holes[1].binder.is_some());
    assert!(matches!(&decls[2], Decl::PatternSynonym(_)));
    assert!(matches!(&decls[3], Decl::Unquote(u) if u.names.len() == 2));
}

#[test]
fn long_arrow_chains_fold_to_the_right() {
    let source = format!("T : {}A\n", "A -> ".repeat(2000));
    let decls = parse_ok(&source);
    let Decl::TypeSignature(sig) = &decls[0] else {
        panic!("expected type signature");
    };
    let mut arrows = 0;
    let mut current = &sig.ty;
    while let Expr::Fun { domain, codomain, .. } = current {
        assert!(matches!(domain.as_ref(), Expr::Ident { .. }));
        arrows += 1;
        current = codomain;
    }
    assert_eq!(arrows, 2000);

    let decls = parse_ok("U : (x : A) -> {y : B} (z : C) -> A -> x\n");
    let Decl::TypeSignature(sig) = &decls[0] else {
        panic!("expected type signature");
    };
    let Expr::Pi { bindings, body, .. } = &sig.ty else {
        panic!("expected telescope");
    };
    assert_eq!(bindings.len(), 1);
    assert!(matches!(body.as_ref(), Expr::Pi { bindings, .. } if bindings.len() == 2));
}

#[test]
fn deeply_nested_parentheses_are_reported_not_overflowed() {
    let depth = 3000;
    let source = format!("x = {}y{}\nz = y\n", "(".repeat(depth), ")".repeat(depth));
    let parsed = parse_source(Path::new("test.kanso"), &source, 8);
    assert_eq!(diag_codes(&parsed.diagnostics), vec!["E1206".to_string()]);
    assert!(parsed.decls[0].is_error());
    assert!(matches!(&parsed.decls[1], Decl::Function(f) if f.name == "z"));

    let shallow = format!("x = {}y{}\n", "(".repeat(50), ")".repeat(50));
    parse_ok(&shallow);
}

#[test]
fn relevance_markers_stay_on_their_names() {
    let decls = parse_ok("f : {.x y : A} -> (..z : B) -> A\n");
    let Decl::TypeSignature(sig) = &decls[0] else {
        panic!("expected type signature");
    };
    let Expr::Pi { bindings, body, .. } = &sig.ty else {
        panic!("expected telescope");
    };
    assert_eq!(
        bindings[0].name_relevance,
        vec![Some(".".to_string()), None]
    );
    let Expr::Pi { bindings, .. } = body.as_ref() else {
        panic!("expected second telescope");
    };
    assert_eq!(bindings[0].name_relevance, vec![Some("..".to_string())]);

    let decls = parse_ok("g : {x y : A} -> A\n");
    let Decl::TypeSignature(sig) = &decls[0] else {
        panic!("expected type signature");
    };
    let Expr::Pi { bindings, .. } = &sig.ty else {
        panic!("expected telescope");
    };
    assert!(bindings[0].name_relevance.is_empty());
}
