use std::path::Path;

use kanso::operators::{Fixity, OperatorEntry, OperatorError, OperatorTable};
use kanso::surface::{parse_source, Decl, DirectiveForm, Expr};
use kanso::FileDiagnostic;

fn parse(src: &str) -> (Vec<Decl>, Vec<FileDiagnostic>) {
    let parsed = parse_source(Path::new("scenario.kanso"), src, 8);
    (parsed.decls, parsed.diagnostics)
}

fn codes(diags: &[FileDiagnostic]) -> Vec<String> {
    diags.iter().map(|d| d.diagnostic.code.clone()).collect()
}

/// Operator tree with explicit grouping, e.g. `((a + b) + c)`.
fn grouping(expr: &Expr) -> String {
    match expr {
        Expr::Ident { name } => name.text.clone(),
        Expr::Paren { inner, .. } => grouping(inner),
        Expr::App { func, arg, .. } => format!("{} {}", grouping(func), grouping(arg)),
        Expr::OpApp { op, operands, .. } => {
            let parts: Vec<String> = operands.iter().map(grouping).collect();
            format!("({})", parts.join(&format!(" {} ", op.text)))
        }
        other => panic!("unexpected expression {other:?}"),
    }
}

fn rhs_of<'a>(decls: &'a [Decl], name: &str) -> &'a Expr {
    decls
        .iter()
        .find_map(|decl| match decl {
            Decl::Function(function) if function.name == name => {
                function.clauses.first().and_then(|clause| clause.rhs.as_ref())
            }
            _ => None,
        })
        .expect("definition with a right-hand side")
}

#[test]
fn signature_and_definition_form_one_function() {
    let (decls, diags) = parse("id : A -> A\nid x = x\n");
    assert!(diags.is_empty(), "{:?}", codes(&diags));
    assert_eq!(decls.len(), 1);
    let Decl::Function(function) = &decls[0] else {
        panic!("expected a function, got {:?}", decls[0]);
    };
    let signature = function.signature.as_ref().expect("type signature");
    assert!(matches!(signature.ty, Expr::Fun { .. }));
    assert_eq!(function.clauses.len(), 1);
    assert!(matches!(
        function.clauses[0].rhs,
        Some(Expr::Ident { ref name }) if name.text == "x"
    ));
}

#[test]
fn indented_constructors_belong_to_the_data_block() {
    let (decls, diags) = parse("data Nat : Set where\n  zero : Nat\n  suc : Nat -> Nat\n");
    assert!(diags.is_empty(), "{:?}", codes(&diags));
    let Decl::Data(data) = &decls[0] else {
        panic!("expected data");
    };
    let constructors = data.constructors.as_ref().expect("constructor block");
    assert_eq!(constructors.len(), 2);
}

#[test]
fn unindented_constructors_are_a_layout_error() {
    let (decls, diags) = parse("data Nat : Set where\nzero : Nat\nsuc : Nat -> Nat\n");
    assert_eq!(codes(&diags), vec!["E1101"]);
    let Decl::Data(data) = &decls[0] else {
        panic!("expected data");
    };
    assert!(data.constructors.as_ref().is_some_and(Vec::is_empty));
    assert!(decls[1..]
        .iter()
        .all(|decl| matches!(decl, Decl::TypeSignature(_))));
}

#[test]
fn associativity_follows_the_fixity_declaration() {
    let (left, left_diags) = parse("infixl 5 +\nx = a + b + c\n");
    let (right, right_diags) = parse("infixr 5 +\nx = a + b + c\n");
    assert!(left_diags.is_empty() && right_diags.is_empty());
    assert_eq!(grouping(rhs_of(&left, "x")), "((a + b) + c)");
    assert_eq!(grouping(rhs_of(&right, "x")), "(a + (b + c))");
}

#[test]
fn tighter_operators_group_first() {
    let (decls, diags) = parse("infixl 6 _+_\ninfixl 7 _*_\nx = f a + b * c\n");
    assert!(diags.is_empty(), "{:?}", codes(&diags));
    assert_eq!(grouping(rhs_of(&decls, "x")), "(f a + (b * c))");
}

#[test]
fn misplaced_record_directive_is_reported_and_the_record_survives() {
    let src = "record R : Set where\n  field : A\n  constructor Mk\n  other : B\n";
    let (decls, diags) = parse(src);
    assert_eq!(codes(&diags), vec!["E1203"]);
    let Decl::Record(record) = &decls[0] else {
        panic!("expected record");
    };
    assert_eq!(record.directives.len(), 1);
    assert_eq!(record.directives[0].form, DirectiveForm::Constructor);
    assert_eq!(
        record.directives[0].name.as_ref().map(|n| n.text.as_str()),
        Some("Mk")
    );
    assert_eq!(record.body.as_ref().map(Vec::len), Some(2));
}

#[test]
fn duplicate_fixity_is_rejected_no_matter_how_often_it_was_looked_up() {
    let mut table = OperatorTable::new();
    table
        .declare(OperatorEntry::new("_+_", Fixity::InfixL, 6))
        .expect("first declaration");
    for _ in 0..3 {
        let entry = table.lookup("+").expect("declared operator");
        assert_eq!(entry.precedence, 6);
        assert_eq!(entry.fixity, Fixity::InfixL);
    }
    let err = table
        .declare(OperatorEntry::new("+", Fixity::InfixR, 2))
        .expect_err("duplicate");
    assert!(matches!(err, OperatorError::Duplicate { .. }));
    assert_eq!(table.lookup("+").map(|e| e.fixity), Some(Fixity::InfixL));
}

#[test]
fn inner_scopes_shadow_and_then_disappear() {
    let mut table = OperatorTable::new();
    table
        .declare(OperatorEntry::new("_∘_", Fixity::InfixR, 9))
        .expect("outer");
    table.push_scope();
    table
        .declare(OperatorEntry::new("_∘_", Fixity::InfixL, 1))
        .expect("inner shadows outer");
    assert_eq!(table.lookup("∘").map(|e| e.precedence), Some(1));
    table.pop_scope();
    assert_eq!(table.lookup("∘").map(|e| e.precedence), Some(9));
}

#[test]
fn one_bad_declaration_does_not_stop_the_file() {
    let src = "good : Set\nbad = = x\nalso-good : Set\n";
    let (decls, diags) = parse(src);
    assert!(!diags.is_empty());
    let names: Vec<&str> = decls
        .iter()
        .filter_map(|decl| match decl {
            Decl::TypeSignature(sig) => sig.names.first().map(|n| n.text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["good", "also-good"]);
}

#[test]
fn attributes_do_not_change_the_declaration_kind() {
    let (decls, diags) = parse("@0 f : Set\n@irr g = h\n");
    assert!(diags.is_empty(), "{:?}", codes(&diags));
    let Decl::TypeSignature(sig) = &decls[0] else {
        panic!("expected signature, got {:?}", decls[0]);
    };
    assert_eq!(sig.attributes.len(), 1);
    let Decl::Function(function) = &decls[1] else {
        panic!("expected function");
    };
    assert_eq!(function.clauses[0].attributes.len(), 1);
}
