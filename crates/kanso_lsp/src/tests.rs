use kanso::diagnostics::Position as SourcePosition;
use kanso::{KansoConfig, Span};
use tower_lsp::lsp_types::{DiagnosticSeverity, NumberOrString, Position, Range, SymbolKind, Url};

use crate::backend::Backend;
use crate::server::KansoSettings;
use crate::state::BackendState;

fn sample_text() -> &'static str {
    r#"module Sample where

data Nat : Set where
  zero : Nat
  suc : Nat -> Nat

record Pair (A B : Set) : Set where
  constructor pair
  field
    fst : A
    snd : B

infixl 6 _+_

double : Nat -> Nat
double n = n

postulate
  funext : Set
"#
}

fn sample_uri() -> Url {
    Url::parse("file:///test.kanso").expect("valid test uri")
}

fn names(symbols: &[tower_lsp::lsp_types::DocumentSymbol]) -> Vec<&str> {
    symbols.iter().map(|symbol| symbol.name.as_str()).collect()
}

#[test]
fn clean_source_has_no_diagnostics() {
    let diagnostics =
        Backend::build_diagnostics(sample_text(), &sample_uri(), &KansoConfig::default());
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn layout_errors_become_lsp_diagnostics() {
    let text = "data Nat : Set where\nzero : Nat\n";
    let diagnostics = Backend::build_diagnostics(text, &sample_uri(), &KansoConfig::default());
    let diagnostic = diagnostics
        .iter()
        .find(|diag| diag.code == Some(NumberOrString::String("E1101".to_string())))
        .expect("missing block diagnostic");
    assert_eq!(diagnostic.severity, Some(DiagnosticSeverity::ERROR));
    assert_eq!(diagnostic.source.as_deref(), Some("kanso"));
    assert_eq!(diagnostic.range.start, Position::new(1, 0));
}

#[test]
fn spans_map_to_zero_based_exclusive_ranges() {
    let text = "ab\ncd\n  xyz\n";
    let span = Span::new(SourcePosition::new(3, 3, 8), SourcePosition::new(3, 6, 11));
    assert_eq!(
        Backend::span_to_range(text, span),
        Range::new(Position::new(2, 2), Position::new(2, 5))
    );
}

#[test]
fn ranges_count_utf16_code_units() {
    let text = "𝔹 = 𝔹 x\n";
    let span = Span::new(SourcePosition::new(1, 7, 12), SourcePosition::new(1, 8, 13));
    assert_eq!(
        Backend::span_to_range(text, span),
        Range::new(Position::new(0, 8), Position::new(0, 9))
    );
    assert_eq!(
        Backend::full_document_range("𝓁 = 𝓁\n𝓁"),
        Range::new(Position::new(0, 0), Position::new(1, 2))
    );
}

#[test]
fn document_symbols_follow_the_declaration_tree() {
    let symbols =
        Backend::build_document_symbols(sample_text(), &sample_uri(), &KansoConfig::default());
    assert_eq!(names(&symbols), vec!["Sample"]);
    let module = &symbols[0];
    assert_eq!(module.kind, SymbolKind::MODULE);
    let children = module.children.as_deref().expect("module children");
    assert_eq!(
        names(children),
        vec!["Nat", "Pair", "_+_", "double", "postulate"]
    );

    let nat = &children[0];
    assert_eq!(nat.kind, SymbolKind::ENUM);
    let constructors = nat.children.as_deref().expect("constructors");
    assert_eq!(names(constructors), vec!["zero", "suc"]);
    assert!(constructors
        .iter()
        .all(|symbol| symbol.kind == SymbolKind::CONSTRUCTOR));

    let pair = &children[1];
    let members = pair.children.as_deref().expect("record members");
    assert_eq!(names(members), vec!["pair", "fst", "snd"]);
    assert_eq!(members[1].kind, SymbolKind::FIELD);

    assert_eq!(children[2].kind, SymbolKind::OPERATOR);
    assert_eq!(children[2].detail.as_deref(), Some("infixl 6"));
}

#[test]
fn formatting_replaces_the_whole_document() {
    let text = "f   :   Set\n";
    let edits = Backend::build_formatting_edits(text, &KansoConfig::default());
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].new_text, "f : Set\n");
    assert_eq!(
        edits[0].range,
        Range::new(Position::new(0, 0), Position::new(1, 0))
    );
}

#[test]
fn formatting_skips_broken_or_formatted_sources() {
    let config = KansoConfig::default();
    assert!(Backend::build_formatting_edits("data Nat : Set where\nzero : Nat\n", &config).is_empty());
    assert!(Backend::build_formatting_edits("f : Set\n", &config).is_empty());
}

#[test]
fn full_document_range_ends_after_the_last_character() {
    assert_eq!(
        Backend::full_document_range("ab\ncde"),
        Range::new(Position::new(0, 0), Position::new(1, 3))
    );
}

#[test]
fn client_settings_override_the_config() {
    let settings: KansoSettings = serde_json::from_value(serde_json::json!({
        "parse": { "tabWidth": 4 },
        "format": { "indentSize": 3 }
    }))
    .expect("settings");
    let mut state = BackendState::default();
    assert!(settings.apply(&mut state));
    assert_eq!(state.config.parse.tab_width, 4);
    assert_eq!(state.config.format.indent_size, 3);

    let empty: KansoSettings = serde_json::from_value(serde_json::json!({})).expect("settings");
    assert!(!empty.apply(&mut state));
    assert_eq!(state.config.format.indent_size, 3);
}
