#![no_main]

use libfuzzer_sys::fuzz_target;
use std::path::Path;

use kanso::layout::tokenize;
use kanso::token::TokenKind;

fuzz_target!(|data: &[u8]| {
    // Avoid pathological allocations in the harness itself; libFuzzer will still mutate below this.
    if data.len() > 64 * 1024 {
        return;
    }
    let src = String::from_utf8_lossy(data);
    let tokenized = tokenize(&src, 8);
    let indents = tokenized
        .tokens
        .iter()
        .filter(|token| token.kind == TokenKind::Indent)
        .count();
    let dedents = tokenized
        .tokens
        .iter()
        .filter(|token| token.kind == TokenKind::Dedent)
        .count();
    assert_eq!(indents, dedents, "unbalanced layout blocks");
    let _ = kanso::surface::parse_tokens(Path::new("fuzz.kanso"), tokenized.tokens);
});
