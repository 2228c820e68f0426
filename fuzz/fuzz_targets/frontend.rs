#![no_main]

use libfuzzer_sys::fuzz_target;
use std::path::Path;

use kanso::formatter::{format_decls, FormatOptions};

fuzz_target!(|data: &[u8]| {
    if data.len() > 32 * 1024 {
        return;
    }
    let src = String::from_utf8_lossy(data);
    let parsed = kanso::parse_source(Path::new("fuzz.kanso"), &src, 8);
    if parsed.diagnostics.iter().any(|diag| diag.diagnostic.is_error()) {
        return;
    }

    // Printing a clean parse must give a source that parses cleanly and prints the same.
    let printed = format_decls(&parsed.decls, &[], FormatOptions::default());
    let reparsed = kanso::parse_source(Path::new("fuzz.kanso"), &printed, 8);
    assert!(
        !reparsed.diagnostics.iter().any(|diag| diag.diagnostic.is_error()),
        "printed source does not parse:\n{printed}"
    );
    let reprinted = format_decls(&reparsed.decls, &[], FormatOptions::default());
    assert_eq!(printed, reprinted);
});
