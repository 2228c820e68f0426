use kanso::layout::tokenize;
use kanso::token::{Token, TokenKind};

const CORPUS: &[&str] = &[
    "id : A -> A\nid x = x\n",
    "data Nat : Set where\n  zero : Nat\n  suc : Nat -> Nat\n\nplus : Nat -> Nat -> Nat\nplus zero n = n\nplus (suc m) n = suc (plus m n)\n",
    "module M where\n\nf = g\n  where\n    g = h\n      where\n        h = zero\n\nrecord R : Set where\n  field\n    x : A\n",
    "main = do\n  x <- getLine\n  let y = x\n      z = y\n  putStrLn z\n\nk = let a = 1 in a\n",
    "postulate\n  A : Set\n  B : Set\nmutual\n  even : Nat -> Bool\n  even zero = true\n  odd : Nat -> Bool\n  odd zero = false\n",
    "f = \\ where\n  zero -> a\n  (suc n) -> b\ng = (let x = 1\n         y = 2\n     in x)\n",
];

fn count(tokens: &[Token], kind: TokenKind) -> usize {
    tokens.iter().filter(|token| token.kind == kind).count()
}

/// Tokens up to the last one taken from the source text.
fn without_trailing_layout(tokens: &[Token]) -> &[Token] {
    let end = tokens
        .iter()
        .rposition(|token| !token.is_layout() && token.kind != TokenKind::Eof)
        .map_or(0, |index| index + 1);
    &tokens[..end]
}

/// Byte offsets of lines that start a new top-level declaration.
fn declaration_boundaries(source: &str) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut offset = 0;
    for line in source.split_inclusive('\n') {
        let starts_decl = line
            .chars()
            .next()
            .is_some_and(|ch| !ch.is_whitespace() && ch != '#');
        if offset > 0 && starts_decl {
            offsets.push(offset);
        }
        offset += line.len();
    }
    offsets
}

#[test]
fn every_indent_is_closed_by_a_dedent() {
    for source in CORPUS {
        let tokenized = tokenize(source, 8);
        assert!(
            tokenized.diagnostics.is_empty(),
            "{source:?}: {:?}",
            tokenized.diagnostics
        );
        let indents = count(&tokenized.tokens, TokenKind::Indent);
        assert!(indents > 0 || !source.contains("where"), "{source:?}");
        assert_eq!(
            indents,
            count(&tokenized.tokens, TokenKind::Dedent),
            "{source:?}"
        );
        assert_eq!(
            tokenized.tokens.last().map(|t| t.kind),
            Some(TokenKind::Eof)
        );
    }
}

#[test]
fn nesting_depth_does_not_unbalance_blocks() {
    for depth in 1..8 {
        let mut source = String::from("f = a\n");
        for level in 1..=depth {
            let pad = " ".repeat(level * 4 - 2);
            source.push_str(&format!("{pad}where\n{pad}  a{level} = b\n"));
        }
        source.push_str("g = c\n");
        let tokenized = tokenize(&source, 8);
        assert!(tokenized.diagnostics.is_empty(), "{source}");
        assert_eq!(count(&tokenized.tokens, TokenKind::Indent), depth);
        assert_eq!(count(&tokenized.tokens, TokenKind::Dedent), depth);
    }
}

#[test]
fn truncating_at_a_declaration_keeps_the_token_prefix() {
    for source in CORPUS {
        let full = tokenize(source, 8).tokens;
        for boundary in declaration_boundaries(source) {
            let truncated = tokenize(&source[..boundary], 8);
            assert_eq!(
                count(&truncated.tokens, TokenKind::Indent),
                count(&truncated.tokens, TokenKind::Dedent),
                "{:?}",
                &source[..boundary]
            );
            let prefix = without_trailing_layout(&truncated.tokens);
            assert!(!prefix.is_empty());
            assert_eq!(prefix, &full[..prefix.len()], "{:?}", &source[..boundary]);
        }
    }
}

#[test]
fn misaligned_dedent_is_recoverable() {
    let source = "f = a\n    where\n      a = b\n        c = d\n     e = g\nh = i\n";
    let tokenized = tokenize(source, 8);
    assert!(tokenized
        .diagnostics
        .iter()
        .any(|diag| diag.code == "E1100"));
    assert!(tokenized
        .tokens
        .iter()
        .any(|token| token.kind == TokenKind::Error));
    assert!(tokenized.tokens.iter().any(|token| token.text == "h"));
    assert_eq!(
        count(&tokenized.tokens, TokenKind::Indent),
        count(&tokenized.tokens, TokenKind::Dedent)
    );
}
