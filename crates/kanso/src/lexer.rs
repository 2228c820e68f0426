use crate::diagnostics::{Diagnostic, DiagnosticKind, Position, Span};
use crate::syntax;
use crate::token::{Token, TokenKind};

pub const DEFAULT_TAB_WIDTH: usize = 8;

struct Cursor {
    chars: Vec<char>,
    index: usize,
    line: usize,
    column: usize,
    offset: usize,
    tab_width: usize,
}

impl Cursor {
    fn new(content: &str, tab_width: usize) -> Self {
        Self {
            chars: content.chars().collect(),
            index: 0,
            line: 1,
            column: 1,
            offset: 0,
            tab_width: tab_width.max(1),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.index + ahead).copied()
    }

    fn starts_with(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, ch)| self.peek_at(i) == Some(ch))
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.column, self.offset)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.index += 1;
        self.offset += ch.len_utf8();
        match ch {
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            '\t' => {
                self.column = ((self.column - 1) / self.tab_width + 1) * self.tab_width + 1;
            }
            _ => self.column += 1,
        }
        Some(ch)
    }

    fn advance_by(&mut self, count: usize) -> String {
        let mut text = String::new();
        for _ in 0..count {
            match self.advance() {
                Some(ch) => text.push(ch),
                None => break,
            }
        }
        text
    }

    fn text_between(&self, start: usize, end: usize) -> String {
        self.chars[start..end.min(self.chars.len())].iter().collect()
    }
}

/// Splits `content` into tokens. Whitespace is dropped; comments are kept as
/// `TokenKind::Comment` tokens so callers can retain their spans, and the stream always
/// ends with a single `Eof` token.
pub fn lex(content: &str, tab_width: usize) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut tokens = Vec::new();
    let mut diagnostics = Vec::new();
    let mut cursor = Cursor::new(content, tab_width);
    let mut at_line_start = true;
    let mut tab_reported_line = 0usize;

    while let Some(ch) = cursor.peek() {
        if ch == '\n' {
            cursor.advance();
            at_line_start = true;
            continue;
        }
        if ch.is_whitespace() {
            if ch == '\t' && at_line_start && tab_reported_line != cursor.line {
                let start = cursor.pos();
                cursor.advance();
                tab_reported_line = start.line;
                diagnostics.push(Diagnostic::warning(
                    "W1103",
                    DiagnosticKind::Layout,
                    format!(
                        "tab in indentation; counted up to the next multiple of {}",
                        cursor.tab_width
                    ),
                    Span::new(start, cursor.pos()),
                ));
                continue;
            }
            cursor.advance();
            continue;
        }
        at_line_start = false;
        let start = cursor.pos();

        if ch == '#' {
            let mut text = String::new();
            while let Some(next) = cursor.peek() {
                if next == '\n' {
                    break;
                }
                text.push(next);
                cursor.advance();
            }
            tokens.push(Token::new(
                TokenKind::Comment,
                text.trim_end(),
                Span::new(start, cursor.pos()),
            ));
            continue;
        }

        if cursor.starts_with("{-#") {
            lex_pragma(&mut cursor, &mut tokens, &mut diagnostics);
            continue;
        }

        if ch == '"' {
            lex_string(&mut cursor, &mut tokens, &mut diagnostics);
            continue;
        }

        if let Some((symbol, len)) = match_bracket(&cursor) {
            cursor.advance_by(len);
            tokens.push(Token::new(
                TokenKind::Symbol,
                symbol,
                Span::new(start, cursor.pos()),
            ));
            continue;
        }

        if let Some(len) = syntax::identifier_run(&cursor.chars, cursor.index) {
            let text = cursor.advance_by(len);
            let token = classify_run(&mut cursor, text, start);
            tokens.push(token);
            continue;
        }

        if ch == '\\' {
            cursor.advance();
            tokens.push(Token::new(
                TokenKind::Symbol,
                "\\",
                Span::new(start, cursor.pos()),
            ));
            continue;
        }

        cursor.advance();
        let span = Span::new(start, cursor.pos());
        diagnostics.push(Diagnostic::error(
            "E1000",
            DiagnosticKind::Lex,
            format!("unexpected character '{ch}'"),
            span,
        ));
        tokens.push(Token::new(TokenKind::Error, ch.to_string(), span));
    }

    tokens.push(Token::synthetic(TokenKind::Eof, cursor.pos()));
    (tokens, diagnostics)
}

/// Comments are dropped from the layout stream but their spans stay available.
pub fn split_comments(tokens: Vec<Token>) -> (Vec<Token>, Vec<Token>) {
    tokens
        .into_iter()
        .partition(|token| token.kind != TokenKind::Comment)
}

fn lex_pragma(cursor: &mut Cursor, tokens: &mut Vec<Token>, diagnostics: &mut Vec<Diagnostic>) {
    let start = cursor.pos();
    let start_index = cursor.index;
    cursor.advance_by(3);
    let mut closed = false;
    while cursor.peek().is_some() {
        if cursor.starts_with("#-}") {
            cursor.advance_by(3);
            closed = true;
            break;
        }
        cursor.advance();
    }
    let span = Span::new(start, cursor.pos());
    let text = cursor.text_between(start_index, cursor.index);
    if !closed {
        diagnostics.push(
            Diagnostic::error("E1002", DiagnosticKind::Lex, "unterminated pragma", span)
                .with_label("pragma started here", Span::new(start, start)),
        );
    }
    tokens.push(Token::new(TokenKind::Pragma, text, span));
}

fn lex_string(cursor: &mut Cursor, tokens: &mut Vec<Token>, diagnostics: &mut Vec<Diagnostic>) {
    let start = cursor.pos();
    let start_index = cursor.index;
    cursor.advance();
    let mut closed = false;
    while let Some(ch) = cursor.peek() {
        if ch == '\n' {
            break;
        }
        if ch == '\\' && cursor.peek_at(1).is_some_and(|next| next != '\n') {
            cursor.advance_by(2);
            continue;
        }
        cursor.advance();
        if ch == '"' {
            closed = true;
            break;
        }
    }
    let span = Span::new(start, cursor.pos());
    let text = cursor.text_between(start_index, cursor.index);
    if !closed {
        diagnostics.push(
            Diagnostic::error("E1001", DiagnosticKind::Lex, "unterminated string literal", span)
                .with_label("string literal started here", Span::new(start, start)),
        );
    }
    tokens.push(Token::new(TokenKind::String, text, span));
}

fn match_bracket(cursor: &Cursor) -> Option<(&'static str, usize)> {
    let ch = cursor.peek()?;
    let next = cursor.peek_at(1);
    let symbol = match ch {
        '(' if next == Some('|')
            && cursor
                .peek_at(2)
                .is_none_or(|after| after.is_whitespace()) =>
        {
            ("(|", 2)
        }
        '(' => ("(", 1),
        ')' => (")", 1),
        '{' if next == Some('{') => ("{{", 2),
        '{' => ("{", 1),
        '}' if next == Some('}') => ("}}", 2),
        '}' => ("}", 1),
        '⦃' => ("{{", 1),
        '⦄' => ("}}", 1),
        '⦇' => ("(|", 1),
        '⦈' => ("|)", 1),
        '|' if next == Some(')') => ("|)", 2),
        ';' => (";", 1),
        '@' => ("@", 1),
        '.' if cursor.starts_with("...") => ("...", 3),
        '.' if next == Some('.') => ("..", 2),
        '.' => (".", 1),
        _ => return None,
    };
    Some(symbol)
}

fn classify_run(cursor: &mut Cursor, text: String, start: Position) -> Token {
    if let Some(canonical) = syntax::reserved_run(&text) {
        let kind = if canonical == "forall" {
            TokenKind::Keyword
        } else {
            TokenKind::Symbol
        };
        return Token::new(kind, canonical, Span::new(start, cursor.pos()));
    }
    if syntax::is_keyword(&text) {
        return Token::new(TokenKind::Keyword, text, Span::new(start, cursor.pos()));
    }
    if syntax::is_integer_text(&text) {
        if cursor.peek() == Some('.')
            && cursor.peek_at(1).is_some_and(|ch| ch.is_ascii_digit())
        {
            if let Some(len) = syntax::identifier_run(&cursor.chars, cursor.index + 1) {
                let fraction = cursor.text_between(cursor.index + 1, cursor.index + 1 + len);
                if syntax::is_fraction_text(&fraction) {
                    cursor.advance_by(len + 1);
                    return Token::new(
                        TokenKind::Float,
                        format!("{text}.{fraction}"),
                        Span::new(start, cursor.pos()),
                    );
                }
            }
        }
        return Token::new(TokenKind::Integer, text, Span::new(start, cursor.pos()));
    }
    if syntax::is_exponent_float_text(&text) {
        return Token::new(TokenKind::Float, text, Span::new(start, cursor.pos()));
    }

    // `A.B.c` with no whitespace is a single qualified name.
    let mut text = text;
    while cursor.peek() == Some('.') && cursor.peek_at(1) != Some('.') {
        let Some(len) = syntax::identifier_run(&cursor.chars, cursor.index + 1) else {
            break;
        };
        let segment = cursor.text_between(cursor.index + 1, cursor.index + 1 + len);
        if syntax::reserved_run(&segment).is_some() {
            break;
        }
        cursor.advance_by(len + 1);
        text.push('.');
        text.push_str(&segment);
    }
    Token::new(TokenKind::Ident, text, Span::new(start, cursor.pos()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_texts(source: &str) -> Vec<(TokenKind, String)> {
        let (tokens, _) = lex(source, DEFAULT_TAB_WIDTH);
        tokens
            .into_iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| (t.kind, t.text))
            .collect()
    }

    fn diag_codes(source: &str) -> Vec<String> {
        let (_, diags) = lex(source, DEFAULT_TAB_WIDTH);
        diags.into_iter().map(|d| d.code).collect()
    }

    #[test]
    fn identifiers_absorb_operator_characters() {
        let toks = kinds_and_texts("x+y _+_ a≡b");
        assert_eq!(
            toks,
            vec![
                (TokenKind::Ident, "x+y".to_string()),
                (TokenKind::Ident, "_+_".to_string()),
                (TokenKind::Ident, "a≡b".to_string()),
            ]
        );
    }

    #[test]
    fn unicode_aliases_are_canonical_symbols() {
        let toks = kinds_and_texts("λ x → ∀ ← …");
        let texts: Vec<&str> = toks.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, vec!["\\", "x", "->", "forall", "<-", "..."]);
        assert_eq!(toks[3].0, TokenKind::Keyword);
    }

    #[test]
    fn backslash_lambda_and_backslash_identifiers() {
        let toks = kinds_and_texts("\\x -> x \\/ y");
        assert_eq!(toks[0], (TokenKind::Symbol, "\\".to_string()));
        assert_eq!(toks[1], (TokenKind::Ident, "x".to_string()));
        assert_eq!(toks[4], (TokenKind::Ident, "\\/".to_string()));
    }

    #[test]
    fn numbers_and_floats() {
        let toks = kinds_and_texts("42 -7 0xFF 3.25 1e10 2.5e-3 x1");
        let kinds: Vec<TokenKind> = toks.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Integer,
                TokenKind::Integer,
                TokenKind::Integer,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::Ident,
            ]
        );
        assert_eq!(toks[5].1, "2.5e-3");
    }

    #[test]
    fn hex_mantissa_floats() {
        let toks = kinds_and_texts("0xA.5 0x1F.0x8 1.5e0x3 -0x2.0e1");
        assert_eq!(
            toks,
            vec![
                (TokenKind::Float, "0xA.5".to_string()),
                (TokenKind::Float, "0x1F.0x8".to_string()),
                (TokenKind::Float, "1.5e0x3".to_string()),
                (TokenKind::Float, "-0x2.0e1".to_string()),
            ]
        );
        let (_, diagnostics) = lex("x = 0xA.5", DEFAULT_TAB_WIDTH);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn qualified_names_and_dots() {
        let toks = kinds_and_texts("Data.Nat.suc .x f ..");
        assert_eq!(toks[0], (TokenKind::Ident, "Data.Nat.suc".to_string()));
        assert_eq!(toks[1], (TokenKind::Symbol, ".".to_string()));
        assert_eq!(toks[2], (TokenKind::Ident, "x".to_string()));
        assert_eq!(toks[4], (TokenKind::Symbol, "..".to_string()));
    }

    #[test]
    fn brackets_are_matched_greedily() {
        let toks = kinds_and_texts("{{x}} ⦃ y ⦄ (| f a |) ⦇ g ⦈ (|x)");
        let texts: Vec<&str> = toks.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "{{", "x", "}}", "{{", "y", "}}", "(|", "f", "a", "|)", "(|", "g", "|)", "(",
                "|x", ")"
            ]
        );
    }

    #[test]
    fn comments_and_pragmas() {
        let (tokens, diags) = lex("{-# BUILTIN NATURAL ℕ #-}\nx # trailing note\n", 8);
        assert!(diags.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::Pragma);
        assert_eq!(tokens[0].text, "{-# BUILTIN NATURAL ℕ #-}");
        assert_eq!(tokens[2].kind, TokenKind::Comment);
        assert_eq!(tokens[2].text, "# trailing note");
    }

    #[test]
    fn strings_are_lexical_only() {
        let toks = kinds_and_texts(r#""a \"quoted\" word" "#);
        assert_eq!(toks[0].0, TokenKind::String);
        assert_eq!(toks[0].1, r#""a \"quoted\" word""#);
    }

    #[test]
    fn unterminated_literals_report_codes() {
        assert_eq!(diag_codes("\"abc\nx"), vec!["E1001"]);
        assert_eq!(diag_codes("{-# OPTIONS"), vec!["E1002"]);
        assert_eq!(diag_codes("'a"), vec!["E1000"]);
    }

    #[test]
    fn tabs_expand_and_warn() {
        let (tokens, diags) = lex("f\n\tx", 4);
        assert_eq!(tokens[1].span.start.column, 5);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, "W1103");
        assert!(!diags[0].is_error());
    }

    #[test]
    fn positions_track_bytes_and_columns() {
        let (tokens, _) = lex("ℕ x", 8);
        assert_eq!(tokens[1].span.start.column, 3);
        assert_eq!(tokens[1].span.start.offset, "ℕ ".len());
    }
}
