//! Character classes, reserved words and literal shapes of the Kanso surface syntax.

use std::sync::LazyLock;

use num_bigint::BigUint;
use num_traits::Num;
use regex::Regex;
use serde::{Serialize, Serializer};

pub const KEYWORDS: &[&str] = &[
    "abstract",
    "codata",
    "coinductive",
    "constructor",
    "data",
    "do",
    "eta-equality",
    "field",
    "forall",
    "import",
    "in",
    "inductive",
    "infix",
    "infixl",
    "infixr",
    "instance",
    "let",
    "macro",
    "module",
    "mutual",
    "no-eta-equality",
    "open",
    "pattern",
    "postulate",
    "primitive",
    "private",
    "quote",
    "quoteContext",
    "quoteGoal",
    "quoteTerm",
    "record",
    "rewrite",
    "syntax",
    "tactic",
    "unquote",
    "unquoteDecl",
    "unquoteDef",
    "variable",
    "where",
    "with",
];

/// Words that only carry meaning inside `open`/`import` directives.
pub const CONTEXTUAL_KEYWORDS: &[&str] = &["as", "hiding", "public", "renaming", "to", "using"];

/// Keywords that open an indentation-delimited block.
pub const LAYOUT_KEYWORDS: &[&str] = &[
    "abstract",
    "do",
    "field",
    "instance",
    "let",
    "macro",
    "mutual",
    "postulate",
    "primitive",
    "private",
    "variable",
    "where",
];

/// Identifier runs that are symbols as a whole, mapped to their canonical spelling.
const RESERVED_RUNS: &[(&str, &str)] = &[
    (":", ":"),
    ("=", "="),
    ("|", "|"),
    ("->", "->"),
    ("→", "->"),
    ("\\", "\\"),
    ("λ", "\\"),
    ("<-", "<-"),
    ("←", "<-"),
    ("...", "..."),
    ("…", "..."),
    ("_", "_"),
];

pub fn is_keyword(text: &str) -> bool {
    KEYWORDS.contains(&text)
}

pub fn is_contextual_keyword(text: &str) -> bool {
    CONTEXTUAL_KEYWORDS.contains(&text)
}

pub fn is_layout_keyword(text: &str) -> bool {
    LAYOUT_KEYWORDS.contains(&text)
}

/// Canonical symbol for an identifier run that is reserved in its entirety.
pub fn reserved_run(text: &str) -> Option<&'static str> {
    if text == "∀" {
        return Some("forall");
    }
    RESERVED_RUNS
        .iter()
        .find(|(spelling, _)| *spelling == text)
        .map(|(_, canonical)| *canonical)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Whitespace,
    /// Terminates identifier runs and is lexed on its own.
    Reserved,
    /// Starts a lambda unless followed by a non-letter.
    Backslash,
    Ident,
}

pub fn classify(ch: char) -> CharClass {
    if ch.is_whitespace() {
        CharClass::Whitespace
    } else if ch == '\\' {
        CharClass::Backslash
    } else if is_reserved_char(ch) {
        CharClass::Reserved
    } else {
        CharClass::Ident
    }
}

pub fn is_reserved_char(ch: char) -> bool {
    matches!(
        ch,
        '.' | '"' | '(' | ')' | '{' | '}' | '@' | ';' | '⦃' | '⦄' | '⦇' | '⦈'
    )
}

/// Characters allowed after the first character of an identifier run.
pub fn is_ident_continue(ch: char) -> bool {
    !ch.is_whitespace() && !is_reserved_char(ch)
}

/// Length in characters of the identifier run starting at `index`, or `None` when the
/// character there cannot start one.
pub fn identifier_run(chars: &[char], index: usize) -> Option<usize> {
    let first = *chars.get(index)?;
    let next = chars.get(index + 1).copied();
    let mut end = match first {
        '\\' => match next {
            Some(ch) if !ch.is_alphabetic() && is_ident_continue(ch) => index + 2,
            // A lone backslash is the lambda symbol.
            Some(ch) if !ch.is_alphabetic() => return Some(1),
            None => return Some(1),
            _ => return None,
        },
        '_' => index + 1,
        '\'' => return None,
        ch if classify(ch) == CharClass::Ident => index + 1,
        _ => return None,
    };
    while end < chars.len() && is_ident_continue(chars[end]) {
        end += 1;
    }
    Some(end - index)
}

static INTEGER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?(0x[0-9a-fA-F]+|[0-9]+)$").expect("integer regex is valid")
});

static FRACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(0x[0-9a-fA-F]+|[0-9]+)([eE][-+]?(0x[0-9a-fA-F]+|[0-9]+))?$")
        .expect("fraction regex is valid")
});

static EXPONENT_ONLY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?(0x[0-9a-fA-F]+|[0-9]+)[eE][-+]?(0x[0-9a-fA-F]+|[0-9]+)$")
        .expect("exponent regex is valid")
});

pub fn is_integer_text(text: &str) -> bool {
    INTEGER_RE.is_match(text)
}

/// Whether the text after a `.` completes a float whose integer part was already lexed.
pub fn is_fraction_text(text: &str) -> bool {
    FRACTION_RE.is_match(text)
}

pub fn is_exponent_float_text(text: &str) -> bool {
    EXPONENT_ONLY_RE.is_match(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegerBase {
    Decimal,
    Hex,
}

/// Integer literal in sign-magnitude form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegerLiteral {
    pub negative: bool,
    pub base: IntegerBase,
    #[serde(serialize_with = "serialize_biguint")]
    pub magnitude: BigUint,
}

impl IntegerLiteral {
    pub fn parse(text: &str) -> Option<Self> {
        if !is_integer_text(text) {
            return None;
        }
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let (base, magnitude) = match digits.strip_prefix("0x") {
            Some(hex) => (IntegerBase::Hex, BigUint::from_str_radix(hex, 16).ok()?),
            None => (IntegerBase::Decimal, BigUint::from_str_radix(digits, 10).ok()?),
        };
        Some(Self {
            negative,
            base,
            magnitude,
        })
    }

    pub fn render(&self) -> String {
        let sign = if self.negative { "-" } else { "" };
        match self.base {
            IntegerBase::Decimal => format!("{sign}{}", self.magnitude),
            IntegerBase::Hex => format!("{sign}0x{}", self.magnitude.to_str_radix(16)),
        }
    }
}

fn serialize_biguint<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

/// Float literals keep their lexical shape only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FloatLiteral {
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sort {
    Set,
    Prop,
}

const SUBSCRIPT_DIGITS: [char; 10] = ['₀', '₁', '₂', '₃', '₄', '₅', '₆', '₇', '₈', '₉'];

/// Recognises `Set`, `Prop`, `Set1`, `Prop₂` and friends.
pub fn universe(text: &str) -> Option<(Sort, Option<u32>)> {
    let (sort, rest) = if let Some(rest) = text.strip_prefix("Set") {
        (Sort::Set, rest)
    } else if let Some(rest) = text.strip_prefix("Prop") {
        (Sort::Prop, rest)
    } else {
        return None;
    };
    if rest.is_empty() {
        return Some((sort, None));
    }
    let mut level: u32 = 0;
    for ch in rest.chars() {
        let digit = match ch.to_digit(10) {
            Some(digit) => digit,
            None => SUBSCRIPT_DIGITS.iter().position(|d| *d == ch)? as u32,
        };
        level = level.checked_mul(10)?.checked_add(digit)?;
    }
    Some((sort, Some(level)))
}
