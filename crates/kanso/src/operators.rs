//! Scoped fixity table populated by `infix`/`infixl`/`infixr` declarations.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Fixity {
    /// Non-associative.
    Infix,
    InfixL,
    InfixR,
}

impl Fixity {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "infix" => Some(Self::Infix),
            "infixl" => Some(Self::InfixL),
            "infixr" => Some(Self::InfixR),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Infix => "infix",
            Self::InfixL => "infixl",
            Self::InfixR => "infixr",
        }
    }
}

/// Where the operand holes of an operator name sit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorShape {
    Infix,
    Prefix,
    Postfix,
    /// More than one name part, e.g. `if_then_else_`. Recorded but not used for grouping.
    Mixfix,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorEntry {
    /// Name as written in the fixity declaration.
    pub name: String,
    /// The operator part that appears in applications, e.g. `+` for `_+_`.
    pub symbol: String,
    pub fixity: Fixity,
    pub precedence: u32,
    pub shape: OperatorShape,
}

impl OperatorEntry {
    pub fn new(name: &str, fixity: Fixity, precedence: u32) -> Self {
        let (symbol, shape) = operator_shape(name);
        Self {
            name: name.to_string(),
            symbol,
            fixity,
            precedence,
            shape,
        }
    }

    /// Name with explicit operand holes: `_+_` for an infix `+`, `¬_` for a prefix `¬`.
    pub fn canonical_name(&self) -> String {
        match self.shape {
            OperatorShape::Infix => format!("_{}_", self.symbol),
            OperatorShape::Prefix => format!("{}_", self.symbol),
            OperatorShape::Postfix => format!("_{}", self.symbol),
            OperatorShape::Mixfix => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperatorError {
    #[error("operator `{name}` already has a fixity declaration in this scope")]
    Duplicate { name: String, previous: OperatorEntry },
}

/// Splits an operator name into the part used in applications and its shape.
///
/// `_+_` and a bare `+` are both infix; `¬_` is prefix and `_!` postfix.
pub fn operator_shape(name: &str) -> (String, OperatorShape) {
    let parts: Vec<&str> = name.split('_').collect();
    let non_empty: Vec<&str> = parts.iter().copied().filter(|p| !p.is_empty()).collect();
    if non_empty.len() > 1 {
        return (name.to_string(), OperatorShape::Mixfix);
    }
    let Some(symbol) = non_empty.first() else {
        return (name.to_string(), OperatorShape::Infix);
    };
    let leading = name.starts_with('_');
    let trailing = name.ends_with('_');
    let shape = match (leading, trailing) {
        (true, true) | (false, false) => OperatorShape::Infix,
        (false, true) => OperatorShape::Prefix,
        (true, false) => OperatorShape::Postfix,
    };
    (symbol.to_string(), shape)
}

/// Stack of scopes mapping operator symbols to fixity entries. Inner scopes shadow outer
/// ones; entries vanish when their scope is popped.
#[derive(Debug, Clone)]
pub struct OperatorTable {
    scopes: Vec<HashMap<String, OperatorEntry>>,
}

impl Default for OperatorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl OperatorTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// The root scope is never popped.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn declare(&mut self, entry: OperatorEntry) -> Result<(), OperatorError> {
        let Some(scope) = self.scopes.last_mut() else {
            return Ok(());
        };
        if let Some(previous) = scope.get(&entry.symbol) {
            return Err(OperatorError::Duplicate {
                name: entry.name,
                previous: previous.clone(),
            });
        }
        scope.insert(entry.symbol.clone(), entry);
        Ok(())
    }

    /// Whether `symbol` already has an entry in the innermost scope.
    pub fn declared_here(&self, name: &str) -> bool {
        let (symbol, _) = operator_shape(name);
        self.scopes
            .last()
            .is_some_and(|scope| scope.contains_key(&symbol))
    }

    /// Innermost entry for an identifier as it appears in an application. Qualified names
    /// fall back to their last segment.
    pub fn lookup(&self, name: &str) -> Option<&OperatorEntry> {
        self.lookup_exact(name).or_else(|| {
            let (_, last) = name.rsplit_once('.')?;
            self.lookup_exact(last)
        })
    }

    fn lookup_exact(&self, symbol: &str) -> Option<&OperatorEntry> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(symbol))
    }
}
