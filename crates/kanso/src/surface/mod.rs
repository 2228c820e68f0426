mod ast;
mod parser;

pub use ast::*;
pub use parser::{
    parse_expression, parse_source, parse_source_with_cancel, parse_tokens, ParsedSource,
};

#[cfg(test)]
mod tests;
