use pest::Parser as _;
use pest_derive::Parser;

use crate::syntax::Expr;
use crate::Error;

mod trans;

#[cfg(test)]
mod tests;

#[derive(Parser)]
#[grammar = "syntax/surf/grammar.pest"]
struct AspenParser;

/// Parse one complete expression. The whole input must be consumed, trailing
/// whitespace and comments included; anything else reports the failure
/// position through the pest error.
pub fn parse_text(src: &str) -> Result<Expr, Error> {
    let pair = AspenParser::parse(Rule::complete_expression, src)
        .map_err(Box::new)?
        .next()
        .unwrap();
    trans::Trans::default().complete(pair)
}
