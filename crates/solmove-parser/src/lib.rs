/*! Parse Solidity type names into the source type model.
 *
 * The tree-sitter front end hands type positions over as text (`mapping(address => uint256[])`,
 * `Lib.Entry[3][]`, `address payable`). This crate turns that text into a [`SourceType`] so the
 * type mapper never has to look at strings.
 */

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use solmove_core::source::SourceType;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "type_name.pest"]
pub struct TypeNameParser;

#[derive(Error, Debug)]
pub enum TypeNameError {
    #[error("invalid type name: {0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),
    #[error("array length out of range: {0}")]
    Length(String),
}

pub type Result<T> = std::result::Result<T, TypeNameError>;

/// Parses one type name; a trailing data location (`memory`, `storage`, `calldata`) is ignored.
pub fn parse_type_name(input: &str) -> Result<SourceType> {
    let mut pairs = TypeNameParser::parse(Rule::type_name, input).map_err(Box::new)?;
    let root = pairs
        .next()
        .and_then(|p| p.into_inner().find(|p| p.as_rule() == Rule::type_expr));
    match root {
        Some(expr) => build_type(expr),
        None => Err(TypeNameError::Syntax(Box::new(empty_input(input)))),
    }
}

/// Parses a parenthesized list such as the second argument of `abi.decode(data, (uint, address))`.
pub fn parse_type_list(input: &str) -> Result<Vec<SourceType>> {
    let mut pairs = TypeNameParser::parse(Rule::type_list, input).map_err(Box::new)?;
    let Some(list) = pairs.next() else {
        return Ok(Vec::new());
    };
    list.into_inner()
        .filter(|p| p.as_rule() == Rule::type_expr)
        .map(build_type)
        .collect()
}

pub fn check(input: &str) -> bool {
    parse_type_name(input).is_ok()
}

fn build_type(pair: Pair<'_, Rule>) -> Result<SourceType> {
    let mut inner = pair.into_inner();
    let mut ty = match inner.next() {
        Some(base) => build_base(base)?,
        None => return Err(TypeNameError::Length("empty type".to_string())),
    };
    for suffix in inner {
        let length = match suffix.into_inner().next() {
            Some(len) => Some(
                len.as_str()
                    .parse::<u64>()
                    .map_err(|_| TypeNameError::Length(len.as_str().to_string()))?,
            ),
            None => None,
        };
        ty = SourceType::array(ty, length);
    }
    Ok(ty)
}

fn build_base(pair: Pair<'_, Rule>) -> Result<SourceType> {
    match pair.as_rule() {
        Rule::mapping => {
            let mut types = pair.into_inner().filter(|p| p.as_rule() == Rule::type_expr);
            let key = types.next().map(build_type).transpose()?;
            let value = types.next().map(build_type).transpose()?;
            match (key, value) {
                (Some(k), Some(v)) => Ok(SourceType::mapping(k, v)),
                _ => Err(TypeNameError::Length("mapping without value type".to_string())),
            }
        }
        Rule::elementary | Rule::function_type => Ok(SourceType::Elementary(normalize(pair.as_str()))),
        _ => Ok(SourceType::UserDefined(pair.as_str().to_string())),
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn empty_input(input: &str) -> pest::error::Error<Rule> {
    pest::error::Error::new_from_pos(
        pest::error::ErrorVariant::CustomError {
            message: "expected a type name".to_string(),
        },
        pest::Position::from_start(input),
    )
}
