//! Identifier conversion between Solidity and Move naming conventions.

/// Move keywords and reserved words that cannot be used as plain identifiers.
pub const MOVE_KEYWORDS: &[&str] = &[
    "abort", "acquires", "as", "break", "const", "continue", "copy", "else", "enum", "false",
    "friend", "fun", "has", "if", "inline", "invariant", "let", "loop", "match", "module", "move",
    "mut", "native", "package", "phantom", "public", "return", "script", "spec", "struct",
    "true", "use", "while", "for", "in", "entry",
];

/// Module names owned by the Move standard library and the Aptos framework. A user module with
/// one of these names would make every `use` ambiguous.
pub const RESERVED_MODULES: &[&str] = &[
    "account",
    "aggregator_v2",
    "aptos_account",
    "aptos_coin",
    "aptos_hash",
    "bcs",
    "block",
    "chain_id",
    "coin",
    "debug",
    "error",
    "event",
    "fungible_asset",
    "hash",
    "math128",
    "math64",
    "object",
    "option",
    "signer",
    "simple_map",
    "smart_table",
    "string",
    "table",
    "timestamp",
    "type_info",
    "vector",
];

pub fn is_reserved_module(name: &str) -> bool {
    RESERVED_MODULES.contains(&name)
}

pub fn to_snake_case(name: &str) -> String {
    let leading = name.chars().take_while(|c| *c == '_').count();
    let core = &name[leading..];
    let chars: Vec<char> = core.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = if i > 0 { chars.get(i - 1).copied() } else { None };
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => {
                    next.map(|n| n.is_ascii_lowercase()).unwrap_or(false)
                }
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else if c == '$' {
            out.push('_');
        } else {
            out.push(c);
        }
    }

    let mut result = "_".repeat(leading);
    result.push_str(&out);
    result
}

pub fn to_pascal_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = true;
    for c in name.chars() {
        if c == '_' || c == '$' {
            upper_next = true;
            continue;
        }
        if upper_next {
            out.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub fn to_upper_snake(name: &str) -> String {
    to_snake_case(name).trim_start_matches('_').to_ascii_uppercase()
}

/// Snake-cases `name` and escapes it if it collides with a Move keyword.
pub fn move_identifier(name: &str) -> String {
    let snake = to_snake_case(name);
    if MOVE_KEYWORDS.contains(&snake.as_str()) {
        format!("{}_", snake)
    } else if snake.is_empty() {
        "unnamed".to_string()
    } else {
        snake
    }
}

/// Move constants must start with an uppercase letter.
pub fn move_constant_name(name: &str) -> String {
    let upper = to_upper_snake(name);
    match upper.chars().next() {
        Some(c) if c.is_ascii_uppercase() => upper,
        _ => format!("C_{}", upper),
    }
}

pub fn module_name(contract: &str) -> String {
    move_identifier(contract)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case_conversion() {
        assert_eq!(to_snake_case("getCount"), "get_count");
        assert_eq!(to_snake_case("ERC20Token"), "erc20_token");
        assert_eq!(to_snake_case("_value"), "_value");
        assert_eq!(to_snake_case("totalSupply"), "total_supply");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("SafeMath"), "safe_math");
    }

    #[test]
    fn test_keyword_escaping() {
        assert_eq!(move_identifier("move"), "move_");
        assert_eq!(move_identifier("fun"), "fun_");
        assert_eq!(move_identifier("amount"), "amount");
    }

    #[test]
    fn test_constant_names() {
        assert_eq!(move_constant_name("MAX_SUPPLY"), "MAX_SUPPLY");
        assert_eq!(move_constant_name("maxSupply"), "MAX_SUPPLY");
        assert_eq!(move_constant_name("_fee"), "FEE");
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(to_pascal_case("balances"), "Balances");
        assert_eq!(to_pascal_case("user_shares"), "UserShares");
    }
}
