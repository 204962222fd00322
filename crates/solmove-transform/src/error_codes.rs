//! Abort codes for one module.
//!
//! Solidity reverts carry strings or custom-error selectors; Move aborts carry a `u64`. Every
//! distinct failure reason gets a named `E_*` constant from a fixed range so that codes stay
//! stable between runs: caller/ownership checks 1-99, other validations 100-999, custom errors
//! 1000-1999, and the transpiler's own reasons from 9001.

use crate::config::ErrorStyle;
use indexmap::IndexMap;
use solmove_core::move_ast::{ExprKind, MoveConstant, MoveExpr};
use solmove_core::naming::to_upper_snake;
use solmove_core::types::MoveType;

const ACCESS_BASE: u64 = 1;
const VALIDATION_BASE: u64 = 100;
const CUSTOM_BASE: u64 = 1000;
const MAX_NAME_WORDS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Access,
    Validation,
    Custom,
    Builtin,
}

impl ErrorCategory {
    /// The `std::error` constructor used for descriptive codes.
    fn canonical(&self) -> &'static str {
        match self {
            ErrorCategory::Access => "permission_denied",
            ErrorCategory::Validation => "invalid_argument",
            ErrorCategory::Custom => "aborted",
            ErrorCategory::Builtin => "invalid_state",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Unsupported,
    AssertionFailed,
    Reverted,
    NotDeployer,
    AlreadyInitialized,
    RequirementFailed,
}

impl Builtin {
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Unsupported => "E_UNSUPPORTED",
            Builtin::AssertionFailed => "E_ASSERTION_FAILED",
            Builtin::Reverted => "E_REVERTED",
            Builtin::NotDeployer => "E_NOT_DEPLOYER",
            Builtin::AlreadyInitialized => "E_ALREADY_INITIALIZED",
            Builtin::RequirementFailed => "E_REQUIREMENT_FAILED",
        }
    }

    fn code(&self) -> u64 {
        match self {
            Builtin::Unsupported => 9001,
            Builtin::AssertionFailed => 9002,
            Builtin::Reverted => 9003,
            Builtin::NotDeployer => 9004,
            Builtin::AlreadyInitialized => 9005,
            Builtin::RequirementFailed => 9006,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Builtin::Unsupported => "Construct with no Move counterpart",
            Builtin::AssertionFailed => "assert() failed",
            Builtin::Reverted => "revert() without a reason",
            Builtin::NotDeployer => "Only the publishing account may initialize",
            Builtin::AlreadyInitialized => "Module state already exists",
            Builtin::RequirementFailed => "require() without a reason",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ErrorEntry {
    code: u64,
    category: ErrorCategory,
    description: String,
}

#[derive(Debug, Clone)]
pub struct ErrorTable {
    style: ErrorStyle,
    entries: IndexMap<String, ErrorEntry>,
    /// `(category, message)` → constant name, so a repeated reason reuses its code.
    by_reason: IndexMap<(bool, String), String>,
    next_access: u64,
    next_validation: u64,
    next_custom: u64,
}

impl ErrorTable {
    pub fn new(style: ErrorStyle) -> Self {
        Self {
            style,
            entries: IndexMap::new(),
            by_reason: IndexMap::new(),
            next_access: ACCESS_BASE,
            next_validation: VALIDATION_BASE,
            next_custom: CUSTOM_BASE,
        }
    }

    /// Constant for a `require`/`revert` reason string. `access` selects the caller-check range.
    pub fn for_message(&mut self, message: &str, access: bool) -> String {
        let key = (access, message.to_string());
        if let Some(name) = self.by_reason.get(&key) {
            return name.clone();
        }
        let (category, code) = if access {
            self.next_access += 1;
            (ErrorCategory::Access, self.next_access - 1)
        } else {
            self.next_validation += 1;
            (ErrorCategory::Validation, self.next_validation - 1)
        };
        let name = self.unique_name(&name_from_message(message, access));
        self.entries.insert(
            name.clone(),
            ErrorEntry {
                code,
                category,
                description: message.to_string(),
            },
        );
        self.by_reason.insert(key, name.clone());
        name
    }

    /// Constant for a Solidity custom error; the same error always maps to the same constant.
    pub fn for_custom_error(&mut self, error: &str) -> String {
        let key = (false, format!("error {}", error));
        if let Some(name) = self.by_reason.get(&key) {
            return name.clone();
        }
        let code = self.next_custom;
        self.next_custom += 1;
        let name = self.unique_name(&format!("E_{}", to_upper_snake(error)));
        self.entries.insert(
            name.clone(),
            ErrorEntry {
                code,
                category: ErrorCategory::Custom,
                description: format!("{}()", error),
            },
        );
        self.by_reason.insert(key, name.clone());
        name
    }

    pub fn builtin(&mut self, builtin: Builtin) -> String {
        let name = builtin.name().to_string();
        self.entries.entry(name.clone()).or_insert(ErrorEntry {
            code: builtin.code(),
            category: ErrorCategory::Builtin,
            description: builtin.description().to_string(),
        });
        name
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn code_of(&self, name: &str) -> Option<u64> {
        self.entries.get(name).map(|e| e.code)
    }

    /// The value passed to `abort`/`assert!` for constant `name`.
    pub fn abort_value(&self, name: &str) -> MoveExpr {
        let constant = MoveExpr::typed(
            ExprKind::Var(name.to_string()),
            MoveType::u64(),
        );
        match (self.style, self.entries.get(name)) {
            (ErrorStyle::Descriptive, Some(entry)) => MoveExpr::typed(
                ExprKind::Call {
                    module: Some("error".to_string()),
                    name: entry.category.canonical().to_string(),
                    type_args: Vec::new(),
                    args: vec![constant],
                },
                MoveType::u64(),
            ),
            _ => constant,
        }
    }

    /// Declarations ordered by code.
    pub fn constants(&self) -> Vec<MoveConstant> {
        let mut entries: Vec<(&String, &ErrorEntry)> = self.entries.iter().collect();
        entries.sort_by_key(|(_, e)| e.code);
        entries
            .into_iter()
            .map(|(name, entry)| MoveConstant {
                name: name.clone(),
                ty: MoveType::u64(),
                value: MoveExpr::int(entry.code),
                doc: Some(entry.description.clone()),
            })
            .collect()
    }

    fn unique_name(&self, base: &str) -> String {
        if !self.entries.contains_key(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{}_{}", base, n))
            .find(|candidate| !self.entries.contains_key(candidate))
            .unwrap_or_else(|| base.to_string())
    }
}

/// `"Caller is not the owner"` → `E_CALLER_IS_NOT_THE_OWNER`.
fn name_from_message(message: &str, access: bool) -> String {
    let words: Vec<String> = message
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .take(MAX_NAME_WORDS)
        .map(|w| w.to_ascii_uppercase())
        .collect();
    if words.is_empty() {
        return if access {
            "E_UNAUTHORIZED".to_string()
        } else {
            "E_INVALID".to_string()
        };
    }
    let mut name = format!("E_{}", words.join("_"));
    if name.as_bytes().get(2).map(|b| b.is_ascii_digit()).unwrap_or(false) {
        name.insert_str(2, "N");
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_codes_come_from_category_ranges() {
        let mut table = ErrorTable::new(ErrorStyle::Code);
        let owner = table.for_message("Ownable: caller is not the owner", true);
        let amount = table.for_message("amount must be positive", false);
        let custom = table.for_custom_error("InsufficientBalance");
        let stub = table.builtin(Builtin::Unsupported);

        assert_eq!(owner, "E_OWNABLE_CALLER_IS_NOT_THE_OWNER");
        assert_eq!(table.code_of(&owner), Some(1));
        assert_eq!(table.code_of(&amount), Some(100));
        assert_eq!(custom, "E_INSUFFICIENT_BALANCE");
        assert_eq!(table.code_of(&custom), Some(1000));
        assert_eq!(table.code_of(&stub), Some(9001));
    }

    #[test]
    fn test_repeated_reason_reuses_code() {
        let mut table = ErrorTable::new(ErrorStyle::Code);
        let first = table.for_message("paused", false);
        let again = table.for_message("paused", false);
        assert_eq!(first, again);
        assert_eq!(table.constants().len(), 1);
    }

    #[test]
    fn test_name_collision_gets_suffix() {
        let mut table = ErrorTable::new(ErrorStyle::Code);
        let a = table.for_message("too many tokens requested in one call here", false);
        let b = table.for_message("too many tokens requested in one call there", false);
        assert_eq!(a, "E_TOO_MANY_TOKENS_REQUESTED_IN_ONE");
        assert_eq!(b, "E_TOO_MANY_TOKENS_REQUESTED_IN_ONE_2");
    }

    #[test]
    fn test_descriptive_style_wraps_in_category() {
        let mut table = ErrorTable::new(ErrorStyle::Descriptive);
        let name = table.for_message("not owner", true);
        let value = table.abort_value(&name);
        assert_eq!(
            solmove_emit::format_expr(&value),
            "error::permission_denied(E_NOT_OWNER)"
        );
    }
}
