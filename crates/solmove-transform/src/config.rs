use serde::{Deserialize, Serialize};
use solmove_core::analysis::{OptimizationLevel, PlannerConfig};

/// How `require`-style guards are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardStyle {
    /// `assert!(cond, E_CODE);`
    #[default]
    Assert,
    /// `if (!cond) abort E_CODE;`
    IfAbort,
}

/// Target representation for Solidity `string` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringRepr {
    /// `std::string::String`
    #[default]
    String,
    /// Raw `vector<u8>`
    Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewStyle {
    /// `#[view]`
    #[default]
    Attribute,
    /// A `/// view` doc line.
    Comment,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStyle {
    /// Bare numeric constants: `abort E_NOT_OWNER`.
    #[default]
    Code,
    /// Canonical `std::error` categories: `abort error::permission_denied(E_NOT_OWNER)`.
    Descriptive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranspileConfig {
    /// Unsupported constructs fail the contract instead of degrading to stubs.
    pub strict: bool,
    pub guard_style: GuardStyle,
    pub string_repr: StringRepr,
    /// Mark small private helpers `inline`.
    pub inline_helpers: bool,
    /// Add the Solidity file and line to each function's doc comment.
    pub source_comments: bool,
    pub view_style: ViewStyle,
    pub error_style: ErrorStyle,
    /// Named address the modules are published under.
    pub module_address: String,
    pub optimization: OptimizationLevel,
}

impl Default for TranspileConfig {
    fn default() -> Self {
        Self {
            strict: false,
            guard_style: GuardStyle::default(),
            string_repr: StringRepr::default(),
            inline_helpers: false,
            source_comments: false,
            view_style: ViewStyle::default(),
            error_style: ErrorStyle::default(),
            module_address: "solmove".to_string(),
            optimization: OptimizationLevel::default(),
        }
    }
}

impl TranspileConfig {
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn with_optimization(mut self, level: OptimizationLevel) -> Self {
        self.optimization = level;
        self
    }

    pub fn planner(&self) -> PlannerConfig {
        PlannerConfig {
            level: self.optimization,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: TranspileConfig =
            serde_json::from_str(r#"{"strict": true, "optimization": "full"}"#).unwrap();
        assert!(config.strict);
        assert_eq!(config.optimization, OptimizationLevel::Full);
        assert_eq!(config.module_address, "solmove");
        assert_eq!(config.guard_style, GuardStyle::Assert);
    }

    #[test]
    fn test_enum_spelling() {
        let config: TranspileConfig = serde_json::from_str(
            r#"{"guard_style": "if_abort", "string_repr": "bytes", "error_style": "descriptive"}"#,
        )
        .unwrap();
        assert_eq!(config.guard_style, GuardStyle::IfAbort);
        assert_eq!(config.string_repr, StringRepr::Bytes);
        assert_eq!(config.error_style, ErrorStyle::Descriptive);
    }
}
