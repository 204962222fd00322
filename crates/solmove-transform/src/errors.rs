use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranspileError {
    #[error("Parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("Type mapping error: {0}")]
    TypeMapping(String),

    #[error("Naming collision: {0}")]
    NamingCollision(String),

    #[error("Type conflict: {0}")]
    TypeConflict(String),

    #[error("Resource plan error: {0}")]
    Plan(String),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Emit error: {0}")]
    Emit(String),

    #[error("Multiple errors occurred: {0:?}")]
    Multiple(Vec<TranspileError>),
}

impl TranspileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TranspileError::Parse { .. } => ErrorKind::Parse,
            TranspileError::UnsupportedFeature(_) => ErrorKind::UnsupportedFeature,
            TranspileError::TypeMapping(_) => ErrorKind::TypeMapping,
            TranspileError::NamingCollision(_) => ErrorKind::NamingCollision,
            TranspileError::TypeConflict(_) => ErrorKind::TypeConflict,
            TranspileError::Plan(_) => ErrorKind::Plan,
            TranspileError::SymbolNotFound(_) => ErrorKind::SymbolNotFound,
            TranspileError::Emit(_) => ErrorKind::Emit,
            TranspileError::Multiple(errors) => errors
                .first()
                .map(|e| e.kind())
                .unwrap_or(ErrorKind::UnsupportedFeature),
        }
    }
}

impl From<solmove_core::IrError> for TranspileError {
    fn from(err: solmove_core::IrError) -> Self {
        use solmove_core::IrError;
        match err {
            IrError::TypeMapping(msg) => TranspileError::TypeMapping(msg),
            IrError::PlanViolation(msg) => TranspileError::Plan(msg),
            IrError::SymbolNotFound(msg) => TranspileError::SymbolNotFound(msg),
            IrError::InvalidIr(msg) => TranspileError::Plan(msg),
        }
    }
}

impl From<solmove_parser::TypeNameError> for TranspileError {
    fn from(err: solmove_parser::TypeNameError) -> Self {
        TranspileError::TypeMapping(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Parse,
    UnsupportedFeature,
    TypeMapping,
    NamingCollision,
    TypeConflict,
    Plan,
    SymbolNotFound,
    Emit,
}

/// A fatal error scoped to one contract. The contract has no module in the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractError {
    pub contract: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl ContractError {
    pub fn new(contract: impl Into<String>, error: &TranspileError) -> Self {
        Self {
            contract: contract.into(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl std::fmt::Display for ContractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.contract, self.message)
    }
}

/// A non-fatal degradation. `contract` is `None` for unit-level findings such as
/// unresolved imports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub contract: Option<String>,
    pub message: String,
}

impl Warning {
    pub fn new(contract: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            contract: contract.map(str::to_string),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.contract {
            Some(c) => write!(f, "{}: {}", c, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

pub type Result<T> = std::result::Result<T, TranspileError>;
