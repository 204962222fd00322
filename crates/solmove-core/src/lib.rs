/*! Core data model for translating Solidity contracts into Aptos Move.
 *
 * Solidity thinks in storage slots and implicit globals; Move thinks in typed resources that live
 * under addresses and must be borrowed explicitly. This crate holds the models on both sides of
 * that gap (the source AST, the flattened contract IR, the Move target AST) together with the
 * pure analyses that bridge them: type mapping, type inference and storage planning.
 */

pub mod analysis;
pub mod infer;
pub mod ir;
pub mod literal;
pub mod move_ast;
pub mod naming;
pub mod source;
pub mod type_mapper;
pub mod types;

pub use analysis::{
    ContractAnalysis, FunctionProfile, OptimizationLevel, PlannerConfig, ResourceGroup,
    ResourcePlan, ResourcePlanner, StateVariableAnalysis, StateVariableAnalyzer, VarRepr,
    VariableAccessRecord, VariableCategory,
};
pub use infer::{TypeConflict, TypeEnv, TypeInference};
pub use ir::{IRContract, IRFunction, IRStateVariable, IRType, IRTypeKind};
pub use move_ast::{MoveExpr, MoveFunction, MoveModule, MoveStmt};
pub use source::{SourceContract, SourceUnit};
pub use type_mapper::{TypeMapper, TypeScope};
pub use types::MoveType;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IrError {
    #[error("Type mapping error: {0}")]
    TypeMapping(String),
    #[error("Invalid IR: {0}")]
    InvalidIr(String),
    #[error("Resource plan violation: {0}")]
    PlanViolation(String),
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),
}

pub type Result<T> = std::result::Result<T, IrError>;

#[cfg(test)]
mod tests;
