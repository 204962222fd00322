/*! One import for the whole Solidity to Move toolchain.
 *
 * Re-exports the member crates and the handful of types most callers need: the transpiler and
 * its configuration, the result contract, and the Move tree for anyone post-processing modules.
 */

pub use solmove_core as core;
pub use solmove_emit as emit;
pub use solmove_parser as parser;
pub use solmove_transform as transform;

pub use solmove_core::{
    move_ast::{MoveExpr, MoveFunction, MoveModule, MoveStmt},
    types::MoveType,
    OptimizationLevel, ResourcePlan,
};

pub use solmove_emit::{EmitterConfig, MoveEmitter, ModuleSummary};

pub use solmove_parser::parse_type_name;

pub use solmove_transform::{
    transpile_solidity, ContractError, ModuleOutput, TranspileConfig, TranspileError,
    TranspileResult, Transpiler, Warning,
};
