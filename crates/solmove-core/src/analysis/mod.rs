/*! Whole-contract storage analysis.
 *
 * Move has no implicit global storage: every state variable has to live in some `key` resource
 * that functions borrow explicitly, and under Block-STM every such resource is a unit of conflict
 * detection. These passes decide the layout. `visit` collects per-function access facts,
 * `state_vars` classifies each variable from those facts, and `resource_plan` turns the
 * classification into resource groups and per-function borrow profiles. The plan is computed once
 * per contract and never changes while function bodies are rewritten.
 */

pub mod resource_plan;
pub mod state_vars;
pub mod visit;

pub use resource_plan::{
    FunctionProfile, GroupKind, OptimizationLevel, PlannerConfig, ResourceGroup, ResourcePlan,
    ResourcePlanner, VarRepr,
};
pub use state_vars::{StateVariableAnalysis, StateVariableAnalyzer, VariableCategory, VariableInfo};
pub use visit::{ContractAnalysis, FunctionFacts, KeyShape, VariableAccessRecord, WriteOp};
