/*! Render the Move target tree as source text.
 *
 * Everything semantic has already happened by the time a module reaches this crate. The emitter
 * walks a [`MoveModule`](solmove_core::MoveModule) and prints it with fixed ordering and fixed
 * spacing, so the same tree always produces the same bytes. The summary side turns a module into a
 * short structural report for terminals and JSON consumers.
 */

pub mod config;
pub mod emitter;
pub mod move_emitter;
pub mod output;
pub mod summary;

pub use config::{EmitterConfig, IndentStyle, VerbosityLevel};
pub use emitter::{EmitContext, EmitHelper, EmitResult, Emitter};
pub use move_emitter::{format_expr, MoveEmitter};
pub use output::{render_summary, OutputFormat};
pub use summary::{FunctionSummary, ModuleSummary};
