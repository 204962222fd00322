/*! Source AST → flattened contract IR.
 *
 * The [`SymbolTable`] indexes every contract, constant and type declared across the input
 * files; [`IrBuilder`] then flattens one contract at a time against it.
 */

mod flatten;
mod getters;
mod symbols;

pub use flatten::IrBuilder;
pub use symbols::{ContractScope, SymbolTable};

#[cfg(test)]
mod tests;
