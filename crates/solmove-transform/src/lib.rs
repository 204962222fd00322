/*! Translate Solidity contracts into Aptos Move modules.
 *
 * Solidity keeps state in storage slots that any function may touch; Move keeps it in typed
 * resources that a function must borrow and declare. This crate bridges the two: it flattens
 * inheritance into one IR contract, plans which variables share a resource, rewrites every
 * function against that plan and assembles the result into a module the emitter can print.
 *
 * The front end accepts Solidity text (through tree-sitter) or a serialized source unit.
 * Each contract is translated on its own, so one bad contract never takes down the others.
 */

pub mod assembler;
pub mod config;
pub mod discovery;
pub mod error_codes;
pub mod errors;
pub mod frontend;
pub mod function_transformer;
pub mod ir_builder;
pub mod pipeline;
pub mod result;
pub mod typing;

pub use assembler::{AssembledModule, ModuleAssembler};
pub use config::{ErrorStyle, GuardStyle, StringRepr, TranspileConfig, ViewStyle};
pub use discovery::{apply_acquires, discover_uses};
pub use errors::{ContractError, ErrorKind, Result, TranspileError, Warning};
pub use frontend::parse_solidity;
pub use ir_builder::{IrBuilder, SymbolTable};
pub use pipeline::{transpile_solidity, transpile_solidity_with_filename, SourceFile, Transpiler};
pub use result::{ModuleOutput, ModuleReport, TranspileResult, VariableReport};
pub use typing::{infer_function, ModuleTypes};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar_loads() {
        use tree_sitter::{Language, Parser};

        let mut parser = Parser::new();
        let language: Language = tree_sitter_solidity::LANGUAGE.into();
        parser
            .set_language(&language)
            .expect("Failed to set language");

        let tree = parser.parse("contract Empty {}", None).expect("Failed to parse");
        assert_eq!(tree.root_node().kind(), "source_file");
    }

    #[test]
    fn test_simple_storage() {
        let result = transpile_solidity(
            r#"
pragma solidity ^0.8.0;

contract SimpleStorage {
    uint256 private value;

    function setValue(uint256 _value) public {
        value = _value;
    }

    function getValue() public view returns (uint256) {
        return value;
    }
}
"#,
        );

        assert!(result.success, "errors: {:?}", result.errors);
        let module = result.module("SimpleStorage").expect("module");
        assert_eq!(module.module_name, "simple_storage");
        assert!(module.source.contains("module solmove::simple_storage {"));
        assert!(module.source.contains("public entry fun set_value("));
        assert!(module.source.contains("fun get_value("));
    }
}
