//! Drives every stage for a set of source units.
//!
//! Contracts are isolated from one another: a failure in one produces a [`ContractError`] and
//! the run moves on to the next contract. Nothing in here panics on bad input.

use crate::assembler::ModuleAssembler;
use crate::config::TranspileConfig;
use crate::errors::{ContractError, Result, TranspileError, Warning};
use crate::frontend::parse_solidity;
use crate::function_transformer::{ContractInfo, Signatures};
use crate::ir_builder::{IrBuilder, SymbolTable};
use crate::result::{ModuleOutput, ModuleReport, TranspileResult};
use solmove_core::naming::module_name;
use solmove_core::source::{ContractKind, SourceContract, SourceUnit};
use solmove_core::{ResourcePlanner, StateVariableAnalyzer};
use solmove_emit::{EmitterConfig, MoveEmitter};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// A Solidity file handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    pub source: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Transpiler {
    config: TranspileConfig,
    emitter: EmitterConfig,
}

impl Transpiler {
    pub fn new(config: TranspileConfig) -> Self {
        Self {
            config,
            emitter: EmitterConfig::default(),
        }
    }

    pub fn with_emitter(mut self, emitter: EmitterConfig) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn config(&self) -> &TranspileConfig {
        &self.config
    }

    /// Translates one Solidity file.
    pub fn transpile_source(&self, path: &str, source: &str) -> TranspileResult {
        self.transpile_files(&[SourceFile::new(path, source)], &[])
    }

    /// Translates every contract in `files`. `context` files only contribute declarations
    /// (libraries, base contracts, file-level constants) and produce no modules.
    pub fn transpile_files(&self, files: &[SourceFile], context: &[SourceFile]) -> TranspileResult {
        let mut result = TranspileResult::empty();
        let primary = parse_all(files, &mut result);
        let extra = parse_all(context, &mut result);
        self.run(primary, extra, result)
    }

    /// Translates a serialized [`SourceUnit`].
    pub fn transpile_json(&self, json: &str) -> TranspileResult {
        let mut result = TranspileResult::empty();
        match serde_json::from_str::<SourceUnit>(json) {
            Ok(unit) => self.run(vec![unit], Vec::new(), result),
            Err(err) => {
                let error = TranspileError::Parse {
                    line: err.line(),
                    column: err.column(),
                    message: format!("invalid source unit: {}", err),
                };
                result.push_error(ContractError::new("<input>", &error));
                result
            }
        }
    }

    pub fn transpile_units(
        &self,
        units: Vec<SourceUnit>,
        context: Vec<SourceUnit>,
    ) -> TranspileResult {
        self.run(units, context, TranspileResult::empty())
    }

    fn run(
        &self,
        units: Vec<SourceUnit>,
        context: Vec<SourceUnit>,
        mut result: TranspileResult,
    ) -> TranspileResult {
        let primary = units.len();
        let mut all = units;
        all.extend(context);

        let (symbols, unresolved) = SymbolTable::build(&all);
        result.warnings.extend(unresolved);

        let libraries: BTreeSet<String> = all
            .iter()
            .flat_map(|unit| &unit.contracts)
            .filter(|c| c.kind == ContractKind::Library)
            .map(|c| module_name(&c.name))
            .collect();

        for unit in &all[..primary] {
            for contract in &unit.contracts {
                if contract.kind == ContractKind::Interface || contract.is_abstract {
                    debug!(contract = %contract.name, "skipping interface or abstract contract");
                    continue;
                }
                let mut notes = Vec::new();
                match self.contract(contract, &symbols, &libraries, &mut notes) {
                    Ok(output) => {
                        info!(
                            contract = %contract.name,
                            module = %output.module_name,
                            "translated contract"
                        );
                        result.modules.push(output);
                    }
                    Err(err) => {
                        warn!(contract = %contract.name, "{}", err);
                        result.push_error(ContractError::new(contract.name.clone(), &err));
                    }
                }
                result.warnings.extend(notes);
            }
        }
        result
    }

    fn contract<'u>(
        &self,
        contract: &'u SourceContract,
        symbols: &SymbolTable<'u>,
        libraries: &BTreeSet<String>,
        notes: &mut Vec<Warning>,
    ) -> Result<ModuleOutput> {
        if let Some(message) = &contract.parse_error {
            return Err(TranspileError::Parse {
                line: contract.line,
                column: 0,
                message: message.clone(),
            });
        }

        let mut builder = IrBuilder::new(symbols);
        let built = builder.build(contract);
        notes.extend(builder.take_warnings());
        let ir = built?;

        let analysis = StateVariableAnalyzer::analyze(&ir);
        let plan = ResourcePlanner::new(&ir, &analysis, &self.config.planner()).plan()?;
        plan.verify()?;
        debug!(
            contract = %ir.name,
            groups = plan.groups.len(),
            level = ?plan.level,
            "resource plan ready"
        );
        notes.extend(
            plan.warnings
                .iter()
                .map(|w| Warning::new(Some(&contract.name), w.clone())),
        );

        let mut info = ContractInfo::new(&ir, &plan, &self.config, symbols);
        info.signatures = Signatures::build(&ir, &plan);
        let assembled = ModuleAssembler::new(&info, libraries).assemble()?;
        notes.extend(
            assembled
                .warnings
                .into_iter()
                .map(|w| Warning::new(Some(&contract.name), w)),
        );

        let module = assembled.module;
        let source = MoveEmitter::new(self.emitter.clone())
            .emit_module(&module)
            .map_err(|e| TranspileError::Emit(e.to_string()))?;
        let summary = ModuleReport::new(&module, Some(&plan), &source);
        Ok(ModuleOutput {
            module_name: module.name.clone(),
            contract: contract.name.clone(),
            source,
            summary,
        })
    }
}

fn parse_all(files: &[SourceFile], result: &mut TranspileResult) -> Vec<SourceUnit> {
    let mut units = Vec::new();
    for file in files {
        match parse_solidity(&file.path, &file.source) {
            Ok(unit) => units.push(unit),
            Err(err) => result.push_error(ContractError::new(file.path.clone(), &err)),
        }
    }
    units
}

/// Translates one Solidity source with the default configuration.
pub fn transpile_solidity(source: &str) -> TranspileResult {
    transpile_solidity_with_filename(source, "input.sol")
}

pub fn transpile_solidity_with_filename(source: &str, filename: &str) -> TranspileResult {
    Transpiler::default().transpile_source(filename, source)
}
