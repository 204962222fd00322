//! Builds one [`MoveModule`] from a planned contract.
//!
//! Declarations come first (user structs, event structs, storage resources), then functions,
//! then the helpers and error constants the functions asked for. Type inference, `acquires`
//! and `use` discovery run last over the finished module.

use crate::discovery::{apply_acquires, discover_uses};
use crate::errors::{Result, TranspileError};
use crate::function_transformer::{
    enum_constant, fold_constant, ContractInfo, FunctionTransformer, ModuleParts,
};
use crate::typing::{infer_function, ModuleTypes};
use solmove_core::analysis::GroupKind;
use solmove_core::ir::IRTypeKind;
use solmove_core::move_ast::{
    Ability, ExprKind, MoveConstant, MoveExpr, MoveField, MoveModule, MoveStruct,
};
use solmove_core::naming::{is_reserved_module, module_name, move_constant_name, move_identifier};
use solmove_core::types::MoveType;
use solmove_core::VarRepr;
use std::collections::BTreeSet;
use tracing::{debug, warn};

pub struct ModuleAssembler<'c, 'a> {
    info: &'c ContractInfo<'a>,
    libraries: &'c BTreeSet<String>,
}

/// A finished module and the notes gathered while building it.
#[derive(Debug)]
pub struct AssembledModule {
    pub module: MoveModule,
    pub warnings: Vec<String>,
}

impl<'c, 'a> ModuleAssembler<'c, 'a> {
    pub fn new(info: &'c ContractInfo<'a>, libraries: &'c BTreeSet<String>) -> Self {
        Self { info, libraries }
    }

    pub fn assemble(&self) -> Result<AssembledModule> {
        let contract = self.info.contract;
        let config = self.info.config;
        let name = module_name(&contract.name);
        if is_reserved_module(&name) {
            return Err(TranspileError::NamingCollision(format!(
                "contract {} maps to module {}, which the platform already defines",
                contract.name, name
            )));
        }

        let mut module = MoveModule::new(config.module_address.clone(), name);
        module.doc.push(format!(
            "Translated from Solidity {} `{}`.",
            kind_label(self.info),
            contract.name
        ));

        let mut parts = ModuleParts::new(config);
        let functions = FunctionTransformer::new(self.info, &mut parts).transform_all()?;
        let helpers = parts.helpers.build(self.info);

        module.structs = self.structs()?;
        module.constants = parts.errors.constants();
        module.constants.extend(self.enum_constants());
        module.constants.extend(self.user_constants());
        module.functions = functions;
        module.functions.extend(helpers);
        check_unique_functions(&module)?;

        let mut warnings = parts.warnings;
        self.infer(&mut module, &mut warnings)?;

        let resources: Vec<String> =
            self.info.plan.groups.iter().map(|g| g.name.clone()).collect();
        apply_acquires(&mut module.functions, &resources);
        module.uses = discover_uses(&module, self.libraries)?;

        debug!(
            module = %module.name,
            structs = module.structs.len(),
            functions = module.functions.len(),
            "assembled module"
        );
        Ok(AssembledModule { module, warnings })
    }

    fn structs(&self) -> Result<Vec<MoveStruct>> {
        let contract = self.info.contract;
        let mut structs = Vec::new();

        for def in &contract.structs {
            let abilities = if self.info.struct_is_copyable(&def.name) {
                vec![Ability::Copy, Ability::Drop, Ability::Store]
            } else {
                vec![Ability::Store]
            };
            structs.push(MoveStruct {
                name: def.name.clone(),
                abilities,
                fields: def
                    .fields
                    .iter()
                    .map(|f| MoveField {
                        name: move_identifier(&f.name),
                        ty: self.info.move_type(&f.ty),
                    })
                    .collect(),
                attributes: Vec::new(),
                doc: None,
            });
        }

        for event in &contract.events {
            structs.push(MoveStruct {
                name: event.name.clone(),
                abilities: vec![Ability::Drop, Ability::Store],
                fields: event
                    .fields
                    .iter()
                    .map(|f| MoveField {
                        name: move_identifier(&f.name),
                        ty: self.info.move_type(&f.ty),
                    })
                    .collect(),
                attributes: vec!["event".to_string()],
                doc: None,
            });
        }

        for group in &self.info.plan.groups {
            structs.push(self.resource(group.name.as_str(), &group.kind, &group.variables)?);
        }

        let mut seen = BTreeSet::new();
        for def in &structs {
            if !seen.insert(def.name.as_str()) {
                return Err(TranspileError::NamingCollision(format!(
                    "struct {} is declared twice in module {}",
                    def.name,
                    module_name(&contract.name)
                )));
            }
        }
        Ok(structs)
    }

    fn resource(&self, name: &str, kind: &GroupKind, variables: &[String]) -> Result<MoveStruct> {
        let mut fields = Vec::new();
        if *kind == GroupKind::Distributed {
            let variable = variables.first().ok_or_else(|| {
                TranspileError::Plan(format!("per-account store {} holds no variable", name))
            })?;
            let value = self
                .info
                .state_var(variable)
                .and_then(|v| v.ty.mapping_value())
                .ok_or_else(|| {
                    TranspileError::Plan(format!("{} is not an address-keyed mapping", variable))
                })?;
            fields.push(MoveField {
                name: "value".to_string(),
                ty: self.info.move_type(value),
            });
        } else {
            for variable in variables {
                let state = self.info.state_var(variable).ok_or_else(|| {
                    TranspileError::SymbolNotFound(format!("state variable {}", variable))
                })?;
                let ty = match self.info.plan.repr_of(variable) {
                    VarRepr::Aggregator { element } => {
                        MoveType::Aggregator(Box::new(element.clone()))
                    }
                    _ => self.info.move_type(&state.ty),
                };
                fields.push(MoveField {
                    name: move_identifier(variable),
                    ty,
                });
            }
        }
        Ok(MoveStruct {
            name: name.to_string(),
            abilities: vec![Ability::Key],
            fields,
            attributes: Vec::new(),
            doc: Some(group_doc(kind).to_string()),
        })
    }

    fn enum_constants(&self) -> Vec<MoveConstant> {
        let mut constants = Vec::new();
        for def in &self.info.contract.enums {
            for (index, variant) in def.variants.iter().enumerate() {
                constants.push(MoveConstant {
                    name: enum_constant(&def.name, variant),
                    ty: MoveType::u8(),
                    value: MoveExpr::typed(
                        ExprKind::Int {
                            value: (index as u64).into(),
                            suffix: None,
                        },
                        MoveType::u8(),
                    ),
                    doc: None,
                });
            }
        }
        constants
    }

    /// Solidity constants with a literal value. The rest are inlined at each use.
    fn user_constants(&self) -> Vec<MoveConstant> {
        self.info
            .contract
            .constants
            .iter()
            .filter_map(|constant| {
                let value = fold_constant(self.info, &constant.value, &constant.ty)?;
                let ty = match constant.ty.kind {
                    IRTypeKind::String => MoveType::bytes(),
                    _ => self.info.move_type(&constant.ty),
                };
                Some(MoveConstant {
                    name: move_constant_name(&constant.name),
                    ty,
                    value,
                    doc: None,
                })
            })
            .collect()
    }

    fn infer(&self, module: &mut MoveModule, warnings: &mut Vec<String>) -> Result<()> {
        let env = ModuleTypes::of(module);
        for function in module.functions.iter_mut() {
            for conflict in infer_function(&env, function) {
                let message = format!("{} in {}", conflict, function.name);
                if self.info.config.strict {
                    return Err(TranspileError::TypeConflict(message));
                }
                warn!(function = %function.name, "{}", conflict);
                warnings.push(message);
            }
        }
        Ok(())
    }
}

fn kind_label(info: &ContractInfo<'_>) -> &'static str {
    if info.is_library() {
        "library"
    } else {
        "contract"
    }
}

fn group_doc(kind: &GroupKind) -> &'static str {
    match kind {
        GroupKind::Config => "Values written once at deployment.",
        GroupKind::Counters => "Counters updated through aggregators.",
        GroupKind::State => "Mutable contract state.",
        GroupKind::Distributed => "Per-account value, stored under the owner's address.",
    }
}

fn check_unique_functions(module: &MoveModule) -> Result<()> {
    let mut seen = BTreeSet::new();
    for function in &module.functions {
        if !seen.insert(function.name.as_str()) {
            return Err(TranspileError::NamingCollision(format!(
                "function {} is generated twice in module {}",
                function.name, module.name
            )));
        }
    }
    Ok(())
}
