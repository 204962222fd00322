use crate::errors::Warning;
use indexmap::IndexMap;
use solmove_core::source::{
    EnumDecl, ErrorDecl, SourceContract, SourceUnit, StateVarDecl, StructDecl,
};
use solmove_core::type_mapper::{TypeScope, UserTypeKind};
use std::collections::BTreeSet;
use std::path::Path;

/// Every declaration visible across the files of one run, primary sources and context files
/// alike. Later duplicates are ignored with a warning.
#[derive(Debug, Default)]
pub struct SymbolTable<'u> {
    contracts: IndexMap<String, (&'u SourceContract, &'u str)>,
    constants: IndexMap<String, &'u StateVarDecl>,
    structs: IndexMap<String, &'u StructDecl>,
    enums: IndexMap<String, &'u EnumDecl>,
    errors: IndexMap<String, &'u ErrorDecl>,
}

impl<'u> SymbolTable<'u> {
    pub fn build(units: &'u [SourceUnit]) -> (Self, Vec<Warning>) {
        let mut table = SymbolTable::default();
        let mut warnings = Vec::new();
        for unit in units {
            for contract in &unit.contracts {
                if table.contracts.contains_key(&contract.name) {
                    warnings.push(Warning::new(
                        Some(&contract.name),
                        format!(
                            "{} is declared again in {}; the first declaration is used",
                            contract.name, unit.path
                        ),
                    ));
                    continue;
                }
                table
                    .contracts
                    .insert(contract.name.clone(), (contract, unit.path.as_str()));
            }
            for constant in &unit.constants {
                table
                    .constants
                    .entry(constant.name.clone())
                    .or_insert(constant);
            }
            for def in &unit.structs {
                table.structs.entry(def.name.clone()).or_insert(def);
            }
            for def in &unit.enums {
                table.enums.entry(def.name.clone()).or_insert(def);
            }
            for def in &unit.errors {
                table.errors.entry(def.name.clone()).or_insert(def);
            }
        }
        warnings.extend(unresolved_imports(units));
        (table, warnings)
    }

    /// Looks a contract up by plain or qualified (`Lib.Name`) name.
    pub fn contract(&self, name: &str) -> Option<&'u SourceContract> {
        self.contracts.get(last_segment(name)).map(|(c, _)| *c)
    }

    pub fn file_of(&self, contract: &str) -> Option<&'u str> {
        self.contracts.get(last_segment(contract)).map(|(_, f)| *f)
    }

    pub fn constant(&self, name: &str) -> Option<&'u StateVarDecl> {
        self.constants.get(name).copied()
    }

    pub fn error(&self, name: &str) -> Option<&'u ErrorDecl> {
        self.errors.get(last_segment(name)).copied()
    }

    /// A struct declared at file level or inside any contract.
    pub fn struct_def(&self, name: &str) -> Option<&'u StructDecl> {
        if let Some((owner, member)) = name.rsplit_once('.') {
            if let Some(def) = self
                .contract(owner)
                .and_then(|c| c.structs.iter().find(|s| s.name == member))
            {
                return Some(def);
            }
        }
        let local = last_segment(name);
        self.structs.get(local).copied().or_else(|| {
            self.contracts
                .values()
                .find_map(|(c, _)| c.structs.iter().find(|s| s.name == local))
        })
    }

    pub fn enum_def(&self, name: &str) -> Option<&'u EnumDecl> {
        if let Some((owner, member)) = name.rsplit_once('.') {
            if let Some(def) = self
                .contract(owner)
                .and_then(|c| c.enums.iter().find(|e| e.name == member))
            {
                return Some(def);
            }
        }
        let local = last_segment(name);
        self.enums.get(local).copied().or_else(|| {
            self.contracts
                .values()
                .find_map(|(c, _)| c.enums.iter().find(|e| e.name == local))
        })
    }

    pub fn is_library(&self, name: &str) -> bool {
        self.contract(name)
            .map(|c| c.kind == solmove_core::source::ContractKind::Library)
            .unwrap_or(false)
    }
}

/// Import paths whose file name matches none of the loaded units.
fn unresolved_imports(units: &[SourceUnit]) -> Vec<Warning> {
    let loaded: BTreeSet<&str> = units
        .iter()
        .filter_map(|u| Path::new(&u.path).file_name().and_then(|f| f.to_str()))
        .collect();
    let mut warnings = Vec::new();
    let mut reported = BTreeSet::new();
    for unit in units {
        for import in &unit.imports {
            let file = Path::new(import)
                .file_name()
                .and_then(|f| f.to_str())
                .unwrap_or(import);
            if !loaded.contains(file) && reported.insert(import.clone()) {
                warnings.push(Warning::new(
                    None,
                    format!("unresolved import '{}' in {}", import, unit.path),
                ));
            }
        }
    }
    warnings
}

pub(crate) fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Type-name resolution for one contract: its merged structs and enums first, then anything the
/// symbol table knows. Contract and interface names resolve to addresses.
pub struct ContractScope<'a, 'u> {
    structs: BTreeSet<String>,
    enums: BTreeSet<String>,
    symbols: &'a SymbolTable<'u>,
}

impl<'a, 'u> ContractScope<'a, 'u> {
    pub fn new(
        structs: impl IntoIterator<Item = String>,
        enums: impl IntoIterator<Item = String>,
        symbols: &'a SymbolTable<'u>,
    ) -> Self {
        Self {
            structs: structs.into_iter().collect(),
            enums: enums.into_iter().collect(),
            symbols,
        }
    }
}

impl TypeScope for ContractScope<'_, '_> {
    fn resolve_user_type(&self, name: &str) -> Option<UserTypeKind> {
        let local = last_segment(name);
        if self.structs.contains(local) {
            return Some(UserTypeKind::Struct);
        }
        if self.enums.contains(local) {
            return Some(UserTypeKind::Enum);
        }
        if self.symbols.struct_def(name).is_some() {
            return Some(UserTypeKind::Struct);
        }
        if self.symbols.enum_def(name).is_some() {
            return Some(UserTypeKind::Enum);
        }
        self.symbols
            .contract(name)
            .map(|_| UserTypeKind::Contract)
    }
}
