use serde::{Deserialize, Serialize};
use solmove_core::move_ast::{ExprKind, FunVisibility, MoveFunction, MoveModule};

/// Structural facts about a generated module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSummary {
    pub module: String,
    pub uses: Vec<String>,
    pub resources: Vec<String>,
    pub events: Vec<String>,
    pub structs: Vec<String>,
    pub error_codes: Vec<(String, u64)>,
    pub functions: Vec<FunctionSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSummary {
    pub name: String,
    pub kind: String,
    pub params: usize,
    pub acquires: Vec<String>,
}

impl FunctionSummary {
    fn from_function(func: &MoveFunction) -> Self {
        let kind = if func.is_view() {
            "view"
        } else if func.is_entry {
            "entry"
        } else {
            match func.visibility {
                FunVisibility::Public => "public",
                FunVisibility::Friend => "friend",
                FunVisibility::Private => "private",
            }
        };
        Self {
            name: func.name.clone(),
            kind: kind.to_string(),
            params: func.params.len(),
            acquires: func.acquires.clone(),
        }
    }
}

impl ModuleSummary {
    pub fn from_module(module: &MoveModule) -> Self {
        let mut resources = Vec::new();
        let mut events = Vec::new();
        let mut structs = Vec::new();
        for def in &module.structs {
            if def.is_resource() {
                resources.push(def.name.clone());
            } else if def.attributes.iter().any(|a| a == "event") {
                events.push(def.name.clone());
            } else {
                structs.push(def.name.clone());
            }
        }

        let error_codes = module
            .constants
            .iter()
            .filter(|c| c.name.starts_with("E_"))
            .filter_map(|c| match &c.value.kind {
                ExprKind::Int { value, .. } => {
                    u64::try_from(value).ok().map(|code| (c.name.clone(), code))
                }
                _ => None,
            })
            .collect();

        let uses = module
            .uses
            .iter()
            .map(|u| {
                if u.members.is_empty() {
                    u.path.clone()
                } else {
                    format!("{}::{{{}}}", u.path, u.members.join(", "))
                }
            })
            .collect();

        Self {
            module: format!("{}::{}", module.address, module.name),
            uses,
            resources,
            events,
            structs,
            error_codes,
            functions: module
                .functions
                .iter()
                .map(FunctionSummary::from_function)
                .collect(),
        }
    }

    pub fn entry_functions(&self) -> impl Iterator<Item = &FunctionSummary> {
        self.functions.iter().filter(|f| f.kind == "entry")
    }

    pub fn view_functions(&self) -> impl Iterator<Item = &FunctionSummary> {
        self.functions.iter().filter(|f| f.kind == "view")
    }
}
