use crate::errors::{ContractError, Warning};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use solmove_core::{MoveModule, ResourcePlan, VarRepr};
use solmove_emit::ModuleSummary;

/// Outcome of one transpilation run. `success` is false as soon as any contract failed; the
/// modules of the contracts that did translate are still present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranspileResult {
    pub success: bool,
    pub modules: Vec<ModuleOutput>,
    pub errors: Vec<ContractError>,
    pub warnings: Vec<Warning>,
}

impl TranspileResult {
    pub fn empty() -> Self {
        Self {
            success: true,
            modules: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn module(&self, contract: &str) -> Option<&ModuleOutput> {
        self.modules.iter().find(|m| m.contract == contract)
    }

    pub fn error_for(&self, contract: &str) -> Option<&ContractError> {
        self.errors.iter().find(|e| e.contract == contract)
    }

    pub fn warnings_for<'a>(&'a self, contract: &'a str) -> impl Iterator<Item = &'a Warning> {
        self.warnings
            .iter()
            .filter(move |w| w.contract.as_deref() == Some(contract))
    }

    pub(crate) fn push_error(&mut self, error: ContractError) {
        self.success = false;
        self.errors.push(error);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleOutput {
    pub module_name: String,
    pub contract: String,
    pub source: String,
    pub summary: ModuleReport,
}

/// Storage decision for one state variable, as reported to users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableReport {
    pub name: String,
    pub category: String,
    pub confidence: f64,
    pub resource: Option<String>,
    pub representation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleReport {
    #[serde(flatten)]
    pub module: ModuleSummary,
    pub variables: Vec<VariableReport>,
    /// Hex SHA-256 of the emitted source.
    pub fingerprint: String,
}

impl ModuleReport {
    pub fn new(module: &MoveModule, plan: Option<&ResourcePlan>, source: &str) -> Self {
        let variables = plan.map(variable_reports).unwrap_or_default();
        Self {
            module: ModuleSummary::from_module(module),
            variables,
            fingerprint: fingerprint(source),
        }
    }
}

fn variable_reports(plan: &ResourcePlan) -> Vec<VariableReport> {
    plan.analysis
        .variables
        .iter()
        .map(|(name, info)| {
            let representation = match plan.repr_of(name) {
                VarRepr::Field => "field".to_string(),
                VarRepr::Aggregator { element } => format!("aggregator<{}>", element),
                VarRepr::Distributed { store } => format!("per_caller<{}>", store),
            };
            VariableReport {
                name: name.clone(),
                category: info.category.to_string(),
                confidence: info.confidence,
                resource: plan.group_of(name).map(|g| g.name.clone()),
                representation,
            }
        })
        .collect()
}

pub fn fingerprint(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let a = fingerprint("module solmove::counter {}");
        let b = fingerprint("module solmove::counter {}");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, fingerprint("module solmove::other {}"));
    }
}
