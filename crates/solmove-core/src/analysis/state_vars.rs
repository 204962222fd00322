use super::visit::{ContractAnalysis, KeyShape, WriteOp};
use crate::ir::{IRContract, IRTypeKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableCategory {
    AdminConfig,
    Aggregatable,
    UserKeyedMapping,
    EventTrackable,
    General,
}

impl fmt::Display for VariableCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariableCategory::AdminConfig => "admin_config",
            VariableCategory::Aggregatable => "aggregatable",
            VariableCategory::UserKeyedMapping => "user_keyed_mapping",
            VariableCategory::EventTrackable => "event_trackable",
            VariableCategory::General => "general",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableInfo {
    pub category: VariableCategory,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateVariableAnalysis {
    pub variables: IndexMap<String, VariableInfo>,
    pub access: ContractAnalysis,
}

impl StateVariableAnalysis {
    pub fn category(&self, variable: &str) -> Option<VariableCategory> {
        self.variables.get(variable).map(|v| v.category)
    }

    pub fn in_category(&self, category: VariableCategory) -> impl Iterator<Item = &str> {
        self.variables
            .iter()
            .filter(move |(_, info)| info.category == category)
            .map(|(name, _)| name.as_str())
    }
}

pub struct StateVariableAnalyzer;

impl StateVariableAnalyzer {
    pub fn analyze(contract: &IRContract) -> StateVariableAnalysis {
        let access = ContractAnalysis::build(contract);
        let mut variables = IndexMap::new();
        for var in &contract.state_vars {
            let info = Self::classify(contract, &access, &var.name);
            variables.insert(var.name.clone(), info);
        }
        StateVariableAnalysis { variables, access }
    }

    /// First matching rule wins.
    fn classify(contract: &IRContract, access: &ContractAnalysis, name: &str) -> VariableInfo {
        let Some(var) = contract.state_var(name) else {
            return VariableInfo {
                category: VariableCategory::General,
                confidence: 1.0,
            };
        };
        let records: Vec<_> = access.records_for(name).collect();
        let writers: Vec<_> = records.iter().filter(|r| r.writes > 0).collect();
        let runtime_writers: Vec<_> = writers.iter().filter(|r| !r.in_initializer).collect();

        if writers
            .iter()
            .all(|r| r.in_initializer || r.admin_guarded)
        {
            let confidence = if runtime_writers.iter().any(|r| r.admin_guarded) {
                1.0
            } else {
                0.9
            };
            return VariableInfo {
                category: VariableCategory::AdminConfig,
                confidence,
            };
        }

        let unsigned_scalar = matches!(var.ty.kind, IRTypeKind::Primitive { signed: false, .. });
        if unsigned_scalar
            && !runtime_writers.is_empty()
            && runtime_writers
                .iter()
                .all(|r| r.write_ops.iter().all(WriteOp::is_accumulating))
        {
            let read_where_written = runtime_writers.iter().any(|r| !r.in_view && r.reads > 0);
            return VariableInfo {
                category: VariableCategory::Aggregatable,
                confidence: if read_where_written { 0.8 } else { 0.95 },
            };
        }

        if var.ty.is_mapping()
            && !writers.is_empty()
            && writers.iter().all(|r| {
                !r.key_shapes.is_empty()
                    && r.key_shapes.iter().all(|k| *k == KeyShape::Caller)
            })
        {
            return VariableInfo {
                category: VariableCategory::UserKeyedMapping,
                confidence: if writers.len() >= 2 { 1.0 } else { 0.9 },
            };
        }

        let readers: Vec<_> = records.iter().filter(|r| r.reads > 0).collect();
        if !runtime_writers.is_empty()
            && !readers.is_empty()
            && readers.iter().all(|r| r.in_view)
            && runtime_writers.iter().all(|r| r.emits_event)
        {
            return VariableInfo {
                category: VariableCategory::EventTrackable,
                confidence: 0.7,
            };
        }

        VariableInfo {
            category: VariableCategory::General,
            confidence: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IRFunction, IRParam, IRStateVariable, IRType};
    use crate::source::{
        BinaryOp, ContractKind, Expr, FunctionKind, Mutability, SourceType, Stmt, UnaryOp,
        Visibility,
    };
    use crate::type_mapper::{StaticScope, TypeMapper};

    fn var(name: &str, ty: IRType) -> IRStateVariable {
        IRStateVariable {
            name: name.to_string(),
            ty,
            visibility: Visibility::Public,
            constant: false,
            immutable: false,
            initializer: None,
            origin: "Vault".to_string(),
            line: 0,
        }
    }

    fn func(name: &str, mutability: Mutability, body: Vec<Stmt>) -> IRFunction {
        IRFunction {
            name: name.to_string(),
            ident: name.to_string(),
            kind: FunctionKind::Function,
            visibility: Visibility::External,
            mutability,
            params: vec![IRParam {
                name: "amount".to_string(),
                ty: IRType::uint(256),
            }],
            returns: Vec::new(),
            modifiers: Vec::new(),
            body,
            has_body: true,
            origin: "Vault".to_string(),
            is_virtual: false,
            synthetic: false,
            line: 0,
        }
    }

    fn vault() -> IRContract {
        let balances = TypeMapper::map(
            &SourceType::mapping(
                SourceType::elementary("address"),
                SourceType::elementary("uint256"),
            ),
            &StaticScope::new(),
        )
        .unwrap();
        let mut c = IRContract::new("Vault", ContractKind::Contract);
        c.state_vars.push(var("owner", IRType::address()));
        c.state_vars.push(var("deposits", IRType::uint(64)));
        c.state_vars.push(var("balances", balances));
        c.state_vars.push(var("last", IRType::uint(256)));
        c.state_vars.push(var("price", IRType::uint(256)));

        let mut ctor = func(
            "constructor",
            Mutability::NonPayable,
            vec![Stmt::expr(Expr::assign(Expr::ident("owner"), Expr::msg_sender()))],
        );
        ctor.kind = FunctionKind::Constructor;
        ctor.ident = "constructor".to_string();
        c.initializer = Some(ctor);

        c.functions.push(func(
            "deposit",
            Mutability::Payable,
            vec![
                Stmt::expr(Expr::compound(
                    BinaryOp::Add,
                    Expr::index(Expr::ident("balances"), Expr::msg_sender()),
                    Expr::ident("amount"),
                )),
                Stmt::expr(Expr::unary(UnaryOp::PostInc, Expr::ident("deposits"))),
                Stmt::expr(Expr::assign(Expr::ident("last"), Expr::ident("amount"))),
                Stmt::Emit {
                    event: "Deposited".to_string(),
                    args: vec![Expr::ident("amount")],
                },
            ],
        ));
        c.functions.push(func(
            "setPrice",
            Mutability::NonPayable,
            vec![Stmt::expr(Expr::assign(Expr::ident("price"), Expr::ident("amount")))],
        ));
        c.functions.push(func(
            "lastDeposit",
            Mutability::View,
            vec![Stmt::ret(Expr::ident("last"))],
        ));
        c.functions.push(func(
            "quote",
            Mutability::View,
            vec![Stmt::ret(Expr::binary(
                BinaryOp::Mul,
                Expr::ident("price"),
                Expr::ident("amount"),
            ))],
        ));
        c.functions.push(func(
            "touch",
            Mutability::NonPayable,
            vec![Stmt::expr(Expr::assign(
                Expr::ident("price"),
                Expr::binary(BinaryOp::Add, Expr::ident("price"), Expr::num("1")),
            ))],
        ));
        c
    }

    #[test]
    fn test_classification_rules() {
        let analysis = StateVariableAnalyzer::analyze(&vault());
        assert_eq!(analysis.category("owner"), Some(VariableCategory::AdminConfig));
        assert_eq!(analysis.category("deposits"), Some(VariableCategory::Aggregatable));
        assert_eq!(analysis.category("balances"), Some(VariableCategory::UserKeyedMapping));
        assert_eq!(analysis.category("last"), Some(VariableCategory::EventTrackable));
        assert_eq!(analysis.category("price"), Some(VariableCategory::General));
    }

    #[test]
    fn test_confidence_reflects_evidence() {
        let analysis = StateVariableAnalyzer::analyze(&vault());
        assert_eq!(analysis.variables["owner"].confidence, 0.9);
        assert_eq!(analysis.variables["deposits"].confidence, 0.95);
        assert_eq!(analysis.variables["balances"].confidence, 0.9);
    }

    #[test]
    fn test_plain_assignment_defeats_aggregation() {
        let mut contract = vault();
        contract.functions.push(func(
            "reset",
            Mutability::NonPayable,
            vec![Stmt::expr(Expr::assign(Expr::ident("deposits"), Expr::num("0")))],
        ));
        let analysis = StateVariableAnalyzer::analyze(&contract);
        assert_eq!(analysis.category("deposits"), Some(VariableCategory::General));
    }
}
