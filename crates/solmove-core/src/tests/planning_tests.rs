use crate::analysis::{
    GroupKind, OptimizationLevel, PlannerConfig, ResourcePlanner, StateVariableAnalyzer,
    VariableCategory,
};
use crate::ir::{IRContract, IRFunction, IRModifier, IRParam, IRStateVariable, IRType};
use crate::source::{
    BinaryOp, ContractKind, Expr, FunctionKind, ModifierInvocation, Mutability, SourceType, Stmt,
    Visibility,
};
use crate::type_mapper::{StaticScope, TypeMapper};

fn map(ty: SourceType) -> IRType {
    TypeMapper::map(&ty, &StaticScope::new()).unwrap()
}

fn state(name: &str, ty: IRType) -> IRStateVariable {
    IRStateVariable {
        name: name.to_string(),
        ty,
        visibility: Visibility::Public,
        constant: false,
        immutable: false,
        initializer: None,
        origin: "Token".to_string(),
        line: 0,
    }
}

fn function(
    name: &str,
    visibility: Visibility,
    mutability: Mutability,
    params: &[(&str, IRType)],
    body: Vec<Stmt>,
) -> IRFunction {
    IRFunction {
        name: name.to_string(),
        ident: name.to_string(),
        kind: FunctionKind::Function,
        visibility,
        mutability,
        params: params
            .iter()
            .map(|(n, t)| IRParam {
                name: n.to_string(),
                ty: t.clone(),
            })
            .collect(),
        returns: Vec::new(),
        modifiers: Vec::new(),
        body,
        has_body: true,
        origin: "Token".to_string(),
        is_virtual: false,
        synthetic: false,
        line: 0,
    }
}

fn balances_of(key: Expr) -> Expr {
    Expr::index(Expr::ident("balances"), key)
}

/// An ERC20-shaped token: owner-gated mint, transfers through an internal helper.
fn token() -> IRContract {
    let address = || SourceType::elementary("address");
    let uint = || SourceType::elementary("uint256");
    let mut c = IRContract::new("Token", ContractKind::Contract);
    c.state_vars.push(state("owner", IRType::address()));
    c.state_vars.push(state("totalSupply", IRType::uint(256)));
    c.state_vars.push(state("balances", map(SourceType::mapping(address(), uint()))));
    c.state_vars.push(state(
        "allowances",
        map(SourceType::mapping(
            address(),
            SourceType::mapping(address(), uint()),
        )),
    ));

    let mut ctor = function("constructor", Visibility::Public, Mutability::NonPayable, &[], vec![
        Stmt::expr(Expr::assign(Expr::ident("owner"), Expr::msg_sender())),
    ]);
    ctor.kind = FunctionKind::Constructor;
    c.initializer = Some(ctor);

    c.modifiers.push(IRModifier {
        name: "onlyOwner".to_string(),
        params: Vec::new(),
        body: vec![
            Stmt::require(
                Expr::binary(BinaryOp::Eq, Expr::msg_sender(), Expr::ident("owner")),
                "not owner",
            ),
            Stmt::Placeholder,
        ],
        origin: "Token".to_string(),
    });

    let mut mint = function(
        "mint",
        Visibility::External,
        Mutability::NonPayable,
        &[("to", IRType::address()), ("amount", IRType::uint(256))],
        vec![
            Stmt::expr(Expr::compound(BinaryOp::Add, Expr::ident("totalSupply"), Expr::ident("amount"))),
            Stmt::expr(Expr::compound(
                BinaryOp::Add,
                balances_of(Expr::ident("to")),
                Expr::ident("amount"),
            )),
        ],
    );
    mint.modifiers.push(ModifierInvocation {
        name: "onlyOwner".to_string(),
        args: Vec::new(),
    });
    c.functions.push(mint);

    c.functions.push(function(
        "transfer",
        Visibility::External,
        Mutability::NonPayable,
        &[("to", IRType::address()), ("amount", IRType::uint(256))],
        vec![Stmt::expr(Expr::call_named(
            "_move",
            vec![Expr::msg_sender(), Expr::ident("to"), Expr::ident("amount")],
        ))],
    ));
    c.functions.push(function(
        "_move",
        Visibility::Internal,
        Mutability::NonPayable,
        &[
            ("from", IRType::address()),
            ("to", IRType::address()),
            ("amount", IRType::uint(256)),
        ],
        vec![
            Stmt::expr(Expr::compound(
                BinaryOp::Sub,
                balances_of(Expr::ident("from")),
                Expr::ident("amount"),
            )),
            Stmt::expr(Expr::compound(
                BinaryOp::Add,
                balances_of(Expr::ident("to")),
                Expr::ident("amount"),
            )),
        ],
    ));
    c.functions.push(function(
        "approve",
        Visibility::External,
        Mutability::NonPayable,
        &[("spender", IRType::address()), ("amount", IRType::uint(256))],
        vec![Stmt::expr(Expr::assign(
            Expr::index(
                Expr::index(Expr::ident("allowances"), Expr::msg_sender()),
                Expr::ident("spender"),
            ),
            Expr::ident("amount"),
        ))],
    ));
    c.functions.push(function(
        "balanceOf",
        Visibility::External,
        Mutability::View,
        &[("who", IRType::address())],
        vec![Stmt::ret(balances_of(Expr::ident("who")))],
    ));
    c
}

#[test]
fn test_token_classification() {
    let analysis = StateVariableAnalyzer::analyze(&token());
    assert_eq!(analysis.category("owner"), Some(VariableCategory::AdminConfig));
    assert_eq!(analysis.category("totalSupply"), Some(VariableCategory::AdminConfig));
    assert_eq!(analysis.category("balances"), Some(VariableCategory::General));
    assert_eq!(analysis.category("allowances"), Some(VariableCategory::UserKeyedMapping));
}

#[test]
fn test_profiles_are_transitive_through_internal_calls() {
    let contract = token();
    let analysis = StateVariableAnalyzer::analyze(&contract);
    let config = PlannerConfig {
        level: OptimizationLevel::Basic,
    };
    let plan = ResourcePlanner::new(&contract, &analysis, &config).plan().unwrap();

    let balances_group = plan.var_group["balances"].clone();
    let transfer = plan.profile("transfer").unwrap();
    assert!(transfer.writes.contains(&balances_group));
    assert_eq!(transfer.acquires, plan.profile("_move").unwrap().acquires);

    let view = plan.profile("balanceOf").unwrap();
    assert!(view.writes.is_empty());
    assert!(view.reads.contains(&balances_group));
}

#[test]
fn test_every_variable_in_exactly_one_group_at_each_level() {
    let contract = token();
    let analysis = StateVariableAnalyzer::analyze(&contract);
    for level in [
        OptimizationLevel::None,
        OptimizationLevel::Basic,
        OptimizationLevel::Full,
    ] {
        let config = PlannerConfig { level };
        let plan = ResourcePlanner::new(&contract, &analysis, &config).plan().unwrap();
        for var in &contract.state_vars {
            let holders = plan
                .groups
                .iter()
                .filter(|g| g.variables.contains(&var.name))
                .count();
            assert_eq!(holders, 1, "{} at {:?}", var.name, level);
        }
    }
}

#[test]
fn test_nested_user_mapping_is_not_distributed() {
    let contract = token();
    let analysis = StateVariableAnalyzer::analyze(&contract);
    let config = PlannerConfig {
        level: OptimizationLevel::Full,
    };
    let plan = ResourcePlanner::new(&contract, &analysis, &config).plan().unwrap();
    assert!(plan.distributed_groups().next().is_none());
    assert_eq!(plan.group_of("owner").unwrap().kind, GroupKind::Config);
}

#[test]
fn test_checks_against_parameters_leave_caller_mapping_distributed() {
    let mut c = IRContract::new("Wallet", ContractKind::Contract);
    c.state_vars.push(state(
        "balances",
        map(SourceType::mapping(
            SourceType::elementary("address"),
            SourceType::elementary("uint256"),
        )),
    ));
    c.functions.push(function(
        "transfer",
        Visibility::External,
        Mutability::NonPayable,
        &[("to", IRType::address()), ("value", IRType::uint(256))],
        vec![
            Stmt::require(
                Expr::binary(BinaryOp::Ne, Expr::ident("to"), Expr::msg_sender()),
                "self transfer",
            ),
            Stmt::expr(Expr::assign(balances_of(Expr::msg_sender()), Expr::ident("value"))),
        ],
    ));

    let analysis = StateVariableAnalyzer::analyze(&c);
    assert_eq!(analysis.category("balances"), Some(VariableCategory::UserKeyedMapping));
    let config = PlannerConfig {
        level: OptimizationLevel::Full,
    };
    let plan = ResourcePlanner::new(&c, &analysis, &config).plan().unwrap();
    assert_eq!(plan.group_of("balances").unwrap().kind, GroupKind::Distributed);
}
