#![allow(unused_imports)]
use solmove_core::source::{
    ContractKind, Expr, FunctionDecl, Mutability, SourceContract, SourceType, StateVarDecl, Stmt,
    Visibility,
};
use solmove_core::type_mapper::{StaticScope, UserTypeKind};
use solmove_core::{IrError, SourceUnit, TypeMapper};

fn registry() -> SourceContract {
    let mut c = SourceContract::new("Registry", ContractKind::Contract);
    c.state_vars.push(
        StateVarDecl::new(
            "entries",
            SourceType::mapping(
                SourceType::elementary("address"),
                SourceType::UserDefined("Registry.Entry".to_string()),
            ),
        )
        .public(),
    );
    c.state_vars.push(StateVarDecl::new(
        "tags",
        SourceType::array(SourceType::elementary("bytes32"), None),
    ));
    c.state_vars.push(StateVarDecl::new("status", SourceType::UserDefined("Status".to_string())));
    c.state_vars.push(StateVarDecl::new("count", SourceType::elementary("uint24")));
    c.functions.push(
        FunctionDecl::new("register", Visibility::External, Mutability::NonPayable)
            .param("tag", SourceType::elementary("bytes32"))
            .body(vec![Stmt::expr(Expr::call(
                Expr::member(Expr::ident("tags"), "push"),
                vec![Expr::ident("tag")],
            ))]),
    );
    c
}

fn scope() -> StaticScope {
    StaticScope::new()
        .with("Entry", UserTypeKind::Struct)
        .with("Status", UserTypeKind::Enum)
}

#[test]
fn test_state_var_types_render_as_move() {
    let contract = registry();
    let rendered: Vec<String> = contract
        .state_vars
        .iter()
        .map(|v| TypeMapper::map(&v.ty, &scope()).unwrap().target.to_string())
        .collect();
    assert_eq!(
        rendered,
        vec!["Table<address, Entry>", "vector<vector<u8>>", "u8", "u32"]
    );
}

#[test]
fn test_unknown_user_type_is_an_error() {
    let result = TypeMapper::map(
        &SourceType::UserDefined("Missing".to_string()),
        &StaticScope::new(),
    );
    assert!(matches!(result, Err(IrError::TypeMapping(_))));
}

#[test]
fn test_source_unit_lookup_and_json() {
    let mut unit = SourceUnit::new("contracts/Registry.sol");
    unit.contracts.push(registry());
    assert!(unit.contract("Registry").is_some());
    assert!(unit.contract("Other").is_none());

    let json = serde_json::to_string(&unit).unwrap();
    let back: SourceUnit = serde_json::from_str(&json).unwrap();
    assert_eq!(back, unit);
}
