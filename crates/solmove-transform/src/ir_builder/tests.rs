use super::*;
use crate::errors::Warning;
use crate::frontend::parse_solidity;
use pretty_assertions::assert_eq;
use solmove_core::ir::IRContract;
use solmove_core::source::{BinaryOp, Expr, SourceUnit, Stmt, Visibility};

fn build(sources: &[(&str, &str)], contract: &str) -> (IRContract, Vec<Warning>) {
    let units: Vec<SourceUnit> = sources
        .iter()
        .map(|(path, text)| parse_solidity(path, text).unwrap())
        .collect();
    let (symbols, mut warnings) = SymbolTable::build(&units);
    let mut builder = IrBuilder::new(&symbols);
    let ir = builder.build(symbols.contract(contract).unwrap()).unwrap();
    warnings.extend(builder.take_warnings());
    (ir, warnings)
}

fn idents(ir: &IRContract) -> Vec<&str> {
    ir.functions.iter().map(|f| f.ident.as_str()).collect()
}

const CHAIN: &str = r#"
contract Base {
    uint256 internal stored;

    function value() public view virtual returns (uint256) {
        return stored;
    }

    function bump() public {
        stored += 1;
    }
}

contract Child is Base {
    function value() public view override returns (uint256) {
        return super.value() + 1;
    }
}
"#;

#[test]
fn test_override_replaces_base_function() {
    let (ir, _) = build(&[("Chain.sol", CHAIN)], "Child");
    assert_eq!(ir.bases, vec!["Base".to_string()]);
    assert_eq!(ir.state_vars.len(), 1);
    assert_eq!(ir.state_vars[0].origin, "Base");

    let value: Vec<_> = ir.functions_named("value").collect();
    assert_eq!(value.len(), 1);
    assert_eq!(value[0].origin, "Child");
    assert_eq!(ir.function("bump").unwrap().origin, "Base");
}

#[test]
fn test_super_call_binds_to_private_helper() {
    let (ir, _) = build(&[("Chain.sol", CHAIN)], "Child");
    assert_eq!(idents(&ir), vec!["value", "bump", "value_Base"]);

    let helper = ir.function("value_Base").unwrap();
    assert_eq!(helper.visibility, Visibility::Private);
    assert_eq!(helper.origin, "Base");
    assert_eq!(helper.body, vec![Stmt::ret(Expr::ident("stored"))]);

    assert_eq!(
        ir.function("value").unwrap().body,
        vec![Stmt::ret(Expr::binary(
            BinaryOp::Add,
            Expr::call_named("value_Base", vec![]),
            Expr::num("1")
        ))]
    );
}

#[test]
fn test_constructor_arguments_bind_base_parameters() {
    let (ir, _) = build(
        &[(
            "Ctor.sol",
            r#"
contract Owned {
    address owner;
    constructor(address initialOwner) { owner = initialOwner; }
}

contract Capped {
    uint256 cap;
    constructor(uint256 limit) { cap = limit; }
}

contract Token is Owned, Capped {
    uint256 supply;
    constructor(uint256 initial) Owned(msg.sender) {
        supply = initial;
    }
}
"#,
        )],
        "Token",
    );
    let init = ir.initializer.as_ref().unwrap();
    let params: Vec<&str> = init.params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(params, vec!["initial", "limit"]);
    assert!(init.modifiers.is_empty());

    // Capped is visited last, so its constructor runs first.
    assert_eq!(init.body.len(), 3);
    let Stmt::Block(capped) = &init.body[0] else {
        panic!("expected block for Capped");
    };
    assert_eq!(capped.len(), 1);
    let Stmt::Block(owned) = &init.body[1] else {
        panic!("expected block for Owned");
    };
    match &owned[0] {
        Stmt::VarDecl {
            decls,
            value: Some(value),
        } => {
            assert_eq!(decls[0].as_ref().unwrap().name, "initialOwner");
            assert!(value.is_msg_sender());
        }
        other => panic!("expected binding, got {:?}", other),
    }
    assert_eq!(
        init.body[2],
        Stmt::expr(Expr::assign(Expr::ident("supply"), Expr::ident("initial")))
    );
}

#[test]
fn test_diamond_is_reported() {
    let (ir, warnings) = build(
        &[(
            "Diamond.sol",
            r#"
contract A { uint256 a; }
contract B is A { uint256 b; }
contract C is A { uint256 c; }
contract D is B, C { uint256 d; }
"#,
        )],
        "D",
    );
    assert_eq!(ir.bases, vec!["B", "A", "C"]);
    assert_eq!(ir.state_vars.len(), 4);
    assert!(warnings
        .iter()
        .any(|w| w.message.contains("A is inherited through more than one path")));
}

#[test]
fn test_state_variable_from_unrelated_bases_is_reported() {
    let (ir, warnings) = build(
        &[(
            "Clash.sol",
            r#"
contract A { uint256 a; }
contract B is A { uint256 b; }
contract X { uint256 a; }
contract C is B, X { }
"#,
        )],
        "C",
    );
    assert_eq!(ir.state_vars.len(), 2);
    assert_eq!(ir.state_var("a").unwrap().origin, "A");
    assert!(
        warnings
            .iter()
            .any(|w| w.message.contains("state variable a is declared by both A and X")),
        "{:?}",
        warnings
    );
}

#[test]
fn test_storage_alias_is_replaced_by_its_path() {
    let (ir, _) = build(
        &[(
            "Bank.sol",
            r#"
contract Bank {
    struct Account { uint256 balance; uint256 deposits; }
    mapping(address => Account) accounts;

    function deposit(uint256 amount) public {
        Account storage acct = accounts[msg.sender];
        acct.balance += amount;
        acct.deposits++;
    }
}
"#,
        )],
        "Bank",
    );
    let body = &ir.function("deposit").unwrap().body;
    assert_eq!(body.len(), 2);
    let Stmt::Expr(Expr::Assign { target, .. }) = &body[0] else {
        panic!("expected compound assignment");
    };
    assert_eq!(target.root_ident(), Some("accounts"));
    assert_eq!(
        **target,
        Expr::member(Expr::index(Expr::ident("accounts"), Expr::msg_sender()), "balance")
    );
}

#[test]
fn test_overloads_and_named_arguments() {
    let (ir, _) = build(
        &[(
            "Calc.sol",
            r#"
contract Calc {
    function diff(uint256 a, uint256 b) internal pure returns (uint256) { return a - b; }
    function diff(uint256 a) internal pure returns (uint256) { return a; }
    function run() public pure returns (uint256) { return diff({b: 1, a: 5}); }
}
"#,
        )],
        "Calc",
    );
    assert_eq!(idents(&ir), vec!["diff", "diff_1", "run"]);
    let Stmt::Return(Some(Expr::Call { args, named, .. })) = &ir.function("run").unwrap().body[0]
    else {
        panic!("expected call");
    };
    assert!(named.is_empty());
    assert_eq!(args, &vec![Expr::num("5"), Expr::num("1")]);

    let name = String::from("diff");
    assert_eq!(ir.resolve_call(&name, 1).unwrap().ident, "diff_1");
    assert_eq!(ir.resolve_call(&name, 2).unwrap().ident, "diff");
    assert!(ir.resolve_call("missing", 0).is_none());
}

#[test]
fn test_cross_file_symbols_and_getters() {
    let (ir, warnings) = build(
        &[
            (
                "Fees.sol",
                r#"
uint256 constant FEE_BPS = 30;
contract FeeBase { uint256 public collected; }
"#,
            ),
            (
                "Pool.sol",
                r#"
import "./Fees.sol";
import "./Missing.sol";

contract Pool is FeeBase, Ghost {
    uint256 private reserve;
    function fee(uint256 amount) public pure returns (uint256) {
        return amount * FEE_BPS / 10000;
    }
}
"#,
            ),
        ],
        "Pool",
    );
    assert!(ir.constant("FEE_BPS").is_some());
    let getter = ir.function("collected").unwrap();
    assert!(getter.synthetic);
    assert!(getter.is_view());
    assert!(ir.function("reserve").is_none());

    let messages: Vec<&str> = warnings.iter().map(|w| w.message.as_str()).collect();
    assert!(messages.iter().any(|m| m.contains("./Missing.sol")));
    assert!(messages.iter().any(|m| m.contains("Ghost")));
    assert!(!messages.iter().any(|m| m.contains("./Fees.sol")));
}
