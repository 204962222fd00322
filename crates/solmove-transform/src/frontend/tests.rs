use super::*;
use pretty_assertions::assert_eq;
use solmove_core::source::{
    BinaryOp, ContractKind, Expr, FunctionKind, Mutability, SourceType, Stmt, UnaryOp,
    Visibility,
};

const TOKEN: &str = r#"
pragma solidity ^0.8.20;

import "./Ownable.sol";

contract Token is Ownable {
    uint256 public totalSupply;
    mapping(address => uint256) private balances;
    uint8 constant DECIMALS = 18;

    event Transfer(address indexed from, address indexed to, uint256 value);
    error Insufficient(uint256 available);

    modifier nonZero(uint256 amount) {
        require(amount > 0, "zero amount");
        _;
    }

    constructor(uint256 supply) Ownable(msg.sender) {
        totalSupply = supply;
        balances[msg.sender] = supply;
    }

    function transfer(address to, uint256 amount) external nonZero(amount) returns (bool) {
        if (balances[msg.sender] < amount) {
            revert Insufficient(balances[msg.sender]);
        }
        balances[msg.sender] -= amount;
        balances[to] += amount;
        emit Transfer(msg.sender, to, amount);
        return true;
    }

    function balanceOf(address who) public view returns (uint256) {
        return balances[who];
    }
}
"#;

fn parse(source: &str) -> SourceUnit {
    parse_solidity("Token.sol", source).unwrap()
}

#[test]
fn test_declarations() {
    let unit = parse(TOKEN);
    assert_eq!(unit.imports, vec!["./Ownable.sol".to_string()]);
    let token = unit.contract("Token").unwrap();
    assert_eq!(token.kind, ContractKind::Contract);
    assert_eq!(token.parse_error, None);
    assert_eq!(token.bases.len(), 1);
    assert_eq!(token.bases[0].name, "Ownable");

    let names: Vec<&str> = token.state_vars.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["totalSupply", "balances", "DECIMALS"]);
    assert_eq!(token.state_vars[0].visibility, Visibility::Public);
    assert_eq!(
        token.state_vars[1].ty,
        SourceType::mapping(
            SourceType::elementary("address"),
            SourceType::elementary("uint256")
        )
    );
    assert!(token.state_vars[2].constant);
    assert_eq!(token.state_vars[2].value, Some(Expr::num("18")));

    assert_eq!(token.events[0].name, "Transfer");
    assert!(token.events[0].params[0].indexed);
    assert!(!token.events[0].params[2].indexed);
    assert_eq!(token.errors[0].name, "Insufficient");
    assert_eq!(token.modifiers[0].name, "nonZero");
    assert_eq!(Stmt::count_placeholders(&token.modifiers[0].body), 1);
}

#[test]
fn test_functions() {
    let unit = parse(TOKEN);
    let token = unit.contract("Token").unwrap();

    let ctor = token.constructor().unwrap();
    assert_eq!(ctor.kind, FunctionKind::Constructor);
    assert_eq!(ctor.params[0].name.as_deref(), Some("supply"));
    assert_eq!(ctor.modifiers[0].name, "Ownable");
    assert_eq!(ctor.modifiers[0].args, vec![Expr::msg_sender()]);

    let transfer = token.functions.iter().find(|f| f.name == "transfer").unwrap();
    assert_eq!(transfer.visibility, Visibility::External);
    assert_eq!(transfer.mutability, Mutability::NonPayable);
    assert_eq!(transfer.modifiers[0].name, "nonZero");
    assert_eq!(transfer.returns.len(), 1);
    let body = transfer.body.as_ref().unwrap();
    assert_eq!(body.len(), 5);
    match &body[1] {
        Stmt::Expr(Expr::Assign {
            op: Some(BinaryOp::Sub),
            target,
            ..
        }) => assert_eq!(target.root_ident(), Some("balances")),
        other => panic!("expected compound assignment, got {:?}", other),
    }
    assert!(matches!(&body[3], Stmt::Emit { event, args } if event == "Transfer" && args.len() == 3));
    assert_eq!(body[4], Stmt::Return(Some(Expr::Bool(true))));

    let balance_of = token.functions.iter().find(|f| f.name == "balanceOf").unwrap();
    assert!(balance_of.is_view());
}

#[test]
fn test_custom_error_revert() {
    let unit = parse(TOKEN);
    let token = unit.contract("Token").unwrap();
    let transfer = token.functions.iter().find(|f| f.name == "transfer").unwrap();
    let Stmt::If { then, .. } = &transfer.body.as_ref().unwrap()[0] else {
        panic!("expected if");
    };
    let Stmt::Block(inner) = then.as_ref() else {
        panic!("expected block");
    };
    assert!(matches!(&inner[0], Stmt::Revert { error: Some(e), args } if e == "Insufficient" && args.len() == 1));
}

#[test]
fn test_expressions() {
    let unit = parse(
        r#"
contract Math {
    function f(uint256 a) public pure returns (uint256) {
        uint256 b = a ** 2 + type(uint24).max;
        b++;
        --b;
        return a > b ? a : b;
    }
}
"#,
    );
    let body = unit.contract("Math").unwrap().functions[0]
        .body
        .clone()
        .unwrap();
    match &body[0] {
        Stmt::VarDecl { decls, value } => {
            assert_eq!(decls[0].as_ref().unwrap().name, "b");
            let Some(Expr::Binary { op, lhs, rhs }) = value else {
                panic!("expected binary");
            };
            assert_eq!(*op, BinaryOp::Add);
            assert!(matches!(lhs.as_ref(), Expr::Binary { op: BinaryOp::Pow, .. }));
            assert!(matches!(rhs.as_ref(), Expr::Member { member, .. } if member == "max"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(
        body[1],
        Stmt::Expr(Expr::unary(UnaryOp::PostInc, Expr::ident("b")))
    );
    assert_eq!(
        body[2],
        Stmt::Expr(Expr::unary(UnaryOp::PreDec, Expr::ident("b")))
    );
    assert!(matches!(&body[3], Stmt::Return(Some(Expr::Ternary { .. }))));
}

#[test]
fn test_suffixes_bind_to_the_rightmost_operand() {
    let unit = parse(
        r#"
contract Ledger {
    mapping(address => uint256) balances;

    function f(address to, uint256 amount) public view returns (uint256) {
        uint256 total = amount + balances[to];
        return total - type(uint24).max;
    }
}
"#,
    );
    let body = unit.contract("Ledger").unwrap().functions[0]
        .body
        .clone()
        .unwrap();
    let Stmt::VarDecl { value, .. } = &body[0] else {
        panic!("expected declaration, got {:?}", body[0]);
    };
    assert_eq!(
        value,
        &Some(Expr::binary(
            BinaryOp::Add,
            Expr::ident("amount"),
            Expr::index(Expr::ident("balances"), Expr::ident("to")),
        ))
    );
    let Stmt::Return(Some(Expr::Binary { op, lhs, rhs })) = &body[1] else {
        panic!("expected binary return, got {:?}", body[1]);
    };
    assert_eq!(*op, BinaryOp::Sub);
    assert_eq!(lhs.as_ref(), &Expr::ident("total"));
    assert!(
        matches!(rhs.as_ref(), Expr::Member { object, member }
            if member == "max" && matches!(object.as_ref(), Expr::TypeInfo(_))),
        "{:?}",
        rhs
    );
}

#[test]
fn test_else_branches() {
    let unit = parse(
        r#"
contract Branches {
    uint256 x;

    function f(bool c, bool d) public {
        if (c) { x = 1; } else { x = 2; }
        if (c) x = 3; else x = 4;
        if (c) { x = 5; } else if (d) { x = 6; } else { x = 7; }
    }
}
"#,
    );
    let body = unit.contract("Branches").unwrap().functions[0]
        .body
        .clone()
        .unwrap();
    assert_eq!(body.len(), 3);
    let set = |n: &str| Stmt::Expr(Expr::assign(Expr::ident("x"), Expr::num(n)));

    let Stmt::If { otherwise: Some(otherwise), .. } = &body[0] else {
        panic!("expected if/else, got {:?}", body[0]);
    };
    assert_eq!(otherwise.as_ref(), &Stmt::Block(vec![set("2")]));

    let Stmt::If { then, otherwise: Some(otherwise), .. } = &body[1] else {
        panic!("expected if/else, got {:?}", body[1]);
    };
    assert_eq!(then.as_ref(), &set("3"));
    assert_eq!(otherwise.as_ref(), &set("4"));

    let Stmt::If { otherwise: Some(otherwise), .. } = &body[2] else {
        panic!("expected if/else, got {:?}", body[2]);
    };
    let Stmt::If { cond, otherwise: Some(last), .. } = otherwise.as_ref() else {
        panic!("expected else if, got {:?}", otherwise);
    };
    assert_eq!(cond, &Expr::ident("d"));
    assert_eq!(last.as_ref(), &Stmt::Block(vec![set("7")]));
}

#[test]
fn test_broken_contract_is_isolated() {
    let unit = parse(
        r#"
contract Good {
    uint256 x;
    function set(uint256 v) public { x = v; }
}

contract Bad {
    function oops() public {
        uint256 y = ;
    }
}
"#,
    );
    assert_eq!(unit.contract("Good").unwrap().parse_error, None);
    assert!(unit.contract("Bad").unwrap().parse_error.is_some());
}

#[test]
fn test_file_level_declarations() {
    let unit = parse(
        r#"
uint256 constant MAX = 100;
struct Point { uint256 x; uint256 y; }
enum Side { Left, Right }
library Geometry {
    function area(Point memory p) internal pure returns (uint256) { return p.x * p.y; }
}
"#,
    );
    assert_eq!(unit.constants[0].name, "MAX");
    assert_eq!(unit.structs[0].fields.len(), 2);
    assert_eq!(unit.enums[0].variants, vec!["Left".to_string(), "Right".to_string()]);
    assert_eq!(unit.contract("Geometry").unwrap().kind, ContractKind::Library);
}
