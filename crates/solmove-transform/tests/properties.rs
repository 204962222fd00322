use pretty_assertions::assert_eq;
use solmove_core::source::{ContractKind, SourceContract, SourceUnit};
use solmove_transform::{SourceFile, TranspileConfig, Transpiler};

const TOKEN: &str = r#"
pragma solidity ^0.8.20;

contract Token {
    address owner;
    uint256 public totalSupply;
    mapping(address => uint256) private balances;

    event Transfer(address indexed from, address indexed to, uint256 value);
    error Insufficient(uint256 available);

    constructor(uint256 supply) {
        owner = msg.sender;
        totalSupply = supply;
        balances[msg.sender] = supply;
    }

    function transfer(address to, uint256 amount) external returns (bool) {
        require(amount > 0, "zero amount");
        if (balances[msg.sender] < amount) {
            revert Insufficient(balances[msg.sender]);
        }
        balances[msg.sender] -= amount;
        balances[to] += amount;
        emit Transfer(msg.sender, to, amount);
        return true;
    }

    function mint(address to, uint256 amount) public {
        require(msg.sender == owner, "only owner");
        totalSupply += amount;
        balances[to] += amount;
    }

    function balanceOf(address who) public view returns (uint256) {
        return balances[who];
    }
}
"#;

#[test]
fn test_output_is_byte_identical_across_runs() {
    let transpiler = Transpiler::default();
    let first = transpiler.transpile_source("Token.sol", TOKEN);
    let second = transpiler.transpile_source("Token.sol", TOKEN);
    assert!(first.success, "errors: {:?}", first.errors);
    assert_eq!(first, second);
}

#[test]
fn test_error_codes_follow_their_ranges() {
    let result = Transpiler::default().transpile_source("Token.sol", TOKEN);
    let source = &result.module("Token").unwrap().source;
    assert!(source.contains("const E_ONLY_OWNER: u64 = 1;"), "{}", source);
    assert!(source.contains("const E_ZERO_AMOUNT: u64 = 100;"), "{}", source);
    assert!(source.contains("const E_INSUFFICIENT: u64 = 1000;"), "{}", source);
}

#[test]
fn test_token_module_shape() {
    let result = Transpiler::default().transpile_source("Token.sol", TOKEN);
    let source = &result.module("Token").unwrap().source;

    assert!(source.contains("#[event]"));
    assert!(source.contains("struct Transfer has drop, store {"));
    assert!(source.contains("event::emit("));
    assert!(source.contains("use aptos_framework::event;"));
    assert!(source.contains("use std::signer;"));
    assert!(source.contains("public entry fun initialize(deployer: &signer, supply: u256)"));
    assert!(source.contains("E_ALREADY_INITIALIZED"));
    assert!(source.contains("public entry fun transfer(account: &signer, to: address, amount: u256)"));
    assert!(source.contains("fun transfer_inner("));
}

#[test]
fn test_acquires_match_borrowed_resources() {
    let result = Transpiler::default().transpile_source("Token.sol", TOKEN);
    let module = result.module("Token").unwrap();
    let summary = &module.summary.module;
    assert!(!summary.resources.is_empty());

    for function in &summary.functions {
        let start = module
            .source
            .find(&format!("fun {}(", function.name))
            .unwrap();
        let rest = &module.source[start..];
        let body = &rest[..rest.find("\n    }\n").unwrap_or(rest.len())];
        let borrowed: Vec<&String> = summary
            .resources
            .iter()
            .filter(|r| {
                body.contains(&format!("borrow_global<{}>", r))
                    || body.contains(&format!("borrow_global_mut<{}>", r))
            })
            .collect();
        for resource in borrowed {
            assert!(
                function.acquires.contains(resource),
                "{} borrows {} without acquiring it",
                function.name,
                resource
            );
        }
    }
}

#[test]
fn test_override_replaces_base_function() {
    let result = Transpiler::default().transpile_source(
        "Chain.sol",
        r#"
abstract contract Base {
    uint256 stored;

    function keep() public view returns (uint256) {
        return stored;
    }

    function rate() public pure virtual returns (uint256) {
        return 111;
    }
}

contract Child is Base {
    function rate() public pure override returns (uint256) {
        return 222;
    }
}
"#,
    );
    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.modules.len(), 1);
    let source = &result.module("Child").unwrap().source;
    assert_eq!(source.matches("fun rate(").count(), 1, "{}", source);
    assert_eq!(source.matches("fun keep(").count(), 1, "{}", source);
    assert!(source.contains("222"));
    assert!(!source.contains("111"));
}

#[test]
fn test_context_files_supply_libraries() {
    let library = SourceFile::new(
        "MathLib.sol",
        r#"
library MathLib {
    function double(uint256 x) internal pure returns (uint256) {
        return x * 2;
    }
}
"#,
    );
    let main = SourceFile::new(
        "Uses.sol",
        r#"
import "./MathLib.sol";

contract Uses {
    uint256 value;

    function grow() public {
        value = MathLib.double(value);
    }
}
"#,
    );
    let result = Transpiler::default().transpile_files(&[main], &[library]);
    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.modules.len(), 1);
    let source = &result.module("Uses").unwrap().source;
    assert!(source.contains("use solmove::math_lib;"), "{}", source);
    assert!(source.contains("math_lib::double("), "{}", source);
}

#[test]
fn test_json_source_unit_input() {
    let mut unit = SourceUnit::new("Empty.sol");
    unit.contracts
        .push(SourceContract::new("Empty", ContractKind::Contract));
    let json = serde_json::to_string(&unit).unwrap();

    let result = Transpiler::default().transpile_json(&json);
    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.modules[0].module_name, "empty");

    let broken = Transpiler::default().transpile_json("{ not json");
    assert!(!broken.success);
    assert_eq!(broken.errors[0].contract, "<input>");
}

#[test]
fn test_platform_module_name_is_rejected() {
    let result = Transpiler::default().transpile_source(
        "Signer.sol",
        r#"
contract Signer {
    uint256 x;
    function set(uint256 v) public { x = v; }
}
"#,
    );
    assert!(!result.success);
    assert_eq!(
        result.error_for("Signer").unwrap().kind,
        solmove_transform::ErrorKind::NamingCollision
    );
}

#[test]
fn test_descriptive_errors_use_canonical_categories() {
    let config = TranspileConfig {
        error_style: solmove_transform::ErrorStyle::Descriptive,
        ..TranspileConfig::default()
    };
    let result = Transpiler::new(config).transpile_source("Token.sol", TOKEN);
    let source = &result.module("Token").unwrap().source;
    assert!(source.contains("error::permission_denied(E_ONLY_OWNER)"), "{}", source);
    assert!(source.contains("use std::error;"), "{}", source);
}
