use pretty_assertions::assert_eq;
use solmove_core::source::SourceType;
use solmove_core::type_mapper::{StaticScope, UserTypeKind};
use solmove_core::TypeMapper;
use solmove_parser::{parse_type_list, parse_type_name};

fn move_type(text: &str) -> String {
    let scope = StaticScope::new()
        .with("Position", UserTypeKind::Struct)
        .with("Side", UserTypeKind::Enum)
        .with("IERC20", UserTypeKind::Contract);
    let ty = parse_type_name(text).unwrap();
    TypeMapper::map(&ty, &scope).unwrap().target.to_string()
}

#[test]
fn test_declaration_types_map_to_move() {
    assert_eq!(move_type("uint"), "u256");
    assert_eq!(move_type("int40"), "i64");
    assert_eq!(move_type("address payable"), "address");
    assert_eq!(move_type("string memory"), "String");
    assert_eq!(move_type("bytes4"), "vector<u8>");
    assert_eq!(move_type("IERC20"), "address");
    assert_eq!(move_type("Side[]"), "vector<u8>");
    assert_eq!(
        move_type("mapping(address => Positions.Position[])"),
        "Table<address, vector<Position>>"
    );
}

#[test]
fn test_qualified_user_type_keeps_qualifier() {
    assert_eq!(
        parse_type_name("Lib.Entry[3]").unwrap(),
        SourceType::array(SourceType::UserDefined("Lib.Entry".to_string()), Some(3))
    );
}

#[test]
fn test_function_type_parses_but_does_not_map() {
    let ty = parse_type_name("function (uint256) external returns (bool)").unwrap();
    assert!(matches!(ty, SourceType::Elementary(ref name) if name.starts_with("function")));
    assert!(TypeMapper::map(&ty, &StaticScope::new()).is_err());
}

#[test]
fn test_decode_type_list() {
    assert_eq!(
        parse_type_list("(uint256, address, bytes)").unwrap(),
        vec![
            SourceType::elementary("uint256"),
            SourceType::elementary("address"),
            SourceType::elementary("bytes"),
        ]
    );
    assert_eq!(parse_type_list("()").unwrap(), vec![]);
}
