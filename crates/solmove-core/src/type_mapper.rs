use crate::ir::{IRType, IRTypeKind};
use crate::source::SourceType;
use crate::types::{nearest_width, MoveType};
use crate::{IrError, Result};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserTypeKind {
    Struct,
    Enum,
    Contract,
}

/// Resolves user-defined type names for the mapper.
pub trait TypeScope {
    fn resolve_user_type(&self, name: &str) -> Option<UserTypeKind>;
}

/// A fixed table of user type names.
#[derive(Debug, Clone, Default)]
pub struct StaticScope {
    kinds: HashMap<String, UserTypeKind>,
}

impl StaticScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, kind: UserTypeKind) -> Self {
        self.kinds.insert(name.to_string(), kind);
        self
    }

    pub fn insert(&mut self, name: &str, kind: UserTypeKind) {
        self.kinds.insert(name.to_string(), kind);
    }
}

impl TypeScope for StaticScope {
    fn resolve_user_type(&self, name: &str) -> Option<UserTypeKind> {
        self.kinds.get(name).copied()
    }
}

pub struct TypeMapper;

impl TypeMapper {
    pub fn map(ty: &SourceType, scope: &dyn TypeScope) -> Result<IRType> {
        let source_name = ty.name();
        match ty {
            SourceType::Elementary(name) => Self::map_elementary(name),
            SourceType::UserDefined(name) => Self::map_user_defined(name, scope),
            SourceType::Array(element, length) => {
                let element = Self::map(element, scope)?;
                if element.is_mapping() {
                    return Err(IrError::TypeMapping(format!(
                        "arrays of mappings are not representable: {}",
                        source_name
                    )));
                }
                Ok(IRType::new(
                    source_name,
                    MoveType::Vector(Box::new(element.target.clone())),
                    IRTypeKind::Array {
                        element: Box::new(element),
                        length: *length,
                    },
                ))
            }
            SourceType::Mapping(key, value) => {
                let key = Self::map(key, scope)?;
                if key.is_mapping() || key.is_array() {
                    return Err(IrError::TypeMapping(format!(
                        "mapping key must be a value type: {}",
                        source_name
                    )));
                }
                let value = Self::map(value, scope)?;
                Ok(IRType::new(
                    source_name,
                    MoveType::Table(Box::new(key.target.clone()), Box::new(value.target.clone())),
                    IRTypeKind::Mapping {
                        key: Box::new(key),
                        value: Box::new(value),
                    },
                ))
            }
        }
    }

    pub fn map_elementary(name: &str) -> Result<IRType> {
        let name = name.trim();
        let integer = |prefix: &str, signed: bool| -> Option<Result<IRType>> {
            let digits = name.strip_prefix(prefix)?;
            let bits = if digits.is_empty() {
                256
            } else {
                digits.parse::<u16>().ok()?
            };
            if bits == 0 || bits > 256 || bits % 8 != 0 {
                return Some(Err(IrError::TypeMapping(format!(
                    "invalid integer width: {}",
                    name
                ))));
            }
            let width = nearest_width(bits)?;
            let target = if signed {
                MoveType::Int(width)
            } else {
                MoveType::Uint(width)
            };
            Some(Ok(IRType::new(
                name,
                target,
                IRTypeKind::Primitive { width, signed },
            )))
        };

        match name {
            "bool" => Ok(IRType::bool()),
            "address" | "address payable" => Ok(IRType::address()),
            "string" => Ok(IRType::new("string", MoveType::String, IRTypeKind::String)),
            "bytes" => Ok(IRType::new(
                "bytes",
                MoveType::bytes(),
                IRTypeKind::Bytes { fixed: None },
            )),
            "byte" => Ok(IRType::new(
                "byte",
                MoveType::bytes(),
                IRTypeKind::Bytes { fixed: Some(1) },
            )),
            _ => {
                if let Some(result) = integer("uint", false) {
                    return result;
                }
                if let Some(result) = integer("int", true) {
                    return result;
                }
                if let Some(len) = name.strip_prefix("bytes") {
                    if let Ok(len) = len.parse::<u16>() {
                        if (1..=32).contains(&len) {
                            return Ok(IRType::new(
                                name,
                                MoveType::bytes(),
                                IRTypeKind::Bytes { fixed: Some(len) },
                            ));
                        }
                    }
                }
                Err(IrError::TypeMapping(format!("no mapping for type '{}'", name)))
            }
        }
    }

    fn map_user_defined(name: &str, scope: &dyn TypeScope) -> Result<IRType> {
        let local = name.rsplit('.').next().unwrap_or(name);
        let kind = scope
            .resolve_user_type(name)
            .or_else(|| scope.resolve_user_type(local));
        match kind {
            Some(UserTypeKind::Struct) => Ok(IRType::new(
                name,
                MoveType::local_struct(local),
                IRTypeKind::Struct(local.to_string()),
            )),
            Some(UserTypeKind::Enum) => Ok(IRType::new(
                name,
                MoveType::u8(),
                IRTypeKind::Enum(local.to_string()),
            )),
            Some(UserTypeKind::Contract) => Ok(IRType::new(
                name,
                MoveType::Address,
                IRTypeKind::Contract(local.to_string()),
            )),
            None => Err(IrError::TypeMapping(format!(
                "unknown type '{}'",
                name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(ty: SourceType) -> Result<IRType> {
        TypeMapper::map(&ty, &StaticScope::new())
    }

    #[test]
    fn test_integer_widths_round_up() {
        let t = map(SourceType::elementary("uint24")).unwrap();
        assert_eq!(t.target, MoveType::Uint(32));
        assert_eq!(
            t.kind,
            IRTypeKind::Primitive {
                width: 32,
                signed: false
            }
        );
        assert_eq!(map(SourceType::elementary("uint")).unwrap().target, MoveType::u256());
        assert_eq!(map(SourceType::elementary("int8")).unwrap().target, MoveType::Int(8));
        assert_eq!(map(SourceType::elementary("uint160")).unwrap().target, MoveType::u256());
    }

    #[test]
    fn test_nested_mapping() {
        let ty = SourceType::mapping(
            SourceType::elementary("address"),
            SourceType::mapping(SourceType::elementary("address"), SourceType::elementary("uint256")),
        );
        let t = map(ty).unwrap();
        assert_eq!(t.mapping_depth(), 2);
        assert_eq!(t.target.to_string(), "Table<address, Table<address, u256>>");
        assert_eq!(t.source_name, "mapping(address => mapping(address => uint256))");
    }

    #[test]
    fn test_fixed_array_keeps_length() {
        let t = map(SourceType::array(SourceType::elementary("uint8"), Some(4))).unwrap();
        match t.kind {
            IRTypeKind::Array { length, .. } => assert_eq!(length, Some(4)),
            other => panic!("unexpected kind {:?}", other),
        }
        assert_eq!(t.target.to_string(), "vector<u8>");
    }

    #[test]
    fn test_user_types() {
        let scope = StaticScope::new()
            .with("Order", UserTypeKind::Struct)
            .with("Status", UserTypeKind::Enum)
            .with("IERC20", UserTypeKind::Contract);
        let order = TypeMapper::map(&SourceType::UserDefined("Order".into()), &scope).unwrap();
        assert_eq!(order.target, MoveType::local_struct("Order"));
        let status = TypeMapper::map(&SourceType::UserDefined("Status".into()), &scope).unwrap();
        assert_eq!(status.target, MoveType::u8());
        let token = TypeMapper::map(&SourceType::UserDefined("IERC20".into()), &scope).unwrap();
        assert_eq!(token.target, MoveType::Address);
    }

    #[test]
    fn test_unmappable_types_are_errors() {
        assert!(map(SourceType::elementary("fixed128x18")).is_err());
        assert!(map(SourceType::UserDefined("Unknown".into())).is_err());
        assert!(map(SourceType::elementary("uint7")).is_err());
    }
}
