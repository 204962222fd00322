use solmove_core::ir::{IRContract, IRFunction, IRParam, IRReturn, IRStateVariable, IRType};
use solmove_core::source::{Expr, FunctionKind, Mutability, Stmt, Visibility};

/// Accessor functions for public state variables. Mappings take one key parameter per level
/// and arrays an index, mirroring the getters Solidity generates; a function of the same name
/// suppresses the getter.
pub(crate) fn synthesize_getters(contract: &IRContract) -> Vec<IRFunction> {
    contract
        .state_vars
        .iter()
        .filter(|v| v.visibility == Visibility::Public)
        .filter(|v| contract.functions_named(&v.name).next().is_none())
        .map(getter)
        .collect()
}

fn getter(var: &IRStateVariable) -> IRFunction {
    let mut params = Vec::new();
    let mut access = Expr::ident(&var.name);
    let mut ty: &IRType = &var.ty;
    loop {
        if let (Some(key), Some(value)) = (ty.mapping_key(), ty.mapping_value()) {
            let name = if params.is_empty() {
                "key".to_string()
            } else {
                format!("key{}", params.len())
            };
            access = Expr::index(access, Expr::ident(&name));
            params.push(IRParam {
                name,
                ty: key.clone(),
            });
            ty = value;
        } else if let Some(element) = ty.array_element() {
            let name = if params.is_empty() {
                "index".to_string()
            } else {
                format!("index{}", params.len())
            };
            access = Expr::index(access, Expr::ident(&name));
            params.push(IRParam {
                name,
                ty: IRType::uint(256),
            });
            ty = element;
        } else {
            break;
        }
    }

    IRFunction {
        name: var.name.clone(),
        ident: var.name.clone(),
        kind: FunctionKind::Function,
        visibility: Visibility::External,
        mutability: Mutability::View,
        params,
        returns: vec![IRReturn {
            name: None,
            ty: ty.clone(),
        }],
        modifiers: Vec::new(),
        body: vec![Stmt::ret(access)],
        has_body: true,
        origin: var.origin.clone(),
        is_virtual: false,
        synthetic: true,
        line: var.line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use solmove_core::ir::IRTypeKind;
    use solmove_core::source::ContractKind;
    use solmove_core::types::MoveType;

    fn public_var(name: &str, ty: IRType) -> IRStateVariable {
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

    #[test]
    fn test_nested_mapping_getter_takes_both_keys() {
        let allowance = IRType::new(
            "mapping(address => mapping(address => uint256))",
            MoveType::Unit,
            IRTypeKind::Mapping {
                key: Box::new(IRType::address()),
                value: Box::new(IRType::new(
                    "mapping(address => uint256)",
                    MoveType::Unit,
                    IRTypeKind::Mapping {
                        key: Box::new(IRType::address()),
                        value: Box::new(IRType::uint(256)),
                    },
                )),
            },
        );
        let mut contract = IRContract::new("Vault", ContractKind::Contract);
        contract.state_vars.push(public_var("allowance", allowance));

        let getters = synthesize_getters(&contract);
        assert_eq!(getters.len(), 1);
        let names: Vec<&str> = getters[0].params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["key", "key1"]);
        assert_eq!(getters[0].returns[0].ty, IRType::uint(256));
        assert!(getters[0].synthetic);
        assert_eq!(
            getters[0].body,
            vec![Stmt::ret(Expr::index(
                Expr::index(Expr::ident("allowance"), Expr::ident("key")),
                Expr::ident("key1")
            ))]
        );
    }

    #[test]
    fn test_existing_function_suppresses_getter() {
        let mut contract = IRContract::new("Vault", ContractKind::Contract);
        contract.state_vars.push(public_var("total", IRType::uint(256)));
        let mut existing = getter(&contract.state_vars[0]);
        existing.synthetic = false;
        contract.functions.push(existing);
        assert!(synthesize_getters(&contract).is_empty());
    }
}
