//! Private helper functions the rewritten bodies call into. They are requested while bodies are
//! lowered and generated once per module.

use super::context::{call_kind, ContractInfo};
use solmove_core::ir::IRType;
use solmove_core::move_ast::{
    ExprKind, FunVisibility, MoveBinOp, MoveBlock, MoveExpr, MoveFunction, MoveParam, MoveStmt,
};
use solmove_core::naming::move_identifier;
use solmove_core::types::MoveType;
use solmove_core::VarRepr;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Helper {
    /// Square-and-multiply `**` for unsigned integers of this width.
    Pow { width: u16 },
    /// Reads one caller's entry of a per-caller mapping.
    StoreOf { variable: String },
    /// Creates or overwrites the signer's entry of a per-caller mapping.
    StoreSet { variable: String },
}

impl Helper {
    pub fn name(&self) -> String {
        match self {
            Helper::Pow { width } => format!("pow_u{}", width),
            Helper::StoreOf { variable } => format!("{}_of", move_identifier(variable)),
            Helper::StoreSet { variable } => format!("{}_set", move_identifier(variable)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HelperSet {
    requested: BTreeSet<Helper>,
}

impl HelperSet {
    /// Records the helper and returns the name to call.
    pub fn request(&mut self, helper: Helper) -> String {
        let name = helper.name();
        self.requested.insert(helper);
        name
    }

    pub fn is_empty(&self) -> bool {
        self.requested.is_empty()
    }

    pub fn build(&self, info: &ContractInfo<'_>) -> Vec<MoveFunction> {
        self.requested
            .iter()
            .filter_map(|helper| match helper {
                Helper::Pow { width } => Some(pow_helper(*width, info.config.inline_helpers)),
                Helper::StoreOf { variable } => store_accessor(info, variable, false),
                Helper::StoreSet { variable } => store_accessor(info, variable, true),
            })
            .collect()
    }
}

fn pow_helper(width: u16, inline: bool) -> MoveFunction {
    let ty = MoveType::Uint(width);
    let mut f = MoveFunction::new(format!("pow_u{}", width), FunVisibility::Private);
    f.is_inline = inline;
    f.params = vec![
        MoveParam::new("base", ty.clone()),
        MoveParam::new("exponent", MoveType::u256()),
    ];
    f.returns = vec![ty.clone()];

    let one = |t: &MoveType| MoveExpr::int_suffixed(1u32, t.clone());
    let zero = MoveExpr::int_suffixed(0u32, MoveType::u256());
    let exponent = || MoveExpr::var("exponent");
    let odd = MoveExpr::binary(
        MoveBinOp::Eq,
        MoveExpr::binary(MoveBinOp::BitAnd, exponent(), one(&MoveType::u256())),
        one(&MoveType::u256()),
    );

    let body = vec![
        MoveStmt::If {
            cond: odd,
            then: MoveBlock::new(vec![MoveStmt::assign(
                MoveExpr::var("result"),
                MoveExpr::binary(MoveBinOp::Mul, MoveExpr::var("result"), MoveExpr::var("base")),
            )]),
            otherwise: None,
        },
        MoveStmt::assign(
            exponent(),
            MoveExpr::binary(MoveBinOp::Shr, exponent(), MoveExpr::int_suffixed(1u32, MoveType::u8())),
        ),
        MoveStmt::If {
            cond: MoveExpr::binary(MoveBinOp::Gt, exponent(), zero.clone()),
            then: MoveBlock::new(vec![MoveStmt::assign(
                MoveExpr::var("base"),
                MoveExpr::binary(MoveBinOp::Mul, MoveExpr::var("base"), MoveExpr::var("base")),
            )]),
            otherwise: None,
        },
    ];
    f.body = MoveBlock::with_result(
        vec![
            MoveStmt::let_("result", Some(ty.clone()), one(&ty)),
            MoveStmt::While {
                cond: MoveExpr::binary(MoveBinOp::Gt, exponent(), zero),
                body: MoveBlock::new(body),
            },
        ],
        MoveExpr::var("result"),
    );
    f
}

fn store_accessor(info: &ContractInfo<'_>, variable: &str, write: bool) -> Option<MoveFunction> {
    let VarRepr::Distributed { store } = info.plan.repr_of(variable) else {
        return None;
    };
    let value_ty: IRType = info.state_var(variable)?.ty.mapping_value()?.clone();
    let target = info.move_type(&value_ty);
    let exists = |owner: MoveExpr| {
        MoveExpr::typed(
            ExprKind::Call {
                module: None,
                name: "exists".to_string(),
                type_args: vec![MoveType::local_struct(store.clone())],
                args: vec![owner],
            },
            MoveType::Bool,
        )
    };

    if !write {
        let mut f = MoveFunction::new(format!("{}_of", move_identifier(variable)), FunVisibility::Private);
        f.params = vec![MoveParam::new("owner", MoveType::Address)];
        f.returns = vec![target.clone()];
        let stored = MoveExpr::field(
            MoveExpr::borrow_global(store.clone(), MoveExpr::var("owner"), false),
            "value",
        );
        f.body = MoveBlock::with_result(
            Vec::new(),
            MoveExpr::if_else(
                exists(MoveExpr::var("owner")),
                stored,
                info.default_value(&value_ty),
            ),
        );
        return Some(f);
    }

    let mut f = MoveFunction::new(format!("{}_set", move_identifier(variable)), FunVisibility::Private);
    f.params = vec![
        MoveParam::new("account", MoveType::reference(MoveType::Signer, false)),
        MoveParam::new("value", target),
    ];
    let owner = MoveExpr::typed(
        call_kind("signer", "address_of", vec![MoveExpr::var("account")]),
        MoveType::Address,
    );
    let update = MoveStmt::assign(
        MoveExpr::field(
            MoveExpr::borrow_global(store.clone(), MoveExpr::var("owner"), true),
            "value",
        ),
        MoveExpr::var("value"),
    );
    let publish = MoveStmt::Expr(MoveExpr::call(
        None,
        "move_to",
        vec![
            MoveExpr::var("account"),
            ExprKind::Pack {
                name: store.clone(),
                fields: vec![("value".to_string(), MoveExpr::var("value"))],
            }
            .into(),
        ],
    ));
    f.body = MoveBlock::new(vec![
        MoveStmt::let_("owner", None, owner),
        MoveStmt::If {
            cond: exists(MoveExpr::var("owner")),
            then: MoveBlock::new(vec![update]),
            otherwise: Some(MoveBlock::new(vec![publish])),
        },
    ]);
    Some(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_is_idempotent_and_ordered() {
        let mut helpers = HelperSet::default();
        assert_eq!(helpers.request(Helper::Pow { width: 256 }), "pow_u256");
        assert_eq!(
            helpers.request(Helper::StoreOf {
                variable: "balances".to_string()
            }),
            "balances_of"
        );
        helpers.request(Helper::Pow { width: 256 });
        helpers.request(Helper::Pow { width: 64 });
        let names: Vec<String> = helpers.requested.iter().map(Helper::name).collect();
        assert_eq!(names, vec!["pow_u64", "pow_u256", "balances_of"]);
    }

    #[test]
    fn test_pow_helper_shape() {
        let f = pow_helper(128, true);
        assert!(f.is_inline);
        assert_eq!(f.returns, vec![MoveType::u128()]);
        assert_eq!(f.params[1].ty, MoveType::u256());
        assert!(matches!(f.body.result.as_deref(), Some(e) if e.as_var() == Some("result")));
    }
}
