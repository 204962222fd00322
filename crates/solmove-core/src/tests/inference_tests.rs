use crate::infer::{EmptyEnv, TypeEnv, TypeInference};
use crate::move_ast::{ExprKind, MoveBinOp, MoveBlock, MoveExpr, MoveStmt};
use crate::types::MoveType;
use pretty_assertions::assert_eq;

struct Fields;

impl TypeEnv for Fields {
    fn lookup(&self, name: &str) -> Option<MoveType> {
        match name {
            "state" => Some(MoveType::reference(MoveType::local_struct("TokenState"), true)),
            _ => None,
        }
    }

    fn field_type(&self, struct_name: &str, field: &str) -> Option<MoveType> {
        match (struct_name, field) {
            ("TokenState", "total_supply") => Some(MoveType::u256()),
            ("TokenState", "decimals") => Some(MoveType::u8()),
            _ => None,
        }
    }

    fn call_return(&self, module: Option<&str>, name: &str) -> Option<MoveType> {
        match (module, name) {
            (Some("timestamp"), "now_seconds") => Some(MoveType::u64()),
            _ => None,
        }
    }
}

#[test]
fn test_block_locals_flow_into_later_statements() {
    let env = EmptyEnv;
    let mut block = MoveBlock::with_result(
        vec![
            MoveStmt::let_("a", Some(MoveType::u64()), MoveExpr::int(1u32)),
            MoveStmt::let_("b", Some(MoveType::u128()), MoveExpr::int(2u32)),
        ],
        MoveExpr::binary(MoveBinOp::Mul, MoveExpr::var("a"), MoveExpr::var("b")),
    );
    let ty = TypeInference::new(&env).infer_block(&mut block);
    assert_eq!(ty, Some(MoveType::u128()));
}

#[test]
fn test_field_access_and_call_returns_widen() {
    let env = Fields;
    let mut expr = MoveExpr::binary(
        MoveBinOp::Add,
        MoveExpr::field(MoveExpr::var("state"), "total_supply"),
        MoveExpr::call(Some("timestamp"), "now_seconds", vec![]),
    );
    let ty = TypeInference::new(&env).infer(&mut expr);
    assert_eq!(ty, Some(MoveType::u256()));
    let ExprKind::Binary { rhs, .. } = &expr.kind else {
        panic!("expected binary");
    };
    assert_eq!(
        rhs.kind,
        ExprKind::Cast {
            expr: Box::new(MoveExpr::typed(
                ExprKind::Call {
                    module: Some("timestamp".to_string()),
                    name: "now_seconds".to_string(),
                    type_args: vec![],
                    args: vec![],
                },
                MoveType::u64()
            )),
            ty: MoveType::u256(),
        }
    );
}

#[test]
fn test_assignment_retypes_literal_without_cast() {
    let env = Fields;
    let mut stmt = MoveStmt::assign(
        MoveExpr::field(MoveExpr::var("state"), "decimals"),
        MoveExpr::int(18u32),
    );
    let mut inference = TypeInference::new(&env);
    inference.infer_stmt(&mut stmt);
    let MoveStmt::Assign { value, .. } = &stmt else {
        panic!("expected assignment");
    };
    assert!(value.is_unsuffixed_literal());
    assert_eq!(value.inferred_type, Some(MoveType::u8()));
}

#[test]
fn test_second_pass_over_function_body_is_stable() {
    let env = Fields;
    let mut block = MoveBlock::new(vec![
        MoveStmt::let_(
            "now",
            None,
            MoveExpr::call(Some("timestamp"), "now_seconds", vec![]),
        ),
        MoveStmt::If {
            cond: MoveExpr::binary(
                MoveBinOp::Gt,
                MoveExpr::var("now"),
                MoveExpr::field(MoveExpr::var("state"), "total_supply"),
            ),
            then: MoveBlock::new(vec![MoveStmt::assign(
                MoveExpr::field(MoveExpr::var("state"), "total_supply"),
                MoveExpr::var("now"),
            )]),
            otherwise: None,
        },
    ]);
    TypeInference::new(&env).infer_block(&mut block);
    let first = block.clone();
    TypeInference::new(&env).infer_block(&mut block);
    assert_eq!(block, first);
}
