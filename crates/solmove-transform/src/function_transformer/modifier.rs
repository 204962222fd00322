//! Modifier inlining on the IR.
//!
//! Every applied modifier is expanded around the function body: its parameters become locals
//! bound to the invocation arguments, the code before `_` runs first and the code after `_`
//! runs on every exit path. The first modifier listed ends up outermost.

use solmove_core::ir::{IRContract, IRFunction, IRModifier, IRType};
use solmove_core::source::{Expr, LocalDecl, SourceType, Stmt};

/// Why a function body could not be inlined.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineError(pub String);

pub struct ModifierInliner<'a> {
    contract: &'a IRContract,
    next_return: usize,
    notes: Vec<String>,
}

impl<'a> ModifierInliner<'a> {
    pub fn new(contract: &'a IRContract) -> Self {
        Self {
            contract,
            next_return: 0,
            notes: Vec::new(),
        }
    }

    pub fn take_notes(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notes)
    }

    pub fn inline(&mut self, function: &IRFunction) -> Result<Vec<Stmt>, InlineError> {
        let mut body = function.body.clone();
        for invocation in function.modifiers.iter().rev() {
            let Some(modifier) = self.contract.modifier(&invocation.name) else {
                self.notes.push(format!(
                    "modifier {} on {} is not defined and was skipped",
                    invocation.name, function.name
                ));
                continue;
            };
            body = self.apply(function, modifier, &invocation.args, body)?;
        }
        Ok(body)
    }

    fn apply(
        &mut self,
        function: &IRFunction,
        modifier: &IRModifier,
        args: &[Expr],
        body: Vec<Stmt>,
    ) -> Result<Vec<Stmt>, InlineError> {
        let top_level = modifier
            .body
            .iter()
            .position(|s| matches!(s, Stmt::Placeholder));
        let placeholder = match (top_level, Stmt::count_placeholders(&modifier.body)) {
            (Some(index), 1) => index,
            (_, count) => {
                return Err(InlineError(format!(
                    "modifier {} with {} placeholder(s) outside its top level",
                    modifier.name, count
                )))
            }
        };
        let before = &modifier.body[..placeholder];
        let after = &modifier.body[placeholder + 1..];

        let mut expanded = Vec::new();
        for (param, arg) in modifier.params.iter().zip(args) {
            expanded.push(Stmt::VarDecl {
                decls: vec![Some(LocalDecl {
                    name: param.name.clone(),
                    ty: source_type(&param.ty),
                    storage: false,
                })],
                value: Some(arg.clone()),
            });
        }
        expanded.extend(before.iter().cloned());

        let falls_through = !always_exits(&body);
        let mut body = body;
        if !after.is_empty() {
            for stmt in body.iter_mut() {
                self.route_returns(function, stmt, after);
            }
        }
        expanded.push(Stmt::Block(body));
        if falls_through {
            expanded.extend(after.iter().cloned());
        }
        Ok(vec![Stmt::Block(expanded)])
    }

    /// Rewrites `return e` so the modifier epilogue runs before the function leaves.
    fn route_returns(&mut self, function: &IRFunction, stmt: &mut Stmt, after: &[Stmt]) {
        match stmt {
            Stmt::Return(value) => {
                let mut replacement = Vec::new();
                let result = match value.take() {
                    None => None,
                    Some(value) => {
                        self.next_return += 1;
                        let stem = format!("__ret{}", self.next_return);
                        if function.returns.len() > 1 {
                            let names: Vec<String> = (0..function.returns.len())
                                .map(|i| format!("{}_{}", stem, i))
                                .collect();
                            replacement.push(Stmt::VarDecl {
                                decls: names
                                    .iter()
                                    .zip(&function.returns)
                                    .map(|(name, ret)| {
                                        Some(LocalDecl {
                                            name: name.clone(),
                                            ty: source_type(&ret.ty),
                                            storage: false,
                                        })
                                    })
                                    .collect(),
                                value: Some(value),
                            });
                            Some(Expr::Tuple(
                                names.iter().map(|n| Some(Expr::ident(n))).collect(),
                            ))
                        } else {
                            let ty = function.returns.first().and_then(|r| source_type(&r.ty));
                            replacement.push(Stmt::let_(&stem, ty, value));
                            Some(Expr::ident(&stem))
                        }
                    }
                };
                replacement.extend(after.iter().cloned());
                replacement.push(Stmt::Return(result));
                *stmt = Stmt::Block(replacement);
            }
            Stmt::Block(stmts) | Stmt::Unchecked(stmts) => {
                for s in stmts.iter_mut() {
                    self.route_returns(function, s, after);
                }
            }
            Stmt::If {
                then, otherwise, ..
            } => {
                self.route_returns(function, then, after);
                if let Some(otherwise) = otherwise {
                    self.route_returns(function, otherwise, after);
                }
            }
            Stmt::While { body, .. } | Stmt::DoWhile { body, .. } | Stmt::For { body, .. } => {
                self.route_returns(function, body, after)
            }
            _ => {}
        }
    }
}

/// True when every path through `stmts` ends in a `return` or `revert`.
fn always_exits(stmts: &[Stmt]) -> bool {
    stmts.last().is_some_and(exits)
}

fn exits(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return(_) | Stmt::Revert { .. } => true,
        Stmt::Block(stmts) | Stmt::Unchecked(stmts) => always_exits(stmts),
        Stmt::If {
            then,
            otherwise: Some(otherwise),
            ..
        } => exits(then) && exits(otherwise),
        _ => false,
    }
}

fn source_type(ty: &IRType) -> Option<SourceType> {
    solmove_parser::parse_type_name(&ty.source_name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use solmove_core::ir::{IRParam, IRReturn};
    use solmove_core::source::{
        ContractKind, FunctionKind, ModifierInvocation, Mutability, Visibility,
    };

    fn function(body: Vec<Stmt>, modifiers: &[&str]) -> IRFunction {
        IRFunction {
            name: "withdraw".to_string(),
            ident: "withdraw".to_string(),
            kind: FunctionKind::Function,
            visibility: Visibility::External,
            mutability: Mutability::NonPayable,
            params: Vec::new(),
            returns: vec![IRReturn {
                name: None,
                ty: IRType::uint(256),
            }],
            modifiers: modifiers
                .iter()
                .map(|m| ModifierInvocation {
                    name: m.to_string(),
                    args: Vec::new(),
                })
                .collect(),
            body,
            has_body: true,
            origin: "Vault".to_string(),
            is_virtual: false,
            synthetic: false,
            line: 0,
        }
    }

    fn contract() -> IRContract {
        let mut contract = IRContract::new("Vault", ContractKind::Contract);
        contract.modifiers.push(IRModifier {
            name: "onlyOwner".to_string(),
            params: Vec::new(),
            body: vec![
                Stmt::require(
                    Expr::binary(
                        solmove_core::source::BinaryOp::Eq,
                        Expr::msg_sender(),
                        Expr::ident("owner"),
                    ),
                    "not owner",
                ),
                Stmt::Placeholder,
            ],
            origin: "Vault".to_string(),
        });
        contract.modifiers.push(IRModifier {
            name: "nonReentrant".to_string(),
            params: Vec::new(),
            body: vec![
                Stmt::expr(Expr::assign(Expr::ident("locked"), Expr::Bool(true))),
                Stmt::Placeholder,
                Stmt::expr(Expr::assign(Expr::ident("locked"), Expr::Bool(false))),
            ],
            origin: "Vault".to_string(),
        });
        contract.modifiers.push(IRModifier {
            name: "counted".to_string(),
            params: Vec::new(),
            body: vec![
                Stmt::Placeholder,
                Stmt::expr(Expr::compound(
                    solmove_core::source::BinaryOp::Add,
                    Expr::ident("calls"),
                    Expr::num("1"),
                )),
            ],
            origin: "Vault".to_string(),
        });
        contract.modifiers.push(IRModifier {
            name: "twice".to_string(),
            params: vec![IRParam {
                name: "n".to_string(),
                ty: IRType::uint(8),
            }],
            body: vec![Stmt::Placeholder, Stmt::Placeholder],
            origin: "Vault".to_string(),
        });
        contract
    }

    #[test]
    fn test_guard_runs_before_body() {
        let contract = contract();
        let f = function(vec![Stmt::ret(Expr::num("1"))], &["onlyOwner"]);
        let body = ModifierInliner::new(&contract).inline(&f).unwrap();
        let Stmt::Block(outer) = &body[0] else {
            panic!("expected block");
        };
        assert_eq!(outer.len(), 2);
        assert!(matches!(outer[0], Stmt::Expr(Expr::Call { .. })));
        assert_eq!(outer[1], Stmt::Block(vec![Stmt::ret(Expr::num("1"))]));
    }

    #[test]
    fn test_epilogue_runs_before_each_return() {
        let contract = contract();
        let f = function(
            vec![Stmt::if_(
                Expr::ident("c"),
                vec![Stmt::ret(Expr::num("1"))],
                None,
            ), Stmt::ret(Expr::num("2"))],
            &["nonReentrant"],
        );
        let body = ModifierInliner::new(&contract).inline(&f).unwrap();
        let Stmt::Block(outer) = &body[0] else {
            panic!("expected block");
        };
        // prologue, body; the body ends in a return so no trailing epilogue
        assert_eq!(outer.len(), 2);
        let Stmt::Block(inner) = &outer[1] else {
            panic!("expected body block");
        };
        let Stmt::Block(routed) = &inner[1] else {
            panic!("expected routed return");
        };
        assert_eq!(
            routed,
            &vec![
                Stmt::let_(
                    "__ret2",
                    Some(SourceType::elementary("uint256")),
                    Expr::num("2")
                ),
                Stmt::expr(Expr::assign(Expr::ident("locked"), Expr::Bool(false))),
                Stmt::ret(Expr::ident("__ret2")),
            ]
        );
    }

    #[test]
    fn test_branches_that_both_return_skip_trailing_epilogues() {
        let contract = contract();
        let f = function(
            vec![Stmt::if_(
                Expr::ident("c"),
                vec![Stmt::ret(Expr::num("1"))],
                Some(vec![Stmt::Revert {
                    error: None,
                    args: Vec::new(),
                }]),
            )],
            &["counted", "nonReentrant"],
        );
        let body = ModifierInliner::new(&contract).inline(&f).unwrap();
        let Stmt::Block(outer) = &body[0] else {
            panic!("expected block");
        };
        // only the expanded inner modifier; no epilogue after it
        assert_eq!(outer.len(), 1);
        let Stmt::Block(inner) = &outer[0] else {
            panic!("expected nested modifier");
        };
        let Stmt::Block(reentrancy) = &inner[0] else {
            panic!("expected expanded modifier");
        };
        // prologue, body
        assert_eq!(reentrancy.len(), 2);
        let Stmt::Block(user) = &reentrancy[1] else {
            panic!("expected body block");
        };
        let Stmt::If { then, .. } = &user[0] else {
            panic!("expected if");
        };
        // both epilogues run before the routed return, innermost first
        let Stmt::Block(then) = then.as_ref() else {
            panic!("expected then block");
        };
        let Stmt::Block(routed) = &then[0] else {
            panic!("expected routed return");
        };
        assert_eq!(routed.len(), 3);
        let Stmt::Block(outer_routed) = &routed[2] else {
            panic!("expected the outer epilogue around the return");
        };
        assert_eq!(
            outer_routed[1],
            Stmt::expr(Expr::compound(
                solmove_core::source::BinaryOp::Add,
                Expr::ident("calls"),
                Expr::num("1"),
            ))
        );
        assert!(matches!(outer_routed.last(), Some(Stmt::Return(Some(_)))));
    }

    #[test]
    fn test_first_modifier_is_outermost() {
        let contract = contract();
        let f = function(vec![], &["onlyOwner", "nonReentrant"]);
        let body = ModifierInliner::new(&contract).inline(&f).unwrap();
        let Stmt::Block(outer) = &body[0] else {
            panic!("expected block");
        };
        assert!(matches!(&outer[0], Stmt::Expr(Expr::Call { .. })));
        let Stmt::Block(inner) = &outer[1] else {
            panic!("expected nested modifier");
        };
        assert_eq!(inner.len(), 1);
        let Stmt::Block(reentrancy) = &inner[0] else {
            panic!("expected expanded modifier");
        };
        assert_eq!(reentrancy.len(), 3);
    }

    #[test]
    fn test_double_placeholder_is_rejected() {
        let contract = contract();
        let f = function(vec![], &["twice"]);
        let err = ModifierInliner::new(&contract).inline(&f).unwrap_err();
        assert!(err.0.contains("twice"));
    }

    #[test]
    fn test_unknown_modifier_is_skipped_with_note() {
        let contract = contract();
        let f = function(vec![], &["whenNotPaused"]);
        let mut inliner = ModifierInliner::new(&contract);
        let body = inliner.inline(&f).unwrap();
        assert!(body.is_empty());
        assert_eq!(inliner.take_notes().len(), 1);
    }
}
