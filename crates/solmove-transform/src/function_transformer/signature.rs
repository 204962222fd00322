//! Move-side shape of every function: who may call it, which resources it is handed, and
//! whether it needs the transaction signer.

use indexmap::IndexMap;
use solmove_core::analysis::visit::INITIALIZER;
use solmove_core::ir::{IRContract, IRFunction};
use solmove_core::naming::move_identifier;
use solmove_core::source::{Expr, Stmt, UnaryOp};
use solmove_core::{ResourcePlan, VarRepr};
use std::collections::BTreeSet;

/// How much of the caller a function has to see. Ordered so that `max` merges needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum CallerNeed {
    #[default]
    None,
    /// Only the sender address (`msg.sender`, `tx.origin`).
    Address,
    /// The `&signer` itself: coin transfers and writes to per-caller stores.
    Signer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `public entry fun` taking `account: &signer`.
    Entry,
    /// `#[view] public fun`.
    View,
    /// Private helper handed its resources by reference.
    Internal,
    /// Function of a library module; no resources, no caller.
    Library,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub ident: String,
    pub name: String,
    pub shape: Shape,
    pub caller: CallerNeed,
    /// Shared resources with mutability, in plan order.
    pub groups: Vec<(String, bool)>,
    /// Private body an entry or view wrapper forwards to.
    pub inner: Option<String>,
    pub public: bool,
}

impl Signature {
    /// Name used by call sites inside the module.
    pub fn callable_name(&self) -> &str {
        self.inner.as_deref().unwrap_or(&self.name)
    }

    pub fn is_split(&self) -> bool {
        self.inner.is_some()
    }

    /// Whether internal call sites pass resources and caller explicitly.
    pub fn takes_context(&self) -> bool {
        self.shape == Shape::Internal || self.is_split()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Signatures {
    by_ident: IndexMap<String, Signature>,
}

impl Signatures {
    pub fn build(contract: &IRContract, plan: &ResourcePlan) -> Self {
        let access = &plan.analysis.access;
        let mut direct = IndexMap::new();
        for function in &contract.functions {
            direct.insert(function.ident.clone(), direct_need(contract, plan, function));
        }

        let called: BTreeSet<&String> = access
            .functions
            .values()
            .flat_map(|facts| facts.calls.iter())
            .collect();

        let mut by_ident = IndexMap::new();
        for function in &contract.functions {
            let ident = &function.ident;
            let caller = std::iter::once(ident.clone())
                .chain(access.transitive_callees(ident))
                .filter_map(|f| direct.get(&f).copied())
                .max()
                .unwrap_or_default();

            let shape = if contract.is_library() {
                Shape::Library
            } else if function.is_externally_callable() && function.is_view() {
                Shape::View
            } else if function.is_externally_callable() {
                Shape::Entry
            } else {
                Shape::Internal
            };

            let groups = match shape {
                Shape::Library => Vec::new(),
                _ => plan.borrowed_groups(ident),
            };
            let name = move_identifier(ident);
            let split = match shape {
                Shape::Entry => called.contains(ident) || !function.returns.is_empty(),
                Shape::View => called.contains(ident),
                _ => false,
            };
            let inner = split.then(|| format!("{}_inner", name));
            let public = match shape {
                Shape::Library => function.visibility != solmove_core::source::Visibility::Private,
                Shape::Internal => false,
                _ => true,
            };
            by_ident.insert(
                ident.clone(),
                Signature {
                    ident: ident.clone(),
                    name,
                    shape,
                    caller,
                    groups,
                    inner,
                    public,
                },
            );
        }
        Self { by_ident }
    }

    pub fn get(&self, ident: &str) -> Option<&Signature> {
        self.by_ident.get(ident)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Signature> {
        self.by_ident.values()
    }

    /// Caller need of the initializer: the union of everything it calls.
    pub fn initializer_need(&self, plan: &ResourcePlan) -> CallerNeed {
        plan.analysis
            .access
            .transitive_callees(INITIALIZER)
            .iter()
            .filter_map(|f| self.by_ident.get(f).map(|s| s.caller))
            .max()
            .unwrap_or_default()
    }
}

/// What the function's own body and its modifiers ask of the caller.
fn direct_need(contract: &IRContract, plan: &ResourcePlan, function: &IRFunction) -> CallerNeed {
    let mut need = CallerNeed::None;
    let mut bodies: Vec<&[Stmt]> = vec![&function.body];
    for invocation in &function.modifiers {
        if let Some(modifier) = contract.modifier(&invocation.name) {
            bodies.push(&modifier.body);
        }
        for arg in &invocation.args {
            need = need.max(expr_need(plan, arg));
        }
    }
    for body in bodies {
        for stmt in body {
            stmt.walk_exprs(&mut |e| need = need.max(expr_need(plan, e)));
        }
    }
    need
}

fn expr_need(plan: &ResourcePlan, expr: &Expr) -> CallerNeed {
    let mut need = CallerNeed::None;
    expr.walk(&mut |e| {
        let here = match e {
            _ if e.is_msg_sender() => CallerNeed::Address,
            Expr::Member { object, member }
                if member == "origin" && matches!(object.as_ref(), Expr::Ident(o) if o == "tx") =>
            {
                CallerNeed::Address
            }
            Expr::Call { callee, args, .. } => match callee.as_ref() {
                Expr::Member { member, .. }
                    if (member == "transfer" || member == "send") && args.len() == 1 =>
                {
                    CallerNeed::Signer
                }
                Expr::Member { object, member }
                    if (member == "push" || member == "pop") && writes_distributed(plan, object) =>
                {
                    CallerNeed::Signer
                }
                _ => CallerNeed::None,
            },
            Expr::Assign { target, .. } if writes_distributed(plan, target) => CallerNeed::Signer,
            Expr::Unary { op, operand }
                if (op.is_update() || *op == UnaryOp::Delete)
                    && writes_distributed(plan, operand) =>
            {
                CallerNeed::Signer
            }
            _ => CallerNeed::None,
        };
        need = need.max(here);
    });
    need
}

fn writes_distributed(plan: &ResourcePlan, target: &Expr) -> bool {
    target
        .root_ident()
        .map(|root| matches!(plan.repr_of(root), VarRepr::Distributed { .. }))
        .unwrap_or(false)
}
