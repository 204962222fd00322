//! `use` and `acquires` discovery over a finished module.
//!
//! Both passes rebuild their output from scratch on every run, so they can be repeated after
//! any rewrite that adds calls or borrows.

use crate::errors::{Result, TranspileError};
use solmove_core::move_ast::{ExprKind, MoveExpr, MoveFunction, MoveModule, MoveStmt, UseDecl};
use solmove_core::naming::is_reserved_module;
use solmove_core::types::MoveType;
use std::collections::{BTreeMap, BTreeSet};

/// Account that publishes a platform module.
fn platform_address(module: &str) -> Option<&'static str> {
    Some(match module {
        "signer" | "vector" | "string" | "bcs" | "hash" | "error" | "option" | "debug" => "std",
        "table" | "aptos_hash" | "simple_map" | "smart_table" | "type_info" | "math64"
        | "math128" => "aptos_std",
        "account" | "aggregator_v2" | "aptos_account" | "aptos_coin" | "block" | "chain_id"
        | "coin" | "event" | "timestamp" | "object" | "fungible_asset" => "aptos_framework",
        _ => return None,
    })
}

#[derive(Debug, Default)]
struct References {
    /// Module name -> type members imported by name.
    modules: BTreeMap<String, BTreeSet<String>>,
    /// Modules referenced as `module::member`.
    qualified: BTreeSet<String>,
}

impl References {
    fn ty(&mut self, ty: &MoveType) {
        match ty {
            MoveType::String => self.member("string", "String"),
            MoveType::Table(k, v) => {
                self.member("table", "Table");
                self.ty(k);
                self.ty(v);
            }
            MoveType::Aggregator(inner) => {
                self.member("aggregator_v2", "Aggregator");
                self.ty(inner);
            }
            MoveType::Vector(inner) | MoveType::Ref { inner, .. } => self.ty(inner),
            MoveType::Struct {
                module,
                name,
                type_args,
            } => {
                if let Some(module) = module {
                    self.member(module, name);
                }
                type_args.iter().for_each(|t| self.ty(t));
            }
            MoveType::Tuple(items) => items.iter().for_each(|t| self.ty(t)),
            _ => {}
        }
    }

    fn member(&mut self, module: &str, member: &str) {
        self.modules
            .entry(module.to_string())
            .or_default()
            .insert(member.to_string());
    }

    /// One node; callers do the walking.
    fn node(&mut self, expr: &MoveExpr) {
        match &expr.kind {
            ExprKind::Call {
                module, type_args, ..
            } => {
                if let Some(module) = module {
                    self.modules.entry(module.clone()).or_default();
                    self.qualified.insert(module.clone());
                }
                type_args.iter().for_each(|t| self.ty(t));
            }
            ExprKind::Cast { ty, .. } => self.ty(ty),
            ExprKind::Vector {
                elem_ty: Some(ty), ..
            } => self.ty(ty),
            _ => {}
        }
    }

    fn function(&mut self, f: &MoveFunction) {
        f.params.iter().for_each(|p| self.ty(&p.ty));
        f.returns.iter().for_each(|t| self.ty(t));
        f.walk_exprs(&mut |e| self.node(e));
        walk_stmts(&f.body.stmts, &mut |stmt| {
            if let MoveStmt::Let { ty: Some(ty), .. } = stmt {
                self.ty(ty);
            }
        });
    }
}

fn walk_stmts<'a>(stmts: &'a [MoveStmt], f: &mut dyn FnMut(&'a MoveStmt)) {
    for stmt in stmts {
        f(stmt);
        match stmt {
            MoveStmt::If {
                then, otherwise, ..
            } => {
                walk_stmts(&then.stmts, f);
                if let Some(otherwise) = otherwise {
                    walk_stmts(&otherwise.stmts, f);
                }
            }
            MoveStmt::While { body, .. } | MoveStmt::Loop(body) | MoveStmt::Block(body) => {
                walk_stmts(&body.stmts, f)
            }
            _ => {}
        }
    }
}

/// Collects the `use` declarations `module` needs, sorted by path.
///
/// `libraries` are the module names of user libraries published next to this module. A library
/// whose name shadows a platform module is rejected.
pub fn discover_uses(module: &MoveModule, libraries: &BTreeSet<String>) -> Result<Vec<UseDecl>> {
    let mut refs = References::default();
    for def in &module.structs {
        def.fields.iter().for_each(|f| refs.ty(&f.ty));
    }
    for constant in &module.constants {
        refs.ty(&constant.ty);
        constant.value.walk(&mut |e| refs.node(e));
    }
    for f in &module.functions {
        refs.function(f);
    }

    let mut uses = Vec::new();
    for (name, members) in refs.modules {
        if name == module.name {
            continue;
        }
        let path = if libraries.contains(&name) {
            if is_reserved_module(&name) {
                return Err(TranspileError::NamingCollision(format!(
                    "library module {} shadows the platform module of the same name",
                    name
                )));
            }
            format!("{}::{}", module.address, name)
        } else {
            match platform_address(&name) {
                Some(address) => format!("{}::{}", address, name),
                None => format!("{}::{}", module.address, name),
            }
        };
        let mut imported = Vec::new();
        if refs.qualified.contains(&name) && !members.is_empty() {
            imported.push("Self".to_string());
        }
        imported.extend(members);
        uses.push(UseDecl {
            path,
            members: imported,
        });
    }
    uses.sort();
    Ok(uses)
}

/// Resources a function borrows or moves out of storage directly.
fn direct_acquires(f: &MoveFunction, resources: &[String]) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    f.walk_exprs(&mut |e| match &e.kind {
        ExprKind::BorrowGlobal { resource, .. } => {
            found.insert(resource.clone());
        }
        ExprKind::Call {
            module: None,
            name,
            type_args,
            ..
        } if name == "move_from" => {
            for ty in type_args {
                if let MoveType::Struct { name, .. } = ty {
                    found.insert(name.clone());
                }
            }
        }
        _ => {}
    });
    found.retain(|r| resources.contains(r));
    found
}

fn local_callees(f: &MoveFunction, names: &BTreeSet<String>) -> BTreeSet<String> {
    let mut callees = BTreeSet::new();
    f.walk_exprs(&mut |e| {
        if let ExprKind::Call {
            module: None, name, ..
        } = &e.kind
        {
            if names.contains(name) {
                callees.insert(name.clone());
            }
        }
    });
    callees
}

/// Sets every function's `acquires` list: its direct borrows of `resources`, closed over the
/// functions of the same module it calls. Lists follow the order of `resources`.
pub fn apply_acquires(functions: &mut [MoveFunction], resources: &[String]) {
    let names: BTreeSet<String> = functions.iter().map(|f| f.name.clone()).collect();
    let mut acquired: BTreeMap<String, BTreeSet<String>> = functions
        .iter()
        .map(|f| (f.name.clone(), direct_acquires(f, resources)))
        .collect();
    let calls: BTreeMap<String, BTreeSet<String>> = functions
        .iter()
        .map(|f| (f.name.clone(), local_callees(f, &names)))
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for (caller, callees) in &calls {
            let inherited: BTreeSet<String> = callees
                .iter()
                .filter_map(|c| acquired.get(c))
                .flatten()
                .cloned()
                .collect();
            if let Some(own) = acquired.get_mut(caller) {
                let before = own.len();
                own.extend(inherited);
                changed |= own.len() != before;
            }
        }
    }

    for f in functions.iter_mut() {
        let set = acquired.remove(&f.name).unwrap_or_default();
        f.acquires = resources.iter().filter(|r| set.contains(*r)).cloned().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use solmove_core::move_ast::{FunVisibility, MoveBlock, MoveParam};

    fn borrowing(name: &str, resource: &str) -> MoveFunction {
        let mut f = MoveFunction::new(name, FunVisibility::Public);
        f.body = MoveBlock::new(vec![MoveStmt::let_(
            "s",
            None,
            MoveExpr::borrow_global(resource, MoveExpr::address("solmove"), true),
        )]);
        f
    }

    fn calling(name: &str, callee: &str) -> MoveFunction {
        let mut f = MoveFunction::new(name, FunVisibility::Private);
        f.body = MoveBlock::new(vec![MoveStmt::Expr(MoveExpr::call(None, callee, Vec::new()))]);
        f
    }

    #[test]
    fn test_acquires_are_closed_over_local_calls() {
        let resources = vec!["TokenState".to_string(), "BalanceStore".to_string()];
        let mut functions = vec![
            calling("transfer", "store_set"),
            borrowing("store_set", "BalanceStore"),
            borrowing("mint", "TokenState"),
            calling("outer", "transfer"),
        ];
        apply_acquires(&mut functions, &resources);
        assert_eq!(functions[0].acquires, vec!["BalanceStore"]);
        assert_eq!(functions[2].acquires, vec!["TokenState"]);
        assert_eq!(functions[3].acquires, vec!["BalanceStore"]);

        let before = functions.clone();
        apply_acquires(&mut functions, &resources);
        assert_eq!(functions, before);
    }

    #[test]
    fn test_unknown_resources_are_not_acquired() {
        let mut functions = vec![borrowing("peek", "Elsewhere")];
        apply_acquires(&mut functions, &["TokenState".to_string()]);
        assert!(functions[0].acquires.is_empty());
    }

    #[test]
    fn test_uses_are_grouped_and_sorted() {
        let mut module = MoveModule::new("solmove", "vault");
        let mut f = MoveFunction::new("deposit", FunVisibility::Public);
        f.params = vec![MoveParam::new("account", MoveType::reference(MoveType::Signer, false))];
        f.body = MoveBlock::new(vec![
            MoveStmt::Expr(MoveExpr::call(
                Some("signer"),
                "address_of",
                vec![MoveExpr::var("account")],
            )),
            MoveStmt::let_(
                "t",
                Some(MoveType::Table(
                    Box::new(MoveType::Address),
                    Box::new(MoveType::u64()),
                )),
                MoveExpr::call(Some("table"), "new", Vec::new()),
            ),
            MoveStmt::Expr(MoveExpr::call(Some("math_lib"), "max", Vec::new())),
        ]);
        module.functions.push(f);

        let libraries: BTreeSet<String> = ["math_lib".to_string()].into_iter().collect();
        let uses = discover_uses(&module, &libraries).unwrap();
        assert_eq!(
            uses,
            vec![
                UseDecl {
                    path: "aptos_std::table".to_string(),
                    members: vec!["Self".to_string(), "Table".to_string()],
                },
                UseDecl {
                    path: "solmove::math_lib".to_string(),
                    members: Vec::new(),
                },
                UseDecl {
                    path: "std::signer".to_string(),
                    members: Vec::new(),
                },
            ]
        );
    }

    #[test]
    fn test_library_named_like_platform_module_is_rejected() {
        let mut module = MoveModule::new("solmove", "registry");
        let mut f = MoveFunction::new("f", FunVisibility::Public);
        f.body = MoveBlock::new(vec![MoveStmt::Expr(MoveExpr::call(
            Some("vector"),
            "sum",
            Vec::new(),
        ))]);
        module.functions.push(f);
        let libraries: BTreeSet<String> = ["vector".to_string()].into_iter().collect();
        let err = discover_uses(&module, &libraries).unwrap_err();
        assert!(matches!(err, TranspileError::NamingCollision(_)));
    }
}
