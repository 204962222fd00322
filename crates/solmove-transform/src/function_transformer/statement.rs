//! Statement lowering.
//!
//! Every lowered statement is emitted as `prelude, statement, write-backs`: the prelude holds what
//! the expressions hoisted, the write-backs flush per-caller slots read into temporaries.

use super::context::{LoopExit, TranspileContext};
use super::expression::is_unit;
use crate::errors::{Result, TranspileError};
use solmove_core::ir::IRType;
use solmove_core::move_ast::{ExprKind, MoveBlock, MoveExpr, MoveStmt};
use solmove_core::source::{BinaryOp, Expr, LocalDecl, Stmt, UnaryOp};
use solmove_core::types::MoveType;

impl TranspileContext<'_, '_> {
    /// Lowers a statement list in a scope of its own. Statements after one that never falls
    /// through are dropped.
    pub(crate) fn block(&mut self, stmts: &[Stmt]) -> Result<Vec<MoveStmt>> {
        self.push_scope();
        let mut out: Vec<MoveStmt> = Vec::new();
        for stmt in stmts {
            if out.last().is_some_and(ends_flow) {
                break;
            }
            let lowered = self.lower(stmt)?;
            out.extend(lowered);
        }
        self.pop_scope();
        Ok(out)
    }

    fn sub_block(&mut self, stmt: &Stmt) -> Result<MoveBlock> {
        let stmts = match stmt {
            Stmt::Block(stmts) => self.block(stmts)?,
            other => self.block(std::slice::from_ref(other))?,
        };
        Ok(MoveBlock::new(stmts))
    }

    /// Wraps `stmts` with whatever the expressions lowered for them left pending.
    fn settle(&mut self, stmts: Vec<MoveStmt>) -> Vec<MoveStmt> {
        let mut out = self.take_prelude();
        out.extend(stmts);
        out.extend(self.take_deferred());
        out
    }

    fn lower(&mut self, stmt: &Stmt) -> Result<Vec<MoveStmt>> {
        match stmt {
            Stmt::Block(stmts) => {
                let inner = self.block(stmts)?;
                Ok(flatten(inner))
            }
            Stmt::Unchecked(stmts) => {
                self.warn(format!(
                    "unchecked block in {} keeps checked arithmetic; overflow aborts",
                    self.function
                ));
                let inner = self.block(stmts)?;
                Ok(flatten(inner))
            }
            Stmt::Expr(expr) => {
                let stmts = self.expr_stmt(expr)?;
                Ok(self.settle(stmts))
            }
            Stmt::VarDecl { decls, value } => {
                let stmts = self.var_decl(decls, value.as_ref())?;
                Ok(self.settle(stmts))
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.expr(cond)?;
                let mut out = self.settle(Vec::new());
                let then = self.sub_block(then)?;
                let otherwise = match otherwise {
                    Some(stmt) => Some(self.sub_block(stmt)?),
                    None => None,
                };
                out.push(MoveStmt::If {
                    cond,
                    then,
                    otherwise,
                });
                Ok(out)
            }
            Stmt::While { cond, body } => self.while_loop(cond, body, LoopExit::Plain, None),
            Stmt::DoWhile { body, cond } => {
                self.enter_loop(LoopExit::Recheck(cond.clone()));
                let body = self.sub_block(body);
                self.exit_loop();
                let mut stmts = body?.stmts;
                if !stmts.last().is_some_and(ends_flow) {
                    stmts.extend(self.exit_unless(cond)?);
                }
                Ok(vec![MoveStmt::Loop(MoveBlock::new(stmts))])
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                self.push_scope();
                let lowered = self.for_loop(init.as_deref(), cond.as_ref(), update.as_ref(), body);
                self.pop_scope();
                let stmts = lowered?;
                Ok(if init.is_some() {
                    vec![MoveStmt::Block(MoveBlock::new(stmts))]
                } else {
                    stmts
                })
            }
            Stmt::Return(value) => self.return_stmt(value.as_ref()),
            Stmt::Emit { event, args } => {
                let emit = self.emit(event, args)?;
                Ok(self.settle(vec![emit]))
            }
            Stmt::Revert { error, args } => {
                let abort = self.revert(error.as_deref(), args)?;
                Ok(self.settle(vec![abort]))
            }
            Stmt::Break => Ok(vec![MoveStmt::Break]),
            Stmt::Continue => self.continue_stmt(),
            Stmt::Placeholder => Err(TranspileError::UnsupportedFeature(format!(
                "`_` outside a modifier body in {}",
                self.function
            ))),
            Stmt::Assembly(_) => {
                let stub = self.unsupported("inline assembly")?;
                Ok(vec![MoveStmt::Expr(stub)])
            }
            Stmt::Unsupported { construct, .. } => {
                let stub = self.unsupported(construct)?;
                Ok(vec![MoveStmt::Expr(stub)])
            }
        }
    }

    /// An expression evaluated for its effects.
    fn expr_stmt(&mut self, expr: &Expr) -> Result<Vec<MoveStmt>> {
        match expr {
            Expr::Assign { op, target, value } => match target.as_ref() {
                Expr::Tuple(targets) if op.is_none() => self.destructure(targets, value),
                _ => self.assign(target, *op, value),
            },
            Expr::Unary { op, operand } if op.is_update() => {
                let step = if op.is_increment() {
                    BinaryOp::Add
                } else {
                    BinaryOp::Sub
                };
                self.assign_lowered(operand, Some(step), MoveExpr::int(1u32))
            }
            Expr::Unary {
                op: UnaryOp::Delete,
                operand,
            } => self.delete(operand),
            _ => {
                let value = self.expr(expr)?;
                if is_unit(&value) || is_pure(&value) {
                    return Ok(Vec::new());
                }
                Ok(vec![match &value.inferred_type {
                    Some(MoveType::Tuple(items)) if !items.is_empty() => MoveStmt::Let {
                        pattern: vec!["_".to_string(); items.len()],
                        ty: None,
                        value: Some(value),
                    },
                    _ => MoveStmt::Expr(value),
                }])
            }
        }
    }

    /// `(a, b) = (b, a)` and `(a, , c) = f()`: the right side is bound to temporaries first so
    /// swaps read the old values.
    fn destructure(&mut self, targets: &[Option<Expr>], value: &Expr) -> Result<Vec<MoveStmt>> {
        let value = self.expr(value)?;
        let temps: Vec<Option<String>> = targets
            .iter()
            .map(|t| t.as_ref().map(|_| self.fresh("t")))
            .collect();
        let mut out = vec![MoveStmt::Let {
            pattern: temps
                .iter()
                .map(|t| t.clone().unwrap_or_else(|| "_".to_string()))
                .collect(),
            ty: None,
            value: Some(value),
        }];
        for (target, temp) in targets.iter().zip(&temps) {
            if let (Some(target), Some(temp)) = (target, temp) {
                let stmts = self.assign_lowered(target, None, MoveExpr::var(temp.clone()))?;
                out.extend(self.take_prelude());
                out.extend(stmts);
            }
        }
        Ok(out)
    }

    fn var_decl(&mut self, decls: &[Option<LocalDecl>], value: Option<&Expr>) -> Result<Vec<MoveStmt>> {
        if let [Some(decl)] = decls {
            if decl.storage {
                return self.storage_decl(decl, value);
            }
            let ty = self.decl_type(decl, value)?;
            let target = self.info.move_type(&ty);
            let value = match value {
                Some(value) => self.expr(value)?,
                None => self.info.default_value(&ty),
            };
            let name = self.declare(&decl.name, Some(ty));
            return Ok(vec![MoveStmt::let_(name, Some(target), value)]);
        }

        let Some(value) = value else {
            return Err(TranspileError::UnsupportedFeature(format!(
                "tuple declaration without a value in {}",
                self.function
            )));
        };
        let value = self.expr(value)?;
        let mut pattern = Vec::new();
        for decl in decls {
            match decl {
                Some(decl) => {
                    let ty = self.decl_type(decl, None).ok();
                    pattern.push(self.declare(&decl.name, ty));
                }
                None => pattern.push("_".to_string()),
            }
        }
        Ok(vec![MoveStmt::Let {
            pattern,
            ty: None,
            value: Some(value),
        }])
    }

    fn decl_type(&self, decl: &LocalDecl, value: Option<&Expr>) -> Result<IRType> {
        match &decl.ty {
            Some(ty) => self.info.map_type(ty),
            None => value.and_then(|v| self.ir_type_of(v)).ok_or_else(|| {
                TranspileError::TypeMapping(format!(
                    "cannot infer the type of {} in {}",
                    decl.name, self.function
                ))
            }),
        }
    }

    /// `T storage s = path;` binds `s` to the path itself. Every later use of `s` reads or
    /// writes storage directly.
    fn storage_decl(&mut self, decl: &LocalDecl, value: Option<&Expr>) -> Result<Vec<MoveStmt>> {
        let ty = self.decl_type(decl, value)?;
        match value {
            Some(path) if self.is_storage_path(path) => {
                self.declare_storage(&decl.name, ty, path.clone());
                Ok(Vec::new())
            }
            _ => {
                let stub = self.unsupported("storage pointer not bound to a state path")?;
                Ok(vec![MoveStmt::Expr(stub)])
            }
        }
    }

    fn is_storage_path(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Ident(name) => self.storage_alias(name).is_some() || self.is_state_root(name),
            Expr::Index { base, index: Some(_) } => self.is_storage_path(base),
            Expr::Member { object, .. } => self.is_storage_path(object),
            _ => false,
        }
    }

    fn while_loop(
        &mut self,
        cond: &Expr,
        body: &Stmt,
        exit: LoopExit,
        update: Option<&Expr>,
    ) -> Result<Vec<MoveStmt>> {
        let lowered = self.expr(cond)?;
        let check = self.take_prelude();

        self.enter_loop(exit);
        let body = self.sub_block(body);
        self.exit_loop();
        let mut stmts = body?.stmts;
        if let Some(update) = update {
            if !stmts.last().is_some_and(ends_flow) {
                let step = self.expr_stmt(update)?;
                stmts.extend(self.settle(step));
            }
        }

        if check.is_empty() {
            return Ok(vec![MoveStmt::While {
                cond: lowered,
                body: MoveBlock::new(stmts),
            }]);
        }
        let mut looped = check;
        looped.push(exit_if_not(lowered));
        looped.extend(stmts);
        Ok(vec![MoveStmt::Loop(MoveBlock::new(looped))])
    }

    fn for_loop(
        &mut self,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
    ) -> Result<Vec<MoveStmt>> {
        let mut out = match init {
            Some(init) => self.lower(init)?,
            None => Vec::new(),
        };
        let exit = match update {
            Some(update) => LoopExit::Update(update.clone()),
            None => LoopExit::Plain,
        };
        let cond = cond.cloned().unwrap_or(Expr::Bool(true));
        out.extend(self.while_loop(&cond, body, exit, update)?);
        Ok(out)
    }

    /// `if (!cond) break;` with the condition's own prelude in front.
    fn exit_unless(&mut self, cond: &Expr) -> Result<Vec<MoveStmt>> {
        let lowered = self.expr(cond)?;
        let mut out = self.settle(Vec::new());
        out.push(exit_if_not(lowered));
        Ok(out)
    }

    fn continue_stmt(&mut self) -> Result<Vec<MoveStmt>> {
        let mut out = match self.current_loop().cloned() {
            Some(LoopExit::Update(update)) => {
                let step = self.expr_stmt(&update)?;
                self.settle(step)
            }
            Some(LoopExit::Recheck(cond)) => self.exit_unless(&cond)?,
            Some(LoopExit::Plain) | None => Vec::new(),
        };
        out.push(MoveStmt::Continue);
        Ok(out)
    }

    fn return_stmt(&mut self, value: Option<&Expr>) -> Result<Vec<MoveStmt>> {
        let value = match value {
            Some(value) => Some(self.expr(value)?),
            None => self.named_result(),
        };
        let mut out = self.take_prelude();
        let deferred = self.take_deferred();
        let value = match value {
            Some(value) if !deferred.is_empty() => {
                let temps: Vec<String> = (0..self.returns.len().max(1))
                    .map(|_| self.fresh("r"))
                    .collect();
                out.push(MoveStmt::Let {
                    pattern: temps.clone(),
                    ty: None,
                    value: Some(value),
                });
                Some(tuple_of(temps.into_iter().map(MoveExpr::var).collect()))
            }
            other => other,
        };
        out.extend(deferred);
        out.push(MoveStmt::Return(value));
        Ok(out)
    }

    /// The value a bare `return` (or falling off the end) yields.
    pub(crate) fn named_result(&self) -> Option<MoveExpr> {
        if self.returns.is_empty() {
            return None;
        }
        if self.named_returns.len() == self.returns.len() {
            return Some(tuple_of(
                self.named_returns.iter().cloned().map(MoveExpr::var).collect(),
            ));
        }
        Some(tuple_of(
            self.returns.iter().map(|t| self.info.default_value(t)).collect(),
        ))
    }
}

fn tuple_of(mut items: Vec<MoveExpr>) -> MoveExpr {
    if items.len() == 1 {
        return items.remove(0);
    }
    ExprKind::Tuple(items).into()
}

fn exit_if_not(cond: MoveExpr) -> MoveStmt {
    MoveStmt::If {
        cond: MoveExpr::not(cond),
        then: MoveBlock::new(vec![MoveStmt::Break]),
        otherwise: None,
    }
}

fn ends_flow(stmt: &MoveStmt) -> bool {
    matches!(stmt, MoveStmt::Break | MoveStmt::Continue) || stmt.diverges()
}

/// Values that do nothing when discarded.
fn is_pure(expr: &MoveExpr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Var(_) | ExprKind::Int { .. } | ExprKind::Bool(_) | ExprKind::Address(_)
    )
}

/// Splices a nested block into its parent unless it declares locals.
fn flatten(stmts: Vec<MoveStmt>) -> Vec<MoveStmt> {
    if stmts.iter().any(|s| matches!(s, MoveStmt::Let { .. })) {
        vec![MoveStmt::Block(MoveBlock::new(stmts))]
    } else {
        stmts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_blocks_without_locals_are_spliced() {
        let stmts = vec![MoveStmt::Break];
        assert_eq!(flatten(stmts.clone()), stmts);

        let scoped = vec![MoveStmt::let_("x", None, MoveExpr::int(1u32))];
        assert_eq!(
            flatten(scoped.clone()),
            vec![MoveStmt::Block(MoveBlock::new(scoped))]
        );
    }

    #[test]
    fn test_flow_enders() {
        assert!(ends_flow(&MoveStmt::Continue));
        assert!(ends_flow(&MoveStmt::Return(None)));
        assert!(!ends_flow(&MoveStmt::Expr(MoveExpr::var("x"))));
    }

    #[test]
    fn test_single_value_is_not_wrapped() {
        let one = tuple_of(vec![MoveExpr::var("a")]);
        assert_eq!(one.as_var(), Some("a"));
        let pair = tuple_of(vec![MoveExpr::var("a"), MoveExpr::var("b")]);
        assert!(matches!(pair.kind, ExprKind::Tuple(ref items) if items.len() == 2));
    }
}
