use crate::ir::{IRContract, IRFunction};
use crate::source::{BinaryOp, Expr, Stmt, UnaryOp};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

pub const INITIALIZER: &str = "constructor";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WriteOp {
    Assign,
    AddAssign,
    SubAssign,
    OtherCompound,
    Increment,
    Decrement,
    Delete,
    Push,
    Pop,
}

impl WriteOp {
    /// Operators that only ever add to or subtract from the current value.
    pub fn is_accumulating(&self) -> bool {
        matches!(
            self,
            WriteOp::AddAssign | WriteOp::SubAssign | WriteOp::Increment | WriteOp::Decrement
        )
    }

    fn reads_current(&self) -> bool {
        !matches!(self, WriteOp::Assign | WriteOp::Delete)
    }
}

/// Shape of a mapping key expression at a write site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyShape {
    Caller,
    Parameter,
    Literal,
    Computed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableAccessRecord {
    pub function: String,
    pub variable: String,
    /// Plain rvalue reads; compound writes are not counted here.
    pub reads: usize,
    pub writes: usize,
    pub write_ops: BTreeSet<WriteOp>,
    pub admin_guarded: bool,
    /// Key shapes of the outermost mapping key at write sites.
    pub key_shapes: BTreeSet<KeyShape>,
    pub read_before_write: bool,
    pub in_initializer: bool,
    pub in_view: bool,
    pub emits_event: bool,
}

impl VariableAccessRecord {
    fn new(function: &str, variable: &str) -> Self {
        Self {
            function: function.to_string(),
            variable: variable.to_string(),
            reads: 0,
            writes: 0,
            write_ops: BTreeSet::new(),
            admin_guarded: false,
            key_shapes: BTreeSet::new(),
            read_before_write: false,
            in_initializer: false,
            in_view: false,
            emits_event: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionFacts {
    pub ident: String,
    pub is_view: bool,
    pub is_initializer: bool,
    pub externally_callable: bool,
    /// Same-contract functions called directly, by ident.
    pub calls: BTreeSet<String>,
    /// Sender check in the body, an applied guard modifier, or a call to a guard helper.
    pub direct_guard: bool,
    /// `direct_guard`, or internal and only ever reached from guarded callers.
    pub admin_guarded: bool,
    pub emits_directly: bool,
    /// Emits an event itself or through a callee.
    pub emits: bool,
    /// `(written, read)` pairs where one assignment reads one state variable to write another,
    /// plus every pair of variables the function read-modify-writes.
    pub coupled: BTreeSet<(String, String)>,
}

/// Access facts for every function of one contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractAnalysis {
    pub contract: String,
    pub state_vars: Vec<String>,
    pub functions: IndexMap<String, FunctionFacts>,
    pub records: Vec<VariableAccessRecord>,
}

impl ContractAnalysis {
    pub fn build(contract: &IRContract) -> Self {
        let state_vars: Vec<String> = contract.state_vars.iter().map(|v| v.name.clone()).collect();
        let state_set: HashSet<&str> = state_vars.iter().map(|s| s.as_str()).collect();

        let mut functions = IndexMap::new();
        let mut records = Vec::new();

        let has_declared_values = contract.state_vars.iter().any(|v| v.initializer.is_some());
        if contract.initializer.is_none() && has_declared_values {
            functions.insert(
                INITIALIZER.to_string(),
                FunctionFacts {
                    ident: INITIALIZER.to_string(),
                    is_view: false,
                    is_initializer: true,
                    externally_callable: false,
                    calls: BTreeSet::new(),
                    direct_guard: false,
                    admin_guarded: false,
                    emits_directly: false,
                    emits: false,
                    coupled: BTreeSet::new(),
                },
            );
        }

        for function in contract.all_functions() {
            let mut visitor = AccessVisitor::new(contract, &state_set, function);
            visitor.visit_function(function);
            if function.is_initializer() {
                for var in contract.state_vars.iter().filter(|v| v.initializer.is_some()) {
                    if let Some(value) = &var.initializer {
                        visitor.visit_expr(value);
                    }
                    visitor.write(&var.name, WriteOp::Assign);
                }
            }
            let ident = if function.is_initializer() {
                INITIALIZER.to_string()
            } else {
                function.ident.clone()
            };
            let mut facts = FunctionFacts {
                ident: ident.clone(),
                is_view: function.is_view(),
                is_initializer: function.is_initializer(),
                externally_callable: function.is_externally_callable() && !function.is_initializer(),
                calls: visitor.calls.clone(),
                direct_guard: visitor.guarded,
                admin_guarded: false,
                emits_directly: visitor.emits,
                emits: visitor.emits,
                coupled: visitor.coupled.clone(),
            };
            if !function.is_initializer() {
                facts.coupled.extend(read_modify_write_pairs(visitor.records.values()));
            }
            for (_, mut record) in visitor.records {
                record.function = ident.clone();
                record.in_initializer = function.is_initializer();
                record.in_view = function.is_view();
                records.push(record);
            }
            functions.insert(ident, facts);
        }

        if contract.initializer.is_none() && has_declared_values {
            for var in contract.state_vars.iter().filter(|v| v.initializer.is_some()) {
                let mut record = VariableAccessRecord::new(INITIALIZER, &var.name);
                record.writes = 1;
                record.write_ops.insert(WriteOp::Assign);
                record.in_initializer = true;
                records.push(record);
            }
        }

        let mut analysis = Self {
            contract: contract.name.clone(),
            state_vars,
            functions,
            records,
        };
        analysis.resolve_guards();
        analysis.resolve_emits();
        for record in &mut analysis.records {
            if let Some(facts) = analysis.functions.get(&record.function) {
                record.admin_guarded = facts.admin_guarded;
                record.emits_event = facts.emits;
            }
        }
        analysis
    }

    /// Internal functions reached only from guarded callers are guarded too.
    fn resolve_guards(&mut self) {
        for facts in self.functions.values_mut() {
            facts.admin_guarded = facts.direct_guard;
        }
        loop {
            let mut changed = false;
            let idents: Vec<String> = self.functions.keys().cloned().collect();
            for ident in &idents {
                let facts = &self.functions[ident];
                if facts.admin_guarded || facts.externally_callable || facts.is_initializer {
                    continue;
                }
                let callers: Vec<&FunctionFacts> = self
                    .functions
                    .values()
                    .filter(|f| f.calls.contains(ident) && &f.ident != ident)
                    .collect();
                let guarded = !callers.is_empty()
                    && callers.iter().all(|c| c.admin_guarded || c.is_initializer);
                if guarded {
                    if let Some(facts) = self.functions.get_mut(ident) {
                        facts.admin_guarded = true;
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
    }

    fn resolve_emits(&mut self) {
        let idents: Vec<String> = self.functions.keys().cloned().collect();
        for ident in &idents {
            let emits = self
                .transitive_callees(ident)
                .iter()
                .chain(std::iter::once(ident))
                .any(|f| {
                    self.functions
                        .get(f)
                        .map(|facts| facts.emits_directly)
                        .unwrap_or(false)
                });
            if let Some(facts) = self.functions.get_mut(ident) {
                facts.emits = emits;
            }
        }
    }

    pub fn records_for<'a>(
        &'a self,
        variable: &'a str,
    ) -> impl Iterator<Item = &'a VariableAccessRecord> {
        self.records.iter().filter(move |r| r.variable == variable)
    }

    pub fn record(&self, function: &str, variable: &str) -> Option<&VariableAccessRecord> {
        self.records
            .iter()
            .find(|r| r.function == function && r.variable == variable)
    }

    pub fn direct_writes(&self, function: &str) -> BTreeSet<String> {
        self.records
            .iter()
            .filter(|r| r.function == function && r.writes > 0)
            .map(|r| r.variable.clone())
            .collect()
    }

    pub fn direct_reads(&self, function: &str) -> BTreeSet<String> {
        self.records
            .iter()
            .filter(|r| r.function == function && (r.reads > 0 || r.read_before_write))
            .map(|r| r.variable.clone())
            .collect()
    }

    /// Every function reachable from `function` through same-contract calls, excluding itself.
    pub fn transitive_callees(&self, function: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&str> = vec![function];
        while let Some(current) = stack.pop() {
            if let Some(facts) = self.functions.get(current) {
                for callee in &facts.calls {
                    if callee != function && seen.insert(callee.clone()) {
                        stack.push(callee);
                    }
                }
            }
        }
        seen
    }

    pub fn transitive_writes(&self, function: &str) -> BTreeSet<String> {
        let mut writes = self.direct_writes(function);
        for callee in self.transitive_callees(function) {
            writes.extend(self.direct_writes(&callee));
        }
        writes
    }

    /// Entry points Block-STM may execute side by side: externally callable, mutating, not
    /// guarded, not the initializer.
    pub fn concurrent_functions(&self) -> Vec<&str> {
        self.functions
            .values()
            .filter(|f| {
                f.externally_callable && !f.is_view && !f.admin_guarded && !f.is_initializer
            })
            .map(|f| f.ident.as_str())
            .collect()
    }
}

struct AccessVisitor<'a> {
    contract: &'a IRContract,
    state_vars: &'a HashSet<&'a str>,
    locals: HashSet<String>,
    params: HashSet<String>,
    records: IndexMap<String, VariableAccessRecord>,
    calls: BTreeSet<String>,
    coupled: BTreeSet<(String, String)>,
    guarded: bool,
    emits: bool,
    function: String,
}

impl<'a> AccessVisitor<'a> {
    fn new(contract: &'a IRContract, state_vars: &'a HashSet<&'a str>, function: &IRFunction) -> Self {
        Self {
            contract,
            state_vars,
            locals: HashSet::new(),
            params: HashSet::new(),
            records: IndexMap::new(),
            calls: BTreeSet::new(),
            coupled: BTreeSet::new(),
            guarded: false,
            emits: false,
            function: function.ident.clone(),
        }
    }

    fn visit_function(&mut self, function: &IRFunction) {
        self.params = function.params.iter().map(|p| p.name.clone()).collect();
        self.locals = self.params.clone();
        self.locals
            .extend(function.returns.iter().filter_map(|r| r.name.clone()));
        collect_locals(&function.body, &mut self.locals);

        for invocation in &function.modifiers {
            for arg in &invocation.args {
                self.visit_expr(arg);
            }
            let Some(modifier) = self.contract.modifier(&invocation.name) else {
                continue;
            };
            if has_sender_check(self.contract, &modifier.body) {
                self.guarded = true;
            }
            let saved_locals = self.locals.clone();
            let saved_params = self.params.clone();
            self.locals
                .extend(modifier.params.iter().map(|p| p.name.clone()));
            self.params
                .extend(modifier.params.iter().map(|p| p.name.clone()));
            collect_locals(&modifier.body, &mut self.locals);
            for stmt in &modifier.body {
                self.visit_stmt(stmt);
            }
            self.locals = saved_locals;
            self.params = saved_params;
        }

        if has_sender_check(self.contract, &function.body) {
            self.guarded = true;
        }
        for stmt in &function.body {
            self.visit_stmt(stmt);
        }
    }

    fn is_state(&self, name: &str) -> bool {
        self.state_vars.contains(name) && !self.locals.contains(name)
    }

    fn record(&mut self, variable: &str) -> &mut VariableAccessRecord {
        let function = self.function.clone();
        self.records
            .entry(variable.to_string())
            .or_insert_with(|| VariableAccessRecord::new(&function, variable))
    }

    fn read(&mut self, variable: &str) {
        self.record(variable).reads += 1;
    }

    fn write(&mut self, variable: &str, op: WriteOp) {
        let record = self.record(variable);
        record.writes += 1;
        record.write_ops.insert(op);
        if op.reads_current() || record.reads > 0 {
            record.read_before_write = true;
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Emit { args, .. } => {
                self.emits = true;
                args.iter().for_each(|a| self.visit_expr(a));
            }
            Stmt::Block(stmts) | Stmt::Unchecked(stmts) => {
                stmts.iter().for_each(|s| self.visit_stmt(s))
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                self.visit_expr(cond);
                self.visit_stmt(then);
                if let Some(o) = otherwise {
                    self.visit_stmt(o);
                }
            }
            Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
                self.visit_expr(cond);
                self.visit_stmt(body);
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                if let Some(i) = init {
                    self.visit_stmt(i);
                }
                if let Some(c) = cond {
                    self.visit_expr(c);
                }
                if let Some(u) = update {
                    self.visit_expr(u);
                }
                self.visit_stmt(body);
            }
            Stmt::Expr(e) => self.visit_expr(e),
            Stmt::VarDecl { value: Some(v), .. } | Stmt::Return(Some(v)) => self.visit_expr(v),
            Stmt::Revert { args, .. } => args.iter().for_each(|a| self.visit_expr(a)),
            _ => {}
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident(name) => {
                if self.is_state(name) {
                    self.read(name);
                }
            }
            Expr::Assign { op, target, value } => {
                let write_op = match op {
                    None => WriteOp::Assign,
                    Some(BinaryOp::Add) => WriteOp::AddAssign,
                    Some(BinaryOp::Sub) => WriteOp::SubAssign,
                    Some(_) => WriteOp::OtherCompound,
                };
                self.visit_expr(value);
                self.visit_lvalue(target, write_op);
                self.couple(target, &[value]);
            }
            Expr::Unary { op, operand } => match op {
                UnaryOp::PreInc | UnaryOp::PostInc => self.visit_lvalue(operand, WriteOp::Increment),
                UnaryOp::PreDec | UnaryOp::PostDec => self.visit_lvalue(operand, WriteOp::Decrement),
                UnaryOp::Delete => self.visit_lvalue(operand, WriteOp::Delete),
                _ => self.visit_expr(operand),
            },
            Expr::Call {
                callee,
                args,
                options,
                named,
            } => {
                args.iter().for_each(|a| self.visit_expr(a));
                options.iter().for_each(|(_, v)| self.visit_expr(v));
                named.iter().for_each(|(_, v)| self.visit_expr(v));
                match callee.as_ref() {
                    Expr::Member { object, member }
                        if (member == "push" || member == "pop")
                            && object.root_ident().map(|r| self.is_state(r)).unwrap_or(false) =>
                    {
                        let op = if member == "push" {
                            WriteOp::Push
                        } else {
                            WriteOp::Pop
                        };
                        self.visit_lvalue(object, op);
                        let arg_refs: Vec<&Expr> = args.iter().collect();
                        self.couple(object, &arg_refs);
                    }
                    Expr::Ident(name) => self.record_call(name, args.len()),
                    Expr::Member { object, member }
                        if matches!(object.as_ref(), Expr::Ident(o) if o == "this") =>
                    {
                        self.record_call(member, args.len())
                    }
                    other => self.visit_expr(other),
                }
            }
            Expr::Member { object, .. } => self.visit_expr(object),
            Expr::Index { base, index } => {
                self.visit_expr(base);
                if let Some(i) = index {
                    self.visit_expr(i);
                }
            }
            Expr::Binary { lhs, rhs, .. } => {
                self.visit_expr(lhs);
                self.visit_expr(rhs);
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                self.visit_expr(cond);
                self.visit_expr(then);
                self.visit_expr(otherwise);
            }
            Expr::Tuple(items) => items.iter().flatten().for_each(|e| self.visit_expr(e)),
            Expr::InlineArray(items) => items.iter().for_each(|e| self.visit_expr(e)),
            _ => {}
        }
    }

    fn record_call(&mut self, name: &str, arity: usize) {
        if let Some(callee) = self.contract.resolve_call(name, arity) {
            let ident = callee.ident.clone();
            if has_sender_check(self.contract, &callee.body)
                && !callee.is_externally_callable()
                && callee.body.len() <= 2
            {
                self.guarded = true;
            }
            self.calls.insert(ident);
        }
    }

    fn visit_lvalue(&mut self, target: &Expr, op: WriteOp) {
        match target {
            Expr::Tuple(items) => {
                for item in items.iter().flatten() {
                    self.visit_lvalue(item, op);
                }
                return;
            }
            Expr::Index { base, index } => {
                self.visit_lvalue_path(base);
                if let Some(i) = index {
                    self.visit_expr(i);
                }
            }
            Expr::Member { object, .. } => self.visit_lvalue_path(object),
            _ => {}
        }

        let Some(root) = target.root_ident() else {
            return;
        };
        if !self.is_state(root) {
            return;
        }
        let root = root.to_string();
        let shape = first_key(target).map(|k| self.key_shape(k));
        self.write(&root, op);
        if let Some(shape) = shape {
            self.record(&root).key_shapes.insert(shape);
        }
    }

    /// Visits index expressions along an lvalue path without counting the root as a read.
    fn visit_lvalue_path(&mut self, path: &Expr) {
        match path {
            Expr::Index { base, index } => {
                self.visit_lvalue_path(base);
                if let Some(i) = index {
                    self.visit_expr(i);
                }
            }
            Expr::Member { object, .. } => self.visit_lvalue_path(object),
            _ => {}
        }
    }

    fn couple(&mut self, target: &Expr, values: &[&Expr]) {
        let Some(written) = target.root_ident() else {
            return;
        };
        if !self.is_state(written) {
            return;
        }
        let mut read = BTreeSet::new();
        for value in values {
            value.walk(&mut |e| {
                if let Expr::Ident(name) = e {
                    if self.is_state(name) && name != written {
                        read.insert(name.clone());
                    }
                }
            });
        }
        for r in read {
            self.coupled.insert((written.to_string(), r));
        }
    }

    fn key_shape(&self, key: &Expr) -> KeyShape {
        if key.is_msg_sender() {
            return KeyShape::Caller;
        }
        match key {
            Expr::Ident(name) if self.params.contains(name) => KeyShape::Parameter,
            Expr::Number(_) | Expr::Bool(_) | Expr::Str(_) | Expr::HexStr(_) => KeyShape::Literal,
            _ => KeyShape::Computed,
        }
    }
}

/// Key of the mapping level adjacent to the root identifier: `k1` in `m[k1][k2].f`.
fn first_key(target: &Expr) -> Option<&Expr> {
    match target {
        Expr::Index { base, index } => match base.as_ref() {
            Expr::Ident(_) => index.as_deref(),
            other => first_key(other),
        },
        Expr::Member { object, .. } => first_key(object),
        _ => None,
    }
}

/// Both orders of every pair of variables updated from their own current value.
fn read_modify_write_pairs<'r>(
    records: impl Iterator<Item = &'r VariableAccessRecord>,
) -> Vec<(String, String)> {
    let modified: Vec<&str> = records
        .filter(|r| r.writes > 0 && r.read_before_write)
        .map(|r| r.variable.as_str())
        .collect();
    let mut pairs = Vec::new();
    for a in &modified {
        for b in &modified {
            if a != b {
                pairs.push((a.to_string(), b.to_string()));
            }
        }
    }
    pairs
}

fn collect_locals(stmts: &[Stmt], locals: &mut HashSet<String>) {
    for stmt in stmts {
        stmt.walk(&mut |s| {
            if let Stmt::VarDecl { decls, .. } = s {
                for decl in decls.iter().flatten() {
                    locals.insert(decl.name.clone());
                }
            }
        });
    }
}

/// Storage the caller can be checked against: a state variable, a path rooted in one, or a
/// parameterless getter such as `owner()`.
fn is_authority(contract: &IRContract, expr: &Expr) -> bool {
    match expr {
        Expr::Call { callee, args, .. } => {
            args.is_empty()
                && matches!(callee.as_ref(), Expr::Ident(n) if contract.resolve_call(n, 0).is_some())
        }
        _ if expr.is_msg_sender() => false,
        _ => expr
            .root_ident()
            .is_some_and(|root| contract.state_var(root).is_some()),
    }
}

fn sender_against_authority(contract: &IRContract, lhs: &Expr, rhs: &Expr) -> bool {
    (lhs.is_msg_sender() && is_authority(contract, rhs))
        || (rhs.is_msg_sender() && is_authority(contract, lhs))
}

/// Holds only for the privileged caller: `msg.sender == owner`, `admins[msg.sender]` or a role
/// lookup through one of the contract's own functions.
fn grants(contract: &IRContract, expr: &Expr) -> bool {
    match expr {
        Expr::Binary {
            op: BinaryOp::Eq,
            lhs,
            rhs,
        } => sender_against_authority(contract, lhs, rhs),
        Expr::Binary {
            op: BinaryOp::And,
            lhs,
            rhs,
        } => grants(contract, lhs) || grants(contract, rhs),
        Expr::Binary {
            op: BinaryOp::Or,
            lhs,
            rhs,
        } => grants(contract, lhs) && grants(contract, rhs),
        Expr::Unary {
            op: UnaryOp::Not,
            operand,
        } => denies(contract, operand),
        Expr::Index {
            base,
            index: Some(index),
        } => index.is_msg_sender() && is_authority(contract, base),
        Expr::Call { callee, args, .. } => {
            matches!(callee.as_ref(), Expr::Ident(n) if contract.resolve_call(n, args.len()).is_some())
                && args.iter().any(Expr::is_msg_sender)
        }
        _ => false,
    }
}

/// Holds for every caller except the privileged one.
fn denies(contract: &IRContract, expr: &Expr) -> bool {
    match expr {
        Expr::Binary {
            op: BinaryOp::Ne,
            lhs,
            rhs,
        } => sender_against_authority(contract, lhs, rhs),
        Expr::Binary {
            op: BinaryOp::Or,
            lhs,
            rhs,
        } => denies(contract, lhs) || denies(contract, rhs),
        Expr::Binary {
            op: BinaryOp::And,
            lhs,
            rhs,
        } => denies(contract, lhs) && denies(contract, rhs),
        Expr::Unary {
            op: UnaryOp::Not,
            operand,
        } => grants(contract, operand),
        _ => false,
    }
}

/// `require(msg.sender == owner)`, `if (msg.sender != owner) revert ...` and role checks such as
/// `require(hasRole(ADMIN, msg.sender))`. Comparisons against parameters or literals
/// (`require(to != msg.sender)`) restrict nobody in particular and do not count.
pub fn has_sender_check(contract: &IRContract, stmts: &[Stmt]) -> bool {
    let mut found = false;
    for stmt in stmts {
        stmt.walk(&mut |s| match s {
            Stmt::Expr(Expr::Call { callee, args, .. }) => {
                if let Expr::Ident(name) = callee.as_ref() {
                    if (name == "require" || name == "assert")
                        && args.first().is_some_and(|c| grants(contract, c))
                    {
                        found = true;
                    }
                }
            }
            Stmt::If { cond, then, .. } => {
                if denies(contract, cond) && reverts(then) {
                    found = true;
                }
            }
            _ => {}
        });
    }
    found
}

fn reverts(stmt: &Stmt) -> bool {
    let mut found = false;
    stmt.walk(&mut |s| match s {
        Stmt::Revert { .. } => found = true,
        Stmt::Expr(Expr::Call { callee, .. }) => {
            if matches!(callee.as_ref(), Expr::Ident(n) if n == "revert") {
                found = true;
            }
        }
        _ => {}
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IRModifier, IRParam, IRStateVariable, IRType};
    use crate::source::{FunctionKind, ModifierInvocation, Mutability, Visibility};

    fn state_var(name: &str, ty: IRType) -> IRStateVariable {
        IRStateVariable {
            name: name.to_string(),
            ty,
            visibility: Visibility::Internal,
            constant: false,
            immutable: false,
            initializer: None,
            origin: "T".to_string(),
            line: 0,
        }
    }

    fn function(name: &str, visibility: Visibility, body: Vec<Stmt>) -> IRFunction {
        IRFunction {
            name: name.to_string(),
            ident: name.to_string(),
            kind: FunctionKind::Function,
            visibility,
            mutability: Mutability::NonPayable,
            params: vec![IRParam {
                name: "to".to_string(),
                ty: IRType::address(),
            }],
            returns: Vec::new(),
            modifiers: Vec::new(),
            body,
            has_body: true,
            origin: "T".to_string(),
            is_virtual: false,
            synthetic: false,
            line: 0,
        }
    }

    fn mapping() -> IRType {
        crate::type_mapper::TypeMapper::map(
            &crate::source::SourceType::mapping(
                crate::source::SourceType::elementary("address"),
                crate::source::SourceType::elementary("uint256"),
            ),
            &crate::type_mapper::StaticScope::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_records_key_shapes_and_ops() {
        let mut contract = IRContract::new("T", crate::source::ContractKind::Contract);
        contract.state_vars.push(state_var("balances", mapping()));
        contract.state_vars.push(state_var("total", IRType::uint(256)));
        contract.functions.push(function(
            "deposit",
            Visibility::External,
            vec![
                Stmt::expr(Expr::compound(
                    BinaryOp::Add,
                    Expr::index(Expr::ident("balances"), Expr::msg_sender()),
                    Expr::num("1"),
                )),
                Stmt::expr(Expr::unary(UnaryOp::PostInc, Expr::ident("total"))),
            ],
        ));
        let analysis = ContractAnalysis::build(&contract);
        let balances = analysis.record("deposit", "balances").unwrap();
        assert_eq!(balances.writes, 1);
        assert!(balances.key_shapes.contains(&KeyShape::Caller));
        assert!(balances.write_ops.contains(&WriteOp::AddAssign));
        assert!(balances.read_before_write);
        let total = analysis.record("deposit", "total").unwrap();
        assert!(total.write_ops.contains(&WriteOp::Increment));
        assert_eq!(total.reads, 0);
    }

    #[test]
    fn test_guard_via_modifier_and_fixpoint() {
        let mut contract = IRContract::new("T", crate::source::ContractKind::Contract);
        contract.state_vars.push(state_var("owner", IRType::address()));
        contract.state_vars.push(state_var("fee", IRType::uint(256)));
        contract.modifiers.push(IRModifier {
            name: "onlyOwner".to_string(),
            params: Vec::new(),
            body: vec![
                Stmt::require(
                    Expr::binary(BinaryOp::Eq, Expr::msg_sender(), Expr::ident("owner")),
                    "not owner",
                ),
                Stmt::Placeholder,
            ],
            origin: "T".to_string(),
        });
        let mut set_fee = function(
            "setFee",
            Visibility::External,
            vec![Stmt::expr(Expr::call_named("_setFee", vec![]))],
        );
        set_fee.modifiers.push(ModifierInvocation {
            name: "onlyOwner".to_string(),
            args: Vec::new(),
        });
        set_fee.params.clear();
        let mut inner = function(
            "_setFee",
            Visibility::Internal,
            vec![Stmt::expr(Expr::assign(Expr::ident("fee"), Expr::num("5")))],
        );
        inner.params.clear();
        contract.functions.push(set_fee);
        contract.functions.push(inner);

        let analysis = ContractAnalysis::build(&contract);
        assert!(analysis.functions["setFee"].direct_guard);
        assert!(analysis.functions["_setFee"].admin_guarded);
        assert!(analysis.record("_setFee", "fee").unwrap().admin_guarded);
        assert!(analysis.concurrent_functions().is_empty());
    }

    #[test]
    fn test_coupling_is_recorded_per_assignment() {
        let mut contract = IRContract::new("T", crate::source::ContractKind::Contract);
        contract.state_vars.push(state_var("a", IRType::uint(256)));
        contract.state_vars.push(state_var("b", IRType::uint(256)));
        contract.functions.push(function(
            "sync",
            Visibility::Public,
            vec![Stmt::expr(Expr::assign(Expr::ident("a"), Expr::ident("b")))],
        ));
        let analysis = ContractAnalysis::build(&contract);
        assert!(analysis.functions["sync"]
            .coupled
            .contains(&("a".to_string(), "b".to_string())));
    }

    #[test]
    fn test_sender_checks_need_privileged_storage() {
        let mut contract = IRContract::new("T", crate::source::ContractKind::Contract);
        contract.state_vars.push(state_var("owner", IRType::address()));
        contract.state_vars.push(state_var("admins", mapping()));
        contract.state_vars.push(state_var("fee", IRType::uint(256)));
        contract.modifiers.push(IRModifier {
            name: "onlyMember".to_string(),
            params: Vec::new(),
            body: vec![Stmt::Placeholder],
            origin: "T".to_string(),
        });
        let set_fee = || Stmt::expr(Expr::assign(Expr::ident("fee"), Expr::num("5")));
        let zero_address = Expr::call(
            Expr::ElementaryType(crate::source::SourceType::elementary("address")),
            vec![Expr::num("0")],
        );

        contract.functions.push(function(
            "notSelf",
            Visibility::External,
            vec![
                Stmt::require(
                    Expr::binary(BinaryOp::Ne, Expr::ident("to"), Expr::msg_sender()),
                    "self",
                ),
                set_fee(),
            ],
        ));
        contract.functions.push(function(
            "notZero",
            Visibility::External,
            vec![
                Stmt::require(
                    Expr::binary(BinaryOp::Ne, Expr::msg_sender(), zero_address),
                    "zero",
                ),
                set_fee(),
            ],
        ));
        let mut member = function("member", Visibility::External, vec![set_fee()]);
        member.modifiers.push(ModifierInvocation {
            name: "onlyMember".to_string(),
            args: Vec::new(),
        });
        contract.functions.push(member);
        contract.functions.push(function(
            "ownerOnly",
            Visibility::External,
            vec![
                Stmt::If {
                    cond: Expr::binary(BinaryOp::Ne, Expr::msg_sender(), Expr::ident("owner")),
                    then: Box::new(Stmt::Revert {
                        error: None,
                        args: Vec::new(),
                    }),
                    otherwise: None,
                },
                set_fee(),
            ],
        ));
        contract.functions.push(function(
            "adminOnly",
            Visibility::External,
            vec![
                Stmt::require(
                    Expr::index(Expr::ident("admins"), Expr::msg_sender()),
                    "not admin",
                ),
                set_fee(),
            ],
        ));

        let analysis = ContractAnalysis::build(&contract);
        assert!(!analysis.functions["notSelf"].direct_guard);
        assert!(!analysis.functions["notZero"].direct_guard);
        assert!(!analysis.functions["member"].direct_guard);
        assert!(analysis.functions["ownerOnly"].direct_guard);
        assert!(analysis.functions["adminOnly"].direct_guard);
    }

    #[test]
    fn test_separate_updates_in_one_function_are_coupled() {
        let mut contract = IRContract::new("T", crate::source::ContractKind::Contract);
        contract.state_vars.push(state_var("a", IRType::uint(256)));
        contract.state_vars.push(state_var("b", IRType::uint(256)));
        contract.state_vars.push(state_var("c", IRType::uint(256)));
        contract.functions.push(function(
            "bump",
            Visibility::Public,
            vec![
                Stmt::expr(Expr::compound(BinaryOp::Add, Expr::ident("a"), Expr::num("1"))),
                Stmt::expr(Expr::compound(BinaryOp::Sub, Expr::ident("b"), Expr::num("1"))),
                Stmt::expr(Expr::assign(Expr::ident("c"), Expr::num("0"))),
            ],
        ));
        let coupled = &ContractAnalysis::build(&contract).functions["bump"].coupled;
        assert!(coupled.contains(&("a".to_string(), "b".to_string())));
        assert!(coupled.contains(&("b".to_string(), "a".to_string())));
        assert!(!coupled.iter().any(|(w, r)| w == "c" || r == "c"));
    }
}
