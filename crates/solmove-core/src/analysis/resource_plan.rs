use super::state_vars::{StateVariableAnalysis, VariableCategory};
use crate::ir::{IRContract, IRType};
use crate::naming::to_pascal_case;
use crate::types::MoveType;
use crate::{IrError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationLevel {
    /// One resource holding every state variable.
    None,
    #[default]
    Basic,
    /// `Basic` plus per-caller storage and 256-bit aggregators.
    Full,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub level: OptimizationLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Config,
    Counters,
    State,
    /// One resource per caller address, holding that caller's mapping value.
    Distributed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceGroup {
    pub name: String,
    pub kind: GroupKind,
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VarRepr {
    Field,
    Aggregator { element: MoveType },
    Distributed { store: String },
}

static FIELD: VarRepr = VarRepr::Field;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FunctionProfile {
    pub reads: BTreeSet<String>,
    pub writes: BTreeSet<String>,
    pub acquires: BTreeSet<String>,
}

impl FunctionProfile {
    pub fn touches(&self, group: &str) -> bool {
        self.reads.contains(group) || self.writes.contains(group)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcePlan {
    pub contract: String,
    pub level: OptimizationLevel,
    pub groups: Vec<ResourceGroup>,
    pub var_group: IndexMap<String, String>,
    pub repr: IndexMap<String, VarRepr>,
    /// Keyed by function ident; the initializer is `constructor`.
    pub profiles: IndexMap<String, FunctionProfile>,
    pub warnings: Vec<String>,
    pub analysis: StateVariableAnalysis,
}

impl ResourcePlan {
    pub fn group(&self, name: &str) -> Option<&ResourceGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn group_of(&self, variable: &str) -> Option<&ResourceGroup> {
        self.var_group.get(variable).and_then(|g| self.group(g))
    }

    pub fn repr_of(&self, variable: &str) -> &VarRepr {
        self.repr.get(variable).unwrap_or(&FIELD)
    }

    pub fn profile(&self, function: &str) -> Option<&FunctionProfile> {
        self.profiles.get(function)
    }

    /// Shared groups a function needs a reference to, with mutability, in group order.
    /// Per-caller stores are reached through their accessor helpers and never appear here.
    pub fn borrowed_groups(&self, function: &str) -> Vec<(String, bool)> {
        let Some(profile) = self.profiles.get(function) else {
            return Vec::new();
        };
        self.groups
            .iter()
            .filter(|g| g.kind != GroupKind::Distributed && profile.touches(&g.name))
            .map(|g| (g.name.clone(), profile.writes.contains(&g.name)))
            .collect()
    }

    pub fn shared_groups(&self) -> impl Iterator<Item = &ResourceGroup> {
        self.groups
            .iter()
            .filter(|g| g.kind != GroupKind::Distributed)
    }

    pub fn distributed_groups(&self) -> impl Iterator<Item = &ResourceGroup> {
        self.groups
            .iter()
            .filter(|g| g.kind == GroupKind::Distributed)
    }

    /// Checks the layout invariants: every variable in exactly one group, one borrow per
    /// resource per function, and variables read-modify-written together share a group.
    pub fn verify(&self) -> Result<()> {
        let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
        let mut names = BTreeSet::new();
        for group in &self.groups {
            if !names.insert(group.name.as_str()) {
                return Err(IrError::PlanViolation(format!(
                    "resource {} declared twice",
                    group.name
                )));
            }
            for var in &group.variables {
                if let Some(other) = seen.insert(var.as_str(), group.name.as_str()) {
                    return Err(IrError::PlanViolation(format!(
                        "{} belongs to both {} and {}",
                        var, other, group.name
                    )));
                }
            }
        }
        for var in &self.analysis.access.state_vars {
            match (seen.get(var.as_str()), self.var_group.get(var)) {
                (Some(g), Some(mapped)) if *g == mapped.as_str() => {}
                _ => {
                    return Err(IrError::PlanViolation(format!(
                        "{} is not assigned to exactly one resource",
                        var
                    )))
                }
            }
        }

        for (function, profile) in &self.profiles {
            let borrowed: Vec<String> = self
                .borrowed_groups(function)
                .into_iter()
                .map(|(g, _)| g)
                .collect();
            let unique: BTreeSet<&String> = borrowed.iter().collect();
            if unique.len() != borrowed.len() {
                return Err(IrError::PlanViolation(format!(
                    "{} borrows a resource twice",
                    function
                )));
            }
            for group in profile.reads.iter().chain(profile.writes.iter()) {
                if self.group(group).is_none() {
                    return Err(IrError::PlanViolation(format!(
                        "{} touches unknown resource {}",
                        function, group
                    )));
                }
            }
        }

        for facts in self.analysis.access.functions.values() {
            for (written, read) in &facts.coupled {
                if !self.is_plain_field(written) || !self.is_plain_field(read) {
                    continue;
                }
                if self.var_group.get(written) != self.var_group.get(read) {
                    return Err(IrError::PlanViolation(format!(
                        "{} writes {} from {} but they live in different resources",
                        facts.ident, written, read
                    )));
                }
            }
        }
        Ok(())
    }

    fn is_plain_field(&self, variable: &str) -> bool {
        matches!(self.repr_of(variable), VarRepr::Field)
    }
}

pub struct ResourcePlanner<'a> {
    contract: &'a IRContract,
    analysis: &'a StateVariableAnalysis,
    config: &'a PlannerConfig,
    warnings: Vec<String>,
}

impl<'a> ResourcePlanner<'a> {
    pub fn new(
        contract: &'a IRContract,
        analysis: &'a StateVariableAnalysis,
        config: &'a PlannerConfig,
    ) -> Self {
        Self {
            contract,
            analysis,
            config,
            warnings: Vec::new(),
        }
    }

    pub fn plan(mut self) -> Result<ResourcePlan> {
        let mut repr = IndexMap::new();
        for var in &self.contract.state_vars {
            repr.insert(var.name.clone(), VarRepr::Field);
        }

        let groups = match self.config.level {
            OptimizationLevel::None => self.single_group(),
            OptimizationLevel::Basic | OptimizationLevel::Full => self.split_groups(&mut repr),
        };

        let mut var_group = IndexMap::new();
        for var in &self.contract.state_vars {
            if let Some(group) = groups.iter().find(|g| g.variables.contains(&var.name)) {
                var_group.insert(var.name.clone(), group.name.clone());
            }
        }

        let profiles = self.profiles(&var_group);
        let plan = ResourcePlan {
            contract: self.contract.name.clone(),
            level: self.config.level,
            groups,
            var_group,
            repr,
            profiles,
            warnings: self.warnings,
            analysis: self.analysis.clone(),
        };
        plan.verify()?;
        Ok(plan)
    }

    fn name(&self, suffix: &str) -> String {
        format!("{}{}", self.contract.name, suffix)
    }

    fn single_group(&self) -> Vec<ResourceGroup> {
        let variables: Vec<String> = self
            .contract
            .state_vars
            .iter()
            .map(|v| v.name.clone())
            .collect();
        if variables.is_empty() {
            return Vec::new();
        }
        vec![ResourceGroup {
            name: self.name("State"),
            kind: GroupKind::State,
            variables,
        }]
    }

    fn split_groups(&mut self, repr: &mut IndexMap<String, VarRepr>) -> Vec<ResourceGroup> {
        let full = self.config.level == OptimizationLevel::Full;
        let mut config = Vec::new();
        let mut counters = Vec::new();
        let mut distributed = Vec::new();
        let mut general = Vec::new();

        let contract = self.contract;
        let analysis = self.analysis;
        for var in &contract.state_vars {
            let category = analysis
                .category(&var.name)
                .unwrap_or(VariableCategory::General);
            match category {
                VariableCategory::AdminConfig => config.push(var.name.clone()),
                VariableCategory::Aggregatable => {
                    counters.push(var.name.clone());
                    if let Some(element) = self.aggregator_element(&var.name, &var.ty, full) {
                        repr.insert(var.name.clone(), VarRepr::Aggregator { element });
                    }
                }
                VariableCategory::UserKeyedMapping if full && Self::distributable(&var.ty) => {
                    let store = format!("{}Store", to_pascal_case(&var.name));
                    repr.insert(
                        var.name.clone(),
                        VarRepr::Distributed {
                            store: store.clone(),
                        },
                    );
                    distributed.push(ResourceGroup {
                        name: store,
                        kind: GroupKind::Distributed,
                        variables: vec![var.name.clone()],
                    });
                }
                _ => general.push(var.name.clone()),
            }
        }

        let mut groups = Vec::new();
        if !config.is_empty() {
            groups.push(ResourceGroup {
                name: self.name("Config"),
                kind: GroupKind::Config,
                variables: config,
            });
        }
        if !counters.is_empty() {
            groups.push(ResourceGroup {
                name: self.name("Counters"),
                kind: GroupKind::Counters,
                variables: counters,
            });
        }
        for variables in self.split_by_conflicts(&general) {
            groups.push(ResourceGroup {
                name: String::new(),
                kind: GroupKind::State,
                variables,
            });
        }

        let mut groups = self.merge_coupled(groups, repr);
        let mut index = 0;
        for group in groups.iter_mut().filter(|g| g.kind == GroupKind::State) {
            index += 1;
            group.name = if index == 1 {
                self.name("State")
            } else {
                self.name(&format!("State{}", index))
            };
        }
        groups.extend(distributed);
        groups
    }

    fn aggregator_element(&mut self, name: &str, ty: &IRType, full: bool) -> Option<MoveType> {
        match ty.width()? {
            w if w <= 64 => Some(MoveType::u64()),
            w if w <= 128 => Some(MoveType::u128()),
            _ if full => {
                self.warnings.push(format!(
                    "{} is a 256-bit counter; using Aggregator<u128> narrows its range",
                    name
                ));
                Some(MoveType::u128())
            }
            _ => None,
        }
    }

    fn distributable(ty: &IRType) -> bool {
        ty.mapping_depth() == 1
            && ty
                .mapping_key()
                .map(|k| k.target == MoveType::Address)
                .unwrap_or(false)
    }

    /// Greedy colouring in declaration order: a variable joins the first group holding none of
    /// its conflicting variables.
    fn split_by_conflicts(&self, general: &[String]) -> Vec<Vec<String>> {
        let access = &self.analysis.access;
        let concurrent: Vec<(String, BTreeSet<String>)> = access
            .concurrent_functions()
            .into_iter()
            .map(|f| (f.to_string(), access.transitive_writes(f)))
            .collect();

        let conflicts = |a: &str, b: &str| -> bool {
            concurrent.iter().any(|(f, wf)| {
                concurrent.iter().any(|(g, wg)| {
                    f != g
                        && wf.contains(a)
                        && !wg.contains(a)
                        && wg.contains(b)
                        && !wf.contains(b)
                })
            })
        };

        let mut groups: Vec<Vec<String>> = Vec::new();
        for var in general {
            let slot = groups
                .iter()
                .position(|members| members.iter().all(|m| !conflicts(m, var)));
            match slot {
                Some(i) => groups[i].push(var.clone()),
                None => groups.push(vec![var.clone()]),
            }
        }
        groups
    }

    /// Unions groups whenever one assignment reads a variable of one to write a variable of the
    /// other. Aggregator-backed variables never force a merge.
    fn merge_coupled(
        &self,
        groups: Vec<ResourceGroup>,
        repr: &IndexMap<String, VarRepr>,
    ) -> Vec<ResourceGroup> {
        let mut parent: Vec<usize> = (0..groups.len()).collect();
        fn find(parent: &mut Vec<usize>, i: usize) -> usize {
            let mut root = i;
            while parent[root] != root {
                root = parent[root];
            }
            parent[i] = root;
            root
        }

        let index_of = |var: &str| groups.iter().position(|g| g.variables.iter().any(|v| v == var));
        let is_field = |var: &str| matches!(repr.get(var), Some(VarRepr::Field) | None);

        for facts in self.analysis.access.functions.values() {
            for (written, read) in &facts.coupled {
                if !is_field(written) || !is_field(read) {
                    continue;
                }
                if let (Some(a), Some(b)) = (index_of(written), index_of(read)) {
                    let ra = find(&mut parent, a);
                    let rb = find(&mut parent, b);
                    if ra != rb {
                        let (keep, drop) = if ra < rb { (ra, rb) } else { (rb, ra) };
                        parent[drop] = keep;
                    }
                }
            }
        }

        let order: Vec<&String> = self.contract.state_vars.iter().map(|v| &v.name).collect();
        let mut merged: Vec<ResourceGroup> = Vec::new();
        let mut root_slot: BTreeMap<usize, usize> = BTreeMap::new();
        for i in 0..groups.len() {
            let root = find(&mut parent, i);
            match root_slot.get(&root) {
                Some(&slot) => {
                    let vars = groups[i].variables.clone();
                    merged[slot].variables.extend(vars);
                }
                None => {
                    root_slot.insert(root, merged.len());
                    merged.push(groups[root].clone());
                    if root != i {
                        let vars = groups[i].variables.clone();
                        merged[root_slot[&root]].variables.extend(vars);
                    }
                }
            }
        }
        for group in &mut merged {
            group.variables.sort_by_key(|v| order.iter().position(|o| *o == v));
            group.variables.dedup();
        }
        merged
    }

    fn profiles(&self, var_group: &IndexMap<String, String>) -> IndexMap<String, FunctionProfile> {
        let access = &self.analysis.access;
        let to_groups = |vars: BTreeSet<String>| -> BTreeSet<String> {
            vars.iter()
                .filter_map(|v| var_group.get(v).cloned())
                .collect()
        };

        let mut direct: IndexMap<String, (BTreeSet<String>, BTreeSet<String>)> = IndexMap::new();
        for ident in access.functions.keys() {
            direct.insert(
                ident.clone(),
                (
                    to_groups(access.direct_reads(ident)),
                    to_groups(access.direct_writes(ident)),
                ),
            );
        }

        let mut profiles = IndexMap::new();
        for ident in access.functions.keys() {
            let mut profile = FunctionProfile::default();
            let reachable = std::iter::once(ident.clone()).chain(access.transitive_callees(ident));
            for f in reachable {
                if let Some((reads, writes)) = direct.get(&f) {
                    profile.reads.extend(reads.iter().cloned());
                    profile.writes.extend(writes.iter().cloned());
                }
            }
            profile.acquires = profile.reads.union(&profile.writes).cloned().collect();
            profiles.insert(ident.clone(), profile);
        }
        profiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StateVariableAnalyzer;
    use crate::ir::{IRFunction, IRParam, IRStateVariable};
    use crate::source::{
        BinaryOp, ContractKind, Expr, FunctionKind, Mutability, SourceType, Stmt, Visibility,
    };
    use crate::type_mapper::{StaticScope, TypeMapper};

    fn var(name: &str, ty: IRType) -> IRStateVariable {
        IRStateVariable {
            name: name.to_string(),
            ty,
            visibility: Visibility::Internal,
            constant: false,
            immutable: false,
            initializer: None,
            origin: "Pool".to_string(),
            line: 0,
        }
    }

    fn func(name: &str, body: Vec<Stmt>) -> IRFunction {
        IRFunction {
            name: name.to_string(),
            ident: name.to_string(),
            kind: FunctionKind::Function,
            visibility: Visibility::External,
            mutability: Mutability::NonPayable,
            params: vec![IRParam {
                name: "x".to_string(),
                ty: IRType::uint(256),
            }],
            returns: Vec::new(),
            modifiers: Vec::new(),
            body,
            has_body: true,
            origin: "Pool".to_string(),
            is_virtual: false,
            synthetic: false,
            line: 0,
        }
    }

    fn set(target: &str, value: Expr) -> Stmt {
        Stmt::expr(Expr::assign(Expr::ident(target), value))
    }

    fn plan(contract: &IRContract, level: OptimizationLevel) -> ResourcePlan {
        let analysis = StateVariableAnalyzer::analyze(contract);
        let config = PlannerConfig { level };
        ResourcePlanner::new(contract, &analysis, &config)
            .plan()
            .unwrap()
    }

    fn pool() -> IRContract {
        let mut c = IRContract::new("Pool", ContractKind::Contract);
        c.state_vars.push(var("a", IRType::uint(256)));
        c.state_vars.push(var("b", IRType::uint(256)));
        c.state_vars.push(var("c", IRType::uint(256)));
        c.functions.push(func("setA", vec![set("a", Expr::ident("x"))]));
        c.functions.push(func("setB", vec![set("b", Expr::ident("x"))]));
        c.functions.push(func("setC", vec![set("c", Expr::ident("x"))]));
        c
    }

    #[test]
    fn test_level_none_is_single_group() {
        let plan = plan(&pool(), OptimizationLevel::None);
        assert_eq!(plan.groups.len(), 1);
        assert_eq!(plan.groups[0].name, "PoolState");
        assert_eq!(plan.groups[0].variables, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_concurrent_writers_are_split() {
        let plan = plan(&pool(), OptimizationLevel::Basic);
        let names: Vec<&str> = plan.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["PoolState", "PoolState2", "PoolState3"]);
        assert_eq!(plan.borrowed_groups("setB"), vec![("PoolState2".to_string(), true)]);
    }

    #[test]
    fn test_coupled_variables_are_merged() {
        let mut contract = pool();
        contract.functions.push(func(
            "syncAC",
            vec![set(
                "a",
                Expr::binary(BinaryOp::Add, Expr::ident("a"), Expr::ident("c")),
            )],
        ));
        let plan = plan(&contract, OptimizationLevel::Basic);
        assert_eq!(plan.var_group["a"], plan.var_group["c"]);
        assert_ne!(plan.var_group["a"], plan.var_group["b"]);
        plan.verify().unwrap();
    }

    #[test]
    fn test_separately_updated_pair_is_not_split() {
        let mut contract = pool();
        contract.functions.push(func(
            "bump",
            vec![
                Stmt::expr(Expr::compound(BinaryOp::Add, Expr::ident("a"), Expr::num("1"))),
                Stmt::expr(Expr::compound(BinaryOp::Add, Expr::ident("b"), Expr::num("1"))),
            ],
        ));
        let plan = plan(&contract, OptimizationLevel::Basic);
        assert_eq!(plan.var_group["a"], plan.var_group["b"]);
        assert_ne!(plan.var_group["a"], plan.var_group["c"]);
        plan.verify().unwrap();
    }

    #[test]
    fn test_full_level_distributes_caller_keyed_mapping() {
        let mut c = IRContract::new("Points", ContractKind::Contract);
        let ty = TypeMapper::map(
            &SourceType::mapping(
                SourceType::elementary("address"),
                SourceType::elementary("uint256"),
            ),
            &StaticScope::new(),
        )
        .unwrap();
        c.state_vars.push(var("points", ty));
        c.functions.push(func(
            "claim",
            vec![Stmt::expr(Expr::assign(
                Expr::index(Expr::ident("points"), Expr::msg_sender()),
                Expr::ident("x"),
            ))],
        ));

        let basic = plan(&c, OptimizationLevel::Basic);
        assert_eq!(basic.groups[0].kind, GroupKind::State);

        let full = plan(&c, OptimizationLevel::Full);
        assert_eq!(full.groups.len(), 1);
        assert_eq!(full.groups[0].name, "PointsStore");
        assert_eq!(full.groups[0].kind, GroupKind::Distributed);
        assert_eq!(
            full.repr_of("points"),
            &VarRepr::Distributed {
                store: "PointsStore".to_string()
            }
        );
        assert!(full.borrowed_groups("claim").is_empty());
    }

    #[test]
    fn test_counters_use_aggregators() {
        let mut c = IRContract::new("Hits", ContractKind::Contract);
        c.state_vars.push(var("hits", IRType::uint(64)));
        c.state_vars.push(var("volume", IRType::uint(256)));
        c.functions.push(func(
            "hit",
            vec![
                Stmt::expr(Expr::compound(BinaryOp::Add, Expr::ident("hits"), Expr::num("1"))),
                Stmt::expr(Expr::compound(BinaryOp::Add, Expr::ident("volume"), Expr::ident("x"))),
            ],
        ));
        let basic = plan(&c, OptimizationLevel::Basic);
        assert_eq!(
            basic.repr_of("hits"),
            &VarRepr::Aggregator {
                element: MoveType::u64()
            }
        );
        assert_eq!(basic.repr_of("volume"), &VarRepr::Field);
        assert!(basic.warnings.is_empty());

        let full = plan(&c, OptimizationLevel::Full);
        assert_eq!(
            full.repr_of("volume"),
            &VarRepr::Aggregator {
                element: MoveType::u128()
            }
        );
        assert_eq!(full.warnings.len(), 1);
    }

    #[test]
    fn test_verify_rejects_split_coupled_pair() {
        let mut contract = pool();
        contract.functions.push(func("syncAB", vec![set("a", Expr::ident("b"))]));
        let mut plan = plan(&contract, OptimizationLevel::Basic);
        plan.var_group.insert("b".to_string(), "Elsewhere".to_string());
        assert!(plan.verify().is_err());
    }
}
