//! Runs type inference over finished functions with the module's own declarations as the
//! environment.

use solmove_core::infer::{TypeConflict, TypeEnv, TypeInference};
use solmove_core::move_ast::{MoveFunction, MoveModule};
use solmove_core::types::MoveType;
use std::collections::HashMap;

/// Constants, struct fields and function signatures of one module.
#[derive(Debug, Default)]
pub struct ModuleTypes {
    constants: HashMap<String, MoveType>,
    fields: HashMap<(String, String), MoveType>,
    functions: HashMap<String, (Vec<MoveType>, MoveType)>,
}

impl ModuleTypes {
    pub fn of(module: &MoveModule) -> Self {
        let constants = module
            .constants
            .iter()
            .map(|c| (c.name.clone(), c.ty.clone()))
            .collect();
        let fields = module
            .structs
            .iter()
            .flat_map(|s| {
                s.fields
                    .iter()
                    .map(move |f| ((s.name.clone(), f.name.clone()), f.ty.clone()))
            })
            .collect();
        let functions = module
            .functions
            .iter()
            .map(|f| {
                let params = f.params.iter().map(|p| p.ty.clone()).collect();
                (f.name.clone(), (params, return_type(f)))
            })
            .collect();
        Self {
            constants,
            fields,
            functions,
        }
    }
}

impl TypeEnv for ModuleTypes {
    fn lookup(&self, name: &str) -> Option<MoveType> {
        self.constants.get(name).cloned()
    }

    fn field_type(&self, struct_name: &str, field: &str) -> Option<MoveType> {
        self.fields
            .get(&(struct_name.to_string(), field.to_string()))
            .cloned()
    }

    fn call_return(&self, module: Option<&str>, name: &str) -> Option<MoveType> {
        match (module, name) {
            (None, "exists") => Some(MoveType::Bool),
            (None, _) => self.functions.get(name).map(|(_, ret)| ret.clone()),
            _ => None,
        }
    }

    fn call_params(&self, module: Option<&str>, name: &str) -> Option<Vec<MoveType>> {
        match module {
            None => self.functions.get(name).map(|(params, _)| params.clone()),
            Some(_) => None,
        }
    }
}

fn return_type(f: &MoveFunction) -> MoveType {
    match f.returns.as_slice() {
        [] => MoveType::Unit,
        [single] => single.clone(),
        many => MoveType::Tuple(many.to_vec()),
    }
}

/// Annotates `function` in place and returns the sites mixing signedness.
pub fn infer_function(env: &ModuleTypes, function: &mut MoveFunction) -> Vec<TypeConflict> {
    let mut inference = TypeInference::new(env);
    if !function.returns.is_empty() {
        inference = inference.expecting_return(return_type(function));
    }
    for param in &function.params {
        inference.declare(&param.name, param.ty.clone());
    }
    inference.infer_body(&mut function.body);
    inference.take_conflicts()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use solmove_core::move_ast::{FunVisibility, MoveBinOp, MoveBlock, MoveExpr, MoveParam};

    fn widening_module() -> MoveModule {
        let mut module = MoveModule::new("solmove", "counter");
        let mut f = MoveFunction::new("sum", FunVisibility::Private);
        f.params = vec![
            MoveParam::new("a", MoveType::u64()),
            MoveParam::new("b", MoveType::u128()),
        ];
        f.returns = vec![MoveType::u128()];
        f.body = MoveBlock::with_result(
            Vec::new(),
            MoveExpr::binary(MoveBinOp::Add, MoveExpr::var("a"), MoveExpr::var("b")),
        );
        module.functions.push(f);
        module
    }

    #[test]
    fn test_operands_are_widened_against_module_signatures() {
        let mut module = widening_module();
        let env = ModuleTypes::of(&module);
        assert_eq!(env.call_return(None, "sum"), Some(MoveType::u128()));

        let conflicts = infer_function(&env, &mut module.functions[0]);
        assert!(conflicts.is_empty());
        let result = module.functions[0].body.result.as_deref().cloned();
        assert_eq!(
            result.and_then(|r| r.inferred_type),
            Some(MoveType::u128())
        );
    }

    #[test]
    fn test_second_run_changes_nothing() {
        let mut module = widening_module();
        let env = ModuleTypes::of(&module);
        infer_function(&env, &mut module.functions[0]);
        let once = module.functions[0].clone();
        infer_function(&env, &mut module.functions[0]);
        assert_eq!(module.functions[0], once);
    }

    #[test]
    fn test_exists_is_boolean() {
        let env = ModuleTypes::default();
        assert_eq!(env.call_return(None, "exists"), Some(MoveType::Bool));
        assert_eq!(env.call_return(Some("coin"), "balance"), None);
    }
}
