use pretty_assertions::assert_eq;
use solmove_core::move_ast::{
    Ability, FunVisibility, MoveBinOp, MoveBlock, MoveConstant, MoveExpr, MoveField,
    MoveFunction, MoveModule, MoveParam, MoveStmt, MoveStruct, UseDecl,
};
use solmove_core::types::MoveType;
use solmove_emit::{
    render_summary, EmitterConfig, ModuleSummary, MoveEmitter, OutputFormat, VerbosityLevel,
};

fn counter_module() -> MoveModule {
    let mut module = MoveModule::new("solmove", "counter");
    module.uses.push(UseDecl {
        path: "std::signer".to_string(),
        members: vec![],
    });
    module.constants.push(MoveConstant {
        name: "E_NOT_OWNER".to_string(),
        ty: MoveType::u64(),
        value: MoveExpr::int(1u32),
        doc: Some("Caller is not the owner.".to_string()),
    });
    module.structs.push(MoveStruct {
        name: "CounterState".to_string(),
        abilities: vec![Ability::Key],
        fields: vec![MoveField {
            name: "count".to_string(),
            ty: MoveType::u256(),
        }],
        attributes: vec![],
        doc: None,
    });

    let mut init = MoveFunction::new("init_module", FunVisibility::Private);
    init.params.push(MoveParam::new(
        "account",
        MoveType::reference(MoveType::Signer, false),
    ));
    init.body = MoveBlock::new(vec![MoveStmt::Expr(MoveExpr::call(
        None,
        "move_to",
        vec![
            MoveExpr::var("account"),
            MoveExpr::typed(
                solmove_core::move_ast::ExprKind::Pack {
                    name: "CounterState".to_string(),
                    fields: vec![("count".to_string(), MoveExpr::int(0u32))],
                },
                MoveType::local_struct("CounterState"),
            ),
        ],
    ))]);
    module.functions.push(init);

    let mut increment = MoveFunction::new("increment", FunVisibility::Public);
    increment.is_entry = true;
    increment.params.push(MoveParam::new(
        "account",
        MoveType::reference(MoveType::Signer, false),
    ));
    increment.acquires.push("CounterState".to_string());
    increment.body = MoveBlock::new(vec![
        MoveStmt::let_(
            "counter_state",
            None,
            MoveExpr::borrow_global("CounterState", MoveExpr::address("solmove"), true),
        ),
        MoveStmt::If {
            cond: MoveExpr::binary(
                MoveBinOp::Eq,
                MoveExpr::field(MoveExpr::var("counter_state"), "count"),
                MoveExpr::int(0u32),
            ),
            then: MoveBlock::new(vec![MoveStmt::Comment("first use".to_string())]),
            otherwise: None,
        },
        MoveStmt::assign(
            MoveExpr::field(MoveExpr::var("counter_state"), "count"),
            MoveExpr::binary(
                MoveBinOp::Add,
                MoveExpr::field(MoveExpr::var("counter_state"), "count"),
                MoveExpr::int(1u32),
            ),
        ),
    ]);
    module.functions.push(increment);

    let mut get = MoveFunction::new("get_count", FunVisibility::Public);
    get.attributes.push("view".to_string());
    get.returns.push(MoveType::u256());
    get.acquires.push("CounterState".to_string());
    get.body = MoveBlock::with_result(
        vec![],
        MoveExpr::field(
            MoveExpr::borrow_global("CounterState", MoveExpr::address("solmove"), false),
            "count",
        ),
    );
    module.functions.push(get);
    module
}

const COUNTER: &str = r#"module solmove::counter {
    use std::signer;

    /// Caller is not the owner.
    const E_NOT_OWNER: u64 = 1;

    struct CounterState has key {
        count: u256,
    }

    fun init_module(account: &signer) {
        move_to(account, CounterState { count: 0 });
    }

    public entry fun increment(account: &signer) acquires CounterState {
        let counter_state = borrow_global_mut<CounterState>(@solmove);
        if (counter_state.count == 0) {
            // first use
        };
        counter_state.count = counter_state.count + 1;
    }

    #[view]
    public fun get_count(): u256 acquires CounterState {
        borrow_global<CounterState>(@solmove).count
    }
}
"#;

#[test]
fn test_counter_module_text() {
    let output = MoveEmitter::default().emit_module(&counter_module()).unwrap();
    assert_eq!(output, COUNTER);
}

#[test]
fn test_emission_is_deterministic() {
    let emitter = MoveEmitter::default();
    let module = counter_module();
    assert_eq!(
        emitter.emit_module(&module).unwrap(),
        emitter.emit_module(&module.clone()).unwrap()
    );
}

#[test]
fn test_else_if_chain_stays_flat() {
    let mut module = MoveModule::new("solmove", "branches");
    let mut f = MoveFunction::new("pick", FunVisibility::Private);
    f.params.push(MoveParam::new("x", MoveType::u64()));
    f.returns.push(MoveType::u64());
    f.body = MoveBlock::new(vec![MoveStmt::If {
        cond: MoveExpr::binary(MoveBinOp::Lt, MoveExpr::var("x"), MoveExpr::int(10u32)),
        then: MoveBlock::new(vec![MoveStmt::Return(Some(MoveExpr::int(1u32)))]),
        otherwise: Some(MoveBlock::new(vec![MoveStmt::If {
            cond: MoveExpr::binary(MoveBinOp::Lt, MoveExpr::var("x"), MoveExpr::int(100u32)),
            then: MoveBlock::new(vec![MoveStmt::Return(Some(MoveExpr::int(2u32)))]),
            otherwise: Some(MoveBlock::new(vec![MoveStmt::Return(Some(MoveExpr::int(3u32)))])),
        }])),
    }]);
    module.functions.push(f);
    let output = MoveEmitter::default().emit_module(&module).unwrap();
    assert_eq!(
        output,
        "module solmove::branches {
    fun pick(x: u64): u64 {
        if (x < 10) {
            return 1;
        } else if (x < 100) {
            return 2;
        } else {
            return 3;
        };
    }
}
"
    );
}

#[test]
fn test_summary_classifies_structs_and_functions() {
    let summary = ModuleSummary::from_module(&counter_module());
    assert_eq!(summary.module, "solmove::counter");
    assert_eq!(summary.resources, vec!["CounterState".to_string()]);
    assert_eq!(summary.error_codes, vec![("E_NOT_OWNER".to_string(), 1)]);
    assert_eq!(
        summary.entry_functions().map(|f| f.name.as_str()).collect::<Vec<_>>(),
        vec!["increment"]
    );
    assert_eq!(
        summary.view_functions().map(|f| f.name.as_str()).collect::<Vec<_>>(),
        vec!["get_count"]
    );
}

#[test]
fn test_text_summary_rendering() {
    let summary = ModuleSummary::from_module(&counter_module());
    let config = EmitterConfig {
        verbosity: VerbosityLevel::Verbose,
        ..EmitterConfig::default()
    };
    let text = render_summary(&summary, OutputFormat::Text, &config).unwrap();
    insta::assert_snapshot!(text, @r"
    === solmove::counter ===
    resources: CounterState
    error codes: 1
      - init_module (private)
      - increment (entry) acquires CounterState
      - get_count (view) acquires CounterState
    ");
}
