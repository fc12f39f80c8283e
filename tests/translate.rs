use stoat_dl::ast::builder::*;
use stoat_dl::ast::{Clause, ExecutionOrder, ExecutionPlan, Program, Relation};
use stoat_dl::config::Config;
use stoat_dl::context::{Compiler, TranslationUnit};

fn transitive_closure() -> Program {
    let mut program = Program::new();
    program
        .add_relation(
            Relation::new("edge")
                .attribute("x", "number")
                .attribute("y", "number")
                .input(),
        )
        .unwrap();
    program
        .add_relation(
            Relation::new("path")
                .attribute("x", "number")
                .attribute("y", "number")
                .output(),
        )
        .unwrap();
    program.add_clause(Clause::rule(
        atom("path", vec![var("x"), var("y")]),
        vec![lit(atom("edge", vec![var("x"), var("y")]))],
    ));
    program.add_clause(Clause::rule(
        atom("path", vec![var("x"), var("y")]),
        vec![
            lit(atom("path", vec![var("x"), var("z")])),
            lit(atom("edge", vec![var("z"), var("y")])),
        ],
    ));
    program
}

fn compile(program: Program, config: Config) -> (TranslationUnit, stoat_dl::ram::RamProgram) {
    let mut tu = TranslationUnit::new(program);
    let mut compiler = Compiler::new(config);
    let ram = compiler
        .run(&mut tu)
        .expect("the program is well-formed")
        .expect("the program computes something");
    (tu, ram)
}

mod recursion {
    use super::*;

    #[test]
    fn a_recursive_scc_lowers_to_a_semi_naive_loop() {
        let (_, ram) = compile(transitive_closure(), Config::default());
        let rendered = format!("{ram}");

        // delta and new temporaries drive the fixpoint
        assert!(rendered.contains("CREATE @delta_path"));
        assert!(rendered.contains("CREATE @new_path"));
        assert!(rendered.contains("MERGE @delta_path WITH path"));

        // the loop: parallel rule block, exit on emptiness, update
        assert!(rendered.contains("LOOP"));
        assert!(rendered.contains("PARALLEL"));
        assert!(rendered.contains("EXIT (@new_path = ∅)"));
        assert!(rendered.contains("MERGE path WITH @new_path"));
        assert!(rendered.contains("SWAP (@delta_path, @new_path)"));
        assert!(rendered.contains("CLEAR @new_path"));

        // novelty: freshly derived tuples only
        assert!(rendered.contains("not path("));

        // the temporaries are dropped after the fixpoint
        assert!(rendered.contains("DROP @delta_path"));
        assert!(rendered.contains("DROP @new_path"));

        // the output is stored, the input dropped once expired
        assert!(rendered.contains("STORE DATA FOR path"));
        assert!(rendered.contains("DROP edge"));
    }

    #[test]
    fn non_recursive_rules_seed_the_delta() {
        let (_, ram) = compile(transitive_closure(), Config::default());
        let rendered = format!("{ram}");

        // path(x,y) :- edge(x,y) runs before the loop, into path itself
        let seed_at = rendered
            .find("SEARCH t0 ∈ edge")
            .expect("the seed rule scans edge");
        let loop_at = rendered.find("LOOP").expect("the loop exists");
        assert!(seed_at < loop_at);
    }
}

mod negation {
    use super::*;

    #[test]
    fn stratified_negation_lowers_to_not_exists() {
        let mut program = Program::new();
        program
            .add_relation(Relation::new("node").attribute("x", "number").input())
            .unwrap();
        program
            .add_relation(Relation::new("reachable").attribute("x", "number").input())
            .unwrap();
        program
            .add_relation(Relation::new("unreachable").attribute("x", "number").output())
            .unwrap();
        program.add_clause(Clause::rule(
            atom("unreachable", vec![var("x")]),
            vec![
                lit(atom("node", vec![var("x")])),
                neg(atom("reachable", vec![var("x")])),
            ],
        ));

        let (_, ram) = compile(program, Config::default());
        let rendered = format!("{ram}");

        // a single non-recursive rule: scan node, check reachable
        assert!(!rendered.contains("LOOP"));
        assert!(rendered.contains("SEARCH t0 ∈ node"));
        assert!(rendered.contains("not reachable(env(t0.0:x))"));
        assert!(rendered.contains("PROJECT (env(t0.0:x)) INTO unreachable"));
    }
}

mod facts {
    use super::*;

    #[test]
    fn facts_lower_to_direct_insertions() {
        let mut program = Program::new();
        program
            .add_relation(
                Relation::new("edge")
                    .attribute("x", "number")
                    .attribute("y", "number")
                    .output(),
            )
            .unwrap();
        program.add_clause(Clause::fact(atom("edge", vec![num(1), num(2)])));

        let (_, ram) = compile(program, Config::default());
        let rendered = format!("{ram}");
        assert!(rendered.contains("INSERT (number(1),number(2)) INTO edge"));
    }

    #[test]
    fn string_constants_intern_into_the_symbol_table() {
        let mut program = Program::new();
        program
            .add_relation(Relation::new("name").attribute("n", "symbol").output())
            .unwrap();
        program.add_clause(Clause::fact(atom("name", vec![text("stoat")])));

        let (tu, ram) = compile(program, Config::default());
        assert_eq!(tu.symbols.lookup("stoat"), Some(0));
        let rendered = format!("{ram}");
        assert!(rendered.contains("INSERT (number(0)) INTO name"));
    }
}

mod conditions {
    use super::*;

    #[test]
    fn constants_pin_scan_positions() {
        let mut program = Program::new();
        program
            .add_relation(
                Relation::new("edge")
                    .attribute("x", "number")
                    .attribute("y", "number")
                    .input(),
            )
            .unwrap();
        program
            .add_relation(Relation::new("from_one").attribute("y", "number").output())
            .unwrap();
        program.add_clause(Clause::rule(
            atom("from_one", vec![var("y")]),
            vec![lit(atom("edge", vec![num(1), var("y")]))],
        ));

        let (_, ram) = compile(program, Config::default());
        let rendered = format!("{ram}");
        assert!(rendered.contains("WHERE env(t0.0:x) = number(1)"));
    }

    #[test]
    fn repeated_variables_equate_their_occurrences() {
        let mut program = Program::new();
        program
            .add_relation(
                Relation::new("edge")
                    .attribute("x", "number")
                    .attribute("y", "number")
                    .input(),
            )
            .unwrap();
        program
            .add_relation(Relation::new("loops").attribute("x", "number").output())
            .unwrap();
        program.add_clause(Clause::rule(
            atom("loops", vec![var("x")]),
            vec![lit(atom("edge", vec![var("x"), var("x")]))],
        ));

        let (_, ram) = compile(program, Config::default());
        let rendered = format!("{ram}");
        assert!(rendered.contains("env(t0.0:x) = env(t0.1:y)"));
    }
}

mod aggregates {
    use super::*;
    use stoat_dl::ast::{AggregateOp, Argument};

    #[test]
    fn an_aggregate_lowers_to_an_aggregate_operation() {
        let mut program = Program::new();
        program
            .add_relation(Relation::new("item").attribute("v", "number").input())
            .unwrap();
        program
            .add_relation(Relation::new("total").attribute("s", "number").output())
            .unwrap();
        program.add_clause(Clause::rule(
            atom("total", vec![var("s")]),
            vec![eq(
                var("s"),
                Argument::aggregate(
                    AggregateOp::Sum,
                    Some(var("v")),
                    vec![lit(atom("item", vec![var("v")]))],
                ),
            )],
        ));

        let (_, ram) = compile(program, Config::default());
        let rendered = format!("{ram}");
        assert!(rendered.contains("AGGREGATE"));
        assert!(rendered.contains("sum"));
        assert!(rendered.contains("INTO total"));
    }
}

mod plans {
    use super::*;

    #[test]
    fn a_fixed_order_reorders_the_scans() {
        let mut program = Program::new();
        program
            .add_relation(Relation::new("a").attribute("x", "number").input())
            .unwrap();
        program
            .add_relation(Relation::new("b").attribute("x", "number").input())
            .unwrap();
        program
            .add_relation(Relation::new("q").attribute("x", "number").output())
            .unwrap();
        let mut clause = Clause::rule(
            atom("q", vec![var("x")]),
            vec![
                lit(atom("a", vec![var("x")])),
                lit(atom("b", vec![var("x")])),
            ],
        );
        let mut plan = ExecutionPlan::default();
        plan.orders.insert(
            0,
            ExecutionOrder {
                positions: vec![2, 1],
                loc: Default::default(),
            },
        );
        clause.plan = Some(plan);
        program.add_clause(clause);

        let (_, ram) = compile(program, Config::default());
        let rendered = format!("{ram}");
        assert!(rendered.contains("SEARCH t0 ∈ b"));
        assert!(rendered.contains("t1 ∈ a"));
    }
}

mod provenance {
    use super::*;

    #[test]
    fn each_rule_yields_a_subproof_subroutine() {
        let mut config = Config::default();
        config.provenance.set_from_cli(true);

        let (_, ram) = compile(transitive_closure(), config);
        assert!(ram.subroutines.contains_key("path_0_subproof"));
        assert!(ram.subroutines.contains_key("path_1_subproof"));

        let rendered = format!("{}", ram.subroutines["path_0_subproof"]);
        assert!(rendered.contains("RETURN"));
        assert!(rendered.contains("argument(0)"));
    }
}

mod profiling {
    use super::*;

    #[test]
    fn timers_and_size_counters_wrap_the_rules() {
        let mut config = Config::default();
        config.profile.set_from_cli(true);

        let (_, ram) = compile(transitive_closure(), config);
        let rendered = format!("{ram}");
        assert!(rendered.contains("START_TIMER \"@runtime;\""));
        assert!(rendered.contains("@t-nonrecursive-rule;path;"));
        assert!(rendered.contains("@t-recursive-relation;path;"));
        assert!(rendered.contains("LOGSIZE"));
    }
}
