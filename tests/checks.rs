use stoat_dl::ast::builder::*;
use stoat_dl::ast::{AggregateOp, Argument, Clause, ExecutionOrder, ExecutionPlan, Program, Relation};
use stoat_dl::config::Config;
use stoat_dl::context::{Compiler, TranslationUnit};

fn reject(program: Program) -> TranslationUnit {
    let mut tu = TranslationUnit::new(program);
    let mut compiler = Compiler::new(Config::default());
    assert!(compiler.rewrite(&mut tu).is_err());
    assert!(tu.report.has_errors());
    tu
}

fn has_error(tu: &TranslationUnit, fragment: &str) -> bool {
    tu.report
        .diagnostics()
        .iter()
        .any(|d| d.primary.message.contains(fragment))
}

mod acceptance {
    use super::*;

    #[test]
    fn a_well_formed_program_passes() {
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

        let mut tu = TranslationUnit::new(program);
        let mut compiler = Compiler::new(Config::default());
        assert!(compiler.rewrite(&mut tu).is_ok());
        assert!(!tu.report.has_errors());
        assert_eq!(tu.report.warning_count(), 0);
    }
}

mod shape {
    use super::*;

    #[test]
    fn undefined_relations_are_reported() {
        let mut program = Program::new();
        program
            .add_relation(Relation::new("q").attribute("x", "number").output())
            .unwrap();
        program.add_clause(Clause::rule(
            atom("q", vec![var("x")]),
            vec![lit(atom("r", vec![var("x")]))],
        ));
        let tu = reject(program);
        assert!(has_error(&tu, "Undefined relation r"));
    }

    #[test]
    fn arity_mismatches_are_reported() {
        let mut program = Program::new();
        program
            .add_relation(Relation::new("q").attribute("x", "number").output())
            .unwrap();
        program
            .add_relation(Relation::new("r").attribute("x", "number").input())
            .unwrap();
        program.add_clause(Clause::rule(
            atom("q", vec![var("x")]),
            vec![lit(atom("r", vec![var("x"), var("x")]))],
        ));
        let tu = reject(program);
        assert!(has_error(&tu, "Mismatching arity of relation r"));
    }

    #[test]
    fn underscores_in_heads_are_rejected() {
        let mut program = Program::new();
        program
            .add_relation(Relation::new("q").attribute("x", "number").output())
            .unwrap();
        program
            .add_relation(Relation::new("r").attribute("x", "number").input())
            .unwrap();
        program.add_clause(Clause::rule(
            atom("q", vec![unnamed()]),
            vec![lit(atom("r", vec![var("x")]))],
        ));
        let tu = reject(program);
        assert!(has_error(&tu, "Underscore in head of rule"));
    }

    #[test]
    fn facts_must_be_ground() {
        let mut program = Program::new();
        program
            .add_relation(Relation::new("q").attribute("x", "number").output())
            .unwrap();
        program.add_clause(Clause::fact(atom("q", vec![var("x")])));
        let tu = reject(program);
        assert!(has_error(&tu, "Variable x in fact"));
    }

    #[test]
    fn constant_arithmetic_is_fine_in_facts() {
        let mut program = Program::new();
        program
            .add_relation(Relation::new("q").attribute("x", "number").output())
            .unwrap();
        program.add_clause(Clause::fact(atom(
            "q",
            vec![Argument::binary(stoat_dl::ast::BinaryOp::Add, num(1), num(2))],
        )));

        let mut tu = TranslationUnit::new(program);
        let mut compiler = Compiler::new(Config::default());
        assert!(compiler.rewrite(&mut tu).is_ok());
    }

    #[test]
    fn execution_plans_must_be_permutations() {
        let mut program = Program::new();
        program
            .add_relation(Relation::new("q").attribute("x", "number").output())
            .unwrap();
        program
            .add_relation(Relation::new("r").attribute("x", "number").input())
            .unwrap();
        let mut clause = Clause::rule(
            atom("q", vec![var("x")]),
            vec![lit(atom("r", vec![var("x")]))],
        );
        let mut plan = ExecutionPlan::default();
        plan.orders.insert(
            0,
            ExecutionOrder {
                positions: vec![1, 1],
                loc: Default::default(),
            },
        );
        clause.plan = Some(plan);
        program.add_clause(clause);

        let tu = reject(program);
        assert!(has_error(&tu, "Invalid execution plan"));
    }

    #[test]
    fn use_once_variables_warn() {
        let mut program = Program::new();
        program
            .add_relation(Relation::new("q").attribute("x", "number").output())
            .unwrap();
        program
            .add_relation(
                Relation::new("r")
                    .attribute("x", "number")
                    .attribute("y", "number")
                    .input(),
            )
            .unwrap();
        program.add_clause(Clause::rule(
            atom("q", vec![var("x")]),
            vec![lit(atom("r", vec![var("x"), var("lonely")]))],
        ));

        let mut tu = TranslationUnit::new(program);
        let mut compiler = Compiler::new(Config::default());
        assert!(compiler.rewrite(&mut tu).is_ok());
        assert!(tu
            .report
            .diagnostics()
            .iter()
            .any(|d| d.primary.message.contains("lonely only occurs once")));
    }
}

mod groundedness {
    use super::*;

    #[test]
    fn head_variables_need_a_positive_source() {
        let mut program = Program::new();
        program
            .add_relation(Relation::new("q").attribute("x", "number").output())
            .unwrap();
        program
            .add_relation(Relation::new("r").attribute("x", "number").input())
            .unwrap();
        program.add_clause(Clause::rule(
            atom("q", vec![var("x")]),
            vec![neg(atom("r", vec![var("x")]))],
        ));
        let tu = reject(program);
        assert!(has_error(&tu, "Ungrounded variable x"));
    }
}

mod witness {
    use super::*;

    #[test]
    fn aggregator_scopes_do_not_leak_witnesses() {
        let mut program = Program::new();
        program
            .add_relation(Relation::new("q").attribute("x", "number").output())
            .unwrap();
        program
            .add_relation(
                Relation::new("r")
                    .attribute("a", "number")
                    .attribute("b", "number")
                    .input(),
            )
            .unwrap();
        // x is grounded only within the aggregator's scope
        program.add_clause(Clause::rule(
            atom("q", vec![var("x")]),
            vec![eq(
                var("s"),
                Argument::aggregate(
                    AggregateOp::Sum,
                    Some(var("y")),
                    vec![lit(atom("r", vec![var("y"), var("x")]))],
                ),
            )],
        ));
        let tu = reject(program);
        assert!(has_error(&tu, "Witness problem"));
    }
}

mod stratification {
    use super::*;

    #[test]
    fn cyclic_negation_is_rejected() {
        let mut program = Program::new();
        program
            .add_relation(Relation::new("p").attribute("x", "number").output())
            .unwrap();
        program
            .add_relation(Relation::new("q").attribute("x", "number").input())
            .unwrap();
        program.add_clause(Clause::rule(
            atom("p", vec![var("x")]),
            vec![
                lit(atom("q", vec![var("x")])),
                neg(atom("p", vec![var("x")])),
            ],
        ));
        let tu = reject(program);
        assert!(has_error(&tu, "Unable to stratify"));
    }
}

mod inlining {
    use super::*;

    #[test]
    fn inline_cycles_are_rejected() {
        let mut program = Program::new();
        program
            .add_relation(Relation::new("a").attribute("x", "number").inline())
            .unwrap();
        program
            .add_relation(Relation::new("b").attribute("x", "number").inline())
            .unwrap();
        program
            .add_relation(Relation::new("out").attribute("x", "number").output())
            .unwrap();
        program.add_clause(Clause::rule(
            atom("a", vec![var("x")]),
            vec![lit(atom("b", vec![var("x")]))],
        ));
        program.add_clause(Clause::rule(
            atom("b", vec![var("x")]),
            vec![lit(atom("a", vec![var("x")]))],
        ));
        program.add_clause(Clause::rule(
            atom("out", vec![var("x")]),
            vec![lit(atom("a", vec![var("x")]))],
        ));
        let tu = reject(program);
        assert!(has_error(&tu, "Cannot inline cyclically dependent relations"));
    }

    #[test]
    fn inlined_atoms_in_aggregators_are_rejected() {
        let mut program = Program::new();
        program
            .add_relation(Relation::new("p").attribute("x", "number").inline())
            .unwrap();
        program
            .add_relation(Relation::new("base").attribute("x", "number").input())
            .unwrap();
        program
            .add_relation(Relation::new("q").attribute("s", "number").output())
            .unwrap();
        program.add_clause(Clause::rule(
            atom("p", vec![var("x")]),
            vec![lit(atom("base", vec![var("x")]))],
        ));
        program.add_clause(Clause::rule(
            atom("q", vec![var("s")]),
            vec![eq(
                var("s"),
                Argument::aggregate(
                    AggregateOp::Count,
                    None,
                    vec![lit(atom("p", vec![var("x")]))],
                ),
            )],
        ));
        let tu = reject(program);
        assert!(has_error(&tu, "Cannot inline relations that appear in aggregator"));
    }
}
