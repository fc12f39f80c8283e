use stoat_dl::ast::builder::*;
use stoat_dl::ast::{Clause, Literal, Program, Relation};
use stoat_dl::config::Config;
use stoat_dl::context::{Compiler, TranslationUnit};
use stoat_dl::transform::{NormalizeConstraints, Transform};

fn reachability() -> Program {
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
            Relation::new("reach")
                .attribute("x", "number")
                .attribute("y", "number")
                .output(),
        )
        .unwrap();
    program.add_clause(Clause::rule(
        atom("reach", vec![var("x"), var("y")]),
        vec![lit(atom("edge", vec![var("x"), var("y")]))],
    ));
    program.add_clause(Clause::rule(
        atom("reach", vec![var("x"), var("y")]),
        vec![
            lit(atom("edge", vec![var("x"), var("z")])),
            lit(atom("reach", vec![var("z"), var("y")])),
        ],
    ));
    program
}

fn magic_config() -> Config {
    let mut config = Config::default();
    config.magic_transform.set_from_cli(true);
    config
}

mod normalization {
    use super::*;

    #[test]
    fn constants_in_body_atoms_become_bound_variables() {
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
            .add_relation(Relation::new("q").attribute("y", "number").output())
            .unwrap();
        let key = program
            .add_clause(Clause::rule(
                atom("q", vec![var("y")]),
                vec![lit(atom("edge", vec![num(1), var("y")]))],
            ))
            .unwrap();

        let mut tu = TranslationUnit::new(program);
        assert!(NormalizeConstraints::default().transform(&mut tu));

        let rewritten = tu.program.clause(key);
        assert_eq!(rewritten.body_atoms()[0].args[0], var("+bind1"));
        assert!(rewritten.body.iter().any(|literal| matches!(
            literal,
            Literal::Constraint { lhs, rhs, .. }
                if **lhs == var("+bind1") && **rhs == num(1)
        )));

        // facts and a second application stay untouched
        assert!(!NormalizeConstraints::default().transform(&mut tu));
    }
}

mod demand {
    use super::*;

    #[test]
    fn the_reachability_query_is_adorned_and_guarded() {
        let mut tu = TranslationUnit::new(reachability());
        let mut compiler = Compiler::new(magic_config());
        compiler.rewrite(&mut tu).expect("the program is well-formed");

        // the bound-first adornment of reach materialized
        let adorned = tu
            .program
            .relation(&"+reach_bf".into())
            .expect("reach^bf exists");
        assert_eq!(adorned.arity(), 2);

        // its magic relation carries the bound column
        let magic = tu
            .program
            .relation(&"+m0_reach_bf".into())
            .expect("the magic version of reach^bf exists");
        assert_eq!(magic.arity(), 1);

        // the all-free seed is a nullary fact
        let seed = tu.program.clauses_of(&"+m0_reach_ff".into());
        assert_eq!(seed.len(), 1);
        assert!(tu.program.clause(seed[0]).is_fact());

        // every clause of the query is guarded by its magic predicate
        for key in tu.program.clauses_of(&"reach".into()) {
            let clause = tu.program.clause(key);
            let Some(Literal::Atom(guard)) = clause.body.first() else {
                panic!("the rewritten clause leads with its guard");
            };
            assert_eq!(guard.name, "+m0_reach_ff".into());
        }

        // and so is every clause of the adorned predicate
        for key in tu.program.clauses_of(&"+reach_bf".into()) {
            let clause = tu.program.clause(key);
            let Some(Literal::Atom(guard)) = clause.body.first() else {
                panic!("the rewritten clause leads with its guard");
            };
            assert_eq!(guard.name, "+m0_reach_bf".into());
        }

        // magic rules seed demand from context: one from the query's
        // recursive clause, one from reach^bf's own
        let magic_rules = tu.program.clauses_of(&"+m0_reach_bf".into());
        assert_eq!(magic_rules.len(), 2);
        for key in magic_rules {
            let clause = tu.program.clause(key);
            assert_eq!(clause.head.args.len(), 1);
            assert!(clause
                .body
                .iter()
                .any(|literal| matches!(literal, Literal::Atom(atom) if atom.name == "edge".into())));
        }
    }

    #[test]
    fn the_guarded_program_still_lowers() {
        let mut tu = TranslationUnit::new(reachability());
        let mut compiler = Compiler::new(magic_config());
        let ram = compiler
            .run(&mut tu)
            .expect("the program is well-formed")
            .expect("the program computes something");

        let rendered = format!("{ram}");
        assert!(rendered.contains("+m0_reach_bf"));
        assert!(rendered.contains("STORE DATA FOR reach"));
    }

    #[test]
    fn programs_without_outputs_are_left_alone() {
        let mut program = Program::new();
        program
            .add_relation(Relation::new("edge").attribute("x", "number").input())
            .unwrap();
        program
            .add_relation(Relation::new("p").attribute("x", "number"))
            .unwrap();
        program.add_clause(Clause::rule(
            atom("p", vec![var("x")]),
            vec![lit(atom("edge", vec![var("x")]))],
        ));

        let mut tu = TranslationUnit::new(program);
        let mut compiler = Compiler::new(magic_config());
        compiler.rewrite(&mut tu).expect("the program is well-formed");
        assert!(tu.program.relation(&"+m0_p_f".into()).is_none());
    }
}
