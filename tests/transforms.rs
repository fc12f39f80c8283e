use stoat_dl::ast::builder::*;
use stoat_dl::ast::{
    AggregateOp, Argument, Clause, ConstraintOp, Literal, Program, Relation,
};
use stoat_dl::config::Config;
use stoat_dl::context::{Compiler, TranslationUnit};
use stoat_dl::transform::{
    ExtractDisconnectedLiterals, MaterializeAggregationQueries, RemoveBooleanConstraints,
    RemoveRelationCopies, ResolveAliases, Transform,
};

fn unit(program: Program) -> TranslationUnit {
    TranslationUnit::new(program)
}

mod aliases {
    use super::*;

    #[test]
    fn equalities_substitute_into_the_clause() {
        // q(x,x) :- r(x,y), y = x.   becomes   q(x,x) :- r(x,x).
        let mut program = Program::new();
        program
            .add_relation(
                Relation::new("q")
                    .attribute("a", "number")
                    .attribute("b", "number"),
            )
            .unwrap();
        program
            .add_relation(
                Relation::new("r")
                    .attribute("a", "number")
                    .attribute("b", "number"),
            )
            .unwrap();
        let key = program
            .add_clause(Clause::rule(
                atom("q", vec![var("x"), var("x")]),
                vec![
                    lit(atom("r", vec![var("x"), var("y")])),
                    eq(var("y"), var("x")),
                ],
            ))
            .unwrap();

        let mut tu = unit(program);
        assert!(ResolveAliases::default().transform(&mut tu));

        let resolved = tu.program.clause(key);
        assert_eq!(
            resolved,
            &Clause::rule(
                atom("q", vec![var("x"), var("x")]),
                vec![lit(atom("r", vec![var("x"), var("x")]))],
            )
        );
    }

    #[test]
    fn functor_terms_leave_atom_argument_slots() {
        let mut program = Program::new();
        program
            .add_relation(Relation::new("p").attribute("a", "number"))
            .unwrap();
        program
            .add_relation(Relation::new("q").attribute("a", "number"))
            .unwrap();
        program
            .add_relation(Relation::new("r").attribute("a", "number"))
            .unwrap();
        let key = program
            .add_clause(Clause::rule(
                atom("p", vec![var("y")]),
                vec![
                    lit(atom("q", vec![var("y")])),
                    lit(atom("r", vec![Argument::binary(
                        stoat_dl::ast::BinaryOp::Add,
                        var("y"),
                        num(1),
                    )])),
                ],
            ))
            .unwrap();

        let mut tu = unit(program);
        assert!(ResolveAliases::default().transform(&mut tu));

        let resolved = tu.program.clause(key);
        // the functor moved into a constraint over a temporary
        assert_eq!(resolved.body_atoms()[1].args[0], var("+tmp_0"));
        assert!(resolved.body.iter().any(|literal| matches!(
            literal,
            Literal::Constraint { op: ConstraintOp::Eq, lhs, .. }
                if **lhs == var("+tmp_0")
        )));
    }

    #[test]
    fn resolution_is_idempotent() {
        let mut program = Program::new();
        program
            .add_relation(
                Relation::new("q")
                    .attribute("a", "number")
                    .attribute("b", "number"),
            )
            .unwrap();
        program
            .add_relation(
                Relation::new("r")
                    .attribute("a", "number")
                    .attribute("b", "number"),
            )
            .unwrap();
        program.add_clause(Clause::rule(
            atom("q", vec![var("x"), var("x")]),
            vec![
                lit(atom("r", vec![var("x"), var("y")])),
                eq(var("y"), var("x")),
            ],
        ));

        let mut tu = unit(program);
        ResolveAliases::default().transform(&mut tu);
        assert!(!ResolveAliases::default().transform(&mut tu));
    }
}

mod copies {
    use super::*;

    #[test]
    fn single_clause_projections_collapse() {
        let mut program = Program::new();
        for name in ["r", "s"] {
            program
                .add_relation(
                    Relation::new(name)
                        .attribute("a", "number")
                        .attribute("b", "number"),
                )
                .unwrap();
        }
        program
            .add_relation(Relation::new("out").attribute("a", "number").output())
            .unwrap();
        program.add_clause(Clause::rule(
            atom("r", vec![var("x"), var("y")]),
            vec![lit(atom("s", vec![var("x"), var("y")]))],
        ));
        let use_key = program
            .add_clause(Clause::rule(
                atom("out", vec![var("x")]),
                vec![lit(atom("r", vec![var("x"), var("x")]))],
            ))
            .unwrap();

        let mut tu = unit(program);
        assert!(RemoveRelationCopies::default().transform(&mut tu));

        assert!(tu.program.relation(&"r".into()).is_none());
        assert_eq!(tu.program.clause(use_key).body_atoms()[0].name, "s".into());
    }

    #[test]
    fn computed_relations_are_not_aliases() {
        let mut program = Program::new();
        for name in ["r", "s"] {
            program
                .add_relation(
                    Relation::new(name)
                        .attribute("a", "number")
                        .attribute("b", "number"),
                )
                .unwrap();
        }
        let mut relation = Relation::new("keep")
            .attribute("a", "number")
            .attribute("b", "number");
        relation.flags.output = true;
        program.add_relation(relation).unwrap();
        program.add_clause(Clause::rule(
            atom("keep", vec![var("x"), var("y")]),
            vec![lit(atom("s", vec![var("x"), var("y")]))],
        ));

        let mut tu = unit(program);
        assert!(!RemoveRelationCopies::default().transform(&mut tu));
        assert!(tu.program.relation(&"keep".into()).is_some());
    }
}

mod booleans {
    use super::*;

    #[test]
    fn false_bodies_vanish_and_true_literals_are_elided() {
        let mut program = Program::new();
        program
            .add_relation(Relation::new("q").attribute("a", "number"))
            .unwrap();
        program
            .add_relation(Relation::new("r").attribute("a", "number"))
            .unwrap();
        let failing = program
            .add_clause(Clause::rule(
                atom("q", vec![var("x")]),
                vec![lit(atom("r", vec![var("x")])), Literal::boolean(false)],
            ))
            .unwrap();
        let trimmed = program
            .add_clause(Clause::rule(
                atom("q", vec![var("x")]),
                vec![lit(atom("r", vec![var("x")])), Literal::boolean(true)],
            ))
            .unwrap();

        let mut tu = unit(program);
        assert!(RemoveBooleanConstraints::default().transform(&mut tu));

        assert_eq!(tu.program.clauses_of(&"q".into()), vec![trimmed]);
        let _ = failing;
        assert_eq!(
            tu.program.clause(trimmed).body,
            vec![lit(atom("r", vec![var("x")]))]
        );
    }
}

mod disconnected {
    use super::*;

    #[test]
    fn literals_disjoint_from_the_head_are_extracted() {
        // a(x) :- b(x), c(y), d(y).
        let mut program = Program::new();
        for name in ["a", "b", "c", "d"] {
            program
                .add_relation(Relation::new(name).attribute("v", "number"))
                .unwrap();
        }
        let key = program
            .add_clause(Clause::rule(
                atom("a", vec![var("x")]),
                vec![
                    lit(atom("b", vec![var("x")])),
                    lit(atom("c", vec![var("y")])),
                    lit(atom("d", vec![var("y")])),
                ],
            ))
            .unwrap();

        let mut tu = unit(program);
        assert!(ExtractDisconnectedLiterals::default().transform(&mut tu));

        let rewritten = tu.program.clause(key);
        assert_eq!(rewritten.body.len(), 2);
        assert_eq!(rewritten.body[0], lit(atom("b", vec![var("x")])));
        assert_eq!(
            rewritten.body[1],
            lit(atom("+disconnected0", Vec::default()))
        );

        let extracted = tu.program.clauses_of(&"+disconnected0".into());
        assert_eq!(extracted.len(), 1);
        assert_eq!(
            tu.program.clause(extracted[0]).body,
            vec![
                lit(atom("c", vec![var("y")])),
                lit(atom("d", vec![var("y")])),
            ]
        );
    }
}

mod materialization {
    use super::*;

    #[test]
    fn complex_aggregator_bodies_become_relations() {
        // total(c,s) :- category(c), s = sum v : { item(c,v), v > 0 }.
        let mut program = Program::new();
        program
            .add_relation(
                Relation::new("total")
                    .attribute("c", "symbol")
                    .attribute("s", "number")
                    .output(),
            )
            .unwrap();
        program
            .add_relation(Relation::new("category").attribute("c", "symbol").input())
            .unwrap();
        program
            .add_relation(
                Relation::new("item")
                    .attribute("c", "symbol")
                    .attribute("v", "number")
                    .input(),
            )
            .unwrap();
        let key = program
            .add_clause(Clause::rule(
                atom("total", vec![var("c"), var("s")]),
                vec![
                    lit(atom("category", vec![var("c")])),
                    eq(
                        var("s"),
                        Argument::aggregate(
                            AggregateOp::Sum,
                            Some(var("v")),
                            vec![
                                lit(atom("item", vec![var("c"), var("v")])),
                                cmp(ConstraintOp::Gt, var("v"), num(0)),
                            ],
                        ),
                    ),
                ],
            ))
            .unwrap();

        let mut tu = unit(program);
        assert!(MaterializeAggregationQueries::default().transform(&mut tu));

        // the synthesized relation holds the aggregator's variables, typed
        // by the analysis
        let synthesized = tu
            .program
            .relation(&"+agg_0".into())
            .expect("a relation was synthesized");
        assert_eq!(synthesized.arity(), 2);
        assert_eq!(synthesized.attributes[0].name, "c");
        assert_eq!(synthesized.attributes[0].type_name, "symbol");
        assert_eq!(synthesized.attributes[1].name, "v");
        assert_eq!(synthesized.attributes[1].type_name, "number");

        let defining = tu.program.clauses_of(&"+agg_0".into());
        assert_eq!(defining.len(), 1);
        assert_eq!(
            tu.program.clause(defining[0]).body,
            vec![
                lit(atom("item", vec![var("c"), var("v")])),
                cmp(ConstraintOp::Gt, var("v"), num(0)),
            ]
        );

        // the aggregator body is now the single synthesized atom
        let rewritten = tu.program.clause(key);
        let Literal::Constraint { rhs, .. } = &rewritten.body[1] else {
            panic!("the equality remains");
        };
        let Argument::Aggregate { body, .. } = &**rhs else {
            panic!("the aggregate remains");
        };
        assert_eq!(body, &vec![lit(atom("+agg_0", vec![var("c"), var("v")]))]);

        // a second application is a no-op
        assert!(!MaterializeAggregationQueries::default().transform(&mut tu));
    }
}

mod inlining {
    use super::*;

    #[test]
    fn negated_inlined_atoms_expand_by_de_morgan() {
        // p inline;  p(x) :- a(x).  p(x) :- b(x).
        // q(x) :- c(x), !p(x).   becomes   q(x) :- c(x), !a(x), !b(x).
        let mut program = Program::new();
        for name in ["a", "b", "c"] {
            program
                .add_relation(Relation::new(name).attribute("v", "number").input())
                .unwrap();
        }
        program
            .add_relation(Relation::new("p").attribute("v", "number").inline())
            .unwrap();
        program
            .add_relation(Relation::new("q").attribute("v", "number").output())
            .unwrap();
        program.add_clause(Clause::rule(
            atom("p", vec![var("x")]),
            vec![lit(atom("a", vec![var("x")]))],
        ));
        program.add_clause(Clause::rule(
            atom("p", vec![var("x")]),
            vec![lit(atom("b", vec![var("x")]))],
        ));
        program.add_clause(Clause::rule(
            atom("q", vec![var("x")]),
            vec![lit(atom("c", vec![var("x")])), neg(atom("p", vec![var("x")]))],
        ));

        let mut tu = unit(program);
        let mut compiler = Compiler::new(Config::default());
        compiler.rewrite(&mut tu).expect("the program is well-formed");

        assert!(tu.program.relation(&"p".into()).is_none());
        let clauses = tu.program.clauses_of(&"q".into());
        assert_eq!(clauses.len(), 1);
        assert_eq!(
            tu.program.clause(clauses[0]),
            &Clause::rule(
                atom("q", vec![var("x")]),
                vec![
                    lit(atom("c", vec![var("x")])),
                    neg(atom("a", vec![var("x")])),
                    neg(atom("b", vec![var("x")])),
                ],
            )
        );
    }

    #[test]
    fn positive_inlined_atoms_expand_disjunctively() {
        let mut program = Program::new();
        for name in ["a", "b"] {
            program
                .add_relation(Relation::new(name).attribute("v", "number").input())
                .unwrap();
        }
        program
            .add_relation(Relation::new("p").attribute("v", "number").inline())
            .unwrap();
        program
            .add_relation(Relation::new("q").attribute("v", "number").output())
            .unwrap();
        program.add_clause(Clause::rule(
            atom("p", vec![var("x")]),
            vec![lit(atom("a", vec![var("x")]))],
        ));
        program.add_clause(Clause::rule(
            atom("p", vec![var("x")]),
            vec![lit(atom("b", vec![var("x")]))],
        ));
        program.add_clause(Clause::rule(
            atom("q", vec![var("x")]),
            vec![lit(atom("p", vec![var("x")]))],
        ));

        let mut tu = unit(program);
        let mut compiler = Compiler::new(Config::default());
        compiler.rewrite(&mut tu).expect("the program is well-formed");

        // one alternative clause per rule of p
        let clauses = tu.program.clauses_of(&"q".into());
        assert_eq!(clauses.len(), 2);
        let bodies: Vec<_> = clauses
            .iter()
            .map(|&key| tu.program.clause(key).body.clone())
            .collect();
        assert!(bodies.contains(&vec![lit(atom("a", vec![var("x")]))]));
        assert!(bodies.contains(&vec![lit(atom("b", vec![var("x")]))]));
    }
}

mod stability {
    use super::*;

    #[test]
    fn the_pipeline_reaches_a_fixpoint_in_one_round() {
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
        program
            .add_relation(Relation::new("count_of").attribute("n", "number").output())
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
        program.add_clause(Clause::rule(
            atom("count_of", vec![var("n")]),
            vec![eq(
                var("n"),
                Argument::aggregate(
                    AggregateOp::Count,
                    None,
                    vec![
                        lit(atom("path", vec![var("a"), var("b")])),
                        cmp(ConstraintOp::Lt, var("a"), var("b")),
                    ],
                ),
            )],
        ));

        let mut tu = unit(program);
        let mut compiler = Compiler::new(Config::default());
        compiler.rewrite(&mut tu).expect("the program is well-formed");
        let after_first = tu.program.clone();

        let mut again = Compiler::new(Config::default());
        again.rewrite(&mut tu).expect("the program stays well-formed");
        assert_eq!(tu.program, after_first);
    }
}
