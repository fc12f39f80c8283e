use stoat_dl::analysis::ground::grounded_terms;
use stoat_dl::analysis::precedence::{
    redundant_relations, relation_schedule, topological_order, PrecedenceGraph, RecursiveClauses,
    SccGraph,
};
use stoat_dl::analysis::typing::{analyse_types, TypeEnv, TypeKind, TypeSet};
use stoat_dl::ast::builder::*;
use stoat_dl::ast::{Argument, BinaryOp, Clause, Program, Relation};

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

mod groundedness {
    use super::*;

    #[test]
    fn positive_atoms_ground_their_arguments() {
        let clause = Clause::rule(
            atom("q", vec![var("x")]),
            vec![lit(atom("r", vec![var("x")]))],
        );
        let grounded = grounded_terms(&clause);
        assert!(grounded.variable("x"));
    }

    #[test]
    fn negated_atoms_do_not() {
        let clause = Clause::rule(
            atom("q", vec![var("x")]),
            vec![neg(atom("r", vec![var("x")]))],
        );
        let grounded = grounded_terms(&clause);
        assert!(!grounded.variable("x"));
    }

    #[test]
    fn equality_to_a_functor_of_grounded_operands_grounds() {
        let clause = Clause::rule(
            atom("q", vec![var("x"), var("y")]),
            vec![
                lit(atom("r", vec![var("x")])),
                eq(var("y"), Argument::binary(BinaryOp::Add, var("x"), num(1))),
            ],
        );
        let grounded = grounded_terms(&clause);
        assert!(grounded.variable("x"));
        assert!(grounded.variable("y"));
    }

    #[test]
    fn a_record_grounds_its_fields_and_conversely() {
        let clause = Clause::rule(
            atom("q", vec![var("a"), var("b")]),
            vec![lit(atom("r", vec![rec(vec![var("a"), var("b")])]))],
        );
        let grounded = grounded_terms(&clause);
        // the record is a scanned argument, so its fields are grounded
        assert!(grounded.variable("a"));
        assert!(grounded.variable("b"));
    }

    #[test]
    fn aggregators_ground_their_result() {
        let clause = Clause::rule(
            atom("q", vec![var("s")]),
            vec![eq(
                var("s"),
                Argument::aggregate(
                    stoat_dl::ast::AggregateOp::Count,
                    None,
                    vec![lit(atom("r", vec![var("v")]))],
                ),
            )],
        );
        let grounded = grounded_terms(&clause);
        assert!(grounded.variable("s"));
    }
}

mod typing {
    use super::*;

    #[test]
    fn attribute_types_flow_into_variables() {
        let program = transitive_closure();
        let env = TypeEnv::build(&program);
        let key = program.clauses_of(&"path".into())[0];
        let solution = analyse_types(&env, program.clause(key), &program);

        // the head arguments are the first two occurrences of the walk
        assert_eq!(solution.occurrence(0), &TypeSet::single("number"));
        assert_eq!(solution.occurrence(1), &TypeSet::single("number"));
    }

    #[test]
    fn conflicting_attribute_kinds_empty_the_set() {
        let mut program = Program::new();
        program
            .add_relation(Relation::new("num").attribute("a", "number"))
            .unwrap();
        program
            .add_relation(Relation::new("sym").attribute("a", "symbol"))
            .unwrap();
        program
            .add_relation(Relation::new("q").attribute("a", "number"))
            .unwrap();
        let key = program
            .add_clause(Clause::rule(
                atom("q", vec![var("x")]),
                vec![
                    lit(atom("num", vec![var("x")])),
                    lit(atom("sym", vec![var("x")])),
                ],
            ))
            .unwrap();

        let env = TypeEnv::build(&program);
        let solution = analyse_types(&env, program.clause(key), &program);
        assert!(solution.occurrence(0).is_empty());
    }

    #[test]
    fn unions_meet_at_their_members() {
        let mut program = Program::new();
        program
            .add_type(stoat_dl::ast::TypeDecl::Primitive {
                name: "even".to_string(),
                kind: stoat_dl::ast::PrimitiveKind::Number,
                loc: Default::default(),
            })
            .unwrap();
        program
            .add_type(stoat_dl::ast::TypeDecl::Union {
                name: "int".to_string(),
                members: vec!["even".to_string()],
                loc: Default::default(),
            })
            .unwrap();
        let env = TypeEnv::build(&program);

        assert!(env.is_subtype("even", "int"));
        assert!(env.is_subtype("even", "number"));
        assert!(!env.is_subtype("number", "even"));
        assert_eq!(env.kind_of("int"), Some(TypeKind::Number));

        let met = env.meet_type(&TypeSet::single("int"), "even");
        assert_eq!(met, TypeSet::single("even"));
    }
}

mod precedence {
    use super::*;

    #[test]
    fn the_recursive_clause_is_detected() {
        let program = transitive_closure();
        let recursive = RecursiveClauses::compute(&program);
        let keys = program.clauses_of(&"path".into());
        assert!(!recursive.recursive(keys[0]));
        assert!(recursive.recursive(keys[1]));
    }

    #[test]
    fn the_recursive_scc_is_found() {
        let program = transitive_closure();
        let precedence = PrecedenceGraph::build(&program);
        let sccs = SccGraph::build(&precedence);

        assert!(sccs.is_recursive(&"path".into()));
        assert!(!sccs.is_recursive(&"edge".into()));
        assert!(!sccs.same_scc(&"path".into(), &"edge".into()));
    }

    #[test]
    fn the_order_computes_producers_first() {
        let program = transitive_closure();
        let precedence = PrecedenceGraph::build(&program);
        let sccs = SccGraph::build(&precedence);
        let order = topological_order(&sccs);
        assert_eq!(order.len(), 2);

        let edge_position = order
            .iter()
            .position(|&scc| sccs.scc_of(&"edge".into()) == Some(scc))
            .unwrap();
        let path_position = order
            .iter()
            .position(|&scc| sccs.scc_of(&"path".into()) == Some(scc))
            .unwrap();
        assert!(edge_position < path_position);
    }

    #[test]
    fn the_schedule_expires_a_relation_after_its_last_use() {
        let program = transitive_closure();
        let precedence = PrecedenceGraph::build(&program);
        let sccs = SccGraph::build(&precedence);
        let order = topological_order(&sccs);
        let schedule = relation_schedule(&program, &precedence, &sccs, &order);

        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule[0].computed, vec!["edge".into()]);
        assert!(schedule[0].expired.is_empty());
        assert_eq!(schedule[1].computed, vec!["path".into()]);
        // edge is last used computing path; path is an output and survives
        assert_eq!(schedule[1].expired, vec!["edge".into()]);
        assert!(schedule[1].recursive);
    }

    #[test]
    fn relations_off_the_output_cone_are_redundant() {
        let mut program = transitive_closure();
        program
            .add_relation(Relation::new("stray").attribute("x", "number"))
            .unwrap();

        let precedence = PrecedenceGraph::build(&program);
        let redundant = redundant_relations(&program, &precedence);
        assert!(redundant.contains(&"stray".into()));
        assert!(!redundant.contains(&"edge".into()));
        assert!(!redundant.contains(&"path".into()));
    }
}
