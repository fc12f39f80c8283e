use stoat_dl::ast::builder::*;
use stoat_dl::ast::mapper::{self, ArgumentMapper, VariableRenamer};
use stoat_dl::ast::symbol::SymbolTable;
use stoat_dl::ast::{Argument, Clause, Program, Relation};
use stoat_dl::context::TranslationUnit;

mod display {
    use super::*;

    #[test]
    fn clauses_render_in_source_syntax() {
        let clause = Clause::rule(
            atom("path", vec![var("x"), var("y")]),
            vec![
                lit(atom("path", vec![var("x"), var("z")])),
                lit(atom("edge", vec![var("z"), var("y")])),
            ],
        );
        assert_eq!(format!("{clause}"), "path(x,y) :- path(x,z), edge(z,y).");
    }

    #[test]
    fn facts_render_without_a_body() {
        let fact = Clause::fact(atom("edge", vec![num(1), num(2)]));
        assert_eq!(format!("{fact}"), "edge(1,2).");
    }

    #[test]
    fn negation_and_constraints_render() {
        let clause = Clause::rule(
            atom("unreachable", vec![var("x")]),
            vec![
                lit(atom("node", vec![var("x")])),
                neg(atom("reachable", vec![var("x")])),
                cmp(stoat_dl::ast::ConstraintOp::Lt, var("x"), num(10)),
            ],
        );
        assert_eq!(
            format!("{clause}"),
            "unreachable(x) :- node(x), !reachable(x), x < 10."
        );
    }
}

mod equality {
    use super::*;

    #[test]
    fn locations_do_not_take_part() {
        let mut with_loc = var("x");
        if let Argument::Variable { loc, .. } = &mut with_loc {
            loc.line = 3;
            loc.column = 7;
        }
        assert_eq!(with_loc, var("x"));
        assert_ne!(var("x"), var("y"));
    }

    #[test]
    fn records_compare_structurally() {
        assert_eq!(
            rec(vec![var("x"), num(1)]),
            rec(vec![var("x"), num(1)])
        );
        assert_ne!(rec(vec![var("x")]), rec(vec![var("x"), num(1)]));
    }
}

mod mapping {
    use super::*;

    #[test]
    fn renaming_descends_into_records_and_aggregates() {
        let mut clause = Clause::rule(
            atom("q", vec![rec(vec![var("x"), var("y")])]),
            vec![eq(
                var("s"),
                Argument::aggregate(
                    stoat_dl::ast::AggregateOp::Sum,
                    Some(var("x")),
                    vec![lit(atom("r", vec![var("x")]))],
                ),
            )],
        );

        let mut renamer = VariableRenamer(|name: &str| match name {
            "x" => Some("renamed".to_string()),
            _ => None,
        });
        mapper::map_clause(&mut clause, &mut renamer);

        assert_eq!(
            clause.head.args[0],
            rec(vec![var("renamed"), var("y")])
        );
        let rendered = format!("{clause}");
        assert!(rendered.contains("sum renamed"));
        assert!(rendered.contains("r(renamed)"));
    }

    #[test]
    fn a_mapper_replaces_whole_terms() {
        struct ConstantFold;
        impl ArgumentMapper for ConstantFold {
            fn map_argument(&mut self, arg: Argument) -> Argument {
                match arg {
                    Argument::Binary { .. } => num(42),
                    other => mapper::descend(other, self),
                }
            }
        }

        let folded = ConstantFold.map_argument(Argument::binary(
            stoat_dl::ast::BinaryOp::Add,
            num(40),
            num(2),
        ));
        assert_eq!(folded, num(42));
    }
}

mod program_db {
    use super::*;

    #[test]
    fn clauses_bind_to_their_relations() {
        let mut program = Program::new();
        program
            .add_relation(Relation::new("edge").attribute("x", "number").attribute("y", "number"))
            .unwrap();

        let key = program
            .add_clause(Clause::fact(atom("edge", vec![num(1), num(2)])))
            .expect("the relation exists");
        assert_eq!(program.clauses_of(&"edge".into()), vec![key]);

        program.remove_clause(key);
        assert!(program.clauses_of(&"edge".into()).is_empty());
    }

    #[test]
    fn unbindable_clauses_are_kept_as_orphans() {
        let mut program = Program::new();
        assert!(program
            .add_clause(Clause::fact(atom("missing", vec![])))
            .is_none());
        assert_eq!(program.orphan_clauses().len(), 1);
    }

    #[test]
    fn removing_a_relation_removes_its_clauses() {
        let mut program = Program::new();
        program
            .add_relation(Relation::new("edge").attribute("x", "number").attribute("y", "number"))
            .unwrap();
        program.add_clause(Clause::fact(atom("edge", vec![num(1), num(2)])));
        assert_eq!(program.clause_count(), 1);

        program.remove_relation(&"edge".into());
        assert_eq!(program.clause_count(), 0);
    }

    #[test]
    fn duplicate_relations_are_rejected() {
        let mut program = Program::new();
        program.add_relation(Relation::new("r")).unwrap();
        assert!(program.add_relation(Relation::new("r")).is_err());
    }
}

mod serialization {
    use super::*;

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

    #[test]
    fn a_translation_unit_round_trips_through_json() {
        let tu = TranslationUnit::new(transitive_closure());
        tu.symbols.intern("hello");

        let serialized = serde_json::to_string(&tu).expect("the unit serializes");
        let recovered: TranslationUnit =
            serde_json::from_str(&serialized).expect("the unit deserializes");

        assert_eq!(recovered.program, tu.program);
        assert_eq!(recovered.symbols.lookup("hello"), Some(0));
    }
}

mod symbols {
    use super::*;

    #[test]
    fn interning_is_index_stable() {
        let table = SymbolTable::new();
        let hello = table.intern("hello");
        let world = table.intern("world");
        assert_ne!(hello, world);
        assert_eq!(table.intern("hello"), hello);
        assert_eq!(table.resolve(world), Some("world".to_string()));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn clones_carry_the_pool() {
        let table = SymbolTable::new();
        table.intern("a");
        table.intern("b");
        let clone = table.clone();
        assert_eq!(clone.lookup("b"), Some(1));
    }
}
