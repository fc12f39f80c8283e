/*!
Boolean-constraint removal.

Clauses containing a `false` constraint can never fire and are removed;
`true` constraints are elided. Aggregator bodies get the same treatment,
except an aggregator must keep a body: an emptied body becomes the trivially
true `1 = 1`, a false body becomes `0 = 1` so the aggregator contributes
nothing.
*/

use crate::ast::mapper::{self, ArgumentMapper};
use crate::ast::{Argument, Clause, ConstraintOp, Literal};
use crate::context::TranslationUnit;
use crate::transform::Transform;

#[derive(Default)]
pub struct RemoveBooleanConstraints;

fn trivial_body(holds: bool) -> Literal {
    let lhs = Argument::number(if holds { 1 } else { 0 });
    Literal::constraint(ConstraintOp::Eq, lhs, Argument::number(1))
}

struct CleanAggregates {
    changed: bool,
}

impl ArgumentMapper for CleanAggregates {
    fn map_argument(&mut self, arg: Argument) -> Argument {
        let arg = mapper::descend(arg, self);
        let Argument::Aggregate {
            op,
            target,
            body,
            loc,
        } = arg
        else {
            return arg;
        };

        let contains_false = body
            .iter()
            .any(|l| matches!(l, Literal::Bool { value: false, .. }));
        let contains_true = body
            .iter()
            .any(|l| matches!(l, Literal::Bool { value: true, .. }));
        if !contains_false && !contains_true {
            return Argument::Aggregate {
                op,
                target,
                body,
                loc,
            };
        }

        self.changed = true;
        let mut kept: Vec<Literal> = Vec::default();
        if !contains_false {
            kept.extend(
                body.into_iter()
                    .filter(|l| !matches!(l, Literal::Bool { .. })),
            );
        }

        if contains_false || kept.is_empty() {
            // a degenerate body keeps the aggregator well-formed:
            // `1 = 1` when trivially true, `0 = 1` when trivially false
            return Argument::Aggregate {
                op,
                target: Some(Box::new(Argument::number(1))),
                body: vec![trivial_body(!contains_false)],
                loc,
            };
        }

        Argument::Aggregate {
            op,
            target,
            body: kept,
            loc,
        }
    }
}

impl Transform for RemoveBooleanConstraints {
    fn name(&self) -> &'static str {
        "remove-boolean-constraints"
    }

    fn transform(&mut self, tu: &mut TranslationUnit) -> bool {
        let mut changed = false;

        for key in tu.program.clause_keys() {
            let mut clause: Clause = tu.program.clause(key).clone();

            let mut cleaner = CleanAggregates { changed: false };
            mapper::map_clause(&mut clause, &mut cleaner);
            let mut clause_changed = cleaner.changed;

            let contains_false = clause
                .body
                .iter()
                .any(|l| matches!(l, Literal::Bool { value: false, .. }));
            let contains_true = clause
                .body
                .iter()
                .any(|l| matches!(l, Literal::Bool { value: true, .. }));

            if contains_false {
                tu.program.remove_clause(key);
                changed = true;
                continue;
            }
            if contains_true {
                clause.body.retain(|l| !matches!(l, Literal::Bool { .. }));
                clause_changed = true;
            }

            if clause_changed {
                tu.program.replace_clause(key, clause);
                changed = true;
            }
        }
        changed
    }
}
