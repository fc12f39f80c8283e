/*!
The witness problem check.

A variable grounded only inside an aggregator must not leak into the
enclosing scope as if it were grounded there --- the aggregator folds its
body away, and no witness for the variable survives.

The check rebuilds each clause twice: once as-is, and once with every
aggregator replaced by a fresh, intrinsically grounded variable (with extra
grounding added for those variables and for everything grounded by the outer
scope). An argument grounded in the aggregator-free rendition but not in the
original is grounded purely by an aggregator's inner scope, and is reported.
Aggregator bodies are checked recursively the same way.
*/

use crate::analysis::ground::grounded_terms;
use crate::ast::mapper::{self, ArgumentMapper};
use crate::ast::visit::{visit_argument, visit_literal_arguments};
use crate::ast::{Argument, Atom, Clause, Literal, Program};
use crate::reports::{ErrorReport, SrcLocation};

pub(crate) fn check_witness_problem(report: &mut ErrorReport, program: &Program) {
    let mut fresh = 0usize;
    for key in program.clause_keys() {
        let clause = program.clause(key);

        // head variables join the scope as ungrounded terms
        let mut head_vars: Vec<Argument> = Vec::default();
        for arg in &clause.head.args {
            visit_argument(arg, &mut |nested| {
                if nested.is_variable() {
                    head_vars.push(nested.clone());
                }
            });
        }

        let mut literals = clause.body.clone();
        literals.push(Literal::negation(Atom::new("+head", head_vars)));

        check_literals(report, &literals, &[], &mut fresh);
    }
}

struct ReplaceAggregates<'a> {
    fresh: &'a mut usize,
    introduced: Vec<String>,
}

impl ArgumentMapper for ReplaceAggregates<'_> {
    fn map_argument(&mut self, arg: Argument) -> Argument {
        match arg {
            Argument::Aggregate { loc, .. } => {
                *self.fresh += 1;
                let name = format!("+wit{}", self.fresh);
                self.introduced.push(name.clone());
                Argument::Variable { name, loc }
            }
            other => mapper::descend(other, self),
        }
    }
}

fn check_literals(
    report: &mut ErrorReport,
    literals: &[Literal],
    grounded: &[Argument],
    fresh: &mut usize,
) {
    // the original scope
    let mut original = Clause::rule(Atom::new("+scope", Vec::default()), literals.to_vec());

    // the aggregator-free scope
    let mut replacer = ReplaceAggregates {
        fresh,
        introduced: Vec::default(),
    };
    let mut replaced_literals = literals.to_vec();
    for literal in replaced_literals.iter_mut() {
        mapper::map_literal(literal, &mut replacer);
    }
    let introduced = replacer.introduced;
    let mut aggregatorless =
        Clause::rule(Atom::new("+scope", Vec::default()), replaced_literals);

    // ground the introduced variables and everything the outer scope grounds
    let mut grounding_original = Atom::new("+grounding", Vec::default());
    let mut grounding_replaced = Atom::new("+grounding", Vec::default());
    for name in &introduced {
        grounding_replaced.args.push(Argument::var(name.clone()));
    }
    for arg in grounded {
        grounding_original.args.push(arg.clone());
        grounding_replaced.args.push(arg.clone());
    }
    original.body.push(Literal::Atom(grounding_original));
    aggregatorless.body.push(Literal::Atom(grounding_replaced));

    let original_grounded = grounded_terms(&original);
    let replaced_grounded = grounded_terms(&aggregatorless);

    // correlate occurrences of the two scopes
    let mut walker = DualWalk::default();
    for index in 0..literals.len() {
        walker.walk_literals(&original.body[index], &aggregatorless.body[index]);
    }
    for (index_original, index_replaced, loc) in walker.pairs {
        if !replaced_grounded.occurrence(index_replaced)
            && original_grounded.occurrence(index_original)
        {
            report.add_error(
                "Witness problem: argument grounded by an aggregator's inner scope is used ungrounded in outer scope",
                loc,
            );
        }
    }

    // inner scopes see everything of this scope as grounded
    let mut newly_grounded: Vec<Argument> = Vec::default();
    for literal in &aggregatorless.body {
        visit_literal_arguments(literal, &mut |arg| {
            if !newly_grounded.contains(arg) {
                newly_grounded.push(arg.clone());
            }
        });
    }

    for literal in literals {
        visit_literal_arguments(literal, &mut |arg| {
            if let Argument::Aggregate { body, .. } = arg {
                check_literals(report, body, &newly_grounded, fresh);
            }
        });
    }
}

// Walks two structurally equal literal lists --- up to aggregators on the
// left matching fresh variables on the right --- pairing occurrence indices.
#[derive(Default)]
struct DualWalk {
    left: usize,
    right: usize,
    pairs: Vec<(usize, usize, SrcLocation)>,
}

fn subtree_size(arg: &Argument) -> usize {
    let mut size = 0;
    visit_argument(arg, &mut |_| size += 1);
    size
}

impl DualWalk {
    fn walk_literals(&mut self, left: &Literal, right: &Literal) {
        match (left, right) {
            (Literal::Atom(a), Literal::Atom(b))
            | (Literal::Negation { atom: a, .. }, Literal::Negation { atom: b, .. }) => {
                for (l, r) in a.args.iter().zip(b.args.iter()) {
                    self.walk_args(l, r);
                }
            }
            (
                Literal::Constraint {
                    lhs: al, rhs: ar, ..
                },
                Literal::Constraint {
                    lhs: bl, rhs: br, ..
                },
            ) => {
                self.walk_args(al, bl);
                self.walk_args(ar, br);
            }
            _ => {}
        }
    }

    fn walk_args(&mut self, left: &Argument, right: &Argument) {
        self.pairs
            .push((self.left, self.right, left.loc().clone()));
        self.left += 1;
        self.right += 1;

        if let (Argument::Aggregate { .. }, Argument::Variable { .. }) = (left, right) {
            // the aggregator's subtree has no counterpart on the right
            self.left += subtree_size(left) - 1;
            return;
        }

        match (left, right) {
            (Argument::Unary { arg: a, .. }, Argument::Unary { arg: b, .. }) => {
                self.walk_args(a, b);
            }
            (
                Argument::Binary {
                    lhs: al, rhs: ar, ..
                },
                Argument::Binary {
                    lhs: bl, rhs: br, ..
                },
            ) => {
                self.walk_args(al, bl);
                self.walk_args(ar, br);
            }
            (
                Argument::Ternary {
                    first: a0,
                    second: a1,
                    third: a2,
                    ..
                },
                Argument::Ternary {
                    first: b0,
                    second: b1,
                    third: b2,
                    ..
                },
            ) => {
                self.walk_args(a0, b0);
                self.walk_args(a1, b1);
                self.walk_args(a2, b2);
            }
            (Argument::Record { args: a, .. }, Argument::Record { args: b, .. }) => {
                for (l, r) in a.iter().zip(b.iter()) {
                    self.walk_args(l, r);
                }
            }
            _ => {}
        }
    }
}
