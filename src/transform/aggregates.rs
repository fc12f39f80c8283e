/*!
The two aggregation transforms.

[UniqueAggregationVariables] renames target-expression variables that are
also free in an aggregator's body, appending the aggregator's visitation
index, so no two nested aggregators share a target variable.

[MaterializeAggregationQueries] gives every complex aggregator a single-atom
body: an aggregator whose body holds more than one literal, a non-atom
literal, or an atom with repeated variables is replaced by a synthesized
relation defined by the original body, and the aggregator's body becomes a
single atom over it with locally-bound variables replaced by `_`. Attribute
types of the synthesized relation come from the type analysis. For `count`,
unnamed variables of the original body become fresh head columns so tuples
stay distinct.
*/

use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::typing::{self, TypeEnv, TypeKind};
use crate::ast::mapper::{map_literal, ArgumentMapper, VariableRenamer};
use crate::ast::visit::{visit_argument, visit_clause_arguments, visit_variables};
use crate::ast::{
    AggregateOp, Argument, Atom, Clause, Literal, Program, Relation, RelationName,
};
use crate::context::TranslationUnit;
use crate::transform::Transform;

// Post-order walk over the aggregators of an argument, innermost first.
fn walk_aggregates_mut(arg: &mut Argument, f: &mut impl FnMut(&mut Argument)) {
    match arg {
        Argument::Unary { arg, .. } => walk_aggregates_mut(arg, f),
        Argument::Binary { lhs, rhs, .. } => {
            walk_aggregates_mut(lhs, f);
            walk_aggregates_mut(rhs, f);
        }
        Argument::Ternary {
            first,
            second,
            third,
            ..
        } => {
            walk_aggregates_mut(first, f);
            walk_aggregates_mut(second, f);
            walk_aggregates_mut(third, f);
        }
        Argument::Record { args, .. } => {
            for arg in args {
                walk_aggregates_mut(arg, f);
            }
        }
        Argument::Aggregate { target, body, .. } => {
            if let Some(target) = target {
                walk_aggregates_mut(target, f);
            }
            for literal in body {
                walk_literal_aggregates_mut(literal, f);
            }
            f(arg);
        }
        _ => {}
    }
}

fn walk_literal_aggregates_mut(literal: &mut Literal, f: &mut impl FnMut(&mut Argument)) {
    match literal {
        Literal::Atom(atom) | Literal::Negation { atom, .. } => {
            for arg in atom.args.iter_mut() {
                walk_aggregates_mut(arg, f);
            }
        }
        Literal::Constraint { lhs, rhs, .. } => {
            walk_aggregates_mut(lhs, f);
            walk_aggregates_mut(rhs, f);
        }
        Literal::Bool { .. } => {}
    }
}

fn walk_clause_aggregates_mut(clause: &mut Clause, f: &mut impl FnMut(&mut Argument)) {
    for arg in clause.head.args.iter_mut() {
        walk_aggregates_mut(arg, f);
    }
    for literal in clause.body.iter_mut() {
        walk_literal_aggregates_mut(literal, f);
    }
}

/// Makes target-expression variables unique across aggregators.
#[derive(Default)]
pub struct UniqueAggregationVariables {
    visitation: usize,
}

impl Transform for UniqueAggregationVariables {
    fn name(&self) -> &'static str {
        "unique-aggregation-variables"
    }

    fn transform(&mut self, tu: &mut TranslationUnit) -> bool {
        let mut changed = false;
        for key in tu.program.clause_keys() {
            let mut clause = tu.program.clause(key).clone();
            let mut clause_changed = false;

            walk_clause_aggregates_mut(&mut clause, &mut |agg| {
                let Argument::Aggregate {
                    target: Some(target),
                    body,
                    ..
                } = agg
                else {
                    return;
                };

                let mut names = BTreeSet::default();
                visit_variables(target, &mut |name, _| {
                    // already-uniqued names stay put, keeping the pass stable
                    if !name.starts_with("+agg") {
                        names.insert(name.to_string());
                    }
                });
                if names.is_empty() {
                    return;
                }

                let index = self.visitation;
                self.visitation += 1;

                let mut renamer = VariableRenamer(|name: &str| {
                    names
                        .contains(name)
                        .then(|| format!("+agg{index}_{name}"))
                });
                let taken = std::mem::replace(&mut **target, Argument::unnamed());
                **target = renamer.map_argument(taken);
                for literal in body.iter_mut() {
                    map_literal(literal, &mut renamer);
                }
                clause_changed = true;
            });

            if clause_changed {
                tu.program.replace_clause(key, clause);
                changed = true;
            }
        }
        changed
    }
}

/// Rewrites complex aggregator bodies into single atoms over synthesized
/// relations.
#[derive(Default)]
pub struct MaterializeAggregationQueries {
    counter: usize,
}

struct Materialization {
    original: Argument,
    replacement: Argument,
    relation: Relation,
    defining_clause: Clause,
}

fn needs_materialization(body: &[Literal]) -> bool {
    if body.len() != 1 {
        return true;
    }
    let Literal::Atom(atom) = &body[0] else {
        return true;
    };
    // repeated variables force a materialization
    let mut seen = BTreeSet::default();
    let mut duplicates = false;
    for arg in &atom.args {
        visit_variables(arg, &mut |name, _| {
            duplicates |= !seen.insert(name.to_string());
        });
    }
    duplicates
}

// Occurrences relevant for locality: everything outside aggregators, plus
// aggregator target expressions.
fn outer_variable_counts(clause: &Clause) -> BTreeMap<String, usize> {
    fn count_argument(arg: &Argument, counts: &mut BTreeMap<String, usize>) {
        match arg {
            Argument::Variable { name, .. } => {
                *counts.entry(name.clone()).or_default() += 1;
            }
            Argument::Aggregate { target, .. } => {
                if let Some(target) = target {
                    visit_variables(target, &mut |name, _| {
                        *counts.entry(name.to_string()).or_default() += 1;
                    });
                }
            }
            Argument::Unary { arg, .. } => count_argument(arg, counts),
            Argument::Binary { lhs, rhs, .. } => {
                count_argument(lhs, counts);
                count_argument(rhs, counts);
            }
            Argument::Ternary {
                first,
                second,
                third,
                ..
            } => {
                count_argument(first, counts);
                count_argument(second, counts);
                count_argument(third, counts);
            }
            Argument::Record { args, .. } => {
                for arg in args {
                    count_argument(arg, counts);
                }
            }
            _ => {}
        }
    }

    let mut counts = BTreeMap::default();
    for arg in &clause.head.args {
        count_argument(arg, &mut counts);
    }
    for literal in &clause.body {
        match literal {
            Literal::Atom(atom) | Literal::Negation { atom, .. } => {
                for arg in &atom.args {
                    count_argument(arg, &mut counts);
                }
            }
            Literal::Constraint { lhs, rhs, .. } => {
                count_argument(lhs, &mut counts);
                count_argument(rhs, &mut counts);
            }
            Literal::Bool { .. } => {}
        }
    }
    counts
}

impl MaterializeAggregationQueries {
    fn fresh_relation_name(&mut self, program: &Program) -> RelationName {
        loop {
            let candidate = RelationName::new(format!("+agg_{}", self.counter));
            self.counter += 1;
            if program.relation(&candidate).is_none() {
                return candidate;
            }
        }
    }

    fn build(
        &mut self,
        clause: &Clause,
        original: &Argument,
        program: &Program,
        env: &TypeEnv,
    ) -> Materialization {
        let Argument::Aggregate {
            op, target, body, loc,
        } = original
        else {
            unreachable!("candidates are aggregates");
        };

        let name = self.fresh_relation_name(program);

        // every variable of the aggregator becomes a head column
        let mut vars: BTreeSet<String> = BTreeSet::default();
        visit_argument(original, &mut |arg| {
            if let Argument::Variable { name, .. } = arg {
                vars.insert(name.clone());
            }
        });

        let mut head_args: Vec<Argument> = vars.iter().map(|name| Argument::var(name.clone())).collect();
        let mut defining_body: Vec<Literal> = body.clone();

        // for count, unnamed variables become fresh head columns so tuples
        // stay distinct
        if *op == AggregateOp::Count {
            let mut fresh = 0usize;
            struct Instantiate<'a> {
                fresh: &'a mut usize,
                added: Vec<String>,
            }
            impl ArgumentMapper for Instantiate<'_> {
                fn map_argument(&mut self, arg: Argument) -> Argument {
                    match arg {
                        Argument::Unnamed { loc } => {
                            let name = format!("+under_{}", *self.fresh);
                            *self.fresh += 1;
                            self.added.push(name.clone());
                            Argument::Variable { name, loc }
                        }
                        other => crate::ast::mapper::descend(other, self),
                    }
                }
            }
            let mut instantiate = Instantiate {
                fresh: &mut fresh,
                added: Vec::default(),
            };
            for literal in defining_body.iter_mut() {
                map_literal(literal, &mut instantiate);
            }
            for added in instantiate.added {
                head_args.push(Argument::var(added));
            }
        }

        let defining_clause =
            Clause::rule(Atom::new(name.clone(), head_args.clone()), defining_body).generated();

        // attribute types of the synthesized relation come from the type
        // analysis of its defining clause; head arguments are the first
        // occurrences of the canonical walk
        let solution = typing::analyse_types(env, &defining_clause, program);
        let mut relation = Relation::new(name.clone());
        for (index, arg) in head_args.iter().enumerate() {
            let type_name = match env.set_has_kind(solution.occurrence(index), TypeKind::Number) {
                true => "number",
                false => "symbol",
            };
            relation = relation.attribute(format!("{arg}"), type_name);
        }

        // locally-bound columns are anonymised in the replacement atom
        let outer = outer_variable_counts(clause);
        let replacement_args: Vec<Argument> = head_args
            .iter()
            .map(|arg| match arg.variable_name() {
                Some(var) if outer.get(var).copied().unwrap_or(0) == 0 => Argument::unnamed(),
                _ => arg.clone(),
            })
            .collect();

        let replacement = Argument::Aggregate {
            op: *op,
            target: target.clone(),
            body: vec![Literal::Atom(Atom::new(name, replacement_args))],
            loc: loc.clone(),
        };

        Materialization {
            original: original.clone(),
            replacement,
            relation,
            defining_clause,
        }
    }
}

impl Transform for MaterializeAggregationQueries {
    fn name(&self) -> &'static str {
        "materialize-aggregation-queries"
    }

    fn transform(&mut self, tu: &mut TranslationUnit) -> bool {
        let env = TypeEnv::build(&tu.program);
        let mut changed = false;

        for key in tu.program.clause_keys() {
            loop {
                let clause = tu.program.clause(key).clone();

                // the innermost aggregator needing a relation, if any
                let mut candidate: Option<Argument> = None;
                {
                    let mut probe = clause.clone();
                    walk_clause_aggregates_mut(&mut probe, &mut |agg| {
                        if candidate.is_some() {
                            return;
                        }
                        if let Argument::Aggregate { body, .. } = agg {
                            if needs_materialization(body) {
                                candidate = Some(agg.clone());
                            }
                        }
                    });
                }
                let Some(original) = candidate else {
                    break;
                };

                let materialization = self.build(&clause, &original, &tu.program, &env);

                // swap the aggregator for its single-atom form
                let mut rewritten = clause;
                let mut done = false;
                walk_clause_aggregates_mut(&mut rewritten, &mut |agg| {
                    if !done && *agg == materialization.original {
                        *agg = materialization.replacement.clone();
                        done = true;
                    }
                });

                tu.program.replace_clause(key, rewritten);
                tu.program
                    .add_relation(materialization.relation)
                    .expect("the synthesized name is fresh");
                tu.program.add_clause(materialization.defining_clause);
                changed = true;
            }
        }
        changed
    }
}
