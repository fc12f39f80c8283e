/*!
Read-only traversals over the AST.

The argument walk order is fixed and shared between the analyses and their
consumers: head atom first, then body literals in order; within a literal,
arguments left to right; within an argument, the node itself before its
children, with aggregator targets before aggregator bodies.
[visit_clause_arguments] is the canonical walk --- analyses index argument
occurrences by their position in it.
*/

use std::collections::BTreeSet;

use crate::ast::{Argument, Atom, Clause, Literal, RelationName};
use crate::reports::SrcLocation;

/// Pre-order walk over an argument and its children.
pub fn visit_argument<'a>(arg: &'a Argument, f: &mut impl FnMut(&'a Argument)) {
    f(arg);
    match arg {
        Argument::Unary { arg, .. } => visit_argument(arg, f),
        Argument::Binary { lhs, rhs, .. } => {
            visit_argument(lhs, f);
            visit_argument(rhs, f);
        }
        Argument::Ternary {
            first,
            second,
            third,
            ..
        } => {
            visit_argument(first, f);
            visit_argument(second, f);
            visit_argument(third, f);
        }
        Argument::Record { args, .. } => {
            for arg in args {
                visit_argument(arg, f);
            }
        }
        Argument::Aggregate { target, body, .. } => {
            if let Some(target) = target {
                visit_argument(target, f);
            }
            for literal in body {
                visit_literal_arguments(literal, f);
            }
        }
        _ => {}
    }
}

/// Pre-order walk over the arguments of a literal.
pub fn visit_literal_arguments<'a>(literal: &'a Literal, f: &mut impl FnMut(&'a Argument)) {
    match literal {
        Literal::Atom(atom) => {
            for arg in &atom.args {
                visit_argument(arg, f);
            }
        }
        Literal::Negation { atom, .. } => {
            for arg in &atom.args {
                visit_argument(arg, f);
            }
        }
        Literal::Constraint { lhs, rhs, .. } => {
            visit_argument(lhs, f);
            visit_argument(rhs, f);
        }
        Literal::Bool { .. } => {}
    }
}

/// The canonical walk over every argument occurrence of a clause.
pub fn visit_clause_arguments<'a>(clause: &'a Clause, f: &mut impl FnMut(&'a Argument)) {
    for arg in &clause.head.args {
        visit_argument(arg, f);
    }
    for literal in &clause.body {
        visit_literal_arguments(literal, f);
    }
}

/// Every variable occurrence in an argument.
pub fn visit_variables<'a>(arg: &'a Argument, f: &mut impl FnMut(&'a str, &'a SrcLocation)) {
    visit_argument(arg, &mut |arg| {
        if let Argument::Variable { name, loc } = arg {
            f(name, loc);
        }
    });
}

/// The set of variable names occurring in a literal.
pub fn literal_variables(literal: &Literal) -> BTreeSet<String> {
    let mut names = BTreeSet::default();
    visit_literal_arguments(literal, &mut |arg| {
        if let Argument::Variable { name, .. } = arg {
            names.insert(name.clone());
        }
    });
    names
}

/// The set of variable names occurring in an atom.
pub fn atom_variables(atom: &Atom) -> BTreeSet<String> {
    let mut names = BTreeSet::default();
    for arg in &atom.args {
        visit_variables(arg, &mut |name, _| {
            names.insert(name.to_string());
        });
    }
    names
}

/// The set of variable names occurring anywhere in a clause.
pub fn clause_variables(clause: &Clause) -> BTreeSet<String> {
    let mut names = BTreeSet::default();
    visit_clause_arguments(clause, &mut |arg| {
        if let Argument::Variable { name, .. } = arg {
            names.insert(name.clone());
        }
    });
    names
}

/// How a relation is mentioned in a clause body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MentionKind {
    Positive,
    Negated,
    /// Mentioned within an aggregator body, at any depth.
    Aggregated,
}

/// Every relation mentioned by a clause apart from its own head atom:
/// body literals, and aggregator bodies anywhere --- head arguments
/// included, as alias resolution may move aggregators into the head.
pub fn body_mentions(clause: &Clause) -> Vec<(&RelationName, MentionKind, &SrcLocation)> {
    let mut mentions = Vec::default();
    for arg in &clause.head.args {
        aggregate_mentions(arg, &mut mentions);
    }
    for literal in &clause.body {
        match literal {
            Literal::Atom(atom) => {
                mentions.push((&atom.name, MentionKind::Positive, &atom.loc));
                for arg in &atom.args {
                    aggregate_mentions(arg, &mut mentions);
                }
            }
            Literal::Negation { atom, .. } => {
                mentions.push((&atom.name, MentionKind::Negated, &atom.loc));
                for arg in &atom.args {
                    aggregate_mentions(arg, &mut mentions);
                }
            }
            Literal::Constraint { lhs, rhs, .. } => {
                aggregate_mentions(lhs, &mut mentions);
                aggregate_mentions(rhs, &mut mentions);
            }
            Literal::Bool { .. } => {}
        }
    }
    mentions
}

fn aggregate_mentions<'a>(
    arg: &'a Argument,
    mentions: &mut Vec<(&'a RelationName, MentionKind, &'a SrcLocation)>,
) {
    visit_argument(arg, &mut |nested| {
        if let Argument::Aggregate { body, .. } = nested {
            for literal in body {
                if let Some(atom) = literal.as_atom() {
                    mentions.push((&atom.name, MentionKind::Aggregated, &atom.loc));
                }
            }
        }
    });
}

/// Every aggregator in a clause, innermost first.
pub fn aggregates_post_order<'a>(clause: &'a Clause, f: &mut impl FnMut(&'a Argument)) {
    let mut stack = Vec::default();
    visit_clause_arguments(clause, &mut |arg| {
        if matches!(arg, Argument::Aggregate { .. }) {
            stack.push(arg);
        }
    });
    // the pre-order stack reversed yields nested aggregators before their hosts
    for arg in stack.into_iter().rev() {
        f(arg);
    }
}

/// True when an unnamed variable occurs in the argument, aggregators
/// excepted (an aggregator grounds everything beneath it).
pub fn has_unnamed_outside_aggregate(arg: &Argument) -> bool {
    match arg {
        Argument::Unnamed { .. } => true,
        Argument::Aggregate { .. } => false,
        Argument::Unary { arg, .. } => has_unnamed_outside_aggregate(arg),
        Argument::Binary { lhs, rhs, .. } => {
            has_unnamed_outside_aggregate(lhs) || has_unnamed_outside_aggregate(rhs)
        }
        Argument::Ternary {
            first,
            second,
            third,
            ..
        } => {
            has_unnamed_outside_aggregate(first)
                || has_unnamed_outside_aggregate(second)
                || has_unnamed_outside_aggregate(third)
        }
        Argument::Record { args, .. } => args.iter().any(has_unnamed_outside_aggregate),
        _ => false,
    }
}

/// True when any unnamed variable occurs in the argument, at any depth.
pub fn has_unnamed(arg: &Argument) -> bool {
    let mut found = false;
    visit_argument(arg, &mut |arg| {
        found |= matches!(arg, Argument::Unnamed { .. });
    });
    found
}
