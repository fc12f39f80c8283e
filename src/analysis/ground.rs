/*!
Groundedness analysis.

A constraint analysis over the boolean-disjunct lattice (false ⊑ true):

1. Every top-level argument of a positive, non-head atom is grounded ---
   aggregator bodies included.
2. Constants are grounded, and so are aggregators.
3. Equality constraints propagate groundedness symmetrically.
4. A functor is grounded when all its operands are grounded.
5. A record initializer is grounded iff all its fields are grounded, and
   once grounded it grounds its fields.

The fixpoint yields a value for every argument occurrence of the clause,
plus a per-variable view.
*/

use std::collections::BTreeMap;

use crate::ast::{Argument, Clause, ConstraintOp, Literal};

/// The result of the analysis for one clause.
#[derive(Clone, Debug)]
pub struct Groundedness {
    per_occurrence: Vec<bool>,
    by_variable: BTreeMap<String, bool>,
}

impl Groundedness {
    /// Whether the occurrence at the given canonical-walk position is grounded.
    pub fn occurrence(&self, index: usize) -> bool {
        self.per_occurrence[index]
    }

    pub fn occurrences(&self) -> &[bool] {
        &self.per_occurrence
    }

    /// Whether the named variable is grounded anywhere in the clause.
    pub fn variable(&self, name: &str) -> bool {
        self.by_variable.get(name).copied().unwrap_or(false)
    }
}

#[derive(Default)]
struct Builder {
    var_slots: BTreeMap<String, usize>,
    slot_count: usize,
    occurrence_slots: Vec<usize>,
    seeds: Vec<usize>,
    implications: Vec<(Vec<usize>, usize)>,
}

impl Builder {
    fn fresh_slot(&mut self) -> usize {
        let slot = self.slot_count;
        self.slot_count += 1;
        slot
    }

    fn variable_slot(&mut self, name: &str) -> usize {
        match self.var_slots.get(name) {
            Some(&slot) => slot,
            None => {
                let slot = self.fresh_slot();
                self.var_slots.insert(name.to_string(), slot);
                slot
            }
        }
    }

    // Mirrors the canonical argument walk; returns the slot of the occurrence.
    fn index_argument(&mut self, arg: &Argument) -> usize {
        let slot = match arg {
            Argument::Variable { name, .. } => self.variable_slot(name),
            _ => self.fresh_slot(),
        };
        self.occurrence_slots.push(slot);

        match arg {
            Argument::Number { .. } | Argument::Text { .. } => self.seeds.push(slot),
            Argument::Unary { arg, .. } => {
                let operand = self.index_argument(arg);
                self.implications.push((vec![operand], slot));
            }
            Argument::Binary { lhs, rhs, .. } => {
                let lhs = self.index_argument(lhs);
                let rhs = self.index_argument(rhs);
                self.implications.push((vec![lhs, rhs], slot));
            }
            Argument::Ternary {
                first,
                second,
                third,
                ..
            } => {
                let first = self.index_argument(first);
                let second = self.index_argument(second);
                let third = self.index_argument(third);
                self.implications.push((vec![first, second, third], slot));
            }
            Argument::Record { args, .. } => {
                let mut fields = Vec::with_capacity(args.len());
                for arg in args {
                    let field = self.index_argument(arg);
                    self.implications.push((vec![slot], field));
                    fields.push(field);
                }
                self.implications.push((fields, slot));
            }
            Argument::Aggregate { target, body, .. } => {
                self.seeds.push(slot);
                if let Some(target) = target {
                    self.index_argument(target);
                }
                for literal in body {
                    self.index_literal(literal);
                }
            }
            _ => {}
        }
        slot
    }

    fn index_literal(&mut self, literal: &Literal) {
        match literal {
            Literal::Atom(atom) => {
                for arg in &atom.args {
                    let slot = self.index_argument(arg);
                    self.seeds.push(slot);
                }
            }
            Literal::Negation { atom, .. } => {
                for arg in &atom.args {
                    self.index_argument(arg);
                }
            }
            Literal::Constraint { op, lhs, rhs, .. } => {
                let lhs = self.index_argument(lhs);
                let rhs = self.index_argument(rhs);
                if *op == ConstraintOp::Eq {
                    self.implications.push((vec![lhs], rhs));
                    self.implications.push((vec![rhs], lhs));
                }
            }
            Literal::Bool { .. } => {}
        }
    }
}

/// Runs the analysis on the given clause.
pub fn grounded_terms(clause: &Clause) -> Groundedness {
    let mut builder = Builder::default();

    // head arguments are indexed without grounding their slots
    for arg in &clause.head.args {
        builder.index_argument(arg);
    }
    for literal in &clause.body {
        builder.index_literal(literal);
    }

    let mut values = vec![false; builder.slot_count];
    for &slot in &builder.seeds {
        values[slot] = true;
    }

    let mut changed = true;
    while changed {
        changed = false;
        for (premises, conclusion) in &builder.implications {
            if !values[*conclusion] && premises.iter().all(|&slot| values[slot]) {
                values[*conclusion] = true;
                changed = true;
            }
        }
    }

    Groundedness {
        per_occurrence: builder
            .occurrence_slots
            .iter()
            .map(|&slot| values[slot])
            .collect(),
        by_variable: builder
            .var_slots
            .iter()
            .map(|(name, &slot)| (name.clone(), values[slot]))
            .collect(),
    }
}
