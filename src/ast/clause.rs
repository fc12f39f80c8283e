/*!
Clauses: `head :- body₁, …, bodyₖ.`

A clause with an empty body is a fact.
Clauses may carry an execution plan fixing the join order of their body
atoms per recursive version, and a generation flag distinguishing
user-written clauses from clauses synthesized by the transforms.
*/

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ast::{Argument, Atom, Literal};
use crate::reports::SrcLocation;

/// A fixed order of the body atoms of a clause: a permutation of
/// `1..=atom-count` in source numbering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOrder {
    pub positions: Vec<usize>,
    #[serde(default)]
    pub loc: SrcLocation,
}

impl ExecutionOrder {
    /// True when the order is a permutation of `1..=len`.
    pub fn is_complete(&self) -> bool {
        let mut seen = vec![false; self.positions.len()];
        for &position in &self.positions {
            if position == 0 || position > self.positions.len() || seen[position - 1] {
                return false;
            }
            seen[position - 1] = true;
        }
        true
    }
}

/// The per-version execution orders of a clause.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub orders: BTreeMap<usize, ExecutionOrder>,
}

impl ExecutionPlan {
    pub fn order_for(&self, version: usize) -> Option<&ExecutionOrder> {
        self.orders.get(&version)
    }

    pub fn max_version(&self) -> Option<usize> {
        self.orders.keys().max().copied()
    }
}

/// A clause.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Clause {
    pub head: Atom,
    pub body: Vec<Literal>,

    /// An optional execution plan fixing body atom orders.
    #[serde(default)]
    pub plan: Option<ExecutionPlan>,

    /// Set once a plan has been applied, so lowering does not reorder again.
    #[serde(default)]
    pub fixed_plan: bool,

    /// True for clauses synthesized by a transform.
    #[serde(default)]
    pub generated: bool,

    #[serde(default)]
    pub loc: SrcLocation,
}

impl Clause {
    pub fn rule(head: Atom, body: Vec<Literal>) -> Self {
        Clause {
            head,
            body,
            plan: None,
            fixed_plan: false,
            generated: false,
            loc: SrcLocation::default(),
        }
    }

    pub fn fact(head: Atom) -> Self {
        Clause::rule(head, Vec::default())
    }

    /// Marks the clause as synthesized.
    pub fn generated(mut self) -> Self {
        self.generated = true;
        self
    }

    /// A fact is a clause with an empty body and an aggregate-free head ---
    /// an aggregate in the head still requires a loop nest to evaluate.
    pub fn is_fact(&self) -> bool {
        if !self.body.is_empty() {
            return false;
        }
        let mut has_aggregate = false;
        for arg in &self.head.args {
            crate::ast::visit::visit_argument(arg, &mut |nested| {
                has_aggregate |= matches!(nested, Argument::Aggregate { .. });
            });
        }
        !has_aggregate
    }

    /// A copy of the clause without its body.
    pub fn clone_head(&self) -> Clause {
        Clause {
            head: self.head.clone(),
            body: Vec::default(),
            plan: self.plan.clone(),
            fixed_plan: self.fixed_plan,
            generated: self.generated,
            loc: self.loc.clone(),
        }
    }

    /// The top-level positive body atoms, in order.
    pub fn body_atoms(&self) -> Vec<&Atom> {
        self.body
            .iter()
            .filter_map(|literal| match literal {
                Literal::Atom(atom) => Some(atom),
                _ => None,
            })
            .collect()
    }

    /// The top-level negated atoms, in order.
    pub fn negated_atoms(&self) -> Vec<&Atom> {
        self.body
            .iter()
            .filter_map(|literal| match literal {
                Literal::Negation { atom, .. } => Some(atom),
                _ => None,
            })
            .collect()
    }

    /// Permutes the top-level positive body atoms.
    ///
    /// `order[i]` names the index (among the clause's atoms, zero-based) of
    /// the atom to be placed at position `i`.
    /// Other literals keep their positions.
    pub fn reorder_atoms(&mut self, order: &[usize]) {
        let atom_slots: Vec<usize> = self
            .body
            .iter()
            .enumerate()
            .filter_map(|(index, literal)| match literal {
                Literal::Atom(_) => Some(index),
                _ => None,
            })
            .collect();
        assert_eq!(atom_slots.len(), order.len(), "order must cover every atom");

        let mut atoms: Vec<Option<Literal>> = Vec::with_capacity(atom_slots.len());
        for &slot in &atom_slots {
            atoms.push(Some(std::mem::replace(
                &mut self.body[slot],
                Literal::boolean(true),
            )));
        }
        for (position, &source) in order.iter().enumerate() {
            let atom = atoms[source].take().expect("order must be a permutation");
            self.body[atom_slots[position]] = atom;
        }
    }
}

impl PartialEq for Clause {
    fn eq(&self, other: &Self) -> bool {
        self.head == other.head && self.body == other.body && self.plan == other.plan
    }
}

impl Eq for Clause {}

impl std::fmt::Display for Clause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.head)?;
        if !self.body.is_empty() {
            write!(f, " :- ")?;
            for (index, literal) in self.body.iter().enumerate() {
                if index > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{literal}")?;
            }
        }
        write!(f, ".")
    }
}
