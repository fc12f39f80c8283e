/*!
Existential reduction.

A relation used only existentially --- every use site is `r(_, …, _)` ---
carries no information beyond emptiness, and may be projected down to a
nullary relation.

The reducible set is found by a reverse reachability analysis: input,
output and printsize relations, relations used non-existentially in
non-recursive clauses, and relations appearing in aggregators are
irreducible roots; a dependency graph propagates irreducibility through
non-existential uses in recursive clauses; everything else with at least one
clause is reduced. Each reduced relation gets a nullary twin defined by its
non-recursive clauses, and every use site is renamed to the twin.
*/

use std::collections::{BTreeMap, BTreeSet};

use crate::ast::mapper::map_atoms_in_clause;
use crate::ast::visit::{body_mentions, visit_clause_arguments};
use crate::ast::{Argument, Atom, Clause, Relation, RelationName};
use crate::context::TranslationUnit;
use crate::transform::Transform;

#[derive(Default)]
pub struct ReduceExistentials;

fn is_recursive_clause(clause: &Clause) -> bool {
    body_mentions(clause)
        .iter()
        .any(|(name, _, _)| *name == &clause.head.name)
}

fn is_existential_atom(atom: &Atom) -> bool {
    atom.args
        .iter()
        .all(|arg| matches!(arg, Argument::Unnamed { .. }))
}

impl Transform for ReduceExistentials {
    fn name(&self) -> &'static str {
        "reduce-existentials"
    }

    fn transform(&mut self, tu: &mut TranslationUnit) -> bool {
        let program = &mut tu.program;

        // dependency edges: user -> used, for non-existential uses in
        // recursive clauses
        let mut edges: BTreeMap<RelationName, BTreeSet<RelationName>> = BTreeMap::default();
        let mut irreducible_roots: BTreeSet<RelationName> = BTreeSet::default();

        for relation in program.relations() {
            if relation.flags.computed() || relation.flags.input {
                irreducible_roots.insert(relation.name.clone());
            }
        }

        for key in program.clause_keys() {
            let clause = program.clause(key);
            let recursive = is_recursive_clause(clause);

            let mut consider = |atom: &Atom| {
                if atom.name == clause.head.name {
                    return;
                }
                if !is_existential_atom(atom) {
                    if recursive {
                        edges
                            .entry(clause.head.name.clone())
                            .or_default()
                            .insert(atom.name.clone());
                    } else {
                        irreducible_roots.insert(atom.name.clone());
                    }
                }
            };
            for atom in clause.body_atoms() {
                consider(atom);
            }
            for atom in clause.negated_atoms() {
                consider(atom);
            }

            // relations appearing in aggregators keep their columns
            visit_clause_arguments(clause, &mut |arg| {
                if let Argument::Aggregate { body, .. } = arg {
                    for literal in body {
                        if let Some(atom) = literal.as_atom() {
                            irreducible_roots.insert(atom.name.clone());
                        }
                    }
                }
            });
        }

        // propagate irreducibility along dependency edges
        let mut irreducible: BTreeSet<RelationName> = BTreeSet::default();
        let mut stack: Vec<RelationName> = irreducible_roots.into_iter().collect();
        while let Some(current) = stack.pop() {
            if !irreducible.insert(current.clone()) {
                continue;
            }
            if let Some(next) = edges.get(&current) {
                stack.extend(next.iter().cloned());
            }
        }

        // a nullary relation is already as small as it gets
        let existential: BTreeSet<RelationName> = program
            .relations()
            .filter(|relation| {
                relation.arity() > 0
                    && !relation.clause_keys().is_empty()
                    && !irreducible.contains(&relation.name)
            })
            .map(|relation| relation.name.clone())
            .collect();

        if existential.is_empty() {
            return false;
        }

        let twin_name =
            |name: &RelationName| name.map_last(|last| format!("+exists_{last}"));

        // a nullary twin per reduced relation, defined by the non-recursive
        // clauses of the original
        for name in &existential {
            let original = program.relation(name).expect("existentials are declared");
            let mut twin = Relation::new(twin_name(name));
            twin.flags = original.flags;
            twin.flags.eqrel = false;
            twin.loc = original.loc.clone();

            let clause_keys = original.clause_keys().to_vec();
            program
                .add_relation(twin)
                .expect("the twin name is fresh");

            for key in clause_keys {
                let clause = program.clause(key);
                if is_recursive_clause(clause) {
                    continue;
                }
                let mut copy = clause.clone();
                copy.head = Atom::new(twin_name(name), Vec::default());
                copy.head.loc = clause.head.loc.clone();
                program.add_clause(copy);
            }
        }

        // rename use sites; the clauses of the reduced relations themselves
        // are left to the redundancy pass
        for key in program.clause_keys() {
            let clause = program.clause(key);
            if existential.contains(&clause.head.name) {
                continue;
            }
            let mut rewritten = clause.clone();
            let mut renamed = false;
            map_atoms_in_clause(&mut rewritten, &mut |atom| {
                if existential.contains(&atom.name) {
                    *atom = Atom::new(twin_name(&atom.name), Vec::default());
                    renamed = true;
                }
            });
            if renamed {
                program.replace_clause(key, rewritten);
            }
        }

        true
    }
}
