/*!
Disconnected-literal extraction.

Per clause, an undirected dependency graph over variables is built: two
variables are connected when they co-occur in a literal. Body literals whose
variables live in components disjoint from the head's are peeled off into a
fresh nullary relation, and the clause receives an atom over that relation
in their place --- so the peeled conjunction is evaluated once rather than
per binding of the head variables.
*/

use std::collections::{BTreeMap, BTreeSet};

use crate::ast::visit::{atom_variables, literal_variables, visit_literal_arguments};
use crate::ast::{Atom, Clause, Literal, Program, Relation, RelationName};
use crate::context::TranslationUnit;
use crate::transform::Transform;

#[derive(Default)]
pub struct ExtractDisconnectedLiterals {
    counter: usize,
}

impl ExtractDisconnectedLiterals {
    fn fresh_relation_name(&mut self, program: &Program) -> RelationName {
        loop {
            let candidate = RelationName::new(format!("+disconnected{}", self.counter));
            self.counter += 1;
            if program.relation(&candidate).is_none() {
                return candidate;
            }
        }
    }
}

impl Transform for ExtractDisconnectedLiterals {
    fn name(&self) -> &'static str {
        "extract-disconnected-literals"
    }

    fn transform(&mut self, tu: &mut TranslationUnit) -> bool {
        let mut changed = false;

        for key in tu.program.clause_keys() {
            let clause = tu.program.clause(key).clone();

            let head_vars = atom_variables(&clause.head);
            if head_vars.is_empty() {
                continue;
            }

            // star-connect the variables of the head and of each literal
            let mut adjacency: BTreeMap<String, BTreeSet<String>> = BTreeMap::default();
            let mut connect = |vars: &BTreeSet<String>| {
                let mut iter = vars.iter();
                let Some(first) = iter.next() else { return };
                for other in iter {
                    adjacency
                        .entry(first.clone())
                        .or_default()
                        .insert(other.clone());
                    adjacency
                        .entry(other.clone())
                        .or_default()
                        .insert(first.clone());
                }
            };
            connect(&head_vars);
            for literal in &clause.body {
                connect(&literal_variables(literal));
            }

            // the component of the head
            let mut important: BTreeSet<String> = BTreeSet::default();
            let mut stack: Vec<String> = head_vars.iter().cloned().collect();
            while let Some(var) = stack.pop() {
                if !important.insert(var.clone()) {
                    continue;
                }
                if let Some(next) = adjacency.get(&var) {
                    stack.extend(next.iter().cloned());
                }
            }

            let mut connected: Vec<Literal> = Vec::default();
            let mut disconnected: Vec<Literal> = Vec::default();
            for literal in &clause.body {
                let mut has_args = false;
                visit_literal_arguments(literal, &mut |_| has_args = true);
                let touches_head = literal_variables(literal)
                    .iter()
                    .any(|var| important.contains(var));
                if touches_head || !has_args {
                    connected.push(literal.clone());
                } else {
                    disconnected.push(literal.clone());
                }
            }

            if disconnected.is_empty() {
                continue;
            }
            changed = true;

            let name = self.fresh_relation_name(&tu.program);
            tu.program
                .add_relation(Relation::new(name.clone()))
                .expect("the synthesized name is fresh");

            let mut extracted = Clause::rule(Atom::new(name.clone(), Vec::default()), disconnected)
                .generated();
            extracted.loc = clause.loc.clone();

            let mut replacement = clause.clone_head();
            replacement.plan = None;
            replacement.body = connected;
            replacement
                .body
                .push(Literal::Atom(Atom::new(name, Vec::default())));

            tu.program.replace_clause(key, replacement);
            tu.program.add_clause(extracted);
        }
        changed
    }
}
