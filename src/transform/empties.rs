/*!
Empty- and redundant-relation removal.

A relation with no clauses and no input flag holds nothing: clauses with a
positive atom over it can never fire and are removed, negations over it are
vacuously true and dropped. The relation itself is removed unless it is
computed or appears in an aggregator. Removing clauses can empty further
relations, so the pass iterates to a fixpoint.

A relation from which no output or printed size is reachable contributes
nothing and is removed.
*/

use crate::analysis::precedence::{redundant_relations, PrecedenceGraph};
use crate::ast::visit::visit_clause_arguments;
use crate::ast::{Argument, Literal, Program, RelationName};
use crate::context::TranslationUnit;
use crate::transform::Transform;

#[derive(Default)]
pub struct RemoveEmptyRelations;

impl Transform for RemoveEmptyRelations {
    fn name(&self) -> &'static str {
        "remove-empty-relations"
    }

    fn transform(&mut self, tu: &mut TranslationUnit) -> bool {
        let mut changed = false;
        while remove_empty_relations(&mut tu.program) {
            changed = true;
        }
        changed
    }
}

fn used_in_aggregate(program: &Program, name: &RelationName) -> bool {
    for key in program.clause_keys() {
        let mut found = false;
        visit_clause_arguments(program.clause(key), &mut |arg| {
            if let Argument::Aggregate { body, .. } = arg {
                for literal in body {
                    if let Some(atom) = literal.as_atom() {
                        found |= &atom.name == name;
                    }
                }
            }
        });
        if found {
            return true;
        }
    }
    false
}

fn remove_empty_relations(program: &mut Program) -> bool {
    let mut changed = false;
    for name in program.relation_names() {
        let Some(relation) = program.relation(&name) else {
            continue;
        };
        if !relation.clause_keys().is_empty() || relation.flags.input {
            continue;
        }

        changed |= remove_empty_relation_uses(program, &name);

        let keep = used_in_aggregate(program, &name)
            || program
                .relation(&name)
                .map(|relation| relation.flags.computed())
                .unwrap_or(false);
        if !keep {
            program.remove_relation(&name);
            changed = true;
        }
    }
    changed
}

fn remove_empty_relation_uses(program: &mut Program, empty: &RelationName) -> bool {
    let mut changed = false;
    for key in program.clause_keys() {
        let clause = program.clause(key);

        let fails = clause
            .body_atoms()
            .iter()
            .any(|atom| &atom.name == empty);
        if fails {
            program.remove_clause(key);
            changed = true;
            continue;
        }

        let vacuous = clause
            .negated_atoms()
            .iter()
            .any(|atom| &atom.name == empty);
        if vacuous {
            let mut replacement = clause.clone_head();
            for literal in &clause.body {
                if let Literal::Negation { atom, .. } = literal {
                    if &atom.name == empty {
                        continue;
                    }
                }
                replacement.body.push(literal.clone());
            }
            program.replace_clause(key, replacement);
            changed = true;
        }
    }
    changed
}

#[derive(Default)]
pub struct RemoveRedundantRelations;

impl Transform for RemoveRedundantRelations {
    fn name(&self) -> &'static str {
        "remove-redundant-relations"
    }

    fn transform(&mut self, tu: &mut TranslationUnit) -> bool {
        let precedence = PrecedenceGraph::build(&tu.program);
        let redundant = redundant_relations(&tu.program, &precedence);
        for name in &redundant {
            tu.program.remove_relation(name);
        }
        !redundant.is_empty()
    }
}
