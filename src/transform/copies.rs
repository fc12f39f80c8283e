/*!
Relation-copy removal.

A relation defined by the single clause `r(x, y, …) :- s(x, y, …).` --- with
head and body arguments matching positionally, each a variable or a record
over variables --- is an alias of `s`. Aliases are resolved transitively,
every reference is rewritten to the ultimate target, and the aliased
relations are dropped. Copy cycles compute nothing; they are broken by
deleting the sole clause of a member, leaving the cycle to the
empty-relation removal.
*/

use std::collections::{BTreeMap, BTreeSet};

use crate::ast::mapper::map_atoms_in_clause;
use crate::ast::{Argument, Clause, Program, RelationName};
use crate::context::TranslationUnit;
use crate::transform::Transform;

#[derive(Default)]
pub struct RemoveRelationCopies;

impl Transform for RemoveRelationCopies {
    fn name(&self) -> &'static str {
        "remove-relation-copies"
    }

    fn transform(&mut self, tu: &mut TranslationUnit) -> bool {
        remove_relation_copies(&mut tu.program)
    }
}

// Arguments of a copy clause: variables, or records decomposing to variables.
fn only_variables(args: &[Argument]) -> bool {
    let mut pending: Vec<&Argument> = args.iter().collect();
    while let Some(arg) = pending.pop() {
        match arg {
            Argument::Variable { .. } => {}
            Argument::Record { args, .. } => pending.extend(args.iter()),
            _ => return false,
        }
    }
    true
}

fn direct_alias_target(program: &Program, name: &RelationName) -> Option<RelationName> {
    let relation = program.relation(name)?;
    if relation.flags.computed() || relation.clause_keys().len() != 1 {
        return None;
    }
    let clause = program.clause(relation.clause_keys()[0]);
    if clause.is_fact() || clause.body.len() != 1 {
        return None;
    }
    let atoms = clause.body_atoms();
    let [atom] = atoms.as_slice() else {
        return None;
    };
    if clause.head.args != atom.args || !only_variables(&clause.head.args) {
        return None;
    }
    Some(atom.name.clone())
}

fn remove_relation_copies(program: &mut Program) -> bool {
    let mut direct: BTreeMap<RelationName, RelationName> = BTreeMap::default();
    for name in program.relation_names() {
        if let Some(target) = direct_alias_target(program, &name) {
            direct.insert(name, target);
        }
    }

    // resolve transitively; members of copy cycles become empty
    let mut alias_of: BTreeMap<RelationName, RelationName> = BTreeMap::default();
    let mut cycle_reps: BTreeSet<RelationName> = BTreeSet::default();

    for (first, start) in &direct {
        let mut visited = BTreeSet::from([first.clone(), start.clone()]);
        let mut current = start.clone();
        while let Some(next) = direct.get(&current) {
            if visited.contains(next) {
                cycle_reps.insert(current.clone());
                break;
            }
            visited.insert(next.clone());
            current = next.clone();
        }
        alias_of.insert(first.clone(), current);
    }

    if alias_of.is_empty() {
        return false;
    }

    // rewrite every reference to an alias
    for key in program.clause_keys() {
        let mut clause: Clause = program.clause(key).clone();
        let mut renamed = false;
        map_atoms_in_clause(&mut clause, &mut |atom| {
            if let Some(target) = alias_of.get(&atom.name) {
                atom.name = target.clone();
                renamed = true;
            }
        });
        if renamed {
            program.replace_clause(key, clause);
        }
    }

    // break cycles by deleting the sole defining clause of a member
    for representative in &cycle_reps {
        let keys = program.clauses_of(representative);
        if let Some(&key) = keys.first() {
            program.remove_clause(key);
        }
    }

    // drop the aliased relations
    for alias in alias_of.keys() {
        if !cycle_reps.contains(alias) {
            program.remove_relation(alias);
        }
    }

    true
}
