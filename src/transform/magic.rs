/*!
The magic-set transform.

For each output relation `Q`, the computation is restricted to the tuples an
all-free query over `Q` actually demands:

1. **Adornment.** Starting from `Q` adorned all-free, adornments propagate
   through the defining clauses by a demand-driven sideways information
   passing strategy: among the unprocessed body atoms, one with a bound
   argument is adorned next (falling back to the first EDB atom, then to the
   first remaining); its free arguments become bound for the atoms after it.
   Unseen adornments of IDB predicates are queued.
2. **Rewrite.** Each adorned predicate `pᵃ` gets a relation and a *magic*
   relation holding the tuples of bound columns for which `pᵃ` must be
   computed. Every adorned clause is reordered to its SIPS order, its IDB
   atoms renamed to their adorned versions, and guarded by its head's magic
   atom; each body occurrence of an adorned IDB atom seeds that atom's magic
   relation from the guard and the atoms before it. The all-free magic
   relation of `Q` is nullary and seeded by a fact.

Fallbacks keep the transform sound where the demand rewriting is not:
clauses with functors, aggregators and their contents, and relations
entangled with negation keep their original, unguarded versions. Relations
mixing facts and rules are split first, so EDB and IDB stay apart.
*/

use std::collections::{BTreeSet, VecDeque};

use crate::ast::visit::{body_mentions, visit_clause_arguments};
use crate::ast::{
    Argument, Atom, Clause, ConstraintOp, Literal, Program, Relation, RelationName,
};
use crate::context::TranslationUnit;
use crate::misc::log::targets;
use crate::transform::Transform;

#[derive(Default)]
pub struct MagicSetTransform {
    edb_splits: usize,
}

/// An adorned clause: the clause, its head adornment, the adornment of each
/// positive body atom (in original positions), and the SIPS rank of each
/// atom.
struct AdornedClause {
    clause: Clause,
    head_adornment: String,
    body_adornments: Vec<String>,
    ranks: Vec<usize>,
}

fn adorned_name(name: &RelationName, adornment: &str) -> RelationName {
    match adornment.is_empty() {
        true => name.map_last(|last| format!("+{last}")),
        false => name.map_last(|last| format!("+{last}_{adornment}")),
    }
}

fn magic_name(name: &RelationName, adornment: &str, query: usize) -> RelationName {
    match adornment.is_empty() {
        true => name.map_last(|last| format!("+m{query}_{last}")),
        false => name.map_last(|last| format!("+m{query}_{last}_{adornment}")),
    }
}

// Display strings identify bound terms, as the SIPS works on argument shape.
fn term_key(arg: &Argument) -> String {
    format!("{arg}")
}

impl MagicSetTransform {
    /// Splits relations holding both facts and rules, moving the facts to a
    /// fresh EDB relation bridged back by a copy rule.
    fn split_mixed_relations(&mut self, program: &mut Program) {
        for name in program.relation_names() {
            let keys = program.clauses_of(&name);
            let facts: Vec<_> = keys
                .iter()
                .copied()
                .filter(|&key| program.clause(key).is_fact())
                .collect();
            if facts.is_empty() || facts.len() == keys.len() {
                continue;
            }

            self.edb_splits += 1;
            let edb_name = loop {
                let candidate = RelationName::new(format!("+edb{}", self.edb_splits));
                if program.relation(&candidate).is_none() {
                    break candidate;
                }
                self.edb_splits += 1;
            };

            let original = program.relation(&name).expect("the name was just listed");
            let mut edb = Relation::new(edb_name.clone());
            edb.attributes = original.attributes.clone();
            let arity = original.arity();
            program.add_relation(edb).expect("the name is fresh");

            for key in facts {
                let mut fact = program
                    .remove_clause(key)
                    .expect("the key was just listed");
                fact.head.name = edb_name.clone();
                program.add_clause(fact);
            }

            let args: Vec<Argument> = (0..arity)
                .map(|index| Argument::var(format!("+arg{index}")))
                .collect();
            let bridge = Clause::rule(
                Atom::new(name.clone(), args.clone()),
                vec![Literal::Atom(Atom::new(edb_name, args))],
            )
            .generated();
            program.add_clause(bridge);
        }
    }

    /// Relations which the demand rewriting must leave untouched.
    fn fallback_relations(&self, program: &Program) -> BTreeSet<RelationName> {
        let mut fallback: BTreeSet<RelationName> = BTreeSet::default();

        // negated relations, together with everything their rules reach
        let mut negated: VecDeque<RelationName> = VecDeque::default();
        for key in program.clause_keys() {
            let clause = program.clause(key);
            for atom in clause.negated_atoms() {
                negated.push_back(atom.name.clone());
            }
        }
        let mut seen: BTreeSet<RelationName> = BTreeSet::default();
        while let Some(current) = negated.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            for key in program.clauses_of(&current) {
                for (name, _, _) in body_mentions(program.clause(key)) {
                    negated.push_back(name.clone());
                }
            }
        }
        fallback.extend(seen);

        // clauses with functors or aggregators resist the rewriting; so do
        // the relations inside aggregators
        for key in program.clause_keys() {
            let clause = program.clause(key);
            let mut resists = false;
            visit_clause_arguments(clause, &mut |arg| {
                if arg.is_functor() || matches!(arg, Argument::Counter { .. }) {
                    resists = true;
                }
                if let Argument::Aggregate { body, .. } = arg {
                    resists = true;
                    for literal in body {
                        if let Some(atom) = literal.as_atom() {
                            fallback.insert(atom.name.clone());
                        }
                    }
                }
            });
            if resists {
                fallback.insert(clause.head.name.clone());
            }
        }

        fallback
    }

    /// Adorns the clauses demanded by one output query.
    fn adorn_query(
        &self,
        program: &Program,
        query: &RelationName,
        idb: &BTreeSet<RelationName>,
        edb: &BTreeSet<RelationName>,
        fallback: &BTreeSet<RelationName>,
    ) -> Vec<AdornedClause> {
        let mut adorned: Vec<AdornedClause> = Vec::default();

        let arity = program.relation(query).map(Relation::arity).unwrap_or(0);
        let all_free = "f".repeat(arity);

        let mut queue: VecDeque<(RelationName, String)> =
            VecDeque::from([(query.clone(), all_free)]);
        let mut seen: BTreeSet<(RelationName, String)> = queue.iter().cloned().collect();

        while let Some((name, adornment)) = queue.pop_front() {
            if fallback.contains(&name) {
                continue;
            }
            for key in program.clauses_of(&name) {
                let clause = program.clause(key).clone();
                if clause.is_fact() {
                    continue;
                }

                // arguments bound by the head adornment
                let mut bound: BTreeSet<String> = BTreeSet::default();
                for (index, arg) in clause.head.args.iter().enumerate() {
                    if adornment.as_bytes().get(index) == Some(&b'b') {
                        bound.insert(term_key(arg));
                    }
                }
                // variables equated to constants are bound as well
                for literal in &clause.body {
                    if let Literal::Constraint {
                        op: ConstraintOp::Eq,
                        lhs,
                        rhs,
                        ..
                    } = literal
                    {
                        if lhs.is_variable() && rhs.is_constant() {
                            bound.insert(term_key(lhs));
                        }
                        if rhs.is_variable() && lhs.is_constant() {
                            bound.insert(term_key(rhs));
                        }
                    }
                }

                let atoms = clause.body_atoms();
                let total = atoms.len();
                let mut remaining: Vec<Option<&Atom>> = atoms.iter().map(|a| Some(*a)).collect();
                let mut body_adornments = vec![String::default(); total];
                let mut ranks = vec![0usize; total];

                for rank in 0..total {
                    // prefer an atom with a bound argument, then the first
                    // EDB atom, then the first remaining
                    let mut chosen = None;
                    for (index, slot) in remaining.iter().enumerate() {
                        let Some(atom) = slot else { continue };
                        if atom
                            .args
                            .iter()
                            .any(|arg| bound.contains(&term_key(arg)))
                        {
                            chosen = Some(index);
                            break;
                        }
                    }
                    if chosen.is_none() {
                        chosen = remaining
                            .iter()
                            .enumerate()
                            .find(|(_, slot)| {
                                slot.map(|atom| edb.contains(&atom.name)).unwrap_or(false)
                            })
                            .map(|(index, _)| index);
                    }
                    if chosen.is_none() {
                        chosen = remaining
                            .iter()
                            .position(|slot| slot.is_some());
                    }
                    let index = chosen.expect("an unprocessed atom remains");
                    let atom = remaining[index].take().expect("chosen from remaining");

                    let mut atom_adornment = String::with_capacity(atom.args.len());
                    let mut newly_bound: Vec<String> = Vec::default();
                    for arg in &atom.args {
                        let arg_key = term_key(arg);
                        if bound.contains(&arg_key) {
                            atom_adornment.push('b');
                        } else {
                            atom_adornment.push('f');
                            newly_bound.push(arg_key);
                        }
                    }
                    bound.extend(newly_bound);

                    if idb.contains(&atom.name) && !fallback.contains(&atom.name) {
                        let entry = (atom.name.clone(), atom_adornment.clone());
                        if seen.insert(entry.clone()) {
                            queue.push_back(entry);
                        }
                    }

                    body_adornments[index] = atom_adornment;
                    ranks[index] = rank;
                }

                adorned.push(AdornedClause {
                    clause,
                    head_adornment: adornment.clone(),
                    body_adornments,
                    ranks,
                });
            }
        }
        adorned
    }

    /// Applies the rewrite for one output query.
    #[allow(clippy::too_many_arguments)]
    fn rewrite_query(
        &mut self,
        program: &mut Program,
        query: &RelationName,
        query_index: usize,
        adorned_clauses: Vec<AdornedClause>,
        idb: &BTreeSet<RelationName>,
        fallback: &BTreeSet<RelationName>,
    ) {
        let arity = program.relation(query).map(Relation::arity).unwrap_or(0);
        let all_free = "f".repeat(arity);

        // the nullary seed: the query itself is demanded
        let seed_name = magic_name(query, &all_free, query_index);
        if program.relation(&seed_name).is_none() {
            program
                .add_relation(Relation::new(seed_name.clone()))
                .expect("the seed name is fresh");
            program.add_clause(Clause::fact(Atom::new(seed_name, Vec::default())).generated());
        }

        for adorned in adorned_clauses {
            let AdornedClause {
                clause,
                head_adornment,
                body_adornments,
                ranks,
            } = adorned;
            let original_head = clause.head.name.clone();
            if fallback.contains(&original_head) {
                continue;
            }

            // the query keeps its name; other adorned predicates get fresh
            // relations
            let head_is_query = &original_head == query && head_adornment == "f".repeat(arity);
            let target_name = match head_is_query {
                true => original_head.clone(),
                false => adorned_name(&original_head, &head_adornment),
            };
            if !head_is_query {
                self.ensure_adorned_relation(program, &original_head, &target_name);
            }

            // reorder to the SIPS order
            let mut order = vec![0usize; ranks.len()];
            for (index, &rank) in ranks.iter().enumerate() {
                order[rank] = index;
            }
            let mut rewritten = clause.clone();
            rewritten.reorder_atoms(&order);
            rewritten.plan = None;
            rewritten.head.name = target_name.clone();
            rewritten.generated = true;

            let ordered_adornments: Vec<String> = order
                .iter()
                .map(|&original| body_adornments[original].clone())
                .collect();

            // rename IDB body atoms to their adorned versions, remembering
            // the original names for the magic rules
            let mut occurrence = 0usize;
            let mut occurrence_info: Vec<(RelationName, String, Vec<Argument>)> = Vec::default();
            for literal in rewritten.body.iter_mut() {
                let Literal::Atom(atom) = literal else {
                    continue;
                };
                let adornment = &ordered_adornments[occurrence];
                let original = atom.name.clone();
                let bound_args: Vec<Argument> = atom
                    .args
                    .iter()
                    .zip(adornment.bytes())
                    .filter(|(_, b)| *b == b'b')
                    .map(|(arg, _)| arg.clone())
                    .collect();
                if idb.contains(&original) && !fallback.contains(&original) {
                    let renamed = adorned_name(&original, adornment);
                    self.ensure_adorned_relation(program, &original, &renamed);
                    atom.name = renamed;
                }
                occurrence_info.push((original, adornment.clone(), bound_args));
                occurrence += 1;
            }

            // the guard: tuples of bound head columns demanded for this
            // adorned predicate
            let head_bound: Vec<Argument> = rewritten
                .head
                .args
                .iter()
                .zip(head_adornment.bytes())
                .filter(|(_, b)| *b == b'b')
                .map(|(arg, _)| arg.clone())
                .collect();
            let guard_name = magic_name(&original_head, &head_adornment, query_index);
            self.ensure_magic_relation(program, &original_head, &head_adornment, &guard_name);
            let guard = Atom::new(guard_name, head_bound);
            rewritten.body.insert(0, Literal::Atom(guard.clone()));

            // one magic rule per adorned IDB body occurrence: its bound
            // columns are demanded once the guard and the atoms before it
            // hold
            let ordered_atoms: Vec<Atom> = rewritten.body_atoms().into_iter().cloned().collect();
            for (position, (original, adornment, bound_args)) in
                occurrence_info.iter().enumerate()
            {
                if !idb.contains(original) || fallback.contains(original) {
                    continue;
                }
                let magic = magic_name(original, adornment, query_index);
                self.ensure_magic_relation(program, original, adornment, &magic);

                // ordered_atoms[0] is the guard itself
                let mut prefix: Vec<Literal> = ordered_atoms[..position + 1]
                    .iter()
                    .map(|atom| Literal::Atom(atom.clone()))
                    .collect();

                // constraints whose variables the prefix grounds come along,
                // as the bound columns may flow from them
                let mut available: BTreeSet<String> = BTreeSet::default();
                for atom in &ordered_atoms[..position + 1] {
                    available.extend(crate::ast::visit::atom_variables(atom));
                }
                for literal in &rewritten.body {
                    let Literal::Constraint { op, lhs, rhs, .. } = literal else {
                        continue;
                    };
                    let grounds_itself = *op == ConstraintOp::Eq
                        && (lhs.is_variable() && rhs.is_constant()
                            || rhs.is_variable() && lhs.is_constant());
                    let vars: BTreeSet<String> = {
                        let mut names = BTreeSet::default();
                        for side in [lhs, rhs] {
                            crate::ast::visit::visit_variables(side, &mut |name, _| {
                                names.insert(name.to_string());
                            });
                        }
                        names
                    };
                    if grounds_itself {
                        available.extend(vars.iter().cloned());
                        prefix.push(literal.clone());
                    } else if vars.iter().all(|name| available.contains(name)) {
                        prefix.push(literal.clone());
                    }
                }

                let magic_rule = Clause::rule(
                    Atom::new(magic, bound_args.clone()),
                    prefix,
                )
                .generated();
                program.add_clause(magic_rule);
            }

            // the query's own clauses are replaced; other adorned predicates
            // live beside their originals
            if head_is_query {
                if let Some(key) = program
                    .clauses_of(&original_head)
                    .into_iter()
                    .find(|&key| program.clause(key) == &clause)
                {
                    program.remove_clause(key);
                }
            }
            program.add_clause(rewritten);
        }
    }

    fn ensure_adorned_relation(
        &mut self,
        program: &mut Program,
        original: &RelationName,
        adorned: &RelationName,
    ) {
        if program.relation(adorned).is_some() {
            return;
        }
        let mut relation = Relation::new(adorned.clone());
        if let Some(source) = program.relation(original) {
            relation.attributes = source.attributes.clone();
        }
        program
            .add_relation(relation)
            .expect("presence was checked");
    }

    fn ensure_magic_relation(
        &mut self,
        program: &mut Program,
        original: &RelationName,
        adornment: &str,
        magic: &RelationName,
    ) {
        if program.relation(magic).is_some() {
            return;
        }
        let mut relation = Relation::new(magic.clone());
        if let Some(source) = program.relation(original) {
            relation.attributes = source
                .attributes
                .iter()
                .zip(adornment.bytes())
                .filter(|(_, b)| *b == b'b')
                .map(|(attribute, _)| attribute.clone())
                .collect();
        }
        program
            .add_relation(relation)
            .expect("presence was checked");
    }
}

impl Transform for MagicSetTransform {
    fn name(&self) -> &'static str {
        "magic-set"
    }

    fn transform(&mut self, tu: &mut TranslationUnit) -> bool {
        let program = &mut tu.program;

        // a guarded program stays as it is
        if program
            .relation_names()
            .iter()
            .any(|name| name.last().starts_with("+m"))
        {
            return false;
        }

        let queries: Vec<RelationName> = program
            .relations()
            .filter(|relation| relation.flags.computed())
            .map(|relation| relation.name.clone())
            .collect();
        if queries.is_empty() {
            return false;
        }

        self.split_mixed_relations(program);

        // EDB: relations defined by facts alone; IDB: everything with a rule
        let mut edb: BTreeSet<RelationName> = BTreeSet::default();
        let mut idb: BTreeSet<RelationName> = BTreeSet::default();
        for name in program.relation_names() {
            let rules = program
                .clauses_of(&name)
                .into_iter()
                .any(|key| !program.clause(key).is_fact());
            match rules {
                true => idb.insert(name),
                false => edb.insert(name),
            };
        }

        let fallback = self.fallback_relations(program);

        let mut changed = false;
        for (query_index, query) in queries.iter().enumerate() {
            if fallback.contains(query) || !idb.contains(query) {
                continue;
            }
            let adorned = self.adorn_query(program, query, &idb, &edb, &fallback);
            if adorned.is_empty() {
                continue;
            }
            log::debug!(
                target: targets::MAGIC,
                "query {query}: {} adorned clause(s)",
                adorned.len()
            );
            self.rewrite_query(program, query, query_index, adorned, &idb, &fallback);
            changed = true;
        }
        changed
    }
}
