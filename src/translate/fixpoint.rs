/*!
Semi-naive evaluation of recursive SCCs.

For each recursive SCC the translator emits:

```none
preamble:   non-recursive clauses of each r  →  r
            merge  @delta_r := r
loop:
    parallel, one block per r in the SCC:
        for each recursive clause of r and each body atom a_j in the SCC,
        translate the clause with
            head        →  @new_r
            a_j         →  @delta_{rel(a_j)}
            ∀ k > j     →  ¬ @delta_{rel(a_k)}     (no double counting)
        and ¬ head in the body, keeping only novel tuples
    exit when every @new_r is empty
    update, per r:  r ⊕= @new_r;  swap(@delta_r, @new_r);  clear @new_r
postamble:  drop all @delta_r and @new_r
```

Ordering within one iteration is unspecified --- each worker writes a
relation it uniquely owns --- and the barrier at the end of the parallel
block sequences the iterations.
*/

use crate::ast::mapper::{self, ArgumentMapper};
use crate::ast::{Argument, Clause, Literal, RelationName, Relation};
use crate::ram::{Condition, Stmt};
use crate::translate::{flat_name, Translator};
use crate::types::err::{self};

/// Names the unnamed variables of the positive body atoms, so clones of the
/// atoms used for delta-exclusion share variable identity.
pub(super) fn name_unnamed_variables(clause: &mut Clause) {
    struct Instantiate {
        counter: usize,
    }
    impl ArgumentMapper for Instantiate {
        fn map_argument(&mut self, arg: Argument) -> Argument {
            match arg {
                Argument::Unnamed { loc } => {
                    self.counter += 1;
                    Argument::Variable {
                        name: format!("+unnamed{}", self.counter),
                        loc,
                    }
                }
                other => mapper::descend(other, self),
            }
        }
    }

    let mut instantiate = Instantiate { counter: 0 };
    for literal in clause.body.iter_mut() {
        if let Literal::Atom(atom) = literal {
            mapper::map_atom(atom, &mut instantiate);
        }
    }
}

impl Translator<'_> {
    pub(super) fn translate_recursive_scc(
        &self,
        members: &[RelationName],
    ) -> Result<Option<Stmt>, err::TranslateError> {
        let in_scc = |name: &RelationName| members.contains(name);
        let delta_name = |name: &RelationName| {
            RelationName::new(format!("@delta_{}", flat_name(name)))
        };
        let new_name =
            |name: &RelationName| RelationName::new(format!("@new_{}", flat_name(name)));

        let mut preamble: Option<Stmt> = None;
        let mut updates: Vec<Stmt> = Vec::default();
        let mut postamble: Option<Stmt> = None;

        for name in members {
            let relation: &Relation = self.relation(name)?;
            let flat = flat_name(name);
            let rrel = self.ram_relation(relation);
            let delta = self.temp_relation(relation, &format!("delta_{flat}"));
            let new = self.temp_relation(relation, &format!("new_{flat}"));

            // seed: the non-recursive clauses, copied into the delta
            if let Some(non_recursive) = self.translate_non_recursive_relation(relation)? {
                Stmt::append(&mut preamble, non_recursive);
            }
            Stmt::append(
                &mut preamble,
                Stmt::Merge {
                    target: delta.clone(),
                    source: rrel.clone(),
                },
            );

            let mut update = Stmt::Sequence(vec![
                Stmt::Merge {
                    target: rrel.clone(),
                    source: new.clone(),
                },
                Stmt::Swap {
                    first: delta.clone(),
                    second: new.clone(),
                },
                Stmt::Clear(new.clone()),
            ]);
            if self.config.profile.value {
                update = Stmt::LogTimer {
                    label: format!("@c-recursive-relation;{};{};", relation.name, relation.loc),
                    inner: Box::new(update),
                };
            }
            updates.push(update);

            Stmt::append(&mut postamble, Stmt::Drop(delta));
            Stmt::append(&mut postamble, Stmt::Drop(new));
        }

        // one parallel block entry per relation of the SCC
        let mut blocks: Vec<Stmt> = Vec::default();
        for name in members {
            let relation = self.relation(name)?;
            let new = self.temp_relation(relation, &format!("new_{}", flat_name(name)));
            let mut block: Option<Stmt> = None;

            for &key in relation.clause_keys() {
                if !self.recursive_clause(key) {
                    continue;
                }
                let clause = self.program.clause(key);

                let mut version = 0usize;
                let atoms = clause.body_atoms();
                for (position, atom) in atoms.iter().enumerate() {
                    if !in_scc(&atom.name) {
                        continue;
                    }

                    // rewrite: head into new, the chosen atom into delta,
                    // novelty and delta-exclusion negations appended
                    let mut versioned = clause.clone();
                    versioned.head.name = new_name(name);
                    let mut atom_occurrence = 0usize;
                    for literal in versioned.body.iter_mut() {
                        if let Literal::Atom(body_atom) = literal {
                            if atom_occurrence == position {
                                body_atom.name = delta_name(&atom.name);
                            }
                            atom_occurrence += 1;
                        }
                    }
                    versioned
                        .body
                        .push(Literal::negation(clause.head.clone()));
                    name_unnamed_variables(&mut versioned);
                    let snapshot: Vec<_> = versioned
                        .body_atoms()
                        .into_iter()
                        .cloned()
                        .collect();
                    for (later_position, later) in
                        atoms.iter().enumerate().skip(position + 1)
                    {
                        if in_scc(&later.name) {
                            let mut excluded = snapshot[later_position].clone();
                            excluded.name = delta_name(&later.name);
                            versioned.body.push(Literal::negation(excluded));
                        }
                    }

                    let mut rule = self.translate_clause(&versioned, version, false)?;

                    if self.config.profile.value {
                        let label = format!(
                            "recursive-rule;{};{version};{};{clause};",
                            relation.name, clause.loc
                        );
                        rule = Stmt::Sequence(vec![
                            Stmt::LogTimer {
                                label: format!("@t-{label}"),
                                inner: Box::new(rule),
                            },
                            Stmt::LogSize {
                                relation: new.clone(),
                                label: format!("@n-{label}"),
                            },
                        ]);
                    }
                    rule = Stmt::DebugInfo {
                        message: format!("{clause}\nin file {}", clause.loc),
                        inner: Box::new(rule),
                    };
                    Stmt::append(&mut block, rule);
                    version += 1;
                }
            }

            if let Some(mut block) = block {
                if self.config.profile.value {
                    let label =
                        format!("recursive-relation;{};{};", relation.name, relation.loc);
                    let mut wrapped = Some(Stmt::LogTimer {
                        label: format!("@t-{label}"),
                        inner: Box::new(block),
                    });
                    Stmt::append(
                        &mut wrapped,
                        Stmt::LogSize {
                            relation: new.clone(),
                            label: format!("@n-{label}"),
                        },
                    );
                    block = wrapped.expect("the timer was just appended");
                }
                blocks.push(block);
            }
        }

        // the exit condition: every new relation is empty
        let mut exit: Option<Condition> = None;
        for name in members {
            let relation = self.relation(name)?;
            let new = self.temp_relation(relation, &format!("new_{}", flat_name(name)));
            Condition::conjoin(&mut exit, Condition::Empty(new));
        }

        let mut result: Option<Stmt> = preamble;
        if let (Some(exit), false) = (exit, blocks.is_empty()) {
            Stmt::append(
                &mut result,
                Stmt::Loop(vec![
                    Stmt::Parallel(blocks),
                    Stmt::Exit(exit),
                    Stmt::Sequence(updates),
                ]),
            );
        }
        if let Some(postamble) = postamble {
            Stmt::append(&mut result, postamble);
        }
        Ok(result)
    }

    fn recursive_clause(&self, key: crate::ast::ClauseKey) -> bool {
        self.recursive.recursive(key)
    }
}
