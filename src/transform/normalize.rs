/*!
Constraint normalization.

Prepares clauses for the magic-set transform: constants sitting in argument
positions of body atoms are replaced by fresh variables bound through
equality constraints, and unnamed variables in positive contexts get names.
Synthesized names carry the reserved `+` prefix, so they can never collide
with --- or be mistaken for --- user variables.

Facts are left untouched, and so are unnamed variables under negation (a
name there would be an ungrounded variable).
*/

use crate::ast::{Argument, Atom, Clause, Literal};
use crate::context::TranslationUnit;
use crate::transform::Transform;

#[derive(Default)]
pub struct NormalizeConstraints {
    counter: usize,
}

impl NormalizeConstraints {
    // Replaces top-level constants of the atom, collecting the binding
    // constraints; optionally names unnamed variables.
    fn normalize_atom(
        &mut self,
        atom: &mut Atom,
        name_unnamed: bool,
        bindings: &mut Vec<Literal>,
        changed: &mut bool,
    ) {
        for slot in atom.args.iter_mut() {
            match slot {
                Argument::Number { .. } | Argument::Text { .. } => {
                    self.counter += 1;
                    let variable = Argument::var(format!("+bind{}", self.counter));
                    let constant = std::mem::replace(slot, variable.clone());
                    bindings.push(Literal::constraint(
                        crate::ast::ConstraintOp::Eq,
                        variable,
                        constant,
                    ));
                    *changed = true;
                }
                Argument::Unnamed { .. } if name_unnamed => {
                    self.counter += 1;
                    *slot = Argument::var(format!("+under{}", self.counter));
                    *changed = true;
                }
                Argument::Aggregate { body, .. } => {
                    for literal in body.iter_mut() {
                        if let Literal::Atom(inner) = literal {
                            self.normalize_atom(inner, name_unnamed, bindings, changed);
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

impl Transform for NormalizeConstraints {
    fn name(&self) -> &'static str {
        "normalize-constraints"
    }

    fn transform(&mut self, tu: &mut TranslationUnit) -> bool {
        let mut changed = false;
        for key in tu.program.clause_keys() {
            let clause = tu.program.clause(key);
            if clause.is_fact() {
                continue;
            }

            let mut rewritten: Clause = clause.clone();
            let mut bindings = Vec::default();
            let mut clause_changed = false;

            for literal in rewritten.body.iter_mut() {
                match literal {
                    Literal::Atom(atom) => {
                        self.normalize_atom(atom, true, &mut bindings, &mut clause_changed)
                    }
                    Literal::Negation { atom, .. } => {
                        self.normalize_atom(atom, false, &mut bindings, &mut clause_changed)
                    }
                    Literal::Constraint { lhs, rhs, .. } => {
                        for side in [lhs, rhs] {
                            if let Argument::Aggregate { body, .. } = &mut **side {
                                for inner in body.iter_mut() {
                                    if let Literal::Atom(atom) = inner {
                                        self.normalize_atom(
                                            atom,
                                            true,
                                            &mut bindings,
                                            &mut clause_changed,
                                        );
                                    }
                                }
                            }
                        }
                    }
                    Literal::Bool { .. } => {}
                }
            }

            if clause_changed {
                rewritten.body.extend(bindings);
                tu.program.replace_clause(key, rewritten);
                changed = true;
            }
        }
        changed
    }
}
