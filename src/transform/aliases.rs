/*!
Alias resolution.

Per clause, three steps:

1. Unify the equality constraints of the clause (Robinson style: equal
   records decompose component-wise, equations are swapped to put the
   variable on the left, pairs failing the occurs check are skipped) and
   apply the resulting substitution to the whole clause.
2. Drop trivial `t = t` constraints from the body.
3. Re-introduce temporary variables for functor terms sitting in argument
   slots of body atoms, so downstream passes see only variables and
   constants there, with the functor moved into an equality constraint.
*/

use std::collections::BTreeMap;

use crate::ast::mapper::{self, ArgumentMapper};
use crate::ast::visit::visit_argument;
use crate::ast::{Argument, Clause, ConstraintOp, Literal};
use crate::context::TranslationUnit;
use crate::transform::Transform;

#[derive(Default)]
pub struct ResolveAliases;

impl Transform for ResolveAliases {
    fn name(&self) -> &'static str {
        "resolve-aliases"
    }

    fn transform(&mut self, tu: &mut TranslationUnit) -> bool {
        let mut changed = false;
        for key in tu.program.clause_keys() {
            let original = tu.program.clause(key).clone();

            let mut clause = resolve_aliases(&original);
            clause = remove_trivial_equality(&clause);
            remove_complex_terms_in_atoms(&mut clause);

            if clause != original {
                tu.program.replace_clause(key, clause);
                changed = true;
            }
        }
        changed
    }
}

/// A substitution from variable names to terms.
#[derive(Default)]
struct Substitution {
    map: BTreeMap<String, Argument>,
}

struct Apply<'a>(&'a BTreeMap<String, Argument>);

impl ArgumentMapper for Apply<'_> {
    fn map_argument(&mut self, arg: Argument) -> Argument {
        if let Argument::Variable { name, .. } = &arg {
            if let Some(term) = self.0.get(name) {
                return term.clone();
            }
        }
        mapper::descend(arg, self)
    }
}

impl Substitution {
    fn of(name: &str, term: &Argument) -> Self {
        Substitution {
            map: BTreeMap::from([(name.to_string(), term.clone())]),
        }
    }

    fn apply(&self, arg: Argument) -> Argument {
        Apply(&self.map).map_argument(arg)
    }

    fn apply_clause(&self, clause: &mut Clause) {
        mapper::map_clause(clause, &mut Apply(&self.map));
    }

    /// Appends another substitution, to be applied after this one.
    fn append(&mut self, other: &Substitution) {
        for term in self.map.values_mut() {
            let taken = std::mem::replace(term, Argument::unnamed());
            *term = other.apply(taken);
        }
        for (name, term) in &other.map {
            self.map.entry(name.clone()).or_insert_with(|| term.clone());
        }
    }
}

// Collects every equality constraint of the clause, aggregator bodies
// included.
fn collect_equalities(clause: &Clause) -> Vec<(Argument, Argument)> {
    fn from_literals(literals: &[Literal], out: &mut Vec<(Argument, Argument)>) {
        for literal in literals {
            if let Literal::Constraint {
                op: ConstraintOp::Eq,
                lhs,
                rhs,
                ..
            } = literal
            {
                out.push(((**lhs).clone(), (**rhs).clone()));
            }
            crate::ast::visit::visit_literal_arguments(literal, &mut |arg| {
                if let Argument::Aggregate { body, .. } = arg {
                    from_literals(body, out);
                }
            });
        }
    }

    let mut out = Vec::default();
    from_literals(&clause.body, &mut out);
    out
}

fn occurs(var: &Argument, term: &Argument) -> bool {
    let mut found = false;
    visit_argument(term, &mut |nested| {
        found |= nested == var;
    });
    found
}

fn resolve_aliases(clause: &Clause) -> Clause {
    let mut equations = collect_equalities(clause);
    let mut substitution = Substitution::default();

    let extend = |substitution: &mut Substitution,
                      equations: &mut Vec<(Argument, Argument)>,
                      name: &str,
                      term: &Argument| {
        let step = Substitution::of(name, term);
        for (lhs, rhs) in equations.iter_mut() {
            let taken = std::mem::replace(lhs, Argument::unnamed());
            *lhs = step.apply(taken);
            let taken = std::mem::replace(rhs, Argument::unnamed());
            *rhs = step.apply(taken);
        }
        substitution.append(&step);
    };

    while let Some((lhs, rhs)) = equations.pop() {
        // t = t
        if lhs == rhs {
            continue;
        }

        // [..] = [..] decomposes
        if let (Argument::Record { args: left, .. }, Argument::Record { args: right, .. }) =
            (&lhs, &rhs)
        {
            if left.len() == right.len() {
                for (l, r) in left.iter().zip(right.iter()) {
                    equations.push((l.clone(), r.clone()));
                }
            }
            continue;
        }

        match (lhs.is_variable(), rhs.is_variable()) {
            (false, false) => continue,
            (true, _) => {
                let name = lhs.variable_name().expect("checked variable").to_string();
                if occurs(&lhs, &rhs) {
                    continue;
                }
                extend(&mut substitution, &mut equations, &name, &rhs);
            }
            (false, true) => {
                // t = v swaps
                equations.push((rhs, lhs));
            }
        }
    }

    let mut resolved = clause.clone();
    substitution.apply_clause(&mut resolved);
    resolved
}

fn remove_trivial_equality(clause: &Clause) -> Clause {
    let mut result = clause.clone_head();
    for literal in &clause.body {
        if let Literal::Constraint {
            op: ConstraintOp::Eq,
            lhs,
            rhs,
            ..
        } = literal
        {
            if lhs == rhs {
                continue;
            }
        }
        result.body.push(literal.clone());
    }
    result
}

fn remove_complex_terms_in_atoms(clause: &mut Clause) {
    // collect the distinct functor terms sitting in argument slots of body atoms
    let mut terms: Vec<Argument> = Vec::default();
    for literal in &clause.body {
        if let Literal::Atom(atom) = literal {
            for arg in &atom.args {
                if arg.is_functor() && !terms.contains(arg) {
                    terms.push(arg.clone());
                }
            }
        }
    }
    if terms.is_empty() {
        return;
    }

    let replacements: Vec<(Argument, Argument)> = terms
        .into_iter()
        .enumerate()
        .map(|(index, term)| (term, Argument::var(format!("+tmp_{index}"))))
        .collect();

    struct Replace<'a>(&'a [(Argument, Argument)]);

    impl ArgumentMapper for Replace<'_> {
        fn map_argument(&mut self, arg: Argument) -> Argument {
            for (term, var) in self.0 {
                if &arg == term {
                    return var.clone();
                }
            }
            mapper::descend(arg, self)
        }
    }

    for literal in clause.body.iter_mut() {
        if let Literal::Atom(atom) = literal {
            mapper::map_atom(atom, &mut Replace(&replacements));
        }
    }

    for (term, var) in replacements {
        clause
            .body
            .push(Literal::constraint(ConstraintOp::Eq, var, term));
    }
}
