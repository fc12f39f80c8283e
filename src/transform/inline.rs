/*!
Relation inlining.

Relations marked `inline` are expanded at their call sites. A call site may
expand into several alternative clauses --- one per rule of the inlined
relation --- so one step of inlining turns a clause into a set of clauses,
and the pass iterates to a fixpoint. The semantic checker has rejected
cycles among inlined relations, so the fixpoint terminates.

The moving parts:

- Heads of inlined rules are normalised first: constants become constrained
  variables, so unification only ever deals with variables, records and
  constants in argument position.
- Unnamed variables in inlined atoms are named, as an inlined body may be
  spliced several times into one clause.
- A positive inlined atom unifies against each rule head after α-renaming;
  alternatives whose unification fails are dropped. The type
  `Option<Vec<_>>` plays the role of a nullable vector: `None` means no
  inlining applies, `Some(versions)` carries the replacement alternatives.
- A negated inlined atom expands by De Morgan: the negation of a
  disjunction of conjunctions becomes every combination of one negated
  literal per conjunct.
- Aggregators distribute over the alternatives: min of mins, max of maxes,
  count and sum as sums of the per-alternative aggregators.
*/

use std::collections::BTreeSet;

use crate::ast::mapper::{self, ArgumentMapper, VariableRenamer};
use crate::ast::{
    AggregateOp, Argument, Atom, BinaryOp, Clause, ConstraintOp, Literal, Program,
};
use crate::context::TranslationUnit;
use crate::misc::log::targets;
use crate::transform::Transform;

#[derive(Default)]
pub struct InlineRelations {
    head_constants: usize,
    underscores: usize,
    splices: usize,
    renames: usize,
}

fn is_inlined(program: &Program, atom: &Atom) -> bool {
    program
        .relation(&atom.name)
        .map(|relation| relation.flags.inline)
        .unwrap_or(false)
}

fn contains_inlined_atom(program: &Program, clause: &Clause) -> bool {
    let mut found = false;
    let mut probe = clause.clone();
    mapper::map_atoms_in_clause(&mut probe, &mut |atom| {
        found |= is_inlined(program, atom);
    });
    found
}

impl InlineRelations {
    /// Replaces constants in the heads of inlined rules with constrained
    /// variables, simplifying unification.
    fn normalise_inlined_heads(&mut self, program: &mut Program) {
        let inlined: Vec<_> = program
            .relations()
            .filter(|relation| relation.flags.inline)
            .map(|relation| relation.name.clone())
            .collect();
        for name in inlined {
            for key in program.clauses_of(&name) {
                let mut clause = program.clause(key).clone();
                let mut constraints = Vec::default();
                for slot in clause.head.args.iter_mut() {
                    if slot.is_constant() {
                        self.head_constants += 1;
                        let variable = Argument::var(format!("+inl_c{}", self.head_constants));
                        let constant = std::mem::replace(slot, variable.clone());
                        constraints.push(Literal::constraint(ConstraintOp::Eq, variable, constant));
                    }
                }
                if !constraints.is_empty() {
                    clause.body.extend(constraints);
                    program.replace_clause(key, clause);
                }
            }
        }
    }

    /// Names every unnamed variable within atoms of inlined relations, to
    /// avoid capture when a body is spliced in more than once.
    fn name_inlined_underscores(&mut self, program: &mut Program) {
        struct NameUnnamed<'a> {
            counter: &'a mut usize,
        }
        impl ArgumentMapper for NameUnnamed<'_> {
            fn map_argument(&mut self, arg: Argument) -> Argument {
                match arg {
                    Argument::Unnamed { loc } => {
                        *self.counter += 1;
                        Argument::Variable {
                            name: format!("+inl_u{}", self.counter),
                            loc,
                        }
                    }
                    other => mapper::descend(other, self),
                }
            }
        }

        for key in program.clause_keys() {
            let mut clause = program.clause(key).clone();
            let mut changed = false;
            let inlined_names: BTreeSet<_> = program
                .relations()
                .filter(|relation| relation.flags.inline)
                .map(|relation| relation.name.clone())
                .collect();
            mapper::map_atoms_in_clause(&mut clause, &mut |atom| {
                if inlined_names.contains(&atom.name) {
                    let before = atom.args.clone();
                    let mut rename = NameUnnamed {
                        counter: &mut self.underscores,
                    };
                    mapper::map_atom(atom, &mut rename);
                    changed |= before != atom.args;
                }
            });
            if changed {
                program.replace_clause(key, clause);
            }
        }
    }

    // α-renames the variables of an inlined rule before unification.
    fn rename_for_splice(&mut self, clause: &Clause) -> Clause {
        self.splices += 1;
        let index = self.splices;
        let mut renamed = clause.clone();
        let mut renamer =
            VariableRenamer(|name: &str| Some(format!("+inl_{name}_{index}")));
        mapper::map_clause(&mut renamed, &mut renamer);
        renamed
    }

    /// Splices one rule of an inlined relation in place of the given atom.
    ///
    /// Returns the replacement body literals when the rule head unifies with
    /// the atom, plus the unification constraints; `None` when unification
    /// fails.
    fn inline_body_literals(
        &mut self,
        atom: &Atom,
        rule: &Clause,
    ) -> (Option<Vec<Literal>>, Vec<Literal>) {
        let renamed = self.rename_for_splice(rule);

        let Some(substitution) = unify_atoms(&renamed.head, atom) else {
            return (None, Vec::default());
        };

        let constraints: Vec<Literal> = substitution
            .into_iter()
            .map(|(lhs, rhs)| Literal::constraint(ConstraintOp::Eq, lhs, rhs))
            .collect();

        (Some(renamed.body.clone()), constraints)
    }

    /// The bodies replacing the negation of an inlined atom, by De Morgan.
    fn form_negated_literals(&mut self, program: &Program, atom: &Atom) -> Vec<Vec<Literal>> {
        let mut groups: Vec<Vec<Literal>> = Vec::default();
        let mut constraints: Vec<Vec<Literal>> = Vec::default();

        for key in program.clauses_of(&atom.name) {
            let (body, unification) = self.inline_body_literals(atom, program.clause(key));
            let Some(body) = body else {
                continue;
            };
            groups.push(body);
            constraints.push(unification);
        }

        let mut combinations = combine_negated_literals(&groups);
        for combination in combinations.iter_mut() {
            for group in &constraints {
                combination.extend(group.iter().cloned());
            }
        }
        combinations
    }

    fn rename_uniquely(&mut self, arg: Argument) -> Argument {
        self.renames += 1;
        let index = self.renames;
        let mut renamer = VariableRenamer(|name: &str| Some(format!("{name}-v{index}")));
        renamer.map_argument(arg)
    }

    // Folds per-alternative aggregators into one argument with the given
    // binary operator.
    fn combine_aggregators(&mut self, mut aggregators: Vec<Argument>, op: BinaryOp) -> Argument {
        let first = self.rename_uniquely(aggregators.remove(0));
        if aggregators.is_empty() {
            return first;
        }
        let rest = self.combine_aggregators(aggregators, op);
        Argument::binary(op, first, rest)
    }

    /// One step of inlining within an argument; `None` when nothing applies.
    fn inlined_argument(
        &mut self,
        program: &Program,
        arg: &Argument,
    ) -> Option<Vec<Argument>> {
        match arg {
            Argument::Aggregate {
                op,
                target,
                body,
                loc,
            } => {
                // the target expression first
                if let Some(target_arg) = target {
                    if let Some(versions) = self.inlined_argument(program, target_arg) {
                        return Some(
                            versions
                                .into_iter()
                                .map(|new_target| Argument::Aggregate {
                                    op: *op,
                                    target: Some(Box::new(new_target)),
                                    body: body.clone(),
                                    loc: loc.clone(),
                                })
                                .collect(),
                        );
                    }
                }

                // then one body literal at a time
                for (index, literal) in body.iter().enumerate() {
                    let Some(versions) = self.inlined_literal(program, literal) else {
                        continue;
                    };

                    let mut alternatives = Vec::with_capacity(versions.len());
                    for replacement in versions {
                        let mut new_body: Vec<Literal> = Vec::default();
                        for (other_index, other) in body.iter().enumerate() {
                            if other_index != index {
                                new_body.push(other.clone());
                            }
                        }
                        new_body.extend(replacement);
                        alternatives.push(Argument::Aggregate {
                            op: *op,
                            target: target.clone(),
                            body: new_body,
                            loc: loc.clone(),
                        });
                    }

                    let combined = match op {
                        AggregateOp::Min => self.combine_aggregators(alternatives, BinaryOp::Min),
                        AggregateOp::Max => self.combine_aggregators(alternatives, BinaryOp::Max),
                        AggregateOp::Count | AggregateOp::Sum => {
                            self.combine_aggregators(alternatives, BinaryOp::Add)
                        }
                    };
                    return Some(vec![combined]);
                }
                None
            }
            Argument::Unary { op, arg, loc } => {
                let versions = self.inlined_argument(program, arg)?;
                Some(
                    versions
                        .into_iter()
                        .map(|new_arg| Argument::Unary {
                            op: *op,
                            arg: Box::new(new_arg),
                            loc: loc.clone(),
                        })
                        .collect(),
                )
            }
            Argument::Binary { op, lhs, rhs, loc } => {
                if let Some(versions) = self.inlined_argument(program, lhs) {
                    return Some(
                        versions
                            .into_iter()
                            .map(|new_lhs| Argument::Binary {
                                op: *op,
                                lhs: Box::new(new_lhs),
                                rhs: rhs.clone(),
                                loc: loc.clone(),
                            })
                            .collect(),
                    );
                }
                let versions = self.inlined_argument(program, rhs)?;
                Some(
                    versions
                        .into_iter()
                        .map(|new_rhs| Argument::Binary {
                            op: *op,
                            lhs: lhs.clone(),
                            rhs: Box::new(new_rhs),
                            loc: loc.clone(),
                        })
                        .collect(),
                )
            }
            Argument::Ternary {
                op,
                first,
                second,
                third,
                loc,
            } => {
                for index in 0..3 {
                    let operand = [first, second, third][index];
                    let Some(versions) = self.inlined_argument(program, operand) else {
                        continue;
                    };
                    return Some(
                        versions
                            .into_iter()
                            .map(|new_operand| {
                                let mut parts =
                                    [first.clone(), second.clone(), third.clone()];
                                parts[index] = Box::new(new_operand);
                                let [first, second, third] = parts;
                                Argument::Ternary {
                                    op: *op,
                                    first,
                                    second,
                                    third,
                                    loc: loc.clone(),
                                }
                            })
                            .collect(),
                    );
                }
                None
            }
            Argument::Record { args, loc } => {
                for (index, element) in args.iter().enumerate() {
                    let Some(versions) = self.inlined_argument(program, element) else {
                        continue;
                    };
                    return Some(
                        versions
                            .into_iter()
                            .map(|new_element| {
                                let mut new_args = args.clone();
                                new_args[index] = new_element;
                                Argument::Record {
                                    args: new_args,
                                    loc: loc.clone(),
                                }
                            })
                            .collect(),
                    );
                }
                None
            }
            _ => None,
        }
    }

    /// One step of inlining within an atom not itself inlined.
    fn inlined_atom(&mut self, program: &Program, atom: &Atom) -> Option<Vec<Atom>> {
        for (index, arg) in atom.args.iter().enumerate() {
            let Some(versions) = self.inlined_argument(program, arg) else {
                continue;
            };
            return Some(
                versions
                    .into_iter()
                    .map(|new_arg| {
                        let mut new_atom = atom.clone();
                        new_atom.args[index] = new_arg;
                        new_atom
                    })
                    .collect(),
            );
        }
        None
    }

    /// One step of inlining on a literal.
    ///
    /// `Some(bodies)` carries the alternative bodies replacing the literal;
    /// `None` means the literal does not depend on any inlined relation.
    fn inlined_literal(
        &mut self,
        program: &Program,
        literal: &Literal,
    ) -> Option<Vec<Vec<Literal>>> {
        match literal {
            Literal::Atom(atom) => {
                if is_inlined(program, atom) {
                    let mut bodies = Vec::default();
                    for key in program.clauses_of(&atom.name) {
                        let (body, constraints) =
                            self.inline_body_literals(atom, program.clause(key));
                        let Some(mut body) = body else {
                            continue;
                        };
                        body.extend(constraints);
                        bodies.push(body);
                    }
                    return Some(bodies);
                }
                let versions = self.inlined_atom(program, atom)?;
                Some(
                    versions
                        .into_iter()
                        .map(|new_atom| vec![Literal::Atom(new_atom)])
                        .collect(),
                )
            }
            Literal::Negation { atom, loc } => {
                if is_inlined(program, atom) {
                    if program.clauses_of(&atom.name).is_empty() {
                        // no rules: the negation holds trivially
                        return Some(vec![vec![Literal::constraint(
                            ConstraintOp::Eq,
                            Argument::number(1),
                            Argument::number(1),
                        )]]);
                    }
                    return Some(self.form_negated_literals(program, atom));
                }
                let versions = self.inlined_atom(program, atom)?;
                Some(
                    versions
                        .into_iter()
                        .map(|new_atom| {
                            vec![Literal::Negation {
                                atom: new_atom,
                                loc: loc.clone(),
                            }]
                        })
                        .collect(),
                )
            }
            Literal::Constraint { op, lhs, rhs, loc } => {
                if let Some(versions) = self.inlined_argument(program, lhs) {
                    return Some(
                        versions
                            .into_iter()
                            .map(|new_lhs| {
                                vec![Literal::Constraint {
                                    op: *op,
                                    lhs: Box::new(new_lhs),
                                    rhs: rhs.clone(),
                                    loc: loc.clone(),
                                }]
                            })
                            .collect(),
                    );
                }
                let versions = self.inlined_argument(program, rhs)?;
                Some(
                    versions
                        .into_iter()
                        .map(|new_rhs| {
                            vec![Literal::Constraint {
                                op: *op,
                                lhs: lhs.clone(),
                                rhs: Box::new(new_rhs),
                                loc: loc.clone(),
                            }]
                        })
                        .collect(),
                )
            }
            Literal::Bool { .. } => None,
        }
    }

    /// The clauses replacing the given clause after one step of inlining.
    fn inlined_clause(&mut self, program: &Program, clause: &Clause) -> Option<Vec<Clause>> {
        // arguments of the head first
        if let Some(head_versions) = self.inlined_atom(program, &clause.head) {
            return Some(
                head_versions
                    .into_iter()
                    .map(|new_head| {
                        let mut new_clause = clause.clone();
                        new_clause.head = new_head;
                        new_clause
                    })
                    .collect(),
            );
        }

        // then one body literal
        for (index, literal) in clause.body.iter().enumerate() {
            let Some(bodies) = self.inlined_literal(program, literal) else {
                continue;
            };
            let mut versions = Vec::with_capacity(bodies.len());
            for body in bodies {
                let mut new_clause = clause.clone_head();
                // the splice invalidates any atom-order plan
                new_clause.plan = None;
                new_clause.fixed_plan = false;
                for (other_index, other) in clause.body.iter().enumerate() {
                    if other_index != index {
                        new_clause.body.push(other.clone());
                    }
                }
                new_clause.body.extend(body);
                versions.push(new_clause);
            }
            return Some(versions);
        }
        None
    }
}

impl Transform for InlineRelations {
    fn name(&self) -> &'static str {
        "inline-relations"
    }

    fn transform(&mut self, tu: &mut TranslationUnit) -> bool {
        let program = &mut tu.program;
        if !program.relations().any(|relation| relation.flags.inline) {
            return false;
        }

        self.normalise_inlined_heads(program);
        self.name_inlined_underscores(program);

        let mut changed = false;
        loop {
            let mut round_changed = false;
            for name in program.relation_names() {
                let Some(relation) = program.relation(&name) else {
                    continue;
                };
                if relation.flags.inline {
                    continue;
                }
                for key in program.clauses_of(&name) {
                    let clause = program.clause(key).clone();
                    if !contains_inlined_atom(program, &clause) {
                        continue;
                    }
                    let Some(replacements) = self.inlined_clause(program, &clause) else {
                        continue;
                    };
                    log::debug!(
                        target: targets::INLINE,
                        "{} expands into {} clause(s)",
                        clause,
                        replacements.len()
                    );
                    program.remove_clause(key);
                    for replacement in replacements {
                        program.add_clause(replacement);
                    }
                    round_changed = true;
                    changed = true;
                }
            }
            if !round_changed {
                break;
            }
        }

        // inlined relations have no remaining uses
        if changed {
            for name in program.relation_names() {
                let inline = program
                    .relation(&name)
                    .map(|relation| relation.flags.inline)
                    .unwrap_or(false);
                if inline {
                    program.remove_relation(&name);
                }
            }
        }
        changed
    }
}

// -- unification --

// Reduces argument pairs to a unifier; `None` when the pairs are
// incompatible.
fn reduce_substitution(
    mut pairs: Vec<(Argument, Argument)>,
) -> Option<Vec<(Argument, Argument)>> {
    let mut done = false;
    while !done {
        done = true;
        let mut index = 0;
        while index < pairs.len() {
            let (lhs, rhs) = &pairs[index];
            if lhs == rhs {
                pairs.remove(index);
                done = false;
                continue;
            }
            if lhs.is_constant() && rhs.is_constant() {
                // distinct constants never unify
                return None;
            }
            if let (Argument::Record { args: left, .. }, Argument::Record { args: right, .. }) =
                (lhs, rhs)
            {
                if left.len() != right.len() {
                    return None;
                }
                let mut decomposed: Vec<(Argument, Argument)> = left
                    .iter()
                    .cloned()
                    .zip(right.iter().cloned())
                    .collect();
                pairs.remove(index);
                pairs.append(&mut decomposed);
                done = false;
                continue;
            }
            let record_constant = matches!(lhs, Argument::Record { .. }) && rhs.is_constant()
                || lhs.is_constant() && matches!(rhs, Argument::Record { .. });
            if record_constant {
                return None;
            }
            index += 1;
        }
    }
    Some(pairs)
}

/// The substitution unifying two atoms of the same relation, if one exists.
fn unify_atoms(first: &Atom, second: &Atom) -> Option<Vec<(Argument, Argument)>> {
    let pairs: Vec<(Argument, Argument)> = first
        .args
        .iter()
        .cloned()
        .zip(second.args.iter().cloned())
        .collect();
    reduce_substitution(pairs)
}

/// The negated version of a literal.
fn negate_literal(literal: &Literal) -> Literal {
    match literal {
        Literal::Atom(atom) => Literal::negation(atom.clone()),
        Literal::Negation { atom, .. } => Literal::Atom(atom.clone()),
        Literal::Constraint { op, lhs, rhs, loc } => Literal::Constraint {
            op: op.negated(),
            lhs: lhs.clone(),
            rhs: rhs.clone(),
            loc: loc.clone(),
        },
        Literal::Bool { value, loc } => Literal::Bool {
            value: !value,
            loc: loc.clone(),
        },
    }
}

/// The negation of a disjunction of conjunctions: every combination of one
/// negated literal per conjunct.
fn combine_negated_literals(groups: &[Vec<Literal>]) -> Vec<Vec<Literal>> {
    let Some((first, rest)) = groups.split_first() else {
        return Vec::default();
    };

    if rest.is_empty() {
        return first
            .iter()
            .map(|literal| vec![negate_literal(literal)])
            .collect();
    }

    let combined_rest = combine_negated_literals(rest);
    let mut combinations = Vec::default();
    for literal in first {
        for suffix in &combined_rest {
            let mut combination = vec![negate_literal(literal)];
            combination.extend(suffix.iter().cloned());
            combinations.push(combination);
        }
    }
    combinations
}
