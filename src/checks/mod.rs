/*!
The semantic checker.

Runs before any rewriting. On acceptance the global invariants hold: atoms
resolve with matching arity, head and negated variables are grounded, facts
are ground, every argument has a non-empty type set, and negation and
aggregation close no cycle. On rejection, diagnostics with source locations
land in the report and the program is left untouched.

The checker never mutates the AST; it is a [Transform] only so it slots into
the pipeline, and always reports "no change".
*/

mod plan;
pub use plan::ExecutionPlanChecker;

mod witness;

use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::ground::grounded_terms;
use crate::analysis::precedence::{PrecedenceGraph, RecursiveClauses, SccGraph};
use crate::analysis::typing::{analyse_types, TypeEnv, TypeKind, TypeSolution};
use crate::ast::visit::{has_unnamed_outside_aggregate, visit_clause_arguments, MentionKind};
use crate::ast::{Argument, Atom, Clause, Literal, Program, Relation, RelationName, TypeDecl};
use crate::context::TranslationUnit;
use crate::reports::{Diagnostic, DiagnosticMessage, ErrorReport, Severity, SrcLocation};
use crate::transform::Transform;

#[derive(Default)]
pub struct SemanticChecker;

impl Transform for SemanticChecker {
    fn name(&self) -> &'static str {
        "semantic-checker"
    }

    fn transform(&mut self, tu: &mut TranslationUnit) -> bool {
        let program = &tu.program;
        let report = &mut tu.report;

        let env = TypeEnv::build(program);
        let precedence = PrecedenceGraph::build(program);
        let sccs = SccGraph::build(&precedence);
        let recursive = RecursiveClauses::compute(program);

        check_types(report, program);
        check_relations(report, program, &env, &recursive);
        check_namespaces(report, program);
        check_io_directives(report, program);
        check_groundedness(report, program);
        check_typing(report, program, &env);
        witness::check_witness_problem(report, program);
        check_inlining(report, program, &precedence);
        check_stratification(report, program, &precedence, &sccs);

        false
    }
}

// -- types --

fn type_resolves(program: &Program, name: &str) -> bool {
    name == "number" || name == "symbol" || program.get_type(name).is_some()
}

fn check_types(report: &mut ErrorReport, program: &Program) {
    for decl in program.types() {
        match decl {
            TypeDecl::Union { name, members, loc } => {
                for member in members {
                    if !type_resolves(program, member) {
                        report.add_error(
                            format!(
                                "Undefined type {member} in definition of union type {name}"
                            ),
                            loc.clone(),
                        );
                    }
                }
            }
            TypeDecl::Record { name, fields, loc } => {
                for field in fields {
                    if !type_resolves(program, &field.type_name) {
                        report.add_error(
                            format!(
                                "Undefined type {} in definition of field {}",
                                field.type_name, field.name
                            ),
                            loc.clone(),
                        );
                    }
                }
                for (index, field) in fields.iter().enumerate() {
                    if fields[..index].iter().any(|other| other.name == field.name) {
                        report.add_error(
                            format!(
                                "Doubly defined field name {} in definition of type {name}",
                                field.name
                            ),
                            loc.clone(),
                        );
                    }
                }
            }
            TypeDecl::Primitive { .. } => {}
        }
    }
}

// -- relations and clauses --

fn check_relations(
    report: &mut ErrorReport,
    program: &Program,
    env: &TypeEnv,
    recursive: &RecursiveClauses,
) {
    for relation in program.relations() {
        check_relation(report, program, env, recursive, relation);
    }
    for clause in program.orphan_clauses() {
        check_clause(report, program, clause, false);
    }
}

fn check_relation(
    report: &mut ErrorReport,
    program: &Program,
    env: &TypeEnv,
    recursive: &RecursiveClauses,
    relation: &Relation,
) {
    if relation.flags.eqrel {
        if relation.arity() == 2 {
            if relation.attributes[0].type_name != relation.attributes[1].type_name {
                report.add_error(
                    format!(
                        "Domains of equivalence relation {} are different",
                        relation.name
                    ),
                    relation.loc.clone(),
                );
            }
        } else {
            report.add_error(
                format!("Equivalence relation {} is not binary", relation.name),
                relation.loc.clone(),
            );
        }
    }

    for (index, attribute) in relation.attributes.iter().enumerate() {
        if !type_resolves(program, &attribute.type_name) {
            report.add_error(
                format!(
                    "Undefined type in attribute {}:{}",
                    attribute.name, attribute.type_name
                ),
                attribute.loc.clone(),
            );
        }

        if relation.attributes[..index]
            .iter()
            .any(|other| other.name == attribute.name)
        {
            report.add_error(
                format!(
                    "Doubly defined attribute name {}:{}",
                    attribute.name, attribute.type_name
                ),
                attribute.loc.clone(),
            );
        }

        if env.kind_of(&attribute.type_name) == Some(TypeKind::Record) {
            if relation.flags.input {
                report.add_error(
                    format!(
                        "Input relations must not have record types. Attribute {} has record type {}",
                        attribute.name, attribute.type_name
                    ),
                    attribute.loc.clone(),
                );
            }
            if relation.flags.output {
                report.add_warning(
                    format!(
                        "Record types in output relations are not printed verbatim: attribute {} has record type {}",
                        attribute.name, attribute.type_name
                    ),
                    attribute.loc.clone(),
                );
            }
        }
    }

    for &key in relation.clause_keys() {
        let clause = program.clause(key);
        check_clause(report, program, clause, recursive.recursive(key));
    }

    if relation.clause_keys().is_empty() && !relation.flags.input {
        report.add_warning(
            format!("No rules/facts defined for relation {}", relation.name),
            relation.loc.clone(),
        );
    }
}

fn check_clause(report: &mut ErrorReport, program: &Program, clause: &Clause, recursive: bool) {
    check_atom(report, program, &clause.head);

    if clause.head.args.iter().any(has_unnamed_outside_aggregate) {
        report.add_error("Underscore in head of rule", clause.head.loc.clone());
    }

    for literal in &clause.body {
        check_literal(report, program, literal);
    }

    if clause.is_fact() {
        for arg in &clause.head.args {
            check_constant(report, arg);
        }
    }

    // variables used exactly once are usually typos
    if !clause.generated {
        let mut counts: BTreeMap<&str, (usize, &SrcLocation)> = BTreeMap::default();
        visit_clause_arguments(clause, &mut |arg| {
            if let Argument::Variable { name, loc } = arg {
                counts.entry(name).or_insert((0, loc)).0 += 1;
            }
        });
        for (name, (count, loc)) in counts {
            if count == 1 && !name.starts_with('_') && !name.starts_with('+') {
                report.add_warning(format!("Variable {name} only occurs once"), loc.clone());
            }
        }
    }

    if let Some(plan) = &clause.plan {
        let atom_count = clause.body_atoms().len();
        for order in plan.orders.values() {
            if order.positions.len() != atom_count || !order.is_complete() {
                report.add_error("Invalid execution plan", order.loc.clone());
            }
        }
    }

    if recursive {
        visit_clause_arguments(clause, &mut |arg| {
            if let Argument::Counter { loc } = arg {
                report.add_error("Auto-increment functor in a recursive rule", loc.clone());
            }
        });
    }
}

fn check_atom(report: &mut ErrorReport, program: &Program, atom: &Atom) {
    match program.relation(&atom.name) {
        None => report.add_error(
            format!("Undefined relation {}", atom.name),
            atom.loc.clone(),
        ),
        Some(relation) => {
            if relation.arity() != atom.arity() {
                report.add_error(
                    format!("Mismatching arity of relation {}", atom.name),
                    atom.loc.clone(),
                );
            }
        }
    }

    for arg in &atom.args {
        check_argument(report, program, arg);
    }
}

fn check_literal(report: &mut ErrorReport, program: &Program, literal: &Literal) {
    match literal {
        Literal::Atom(atom) => check_atom(report, program, atom),
        Literal::Negation { atom, .. } => check_atom(report, program, atom),
        Literal::Constraint { lhs, rhs, loc, .. } => {
            check_argument(report, program, lhs);
            check_argument(report, program, rhs);
            if has_unnamed_outside_aggregate(lhs) || has_unnamed_outside_aggregate(rhs) {
                report.add_error("Underscore in binary relation", loc.clone());
            }
        }
        Literal::Bool { .. } => {}
    }
}

fn check_argument(report: &mut ErrorReport, program: &Program, arg: &Argument) {
    match arg {
        Argument::Aggregate { body, .. } => {
            for literal in body {
                check_literal(report, program, literal);
            }
        }
        Argument::Unary { arg, .. } => check_argument(report, program, arg),
        Argument::Binary { lhs, rhs, .. } => {
            check_argument(report, program, lhs);
            check_argument(report, program, rhs);
        }
        Argument::Ternary {
            first,
            second,
            third,
            ..
        } => {
            check_argument(report, program, first);
            check_argument(report, program, second);
            check_argument(report, program, third);
        }
        Argument::Record { args, .. } => {
            for arg in args {
                check_argument(report, program, arg);
            }
        }
        _ => {}
    }
}

// A constant-valued arithmetic expression: numeric functors over number
// constants.
fn is_constant_arith_expr(arg: &Argument) -> bool {
    match arg {
        Argument::Number { .. } => true,
        Argument::Unary { op, arg, .. } => op.yields_number() && is_constant_arith_expr(arg),
        Argument::Binary { op, lhs, rhs, .. } => {
            op.yields_number() && is_constant_arith_expr(lhs) && is_constant_arith_expr(rhs)
        }
        Argument::Ternary {
            op,
            first,
            second,
            third,
            ..
        } => {
            op.yields_number()
                && is_constant_arith_expr(first)
                && is_constant_arith_expr(second)
                && is_constant_arith_expr(third)
        }
        _ => false,
    }
}

fn check_constant(report: &mut ErrorReport, arg: &Argument) {
    match arg {
        Argument::Variable { name, loc } => {
            report.add_error(format!("Variable {name} in fact"), loc.clone());
        }
        Argument::Unnamed { loc } => report.add_error("Underscore in fact", loc.clone()),
        Argument::Counter { loc } => report.add_error("Counter in fact", loc.clone()),
        Argument::Unary { loc, .. } | Argument::Binary { loc, .. } | Argument::Ternary { loc, .. } => {
            if !is_constant_arith_expr(arg) {
                report.add_error("Function in fact", loc.clone());
            }
        }
        Argument::Record { args, .. } => {
            for arg in args {
                check_constant(report, arg);
            }
        }
        Argument::Aggregate { loc, .. } => {
            report.add_error("Aggregator in fact", loc.clone());
        }
        Argument::Number { .. } | Argument::Text { .. } | Argument::SubroutineArg { .. } => {}
    }
}

// -- groundedness --

fn check_groundedness(report: &mut ErrorReport, program: &Program) {
    for key in program.clause_keys() {
        let clause = program.clause(key);
        if clause.is_fact() {
            continue;
        }
        let grounded = grounded_terms(clause);

        let mut reported: BTreeSet<String> = BTreeSet::default();
        visit_clause_arguments(clause, &mut |arg| {
            if let Argument::Variable { name, loc } = arg {
                if !grounded.variable(name) && reported.insert(name.clone()) {
                    report.add_error(format!("Ungrounded variable {name}"), loc.clone());
                }
            }
        });
    }
}

// -- typing --

fn check_typing(report: &mut ErrorReport, program: &Program, env: &TypeEnv) {
    for key in program.clause_keys() {
        let clause = program.clause(key);
        let solution = analyse_types(env, clause, program);
        let mut walker = TypeWalker {
            report: &mut *report,
            env,
            solution: &solution,
            next: 0,
        };
        for arg in &clause.head.args {
            walker.walk(arg);
        }
        for literal in &clause.body {
            walker.walk_literal(literal);
        }
    }
}

// Re-walks a clause in the canonical order, pairing each argument
// occurrence with its solved type set.
struct TypeWalker<'a> {
    report: &'a mut ErrorReport,
    env: &'a TypeEnv,
    solution: &'a TypeSolution,
    next: usize,
}

impl TypeWalker<'_> {
    fn is_number(&self, index: usize) -> bool {
        self.env
            .set_has_kind(self.solution.occurrence(index), TypeKind::Number)
    }

    fn is_symbol(&self, index: usize) -> bool {
        self.env
            .set_has_kind(self.solution.occurrence(index), TypeKind::Symbol)
    }

    fn walk_literal(&mut self, literal: &Literal) {
        match literal {
            Literal::Atom(atom) | Literal::Negation { atom, .. } => {
                for arg in &atom.args {
                    self.walk(arg);
                }
            }
            Literal::Constraint { op, lhs, rhs, .. } => {
                let lhs_index = self.walk(lhs);
                let rhs_index = self.walk(rhs);
                if op.numeric() {
                    if !self.is_number(lhs_index) {
                        self.report
                            .add_error("Non-numerical operand for comparison", lhs.loc().clone());
                    }
                    if !self.is_number(rhs_index) {
                        self.report
                            .add_error("Non-numerical operand for comparison", rhs.loc().clone());
                    }
                } else if op.symbolic() {
                    if !self.is_symbol(lhs_index) {
                        self.report
                            .add_error("Non-string operand for operation", lhs.loc().clone());
                    }
                    if !self.is_symbol(rhs_index) {
                        self.report
                            .add_error("Non-string operand for operation", rhs.loc().clone());
                    }
                }
            }
            Literal::Bool { .. } => {}
        }
    }

    fn walk(&mut self, arg: &Argument) -> usize {
        let index = self.next;
        self.next += 1;

        match arg {
            Argument::Variable { name, loc } => {
                if self.solution.occurrence(index).is_empty() {
                    self.report.add_error(
                        format!("Unable to deduce type for variable {name}"),
                        loc.clone(),
                    );
                }
            }
            Argument::Text { loc, .. } => {
                if !self.is_symbol(index) {
                    self.report
                        .add_error("Symbol constant (type mismatch)", loc.clone());
                }
            }
            Argument::Number { loc, .. } => {
                if !self.is_number(index) {
                    self.report
                        .add_error("Number constant (type mismatch)", loc.clone());
                }
            }
            Argument::Unary { op, arg, loc } => {
                let operand = self.walk(arg);
                let (result_ok, operand_ok) = (
                    match op.yields_number() {
                        true => self.is_number(index),
                        false => self.is_symbol(index),
                    },
                    match op.accepts_number() {
                        true => self.is_number(operand),
                        false => self.is_symbol(operand),
                    },
                );
                if !result_ok {
                    self.report
                        .add_error("Type mismatch in use of functor", loc.clone());
                }
                if !operand_ok {
                    self.report
                        .add_error("Type mismatch in functor argument", arg.loc().clone());
                }
            }
            Argument::Binary { op, lhs, rhs, loc } => {
                let lhs_index = self.walk(lhs);
                let rhs_index = self.walk(rhs);
                let result_ok = match op.yields_number() {
                    true => self.is_number(index),
                    false => self.is_symbol(index),
                };
                if !result_ok {
                    self.report
                        .add_error("Type mismatch in use of functor", loc.clone());
                }
                for (position, (side, side_index)) in
                    [(lhs, lhs_index), (rhs, rhs_index)].into_iter().enumerate()
                {
                    let ok = match op.accepts_number(position) {
                        true => self.is_number(side_index),
                        false => self.is_symbol(side_index),
                    };
                    if !ok {
                        self.report
                            .add_error("Type mismatch in functor argument", side.loc().clone());
                    }
                }
            }
            Argument::Ternary {
                op,
                first,
                second,
                third,
                loc,
            } => {
                let indices = [
                    (first, self.walk(first)),
                    (second, self.walk(second)),
                    (third, self.walk(third)),
                ];
                let result_ok = match op.yields_number() {
                    true => self.is_number(index),
                    false => self.is_symbol(index),
                };
                if !result_ok {
                    self.report
                        .add_error("Type mismatch in use of functor", loc.clone());
                }
                for (position, (side, side_index)) in indices.into_iter().enumerate() {
                    let ok = match op.accepts_number(position) {
                        true => self.is_number(side_index),
                        false => self.is_symbol(side_index),
                    };
                    if !ok {
                        self.report
                            .add_error("Type mismatch in functor argument", side.loc().clone());
                    }
                }
            }
            Argument::Record { args, loc } => {
                let solved = self.solution.occurrence(index).clone();
                if let crate::analysis::typing::TypeSet::Of(members) = &solved {
                    for member in members {
                        if let Some(fields) = self.env.record_fields(member) {
                            if fields.len() != args.len() {
                                self.report.add_error(
                                    "Wrong number of arguments given to record",
                                    loc.clone(),
                                );
                            }
                        }
                    }
                }
                for arg in args {
                    self.walk(arg);
                }
            }
            Argument::Aggregate { target, body, .. } => {
                if let Some(target) = target {
                    self.walk(target);
                }
                for literal in body {
                    self.walk_literal(literal);
                }
            }
            _ => {}
        }
        index
    }
}

// -- namespaces --

fn check_namespaces(report: &mut ErrorReport, program: &Program) {
    let mut names: BTreeMap<String, SrcLocation> = BTreeMap::default();
    for decl in program.types() {
        let name = decl.name().to_string();
        if names.contains_key(&name) {
            report.add_error(format!("Name clash on type {name}"), decl.loc().clone());
        } else {
            names.insert(name, decl.loc().clone());
        }
    }
    for relation in program.relations() {
        let name = format!("{}", relation.name);
        if names.contains_key(&name) {
            report.add_error(
                format!("Name clash on relation {name}"),
                relation.loc.clone(),
            );
        } else {
            names.insert(name, relation.loc.clone());
        }
    }
}

// -- I/O directives --

fn check_io_directives(report: &mut ErrorReport, program: &Program) {
    for directive in program.orphan_directives() {
        report.add_error(
            format!("Undefined relation {}", directive.relation),
            directive.loc.clone(),
        );
    }
}

// -- inlining --

fn check_inlining(report: &mut ErrorReport, program: &Program, precedence: &PrecedenceGraph) {
    let inlined: BTreeSet<RelationName> = program
        .relations()
        .filter(|relation| relation.flags.inline)
        .map(|relation| relation.name.clone())
        .collect();
    if inlined.is_empty() {
        return;
    }

    for name in &inlined {
        let relation = program.relation(name).expect("name comes from the program");
        if relation.flags.computed() {
            report.add_error(
                format!("Computed relation {name} cannot be inlined"),
                relation.loc.clone(),
            );
        }
        if relation.flags.input {
            report.add_error(
                format!("Input relation {name} cannot be inlined"),
                relation.loc.clone(),
            );
        }
    }

    // a cycle among inlined relations cannot terminate; tri-colour DFS
    if let Some(cycle) = find_inline_cycle(precedence, &inlined) {
        let listing = cycle
            .iter()
            .map(|name| format!("{name}"))
            .collect::<Vec<_>>()
            .join(", ");
        let loc = program
            .relation(&cycle[0])
            .map(|relation| relation.loc.clone())
            .unwrap_or_default();
        report.add_error(
            format!("Cannot inline cyclically dependent relations {{{listing}}}"),
            loc,
        );
    }

    // the counter cannot be inlined: each expansion would re-draw a value
    for key in program.clause_keys() {
        let clause = program.clause(key);
        let clause_of_inlined = inlined.contains(&clause.head.name);
        let mut check_counter_in_atom = |atom: &Atom| {
            for arg in &atom.args {
                crate::ast::visit::visit_argument(arg, &mut |nested| {
                    if let Argument::Counter { loc } = nested {
                        report.add_error(
                            "Cannot inline literal containing a counter argument '$'",
                            loc.clone(),
                        );
                    }
                });
            }
        };
        if clause_of_inlined {
            check_counter_in_atom(&clause.head);
            for atom in clause.body_atoms() {
                check_counter_in_atom(atom);
            }
        } else {
            for atom in clause.body_atoms() {
                if inlined.contains(&atom.name) {
                    check_counter_in_atom(atom);
                }
            }
        }
    }

    // negated inlined atoms must not introduce variables
    let mut non_negatable: BTreeSet<RelationName> = BTreeSet::default();
    for name in &inlined {
        'clauses: for key in program.clauses_of(name) {
            let clause = program.clause(key);
            let head_vars = crate::ast::visit::atom_variables(&clause.head);
            for literal in &clause.body {
                for var in crate::ast::visit::literal_variables(literal) {
                    if !head_vars.contains(&var) {
                        non_negatable.insert(name.clone());
                        break 'clauses;
                    }
                }
            }
        }
    }
    for key in program.clause_keys() {
        let clause = program.clause(key);
        for literal in &clause.body {
            let Literal::Negation { atom, loc } = literal else {
                continue;
            };
            if non_negatable.contains(&atom.name) {
                report.add_error(
                    "Cannot inline negated relation which may introduce new variables",
                    loc.clone(),
                );
            }
            // underscores are named during inlining, which would leave them
            // ungrounded under negation
            if inlined.contains(&atom.name)
                && atom.args.iter().any(has_unnamed_outside_aggregate)
            {
                report.add_error(
                    "Cannot inline negated atom containing an unnamed variable unless the variable is within an aggregator",
                    atom.loc.clone(),
                );
            }
        }
    }

    // aggregators of inlined atoms do not distribute faithfully
    for key in program.clause_keys() {
        visit_clause_arguments(program.clause(key), &mut |arg| {
            if let Argument::Aggregate { body, .. } = arg {
                for literal in body {
                    if let Some(atom) = literal.as_atom() {
                        if inlined.contains(&atom.name) {
                            report.add_error(
                                "Cannot inline relations that appear in aggregator",
                                atom.loc.clone(),
                            );
                        }
                    }
                }
            }
        });
    }
}

fn find_inline_cycle(
    precedence: &PrecedenceGraph,
    inlined: &BTreeSet<RelationName>,
) -> Option<Vec<RelationName>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Colour {
        Unvisited,
        Visiting,
        Done,
    }

    let mut colours: BTreeMap<&RelationName, Colour> = inlined
        .iter()
        .map(|name| (name, Colour::Unvisited))
        .collect();

    fn visit<'a>(
        current: &'a RelationName,
        precedence: &PrecedenceGraph,
        inlined: &'a BTreeSet<RelationName>,
        colours: &mut BTreeMap<&'a RelationName, Colour>,
        path: &mut Vec<RelationName>,
    ) -> Option<Vec<RelationName>> {
        colours.insert(current, Colour::Visiting);
        path.push(current.clone());
        for dependency in precedence.dependencies(current) {
            let Some(dependency) = inlined.get(&dependency) else {
                continue;
            };
            match colours[dependency] {
                Colour::Done => continue,
                Colour::Visiting => {
                    // back edge: the cycle is the path from the dependency
                    let start = path
                        .iter()
                        .position(|name| name == dependency)
                        .unwrap_or(0);
                    return Some(path[start..].to_vec());
                }
                Colour::Unvisited => {
                    if let Some(cycle) = visit(dependency, precedence, inlined, colours, path) {
                        return Some(cycle);
                    }
                }
            }
        }
        path.pop();
        colours.insert(current, Colour::Done);
        None
    }

    for name in inlined {
        if colours[name] == Colour::Unvisited {
            let mut path = Vec::default();
            if let Some(cycle) = visit(name, precedence, inlined, &mut colours, &mut path) {
                return Some(cycle);
            }
        }
    }
    None
}

// -- stratification --

fn check_stratification(
    report: &mut ErrorReport,
    program: &Program,
    precedence: &PrecedenceGraph,
    sccs: &SccGraph,
) {
    for index in 0..sccs.len() {
        let scc = sccs.scc(index);
        if !scc.recursive {
            continue;
        }
        let offending = sccs
            .internal_edge_kinds(precedence, index)
            .into_iter()
            .find(|(_, _, kind)| matches!(kind, MentionKind::Negated | MentionKind::Aggregated));
        let Some((source, target, kind)) = offending else {
            continue;
        };

        let listing = scc
            .relations
            .iter()
            .map(|name| format!("{name}"))
            .collect::<Vec<_>>()
            .join(",");
        let word = match kind {
            MentionKind::Negated => "negation",
            _ => "aggregation",
        };
        let mut messages = Vec::default();
        if let Some(relation) = program.relation(&target) {
            messages.push(DiagnosticMessage::at(
                format!("Relation {}", relation.name),
                relation.loc.clone(),
            ));
        }
        if let Some(relation) = program.relation(&source) {
            messages.push(DiagnosticMessage::at(
                format!("has cyclic {word}"),
                relation.loc.clone(),
            ));
        }
        report.add(Diagnostic {
            severity: Severity::Error,
            primary: DiagnosticMessage::free(format!(
                "Unable to stratify relation(s) {{{listing}}}"
            )),
            additional: messages,
        });
    }
}

