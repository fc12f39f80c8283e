/*!
Lowering: from the transformed AST to a RAM program.

The translator walks the relation schedule. Each step creates and loads the
relations it computes, evaluates them --- a clause-by-clause translation for
non-recursive relations, the semi-naive fixpoint for recursive SCCs ---
prints and stores what the step computed, and drops what expired.

With profiling enabled, rules and relations are wrapped in log timers and
size counters; every rule carries a debug-info node with its rendered
clause. With provenance enabled, every user clause additionally yields a
subproof subroutine.
*/

mod clause;
mod fixpoint;

use std::collections::BTreeMap;

use crate::analysis::precedence::{
    relation_schedule, topological_order, PrecedenceGraph, RecursiveClauses, SccGraph,
};
use crate::analysis::typing::{TypeEnv, TypeKind};
use crate::ast::symbol::SymbolTable;
use crate::ast::{Atom, Program, Relation, RelationName};
use crate::config::Config;
use crate::context::TranslationUnit;
use crate::misc::log::targets;
use crate::ram::{IoSpec, RamProgram, RamRelation, Stmt};
use crate::types::err::{self};

pub(crate) struct Translator<'a> {
    program: &'a Program,
    symbols: &'a SymbolTable,
    env: TypeEnv,
    config: &'a Config,
    recursive: RecursiveClauses,
}

/// Translates the program of the given translation unit into a RAM program.
///
/// Expects a checked and transformed unit; `None` results from a program
/// with nothing to compute.
pub fn translate_program(
    tu: &TranslationUnit,
    config: &Config,
) -> Result<Option<RamProgram>, err::TranslateError> {
    let program = &tu.program;
    let translator = Translator {
        program,
        symbols: &tu.symbols,
        env: TypeEnv::build(program),
        config,
        recursive: RecursiveClauses::compute(program),
    };

    let precedence = PrecedenceGraph::build(program);
    let sccs = SccGraph::build(&precedence);
    let order = topological_order(&sccs);
    let schedule = relation_schedule(program, &precedence, &sccs, &order);
    if schedule.is_empty() {
        return Ok(None);
    }

    let mut main: Option<Stmt> = None;
    let last = schedule.len() - 1;
    for (position, step) in schedule.iter().enumerate() {
        log::debug!(
            target: targets::TRANSLATE,
            "step {position}: compute {:?}, expire {:?}",
            step.computed,
            step.expired
        );

        let mut current: Option<Stmt> = None;

        for name in &step.computed {
            let relation = translator.relation(name)?;
            let rrel = translator.ram_relation(relation);
            Stmt::append(&mut current, Stmt::Create(rrel.clone()));
            if relation.flags.input {
                Stmt::append(&mut current, Stmt::Load(rrel));
            }
            if step.recursive {
                let flat = flat_name(name);
                Stmt::append(
                    &mut current,
                    Stmt::Create(translator.temp_relation(relation, &format!("delta_{flat}"))),
                );
                Stmt::append(
                    &mut current,
                    Stmt::Create(translator.temp_relation(relation, &format!("new_{flat}"))),
                );
            }
        }

        let body = match step.recursive {
            false => {
                debug_assert!(step.computed.len() == 1, "non-recursive steps hold one relation");
                let relation = translator.relation(&step.computed[0])?;
                translator.translate_non_recursive_relation(relation)?
            }
            true => translator.translate_recursive_scc(&step.computed)?,
        };
        if let Some(body) = body {
            Stmt::append(&mut current, body);
        }

        for name in &step.computed {
            let relation = translator.relation(name)?;
            let rrel = translator.ram_relation(relation);
            if relation.flags.printsize {
                Stmt::append(&mut current, Stmt::PrintSize(rrel.clone()));
            }
            if relation.flags.output {
                Stmt::append(&mut current, Stmt::Store(rrel));
            }
        }

        for name in &step.expired {
            let relation = translator.relation(name)?;
            Stmt::append(&mut current, Stmt::Drop(translator.ram_relation(relation)));
        }
        if position == last {
            for name in &step.computed {
                let relation = translator.relation(name)?;
                Stmt::append(&mut current, Stmt::Drop(translator.ram_relation(relation)));
            }
        }

        if let Some(current) = current {
            Stmt::append(&mut main, current);
        }
    }

    let Some(mut main) = main else {
        return Ok(None);
    };
    if config.profile.value {
        main = Stmt::LogTimer {
            label: "@runtime;".to_string(),
            inner: Box::new(main),
        };
    }

    let mut ram = RamProgram::new(main);
    if config.provenance.value {
        ram.subroutines = translator.subproof_subroutines()?;
    }
    Ok(Some(ram))
}

fn flat_name(name: &RelationName) -> String {
    name.joined("-")
}

impl Translator<'_> {
    fn relation(&self, name: &RelationName) -> Result<&Relation, err::TranslateError> {
        self.program
            .relation(name)
            .ok_or_else(|| err::TranslateError::MissingRelation(name.clone()))
    }

    /// The machine relation record of an atom's relation.
    ///
    /// Temporaries of the semi-naive loop carry no declaration; they lower
    /// to bare records.
    pub(crate) fn ram_relation_of(&self, atom: &Atom) -> Result<RamRelation, err::TranslateError> {
        match self.program.relation(&atom.name) {
            Some(relation) => Ok(self.ram_relation(relation)),
            None => {
                let flat = flat_name(&atom.name);
                match flat.starts_with('@') {
                    true => Ok(RamRelation {
                        name: flat,
                        arity: atom.arity(),
                        temp: true,
                        ..RamRelation::default()
                    }),
                    false => Err(err::TranslateError::MissingRelation(atom.name.clone())),
                }
            }
        }
    }

    pub(crate) fn ram_relation(&self, relation: &Relation) -> RamRelation {
        self.named_ram_relation(relation, flat_name(&relation.name), false)
    }

    pub(crate) fn temp_relation(&self, relation: &Relation, name: &str) -> RamRelation {
        self.named_ram_relation(relation, format!("@{name}"), true)
    }

    fn named_ram_relation(&self, relation: &Relation, name: String, temp: bool) -> RamRelation {
        let mut attribute_names = Vec::with_capacity(relation.arity());
        let mut attribute_types = Vec::with_capacity(relation.arity());
        let mut symbol_mask = Vec::with_capacity(relation.arity());
        for attribute in &relation.attributes {
            attribute_names.push(attribute.name.clone());
            let kind = self.env.kind_of(&attribute.type_name);
            let qualifier = match kind {
                Some(TypeKind::Symbol) => 's',
                Some(TypeKind::Record) => 'r',
                _ => 'n',
            };
            attribute_types.push(format!("{qualifier}:{}", attribute.type_name));
            symbol_mask.push(kind == Some(TypeKind::Symbol));
        }

        let (input_directives, output_directives) = self.resolve_directives(relation);

        RamRelation {
            name,
            arity: relation.arity(),
            attribute_names,
            attribute_types,
            symbol_mask,
            input: relation.flags.input,
            computed: relation.flags.computed(),
            output: relation.flags.output,
            printsize: relation.flags.printsize,
            data: relation.flags.data,
            btree: relation.flags.btree,
            brie: relation.flags.brie,
            eqrel: relation.flags.eqrel,
            hashset: relation.flags.hashset,
            temp,
            input_directives,
            output_directives,
        }
    }

    // Resolves the relation's I/O directives against the configured
    // defaults: file I/O, `.facts` in, `.csv` out, tab delimiters, and
    // directory prefixes for relative paths.
    fn resolve_directives(&self, relation: &Relation) -> (IoSpec, Vec<IoSpec>) {
        let flat = flat_name(&relation.name);

        let mut input = IoSpec::default();
        if relation.flags.input {
            for directive in &relation.io {
                if directive.kind == crate::ast::IoKind::Input {
                    for (key, value) in &directive.map {
                        input.insert(key.clone(), value.clone());
                    }
                }
            }
            input.entry("IO".to_string()).or_insert("file".to_string());
            if input.get("IO").map(String::as_str) == Some("file") {
                if !input.contains_key("filename") || input.contains_key("intermediate") {
                    input.insert("filename".to_string(), format!("{flat}.facts"));
                }
                if input.contains_key("intermediate") {
                    input.insert("delimiter".to_string(), "\t".to_string());
                }
                input
                    .entry("delimiter".to_string())
                    .or_insert("\t".to_string());
                let filename = input.get("filename").cloned().unwrap_or_default();
                if !filename.starts_with('/') {
                    input.insert(
                        "filename".to_string(),
                        format!("{}/{filename}", self.config.fact_dir.value),
                    );
                }
            }
        }

        let mut outputs: Vec<IoSpec> = Vec::default();
        if relation.flags.output {
            if self.config.output_dir.value == "-" {
                let mut spec = IoSpec::default();
                spec.insert("IO".to_string(), "stdout".to_string());
                spec.insert("relation".to_string(), flat.clone());
                outputs.push(spec);
            } else {
                for directive in &relation.io {
                    if directive.kind == crate::ast::IoKind::Output {
                        outputs.push(directive.map.clone());
                    }
                }
                if outputs.is_empty() {
                    outputs.push(IoSpec::default());
                }
                for spec in outputs.iter_mut() {
                    spec.entry("IO".to_string()).or_insert("file".to_string());
                    if spec.get("IO").map(String::as_str) == Some("file") {
                        spec.entry("filename".to_string())
                            .or_insert(format!("{flat}.csv"));
                        spec.entry("delimiter".to_string())
                            .or_insert("\t".to_string());
                        let filename = spec.get("filename").cloned().unwrap_or_default();
                        if !filename.starts_with('/') {
                            spec.insert(
                                "filename".to_string(),
                                format!("{}/{filename}", self.config.output_dir.value),
                            );
                        }
                    }
                }
            }
        }

        (input, outputs)
    }

    /// Translates the non-recursive clauses of a relation.
    pub(crate) fn translate_non_recursive_relation(
        &self,
        relation: &Relation,
    ) -> Result<Option<Stmt>, err::TranslateError> {
        let mut result: Option<Stmt> = None;
        let rrel = self.ram_relation(relation);

        for &key in relation.clause_keys() {
            if self.recursive.recursive(key) {
                continue;
            }
            let clause = self.program.clause(key);
            let mut rule = self.translate_clause(clause, 0, false)?;

            if self.config.profile.value {
                let label = format!(
                    "nonrecursive-rule;{};{};{clause};",
                    relation.name, clause.loc
                );
                rule = Stmt::Sequence(vec![
                    Stmt::LogTimer {
                        label: format!("@t-{label}"),
                        inner: Box::new(rule),
                    },
                    Stmt::LogSize {
                        relation: rrel.clone(),
                        label: format!("@n-{label}"),
                    },
                ]);
            }

            rule = Stmt::DebugInfo {
                message: format!("{clause}\nin file {}", clause.loc),
                inner: Box::new(rule),
            };
            Stmt::append(&mut result, rule);
        }

        let Some(mut result) = result else {
            return Ok(None);
        };

        if self.config.profile.value {
            let label = format!("nonrecursive-relation;{};{};", relation.name, relation.loc);
            let mut wrapped = Some(Stmt::LogTimer {
                label: format!("@t-{label}"),
                inner: Box::new(result),
            });
            Stmt::append(
                &mut wrapped,
                Stmt::LogSize {
                    relation: rrel,
                    label: format!("@n-{label}"),
                },
            );
            result = wrapped.expect("the timer was just appended");
        }

        Ok(Some(result))
    }

    /// The subproof subroutines of every user clause with a body.
    fn subproof_subroutines(&self) -> Result<BTreeMap<String, Stmt>, err::TranslateError> {
        let mut subroutines = BTreeMap::default();
        for name in self.program.relation_names() {
            for (position, key) in self.program.clauses_of(&name).into_iter().enumerate() {
                let clause = self.program.clause(key);
                if clause.is_fact() {
                    continue;
                }
                let label = format!("{}_{position}_subproof", flat_name(&name));
                let subroutine = self.make_subproof_subroutine(clause)?;
                subroutines.insert(label, subroutine);
            }
        }
        Ok(subroutines)
    }

    // Binds every head argument to the corresponding subroutine argument
    // and lowers the clause to a return over its body values.
    fn make_subproof_subroutine(&self, clause: &crate::ast::Clause) -> Result<Stmt, err::TranslateError> {
        use crate::ast::{Argument, ConstraintOp, Literal};

        let mut copy = clause.clone();
        fixpoint::name_unnamed_variables(&mut copy);

        let mut bindings = Vec::default();
        for (position, arg) in copy.head.args.iter().enumerate() {
            match arg {
                Argument::Variable { .. }
                | Argument::Record { .. }
                | Argument::Unary { .. }
                | Argument::Binary { .. }
                | Argument::Ternary { .. } => {
                    bindings.push(Literal::constraint(
                        ConstraintOp::Eq,
                        arg.clone(),
                        Argument::subroutine_arg(position),
                    ));
                }
                _ => {}
            }
        }
        copy.body.extend(bindings);

        self.translate_clause(&copy, 0, true)
    }
}
