/*!
Per-clause lowering: from a clause to a loop nest.

The translation builds a *value index* over the clause --- for every
variable the set of (level, component) points where a scan defines it, for
every record initializer its definition point and unpack level, for every
aggregator the level binding its result --- and then assembles the nest
outside-in:

- one scan level per body atom, in plan order;
- one unpack level per nested record initializer;
- one aggregate level per distinct aggregator;
- conditions placed at the outermost level where their operands are all
  available: constants pinned at fixed positions, equalities between
  repeated variable occurrences, translated binary constraints, and
  not-exists checks for negated atoms;
- innermost, a project of the head tuple --- or a return, for subroutines.

Facts lower to a direct fact insertion.
*/

use std::collections::BTreeMap;

use crate::ast::visit::aggregates_post_order;
use crate::ast::{Argument, Atom, Clause, ConstraintOp, Literal};
use crate::ram::{Condition, Operation, Stmt, Value};
use crate::translate::Translator;
use crate::types::err::{self};

/// The location of a value in a loop nest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct Location {
    pub level: usize,
    pub component: usize,
    pub name: Option<String>,
}

impl Location {
    fn access(&self) -> Value {
        Value::access(self.level, self.component, self.name.clone())
    }
}

/// The index of variable, record and aggregator locations in a loop nest.
#[derive(Default)]
pub(super) struct ValueIndex {
    variables: BTreeMap<String, Vec<Location>>,
    aggregators: Vec<(Argument, Location)>,
}

impl ValueIndex {
    fn add_variable(&mut self, name: &str, location: Location) {
        self.variables.entry(name.to_string()).or_default().push(location);
    }

    /// The definition point of a variable: its earliest location.
    pub fn definition(&self, name: &str) -> Result<&Location, err::TranslateError> {
        self.variables
            .get(name)
            .and_then(|locations| {
                locations
                    .iter()
                    .min_by_key(|location| (location.level, location.component))
            })
            .ok_or_else(|| err::TranslateError::UngroundedValue(name.to_string()))
    }

    pub fn aggregator_location(&self, agg: &Argument) -> Result<&Location, err::TranslateError> {
        self.aggregators
            .iter()
            .find(|(stored, _)| stored == agg)
            .map(|(_, location)| location)
            .ok_or(err::TranslateError::UnindexedRecord)
    }

    fn defines_on_level(&self, level: usize) -> bool {
        self.variables.values().any(|locations| {
            locations
                .iter()
                .min_by_key(|location| (location.level, location.component))
                .map(|first| first.level == level)
                .unwrap_or(false)
        })
    }
}

// One level of the loop nest under construction.
enum NestEntry {
    Scan {
        atom: Atom,
        level: usize,
    },
    Unpack {
        reference: Location,
        args: Vec<Argument>,
        level: usize,
    },
}

impl Translator<'_> {
    /// Translates an argument to a RAM value; `None` encodes `_`.
    pub(super) fn translate_value(
        &self,
        arg: &Argument,
        index: &ValueIndex,
    ) -> Result<Option<Value>, err::TranslateError> {
        let value = match arg {
            Argument::Variable { name, .. } => index.definition(name)?.access(),
            Argument::Unnamed { .. } => return Ok(None),
            Argument::Number { value, .. } => Value::Number(*value),
            Argument::Text { value, .. } => {
                Value::Number(self.symbols.intern(value) as crate::ast::Domain)
            }
            Argument::Counter { .. } => Value::AutoIncrement,
            Argument::Unary { op, arg, .. } => Value::UnaryOp {
                op: *op,
                arg: Box::new(self.require_value(arg, index)?),
            },
            Argument::Binary { op, lhs, rhs, .. } => Value::BinaryOp {
                op: *op,
                lhs: Box::new(self.require_value(lhs, index)?),
                rhs: Box::new(self.require_value(rhs, index)?),
            },
            Argument::Ternary {
                op,
                first,
                second,
                third,
                ..
            } => Value::TernaryOp {
                op: *op,
                first: Box::new(self.require_value(first, index)?),
                second: Box::new(self.require_value(second, index)?),
                third: Box::new(self.require_value(third, index)?),
            },
            Argument::Record { args, .. } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.require_value(arg, index)?);
                }
                Value::Pack(values)
            }
            Argument::Aggregate { .. } => index.aggregator_location(arg)?.access(),
            Argument::SubroutineArg { index: position, .. } => Value::Argument(*position),
        };
        Ok(Some(value))
    }

    fn require_value(
        &self,
        arg: &Argument,
        index: &ValueIndex,
    ) -> Result<Value, err::TranslateError> {
        self.translate_value(arg, index)?
            .ok_or_else(|| err::TranslateError::UngroundedValue("_".to_string()))
    }

    /// Lowers a clause to a RAM statement.
    ///
    /// `version` selects the execution-plan order for recursive versions;
    /// `ret` lowers to a subroutine return instead of a projection.
    pub(super) fn translate_clause(
        &self,
        clause: &Clause,
        version: usize,
        ret: bool,
    ) -> Result<Stmt, err::TranslateError> {
        // an imposed order is applied once, on a copy
        if let Some(plan) = &clause.plan {
            if let Some(order) = plan.order_for(version) {
                let mut copy = clause.clone();
                let zero_based: Vec<usize> = order
                    .positions
                    .iter()
                    .map(|&position| position.saturating_sub(1))
                    .collect();
                copy.reorder_atoms(&zero_based);
                copy.plan = None;
                copy.fixed_plan = true;
                return self.translate_clause(&copy, version, ret);
            }
        }

        if clause.is_fact() {
            let empty = ValueIndex::default();
            let mut values = Vec::with_capacity(clause.head.args.len());
            for arg in &clause.head.args {
                values.push(self.require_value(arg, &empty)?);
            }
            return Ok(Stmt::Fact {
                relation: self.ram_relation_of(&clause.head)?,
                values,
            });
        }

        // -- index values --

        let mut index = ValueIndex::default();
        let mut nest: Vec<NestEntry> = Vec::default();
        let mut level = 0usize;

        for atom in clause.body_atoms() {
            let scan_level = level;
            level += 1;
            nest.push(NestEntry::Scan {
                atom: atom.clone(),
                level: scan_level,
            });
            let relation = self.ram_relation_of(atom)?;
            for (component, arg) in atom.args.iter().enumerate() {
                self.index_argument(
                    arg,
                    Location {
                        level: scan_level,
                        component,
                        name: relation.attribute(component),
                    },
                    &mut index,
                    &mut nest,
                    &mut level,
                );
            }
        }

        // aggregators bind their results at the innermost levels
        let mut aggregators: Vec<(Argument, Location)> = Vec::default();
        aggregates_post_order(clause, &mut |agg| {
            if aggregators.iter().any(|(stored, _)| stored == agg) {
                return;
            }
            let agg_level = level;
            level += 1;
            aggregators.push((
                agg.clone(),
                Location {
                    level: agg_level,
                    component: 0,
                    name: None,
                },
            ));
        });
        for (agg, location) in &aggregators {
            let Argument::Aggregate { body, .. } = agg else {
                continue;
            };
            let [Literal::Atom(atom)] = body.as_slice() else {
                continue;
            };
            if let Ok(relation) = self.ram_relation_of(atom) {
                for (component, arg) in atom.args.iter().enumerate() {
                    if let Argument::Variable { name, .. } = arg {
                        index.add_variable(
                            name,
                            Location {
                                level: location.level,
                                component,
                                name: relation.attribute(component),
                            },
                        );
                    }
                }
            }
        }
        index.aggregators = aggregators.clone();

        // -- collect conditions, bucketed by level --

        let bucket_count = level.max(1);
        let mut buckets: Vec<Option<Condition>> = vec![None; bucket_count];
        let place = |buckets: &mut Vec<Option<Condition>>, condition: Condition| {
            let at = condition.level().min(bucket_count - 1);
            Condition::conjoin(&mut buckets[at], condition);
        };

        // constants and aggregate results pinned at fixed positions
        for entry in &nest {
            match entry {
                NestEntry::Scan { atom, level } => {
                    let relation = self.ram_relation_of(atom)?;
                    for (component, arg) in atom.args.iter().enumerate() {
                        let access =
                            Value::access(*level, component, relation.attribute(component));
                        if arg.is_constant() {
                            let value = self
                                .translate_value(arg, &index)?
                                .expect("constants translate");
                            place(
                                &mut buckets,
                                Condition::BinaryRelation {
                                    op: ConstraintOp::Eq,
                                    lhs: access,
                                    rhs: value,
                                },
                            );
                        } else if matches!(arg, Argument::Aggregate { .. }) {
                            let location = index.aggregator_location(arg)?.access();
                            place(
                                &mut buckets,
                                Condition::BinaryRelation {
                                    op: ConstraintOp::Eq,
                                    lhs: access,
                                    rhs: location,
                                },
                            );
                        }
                    }
                }
                NestEntry::Unpack { args, level, .. } => {
                    for (component, arg) in args.iter().enumerate() {
                        if arg.is_constant() {
                            let value = self
                                .translate_value(arg, &index)?
                                .expect("constants translate");
                            place(
                                &mut buckets,
                                Condition::BinaryRelation {
                                    op: ConstraintOp::Eq,
                                    lhs: Value::access(*level, component, None),
                                    rhs: value,
                                },
                            );
                        }
                    }
                }
            }
        }

        // constants inside aggregator atoms
        for (agg, location) in &index.aggregators {
            let Argument::Aggregate { body, .. } = agg else {
                continue;
            };
            let [Literal::Atom(atom)] = body.as_slice() else {
                continue;
            };
            let relation = self.ram_relation_of(atom)?;
            for (component, arg) in atom.args.iter().enumerate() {
                if arg.is_constant() {
                    let value = self
                        .translate_value(arg, &index)?
                        .expect("constants translate");
                    place(
                        &mut buckets,
                        Condition::BinaryRelation {
                            op: ConstraintOp::Eq,
                            lhs: Value::access(
                                location.level,
                                component,
                                relation.attribute(component),
                            ),
                            rhs: value,
                        },
                    );
                }
            }
        }

        // equalities between repeated variable occurrences
        for locations in index.variables.values() {
            let Some(first) = locations
                .iter()
                .min_by_key(|location| (location.level, location.component))
            else {
                continue;
            };
            for other in locations {
                if other != first {
                    place(
                        &mut buckets,
                        Condition::BinaryRelation {
                            op: ConstraintOp::Eq,
                            lhs: first.access(),
                            rhs: other.access(),
                        },
                    );
                }
            }
        }

        // binary constraints and negations
        for literal in &clause.body {
            match literal {
                Literal::Atom(_) => {}
                Literal::Constraint { op, lhs, rhs, .. } => {
                    let lhs = self.require_value(lhs, &index)?;
                    let rhs = self.require_value(rhs, &index)?;
                    place(
                        &mut buckets,
                        Condition::BinaryRelation {
                            op: *op,
                            lhs,
                            rhs,
                        },
                    );
                }
                Literal::Negation { atom, .. } => {
                    let mut args = Vec::with_capacity(atom.args.len());
                    for arg in &atom.args {
                        args.push(self.translate_value(arg, &index)?);
                    }
                    place(
                        &mut buckets,
                        Condition::NotExists {
                            relation: self.ram_relation_of(atom)?,
                            args,
                        },
                    );
                }
                Literal::Bool { value: true, .. } => {}
                Literal::Bool { value: false, .. } => place(
                    &mut buckets,
                    Condition::BinaryRelation {
                        op: ConstraintOp::Eq,
                        lhs: Value::Number(0),
                        rhs: Value::Number(1),
                    },
                ),
            }
        }

        // -- assemble the nest, innermost first --

        let mut operation = match ret {
            true => {
                let mut values: Vec<Option<Value>> = Vec::default();
                for literal in &clause.body {
                    match literal {
                        Literal::Atom(atom) => {
                            for arg in &atom.args {
                                values.push(self.translate_value(arg, &index)?);
                            }
                        }
                        Literal::Negation { atom, .. } => {
                            for arg in &atom.args {
                                values.push(self.translate_value(arg, &index)?);
                            }
                            values.push(Some(Value::Number(-1)));
                        }
                        _ => {}
                    }
                }
                Operation::Return { values }
            }
            false => {
                let mut values = Vec::with_capacity(clause.head.args.len());
                for arg in &clause.head.args {
                    values.push(self.require_value(arg, &index)?);
                }
                let condition = match nest.is_empty() && index.aggregators.is_empty() {
                    true => buckets[0].take(),
                    false => None,
                };
                Operation::Project {
                    relation: self.ram_relation_of(&clause.head)?,
                    condition,
                    values,
                }
            }
        };

        for (agg, location) in index.aggregators.iter().rev() {
            let Argument::Aggregate {
                op, target, body, ..
            } = agg
            else {
                continue;
            };
            let [Literal::Atom(atom)] = body.as_slice() else {
                return Err(err::TranslateError::ComplexAggregateBody);
            };
            let target = match target {
                Some(target) => Some(self.require_value(target, &index)?),
                None => None,
            };
            operation = Operation::Aggregate {
                function: *op,
                target,
                relation: self.ram_relation_of(atom)?,
                level: location.level,
                condition: buckets[location.level].take(),
                inner: Box::new(operation),
            };
        }

        for entry in nest.iter().rev() {
            operation = match entry {
                NestEntry::Scan { atom, level } => {
                    let pure_existence_check = !index.defines_on_level(*level)
                        && !nest.iter().any(|entry| match entry {
                            NestEntry::Unpack { reference, .. } => reference.level == *level,
                            _ => false,
                        })
                        && !atom
                            .args
                            .iter()
                            .any(|arg| matches!(arg, Argument::Aggregate { .. }));
                    Operation::Scan {
                        relation: self.ram_relation_of(atom)?,
                        level: *level,
                        pure_existence_check,
                        condition: buckets[*level].take(),
                        inner: Box::new(operation),
                    }
                }
                NestEntry::Unpack {
                    reference,
                    args,
                    level,
                } => Operation::Lookup {
                    ref_level: reference.level,
                    ref_component: reference.component,
                    arity: args.len(),
                    level: *level,
                    condition: buckets[*level].take(),
                    inner: Box::new(operation),
                },
            };
        }

        Ok(Stmt::Insert { operation })
    }

    // Registers the location of an argument sitting at a scan or unpack
    // position, introducing unpack levels for nested records.
    fn index_argument(
        &self,
        arg: &Argument,
        location: Location,
        index: &mut ValueIndex,
        nest: &mut Vec<NestEntry>,
        level: &mut usize,
    ) {
        match arg {
            Argument::Variable { name, .. } => index.add_variable(name, location),
            Argument::Record { args, .. } => {
                let unpack_level = *level;
                *level += 1;
                nest.push(NestEntry::Unpack {
                    reference: location,
                    args: args.clone(),
                    level: unpack_level,
                });
                for (component, arg) in args.iter().enumerate() {
                    self.index_argument(
                        arg,
                        Location {
                            level: unpack_level,
                            component,
                            name: None,
                        },
                        index,
                        nest,
                        level,
                    );
                }
            }
            _ => {}
        }
    }
}

