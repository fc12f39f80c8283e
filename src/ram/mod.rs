/*!
The relational algebra machine (RAM) IR --- the backend contract.

A [RamProgram] is a main [Stmt] plus an optional map of named subroutines
(used for provenance subproofs). Statements compose sequences, parallel
blocks and loops over relation-level operations; tuple-level work lives in
[Operation] trees nested under [Stmt::Insert], filtered by [Condition]s and
computing [Value]s.

The whole IR serializes with serde; an external backend (interpreter or
synthesizer) consumes the serialized program together with the symbol table.

Levels: every scan, lookup and aggregate owns one level of the loop nest,
numbered from zero outermost; [Value::ElementAccess] addresses a component
of the tuple produced at a level.
*/

mod relation;
pub use relation::{IoSpec, RamRelation};

mod pretty;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ast::{AggregateOp, BinaryOp, ConstraintOp, Domain, TernaryOp, UnaryOp};

/// A value computed during tuple-level evaluation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// A constant of the machine domain. Interned symbols appear as their
    /// symbol table index.
    Number(Domain),

    /// The component of the tuple produced at a level of the loop nest.
    ElementAccess {
        level: usize,
        component: usize,
        name: Option<String>,
    },

    /// The next value of the program-wide counter.
    AutoIncrement,

    /// Packs values into a record reference.
    Pack(Vec<Value>),

    UnaryOp {
        op: UnaryOp,
        arg: Box<Value>,
    },

    BinaryOp {
        op: BinaryOp,
        lhs: Box<Value>,
        rhs: Box<Value>,
    },

    TernaryOp {
        op: TernaryOp,
        first: Box<Value>,
        second: Box<Value>,
        third: Box<Value>,
    },

    /// A positional argument of the enclosing subroutine.
    Argument(usize),
}

impl Value {
    pub fn access(level: usize, component: usize, name: Option<String>) -> Self {
        Value::ElementAccess {
            level,
            component,
            name,
        }
    }

    /// The outermost level the value draws on, zero when constant.
    pub fn level(&self) -> usize {
        match self {
            Value::ElementAccess { level, .. } => *level,
            Value::Pack(values) => values.iter().map(Value::level).max().unwrap_or(0),
            Value::UnaryOp { arg, .. } => arg.level(),
            Value::BinaryOp { lhs, rhs, .. } => lhs.level().max(rhs.level()),
            Value::TernaryOp {
                first,
                second,
                third,
                ..
            } => first.level().max(second.level()).max(third.level()),
            _ => 0,
        }
    }
}

/// A condition filtering tuple-level evaluation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    BinaryRelation {
        op: ConstraintOp,
        lhs: Value,
        rhs: Value,
    },

    /// No tuple matching the given pattern exists in the relation; `None`
    /// components are wildcards.
    NotExists {
        relation: RamRelation,
        args: Vec<Option<Value>>,
    },

    /// The relation holds no tuples.
    Empty(RamRelation),

    And(Box<Condition>, Box<Condition>),
}

impl Condition {
    /// The outermost level the condition draws on.
    pub fn level(&self) -> usize {
        match self {
            Condition::BinaryRelation { lhs, rhs, .. } => lhs.level().max(rhs.level()),
            Condition::NotExists { args, .. } => args
                .iter()
                .flatten()
                .map(Value::level)
                .max()
                .unwrap_or(0),
            Condition::Empty(_) => 0,
            Condition::And(lhs, rhs) => lhs.level().max(rhs.level()),
        }
    }

    /// Conjoins a condition onto an optional condition.
    pub fn conjoin(slot: &mut Option<Condition>, condition: Condition) {
        *slot = match slot.take() {
            Some(existing) => Some(Condition::And(Box::new(existing), Box::new(condition))),
            None => Some(condition),
        };
    }
}

/// A tuple-level operation nested under [Stmt::Insert].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Scans a relation, producing one tuple per iteration at `level`.
    Scan {
        relation: RamRelation,
        level: usize,
        /// The scan only checks for the existence of a matching tuple.
        pure_existence_check: bool,
        condition: Option<Condition>,
        inner: Box<Operation>,
    },

    /// Unpacks a record reference produced at an earlier level.
    Lookup {
        ref_level: usize,
        ref_component: usize,
        arity: usize,
        level: usize,
        condition: Option<Condition>,
        inner: Box<Operation>,
    },

    /// Folds a relation into a single value bound at `level`.
    Aggregate {
        function: AggregateOp,
        target: Option<Value>,
        relation: RamRelation,
        level: usize,
        condition: Option<Condition>,
        inner: Box<Operation>,
    },

    /// Inserts the computed tuple into the target relation.
    Project {
        relation: RamRelation,
        condition: Option<Condition>,
        values: Vec<Value>,
    },

    /// Returns values out of a subroutine; `None` marks an absent column.
    Return { values: Vec<Option<Value>> },
}

/// A RAM statement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stmt {
    Sequence(Vec<Stmt>),

    /// Statements evaluated on independent workers, joined at the end of
    /// the block.
    Parallel(Vec<Stmt>),

    /// Repeats its body until an [Stmt::Exit] condition holds.
    Loop(Vec<Stmt>),

    /// Leaves the innermost loop when the condition holds.
    Exit(Condition),

    Create(RamRelation),
    Load(RamRelation),
    Store(RamRelation),
    Clear(RamRelation),
    Drop(RamRelation),
    PrintSize(RamRelation),

    /// Adds all tuples of `source` to `target`.
    Merge {
        target: RamRelation,
        source: RamRelation,
    },

    /// Exchanges the contents of two relations.
    Swap {
        first: RamRelation,
        second: RamRelation,
    },

    /// Inserts a single ground tuple.
    Fact {
        relation: RamRelation,
        values: Vec<Value>,
    },

    /// Runs a tuple-level operation tree.
    Insert { operation: Operation },

    LogTimer {
        label: String,
        inner: Box<Stmt>,
    },

    LogSize {
        relation: RamRelation,
        label: String,
    },

    DebugInfo {
        message: String,
        inner: Box<Stmt>,
    },
}

impl Stmt {
    /// Appends a statement onto an optional sequence, mirroring the way the
    /// translator accumulates statements.
    pub fn append(slot: &mut Option<Stmt>, stmt: Stmt) {
        *slot = match slot.take() {
            None => Some(stmt),
            Some(Stmt::Sequence(mut stmts)) => {
                stmts.push(stmt);
                Some(Stmt::Sequence(stmts))
            }
            Some(existing) => Some(Stmt::Sequence(vec![existing, stmt])),
        };
    }
}

/// A complete RAM program.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RamProgram {
    pub main: Stmt,

    /// Subproof subroutines, keyed `<relation>_<clause-index>_subproof`.
    #[serde(default)]
    pub subroutines: BTreeMap<String, Stmt>,
}

impl RamProgram {
    pub fn new(main: Stmt) -> Self {
        RamProgram {
            main,
            subroutines: BTreeMap::default(),
        }
    }
}
