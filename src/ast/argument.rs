/*!
Arguments --- the terms appearing in argument positions of atoms,
constraints, records, and aggregators.

Equality of arguments is structural and ignores source locations, as
transforms regularly compare synthesized terms against parsed terms.
*/

use serde::{Deserialize, Serialize};

use crate::ast::Literal;
use crate::reports::SrcLocation;

/// The numeric domain of the machine: 32-bit signed, as with the backing
/// relational algebra machine.
pub type Domain = i32;

/// Built-in unary functors, with fixed signatures over number/symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// The ordinal of a symbol: symbol → number.
    Ord,
    /// The length of a symbol: symbol → number.
    Strlen,
    /// Numeric negation: number → number.
    Neg,
    /// Bitwise complement: number → number.
    Bnot,
    /// Logical complement: number → number.
    Lnot,
    /// Reinterpret a symbol holding digits as a number: symbol → number.
    Tonumber,
    /// Render a number as a symbol: number → symbol.
    Tostring,
}

impl UnaryOp {
    /// True when the functor yields a number.
    pub fn yields_number(self) -> bool {
        !matches!(self, UnaryOp::Tostring)
    }

    /// True when the functor accepts a number operand.
    pub fn accepts_number(self) -> bool {
        matches!(self, UnaryOp::Neg | UnaryOp::Bnot | UnaryOp::Lnot | UnaryOp::Tostring)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Ord => "ord",
            UnaryOp::Strlen => "strlen",
            UnaryOp::Neg => "-",
            UnaryOp::Bnot => "bnot",
            UnaryOp::Lnot => "lnot",
            UnaryOp::Tonumber => "to_number",
            UnaryOp::Tostring => "to_string",
        }
    }
}

/// Built-in binary functors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Exp,
    Mod,
    Band,
    Bor,
    Bxor,
    Land,
    Lor,
    Max,
    Min,
    /// Concatenation: symbol × symbol → symbol.
    Cat,
}

impl BinaryOp {
    /// True when the functor yields a number.
    pub fn yields_number(self) -> bool {
        !matches!(self, BinaryOp::Cat)
    }

    /// True when the functor accepts a number at the given operand position.
    pub fn accepts_number(self, _index: usize) -> bool {
        !matches!(self, BinaryOp::Cat)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Exp => "^",
            BinaryOp::Mod => "%",
            BinaryOp::Band => "band",
            BinaryOp::Bor => "bor",
            BinaryOp::Bxor => "bxor",
            BinaryOp::Land => "land",
            BinaryOp::Lor => "lor",
            BinaryOp::Max => "max",
            BinaryOp::Min => "min",
            BinaryOp::Cat => "cat",
        }
    }
}

/// Built-in ternary functors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TernaryOp {
    /// Substring: symbol × number × number → symbol.
    Substr,
}

impl TernaryOp {
    pub fn yields_number(self) -> bool {
        false
    }

    pub fn accepts_number(self, index: usize) -> bool {
        match self {
            TernaryOp::Substr => index != 0,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            TernaryOp::Substr => "substr",
        }
    }
}

/// Aggregation operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateOp {
    Min,
    Max,
    Count,
    Sum,
}

impl std::fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregateOp::Min => write!(f, "min"),
            AggregateOp::Max => write!(f, "max"),
            AggregateOp::Count => write!(f, "count"),
            AggregateOp::Sum => write!(f, "sum"),
        }
    }
}

/// A term in an argument position.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Argument {
    /// A named variable.
    Variable { name: String, loc: SrcLocation },

    /// An unnamed variable, `_`.
    Unnamed { loc: SrcLocation },

    /// The auto-increment counter, `$`.
    Counter { loc: SrcLocation },

    /// A number constant.
    Number { value: Domain, loc: SrcLocation },

    /// A string constant, interned into the symbol table during lowering.
    Text { value: String, loc: SrcLocation },

    /// A unary functor application.
    Unary {
        op: UnaryOp,
        arg: Box<Argument>,
        loc: SrcLocation,
    },

    /// A binary functor application.
    Binary {
        op: BinaryOp,
        lhs: Box<Argument>,
        rhs: Box<Argument>,
        loc: SrcLocation,
    },

    /// A ternary functor application.
    Ternary {
        op: TernaryOp,
        first: Box<Argument>,
        second: Box<Argument>,
        third: Box<Argument>,
        loc: SrcLocation,
    },

    /// A record initializer, `[a, b, …]`.
    Record { args: Vec<Argument>, loc: SrcLocation },

    /// An aggregator, e.g. `sum v : { item(c, v) }`.
    Aggregate {
        op: AggregateOp,
        target: Option<Box<Argument>>,
        body: Vec<Literal>,
        loc: SrcLocation,
    },

    /// A positional argument of a subproof subroutine.
    SubroutineArg { index: usize, loc: SrcLocation },
}

impl Argument {
    pub fn var(name: impl Into<String>) -> Self {
        Argument::Variable {
            name: name.into(),
            loc: SrcLocation::default(),
        }
    }

    pub fn unnamed() -> Self {
        Argument::Unnamed {
            loc: SrcLocation::default(),
        }
    }

    pub fn counter() -> Self {
        Argument::Counter {
            loc: SrcLocation::default(),
        }
    }

    pub fn number(value: Domain) -> Self {
        Argument::Number {
            value,
            loc: SrcLocation::default(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Argument::Text {
            value: value.into(),
            loc: SrcLocation::default(),
        }
    }

    pub fn unary(op: UnaryOp, arg: Argument) -> Self {
        Argument::Unary {
            op,
            arg: Box::new(arg),
            loc: SrcLocation::default(),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Argument, rhs: Argument) -> Self {
        Argument::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            loc: SrcLocation::default(),
        }
    }

    pub fn ternary(op: TernaryOp, first: Argument, second: Argument, third: Argument) -> Self {
        Argument::Ternary {
            op,
            first: Box::new(first),
            second: Box::new(second),
            third: Box::new(third),
            loc: SrcLocation::default(),
        }
    }

    pub fn record(args: Vec<Argument>) -> Self {
        Argument::Record {
            args,
            loc: SrcLocation::default(),
        }
    }

    pub fn aggregate(op: AggregateOp, target: Option<Argument>, body: Vec<Literal>) -> Self {
        Argument::Aggregate {
            op,
            target: target.map(Box::new),
            body,
            loc: SrcLocation::default(),
        }
    }

    pub fn subroutine_arg(index: usize) -> Self {
        Argument::SubroutineArg {
            index,
            loc: SrcLocation::default(),
        }
    }

    /// The source location of the argument.
    pub fn loc(&self) -> &SrcLocation {
        match self {
            Argument::Variable { loc, .. }
            | Argument::Unnamed { loc }
            | Argument::Counter { loc }
            | Argument::Number { loc, .. }
            | Argument::Text { loc, .. }
            | Argument::Unary { loc, .. }
            | Argument::Binary { loc, .. }
            | Argument::Ternary { loc, .. }
            | Argument::Record { loc, .. }
            | Argument::Aggregate { loc, .. }
            | Argument::SubroutineArg { loc, .. } => loc,
        }
    }

    /// True for number and string constants.
    pub fn is_constant(&self) -> bool {
        matches!(self, Argument::Number { .. } | Argument::Text { .. })
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Argument::Variable { .. })
    }

    pub fn is_functor(&self) -> bool {
        matches!(
            self,
            Argument::Unary { .. } | Argument::Binary { .. } | Argument::Ternary { .. }
        )
    }

    /// The name of the variable, if the argument is one.
    pub fn variable_name(&self) -> Option<&str> {
        match self {
            Argument::Variable { name, .. } => Some(name),
            _ => None,
        }
    }
}

// Structural equality, ignoring source locations.
impl PartialEq for Argument {
    fn eq(&self, other: &Self) -> bool {
        use Argument::*;
        match (self, other) {
            (Variable { name: a, .. }, Variable { name: b, .. }) => a == b,
            (Unnamed { .. }, Unnamed { .. }) => true,
            (Counter { .. }, Counter { .. }) => true,
            (Number { value: a, .. }, Number { value: b, .. }) => a == b,
            (Text { value: a, .. }, Text { value: b, .. }) => a == b,
            (Unary { op: a, arg: x, .. }, Unary { op: b, arg: y, .. }) => a == b && x == y,
            (
                Binary {
                    op: a,
                    lhs: al,
                    rhs: ar,
                    ..
                },
                Binary {
                    op: b,
                    lhs: bl,
                    rhs: br,
                    ..
                },
            ) => a == b && al == bl && ar == br,
            (
                Ternary {
                    op: a,
                    first: a0,
                    second: a1,
                    third: a2,
                    ..
                },
                Ternary {
                    op: b,
                    first: b0,
                    second: b1,
                    third: b2,
                    ..
                },
            ) => a == b && a0 == b0 && a1 == b1 && a2 == b2,
            (Record { args: a, .. }, Record { args: b, .. }) => a == b,
            (
                Aggregate {
                    op: a,
                    target: at,
                    body: ab,
                    ..
                },
                Aggregate {
                    op: b,
                    target: bt,
                    body: bb,
                    ..
                },
            ) => a == b && at == bt && ab == bb,
            (SubroutineArg { index: a, .. }, SubroutineArg { index: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for Argument {}

impl std::fmt::Display for Argument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Argument::Variable { name, .. } => write!(f, "{name}"),
            Argument::Unnamed { .. } => write!(f, "_"),
            Argument::Counter { .. } => write!(f, "$"),
            Argument::Number { value, .. } => write!(f, "{value}"),
            Argument::Text { value, .. } => write!(f, "\"{value}\""),
            Argument::Unary { op, arg, .. } => match op {
                UnaryOp::Neg => write!(f, "-({arg})"),
                _ => write!(f, "{}({arg})", op.symbol()),
            },
            Argument::Binary { op, lhs, rhs, .. } => match op {
                BinaryOp::Max | BinaryOp::Min | BinaryOp::Cat => {
                    write!(f, "{}({lhs}, {rhs})", op.symbol())
                }
                _ => write!(f, "({lhs} {} {rhs})", op.symbol()),
            },
            Argument::Ternary {
                op,
                first,
                second,
                third,
                ..
            } => write!(f, "{}({first}, {second}, {third})", op.symbol()),
            Argument::Record { args, .. } => {
                write!(f, "[")?;
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, "]")
            }
            Argument::Aggregate { op, target, body, .. } => {
                write!(f, "{op}")?;
                if let Some(target) = target {
                    write!(f, " {target}")?;
                }
                write!(f, " : {{ ")?;
                for (index, literal) in body.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{literal}")?;
                }
                write!(f, " }}")
            }
            Argument::SubroutineArg { index, .. } => write!(f, "arg({index})"),
        }
    }
}
