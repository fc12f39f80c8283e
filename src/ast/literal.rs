/*!
Atoms and literals.

An [Atom] is a predicate application `p(t₁, …, tₙ)`.
A [Literal] is an element of a clause body: a positive atom, a negated atom,
a binary constraint, or a boolean constraint.

As with arguments, equality is structural and ignores source locations.
*/

use serde::{Deserialize, Serialize};

use crate::ast::{Argument, RelationName};
use crate::reports::SrcLocation;

/// Binary constraint operators.
///
/// Equality and inequality apply to any pair of same-typed terms, the order
/// comparisons to numbers, and the matching operators to symbols.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Regular expression match over symbols.
    Match,
    NotMatch,
    /// Substring containment over symbols.
    Contains,
    NotContains,
}

impl ConstraintOp {
    /// True when both operands are constrained to numbers.
    pub fn numeric(self) -> bool {
        matches!(
            self,
            ConstraintOp::Lt | ConstraintOp::Le | ConstraintOp::Gt | ConstraintOp::Ge
        )
    }

    /// True when both operands are constrained to symbols.
    pub fn symbolic(self) -> bool {
        matches!(
            self,
            ConstraintOp::Match
                | ConstraintOp::NotMatch
                | ConstraintOp::Contains
                | ConstraintOp::NotContains
        )
    }

    /// The complementary operator.
    pub fn negated(self) -> Self {
        match self {
            ConstraintOp::Eq => ConstraintOp::Ne,
            ConstraintOp::Ne => ConstraintOp::Eq,
            ConstraintOp::Lt => ConstraintOp::Ge,
            ConstraintOp::Le => ConstraintOp::Gt,
            ConstraintOp::Gt => ConstraintOp::Le,
            ConstraintOp::Ge => ConstraintOp::Lt,
            ConstraintOp::Match => ConstraintOp::NotMatch,
            ConstraintOp::NotMatch => ConstraintOp::Match,
            ConstraintOp::Contains => ConstraintOp::NotContains,
            ConstraintOp::NotContains => ConstraintOp::Contains,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ConstraintOp::Eq => "=",
            ConstraintOp::Ne => "!=",
            ConstraintOp::Lt => "<",
            ConstraintOp::Le => "<=",
            ConstraintOp::Gt => ">",
            ConstraintOp::Ge => ">=",
            ConstraintOp::Match => "match",
            ConstraintOp::NotMatch => "not_match",
            ConstraintOp::Contains => "contains",
            ConstraintOp::NotContains => "not_contains",
        }
    }
}

/// A predicate application.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Atom {
    pub name: RelationName,
    pub args: Vec<Argument>,
    pub loc: SrcLocation,
}

impl Atom {
    pub fn new(name: impl Into<RelationName>, args: Vec<Argument>) -> Self {
        Atom {
            name: name.into(),
            args,
            loc: SrcLocation::default(),
        }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.args == other.args
    }
}

impl Eq for Atom {}

impl std::fmt::Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(", self.name)?;
        for (index, arg) in self.args.iter().enumerate() {
            if index > 0 {
                write!(f, ",")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

/// A body literal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Literal {
    /// A positive atom.
    Atom(Atom),

    /// A negated atom.
    Negation { atom: Atom, loc: SrcLocation },

    /// A binary constraint between two terms.
    Constraint {
        op: ConstraintOp,
        lhs: Box<Argument>,
        rhs: Box<Argument>,
        loc: SrcLocation,
    },

    /// A boolean constraint, `true` or `false`.
    Bool { value: bool, loc: SrcLocation },
}

impl Literal {
    pub fn atom(atom: Atom) -> Self {
        Literal::Atom(atom)
    }

    pub fn negation(atom: Atom) -> Self {
        Literal::Negation {
            atom,
            loc: SrcLocation::default(),
        }
    }

    pub fn constraint(op: ConstraintOp, lhs: Argument, rhs: Argument) -> Self {
        Literal::Constraint {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            loc: SrcLocation::default(),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Literal::Bool {
            value,
            loc: SrcLocation::default(),
        }
    }

    /// The atom mentioned by the literal, for positive atoms and negations.
    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Literal::Atom(atom) => Some(atom),
            Literal::Negation { atom, .. } => Some(atom),
            _ => None,
        }
    }

    pub fn loc(&self) -> &SrcLocation {
        match self {
            Literal::Atom(atom) => &atom.loc,
            Literal::Negation { loc, .. } => loc,
            Literal::Constraint { loc, .. } => loc,
            Literal::Bool { loc, .. } => loc,
        }
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Atom(a), Literal::Atom(b)) => a == b,
            (Literal::Negation { atom: a, .. }, Literal::Negation { atom: b, .. }) => a == b,
            (
                Literal::Constraint {
                    op: a,
                    lhs: al,
                    rhs: ar,
                    ..
                },
                Literal::Constraint {
                    op: b,
                    lhs: bl,
                    rhs: br,
                    ..
                },
            ) => a == b && al == bl && ar == br,
            (Literal::Bool { value: a, .. }, Literal::Bool { value: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for Literal {}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Atom(atom) => write!(f, "{atom}"),
            Literal::Negation { atom, .. } => write!(f, "!{atom}"),
            Literal::Constraint { op, lhs, rhs, .. } => match op {
                ConstraintOp::Match
                | ConstraintOp::NotMatch
                | ConstraintOp::Contains
                | ConstraintOp::NotContains => write!(f, "{}({lhs}, {rhs})", op.symbol()),
                _ => write!(f, "{lhs} {} {rhs}", op.symbol()),
            },
            Literal::Bool { value, .. } => write!(f, "{value}"),
        }
    }
}
