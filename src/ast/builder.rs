/*!
Shorthand constructors for programmatic AST construction.

Intended for embedding frontends and tests:

```rust
# use stoat_dl::ast::builder::*;
# use stoat_dl::ast::{Clause, Program, Relation};
let mut program = Program::new();
program
    .add_relation(Relation::new("edge").attribute("x", "number").attribute("y", "number").input())
    .unwrap();
program
    .add_relation(Relation::new("path").attribute("x", "number").attribute("y", "number").output())
    .unwrap();

program.add_clause(Clause::rule(atom("path", vec![var("x"), var("y")]), vec![
    lit(atom("edge", vec![var("x"), var("y")])),
]));
program.add_clause(Clause::rule(atom("path", vec![var("x"), var("y")]), vec![
    lit(atom("path", vec![var("x"), var("z")])),
    lit(atom("edge", vec![var("z"), var("y")])),
]));
```
*/

use crate::ast::{Argument, Atom, ConstraintOp, Domain, Literal, RelationName};

pub fn var(name: impl Into<String>) -> Argument {
    Argument::var(name)
}

pub fn unnamed() -> Argument {
    Argument::unnamed()
}

pub fn num(value: Domain) -> Argument {
    Argument::number(value)
}

pub fn text(value: impl Into<String>) -> Argument {
    Argument::text(value)
}

pub fn rec(args: Vec<Argument>) -> Argument {
    Argument::record(args)
}

pub fn atom(name: impl Into<RelationName>, args: Vec<Argument>) -> Atom {
    Atom::new(name, args)
}

/// A positive atom literal.
pub fn lit(atom: Atom) -> Literal {
    Literal::Atom(atom)
}

/// A negated atom literal.
pub fn neg(atom: Atom) -> Literal {
    Literal::negation(atom)
}

/// An equality constraint.
pub fn eq(lhs: Argument, rhs: Argument) -> Literal {
    Literal::constraint(ConstraintOp::Eq, lhs, rhs)
}

/// A comparison or matching constraint.
pub fn cmp(op: ConstraintOp, lhs: Argument, rhs: Argument) -> Literal {
    Literal::constraint(op, lhs, rhs)
}
