/*!
The argument-mapper protocol.

A mapper consumes an argument and yields its replacement.
Mappers that only rewrite certain nodes call [descend] on everything else,
which rebuilds the node with mapped children --- including the literals of
aggregator bodies.

```rust
# use stoat_dl::ast::mapper::{descend, ArgumentMapper};
# use stoat_dl::ast::Argument;
struct Upper;

impl ArgumentMapper for Upper {
    fn map_argument(&mut self, arg: Argument) -> Argument {
        match arg {
            Argument::Variable { name, loc } => Argument::Variable {
                name: name.to_uppercase(),
                loc,
            },
            other => descend(other, self),
        }
    }
}

let term = Argument::record(vec![Argument::var("x"), Argument::number(1)]);
let mapped = Upper.map_argument(term);
assert_eq!(mapped, Argument::record(vec![Argument::var("X"), Argument::number(1)]));
```
*/

use crate::ast::{Argument, Atom, Clause, Literal};

/// Consumes an argument and yields its replacement.
pub trait ArgumentMapper {
    fn map_argument(&mut self, arg: Argument) -> Argument;
}

/// Rebuilds an argument with its children passed through the mapper.
pub fn descend<M: ArgumentMapper + ?Sized>(arg: Argument, mapper: &mut M) -> Argument {
    match arg {
        Argument::Unary { op, arg, loc } => Argument::Unary {
            op,
            arg: Box::new(mapper.map_argument(*arg)),
            loc,
        },
        Argument::Binary { op, lhs, rhs, loc } => Argument::Binary {
            op,
            lhs: Box::new(mapper.map_argument(*lhs)),
            rhs: Box::new(mapper.map_argument(*rhs)),
            loc,
        },
        Argument::Ternary {
            op,
            first,
            second,
            third,
            loc,
        } => Argument::Ternary {
            op,
            first: Box::new(mapper.map_argument(*first)),
            second: Box::new(mapper.map_argument(*second)),
            third: Box::new(mapper.map_argument(*third)),
            loc,
        },
        Argument::Record { args, loc } => Argument::Record {
            args: args.into_iter().map(|a| mapper.map_argument(a)).collect(),
            loc,
        },
        Argument::Aggregate {
            op,
            target,
            mut body,
            loc,
        } => {
            let target = target.map(|t| Box::new(mapper.map_argument(*t)));
            for literal in body.iter_mut() {
                map_literal(literal, mapper);
            }
            Argument::Aggregate {
                op,
                target,
                body,
                loc,
            }
        }
        leaf => leaf,
    }
}

fn take(slot: &mut Argument) -> Argument {
    std::mem::replace(slot, Argument::unnamed())
}

/// Applies a mapper to every argument of an atom.
pub fn map_atom<M: ArgumentMapper + ?Sized>(atom: &mut Atom, mapper: &mut M) {
    for slot in atom.args.iter_mut() {
        *slot = mapper.map_argument(take(slot));
    }
}

/// Applies a mapper to every argument of a literal.
pub fn map_literal<M: ArgumentMapper + ?Sized>(literal: &mut Literal, mapper: &mut M) {
    match literal {
        Literal::Atom(atom) => map_atom(atom, mapper),
        Literal::Negation { atom, .. } => map_atom(atom, mapper),
        Literal::Constraint { lhs, rhs, .. } => {
            **lhs = mapper.map_argument(take(lhs));
            **rhs = mapper.map_argument(take(rhs));
        }
        Literal::Bool { .. } => {}
    }
}

/// Applies a mapper to every argument of a clause, head included.
pub fn map_clause<M: ArgumentMapper + ?Sized>(clause: &mut Clause, mapper: &mut M) {
    map_atom(&mut clause.head, mapper);
    for literal in clause.body.iter_mut() {
        map_literal(literal, mapper);
    }
}

/// Applies a mapper to the body of a clause only.
pub fn map_clause_body<M: ArgumentMapper + ?Sized>(clause: &mut Clause, mapper: &mut M) {
    for literal in clause.body.iter_mut() {
        map_literal(literal, mapper);
    }
}

/// Applies a function to every atom within an argument --- atoms occur
/// inside aggregator bodies only.
pub fn map_atoms_in_argument(arg: &mut Argument, f: &mut impl FnMut(&mut Atom)) {
    match arg {
        Argument::Unary { arg, .. } => map_atoms_in_argument(arg, f),
        Argument::Binary { lhs, rhs, .. } => {
            map_atoms_in_argument(lhs, f);
            map_atoms_in_argument(rhs, f);
        }
        Argument::Ternary {
            first,
            second,
            third,
            ..
        } => {
            map_atoms_in_argument(first, f);
            map_atoms_in_argument(second, f);
            map_atoms_in_argument(third, f);
        }
        Argument::Record { args, .. } => {
            for arg in args {
                map_atoms_in_argument(arg, f);
            }
        }
        Argument::Aggregate { target, body, .. } => {
            if let Some(target) = target {
                map_atoms_in_argument(target, f);
            }
            for literal in body {
                map_atoms_in_literal(literal, f);
            }
        }
        _ => {}
    }
}

/// Applies a function to every atom of a literal, aggregator bodies included.
pub fn map_atoms_in_literal(literal: &mut Literal, f: &mut impl FnMut(&mut Atom)) {
    match literal {
        Literal::Atom(atom) => {
            f(atom);
            for arg in atom.args.iter_mut() {
                map_atoms_in_argument(arg, f);
            }
        }
        Literal::Negation { atom, .. } => {
            f(atom);
            for arg in atom.args.iter_mut() {
                map_atoms_in_argument(arg, f);
            }
        }
        Literal::Constraint { lhs, rhs, .. } => {
            map_atoms_in_argument(lhs, f);
            map_atoms_in_argument(rhs, f);
        }
        Literal::Bool { .. } => {}
    }
}

/// Applies a function to every atom of a clause, head included.
pub fn map_atoms_in_clause(clause: &mut Clause, f: &mut impl FnMut(&mut Atom)) {
    f(&mut clause.head);
    for arg in clause.head.args.iter_mut() {
        map_atoms_in_argument(arg, f);
    }
    for literal in clause.body.iter_mut() {
        map_atoms_in_literal(literal, f);
    }
}

/// A mapper from a closure over arguments.
pub struct FnMapper<F: FnMut(Argument) -> Argument>(pub F);

impl<F: FnMut(Argument) -> Argument> ArgumentMapper for FnMapper<F> {
    fn map_argument(&mut self, arg: Argument) -> Argument {
        (self.0)(arg)
    }
}

/// Renames variables through the given function, descending everywhere.
pub struct VariableRenamer<F: FnMut(&str) -> Option<String>>(pub F);

impl<F: FnMut(&str) -> Option<String>> ArgumentMapper for VariableRenamer<F> {
    fn map_argument(&mut self, arg: Argument) -> Argument {
        match arg {
            Argument::Variable { name, loc } => match (self.0)(&name) {
                Some(renamed) => Argument::Variable { name: renamed, loc },
                None => Argument::Variable { name, loc },
            },
            other => descend(other, self),
        }
    }
}
