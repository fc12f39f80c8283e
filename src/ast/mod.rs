/*!
The AST of a Datalog program, as delivered by a frontend.

The model is a family of closed sum types:

- [Argument] --- the terms appearing in argument positions: variables,
  unnamed variables, the auto-increment counter, constants, built-in
  functors, record initializers, aggregators, and subroutine arguments.
- [Literal] --- the elements of a clause body: positive atoms, negated
  atoms, binary constraints, and boolean constraints.
- [Clause] --- a head atom together with a body, an optional execution
  plan, and a generation flag distinguishing user-written from synthesized
  clauses.
- [Relation] --- a declared relation: attributes, qualifier flags, I/O
  directives, and the keys of its clauses.
- [Program] --- the owner of all types, relations and clauses.

Clauses live in a slot map owned by the program and are referenced by
[ClauseKey]; each relation holds the keys of the clauses defining it.
This keeps every node owned by exactly one parent while letting the
transforms add and remove clauses freely.

In-place rewriting goes through the [ArgumentMapper](mapper::ArgumentMapper)
protocol: a mapper consumes an argument and yields its replacement, and may
descend into the children of arguments it does not replace. Read-only
traversals are provided by [visit].
*/

mod argument;
pub use argument::{AggregateOp, Argument, BinaryOp, Domain, TernaryOp, UnaryOp};

mod literal;
pub use literal::{Atom, ConstraintOp, Literal};

mod clause;
pub use clause::{Clause, ExecutionOrder, ExecutionPlan};

mod identifier;
pub use identifier::RelationName;

mod relation;
pub use relation::{Attribute, IoDirective, IoKind, Relation, RelationFlags};

mod type_decl;
pub use type_decl::{PrimitiveKind, RecordField, TypeDecl};

mod program;
pub use program::{ClauseKey, Pragma, Program};

pub mod builder;
pub mod mapper;
pub mod symbol;
pub mod visit;
