/*!
A compiler for Datalog programs with stratified negation and aggregation.

stoat_dl is the middle end of a Datalog system: it takes a logic program ---
relation declarations with typed attributes, clauses of the form
`head :- body`, facts, I/O directives and optional execution plans --- and
lowers it through two intermediate representations into a program for a
relational algebra machine (RAM), which an external backend interprets or
synthesizes into native code. The computed result is the least fixpoint of
the program under stratified negation and aggregation.

# Orientation

The library is built around the core structure of a [translation
unit](crate::context::TranslationUnit): a [program](crate::ast::Program), a
[symbol table](crate::ast::symbol::SymbolTable), and an [error
report](crate::reports::ErrorReport). A frontend hands a translation unit
over --- programmatically, or serialized --- and a
[Compiler](crate::context::Compiler) drives it through the middle end:

- The [semantic checker](crate::checks) establishes the global invariants:
  atoms resolve with matching arity, every head and negated variable is
  grounded, facts are ground, every argument has a non-empty type set, and
  negation and aggregation close no dependency cycle.
- The [transform pipeline](crate::transform) rewrites the program: aliases
  are unified away, relation copies collapse, aggregation queries
  materialize, boolean constraints and empty relations vanish, disconnected
  literals and existentials reduce, `inline` relations expand at their call
  sites, and --- on request --- the magic-set transform restricts the
  computation to demanded tuples.
- The [analyses](crate::analysis) feed both of the above: groundedness and
  type inference per clause, and the precedence graph with its strongly
  connected components, topological order and relation schedule.
- The [translator](crate::translate) lowers clauses to relational-algebra
  loop nests, evaluating recursive SCCs by semi-naive fixpoint, and emits
  the [RAM program](crate::ram) the backend consumes.

Useful starting points:

- [Compiler::run](crate::context::Compiler::run) for the whole middle end.
- [ast::builder] for programmatic construction of programs.
- [config::Config] for the compile-time options and their pragma
  counterparts.

# Example

Transitive closure, from construction to RAM:

```rust
use stoat_dl::ast::builder::*;
use stoat_dl::ast::{Clause, Program, Relation};
use stoat_dl::config::Config;
use stoat_dl::context::{Compiler, TranslationUnit};

let mut program = Program::new();
program
    .add_relation(
        Relation::new("edge")
            .attribute("x", "number")
            .attribute("y", "number")
            .input(),
    )
    .unwrap();
program
    .add_relation(
        Relation::new("path")
            .attribute("x", "number")
            .attribute("y", "number")
            .output(),
    )
    .unwrap();

// path(x,y) :- edge(x,y).
program.add_clause(Clause::rule(
    atom("path", vec![var("x"), var("y")]),
    vec![lit(atom("edge", vec![var("x"), var("y")]))],
));
// path(x,y) :- path(x,z), edge(z,y).
program.add_clause(Clause::rule(
    atom("path", vec![var("x"), var("y")]),
    vec![
        lit(atom("path", vec![var("x"), var("z")])),
        lit(atom("edge", vec![var("z"), var("y")])),
    ],
));

let mut tu = TranslationUnit::new(program);
let mut compiler = Compiler::new(Config::default());
let ram = compiler
    .run(&mut tu)
    .expect("the program is well-formed")
    .expect("the program computes something");

// the recursive SCC of path lowers to a semi-naive loop
let rendered = format!("{ram}");
assert!(rendered.contains("LOOP"));
assert!(rendered.contains("@delta_path"));
```

Private items are documented.
*/

pub mod analysis;
pub mod ast;
pub mod checks;
pub mod config;
pub mod context;
pub mod misc;
pub mod ram;
pub mod reports;
pub mod transform;
pub mod translate;
pub mod types;
