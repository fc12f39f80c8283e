/*!
Analyses over the AST.

Analyses borrow the program and produce fresh result structures; they never
mutate the tree.

- [ground] --- which argument occurrences are grounded, per clause.
- [typing] --- the type environment and per-argument type sets, per clause.
- [precedence] --- the precedence graph of the program's relations, its
  strongly connected components, a topological order over them, the relation
  schedule, recursive-clause detection, and redundancy.

The per-clause analyses index argument occurrences by their position in the
canonical walk of [visit_clause_arguments](crate::ast::visit::visit_clause_arguments);
consumers re-walk the unchanged clause to correlate results.
*/

pub mod ground;
pub mod precedence;
pub mod typing;
