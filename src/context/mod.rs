/*!
The translation unit and the compiler driving it.

A [TranslationUnit] is what an external frontend hands over: the program,
the symbol table of interned string constants, and the error report the
pipeline accumulates diagnostics into. There is no global state --- the
configuration, symbols and report are threaded explicitly.

The [Compiler] owns a configuration and runs the middle end: pragmas,
semantic checks and the transform pipeline, then lowering to RAM.

# Example

```rust
use stoat_dl::ast::builder::*;
use stoat_dl::ast::{Clause, Program, Relation};
use stoat_dl::config::Config;
use stoat_dl::context::{Compiler, TranslationUnit};

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

let mut tu = TranslationUnit::new(program);
let mut compiler = Compiler::new(Config::default());

let ram = compiler.run(&mut tu).expect("the program is well-formed");
assert!(ram.is_some());
```
*/

use serde::{Deserialize, Serialize};

use crate::ast::symbol::SymbolTable;
use crate::ast::Program;
use crate::config::{apply_pragmas, Config};
use crate::ram::RamProgram;
use crate::reports::ErrorReport;
use crate::transform;
use crate::translate;
use crate::types::err::{self};

/// A program under compilation, with its symbols and diagnostics.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TranslationUnit {
    pub program: Program,

    #[serde(default)]
    pub symbols: SymbolTable,

    #[serde(default)]
    pub report: ErrorReport,
}

impl TranslationUnit {
    pub fn new(program: Program) -> Self {
        TranslationUnit {
            program,
            symbols: SymbolTable::new(),
            report: ErrorReport::default(),
        }
    }
}

/// The middle end: checks, transforms, and lowers a translation unit.
pub struct Compiler {
    pub config: Config,
}

impl Compiler {
    pub fn new(config: Config) -> Self {
        Compiler { config }
    }

    /// Applies pragmas, the semantic checks and the transform pipeline.
    ///
    /// On return the program is rewritten in place; a rejection leaves the
    /// diagnostics in the unit's report.
    pub fn rewrite(&mut self, tu: &mut TranslationUnit) -> Result<(), err::CompileError> {
        apply_pragmas(&mut self.config, &tu.program, &mut tu.report);
        if tu.report.has_errors() {
            return Err(err::CompileError::Rejected(tu.report.error_count()));
        }

        let mut passes = transform::pipeline(&self.config);
        transform::run(tu, &mut passes)?;
        Ok(())
    }

    /// The complete middle end: [rewrite](Compiler::rewrite) followed by
    /// lowering to a RAM program.
    ///
    /// `None` results from a program scheduling nothing.
    pub fn run(
        &mut self,
        tu: &mut TranslationUnit,
    ) -> Result<Option<RamProgram>, err::CompileError> {
        self.rewrite(tu)?;
        let ram = translate::translate_program(tu, &self.config)?;
        Ok(ram)
    }
}
