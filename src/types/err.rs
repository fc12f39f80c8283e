/*!
Error types used in the library.

- Some of these are external --- e.g. a program rejected by the semantic
  checker surfaces as [CompileError::Rejected] with the count of errors in
  the report.
- Others guard internal invariants, and are very unlikely to occur during
  use --- e.g. a [TranslateError] notes a clause which reached lowering in a
  shape the earlier passes promise to have removed.

Names of the error enums --- for the most part --- overlap with corresponding
structs, and throughout the library `err::{self}` is used to prefix uses with
`err::`.
*/

use crate::ast::RelationName;

/// A union of varied error kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompileError {
    /// The program was rejected with the noted number of errors in the report.
    Rejected(usize),

    /// An error while assembling a program.
    Build(BuildError),

    /// An error while applying pragmas.
    Pragma(PragmaError),

    /// An error during lowering to RAM.
    Translate(TranslateError),
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(count) => write!(f, "program rejected with {count} error(s)"),
            Self::Build(e) => write!(f, "build error: {e:?}"),
            Self::Pragma(e) => write!(f, "pragma error: {e:?}"),
            Self::Translate(e) => write!(f, "translation error: {e:?}"),
        }
    }
}

impl std::error::Error for CompileError {}

/// Noted errors when assembling a program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildError {
    /// A relation with the given name already exists.
    DuplicateRelation(RelationName),

    /// A type with the given name already exists.
    DuplicateType(String),
}

impl From<BuildError> for CompileError {
    fn from(e: BuildError) -> Self {
        CompileError::Build(e)
    }
}

/// Noted errors when applying pragmas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PragmaError {
    /// The value of a known pragma key failed to parse.
    InvalidValue { key: String, value: String },
}

impl From<PragmaError> for CompileError {
    fn from(e: PragmaError) -> Self {
        CompileError::Pragma(e)
    }
}

/// Noted errors during lowering to RAM.
///
/// Each of these indicates a clause which violated an invariant the earlier
/// passes establish, and so reaching one is a defect in the pipeline rather
/// than in the input program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TranslateError {
    /// A value referenced a variable with no definition point in the loop nest.
    UngroundedValue(String),

    /// An aggregator reached lowering with a body other than a single atom.
    ComplexAggregateBody,

    /// An atom referenced a relation absent from the program.
    MissingRelation(RelationName),

    /// A record initializer was consulted for a location it was never given.
    UnindexedRecord,

    /// The relation schedule was empty though relations remain.
    EmptySchedule,
}

impl From<TranslateError> for CompileError {
    fn from(e: TranslateError) -> Self {
        CompileError::Translate(e)
    }
}
