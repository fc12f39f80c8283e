/*!
The AST transform pipeline.

Each transform rewrites the program in place and reports whether anything
changed. The driver applies transforms in a fixed order, logging per-pass
changes, and aborts at the end of the transform which put the first error
into the report --- transforms never abort mid-rewrite.

The pipeline order follows the complete system:

1. unique aggregation variables,
2. the semantic checker,
3. relation inlining,
4. alias resolution,
5. relation-copy removal,
6. boolean-constraint removal,
7. disconnected-literal extraction,
8. existential reduction,
9. aggregation-query materialization,
10. empty-relation removal,
11. redundant-relation removal,

then, when the magic-set option is enabled: constraint normalization, the
magic-set transform itself, and a cleanup round of alias resolution, copy
removal, and empty/redundant-relation removal; finally the execution-plan
checker.
*/

mod aliases;
pub use aliases::ResolveAliases;

mod copies;
pub use copies::RemoveRelationCopies;

mod aggregates;
pub use aggregates::{MaterializeAggregationQueries, UniqueAggregationVariables};

mod empties;
pub use empties::{RemoveEmptyRelations, RemoveRedundantRelations};

mod booleans;
pub use booleans::RemoveBooleanConstraints;

mod disconnected;
pub use disconnected::ExtractDisconnectedLiterals;

mod existentials;
pub use existentials::ReduceExistentials;

mod normalize;
pub use normalize::NormalizeConstraints;

pub mod inline;
pub use inline::InlineRelations;

pub mod magic;
pub use magic::MagicSetTransform;

use crate::checks::{ExecutionPlanChecker, SemanticChecker};
use crate::config::Config;
use crate::context::TranslationUnit;
use crate::misc::log::targets;
use crate::types::err::{self};

/// A rewrite of the translation unit.
pub trait Transform {
    fn name(&self) -> &'static str;

    /// Applies the transform, reporting whether the program changed.
    fn transform(&mut self, tu: &mut TranslationUnit) -> bool;
}

/// The transform pipeline for a given configuration.
pub fn pipeline(config: &Config) -> Vec<Box<dyn Transform>> {
    let mut passes: Vec<Box<dyn Transform>> = vec![
        Box::new(UniqueAggregationVariables::default()),
        Box::new(SemanticChecker::default()),
        Box::new(InlineRelations::default()),
        Box::new(ResolveAliases::default()),
        Box::new(RemoveRelationCopies::default()),
        Box::new(RemoveBooleanConstraints::default()),
        Box::new(ExtractDisconnectedLiterals::default()),
        Box::new(ReduceExistentials::default()),
        Box::new(MaterializeAggregationQueries::default()),
        Box::new(RemoveEmptyRelations::default()),
        Box::new(RemoveRedundantRelations::default()),
    ];

    if config.magic_transform.value {
        passes.push(Box::new(NormalizeConstraints::default()));
        passes.push(Box::new(MagicSetTransform::default()));
        passes.push(Box::new(ResolveAliases::default()));
        passes.push(Box::new(RemoveRelationCopies::default()));
        passes.push(Box::new(RemoveEmptyRelations::default()));
        passes.push(Box::new(RemoveRedundantRelations::default()));
    }

    passes.push(Box::new(ExecutionPlanChecker::default()));
    passes
}

/// Runs the given passes over the translation unit.
///
/// Returns whether any pass changed the program, or the rejection once a
/// pass has filled the report with errors.
pub fn run(
    tu: &mut TranslationUnit,
    passes: &mut [Box<dyn Transform>],
) -> Result<bool, err::CompileError> {
    let mut changed = false;
    for pass in passes.iter_mut() {
        let pass_changed = pass.transform(tu);
        changed |= pass_changed;
        log::debug!(
            target: targets::TRANSFORM,
            "{}: {}",
            pass.name(),
            match pass_changed {
                true => "changed",
                false => "no change",
            }
        );
        if tu.report.has_errors() {
            return Err(err::CompileError::Rejected(tu.report.error_count()));
        }
    }
    Ok(changed)
}
