/*!
Execution-plan version checking.

A recursive clause is translated once per body atom within its SCC, and its
execution plan may fix an order per version. A plan naming a version beyond
the count of in-SCC atoms can never apply and is reported.
*/

use std::collections::BTreeSet;

use crate::analysis::precedence::{
    relation_schedule, topological_order, PrecedenceGraph, RecursiveClauses, SccGraph,
};
use crate::ast::RelationName;
use crate::context::TranslationUnit;
use crate::reports::{Diagnostic, DiagnosticMessage, Severity};
use crate::transform::Transform;

#[derive(Default)]
pub struct ExecutionPlanChecker;

impl Transform for ExecutionPlanChecker {
    fn name(&self) -> &'static str {
        "execution-plan-checker"
    }

    fn transform(&mut self, tu: &mut TranslationUnit) -> bool {
        let program = &tu.program;
        let precedence = PrecedenceGraph::build(program);
        let sccs = SccGraph::build(&precedence);
        let order = topological_order(&sccs);
        let schedule = relation_schedule(program, &precedence, &sccs, &order);
        let recursive = RecursiveClauses::compute(program);

        for step in &schedule {
            let members: BTreeSet<RelationName> = step.computed.iter().cloned().collect();
            for name in &step.computed {
                for key in program.clauses_of(name) {
                    let clause = program.clause(key);
                    if !recursive.recursive(key) {
                        continue;
                    }
                    let Some(plan) = &clause.plan else {
                        continue;
                    };
                    let versions = clause
                        .body_atoms()
                        .iter()
                        .filter(|atom| members.contains(&atom.name))
                        .count();
                    for (&version, order) in &plan.orders {
                        if version >= versions {
                            tu.report.add(Diagnostic {
                                severity: Severity::Error,
                                primary: DiagnosticMessage::at(
                                    format!("execution plan for version {version}"),
                                    order.loc.clone(),
                                ),
                                additional: vec![DiagnosticMessage::free(format!(
                                    "only versions 0..{} permitted",
                                    versions.saturating_sub(1)
                                ))],
                            });
                        }
                    }
                }
            }
        }
        false
    }
}
