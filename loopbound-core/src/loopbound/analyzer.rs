//! Loop-Bound Pipeline
//!
//! Runs the engine over a module and aggregates one result per loop. The module is
//! validated once, up front; the per-function stages assume well-formed IR.
//!
//! # Pipeline Stages (per function)
//! 1. **Program view**: CFG, dominators and loop forest
//! 2. **Counter discovery**: exit guard, counter root and initial value per loop
//! 3. **Increment dataflow**: one fixed-point solve covering every counter candidate
//! 4. **Classification**: ordered rule list, then the closed-form bound solver
//! 5. **Aggregation**: results keyed by `(function, loop)` into a `LoopBoundReport`
//!
//! Functions share no mutable state, so they are analyzed on the rayon thread pool when
//! the configuration asks for it. The report is ordered by key, so parallel and
//! sequential runs produce identical output.

use crate::analysis::ProgramView;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisIssue, Result};
use crate::ir::{Function, Module};
use crate::loopbound::classifier::{LoopCounterDescriptor, StructuralClassifier};
use crate::loopbound::dataflow::IncrementDataflow;
use crate::loopbound::result::{LoopBoundReport, LoopBoundResult, LoopKey, PartialDescriptor};
use rayon::prelude::*;

/// Loop-bound analyzer holding a validated configuration.
pub struct LoopBoundAnalyzer {
    config: AnalysisConfig,
}

impl LoopBoundAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze every function of a module.
    ///
    /// # Errors
    /// Returns `MalformedIr` if the module fails validation (including duplicate function
    /// names); no partial report is produced.
    pub fn analyze_module(&self, module: &Module) -> Result<LoopBoundReport> {
        log::info!(
            "Step 1: Analyzing {} functions of module `{}`",
            module.functions.len(),
            module.name
        );
        module.validate()?;

        let per_function: Vec<Vec<LoopBoundResult>> = if self.config.parallel() {
            module
                .functions
                .par_iter()
                .map(|f| self.analyze_function(f))
                .collect::<Result<_>>()?
        } else {
            module
                .functions
                .iter()
                .map(|f| self.analyze_function(f))
                .collect::<Result<_>>()?
        };

        let mut report = LoopBoundReport::new();
        report.extend(per_function.into_iter().flatten());

        log::info!("Step 2: Aggregated {} loop results", report.len());
        for (classification, count) in report.summary() {
            log::info!("  {classification}: {count}");
        }
        Ok(report)
    }

    /// Analyze the loops of one validated function, in loop-forest order.
    fn analyze_function(&self, function: &Function) -> Result<Vec<LoopBoundResult>> {
        let view = ProgramView::build(function)?;
        if view.loops.is_empty() {
            log::debug!("{}: no loops", function.name);
            return Ok(Vec::new());
        }

        let mut descriptors: Vec<LoopCounterDescriptor> = view
            .loops
            .iter()
            .map(|l| LoopCounterDescriptor::discover(&view, l.id))
            .collect();

        let candidates: Vec<_> = descriptors.iter().filter_map(|d| d.candidate()).collect();
        let dataflow = IncrementDataflow::new(&view, self.config.max_worklist_iterations());
        let solution = match dataflow.solve(&candidates) {
            Ok(solution) => solution,
            Err(exhausted) => {
                log::debug!(
                    "{}: {} block visits, all {} loops are unknown",
                    function.name,
                    exhausted.visits,
                    view.loops.len()
                );
                return Ok(view
                    .loops
                    .iter()
                    .map(|l| {
                        LoopBoundResult::fallback(
                            LoopKey::new(function.name.clone(), l.id),
                            l.header,
                            l.depth,
                            AnalysisIssue::BudgetExhausted(exhausted.visits),
                            PartialDescriptor::default(),
                        )
                    })
                    .collect());
            }
        };
        log::debug!(
            "{}: increment dataflow converged after {} block visits",
            function.name,
            solution.visits
        );

        for descriptor in &mut descriptors {
            descriptor.publish(&solution);
        }

        let classifier = StructuralClassifier::new(&view);
        Ok(descriptors.iter().map(|d| classifier.classify(d)).collect())
    }
}
