// ─────────────────────────────────────────────────────────────────────
// Enrichment Cascade Core — Solver Strategies
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Interchangeable implementations of one cascade calculation.

use crate::assemble::assemble;
use crate::exchange::ExchangeFileSolver;
use crate::finalize::finalize;
use crate::optimizer::solve_stages;
use crate::separation::compute_separation_factors;
use enrichment_types::config::{BackendConfig, CascadeSpec, OptimizerConfig};
use enrichment_types::error::EnrichmentResult;
use enrichment_types::state::CascadeResult;
use rayon::prelude::*;
use tracing::info;

/// One cascade calculation: request in, verified result out.
///
/// Implementations hold no per-call state, so a single instance may be
/// shared between threads.
pub trait EnrichmentSolver: Send + Sync {
    fn solve(&self, spec: &CascadeSpec) -> EnrichmentResult<CascadeResult>;

    /// Short label for logs.
    fn name(&self) -> &str;

    /// Separate instance for the `index`-th call of a concurrent batch,
    /// or `None` when `self` can serve every call.
    fn for_batch_item(&self, _index: usize) -> Option<Box<dyn EnrichmentSolver>> {
        None
    }
}

/// In-process balance and optimisation.
#[derive(Debug, Clone, Default)]
pub struct NativeSolver {
    pub config: OptimizerConfig,
}

impl NativeSolver {
    pub fn new(config: OptimizerConfig) -> Self {
        NativeSolver { config }
    }
}

impl EnrichmentSolver for NativeSolver {
    fn solve(&self, spec: &CascadeSpec) -> EnrichmentResult<CascadeResult> {
        spec.validate()?;
        let factors = compute_separation_factors(spec.gamma_235)?;
        let stages = solve_stages(spec, &factors, spec.initial_guess(), &self.config)?;
        let state = finalize(spec, &factors, stages.n_enriching, stages.n_stripping)?;
        let result = assemble(spec, state)?;
        info!(
            process = %spec.process,
            feed = result.feed_qty,
            product = result.product_qty,
            tails = result.tails_qty,
            swu = result.swu,
            n_enriching = result.n_enriching,
            n_stripping = result.n_stripping,
            product_assay = result.product_assay(),
            tails_assay = result.tails_assay(),
            "cascade calculation finished"
        );
        Ok(result)
    }

    fn name(&self) -> &str {
        "native"
    }
}

/// Run one calculation with the default in-process solver.
pub fn calculate(spec: &CascadeSpec) -> EnrichmentResult<CascadeResult> {
    NativeSolver::default().solve(spec)
}

/// Solve independent requests in parallel. Results keep the input order.
///
/// Solvers with per-call resources (the exchange file) get one instance
/// per item through [`EnrichmentSolver::for_batch_item`].
pub fn solve_batch(
    solver: &dyn EnrichmentSolver,
    specs: &[CascadeSpec],
) -> Vec<EnrichmentResult<CascadeResult>> {
    specs
        .par_iter()
        .enumerate()
        .map(|(index, spec)| match solver.for_batch_item(index) {
            Some(item) => item.solve(spec),
            None => solver.solve(spec),
        })
        .collect()
}

/// Instantiate the solver selected by configuration.
pub fn build_solver(
    backend: &BackendConfig,
    optimizer: OptimizerConfig,
) -> Box<dyn EnrichmentSolver> {
    match backend {
        BackendConfig::Native => Box::new(NativeSolver::new(optimizer)),
        BackendConfig::External {
            program,
            args,
            work_dir,
            uid,
        } => {
            let mut solver = ExchangeFileSolver::new(program.clone(), args.clone());
            if let Some(dir) = work_dir {
                solver = solver.with_work_dir(dir.clone());
            }
            if let Some(uid) = uid {
                solver = solver.with_uid(uid.clone());
            }
            Box::new(solver)
        }
    }
}
