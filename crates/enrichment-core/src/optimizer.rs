// ─────────────────────────────────────────────────────────────────────
// Enrichment Cascade Core — Stage Count Optimizer
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Real-valued stage counts matching the target product and tails assays.
//!
//! The residual is a pure function of (n_e, n_s) closed over the request
//! and the separation factors; it is minimised with Nelder-Mead from a
//! sequence of starting points until one start drives it below tolerance.

use crate::balance::balance;
use crate::separation::SeparationFactors;
use enrichment_math::nelder_mead::{nelder_mead, NelderMeadConfig};
use enrichment_types::config::{CascadeSpec, OptimizerConfig};
use enrichment_types::error::{EnrichmentError, EnrichmentResult};
use tracing::{debug, warn};

/// Used when the caller supplies no usable initial guess.
pub const HEURISTIC_SEED: (f64, f64) = (1.0, 1.0);

/// Converged stage counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSolution {
    pub n_enriching: f64,
    pub n_stripping: f64,
    pub residual: f64,
    /// Simplex iterations spent by the successful start.
    pub iterations: usize,
    /// Number of starts tried, including the successful one.
    pub starts: usize,
}

/// Relative squared deviation of the achieved assays from the targets.
pub fn assay_residual(
    product_assay: f64,
    tails_assay: f64,
    target_product: f64,
    target_tails: f64,
) -> f64 {
    ((product_assay - target_product) / target_product).powi(2)
        + ((tails_assay - target_tails) / target_tails).powi(2)
}

/// Residual of one trial configuration; +inf outside (0, max_stages].
fn objective(spec: &CascadeSpec, factors: &SeparationFactors, n: &[f64; 2]) -> f64 {
    let upper = spec.process.max_stages();
    if !(n[0] > 0.0 && n[1] > 0.0 && n[0] <= upper && n[1] <= upper) {
        return f64::INFINITY;
    }
    match balance(&spec.feed_composition, factors, n[0], n[1]) {
        Ok(out) => assay_residual(
            out.product.assay(),
            out.tails.assay(),
            spec.target_product_assay,
            spec.target_tails_assay,
        ),
        Err(_) => f64::INFINITY,
    }
}

/// U-235 product assay with the enriching section at the stage limit.
///
/// Lighter minor isotopes cap the product assay: past a few dozen stages
/// it plateaus, so this is the most any stage count can deliver for the
/// given stripping section.
pub fn reachable_product_assay(
    spec: &CascadeSpec,
    factors: &SeparationFactors,
    n_stripping: f64,
) -> EnrichmentResult<f64> {
    let out = balance(
        &spec.feed_composition,
        factors,
        spec.process.max_stages(),
        n_stripping,
    )?;
    Ok(out.product.assay())
}

/// Starting points in the order they are tried.
fn starting_points(spec: &CascadeSpec, initial_guess: Option<(f64, f64)>) -> Vec<(f64, f64)> {
    let mut starts = vec![initial_guess.unwrap_or(HEURISTIC_SEED)];
    for &s in spec.process.stripping_seeds() {
        for &e in spec.process.enriching_seeds() {
            starts.push((e, s));
        }
    }
    starts
}

/// Find stage counts whose balance reproduces the target assays.
///
/// Each start is capped at `config.max_iterations`. If no start reaches
/// `config.residual_tolerance` the best attempt is reported through
/// [`EnrichmentError::NonConvergence`].
pub fn solve_stages(
    spec: &CascadeSpec,
    factors: &SeparationFactors,
    initial_guess: Option<(f64, f64)>,
    config: &OptimizerConfig,
) -> EnrichmentResult<StageSolution> {
    let nm_config = NelderMeadConfig {
        max_iters: config.max_iterations,
        f_target: config.residual_tolerance,
        x_tol: config.simplex_tolerance,
    };
    let starts = starting_points(spec, initial_guess);

    let mut best: Option<([f64; 2], f64, usize)> = None;
    for (k, &(e0, s0)) in starts.iter().enumerate() {
        debug!(start = k, n_enriching = e0, n_stripping = s0, "optimizer start");
        let step = [(0.1 * e0).max(0.5), (0.1 * s0).max(0.5)];
        let result = nelder_mead(|n| objective(spec, factors, n), [e0, s0], step, nm_config);

        if result.value <= config.residual_tolerance {
            debug!(
                start = k,
                n_enriching = result.x[0],
                n_stripping = result.x[1],
                residual = result.value,
                iterations = result.iterations,
                "optimizer converged"
            );
            return Ok(StageSolution {
                n_enriching: result.x[0],
                n_stripping: result.x[1],
                residual: result.value,
                iterations: result.iterations,
                starts: k + 1,
            });
        }
        debug!(
            start = k,
            residual = result.value,
            termination = ?result.termination,
            "optimizer start failed"
        );
        if best.map_or(true, |(_, v, _)| result.value < v) {
            best = Some((result.x, result.value, result.iterations));
        }
    }

    let (x, residual, iterations) = best.unwrap_or(([f64::NAN; 2], f64::INFINITY, 0));
    let achieved = balance(&spec.feed_composition, factors, x[0], x[1])
        .map(|out| format!("{:.6}/{:.6}", out.product.assay(), out.tails.assay()))
        .unwrap_or_else(|_| "n/a".to_string());
    let upper = spec.process.max_stages();
    let n_s = if x[1] > 0.0 && x[1] <= upper { x[1] } else { HEURISTIC_SEED.1 };
    let ceiling = reachable_product_assay(spec, factors, n_s)
        .map(|xp| format!("{xp:.6}"))
        .unwrap_or_else(|_| "n/a".to_string());
    warn!(
        feed_assay = spec.feed_assay(),
        target_product = spec.target_product_assay,
        target_tails = spec.target_tails_assay,
        residual,
        reachable_product = %ceiling,
        "stage optimisation failed"
    );
    Err(EnrichmentError::NonConvergence {
        iterations,
        message: format!(
            "best residual {residual:.3e} after {} starts at n_enriching={:.4}, \
             n_stripping={:.4} (achieved product/tails assay {achieved}); \
             feed assay {}, target product {}, target tails {}; \
             maximal reachable product assay {ceiling} at n_enriching={upper}",
            starts.len(),
            x[0],
            x[1],
            spec.feed_assay(),
            spec.target_product_assay,
            spec.target_tails_assay,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::separation::compute_separation_factors;
    use enrichment_types::config::EnrichmentProcess;
    use enrichment_types::isotopes::{U234, U235, U238};
    use enrichment_types::state::Composition;

    fn spec(feed: &[(u32, f64)], product: f64, tails: f64) -> CascadeSpec {
        let feed = Composition::atom(feed.iter().copied()).unwrap();
        CascadeSpec::new(feed, product, tails, 1.4, EnrichmentProcess::Centrifuge)
            .with_product_qty(1000.0)
    }

    #[test]
    fn test_reference_scenario_converges() {
        let s = spec(&[(U234, 0.001), (U235, 0.1), (U238, 0.899)], 0.9, 0.03);
        let sf = compute_separation_factors(s.gamma_235).unwrap();
        let sol = solve_stages(&s, &sf, None, &OptimizerConfig::default()).unwrap();
        assert!(sol.residual <= 1e-14, "residual = {}", sol.residual);
        assert!((sol.n_enriching - 13.386).abs() < 1e-2, "n_e = {}", sol.n_enriching);
        assert!((sol.n_stripping - 2.8036).abs() < 1e-3, "n_s = {}", sol.n_stripping);

        let out = balance(&s.feed_composition, &sf, sol.n_enriching, sol.n_stripping).unwrap();
        assert!((out.product.assay() - 0.9).abs() < 1e-5);
        assert!((out.tails.assay() - 0.03).abs() < 1e-5);
    }

    #[test]
    fn test_initial_guess_tried_first() {
        let s = spec(&[(U234, 0.001), (U235, 0.1), (U238, 0.899)], 0.9, 0.03);
        let sf = compute_separation_factors(s.gamma_235).unwrap();
        let sol = solve_stages(&s, &sf, Some((13.0, 3.0)), &OptimizerConfig::default()).unwrap();
        assert_eq!(sol.starts, 1);
        assert!((sol.n_enriching - 13.386).abs() < 1e-2);
    }

    #[test]
    fn test_unreachable_target_reports_values() {
        let s = spec(&[(U234, 0.3), (U235, 0.1), (U238, 0.6)], 0.9, 0.03);
        let sf = compute_separation_factors(s.gamma_235).unwrap();
        let err = solve_stages(&s, &sf, None, &OptimizerConfig::default()).unwrap_err();
        match &err {
            EnrichmentError::NonConvergence { message, .. } => {
                assert!(message.contains("target product 0.9"), "{message}");
                assert!(message.contains("feed assay 0.1"), "{message}");
                let ceiling: f64 = message
                    .split("maximal reachable product assay ")
                    .nth(1)
                    .and_then(|rest| rest.split_whitespace().next())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(|| panic!("no ceiling in: {message}"));
                assert!(ceiling > 0.2 && ceiling < 0.26, "{message}");
            }
            other => panic!("Unexpected error: {other:?}"),
        }
        assert!(err.is_infeasible_request());
    }

    #[test]
    fn test_reachable_product_assay_plateaus() {
        let s = spec(&[(U234, 0.3), (U235, 0.1), (U238, 0.6)], 0.9, 0.03);
        let sf = compute_separation_factors(s.gamma_235).unwrap();
        let shallow = reachable_product_assay(&s, &sf, 1.0).unwrap();
        let deep = reachable_product_assay(&s, &sf, 50.0).unwrap();
        assert!((shallow - 0.20766).abs() < 1e-4, "x_p = {shallow}");
        assert!((deep - 0.25).abs() < 1e-4, "x_p = {deep}");

        let at_fifty = balance(&s.feed_composition, &sf, 50.0, 1.0).unwrap();
        assert!((at_fifty.product.assay() - shallow).abs() < 1e-6);

        let clean = spec(&[(U234, 0.001), (U235, 0.1), (U238, 0.899)], 0.9, 0.03);
        let xp = reachable_product_assay(&clean, &sf, 3.0).unwrap();
        assert!(xp > 0.9 && xp < 1.0, "x_p = {xp}");
    }

    #[test]
    fn test_diffusion_uses_deep_cascades() {
        let feed = Composition::atom([(U234, 0.000054), (U235, 0.00711), (U238, 0.992836)]).unwrap();
        let s = CascadeSpec::new(feed, 0.045, 0.003, 1.0043, EnrichmentProcess::Diffusion)
            .with_feed_qty(1000.0);
        let sf = compute_separation_factors(s.gamma_235).unwrap();
        let sol = solve_stages(&s, &sf, None, &OptimizerConfig::default()).unwrap();
        assert!((sol.n_enriching - 439.19).abs() < 0.05, "n_e = {}", sol.n_enriching);
        assert!((sol.n_stripping - 201.08).abs() < 0.05, "n_s = {}", sol.n_stripping);
        assert!(sol.n_stripping > EnrichmentProcess::Centrifuge.max_stages());

        assert!(objective(&s, &sf, &[6999.0, 201.0]).is_finite());
        assert!(objective(&s, &sf, &[7001.0, 201.0]).is_infinite());
    }

    #[test]
    fn test_objective_walls() {
        let s = spec(&[(U235, 0.1), (U238, 0.9)], 0.9, 0.03);
        let sf = compute_separation_factors(s.gamma_235).unwrap();
        assert!(objective(&s, &sf, &[0.0, 3.0]).is_infinite());
        assert!(objective(&s, &sf, &[3.0, -1.0]).is_infinite());
        assert!(objective(&s, &sf, &[201.0, 3.0]).is_infinite());
        assert!(objective(&s, &sf, &[10.0, 3.0]).is_finite());
    }

    #[test]
    fn test_starting_point_order() {
        let s = spec(&[(U235, 0.1), (U238, 0.9)], 0.9, 0.03);
        let starts = starting_points(&s, None);
        assert_eq!(starts[0], HEURISTIC_SEED);
        assert_eq!(starts[1], (5.0, 1.0));
        assert_eq!(starts[2], (10.0, 1.0));
        assert_eq!(starts.len(), 1 + 3 * 4);
        assert_eq!(starting_points(&s, Some((7.0, 2.0)))[0], (7.0, 2.0));
    }

    #[test]
    fn test_residual_zero_at_target() {
        assert_eq!(assay_residual(0.9, 0.03, 0.9, 0.03), 0.0);
        let r = assay_residual(0.99, 0.03, 0.9, 0.03);
        assert!((r - 0.01).abs() < 1e-12, "r = {r}");
    }
}
