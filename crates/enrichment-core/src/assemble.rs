// ─────────────────────────────────────────────────────────────────────
// Enrichment Cascade Core — Result Assembler
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Output packaging and post-calculation invariant checks.
//!
//! A failed check is reported as `InternalConsistency`: the request was
//! accepted, so a violation here points at the numerics, not the input.

use enrichment_types::config::{is_unbounded, CascadeSpec};
use enrichment_types::constants::{EPS_COMPOSITION, EPS_DOUBLE};
use enrichment_types::error::{EnrichmentError, EnrichmentResult};
use enrichment_types::state::{CascadeResult, CascadeState};

fn violation(msg: String) -> EnrichmentError {
    EnrichmentError::InternalConsistency(msg)
}

/// Check every invariant of a finished result against its request.
pub fn check_consistency(spec: &CascadeSpec, result: &CascadeResult) -> EnrichmentResult<()> {
    for (label, comp) in [
        ("product", &result.product_composition),
        ("tails", &result.tails_composition),
    ] {
        let sum = comp.sum();
        if (sum - 1.0).abs() > EPS_COMPOSITION {
            return Err(violation(format!("{label} composition sums to {sum}")));
        }
        if comp.fractions().iter().any(|&v| !(v >= 0.0)) {
            return Err(violation(format!("{label} composition has a negative entry")));
        }
    }

    let quantities = [
        ("feed", result.feed_qty),
        ("product", result.product_qty),
        ("tails", result.tails_qty),
        ("swu", result.swu),
    ];
    for (label, qty) in quantities {
        if !(qty.is_finite() && qty >= 0.0) {
            return Err(violation(format!("{label} quantity is {qty}")));
        }
    }

    let feed = result.feed_qty;
    let scale = feed.max(1.0);
    let imbalance = feed - result.product_qty - result.tails_qty;
    if imbalance.abs() > EPS_DOUBLE * scale {
        return Err(violation(format!(
            "feed {feed} != product {} + tails {}",
            result.product_qty, result.tails_qty
        )));
    }

    let xf = spec.feed_composition.to_atom_basis();
    let xp = result.product_composition.to_atom_basis();
    let xt = result.tails_composition.to_atom_basis();
    for (i, ((f, p), t)) in xf
        .fractions()
        .iter()
        .zip(xp.fractions().iter())
        .zip(xt.fractions().iter())
        .enumerate()
    {
        let lhs = feed * f;
        let rhs = result.product_qty * p + result.tails_qty * t;
        if (lhs - rhs).abs() > EPS_DOUBLE * scale {
            return Err(violation(format!(
                "isotope balance broken at index {i}: feed {lhs} vs product+tails {rhs}"
            )));
        }
    }

    if !is_unbounded(spec.max_swu) && result.swu > spec.max_swu * (1.0 + EPS_DOUBLE) {
        return Err(violation(format!(
            "swu {} exceeds max_swu {}",
            result.swu, spec.max_swu
        )));
    }

    if !(result.n_enriching > 0.0 && result.n_stripping > 0.0) {
        return Err(violation(format!(
            "stage counts must be > 0: n_enriching={}, n_stripping={}",
            result.n_enriching, result.n_stripping
        )));
    }
    Ok(())
}

/// Package the working state and verify it.
pub fn assemble(spec: &CascadeSpec, state: CascadeState) -> EnrichmentResult<CascadeResult> {
    let result = CascadeResult {
        product_composition: state.product_composition.to_atom_basis(),
        tails_composition: state.tails_composition.to_atom_basis(),
        feed_qty: state.feed_qty,
        product_qty: state.product_qty,
        tails_qty: state.tails_qty,
        swu: state.swu,
        n_enriching: state.n_enriching,
        n_stripping: state.n_stripping,
    };
    check_consistency(spec, &result)?;
    Ok(result)
}
