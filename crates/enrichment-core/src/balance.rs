// ─────────────────────────────────────────────────────────────────────
// Enrichment Cascade Core — Cascade Balance
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Matched-abundance-ratio cascade balance for a trial stage configuration.
//!
//! E. von Halle, "Multicomponent isotope separation in matched abundance
//! ratio cascades composed of stages with large separation factors" (1987).
//! For n_e enriching and n_s stripping stages, isotope i leaves through the
//! tails and product in the ratio
//!   r_i = (1 − α*_i^(−n_e)) / (α*_i^(n_s+1) − 1),
//! which tends to n_e/(n_s + 1) as α*_i → 1. The per-isotope shares of the
//! feed reaching product and tails give both compositions and the cut.

use crate::separation::SeparationFactors;
use enrichment_types::error::{EnrichmentError, EnrichmentResult};
use enrichment_types::isotopes::N_ISOTOPES;
use enrichment_types::state::{Basis, Composition};
use ndarray::Array1;

/// |ln α*| below which the α* → 1 limit is used.
const UNIT_FACTOR_TOL: f64 = 1e-12;

/// Result of balancing one stage configuration, per unit of feed.
#[derive(Debug, Clone)]
pub struct BalanceOutcome {
    pub product: Composition,
    pub tails: Composition,
    /// Product flow per unit feed (the cut P/F).
    pub product_per_feed: f64,
    /// Tails flow per unit feed (T/F).
    pub tails_per_feed: f64,
}

/// Fractions of isotope `i` in the feed that end up in product and tails.
fn stage_shares(alpha_star: f64, n_enriching: f64, n_stripping: f64) -> (f64, f64) {
    let ln_a = alpha_star.ln();
    let ratio = if ln_a.abs() < UNIT_FACTOR_TOL {
        n_enriching / (n_stripping + 1.0)
    } else {
        -(-n_enriching * ln_a).exp_m1() / ((n_stripping + 1.0) * ln_a).exp_m1()
    };
    // Both shares are formed without subtraction so neither loses precision
    // when the other approaches one; ratio = 0 or ∞ is handled by IEEE rules.
    (1.0 / (1.0 + ratio), 1.0 / (1.0 + ratio.recip()))
}

/// Balance the cascade for real-valued stage counts.
pub fn balance(
    feed: &Composition,
    factors: &SeparationFactors,
    n_enriching: f64,
    n_stripping: f64,
) -> EnrichmentResult<BalanceOutcome> {
    if !(n_enriching.is_finite() && n_stripping.is_finite())
        || n_enriching <= 0.0
        || n_stripping <= 0.0
    {
        return Err(EnrichmentError::Domain(format!(
            "stage counts must be finite and > 0: n_enriching={n_enriching}, n_stripping={n_stripping}"
        )));
    }
    let feed = feed.to_atom_basis();
    let xf = feed.fractions();
    let alpha_star = factors.alpha_stars();

    let mut to_product = Array1::zeros(N_ISOTOPES);
    let mut to_tails = Array1::zeros(N_ISOTOPES);
    for i in 0..N_ISOTOPES {
        let (theta, tau) = stage_shares(alpha_star[i], n_enriching, n_stripping);
        to_product[i] = xf[i] * theta;
        to_tails[i] = xf[i] * tau;
    }

    let product_per_feed: f64 = to_product.sum();
    let tails_per_feed: f64 = to_tails.sum();
    if !(product_per_feed > 0.0 && tails_per_feed > 0.0) {
        return Err(EnrichmentError::Domain(format!(
            "degenerate cut P/F={product_per_feed}, T/F={tails_per_feed} at \
             n_enriching={n_enriching}, n_stripping={n_stripping}"
        )));
    }

    Ok(BalanceOutcome {
        product: Composition::from_fractions(to_product, Basis::Atom)?,
        tails: Composition::from_fractions(to_tails, Basis::Atom)?,
        product_per_feed,
        tails_per_feed,
    })
}

/// Binary value function V(x) = (2x − 1)·ln(x / (1 − x)).
pub fn value_function(x: f64) -> EnrichmentResult<f64> {
    if !(x > 0.0 && x < 1.0) {
        return Err(EnrichmentError::Domain(format!(
            "value function undefined at assay {x}; concentration must lie in (0, 1)"
        )));
    }
    Ok((2.0 * x - 1.0) * (x / (1.0 - x)).ln())
}

/// SWU = P·V(x_p) + T·V(x_t) − F·V(x_f) on U-235 assays.
pub fn separative_work(
    product_qty: f64,
    product_assay: f64,
    tails_qty: f64,
    tails_assay: f64,
    feed_qty: f64,
    feed_assay: f64,
) -> EnrichmentResult<f64> {
    Ok(product_qty * value_function(product_assay)?
        + tails_qty * value_function(tails_assay)?
        - feed_qty * value_function(feed_assay)?)
}

/// Separative work per unit of feed for a balanced configuration.
pub fn swu_per_feed(feed: &Composition, outcome: &BalanceOutcome) -> EnrichmentResult<f64> {
    separative_work(
        outcome.product_per_feed,
        outcome.product.assay(),
        outcome.tails_per_feed,
        outcome.tails.assay(),
        1.0,
        feed.to_atom_basis().assay(),
    )
}
