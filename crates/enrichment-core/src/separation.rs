// ─────────────────────────────────────────────────────────────────────
// Enrichment Cascade Core — Separation Factors
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-isotope stage separation factors from a single U-235 factor.
//!
//! Follows H. G. Wood, "Effects of Separation Processes on Minor Uranium
//! Isotopes in Enrichment Cascades", Science & Global Security 16 (2008):
//! with U-238 as the reference component, the stage separation factor is
//! linear in the mass difference,
//!   α_i = 1 + (238 − m_i)·(α_235 − 1)/(238 − 235).
//!
//! The supplied γ is the product-to-feed factor and is squared to obtain
//! α_235 (product-to-tails over one stage). NOTE: this squaring is kept as
//! the established convention but still awaits confirmation against a
//! domain reference.

use enrichment_types::constants::{KEY_MASS_NUMBER, REFERENCE_MASS_NUMBER};
use enrichment_types::error::{EnrichmentError, EnrichmentResult};
use enrichment_types::isotopes::{index_of, NucId, KEY_INDEX, MASS_NUMBERS, N_ISOTOPES};
use ndarray::Array1;

/// Stage separation factors for every tracked isotope.
#[derive(Debug, Clone, PartialEq)]
pub struct SeparationFactors {
    gamma_235: f64,
    /// α_i relative to U-238, table order.
    alpha: Array1<f64>,
    /// α*_i = α_i / √α_235, the factors normalised to the 235/238 key pair.
    alpha_star: Array1<f64>,
}

/// Derive the separation factor table from the overall U-235 factor γ.
pub fn compute_separation_factors(gamma_235: f64) -> EnrichmentResult<SeparationFactors> {
    if !gamma_235.is_finite() || gamma_235 <= 1.0 {
        return Err(EnrichmentError::InvalidQuantity(format!(
            "gamma_235 must be finite and > 1, got {gamma_235}"
        )));
    }
    let alpha_235 = gamma_235 * gamma_235;
    let key_span = f64::from(REFERENCE_MASS_NUMBER - KEY_MASS_NUMBER);

    let alpha = Array1::from_shape_fn(N_ISOTOPES, |i| {
        let delta_mass = f64::from(REFERENCE_MASS_NUMBER - MASS_NUMBERS[i]);
        1.0 + delta_mass * (alpha_235 - 1.0) / key_span
    });
    let root = alpha[KEY_INDEX].sqrt();
    let alpha_star = alpha.mapv(|a| a / root);

    Ok(SeparationFactors {
        gamma_235,
        alpha,
        alpha_star,
    })
}

impl SeparationFactors {
    pub fn gamma_235(&self) -> f64 {
        self.gamma_235
    }

    pub fn alphas(&self) -> &Array1<f64> {
        &self.alpha
    }

    pub fn alpha_stars(&self) -> &Array1<f64> {
        &self.alpha_star
    }

    /// Stage separation factor of one nuclide.
    pub fn alpha(&self, nuc_id: NucId) -> EnrichmentResult<f64> {
        Ok(self.alpha[index_of(nuc_id)?])
    }
}
