// ─────────────────────────────────────────────────────────────────────
// Enrichment Cascade Core — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Tolerance for scalar comparisons of quantities and assays.
pub const EPS_DOUBLE: f64 = 1e-5;

/// Tolerance for comparing compositions entry by entry.
pub const EPS_COMPOSITION: f64 = 1e-5;

/// Iteration cap of a single stage-count minimisation.
pub const ITER_MAX: usize = 200;

/// Quantity passed for a constraint that is not binding.
pub const UNBOUNDED_QTY: f64 = 1e299;

/// Anything above this is treated as unbounded.
pub const UNBOUNDED_THRESHOLD: f64 = 1e298;

/// Squared relative assay residual accepted as a converged staging.
pub const RESIDUAL_TOLERANCE: f64 = 1e-14;

/// Simplex diameter (in stages) below which the minimiser stops.
pub const SIMPLEX_TOLERANCE: f64 = 1e-12;

/// Atomic number of uranium.
pub const Z_URANIUM: u32 = 92;

/// Mass number of the key (enriched) isotope.
pub const KEY_MASS_NUMBER: u32 = 235;

/// Mass number of the reference (non-enriching) isotope.
pub const REFERENCE_MASS_NUMBER: u32 = 238;
