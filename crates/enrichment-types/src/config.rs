// ─────────────────────────────────────────────────────────────────────
// Enrichment Cascade Core — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::{
    ITER_MAX, RESIDUAL_TOLERANCE, SIMPLEX_TOLERANCE, UNBOUNDED_QTY, UNBOUNDED_THRESHOLD,
};
use crate::error::{EnrichmentError, EnrichmentResult};
use crate::state::Composition;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Separation technology. Only selects optimiser seeds and stage bounds;
/// the separation physics is the same for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentProcess {
    Centrifuge,
    Diffusion,
}

impl EnrichmentProcess {
    /// Initial enriching-stage counts tried by the optimiser.
    pub fn enriching_seeds(self) -> &'static [f64] {
        match self {
            EnrichmentProcess::Centrifuge => &[5.0, 10.0, 50.0],
            EnrichmentProcess::Diffusion => &[500.0, 1000.0, 5000.0],
        }
    }

    /// Initial stripping-stage counts tried by the optimiser.
    pub fn stripping_seeds(self) -> &'static [f64] {
        match self {
            EnrichmentProcess::Centrifuge => &[1.0, 5.0, 10.0, 50.0],
            EnrichmentProcess::Diffusion => &[100.0, 500.0, 1000.0, 5000.0],
        }
    }

    /// Largest stage count per section considered physical.
    pub fn max_stages(self) -> f64 {
        match self {
            EnrichmentProcess::Centrifuge => 200.0,
            EnrichmentProcess::Diffusion => 7000.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EnrichmentProcess::Centrifuge => "centrifuge",
            EnrichmentProcess::Diffusion => "diffusion",
        }
    }
}

impl fmt::Display for EnrichmentProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnrichmentProcess {
    type Err = EnrichmentError;

    fn from_str(s: &str) -> EnrichmentResult<Self> {
        match s {
            "centrifuge" => Ok(EnrichmentProcess::Centrifuge),
            "diffusion" => Ok(EnrichmentProcess::Diffusion),
            other => Err(EnrichmentError::ConfigError(format!(
                "process must be 'centrifuge' or 'diffusion', got '{other}'"
            ))),
        }
    }
}

fn default_unbounded() -> f64 {
    UNBOUNDED_QTY
}
fn default_true() -> bool {
    true
}

/// Input of one cascade calculation.
///
/// Assays are U-235 atom fractions. Quantity constraints that do not bind
/// are left at [`UNBOUNDED_QTY`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeSpec {
    pub feed_composition: Composition,
    pub target_product_assay: f64,
    pub target_tails_assay: f64,
    /// Overall product-to-feed U-235 separation factor.
    pub gamma_235: f64,
    pub process: EnrichmentProcess,
    #[serde(default = "default_unbounded")]
    pub feed_qty: f64,
    #[serde(default = "default_unbounded")]
    pub product_qty: f64,
    #[serde(default = "default_unbounded")]
    pub max_swu: f64,
    /// Only valid together with `use_integer_stages`.
    #[serde(default = "default_true")]
    pub use_downblending: bool,
    #[serde(default = "default_true")]
    pub use_integer_stages: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_init_enriching: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_init_stripping: Option<f64>,
}

/// True if `qty` is the "no constraint" sentinel (or larger).
pub fn is_unbounded(qty: f64) -> bool {
    qty > UNBOUNDED_THRESHOLD
}

impl CascadeSpec {
    /// Spec with every quantity unbounded, integer staging and downblending on.
    pub fn new(
        feed_composition: Composition,
        target_product_assay: f64,
        target_tails_assay: f64,
        gamma_235: f64,
        process: EnrichmentProcess,
    ) -> Self {
        CascadeSpec {
            feed_composition,
            target_product_assay,
            target_tails_assay,
            gamma_235,
            process,
            feed_qty: UNBOUNDED_QTY,
            product_qty: UNBOUNDED_QTY,
            max_swu: UNBOUNDED_QTY,
            use_downblending: true,
            use_integer_stages: true,
            n_init_enriching: None,
            n_init_stripping: None,
        }
    }

    pub fn with_feed_qty(mut self, qty: f64) -> Self {
        self.feed_qty = qty;
        self
    }

    pub fn with_product_qty(mut self, qty: f64) -> Self {
        self.product_qty = qty;
        self
    }

    pub fn with_max_swu(mut self, swu: f64) -> Self {
        self.max_swu = swu;
        self
    }

    pub fn with_staging(mut self, use_integer_stages: bool, use_downblending: bool) -> Self {
        self.use_integer_stages = use_integer_stages;
        self.use_downblending = use_downblending;
        self
    }

    pub fn with_initial_guess(mut self, n_enriching: f64, n_stripping: f64) -> Self {
        self.n_init_enriching = Some(n_enriching);
        self.n_init_stripping = Some(n_stripping);
        self
    }

    /// U-235 atom fraction of the feed.
    pub fn feed_assay(&self) -> f64 {
        self.feed_composition.to_atom_basis().assay()
    }

    /// Caller-supplied starting stage counts, if both are present and positive.
    pub fn initial_guess(&self) -> Option<(f64, f64)> {
        match (self.n_init_enriching, self.n_init_stripping) {
            (Some(e), Some(s)) if e > 0.0 && s > 0.0 && e.is_finite() && s.is_finite() => {
                Some((e, s))
            }
            _ => None,
        }
    }

    /// Check the request before any numerics run.
    pub fn validate(&self) -> EnrichmentResult<()> {
        let xp = self.target_product_assay;
        let xt = self.target_tails_assay;
        if !(xp.is_finite() && xt.is_finite()) || xp <= 0.0 || xp >= 1.0 || xt <= 0.0 || xt >= 1.0
        {
            return Err(EnrichmentError::InvalidTarget(format!(
                "target assays must lie in (0, 1): product={xp}, tails={xt}"
            )));
        }
        if xt >= xp {
            return Err(EnrichmentError::InvalidTarget(format!(
                "target tails assay {xt} must be below target product assay {xp}"
            )));
        }

        let xf = self.feed_assay();
        if xf <= 0.0 {
            return Err(EnrichmentError::InvalidComposition(
                "feed U235 content unspecified".to_string(),
            ));
        }
        if xp <= xf {
            return Err(EnrichmentError::InvalidTarget(format!(
                "target product assay {xp} must exceed feed assay {xf}"
            )));
        }
        if xt >= xf {
            return Err(EnrichmentError::InvalidTarget(format!(
                "target tails assay {xt} must be below feed assay {xf}"
            )));
        }

        if !self.gamma_235.is_finite() || self.gamma_235 <= 1.0 {
            return Err(EnrichmentError::InvalidQuantity(format!(
                "gamma_235 must be > 1, got {}",
                self.gamma_235
            )));
        }

        for (name, qty) in [
            ("feed_qty", self.feed_qty),
            ("product_qty", self.product_qty),
            ("max_swu", self.max_swu),
        ] {
            if qty.is_nan() || qty <= 0.0 {
                return Err(EnrichmentError::InvalidQuantity(format!(
                    "{name} must be strictly positive, got {qty}"
                )));
            }
        }
        if is_unbounded(self.feed_qty) && is_unbounded(self.product_qty) && is_unbounded(self.max_swu)
        {
            return Err(EnrichmentError::InvalidQuantity(
                "feed_qty, product_qty and max_swu are all unbounded; at least one must be finite"
                    .to_string(),
            ));
        }

        if self.use_downblending && !self.use_integer_stages {
            return Err(EnrichmentError::ConfigError(
                "downblending requires integer stages".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_file(path: impl AsRef<Path>) -> EnrichmentResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Stage-count minimiser settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_residual_tolerance")]
    pub residual_tolerance: f64,
    #[serde(default = "default_simplex_tolerance")]
    pub simplex_tolerance: f64,
}

fn default_max_iterations() -> usize {
    ITER_MAX
}
fn default_residual_tolerance() -> f64 {
    RESIDUAL_TOLERANCE
}
fn default_simplex_tolerance() -> f64 {
    SIMPLEX_TOLERANCE
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            max_iterations: default_max_iterations(),
            residual_tolerance: default_residual_tolerance(),
            simplex_tolerance: default_simplex_tolerance(),
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> EnrichmentResult<()> {
        if self.max_iterations == 0 {
            return Err(EnrichmentError::ConfigError(
                "optimizer requires max_iterations >= 1".to_string(),
            ));
        }
        if !(self.residual_tolerance.is_finite() && self.residual_tolerance > 0.0) {
            return Err(EnrichmentError::ConfigError(format!(
                "optimizer residual_tolerance must be finite and > 0, got {}",
                self.residual_tolerance
            )));
        }
        if !(self.simplex_tolerance.is_finite() && self.simplex_tolerance >= 0.0) {
            return Err(EnrichmentError::ConfigError(format!(
                "optimizer simplex_tolerance must be finite and >= 0, got {}",
                self.simplex_tolerance
            )));
        }
        Ok(())
    }
}

/// Which implementation answers a calculation request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    #[default]
    Native,
    /// File-exchange bridge to an external program. `{file}` in `args` is
    /// replaced with the exchange file path.
    External {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        work_dir: Option<PathBuf>,
        #[serde(default)]
        uid: Option<String>,
    },
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    pub cascade: CascadeSpec,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

impl EnrichmentConfig {
    pub fn from_file(path: impl AsRef<Path>) -> EnrichmentResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.optimizer.validate()?;
        Ok(config)
    }
}
