// ─────────────────────────────────────────────────────────────────────
// Enrichment Cascade Core — Cost Converters
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Capacity converters for resource-exchange valuation.
//!
//! Given a requested amount of product at some assay, report how much
//! separative work or feed a fixed enrichment setup would consume. Only
//! the product quantity binds; feed and SWU are unbounded.

use crate::solver::{EnrichmentSolver, NativeSolver};
use enrichment_types::config::{CascadeSpec, EnrichmentProcess};
use enrichment_types::constants::EPS_COMPOSITION;
use enrichment_types::error::EnrichmentResult;
use enrichment_types::state::{CascadeResult, Composition};
use std::sync::Arc;

/// Enrichment setup shared by both converters.
#[derive(Clone)]
struct Setup {
    feed_composition: Composition,
    tails_assay: f64,
    gamma_235: f64,
    process: EnrichmentProcess,
    use_downblending: bool,
    use_integer_stages: bool,
    solver: Arc<dyn EnrichmentSolver>,
}

impl Setup {
    fn run(&self, product_qty: f64, product_assay: f64) -> EnrichmentResult<CascadeResult> {
        let spec = CascadeSpec::new(
            self.feed_composition.clone(),
            product_assay,
            self.tails_assay,
            self.gamma_235,
            self.process,
        )
        .with_product_qty(product_qty)
        .with_staging(self.use_integer_stages, self.use_downblending);
        self.solver.solve(&spec).map_err(|e| {
            e.context(&format!(
                "{} request for {product_qty} at assay {product_assay} \
                 (feed assay {}, tails assay {})",
                self.solver.name(),
                self.feed_composition.to_atom_basis().assay(),
                self.tails_assay
            ))
        })
    }

    fn approx_eq(&self, other: &Setup) -> bool {
        self.feed_composition
            .approx_eq(&other.feed_composition, EPS_COMPOSITION)
            && self.tails_assay == other.tails_assay
    }
}

impl std::fmt::Debug for Setup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Setup")
            .field("feed_assay", &self.feed_composition.assay())
            .field("tails_assay", &self.tails_assay)
            .field("gamma_235", &self.gamma_235)
            .field("process", &self.process)
            .field("solver", &self.solver.name())
            .finish()
    }
}

macro_rules! converter {
    ($name:ident, $doc:literal, |$r:ident| $out:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone)]
        pub struct $name {
            setup: Setup,
        }

        impl $name {
            /// Converter backed by the native solver, integer staging and
            /// downblending on.
            pub fn new(
                feed_composition: Composition,
                tails_assay: f64,
                gamma_235: f64,
                process: EnrichmentProcess,
            ) -> Self {
                $name {
                    setup: Setup {
                        feed_composition,
                        tails_assay,
                        gamma_235,
                        process,
                        use_downblending: true,
                        use_integer_stages: true,
                        solver: Arc::new(NativeSolver::default()),
                    },
                }
            }

            pub fn with_staging(mut self, use_integer_stages: bool, use_downblending: bool) -> Self {
                self.setup.use_integer_stages = use_integer_stages;
                self.setup.use_downblending = use_downblending;
                self
            }

            pub fn with_solver(mut self, solver: Arc<dyn EnrichmentSolver>) -> Self {
                self.setup.solver = solver;
                self
            }

            pub fn convert(&self, product_qty: f64, product_assay: f64) -> EnrichmentResult<f64> {
                let $r = self.setup.run(product_qty, product_assay)?;
                Ok($out)
            }

            /// Same feed (within composition tolerance) and tails assay.
            pub fn approx_eq(&self, other: &$name) -> bool {
                self.setup.approx_eq(&other.setup)
            }
        }
    };
}

converter!(SwuConverter, "Separative work needed for a product request.", |r| r.swu);
converter!(FeedConverter, "Feed consumed by a product request.", |r| r.feed_qty);
