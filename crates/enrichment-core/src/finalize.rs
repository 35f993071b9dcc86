// ─────────────────────────────────────────────────────────────────────
// Enrichment Cascade Core — Integer Staging & Downblending
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Final stage counts, optional downblending and absolute flows.
//!
//! Everything up to [`scale_flows`] works per unit of total feed; the
//! binding quantity constraint of the request then fixes the scale.

use crate::balance::{balance, swu_per_feed};
use crate::separation::SeparationFactors;
use enrichment_types::config::CascadeSpec;
use enrichment_types::error::{EnrichmentError, EnrichmentResult};
use enrichment_types::state::{CascadeState, Composition};
use tracing::debug;

/// Conservative rounding: both sections move toward more separation.
pub fn integer_stages(n_enriching: f64, n_stripping: f64) -> (f64, f64) {
    (n_enriching.ceil(), n_stripping.ceil())
}

/// Flows per unit of total feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowRatios {
    pub product_per_feed: f64,
    pub tails_per_feed: f64,
    pub swu_per_feed: f64,
}

/// Absolute flows after applying the binding constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flows {
    pub feed: f64,
    pub product: f64,
    pub tails: f64,
    pub swu: f64,
}

/// Scale unit flows so the tightest of feed, product and SWU limits is met.
pub fn scale_flows(spec: &CascadeSpec, ratios: &FlowRatios) -> EnrichmentResult<Flows> {
    let p = ratios.product_per_feed;
    let t = ratios.tails_per_feed;
    let w = ratios.swu_per_feed;
    if !(p > 0.0 && p.is_finite() && t.is_finite() && w.is_finite()) {
        return Err(EnrichmentError::Domain(format!(
            "degenerate flow ratios P/F={p}, T/F={t}, SWU/F={w}"
        )));
    }

    let mut product = (spec.feed_qty * p).min(spec.product_qty);
    let mut feed = product / p;
    let mut swu = feed * w;
    if swu > spec.max_swu {
        if w <= 0.0 {
            return Err(EnrichmentError::InvalidQuantity(format!(
                "max_swu {} cannot bind at SWU/F={w}",
                spec.max_swu
            )));
        }
        swu = spec.max_swu;
        feed = swu / w;
        product = feed * p;
    }
    Ok(Flows {
        feed,
        product,
        tails: feed * t,
        swu,
    })
}

/// Blended product and flow ratios per unit of total (cascade + blend) feed.
#[derive(Debug, Clone)]
pub struct Downblend {
    pub product: Composition,
    pub ratios: FlowRatios,
    /// Blend feed as a fraction of total feed.
    pub blend_per_feed: f64,
}

/// Mix cascade product with feed so the key-isotope assay hits `target`.
///
/// `cascade` holds ratios per unit of cascade feed. A product already at
/// or below the target is returned unblended.
pub fn downblend(
    product: &Composition,
    feed: &Composition,
    cascade: &FlowRatios,
    target: f64,
) -> EnrichmentResult<Downblend> {
    let product = product.to_atom_basis();
    let feed = feed.to_atom_basis();
    let xp = product.assay();
    let xf = feed.assay();
    if xp <= target {
        return Ok(Downblend {
            product,
            ratios: *cascade,
            blend_per_feed: 0.0,
        });
    }
    if target <= xf {
        return Err(EnrichmentError::InvalidTarget(format!(
            "cannot downblend to {target} with feed assay {xf}"
        )));
    }

    let pc = cascade.product_per_feed;
    let b = pc * (xp - target) / (target - xf);
    let blended = product.mix(pc, &feed, b)?;
    Ok(Downblend {
        product: blended,
        ratios: FlowRatios {
            product_per_feed: (pc + b) / (1.0 + b),
            tails_per_feed: cascade.tails_per_feed / (1.0 + b),
            swu_per_feed: cascade.swu_per_feed / (1.0 + b),
        },
        blend_per_feed: b / (1.0 + b),
    })
}

/// Balance at the final stage counts and fix the absolute flows.
pub fn finalize(
    spec: &CascadeSpec,
    factors: &SeparationFactors,
    n_enriching: f64,
    n_stripping: f64,
) -> EnrichmentResult<CascadeState> {
    let (n_e, n_s) = if spec.use_integer_stages {
        let (e, s) = integer_stages(n_enriching, n_stripping);
        debug!(
            from_enriching = n_enriching,
            from_stripping = n_stripping,
            n_enriching = e,
            n_stripping = s,
            "rounded stage counts"
        );
        (e, s)
    } else {
        (n_enriching, n_stripping)
    };

    let out = balance(&spec.feed_composition, factors, n_e, n_s)?;
    let cascade = FlowRatios {
        product_per_feed: out.product_per_feed,
        tails_per_feed: out.tails_per_feed,
        swu_per_feed: swu_per_feed(&spec.feed_composition, &out)?,
    };

    let (product_composition, ratios, blend_per_feed) = if spec.use_downblending {
        let blend = downblend(
            &out.product,
            &spec.feed_composition,
            &cascade,
            spec.target_product_assay,
        )?;
        debug!(
            cascade_assay = out.product.assay(),
            blended_assay = blend.product.assay(),
            blend_per_feed = blend.blend_per_feed,
            "downblended product"
        );
        (blend.product, blend.ratios, blend.blend_per_feed)
    } else {
        (out.product, cascade, 0.0)
    };

    let flows = scale_flows(spec, &ratios)?;
    Ok(CascadeState {
        n_enriching: n_e,
        n_stripping: n_s,
        product_composition,
        tails_composition: out.tails,
        feed_qty: flows.feed,
        product_qty: flows.product,
        tails_qty: flows.tails,
        swu: flows.swu,
        blend_feed_qty: flows.feed * blend_per_feed,
    })
}
