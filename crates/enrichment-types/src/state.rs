// ─────────────────────────────────────────────────────────────────────
// Enrichment Cascade Core — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::error::{EnrichmentError, EnrichmentResult};
use crate::isotopes::{index_of, NucId, ATOMIC_MASSES, KEY_INDEX, NUC_IDS, N_ISOTOPES};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Whether fractions count atoms or mass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Basis {
    #[default]
    Atom,
    Mass,
}

/// Normalised uranium isotopic vector in isotope-table order.
///
/// All entries are finite and non-negative and sum to 1. Instances are
/// immutable; conversions return new values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CompositionRecord", into = "CompositionRecord")]
pub struct Composition {
    fractions: Array1<f64>,
    basis: Basis,
}

/// Serialized form: `{"basis": "atom", "fractions": {"922350000": 0.1, ...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CompositionRecord {
    #[serde(default)]
    basis: Basis,
    fractions: BTreeMap<NucId, f64>,
}

impl TryFrom<CompositionRecord> for Composition {
    type Error = EnrichmentError;

    fn try_from(record: CompositionRecord) -> EnrichmentResult<Self> {
        Composition::from_map(record.fractions, record.basis)
    }
}

impl From<Composition> for CompositionRecord {
    fn from(comp: Composition) -> Self {
        CompositionRecord {
            basis: comp.basis,
            fractions: comp.to_map(),
        }
    }
}

impl Composition {
    /// Build from a dense vector in table order, normalising it.
    pub fn from_fractions(fractions: Array1<f64>, basis: Basis) -> EnrichmentResult<Self> {
        if fractions.len() != N_ISOTOPES {
            return Err(EnrichmentError::InvalidComposition(format!(
                "expected {N_ISOTOPES} isotope fractions, got {}",
                fractions.len()
            )));
        }
        for (idx, &value) in fractions.iter().enumerate() {
            if !value.is_finite() || value < 0.0 {
                return Err(EnrichmentError::InvalidComposition(format!(
                    "fraction of nuclide {} must be finite and >= 0, got {value}",
                    NUC_IDS[idx]
                )));
            }
        }
        let total = fractions.sum();
        if total <= 0.0 {
            return Err(EnrichmentError::InvalidComposition(
                "composition contains no uranium".to_string(),
            ));
        }
        Ok(Composition {
            fractions: fractions / total,
            basis,
        })
    }

    /// Build from `(nuclide id, fraction)` pairs. Missing isotopes are zero.
    pub fn from_map<I>(entries: I, basis: Basis) -> EnrichmentResult<Self>
    where
        I: IntoIterator<Item = (NucId, f64)>,
    {
        let mut fractions = Array1::zeros(N_ISOTOPES);
        for (nuc_id, value) in entries {
            fractions[index_of(nuc_id)?] += value;
        }
        Self::from_fractions(fractions, basis)
    }

    /// Shorthand for an atom-basis composition.
    pub fn atom<I>(entries: I) -> EnrichmentResult<Self>
    where
        I: IntoIterator<Item = (NucId, f64)>,
    {
        Self::from_map(entries, Basis::Atom)
    }

    pub fn fractions(&self) -> &Array1<f64> {
        &self.fractions
    }

    pub fn basis(&self) -> Basis {
        self.basis
    }

    pub fn fraction(&self, nuc_id: NucId) -> EnrichmentResult<f64> {
        Ok(self.fractions[index_of(nuc_id)?])
    }

    /// U-235 fraction on this composition's basis.
    pub fn assay(&self) -> f64 {
        self.fractions[KEY_INDEX]
    }

    pub fn sum(&self) -> f64 {
        self.fractions.sum()
    }

    pub fn to_atom_basis(&self) -> Composition {
        match self.basis {
            Basis::Atom => self.clone(),
            Basis::Mass => {
                let moles = Array1::from_shape_fn(N_ISOTOPES, |i| {
                    self.fractions[i] / ATOMIC_MASSES[i]
                });
                let total = moles.sum();
                Composition {
                    fractions: moles / total,
                    basis: Basis::Atom,
                }
            }
        }
    }

    pub fn to_mass_basis(&self) -> Composition {
        match self.basis {
            Basis::Mass => self.clone(),
            Basis::Atom => {
                let masses = Array1::from_shape_fn(N_ISOTOPES, |i| {
                    self.fractions[i] * ATOMIC_MASSES[i]
                });
                let total = masses.sum();
                Composition {
                    fractions: masses / total,
                    basis: Basis::Mass,
                }
            }
        }
    }

    /// Non-zero entries keyed by nuclide id.
    pub fn to_map(&self) -> BTreeMap<NucId, f64> {
        NUC_IDS
            .iter()
            .zip(self.fractions.iter())
            .filter(|&(_, &v)| v > 0.0)
            .map(|(&id, &v)| (id, v))
            .collect()
    }

    /// Quantity-weighted mix of two compositions on the same basis.
    pub fn mix(&self, qty: f64, other: &Composition, other_qty: f64) -> EnrichmentResult<Self> {
        if self.basis != other.basis {
            return Err(EnrichmentError::InvalidComposition(format!(
                "cannot mix {:?} and {:?} basis compositions",
                self.basis, other.basis
            )));
        }
        if qty < 0.0 || other_qty < 0.0 {
            return Err(EnrichmentError::InvalidQuantity(format!(
                "mixing quantities must be >= 0, got {qty} and {other_qty}"
            )));
        }
        let blended = &self.fractions * qty + &other.fractions * other_qty;
        Self::from_fractions(blended, self.basis)
    }

    /// Entrywise comparison within `eps`. Compositions on different bases
    /// are compared on the atom basis.
    pub fn approx_eq(&self, other: &Composition, eps: f64) -> bool {
        let (a, b) = (self.to_atom_basis(), other.to_atom_basis());
        a.fractions
            .iter()
            .zip(b.fractions.iter())
            .all(|(x, y)| (x - y).abs() <= eps)
    }
}

/// Working data of one calculation. Never shared between invocations.
#[derive(Debug, Clone)]
pub struct CascadeState {
    pub n_enriching: f64,
    pub n_stripping: f64,
    pub product_composition: Composition,
    pub tails_composition: Composition,
    pub feed_qty: f64,
    pub product_qty: f64,
    pub tails_qty: f64,
    pub swu: f64,
    /// Feed routed around the cascade into the product by downblending.
    pub blend_feed_qty: f64,
}

/// Final output of a cascade calculation. All compositions are atom basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeResult {
    pub product_composition: Composition,
    pub tails_composition: Composition,
    pub feed_qty: f64,
    pub product_qty: f64,
    pub tails_qty: f64,
    pub swu: f64,
    pub n_enriching: f64,
    pub n_stripping: f64,
}

impl CascadeResult {
    pub fn product_assay(&self) -> f64 {
        self.product_composition.assay()
    }

    pub fn tails_assay(&self) -> f64 {
        self.tails_composition.assay()
    }
}

impl fmt::Display for CascadeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Used:")?;
        writeln!(f, "  feed               {:11.3}", self.feed_qty)?;
        writeln!(f, "  SWU                {:11.3}", self.swu)?;
        writeln!(f, "  enriching stages   {:11.3}", self.n_enriching)?;
        writeln!(f, "  stripping stages   {:11.3}", self.n_stripping)?;
        writeln!(f, "Produced:")?;
        writeln!(f, "  product            {:11.3}", self.product_qty)?;
        writeln!(f, "  tails              {:11.3}", self.tails_qty)?;
        writeln!(f, "Compositions [%]:")?;
        write!(f, "  U-isotope ")?;
        for a in crate::isotopes::MASS_NUMBERS {
            write!(f, "{a:>12}")?;
        }
        writeln!(f)?;
        for (label, comp) in [
            ("x_p", &self.product_composition),
            ("x_t", &self.tails_composition),
        ] {
            write!(f, "  {label}       ")?;
            for v in comp.fractions().iter() {
                write!(f, "{:12.4e}", v * 100.0)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
