// ─────────────────────────────────────────────────────────────────────
// Enrichment Cascade Core — Isotope Table
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Fixed, ordered table of the uranium isotopes tracked through a cascade.
//!
//! Nuclides are identified by `(Z·1000 + A)·10000`, e.g. U-235 → 922350000.
//! Every dense composition vector in this workspace is indexed in table order.

use crate::constants::{KEY_MASS_NUMBER, REFERENCE_MASS_NUMBER, Z_URANIUM};
use crate::error::{EnrichmentError, EnrichmentResult};

/// Nuclide identifier.
pub type NucId = u32;

/// Number of isotopes in the table.
pub const N_ISOTOPES: usize = 6;

/// Mass numbers in table order.
pub const MASS_NUMBERS: [u32; N_ISOTOPES] = [232, 233, 234, 235, 236, 238];

/// Atomic masses [u], table order.
pub const ATOMIC_MASSES: [f64; N_ISOTOPES] = [
    232.037_156_2,
    233.039_635_2,
    234.040_952_1,
    235.043_929_9,
    236.045_568_0,
    238.050_788_2,
];

pub const U232: NucId = nuc_id_unchecked(232);
pub const U233: NucId = nuc_id_unchecked(233);
pub const U234: NucId = nuc_id_unchecked(234);
pub const U235: NucId = nuc_id_unchecked(KEY_MASS_NUMBER);
pub const U236: NucId = nuc_id_unchecked(236);
pub const U238: NucId = nuc_id_unchecked(REFERENCE_MASS_NUMBER);

/// Table index of U-235.
pub const KEY_INDEX: usize = 3;

/// Table index of U-238.
pub const REFERENCE_INDEX: usize = 5;

/// All nuclide identifiers in table order.
pub const NUC_IDS: [NucId; N_ISOTOPES] = [U232, U233, U234, U235, U236, U238];

const fn nuc_id_unchecked(mass_number: u32) -> NucId {
    (Z_URANIUM * 1000 + mass_number) * 10000
}

/// Nuclide identifier of the uranium isotope with the given mass number.
pub fn isotope_to_nuc_id(mass_number: u32) -> EnrichmentResult<NucId> {
    if MASS_NUMBERS.contains(&mass_number) {
        Ok(nuc_id_unchecked(mass_number))
    } else {
        Err(EnrichmentError::InvalidIsotope(mass_number))
    }
}

/// Mass number of a tracked nuclide.
pub fn nuc_id_to_isotope(nuc_id: NucId) -> EnrichmentResult<u32> {
    index_of(nuc_id).map(|idx| MASS_NUMBERS[idx])
}

/// Position of a nuclide in the table.
pub fn index_of(nuc_id: NucId) -> EnrichmentResult<usize> {
    NUC_IDS
        .iter()
        .position(|&id| id == nuc_id)
        .ok_or(EnrichmentError::InvalidIsotope(nuc_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nuc_ids() {
        assert_eq!(U235, 922350000);
        assert_eq!(U238, 922380000);
        assert_eq!(NUC_IDS[KEY_INDEX], U235);
        assert_eq!(NUC_IDS[REFERENCE_INDEX], U238);
    }

    #[test]
    fn test_bidirectional_mapping() {
        for &a in &MASS_NUMBERS {
            let id = isotope_to_nuc_id(a).unwrap();
            assert_eq!(nuc_id_to_isotope(id).unwrap(), a);
        }
    }

    #[test]
    fn test_rejects_non_uranium() {
        assert!(matches!(
            isotope_to_nuc_id(237),
            Err(EnrichmentError::InvalidIsotope(237))
        ));
        assert!(matches!(
            nuc_id_to_isotope(942390000),
            Err(EnrichmentError::InvalidIsotope(942390000))
        ));
        assert!(index_of(922370000).is_err());
    }
}
