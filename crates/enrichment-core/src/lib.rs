//! Multi-isotope uranium enrichment cascade calculation.
//!
//! Separation factors → matched-abundance-ratio balance → stage count
//! optimisation → integer staging and downblending → verified result.

pub mod assemble;
pub mod balance;
pub mod converters;
pub mod exchange;
pub mod finalize;
pub mod optimizer;
pub mod separation;
pub mod solver;
