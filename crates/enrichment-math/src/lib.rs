//! Numerical primitives for the enrichment cascade workspace.

pub mod nelder_mead;
