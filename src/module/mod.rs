//! Module layer: resolving a named capability bundle and the deterministic
//! reference implementation of the boundary contract.

pub mod registry;
pub mod sample;
