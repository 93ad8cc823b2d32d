//! CLI command implementations.

pub mod collapse;
pub mod generate;
