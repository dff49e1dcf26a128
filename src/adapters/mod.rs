// Adapters layer: concrete implementations of the domain ports and output formats.

pub mod dataset;
pub mod export;
pub mod memory;
