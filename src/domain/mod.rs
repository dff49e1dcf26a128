// Domain layer: project inputs, allocation results and ports. No I/O here.

pub mod allocation;
pub mod model;
pub mod ports;
