//! Gateway capacity planning engine.
//!
//! Derives per-stream demand from camera definitions, sizes a gateway
//! configuration for the aggregated load, and assigns every stream to a
//! gateway instance without exceeding the stream, throughput or storage
//! limits of the chosen gateway type.
//!
//! Everything in here is synchronous and free of I/O. Callers that share a
//! session between tasks serialize access themselves (see `crate::session`).

mod aggregate;
mod assignment;
mod capacity;
mod catalog;
mod demand;
mod recommend;

pub use aggregate::*;
pub use assignment::*;
pub use capacity::*;
pub use catalog::*;
pub use demand::*;
pub use recommend::*;

use thiserror::Error;

/// Planning error types.
///
/// A capacity rejection during manual placement is not an error; it is
/// reported through [`Placement::Rejected`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{count} x {gateway_type} gateway(s) cannot carry this load, at least {minimum} required")]
    ConfigurationUnderflow {
        gateway_type: GatewayType,
        count: u32,
        minimum: u32,
    },
    #[error("unknown stream: {0}")]
    UnknownStream(String),
    #[error("unknown gateway: {0}")]
    UnknownGateway(String),
    #[error("assignment incomplete: {} stream(s) unassigned", .unassigned.len())]
    Incomplete { unassigned: Vec<String> },
}
