//! Per-gateway capacity validation.
//!
//! Storage is compared and reported in terabytes on both sides, matching the
//! catalog.

use serde::Serialize;

use super::{Calculations, GatewayLimits, Stream};

/// Utilization of one gateway instance and whether its streams fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CapacityResult {
    pub streams: u32,
    pub streams_percent: f64,
    pub throughput: f64,
    pub throughput_percent: f64,
    pub storage: f64,
    pub storage_percent: f64,
    pub fits: bool,
}

impl CapacityResult {
    /// The most loaded of the three dimensions, in percent.
    pub fn max_percent(&self) -> f64 {
        self.streams_percent
            .max(self.throughput_percent)
            .max(self.storage_percent)
    }
}

/// Evaluate a candidate set of streams against one unit's limits.
pub fn evaluate<'a, I>(streams: I, limits: &GatewayLimits) -> CapacityResult
where
    I: IntoIterator<Item = &'a Stream>,
{
    utilization(&Calculations::from_streams(streams), limits)
}

/// Capacity result for totals already summed by the caller.
pub fn utilization(used: &Calculations, limits: &GatewayLimits) -> CapacityResult {
    CapacityResult {
        streams: used.total_streams,
        streams_percent: percent(f64::from(used.total_streams), f64::from(limits.max_streams)),
        throughput: used.total_throughput,
        throughput_percent: percent(used.total_throughput, limits.max_throughput),
        storage: used.total_storage,
        storage_percent: percent(used.total_storage, limits.max_storage),
        fits: used.total_streams <= limits.max_streams
            && used.total_throughput <= limits.max_throughput
            && used.total_storage <= limits.max_storage,
    }
}

fn percent(used: f64, limit: f64) -> f64 {
    if limit <= 0.0 {
        return 0.0;
    }
    used / limit * 100.0
}
