//! Gateway configuration sizing.

use serde::{Deserialize, Serialize};

use super::{Calculations, GatewayLimits, GatewayType, PlanError};

/// The hardware plan: which unit type and how many of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfiguration {
    #[serde(rename = "type")]
    pub gateway_type: GatewayType,
    pub count: u32,
}

impl GatewayConfiguration {
    pub fn new(gateway_type: GatewayType, count: u32) -> Self {
        Self { gateway_type, count }
    }

    pub fn limits(&self) -> GatewayLimits {
        self.gateway_type.limits()
    }
}

/// Smallest unit count for which every dimension fits, assuming the load
/// divides evenly across units. Never less than one.
///
/// This is a necessary condition only; per-instance fit is checked again
/// during assignment.
pub fn minimum_count(totals: &Calculations, limits: &GatewayLimits) -> u32 {
    let by_streams = totals.total_streams.div_ceil(limits.max_streams);
    let by_throughput = (totals.total_throughput / limits.max_throughput).ceil() as u32;
    let by_storage = (totals.total_storage / limits.max_storage).ceil() as u32;

    by_streams.max(by_throughput).max(by_storage).max(1)
}

/// Largest useful unit count: one unit per stream, or the minimum when a
/// single stream already needs more than one unit's worth of a dimension.
pub fn maximum_count(totals: &Calculations, limits: &GatewayLimits) -> u32 {
    totals.total_streams.max(minimum_count(totals, limits))
}

/// Recommend a configuration for the aggregated totals.
///
/// A single 8-channel unit when everything fits in one, otherwise the
/// minimum number of 16-channel units.
pub fn recommend(totals: &Calculations) -> GatewayConfiguration {
    let small = GatewayType::EightChannel.limits();
    if totals.total_streams <= small.max_streams
        && totals.total_throughput <= small.max_throughput
        && totals.total_storage <= small.max_storage
    {
        return GatewayConfiguration::new(GatewayType::EightChannel, 1);
    }

    let large = GatewayType::SixteenChannel;
    GatewayConfiguration::new(large, minimum_count(totals, &large.limits()))
}

/// Check a user-selected configuration against the load.
pub fn validate_configuration(
    config: &GatewayConfiguration,
    totals: &Calculations,
) -> Result<(), PlanError> {
    if config.count < 1 {
        return Err(PlanError::InvalidInput("gateway count must be at least 1".to_string()));
    }

    let minimum = minimum_count(totals, &config.limits());
    if config.count < minimum {
        return Err(PlanError::ConfigurationUnderflow {
            gateway_type: config.gateway_type,
            count: config.count,
            minimum,
        });
    }

    let maximum = maximum_count(totals, &config.limits());
    if config.count > maximum {
        return Err(PlanError::InvalidInput(format!(
            "{} x {} exceeds the {} unit(s) this load can use",
            config.count, config.gateway_type, maximum
        )));
    }

    Ok(())
}
