//! Stream-to-gateway assignment.
//!
//! An [`AssignmentSession`] owns the stream set, the active configuration and
//! the current [`Assignment`] snapshot. Every mutation builds a new snapshot
//! and swaps it in only once it has been validated, so a rejected placement
//! leaves the session exactly as it was.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

use super::{
    evaluate, utilization, Calculations, CapacityResult, GatewayConfiguration, GatewayLimits,
    PlanError, Stream,
};

/// Index of a gateway instance, `0..count`.
pub type GatewayId = usize;

/// Stream ids placed on each gateway instance, in placement order.
///
/// Serializes as `{"0": [...], "1": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Assignment {
    gateways: Vec<Vec<String>>,
}

impl Assignment {
    /// An assignment with `count` empty gateways.
    pub fn empty(count: usize) -> Self {
        Self {
            gateways: vec![Vec::new(); count],
        }
    }

    pub fn gateway_count(&self) -> usize {
        self.gateways.len()
    }

    /// Stream ids on a gateway; empty for an unknown gateway.
    pub fn streams_in(&self, gateway: GatewayId) -> &[String] {
        self.gateways.get(gateway).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The gateway currently holding a stream.
    pub fn gateway_of(&self, stream_id: &str) -> Option<GatewayId> {
        self.gateways
            .iter()
            .position(|ids| ids.iter().any(|id| id == stream_id))
    }

    /// Total number of placements across all gateways.
    pub fn placed_count(&self) -> usize {
        self.gateways.iter().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GatewayId, &[String])> {
        self.gateways.iter().map(Vec::as_slice).enumerate()
    }

    fn without(&self, stream_id: &str) -> Self {
        Self {
            gateways: self
                .gateways
                .iter()
                .map(|ids| ids.iter().filter(|id| *id != stream_id).cloned().collect())
                .collect(),
        }
    }

    fn push(&mut self, gateway: GatewayId, stream_id: &str) {
        self.gateways[gateway].push(stream_id.to_string());
    }
}

impl Serialize for Assignment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.gateways.len()))?;
        for (gateway, ids) in self.iter() {
            map.serialize_entry(&gateway.to_string(), ids)?;
        }
        map.end()
    }
}

/// Progress of an assignment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentState {
    Unassigned,
    PartiallyAssigned,
    FullyAssigned,
}

/// Outcome of a manual placement.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Placement {
    /// Committed; `capacity` is the target gateway after the move.
    Placed {
        gateway: GatewayId,
        capacity: CapacityResult,
    },
    /// Over capacity; `capacity` is what the target gateway would have been.
    Rejected {
        gateway: GatewayId,
        capacity: CapacityResult,
    },
}

impl Placement {
    pub fn is_placed(&self) -> bool {
        matches!(self, Placement::Placed { .. })
    }
}

/// Streams, configuration and the current assignment snapshot.
#[derive(Debug, Clone)]
pub struct AssignmentSession {
    streams: Vec<Stream>,
    index: HashMap<String, usize>,
    configuration: GatewayConfiguration,
    assignment: Assignment,
}

impl AssignmentSession {
    /// Start a fully unassigned session.
    pub fn new(streams: Vec<Stream>, configuration: GatewayConfiguration) -> Self {
        let index = streams
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();

        Self {
            streams,
            index,
            configuration,
            assignment: Assignment::empty(configuration.count as usize),
        }
    }

    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    pub fn configuration(&self) -> GatewayConfiguration {
        self.configuration
    }

    pub fn limits(&self) -> GatewayLimits {
        self.configuration.limits()
    }

    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    /// Switch to another configuration. Placements made under the previous
    /// limits are dropped.
    pub fn reconfigure(&mut self, configuration: GatewayConfiguration) {
        self.configuration = configuration;
        self.assignment = Assignment::empty(configuration.count as usize);
    }

    /// Parse a gateway id as sent by clients (`"0".."count-1"`).
    pub fn parse_gateway_id(&self, raw: &str) -> Result<GatewayId, PlanError> {
        raw.trim()
            .parse::<GatewayId>()
            .ok()
            .filter(|gateway| *gateway < self.assignment.gateway_count())
            .ok_or_else(|| PlanError::UnknownGateway(raw.to_string()))
    }

    /// Move a stream onto a gateway if the result fits.
    ///
    /// The stream is taken off its current gateway first. On rejection the
    /// previous placement is kept.
    pub fn try_place(&mut self, stream_id: &str, gateway: GatewayId) -> Result<Placement, PlanError> {
        let stream = self.stream(stream_id)?;
        if gateway >= self.assignment.gateway_count() {
            return Err(PlanError::UnknownGateway(gateway.to_string()));
        }

        let mut candidate = self.assignment.without(stream_id);
        let capacity = evaluate(
            self.resolve(candidate.streams_in(gateway)).chain(std::iter::once(stream)),
            &self.limits(),
        );

        if !capacity.fits {
            tracing::debug!(
                "Rejected {} on gateway {}: {:.1}% loaded",
                stream_id,
                gateway,
                capacity.max_percent()
            );
            return Ok(Placement::Rejected { gateway, capacity });
        }

        candidate.push(gateway, stream_id);
        self.assignment = candidate;
        Ok(Placement::Placed { gateway, capacity })
    }

    /// Return a stream to the unassigned pool. Yields the gateway it was on.
    pub fn remove_stream(&mut self, stream_id: &str) -> Result<Option<GatewayId>, PlanError> {
        self.stream(stream_id)?;

        let previous = self.assignment.gateway_of(stream_id);
        if previous.is_some() {
            self.assignment = self.assignment.without(stream_id);
        }
        Ok(previous)
    }

    /// Empty every gateway.
    pub fn clear_all(&mut self) {
        self.assignment = Assignment::empty(self.assignment.gateway_count());
    }

    /// Place every stream automatically, starting from an empty assignment.
    ///
    /// Camera groups go in order of descending total throughput (ties keep
    /// camera order). A group lands whole on the least-loaded gateway that can
    /// take all of it; otherwise its streams go one by one onto the first
    /// gateway with room. Returns the ids of streams left unassigned.
    pub fn auto_assign(&mut self) -> Vec<String> {
        let limits = self.limits();
        let mut working = Assignment::empty(self.assignment.gateway_count());
        let mut loads = vec![Calculations::default(); working.gateway_count()];

        for group in self.camera_groups() {
            let mut best: Option<(GatewayId, f64)> = None;
            for (gateway, load) in loads.iter().enumerate() {
                let with_group = load.with_streams(group.iter().copied());
                if !utilization(&with_group, &limits).fits {
                    continue;
                }

                let current = utilization(load, &limits).max_percent();
                if best.map_or(true, |(_, best_load)| current < best_load) {
                    best = Some((gateway, current));
                }
            }

            if let Some((gateway, _)) = best {
                loads[gateway] = loads[gateway].with_streams(group.iter().copied());
                for stream in &group {
                    working.push(gateway, &stream.id);
                }
                continue;
            }

            tracing::debug!(
                "Camera {} does not fit on any single gateway, placing streams individually",
                group[0].camera_id
            );
            for stream in group {
                let target = loads.iter().position(|load| {
                    utilization(&load.with_streams(std::iter::once(stream)), &limits).fits
                });
                if let Some(gateway) = target {
                    loads[gateway] = loads[gateway].with_streams(std::iter::once(stream));
                    working.push(gateway, &stream.id);
                }
            }
        }

        self.assignment = working;

        let unassigned: Vec<String> = self.unassigned().into_iter().map(|s| s.id.clone()).collect();
        if !unassigned.is_empty() {
            tracing::warn!(
                "Auto-assign left {} of {} streams unassigned on {} x {}",
                unassigned.len(),
                self.streams.len(),
                self.configuration.count,
                self.configuration.gateway_type
            );
        }
        unassigned
    }

    /// Every stream is placed exactly once.
    pub fn is_complete(&self) -> bool {
        self.assignment.placed_count() == self.streams.len()
            && self
                .streams
                .iter()
                .all(|s| self.assignment.gateway_of(&s.id).is_some())
    }

    pub fn state(&self) -> AssignmentState {
        if self.assignment.placed_count() == 0 {
            AssignmentState::Unassigned
        } else if self.is_complete() {
            AssignmentState::FullyAssigned
        } else {
            AssignmentState::PartiallyAssigned
        }
    }

    /// Streams not on any gateway, in stream order.
    pub fn unassigned(&self) -> Vec<&Stream> {
        self.streams
            .iter()
            .filter(|s| self.assignment.gateway_of(&s.id).is_none())
            .collect()
    }

    /// Utilization of every gateway instance.
    pub fn capacity(&self) -> Vec<CapacityResult> {
        let limits = self.limits();
        self.assignment
            .iter()
            .map(|(_, ids)| evaluate(self.resolve(ids), &limits))
            .collect()
    }

    fn stream(&self, stream_id: &str) -> Result<&Stream, PlanError> {
        self.index
            .get(stream_id)
            .map(|i| &self.streams[*i])
            .ok_or_else(|| PlanError::UnknownStream(stream_id.to_string()))
    }

    fn resolve<'a>(&'a self, ids: &'a [String]) -> impl Iterator<Item = &'a Stream> + 'a {
        ids.iter()
            .filter_map(move |id| self.index.get(id).map(|i| &self.streams[*i]))
    }

    /// Streams grouped by camera, heaviest group first.
    fn camera_groups(&self) -> Vec<Vec<&Stream>> {
        let mut groups: Vec<Vec<&Stream>> = Vec::new();
        let mut by_camera: HashMap<&str, usize> = HashMap::new();

        for stream in &self.streams {
            match by_camera.get(stream.camera_id.as_str()) {
                Some(i) => groups[*i].push(stream),
                None => {
                    by_camera.insert(&stream.camera_id, groups.len());
                    groups.push(vec![stream]);
                }
            }
        }

        // Stable sort keeps camera order on ties
        groups.sort_by(|a, b| group_throughput(b).total_cmp(&group_throughput(a)));
        groups
    }
}

fn group_throughput(group: &[&Stream]) -> f64 {
    group.iter().map(|s| s.throughput).sum()
}
