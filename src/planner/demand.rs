//! Stream demand derivation.
//!
//! A camera with `lens_count` lenses produces that many independent streams,
//! all sharing the camera's resolution, frame rate and retention settings.

use serde::{Deserialize, Serialize};

use super::PlanError;

/// Resolutions (megapixels) offered by the camera form.
pub const RESOLUTION_MENU: [f64; 8] = [0.3, 1.0, 2.0, 4.0, 5.0, 6.0, 8.0, 12.0];

/// Recording bitrate (Mb/s) per recording resolution (megapixels).
const BITRATE_TABLE: [(f64, f64); 8] = [
    (0.3, 1.0),
    (1.0, 1.5),
    (2.0, 2.0),
    (4.0, 2.5),
    (5.0, 2.8),
    (6.0, 3.0),
    (8.0, 3.5),
    (12.0, 4.0),
];

const DEFAULT_BITRATE_MBPS: f64 = 2.0;
const SECONDS_PER_DAY: f64 = 86_400.0;
/// 8 bits per byte, 1,000,000 megabytes per terabyte.
const MEGABITS_PER_TERABYTE: f64 = 8_000_000.0;

pub const MAX_LENS_COUNT: u32 = 4;
pub const MAX_STORAGE_DAYS: u32 = 365;
pub const MAX_FRAME_RATE: u32 = 120;

/// One physical camera as entered by the installer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDefinition {
    pub name: String,
    pub lens_count: u32,
    /// Megapixels.
    pub streaming_resolution: f64,
    /// Frames per second.
    pub frame_rate: u32,
    /// Megapixels; may differ from the streaming resolution.
    pub recording_resolution: f64,
    pub storage_days: u32,
}

impl CameraDefinition {
    /// Check the field invariants a camera must satisfy before sizing.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.name.trim().is_empty() {
            return Err(PlanError::InvalidInput("camera name cannot be empty".to_string()));
        }
        if !(1..=MAX_LENS_COUNT).contains(&self.lens_count) {
            return Err(PlanError::InvalidInput(format!(
                "{}: lens count {} outside 1..={}",
                self.name, self.lens_count, MAX_LENS_COUNT
            )));
        }
        if !on_menu(self.streaming_resolution) {
            return Err(PlanError::InvalidInput(format!(
                "{}: unsupported streaming resolution {}MP",
                self.name, self.streaming_resolution
            )));
        }
        if !on_menu(self.recording_resolution) {
            return Err(PlanError::InvalidInput(format!(
                "{}: unsupported recording resolution {}MP",
                self.name, self.recording_resolution
            )));
        }
        if !(1..=MAX_FRAME_RATE).contains(&self.frame_rate) {
            return Err(PlanError::InvalidInput(format!(
                "{}: frame rate {} outside 1..={}",
                self.name, self.frame_rate, MAX_FRAME_RATE
            )));
        }
        if !(1..=MAX_STORAGE_DAYS).contains(&self.storage_days) {
            return Err(PlanError::InvalidInput(format!(
                "{}: storage days {} outside 1..={}",
                self.name, self.storage_days, MAX_STORAGE_DAYS
            )));
        }
        Ok(())
    }
}

/// Validate a whole camera list. An empty list has nothing to size.
pub fn validate_cameras(cameras: &[CameraDefinition]) -> Result<(), PlanError> {
    if cameras.is_empty() {
        return Err(PlanError::InvalidInput("at least one camera is required".to_string()));
    }
    cameras.iter().try_for_each(CameraDefinition::validate)
}

fn on_menu(resolution: f64) -> bool {
    RESOLUTION_MENU.iter().any(|r| same_resolution(*r, resolution))
}

fn same_resolution(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// A single video stream and the load it puts on a gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    /// `{camera_index}-{lens_index}`.
    pub id: String,
    pub camera_id: String,
    /// Megapixels per second.
    pub throughput: f64,
    /// Terabytes of retained footage.
    pub storage: f64,
    pub name: String,
    pub lens_type: String,
    pub resolution: String,
    pub frame_rate: String,
}

/// Recording bitrate in Mb/s, falling back to 2.0 for unknown resolutions.
pub fn bitrate_for(recording_resolution: f64) -> f64 {
    BITRATE_TABLE
        .iter()
        .find(|(resolution, _)| same_resolution(*resolution, recording_resolution))
        .map(|(_, bitrate)| *bitrate)
        .unwrap_or(DEFAULT_BITRATE_MBPS)
}

/// Terabytes needed to retain one stream for `storage_days`.
pub fn storage_terabytes(recording_resolution: f64, storage_days: u32) -> f64 {
    SECONDS_PER_DAY * f64::from(storage_days) * bitrate_for(recording_resolution)
        / MEGABITS_PER_TERABYTE
}

/// Derive the streams produced by one camera.
pub fn derive_streams(camera_index: usize, camera: &CameraDefinition) -> Vec<Stream> {
    let throughput = camera.streaming_resolution * f64::from(camera.frame_rate);
    let storage = storage_terabytes(camera.recording_resolution, camera.storage_days);
    let lens_type = if camera.lens_count > 1 { "Multi-sensor" } else { "Single lens" };

    (0..camera.lens_count)
        .map(|lens| Stream {
            id: format!("{}-{}", camera_index, lens),
            camera_id: camera_index.to_string(),
            throughput,
            storage,
            name: if camera.lens_count > 1 {
                format!("{} (Lens {})", camera.name, lens + 1)
            } else {
                camera.name.clone()
            },
            lens_type: lens_type.to_string(),
            resolution: format!("{}MP", camera.streaming_resolution),
            frame_rate: format!("{}fps", camera.frame_rate),
        })
        .collect()
}

/// Derive every stream for a camera list, in camera then lens order.
pub fn derive_all(cameras: &[CameraDefinition]) -> Vec<Stream> {
    cameras
        .iter()
        .enumerate()
        .flat_map(|(index, camera)| derive_streams(index, camera))
        .collect()
}

#[cfg(test)]
pub(crate) fn camera(name: &str, lens_count: u32, resolution: f64, fps: u32, days: u32) -> CameraDefinition {
    CameraDefinition {
        name: name.to_string(),
        lens_count,
        streaming_resolution: resolution,
        frame_rate: fps,
        recording_resolution: resolution,
        storage_days: days,
    }
}
