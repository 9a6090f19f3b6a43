//! Spatial and temporal trigger windows.

use serde::{Deserialize, Serialize};

use crate::sim::SimTime;

/// Slack applied on both sides of the spatial window
pub const DEFAULT_POSITION_TOLERANCE: f64 = 2.0;

/// Region of space and time in which content counts as discoverable.
///
/// The spatial bounds drift by `drift_speed` every tick for the whole run,
/// modelling a moving point of interest. Drift is never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerWindow {
    pub spatial_start: f64,
    pub spatial_end: f64,
    pub temporal_start: SimTime,
    pub temporal_end: SimTime,
    pub drift_speed: f64,
    pub position_tolerance: f64,
}

impl Default for TriggerWindow {
    fn default() -> Self {
        Self {
            spatial_start: 0.0,
            spatial_end: 0.0,
            temporal_start: 0.0,
            temporal_end: 0.0,
            drift_speed: 0.0,
            position_tolerance: DEFAULT_POSITION_TOLERANCE,
        }
    }
}

impl TriggerWindow {
    /// Whether position `x` lies in the tolerance-widened window `[start - tol, end + tol)`.
    ///
    /// Inverted windows are evaluated literally.
    pub fn in_zone(&self, x: f64) -> bool {
        x >= self.spatial_start - self.position_tolerance
            && x < self.spatial_end + self.position_tolerance
    }

    /// Whether `now` lies in `[temporal_start, temporal_end)`
    pub fn time_live(&self, now: SimTime) -> bool {
        self.temporal_start <= now && now < self.temporal_end
    }

    /// Shift both spatial bounds by the drift speed
    pub fn drift(&mut self) {
        self.spatial_start += self.drift_speed;
        self.spatial_end += self.drift_speed;
    }

    /// True when no position can ever satisfy [`in_zone`](Self::in_zone)
    pub fn is_spatially_empty(&self) -> bool {
        self.spatial_start - self.position_tolerance >= self.spatial_end + self.position_tolerance
    }

    /// True when no time can ever satisfy [`time_live`](Self::time_live)
    pub fn is_temporally_empty(&self) -> bool {
        self.temporal_start >= self.temporal_end
    }
}
