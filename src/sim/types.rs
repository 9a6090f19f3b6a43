//! Core simulation types shared by the scheduler, forwarders and apps.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Simulated time in seconds since the start of the run
pub type SimTime = f64;

/// Index of a node in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node({})", self.0)
    }
}

/// Forwarder face identifier. Ids below 256 are reserved, as in NFD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FaceId(pub u64);

impl FaceId {
    /// Face connecting producer apps to their node's forwarder
    pub const APP: FaceId = FaceId(256);
    /// Broadcast face onto the simulated network
    pub const NETWORK: FaceId = FaceId(257);
    /// First id handed out to additional app faces (consumers)
    pub const FIRST_DYNAMIC: u64 = 258;
}

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "face={}", self.0)
    }
}

/// Whether a face leads to a local app or off the node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaceScope {
    Local,
    NonLocal,
}

/// Cartesian position in the simulated plane
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Clock exposed to components that need the current simulated time
pub trait Clock {
    fn now(&self) -> SimTime;
}
