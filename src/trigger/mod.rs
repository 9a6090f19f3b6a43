//! Spatiotemporal content triggers and proactive distribution.
//!
//! - `window`: spatial/temporal trigger windows with per-tick drift
//! - `shared`: the discovery latch shared by relay nodes
//! - `evaluator`: per-tick discovery decision and the one-shot latch
//! - `distribution`: building, caching and pushing the proactive Data

pub mod distribution;
pub mod evaluator;
pub mod shared;
pub mod window;

pub use distribution::{DataTemplate, DistributionParams, Emission, ProactiveDistribution};
pub use evaluator::{ContentTriggerEvaluator, DistributionState, NodeRole, NodeTriggerState, TickOutcome};
pub use shared::SharedDiscoveryFlag;
pub use window::TriggerWindow;

use crate::sim::FaceId;

/// Node setup problems found before the first tick is scheduled
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PreconditionError {
    #[error("Node '{0}' runs a field producer but has no mobility model")]
    MissingMobility(String),
    #[error("Outbound face {0} does not exist")]
    MissingFace(FaceId),
    #[error("Outbound face {0} is local; proactive data must leave the node")]
    LocalOutboundFace(FaceId),
}
