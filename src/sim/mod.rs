//! Simulation runtime: clock and event queue, mobility, content store and
//! forwarder. These are the collaborators the producer apps are written
//! against.

pub mod content_store;
pub mod forwarder;
pub mod mobility;
pub mod scheduler;
pub mod types;

pub use content_store::{ContentStore, CsEntry, MemoryContentStore};
pub use forwarder::{Face, Forwarder, ForwarderAction, ForwardingError, SimForwarder};
pub use mobility::{ConstantVelocity, MobilityModel};
pub use scheduler::EventQueue;
pub use types::{Clock, FaceId, FaceScope, NodeId, Position, SimTime};
