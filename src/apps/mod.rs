//! Apps installed on simulated nodes.

pub mod consumer;
pub mod proactive;
pub mod producer;

pub use consumer::{Consumer, ConsumerStats};
pub use proactive::ProactiveProducer;
pub use producer::{Producer, TickReport};
