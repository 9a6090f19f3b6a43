//! # pcdsim - Proactive content distribution for NDN producers
//!
//! This library simulates Named Data Networking producers that push critical
//! content to their neighbours as soon as the content is "discovered", instead
//! of waiting to be asked for it.
//!
//! ## Overview
//!
//! Each producer evaluates a content trigger once per simulated second. A
//! field node discovers content when its position lies inside a spatial
//! window during a live interval, or when the critical Data is already in its
//! content store. Relay nodes (roadside units) share a single discovery flag:
//! once one relay finds the content locally, all of them treat it as
//! discovered. The first discovery fires a one-shot distribution that caches
//! the Data locally and pushes it out of the node.
//!
//! ## Architecture
//!
//! - `ndn`: names, TLV encoding, Data and Interest packets
//! - `sim`: event queue, mobility, content store and forwarder
//! - `trigger`: trigger windows, the shared relay flag, the per-tick evaluator
//!   and the proactive distribution
//! - `apps`: trigger-gated producer, timed proactive producer, consumer
//! - `config` / `config_loader`: YAML scenario structures, loading and validation
//! - `orchestrator`: builds nodes from a scenario and runs the event loop
//! - `report`: JSON and text reports
//! - `utils`: duration parsing and validation helpers
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use pcdsim::{config_loader, orchestrator, report};
//! use std::path::Path;
//!
//! let config = config_loader::load_config(Path::new("scenario.yaml"))?;
//! let result = orchestrator::run_scenario(&config)?;
//! report::generate_json_report(&result, Path::new("pcdsim_output/report.json"))?;
//! # Ok::<(), color_eyre::Report>(())
//! ```
//!
//! ## Scenario Format
//!
//! ```yaml
//! general:
//!   stop_time: "60s"
//!   seed: 7
//!
//! network:
//!   link_delay: 10ms
//!   radio_range: 50.0
//!   links:
//!     - [rsu0, rsu1]
//!
//! nodes:
//!   - id: car0
//!     mobility: { position: [0.0, 0.0], velocity: [5.0, 0.0] }
//!     apps:
//!       - type: producer
//!         prefix: "/criticalData/test"
//!         trigger: { x_start: 20.0, x_end: 40.0, l_start: 0.0, l_end: 60.0 }
//!   - id: rsu0
//!     apps:
//!       - type: producer
//!         prefix: "/criticalData/test"
//!         is_rsu: true
//! ```
//!
//! ## Error Handling
//!
//! Modules return typed errors built with `thiserror`. The application
//! boundary (loading, running, writing reports) uses `color_eyre` for error
//! reporting with context.

pub mod apps;
pub mod config;
pub mod config_loader;
pub mod ndn;
pub mod orchestrator;
pub mod report;
pub mod sim;
pub mod trigger;
pub mod utils;
