//! Scenario configuration.
//!
//! A scenario is a YAML document with three sections: `general` (run length,
//! seed, critical content name), `network` (links, radio range, delays) and
//! `nodes` (mobility plus the apps installed on each node).
//!
//! ```yaml
//! general:
//!   stop_time: "60s"
//!   seed: 7
//! network:
//!   link_delay: "10ms"
//!   radio_range: 30.0
//!   links: [["rsu0", "rsu1"]]
//! nodes:
//!   - id: car0
//!     mobility: { position: [3.0, 0.0], velocity: [0.0, 0.0] }
//!     apps:
//!       - type: producer
//!         prefix: "/criticalData/test"
//!         trigger: { x_start: 0, x_end: 5, l_start: 0, l_end: 100, x_speed: 1 }
//!   - id: rsu0
//!     apps:
//!       - type: producer
//!         prefix: "/criticalData/test"
//!         is_rsu: true
//! ```

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ndn::{Name, NameError};
use crate::sim::{FaceId, Position};
use crate::trigger::{DataTemplate, TriggerWindow};
use crate::trigger::window::DEFAULT_POSITION_TOLERANCE;
use crate::utils::duration::parse_duration_to_seconds;
use crate::utils::validation;

/// Name whose presence in a content store counts as discovered content
pub const DEFAULT_CRITICAL_NAME: &str = "/criticalData/test";

/// Highest request rate a consumer may be configured with (interests per second)
pub const MAX_CONSUMER_FREQUENCY: f64 = 1_000_000.0;

/// Largest Data payload, the NDN maximum packet size
pub const MAX_PAYLOAD_SIZE: usize = 8800;

/// Top-level scenario configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub general: GeneralConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    pub nodes: Vec<NodeConfig>,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        // Validate general settings
        if self.general.stop_time.trim().is_empty() {
            return Err(ValidationError::InvalidGeneral("stop_time cannot be empty".to_string()));
        }
        let stop = self.stop_time_seconds()?;
        if stop == 0 {
            return Err(ValidationError::InvalidGeneral("stop_time must be greater than zero".to_string()));
        }
        Name::parse(&self.general.critical_name)
            .map_err(|e| ValidationError::InvalidGeneral(format!("critical_name: {}", e)))?;

        // Validate nodes
        if self.nodes.is_empty() {
            return Err(ValidationError::InvalidNode("at least one node is required".to_string()));
        }
        let mut ids = HashSet::new();
        for node in &self.nodes {
            if node.id.trim().is_empty() {
                return Err(ValidationError::InvalidNode("node id cannot be empty".to_string()));
            }
            if !ids.insert(node.id.as_str()) {
                return Err(ValidationError::InvalidNode(format!("duplicate node id '{}'", node.id)));
            }
            for app in &node.apps {
                app.validate(&node.id, stop)?;
            }
        }

        // Validate network settings
        validation::validate_links(&self.network.links, &ids).map_err(ValidationError::InvalidNetwork)?;
        if let Some(range) = self.network.radio_range {
            if !range.is_finite() || range <= 0.0 {
                return Err(ValidationError::InvalidNetwork(format!(
                    "radio_range must be a positive number, got {}",
                    range
                )));
            }
        }

        Ok(())
    }

    /// Run length in whole seconds
    pub fn stop_time_seconds(&self) -> Result<u64, ValidationError> {
        parse_duration_to_seconds(&self.general.stop_time).map_err(ValidationError::InvalidGeneral)
    }

    pub fn critical_name(&self) -> Result<Name, NameError> {
        Name::parse(&self.general.critical_name)
    }

    /// Total number of apps across all nodes
    pub fn app_count(&self) -> usize {
        self.nodes.iter().map(|n| n.apps.len()).sum()
    }
}

/// General run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub stop_time: String,
    /// Seed for the nonce generator; random when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default = "default_critical_name")]
    pub critical_name: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            stop_time: "60s".to_string(),
            seed: None,
            critical_name: default_critical_name(),
        }
    }
}

/// Connectivity between nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_link_delay", with = "humantime_serde")]
    pub link_delay: Duration,
    /// Nodes with mobility are neighbours while within this distance
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radio_range: Option<f64>,
    /// Always-on point-to-point links by node id
    #[serde(default)]
    pub links: Vec<(String, String)>,
    /// Cache Data that arrives from the network without a matching PIT entry
    #[serde(default = "default_true")]
    pub admit_unsolicited: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            link_delay: default_link_delay(),
            radio_range: None,
            links: Vec::new(),
            admit_unsolicited: true,
        }
    }
}

/// A simulated node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobility: Option<MobilityConfig>,
    #[serde(default)]
    pub apps: Vec<AppConfig>,
}

/// Constant-velocity mobility
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MobilityConfig {
    pub position: [f64; 2],
    #[serde(default)]
    pub velocity: [f64; 2],
}

impl MobilityConfig {
    pub fn initial_position(&self) -> Position {
        Position::new(self.position[0], self.position[1])
    }
}

/// Apps that can be installed on a node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppConfig {
    /// Producer gated by a spatiotemporal content trigger
    Producer(ProducerConfig),
    /// Producer that distributes once after a fixed delay
    ProactiveProducer(ProactiveProducerConfig),
    /// Constant-rate consumer
    Consumer(ConsumerConfig),
}

impl AppConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            AppConfig::Producer(_) => "producer",
            AppConfig::ProactiveProducer(_) => "proactive_producer",
            AppConfig::Consumer(_) => "consumer",
        }
    }

    fn validate(&self, node_id: &str, stop_seconds: u64) -> Result<(), ValidationError> {
        let app_err = |msg: String| ValidationError::InvalidApp {
            node: node_id.to_string(),
            app: self.kind(),
            message: msg,
        };

        match self {
            AppConfig::Producer(p) => {
                parse_field("prefix", &p.prefix).map_err(app_err)?;
                parse_field("postfix", &p.postfix).map_err(app_err)?;
                p.data.validate().map_err(app_err)?;
                validate_outbound_face(p.outbound_face).map_err(app_err)?;
                validation::validate_trigger(&p.trigger).map_err(app_err)?;
            }
            AppConfig::ProactiveProducer(p) => {
                parse_field("prefix", &p.prefix).map_err(app_err)?;
                p.data.validate().map_err(app_err)?;
                validate_outbound_face(p.outbound_face).map_err(app_err)?;
            }
            AppConfig::Consumer(c) => {
                parse_field("prefix", &c.prefix).map_err(app_err)?;
                if !c.frequency.is_finite() || c.frequency <= 0.0 {
                    return Err(app_err(format!("frequency must be positive, got {}", c.frequency)));
                }
                if c.frequency > MAX_CONSUMER_FREQUENCY {
                    return Err(app_err(format!(
                        "frequency cannot exceed {} interests per second, got {}",
                        MAX_CONSUMER_FREQUENCY, c.frequency
                    )));
                }
                // The request period must still move the clock at the end of the run
                let end = stop_seconds as f64;
                if end + 1.0 / c.frequency <= end {
                    return Err(app_err(format!(
                        "frequency {} is too high for a {}s run",
                        c.frequency, stop_seconds
                    )));
                }
                if c.lifetime.is_zero() {
                    return Err(app_err("lifetime must be greater than zero".to_string()));
                }
            }
        }
        Ok(())
    }
}

/// Contents of produced Data packets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_payload_size")]
    pub payload_size: usize,
    /// Zero means unlimited freshness and is left off the wire
    #[serde(default, with = "humantime_serde")]
    pub freshness: Duration,
    /// Fake signature value: 0 for "valid", other values application-specific
    #[serde(default)]
    pub signature: u64,
    /// Key locator name; absent or root means none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_locator: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            payload_size: default_payload_size(),
            freshness: Duration::ZERO,
            signature: 0,
            key_locator: None,
        }
    }
}

impl DataConfig {
    pub fn template(&self) -> Result<DataTemplate, NameError> {
        let key_locator = self.key_locator.as_deref().map(Name::parse).transpose()?;
        Ok(DataTemplate {
            payload_size: self.payload_size,
            freshness: self.freshness,
            signature: self.signature,
            key_locator,
        })
    }

    fn validate(&self) -> Result<(), String> {
        if self.payload_size > MAX_PAYLOAD_SIZE {
            return Err(format!(
                "payload_size cannot exceed {} bytes, got {}",
                MAX_PAYLOAD_SIZE, self.payload_size
            ));
        }
        if let Some(key_locator) = &self.key_locator {
            parse_field("key_locator", key_locator)?;
        }
        Ok(())
    }
}

/// Trigger window bounds and drift, as configured
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Where the content trigger starts along the x axis
    #[serde(default)]
    pub x_start: f64,
    /// Where the content trigger ends along the x axis
    #[serde(default)]
    pub x_end: f64,
    /// When the content trigger becomes live (seconds)
    #[serde(default)]
    pub l_start: f64,
    /// When the content trigger stops being live (seconds)
    #[serde(default)]
    pub l_end: f64,
    /// Per-tick movement of the trigger along the x axis
    #[serde(default)]
    pub x_speed: f64,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            x_start: 0.0,
            x_end: 0.0,
            l_start: 0.0,
            l_end: 0.0,
            x_speed: 0.0,
            tolerance: DEFAULT_POSITION_TOLERANCE,
        }
    }
}

/// Trigger-gated producer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerConfig {
    pub prefix: String,
    /// Accepted for compatibility; not appended to produced names
    #[serde(default = "default_postfix")]
    pub postfix: String,
    #[serde(flatten)]
    pub data: DataConfig,
    /// Ticks run at 1..sim_end seconds; defaults to the general stop time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sim_end: Option<u64>,
    #[serde(default)]
    pub trigger: TriggerConfig,
    /// Run as a relay (roadside unit) sharing discovery with other relays
    #[serde(default)]
    pub is_rsu: bool,
    /// Sequence number appended to the proactively distributed name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    #[serde(default = "default_outbound_face")]
    pub outbound_face: u64,
}

impl ProducerConfig {
    pub fn window(&self) -> TriggerWindow {
        TriggerWindow {
            spatial_start: self.trigger.x_start,
            spatial_end: self.trigger.x_end,
            temporal_start: self.trigger.l_start,
            temporal_end: self.trigger.l_end,
            drift_speed: self.trigger.x_speed,
            position_tolerance: self.trigger.tolerance,
        }
    }

    /// Exclusive upper bound of the tick schedule in seconds
    pub fn ticks_end(&self, stop_seconds: u64) -> u64 {
        self.sim_end.unwrap_or(stop_seconds)
    }
}

/// Producer that distributes once after a fixed delay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProactiveProducerConfig {
    pub prefix: String,
    #[serde(flatten)]
    pub data: DataConfig,
    #[serde(default = "default_proactive_delay", with = "humantime_serde")]
    pub delay: Duration,
    #[serde(default = "default_outbound_face")]
    pub outbound_face: u64,
}

/// Constant-rate consumer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    pub prefix: String,
    #[serde(default = "default_consumer_start", with = "humantime_serde")]
    pub start: Duration,
    /// Interests per second
    #[serde(default = "default_frequency")]
    pub frequency: f64,
    /// Append increasing sequence numbers to the prefix
    #[serde(default)]
    pub sequence: bool,
    #[serde(default = "default_consumer_lifetime", with = "humantime_serde")]
    pub lifetime: Duration,
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid network configuration: {0}")]
    InvalidNetwork(String),
    #[error("Invalid node configuration: {0}")]
    InvalidNode(String),
    #[error("Invalid {app} on node '{node}': {message}")]
    InvalidApp {
        node: String,
        app: &'static str,
        message: String,
    },
}

fn parse_field(field: &str, value: &str) -> Result<Name, String> {
    Name::parse(value).map_err(|e| format!("{}: {}", field, e))
}

fn validate_outbound_face(face: u64) -> Result<(), String> {
    if face < FaceId::APP.0 {
        return Err(format!("outbound_face {} is in the reserved range (< {})", face, FaceId::APP.0));
    }
    Ok(())
}

fn default_critical_name() -> String {
    DEFAULT_CRITICAL_NAME.to_string()
}

fn default_link_delay() -> Duration {
    Duration::from_millis(10)
}

fn default_true() -> bool {
    true
}

fn default_payload_size() -> usize {
    1024
}

fn default_postfix() -> String {
    "/".to_string()
}

fn default_tolerance() -> f64 {
    DEFAULT_POSITION_TOLERANCE
}

fn default_outbound_face() -> u64 {
    FaceId::NETWORK.0
}

fn default_proactive_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_consumer_start() -> Duration {
    Duration::from_secs(1)
}

fn default_frequency() -> f64 {
    1.0
}

fn default_consumer_lifetime() -> Duration {
    Duration::from_secs(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
general:
  stop_time: "30s"
  seed: 11
network:
  link_delay: "5ms"
  radio_range: 25.0
  links: [["rsu0", "rsu1"]]
nodes:
  - id: car0
    mobility: { position: [3.0, 0.0], velocity: [1.5, 0.0] }
    apps:
      - type: producer
        prefix: "/criticalData/test"
        freshness: "2s"
        key_locator: "/key"
        trigger: { x_start: 0, x_end: 5, l_start: 0, l_end: 100, x_speed: 1 }
  - id: rsu0
    apps:
      - type: producer
        prefix: "/criticalData/test"
        is_rsu: true
  - id: rsu1
    apps:
      - type: proactive_producer
        prefix: "/proactiveDist"
      - type: consumer
        prefix: "/criticalData/test"
        frequency: 2.0
"#;

    #[test]
    fn test_scenario_parsing() {
        let config: Config = serde_yaml::from_str(SCENARIO).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.stop_time_seconds().unwrap(), 30);
        assert_eq!(config.general.critical_name, DEFAULT_CRITICAL_NAME);
        assert_eq!(config.network.link_delay, Duration::from_millis(5));
        assert!(config.network.admit_unsolicited);
        assert_eq!(config.app_count(), 4);

        match &config.nodes[0].apps[0] {
            AppConfig::Producer(p) => {
                assert_eq!(p.data.payload_size, 1024);
                assert_eq!(p.data.freshness, Duration::from_secs(2));
                assert_eq!(p.window().drift_speed, 1.0);
                assert_eq!(p.window().position_tolerance, 2.0);
                assert!(!p.is_rsu);
                assert_eq!(p.outbound_face, FaceId::NETWORK.0);
                assert_eq!(p.ticks_end(30), 30);
                let template = p.data.template().unwrap();
                assert_eq!(template.key_locator.unwrap().to_string(), "/key");
            }
            other => panic!("expected producer, got {:?}", other.kind()),
        }
        match &config.nodes[2].apps[0] {
            AppConfig::ProactiveProducer(p) => assert_eq!(p.delay, Duration::from_secs(10)),
            other => panic!("expected proactive producer, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_invalid_prefix_is_rejected() {
        let yaml = r#"
general:
  stop_time: "10s"
nodes:
  - id: a
    apps:
      - type: producer
        prefix: "/bad//name"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(config.validate(), Err(ValidationError::InvalidApp { .. })));
    }

    #[test]
    fn test_general_validation() {
        let mut config: Config = serde_yaml::from_str(SCENARIO).unwrap();
        config.general.stop_time = "".to_string();
        assert!(matches!(config.validate(), Err(ValidationError::InvalidGeneral(_))));

        config.general.stop_time = "soon".to_string();
        assert!(matches!(config.validate(), Err(ValidationError::InvalidGeneral(_))));

        config.general.stop_time = "0s".to_string();
        assert!(matches!(config.validate(), Err(ValidationError::InvalidGeneral(_))));
    }

    #[test]
    fn test_node_validation() {
        let mut config: Config = serde_yaml::from_str(SCENARIO).unwrap();
        config.nodes[1].id = "car0".to_string();
        assert!(matches!(config.validate(), Err(ValidationError::InvalidNode(_))));

        config.nodes.clear();
        assert!(matches!(config.validate(), Err(ValidationError::InvalidNode(_))));
    }

    #[test]
    fn test_network_validation() {
        let mut config: Config = serde_yaml::from_str(SCENARIO).unwrap();
        config.network.links.push(("rsu0".to_string(), "ghost".to_string()));
        assert!(matches!(config.validate(), Err(ValidationError::InvalidNetwork(_))));

        let mut config: Config = serde_yaml::from_str(SCENARIO).unwrap();
        config.network.radio_range = Some(-1.0);
        assert!(matches!(config.validate(), Err(ValidationError::InvalidNetwork(_))));
    }

    #[test]
    fn test_app_field_validation() {
        let mut config: Config = serde_yaml::from_str(SCENARIO).unwrap();
        if let AppConfig::Producer(p) = &mut config.nodes[0].apps[0] {
            p.outbound_face = 1;
        }
        assert!(matches!(config.validate(), Err(ValidationError::InvalidApp { .. })));

        let mut config: Config = serde_yaml::from_str(SCENARIO).unwrap();
        if let AppConfig::Consumer(c) = &mut config.nodes[2].apps[1] {
            c.frequency = 0.0;
        }
        assert!(matches!(config.validate(), Err(ValidationError::InvalidApp { .. })));

        let mut config: Config = serde_yaml::from_str(SCENARIO).unwrap();
        if let AppConfig::Producer(p) = &mut config.nodes[0].apps[0] {
            p.trigger.tolerance = f64::NAN;
        }
        assert!(matches!(config.validate(), Err(ValidationError::InvalidApp { .. })));
    }

    #[test]
    fn test_consumer_frequency_is_bounded() {
        let mut config: Config = serde_yaml::from_str(SCENARIO).unwrap();
        if let AppConfig::Consumer(c) = &mut config.nodes[2].apps[1] {
            c.frequency = 1.0e17;
        }
        assert!(matches!(config.validate(), Err(ValidationError::InvalidApp { app: "consumer", .. })));

        let mut config: Config = serde_yaml::from_str(SCENARIO).unwrap();
        if let AppConfig::Consumer(c) = &mut config.nodes[2].apps[1] {
            c.frequency = MAX_CONSUMER_FREQUENCY;
        }
        assert!(config.validate().is_ok());

        // Small enough on its own but the period vanishes next to a very long run
        let mut config: Config = serde_yaml::from_str(SCENARIO).unwrap();
        config.general.stop_time = format!("{}s", 1u64 << 60);
        if let AppConfig::Consumer(c) = &mut config.nodes[2].apps[1] {
            c.frequency = 1_000.0;
        }
        assert!(matches!(config.validate(), Err(ValidationError::InvalidApp { app: "consumer", .. })));
    }

    #[test]
    fn test_payload_size_is_bounded() {
        let mut config: Config = serde_yaml::from_str(SCENARIO).unwrap();
        if let AppConfig::Producer(p) = &mut config.nodes[0].apps[0] {
            p.data.payload_size = MAX_PAYLOAD_SIZE;
        }
        assert!(config.validate().is_ok());

        if let AppConfig::Producer(p) = &mut config.nodes[0].apps[0] {
            p.data.payload_size = usize::MAX;
        }
        assert!(matches!(config.validate(), Err(ValidationError::InvalidApp { app: "producer", .. })));
    }

    #[test]
    fn test_producer_defaults_follow_attributes() {
        let yaml = r#"
prefix: "/p"
"#;
        let producer: ProducerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(producer.postfix, "/");
        assert_eq!(producer.data.payload_size, 1024);
        assert_eq!(producer.data.freshness, Duration::ZERO);
        assert_eq!(producer.data.signature, 0);
        assert!(producer.data.key_locator.is_none());
        assert!(!producer.is_rsu);
        assert_eq!(producer.window().spatial_start, 0.0);
        assert!(producer.sim_end.is_none());
    }
}
