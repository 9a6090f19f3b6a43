//! Simulation report types and writers.
//!
//! A run produces a [`SimulationReport`], written both as JSON and as a
//! human-readable text summary.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::apps::ConsumerStats;
use crate::sim::{Position, SimTime};

/// Full report of one simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub metadata: ReportMetadata,
    pub shared_flag: SharedFlagReport,
    pub network: NetworkStats,
    pub nodes: Vec<NodeReport>,
    /// Discovery and distribution events in execution order
    pub trace: Vec<TraceEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: String,
    pub stop_time: SimTime,
    pub seed: u64,
    pub critical_name: String,
    pub total_nodes: usize,
    pub events_executed: u64,
    /// Producers flagged at build time as unable to fire on their own
    #[serde(default)]
    pub config_warnings: usize,
}

/// State of the discovery flag shared by relay producers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedFlagReport {
    pub set_at: Option<SimTime>,
    pub set_by: Option<String>,
    /// Relay producers observing the flag
    pub relays: usize,
}

/// Transmission counters for the simulated network
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    /// Interest broadcasts on network faces
    pub interests_sent: u64,
    /// Data broadcasts on network faces
    pub data_sent: u64,
    pub bytes_sent: u64,
    /// Packets handed to a neighbour
    pub deliveries: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeReport {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_position: Option<Position>,
    pub producers: Vec<ProducerReport>,
    pub proactive_producers: Vec<ProactiveReport>,
    pub consumers: Vec<ConsumerReport>,
    /// Names held in the content store at the end of the run
    pub content_store: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerReport {
    pub prefix: String,
    pub role: String,
    pub content_discovered: bool,
    pub first_discovered_at: Option<SimTime>,
    pub distributed_at: Option<SimTime>,
    pub interests_served: u64,
    pub interests_declined: u64,
    /// Spatial window after the last drift
    pub final_window: [f64; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProactiveReport {
    pub prefix: String,
    pub distributed_at: Option<SimTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerReport {
    pub prefix: String,
    pub stats: ConsumerStats,
}

/// Notable event recorded during the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    Discovered {
        time: SimTime,
        node: String,
    },
    SharedFlagRaised {
        time: SimTime,
        node: String,
    },
    Distributed {
        time: SimTime,
        node: String,
        app: String,
        name: String,
        bytes: usize,
        nonce: u32,
    },
}

impl TraceEvent {
    pub fn time(&self) -> SimTime {
        match self {
            TraceEvent::Discovered { time, .. }
            | TraceEvent::SharedFlagRaised { time, .. }
            | TraceEvent::Distributed { time, .. } => *time,
        }
    }
}

impl SimulationReport {
    /// Number of proactive distributions across all nodes
    pub fn distribution_count(&self) -> usize {
        self.trace
            .iter()
            .filter(|e| matches!(e, TraceEvent::Distributed { .. }))
            .count()
    }

    pub fn node(&self, id: &str) -> Option<&NodeReport> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Generate JSON report
pub fn generate_json_report(report: &SimulationReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialize report to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;

    log::info!("JSON report written to {}", output_path.display());
    Ok(())
}

/// Generate human-readable text report
pub fn generate_text_report(report: &SimulationReport, output_path: &Path) -> Result<()> {
    let text = render_text_report(report);

    fs::write(output_path, text)
        .with_context(|| format!("Failed to write text report to {}", output_path.display()))?;

    log::info!("Text report written to {}", output_path.display());
    Ok(())
}

fn format_time(time: Option<SimTime>) -> String {
    match time {
        Some(t) => format!("{:.3}s", t),
        None => "never".to_string(),
    }
}

fn section(lines: &mut Vec<String>, title: &str) {
    lines.push("=".repeat(80));
    lines.push(format!("{:^80}", title));
    lines.push("=".repeat(80));
    lines.push(String::new());
}

/// Render the text report
pub fn render_text_report(report: &SimulationReport) -> String {
    let mut lines: Vec<String> = Vec::new();

    // Header
    section(&mut lines, "PCDSIM PROACTIVE CONTENT DISTRIBUTION REPORT");

    // Metadata
    lines.push(format!("Report Date: {}", report.metadata.generated_at));
    lines.push(format!("Simulated Time: {}s", report.metadata.stop_time));
    lines.push(format!("Seed: {}", report.metadata.seed));
    lines.push(format!("Critical Name: {}", report.metadata.critical_name));
    lines.push(format!("Nodes: {}", report.metadata.total_nodes));
    lines.push(format!("Events Executed: {}", report.metadata.events_executed));
    if report.metadata.config_warnings > 0 {
        lines.push(format!("Config Warnings: {}", report.metadata.config_warnings));
    }
    lines.push(String::new());

    // Shared discovery
    section(&mut lines, "SHARED DISCOVERY");
    lines.push(format!("Relay producers: {}", report.shared_flag.relays));
    match (&report.shared_flag.set_by, report.shared_flag.set_at) {
        (Some(node), Some(at)) => lines.push(format!("Flag raised by {} at {:.3}s", node, at)),
        _ => lines.push("Flag never raised".to_string()),
    }
    lines.push(String::new());

    // Per-node state
    section(&mut lines, "NODES");
    for node in &report.nodes {
        match node.final_position {
            Some(p) => lines.push(format!("{} (x={:.2}, y={:.2})", node.id, p.x, p.y)),
            None => lines.push(node.id.clone()),
        }
        for p in &node.producers {
            lines.push(format!(
                "  {} producer {}: discovered={} first={} distributed={}",
                p.role,
                p.prefix,
                p.content_discovered,
                format_time(p.first_discovered_at),
                format_time(p.distributed_at)
            ));
            lines.push(format!(
                "    window [{:.2}, {:.2}) served={} declined={}",
                p.final_window[0], p.final_window[1], p.interests_served, p.interests_declined
            ));
        }
        for p in &node.proactive_producers {
            lines.push(format!(
                "  proactive producer {}: distributed={}",
                p.prefix,
                format_time(p.distributed_at)
            ));
        }
        for c in &node.consumers {
            let delay = c
                .stats
                .mean_delay
                .map(|d| format!("{:.1}ms", d * 1000.0))
                .unwrap_or_else(|| "n/a".to_string());
            lines.push(format!(
                "  consumer {}: {}/{} satisfied, first={} mean delay={}",
                c.prefix,
                c.stats.data_received,
                c.stats.interests_sent,
                format_time(c.stats.first_data_at),
                delay
            ));
        }
        if !node.content_store.is_empty() {
            lines.push(format!("  content store: {}", node.content_store.join(", ")));
        }
        lines.push(String::new());
    }

    // Network
    section(&mut lines, "NETWORK");
    lines.push(format!("Interests sent: {}", report.network.interests_sent));
    lines.push(format!("Data sent: {}", report.network.data_sent));
    lines.push(format!("Bytes sent: {}", report.network.bytes_sent));
    lines.push(format!("Deliveries: {}", report.network.deliveries));
    lines.push(String::new());

    // Timeline
    section(&mut lines, "TIMELINE");
    if report.trace.is_empty() {
        lines.push("No content was discovered.".to_string());
    }
    for event in &report.trace {
        let line = match event {
            TraceEvent::Discovered { time, node } => {
                format!("  {:>10.3}s  {} discovered content", time, node)
            }
            TraceEvent::SharedFlagRaised { time, node } => {
                format!("  {:>10.3}s  {} raised the shared discovery flag", time, node)
            }
            TraceEvent::Distributed { time, node, app, name, bytes, nonce } => format!(
                "  {:>10.3}s  {} ({}) distributed {} [{} bytes, nonce {}]",
                time, node, app, name, bytes, nonce
            ),
        };
        lines.push(line);
    }
    lines.push(String::new());
    lines.push(format!("Total distributions: {}", report.distribution_count()));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> SimulationReport {
        SimulationReport {
            metadata: ReportMetadata {
                generated_at: "2024-01-01T00:00:00+00:00".to_string(),
                stop_time: 20.0,
                seed: 7,
                critical_name: "/criticalData/test".to_string(),
                total_nodes: 1,
                events_executed: 19,
                config_warnings: 0,
            },
            shared_flag: SharedFlagReport::default(),
            network: NetworkStats { data_sent: 1, bytes_sent: 1100, deliveries: 0, interests_sent: 0 },
            nodes: vec![NodeReport {
                id: "car0".to_string(),
                final_position: Some(Position::new(3.0, 0.0)),
                producers: vec![ProducerReport {
                    prefix: "/criticalData/test".to_string(),
                    role: "field".to_string(),
                    content_discovered: true,
                    first_discovered_at: Some(1.0),
                    distributed_at: Some(1.0),
                    interests_served: 0,
                    interests_declined: 0,
                    final_window: [19.0, 24.0],
                }],
                proactive_producers: vec![],
                consumers: vec![],
                content_store: vec!["/criticalData/test".to_string()],
            }],
            trace: vec![
                TraceEvent::Discovered { time: 1.0, node: "car0".to_string() },
                TraceEvent::Distributed {
                    time: 1.0,
                    node: "car0".to_string(),
                    app: "producer".to_string(),
                    name: "/criticalData/test".to_string(),
                    bytes: 1100,
                    nonce: 42,
                },
            ],
        }
    }

    #[test]
    fn test_text_report_sections() {
        let text = render_text_report(&sample());
        assert!(text.contains("SHARED DISCOVERY"));
        assert!(text.contains("Flag never raised"));
        assert!(text.contains("car0 (x=3.00, y=0.00)"));
        assert!(text.contains("field producer /criticalData/test: discovered=true first=1.000s distributed=1.000s"));
        assert!(text.contains("Total distributions: 1"));
    }

    #[test]
    fn test_write_reports() {
        let dir = TempDir::new().unwrap();
        let json_path = dir.path().join("report.json");
        let text_path = dir.path().join("report.txt");

        generate_json_report(&sample(), &json_path).unwrap();
        generate_text_report(&sample(), &text_path).unwrap();

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(json["trace"][1]["event"], "distributed");
        assert_eq!(json["nodes"][0]["producers"][0]["distributed_at"], 1.0);
        assert!(fs::read_to_string(&text_path).unwrap().contains("TIMELINE"));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let path = Path::new("/nonexistent/dir/report.json");
        assert!(generate_json_report(&sample(), path).is_err());
    }
}
