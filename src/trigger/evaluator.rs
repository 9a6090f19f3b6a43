//! Per-tick content discovery decisions.
//!
//! Each producer owns one [`ContentTriggerEvaluator`]. On every tick it
//! decides whether the node's content is discovered and whether the one-shot
//! proactive distribution fires now. The decision is pure state computation;
//! the only external reads are the node position and the local content store.

use std::fmt;
use std::rc::Rc;

use log::{debug, info};

use crate::ndn::Name;
use crate::sim::{ContentStore, MobilityModel, SimTime};

use super::shared::SharedDiscoveryFlag;
use super::window::TriggerWindow;

/// Role of a producer node, fixed at construction
#[derive(Clone)]
pub enum NodeRole {
    /// Fixed relay point (roadside unit) sharing discovery with other relays
    Relay { shared: SharedDiscoveryFlag },
    /// Node in the field whose position is checked against the trigger window
    Field { mobility: Rc<dyn MobilityModel> },
}

impl NodeRole {
    pub fn is_relay(&self) -> bool {
        matches!(self, NodeRole::Relay { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Relay { .. } => "relay",
            NodeRole::Field { .. } => "field",
        }
    }
}

impl fmt::Debug for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Relay { shared } => f.debug_struct("Relay").field("shared", &shared.is_set()).finish(),
            NodeRole::Field { mobility } => f.debug_struct("Field").field("mobility", mobility).finish(),
        }
    }
}

/// One-shot distribution latch
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistributionState {
    Pending,
    Distributed { at: SimTime },
}

impl DistributionState {
    /// Move Pending to Distributed. Returns false if already distributed.
    pub fn latch(&mut self, now: SimTime) -> bool {
        match self {
            DistributionState::Pending => {
                *self = DistributionState::Distributed { at: now };
                true
            }
            DistributionState::Distributed { .. } => false,
        }
    }

    pub fn has_distributed(&self) -> bool {
        matches!(self, DistributionState::Distributed { .. })
    }

    pub fn distributed_at(&self) -> Option<SimTime> {
        match self {
            DistributionState::Distributed { at } => Some(*at),
            DistributionState::Pending => None,
        }
    }
}

/// Mutable trigger state of a node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTriggerState {
    pub content_discovered: bool,
    pub distribution: DistributionState,
    /// First tick at which content was discovered
    pub first_discovered_at: Option<SimTime>,
}

impl Default for NodeTriggerState {
    fn default() -> Self {
        Self {
            content_discovered: false,
            distribution: DistributionState::Pending,
            first_discovered_at: None,
        }
    }
}

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub content_discovered: bool,
    /// Spatial containment; relays do not evaluate it
    pub in_zone: Option<bool>,
    pub time_live: bool,
    /// This tick set the shared discovery flag
    pub raised_shared_flag: bool,
    /// The one-shot distribution must fire now
    pub distribute: bool,
}

/// Decides discovery and one-shot distribution for one producer node
#[derive(Debug)]
pub struct ContentTriggerEvaluator {
    window: TriggerWindow,
    role: NodeRole,
    critical_name: Name,
    state: NodeTriggerState,
}

impl ContentTriggerEvaluator {
    pub fn new(window: TriggerWindow, role: NodeRole, critical_name: Name) -> Self {
        Self {
            window,
            role,
            critical_name,
            state: NodeTriggerState::default(),
        }
    }

    pub fn window(&self) -> &TriggerWindow {
        &self.window
    }

    pub fn role(&self) -> &NodeRole {
        &self.role
    }

    pub fn state(&self) -> &NodeTriggerState {
        &self.state
    }

    pub fn critical_name(&self) -> &Name {
        &self.critical_name
    }

    /// Evaluate one tick at time `now` against the node's content store.
    ///
    /// The window drifts after evaluation. `distribute` is true at most once
    /// over the evaluator's lifetime: on the first tick with content discovered.
    pub fn evaluate_tick(&mut self, now: SimTime, store: &dyn ContentStore) -> TickOutcome {
        let time_live = self.window.time_live(now);

        let (discovered, in_zone, raised_shared_flag) = match &self.role {
            NodeRole::Relay { shared } => {
                let (discovered, raised) = evaluate_relay(shared, store, &self.critical_name);
                (discovered, None, raised)
            }
            NodeRole::Field { mobility } => {
                let x = mobility.position(now).x;
                let in_zone = self.window.in_zone(x);
                let discovered = evaluate_field(in_zone, time_live, store, &self.critical_name);
                debug!(
                    "field tick t={} x={} window=[{}, {}) in_zone={} time_live={}",
                    now, x, self.window.spatial_start, self.window.spatial_end, in_zone, time_live
                );
                (discovered, Some(in_zone), false)
            }
        };

        if discovered != self.state.content_discovered {
            info!(
                "{} producer content {} at t={}",
                self.role.as_str(),
                if discovered { "discovered" } else { "lost" },
                now
            );
        }
        self.state.content_discovered = discovered;
        if discovered && self.state.first_discovered_at.is_none() {
            self.state.first_discovered_at = Some(now);
        }

        self.window.drift();

        let distribute = discovered && self.state.distribution.latch(now);

        TickOutcome {
            content_discovered: discovered,
            in_zone,
            time_live,
            raised_shared_flag,
            distribute,
        }
    }
}

/// Relay branch: the shared flag wins; otherwise a local match discovers and
/// raises the flag. Returns (discovered, raised_flag).
fn evaluate_relay(shared: &SharedDiscoveryFlag, store: &dyn ContentStore, critical_name: &Name) -> (bool, bool) {
    if shared.is_set() {
        return (true, false);
    }
    if store.find_exact(critical_name).is_some() {
        let raised = shared.set();
        if raised {
            info!("relay found {} locally, raising shared discovery flag", critical_name);
        }
        return (true, raised);
    }
    (false, false)
}

/// Field branch: a local match and an in-window position are independent
/// ways to discover content.
fn evaluate_field(in_zone: bool, time_live: bool, store: &dyn ContentStore, critical_name: &Name) -> bool {
    store.find_exact(critical_name).is_some() || (in_zone && time_live)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ndn::EncodedData;
    use crate::sim::{ConstantVelocity, MemoryContentStore, Position};
    use std::time::Duration;

    fn critical() -> Name {
        Name::parse("/criticalData/test").unwrap()
    }

    fn critical_entry() -> EncodedData {
        EncodedData { name: critical(), freshness: Duration::ZERO, wire: vec![0x06, 0x00] }
    }

    fn field_at(x: f64, window: TriggerWindow) -> ContentTriggerEvaluator {
        let mobility: Rc<dyn MobilityModel> = Rc::new(ConstantVelocity::stationary(Position::new(x, 0.0)));
        ContentTriggerEvaluator::new(window, NodeRole::Field { mobility }, critical())
    }

    fn relay(shared: &SharedDiscoveryFlag) -> ContentTriggerEvaluator {
        ContentTriggerEvaluator::new(
            TriggerWindow::default(),
            NodeRole::Relay { shared: shared.clone() },
            critical(),
        )
    }

    #[test]
    fn test_field_node_discovers_and_distributes_once() {
        let window = TriggerWindow {
            spatial_start: 0.0,
            spatial_end: 5.0,
            temporal_start: 0.0,
            temporal_end: 100.0,
            drift_speed: 1.0,
            ..TriggerWindow::default()
        };
        let mut evaluator = field_at(3.0, window);
        let cs = MemoryContentStore::new();

        let tick1 = evaluator.evaluate_tick(1.0, &cs);
        assert_eq!(tick1.in_zone, Some(true));
        assert!(tick1.time_live);
        assert!(tick1.content_discovered);
        assert!(tick1.distribute);
        assert_eq!(evaluator.window().spatial_start, 1.0);
        assert_eq!(evaluator.window().spatial_end, 6.0);

        let tick2 = evaluator.evaluate_tick(2.0, &cs);
        assert!(tick2.content_discovered);
        assert!(!tick2.distribute);
        assert_eq!(evaluator.state().distribution.distributed_at(), Some(1.0));
    }

    #[test]
    fn test_field_discovery_oscillates_but_never_redistributes() {
        let window = TriggerWindow {
            spatial_start: 0.0,
            spatial_end: 1.0,
            temporal_start: 0.0,
            temporal_end: 100.0,
            drift_speed: 10.0,
            ..TriggerWindow::default()
        };
        let mut evaluator = field_at(0.0, window);
        let cs = MemoryContentStore::new();

        assert!(evaluator.evaluate_tick(1.0, &cs).distribute);
        // Window has moved away from x=0
        let out = evaluator.evaluate_tick(2.0, &cs);
        assert!(!out.content_discovered);
        assert_eq!(out.in_zone, Some(false));

        // Local match makes it discovered again, still no second distribution
        let mut cs = MemoryContentStore::new();
        cs.insert(critical_entry(), true, 2.5);
        let out = evaluator.evaluate_tick(3.0, &cs);
        assert!(out.content_discovered);
        assert!(!out.distribute);
    }

    #[test]
    fn test_field_needs_live_time() {
        let window = TriggerWindow {
            spatial_start: 0.0,
            spatial_end: 5.0,
            temporal_start: 5.0,
            temporal_end: 15.0,
            ..TriggerWindow::default()
        };
        let mut evaluator = field_at(3.0, window);
        let cs = MemoryContentStore::new();

        assert!(!evaluator.evaluate_tick(4.0, &cs).content_discovered);
        assert!(evaluator.evaluate_tick(5.0, &cs).content_discovered);
        assert!(!evaluator.evaluate_tick(15.0, &cs).content_discovered);
    }

    #[test]
    fn test_field_local_match_does_not_touch_shared_flag() {
        let shared = SharedDiscoveryFlag::new();
        let _relay = relay(&shared);
        let mut evaluator = field_at(1000.0, TriggerWindow::default());
        let mut cs = MemoryContentStore::new();
        cs.insert(critical_entry(), true, 0.0);

        let out = evaluator.evaluate_tick(1.0, &cs);
        assert!(out.content_discovered);
        assert!(!out.raised_shared_flag);
        assert!(!shared.is_set());
    }

    #[test]
    fn test_relay_shares_discovery() {
        let shared = SharedDiscoveryFlag::new();
        let mut a = relay(&shared);
        let mut b = relay(&shared);
        let mut cs_a = MemoryContentStore::new();
        let cs_b = MemoryContentStore::new();

        for t in 1..=2 {
            assert!(!a.evaluate_tick(t as f64, &cs_a).content_discovered);
            assert!(!b.evaluate_tick(t as f64, &cs_b).content_discovered);
        }

        cs_a.insert(critical_entry(), true, 2.5);
        let out_a = a.evaluate_tick(3.0, &cs_a);
        assert!(out_a.content_discovered);
        assert!(out_a.raised_shared_flag);
        assert!(out_a.distribute);
        assert!(shared.is_set());

        let out_b = b.evaluate_tick(4.0, &cs_b);
        assert!(out_b.content_discovered);
        assert!(!out_b.raised_shared_flag);
        assert!(out_b.distribute);
        assert_eq!(out_b.in_zone, None);

        for t in 5..10 {
            assert!(b.evaluate_tick(t as f64, &cs_b).content_discovered);
            assert!(a.evaluate_tick(t as f64, &MemoryContentStore::new()).content_discovered);
        }
    }

    #[test]
    fn test_relay_without_match_is_not_discovered() {
        let shared = SharedDiscoveryFlag::new();
        let mut evaluator = relay(&shared);
        let mut cs = MemoryContentStore::new();
        cs.insert(
            EncodedData { name: Name::parse("/criticalData").unwrap(), freshness: Duration::ZERO, wire: vec![] },
            true,
            0.0,
        );
        let out = evaluator.evaluate_tick(1.0, &cs);
        assert!(!out.content_discovered);
        assert!(!out.distribute);
    }

    #[test]
    fn test_idempotent_without_drift() {
        let window = TriggerWindow {
            spatial_start: 10.0,
            spatial_end: 20.0,
            temporal_start: 0.0,
            temporal_end: 100.0,
            ..TriggerWindow::default()
        };
        let mut evaluator = field_at(8.0, window);
        let cs = MemoryContentStore::new();
        let first = evaluator.evaluate_tick(1.0, &cs).content_discovered;
        for _ in 0..10 {
            assert_eq!(evaluator.evaluate_tick(1.0, &cs).content_discovered, first);
        }
        assert_eq!(*evaluator.window(), window);
    }

    #[test]
    fn test_latch_only_transitions_once() {
        let mut state = DistributionState::Pending;
        assert!(!state.has_distributed());
        assert!(state.latch(1.0));
        assert!(!state.latch(2.0));
        assert_eq!(state.distributed_at(), Some(1.0));
    }
}
