//! Configuration validation utilities.
//!
//! Hard errors are returned as `Err(String)` and wrapped by the caller;
//! suspicious but legal settings only produce warnings.

use std::collections::HashSet;

use crate::config::TriggerConfig;
use crate::trigger::TriggerWindow;

/// Validate point-to-point links
///
/// Checks for:
/// - Links referencing unknown node ids
/// - Self-links
/// - Duplicate links (in either direction)
///
/// # Arguments
/// * `links` - Pairs of node ids
/// * `node_ids` - Every configured node id
///
/// # Returns
/// * `Ok(())` if validation succeeds
/// * `Err(String)` with an error message if validation fails
pub fn validate_links(links: &[(String, String)], node_ids: &HashSet<&str>) -> Result<(), String> {
    let mut seen = HashSet::new();

    for (a, b) in links {
        for end in [a, b] {
            if !node_ids.contains(end.as_str()) {
                return Err(format!("Link {} <-> {} references unknown node '{}'", a, b, end));
            }
        }
        if a == b {
            return Err(format!("Node '{}' cannot be linked to itself", a));
        }
        let key = if a < b { (a, b) } else { (b, a) };
        if !seen.insert(key) {
            return Err(format!("Duplicate link {} <-> {}", a, b));
        }
    }

    Ok(())
}

/// Validate trigger window numbers
///
/// All bounds must be finite and the tolerance must be non-negative.
pub fn validate_trigger(trigger: &TriggerConfig) -> Result<(), String> {
    let fields = [
        ("x_start", trigger.x_start),
        ("x_end", trigger.x_end),
        ("l_start", trigger.l_start),
        ("l_end", trigger.l_end),
        ("x_speed", trigger.x_speed),
        ("tolerance", trigger.tolerance),
    ];
    for (field, value) in fields {
        if !value.is_finite() {
            return Err(format!("trigger.{} must be a finite number, got {}", field, value));
        }
    }
    if trigger.tolerance < 0.0 {
        return Err(format!("trigger.tolerance cannot be negative, got {}", trigger.tolerance));
    }
    Ok(())
}

/// Warn about producers whose trigger can never fire on its own
///
/// Relays ignore the window, so only field producers are checked. Returns
/// the number of warnings emitted.
pub fn warn_on_unreachable_trigger(node_id: &str, window: &TriggerWindow, is_relay: bool, ticks_end: u64) -> usize {
    let mut warnings = 0;

    if ticks_end <= 1 {
        log::warn!(
            "Producer on node '{}' has sim_end {} and will never be evaluated",
            node_id, ticks_end
        );
        return warnings + 1;
    }

    if is_relay {
        return warnings;
    }

    if window.is_temporally_empty() {
        log::warn!(
            "Producer on node '{}' has an empty live interval [{}, {}); only local matches can discover content",
            node_id, window.temporal_start, window.temporal_end
        );
        warnings += 1;
    } else if window.temporal_start >= ticks_end as f64 {
        log::warn!(
            "Producer on node '{}' becomes live at {}s, after its last tick",
            node_id, window.temporal_start
        );
        warnings += 1;
    }

    if window.drift_speed == 0.0 && window.is_spatially_empty() {
        log::warn!(
            "Producer on node '{}' has an empty spatial window [{}, {}) with tolerance {}",
            node_id, window.spatial_start, window.spatial_end, window.position_tolerance
        );
        warnings += 1;
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids<'a>(names: &[&'a str]) -> HashSet<&'a str> {
        names.iter().copied().collect()
    }

    fn link(a: &str, b: &str) -> (String, String) {
        (a.to_string(), b.to_string())
    }

    #[test]
    fn test_validate_links() {
        let nodes = ids(&["a", "b", "c"]);
        assert!(validate_links(&[link("a", "b"), link("b", "c")], &nodes).is_ok());
        assert!(validate_links(&[link("a", "z")], &nodes).is_err());
        assert!(validate_links(&[link("a", "a")], &nodes).is_err());
        assert!(validate_links(&[link("a", "b"), link("b", "a")], &nodes).is_err());
    }

    #[test]
    fn test_validate_trigger() {
        assert!(validate_trigger(&TriggerConfig::default()).is_ok());

        let trigger = TriggerConfig { tolerance: -0.5, ..TriggerConfig::default() };
        assert!(validate_trigger(&trigger).is_err());

        let trigger = TriggerConfig { x_speed: f64::INFINITY, ..TriggerConfig::default() };
        assert!(validate_trigger(&trigger).is_err());
    }

    #[test]
    fn test_unreachable_trigger_warnings() {
        let live = TriggerWindow {
            spatial_start: 0.0,
            spatial_end: 5.0,
            temporal_start: 0.0,
            temporal_end: 100.0,
            ..TriggerWindow::default()
        };
        assert_eq!(warn_on_unreachable_trigger("n", &live, false, 60), 0);

        // Default window is never live
        assert_eq!(warn_on_unreachable_trigger("n", &TriggerWindow::default(), false, 60), 1);
        // Relays skip window checks
        assert_eq!(warn_on_unreachable_trigger("n", &TriggerWindow::default(), true, 60), 0);
        // No ticks at all
        assert_eq!(warn_on_unreachable_trigger("n", &live, false, 0), 1);

        let late = TriggerWindow { temporal_start: 90.0, ..live };
        assert_eq!(warn_on_unreachable_trigger("n", &late, false, 60), 1);
    }
}
