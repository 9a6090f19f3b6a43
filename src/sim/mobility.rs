//! Mobility models providing node positions over simulated time.

use super::types::{Position, SimTime};

/// Source of a node's position at a given simulated time
pub trait MobilityModel: std::fmt::Debug {
    fn position(&self, now: SimTime) -> Position;
}

/// Straight-line movement at a fixed velocity; zero velocity is a static node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantVelocity {
    pub initial: Position,
    /// Units per second along each axis
    pub velocity: (f64, f64),
}

impl ConstantVelocity {
    pub fn new(initial: Position, velocity: (f64, f64)) -> Self {
        Self { initial, velocity }
    }

    pub fn stationary(initial: Position) -> Self {
        Self::new(initial, (0.0, 0.0))
    }
}

impl MobilityModel for ConstantVelocity {
    fn position(&self, now: SimTime) -> Position {
        Position {
            x: self.initial.x + self.velocity.0 * now,
            y: self.initial.y + self.velocity.1 * now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stationary_node_does_not_move() {
        let model = ConstantVelocity::stationary(Position::new(3.0, 1.0));
        assert_eq!(model.position(0.0), Position::new(3.0, 1.0));
        assert_eq!(model.position(100.0), Position::new(3.0, 1.0));
    }

    #[test]
    fn test_constant_velocity() {
        let model = ConstantVelocity::new(Position::new(0.0, 0.0), (10.0, -1.0));
        assert_eq!(model.position(2.5), Position::new(25.0, -2.5));
    }
}
