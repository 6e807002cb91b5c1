//! Traversal cost and duration table per connection type.

use serde::Serialize;

use crate::db::ConnectionType;

/// Speed, effort and waiting time for one connection type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TypeProfile {
    /// Travel speed along the connection in cm/s.
    pub speed: f64,
    /// Multiplier applied to the duration to obtain the search cost.
    pub effort: f64,
    /// Fixed waiting time in seconds, counted once per leg.
    pub fixed_wait: f64,
}

impl TypeProfile {
    pub const fn new(speed: f64, effort: f64, fixed_wait: f64) -> Self {
        Self {
            speed,
            effort,
            fixed_wait,
        }
    }

    /// Seconds needed to cover `distance` centimetres.
    pub fn duration(&self, distance: f64) -> f64 {
        self.fixed_wait + distance / self.speed
    }

    pub fn cost(&self, distance: f64) -> f64 {
        self.effort * self.duration(distance)
    }
}

/// Tunable cost table used by the router and by route descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostModel {
    pub plain: TypeProfile,
    pub steps: TypeProfile,
    pub stairs: TypeProfile,
    pub escalator: TypeProfile,
    pub elevator: TypeProfile,
    /// Factor applied to a denied connection's cost in the relaxed search.
    pub deny_multiplier: f64,
    /// Seconds added to a denied connection's cost in the relaxed search.
    pub deny_penalty: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            plain: TypeProfile::new(120.0, 1.0, 0.0),
            steps: TypeProfile::new(100.0, 1.2, 0.0),
            stairs: TypeProfile::new(60.0, 1.5, 0.0),
            escalator: TypeProfile::new(80.0, 0.8, 0.0),
            elevator: TypeProfile::new(100.0, 1.0, 30.0),
            deny_multiplier: 20.0,
            deny_penalty: 600.0,
        }
    }
}

impl CostModel {
    pub fn profile(&self, ctype: ConnectionType) -> &TypeProfile {
        match ctype {
            ConnectionType::Plain => &self.plain,
            ConnectionType::Steps => &self.steps,
            ConnectionType::Stairs => &self.stairs,
            ConnectionType::Escalator => &self.escalator,
            ConnectionType::Elevator => &self.elevator,
        }
    }

    pub fn duration(&self, ctype: ConnectionType, distance: f64) -> f64 {
        self.profile(ctype).duration(distance)
    }

    /// Cost of an allowed traversal.
    pub fn traversal_cost(&self, ctype: ConnectionType, distance: f64) -> f64 {
        self.profile(ctype).cost(distance)
    }

    /// Cost of a denied traversal during the relaxed search.
    pub fn relaxed_cost(&self, ctype: ConnectionType, distance: f64) -> f64 {
        self.traversal_cost(ctype, distance) * self.deny_multiplier + self.deny_penalty
    }

    /// Speeds must be positive and every other term non-negative, so no
    /// traversal can have a negative or undefined cost.
    pub fn is_valid(&self) -> bool {
        let profiles_valid = ConnectionType::ALL.into_iter().all(|ctype| {
            let profile = self.profile(ctype);
            profile.speed.is_finite()
                && profile.speed > 0.0
                && profile.effort.is_finite()
                && profile.effort >= 0.0
                && profile.fixed_wait.is_finite()
                && profile.fixed_wait >= 0.0
        });
        profiles_valid
            && self.deny_multiplier.is_finite()
            && self.deny_multiplier >= 1.0
            && self.deny_penalty.is_finite()
            && self.deny_penalty >= 0.0
    }
}
