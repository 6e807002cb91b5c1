use serde::Serialize;

use crate::db::{ConnectionType, Level, NodeId, Point};
use crate::graph::Travel;
use crate::routing::CostModel;

/// Point along a computed route.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoutePoint {
    /// Stored graph node.
    Node {
        id: NodeId,
        level: Level,
        x: f64,
        y: f64,
    },
    /// Request-local position at either end of the route.
    Position {
        level: Level,
        x: f64,
        y: f64,
        title: String,
    },
}

impl RoutePoint {
    pub fn level(&self) -> Level {
        match self {
            RoutePoint::Node { level, .. } | RoutePoint::Position { level, .. } => *level,
        }
    }

    pub fn point(&self) -> Point {
        match self {
            RoutePoint::Node { x, y, .. } | RoutePoint::Position { x, y, .. } => Point::new(*x, *y),
        }
    }

    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            RoutePoint::Node { id, .. } => Some(*id),
            RoutePoint::Position { .. } => None,
        }
    }
}

/// Single traversal between two consecutive route points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteLeg {
    /// Identifier of the stored connection, `None` for position attachments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    pub ctype: ConnectionType,
    pub travel: Travel,
    pub distance: f64,
    /// Leg uses a connection the settings asked to avoid.
    pub avoided: bool,
}

/// Consecutive legs of the same type and direction, as shown to users.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSegment {
    pub ctype: ConnectionType,
    pub direction: Travel,
    /// Centimetres.
    pub distance: f64,
    /// Seconds.
    pub duration: f64,
    pub from_level: Level,
    pub to_level: Level,
}

/// Computed path from origin to destination.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    points: Vec<RoutePoint>,
    legs: Vec<RouteLeg>,
    relaxed: bool,
    cost: f64,
    cost_model: CostModel,
    origin_title: Option<String>,
    destination_title: Option<String>,
}

impl Route {
    pub(crate) fn new(
        points: Vec<RoutePoint>,
        legs: Vec<RouteLeg>,
        relaxed: bool,
        cost: f64,
        cost_model: CostModel,
    ) -> Self {
        debug_assert_eq!(points.len(), legs.len() + 1);
        Self {
            points,
            legs,
            relaxed,
            cost,
            cost_model,
            origin_title: None,
            destination_title: None,
        }
    }

    pub(crate) fn with_titles(mut self, origin: Option<String>, destination: Option<String>) -> Self {
        self.origin_title = origin;
        self.destination_title = destination;
        self
    }

    /// Points from origin to destination. Endpoints may be positions.
    pub fn points(&self) -> &[RoutePoint] {
        &self.points
    }

    pub fn legs(&self) -> &[RouteLeg] {
        &self.legs
    }

    /// Whether avoided connection types had to be used.
    pub fn relaxed(&self) -> bool {
        self.relaxed
    }

    /// Search cost, including relaxation penalties.
    pub fn total_cost(&self) -> f64 {
        self.cost
    }

    /// Centimetres.
    pub fn total_distance(&self) -> f64 {
        self.legs.iter().map(|leg| leg.distance).sum()
    }

    /// Seconds, as the sum of the described segments.
    pub fn total_duration(&self) -> f64 {
        self.describe().0.iter().map(|segment| segment.duration).sum()
    }

    pub fn hop_count(&self) -> usize {
        self.legs.len()
    }

    /// Title of the origin when it is a room or a position rather than a bare node.
    pub fn origin_title(&self) -> Option<&str> {
        self.origin_title.as_deref()
    }

    /// Title of the destination when it is a room or a position rather than a bare node.
    pub fn destination_title(&self) -> Option<&str> {
        self.destination_title.as_deref()
    }

    /// Identifiers of avoided connections the route uses, in travel order.
    pub fn avoided_connections(&self) -> Vec<&str> {
        self.legs
            .iter()
            .filter(|leg| leg.avoided)
            .filter_map(|leg| leg.connection.as_deref())
            .collect()
    }

    /// Collapse legs into user-facing segments.
    ///
    /// Consecutive legs with the same connection type and direction become
    /// one segment; its duration comes from the cost model, so a fixed wait
    /// (elevators) is counted once per segment. The flag reports whether the
    /// route had to use avoided connection types.
    pub fn describe(&self) -> (Vec<RouteSegment>, bool) {
        let mut segments: Vec<RouteSegment> = Vec::new();
        for (index, leg) in self.legs.iter().enumerate() {
            let to_level = self.points[index + 1].level();
            match segments.last_mut() {
                Some(segment) if segment.ctype == leg.ctype && segment.direction == leg.travel => {
                    segment.distance += leg.distance;
                    segment.to_level = to_level;
                }
                _ => segments.push(RouteSegment {
                    ctype: leg.ctype,
                    direction: leg.travel,
                    distance: leg.distance,
                    duration: 0.0,
                    from_level: self.points[index].level(),
                    to_level,
                }),
            }
        }

        for segment in &mut segments {
            segment.duration = self.cost_model.duration(segment.ctype, segment.distance);
        }

        (segments, self.relaxed)
    }
}
