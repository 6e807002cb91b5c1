//! Accessibility-aware routing over a [`SpatialGraph`].
//!
//! A [`Router`] combines the shared graph with one request's [`Settings`]
//! and a [`CostModel`]. Searches run in up to two attempts: a strict one in
//! which denied connection types and excluded connections are impassable,
//! then a relaxed one in which they are merely expensive. Physical
//! directionality and up-only/down-only policies hold in both attempts.

pub mod cost;

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::db::{ConnectionType, LocationTarget, NodeId, SelectableLocation};
use crate::graph::{Connection, Edge, SpatialGraph, Travel};
use crate::path::{find_path, LegKind, SearchPath, Terminal};
use crate::position::UserPosition;
use crate::route::{Route, RouteLeg, RoutePoint};
use crate::settings::{Policy, Settings};

pub use cost::{CostModel, TypeProfile};

/// Warning attached to routes that had to use avoided connections.
pub const RELAXED_ROUTE_WARNING: &str =
    "This route contains connection types you wanted to avoid because otherwise no route would be possible.";

/// Kind of the temporary legs attaching a position to the graph.
const ATTACHMENT_KIND: LegKind = (ConnectionType::Plain, Travel::Level);

/// Origin or destination of a route request.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    Node(NodeId),
    /// Any entry node of the room may be used.
    Room(String),
    Position(UserPosition),
}

impl From<&SelectableLocation> for Endpoint {
    fn from(location: &SelectableLocation) -> Self {
        match &location.target {
            LocationTarget::Room(room) => Endpoint::Room(room.clone()),
            LocationTarget::Node(node) => Endpoint::Node(*node),
        }
    }
}

impl From<UserPosition> for Endpoint {
    fn from(position: UserPosition) -> Self {
        Endpoint::Position(position)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Node(id) => write!(f, "node {id}"),
            Endpoint::Room(room) => write!(f, "room {room}"),
            Endpoint::Position(position) => write!(f, "position {}", position.name()),
        }
    }
}

/// Severity of a message produced while routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Severity::Info => "info",
            Severity::Warn => "warning",
            Severity::Error => "error",
        };
        f.write_str(value)
    }
}

/// User-facing message about a route request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteMessage {
    pub severity: Severity,
    pub text: String,
}

impl RouteMessage {
    pub fn warn(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warn,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Endpoint resolved to search terminals.
struct Resolved<'e> {
    endpoint: &'e Endpoint,
    terminals: Vec<Terminal>,
    attachment: Option<LegKind>,
}

/// Routes between endpoints of one graph under one request's settings.
#[derive(Debug, Clone)]
pub struct Router<'a> {
    graph: &'a SpatialGraph,
    settings: Settings,
    cost_model: CostModel,
}

impl<'a> Router<'a> {
    pub fn new(graph: &'a SpatialGraph, settings: Settings) -> Self {
        Self::with_cost_model(graph, settings, CostModel::default())
    }

    /// Use a custom cost table. An invalid table falls back to the default.
    pub fn with_cost_model(graph: &'a SpatialGraph, settings: Settings, cost_model: CostModel) -> Self {
        let cost_model = if cost_model.is_valid() {
            cost_model
        } else {
            warn!("ignoring cost model with non-positive speeds or negative costs");
            CostModel::default()
        };
        Self {
            graph,
            settings,
            cost_model,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost_model
    }

    /// Compute the cheapest route from `origin` to `destination`.
    ///
    /// Never fails: unknown or unroutable endpoints and unreachable
    /// destinations produce an error message and no route. A route that had
    /// to use avoided connections comes with a warning and is marked
    /// relaxed.
    pub fn get_route(
        &self,
        origin: &Endpoint,
        destination: &Endpoint,
    ) -> (Vec<RouteMessage>, Option<Route>) {
        let mut messages = Vec::new();

        let resolved = self
            .resolve(origin)
            .and_then(|from| self.resolve(destination).map(|to| (from, to)));
        let (from, to) = match resolved {
            Ok(pair) => pair,
            Err(text) => {
                messages.push(RouteMessage::error(text));
                return (messages, None);
            }
        };

        if let (Endpoint::Position(a), Endpoint::Position(b)) = (origin, destination) {
            if a.position() == b.position() {
                let route = Route::new(
                    vec![position_point(a)],
                    Vec::new(),
                    false,
                    0.0,
                    self.cost_model,
                )
                .with_titles(self.title(origin), self.title(destination));
                return (messages, Some(route));
            }
        }

        if let Some(path) = self.search(&from, &to, false) {
            debug!(
                cost = path.cost,
                distance = path.distance,
                hops = path.hops.len(),
                "found strict route"
            );
            return (messages, Some(self.build_route(&from, &to, &path, false)));
        }

        if self.has_avoidances() {
            if let Some(path) = self.search(&from, &to, true) {
                debug!(
                    cost = path.cost,
                    distance = path.distance,
                    hops = path.hops.len(),
                    "found relaxed route"
                );
                messages.push(RouteMessage::warn(RELAXED_ROUTE_WARNING));
                return (messages, Some(self.build_route(&from, &to, &path, true)));
            }
        }

        debug!(%origin, %destination, "no route");
        messages.push(RouteMessage::error(format!(
            "No route could be found from {origin} to {destination}."
        )));
        (messages, None)
    }

    fn resolve<'e>(&self, endpoint: &'e Endpoint) -> Result<Resolved<'e>, String> {
        let (terminals, attachment) = match endpoint {
            Endpoint::Node(id) => {
                let index = self
                    .graph
                    .node_index(*id)
                    .ok_or_else(|| format!("Unknown node {id}."))?;
                (vec![Terminal::at(index)], None)
            }
            Endpoint::Room(room) => {
                if self.graph.room(room).is_none() {
                    return Err(format!("Unknown room {room}."));
                }
                let terminals: Vec<Terminal> = self
                    .graph
                    .room_node_indices(room)
                    .into_iter()
                    .map(Terminal::at)
                    .collect();
                if terminals.is_empty() {
                    return Err(format!("Room {room} has no entry nodes."));
                }
                (terminals, None)
            }
            Endpoint::Position(position) => {
                if !position.is_connected() {
                    return Err(format!(
                        "Position {} is too far from any walkable path.",
                        position.name()
                    ));
                }
                let terminals = position
                    .edges()
                    .iter()
                    .map(|edge| Terminal {
                        node: edge.node_index,
                        cost: self
                            .cost_model
                            .traversal_cost(ConnectionType::Plain, edge.distance),
                        distance: edge.distance,
                    })
                    .collect();
                (terminals, Some(ATTACHMENT_KIND))
            }
        };
        Ok(Resolved {
            endpoint,
            terminals,
            attachment,
        })
    }

    fn search(&self, from: &Resolved<'_>, to: &Resolved<'_>, relaxed: bool) -> Option<SearchPath> {
        find_path(
            self.graph,
            &from.terminals,
            &to.terminals,
            from.attachment,
            to.attachment,
            |origin, edge| self.edge_cost(origin, edge, relaxed),
        )
    }

    /// Cost of walking `edge` away from `origin`, or `None` when impassable.
    fn edge_cost(&self, origin: usize, edge: &Edge, relaxed: bool) -> Option<f64> {
        if !self.graph.physically_traversable(origin, edge) {
            return None;
        }
        let connection = self.graph.connection_at(edge.connection);
        let travel = self.graph.travel(origin, edge);
        if !self.settings.policy_for(connection.ctype).permits_travel(travel) {
            return None;
        }
        if self.is_avoided(connection) {
            return relaxed.then(|| {
                self.cost_model
                    .relaxed_cost(connection.ctype, connection.distance)
            });
        }
        Some(
            self.cost_model
                .traversal_cost(connection.ctype, connection.distance),
        )
    }

    fn is_avoided(&self, connection: &Connection) -> bool {
        self.settings.policy_for(connection.ctype) == Policy::Deny
            || self.settings.is_excluded(&connection.id)
    }

    fn has_avoidances(&self) -> bool {
        !self.settings.excluded.is_empty()
            || ConnectionType::ALL
                .into_iter()
                .any(|ctype| self.settings.policy_for(ctype) == Policy::Deny)
    }

    fn build_route(
        &self,
        from: &Resolved<'_>,
        to: &Resolved<'_>,
        path: &SearchPath,
        relaxed: bool,
    ) -> Route {
        let mut points = Vec::with_capacity(path.hops.len() + 3);
        let mut legs = Vec::with_capacity(path.hops.len() + 2);

        if let Endpoint::Position(position) = from.endpoint {
            let distance = attachment_distance(&from.terminals, path.source);
            points.push(position_point(position));
            legs.push(attachment_leg(distance));
        }
        points.push(self.node_point(path.source));

        for hop in &path.hops {
            let connection = self.graph.connection_at(hop.edge.connection);
            legs.push(RouteLeg {
                connection: Some(connection.id.clone()),
                ctype: connection.ctype,
                travel: self.graph.travel(hop.from, &hop.edge),
                distance: connection.distance,
                avoided: self.is_avoided(connection),
            });
            points.push(self.node_point(hop.edge.target));
        }

        if let Endpoint::Position(position) = to.endpoint {
            let distance = attachment_distance(&to.terminals, path.exit);
            legs.push(attachment_leg(distance));
            points.push(position_point(position));
        }

        Route::new(points, legs, relaxed, path.cost, self.cost_model)
            .with_titles(self.title(from.endpoint), self.title(to.endpoint))
    }

    fn node_point(&self, index: usize) -> RoutePoint {
        let node = self.graph.node_at(index);
        RoutePoint::Node {
            id: node.id,
            level: node.level,
            x: node.point.x,
            y: node.point.y,
        }
    }

    fn title(&self, endpoint: &Endpoint) -> Option<String> {
        match endpoint {
            Endpoint::Node(_) => None,
            Endpoint::Room(room) => self.graph.room(room).map(|room| room.title.clone()),
            Endpoint::Position(position) => Some(position.title().to_string()),
        }
    }
}

fn position_point(position: &UserPosition) -> RoutePoint {
    let inner = position.position();
    RoutePoint::Position {
        level: inner.level,
        x: inner.x,
        y: inner.y,
        title: position.title().to_string(),
    }
}

fn attachment_leg(distance: f64) -> RouteLeg {
    RouteLeg {
        connection: None,
        ctype: ATTACHMENT_KIND.0,
        travel: ATTACHMENT_KIND.1,
        distance,
        avoided: false,
    }
}

/// Distance of the cheapest attachment to `node`; terminals are sorted nearest first.
fn attachment_distance(terminals: &[Terminal], node: usize) -> f64 {
    terminals
        .iter()
        .find(|terminal| terminal.node == node)
        .map(|terminal| terminal.distance)
        .unwrap_or_default()
}
