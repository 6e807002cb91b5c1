use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::{
    load_map, ConnectionType, Directionality, Level, LocationTarget, MapData, Node, NodeId, Room,
    SelectableLocation, DEFAULT_LOCALE,
};
use crate::error::{Error, Result};
use crate::position::{Position, SnapEdge, UserPosition};
use crate::routing::Endpoint;
use crate::spatial::NodeIndex;
use crate::wifi::FingerprintIndex;

/// Minimum Jaro-Winkler similarity for a slug or title to be suggested.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Options controlling how a map is turned into a routing graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphBuildOptions {
    /// Infer plain connections between nearby nodes at load time.
    pub auto_connect: bool,
    /// Maximum distance (cm) between two nodes for an inferred connection.
    pub auto_connect_distance: f64,
    /// Cap on inferred connections considered per node.
    pub max_auto_neighbors: usize,
    /// Maximum distance (cm) from a position to a node it may snap to.
    pub snap_radius: f64,
    /// Maximum number of nodes a position is attached to.
    pub max_snap_candidates: usize,
    /// Vertical distance (cm) between adjacent levels, used when a
    /// cross-level connection has no explicit distance.
    pub level_height: f64,
    /// Build the fingerprint index for positioning.
    pub load_wifi: bool,
}

impl Default for GraphBuildOptions {
    fn default() -> Self {
        Self {
            auto_connect: true,
            auto_connect_distance: 500.0,
            max_auto_neighbors: 8,
            snap_radius: 1000.0,
            max_snap_candidates: 3,
            level_height: 400.0,
            load_wifi: true,
        }
    }
}

/// Vertical sense of a single traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Travel {
    Up,
    Down,
    Level,
}

impl fmt::Display for Travel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Travel::Up => "up",
            Travel::Down => "down",
            Travel::Level => "level",
        };
        f.write_str(value)
    }
}

/// Connection between two stored nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub id: String,
    pub from: NodeId,
    pub to: NodeId,
    pub ctype: ConnectionType,
    pub direction: Directionality,
    pub distance: f64,
    /// Inferred by auto-connection rather than listed in the map.
    pub inferred: bool,
}

/// Adjacency entry. Every connection appears once per endpoint; `forward`
/// tells whether the entry walks it from `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Edge {
    pub(crate) connection: usize,
    pub(crate) target: usize,
    pub(crate) forward: bool,
}

/// Result of looking up a selectable location by name.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationLookup<'a> {
    Found(&'a SelectableLocation),
    NotFound { suggestions: Vec<String> },
}

impl<'a> LocationLookup<'a> {
    pub fn found(&self) -> Option<&'a SelectableLocation> {
        match self {
            LocationLookup::Found(location) => Some(location),
            LocationLookup::NotFound { .. } => None,
        }
    }

    /// Convert into a `Result`, for callers that treat a miss as an error.
    pub fn into_result(self, name: &str) -> Result<&'a SelectableLocation> {
        match self {
            LocationLookup::Found(location) => Ok(location),
            LocationLookup::NotFound { suggestions } => Err(Error::UnknownLocation {
                name: name.to_string(),
                suggestions,
            }),
        }
    }
}

/// Immutable indoor map prepared for routing and positioning.
///
/// Built once per project and shared read-only between requests.
#[derive(Debug)]
pub struct SpatialGraph {
    nodes: Vec<Node>,
    node_lookup: HashMap<NodeId, usize>,
    connections: Vec<Connection>,
    adjacency: Vec<Vec<Edge>>,
    rooms: Vec<Room>,
    room_lookup: HashMap<String, usize>,
    node_rooms: Vec<Vec<usize>>,
    locations: Vec<SelectableLocation>,
    location_lookup: HashMap<String, usize>,
    titles: HashMap<String, BTreeMap<String, String>>,
    index: NodeIndex,
    wifi: Option<FingerprintIndex>,
    options: GraphBuildOptions,
}

impl SpatialGraph {
    /// Load a project map database and build the graph.
    pub fn load(db_path: &Path, options: &GraphBuildOptions) -> Result<Self> {
        let map = load_map(db_path, options.load_wifi)?;
        Self::from_map(map, options)
    }

    /// Build the graph from in-memory map data.
    pub fn from_map(map: MapData, options: &GraphBuildOptions) -> Result<Self> {
        let MapData {
            nodes,
            connections: records,
            rooms,
            locations,
            mut titles,
            wifi,
        } = map;

        let mut node_lookup = HashMap::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            if node_lookup.insert(node.id, index).is_some() {
                return Err(Error::DuplicateNode { id: node.id });
            }
        }

        let mut room_lookup = HashMap::with_capacity(rooms.len());
        let mut node_rooms = vec![Vec::new(); nodes.len()];
        for (room_index, room) in rooms.iter().enumerate() {
            if room_lookup.insert(room.id.clone(), room_index).is_some() {
                return Err(Error::DuplicateRoom {
                    id: room.id.clone(),
                });
            }
            for node_id in &room.nodes {
                let Some(&node_index) = node_lookup.get(node_id) else {
                    return Err(Error::UnknownNode {
                        id: *node_id,
                        referenced_by: format!("room {}", room.id),
                    });
                };
                node_rooms[node_index].push(room_index);
            }
            titles
                .entry(room.id.clone())
                .or_default()
                .entry(DEFAULT_LOCALE.to_string())
                .or_insert_with(|| room.title.clone());
        }

        let mut connections = Vec::with_capacity(records.len());
        let mut skipped = 0usize;
        for record in records {
            let (Some(&from), Some(&to)) =
                (node_lookup.get(&record.from), node_lookup.get(&record.to))
            else {
                skipped += 1;
                continue;
            };
            if from == to {
                skipped += 1;
                continue;
            }
            let distance = record
                .distance
                .unwrap_or_else(|| node_distance(&nodes[from], &nodes[to], options.level_height));
            connections.push(Connection {
                id: record
                    .id
                    .unwrap_or_else(|| format!("{}-{}", record.from, record.to)),
                from: record.from,
                to: record.to,
                ctype: record.ctype,
                direction: record.direction,
                distance,
                inferred: false,
            });
        }
        if skipped > 0 {
            warn!(skipped, "ignored connections referencing unknown nodes");
        }

        let mut location_lookup = HashMap::with_capacity(locations.len());
        let mut resolved_locations = Vec::with_capacity(locations.len());
        for mut location in locations {
            match &location.target {
                LocationTarget::Room(room_id) => {
                    let Some(&room_index) = room_lookup.get(room_id) else {
                        return Err(Error::UnknownRoom {
                            room: room_id.clone(),
                            slug: location.slug.clone(),
                        });
                    };
                    if location.titles.is_empty() {
                        if let Some(room_titles) = titles.get(&rooms[room_index].id) {
                            location.titles = room_titles.clone();
                        }
                    }
                }
                LocationTarget::Node(node_id) => {
                    if !node_lookup.contains_key(node_id) {
                        return Err(Error::UnknownNode {
                            id: *node_id,
                            referenced_by: format!("location {}", location.slug),
                        });
                    }
                }
            }
            if location_lookup
                .insert(location.slug.clone(), resolved_locations.len())
                .is_some()
            {
                return Err(Error::DuplicateLocation {
                    slug: location.slug,
                });
            }
            resolved_locations.push(location);
        }

        let wifi = if options.load_wifi {
            wifi.map(|data| FingerprintIndex::from_parts(data.stations, data.reference_points))
        } else {
            None
        };

        let index = NodeIndex::build(&nodes);
        let mut graph = Self {
            adjacency: vec![Vec::new(); nodes.len()],
            nodes,
            node_lookup,
            connections: Vec::new(),
            rooms,
            room_lookup,
            node_rooms,
            locations: resolved_locations,
            location_lookup,
            titles,
            index,
            wifi,
            options: *options,
        };
        for connection in connections {
            graph.push_connection(connection);
        }

        if options.auto_connect {
            graph.auto_connect();
        }

        info!(
            nodes = graph.nodes.len(),
            connections = graph.connections.len(),
            inferred = graph.connections.iter().filter(|c| c.inferred).count(),
            rooms = graph.rooms.len(),
            locations = graph.locations.len(),
            wifi = graph.wifi.is_some(),
            "built spatial graph"
        );

        Ok(graph)
    }

    fn push_connection(&mut self, connection: Connection) {
        let from = self.node_lookup[&connection.from];
        let to = self.node_lookup[&connection.to];
        let index = self.connections.len();
        self.adjacency[from].push(Edge {
            connection: index,
            target: to,
            forward: true,
        });
        self.adjacency[to].push(Edge {
            connection: index,
            target: from,
            forward: false,
        });
        self.connections.push(connection);
    }

    /// Infer plain connections between nearby nodes that the map leaves unlinked.
    ///
    /// Pairs must be on the same level, within `auto_connect_distance`, and
    /// when both nodes belong to rooms they must share one.
    fn auto_connect(&mut self) {
        let mut linked: HashSet<(usize, usize)> = self
            .connections
            .iter()
            .map(|c| ordered_pair(self.node_lookup[&c.from], self.node_lookup[&c.to]))
            .collect();

        let mut inferred = Vec::new();
        for (index, node) in self.nodes.iter().enumerate() {
            let candidates = self.index.nearest_within(
                node.level,
                &node.point,
                self.options.auto_connect_distance,
                self.options.max_auto_neighbors + 1,
            );
            for (other, distance) in candidates {
                if other == index {
                    continue;
                }
                let pair = ordered_pair(index, other);
                if linked.contains(&pair) || !self.rooms_compatible(index, other) {
                    continue;
                }
                linked.insert(pair);
                let (low, high) = (&self.nodes[pair.0], &self.nodes[pair.1]);
                inferred.push(Connection {
                    id: format!("auto:{}-{}", low.id, high.id),
                    from: low.id,
                    to: high.id,
                    ctype: ConnectionType::Plain,
                    direction: Directionality::Bidirectional,
                    distance,
                    inferred: true,
                });
            }
        }

        debug!(inferred = inferred.len(), "auto-connected nodes");
        for connection in inferred {
            self.push_connection(connection);
        }
    }

    fn rooms_compatible(&self, a: usize, b: usize) -> bool {
        let (rooms_a, rooms_b) = (&self.node_rooms[a], &self.node_rooms[b]);
        rooms_a.is_empty() || rooms_b.is_empty() || rooms_a.iter().any(|r| rooms_b.contains(r))
    }

    /// Look up a selectable location by slug.
    ///
    /// Tries an exact match, then a case-insensitive one. Misses are a normal
    /// outcome and carry up to three similar slugs as suggestions.
    pub fn get_selectable_location(&self, name: &str) -> LocationLookup<'_> {
        let name = name.trim();
        if let Some(&index) = self.location_lookup.get(name) {
            return LocationLookup::Found(&self.locations[index]);
        }
        if let Some(location) = self
            .locations
            .iter()
            .find(|location| location.slug.eq_ignore_ascii_case(name))
        {
            return LocationLookup::Found(location);
        }
        LocationLookup::NotFound {
            suggestions: self.fuzzy_location_matches(name, 3),
        }
    }

    /// Slugs whose slug or any title resembles `name`, best match first.
    pub fn fuzzy_location_matches(&self, name: &str, limit: usize) -> Vec<String> {
        let needle = name.to_lowercase();
        if needle.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(f64, &str)> = self
            .locations
            .iter()
            .filter_map(|location| {
                std::iter::once(location.slug.as_str())
                    .chain(location.titles.values().map(String::as_str))
                    .map(|candidate| strsim::jaro_winkler(&needle, &candidate.to_lowercase()))
                    .max_by(f64::total_cmp)
                    .filter(|score| *score >= SUGGESTION_THRESHOLD)
                    .map(|score| (score, location.slug.as_str()))
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, slug)| slug.to_string())
            .collect()
    }

    /// Resolve a user-supplied origin or destination.
    ///
    /// Accepts a selectable location slug or a coordinate name
    /// (`<level>:<x>:<y>`, optionally prefixed with `n`). Coordinates are
    /// snapped with [`SpatialGraph::connect_position`].
    pub fn resolve_location(&self, name: &str) -> Option<Endpoint> {
        if let Some(location) = self.get_selectable_location(name).found() {
            return Some(Endpoint::from(location));
        }
        name.parse::<Position>()
            .ok()
            .map(|position| Endpoint::Position(self.connect_position(position)))
    }

    /// Attach an arbitrary position to nearby nodes on its level.
    ///
    /// Produces at most `max_snap_candidates` edges to nodes within
    /// `snap_radius`. A position with no node in range gets no edges and is
    /// unroutable.
    pub fn connect_position(&self, position: Position) -> UserPosition {
        let point = position.point();
        let edges: Vec<SnapEdge> = self
            .index
            .nearest_within(
                position.level,
                &point,
                self.options.snap_radius,
                self.options.max_snap_candidates,
            )
            .into_iter()
            .map(|(node_index, distance)| SnapEdge {
                node_index,
                node: self.nodes[node_index].id,
                distance,
            })
            .collect();

        let title = self.position_title(&position, edges.first());
        debug!(
            position = %position,
            edges = edges.len(),
            title = %title,
            "connected position"
        );
        UserPosition::new(position, edges, title)
    }

    fn position_title(&self, position: &Position, nearest: Option<&SnapEdge>) -> String {
        let point = position.point();
        if let Some(room) = self
            .rooms
            .iter()
            .find(|room| room.contains(position.level, &point))
        {
            return room.title.clone();
        }
        nearest
            .and_then(|edge| self.node_rooms[edge.node_index].first())
            .map(|&room| self.rooms[room].title.clone())
            .unwrap_or_else(|| position.name())
    }

    /// Selectable locations ordered by priority (highest first), then title.
    pub fn selectable_locations(&self, locale: &str) -> Vec<&SelectableLocation> {
        let mut locations: Vec<&SelectableLocation> = self.locations.iter().collect();
        locations.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.title(locale).cmp(b.title(locale)))
                .then_with(|| a.slug.cmp(&b.slug))
        });
        locations
    }

    /// Localised title for a room, location or connection identifier.
    pub fn title_for(&self, name: &str, locale: &str) -> String {
        self.titles
            .get(name)
            .and_then(|titles| titles.get(locale).or_else(|| titles.get(DEFAULT_LOCALE)))
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.node_lookup.get(&id).map(|&index| &self.nodes[index])
    }

    pub fn room(&self, id: &str) -> Option<&Room> {
        self.room_lookup.get(id).map(|&index| &self.rooms[index])
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Connections leaving or entering `node`, each listed once.
    pub fn connections_of(&self, node: NodeId) -> Vec<&Connection> {
        self.node_lookup
            .get(&node)
            .map(|&index| {
                self.adjacency[index]
                    .iter()
                    .map(|edge| &self.connections[edge.connection])
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn options(&self) -> &GraphBuildOptions {
        &self.options
    }

    /// Levels that contain nodes.
    pub fn levels(&self) -> Vec<Level> {
        let mut levels: Vec<Level> = self.index.levels().collect();
        levels.sort_unstable();
        levels
    }

    /// Fingerprint index, or [`Error::WifiUnavailable`] when it was not loaded.
    pub fn wifi(&self) -> Result<&FingerprintIndex> {
        self.wifi.as_ref().ok_or(Error::WifiUnavailable)
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn node_index(&self, id: NodeId) -> Option<usize> {
        self.node_lookup.get(&id).copied()
    }

    pub(crate) fn node_at(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub(crate) fn room_node_indices(&self, id: &str) -> Vec<usize> {
        self.room(id)
            .map(|room| {
                room.nodes
                    .iter()
                    .filter_map(|node| self.node_index(*node))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn edges_from(&self, index: usize) -> &[Edge] {
        &self.adjacency[index]
    }

    pub(crate) fn connection_at(&self, index: usize) -> &Connection {
        &self.connections[index]
    }

    /// Vertical sense of walking `edge` away from `origin`.
    pub(crate) fn travel(&self, origin: usize, edge: &Edge) -> Travel {
        let connection = &self.connections[edge.connection];
        let from_level = self.nodes[origin].level;
        let to_level = self.nodes[edge.target].level;
        match to_level.cmp(&from_level) {
            Ordering::Greater => Travel::Up,
            Ordering::Less => Travel::Down,
            Ordering::Equal if connection.ctype.is_climbing() => {
                if edge.forward {
                    Travel::Up
                } else {
                    Travel::Down
                }
            }
            Ordering::Equal => Travel::Level,
        }
    }

    /// Whether the connection's physical direction restriction permits `edge`.
    ///
    /// For level travel an up-only connection may only be walked from→to and a
    /// down-only one only to→from.
    pub(crate) fn physically_traversable(&self, origin: usize, edge: &Edge) -> bool {
        let connection = &self.connections[edge.connection];
        match (connection.direction, self.travel(origin, edge)) {
            (Directionality::Bidirectional, _) => true,
            (Directionality::UpOnly, Travel::Up) => true,
            (Directionality::UpOnly, Travel::Down) => false,
            (Directionality::UpOnly, Travel::Level) => edge.forward,
            (Directionality::DownOnly, Travel::Down) => true,
            (Directionality::DownOnly, Travel::Up) => false,
            (Directionality::DownOnly, Travel::Level) => !edge.forward,
        }
    }
}

fn ordered_pair(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn node_distance(a: &Node, b: &Node, level_height: f64) -> f64 {
    let planar = a.point.distance_to(&b.point);
    let vertical = f64::from(a.level - b.level) * level_height;
    (planar * planar + vertical * vertical).sqrt()
}
