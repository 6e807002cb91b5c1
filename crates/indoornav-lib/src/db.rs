use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use rusqlite::{Connection, OpenFlags, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::wifi::{ReferencePoint, WifiStation};

/// Numeric identifier for a map node.
pub type NodeId = i64;

/// Floor index. Larger values are higher up.
pub type Level = i32;

/// Planar coordinates in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculate the Euclidean distance to another point.
    pub fn distance_to(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Walkable graph node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub level: Level,
    pub point: Point,
}

/// Physical category of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    Plain,
    Steps,
    Stairs,
    Escalator,
    Elevator,
}

impl ConnectionType {
    pub const ALL: [ConnectionType; 5] = [
        ConnectionType::Plain,
        ConnectionType::Steps,
        ConnectionType::Stairs,
        ConnectionType::Escalator,
        ConnectionType::Elevator,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionType::Plain => "plain",
            ConnectionType::Steps => "steps",
            ConnectionType::Stairs => "stairs",
            ConnectionType::Escalator => "escalator",
            ConnectionType::Elevator => "elevator",
        }
    }

    /// Climbing types are stored lower end first when both ends share a level.
    pub fn is_climbing(self) -> bool {
        matches!(
            self,
            ConnectionType::Steps | ConnectionType::Stairs | ConnectionType::Escalator
        )
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "plain" | "default" => Ok(ConnectionType::Plain),
            "steps" => Ok(ConnectionType::Steps),
            "stairs" => Ok(ConnectionType::Stairs),
            "escalator" | "escalators" => Ok(ConnectionType::Escalator),
            "elevator" | "elevators" => Ok(ConnectionType::Elevator),
            _ => Err(Error::InvalidConnectionType {
                value: value.to_string(),
            }),
        }
    }
}

/// Physical direction restriction of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Directionality {
    #[default]
    Bidirectional,
    UpOnly,
    DownOnly,
}

impl FromStr for Directionality {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "both" | "bidirectional" => Ok(Directionality::Bidirectional),
            "up" | "up-only" | "up_only" => Ok(Directionality::UpOnly),
            "down" | "down-only" | "down_only" => Ok(Directionality::DownOnly),
            _ => Err(Error::InvalidDirectionality {
                value: value.to_string(),
            }),
        }
    }
}

/// Connection row as stored in the map. Distance and identifier are optional
/// and derived by the graph builder when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionRecord {
    pub id: Option<String>,
    pub from: NodeId,
    pub to: NodeId,
    pub ctype: ConnectionType,
    pub direction: Directionality,
    pub distance: Option<f64>,
}

impl ConnectionRecord {
    /// Bidirectional connection with a distance derived from node coordinates.
    pub fn new(from: NodeId, to: NodeId, ctype: ConnectionType) -> Self {
        Self {
            id: None,
            from,
            to,
            ctype,
            direction: Directionality::Bidirectional,
            distance: None,
        }
    }
}

/// Bounded area on one level.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub id: String,
    pub level: Level,
    pub title: String,
    pub outline: Vec<Point>,
    pub nodes: Vec<NodeId>,
}

impl Room {
    /// Even-odd point-in-polygon test against the room outline.
    pub fn contains(&self, level: Level, point: &Point) -> bool {
        if level != self.level || self.outline.len() < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = self.outline.len() - 1;
        for i in 0..self.outline.len() {
            let a = self.outline[i];
            let b = self.outline[j];
            if (a.y > point.y) != (b.y > point.y)
                && point.x < (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// What a selectable location points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum LocationTarget {
    Room(String),
    Node(NodeId),
}

/// Named, user-facing destination.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectableLocation {
    pub slug: String,
    pub target: LocationTarget,
    /// Display titles keyed by locale.
    pub titles: BTreeMap<String, String>,
    pub priority: i32,
}

impl SelectableLocation {
    /// Title for `locale`, falling back to English and finally to the slug.
    pub fn title(&self, locale: &str) -> &str {
        self.titles
            .get(locale)
            .or_else(|| self.titles.get(DEFAULT_LOCALE))
            .or_else(|| self.titles.values().next())
            .map(String::as_str)
            .unwrap_or(&self.slug)
    }
}

/// Locale used when a title is not available in the requested one.
pub const DEFAULT_LOCALE: &str = "en";

/// Raw fingerprint database rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WifiData {
    pub stations: Vec<WifiStation>,
    pub reference_points: Vec<ReferencePoint>,
}

/// Everything a project map database provides, before graph construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapData {
    pub nodes: Vec<Node>,
    pub connections: Vec<ConnectionRecord>,
    pub rooms: Vec<Room>,
    pub locations: Vec<SelectableLocation>,
    /// Localised titles for rooms, locations and connection identifiers.
    pub titles: HashMap<String, BTreeMap<String, String>>,
    pub wifi: Option<WifiData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TableDefinition {
    table: &'static str,
    columns: &'static [&'static str],
}

const REQUIRED_TABLES: [TableDefinition; 5] = [
    TableDefinition {
        table: "Nodes",
        columns: &["nodeId", "level", "x", "y"],
    },
    TableDefinition {
        table: "Connections",
        columns: &["connectionId", "fromNodeId", "toNodeId", "ctype"],
    },
    TableDefinition {
        table: "Rooms",
        columns: &["roomId", "level", "title"],
    },
    TableDefinition {
        table: "RoomNodes",
        columns: &["roomId", "nodeId"],
    },
    TableDefinition {
        table: "Locations",
        columns: &["slug", "roomId", "nodeId"],
    },
];

const TITLES_TABLE: TableDefinition = TableDefinition {
    table: "Titles",
    columns: &["name", "locale", "title"],
};

const WIFI_TABLES: [TableDefinition; 2] = [
    TableDefinition {
        table: "WifiStations",
        columns: &["stationId", "level"],
    },
    TableDefinition {
        table: "WifiFingerprints",
        columns: &["pointName", "level", "x", "y", "stationId", "rssi"],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OptionalColumns {
    direction: bool,
    distance: bool,
    outline: bool,
    priority: bool,
    station_position: bool,
    ssid: bool,
}

/// Load a project map database into memory.
///
/// The required tables are validated up front. `Titles` and the two wifi
/// tables are optional; fingerprint data is only read when `load_wifi` is
/// set. Connections referencing unknown nodes are skipped so they never reach
/// the in-memory graph.
pub fn load_map(db_path: &Path, load_wifi: bool) -> Result<MapData> {
    if !db_path.exists() {
        return Err(Error::ProjectNotFound {
            path: db_path.to_path_buf(),
        });
    }

    let connection = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    let optional = detect_schema(&connection)?;
    debug!(path = %db_path.display(), "loading map");

    let nodes = load_nodes(&connection)?;
    let connections = load_connections(&connection, &optional, &nodes)?;
    let rooms = load_rooms(&connection, &optional)?;
    let titles = if table_matches(&connection, &TITLES_TABLE)? {
        load_titles(&connection)?
    } else {
        HashMap::new()
    };
    let locations = load_locations(&connection, &optional, &titles)?;

    let wifi = if !load_wifi {
        None
    } else if has_wifi_tables(&connection)? {
        Some(load_wifi_data(&connection, &optional)?)
    } else {
        info!(path = %db_path.display(), "map has no fingerprint tables; positioning disabled");
        None
    };

    info!(
        nodes = nodes.len(),
        connections = connections.len(),
        rooms = rooms.len(),
        locations = locations.len(),
        wifi = wifi.is_some(),
        "loaded map"
    );

    Ok(MapData {
        nodes,
        connections,
        rooms,
        locations,
        titles,
        wifi,
    })
}

fn detect_schema(connection: &Connection) -> Result<OptionalColumns> {
    for definition in &REQUIRED_TABLES {
        if !table_matches(connection, definition)? {
            return Err(Error::UnsupportedSchema);
        }
    }

    Ok(OptionalColumns {
        direction: table_has_columns(connection, "Connections", &["direction"])?,
        distance: table_has_columns(connection, "Connections", &["distance"])?,
        outline: table_has_columns(connection, "Rooms", &["outline"])?,
        priority: table_has_columns(connection, "Locations", &["priority"])?,
        station_position: table_exists(connection, "WifiStations")?
            && table_has_columns(connection, "WifiStations", &["x", "y"])?,
        ssid: table_exists(connection, "WifiStations")?
            && table_has_columns(connection, "WifiStations", &["ssid"])?,
    })
}

fn has_wifi_tables(connection: &Connection) -> Result<bool> {
    for definition in &WIFI_TABLES {
        if !table_matches(connection, definition)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn load_nodes(connection: &Connection) -> Result<Vec<Node>> {
    let mut stmt = connection.prepare("SELECT nodeId, level, x, y FROM Nodes ORDER BY nodeId")?;
    let rows = stmt.query_map([], row_to_node)?;

    let mut nodes = Vec::new();
    for entry in rows {
        nodes.push(entry?);
    }
    Ok(nodes)
}

fn row_to_node(row: &Row<'_>) -> rusqlite::Result<Node> {
    Ok(Node {
        id: row.get(0)?,
        level: row.get(1)?,
        point: Point {
            x: row.get(2)?,
            y: row.get(3)?,
        },
    })
}

fn load_connections(
    connection: &Connection,
    optional: &OptionalColumns,
    nodes: &[Node],
) -> Result<Vec<ConnectionRecord>> {
    let sql = format!(
        "SELECT connectionId, fromNodeId, toNodeId, ctype, {direction}, {distance} FROM Connections",
        direction = if optional.direction {
            "direction"
        } else {
            "NULL"
        },
        distance = if optional.distance { "distance" } else { "NULL" },
    );

    let mut stmt = connection.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, Option<String>>(0)?,
            row.get::<_, NodeId>(1)?,
            row.get::<_, NodeId>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, Option<f64>>(5)?,
        ))
    })?;

    let known: std::collections::HashSet<NodeId> = nodes.iter().map(|node| node.id).collect();
    let mut connections = Vec::new();
    let mut skipped_edges = 0usize;
    for row in rows {
        let (id, from, to, ctype, direction, distance) = row?;
        if !known.contains(&from) || !known.contains(&to) || from == to {
            skipped_edges += 1;
            continue;
        }
        connections.push(ConnectionRecord {
            id: id.filter(|value| !value.is_empty()),
            from,
            to,
            ctype: ctype.as_deref().unwrap_or_default().parse()?,
            direction: direction.as_deref().unwrap_or_default().parse()?,
            distance: distance.filter(|d| d.is_finite() && *d >= 0.0),
        });
    }

    if skipped_edges > 0 {
        warn!(
            skipped_edges,
            "ignored connections referencing unknown nodes",
        );
    }

    Ok(connections)
}

fn load_rooms(connection: &Connection, optional: &OptionalColumns) -> Result<Vec<Room>> {
    let sql = format!(
        "SELECT roomId, level, title, {outline} FROM Rooms ORDER BY roomId",
        outline = if optional.outline { "outline" } else { "NULL" },
    );
    let mut stmt = connection.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Level>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<String>>(3)?,
        ))
    })?;

    let mut rooms = Vec::new();
    for row in rows {
        let (id, level, title, outline) = row?;
        let outline = match outline.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => serde_json::from_str::<Vec<[f64; 2]>>(text)?
                .into_iter()
                .map(|[x, y]| Point { x, y })
                .collect(),
            _ => Vec::new(),
        };
        rooms.push(Room {
            title: title.unwrap_or_else(|| id.clone()),
            id,
            level,
            outline,
            nodes: Vec::new(),
        });
    }

    let mut stmt = connection.prepare("SELECT roomId, nodeId FROM RoomNodes ORDER BY nodeId")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, NodeId>(1)?))
    })?;
    for row in rows {
        let (room_id, node_id) = row?;
        match rooms.iter_mut().find(|room| room.id == room_id) {
            Some(room) => room.nodes.push(node_id),
            None => warn!(room = %room_id, node = node_id, "ignored node for unknown room"),
        }
    }

    Ok(rooms)
}

fn load_titles(connection: &Connection) -> Result<HashMap<String, BTreeMap<String, String>>> {
    let mut stmt = connection.prepare("SELECT name, locale, title FROM Titles")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut titles: HashMap<String, BTreeMap<String, String>> = HashMap::new();
    for row in rows {
        let (name, locale, title) = row?;
        titles.entry(name).or_default().insert(locale, title);
    }
    Ok(titles)
}

fn load_locations(
    connection: &Connection,
    optional: &OptionalColumns,
    titles: &HashMap<String, BTreeMap<String, String>>,
) -> Result<Vec<SelectableLocation>> {
    let sql = format!(
        "SELECT slug, roomId, nodeId, {priority} FROM Locations ORDER BY slug",
        priority = if optional.priority { "priority" } else { "NULL" },
    );
    let mut stmt = connection.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, Option<NodeId>>(2)?,
            row.get::<_, Option<i32>>(3)?,
        ))
    })?;

    let mut locations = Vec::new();
    let mut skipped = 0usize;
    for row in rows {
        let (slug, room, node, priority) = row?;
        let target = match (room, node) {
            (Some(room), _) => LocationTarget::Room(room),
            (None, Some(node)) => LocationTarget::Node(node),
            (None, None) => {
                skipped += 1;
                continue;
            }
        };
        locations.push(SelectableLocation {
            titles: titles.get(&slug).cloned().unwrap_or_default(),
            slug,
            target,
            priority: priority.unwrap_or(0),
        });
    }

    if skipped > 0 {
        warn!(skipped, "ignored locations without a room or node target");
    }

    Ok(locations)
}

fn load_wifi_data(connection: &Connection, optional: &OptionalColumns) -> Result<WifiData> {
    let sql = format!(
        "SELECT stationId, level, {x}, {y}, {ssid} FROM WifiStations",
        x = if optional.station_position { "x" } else { "NULL" },
        y = if optional.station_position { "y" } else { "NULL" },
        ssid = if optional.ssid { "ssid" } else { "NULL" },
    );
    let mut stmt = connection.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        let position = match (row.get::<_, Option<f64>>(2)?, row.get::<_, Option<f64>>(3)?) {
            (Some(x), Some(y)) => Some(Point { x, y }),
            _ => None,
        };
        Ok(WifiStation {
            id: row.get(0)?,
            level: row.get(1)?,
            position,
            ssid: row.get(4)?,
        })
    })?;

    let mut stations = Vec::new();
    for row in rows {
        stations.push(row?);
    }

    let mut stmt = connection.prepare(
        "SELECT pointName, level, x, y, stationId, rssi FROM WifiFingerprints ORDER BY pointName",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Level>(1)?,
            row.get::<_, f64>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, f64>(5)?,
        ))
    })?;

    let mut reference_points: Vec<ReferencePoint> = Vec::new();
    for row in rows {
        let (name, level, x, y, station, rssi) = row?;
        let index = match reference_points
            .iter()
            .position(|point| point.name == name && point.level == level)
        {
            Some(index) => index,
            None => {
                reference_points.push(ReferencePoint {
                    name,
                    level,
                    point: Point { x, y },
                    fingerprint: BTreeMap::new(),
                });
                reference_points.len() - 1
            }
        };
        reference_points[index].fingerprint.insert(station, rssi);
    }

    Ok(WifiData {
        stations,
        reference_points,
    })
}

fn table_matches(connection: &Connection, definition: &TableDefinition) -> Result<bool> {
    Ok(table_exists(connection, definition.table)?
        && table_has_columns(connection, definition.table, definition.columns)?)
}

fn table_exists(connection: &Connection, table: &str) -> Result<bool> {
    let mut stmt = connection
        .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 LIMIT 1")?;
    let mut rows = stmt.query([table])?;
    Ok(rows.next()?.is_some())
}

fn table_has_columns(connection: &Connection, table: &str, required: &[&str]) -> Result<bool> {
    let pragma = format!("PRAGMA table_info('{table}')");
    let mut stmt = connection.prepare(&pragma)?;
    let mut rows = stmt.query([])?;

    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        columns.push(name);
    }

    Ok(required.iter().all(|required| {
        columns
            .iter()
            .any(|column| column.eq_ignore_ascii_case(required))
    }))
}
