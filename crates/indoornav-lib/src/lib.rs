//! indoornav library entry points.
//!
//! This crate loads a project's indoor map into an immutable
//! [`SpatialGraph`], computes accessibility-aware routes between locations
//! and positions, and estimates positions from WiFi signal readings.
//! Front ends (the CLI, a web layer) should only depend on the items
//! exported here instead of reimplementing behaviour.

pub mod db;
pub mod error;
pub mod graph;
mod path;
pub mod position;
pub mod project;
pub mod route;
pub mod routing;
pub mod settings;
mod spatial;
pub mod wifi;

pub use db::{
    load_map, ConnectionType, Directionality, Level, LocationTarget, MapData, Node, NodeId, Point,
    Room, SelectableLocation, DEFAULT_LOCALE,
};
pub use error::{Error, Result};
pub use graph::{Connection, GraphBuildOptions, LocationLookup, SpatialGraph, Travel};
pub use position::{Position, SnapEdge, UserPosition};
pub use project::{default_data_dir, list_projects, resolve_data_dir, resolve_map_path};
pub use route::{Route, RouteLeg, RoutePoint, RouteSegment};
pub use routing::{CostModel, Endpoint, RouteMessage, Router, Severity, TypeProfile};
pub use settings::{FieldKind, Policy, Settings, SettingsField};
pub use wifi::{FingerprintIndex, LocateResult, PositionLocator, ReferencePoint, WifiStation};
