//! Common test utilities and fixture helpers.
//!
//! The campus fixture is kept as SQL under `docs/fixtures` and materialised
//! into a temporary project directory per test, so tests exercise the same
//! loader as production code.

use std::fs;
use std::path::{Path, PathBuf};

use indoornav_lib::{
    ConnectionType, GraphBuildOptions, Level, MapData, Node, NodeId, Point, SpatialGraph,
};
use rusqlite::Connection;
use tempfile::TempDir;

/// Project identifier used for the campus fixture.
#[allow(dead_code)]
pub const CAMPUS_PROJECT: &str = "campus";

/// Path to the campus fixture SQL.
pub fn campus_sql_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../docs/fixtures/campus.sql")
}

/// Create a map database at `path` from the campus fixture SQL.
pub fn write_campus_db(path: &Path) {
    let sql = fs::read_to_string(campus_sql_path()).expect("read campus fixture");
    write_db(path, &sql);
}

/// Create a map database at `path` from raw SQL.
pub fn write_db(path: &Path, sql: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture directory");
    }
    let connection = Connection::open(path).expect("open fixture database");
    connection.execute_batch(sql).expect("apply fixture sql");
}

/// Temporary data directory containing the campus project.
#[allow(dead_code)]
pub struct CampusEnv {
    _temp_dir: TempDir,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
}

#[allow(dead_code)]
impl CampusEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let data_dir = temp_dir.path().to_path_buf();
        let db_path = data_dir
            .join("projects")
            .join(CAMPUS_PROJECT)
            .join(indoornav_lib::project::MAP_FILENAME);
        write_campus_db(&db_path);
        Self {
            _temp_dir: temp_dir,
            data_dir,
            db_path,
        }
    }

    pub fn graph(&self) -> SpatialGraph {
        self.graph_with(&GraphBuildOptions::default())
    }

    pub fn graph_with(&self, options: &GraphBuildOptions) -> SpatialGraph {
        SpatialGraph::load(&self.db_path, options).expect("campus fixture loads")
    }
}

/// Build the campus graph in a throwaway directory.
#[allow(dead_code)]
pub fn campus_graph() -> SpatialGraph {
    CampusEnv::new().graph()
}

/// In-memory map builder for small hand-made graphs.
#[allow(dead_code)]
#[derive(Default)]
pub struct MapBuilder {
    map: MapData,
}

#[allow(dead_code)]
impl MapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, id: NodeId, level: Level, x: f64, y: f64) -> Self {
        self.map.nodes.push(Node {
            id,
            level,
            point: Point::new(x, y),
        });
        self
    }

    pub fn connect(self, id: &str, from: NodeId, to: NodeId, ctype: ConnectionType) -> Self {
        self.connect_with(id, from, to, ctype, |_| {})
    }

    pub fn connect_with(
        mut self,
        id: &str,
        from: NodeId,
        to: NodeId,
        ctype: ConnectionType,
        configure: impl FnOnce(&mut indoornav_lib::db::ConnectionRecord),
    ) -> Self {
        let mut record = indoornav_lib::db::ConnectionRecord::new(from, to, ctype);
        record.id = Some(id.to_string());
        configure(&mut record);
        self.map.connections.push(record);
        self
    }

    pub fn build(self) -> SpatialGraph {
        let options = GraphBuildOptions {
            auto_connect: false,
            ..GraphBuildOptions::default()
        };
        SpatialGraph::from_map(self.map, &options).expect("builder map is valid")
    }

    pub fn into_map(self) -> MapData {
        self.map
    }
}
