// Test utilities shared by the renderer tests.
// Kept under `#[cfg(test)]` so it is not part of the public crate API.
use indoornav_lib::db::ConnectionRecord;
use indoornav_lib::{
    ConnectionType, GraphBuildOptions, MapData, Node, NodeId, Point, SpatialGraph,
};

use crate::terminal::ColorPalette;

pub const PLAIN: ColorPalette = ColorPalette::plain();

fn node(id: NodeId, level: i32, x: f64) -> Node {
    Node {
        id,
        level,
        point: Point::new(x, 0.0),
    }
}

fn record(id: &str, from: NodeId, to: NodeId, ctype: ConnectionType) -> ConnectionRecord {
    let mut record = ConnectionRecord::new(from, to, ctype);
    record.id = Some(id.to_string());
    record
}

/// Node 1 on level 0, stairs up to node 2, then a 10 m corridor to node 3.
pub fn two_level_graph() -> SpatialGraph {
    let map = MapData {
        nodes: vec![node(1, 0, 0.0), node(2, 1, 0.0), node(3, 1, 1000.0)],
        connections: vec![
            record("stairs", 1, 2, ConnectionType::Stairs),
            record("corridor", 2, 3, ConnectionType::Plain),
        ],
        ..MapData::default()
    };
    let options = GraphBuildOptions {
        auto_connect: false,
        ..GraphBuildOptions::default()
    };
    SpatialGraph::from_map(map, &options).expect("test map builds")
}
