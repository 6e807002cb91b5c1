//! Per-level KD-tree index over map nodes.
//!
//! Nodes on different levels never neighbour each other for snapping or
//! auto-connection, so the index keeps one 2D tree per level. Each distinct
//! coordinate is stored once; tree items index a per-level list of sites,
//! and each site holds the graph node indices at that coordinate.

use std::collections::HashMap;

use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;

use crate::db::{Level, Node, Point};

/// KD-tree bucket size (kiddo default).
const BUCKET_SIZE: usize = 32;

type LevelTree = KdTree<f64, usize, 2, BUCKET_SIZE, u32>;

/// One level's tree plus the node indices at each stored coordinate.
struct LevelIndex {
    tree: LevelTree,
    sites: Vec<Vec<usize>>,
}

/// Spatial lookup of node indices by level and coordinates.
pub struct NodeIndex {
    levels: HashMap<Level, LevelIndex>,
}

/// Bit pattern of a coordinate with `-0.0` folded into `0.0`.
fn coordinate_key(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

impl NodeIndex {
    /// Build the index from the graph's node list.
    pub fn build(nodes: &[Node]) -> Self {
        let mut levels: HashMap<Level, LevelIndex> = HashMap::new();
        let mut site_lookup: HashMap<(Level, u64, u64), usize> = HashMap::new();
        for (index, node) in nodes.iter().enumerate() {
            let level = levels.entry(node.level).or_insert_with(|| LevelIndex {
                tree: KdTree::new(),
                sites: Vec::new(),
            });
            let key = (
                node.level,
                coordinate_key(node.point.x),
                coordinate_key(node.point.y),
            );
            match site_lookup.get(&key) {
                Some(&site) => level.sites[site].push(index),
                None => {
                    let site = level.sites.len();
                    level.sites.push(vec![index]);
                    level.tree.add(&[node.point.x, node.point.y], site);
                    site_lookup.insert(key, site);
                }
            }
        }
        Self { levels }
    }

    /// All nodes on `level` within `radius` of `point`, sorted by distance
    /// then node index. Returns `(node index, distance)` pairs.
    pub fn within_radius(&self, level: Level, point: &Point, radius: f64) -> Vec<(usize, f64)> {
        if radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }
        let Some(level) = self.levels.get(&level) else {
            return Vec::new();
        };

        let mut neighbours: Vec<(usize, f64)> = level
            .tree
            .within::<SquaredEuclidean>(&[point.x, point.y], radius * radius)
            .into_iter()
            .flat_map(|neighbour| {
                let distance = neighbour.distance.sqrt();
                level.sites[neighbour.item]
                    .iter()
                    .map(move |&node| (node, distance))
            })
            .collect();

        neighbours.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        neighbours
    }

    /// Up to `k` nearest nodes on `level` within `radius` of `point`.
    pub fn nearest_within(
        &self,
        level: Level,
        point: &Point,
        radius: f64,
        k: usize,
    ) -> Vec<(usize, f64)> {
        if k == 0 {
            return Vec::new();
        }
        let mut neighbours = self.within_radius(level, point, radius);
        neighbours.truncate(k);
        neighbours
    }

    /// Levels that contain at least one node.
    pub fn levels(&self) -> impl Iterator<Item = Level> + '_ {
        self.levels.keys().copied()
    }
}

impl std::fmt::Debug for NodeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeIndex")
            .field("levels", &self.levels.len())
            .finish()
    }
}
