use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::db::ConnectionType;
use crate::graph::{Edge, SpatialGraph, Travel};

/// Costs closer than this (relative) are treated as ties and broken by
/// distance, then by the number of connection-type changes.
const TIE_EPSILON: f64 = 1e-9;

/// Entry or exit point of a search: a stored node reached at an initial cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Terminal {
    pub(crate) node: usize,
    pub(crate) cost: f64,
    pub(crate) distance: f64,
}

impl Terminal {
    pub(crate) fn at(node: usize) -> Self {
        Self {
            node,
            cost: 0.0,
            distance: 0.0,
        }
    }
}

/// Kind of a traversal for counting type transitions.
pub(crate) type LegKind = (ConnectionType, Travel);

/// One walked connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Hop {
    pub(crate) from: usize,
    pub(crate) edge: Edge,
}

/// Lowest-cost path found by [`find_path`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SearchPath {
    pub(crate) source: usize,
    pub(crate) hops: Vec<Hop>,
    pub(crate) exit: usize,
    pub(crate) cost: f64,
    pub(crate) distance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Label {
    cost: f64,
    distance: f64,
    transitions: u32,
    kind: Option<LegKind>,
}

impl Label {
    fn extend(&self, cost: f64, distance: f64, kind: Option<LegKind>) -> Self {
        let changed = matches!((self.kind, kind), (Some(a), Some(b)) if a != b);
        Self {
            cost: self.cost + cost,
            distance: self.distance + distance,
            transitions: self.transitions + u32::from(changed),
            kind: kind.or(self.kind),
        }
    }

    /// Tolerant ordering used to decide whether a label improves on another.
    fn compare(&self, other: &Self) -> Ordering {
        let scale = self.cost.abs().max(other.cost.abs()).max(1.0);
        if (self.cost - other.cost).abs() > TIE_EPSILON * scale {
            return self.cost.total_cmp(&other.cost);
        }
        let scale = self.distance.abs().max(other.distance.abs()).max(1.0);
        if (self.distance - other.distance).abs() > TIE_EPSILON * scale {
            return self.distance.total_cmp(&other.distance);
        }
        self.transitions.cmp(&other.transitions)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Parent {
    Source,
    Hop(Hop),
}

/// Dijkstra search from any of `sources` to any of `targets`.
///
/// `edge_cost` returns the non-negative cost of walking an edge away from a
/// node, or `None` when the edge is impassable. Targets are joined through a
/// virtual goal so the search picks the cheapest exit as well. `origin_kind`
/// and `exit_kind` describe the attachment legs of positions so they count
/// towards type transitions.
pub(crate) fn find_path<F>(
    graph: &SpatialGraph,
    sources: &[Terminal],
    targets: &[Terminal],
    origin_kind: Option<LegKind>,
    exit_kind: Option<LegKind>,
    mut edge_cost: F,
) -> Option<SearchPath>
where
    F: FnMut(usize, &Edge) -> Option<f64>,
{
    let node_count = graph.node_count();
    let goal = node_count;
    let mut labels: Vec<Option<Label>> = vec![None; node_count + 1];
    let mut parents: Vec<Option<Parent>> = vec![None; node_count + 1];
    let mut settled = vec![false; node_count + 1];
    let mut exits: Vec<Option<Terminal>> = vec![None; node_count];
    let mut queue = BinaryHeap::new();

    for target in targets {
        let slot = &mut exits[target.node];
        let better = slot.is_none_or(|existing| {
            target.cost < existing.cost
                || (target.cost == existing.cost && target.distance < existing.distance)
        });
        if better {
            *slot = Some(*target);
        }
    }

    for source in sources {
        let label = Label {
            cost: source.cost,
            distance: source.distance,
            transitions: 0,
            kind: origin_kind,
        };
        if improves(&labels[source.node], &label) {
            labels[source.node] = Some(label);
            parents[source.node] = Some(Parent::Source);
            queue.push(QueueEntry::new(source.node, label));
        }
    }

    let mut goal_parent = None;
    while let Some(entry) = queue.pop() {
        if settled[entry.node] {
            continue;
        }
        settled[entry.node] = true;

        if entry.node == goal {
            break;
        }

        // The first pop of a node settles it with its best label, which may
        // be newer than the popped entry when costs tie within tolerance.
        let Some(current) = labels[entry.node] else {
            continue;
        };

        if let Some(exit) = exits[entry.node] {
            let candidate = current.extend(exit.cost, exit.distance, exit_kind);
            if improves(&labels[goal], &candidate) {
                labels[goal] = Some(candidate);
                goal_parent = Some(entry.node);
                queue.push(QueueEntry::new(goal, candidate));
            }
        }

        for edge in graph.edges_from(entry.node) {
            if settled[edge.target] {
                continue;
            }
            let Some(cost) = edge_cost(entry.node, edge) else {
                continue;
            };
            let connection = graph.connection_at(edge.connection);
            let kind = (connection.ctype, graph.travel(entry.node, edge));
            let candidate = current.extend(cost, connection.distance, Some(kind));
            if improves(&labels[edge.target], &candidate) {
                labels[edge.target] = Some(candidate);
                parents[edge.target] = Some(Parent::Hop(Hop {
                    from: entry.node,
                    edge: *edge,
                }));
                queue.push(QueueEntry::new(edge.target, candidate));
            }
        }
    }

    let exit = goal_parent?;
    let total = labels[goal]?;
    let (source, hops) = reconstruct_path(&parents, exit)?;
    Some(SearchPath {
        source,
        hops,
        exit,
        cost: total.cost,
        distance: total.distance,
    })
}

fn improves(existing: &Option<Label>, candidate: &Label) -> bool {
    existing.is_none_or(|label| candidate.compare(&label) == Ordering::Less)
}

fn reconstruct_path(parents: &[Option<Parent>], exit: usize) -> Option<(usize, Vec<Hop>)> {
    let mut hops = Vec::new();
    let mut current = exit;
    loop {
        match parents[current]? {
            Parent::Source => break,
            Parent::Hop(hop) => {
                hops.push(hop);
                current = hop.from;
            }
        }
        if hops.len() > parents.len() {
            return None;
        }
    }
    hops.reverse();
    Some((current, hops))
}

#[derive(Copy, Clone, Debug, Default)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct QueueEntry {
    node: usize,
    cost: FloatOrd,
    distance: FloatOrd,
    transitions: u32,
}

impl QueueEntry {
    fn new(node: usize, label: Label) -> Self {
        Self {
            node,
            cost: FloatOrd(label.cost),
            distance: FloatOrd(label.distance),
            transitions: label.transitions,
        }
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering so BinaryHeap becomes a min-heap by cost.
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.distance.cmp(&self.distance))
            .then_with(|| other.transitions.cmp(&self.transitions))
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
