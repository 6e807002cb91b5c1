//! Property tests comparing the router against exhaustive search on small graphs.

mod common;

use std::cmp::Ordering;

use indoornav_lib::{
    Connection, ConnectionType, CostModel, Directionality, Endpoint, NodeId, Policy, Router,
    Settings, SpatialGraph, Travel,
};
use proptest::prelude::*;

use common::MapBuilder;

const CTYPES: [ConnectionType; 5] = ConnectionType::ALL;
const DIRECTIONS: [Directionality; 3] = [
    Directionality::Bidirectional,
    Directionality::UpOnly,
    Directionality::DownOnly,
];
const POLICIES: [Policy; 4] = [Policy::Allow, Policy::Deny, Policy::UpOnly, Policy::DownOnly];

type NodeSpec = (i32, u32, u32);
type EdgeSpec = (usize, usize, usize, usize, bool);

fn scenario() -> impl Strategy<Value = (Vec<NodeSpec>, Vec<EdgeSpec>, [usize; 4])> {
    (2usize..7).prop_flat_map(|n| {
        let nodes = prop::collection::vec((0i32..3, 0u32..10, 0u32..10), n);
        let edges = prop::collection::vec((0..n, 0..n, 0..5usize, 0..3usize, any::<bool>()), 0..14);
        let policies = prop::array::uniform4(0..4usize);
        (nodes, edges, policies)
    })
}

fn build(nodes: &[NodeSpec], edges: &[EdgeSpec], policies: [usize; 4]) -> (SpatialGraph, Settings) {
    let mut builder = MapBuilder::new();
    for (id, (level, x, y)) in nodes.iter().enumerate() {
        builder = builder.node(id as NodeId, *level, f64::from(*x) * 100.0, f64::from(*y) * 100.0);
    }
    let mut settings = Settings {
        steps: POLICIES[policies[0]],
        stairs: POLICIES[policies[1]],
        escalators: POLICIES[policies[2]],
        elevators: POLICIES[policies[3]],
        ..Settings::default_settings()
    };
    for (index, (from, to, ctype, direction, excluded)) in edges.iter().enumerate() {
        let id = format!("c{index}");
        if *excluded {
            settings.excluded.insert(id.clone());
        }
        builder = builder.connect_with(
            &id,
            *from as NodeId,
            *to as NodeId,
            CTYPES[*ctype],
            |record| record.direction = DIRECTIONS[*direction],
        );
    }
    (builder.build(), settings)
}

fn travel(graph: &SpatialGraph, connection: &Connection, forward: bool) -> Travel {
    let (from, to) = if forward {
        (connection.from, connection.to)
    } else {
        (connection.to, connection.from)
    };
    let from_level = graph.node(from).expect("node").level;
    let to_level = graph.node(to).expect("node").level;
    match to_level.cmp(&from_level) {
        Ordering::Greater => Travel::Up,
        Ordering::Less => Travel::Down,
        Ordering::Equal if connection.ctype.is_climbing() => {
            if forward {
                Travel::Up
            } else {
                Travel::Down
            }
        }
        Ordering::Equal => Travel::Level,
    }
}

fn strict_cost(
    graph: &SpatialGraph,
    settings: &Settings,
    model: &CostModel,
    connection: &Connection,
    forward: bool,
) -> Option<f64> {
    let travel = travel(graph, connection, forward);
    let physical = match (connection.direction, travel) {
        (Directionality::Bidirectional, _) => true,
        (Directionality::UpOnly, Travel::Level) => forward,
        (Directionality::DownOnly, Travel::Level) => !forward,
        (Directionality::UpOnly, t) => t == Travel::Up,
        (Directionality::DownOnly, t) => t == Travel::Down,
    };
    let policy = settings.policy_for(connection.ctype);
    if !physical
        || !policy.permits_travel(travel)
        || policy == Policy::Deny
        || settings.is_excluded(&connection.id)
    {
        return None;
    }
    Some(model.traversal_cost(connection.ctype, connection.distance))
}

/// Cheapest strict cost over all simple paths, by exhaustive search.
fn brute_force(graph: &SpatialGraph, settings: &Settings, from: NodeId, to: NodeId) -> Option<f64> {
    #[allow(clippy::too_many_arguments)]
    fn walk(
        graph: &SpatialGraph,
        settings: &Settings,
        model: &CostModel,
        current: NodeId,
        target: NodeId,
        visited: &mut Vec<NodeId>,
        cost: f64,
        best: &mut Option<f64>,
    ) {
        if current == target {
            if best.is_none_or(|b| cost < b) {
                *best = Some(cost);
            }
            return;
        }
        for connection in graph.connections_of(current) {
            let forward = connection.from == current;
            let next = if forward { connection.to } else { connection.from };
            if visited.contains(&next) {
                continue;
            }
            let Some(step) = strict_cost(graph, settings, model, connection, forward) else {
                continue;
            };
            visited.push(next);
            walk(graph, settings, model, next, target, visited, cost + step, best);
            visited.pop();
        }
    }

    let model = CostModel::default();
    let mut best = None;
    walk(graph, settings, &model, from, to, &mut vec![from], 0.0, &mut best);
    best
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn router_cost_matches_exhaustive_search((nodes, edges, policies) in scenario()) {
        let (graph, settings) = build(&nodes, &edges, policies);
        let target = (nodes.len() - 1) as NodeId;
        let expected = brute_force(&graph, &settings, 0, target);
        let router = Router::new(&graph, settings);
        let (messages, route) = router.get_route(&Endpoint::Node(0), &Endpoint::Node(target));

        match expected {
            Some(cost) => {
                let route = route.expect("strict route exists");
                prop_assert!(!route.relaxed());
                prop_assert!(messages.is_empty());
                prop_assert!((route.total_cost() - cost).abs() <= 1e-6 * cost.max(1.0));
            }
            None => {
                if let Some(route) = route {
                    prop_assert!(route.relaxed());
                    prop_assert_eq!(messages.len(), 1);
                } else {
                    prop_assert!(messages.iter().any(|m| m.is_error()));
                }
            }
        }
    }

    #[test]
    fn routes_are_deterministic_and_segments_sum((nodes, edges, policies) in scenario()) {
        let (graph, settings) = build(&nodes, &edges, policies);
        let target = (nodes.len() - 1) as NodeId;
        let router = Router::new(&graph, settings);
        let first = router.get_route(&Endpoint::Node(0), &Endpoint::Node(target));
        let second = router.get_route(&Endpoint::Node(0), &Endpoint::Node(target));
        prop_assert_eq!(&first, &second);

        if let Some(route) = first.1 {
            let (segments, relaxed) = route.describe();
            prop_assert_eq!(relaxed, route.relaxed());
            let total: f64 = segments.iter().map(|s| s.distance).sum();
            prop_assert!((total - route.total_distance()).abs() <= 1e-6 * total.max(1.0));
            prop_assert_eq!(route.points().len(), route.legs().len() + 1);
            for pair in segments.windows(2) {
                prop_assert!(pair[0].ctype != pair[1].ctype || pair[0].direction != pair[1].direction);
            }
        }
    }
}
