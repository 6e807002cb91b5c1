mod common;

use indoornav_lib::{
    ConnectionType, CostModel, Endpoint, Policy, Position, Route, RouteMessage, RoutePoint,
    Router, Settings, Severity, Travel,
};

use common::{campus_graph, MapBuilder};

fn room(id: &str) -> Endpoint {
    Endpoint::Room(id.to_string())
}

fn connection_ids(route: &Route) -> Vec<&str> {
    route
        .legs()
        .iter()
        .filter_map(|leg| leg.connection.as_deref())
        .collect()
}

fn settings(params: &[(&str, &str)]) -> Settings {
    Settings::from_form(params, None)
}

#[test]
fn default_route_takes_the_escalator_up() {
    let graph = campus_graph();
    let router = Router::new(&graph, Settings::default_settings());
    let (messages, route) = router.get_route(&room("lobby"), &room("library"));
    let route = route.expect("route exists");

    assert!(messages.is_empty());
    assert!(!route.relaxed());
    assert_eq!(connection_ids(&route), vec!["hall-0a", "escalator-up", "hall-1b"]);
    assert!((route.total_distance() - 2400.0).abs() < 1e-9);
    assert_eq!(route.origin_title(), Some("Lobby"));
    assert_eq!(route.destination_title(), Some("Library"));
}

#[test]
fn up_only_escalator_is_never_walked_down() {
    let graph = campus_graph();
    let router = Router::new(&graph, Settings::default_settings());
    let (_, route) = router.get_route(&room("library"), &room("lobby"));
    let route = route.expect("route exists");
    assert_eq!(connection_ids(&route), vec!["hall-1b", "hall-1a", "stairs-west"]);
    assert_eq!(route.legs()[2].travel, Travel::Down);
}

#[test]
fn down_only_escalator_policy_forces_the_stairs() {
    let graph = campus_graph();
    let router = Router::new(&graph, settings(&[("escalators", "down")]));
    let (messages, route) = router.get_route(&room("lobby"), &room("library"));
    let route = route.expect("route exists");
    assert!(messages.is_empty());
    assert_eq!(connection_ids(&route), vec!["stairs-west", "hall-1a", "hall-1b"]);
}

#[test]
fn denied_stairs_and_escalators_use_the_elevator() {
    let graph = campus_graph();
    let router = Router::new(&graph, settings(&[("stairs", "no"), ("escalators", "no")]));
    let (messages, route) = router.get_route(&room("lobby"), &room("library"));
    let route = route.expect("route exists");
    assert!(messages.is_empty());
    assert!(!route.relaxed());
    assert_eq!(connection_ids(&route), vec!["hall-0a", "hall-0b", "lift"]);

    let (segments, relaxed) = route.describe();
    assert!(!relaxed);
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].ctype, ConnectionType::Plain);
    assert!((segments[0].distance - 2000.0).abs() < 1e-9);
    assert_eq!(segments[1].ctype, ConnectionType::Elevator);
    assert_eq!(segments[1].direction, Travel::Up);
    assert_eq!((segments[1].from_level, segments[1].to_level), (0, 1));
}

#[test]
fn denying_every_connector_relaxes_with_a_warning() {
    let graph = campus_graph();
    let router = Router::new(
        &graph,
        settings(&[("stairs", "no"), ("escalators", "no"), ("elevators", "no")]),
    );
    let (messages, route) = router.get_route(&room("lobby"), &room("library"));
    let route = route.expect("relaxed route exists");

    assert!(route.relaxed());
    assert!(route.describe().1);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].severity, Severity::Warn);
    // cheapest penalised connector is the escalator
    assert_eq!(route.avoided_connections(), vec!["escalator-up"]);
}

#[test]
fn hard_direction_policies_survive_relaxation() {
    let graph = campus_graph();
    let router = Router::new(
        &graph,
        settings(&[("stairs", "no"), ("elevators", "no"), ("escalators", "down")]),
    );
    let (messages, route) = router.get_route(&room("lobby"), &room("library"));
    let route = route.expect("relaxed route exists");
    assert!(route.relaxed());
    assert_eq!(messages.len(), 1);
    assert!(!connection_ids(&route).contains(&"escalator-up"));
    assert_eq!(route.avoided_connections(), vec!["stairs-west"]);
}

#[test]
fn excluded_connections_are_avoided() {
    let graph = campus_graph();
    let router = Router::new(&graph, settings(&[("e", "escalator-up")]));
    let (messages, route) = router.get_route(&room("lobby"), &room("library"));
    let route = route.expect("route exists");
    assert!(messages.is_empty());
    assert_eq!(connection_ids(&route), vec!["stairs-west", "hall-1a", "hall-1b"]);
}

#[test]
fn elevator_only_building_relaxes_when_elevators_are_denied() {
    let graph = MapBuilder::new()
        .node(1, 0, 0.0, 0.0)
        .node(2, 3, 0.0, 0.0)
        .connect("lift", 1, 2, ConnectionType::Elevator)
        .build();
    let router = Router::new(&graph, settings(&[("elevators", "no")]));
    let (messages, route) = router.get_route(&Endpoint::Node(1), &Endpoint::Node(2));

    let route = route.expect("relaxed route exists");
    let (segments, had_avoided) = route.describe();
    assert!(had_avoided);
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].ctype, ConnectionType::Elevator);
    assert_eq!(
        messages,
        vec![RouteMessage::warn(
            indoornav_lib::routing::RELAXED_ROUTE_WARNING
        )]
    );
}

#[test]
fn disconnected_nodes_report_no_route() {
    let graph = MapBuilder::new()
        .node(1, 0, 0.0, 0.0)
        .node(2, 0, 5000.0, 0.0)
        .build();
    let router = Router::new(&graph, Settings::default_settings());
    let (messages, route) = router.get_route(&Endpoint::Node(1), &Endpoint::Node(2));
    assert!(route.is_none());
    assert_eq!(messages.len(), 1);
    assert!(messages[0].is_error());
}

#[test]
fn unroutable_positions_report_an_error() {
    let graph = campus_graph();
    let router = Router::new(&graph, Settings::default_settings());
    let far = graph.connect_position(Position::new(0, 9000.0, 9000.0));
    let (messages, route) = router.get_route(&Endpoint::Position(far), &room("library"));
    assert!(route.is_none());
    assert!(messages[0].text.contains("0:9000:9000"));
}

#[test]
fn positions_route_through_attachment_legs() {
    let graph = campus_graph();
    let router = Router::new(&graph, Settings::default_settings());
    let origin = graph.connect_position(Position::new(0, 100.0, 0.0));
    let destination = graph.connect_position(Position::new(1, 1900.0, 0.0));
    let (_, route) = router.get_route(&Endpoint::Position(origin), &Endpoint::Position(destination));
    let route = route.expect("route exists");

    assert!(matches!(route.points().first(), Some(RoutePoint::Position { .. })));
    assert!(matches!(route.points().last(), Some(RoutePoint::Position { .. })));
    assert_eq!(route.legs().first().and_then(|l| l.connection.clone()), None);
    assert_eq!(route.origin_title(), Some("Lobby"));
    assert_eq!(route.destination_title(), Some("Library"));
    // 900 to the cafe node, 400 up the escalator, 900 to the end
    assert!((route.total_distance() - 2200.0).abs() < 1e-9);
    assert_eq!(connection_ids(&route), vec!["escalator-up"]);
}

#[test]
fn identical_positions_give_a_zero_length_route() {
    let graph = campus_graph();
    let router = Router::new(&graph, Settings::default_settings());
    let here = graph.connect_position(Position::new(0, 500.0, 0.0));
    let (messages, route) =
        router.get_route(&Endpoint::Position(here.clone()), &Endpoint::Position(here));
    let route = route.expect("route exists");
    assert!(messages.is_empty());
    assert_eq!(route.points().len(), 1);
    assert_eq!(route.total_distance(), 0.0);
    assert!(route.describe().0.is_empty());
}

#[test]
fn node_inside_the_destination_room_is_a_zero_length_route() {
    let graph = campus_graph();
    let router = Router::new(&graph, Settings::default_settings());
    let (_, route) = router.get_route(&Endpoint::Node(1), &room("lobby"));
    let route = route.expect("route exists");
    assert_eq!(route.legs().len(), 0);
    assert_eq!(route.total_cost(), 0.0);
}

#[test]
fn segment_distances_sum_to_route_distance() {
    let graph = campus_graph();
    let router = Router::new(&graph, settings(&[("escalators", "no")]));
    let origin = graph.connect_position(Position::new(0, 1500.0, 0.0));
    let (_, route) = router.get_route(&Endpoint::Position(origin), &room("library"));
    let route = route.expect("route exists");
    let (segments, _) = route.describe();
    let sum: f64 = segments.iter().map(|segment| segment.distance).sum();
    assert!((sum - route.total_distance()).abs() < 1e-6);
    let durations: f64 = segments.iter().map(|segment| segment.duration).sum();
    assert!((durations - route.total_duration()).abs() < 1e-9);
}

#[test]
fn repeated_requests_are_deterministic() {
    let graph = campus_graph();
    let router = Router::new(&graph, Settings::default_settings());
    let first = router.get_route(&room("cafe"), &room("library"));
    for _ in 0..10 {
        assert_eq!(router.get_route(&room("cafe"), &room("library")), first);
    }
}

#[test]
fn equal_cost_alternatives_prefer_fewer_type_changes() {
    // Two equally expensive paths from 1 to 4: via 2 it switches to steps,
    // via 3 it stays plain.
    let distance = |r: &mut indoornav_lib::db::ConnectionRecord| r.distance = Some(100.0);
    let graph = MapBuilder::new()
        .node(1, 0, 0.0, 0.0)
        .node(2, 0, 100.0, 100.0)
        .node(3, 0, 100.0, -100.0)
        .node(4, 0, 200.0, 0.0)
        .connect_with("plain-a", 1, 2, ConnectionType::Plain, distance)
        .connect_with("steps-b", 2, 4, ConnectionType::Steps, distance)
        .connect_with("plain-c", 1, 3, ConnectionType::Plain, distance)
        .connect_with("plain-d", 3, 4, ConnectionType::Plain, distance)
        .build();
    let mut model = CostModel::default();
    model.steps = model.plain;
    let router = Router::with_cost_model(&graph, Settings::default_settings(), model);
    let (_, route) = router.get_route(&Endpoint::Node(1), &Endpoint::Node(4));
    let route = route.expect("route exists");
    assert_eq!(connection_ids(&route), vec!["plain-c", "plain-d"]);
    assert_eq!(route.describe().0.len(), 1);
}

#[test]
fn custom_cost_model_changes_the_choice() {
    let graph = campus_graph();
    let mut model = CostModel::default();
    model.escalator.fixed_wait = 120.0;
    let router = Router::with_cost_model(&graph, Settings::default_settings(), model);
    let (_, route) = router.get_route(&room("lobby"), &room("library"));
    let route = route.expect("route exists");
    assert_eq!(connection_ids(&route), vec!["stairs-west", "hall-1a", "hall-1b"]);
}

#[test]
fn up_only_steps_follow_their_stored_orientation() {
    let graph = MapBuilder::new()
        .node(1, 0, 0.0, 0.0)
        .node(2, 0, 300.0, 0.0)
        .connect("ramp", 2, 1, ConnectionType::Steps)
        .build();
    // steps are stored lower end first: 2 is the bottom, so 1 -> 2 walks down
    let settings = Settings {
        steps: Policy::UpOnly,
        ..Settings::default_settings()
    };
    let router = Router::new(&graph, settings);
    let (_, down) = router.get_route(&Endpoint::Node(1), &Endpoint::Node(2));
    assert!(down.is_none());
    let (_, up) = router.get_route(&Endpoint::Node(2), &Endpoint::Node(1));
    assert_eq!(up.expect("route exists").legs()[0].travel, Travel::Up);
}
