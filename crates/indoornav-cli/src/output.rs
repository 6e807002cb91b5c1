//! Output formatting for command results.
//!
//! Every command renders either human-readable text or a JSON document.
//! Renderers return strings so the binary decides where they are written.

use clap::ValueEnum;
use serde::Serialize;

use indoornav_lib::{
    ConnectionType, LocateResult, LocationTarget, Route, RouteLeg, RouteMessage, RoutePoint,
    RouteSegment, SelectableLocation, Severity, SnapEdge, Travel, UserPosition,
};

use crate::terminal::ColorPalette;

/// Output format selected with `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Format centimetres as metres with one decimal.
pub fn format_distance(centimetres: f64) -> String {
    format!("{:.1} m", centimetres / 100.0)
}

/// Format seconds as `12 s` or `3 min 5 s`.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    if total < 60 {
        format!("{total} s")
    } else if total % 60 == 0 {
        format!("{} min", total / 60)
    } else {
        format!("{} min {} s", total / 60, total % 60)
    }
}

fn segment_label(segment: &RouteSegment) -> String {
    match (segment.ctype, segment.direction) {
        (ConnectionType::Plain, _) => "walk".to_string(),
        (ctype, Travel::Level) => ctype.to_string(),
        (ctype, direction) => format!("{ctype} {direction}"),
    }
}

fn message_prefix(severity: Severity, palette: &ColorPalette) -> String {
    match severity {
        Severity::Info => "Note:".to_string(),
        Severity::Warn => format!("{}Warning:{}", palette.warning, palette.reset),
        Severity::Error => format!("{}Error:{}", palette.error, palette.reset),
    }
}

/// Render messages, one per line.
pub fn render_messages_text(messages: &[RouteMessage], palette: &ColorPalette) -> String {
    messages
        .iter()
        .map(|message| format!("{} {}\n", message_prefix(message.severity, palette), message.text))
        .collect()
}

/// Render a route request's outcome as text.
///
/// `avoiding` is the settings' avoid summary and is listed only when a
/// route exists.
pub fn render_route_text(
    route: Option<&Route>,
    messages: &[RouteMessage],
    avoiding: &[String],
    palette: &ColorPalette,
) -> String {
    let mut out = String::new();
    if let Some(route) = route {
        out.push_str(&format!(
            "{}Route: {} -> {}{}\n",
            palette.heading,
            route.origin_title().unwrap_or("start"),
            route.destination_title().unwrap_or("destination"),
            palette.reset
        ));

        let (segments, _) = route.describe();
        if segments.is_empty() {
            out.push_str("  Already at the destination.\n");
        }
        for (index, segment) in segments.iter().enumerate() {
            let color = match segment.direction {
                Travel::Up => palette.up,
                Travel::Down => palette.down,
                Travel::Level => "",
            };
            let levels = if segment.from_level == segment.to_level {
                String::new()
            } else {
                format!(", level {} -> {}", segment.from_level, segment.to_level)
            };
            out.push_str(&format!(
                "  {}. {color}{}{}{levels}, {} {}(about {}){}\n",
                index + 1,
                segment_label(segment),
                palette.reset,
                format_distance(segment.distance),
                palette.muted,
                format_duration(segment.duration),
                palette.reset
            ));
        }

        out.push_str(&format!(
            "Total: {}, about {}\n",
            format_distance(route.total_distance()),
            format_duration(route.total_duration())
        ));
        if !avoiding.is_empty() {
            out.push_str(&format!(
                "{}Avoiding: {}{}\n",
                palette.muted,
                avoiding.join(", "),
                palette.reset
            ));
        }
    }
    out.push_str(&render_messages_text(messages, palette));
    out
}

#[derive(Debug, Serialize)]
struct RouteBody<'a> {
    origin: Option<&'a str>,
    destination: Option<&'a str>,
    relaxed: bool,
    distance: f64,
    duration: f64,
    cost: f64,
    points: &'a [RoutePoint],
    legs: &'a [RouteLeg],
    segments: Vec<RouteSegment>,
}

#[derive(Debug, Serialize)]
struct RouteDocument<'a> {
    messages: &'a [RouteMessage],
    avoiding: &'a [String],
    route: Option<RouteBody<'a>>,
}

/// Render a route request's outcome as a JSON document.
pub fn render_route_json(
    route: Option<&Route>,
    messages: &[RouteMessage],
    avoiding: &[String],
) -> serde_json::Result<String> {
    let route = route.map(|route| RouteBody {
        origin: route.origin_title(),
        destination: route.destination_title(),
        relaxed: route.relaxed(),
        distance: route.total_distance(),
        duration: route.total_duration(),
        cost: route.total_cost(),
        points: route.points(),
        legs: route.legs(),
        segments: route.describe().0,
    });
    serde_json::to_string_pretty(&RouteDocument {
        messages,
        avoiding,
        route,
    })
}

/// Render a location estimate as text. `title` names the area it falls in.
pub fn render_locate_text(
    result: Option<&LocateResult>,
    title: Option<&str>,
    palette: &ColorPalette,
) -> String {
    let Some(result) = result else {
        return "No confident position estimate for these readings.\n".to_string();
    };
    let mut out = format!(
        "{}Position {}{} ({})\n",
        palette.heading, result.position, palette.reset, result.name
    );
    if let Some(title) = title {
        out.push_str(&format!("  Area: {title}\n"));
    }
    out.push_str(&format!(
        "  {}Score {:.2} from {} matched station(s){}\n",
        palette.muted, result.score, result.matched_stations, palette.reset
    ));
    out
}

#[derive(Debug, Serialize)]
struct LocateDocument<'a> {
    located: Option<&'a LocateResult>,
    title: Option<&'a str>,
}

pub fn render_locate_json(
    result: Option<&LocateResult>,
    title: Option<&str>,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&LocateDocument {
        located: result,
        title,
    })
}

/// Render selectable locations as `slug  title` lines.
pub fn render_locations_text(locations: &[&SelectableLocation], locale: &str) -> String {
    let width = locations
        .iter()
        .map(|location| location.slug.len())
        .max()
        .unwrap_or(0);
    locations
        .iter()
        .map(|location| format!("{:<width$}  {}\n", location.slug, location.title(locale)))
        .collect()
}

#[derive(Debug, Serialize)]
struct LocationEntry<'a> {
    slug: &'a str,
    title: &'a str,
    target: &'a LocationTarget,
    priority: i32,
}

pub fn render_locations_json(
    locations: &[&SelectableLocation],
    locale: &str,
) -> serde_json::Result<String> {
    let entries: Vec<LocationEntry<'_>> = locations
        .iter()
        .map(|location| LocationEntry {
            slug: &location.slug,
            title: location.title(locale),
            target: &location.target,
            priority: location.priority,
        })
        .collect();
    serde_json::to_string_pretty(&entries)
}

/// Render a coordinate position and its attachments as text.
pub fn render_position_text(position: &UserPosition, palette: &ColorPalette) -> String {
    let mut out = format!(
        "{}{}{}: {}\n",
        palette.heading,
        position.name(),
        palette.reset,
        position.title()
    );
    if position.is_connected() {
        for edge in position.edges() {
            out.push_str(&format!(
                "  {}node {} at {}{}\n",
                palette.muted,
                edge.node,
                format_distance(edge.distance),
                palette.reset
            ));
        }
    } else {
        out.push_str(&format!(
            "  {}Too far from any walkable path.{}\n",
            palette.warning, palette.reset
        ));
    }
    out
}

#[derive(Debug, Serialize)]
struct PositionDocument<'a> {
    name: String,
    title: &'a str,
    connected: bool,
    edges: &'a [SnapEdge],
}

pub fn render_position_json(position: &UserPosition) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&PositionDocument {
        name: position.name(),
        title: position.title(),
        connected: position.is_connected(),
        edges: position.edges(),
    })
}

/// Render project identifiers, one per line.
pub fn render_projects_text(projects: &[String], palette: &ColorPalette) -> String {
    if projects.is_empty() {
        return format!("{}No projects found.{}\n", palette.muted, palette.reset);
    }
    projects.iter().map(|project| format!("{project}\n")).collect()
}

pub fn render_projects_json(projects: &[String]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(projects)
}
