use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::db::{Level, NodeId, Point};
use crate::error::{Error, Result};

/// Ephemeral point on a level. Never stored in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub level: Level,
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(level: Level, x: f64, y: f64) -> Self {
        Self { level, x, y }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Canonical coordinate name, `<level>:<x>:<y>`.
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.level,
            format_coordinate(self.x),
            format_coordinate(self.y)
        )
    }
}

fn format_coordinate(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

impl FromStr for Position {
    type Err = Error;

    /// Parse `<level>:<x>:<y>`, optionally prefixed with `n` as used by short links.
    fn from_str(value: &str) -> Result<Self> {
        let invalid = || Error::InvalidPosition {
            value: value.to_string(),
        };
        let trimmed = value.trim();
        let body = trimmed.strip_prefix('n').unwrap_or(trimmed);
        let mut parts = body.split(':');
        let (Some(level), Some(x), Some(y), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let level: Level = level.trim().parse().map_err(|_| invalid())?;
        let x: f64 = x.trim().parse().map_err(|_| invalid())?;
        let y: f64 = y.trim().parse().map_err(|_| invalid())?;
        if !x.is_finite() || !y.is_finite() {
            return Err(invalid());
        }
        Ok(Position { level, x, y })
    }
}

/// Temporary attachment from a position to a stored node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapEdge {
    #[serde(skip)]
    pub(crate) node_index: usize,
    pub node: NodeId,
    pub distance: f64,
}

/// A position attached to the graph for the duration of one request.
///
/// The attachment edges live here rather than in the graph, so concurrent
/// requests never observe each other's positions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserPosition {
    position: Position,
    edges: Vec<SnapEdge>,
    title: String,
}

impl UserPosition {
    pub(crate) fn new(position: Position, edges: Vec<SnapEdge>, title: String) -> Self {
        Self {
            position,
            edges,
            title,
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Attachment edges sorted by distance, nearest first.
    pub fn edges(&self) -> &[SnapEdge] {
        &self.edges
    }

    /// `false` when no node was within snapping range; such a position is unroutable.
    pub fn is_connected(&self) -> bool {
        !self.edges.is_empty()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn name(&self) -> String {
        self.position.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_round_trips_through_parse() {
        let position = Position::new(2, 150.0, 42.5);
        assert_eq!(position.name(), "2:150:42.5");
        assert_eq!("2:150:42.5".parse::<Position>().unwrap(), position);
    }

    #[test]
    fn parse_accepts_short_link_prefix_and_negative_level() {
        let position: Position = "n-1:10:20".parse().unwrap();
        assert_eq!(position, Position::new(-1, 10.0, 20.0));
    }

    #[test]
    fn parse_rejects_malformed_names() {
        for value in ["", "1:2", "1:2:3:4", "a:1:2", "0:x:1", "0:inf:1"] {
            assert!(value.parse::<Position>().is_err(), "accepted {value:?}");
        }
    }
}
