use std::path::PathBuf;

use thiserror::Error;

use crate::db::NodeId;

/// Convenient result alias for the indoornav library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Project map database could not be located at the resolved path.
    #[error("project map not found at {path}")]
    ProjectNotFound { path: PathBuf },

    /// No suitable project directories could be resolved for this platform.
    #[error("failed to resolve project directories for map data")]
    ProjectDirsUnavailable,

    /// Raised when a project identifier is empty or would escape the data directory.
    #[error("invalid project name: {name}")]
    InvalidProjectName { name: String },

    /// Raised when attempting to load a map database with an unknown layout.
    #[error("unsupported map schema; expected Nodes/Connections/Rooms/RoomNodes/Locations tables")]
    UnsupportedSchema,

    /// Raised when two nodes share the same identifier.
    #[error("duplicate node id {id}")]
    DuplicateNode { id: NodeId },

    /// Raised when two rooms share the same identifier.
    #[error("duplicate room id {id}")]
    DuplicateRoom { id: String },

    /// Raised when two selectable locations share the same slug.
    #[error("duplicate selectable location slug: {slug}")]
    DuplicateLocation { slug: String },

    /// Raised when a room or location references a node that does not exist.
    #[error("unknown node id {id} referenced by {referenced_by}")]
    UnknownNode { id: NodeId, referenced_by: String },

    /// Raised when a selectable location references a room that does not exist.
    #[error("unknown room {room} referenced by location {slug}")]
    UnknownRoom { room: String, slug: String },

    /// Raised when a connection type string is not recognised.
    #[error("invalid connection type: {value}")]
    InvalidConnectionType { value: String },

    /// Raised when a connection directionality string is not recognised.
    #[error("invalid connection direction: {value}")]
    InvalidDirectionality { value: String },

    /// Raised when a routing policy string is not recognised.
    #[error("invalid policy for {field}: {value} (expected yes, no, up or down)")]
    InvalidPolicy { field: String, value: String },

    /// Raised when a coordinate name cannot be parsed as `<level>:<x>:<y>`.
    #[error("invalid position: {value}")]
    InvalidPosition { value: String },

    /// Raised when positioning is requested but the fingerprint database was not loaded.
    #[error("wifi positioning is not available for this project")]
    WifiUnavailable,

    /// Raised when a location name could not be resolved.
    #[error("unknown location: {name}{}", format_suggestions(.suggestions))]
    UnknownLocation {
        name: String,
        suggestions: Vec<String>,
    },

    /// Wrapper for SQLite errors.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for JSON errors (room outlines, stored settings).
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else if suggestions.len() == 1 {
        format!(". Did you mean '{}'?", suggestions[0])
    } else {
        format!(
            ". Did you mean one of: {}?",
            suggestions
                .iter()
                .map(|s| format!("'{}'", s))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}
