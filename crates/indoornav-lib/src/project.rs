use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::debug;

use crate::error::{Error, Result};

/// Filename of a project's map database.
pub const MAP_FILENAME: &str = "map.db";

/// Directory below the data directory that holds one folder per project.
const PROJECTS_DIR: &str = "projects";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "INDOORNAV_DATA_DIR";

/// Resolve the default data directory using platform-specific project directories.
pub fn default_data_dir() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("org", "indoornav", "indoornav").ok_or(Error::ProjectDirsUnavailable)?;
    Ok(dirs.data_dir().to_path_buf())
}

/// Resolve the data directory.
///
/// Resolution order:
/// 1. Explicit `target` argument when provided.
/// 2. `INDOORNAV_DATA_DIR` environment variable.
/// 3. Platform-specific project directories.
pub fn resolve_data_dir(target: Option<&Path>) -> Result<PathBuf> {
    if let Some(explicit) = target {
        return Ok(explicit.to_path_buf());
    }

    if let Some(env_path) = env::var_os(DATA_DIR_ENV) {
        if !env_path.is_empty() {
            return Ok(PathBuf::from(env_path));
        }
    }

    default_data_dir()
}

/// Path of `project`'s map database below `data_dir`. Does not check existence.
pub fn project_map_path(data_dir: &Path, project: &str) -> Result<PathBuf> {
    validate_project_name(project)?;
    Ok(data_dir.join(PROJECTS_DIR).join(project).join(MAP_FILENAME))
}

/// Locate an existing project map database.
pub fn resolve_map_path(data_dir: Option<&Path>, project: &str) -> Result<PathBuf> {
    let data_dir = resolve_data_dir(data_dir)?;
    let path = project_map_path(&data_dir, project)?;
    debug!(project, path = %path.display(), "resolved project map");
    if !path.is_file() {
        return Err(Error::ProjectNotFound { path });
    }
    Ok(path)
}

/// Projects below `data_dir` that contain a map database, sorted by name.
pub fn list_projects(data_dir: &Path) -> Result<Vec<String>> {
    let root = data_dir.join(PROJECTS_DIR);
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut projects = Vec::new();
    for entry in fs::read_dir(&root)? {
        let entry = entry?;
        if !entry.path().join(MAP_FILENAME).is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            projects.push(name.to_string());
        }
    }
    projects.sort();
    Ok(projects)
}

fn validate_project_name(project: &str) -> Result<()> {
    let valid = !project.is_empty()
        && project != "."
        && project != ".."
        && project
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidProjectName {
            name: project.to_string(),
        })
    }
}
