// Handlers for the CLI subcommands. main.rs parses arguments and
// dispatches here; rendering lives in the library's `output` module.

pub mod locate;
pub mod locations;
pub mod position;
pub mod projects;
pub mod route;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

use indoornav_cli::output::OutputFormat;
use indoornav_lib::{resolve_map_path, GraphBuildOptions, SpatialGraph};

/// Options shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub project: Option<String>,
    pub data_dir: Option<PathBuf>,
    /// Skip WiFi data even for commands that could use it.
    pub route_only: bool,
    pub format: OutputFormat,
}

impl GlobalOptions {
    fn project(&self) -> Result<&str> {
        self.project
            .as_deref()
            .ok_or_else(|| anyhow!("no project selected; pass --project or set INDOORNAV_PROJECT"))
    }

    /// Load the selected project's graph. WiFi data is read only when
    /// `with_wifi` is set and route-only mode is off.
    pub fn load_graph(&self, with_wifi: bool) -> Result<SpatialGraph> {
        let project = self.project()?;
        let map_path = resolve_map_path(self.data_dir.as_deref(), project)
            .with_context(|| format!("failed to locate project '{project}'"))?;
        let options = GraphBuildOptions {
            load_wifi: with_wifi && !self.route_only,
            ..GraphBuildOptions::default()
        };
        SpatialGraph::load(&map_path, &options)
            .with_context(|| format!("failed to load map from {}", map_path.display()))
    }
}
