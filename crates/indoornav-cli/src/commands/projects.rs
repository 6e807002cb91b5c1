use anyhow::{Context, Result};

use indoornav_cli::output::{render_projects_json, render_projects_text, OutputFormat};
use indoornav_cli::terminal::ColorPalette;
use indoornav_lib::{list_projects, resolve_data_dir};

use super::GlobalOptions;

/// Handle the projects subcommand.
pub fn handle_projects_command(options: &GlobalOptions) -> Result<()> {
    let data_dir = resolve_data_dir(options.data_dir.as_deref())
        .context("failed to resolve the data directory")?;
    let projects = list_projects(&data_dir)
        .with_context(|| format!("failed to list projects in {}", data_dir.display()))?;
    match options.format {
        OutputFormat::Json => println!("{}", render_projects_json(&projects)?),
        OutputFormat::Text => print!(
            "{}",
            render_projects_text(&projects, &ColorPalette::detect())
        ),
    }
    Ok(())
}
