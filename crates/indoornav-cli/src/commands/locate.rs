//! Locate command handler for WiFi positioning.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};

use indoornav_cli::output::{render_locate_json, render_locate_text, OutputFormat};
use indoornav_cli::readings::parse_readings_json;
use indoornav_cli::terminal::ColorPalette;
use indoornav_lib::PositionLocator;

use super::GlobalOptions;

fn read_readings(source: &Path) -> Result<HashMap<String, f64>> {
    let text = if source == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read readings from stdin")?;
        text
    } else {
        fs::read_to_string(source)
            .with_context(|| format!("failed to read readings from {}", source.display()))?
    };
    parse_readings_json(&text)
}

/// Handle the locate subcommand.
///
/// Readings come from a JSON file (or stdin) or from repeated `--station`
/// arguments. An unconfident estimate is reported, not treated as failure.
pub fn handle_locate_command(
    options: &GlobalOptions,
    readings_source: Option<&Path>,
    stations: Vec<(String, f64)>,
    min_score: Option<f64>,
) -> Result<()> {
    if options.route_only {
        bail!("positioning is disabled in route-only mode");
    }
    let readings = match readings_source {
        Some(source) => read_readings(source)?,
        None if !stations.is_empty() => stations.into_iter().collect(),
        None => bail!("no readings given; pass --readings or --station"),
    };

    let graph = options.load_graph(true)?;
    let mut locator = PositionLocator::new(&graph).context("positioning is unavailable")?;
    if let Some(min_score) = min_score {
        locator = locator.with_min_score(min_score);
    }

    let result = locator.locate(&readings);
    let title = result
        .as_ref()
        .map(|result| graph.connect_position(result.position).title().to_string());

    match options.format {
        OutputFormat::Json => println!(
            "{}",
            render_locate_json(result.as_ref(), title.as_deref())?
        ),
        OutputFormat::Text => print!(
            "{}",
            render_locate_text(result.as_ref(), title.as_deref(), &ColorPalette::detect())
        ),
    }
    Ok(())
}
