use anyhow::Result;

use indoornav_cli::output::{render_locations_json, render_locations_text, OutputFormat};

use super::GlobalOptions;

/// Handle the locations subcommand.
pub fn handle_locations_command(options: &GlobalOptions, locale: &str) -> Result<()> {
    let graph = options.load_graph(false)?;
    let locations = graph.selectable_locations(locale);
    match options.format {
        OutputFormat::Json => println!("{}", render_locations_json(&locations, locale)?),
        OutputFormat::Text => print!("{}", render_locations_text(&locations, locale)),
    }
    Ok(())
}
