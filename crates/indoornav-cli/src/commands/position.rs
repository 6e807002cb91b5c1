use anyhow::Result;

use indoornav_cli::output::{render_position_json, render_position_text, OutputFormat};
use indoornav_cli::terminal::ColorPalette;
use indoornav_lib::Position;

use super::GlobalOptions;

/// Handle the position subcommand.
///
/// Snaps the coordinate to the graph and prints its title and attachments.
pub fn handle_position_command(options: &GlobalOptions, name: &str) -> Result<()> {
    let position: Position = name.parse()?;
    let graph = options.load_graph(false)?;
    let attached = graph.connect_position(position);
    match options.format {
        OutputFormat::Json => println!("{}", render_position_json(&attached)?),
        OutputFormat::Text => print!(
            "{}",
            render_position_text(&attached, &ColorPalette::detect())
        ),
    }
    Ok(())
}
