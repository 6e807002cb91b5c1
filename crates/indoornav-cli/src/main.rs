use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use indoornav_cli::output::OutputFormat;
use indoornav_cli::readings::parse_station_arg;

mod commands;

use commands::GlobalOptions;

/// Environment variable naming the project when `--project` is absent.
const PROJECT_ENV: &str = "INDOORNAV_PROJECT";
/// Environment variable that disables WiFi positioning when set to a truthy value.
const ROUTE_ONLY_ENV: &str = "INDOORNAV_ROUTE_ONLY";

#[derive(Parser, Debug)]
#[command(author, version, about = "Indoor routing and WiFi positioning")]
struct Cli {
    /// Project whose map is used.
    #[arg(long, global = true)]
    project: Option<String>,

    /// Override the data directory containing `projects/<id>/map.db`.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Skip loading WiFi fingerprints.
    #[arg(long, global = true)]
    no_wifi: bool,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute a route between two locations or coordinate positions.
    Route {
        /// Origin slug or `<level>:<x>:<y>` position.
        #[arg(long = "from")]
        from: String,
        /// Destination slug or `<level>:<x>:<y>` position.
        #[arg(long = "to")]
        to: String,
        /// Policy for steps: yes, no, up or down.
        #[arg(long)]
        steps: Option<String>,
        /// Policy for stairs: yes, no, up or down.
        #[arg(long)]
        stairs: Option<String>,
        /// Policy for escalators: yes, no, up or down.
        #[arg(long)]
        escalators: Option<String>,
        /// Policy for elevators: yes, no, up or down.
        #[arg(long)]
        elevators: Option<String>,
        /// Connection identifier to avoid. May be repeated.
        #[arg(long = "exclude")]
        exclude: Vec<String>,
        /// Stored settings object that the flags above override.
        #[arg(long = "settings-json")]
        settings_json: Option<String>,
        /// Locale for titles in the avoid summary.
        #[arg(long, default_value = "en")]
        locale: String,
    },
    /// Estimate a position from WiFi signal strengths.
    Locate {
        /// JSON object of station to dBm, read from a file or `-` for stdin.
        #[arg(long, conflicts_with = "station")]
        readings: Option<PathBuf>,
        /// Single reading as `STATION=DBM`. May be repeated.
        #[arg(long = "station", value_parser = parse_station_arg)]
        station: Vec<(String, f64)>,
        /// Minimum similarity score for an estimate.
        #[arg(long)]
        min_score: Option<f64>,
    },
    /// List selectable locations, highest priority first.
    Locations {
        /// Locale for titles.
        #[arg(long, default_value = "en")]
        locale: String,
    },
    /// Describe a coordinate position and the nodes it attaches to.
    Position {
        /// Position as `<level>:<x>:<y>`.
        name: String,
    },
    /// List projects in the data directory.
    Projects,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let options = GlobalOptions {
        project: cli.project.or_else(project_from_env),
        data_dir: cli.data_dir,
        route_only: cli.no_wifi || route_only_from_env(),
        format: cli.format,
    };

    match cli.command {
        Command::Route {
            from,
            to,
            steps,
            stairs,
            escalators,
            elevators,
            exclude,
            settings_json,
            locale,
        } => commands::route::handle_route_command(
            &options,
            &commands::route::RouteCommandArgs {
                from,
                to,
                steps,
                stairs,
                escalators,
                elevators,
                exclude,
                settings_json,
                locale,
            },
        ),
        Command::Locate {
            readings,
            station,
            min_score,
        } => commands::locate::handle_locate_command(
            &options,
            readings.as_deref(),
            station,
            min_score,
        ),
        Command::Locations { locale } => {
            commands::locations::handle_locations_command(&options, &locale)
        }
        Command::Position { name } => commands::position::handle_position_command(&options, &name),
        Command::Projects => commands::projects::handle_projects_command(&options),
    }
}

fn project_from_env() -> Option<String> {
    std::env::var(PROJECT_ENV)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn route_only_from_env() -> bool {
    std::env::var(ROUTE_ONLY_ENV)
        .map(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(false)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
