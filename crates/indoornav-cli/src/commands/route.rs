//! Route command handler.

use anyhow::{anyhow, Context, Result};
use serde_json::Value;

use indoornav_cli::output::{render_route_json, render_route_text, OutputFormat};
use indoornav_cli::terminal::ColorPalette;
use indoornav_lib::{Endpoint, Error as LibError, Router, Settings, SettingsField, SpatialGraph};

use super::GlobalOptions;

/// Arguments for the route command.
#[derive(Debug, Clone)]
pub struct RouteCommandArgs {
    pub from: String,
    pub to: String,
    pub steps: Option<String>,
    pub stairs: Option<String>,
    pub escalators: Option<String>,
    pub elevators: Option<String>,
    /// Connection identifiers to avoid.
    pub exclude: Vec<String>,
    /// Stored settings layered beneath the flags.
    pub settings_json: Option<String>,
    pub locale: String,
}

impl RouteCommandArgs {
    fn policy_arg(&self, field: SettingsField) -> Option<&str> {
        match field {
            SettingsField::Steps => self.steps.as_deref(),
            SettingsField::Stairs => self.stairs.as_deref(),
            SettingsField::Escalators => self.escalators.as_deref(),
            SettingsField::Elevators => self.elevators.as_deref(),
            SettingsField::Excluded => None,
        }
    }

    /// Resolve settings the way a request would: flags over stored settings
    /// over defaults. Invalid policy flags are rejected.
    pub fn to_settings(&self) -> Result<Settings> {
        let stored: Option<Value> = self
            .settings_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .context("--settings-json is not valid JSON")?;

        let mut params: Vec<(&str, &str)> = Vec::new();
        for field in SettingsField::ALL {
            if let Some(value) = self.policy_arg(field) {
                Settings::parse_policy(field, value)?;
                params.push((field.name(), value));
            }
        }
        params.extend(
            self.exclude
                .iter()
                .map(|id| (SettingsField::Excluded.name(), id.as_str())),
        );

        Ok(Settings::from_form(&params, stored.as_ref()))
    }
}

fn resolve_endpoint(graph: &SpatialGraph, name: &str) -> Result<Endpoint> {
    if let Some(endpoint) = graph.resolve_location(name) {
        return Ok(endpoint);
    }
    Err(LibError::UnknownLocation {
        name: name.to_string(),
        suggestions: graph.fuzzy_location_matches(name, 3),
    }
    .into())
}

/// Handle the route subcommand.
///
/// Prints the route and any messages. Fails when no route exists.
pub fn handle_route_command(options: &GlobalOptions, args: &RouteCommandArgs) -> Result<()> {
    let settings = args.to_settings()?;
    let graph = options.load_graph(false)?;
    let origin = resolve_endpoint(&graph, &args.from)?;
    let destination = resolve_endpoint(&graph, &args.to)?;

    let avoiding = settings.avoid_summary(&graph, &args.locale);
    let router = Router::new(&graph, settings);
    let (messages, route) = router.get_route(&origin, &destination);

    match options.format {
        OutputFormat::Json => {
            println!("{}", render_route_json(route.as_ref(), &messages, &avoiding)?);
        }
        OutputFormat::Text => {
            let palette = ColorPalette::detect();
            if route.is_some() {
                print!(
                    "{}",
                    render_route_text(route.as_ref(), &messages, &avoiding, &palette)
                );
            }
        }
    }

    if route.is_none() {
        let reason = messages
            .iter()
            .find(|message| message.is_error())
            .map(|message| message.text.clone())
            .unwrap_or_else(|| format!("no route from {} to {}", args.from, args.to));
        return Err(anyhow!(reason));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoornav_lib::Policy;

    fn args() -> RouteCommandArgs {
        RouteCommandArgs {
            from: "lobby".into(),
            to: "library".into(),
            steps: None,
            stairs: None,
            escalators: None,
            elevators: None,
            exclude: Vec::new(),
            settings_json: None,
            locale: "en".into(),
        }
    }

    #[test]
    fn flags_override_stored_settings() {
        let args = RouteCommandArgs {
            stairs: Some("no".into()),
            settings_json: Some(r#"{"stairs": "up", "elevators": "down", "e": ["old"]}"#.into()),
            exclude: vec!["lift".into()],
            ..args()
        };
        let settings = args.to_settings().unwrap();
        assert_eq!(settings.stairs, Policy::Deny);
        assert_eq!(settings.elevators, Policy::DownOnly);
        assert!(settings.is_excluded("lift"));
        assert!(!settings.is_excluded("old"));
    }

    #[test]
    fn invalid_policy_flags_are_errors() {
        let args = RouteCommandArgs {
            escalators: Some("sideways".into()),
            ..args()
        };
        let error = args.to_settings().unwrap_err();
        assert!(error.to_string().contains("sideways"));
    }

    #[test]
    fn invalid_settings_json_is_an_error() {
        let args = RouteCommandArgs {
            settings_json: Some("{".into()),
            ..args()
        };
        assert!(args.to_settings().is_err());
    }
}
