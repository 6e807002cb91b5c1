//! Per-request routing settings.
//!
//! The schema is fixed: four connection-type policies and one set of
//! excluded connection identifiers. Every field has a declared kind, and
//! input from forms or stored JSON is applied field by field so a single bad
//! value only falls back to that field's previous value.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::db::ConnectionType;
use crate::error::{Error, Result};
use crate::graph::{SpatialGraph, Travel};

/// How a connection type may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Policy {
    #[default]
    #[serde(rename = "yes")]
    Allow,
    #[serde(rename = "no")]
    Deny,
    #[serde(rename = "up")]
    UpOnly,
    #[serde(rename = "down")]
    DownOnly,
}

impl Policy {
    /// Wire code used in forms and stored settings.
    pub fn code(self) -> &'static str {
        match self {
            Policy::Allow => "yes",
            Policy::Deny => "no",
            Policy::UpOnly => "up",
            Policy::DownOnly => "down",
        }
    }

    /// Whether the policy lets a traversal in direction `travel` through.
    /// `Deny` is handled by the router, which may relax it.
    pub fn permits_travel(self, travel: Travel) -> bool {
        match (self, travel) {
            (Policy::Allow | Policy::Deny, _) => true,
            (Policy::UpOnly, Travel::Down) => false,
            (Policy::DownOnly, Travel::Up) => false,
            (Policy::UpOnly | Policy::DownOnly, _) => true,
        }
    }

    /// Arrow naming what is avoided: both directions, or the disallowed one.
    fn avoid_marker(self) -> Option<&'static str> {
        match self {
            Policy::Allow => None,
            Policy::Deny => Some("↕"),
            Policy::UpOnly => Some("↓"),
            Policy::DownOnly => Some("↑"),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Policy {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yes" | "allow" => Ok(Policy::Allow),
            "no" | "deny" => Ok(Policy::Deny),
            "up" | "up-only" | "up_only" => Ok(Policy::UpOnly),
            "down" | "down-only" | "down_only" => Ok(Policy::DownOnly),
            _ => Err(Error::InvalidPolicy {
                field: String::new(),
                value: value.to_string(),
            }),
        }
    }
}

/// Declared kind of a settings field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Policy,
    IdSet,
}

/// Every field of the settings schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsField {
    Steps,
    Stairs,
    Escalators,
    Elevators,
    Excluded,
}

impl SettingsField {
    pub const ALL: [SettingsField; 5] = [
        SettingsField::Steps,
        SettingsField::Stairs,
        SettingsField::Escalators,
        SettingsField::Elevators,
        SettingsField::Excluded,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SettingsField::Steps => "steps",
            SettingsField::Stairs => "stairs",
            SettingsField::Escalators => "escalators",
            SettingsField::Elevators => "elevators",
            SettingsField::Excluded => "e",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            SettingsField::Excluded => FieldKind::IdSet,
            _ => FieldKind::Policy,
        }
    }

    /// Connection type governed by a policy field.
    pub fn ctype(self) -> Option<ConnectionType> {
        match self {
            SettingsField::Steps => Some(ConnectionType::Steps),
            SettingsField::Stairs => Some(ConnectionType::Stairs),
            SettingsField::Escalators => Some(ConnectionType::Escalator),
            SettingsField::Elevators => Some(ConnectionType::Elevator),
            SettingsField::Excluded => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }
}

/// Routing settings for one request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub steps: Policy,
    #[serde(default)]
    pub stairs: Policy,
    #[serde(default)]
    pub escalators: Policy,
    #[serde(default)]
    pub elevators: Policy,
    /// Connection identifiers that must not be used.
    #[serde(rename = "e", default)]
    pub excluded: BTreeSet<String>,
}

impl Settings {
    /// Defaults of the fixed schema: everything allowed, nothing excluded.
    pub fn default_settings() -> Self {
        Self::default()
    }

    /// Policy applying to connections of `ctype`. Plain connections are always allowed.
    pub fn policy_for(&self, ctype: ConnectionType) -> Policy {
        match ctype {
            ConnectionType::Plain => Policy::Allow,
            ConnectionType::Steps => self.steps,
            ConnectionType::Stairs => self.stairs,
            ConnectionType::Escalator => self.escalators,
            ConnectionType::Elevator => self.elevators,
        }
    }

    /// Policy stored in a policy field; `None` for the id-set field.
    pub fn policy(&self, field: SettingsField) -> Option<Policy> {
        field.ctype().map(|ctype| self.policy_for(ctype))
    }

    /// Set a policy field. Setting the id-set field is a no-op returning `false`.
    pub fn set_policy(&mut self, field: SettingsField, policy: Policy) -> bool {
        let slot = match field {
            SettingsField::Steps => &mut self.steps,
            SettingsField::Stairs => &mut self.stairs,
            SettingsField::Escalators => &mut self.escalators,
            SettingsField::Elevators => &mut self.elevators,
            SettingsField::Excluded => return false,
        };
        *slot = policy;
        true
    }

    pub fn is_excluded(&self, connection_id: &str) -> bool {
        self.excluded.contains(connection_id)
    }

    /// `true` when nothing is avoided or excluded.
    pub fn is_unconstrained(&self) -> bool {
        self.excluded.is_empty()
            && SettingsField::ALL
                .into_iter()
                .filter_map(|field| self.policy(field))
                .all(|policy| policy == Policy::Allow)
    }

    /// Parse stored settings leniently, defaulting each bad field.
    pub fn from_json(value: &Value) -> Self {
        let mut settings = Self::default();
        settings.apply_json(value);
        settings
    }

    /// Overlay fields from a stored JSON object. Values of the wrong kind are ignored.
    pub fn apply_json(&mut self, value: &Value) {
        let Some(object) = value.as_object() else {
            debug!("ignoring stored settings that are not an object");
            return;
        };

        for field in SettingsField::ALL {
            let Some(raw) = object.get(field.name()) else {
                continue;
            };
            match field.kind() {
                FieldKind::Policy => match raw.as_str().map(str::parse::<Policy>) {
                    Some(Ok(policy)) => {
                        self.set_policy(field, policy);
                    }
                    _ => debug!(field = field.name(), value = %raw, "ignoring invalid policy"),
                },
                FieldKind::IdSet => match raw.as_array() {
                    Some(items) => {
                        self.excluded = items
                            .iter()
                            .filter_map(Value::as_str)
                            .filter(|id| !id.is_empty())
                            .map(str::to_string)
                            .collect();
                    }
                    None => debug!(field = field.name(), value = %raw, "ignoring invalid id list"),
                },
            }
        }
    }

    /// Resolve settings from request parameters layered over stored settings.
    ///
    /// Request values win over stored ones, which win over defaults. The
    /// id-set field takes every repeated `e` parameter; `force-e` replaces it
    /// even when no `e` parameter is present, so a request can clear it.
    pub fn from_form<K, V>(params: &[(K, V)], stored: Option<&Value>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = stored.map(Self::from_json).unwrap_or_default();

        for field in SettingsField::ALL {
            let values: Vec<&str> = params
                .iter()
                .filter(|(key, _)| key.as_ref() == field.name())
                .map(|(_, value)| value.as_ref())
                .collect();

            match field.kind() {
                FieldKind::Policy => {
                    let Some(raw) = values.last() else {
                        continue;
                    };
                    match raw.parse::<Policy>() {
                        Ok(policy) => {
                            settings.set_policy(field, policy);
                        }
                        Err(_) => debug!(field = field.name(), value = %raw, "ignoring invalid policy"),
                    }
                }
                FieldKind::IdSet => {
                    let forced_key = format!("force-{}", field.name());
                    let forced = params.iter().any(|(key, _)| key.as_ref() == forced_key);
                    if !values.is_empty() || forced {
                        settings.excluded = values
                            .into_iter()
                            .filter(|id| !id.is_empty())
                            .map(str::to_string)
                            .collect();
                    }
                }
            }
        }

        settings
    }

    /// Parse a single policy value for `field`, reporting the field on failure.
    pub fn parse_policy(field: SettingsField, value: &str) -> Result<Policy> {
        value.parse().map_err(|_| Error::InvalidPolicy {
            field: field.name().to_string(),
            value: value.to_string(),
        })
    }

    /// Serialise for persisting between requests.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "steps": self.steps.code(),
            "stairs": self.stairs.code(),
            "escalators": self.escalators.code(),
            "elevators": self.elevators.code(),
            "e": self.excluded.iter().collect::<Vec<_>>(),
        })
    }

    /// Human-readable list of what these settings avoid.
    ///
    /// Policy fields render as the field name plus an arrow; excluded
    /// connections render with their localised title.
    pub fn avoid_summary(&self, graph: &SpatialGraph, locale: &str) -> Vec<String> {
        let mut avoided: Vec<String> = SettingsField::ALL
            .into_iter()
            .filter_map(|field| {
                let marker = self.policy(field)?.avoid_marker()?;
                Some(format!("{}{}", field.name(), marker))
            })
            .collect();
        avoided.extend(self.excluded.iter().map(|id| graph.title_for(id, locale)));
        avoided
    }
}
