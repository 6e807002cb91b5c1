//! Parsing of WiFi signal readings supplied on the command line.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use serde_json::Value;

/// Parse a `STATION=DBM` argument.
///
/// Station identifiers contain colons, so the value is split at the last `=`.
pub fn parse_station_arg(value: &str) -> std::result::Result<(String, f64), String> {
    let (station, rssi) = value
        .rsplit_once('=')
        .ok_or_else(|| format!("expected STATION=DBM, got '{value}'"))?;
    let station = station.trim();
    if station.is_empty() {
        return Err(format!("missing station identifier in '{value}'"));
    }
    let rssi: f64 = rssi
        .trim()
        .parse()
        .map_err(|_| format!("invalid signal strength in '{value}'"))?;
    if !rssi.is_finite() {
        return Err(format!("invalid signal strength in '{value}'"));
    }
    Ok((station.to_string(), rssi))
}

/// Parse a JSON object mapping station identifiers to signal strengths in dBm.
pub fn parse_readings_json(text: &str) -> Result<HashMap<String, f64>> {
    let value: Value = serde_json::from_str(text).context("readings are not valid JSON")?;
    let Some(object) = value.as_object() else {
        bail!("readings must be a JSON object of station to dBm");
    };

    let mut readings = HashMap::with_capacity(object.len());
    for (station, rssi) in object {
        let Some(rssi) = rssi.as_f64().filter(|rssi| rssi.is_finite()) else {
            bail!("reading for station '{station}' is not a number");
        };
        readings.insert(station.clone(), rssi);
    }
    Ok(readings)
}
