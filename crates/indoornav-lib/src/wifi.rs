//! WiFi fingerprint positioning.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use tracing::{debug, warn};

use crate::db::{Level, Point};
use crate::error::Result;
use crate::graph::SpatialGraph;
use crate::position::Position;

/// Signal differences at or above this many dB count as no agreement.
const MAX_SIGNAL_DIFFERENCE: f64 = 30.0;

/// Default minimum score for a confident estimate.
pub const DEFAULT_MIN_SCORE: f64 = 0.3;

/// Access point known to the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WifiStation {
    /// BSSID. Compared case-insensitively.
    pub id: String,
    pub level: Level,
    /// Approximate mounting position, when surveyed.
    pub position: Option<Point>,
    pub ssid: Option<String>,
}

/// Surveyed point with the expected signal strength (dBm) per station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferencePoint {
    pub name: String,
    pub level: Level,
    pub point: Point,
    pub fingerprint: BTreeMap<String, f64>,
}

/// Stations and reference points, indexed for lookup by station and level.
#[derive(Debug, Clone, Default)]
pub struct FingerprintIndex {
    stations: HashMap<(String, Level), WifiStation>,
    station_levels: HashMap<String, BTreeSet<Level>>,
    points: BTreeMap<Level, Vec<ReferencePoint>>,
}

impl FingerprintIndex {
    /// Build the index, normalising station identifiers to lower case.
    ///
    /// Fingerprint entries naming stations that are not in `stations` are
    /// dropped, and reference points left without entries are discarded.
    pub fn from_parts(stations: Vec<WifiStation>, reference_points: Vec<ReferencePoint>) -> Self {
        let mut index = Self::default();
        for mut station in stations {
            station.id = station.id.trim().to_lowercase();
            index
                .station_levels
                .entry(station.id.clone())
                .or_default()
                .insert(station.level);
            index
                .stations
                .insert((station.id.clone(), station.level), station);
        }

        let mut dropped_entries = 0usize;
        let mut dropped_points = 0usize;
        for mut point in reference_points {
            let before = point.fingerprint.len();
            point.fingerprint = point
                .fingerprint
                .into_iter()
                .map(|(station, rssi)| (station.trim().to_lowercase(), rssi))
                .filter(|(station, rssi)| {
                    rssi.is_finite() && index.station_levels.contains_key(station)
                })
                .collect();
            dropped_entries += before - point.fingerprint.len();
            if point.fingerprint.is_empty() {
                dropped_points += 1;
                continue;
            }
            index.points.entry(point.level).or_default().push(point);
        }

        for points in index.points.values_mut() {
            points.sort_by(|a, b| a.name.cmp(&b.name));
        }

        if dropped_entries > 0 || dropped_points > 0 {
            warn!(
                dropped_entries,
                dropped_points, "ignored fingerprint entries for unknown stations"
            );
        }
        debug!(
            stations = index.stations.len(),
            points = index.point_count(),
            "built fingerprint index"
        );
        index
    }

    pub fn contains(&self, station: &str) -> bool {
        self.station_levels
            .contains_key(&station.trim().to_lowercase())
    }

    pub fn station(&self, station: &str, level: Level) -> Option<&WifiStation> {
        self.stations.get(&(station.trim().to_lowercase(), level))
    }

    pub fn stations(&self) -> impl Iterator<Item = &WifiStation> {
        self.stations.values()
    }

    /// Levels on which `station` is installed.
    pub fn station_levels(&self, station: &str) -> Vec<Level> {
        self.station_levels
            .get(&station.trim().to_lowercase())
            .map(|levels| levels.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn reference_points(&self, level: Level) -> &[ReferencePoint] {
        self.points.get(&level).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn levels(&self) -> Vec<Level> {
        self.points.keys().copied().collect()
    }

    pub fn point_count(&self) -> usize {
        self.points.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Best matching reference point for a set of readings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocateResult {
    pub position: Position,
    /// Name of the matched reference point.
    pub name: String,
    /// Similarity in `0.0..=1.0`.
    pub score: f64,
    pub matched_stations: usize,
}

/// Estimates positions from observed signal strengths.
#[derive(Debug, Clone, Copy)]
pub struct PositionLocator<'a> {
    index: &'a FingerprintIndex,
    min_score: f64,
}

impl<'a> PositionLocator<'a> {
    /// Locator over the graph's fingerprint index.
    ///
    /// Fails with [`crate::Error::WifiUnavailable`] when the graph was built without it.
    pub fn new(graph: &'a SpatialGraph) -> Result<Self> {
        Ok(Self::from_index(graph.wifi()?))
    }

    pub fn from_index(index: &'a FingerprintIndex) -> Self {
        Self {
            index,
            min_score: DEFAULT_MIN_SCORE,
        }
    }

    /// Set the confidence threshold, clamped to `0.0..=1.0`. A non-finite
    /// threshold is ignored and the current one kept.
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        if min_score.is_finite() {
            self.min_score = min_score.clamp(0.0, 1.0);
        } else {
            warn!(min_score, "ignoring non-finite minimum score");
        }
        self
    }

    pub fn min_score(&self) -> f64 {
        self.min_score
    }

    /// Estimate the position for readings of station id to dBm.
    ///
    /// Only reference points on levels where a known station was observed
    /// are scored. Each scores the summed per-station agreement divided by
    /// the number of stations in its fingerprint or the known readings.
    /// Returns `None` when no reading names a known station or the best score
    /// is below the minimum.
    pub fn locate(&self, readings: &HashMap<String, f64>) -> Option<LocateResult> {
        let known: BTreeMap<String, f64> = readings
            .iter()
            .map(|(station, rssi)| (station.trim().to_lowercase(), *rssi))
            .filter(|(station, rssi)| rssi.is_finite() && self.index.contains(station))
            .collect();
        if known.is_empty() {
            debug!(readings = readings.len(), "no known stations in readings");
            return None;
        }

        let levels: BTreeSet<Level> = known
            .keys()
            .flat_map(|station| self.index.station_levels(station))
            .collect();

        let mut best: Option<(f64, usize, &ReferencePoint)> = None;
        for level in levels {
            for point in self.index.reference_points(level) {
                let (score, matched) = score_point(point, &known);
                let better = match best {
                    None => true,
                    Some((best_score, best_matched, best_point)) => score
                        .total_cmp(&best_score)
                        .then(matched.cmp(&best_matched))
                        .then_with(|| best_point.name.cmp(&point.name))
                        == Ordering::Greater,
                };
                if better {
                    best = Some((score, matched, point));
                }
            }
        }

        let (score, matched_stations, point) = best?;
        debug!(point = %point.name, score, matched_stations, "best fingerprint match");
        if score < self.min_score {
            return None;
        }

        Some(LocateResult {
            position: Position::new(point.level, point.point.x, point.point.y),
            name: point.name.clone(),
            score,
            matched_stations,
        })
    }
}

fn score_point(point: &ReferencePoint, known: &BTreeMap<String, f64>) -> (f64, usize) {
    let mut agreement = 0.0;
    let mut matched = 0usize;
    for (station, expected) in &point.fingerprint {
        if let Some(observed) = known.get(station) {
            let difference = (observed - expected).abs().min(MAX_SIGNAL_DIFFERENCE);
            agreement += 1.0 - difference / MAX_SIGNAL_DIFFERENCE;
            matched += 1;
        }
    }
    let union = point.fingerprint.len() + known.len() - matched;
    if union == 0 {
        return (0.0, 0);
    }
    (agreement / union as f64, matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(id: &str, level: Level) -> WifiStation {
        WifiStation {
            id: id.to_string(),
            level,
            position: None,
            ssid: None,
        }
    }

    fn point(name: &str, level: Level, entries: &[(&str, f64)]) -> ReferencePoint {
        ReferencePoint {
            name: name.to_string(),
            level,
            point: Point::new(100.0, 200.0),
            fingerprint: entries
                .iter()
                .map(|(id, rssi)| (id.to_string(), *rssi))
                .collect(),
        }
    }

    fn readings(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries
            .iter()
            .map(|(id, rssi)| (id.to_string(), *rssi))
            .collect()
    }

    fn index() -> FingerprintIndex {
        FingerprintIndex::from_parts(
            vec![
                station("AA:AA", 0),
                station("bb:bb", 0),
                station("cc:cc", 1),
            ],
            vec![
                point("lobby", 0, &[("aa:aa", -40.0), ("bb:bb", -70.0)]),
                point("cafe", 0, &[("aa:aa", -75.0), ("bb:bb", -45.0)]),
                point("library", 1, &[("cc:cc", -50.0), ("zz:zz", -60.0)]),
            ],
        )
    }

    #[test]
    fn unknown_fingerprint_stations_are_dropped() {
        let index = index();
        let library = &index.reference_points(1)[0];
        assert_eq!(library.fingerprint.len(), 1);
        assert!(index.contains("AA:AA"));
        assert!(index.station("aa:aa", 0).is_some());
        assert!(!index.contains("zz:zz"));
    }

    #[test]
    fn identical_readings_score_one() {
        let index = index();
        let locator = PositionLocator::from_index(&index);
        let result = locator
            .locate(&readings(&[("AA:AA", -40.0), ("bb:bb", -70.0)]))
            .expect("located");
        assert_eq!(result.name, "lobby");
        assert_eq!(result.score, 1.0);
        assert_eq!(result.matched_stations, 2);
        assert_eq!(result.position, Position::new(0, 100.0, 200.0));
    }

    #[test]
    fn no_known_stations_yields_none() {
        let index = index();
        let locator = PositionLocator::from_index(&index);
        assert!(locator.locate(&readings(&[("ff:ff", -40.0)])).is_none());
        assert!(locator.locate(&HashMap::new()).is_none());
    }

    #[test]
    fn only_levels_with_observed_stations_are_scored() {
        let index = index();
        let locator = PositionLocator::from_index(&index);
        let result = locator
            .locate(&readings(&[("cc:cc", -52.0)]))
            .expect("located");
        assert_eq!(result.name, "library");
        assert_eq!(result.position.level, 1);
    }

    #[test]
    fn weak_matches_fall_below_min_score() {
        let index = index();
        let locator = PositionLocator::from_index(&index);
        // one shared station, far off, plus an unmatched one
        let weak = readings(&[("aa:aa", -10.0), ("cc:cc", -95.0)]);
        assert!(locator.locate(&weak).is_none());
        assert!(locator.with_min_score(0.0).locate(&weak).is_some());
    }

    #[test]
    fn min_score_is_clamped_and_ignores_nan() {
        let index = index();
        let locator = PositionLocator::from_index(&index);
        assert_eq!(locator.with_min_score(f64::NAN).min_score(), DEFAULT_MIN_SCORE);
        assert_eq!(locator.with_min_score(f64::INFINITY).min_score(), DEFAULT_MIN_SCORE);
        assert_eq!(locator.with_min_score(5.0).min_score(), 1.0);
        assert_eq!(locator.with_min_score(-2.0).min_score(), 0.0);

        let weak = readings(&[("aa:aa", -10.0), ("cc:cc", -95.0)]);
        assert!(locator.with_min_score(f64::NAN).locate(&weak).is_none());
        let exact = readings(&[("aa:aa", -40.0), ("bb:bb", -70.0)]);
        assert!(locator.with_min_score(5.0).locate(&exact).is_some());
    }

    #[test]
    fn ties_prefer_more_matches_then_name() {
        let index = FingerprintIndex::from_parts(
            vec![station("aa", 0)],
            vec![point("b-point", 0, &[("aa", -50.0)]), point("a-point", 0, &[("aa", -50.0)])],
        );
        let locator = PositionLocator::from_index(&index);
        let result = locator.locate(&readings(&[("aa", -50.0)])).expect("located");
        assert_eq!(result.name, "a-point");
    }
}
