//! Port name lookup.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::coord::Coordinate;
use crate::error::{Error, Result};

/// Minimum normalized similarity for a name to be offered as a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.5;

/// Maximum suggestions attached to an unknown-port error.
const MAX_SUGGESTIONS: usize = 3;

/// Case-insensitive port name to coordinate table.
#[derive(Debug, Clone, Default)]
pub struct PortDirectory {
    ports: Vec<(String, Coordinate)>,
    by_name: HashMap<String, usize>,
}

impl PortDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of `"Name": [lat, lon]` entries.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let entries: BTreeMap<String, [f64; 2]> = serde_json::from_str(raw)?;
        let mut directory = Self::new();
        for (name, [lat, lon]) in entries {
            directory.insert(name, Coordinate::new(lat, lon)?);
        }
        Ok(directory)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let directory = Self::from_json_str(&fs::read_to_string(path)?)?;
        debug!(path = %path.display(), ports = directory.len(), "loaded port directory");
        Ok(directory)
    }

    /// Add or replace a port. Names are matched case-insensitively.
    pub fn insert(&mut self, name: impl Into<String>, coordinate: Coordinate) {
        let name = name.into();
        let key = normalize(&name);
        match self.by_name.get(&key) {
            Some(&index) => self.ports[index] = (name, coordinate),
            None => {
                self.by_name.insert(key, self.ports.len());
                self.ports.push((name, coordinate));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<Coordinate> {
        self.by_name
            .get(&normalize(name))
            .map(|&index| self.ports[index].1)
    }

    /// Like [`PortDirectory::get`] but fails with close-match suggestions.
    pub fn resolve(&self, name: &str) -> Result<Coordinate> {
        self.get(name).ok_or_else(|| Error::UnknownPort {
            name: name.to_string(),
            suggestions: self.fuzzy_matches(name, MAX_SUGGESTIONS),
        })
    }

    /// Up to `limit` port names most similar to `name`, best first.
    pub fn fuzzy_matches(&self, name: &str, limit: usize) -> Vec<String> {
        let query = normalize(name);
        let mut scored: Vec<(f64, &str)> = self
            .ports
            .iter()
            .map(|(port, _)| {
                let score = strsim::normalized_levenshtein(&query, &normalize(port));
                (score, port.as_str())
            })
            .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, port)| port.to_string())
            .collect()
    }

    /// Ports in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Coordinate)> {
        self.ports
            .iter()
            .map(|(name, coordinate)| (name.as_str(), *coordinate))
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PORTS: &str = r#"{
        "Rotterdam": [51.95, 4.14],
        "New York": [40.68, -74.01],
        "Singapore": [1.26, 103.84]
    }"#;

    #[test]
    fn lookup_ignores_case_and_whitespace() {
        let ports = PortDirectory::from_json_str(PORTS).unwrap();
        assert_eq!(ports.len(), 3);
        let rotterdam = ports.get("  rotterdam ").unwrap();
        assert_eq!(rotterdam, Coordinate { lat: 51.95, lon: 4.14 });
        assert_eq!(ports.resolve("NEW YORK").unwrap().lon, -74.01);
    }

    #[test]
    fn unknown_port_suggests_close_names() {
        let ports = PortDirectory::from_json_str(PORTS).unwrap();
        match ports.resolve("Roterdam") {
            Err(Error::UnknownPort { suggestions, .. }) => {
                assert_eq!(suggestions, vec!["Rotterdam".to_string()]);
            }
            other => panic!("expected UnknownPort, got {other:?}"),
        }
        assert!(ports.fuzzy_matches("Vladivostok", 3).is_empty());
    }

    #[test]
    fn invalid_coordinates_are_rejected() {
        let raw = r#"{"Nowhere": [120.0, 0.0]}"#;
        assert!(matches!(
            PortDirectory::from_json_str(raw),
            Err(Error::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn insert_replaces_existing_name() {
        let mut ports = PortDirectory::new();
        ports.insert("Oslo", Coordinate { lat: 59.9, lon: 10.7 });
        ports.insert("OSLO", Coordinate { lat: 59.8, lon: 10.6 });
        assert_eq!(ports.len(), 1);
        assert_eq!(ports.iter().next().unwrap().0, "OSLO");
    }
}
