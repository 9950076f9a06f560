//! Parsing of `source:destination` flow lists.

use crate::error::ScenarioError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One flow between two nodes, given by node index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrafficPair {
    pub source: u32,
    pub destination: u32,
}

impl TrafficPair {
    pub fn new(source: u32, destination: u32) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Check both endpoints against the node count.
    pub fn fits(&self, num_nodes: u32) -> bool {
        self.source < num_nodes && self.destination < num_nodes
    }
}

impl fmt::Display for TrafficPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.destination)
    }
}

impl FromStr for TrafficPair {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScenarioError::InvalidTrafficPair(s.to_string());
        let (source, destination) = s.split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            source: source.trim().parse().map_err(|_| invalid())?,
            destination: destination.trim().parse().map_err(|_| invalid())?,
        })
    }
}

impl TryFrom<String> for TrafficPair {
    type Error = ScenarioError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TrafficPair> for String {
    fn from(pair: TrafficPair) -> Self {
        pair.to_string()
    }
}

/// Parse a comma-separated list such as `"1:18,3:7"`.
///
/// Entries without a `:` are ignored. An entry with a `:` whose fields are
/// not unsigned integers is an error.
pub fn parse_traffic_pairs(input: &str) -> Result<Vec<TrafficPair>, ScenarioError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|entry| entry.contains(':'))
        .map(str::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let pairs = parse_traffic_pairs("1:18, 3:7,0:2").unwrap();
        assert_eq!(
            pairs,
            vec![
                TrafficPair::new(1, 18),
                TrafficPair::new(3, 7),
                TrafficPair::new(0, 2)
            ]
        );
    }

    #[test]
    fn test_entries_without_separator_are_skipped() {
        let pairs = parse_traffic_pairs("garbage,1:2,,5").unwrap();
        assert_eq!(pairs, vec![TrafficPair::new(1, 2)]);
        assert!(parse_traffic_pairs("").unwrap().is_empty());
    }

    #[test]
    fn test_non_numeric_fields_are_errors() {
        for input in ["a:1", "1:b", "1:-2", ":3"] {
            assert!(
                matches!(
                    parse_traffic_pairs(input),
                    Err(ScenarioError::InvalidTrafficPair(_))
                ),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn test_fits() {
        assert!(TrafficPair::new(1, 18).fits(20));
        assert!(!TrafficPair::new(1, 20).fits(20));
        assert!(!TrafficPair::new(20, 1).fits(20));
    }

    #[test]
    fn test_display_round_trips_through_string() {
        let pair = TrafficPair::new(4, 9);
        assert_eq!(String::from(pair), "4:9");
    }
}
