//! Session configuration
//!
//! One YAML document describes an entire ingestion session: the output
//! graph location, the ontology sources, category labels, mapped
//! property aliases, index mirror fields and pipeline sizing.
//! Configuration errors fail fast, before any worker thread starts.

use crate::ontology::ReasonerKind;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::thread;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// What to do when a source fails to fetch, parse or reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceErrorPolicy {
    /// Log the failure, drop the source, continue the session
    Skip,
    /// Fail the whole session
    #[default]
    Abort,
}

/// One ontology source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// File path or http(s) URL
    pub location: String,

    /// Reasoning pass run before decomposition
    #[serde(default)]
    pub reasoner: ReasonerKind,

    /// Skip the owl:imports closure
    #[serde(default)]
    pub skip_imports: bool,
}

/// A mapped property: one output property fed by several source
/// annotation properties
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappedProperty {
    /// Output property name
    pub name: String,

    /// Source annotation property names or IRIs
    pub sources: Vec<String>,
}

fn default_queue_capacity() -> usize {
    10_000
}

fn default_shutdown_timeout_hours() -> u64 {
    // a hang safety net for the final wait, not a normal control path;
    // sized for multi-day loads
    72
}

/// Full session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Output graph location
    pub graph_location: PathBuf,

    /// Ontology sources, one producer task each
    pub sources: Vec<SourceConfig>,

    /// Category root IRI -> label, applied by the blanket labeling pass
    #[serde(default)]
    pub categories: HashMap<String, String>,

    /// Mapped property aliases
    #[serde(default)]
    pub mapped_properties: Vec<MappedProperty>,

    /// Property names mirrored into the search index
    #[serde(default)]
    pub indexed_properties: Vec<String>,

    /// Subset of `indexed_properties` that also gets an exact-match
    /// shadow field
    #[serde(default)]
    pub exact_indexed_properties: Vec<String>,

    /// Producer thread count; defaults to 25% of available parallelism
    #[serde(default)]
    pub producer_threads: Option<usize>,

    /// Consumer thread count; defaults to 75% of available parallelism
    #[serde(default)]
    pub consumer_threads: Option<usize>,

    /// Shared work queue capacity (backpressure bound)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Source failure policy
    #[serde(default)]
    pub on_source_error: SourceErrorPolicy,

    /// Safety-net bound on the final shutdown wait
    #[serde(default = "default_shutdown_timeout_hours")]
    pub shutdown_timeout_hours: u64,
}

impl SessionConfig {
    /// Read and validate a configuration file
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a configuration document
    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        let config: SessionConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Minimal configuration for one graph location and a set of source
    /// files
    pub fn new(graph_location: impl Into<PathBuf>, locations: &[&str]) -> Self {
        SessionConfig {
            graph_location: graph_location.into(),
            sources: locations
                .iter()
                .map(|location| SourceConfig {
                    location: location.to_string(),
                    reasoner: ReasonerKind::None,
                    skip_imports: false,
                })
                .collect(),
            categories: HashMap::new(),
            mapped_properties: Vec::new(),
            indexed_properties: Vec::new(),
            exact_indexed_properties: Vec::new(),
            producer_threads: None,
            consumer_threads: None,
            queue_capacity: default_queue_capacity(),
            on_source_error: SourceErrorPolicy::default(),
            shutdown_timeout_hours: default_shutdown_timeout_hours(),
        }
    }

    /// Reject configurations no session should start with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid("no ontology sources configured".into()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be positive".into()));
        }
        if self.producer_threads == Some(0) || self.consumer_threads == Some(0) {
            return Err(ConfigError::Invalid(
                "thread counts must be positive when set".into(),
            ));
        }
        for source in &self.sources {
            if source.location.trim().is_empty() {
                return Err(ConfigError::Invalid("source with empty location".into()));
            }
        }
        for mapped in &self.mapped_properties {
            if mapped.name.trim().is_empty() || mapped.sources.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "mapped property '{}' needs a name and at least one source",
                    mapped.name
                )));
            }
        }
        let indexed: HashSet<&str> = self.indexed_properties.iter().map(|s| s.as_str()).collect();
        for exact in &self.exact_indexed_properties {
            if !indexed.contains(exact.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "exact-indexed property '{}' is not in indexed_properties",
                    exact
                )));
            }
        }
        Ok(())
    }

    /// Producer thread count: explicit, or a quarter of available
    /// parallelism
    pub fn producer_count(&self) -> usize {
        self.producer_threads
            .unwrap_or_else(|| (available_parallelism() / 4).max(1))
    }

    /// Consumer thread count: explicit, or the remaining three quarters
    pub fn consumer_count(&self) -> usize {
        self.consumer_threads
            .unwrap_or_else(|| (available_parallelism() - available_parallelism() / 4).max(1))
    }
}

fn available_parallelism() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
graph_location: /tmp/graph
sources:
  - location: /data/pizza.ttl
    reasoner: subclass-closure
  - location: https://example.org/toppings.owl
    skip_imports: true
categories:
  "http://example.org/pizza#Pizza": pizza
mapped_properties:
  - name: synonym
    sources: ["http://www.w3.org/2004/02/skos/core#altLabel", "synonym"]
indexed_properties: [label, synonym]
exact_indexed_properties: [label]
producer_threads: 2
consumer_threads: 6
queue_capacity: 512
on_source_error: skip
"#;

    #[test]
    fn test_parse_full_config() {
        let config = SessionConfig::from_yaml(FULL).unwrap();
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].reasoner, ReasonerKind::SubclassClosure);
        assert!(config.sources[1].skip_imports);
        assert_eq!(config.producer_count(), 2);
        assert_eq!(config.consumer_count(), 6);
        assert_eq!(config.queue_capacity, 512);
        assert_eq!(config.on_source_error, SourceErrorPolicy::Skip);
        assert_eq!(config.categories.len(), 1);
    }

    #[test]
    fn test_defaults() {
        let config =
            SessionConfig::from_yaml("graph_location: /tmp/g\nsources:\n  - location: a.ttl\n")
                .unwrap();
        assert_eq!(config.on_source_error, SourceErrorPolicy::Abort);
        assert_eq!(config.queue_capacity, 10_000);
        assert!(config.producer_count() >= 1);
        assert!(config.consumer_count() >= 1);
    }

    #[test]
    fn test_rejects_empty_sources() {
        let err = SessionConfig::from_yaml("graph_location: /tmp/g\nsources: []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_exact_not_indexed() {
        let doc = r#"
graph_location: /tmp/g
sources:
  - location: a.ttl
indexed_properties: [label]
exact_indexed_properties: [synonym]
"#;
        let err = SessionConfig::from_yaml(doc).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let doc = "graph_location: /tmp/g\nsources:\n  - location: a.ttl\nbogus: 1\n";
        assert!(SessionConfig::from_yaml(doc).is_err());
    }

    #[test]
    fn test_rejects_zero_threads() {
        let doc = "graph_location: /tmp/g\nsources:\n  - location: a.ttl\nproducer_threads: 0\n";
        let err = SessionConfig::from_yaml(doc).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
