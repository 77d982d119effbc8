use std::path::Path;

use anyhow::Context;
use pcb_sch_adapt::AdaptOptions;
use pcb_sch_match::{DetectorKind, Matcher, SimilarityMetric};
use serde::{Deserialize, Serialize};

/// Tuning shared by every solver of a pipeline.
///
/// ```
/// use pcb_sch_solver::SolverConfig;
///
/// let config = SolverConfig::from_toml_str("max_adapt_passes = 2").unwrap();
/// assert_eq!(config.max_adapt_passes, 2);
/// assert_eq!(config.max_iterations, 100_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// Steps a single solver may take before it is failed.
    pub max_iterations: usize,
    pub max_adapt_passes: usize,
    pub similarity_metric: SimilarityMetric,
    pub issue_detectors: Vec<DetectorKind>,
    pub remove_unmatched_chips: bool,
    pub shrink_sides: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        let adapt = AdaptOptions::default();
        Self {
            max_iterations: 100_000,
            max_adapt_passes: adapt.max_adapt_passes,
            similarity_metric: adapt.similarity_metric,
            issue_detectors: adapt.issue_detectors,
            remove_unmatched_chips: adapt.remove_unmatched_chips,
            shrink_sides: adapt.shrink_sides,
        }
    }
}

impl SolverConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn matcher(&self) -> Matcher {
        Matcher::from_kinds(&self.issue_detectors, self.similarity_metric)
    }

    pub fn adapt_options(&self) -> AdaptOptions {
        AdaptOptions {
            max_adapt_passes: self.max_adapt_passes,
            remove_unmatched_chips: self.remove_unmatched_chips,
            shrink_sides: self.shrink_sides,
            similarity_metric: self.similarity_metric,
            issue_detectors: self.issue_detectors.clone(),
        }
    }
}
