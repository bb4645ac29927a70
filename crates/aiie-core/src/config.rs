//! Configuration loading.
//!
//! `aiie.toml` carries the engine baseline and margins plus the assessment
//! thresholds. Every field has a default, so a missing file is not an error.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Scoring engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Neutral starting score for modalities without their own baseline.
    #[serde(default = "default_baseline")]
    pub baseline_score: f64,
    /// How much higher a sibling must score to be suggested as an alternative.
    #[serde(default = "default_margin")]
    pub alternative_margin: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            baseline_score: default_baseline(),
            alternative_margin: default_margin(),
        }
    }
}

/// Assessment grading and analytics settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentConfig {
    /// Minimum percentage needed to pass.
    #[serde(default = "default_passing_score")]
    pub passing_score: u8,
    /// Buckets below this percentage are reported as weak areas.
    #[serde(default = "default_weak_area_threshold")]
    pub weak_area_threshold: u8,
    /// Maximum practice cases suggested per missed category.
    #[serde(default = "default_recommendations")]
    pub recommendations_per_category: usize,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            passing_score: default_passing_score(),
            weak_area_threshold: default_weak_area_threshold(),
            recommendations_per_category: default_recommendations(),
        }
    }
}

/// Top-level aiie configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiieConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub assessment: AssessmentConfig,
}

fn default_baseline() -> f64 {
    5.0
}
fn default_margin() -> f64 {
    1.0
}
fn default_passing_score() -> u8 {
    70
}
fn default_weak_area_threshold() -> u8 {
    70
}
fn default_recommendations() -> usize {
    2
}

impl AiieConfig {
    /// Check that values are usable before they reach the engine.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            (1.0..=9.0).contains(&self.engine.baseline_score),
            "baseline_score must be between 1 and 9, got {}",
            self.engine.baseline_score
        );
        anyhow::ensure!(
            self.engine.alternative_margin >= 0.0 && self.engine.alternative_margin.is_finite(),
            "alternative_margin must be a non-negative number"
        );
        anyhow::ensure!(
            self.assessment.passing_score <= 100,
            "passing_score must be at most 100"
        );
        anyhow::ensure!(
            self.assessment.weak_area_threshold <= 100,
            "weak_area_threshold must be at most 100"
        );
        Ok(())
    }
}

/// Load configuration from the default location (`./aiie.toml`).
pub fn load_config() -> Result<AiieConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or `./aiie.toml` when present.
///
/// Environment overrides: `AIIE_BASELINE_SCORE`, `AIIE_PASSING_SCORE`.
pub fn load_config_from(path: Option<&Path>) -> Result<AiieConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                anyhow::bail!("config file not found: {}", p.display());
            }
            Some(p.to_path_buf())
        }
        None => {
            let local = PathBuf::from("aiie.toml");
            local.exists().then_some(local)
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config_str(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => AiieConfig::default(),
    };

    if let Ok(value) = std::env::var("AIIE_BASELINE_SCORE") {
        config.engine.baseline_score = value
            .parse()
            .with_context(|| format!("invalid AIIE_BASELINE_SCORE: {value}"))?;
    }
    if let Ok(value) = std::env::var("AIIE_PASSING_SCORE") {
        config.assessment.passing_score = value
            .parse()
            .with_context(|| format!("invalid AIIE_PASSING_SCORE: {value}"))?;
    }

    config.validate()?;
    Ok(config)
}

/// Parse a TOML string into a config (useful for testing).
pub fn parse_config_str(content: &str) -> Result<AiieConfig> {
    let config: AiieConfig = toml::from_str(content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AiieConfig::default();
        assert_eq!(config.engine.baseline_score, 5.0);
        assert_eq!(config.engine.alternative_margin, 1.0);
        assert_eq!(config.assessment.passing_score, 70);
        assert_eq!(config.assessment.weak_area_threshold, 70);
        assert_eq!(config.assessment.recommendations_per_category, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = parse_config_str(
            r#"
[engine]
baseline_score = 4.5

[assessment]
passing_score = 80
"#,
        )
        .unwrap();
        assert_eq!(config.engine.baseline_score, 4.5);
        assert_eq!(config.engine.alternative_margin, 1.0);
        assert_eq!(config.assessment.passing_score, 80);
        assert_eq!(config.assessment.weak_area_threshold, 70);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config = AiieConfig::default();
        config.engine.baseline_score = 12.0;
        assert!(config.validate().is_err());

        let mut config = AiieConfig::default();
        config.assessment.passing_score = 101;
        assert!(config.validate().is_err());

        let mut config = AiieConfig::default();
        config.engine.alternative_margin = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_missing_path_fails() {
        let result = load_config_from(Some(Path::new("/nonexistent/aiie.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aiie.toml");
        std::fs::write(&path, "[engine]\nalternative_margin = 2.0\n").unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.engine.alternative_margin, 2.0);
    }
}
