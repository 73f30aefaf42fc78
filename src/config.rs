//! Analysis settings loaded from YAML.
//!
//! Every field has a default, so a file only needs to name what it changes:
//!
//! ```yaml
//! positive_threshold: 0.4
//! sleep_buckets:
//!   column: Sleep_Hours
//!   output_column: Sleep_Bucket
//!   breakpoints: [0, 6, 8, 12]
//!   labels: ["<6", "6-8", "8+"]
//! ```

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    bucket::{BucketSpec, Bucketizer},
    error::{AnalysisError, AnalysisResult},
    insights::{DEFAULT_NEGATIVE_THRESHOLD, DEFAULT_POSITIVE_THRESHOLD, InsightRule, default_rules},
    schema::REQUIRED_COLUMNS,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub positive_threshold: f64,
    pub negative_threshold: f64,
    pub risk_buckets: BucketSpec,
    pub sleep_buckets: BucketSpec,
    pub top_sports: usize,
    pub top_performer_quantile: f64,
    pub histogram_bins: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            positive_threshold: DEFAULT_POSITIVE_THRESHOLD,
            negative_threshold: DEFAULT_NEGATIVE_THRESHOLD,
            risk_buckets: BucketSpec::injury_risk(),
            sleep_buckets: BucketSpec::sleep_duration(),
            top_sports: 5,
            top_performer_quantile: 0.75,
            histogram_bins: 30,
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let config: AnalysisConfig = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config YAML {path:?}"))?;
        config
            .validate()
            .with_context(|| format!("Invalid analysis configuration in {path:?}"))?;
        Ok(config)
    }

    /// Rejects settings that would only fail, or silently do nothing, mid-run.
    /// Bucket outputs may not replace an input column the analysis reads.
    pub fn validate(&self) -> AnalysisResult<()> {
        let quantile = self.top_performer_quantile;
        if !(0.0..=1.0).contains(&quantile) {
            return Err(AnalysisError::QuantileOutOfRange(quantile));
        }
        let specs = [&self.risk_buckets, &self.sleep_buckets];
        let sources = specs
            .iter()
            .map(|spec| spec.column.as_str())
            .chain(REQUIRED_COLUMNS.iter().map(|required| required.name));
        for source in sources {
            if let Some(spec) = specs.iter().find(|spec| spec.output_column == source) {
                return Err(AnalysisError::BucketOutputOverwrites {
                    output_column: spec.output_column.clone(),
                    column: source.to_string(),
                });
            }
        }
        if self.risk_buckets.output_column == self.sleep_buckets.output_column {
            return Err(AnalysisError::DuplicateBucketOutput {
                output_column: self.risk_buckets.output_column.clone(),
            });
        }
        Ok(())
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn rules(&self) -> Vec<InsightRule> {
        default_rules(self.positive_threshold, self.negative_threshold)
    }

    /// Validates both bucket configurations before any record is classified.
    pub fn bucketizers(&self) -> Result<(Bucketizer, Bucketizer)> {
        let risk = self
            .risk_buckets
            .build()
            .with_context(|| format!("Invalid bucket configuration for '{}'", self.risk_buckets.column))?;
        let sleep = self
            .sleep_buckets
            .build()
            .with_context(|| format!("Invalid bucket configuration for '{}'", self.sleep_buckets.column))?;
        Ok((risk, sleep))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_remaining_defaults() {
        let config: AnalysisConfig = serde_yaml::from_str("positive_threshold: 0.5\n").unwrap();
        assert_eq!(config.positive_threshold, 0.5);
        assert_eq!(config.negative_threshold, -0.3);
        assert_eq!(config.top_sports, 5);
        assert_eq!(config.risk_buckets, BucketSpec::injury_risk());
    }

    #[test]
    fn invalid_bucket_config_is_rejected_at_setup() {
        let yaml = "sleep_buckets:\n  column: Sleep_Hours\n  output_column: Sleep_Bucket\n  breakpoints: [0, 9, 7]\n  labels: [a, b]\n";
        let config: AnalysisConfig = serde_yaml::from_str(yaml).unwrap();
        let err = config.bucketizers().unwrap_err();
        assert!(format!("{err:#}").contains("strictly increasing"));
    }

    #[test]
    fn bucket_output_may_not_replace_a_source_column() {
        let mut config = AnalysisConfig::default();
        config.risk_buckets.output_column = "Sleep_Hours".to_string();
        assert_eq!(
            config.validate().unwrap_err(),
            AnalysisError::BucketOutputOverwrites {
                output_column: "Sleep_Hours".to_string(),
                column: "Sleep_Hours".to_string()
            }
        );

        let mut config = AnalysisConfig::default();
        config.sleep_buckets.output_column = "HRV".to_string();
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::BucketOutputOverwrites { ref column, .. }) if column == "HRV"
        ));
    }

    #[test]
    fn bucket_outputs_must_be_distinct() {
        let mut config = AnalysisConfig::default();
        config.sleep_buckets.output_column = config.risk_buckets.output_column.clone();
        assert_eq!(
            config.validate().unwrap_err(),
            AnalysisError::DuplicateBucketOutput {
                output_column: "Injury_Risk_Level".to_string()
            }
        );
    }

    #[test]
    fn top_performer_quantile_must_be_a_fraction() {
        for quantile in [1.5, -0.1, f64::NAN] {
            let config = AnalysisConfig {
                top_performer_quantile: quantile,
                ..AnalysisConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(AnalysisError::QuantileOutOfRange(_))
            ));
        }
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn load_rejects_invalid_settings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"top_performer_quantile: 75\n").unwrap();
        let err = AnalysisConfig::load(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("outside [0, 1]"));
    }

    #[test]
    fn rules_pick_up_thresholds() {
        let config = AnalysisConfig {
            positive_threshold: 0.6,
            ..AnalysisConfig::default()
        };
        let rules = config.rules();
        assert_eq!(rules.len(), 5);
        assert_eq!(rules[0].threshold, 0.6);
        assert_eq!(rules[2].threshold, -0.3);
    }
}
