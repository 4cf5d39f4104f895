//! Ranking configuration file (profiles, default profile, calibration ranges).

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::constants::DEFAULT_PROFILE_NAME;
use crate::normalize::{CalibrationRanges, MetricRange};

use super::error::{ProfileError, ProfileResult};
use super::table::ProfileTable;
use super::types::IntentWeightProfile;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RankingConfigFile {
    #[serde(default)]
    default_profile: Option<String>,
    #[serde(default = "default_true")]
    builtin_profiles: bool,
    #[serde(default)]
    profiles: BTreeMap<String, ProfileEntry>,
    #[serde(default)]
    calibration: BTreeMap<String, MetricRange>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfileEntry {
    weights: BTreeMap<String, f64>,
    #[serde(default)]
    keywords: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Everything the ranking stages read from configuration, loaded once at start-up.
#[derive(Debug, Clone, Default)]
pub struct RankingConfig {
    pub profiles: ProfileTable,
    pub calibration: CalibrationRanges,
}

impl RankingConfig {
    /// Built-in profiles, per-batch normalization for every metric.
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Loads a JSON ranking configuration file.
    pub fn load(path: &Path) -> ProfileResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ProfileError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = Self::from_json_str(&raw)?;

        info!(
            path = %path.display(),
            profiles = config.profiles.len(),
            default_profile = config.profiles.default_profile_name(),
            calibrated_metrics = config.calibration.len(),
            "Ranking configuration loaded"
        );

        Ok(config)
    }

    /// Parses a ranking configuration from JSON text.
    ///
    /// File profiles replace built-ins of the same name unless
    /// `"builtin_profiles": false` drops the built-ins altogether.
    pub fn from_json_str(raw: &str) -> ProfileResult<Self> {
        let file: RankingConfigFile = serde_json::from_str(raw)?;

        let mut overrides = Vec::with_capacity(file.profiles.len());
        for (intent, entry) in file.profiles {
            let profile =
                IntentWeightProfile::new(&intent, entry.weights)?.with_keywords(entry.keywords);
            debug!(intent = profile.intent(), weights = ?profile.weights(), "Profile parsed");
            overrides.push(profile);
        }

        let default_profile = file
            .default_profile
            .unwrap_or_else(|| DEFAULT_PROFILE_NAME.to_string());

        let profiles = if file.builtin_profiles {
            ProfileTable::builtin().merged(overrides, &default_profile)?
        } else {
            ProfileTable::new(overrides, &default_profile)?
        };

        for (metric, range) in &file.calibration {
            if !range.is_valid() {
                return Err(ProfileError::InvalidRange {
                    metric: metric.clone(),
                    min: range.min,
                    max: range.max,
                });
            }
        }

        Ok(Self {
            profiles,
            calibration: file.calibration,
        })
    }
}
