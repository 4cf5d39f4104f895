use std::collections::BTreeMap;

use serde::Serialize;

use crate::constants::{RESERVED_RESULT_KEYS, WEIGHT_SUM_TOLERANCE};

use super::error::{ProfileError, ProfileResult};

/// Named mapping from metric to scoring weight.
///
/// Weights are validated and rescaled to sum to 1.0 on construction, so every
/// profile that exists is ready to score with. Profiles are immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentWeightProfile {
    intent: String,
    weights: BTreeMap<String, f64>,
    keywords: Vec<String>,
}

impl IntentWeightProfile {
    /// Builds a profile, rescaling the weights when they do not already sum to 1.0.
    pub fn new<I, K>(intent: &str, weights: I) -> ProfileResult<Self>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        let intent = normalize_intent(intent);
        if intent.is_empty() {
            return Err(ProfileError::EmptyIntent);
        }

        let mut table = BTreeMap::new();
        for (metric, weight) in weights {
            let metric: String = metric.into();
            let metric = metric.trim().to_string();
            if metric.is_empty() {
                return Err(ProfileError::EmptyMetricName { intent });
            }
            if RESERVED_RESULT_KEYS.contains(&metric.as_str()) {
                return Err(ProfileError::ReservedMetric { intent, metric });
            }
            if !weight.is_finite() || weight < 0.0 {
                return Err(ProfileError::InvalidWeight {
                    intent,
                    metric,
                    weight,
                });
            }
            table.insert(metric, weight);
        }

        if table.is_empty() {
            return Err(ProfileError::NoWeights { intent });
        }

        let sum: f64 = table.values().sum();
        if sum <= 0.0 {
            return Err(ProfileError::ZeroWeightSum { intent });
        }
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            for weight in table.values_mut() {
                *weight /= sum;
            }
        }

        Ok(Self {
            intent,
            weights: table,
            keywords: Vec::new(),
        })
    }

    /// Adds substrings that map a free-form intent onto this profile.
    pub fn with_keywords<I, K>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.keywords = keywords
            .into_iter()
            .map(|k| normalize_intent(&k.into()))
            .filter(|k| !k.is_empty())
            .collect();
        self
    }

    pub fn intent(&self) -> &str {
        &self.intent
    }

    pub fn weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    pub fn weight(&self, metric: &str) -> Option<f64> {
        self.weights.get(metric).copied()
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn metrics(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(String::as_str)
    }

    /// Sum of the weights actually used for scoring (1.0 within tolerance).
    pub fn weight_sum(&self) -> f64 {
        self.weights.values().sum()
    }
}

/// How a requested intent was mapped onto a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentResolution {
    /// The intent named a profile.
    Exact,
    /// The intent contained a profile keyword.
    Inferred,
    /// No intent was supplied; the default profile applies.
    Unspecified,
    /// The intent was not recognized; the default profile applies.
    Fallback,
}

impl IntentResolution {
    pub fn is_fallback(&self) -> bool {
        matches!(self, IntentResolution::Fallback)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentResolution::Exact => "exact",
            IntentResolution::Inferred => "inferred",
            IntentResolution::Unspecified => "unspecified",
            IntentResolution::Fallback => "fallback",
        }
    }
}

/// A profile chosen for a request, with the reason it was chosen.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedProfile<'a> {
    pub profile: &'a IntentWeightProfile,
    pub resolution: IntentResolution,
    pub matched_keyword: Option<&'a str>,
}

pub(crate) fn normalize_intent(intent: &str) -> String {
    intent.trim().to_lowercase()
}
