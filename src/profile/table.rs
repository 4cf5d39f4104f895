use std::collections::{BTreeMap, BTreeSet};

use crate::constants::{
    DEFAULT_PROFILE_NAME, METRIC_DOC_QUALITY, METRIC_POPULARITY, METRIC_RECENCY,
    METRIC_SIMILARITY,
};

use super::error::{ProfileError, ProfileResult};
use super::types::{IntentResolution, IntentWeightProfile, ResolvedProfile, normalize_intent};

/// Read-only table of weight profiles shared by every request.
///
/// Built once at start-up and handed out behind an `Arc`; nothing mutates it
/// afterwards, so concurrent reads need no locking.
#[derive(Debug, Clone)]
pub struct ProfileTable {
    profiles: BTreeMap<String, IntentWeightProfile>,
    default_profile: String,
}

impl ProfileTable {
    /// Builds a table; `default_profile` must name one of `profiles`.
    pub fn new<I>(profiles: I, default_profile: &str) -> ProfileResult<Self>
    where
        I: IntoIterator<Item = IntentWeightProfile>,
    {
        let mut table = BTreeMap::new();
        for profile in profiles {
            let intent = profile.intent().to_string();
            if table.insert(intent.clone(), profile).is_some() {
                return Err(ProfileError::DuplicateProfile { intent });
            }
        }

        let default_profile = normalize_intent(default_profile);
        if !table.contains_key(&default_profile) {
            return Err(ProfileError::UnknownDefault {
                name: default_profile,
            });
        }

        Ok(Self {
            profiles: table,
            default_profile,
        })
    }

    /// The built-in intents: `recommend`, `latest`, `popular`, `reliable`, `default`.
    pub fn builtin() -> Self {
        Self {
            profiles: builtin_profiles()
                .into_iter()
                .map(|p| (p.intent().to_string(), p))
                .collect(),
            default_profile: DEFAULT_PROFILE_NAME.to_string(),
        }
    }

    /// Returns the profile registered under `intent`, if any.
    pub fn get(&self, intent: &str) -> Option<&IntentWeightProfile> {
        self.profiles.get(&normalize_intent(intent))
    }

    /// Returns the profile for `intent`, or the default profile when it is absent.
    pub fn profile_for(&self, intent: &str) -> &IntentWeightProfile {
        self.get(intent).unwrap_or_else(|| self.default_profile())
    }

    pub fn default_profile(&self) -> &IntentWeightProfile {
        // Invariant established in `new`/`builtin`: the default is always present.
        &self.profiles[&self.default_profile]
    }

    pub fn default_profile_name(&self) -> &str {
        &self.default_profile
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &IntentWeightProfile> {
        self.profiles.values()
    }

    /// Union of the metrics weighed by any profile, in name order.
    pub fn metrics(&self) -> Vec<String> {
        self.profiles
            .values()
            .flat_map(|p| p.metrics())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Maps a free-form intent onto a profile. Never fails.
    ///
    /// Exact names win, then keywords (profiles checked in name order), then the
    /// default profile.
    pub fn resolve(&self, intent: &str) -> ResolvedProfile<'_> {
        let wanted = normalize_intent(intent);

        if wanted.is_empty() {
            return ResolvedProfile {
                profile: self.default_profile(),
                resolution: IntentResolution::Unspecified,
                matched_keyword: None,
            };
        }

        if let Some(profile) = self.profiles.get(&wanted) {
            return ResolvedProfile {
                profile,
                resolution: IntentResolution::Exact,
                matched_keyword: None,
            };
        }

        for profile in self.profiles.values() {
            if let Some(keyword) = profile
                .keywords()
                .iter()
                .find(|k| wanted.contains(k.as_str()))
            {
                return ResolvedProfile {
                    profile,
                    resolution: IntentResolution::Inferred,
                    matched_keyword: Some(keyword.as_str()),
                };
            }
        }

        ResolvedProfile {
            profile: self.default_profile(),
            resolution: IntentResolution::Fallback,
            matched_keyword: None,
        }
    }

    /// Merges `overrides` over this table (same name replaces) and sets the default.
    pub(crate) fn merged<I>(mut self, overrides: I, default_profile: &str) -> ProfileResult<Self>
    where
        I: IntoIterator<Item = IntentWeightProfile>,
    {
        for profile in overrides {
            self.profiles.insert(profile.intent().to_string(), profile);
        }
        Self::new(self.profiles.into_values(), default_profile)
    }
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_profile(intent: &str, raw: [f64; 4], keywords: &[&str]) -> IntentWeightProfile {
    let weights = [
        (METRIC_SIMILARITY, raw[0]),
        (METRIC_DOC_QUALITY, raw[1]),
        (METRIC_RECENCY, raw[2]),
        (METRIC_POPULARITY, raw[3]),
    ];
    match IntentWeightProfile::new(intent, weights) {
        Ok(profile) => profile.with_keywords(keywords.iter().copied()),
        // Built-in literals are positive and finite.
        Err(e) => unreachable!("built-in profile '{intent}' is invalid: {e}"),
    }
}

fn builtin_profiles() -> Vec<IntentWeightProfile> {
    vec![
        builtin_profile("recommend", [4.0, 3.0, 1.0, 2.0], &["recommend"]),
        builtin_profile("latest", [2.0, 1.0, 5.0, 1.0], &["latest"]),
        builtin_profile("popular", [2.5, 1.5, 1.0, 5.0], &["popular", "trend"]),
        builtin_profile("reliable", [3.0, 5.0, 1.0, 1.0], &["reliab", "quality"]),
        builtin_profile(DEFAULT_PROFILE_NAME, [4.0, 3.0, 1.0, 2.0], &[]),
    ]
}
