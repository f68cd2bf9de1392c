//! Declarative routing profiles
//!
//! A [`Profile`] is what callers write: a penalty table keyed by the values
//! of one OSM tag, where a single entry may cover a group of values. The
//! engine consumes the flattened [`EngineProfile`] produced by
//! [`Profile::to_engine`].
//!
//! ```json
//! {
//!   "id": "car",
//!   "key": "highway",
//!   "penalties": [
//!     { "values": ["motorway", "trunk"], "weight": 1 },
//!     { "values": "residential", "weight": 5 }
//!   ],
//!   "default": 20,
//!   "accessTags": ["motor_vehicle", "motorcar"]
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};

/// Canonical tag always consulted for access restrictions
pub const ACCESS_TAG: &str = "access";

/// Canonical tag always consulted for one-way restrictions
pub const ONEWAY_TAG: &str = "oneway";

/// One tag value or a group of values sharing a weight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValues {
    One(String),
    Many(Vec<String>),
}

impl TagValues {
    fn iter(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            TagValues::One(value) => std::slice::from_ref(value),
            TagValues::Many(values) => values,
        };
        values.iter().map(String::as_str)
    }
}

/// A penalty table entry. Lower weight means more preferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyEntry {
    pub values: TagValues,
    pub weight: u32,
}

/// Declarative routing profile
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    /// Primary OSM key the penalty table applies to (e.g. `highway`)
    pub key: String,
    #[serde(default)]
    pub penalties: Vec<PenaltyEntry>,
    /// Weight for values not listed in the table; unlisted values are
    /// unroutable when absent
    #[serde(default)]
    pub default: Option<u32>,
    #[serde(default)]
    pub access_tags: Vec<String>,
    #[serde(default)]
    pub oneway_tags: Vec<String>,
    #[serde(default)]
    pub except_tags: Vec<String>,
}

impl Profile {
    pub fn new(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            ..Default::default()
        }
    }

    /// Parse a profile from its JSON representation
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn penalty(mut self, value: impl Into<String>, weight: u32) -> Self {
        self.penalties.push(PenaltyEntry {
            values: TagValues::One(value.into()),
            weight,
        });
        self
    }

    pub fn penalty_group<I, S>(mut self, values: I, weight: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.penalties.push(PenaltyEntry {
            values: TagValues::Many(values.into_iter().map(Into::into).collect()),
            weight,
        });
        self
    }

    pub fn default_weight(mut self, weight: u32) -> Self {
        self.default = Some(weight);
        self
    }

    pub fn access_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.access_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn oneway_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.oneway_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn except_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.except_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Flatten this profile into the engine's value-to-weight form.
    ///
    /// Later penalty entries override earlier ones for the same value.
    pub fn to_engine(&self) -> Result<EngineProfile> {
        if self.id.trim().is_empty() {
            return Err(Error::InvalidInput("profile id must not be empty".to_string()));
        }
        if self.key.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "profile '{}' has no primary key",
                self.id
            )));
        }
        if self.default == Some(0) {
            return Err(Error::InvalidInput(format!(
                "profile '{}' has a zero default weight",
                self.id
            )));
        }

        let mut penalties = BTreeMap::new();
        for entry in &self.penalties {
            if entry.weight == 0 {
                return Err(Error::InvalidInput(format!(
                    "profile '{}' has a zero weight for {:?}",
                    self.id, entry.values
                )));
            }
            let mut any = false;
            for value in entry.values.iter() {
                if value.is_empty() {
                    return Err(Error::InvalidInput(format!(
                        "profile '{}' has an empty tag value",
                        self.id
                    )));
                }
                penalties.insert(value.to_string(), entry.weight);
                any = true;
            }
            if !any {
                return Err(Error::InvalidInput(format!(
                    "profile '{}' has a penalty entry without values",
                    self.id
                )));
            }
        }

        Ok(EngineProfile {
            id: self.id.clone(),
            key: self.key.clone(),
            penalties,
            default: self.default,
            access_tags: canonical_tags(ACCESS_TAG, &self.access_tags),
            oneway_tags: canonical_tags(ONEWAY_TAG, &self.oneway_tags),
            except_tags: dedup_tags(self.except_tags.iter().map(String::as_str)),
        })
    }
}

/// Flattened profile as registered with the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineProfile {
    pub id: String,
    pub key: String,
    pub penalties: BTreeMap<String, u32>,
    pub default: Option<u32>,
    pub access_tags: Vec<String>,
    pub oneway_tags: Vec<String>,
    pub except_tags: Vec<String>,
}

impl EngineProfile {
    /// Weight for a tag value of the primary key, `None` when unroutable
    pub fn weight_for(&self, value: &str) -> Option<u32> {
        self.penalties.get(value).copied().or(self.default)
    }

    pub fn is_routable(&self, value: &str) -> bool {
        self.weight_for(value).is_some()
    }
}

/// Canonical tag first, then the caller's tags in order, without repeats
fn canonical_tags(canonical: &str, tags: &[String]) -> Vec<String> {
    dedup_tags(std::iter::once(canonical).chain(tags.iter().map(String::as_str)))
}

fn dedup_tags<'a>(tags: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags.map(str::trim).filter(|t| !t.is_empty()) {
        if !out.iter().any(|seen| seen == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
