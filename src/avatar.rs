//! Avatar Model - Trait Categories and Configurations
//!
//! An avatar is a map from trait category to trait value. Parsing is lenient:
//! unknown keys and mistyped values never reach an `AvatarConfig`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// One configurable dimension of an avatar's appearance.
///
/// Declaration order is the compositing order, back to front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TraitCategory {
    BackgroundShape,
    BackgroundColor,
    Body,
    ClothingColor,
    SkinTone,
    Hair,
    HairColor,
    Eyes,
    Lashes,
    Mouth,
    Hat,
}

/// Shape of the values a category accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Flag,
}

impl TraitCategory {
    pub const ALL: [TraitCategory; 11] = [
        TraitCategory::BackgroundShape,
        TraitCategory::BackgroundColor,
        TraitCategory::Body,
        TraitCategory::ClothingColor,
        TraitCategory::SkinTone,
        TraitCategory::Hair,
        TraitCategory::HairColor,
        TraitCategory::Eyes,
        TraitCategory::Lashes,
        TraitCategory::Mouth,
        TraitCategory::Hat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TraitCategory::BackgroundShape => "backgroundShape",
            TraitCategory::BackgroundColor => "backgroundColor",
            TraitCategory::Body => "body",
            TraitCategory::ClothingColor => "clothingColor",
            TraitCategory::SkinTone => "skinTone",
            TraitCategory::Hair => "hair",
            TraitCategory::HairColor => "hairColor",
            TraitCategory::Eyes => "eyes",
            TraitCategory::Lashes => "lashes",
            TraitCategory::Mouth => "mouth",
            TraitCategory::Hat => "hat",
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            TraitCategory::Lashes => ValueKind::Flag,
            _ => ValueKind::Text,
        }
    }
}

impl fmt::Display for TraitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TraitCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TraitCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// A raw key as it arrives in a JSON payload.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraitKey {
    Known(TraitCategory),
    Unknown(String),
}

impl TraitKey {
    pub fn parse(key: &str) -> Self {
        match key.parse() {
            Ok(category) => TraitKey::Known(category),
            Err(unknown) => TraitKey::Unknown(unknown),
        }
    }
}

impl<'de> Deserialize<'de> for TraitKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        Ok(TraitKey::parse(&key))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraitValue {
    Flag(bool),
    Text(String),
}

impl TraitValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            TraitValue::Flag(_) => ValueKind::Flag,
            TraitValue::Text(_) => ValueKind::Text,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TraitValue::Text(s) => Some(s),
            TraitValue::Flag(_) => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            TraitValue::Flag(b) => Some(*b),
            TraitValue::Text(_) => None,
        }
    }

    fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(TraitValue::Flag(b)),
            serde_json::Value::String(s) => Some(TraitValue::Text(s)),
            _ => None,
        }
    }
}

impl fmt::Display for TraitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraitValue::Flag(b) => write!(f, "{}", b),
            TraitValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for TraitValue {
    fn from(s: &str) -> Self {
        TraitValue::Text(s.to_string())
    }
}

impl From<String> for TraitValue {
    fn from(s: String) -> Self {
        TraitValue::Text(s)
    }
}

impl From<bool> for TraitValue {
    fn from(b: bool) -> Self {
        TraitValue::Flag(b)
    }
}

/// A (possibly partial) avatar configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "BTreeMap<TraitKey, serde_json::Value>")]
pub struct AvatarConfig {
    traits: BTreeMap<TraitCategory, TraitValue>,
}

impl AvatarConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Builder-style insert, handy for literals.
    pub fn with(mut self, category: TraitCategory, value: impl Into<TraitValue>) -> Self {
        self.set(category, value);
        self
    }

    /// Insert a value; returns the previous one. Values of the wrong kind
    /// for the category are ignored.
    pub fn set(&mut self, category: TraitCategory, value: impl Into<TraitValue>) -> Option<TraitValue> {
        let value = value.into();
        if value.kind() != category.kind() {
            debug!(%category, %value, "ignoring value of the wrong kind");
            return None;
        }
        self.traits.insert(category, value)
    }

    pub fn get(&self, category: TraitCategory) -> Option<&TraitValue> {
        self.traits.get(&category)
    }

    pub fn text(&self, category: TraitCategory) -> Option<&str> {
        self.get(category).and_then(TraitValue::as_text)
    }

    pub fn flag(&self, category: TraitCategory) -> Option<bool> {
        self.get(category).and_then(TraitValue::as_flag)
    }

    pub fn remove(&mut self, category: TraitCategory) -> Option<TraitValue> {
        self.traits.remove(&category)
    }

    pub fn contains(&self, category: TraitCategory) -> bool {
        self.traits.contains_key(&category)
    }

    pub fn len(&self) -> usize {
        self.traits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TraitCategory, &TraitValue)> {
        self.traits.iter().map(|(c, v)| (*c, v))
    }

    pub fn retain(&mut self, mut keep: impl FnMut(TraitCategory, &TraitValue) -> bool) {
        self.traits.retain(|c, v| keep(*c, v));
    }

    /// Overlay `self` on `base`: traits present here win.
    pub fn merged_over(&self, base: &AvatarConfig) -> AvatarConfig {
        let mut merged = base.clone();
        merged.traits.extend(self.traits.iter().map(|(c, v)| (*c, v.clone())));
        merged
    }
}

impl Serialize for AvatarConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.traits.serialize(serializer)
    }
}

impl From<BTreeMap<TraitKey, serde_json::Value>> for AvatarConfig {
    fn from(raw: BTreeMap<TraitKey, serde_json::Value>) -> Self {
        let mut config = AvatarConfig::new();
        for (key, value) in raw {
            let category = match key {
                TraitKey::Known(category) => category,
                TraitKey::Unknown(name) => {
                    debug!(key = %name, "dropping unknown trait key");
                    continue;
                }
            };
            match TraitValue::from_json(value) {
                Some(value) => {
                    config.set(category, value);
                }
                None => debug!(%category, "dropping non-scalar trait value"),
            }
        }
        config
    }
}

impl FromIterator<(TraitCategory, TraitValue)> for AvatarConfig {
    fn from_iter<I: IntoIterator<Item = (TraitCategory, TraitValue)>>(iter: I) -> Self {
        let mut config = AvatarConfig::new();
        for (category, value) in iter {
            config.set(category, value);
        }
        config
    }
}
