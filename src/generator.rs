//! Random Configuration Generator
//!
//! Every category is sampled independently and uniformly, then normalized.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::avatar::{AvatarConfig, TraitCategory, TraitValue};
use crate::catalog::TraitCatalog;
use crate::rules::Resolver;

/// Seeds the body trait; mouth and lashes follow through the rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenderHint {
    Male,
    Female,
}

impl GenderHint {
    pub fn body(&self) -> &'static str {
        match self {
            GenderHint::Male => "chest",
            GenderHint::Female => "breasts",
        }
    }
}

impl fmt::Display for GenderHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenderHint::Male => f.write_str("male"),
            GenderHint::Female => f.write_str("female"),
        }
    }
}

impl FromStr for GenderHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "male" => Ok(GenderHint::Male),
            "female" => Ok(GenderHint::Female),
            other => Err(format!("unknown gender hint: {}", other)),
        }
    }
}

pub fn generate_random(catalog: &TraitCatalog, hint: Option<GenderHint>) -> AvatarConfig {
    generate_random_with(catalog, hint, &mut rand::thread_rng())
}

pub fn generate_random_with<R: Rng + ?Sized>(
    catalog: &TraitCatalog,
    hint: Option<GenderHint>,
    rng: &mut R,
) -> AvatarConfig {
    let mut config = AvatarConfig::new();

    for entry in catalog.entries() {
        if let Some(value) = entry.values.choose(rng) {
            config.set(entry.name, value.clone());
        }
    }

    if let Some(hint) = hint {
        let body = TraitValue::from(hint.body());
        if catalog.contains(TraitCategory::Body, &body) {
            config.set(TraitCategory::Body, body);
        } else {
            debug!(%hint, "catalog has no body for hint, keeping uniform pick");
        }
    }

    Resolver::new().normalize(catalog, &config)
}
