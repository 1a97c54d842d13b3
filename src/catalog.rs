//! Trait Catalog - Legal Values per Category
//!
//! The catalog is read-only once loaded. The builtin catalog is embedded at
//! compile time and validated on first use.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::info;

use crate::avatar::{AvatarConfig, TraitCategory, TraitValue};
use crate::rules::Resolver;
use crate::ENGINE_VERSION;

const BUILTIN_CATALOG: &str = include_str!("../assets/catalog.json");

static BUILTIN: OnceLock<TraitCatalog> = OnceLock::new();

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Unknown trait category: {0}")]
    UnknownCategory(String),

    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid version string: {0}")]
    InvalidVersion(String),

    #[error("Catalog requires engine >= {0}, current is {1}")]
    EngineVersionMismatch(String, String),

    #[error("Category listed twice: {0}")]
    DuplicateCategory(TraitCategory),

    #[error("Category has no values: {0}")]
    EmptyCategory(TraitCategory),

    #[error("Value {value} has the wrong kind for category {category}")]
    ValueKindMismatch { category: TraitCategory, value: TraitValue },

    #[error("Category {category} must allow {value}, a compatibility rule writes it")]
    MissingRequiredValue { category: TraitCategory, value: TraitValue },

    #[error("Rule {rule} writes {category}, which the catalog does not register")]
    UnregisteredTarget { rule: String, category: TraitCategory },

    #[error("Default configuration breaks rule {0}")]
    InconsistentDefault(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogDocument {
    catalog_version: String,
    engine_min_version: String,
    categories: Vec<CategoryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub name: TraitCategory,
    pub values: Vec<TraitValue>,
}

#[derive(Debug, Clone)]
pub struct TraitCatalog {
    version: semver::Version,
    entries: Vec<CategoryEntry>,
}

impl TraitCatalog {
    /// The catalog shipped with the engine.
    pub fn builtin() -> &'static TraitCatalog {
        BUILTIN.get_or_init(|| {
            TraitCatalog::from_json(BUILTIN_CATALOG).expect("embedded catalog is valid")
        })
    }

    /// A catalog with no categories. Everything generated from it is empty.
    pub fn empty() -> Self {
        Self {
            version: semver::Version::new(0, 0, 0),
            entries: vec![],
        }
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument = serde_json::from_str(json)?;
        let version = parse_version(&doc.catalog_version)?;
        check_engine_version(&doc.engine_min_version)?;
        let catalog = Self::from_entries(version, doc.categories)?;
        info!(
            version = %catalog.version,
            categories = catalog.entries.len(),
            "loaded trait catalog"
        );
        Ok(catalog)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_entries(
        version: semver::Version,
        entries: Vec<CategoryEntry>,
    ) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.name) {
                return Err(CatalogError::DuplicateCategory(entry.name));
            }
            if entry.values.is_empty() {
                return Err(CatalogError::EmptyCategory(entry.name));
            }
            if let Some(bad) = entry.values.iter().find(|v| v.kind() != entry.name.kind()) {
                return Err(CatalogError::ValueKindMismatch {
                    category: entry.name,
                    value: bad.clone(),
                });
            }
        }

        let catalog = Self { version, entries };
        let resolver = Resolver::new();
        for (category, value) in resolver.forced_values() {
            if catalog.is_registered(category) && !catalog.contains(category, &value) {
                return Err(CatalogError::MissingRequiredValue { category, value });
            }
        }
        for rule in resolver.rules() {
            if !rule.triggers().iter().all(|c| catalog.is_registered(*c)) {
                continue;
            }
            if let Some((category, _)) = rule
                .forced_values()
                .into_iter()
                .find(|(category, _)| !catalog.is_registered(*category))
            {
                return Err(CatalogError::UnregisteredTarget {
                    rule: rule.name().to_string(),
                    category,
                });
            }
        }
        if let Some(violation) = resolver.violations(&catalog.default_config()).first() {
            return Err(CatalogError::InconsistentDefault(violation.rule.clone()));
        }
        Ok(catalog)
    }

    pub fn version(&self) -> &semver::Version {
        &self.version
    }

    /// Registered categories in catalog order.
    pub fn categories(&self) -> impl Iterator<Item = TraitCategory> + '_ {
        self.entries.iter().map(|e| e.name)
    }

    pub fn entries(&self) -> &[CategoryEntry] {
        &self.entries
    }

    pub fn allowed_values(&self, category: TraitCategory) -> Result<&[TraitValue], CatalogError> {
        self.entries
            .iter()
            .find(|e| e.name == category)
            .map(|e| e.values.as_slice())
            .ok_or_else(|| CatalogError::UnknownCategory(category.to_string()))
    }

    /// Lookup by wire name, for callers holding an unparsed key.
    pub fn allowed_values_by_name(&self, name: &str) -> Result<&[TraitValue], CatalogError> {
        let category: TraitCategory = name.parse().map_err(CatalogError::UnknownCategory)?;
        self.allowed_values(category)
    }

    pub fn is_registered(&self, category: TraitCategory) -> bool {
        self.entries.iter().any(|e| e.name == category)
    }

    pub fn contains(&self, category: TraitCategory, value: &TraitValue) -> bool {
        self.allowed_values(category)
            .map(|values| values.contains(value))
            .unwrap_or(false)
    }

    /// First legal value of every registered category.
    pub fn default_config(&self) -> AvatarConfig {
        self.entries
            .iter()
            .map(|e| (e.name, e.values[0].clone()))
            .collect()
    }
}

fn parse_version(raw: &str) -> Result<semver::Version, CatalogError> {
    semver::Version::parse(raw).map_err(|_| CatalogError::InvalidVersion(raw.to_string()))
}

fn check_engine_version(min: &str) -> Result<(), CatalogError> {
    let engine_ver = parse_version(ENGINE_VERSION)?;
    let min_ver = parse_version(min)?;
    if engine_ver < min_ver {
        return Err(CatalogError::EngineVersionMismatch(
            min.to_string(),
            ENGINE_VERSION.to_string(),
        ));
    }
    Ok(())
}
