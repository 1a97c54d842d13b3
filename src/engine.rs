//! Avatar Engine - Single Entry Point
//!
//! CRITICAL: every config leaving the engine has been normalized. No bypass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use thiserror::Error;
use tracing::{debug, info};

use crate::avatar::{AvatarConfig, TraitCategory, TraitValue};
use crate::catalog::{CatalogError, TraitCatalog};
use crate::generator::{self, GenderHint};
use crate::hashing::fingerprint;
use crate::render::{Compositor, RenderError};
use crate::rules::{Resolver, RuleViolation};
use crate::settings::{EngineSettings, SettingsError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Render failed: {0}")]
    RenderFailure(#[from] RenderError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Illegal value for {category}: {value}")]
    IllegalValue { category: TraitCategory, value: TraitValue },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// The payload a caller transmits when the user saves their avatar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAvatar {
    pub config: AvatarConfig,
    pub fingerprint: String,
    pub saved_at: DateTime<Utc>,
}

pub struct AvatarEngine {
    catalog: Cow<'static, TraitCatalog>,
    resolver: Resolver,
    compositor: Compositor,
}

impl AvatarEngine {
    pub fn new(catalog: TraitCatalog, compositor: Compositor) -> Self {
        Self {
            catalog: Cow::Owned(catalog),
            resolver: Resolver::new(),
            compositor,
        }
    }

    /// Builtin catalog with the default compositor.
    pub fn builtin() -> Self {
        Self {
            catalog: Cow::Borrowed(TraitCatalog::builtin()),
            resolver: Resolver::new(),
            compositor: Compositor::default(),
        }
    }

    pub fn from_settings(settings: &EngineSettings) -> Result<Self, EngineError> {
        let catalog = match &settings.catalog_path {
            Some(path) => {
                info!(path = %path.display(), "loading catalog from file");
                Cow::Owned(TraitCatalog::load_from_file(path)?)
            }
            None => Cow::Borrowed(TraitCatalog::builtin()),
        };
        Ok(Self {
            catalog,
            resolver: Resolver::new(),
            compositor: Compositor::new(settings.render_size, settings.uri_encoding)?,
        })
    }

    pub fn with_compositor(mut self, compositor: Compositor) -> Self {
        self.compositor = compositor;
        self
    }

    pub fn catalog(&self) -> &TraitCatalog {
        &self.catalog
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn allowed_values(&self, category: TraitCategory) -> Result<&[TraitValue], EngineError> {
        Ok(self.catalog.allowed_values(category)?)
    }

    pub fn default_config(&self) -> AvatarConfig {
        self.catalog.default_config()
    }

    pub fn normalize(&self, config: &AvatarConfig) -> AvatarConfig {
        self.resolver.normalize(&self.catalog, config)
    }

    pub fn violations(&self, config: &AvatarConfig) -> Vec<RuleViolation> {
        self.resolver.violations(config)
    }

    pub fn generate_random(&self, hint: Option<GenderHint>) -> AvatarConfig {
        generator::generate_random(&self.catalog, hint)
    }

    pub fn generate_random_with<R: rand::Rng + ?Sized>(
        &self,
        hint: Option<GenderHint>,
        rng: &mut R,
    ) -> AvatarConfig {
        generator::generate_random_with(&self.catalog, hint, rng)
    }

    /// Data URI for `config`; missing categories come from the catalog default.
    pub fn render(&self, config: &AvatarConfig) -> Result<String, EngineError> {
        Ok(self.compositor.render(&self.catalog, &self.resolver, config)?)
    }

    pub fn render_svg(&self, config: &AvatarConfig) -> Result<String, EngineError> {
        Ok(self.compositor.render_svg(&self.catalog, &self.resolver, config)?)
    }

    /// Parse a stored avatar blob and normalize it.
    pub fn parse_config(&self, json: &str) -> Result<AvatarConfig, EngineError> {
        let raw = AvatarConfig::from_json(json)?;
        Ok(self.normalize(&raw))
    }

    /// Check a single edit against the catalog before it is applied.
    pub fn check_value(&self, category: TraitCategory, value: &TraitValue) -> Result<(), EngineError> {
        if self.catalog.allowed_values(category)?.contains(value) {
            Ok(())
        } else {
            Err(EngineError::IllegalValue {
                category,
                value: value.clone(),
            })
        }
    }

    pub fn save(&self, config: &AvatarConfig) -> Result<SavedAvatar, EngineError> {
        let config = self.normalize(config);
        let fingerprint = fingerprint(&config)?;
        debug!(%fingerprint, "prepared avatar for saving");
        Ok(SavedAvatar {
            config,
            fingerprint,
            saved_at: Utc::now(),
        })
    }
}

impl Default for AvatarEngine {
    fn default() -> Self {
        Self::builtin()
    }
}
