//! Engine Settings - Environment Configuration
//!
//! Missing variables fall back to defaults; malformed ones are errors.

use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use thiserror::Error;
use tracing::{debug, warn};

use crate::render::{UriEncoding, DEFAULT_RENDER_SIZE};

pub const CATALOG_VAR: &str = "AVATAR_CATALOG";
pub const RENDER_SIZE_VAR: &str = "AVATAR_RENDER_SIZE";
pub const URI_ENCODING_VAR: &str = "AVATAR_URI_ENCODING";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Catalog file to load instead of the builtin one.
    pub catalog_path: Option<PathBuf>,
    pub render_size: u32,
    pub uri_encoding: UriEncoding,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            catalog_path: None,
            render_size: DEFAULT_RENDER_SIZE,
            uri_encoding: UriEncoding::Utf8,
        }
    }
}

impl EngineSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; missing keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let defaults = Self::default();
        Ok(Self {
            catalog_path: lookup(CATALOG_VAR)
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            render_size: try_load(&lookup, RENDER_SIZE_VAR, defaults.render_size)?,
            uri_encoding: try_load(&lookup, URI_ENCODING_VAR, defaults.uri_encoding)?,
        })
    }
}

fn try_load<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, SettingsError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        debug!("{key} not set, using default: {default}");
        return Ok(default);
    };
    raw.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        SettingsError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = EngineSettings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, EngineSettings::default());
    }

    #[test]
    fn test_reads_all_keys() {
        let settings = EngineSettings::from_lookup(lookup(&[
            (CATALOG_VAR, "/etc/avatar/catalog.json"),
            (RENDER_SIZE_VAR, " 128 "),
            (URI_ENCODING_VAR, "BASE64"),
        ]))
        .unwrap();
        assert_eq!(settings.catalog_path, Some(PathBuf::from("/etc/avatar/catalog.json")));
        assert_eq!(settings.render_size, 128);
        assert_eq!(settings.uri_encoding, UriEncoding::Base64);
    }

    #[test]
    fn test_malformed_value_is_an_error() {
        let err = EngineSettings::from_lookup(lookup(&[(RENDER_SIZE_VAR, "huge")])).unwrap_err();
        assert!(err.to_string().contains(RENDER_SIZE_VAR));
    }

    #[test]
    fn test_blank_catalog_path_ignored() {
        let settings = EngineSettings::from_lookup(lookup(&[(CATALOG_VAR, "  ")])).unwrap();
        assert_eq!(settings.catalog_path, None);
    }
}
