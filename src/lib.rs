//! Avatar Core - Avatar Configuration Engine
//!
//! # Guarantees
//! 1. The Catalog Is Law: only cataloged values survive normalization
//! 2. Rules Always Hold: no returned or rendered avatar breaks a compatibility rule
//! 3. Normalization Is Idempotent
//! 4. Partial Configs Render: missing traits come from the catalog default
//! 5. Unknown Keys Are Tolerated, Never Persisted

pub mod avatar;
pub mod catalog;
pub mod rules;
pub mod generator;
pub mod render;
pub mod hashing;
pub mod events;
pub mod settings;
pub mod engine;
pub mod editor;

pub use avatar::{AvatarConfig, TraitCategory, TraitKey, TraitValue, ValueKind};
pub use catalog::{CatalogError, TraitCatalog};
pub use rules::{normalize, CompatibilityRule, Resolver, RuleViolation};
pub use generator::{generate_random, generate_random_with, GenderHint};
pub use render::{data_uri, render, Compositor, RenderError, UriEncoding};
pub use hashing::{canonical_json, fingerprint};
pub use events::{EventBus, ProfileEvent, Subscription};
pub use settings::{EngineSettings, SettingsError};
pub use engine::{AvatarEngine, EngineError, SavedAvatar};
pub use editor::AvatarEditor;

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
