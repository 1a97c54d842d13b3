//! Constraint Resolver - Compatibility Rules
//!
//! Rules report violations and know how to repair them.
//! The resolver applies them in a fixed order, so normalization is deterministic.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::avatar::{AvatarConfig, TraitCategory, TraitValue};
use crate::catalog::TraitCatalog;

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static NORMALIZE_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_normalize_call_count() -> u32 {
    NORMALIZE_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_normalize_call_count() {
    NORMALIZE_CALL_COUNT.store(0, Ordering::SeqCst);
}

pub const FALLBACK_HAIR: &str = "pixie";
pub const NO_HAT: &str = "none";
pub const LONG_HAIR_STYLES: &[&str] = &["long", "bob"];
pub const BLOCKING_HATS: &[&str] = &["beanie", "turban"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleViolation {
    pub rule: String,
    pub message: String,
    pub category: TraitCategory,
    pub expected: TraitValue,
    pub actual: Option<TraitValue>,
}

/// A rewrite rule over an avatar configuration.
pub trait CompatibilityRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// The trait this rule would rewrite, and the value it requires, if it fires.
    fn requirement(&self, config: &AvatarConfig) -> Option<(TraitCategory, TraitValue)>;

    /// Categories this rule reads; it can only fire when all of them are present.
    fn triggers(&self) -> &'static [TraitCategory];

    /// Every value this rule can write. A catalog registering the category must allow them.
    fn forced_values(&self) -> Vec<(TraitCategory, TraitValue)>;

    fn check(&self, config: &AvatarConfig) -> Option<RuleViolation> {
        let (category, expected) = self.requirement(config)?;
        let actual = config.get(category);
        if actual == Some(&expected) {
            return None;
        }
        Some(RuleViolation {
            rule: self.name().to_string(),
            message: format!("{} must be {}", category, expected),
            category,
            expected,
            actual: actual.cloned(),
        })
    }

    /// Repair the config in place; returns whether anything changed.
    fn apply(&self, config: &mut AvatarConfig) -> bool {
        match self.check(config) {
            Some(violation) => {
                debug!(
                    rule = self.name(),
                    category = %violation.category,
                    value = %violation.expected,
                    "rewriting trait"
                );
                config.set(violation.category, violation.expected);
                true
            }
            None => false,
        }
    }
}

fn is_text(config: &AvatarConfig, category: TraitCategory, value: &str) -> bool {
    config.text(category) == Some(value)
}

fn is_one_of(config: &AvatarConfig, category: TraitCategory, set: &[&str]) -> bool {
    config.text(category).map_or(false, |v| set.contains(&v))
}

// --- Concrete Rules ---

/// A hijab covers the hair entirely; only the short fallback style fits under it.
pub struct HijabHairRule;

impl CompatibilityRule for HijabHairRule {
    fn name(&self) -> &'static str { "hijab_hair" }

    fn triggers(&self) -> &'static [TraitCategory] { &[TraitCategory::Hat] }

    fn requirement(&self, config: &AvatarConfig) -> Option<(TraitCategory, TraitValue)> {
        is_text(config, TraitCategory::Hat, "hijab")
            .then(|| (TraitCategory::Hair, TraitValue::from(FALLBACK_HAIR)))
    }

    fn forced_values(&self) -> Vec<(TraitCategory, TraitValue)> {
        vec![(TraitCategory::Hair, TraitValue::from(FALLBACK_HAIR))]
    }
}

/// Long styles clip through tight hats; the hat gives way.
pub struct LongHairHatRule;

impl CompatibilityRule for LongHairHatRule {
    fn name(&self) -> &'static str { "long_hair_hat" }

    fn triggers(&self) -> &'static [TraitCategory] { &[TraitCategory::Hair, TraitCategory::Hat] }

    fn requirement(&self, config: &AvatarConfig) -> Option<(TraitCategory, TraitValue)> {
        (is_one_of(config, TraitCategory::Hair, LONG_HAIR_STYLES)
            && is_one_of(config, TraitCategory::Hat, BLOCKING_HATS))
            .then(|| (TraitCategory::Hat, TraitValue::from(NO_HAT)))
    }

    fn forced_values(&self) -> Vec<(TraitCategory, TraitValue)> {
        vec![(TraitCategory::Hat, TraitValue::from(NO_HAT))]
    }
}

pub struct BodyMouthRule;

impl CompatibilityRule for BodyMouthRule {
    fn name(&self) -> &'static str { "body_mouth" }

    fn triggers(&self) -> &'static [TraitCategory] { &[TraitCategory::Body] }

    fn requirement(&self, config: &AvatarConfig) -> Option<(TraitCategory, TraitValue)> {
        let mouth = match config.text(TraitCategory::Body)? {
            "breasts" => "lips",
            "chest" => "openSmile",
            _ => return None,
        };
        Some((TraitCategory::Mouth, TraitValue::from(mouth)))
    }

    fn forced_values(&self) -> Vec<(TraitCategory, TraitValue)> {
        vec![
            (TraitCategory::Mouth, TraitValue::from("lips")),
            (TraitCategory::Mouth, TraitValue::from("openSmile")),
        ]
    }
}

pub struct BodyLashesRule;

impl CompatibilityRule for BodyLashesRule {
    fn name(&self) -> &'static str { "body_lashes" }

    fn triggers(&self) -> &'static [TraitCategory] { &[TraitCategory::Body] }

    fn requirement(&self, config: &AvatarConfig) -> Option<(TraitCategory, TraitValue)> {
        let lashes = match config.text(TraitCategory::Body)? {
            "breasts" => true,
            "chest" => false,
            _ => return None,
        };
        Some((TraitCategory::Lashes, TraitValue::from(lashes)))
    }

    fn forced_values(&self) -> Vec<(TraitCategory, TraitValue)> {
        vec![
            (TraitCategory::Lashes, TraitValue::from(true)),
            (TraitCategory::Lashes, TraitValue::from(false)),
        ]
    }
}

/// Resolver applies rules in their fixed order.
pub struct Resolver {
    rules: Vec<Box<dyn CompatibilityRule>>,
}

impl Resolver {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(HijabHairRule),
                Box::new(LongHairHatRule),
                Box::new(BodyMouthRule),
                Box::new(BodyLashesRule),
            ],
        }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn CompatibilityRule> + '_ {
        self.rules.iter().map(|rule| &**rule)
    }

    pub fn forced_values(&self) -> Vec<(TraitCategory, TraitValue)> {
        self.rules.iter().flat_map(|r| r.forced_values()).collect()
    }

    /// Every rule the config currently breaks, in rule order.
    pub fn violations(&self, config: &AvatarConfig) -> Vec<RuleViolation> {
        self.rules.iter().filter_map(|r| r.check(config)).collect()
    }

    /// Drop unregistered categories and illegal values, then apply every rule once.
    pub fn normalize(&self, catalog: &TraitCatalog, config: &AvatarConfig) -> AvatarConfig {
        #[cfg(feature = "test-hooks")]
        NORMALIZE_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        let mut normalized = sanitize(catalog, config);
        for rule in &self.rules {
            rule.apply(&mut normalized);
        }
        normalized
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep only traits the catalog registers with a legal value.
pub fn sanitize(catalog: &TraitCatalog, config: &AvatarConfig) -> AvatarConfig {
    let mut sanitized = config.clone();
    sanitized.retain(|category, value| {
        let legal = catalog.contains(category, value);
        if !legal {
            debug!(%category, %value, "dropping trait not in catalog");
        }
        legal
    });
    sanitized
}

pub fn normalize(catalog: &TraitCatalog, config: &AvatarConfig) -> AvatarConfig {
    Resolver::new().normalize(catalog, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin() -> &'static TraitCatalog {
        TraitCatalog::builtin()
    }

    #[test]
    fn test_rule_order_is_fixed() {
        assert_eq!(
            Resolver::new().rule_names(),
            vec!["hijab_hair", "long_hair_hat", "body_mouth", "body_lashes"]
        );
    }

    #[test]
    fn test_hijab_forces_pixie() {
        let config = AvatarConfig::new()
            .with(TraitCategory::Hat, "hijab")
            .with(TraitCategory::Hair, "long");
        let out = normalize(builtin(), &config);
        assert_eq!(out.text(TraitCategory::Hair), Some("pixie"));
        assert_eq!(out.text(TraitCategory::Hat), Some("hijab"));
    }

    #[test]
    fn test_hijab_inserts_missing_hair() {
        let config = AvatarConfig::new().with(TraitCategory::Hat, "hijab");
        let out = normalize(builtin(), &config);
        assert_eq!(out.text(TraitCategory::Hair), Some("pixie"));
    }

    #[test]
    fn test_long_hair_clears_blocking_hat() {
        for hair in LONG_HAIR_STYLES {
            for hat in BLOCKING_HATS {
                let config = AvatarConfig::new()
                    .with(TraitCategory::Hair, *hair)
                    .with(TraitCategory::Hat, *hat);
                let out = normalize(builtin(), &config);
                assert_eq!(out.text(TraitCategory::Hair), Some(*hair));
                assert_eq!(out.text(TraitCategory::Hat), Some(NO_HAT));
            }
        }
    }

    #[test]
    fn test_short_hair_keeps_hat() {
        let config = AvatarConfig::new()
            .with(TraitCategory::Hair, "buzzcut")
            .with(TraitCategory::Hat, "beanie");
        assert_eq!(normalize(builtin(), &config), config);
    }

    #[test]
    fn test_body_drives_mouth_and_lashes() {
        let chest = AvatarConfig::new()
            .with(TraitCategory::Body, "chest")
            .with(TraitCategory::Mouth, "lips")
            .with(TraitCategory::Lashes, true);
        let out = normalize(builtin(), &chest);
        assert_eq!(out.text(TraitCategory::Mouth), Some("openSmile"));
        assert_eq!(out.flag(TraitCategory::Lashes), Some(false));
    }

    #[test]
    fn test_illegal_values_dropped() {
        let config = AvatarConfig::new()
            .with(TraitCategory::Hair, "mullet")
            .with(TraitCategory::Eyes, "wink");
        let out = normalize(builtin(), &config);
        assert!(!out.contains(TraitCategory::Hair));
        assert_eq!(out.text(TraitCategory::Eyes), Some("wink"));
    }

    #[test]
    fn test_violations_report_without_mutating() {
        let config = AvatarConfig::new()
            .with(TraitCategory::Body, "breasts")
            .with(TraitCategory::Mouth, "smirk");
        let violations = Resolver::new().violations(&config);
        let rules: Vec<_> = violations.iter().map(|v| v.rule.as_str()).collect();
        assert_eq!(rules, vec!["body_mouth", "body_lashes"]);
        assert_eq!(violations[0].actual, Some(TraitValue::from("smirk")));
        assert_eq!(violations[1].actual, None);
    }
}
