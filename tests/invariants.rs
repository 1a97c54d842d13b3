//! Contract Invariant Tests
//!
//! These tests verify the non-negotiable guarantees.

use std::io::Write;

use avatar_core::{
    generate_random_with, normalize, render, AvatarConfig, AvatarEngine, EngineSettings,
    GenderHint, Resolver, TraitCatalog, TraitCategory, TraitValue,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::json;

fn catalog() -> &'static TraitCatalog {
    TraitCatalog::builtin()
}

/// Arbitrary configs, including illegal values, foreign kinds and missing traits.
fn arbitrary_config(rng: &mut StdRng) -> AvatarConfig {
    let mut config = AvatarConfig::new();
    for entry in catalog().entries() {
        match rng.gen_range(0..4) {
            0 => {}
            1 => {
                let junk = match entry.name {
                    TraitCategory::Lashes => TraitValue::Flag(rng.gen()),
                    _ => TraitValue::from(format!("junk-{}", rng.gen::<u8>())),
                };
                config.set(entry.name, junk);
            }
            _ => {
                if let Some(value) = entry.values.choose(rng) {
                    config.set(entry.name, value.clone());
                }
            }
        }
    }
    config
}

fn assert_rules_hold(config: &AvatarConfig) {
    let violations = Resolver::new().violations(config);
    assert!(violations.is_empty(), "{:?} breaks {:?}", config, violations);
}

#[test]
fn invariant_normalize_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..500 {
        let once = normalize(catalog(), &arbitrary_config(&mut rng));
        let twice = normalize(catalog(), &once);
        assert_eq!(once, twice);
    }
}

#[test]
fn invariant_normalize_closes_over_rules() {
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..500 {
        let normalized = normalize(catalog(), &arbitrary_config(&mut rng));
        assert_rules_hold(&normalized);
        if normalized.text(TraitCategory::Hat) == Some("hijab") {
            assert_eq!(normalized.text(TraitCategory::Hair), Some("pixie"));
        }
        for (category, value) in normalized.iter() {
            assert!(catalog().contains(category, value), "{} = {} not cataloged", category, value);
        }
    }
}

#[test]
fn invariant_every_hair_hat_body_combination_resolves() {
    let hairs = catalog().allowed_values(TraitCategory::Hair).unwrap();
    let hats = catalog().allowed_values(TraitCategory::Hat).unwrap();
    let bodies = catalog().allowed_values(TraitCategory::Body).unwrap();
    for hair in hairs {
        for hat in hats {
            for body in bodies {
                let config = AvatarConfig::new()
                    .with(TraitCategory::Hair, hair.clone())
                    .with(TraitCategory::Hat, hat.clone())
                    .with(TraitCategory::Body, body.clone());
                let normalized = normalize(catalog(), &config);
                assert_rules_hold(&normalized);
                assert_eq!(normalize(catalog(), &normalized), normalized);
            }
        }
    }
}

#[test]
fn invariant_random_generation_covers_catalog() {
    let mut rng = StdRng::seed_from_u64(5);
    for hint in [Some(GenderHint::Male), Some(GenderHint::Female), None] {
        for _ in 0..100 {
            let config = generate_random_with(catalog(), hint, &mut rng);
            assert_rules_hold(&config);
            for category in catalog().categories() {
                let value = config.get(category).unwrap_or_else(|| panic!("{} missing", category));
                assert!(catalog().contains(category, value));
            }
        }
    }
}

#[test]
fn invariant_male_hint_pins_body() {
    let engine = AvatarEngine::builtin();
    for _ in 0..100 {
        let config = engine.generate_random(Some(GenderHint::Male));
        assert_eq!(config.text(TraitCategory::Body), Some("chest"));
        assert_eq!(config.text(TraitCategory::Mouth), Some("openSmile"));
        assert_eq!(config.flag(TraitCategory::Lashes), Some(false));
        assert_rules_hold(&config);
    }
}

#[test]
fn invariant_empty_config_renders_as_default() {
    let empty = render(catalog(), &AvatarConfig::new()).unwrap();
    let default = render(catalog(), &catalog().default_config()).unwrap();
    assert_eq!(empty, default);
}

#[test]
fn invariant_uncataloged_value_renders_as_default() {
    let config = AvatarConfig::new().with(TraitCategory::Hair, "mullet");
    assert_eq!(
        render(catalog(), &config).unwrap(),
        render(catalog(), &AvatarConfig::new()).unwrap()
    );
}

#[test]
fn invariant_unknown_keys_dropped() {
    let config: AvatarConfig =
        serde_json::from_value(json!({ "bogusKey": "x", "hair": "pixie" })).unwrap();
    let normalized = normalize(catalog(), &config);
    assert_eq!(normalized.text(TraitCategory::Hair), Some("pixie"));
    assert_eq!(serde_json::to_value(&normalized).unwrap(), json!({ "hair": "pixie" }));
}

#[test]
fn scenario_hijab_forces_pixie() {
    let config = AvatarConfig::from_json(r#"{ "hat": "hijab", "hair": "long" }"#).unwrap();
    let normalized = normalize(catalog(), &config);
    assert_eq!(normalized.text(TraitCategory::Hair), Some("pixie"));
    assert_eq!(normalized.text(TraitCategory::Hat), Some("hijab"));
}

/// Pins the current precedence: the hat rule runs first, then long hair clears a blocking hat.
#[test]
fn scenario_bob_under_beanie_clears_hat() {
    let config = AvatarConfig::from_json(r#"{ "hair": "bob", "hat": "beanie" }"#).unwrap();
    let normalized = normalize(catalog(), &config);
    assert_eq!(normalized.text(TraitCategory::Hair), Some("bob"));
    assert_eq!(normalized.text(TraitCategory::Hat), Some("none"));
}

#[test]
fn scenario_breasts_force_lips_and_lashes() {
    let config = AvatarConfig::from_json(
        r#"{ "body": "breasts", "mouth": "openSmile", "lashes": false }"#,
    )
    .unwrap();
    let normalized = normalize(catalog(), &config);
    assert_eq!(
        serde_json::to_value(&normalized).unwrap(),
        json!({ "body": "breasts", "mouth": "lips", "lashes": true })
    );
}

#[test]
fn invariant_custom_catalog_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "{}",
        json!({
            "catalogVersion": "1.2.0",
            "engineMinVersion": "1.0.0",
            "categories": [
                { "name": "hair", "values": ["buzzcut", "pixie", "long"] },
                { "name": "hat", "values": ["none", "turban"] },
                { "name": "backgroundShape", "values": ["square"] }
            ]
        })
    )
    .unwrap();

    let settings = EngineSettings {
        catalog_path: Some(file.path().to_path_buf()),
        ..EngineSettings::default()
    };
    let engine = AvatarEngine::from_settings(&settings).unwrap();
    assert_eq!(engine.catalog().version().to_string(), "1.2.0");
    assert!(engine.allowed_values(TraitCategory::Eyes).is_err());

    let config = engine.generate_random(None);
    assert_eq!(config.len(), 3);
    assert!(engine.render(&AvatarConfig::new()).is_ok());

    let normalized = engine.normalize(&AvatarConfig::new()
        .with(TraitCategory::Hair, "long")
        .with(TraitCategory::Hat, "turban")
        .with(TraitCategory::Eyes, "open"));
    assert_eq!(
        serde_json::to_value(&normalized).unwrap(),
        json!({ "hair": "long", "hat": "none" })
    );

    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..200 {
        let normalized = engine.normalize(&arbitrary_config(&mut rng));
        for (category, value) in normalized.iter() {
            assert!(engine.catalog().contains(category, value), "{} = {} not cataloged", category, value);
        }
    }
}

#[test]
fn invariant_catalog_without_rule_target_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "{}",
        json!({
            "catalogVersion": "1.0.0",
            "engineMinVersion": "1.0.0",
            "categories": [{ "name": "hat", "values": ["none", "hijab"] }]
        })
    )
    .unwrap();

    let settings = EngineSettings {
        catalog_path: Some(file.path().to_path_buf()),
        ..EngineSettings::default()
    };
    let err = AvatarEngine::from_settings(&settings).err().unwrap();
    assert!(err.to_string().contains("does not register"));
}

#[test]
fn invariant_missing_catalog_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let settings = EngineSettings {
        catalog_path: Some(dir.path().join("absent.json")),
        ..EngineSettings::default()
    };
    let err = AvatarEngine::from_settings(&settings).err().unwrap();
    assert!(err.to_string().contains("Failed to read catalog"));
}
