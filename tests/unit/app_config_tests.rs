/*!
 * Tests for application configuration
 */

use anyhow::Result;

use ebook_translator::app_config::{Config, EnginePreferences, LogLevel, RuleMode, Sampling, TranslationPosition};
use crate::common;

/// Test that an empty JSON object yields the defaults
#[test]
fn test_load_withEmptyObject_shouldUseDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{}")?;

    let config = Config::load(&path)?;

    assert_eq!(config.translate_engine, "Google(Free)New");
    assert_eq!(config.translation_position, TranslationPosition::Below);
    assert_eq!(config.rule_mode, RuleMode::Normal);
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.cache_enabled);
    assert!(config.condense_repeats);
    assert_eq!(config.effective_merge_length(), None);
    Ok(())
}

#[test]
fn test_load_withMalformedJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;
    assert!(Config::load(&path).is_err());
    assert!(Config::load(temp_dir.path().join("missing.json")).is_err());
    Ok(())
}

/// Test that both sampling values without a choice are rejected
#[test]
fn test_validate_withTemperatureAndTopP_shouldRequireSampling() {
    let mut config = Config::default();
    *config.preferences_mut("ChatGPT") = EnginePreferences {
        temperature: Some(0.7),
        top_p: Some(0.9),
        ..EnginePreferences::default()
    };
    assert!(config.validate().is_err());

    config.preferences_mut("ChatGPT").sampling = Some(Sampling::Temperature);
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_withExcessiveConcurrency_shouldFail() {
    let mut config = Config::default();
    config.preferences_mut("Claude").concurrency_limit = Some(65);
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withInvalidIntervalSeconds_shouldFail() {
    let mut config = Config::default();
    config.preferences_mut("DeepL").request_interval = Some(-0.5);
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.preferences_mut("DeepL").request_timeout = Some(f64::INFINITY);
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.preferences_mut("DeepL").request_interval = Some(1.5);
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_withBlankColorOrEngine_shouldFail() {
    let blank_color = Config {
        translation_color: Some("  ".to_string()),
        ..Config::default()
    };
    assert!(blank_color.validate().is_err());

    let blank_engine = Config {
        translate_engine: String::new(),
        ..Config::default()
    };
    assert!(blank_engine.validate().is_err());
}

/// Test that custom engine definitions survive a save/load cycle
#[test]
fn test_save_withCustomEngines_shouldPersistDefinitions() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");
    let mut config = Config::default();
    config
        .custom_engines
        .insert("Sample Engine".to_string(), std::fs::read_to_string(common::sample_path("custom_engine.json"))?);
    config.translation_position = TranslationPosition::Left;
    config.save(&path)?;

    let loaded = Config::load(&path)?;

    assert_eq!(loaded.translation_position, TranslationPosition::Left);
    assert!(loaded.custom_engines["Sample Engine"].contains("translate.example.com"));
    Ok(())
}
