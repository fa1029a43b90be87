/*!
 * Tests for engine plumbing: registry, placeholders and stream parsing
 */

use anyhow::Result;
use bytes::Bytes;
use futures::stream;
use std::collections::HashSet;

use ebook_translator::app_config::{Config, EnginePreferences};
use ebook_translator::engines::stream::{chatgpt_frame, claude_frame, drain, lines, parse_frames};
use ebook_translator::engines::{builtin_names, EngineRegistry, Placeholder};
use ebook_translator::errors::EngineError;
use crate::common;

fn chunks(parts: &[&'static str]) -> Vec<Result<Bytes, std::io::Error>> {
    parts.iter().map(|part| Ok(Bytes::from_static(part.as_bytes()))).collect()
}

/// Test that a ChatGPT event stream cut mid-JSON still yields every delta
#[tokio::test]
async fn test_chatgptStream_withChunksSplittingEvents_shouldYieldText() -> Result<()> {
    let body = chunks(&[
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\ndata: {\"choices\":[{\"del",
        "ta\":{\"content\":\"Bon\"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"jour\"}}]}\n\n",
        "data: [DONE]\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
    ]);

    let text = drain(parse_frames(lines(stream::iter(body)), chatgpt_frame)).await?;

    assert_eq!(text, "Bonjour");
    Ok(())
}

#[tokio::test]
async fn test_chatgptStream_withErrorPayload_shouldFail() {
    let body = chunks(&["data: {\"error\":{\"message\":\"quota exceeded\"}}\n\n"]);
    let result = drain(parse_frames(lines(stream::iter(body)), chatgpt_frame)).await;
    match result {
        Err(EngineError::UnexpectedResult(message)) => assert!(message.contains("quota exceeded")),
        other => panic!("expected an error, got {:?}", other),
    }
}

/// Test that a Claude stream ignores bookkeeping events
#[tokio::test]
async fn test_claudeStream_withBookkeepingEvents_shouldYieldOnlyText() -> Result<()> {
    let body = chunks(&[
        "event: message_start\ndata: {\"type\":\"message_start\"}\n\n",
        "event: ping\ndata: {\"type\":\"ping\"}\n\n",
        "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"Sa\"}}\n\n",
        "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"lut\"}}\n\n",
        "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n",
    ]);

    let text = drain(parse_frames(lines(stream::iter(body)), claude_frame)).await?;

    assert_eq!(text, "Salut");
    Ok(())
}

#[test]
fn test_builtinNames_shouldBeUnique() {
    let names = builtin_names();
    let unique: HashSet<&str> = names.iter().copied().collect();
    assert_eq!(unique.len(), names.len());
    assert!(names.contains(&"DeepL"));
    assert!(names.contains(&"ChatGPT"));
}

/// Test that a custom engine declared in the config can be created by name
#[test]
fn test_registry_withSampleCustomEngine_shouldCreateIt() -> Result<()> {
    let mut config = Config::default();
    config.custom_engines.insert(
        "Sample Engine".to_string(),
        std::fs::read_to_string(common::sample_path("custom_engine.json"))?,
    );
    config.translate_engine = "Sample Engine".to_string();
    config.preferences_mut("Sample Engine").target_lang = Some("French".to_string());

    let registry = EngineRegistry::from_config(&config);
    assert!(registry.names().contains(&"Sample Engine".to_string()));

    let engine = registry.create_from_config(&config)?;
    assert_eq!(engine.name(), "Sample Engine");
    assert_eq!(engine.target_lang(), "French");
    Ok(())
}

#[test]
fn test_registry_withUnsupportedTargetLanguage_shouldFail() -> Result<()> {
    let mut definitions = std::collections::HashMap::new();
    definitions.insert(
        "Sample Engine".to_string(),
        std::fs::read_to_string(common::sample_path("custom_engine.json"))?,
    );
    let registry = EngineRegistry::new(&definitions);
    let preferences = EnginePreferences {
        target_lang: Some("Klingon".to_string()),
        ..EnginePreferences::default()
    };
    let result = registry.create("Sample Engine", &preferences, None);
    assert!(matches!(result, Err(EngineError::UnsupportedLanguage(_))));
    Ok(())
}

/// Test that engine-specific placeholder templates match loose spellings
#[test]
fn test_placeholder_withCustomTemplates_shouldRoundTrip() -> Result<()> {
    let placeholder = Placeholder::new("<m id={} />", r"<\s*m\s+id\s*=\s*{}\s*/?\s*>")?;

    let token = placeholder.render_reserve(3);
    assert_eq!(token, "<m id=00003 />");
    assert!(placeholder.reserve_matcher(3)?.is_match("texte <m id = 00003> suite"));
    assert!(!placeholder.reserve_matcher(4)?.is_match(&token));
    assert!(Placeholder::new("no slot", "{}").is_err());
    Ok(())
}
