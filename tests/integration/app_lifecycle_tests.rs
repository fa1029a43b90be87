/*!
 * Full app lifecycle tests
 */

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ebook_translator::app_config::{Config, TranslationPosition};
use ebook_translator::app_controller::{Controller, JobOptions};
use ebook_translator::cache::CacheDirectory;
use ebook_translator::engines::mock::{MockBehavior, MockEngine};
use ebook_translator::engines::{Engine, Pacing};

use crate::common;
use crate::common::mock_engines::ScriptedEngine;

fn options(book_dir: &Path, output_dir: &Path) -> JobOptions {
    JobOptions {
        input_dir: book_dir.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        ..JobOptions::default()
    }
}

fn four_paragraph_book(dir: &Path) -> std::path::PathBuf {
    common::create_test_book(dir, &[("text/ch1.xhtml", "<p>One</p><p>Two</p><p>Three</p><p>Four</p>")]).unwrap()
}

#[test]
fn test_withConfig_withBlankEngine_shouldFail() {
    let config = Config {
        translate_engine: "  ".to_string(),
        ..Config::default()
    };
    assert!(Controller::with_config(config).is_err());
}

#[test]
fn test_runWithEngine_withMissingInputDir_shouldFail() {
    let temp_dir = common::create_temp_dir().unwrap();
    let controller = Controller::with_config(common::test_config(temp_dir.path())).unwrap();
    let engine: Arc<dyn Engine> = Arc::new(ScriptedEngine::new(&[]));

    let result = tokio_test::block_on(async {
        controller
            .run_with_engine(engine, &options(&temp_dir.path().join("missing"), &temp_dir.path().join("out")))
            .await
    });

    let error = result.unwrap_err();
    assert!(error.to_string().contains("Input directory does not exist"));
}

#[test]
fn test_registry_withCustomEngineInConfig_shouldListAfterBuiltins() {
    let temp_dir = common::create_temp_dir().unwrap();
    let mut config = common::test_config(temp_dir.path());
    let definition = fs::read_to_string(common::sample_path("custom_engine.json")).unwrap();
    config.custom_engines = HashMap::from([
        ("Sample Engine".to_string(), definition),
        ("Broken".to_string(), "{not json".to_string()),
    ]);
    let controller = Controller::with_config(config).unwrap();

    let names = controller.registry().names();
    assert_eq!(names.last().map(String::as_str), Some("Sample Engine"));
    assert!(names.iter().any(|name| name == "Google(Free)New"));
    assert!(!names.iter().any(|name| name == "Broken"));
}

#[tokio::test]
async fn test_runWithEngine_afterCancel_shouldResumeFromCache() {
    let temp_dir = common::create_temp_dir().unwrap();
    let book_dir = four_paragraph_book(temp_dir.path());
    let controller = Controller::with_config(common::test_config(temp_dir.path())).unwrap();
    let job = options(&book_dir, &temp_dir.path().join("out"));

    let interrupted = ScriptedEngine::new(&[])
        .delay(Duration::from_millis(50))
        .cancel_at(2, controller.cancel_handle());
    let first = controller.run_with_engine(Arc::new(interrupted), &job).await.unwrap();
    assert!(first.canceled);
    assert_eq!(first.paragraphs, 4);
    assert_eq!(first.translated, 1);
    assert!(!job.output_dir.exists());

    let resumed = ScriptedEngine::new(&[]);
    let tracker = resumed.tracker();
    let second = controller.run_with_engine(Arc::new(resumed), &job).await.unwrap();
    assert!(!second.canceled);
    assert_eq!(second.failed, 0);
    assert_eq!(second.cached, 1);
    assert_eq!(second.translated, 3);
    assert_eq!(tracker.lock().requests, vec!["Two", "Three", "Four"]);

    let page = fs::read_to_string(job.output_dir.join("text/ch1.xhtml")).unwrap();
    for word in ["One", "Two", "Three", "Four"] {
        assert!(page.contains(&format!("[TRANSLATED] {}", word)));
    }
}

#[tokio::test]
async fn test_runWithEngine_withFailingEngine_shouldCountFailuresAndKeepPacing() {
    let temp_dir = common::create_temp_dir().unwrap();
    let book_dir = common::create_test_book(temp_dir.path(), &[("text/ch1.xhtml", "<p>One</p><p>Two</p>")]).unwrap();
    let controller = Controller::with_config(common::test_config(temp_dir.path())).unwrap();
    let job = options(&book_dir, &temp_dir.path().join("out"));

    let failing = MockEngine::builder(MockBehavior::Failing)
        .pacing(Pacing {
            request_attempt: 0,
            request_interval: Duration::from_millis(200),
            ..Pacing::default()
        })
        .build()
        .unwrap();
    let count = failing.request_count();
    let start = Instant::now();
    let summary = controller.run_with_engine(Arc::new(failing), &job).await.unwrap();

    assert_eq!(summary.cached, 0);
    assert_eq!(summary.translated, 0);
    assert_eq!(summary.failed, 2);
    assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 2);
    assert!(start.elapsed() >= Duration::from_millis(200));

    let retry = ScriptedEngine::new(&[]);
    let tracker = retry.tracker();
    let second = controller.run_with_engine(Arc::new(retry), &job).await.unwrap();
    assert_eq!(second.cached, 0);
    assert_eq!(second.translated, 2);
    assert_eq!(tracker.lock().requests, vec!["One", "Two"]);

    let third = controller
        .run_with_engine(Arc::new(ScriptedEngine::new(&[])), &job)
        .await
        .unwrap();
    assert_eq!(third.cached, 2);
}

#[tokio::test]
async fn test_cacheDirectory_afterJob_shouldListAndMoveCache() {
    let temp_dir = common::create_temp_dir().unwrap();
    let book_dir = four_paragraph_book(temp_dir.path());
    let controller = Controller::with_config(common::test_config(temp_dir.path())).unwrap();
    let job = options(&book_dir, &temp_dir.path().join("out"));
    controller
        .run_with_engine(Arc::new(ScriptedEngine::new(&[])), &job)
        .await
        .unwrap();

    let mut directory = controller.cache_directory();
    let entries = directory.list().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].engine, "Scripted");
    assert_eq!(entries[0].lang, "English");
    assert_eq!(entries[0].merge, "0");
    assert!(entries[0].filename.ends_with(".db"));

    let moved = directory.move_to(temp_dir.path().join("moved")).unwrap();
    assert!(CacheDirectory::new(temp_dir.path().join("cache")).list().unwrap().is_empty());
    assert_eq!(CacheDirectory::new(&moved).list().unwrap().len(), 1);

    let mut config = common::test_config(temp_dir.path());
    config.cache_path = Some(moved);
    let relocated = Controller::with_config(config).unwrap();
    let engine = ScriptedEngine::new(&[]);
    let tracker = engine.tracker();
    let summary = relocated.run_with_engine(Arc::new(engine), &job).await.unwrap();
    assert_eq!(summary.cached, 4);
    assert_eq!(tracker.lock().call_count, 0);
}

#[test]
fn test_config_saveThenLoad_shouldKeepJobSettings() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = temp_dir.path().join("conf.json");
    let mut config = common::test_config(temp_dir.path());
    config.translation_position = TranslationPosition::Only;
    config.merge_enabled = true;
    config.merge_length = 1800;
    config.preferences_mut("DeepL").target_lang = Some("German".to_string());
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.translation_position, TranslationPosition::Only);
    assert_eq!(loaded.effective_merge_length(), Some(1800));
    assert_eq!(loaded.preferences("DeepL").target_lang.as_deref(), Some("German"));
    assert_eq!(loaded.cache_path, Some(temp_dir.path().join("cache")));
    assert!(Controller::with_config(loaded).is_ok());
}
