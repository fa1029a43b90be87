/*!
 * Orchestrator behaviour against mock engines
 */

use anyhow::Result;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ebook_translator::cache::Paragraph;
use ebook_translator::engines::mock::{MockBehavior, MockEngine};
use ebook_translator::engines::{Engine, Pacing};
use ebook_translator::translation::Translation;
use crate::common;
use crate::common::mock_engines::ScriptedEngine;

fn paragraphs(texts: &[&str]) -> Vec<Paragraph> {
    texts
        .iter()
        .enumerate()
        .map(|(id, text)| Paragraph::new(id, &format!("<p>{}</p>", text), text, false, None, None))
        .collect()
}

fn fast(engine: impl Engine + 'static) -> Translation {
    common::init_test_logging();
    let mut translation = Translation::new(Arc::new(engine));
    translation.set_retry_step(Duration::from_millis(1));
    translation
}

/// Test that every collaborator hears about every paragraph
#[tokio::test]
async fn test_handle_shouldNotifyProgressCallbackAndLog() -> Result<()> {
    let mut translation = fast(ScriptedEngine::new(&[]));
    let progress = Arc::new(Mutex::new(Vec::new()));
    let processed = Arc::new(Mutex::new(Vec::new()));
    let logs = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&progress);
    translation.set_progress(Arc::new(move |fraction, message| sink.lock().push((fraction, message.to_string()))));
    let sink = Arc::clone(&processed);
    translation.set_callback(Arc::new(move |paragraph| sink.lock().push(paragraph.id)));
    let sink = Arc::clone(&logs);
    translation.set_logging(Arc::new(move |message, is_error| sink.lock().push((message.to_string(), is_error))));

    let results = translation.handle(paragraphs(&["one", "two", "three", "four"])).await?;

    assert_eq!(results.len(), 4);
    assert_eq!(results[2].translation.as_deref(), Some("[TRANSLATED] three"));
    let mut ids = processed.lock().clone();
    ids.sort();
    assert_eq!(ids, vec![0, 1, 2, 3]);
    let progress = progress.lock();
    assert_eq!(progress.first().map(|(f, _)| *f), Some(0.0));
    assert_eq!(progress.last().cloned(), Some((1.0, "Translating: 4/4".to_string())));
    let logs = logs.lock();
    assert!(logs.iter().any(|(m, e)| m.starts_with("Start translating 4 paragraphs") && !e));
    assert!(logs.iter().any(|(m, e)| m == "Translation completed, 0 failed." && !e));
    Ok(())
}

/// Test that transient failures are retried until they succeed
#[tokio::test]
async fn test_handle_withIntermittentEngine_shouldRetryToSuccess() -> Result<()> {
    let engine = MockEngine::builder(MockBehavior::Intermittent { fail_every: 2 })
        .pacing(Pacing {
            request_attempt: 2,
            ..Pacing::default()
        })
        .build()?;
    let calls = engine.request_count();
    let mut translation = fast(engine);
    let logs = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&logs);
    translation.set_logging(Arc::new(move |message, is_error| sink.lock().push((message.to_string(), is_error))));

    let results = translation.handle(paragraphs(&["a", "b", "c", "d"])).await?;

    assert!(results.iter().all(|p| p.translation.is_some()));
    assert_eq!(calls.load(Ordering::SeqCst), 7);
    assert_eq!(translation.error_count(), 0);
    assert!(logs.lock().iter().any(|(m, e)| m.contains("Retry 1/2") && *e));
    Ok(())
}

/// Test that the job stops once failed paragraphs exceed the limit
#[tokio::test]
async fn test_handle_withTooManyErrors_shouldCancelJob() -> Result<()> {
    let engine = MockEngine::builder(MockBehavior::Failing)
        .pacing(Pacing {
            request_attempt: 0,
            max_error_count: 1,
            ..Pacing::default()
        })
        .build()?;
    let calls = engine.request_count();
    let translation = fast(engine);

    let results = translation.handle(paragraphs(&["a", "b", "c", "d", "e"])).await?;

    assert!(translation.is_canceled());
    assert_eq!(translation.error_count(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(results.iter().map(|p| p.id).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    assert!(results.iter().all(|p| p.translation.is_none()));
    Ok(())
}

/// Test that a cancel requested up front leaves every paragraph untouched
#[tokio::test]
async fn test_handle_withCancelRequested_shouldNotCallEngine() -> Result<()> {
    let engine = ScriptedEngine::new(&[]);
    let tracker = engine.tracker();
    let mut translation = fast(engine);
    let flag = Arc::new(AtomicBool::new(true));
    let cancel = Arc::clone(&flag);
    translation.set_cancel_request(Arc::new(move || cancel.load(Ordering::SeqCst)));

    let results = translation.handle(paragraphs(&["a", "b", "c"])).await?;

    assert!(translation.is_canceled());
    assert_eq!(tracker.lock().call_count, 0);
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|p| p.translation.is_none() && p.error.is_none()));
    Ok(())
}

/// Test that a zero concurrency limit runs every request at once
#[tokio::test]
async fn test_handle_withUnlimitedConcurrency_shouldOverlapRequests() -> Result<()> {
    let engine = ScriptedEngine::with_pacing(
        &[],
        Pacing {
            concurrency_limit: 0,
            ..Pacing::default()
        },
    )
    .delay(Duration::from_millis(300));
    let translation = fast(engine);

    let start = Instant::now();
    let results = translation.handle(paragraphs(&["a", "b", "c", "d", "e"])).await?;

    assert!(results.iter().all(|p| p.translation.is_some()));
    assert!(start.elapsed() < Duration::from_millis(1200));
    Ok(())
}

/// Test that paragraphs carrying a translation are reported as cache hits
#[tokio::test]
async fn test_handle_withCachedParagraphs_shouldSkipEngineAndLabelLog() -> Result<()> {
    let engine = ScriptedEngine::new(&[]);
    let tracker = engine.tracker();
    let mut translation = fast(engine);
    translation.set_log_translation(true);
    let logs = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&logs);
    translation.set_logging(Arc::new(move |message, _| sink.lock().push(message.to_string())));
    let mut input = paragraphs(&["cached", "new"]);
    input[0].translation = Some("déjà".to_string());

    let results = translation.handle(input).await?;

    assert_eq!(tracker.lock().requests, vec!["new".to_string()]);
    assert!(results[0].is_cache);
    assert!(!results[1].is_cache);
    assert!(logs.lock().iter().any(|m| m.contains("Translation (Cached): déjà")));
    Ok(())
}

/// Test that merged translations with lost separators are realigned
#[tokio::test]
async fn test_handle_withMergeAndSingleNewlines_shouldRealignSeparators() -> Result<()> {
    let engine = ScriptedEngine::new(&[("a\n\nb\n\nc\n\n", "A\nB\n\nC")]);
    engine.set_merge_enabled(true);
    let translation = fast(engine);

    let results = translation.handle(paragraphs(&["a\n\nb\n\nc\n\n"])).await?;

    assert_eq!(results[0].translation.as_deref(), Some("A\n\nB\n\nC"));
    assert!(!results[0].aligned);
    Ok(())
}
