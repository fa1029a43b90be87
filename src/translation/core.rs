/*!
 * Translation orchestrator.
 *
 * `Translation` owns the engine, the optional glossary and the caller's
 * callbacks. It translates single paragraphs with the retry policy and
 * hands the whole job to the worker [`Handler`](super::handler::Handler).
 */

use futures::StreamExt;
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::Paragraph;
use crate::engines::base::truncate;
use crate::engines::{stream, Engine, TextStream, TranslationOutput};
use crate::errors::{EngineError, TranslationError};

use super::glossary::Glossary;
use super::handler::Handler;

/// First retry delay; each further attempt waits one more step
pub const DEFAULT_RETRY_STEP: Duration = Duration::from_secs(5);

/// Delay between streamed deltas forwarded to the caller
pub const STREAMING_PACE: Duration = Duration::from_millis(50);

/// Granularity of cancellable sleeps
const CANCEL_POLL: Duration = Duration::from_millis(100);

const LOG_SEPARATOR: &str = "────────────────────────────────────────";

/// What the streaming callback receives
#[derive(Debug, Clone, PartialEq)]
pub enum StreamingEvent {
    /// A piece of the translation being produced
    Delta(String),
    /// A paragraph that finished processing
    Paragraph(Paragraph),
}

pub type ProgressFn = Arc<dyn Fn(f64, &str) + Send + Sync>;
pub type LogFn = Arc<dyn Fn(&str, bool) + Send + Sync>;
pub type StreamingFn = Arc<dyn Fn(StreamingEvent) + Send + Sync>;
pub type ParagraphFn = Arc<dyn Fn(&Paragraph) + Send + Sync>;
pub type CancelFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// Collaborators notified while a job runs
#[derive(Clone)]
pub struct Callbacks {
    // @field: Called with (fraction done, "Translating: k/N")
    pub progress: ProgressFn,
    // @field: Called with (message, is_error)
    pub log: LogFn,
    pub streaming: StreamingFn,
    // @field: Called once per processed paragraph, usually to write the cache
    pub callback: ParagraphFn,
    pub cancel_request: CancelFn,
}

impl Default for Callbacks {
    fn default() -> Self {
        Self {
            progress: Arc::new(|_, _| {}),
            log: Arc::new(|message, is_error| {
                if is_error {
                    error!("{}", message);
                } else {
                    info!("{}", message);
                }
            }),
            streaming: Arc::new(|_| {}),
            callback: Arc::new(|_| {}),
            cancel_request: Arc::new(|| false),
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callbacks { .. }")
    }
}

#[derive(Debug)]
pub struct Translation {
    engine: Arc<dyn Engine>,
    glossary: Option<Glossary>,
    callbacks: Callbacks,
    // @field: Translate again even when a paragraph already has a translation
    fresh: bool,
    log_translation: bool,
    retry_step: Duration,
    total: AtomicUsize,
    error_count: AtomicUsize,
    canceled: AtomicBool,
}

impl Translation {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            glossary: None,
            callbacks: Callbacks::default(),
            fresh: false,
            log_translation: true,
            retry_step: DEFAULT_RETRY_STEP,
            total: AtomicUsize::new(0),
            error_count: AtomicUsize::new(0),
            canceled: AtomicBool::new(false),
        }
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    pub fn set_glossary(&mut self, glossary: Glossary) {
        self.glossary = Some(glossary);
    }

    pub fn set_callbacks(&mut self, callbacks: Callbacks) {
        self.callbacks = callbacks;
    }

    pub fn set_progress(&mut self, progress: ProgressFn) {
        self.callbacks.progress = progress;
    }

    pub fn set_logging(&mut self, log: LogFn) {
        self.callbacks.log = log;
    }

    pub fn set_streaming(&mut self, streaming: StreamingFn) {
        self.callbacks.streaming = streaming;
    }

    pub fn set_callback(&mut self, callback: ParagraphFn) {
        self.callbacks.callback = callback;
    }

    pub fn set_cancel_request(&mut self, cancel_request: CancelFn) {
        self.callbacks.cancel_request = cancel_request;
    }

    pub fn set_fresh(&mut self, fresh: bool) {
        self.fresh = fresh;
    }

    pub fn set_log_translation(&mut self, enabled: bool) {
        self.log_translation = enabled;
    }

    pub fn set_retry_step(&mut self, step: Duration) {
        self.retry_step = step;
    }

    pub fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::SeqCst)
    }

    /// True once the job was canceled, internally or by the caller
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst) || (self.callbacks.cancel_request)()
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    /// Too many failed paragraphs
    pub fn need_stop(&self) -> bool {
        let max = self.engine.pacing().max_error_count;
        max > 0 && self.error_count() > max
    }

    fn log(&self, message: &str, is_error: bool) {
        (self.callbacks.log)(message, is_error);
    }

    /// Sleep in small steps, waking early on cancellation
    pub async fn sleep(&self, duration: Duration) -> Result<(), TranslationError> {
        let mut remaining = duration;
        while !remaining.is_zero() {
            if self.is_canceled() {
                return Err(TranslationError::Canceled("Sleep interrupted".to_string()));
            }
            let step = remaining.min(CANCEL_POLL);
            tokio::time::sleep(step).await;
            remaining = remaining.saturating_sub(step);
        }
        Ok(())
    }

    fn canceled_error(&self, reason: &str) -> TranslationError {
        self.cancel();
        TranslationError::Canceled(reason.to_string())
    }

    /// Forward deltas to the streaming callback, paced for display
    async fn forward(&self, mut deltas: TextStream) -> Result<String, EngineError> {
        let mut text = String::new();
        while let Some(delta) = deltas.next().await {
            if self.is_canceled() {
                break;
            }
            let delta = delta?;
            text.push_str(&delta);
            (self.callbacks.streaming)(StreamingEvent::Delta(delta));
            tokio::time::sleep(STREAMING_PACE).await;
        }
        Ok(text)
    }

    async fn request(&self, text: &str, live: bool) -> Result<String, EngineError> {
        let translation = match self.engine.translate(text).await? {
            TranslationOutput::Text(translation) => translation,
            TranslationOutput::Stream(deltas) if live => self.forward(deltas).await?,
            TranslationOutput::Stream(deltas) => stream::drain(deltas).await?,
        };
        if translation.trim().is_empty() && !self.is_canceled() {
            return Err(EngineError::UnexpectedResult("Empty translation".to_string()));
        }
        Ok(translation)
    }

    /// Call the engine with retries
    ///
    /// Key and account errors rotate to the next API key; when none is
    /// left the whole job is canceled. Other errors are retried up to
    /// `request_attempt` times with a linearly growing delay.
    pub async fn translate_text(&self, row: i64, text: &str, live: bool) -> Result<String, TranslationError> {
        let attempts = self.engine.pacing().request_attempt;
        let mut retry: u32 = 0;
        loop {
            if self.is_canceled() {
                return Err(TranslationError::Canceled("Canceled before request".to_string()));
            }
            let error = match self.request(text, live).await {
                Ok(_) if self.is_canceled() => {
                    debug!("Discarding translation of row {} after cancel", row);
                    return Err(TranslationError::Canceled("Canceled during request".to_string()));
                }
                Ok(translation) => return Ok(translation),
                Err(error) => error,
            };
            if self.is_canceled() {
                return Err(TranslationError::Canceled(error.to_string()));
            }

            let message = error.to_string();
            if matches!(
                error,
                EngineError::BadApiKeyFormat(_) | EngineError::NoAvailableApiKey | EngineError::UnsupportedModel(_)
            ) {
                self.log(&message, true);
                return Err(self.canceled_error(&message));
            }
            if self.engine.match_error(&message) {
                if self.engine.swap_api_key() {
                    self.log(&format!("API key failed, switching to the next one: {}", message), true);
                    continue;
                }
                self.log(&message, true);
                return Err(self.canceled_error(&message));
            }
            if retry >= attempts {
                self.error_count.fetch_add(1, Ordering::SeqCst);
                if self.need_stop() {
                    self.log("Too many errors, stopping the translation.", true);
                    return Err(self.canceled_error(&message));
                }
                return Err(TranslationError::Failed(message));
            }

            retry += 1;
            let interval = self.retry_step * retry;
            let row_label = if row >= 0 { format!("row {}", row) } else { "paragraph".to_string() };
            self.log(
                &format!(
                    "[{}] {}\nRetry {}/{} in {} seconds. Error: {:?}",
                    row_label,
                    truncate(text, 200),
                    retry,
                    attempts,
                    interval.as_secs_f64(),
                    error
                ),
                true,
            );
            self.sleep(interval).await?;
        }
    }

    /// Translate one paragraph in place
    pub async fn translate_paragraph(&self, paragraph: &mut Paragraph) -> Result<(), TranslationError> {
        if self.is_canceled() {
            return Err(TranslationError::Canceled("Translation canceled".to_string()));
        }
        if paragraph.translation.is_some() && !self.fresh {
            paragraph.is_cache = true;
            return Ok(());
        }
        paragraph.is_cache = false;

        let original = match &self.glossary {
            Some(glossary) => glossary.replace(&paragraph.original),
            None => paragraph.original.clone(),
        };
        let live = self.total.load(Ordering::SeqCst) == 1;
        let translation = self.translate_text(paragraph.row, &original, live).await?;
        let translation = match &self.glossary {
            Some(glossary) => glossary.restore(&translation),
            None => translation,
        };

        paragraph.translation = Some(translation);
        if self.engine.merge_enabled() {
            paragraph.do_aligment(self.engine.separator());
        }
        paragraph.engine_name = Some(self.engine.name().to_string());
        paragraph.target_lang = Some(self.engine.target_lang());
        paragraph.is_cache = false;
        paragraph.error = None;
        Ok(())
    }

    /// Report one finished paragraph to the callbacks
    ///
    /// Runs on the blocking pool so slow callbacks never stall the workers.
    pub async fn process_translation(&self, paragraph: &Paragraph, count: usize, total: usize) {
        let callbacks = self.callbacks.clone();
        let snapshot = paragraph.clone();
        let log_translation = self.log_translation;
        let result = tokio::task::spawn_blocking(move || {
            let fraction = if total == 0 { 1.0 } else { count as f64 / total as f64 };
            (callbacks.progress)(fraction, &format!("Translating: {}/{}", count, total));
            (callbacks.streaming)(StreamingEvent::Paragraph(snapshot.clone()));
            (callbacks.callback)(&snapshot);
            if log_translation {
                (callbacks.log)(&translation_log(&snapshot), false);
            }
            if let Some(error) = &snapshot.error {
                (callbacks.log)(&format!("Paragraph {} failed: {}", snapshot.id, error), true);
            }
        })
        .await;
        if let Err(e) = result {
            error!("Callback for paragraph {} panicked: {}", paragraph.id, e);
        }
    }

    /// Translate a job
    ///
    /// Returns every paragraph handed in, ordered by id: processed ones
    /// carry their translation or error, paragraphs skipped by a cancel
    /// come back untouched.
    pub async fn handle(&self, paragraphs: Vec<Paragraph>) -> Result<Vec<Paragraph>, TranslationError> {
        let total = paragraphs.len();
        if total == 0 {
            return Err(TranslationError::NoContent);
        }
        let characters: usize = paragraphs.iter().map(|p| p.original.chars().count()).sum();
        self.total.store(total, Ordering::SeqCst);
        self.log(
            &format!(
                "Start translating {} paragraphs ({} characters) with {}",
                total,
                characters,
                self.engine.name()
            ),
            false,
        );
        (self.callbacks.progress)(0.0, &format!("Translating: 0/{}", total));

        let mut results = Handler::new(self, paragraphs).run().await;
        results.sort_by_key(|paragraph| paragraph.id);

        if self.is_canceled() {
            warn!("Translation canceled");
            self.log("Translation canceled.", true);
        } else {
            let failed = results.iter().filter(|p| p.translation.is_none()).count();
            self.log(
                &format!("Translation completed, {} failed.", failed),
                failed > 0,
            );
        }
        Ok(results)
    }

    /// Translate again every paragraph still missing a translation
    pub async fn retry_failed(&self, paragraphs: Vec<Paragraph>) -> Result<Vec<Paragraph>, TranslationError> {
        let (pending, mut finished): (Vec<Paragraph>, Vec<Paragraph>) = paragraphs
            .into_iter()
            .partition(|paragraph| paragraph.translation.is_none() && !paragraph.ignored);
        if pending.is_empty() {
            return Err(TranslationError::NoContent);
        }
        self.canceled.store(false, Ordering::SeqCst);
        self.error_count.store(0, Ordering::SeqCst);
        finished.extend(self.handle(pending).await?);
        finished.sort_by_key(|paragraph| paragraph.id);
        Ok(finished)
    }
}

/// Log block for one processed paragraph
pub fn translation_log(paragraph: &Paragraph) -> String {
    let mut block = String::from(LOG_SEPARATOR);
    block.push('\n');
    if paragraph.row >= 0 {
        block.push_str(&format!("Row: {}\n", paragraph.row));
    }
    block.push_str(&format!("Original: {}\n", paragraph.original));
    block.push_str(LOG_SEPARATOR);
    block.push('\n');
    let label = if paragraph.is_cache { "Translation (Cached)" } else { "Translation" };
    block.push_str(&format!(
        "{}: {}",
        label,
        paragraph.translation.as_deref().unwrap_or("")
    ));
    block
}
