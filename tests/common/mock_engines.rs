/*!
 * Scripted engines for the test suite
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ebook_translator::app_config::EnginePreferences;
use ebook_translator::engines::{languages, Engine, EngineCore, EngineInfo, EngineKind, Pacing, TranslationOutput};
use ebook_translator::errors::EngineError;

/// Records what the engine was asked
#[derive(Debug, Default)]
pub struct ApiCallTracker {
    pub call_count: usize,
    pub requests: Vec<String>,
}

/// Engine answering from a fixed table of translations
#[derive(Debug)]
pub struct ScriptedEngine {
    core: EngineCore,
    responses: HashMap<String, String>,
    tracker: Arc<Mutex<ApiCallTracker>>,
    // @field: Set once the call with this 1-based number was made
    cancel_at: Option<(usize, Arc<AtomicBool>)>,
    delay: Duration,
}

impl ScriptedEngine {
    pub fn new(responses: &[(&str, &str)]) -> Self {
        Self::with_pacing(responses, Pacing::default())
    }

    pub fn with_pacing(responses: &[(&str, &str)], pacing: Pacing) -> Self {
        let info = EngineInfo::new("Scripted", "scripted", EngineKind::Standard)
            .lang_codes(languages::google())
            .pacing(Pacing {
                request_attempt: 0,
                ..pacing
            });
        let core = EngineCore::new(info, &EnginePreferences::default(), None)
            .expect("scripted engine core should build");
        Self {
            core,
            responses: responses
                .iter()
                .map(|(original, translation)| (original.to_string(), translation.to_string()))
                .collect(),
            tracker: Arc::new(Mutex::new(ApiCallTracker::default())),
            cancel_at: None,
            delay: Duration::ZERO,
        }
    }

    /// Raise `flag` during the `call`-th request
    pub fn cancel_at(mut self, call: usize, flag: Arc<AtomicBool>) -> Self {
        self.cancel_at = Some((call, flag));
        self
    }

    /// Pause every request
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn tracker(&self) -> Arc<Mutex<ApiCallTracker>> {
        Arc::clone(&self.tracker)
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    fn core(&self) -> &EngineCore {
        &self.core
    }

    async fn translate(&self, text: &str) -> Result<TranslationOutput, EngineError> {
        let call = {
            let mut tracker = self.tracker.lock();
            tracker.call_count += 1;
            tracker.requests.push(text.to_string());
            tracker.call_count
        };
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some((cancel_call, flag)) = &self.cancel_at {
            if *cancel_call == call {
                flag.store(true, Ordering::SeqCst);
            }
        }
        let translation = self
            .responses
            .get(text)
            .cloned()
            .unwrap_or_else(|| format!("[TRANSLATED] {}", text));
        Ok(TranslationOutput::Text(translation))
    }
}
