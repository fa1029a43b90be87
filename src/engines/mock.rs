/*!
 * Mock engine for testing.
 *
 * Simulates the behaviours the orchestrator has to cope with:
 * - `MockBehavior::Working` - always succeeds
 * - `MockBehavior::Intermittent` - fails every Nth request
 * - `MockBehavior::Failing` - always fails with a server error
 * - `MockBehavior::RejectKeys` - answers 401 until enough keys were retired
 * - `MockBehavior::Streaming` - returns the translation as a delta stream
 */

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::EnginePreferences;
use crate::engines::base::{EngineCore, EngineInfo, EngineKind, Pacing};
use crate::engines::{languages, Engine, TranslationOutput};
use crate::errors::EngineError;

pub const MOCK: &str = "Mock";

/// Behavior mode for the mock engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails every Nth request
    Intermittent { fail_every: usize },
    /// Always fails with a 500
    Failing,
    /// Answers 401 until `count` keys have been retired
    RejectKeys { count: usize },
    /// Returns an empty translation
    Empty,
    /// Succeeds after a delay
    Slow { delay_ms: u64 },
    /// Succeeds with a word-by-word stream
    Streaming,
}

/// Builder for [`MockEngine`]
#[derive(Debug, Clone)]
pub struct MockEngineBuilder {
    behavior: MockBehavior,
    api_keys: Vec<String>,
    pacing: Pacing,
    custom_response: Option<fn(&str) -> String>,
}

impl MockEngineBuilder {
    pub fn api_keys(mut self, keys: &[&str]) -> Self {
        self.api_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Translate with `generator` instead of the default `[TRANSLATED] ` prefix
    pub fn custom_response(mut self, generator: fn(&str) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    pub fn build(self) -> Result<MockEngine, EngineError> {
        let mut info = EngineInfo::new(MOCK, "mock", EngineKind::Standard)
            .lang_codes(languages::google())
            .pacing(self.pacing);
        if !self.api_keys.is_empty() {
            info = info.api_key("any non-blank key", r"^\S+$", &["401"]);
        }
        let preferences = EnginePreferences {
            api_keys: self.api_keys,
            ..EnginePreferences::default()
        };
        Ok(MockEngine {
            core: EngineCore::new(info, &preferences, None)?,
            behavior: self.behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            custom_response: self.custom_response,
        })
    }
}

/// Mock engine recording every request
#[derive(Debug)]
pub struct MockEngine {
    core: EngineCore,
    behavior: MockBehavior,
    request_count: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
    custom_response: Option<fn(&str) -> String>,
}

impl MockEngine {
    pub fn builder(behavior: MockBehavior) -> MockEngineBuilder {
        MockEngineBuilder {
            behavior,
            api_keys: Vec::new(),
            pacing: Pacing {
                request_attempt: 0,
                ..Pacing::default()
            },
            custom_response: None,
        }
    }

    pub fn new(behavior: MockBehavior) -> Result<Self, EngineError> {
        Self::builder(behavior).build()
    }

    /// Shared counter of `translate` calls
    pub fn request_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.request_count)
    }

    /// Shared log of the texts sent to the engine
    pub fn requests(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.requests)
    }

    fn respond(&self, text: &str) -> String {
        match self.custom_response {
            Some(generator) => generator(text),
            None => format!("[TRANSLATED] {}", text),
        }
    }
}

#[async_trait]
impl Engine for MockEngine {
    fn core(&self) -> &EngineCore {
        &self.core
    }

    async fn translate(&self, text: &str) -> Result<TranslationOutput, EngineError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(text.to_string());

        match self.behavior {
            MockBehavior::Working => Ok(TranslationOutput::Text(self.respond(text))),

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(EngineError::ApiError {
                        status_code: 503,
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                    })
                } else {
                    Ok(TranslationOutput::Text(self.respond(text)))
                }
            }

            MockBehavior::Failing => Err(EngineError::ApiError {
                status_code: 500,
                message: "Simulated engine failure".to_string(),
            }),

            MockBehavior::RejectKeys { count } => {
                self.core.api_key()?;
                if self.core.bad_api_keys().len() < count {
                    Err(EngineError::ApiError {
                        status_code: 401,
                        message: "Invalid API key".to_string(),
                    })
                } else {
                    Ok(TranslationOutput::Text(self.respond(text)))
                }
            }

            MockBehavior::Empty => Ok(TranslationOutput::Text(String::new())),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(TranslationOutput::Text(self.respond(text)))
            }

            MockBehavior::Streaming => {
                let deltas: Vec<Result<String, EngineError>> = self
                    .respond(text)
                    .split_inclusive(' ')
                    .map(|word| Ok(word.to_string()))
                    .collect();
                Ok(TranslationOutput::Stream(stream::iter(deltas).boxed()))
            }
        }
    }
}
