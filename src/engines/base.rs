/*!
 * Shared engine state.
 *
 * `EngineInfo` is the class-level description of an engine (name, language
 * tables, endpoint, pacing defaults). `EngineCore` is what an instance
 * carries at runtime: the HTTP client, the selected languages, the API key
 * ring and the merge flag. Every built-in engine embeds one `EngineCore`.
 */

use log::{debug, warn};
use md5::Md5;
use parking_lot::{Mutex, RwLock};
use regex::Regex;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::app_config::EnginePreferences;
use crate::engines::placeholder::Placeholder;
use crate::errors::EngineError;
use crate::language_utils::AUTO_DETECT;

/// Default paragraph separator used by merge mode
pub const DEFAULT_SEPARATOR: &str = "\n\n";

/// Broad family an engine belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// One HTTP request per paragraph, fixed wire format
    Standard,
    /// Prompt-driven large language model
    Generative,
    /// Declared at runtime from JSON
    Custom,
}

/// Request pacing and resilience parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Pacing {
    /// Parallel workers; 0 means one worker per paragraph
    pub concurrency_limit: usize,
    pub request_interval: Duration,
    pub request_attempt: u32,
    pub request_timeout: Duration,
    /// Failed paragraphs tolerated before the job stops; 0 disables the limit
    pub max_error_count: usize,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            concurrency_limit: 1,
            request_interval: Duration::ZERO,
            request_attempt: 3,
            request_timeout: Duration::from_secs(10),
            max_error_count: 10,
        }
    }
}

impl Pacing {
    pub fn with_preferences(mut self, preferences: &EnginePreferences) -> Result<Self, EngineError> {
        if let Some(limit) = preferences.concurrency_limit {
            self.concurrency_limit = limit;
        }
        if let Some(interval) = preferences.request_interval {
            self.request_interval = seconds("request_interval", interval)?;
        }
        if let Some(attempt) = preferences.request_attempt {
            self.request_attempt = attempt;
        }
        if let Some(timeout) = preferences.request_timeout {
            self.request_timeout = seconds("request_timeout", timeout)?.max(Duration::from_secs(1));
        }
        if let Some(max) = preferences.max_error_count {
            self.max_error_count = max;
        }
        Ok(self)
    }
}

fn seconds(name: &str, value: f64) -> Result<Duration, EngineError> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| EngineError::InvalidPreference(format!("{} = {}: {}", name, value, e)))
}

/// Display name -> engine code tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LangCodes {
    pub source: Vec<(String, String)>,
    pub target: Vec<(String, String)>,
}

impl LangCodes {
    /// Same table on both sides
    pub fn symmetric(table: &[(&str, &str)]) -> Self {
        let owned: Vec<(String, String)> = table
            .iter()
            .map(|(name, code)| (name.to_string(), code.to_string()))
            .collect();
        Self {
            source: owned.clone(),
            target: owned,
        }
    }

    pub fn from_pairs(source: Vec<(String, String)>, target: Vec<(String, String)>) -> Self {
        Self { source, target }
    }

    pub fn source_code(&self, name: &str) -> Option<&str> {
        if name == AUTO_DETECT {
            return Some("auto");
        }
        lookup(&self.source, name)
    }

    pub fn target_code(&self, name: &str) -> Option<&str> {
        lookup(&self.target, name)
    }

    pub fn target_names(&self) -> impl Iterator<Item = &str> {
        self.target.iter().map(|(name, _)| name.as_str())
    }
}

fn lookup<'a>(table: &'a [(String, String)], name: &str) -> Option<&'a str> {
    table
        .iter()
        .find(|(display, _)| display == name)
        .map(|(_, code)| code.as_str())
}

/// Class-level description of an engine
#[derive(Debug, Clone)]
pub struct EngineInfo {
    pub name: String,
    pub alias: String,
    pub kind: EngineKind,
    pub lang_codes: LangCodes,
    pub endpoint: String,
    pub placeholder: Placeholder,
    pub separator: String,
    pub method: Method,
    pub stream: bool,
    pub need_api_key: bool,
    pub api_key_hint: String,
    pub api_key_pattern: Option<String>,
    /// Substrings of error messages that mean the current key is unusable
    pub api_key_errors: Vec<String>,
    pub pacing: Pacing,
}

impl EngineInfo {
    pub fn new(name: &str, alias: &str, kind: EngineKind) -> Self {
        Self {
            name: name.to_string(),
            alias: alias.to_string(),
            kind,
            lang_codes: LangCodes::default(),
            endpoint: String::new(),
            placeholder: Placeholder::default(),
            separator: DEFAULT_SEPARATOR.to_string(),
            method: Method::POST,
            stream: false,
            need_api_key: false,
            api_key_hint: String::new(),
            api_key_pattern: None,
            api_key_errors: Vec::new(),
            pacing: Pacing::default(),
        }
    }

    pub fn lang_codes(mut self, lang_codes: LangCodes) -> Self {
        self.lang_codes = lang_codes;
        self
    }

    pub fn endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Require API keys matching `pattern`
    pub fn api_key(mut self, hint: &str, pattern: &str, errors: &[&str]) -> Self {
        self.need_api_key = true;
        self.api_key_hint = hint.to_string();
        self.api_key_pattern = Some(pattern.to_string());
        self.api_key_errors = errors.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }
}

#[derive(Debug, Default)]
struct ApiKeys {
    current: Option<String>,
    pending: VecDeque<String>,
    bad: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct LanguageSelection {
    source_name: String,
    source_code: String,
    target_name: String,
    target_code: String,
}

/// Runtime state shared by every engine instance
#[derive(Debug)]
pub struct EngineCore {
    pub info: EngineInfo,
    pacing: Pacing,
    languages: RwLock<LanguageSelection>,
    keys: Mutex<ApiKeys>,
    merge_enabled: AtomicBool,
    proxy_uri: Option<String>,
    client: Client,
}

impl EngineCore {
    /// Build the runtime state from the engine description and user preferences
    pub fn new(
        info: EngineInfo,
        preferences: &EnginePreferences,
        proxy_uri: Option<&str>,
    ) -> Result<Self, EngineError> {
        let mut info = info;
        if let Some(endpoint) = preferences.endpoint.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            info.endpoint = endpoint.to_string();
        }
        if info.kind == EngineKind::Generative {
            if let Some(stream) = preferences.stream {
                info.stream = stream;
            }
        }
        let pacing = info.pacing.clone().with_preferences(preferences)?;

        let keys: Vec<String> = preferences
            .api_keys
            .iter()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .collect();
        if info.need_api_key {
            if keys.is_empty() {
                return Err(EngineError::NoAvailableApiKey);
            }
            if let Some(pattern) = &info.api_key_pattern {
                let pattern = Regex::new(pattern)
                    .map_err(|e| EngineError::InvalidEngineData(format!("Invalid key pattern: {}", e)))?;
                if let Some(bad) = keys.iter().find(|key| !pattern.is_match(key)) {
                    return Err(EngineError::BadApiKeyFormat(format!(
                        "{} ({})",
                        mask_key(bad),
                        info.api_key_hint
                    )));
                }
            }
        }
        let mut pending: VecDeque<String> = keys.into();
        let current = pending.pop_front();

        let mut builder = Client::builder().connect_timeout(pacing.request_timeout);
        if let Some(uri) = proxy_uri {
            let proxy = reqwest::Proxy::all(uri)
                .map_err(|e| EngineError::RequestFailed(format!("Invalid proxy '{}': {}", uri, e)))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| EngineError::RequestFailed(format!("Failed to build HTTP client: {}", e)))?;

        let core = Self {
            info,
            pacing,
            languages: RwLock::new(LanguageSelection::default()),
            keys: Mutex::new(ApiKeys {
                current,
                pending,
                bad: Vec::new(),
            }),
            merge_enabled: AtomicBool::new(false),
            proxy_uri: proxy_uri.map(str::to_string),
            client,
        };

        core.set_source_lang(preferences.source_lang.as_deref().unwrap_or(AUTO_DETECT))?;
        let default_target = core.default_target_name();
        core.set_target_lang(preferences.target_lang.as_deref().unwrap_or(&default_target))?;
        Ok(core)
    }

    fn default_target_name(&self) -> String {
        let codes = &self.info.lang_codes;
        codes
            .target_names()
            .find(|name| name.starts_with("English"))
            .or_else(|| codes.target_names().next())
            .unwrap_or("English")
            .to_string()
    }

    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn proxy_uri(&self) -> Option<&str> {
        self.proxy_uri.as_deref()
    }

    pub fn merge_enabled(&self) -> bool {
        self.merge_enabled.load(Ordering::SeqCst)
    }

    pub fn set_merge_enabled(&self, enabled: bool) {
        self.merge_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Select the source language by display name
    pub fn set_source_lang(&self, name: &str) -> Result<(), EngineError> {
        let code = self
            .info
            .lang_codes
            .source_code(name)
            .ok_or_else(|| EngineError::UnsupportedLanguage(name.to_string()))?
            .to_string();
        let mut languages = self.languages.write();
        languages.source_name = name.to_string();
        languages.source_code = code;
        Ok(())
    }

    /// Select the target language by display name
    pub fn set_target_lang(&self, name: &str) -> Result<(), EngineError> {
        let code = self
            .info
            .lang_codes
            .target_code(name)
            .ok_or_else(|| EngineError::UnsupportedLanguage(name.to_string()))?
            .to_string();
        let mut languages = self.languages.write();
        languages.target_name = name.to_string();
        languages.target_code = code;
        Ok(())
    }

    pub fn source_name(&self) -> String {
        self.languages.read().source_name.clone()
    }

    pub fn source_code(&self) -> String {
        self.languages.read().source_code.clone()
    }

    pub fn target_name(&self) -> String {
        self.languages.read().target_name.clone()
    }

    pub fn target_code(&self) -> String {
        self.languages.read().target_code.clone()
    }

    /// Whether the source language is left to the engine
    pub fn is_auto_source(&self) -> bool {
        self.languages.read().source_code == "auto"
    }

    /// Key used for the next request
    pub fn api_key(&self) -> Result<String, EngineError> {
        if !self.info.need_api_key {
            return Ok(String::new());
        }
        self.keys.lock().current.clone().ok_or(EngineError::NoAvailableApiKey)
    }

    /// Retire the current key and move to the next one; false when none is left
    pub fn swap_api_key(&self) -> bool {
        let mut keys = self.keys.lock();
        if let Some(current) = keys.current.take() {
            warn!("Retiring API key {} for {}", mask_key(&current), self.info.name);
            keys.bad.push(current);
        }
        keys.current = keys.pending.pop_front();
        keys.current.is_some()
    }

    pub fn bad_api_keys(&self) -> Vec<String> {
        self.keys.lock().bad.clone()
    }

    /// True when `message` names a key or account problem
    pub fn match_error(&self, message: &str) -> bool {
        self.info
            .api_key_errors
            .iter()
            .any(|pattern| message.contains(pattern.as_str()))
    }

    /// Send a request, turning non-success statuses into `ApiError`
    pub async fn send(&self, request: RequestBuilder, streaming: bool) -> Result<Response, EngineError> {
        let request = if streaming {
            request
        } else {
            request.timeout(self.pacing.request_timeout)
        };
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            debug!("{} API error ({}): {}", self.info.name, status, message);
            return Err(EngineError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    pub async fn send_text(&self, request: RequestBuilder) -> Result<String, EngineError> {
        Ok(self.send(request, false).await?.text().await?)
    }

    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, EngineError> {
        let body = self.send_text(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            EngineError::UnexpectedResult(format!("{} ({})", e, truncate(&body, 200)))
        })
    }
}

/// Lowercase hex MD5 digest
pub fn md5_hex(text: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Lowercase hex SHA-256 digest
pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Show only the head of a secret
pub fn mask_key(key: &str) -> String {
    let head: String = key.chars().take(4).collect();
    format!("{}****", head)
}

/// Cut text to `max_chars` characters, marking the cut
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}
