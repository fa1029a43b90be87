/*!
 * Translation engines.
 *
 * Every remote service is wrapped behind the [`Engine`] trait:
 * - Standard engines: Google (free, basic, advanced), DeepL (free, pro),
 *   Baidu, Youdao, Papago, Microsoft Edge
 * - Generative engines: ChatGPT, Azure ChatGPT, Claude, DeepSeek, Gemini
 * - Custom engines declared as JSON at runtime
 *
 * Engines are instantiated through an [`EngineRegistry`] built from the
 * configuration; there is no process-wide registry.
 */

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use log::warn;

use crate::app_config::{Config, EnginePreferences};
use crate::errors::EngineError;

pub mod base;
pub mod baidu;
pub mod claude;
pub mod custom;
pub mod deepl;
pub mod gemini;
pub mod genai;
pub mod google;
pub mod languages;
pub mod microsoft;
pub mod mock;
pub mod openai;
pub mod papago;
pub mod placeholder;
pub mod stream;
pub mod youdao;

pub use base::{EngineCore, EngineInfo, EngineKind, LangCodes, Pacing};
pub use placeholder::Placeholder;
pub use stream::TextStream;

/// What `translate` hands back
pub enum TranslationOutput {
    /// Complete translation
    Text(String),
    /// Lazy sequence of text deltas
    Stream(TextStream),
}

impl Debug for TranslationOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl TranslationOutput {
    /// Collect the whole translation
    pub async fn into_text(self) -> Result<String, EngineError> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Stream(deltas) => stream::drain(deltas).await,
        }
    }
}

/// Common contract of all translation engines
///
/// Implementations only provide [`Engine::core`] and [`Engine::translate`];
/// language selection, key rotation and pacing come from the shared
/// [`EngineCore`].
#[async_trait]
pub trait Engine: Send + Sync + Debug {
    /// Shared runtime state
    fn core(&self) -> &EngineCore;

    /// Translate one paragraph
    async fn translate(&self, text: &str) -> Result<TranslationOutput, EngineError>;

    /// Quota or usage report, when the service offers one
    async fn get_usage(&self) -> Result<Option<String>, EngineError> {
        Ok(None)
    }

    /// True when `message` points at a key or account problem
    fn match_error(&self, message: &str) -> bool {
        self.core().match_error(message)
    }

    fn name(&self) -> &str {
        &self.core().info.name
    }

    fn info(&self) -> &EngineInfo {
        &self.core().info
    }

    fn placeholder(&self) -> &Placeholder {
        &self.core().info.placeholder
    }

    fn separator(&self) -> &str {
        &self.core().info.separator
    }

    fn merge_enabled(&self) -> bool {
        self.core().merge_enabled()
    }

    fn set_merge_enabled(&self, enabled: bool) {
        self.core().set_merge_enabled(enabled);
    }

    fn set_source_lang(&self, name: &str) -> Result<(), EngineError> {
        self.core().set_source_lang(name)
    }

    fn set_target_lang(&self, name: &str) -> Result<(), EngineError> {
        self.core().set_target_lang(name)
    }

    /// Display name of the target language
    fn target_lang(&self) -> String {
        self.core().target_name()
    }

    fn swap_api_key(&self) -> bool {
        self.core().swap_api_key()
    }

    fn pacing(&self) -> &Pacing {
        self.core().pacing()
    }
}

type Constructor = fn(&EnginePreferences, Option<&str>) -> Result<Arc<dyn Engine>, EngineError>;

fn boxed<E: Engine + 'static>(engine: Result<E, EngineError>) -> Result<Arc<dyn Engine>, EngineError> {
    Ok(Arc::new(engine?))
}

/// Built-in engines by display name
const BUILTIN: &[(&str, Constructor)] = &[
    (google::GOOGLE_FREE, |p, proxy| boxed(google::GoogleFreeTranslate::new(p, proxy))),
    (google::GOOGLE_BASIC, |p, proxy| boxed(google::GoogleBasicTranslate::new(p, proxy))),
    (google::GOOGLE_ADVANCED, |p, proxy| boxed(google::GoogleAdvancedTranslate::new(p, proxy))),
    (deepl::DEEPL, |p, proxy| boxed(deepl::DeeplTranslate::free(p, proxy))),
    (deepl::DEEPL_PRO, |p, proxy| boxed(deepl::DeeplTranslate::pro(p, proxy))),
    (baidu::BAIDU, |p, proxy| boxed(baidu::BaiduTranslate::new(p, proxy))),
    (youdao::YOUDAO, |p, proxy| boxed(youdao::YoudaoTranslate::new(p, proxy))),
    (papago::PAPAGO, |p, proxy| boxed(papago::PapagoTranslate::new(p, proxy))),
    (microsoft::MICROSOFT_EDGE, |p, proxy| boxed(microsoft::MicrosoftEdgeTranslate::new(p, proxy))),
    (openai::CHATGPT, |p, proxy| boxed(openai::ChatgptTranslate::openai(p, proxy))),
    (openai::AZURE_CHATGPT, |p, proxy| boxed(openai::ChatgptTranslate::azure(p, proxy))),
    (openai::DEEPSEEK, |p, proxy| boxed(openai::ChatgptTranslate::deepseek(p, proxy))),
    (claude::CLAUDE, |p, proxy| boxed(claude::ClaudeTranslate::new(p, proxy))),
    (gemini::GEMINI, |p, proxy| boxed(gemini::GeminiTranslate::new(p, proxy))),
];

/// Names of the built-in engines
pub fn builtin_names() -> Vec<&'static str> {
    BUILTIN.iter().map(|(name, _)| *name).collect()
}

/// Lookup of built-in and custom engines used at job setup
#[derive(Debug, Default, Clone)]
pub struct EngineRegistry {
    custom: Vec<custom::CustomEngineData>,
}

impl EngineRegistry {
    /// Built-ins plus every valid custom engine from `definitions`
    pub fn new(definitions: &HashMap<String, String>) -> Self {
        let mut names: Vec<&String> = definitions.keys().collect();
        names.sort();
        let mut custom = Vec::new();
        for name in names {
            match custom::load_engine_data(&definitions[name]) {
                Ok(data) => custom.push(data),
                Err(error) => warn!("Skipping custom engine '{}': {}", name, error),
            }
        }
        Self { custom }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.custom_engines)
    }

    /// Built-in names followed by custom names
    pub fn names(&self) -> Vec<String> {
        builtin_names()
            .into_iter()
            .map(str::to_string)
            .chain(self.custom.iter().map(|data| data.name.clone()))
            .collect()
    }

    /// Instantiate an engine by name
    pub fn create(
        &self,
        name: &str,
        preferences: &EnginePreferences,
        proxy_uri: Option<&str>,
    ) -> Result<Arc<dyn Engine>, EngineError> {
        if let Some((_, constructor)) = BUILTIN.iter().find(|(builtin, _)| *builtin == name) {
            return constructor(preferences, proxy_uri);
        }
        let data = self
            .custom
            .iter()
            .find(|data| data.name == name)
            .ok_or_else(|| EngineError::InvalidEngineData(format!("Unknown engine: {}", name)))?;
        boxed(custom::CustomTranslate::new(data.clone(), preferences, proxy_uri))
    }

    /// Instantiate the engine selected in `config`
    pub fn create_from_config(&self, config: &Config) -> Result<Arc<dyn Engine>, EngineError> {
        let name = &config.translate_engine;
        self.create(name, &config.preferences(name), config.proxy_uri.as_deref())
    }
}
