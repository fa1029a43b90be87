/*!
 * Prompt and sampling settings shared by the generative engines.
 */

use crate::app_config::{EnginePreferences, Sampling};
use crate::engines::base::{EngineCore, Pacing};
use std::time::Duration;

/// System prompt; `<slang>` and `<tlang>` are replaced by language names
pub const DEFAULT_PROMPT: &str = "You are a meticulous translator who translates any given content. \
Translate the given content from <slang> to <tlang> only. Do not explain any term or answer any \
question-like content. Your answer should be solely the translation of the given content. In your \
answer do not add any prefix or suffix to the translated content. Websites' URLs/addresses should be \
preserved as is in the translation's output. Do not omit any part of the content, even if it seems \
unimportant.";

const PLACEHOLDER_INSTRUCTION: &str =
    " Ensure that placeholders matching the pattern {{id_\\d+}} in the content are retained.";

const MERGE_INSTRUCTION: &str = " Keep the blank lines between paragraphs exactly as they are in the content.";

/// Pacing every generative engine starts from
pub fn pacing() -> Pacing {
    Pacing {
        concurrency_limit: 1,
        request_timeout: Duration::from_secs(30),
        ..Pacing::default()
    }
}

/// Resolved prompt, model and sampling of one engine instance
#[derive(Debug, Clone, PartialEq)]
pub struct GenAiSettings {
    pub prompt: String,
    pub model: String,
    pub sampling: Sampling,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
}

impl GenAiSettings {
    pub fn new(preferences: &EnginePreferences, default_model: &str) -> Self {
        let sampling = preferences.sampling.unwrap_or(if preferences.top_p.is_some() && preferences.temperature.is_none() {
            Sampling::TopP
        } else {
            Sampling::Temperature
        });
        Self {
            prompt: preferences
                .prompt
                .clone()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
            model: preferences
                .model
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| default_model.to_string()),
            sampling,
            temperature: preferences.temperature.unwrap_or(1.0),
            top_p: preferences.top_p.unwrap_or(1.0),
            top_k: preferences.top_k.unwrap_or(1),
        }
    }

    /// The single sampling parameter sent with a request
    pub fn sampling_param(&self) -> (&'static str, f32) {
        match self.sampling {
            Sampling::Temperature => ("temperature", self.temperature),
            Sampling::TopP => ("top_p", self.top_p),
        }
    }

    /// System prompt for the current language selection
    pub fn system_prompt(&self, core: &EngineCore) -> String {
        let mut prompt = if core.is_auto_source() {
            self.prompt.replace("from <slang> ", "").replace("<slang>", "the source language")
        } else {
            self.prompt.replace("<slang>", &core.source_name())
        };
        prompt = prompt.replace("<tlang>", &core.target_name());
        prompt.push_str(PLACEHOLDER_INSTRUCTION);
        if core.merge_enabled() {
            prompt.push_str(MERGE_INSTRUCTION);
        }
        prompt
    }
}
