/*!
 * Anthropic Claude messages API engine.
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::app_config::{EnginePreferences, Sampling};
use crate::engines::base::{EngineCore, EngineInfo, EngineKind};
use crate::engines::genai::{self, GenAiSettings};
use crate::engines::stream::{claude_frame, lines, parse_frames};
use crate::engines::{languages, Engine, TranslationOutput};
use crate::errors::EngineError;

pub const CLAUDE: &str = "Claude";

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Claude message request
#[derive(Debug, Serialize)]
pub struct ClaudeRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<ClaudeMessage>,

    /// System prompt to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Maximum number of tokens to generate
    max_tokens: u32,

    /// Nucleus sampling, sent instead of temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,

    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClaudeMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ClaudeResponse {
    pub content: Vec<ClaudeContent>,
}

/// Individual content block in a response
#[derive(Debug, Deserialize)]
pub struct ClaudeContent {
    #[serde(rename = "type")]
    pub content_type: String,

    #[serde(default)]
    pub text: String,
}

impl ClaudeResponse {
    /// Text of all `text` blocks
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect()
    }
}

impl ClaudeRequest {
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            system: None,
            temperature: None,
            max_tokens,
            top_p: None,
            top_k: None,
            stream: false,
        }
    }

    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(ClaudeMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

#[derive(Debug)]
pub struct ClaudeTranslate {
    core: EngineCore,
    settings: GenAiSettings,
}

impl ClaudeTranslate {
    pub fn info() -> EngineInfo {
        EngineInfo::new(CLAUDE, "claude", EngineKind::Generative)
            .lang_codes(languages::generative())
            .endpoint("https://api.anthropic.com/v1/messages")
            .stream(true)
            .api_key(
                "sk-ant-xxx...xxx",
                r"^sk-ant-[\w-]+$",
                &["401", "authentication_error", "permission_error", "credit balance is too low"],
            )
            .pacing(genai::pacing())
    }

    pub fn new(preferences: &EnginePreferences, proxy_uri: Option<&str>) -> Result<Self, EngineError> {
        Ok(Self {
            core: EngineCore::new(Self::info(), preferences, proxy_uri)?,
            settings: GenAiSettings::new(preferences, "claude-3-5-sonnet-latest"),
        })
    }

    pub fn request(&self, text: &str) -> ClaudeRequest {
        let request = ClaudeRequest::new(&self.settings.model, 4096)
            .system(self.settings.system_prompt(&self.core))
            .add_message("user", text)
            .top_k(self.settings.top_k)
            .stream(self.core.info.stream);
        match self.settings.sampling {
            Sampling::Temperature => request.temperature(self.settings.temperature),
            Sampling::TopP => request.top_p(self.settings.top_p),
        }
    }
}

#[async_trait]
impl Engine for ClaudeTranslate {
    fn core(&self) -> &EngineCore {
        &self.core
    }

    async fn translate(&self, text: &str) -> Result<TranslationOutput, EngineError> {
        let request = self
            .core
            .client()
            .post(&self.core.info.endpoint)
            .header("x-api-key", self.core.api_key()?)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request(text));
        if self.core.info.stream {
            let response = self.core.send(request, true).await?;
            let deltas = parse_frames(lines(response.bytes_stream()), claude_frame);
            return Ok(TranslationOutput::Stream(deltas));
        }
        let response: ClaudeResponse = self.core.send_json(request).await?;
        Ok(TranslationOutput::Text(response.text()))
    }
}
