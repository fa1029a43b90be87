/*!
 * Chat-completions engines: OpenAI ChatGPT, Azure-hosted ChatGPT and DeepSeek.
 *
 * All three speak the same request body and stream frames; they differ in
 * endpoint, authentication header and default model.
 */

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde_json::{json, Value};

use crate::app_config::EnginePreferences;
use crate::engines::base::{EngineCore, EngineInfo, EngineKind};
use crate::engines::genai::{self, GenAiSettings};
use crate::engines::stream::{chatgpt_frame, lines, parse_frames};
use crate::engines::{languages, Engine, TranslationOutput};
use crate::errors::EngineError;

pub const CHATGPT: &str = "ChatGPT";
pub const AZURE_CHATGPT: &str = "ChatGPT(Azure)";
pub const DEEPSEEK: &str = "DeepSeek";

const DEFAULT_AZURE_API_VERSION: &str = "2024-02-01";

/// Which flavour of the chat-completions API an instance talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatFlavor {
    OpenAi,
    Azure,
    DeepSeek,
}

/// Chat-completions request body
pub fn chat_body(settings: &GenAiSettings, system_prompt: &str, text: &str, stream: bool, with_model: bool) -> Value {
    let mut body = json!({
        "messages": [
            {"role": "system", "content": system_prompt},
            {"role": "user", "content": text},
        ],
        "stream": stream,
    });
    if with_model {
        body["model"] = json!(settings.model);
    }
    let (name, value) = settings.sampling_param();
    body[name] = json!(value);
    body
}

/// Text of a non-streaming chat-completions response
pub fn parse_chat_response(body: &Value) -> Result<String, EngineError> {
    if let Some(error) = body.get("error") {
        return Err(EngineError::UnexpectedResult(
            error["message"].as_str().unwrap_or("unknown error").to_string(),
        ));
    }
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| EngineError::UnexpectedResult(format!("No message content in {}", body)))
}

#[derive(Debug)]
pub struct ChatgptTranslate {
    core: EngineCore,
    flavor: ChatFlavor,
    settings: GenAiSettings,
    api_version: String,
}

impl ChatgptTranslate {
    pub fn openai_info() -> EngineInfo {
        EngineInfo::new(CHATGPT, "chatgpt", EngineKind::Generative)
            .lang_codes(languages::generative())
            .endpoint("https://api.openai.com/v1/chat/completions")
            .stream(true)
            .api_key(
                "sk-xxx...xxx",
                r"^sk-[\w-]+$",
                &["401", "invalid_api_key", "insufficient_quota", "account_deactivated"],
            )
            .pacing(genai::pacing())
    }

    pub fn azure_info() -> EngineInfo {
        EngineInfo::new(AZURE_CHATGPT, "chatgpt_azure", EngineKind::Generative)
            .lang_codes(languages::generative())
            .endpoint("https://{your-resource-name}.openai.azure.com/openai/deployments/{deployment-id}/chat/completions")
            .stream(true)
            .api_key("32-character key", r"^[a-zA-Z0-9]+$", &["401", "Access denied"])
            .pacing(genai::pacing())
    }

    pub fn deepseek_info() -> EngineInfo {
        EngineInfo::new(DEEPSEEK, "deepseek", EngineKind::Generative)
            .lang_codes(languages::generative())
            .endpoint("https://api.deepseek.com/chat/completions")
            .stream(true)
            .api_key("sk-xxx...xxx", r"^sk-\w+$", &["401", "Authentication Fails", "402", "Insufficient Balance"])
            .pacing(genai::pacing())
    }

    fn build(
        info: EngineInfo,
        flavor: ChatFlavor,
        default_model: &str,
        preferences: &EnginePreferences,
        proxy_uri: Option<&str>,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            core: EngineCore::new(info, preferences, proxy_uri)?,
            flavor,
            settings: GenAiSettings::new(preferences, default_model),
            api_version: preferences
                .api_version
                .clone()
                .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
        })
    }

    pub fn openai(preferences: &EnginePreferences, proxy_uri: Option<&str>) -> Result<Self, EngineError> {
        Self::build(Self::openai_info(), ChatFlavor::OpenAi, "gpt-4o-mini", preferences, proxy_uri)
    }

    pub fn azure(preferences: &EnginePreferences, proxy_uri: Option<&str>) -> Result<Self, EngineError> {
        Self::build(Self::azure_info(), ChatFlavor::Azure, "gpt-4o", preferences, proxy_uri)
    }

    pub fn deepseek(preferences: &EnginePreferences, proxy_uri: Option<&str>) -> Result<Self, EngineError> {
        Self::build(Self::deepseek_info(), ChatFlavor::DeepSeek, "deepseek-chat", preferences, proxy_uri)
    }

    pub fn flavor(&self) -> ChatFlavor {
        self.flavor
    }

    pub fn settings(&self) -> &GenAiSettings {
        &self.settings
    }

    /// Request body for `text`
    pub fn body(&self, text: &str) -> Value {
        let prompt = self.settings.system_prompt(&self.core);
        // Azure selects the model through the deployment in the URL
        let with_model = self.flavor != ChatFlavor::Azure;
        chat_body(&self.settings, &prompt, text, self.core.info.stream, with_model)
    }

    /// Attach the flavour-specific authentication
    pub fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, EngineError> {
        let key = self.core.api_key()?;
        Ok(match self.flavor {
            ChatFlavor::Azure => request.header("api-key", key).query(&[("api-version", &self.api_version)]),
            ChatFlavor::OpenAi | ChatFlavor::DeepSeek => request.bearer_auth(key),
        })
    }

    /// Base URL of the OpenAI REST API, used by the batch flow
    pub fn api_base(&self) -> String {
        let endpoint = &self.core.info.endpoint;
        endpoint
            .strip_suffix("/chat/completions")
            .unwrap_or(endpoint)
            .trim_end_matches('/')
            .to_string()
    }
}

#[async_trait]
impl Engine for ChatgptTranslate {
    fn core(&self) -> &EngineCore {
        &self.core
    }

    async fn translate(&self, text: &str) -> Result<TranslationOutput, EngineError> {
        let streaming = self.core.info.stream;
        let request = self.authorize(self.core.client().post(&self.core.info.endpoint))?;
        let request = request.json(&self.body(text));
        if streaming {
            let response = self.core.send(request, true).await?;
            let deltas = parse_frames(lines(response.bytes_stream()), chatgpt_frame);
            return Ok(TranslationOutput::Stream(deltas));
        }
        let body: Value = self.core.send_json(request).await?;
        Ok(TranslationOutput::Text(parse_chat_response(&body)?))
    }
}
