/*!
 * Google Gemini `generateContent` engine.
 */

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::app_config::EnginePreferences;
use crate::engines::base::{EngineCore, EngineInfo, EngineKind, Pacing};
use crate::engines::genai::{self, GenAiSettings};
use crate::engines::stream::{gemini_frame, lines, parse_frames};
use crate::engines::{languages, Engine, TranslationOutput};
use crate::errors::EngineError;

pub const GEMINI: &str = "Gemini";

/// Text of a complete `generateContent` answer
pub fn parse_response(body: &Value) -> Result<String, EngineError> {
    if let Some(error) = body.get("error") {
        return Err(EngineError::UnexpectedResult(
            error["message"].as_str().unwrap_or("unknown error").to_string(),
        ));
    }
    let parts = body["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| {
            let reason = body["promptFeedback"]["blockReason"].as_str().unwrap_or("no candidates");
            EngineError::UnexpectedResult(format!("Gemini returned no text: {}", reason))
        })?;
    Ok(parts.iter().filter_map(|part| part["text"].as_str()).collect())
}

#[derive(Debug)]
pub struct GeminiTranslate {
    core: EngineCore,
    settings: GenAiSettings,
}

impl GeminiTranslate {
    pub fn info() -> EngineInfo {
        EngineInfo::new(GEMINI, "gemini", EngineKind::Generative)
            .lang_codes(languages::generative())
            .endpoint("https://generativelanguage.googleapis.com/v1beta/models")
            .stream(true)
            .api_key("API key", r"^[\w-]+$", &["API_KEY_INVALID", "PERMISSION_DENIED", "API key expired"])
            .pacing(Pacing {
                request_interval: Duration::from_secs(1),
                ..genai::pacing()
            })
    }

    pub fn new(preferences: &EnginePreferences, proxy_uri: Option<&str>) -> Result<Self, EngineError> {
        Ok(Self {
            core: EngineCore::new(Self::info(), preferences, proxy_uri)?,
            settings: GenAiSettings::new(preferences, "gemini-1.5-flash"),
        })
    }

    pub fn url(&self) -> String {
        let method = if self.core.info.stream {
            "streamGenerateContent"
        } else {
            "generateContent"
        };
        format!(
            "{}/{}:{}",
            self.core.info.endpoint.trim_end_matches('/'),
            self.settings.model,
            method
        )
    }

    pub fn body(&self, text: &str) -> Value {
        let (name, value) = self.settings.sampling_param();
        let name = if name == "top_p" { "topP" } else { name };
        let mut generation = json!({ "topK": self.settings.top_k });
        generation[name] = json!(value);
        json!({
            "systemInstruction": {"parts": [{"text": self.settings.system_prompt(&self.core)}]},
            "contents": [{"role": "user", "parts": [{"text": text}]}],
            "generationConfig": generation,
        })
    }
}

#[async_trait]
impl Engine for GeminiTranslate {
    fn core(&self) -> &EngineCore {
        &self.core
    }

    async fn translate(&self, text: &str) -> Result<TranslationOutput, EngineError> {
        let streaming = self.core.info.stream;
        let mut query = vec![("key", self.core.api_key()?)];
        if streaming {
            query.push(("alt", "sse".to_string()));
        }
        let request = self
            .core
            .client()
            .post(self.url())
            .query(&query)
            .json(&self.body(text));
        if streaming {
            let response = self.core.send(request, true).await?;
            return Ok(TranslationOutput::Stream(parse_frames(
                lines(response.bytes_stream()),
                gemini_frame,
            )));
        }
        let body: Value = self.core.send_json(request).await?;
        Ok(TranslationOutput::Text(parse_response(&body)?))
    }
}
