/*!
 * Google translation engines.
 *
 * - `Google(Free)New` talks to the public `translate_a/single` endpoint
 * - `Google(Basic)` uses the Cloud Translation v2 REST API with an API key
 * - `Google(Advanced)` uses the v3 API with a project id and bearer token
 */

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::app_config::EnginePreferences;
use crate::engines::base::{EngineCore, EngineInfo, EngineKind, Pacing};
use crate::engines::{languages, Engine, TranslationOutput};
use crate::errors::EngineError;

pub const GOOGLE_FREE: &str = "Google(Free)New";
pub const GOOGLE_BASIC: &str = "Google(Basic)";
pub const GOOGLE_ADVANCED: &str = "Google(Advanced)";

/// Answer of the public endpoint with `dj=1`
#[derive(Debug, Deserialize)]
pub struct FreeResponse {
    #[serde(default)]
    pub sentences: Vec<FreeSentence>,
}

#[derive(Debug, Deserialize)]
pub struct FreeSentence {
    #[serde(default)]
    pub trans: Option<String>,
}

impl FreeResponse {
    /// Concatenate the translated sentences
    pub fn text(&self) -> Result<String, EngineError> {
        let text: String = self.sentences.iter().filter_map(|s| s.trans.as_deref()).collect();
        if text.is_empty() && !self.sentences.is_empty() {
            return Err(EngineError::UnexpectedResult("No translated sentence".to_string()));
        }
        Ok(text)
    }
}

#[derive(Debug)]
pub struct GoogleFreeTranslate {
    core: EngineCore,
}

impl GoogleFreeTranslate {
    pub fn info() -> EngineInfo {
        EngineInfo::new(GOOGLE_FREE, "google_free_new", EngineKind::Standard)
            .lang_codes(languages::google())
            .endpoint("https://translate.googleapis.com/translate_a/single")
            .method(Method::POST)
            .pacing(Pacing {
                request_interval: Duration::from_millis(500),
                ..Pacing::default()
            })
    }

    pub fn new(preferences: &EnginePreferences, proxy_uri: Option<&str>) -> Result<Self, EngineError> {
        Ok(Self {
            core: EngineCore::new(Self::info(), preferences, proxy_uri)?,
        })
    }

    /// Query string parameters; the text travels in the form body
    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("client", "gtx".to_string()),
            ("sl", self.core.source_code()),
            ("tl", self.core.target_code()),
            ("dt", "t".to_string()),
            ("dj", "1".to_string()),
        ]
    }
}

#[async_trait]
impl Engine for GoogleFreeTranslate {
    fn core(&self) -> &EngineCore {
        &self.core
    }

    async fn translate(&self, text: &str) -> Result<TranslationOutput, EngineError> {
        let request = self
            .core
            .client()
            .request(self.core.info.method.clone(), &self.core.info.endpoint)
            .query(&self.query())
            .form(&[("q", text)]);
        let response: FreeResponse = self.core.send_json(request).await?;
        Ok(TranslationOutput::Text(response.text()?))
    }
}

/// v2 request body
#[derive(Debug, Serialize)]
pub struct BasicRequest<'a> {
    pub q: &'a str,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub format: &'static str,
}

#[derive(Debug, Deserialize)]
struct BasicResponse {
    data: BasicData,
}

#[derive(Debug, Deserialize)]
struct BasicData {
    translations: Vec<TranslatedText>,
}

#[derive(Debug, Deserialize)]
struct TranslatedText {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

fn first_translation(translations: Vec<TranslatedText>) -> Result<String, EngineError> {
    translations
        .into_iter()
        .next()
        .map(|t| t.translated_text)
        .ok_or_else(|| EngineError::UnexpectedResult("Empty translations list".to_string()))
}

const GOOGLE_KEY_ERRORS: &[&str] = &["API_KEY_INVALID", "API key not valid", "PERMISSION_DENIED", "BILLING_DISABLED"];

#[derive(Debug)]
pub struct GoogleBasicTranslate {
    core: EngineCore,
}

impl GoogleBasicTranslate {
    pub fn info() -> EngineInfo {
        EngineInfo::new(GOOGLE_BASIC, "google_basic", EngineKind::Standard)
            .lang_codes(languages::google())
            .endpoint("https://translation.googleapis.com/language/translate/v2")
            .api_key("API key", r"^[^\s:]+$", GOOGLE_KEY_ERRORS)
            .pacing(Pacing {
                concurrency_limit: 4,
                ..Pacing::default()
            })
    }

    pub fn new(preferences: &EnginePreferences, proxy_uri: Option<&str>) -> Result<Self, EngineError> {
        Ok(Self {
            core: EngineCore::new(Self::info(), preferences, proxy_uri)?,
        })
    }

    pub fn body<'a>(&self, text: &'a str) -> BasicRequest<'a> {
        BasicRequest {
            q: text,
            target: self.core.target_code(),
            source: (!self.core.is_auto_source()).then(|| self.core.source_code()),
            format: "text",
        }
    }
}

#[async_trait]
impl Engine for GoogleBasicTranslate {
    fn core(&self) -> &EngineCore {
        &self.core
    }

    async fn translate(&self, text: &str) -> Result<TranslationOutput, EngineError> {
        let request = self
            .core
            .client()
            .post(&self.core.info.endpoint)
            .query(&[("key", self.core.api_key()?)])
            .json(&self.body(text));
        let response: BasicResponse = self.core.send_json(request).await?;
        Ok(TranslationOutput::Text(first_translation(response.data.translations)?))
    }
}

#[derive(Debug, Deserialize)]
struct AdvancedResponse {
    translations: Vec<TranslatedText>,
}

#[derive(Debug)]
pub struct GoogleAdvancedTranslate {
    core: EngineCore,
    project_id: String,
}

impl GoogleAdvancedTranslate {
    pub fn info() -> EngineInfo {
        EngineInfo::new(GOOGLE_ADVANCED, "google_advanced", EngineKind::Standard)
            .lang_codes(languages::google())
            .endpoint("https://translation.googleapis.com/v3/projects/{project_id}:translateText")
            .api_key("OAuth access token", r"^\S+$", GOOGLE_KEY_ERRORS)
            .pacing(Pacing {
                concurrency_limit: 4,
                ..Pacing::default()
            })
    }

    pub fn new(preferences: &EnginePreferences, proxy_uri: Option<&str>) -> Result<Self, EngineError> {
        let project_id = preferences
            .project_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| EngineError::InvalidEngineData(format!("{} needs a project id", GOOGLE_ADVANCED)))?
            .to_string();
        Ok(Self {
            core: EngineCore::new(Self::info(), preferences, proxy_uri)?,
            project_id,
        })
    }

    pub fn url(&self) -> String {
        self.core.info.endpoint.replace("{project_id}", &self.project_id)
    }

    pub fn body(&self, text: &str) -> serde_json::Value {
        let mut body = json!({
            "contents": [text],
            "mimeType": "text/plain",
            "targetLanguageCode": self.core.target_code(),
        });
        if !self.core.is_auto_source() {
            body["sourceLanguageCode"] = json!(self.core.source_code());
        }
        body
    }
}

#[async_trait]
impl Engine for GoogleAdvancedTranslate {
    fn core(&self) -> &EngineCore {
        &self.core
    }

    async fn translate(&self, text: &str) -> Result<TranslationOutput, EngineError> {
        let request = self
            .core
            .client()
            .post(self.url())
            .bearer_auth(self.core.api_key()?)
            .header("x-goog-user-project", &self.project_id)
            .json(&self.body(text));
        let response: AdvancedResponse = self.core.send_json(request).await?;
        Ok(TranslationOutput::Text(first_translation(response.translations)?))
    }
}
