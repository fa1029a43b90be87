/*!
 * Microsoft Edge built-in translator.
 *
 * A short-lived bearer token is fetched from the Edge auth endpoint and
 * reused until it is close to expiry.
 */

use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};

use crate::app_config::EnginePreferences;
use crate::engines::base::{EngineCore, EngineInfo, EngineKind, Pacing};
use crate::engines::{languages, Engine, TranslationOutput};
use crate::errors::EngineError;

pub const MICROSOFT_EDGE: &str = "MicrosoftEdge(Free)";

const AUTH_URL: &str = "https://edge.microsoft.com/translate/auth";

/// Tokens live ten minutes; refresh a little earlier
const TOKEN_LIFETIME: Duration = Duration::from_secs(8 * 60);

#[derive(Debug, Deserialize)]
struct MicrosoftItem {
    translations: Vec<MicrosoftTranslation>,
}

#[derive(Debug, Deserialize)]
struct MicrosoftTranslation {
    text: String,
}

pub fn parse_response(body: &str) -> Result<String, EngineError> {
    let items: Vec<MicrosoftItem> = serde_json::from_str(body)?;
    items
        .into_iter()
        .next()
        .and_then(|item| item.translations.into_iter().next())
        .map(|translation| translation.text)
        .ok_or_else(|| EngineError::UnexpectedResult("Empty translations list".to_string()))
}

#[derive(Debug)]
pub struct MicrosoftEdgeTranslate {
    core: EngineCore,
    token: Mutex<Option<(String, Instant)>>,
}

impl MicrosoftEdgeTranslate {
    pub fn info() -> EngineInfo {
        EngineInfo::new(MICROSOFT_EDGE, "microsoft_edge", EngineKind::Standard)
            .lang_codes(languages::microsoft())
            .endpoint("https://api-edge.cognitive.microsofttranslator.com/translate")
            .pacing(Pacing {
                concurrency_limit: 2,
                ..Pacing::default()
            })
    }

    pub fn new(preferences: &EnginePreferences, proxy_uri: Option<&str>) -> Result<Self, EngineError> {
        Ok(Self {
            core: EngineCore::new(Self::info(), preferences, proxy_uri)?,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, EngineError> {
        let cached = self.token.lock().clone();
        if let Some((token, fetched)) = cached {
            if fetched.elapsed() < TOKEN_LIFETIME {
                return Ok(token);
            }
        }
        debug!("Refreshing {} access token", MICROSOFT_EDGE);
        let token = self.core.send_text(self.core.client().get(AUTH_URL)).await?;
        let token = token.trim().to_string();
        if token.is_empty() {
            return Err(EngineError::UnexpectedResult("Empty access token".to_string()));
        }
        *self.token.lock() = Some((token.clone(), Instant::now()));
        Ok(token)
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("api-version", "3.0".to_string()),
            ("to", self.core.target_code()),
            ("textType", "plain".to_string()),
        ];
        if !self.core.is_auto_source() {
            query.push(("from", self.core.source_code()));
        }
        query
    }
}

#[async_trait]
impl Engine for MicrosoftEdgeTranslate {
    fn core(&self) -> &EngineCore {
        &self.core
    }

    async fn translate(&self, text: &str) -> Result<TranslationOutput, EngineError> {
        let token = self.access_token().await?;
        let request = self
            .core
            .client()
            .post(&self.core.info.endpoint)
            .query(&self.query())
            .bearer_auth(token)
            .json(&json!([{ "Text": text }]));
        let body = self.core.send_text(request).await?;
        Ok(TranslationOutput::Text(parse_response(&body)?))
    }
}
