/*!
 * Naver Papago machine translation through the NCP API gateway.
 */

use async_trait::async_trait;
use serde::Deserialize;

use crate::app_config::EnginePreferences;
use crate::engines::base::{EngineCore, EngineInfo, EngineKind, LangCodes, Pacing};
use crate::engines::{languages, Engine, TranslationOutput};
use crate::errors::EngineError;

pub const PAPAGO: &str = "Papago";

#[derive(Debug, Deserialize)]
struct PapagoResponse {
    message: PapagoMessage,
}

#[derive(Debug, Deserialize)]
struct PapagoMessage {
    result: PapagoResult,
}

#[derive(Debug, Deserialize)]
struct PapagoResult {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// Pull the translated text out of a response body
pub fn parse_response(body: &str) -> Result<String, EngineError> {
    let response: PapagoResponse = serde_json::from_str(body)?;
    Ok(response.message.result.translated_text)
}

#[derive(Debug)]
pub struct PapagoTranslate {
    core: EngineCore,
}

impl PapagoTranslate {
    pub fn info() -> EngineInfo {
        EngineInfo::new(PAPAGO, "papago", EngineKind::Standard)
            .lang_codes(LangCodes::symmetric(languages::PAPAGO))
            .endpoint("https://naveropenapi.apigw.ntruss.com/nmt/v1/translation")
            .api_key("Client ID|Client Secret", r"^[^\s:\|]+\|[^\s:\|]+$", &["401", "Authentication Failed"])
            .pacing(Pacing::default())
    }

    pub fn new(preferences: &EnginePreferences, proxy_uri: Option<&str>) -> Result<Self, EngineError> {
        Ok(Self {
            core: EngineCore::new(Self::info(), preferences, proxy_uri)?,
        })
    }

    pub fn credentials(&self) -> Result<(String, String), EngineError> {
        let key = self.core.api_key()?;
        key.split_once('|')
            .map(|(id, secret)| (id.to_string(), secret.to_string()))
            .ok_or_else(|| EngineError::BadApiKeyFormat(self.core.info.api_key_hint.clone()))
    }
}

#[async_trait]
impl Engine for PapagoTranslate {
    fn core(&self) -> &EngineCore {
        &self.core
    }

    async fn translate(&self, text: &str) -> Result<TranslationOutput, EngineError> {
        let (client_id, secret) = self.credentials()?;
        let request = self
            .core
            .client()
            .post(&self.core.info.endpoint)
            .header("X-NCP-APIGW-API-KEY-ID", client_id)
            .header("X-NCP-APIGW-API-KEY", secret)
            .form(&[
                ("source", self.core.source_code()),
                ("target", self.core.target_code()),
                ("text", text.to_string()),
            ]);
        let body = self.core.send_text(request).await?;
        Ok(TranslationOutput::Text(parse_response(&body)?))
    }
}
