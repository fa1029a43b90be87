/*!
 * Youdao text translation API (signature v3).
 */

use async_trait::async_trait;
use serde::Deserialize;

use crate::app_config::EnginePreferences;
use crate::engines::base::{sha256_hex, EngineCore, EngineInfo, EngineKind, LangCodes, Pacing};
use crate::engines::{languages, Engine, TranslationOutput};
use crate::errors::EngineError;

pub const YOUDAO: &str = "Youdao";

#[derive(Debug, Deserialize)]
pub struct YoudaoResponse {
    #[serde(rename = "errorCode")]
    pub error_code: String,
    #[serde(default)]
    pub translation: Vec<String>,
}

impl YoudaoResponse {
    pub fn text(self) -> Result<String, EngineError> {
        if self.error_code != "0" {
            return Err(EngineError::UnexpectedResult(format!("errorCode {}", self.error_code)));
        }
        if self.translation.is_empty() {
            return Err(EngineError::UnexpectedResult("Empty translation".to_string()));
        }
        Ok(self.translation.join("\n"))
    }
}

/// Text digest fed into the signature: short texts verbatim, long ones abbreviated
pub fn sign_input(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= 20 {
        return text.to_string();
    }
    let head: String = chars[..10].iter().collect();
    let tail: String = chars[chars.len() - 10..].iter().collect();
    format!("{}{}{}", head, chars.len(), tail)
}

#[derive(Debug)]
pub struct YoudaoTranslate {
    core: EngineCore,
}

impl YoudaoTranslate {
    pub fn info() -> EngineInfo {
        EngineInfo::new(YOUDAO, "youdao", EngineKind::Standard)
            .lang_codes(LangCodes::symmetric(languages::YOUDAO))
            .endpoint("https://openapi.youdao.com/api")
            .api_key("appKey|appSecret", r"^[^\s:\|]+\|[^\s:\|]+$", &["108", "202", "401", "411"])
            .pacing(Pacing::default())
    }

    pub fn new(preferences: &EnginePreferences, proxy_uri: Option<&str>) -> Result<Self, EngineError> {
        Ok(Self {
            core: EngineCore::new(Self::info(), preferences, proxy_uri)?,
        })
    }

    /// Signed form fields for `text`
    pub fn form(&self, text: &str, salt: &str, curtime: i64) -> Result<Vec<(&'static str, String)>, EngineError> {
        let key = self.core.api_key()?;
        let (app_key, secret) = key
            .split_once('|')
            .ok_or_else(|| EngineError::BadApiKeyFormat(self.core.info.api_key_hint.clone()))?;
        let curtime = curtime.to_string();
        let sign = sha256_hex(&format!("{}{}{}{}{}", app_key, sign_input(text), salt, curtime, secret));
        Ok(vec![
            ("q", text.to_string()),
            ("from", self.core.source_code()),
            ("to", self.core.target_code()),
            ("appKey", app_key.to_string()),
            ("salt", salt.to_string()),
            ("sign", sign),
            ("signType", "v3".to_string()),
            ("curtime", curtime),
        ])
    }
}

#[async_trait]
impl Engine for YoudaoTranslate {
    fn core(&self) -> &EngineCore {
        &self.core
    }

    async fn translate(&self, text: &str) -> Result<TranslationOutput, EngineError> {
        let now = chrono::Utc::now();
        let salt = now.timestamp_millis().to_string();
        let form = self.form(text, &salt, now.timestamp())?;
        let request = self.core.client().post(&self.core.info.endpoint).form(&form);
        let response: YoudaoResponse = self.core.send_json(request).await?;
        Ok(TranslationOutput::Text(response.text()?))
    }
}
