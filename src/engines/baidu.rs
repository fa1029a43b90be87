/*!
 * Baidu general translation API.
 *
 * Keys are `appid|secret` pairs; every request is signed with
 * `md5(appid + text + salt + secret)`.
 */

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

use crate::app_config::EnginePreferences;
use crate::engines::base::{md5_hex, EngineCore, EngineInfo, EngineKind, LangCodes, Pacing};
use crate::engines::{languages, Engine, TranslationOutput};
use crate::errors::EngineError;

pub const BAIDU: &str = "Baidu";

#[derive(Debug, Deserialize)]
pub struct BaiduResponse {
    #[serde(default)]
    pub trans_result: Vec<BaiduResult>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BaiduResult {
    pub dst: String,
}

impl BaiduResponse {
    pub fn text(self) -> Result<String, EngineError> {
        if let Some(code) = self.error_code.filter(|code| code != "52000") {
            return Err(EngineError::UnexpectedResult(format!(
                "{} {}",
                code,
                self.error_msg.unwrap_or_default()
            )));
        }
        if self.trans_result.is_empty() {
            return Err(EngineError::UnexpectedResult("Empty trans_result".to_string()));
        }
        Ok(self
            .trans_result
            .into_iter()
            .map(|result| result.dst)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[derive(Debug)]
pub struct BaiduTranslate {
    core: EngineCore,
}

impl BaiduTranslate {
    pub fn info() -> EngineInfo {
        EngineInfo::new(BAIDU, "baidu", EngineKind::Standard)
            .lang_codes(LangCodes::symmetric(languages::BAIDU))
            .endpoint("https://fanyi-api.baidu.com/api/trans/vip/translate")
            .api_key("appid|appkey", r"^[^\s:\|]+\|[^\s:\|]+$", &["54001", "52003", "54004", "58001"])
            .pacing(Pacing {
                request_interval: Duration::from_secs(1),
                ..Pacing::default()
            })
    }

    pub fn new(preferences: &EnginePreferences, proxy_uri: Option<&str>) -> Result<Self, EngineError> {
        Ok(Self {
            core: EngineCore::new(Self::info(), preferences, proxy_uri)?,
        })
    }

    /// Signed form fields for `text` with the given salt
    pub fn form(&self, text: &str, salt: u32) -> Result<Vec<(&'static str, String)>, EngineError> {
        let key = self.core.api_key()?;
        let (app_id, secret) = key
            .split_once('|')
            .ok_or_else(|| EngineError::BadApiKeyFormat(self.core.info.api_key_hint.clone()))?;
        let salt = salt.to_string();
        let sign = md5_hex(&format!("{}{}{}{}", app_id, text, salt, secret));
        Ok(vec![
            ("appid", app_id.to_string()),
            ("q", text.to_string()),
            ("from", self.core.source_code()),
            ("to", self.core.target_code()),
            ("salt", salt),
            ("sign", sign),
        ])
    }
}

#[async_trait]
impl Engine for BaiduTranslate {
    fn core(&self) -> &EngineCore {
        &self.core
    }

    async fn translate(&self, text: &str) -> Result<TranslationOutput, EngineError> {
        let salt = rand::rng().random_range(32768..65536);
        let request = self
            .core
            .client()
            .post(&self.core.info.endpoint)
            .form(&self.form(text, salt)?);
        let response: BaiduResponse = self.core.send_json(request).await?;
        Ok(TranslationOutput::Text(response.text()?))
    }
}
