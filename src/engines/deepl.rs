/*!
 * DeepL engines (free and pro accounts).
 *
 * Both share the wire format and differ only in host and key shape: free
 * account keys end with `:fx`.
 */

use async_trait::async_trait;
use serde::Deserialize;

use crate::app_config::EnginePreferences;
use crate::engines::base::{EngineCore, EngineInfo, EngineKind, Pacing};
use crate::engines::{languages, Engine, TranslationOutput};
use crate::errors::EngineError;

pub const DEEPL: &str = "DeepL";
pub const DEEPL_PRO: &str = "DeepL(Pro)";

const KEY_ERRORS: &[&str] = &["403", "456", "Authorization failure", "Quota exceeded"];

#[derive(Debug, Deserialize)]
pub struct DeeplResponse {
    pub translations: Vec<DeeplTranslation>,
}

#[derive(Debug, Deserialize)]
pub struct DeeplTranslation {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct DeeplUsage {
    pub character_count: u64,
    pub character_limit: u64,
}

impl DeeplUsage {
    pub fn report(&self) -> String {
        let left = self.character_limit.saturating_sub(self.character_count);
        format!(
            "{} total, {} used, {} left",
            self.character_limit, self.character_count, left
        )
    }
}

#[derive(Debug)]
pub struct DeeplTranslate {
    core: EngineCore,
}

impl DeeplTranslate {
    pub fn free_info() -> EngineInfo {
        EngineInfo::new(DEEPL, "deepl", EngineKind::Standard)
            .lang_codes(languages::deepl())
            .endpoint("https://api-free.deepl.com/v2")
            .api_key("xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx:fx", r"^[a-z0-9-]+:fx$", KEY_ERRORS)
            .pacing(Pacing {
                concurrency_limit: 2,
                ..Pacing::default()
            })
    }

    pub fn pro_info() -> EngineInfo {
        EngineInfo::new(DEEPL_PRO, "deepl_pro", EngineKind::Standard)
            .lang_codes(languages::deepl())
            .endpoint("https://api.deepl.com/v2")
            .api_key("xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx", r"^[a-z0-9-]+$", KEY_ERRORS)
            .pacing(Pacing {
                concurrency_limit: 4,
                ..Pacing::default()
            })
    }

    pub fn free(preferences: &EnginePreferences, proxy_uri: Option<&str>) -> Result<Self, EngineError> {
        Ok(Self {
            core: EngineCore::new(Self::free_info(), preferences, proxy_uri)?,
        })
    }

    pub fn pro(preferences: &EnginePreferences, proxy_uri: Option<&str>) -> Result<Self, EngineError> {
        Ok(Self {
            core: EngineCore::new(Self::pro_info(), preferences, proxy_uri)?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.core.info.endpoint.trim_end_matches('/'), path)
    }

    fn auth(&self) -> Result<String, EngineError> {
        Ok(format!("DeepL-Auth-Key {}", self.core.api_key()?))
    }

    /// Form fields of a translate request
    pub fn form(&self, text: &str) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("text", text.to_string()),
            ("target_lang", self.core.target_code()),
        ];
        if !self.core.is_auto_source() {
            form.push(("source_lang", self.core.source_code()));
        }
        form
    }
}

#[async_trait]
impl Engine for DeeplTranslate {
    fn core(&self) -> &EngineCore {
        &self.core
    }

    async fn translate(&self, text: &str) -> Result<TranslationOutput, EngineError> {
        let request = self
            .core
            .client()
            .post(self.url("translate"))
            .header("Authorization", self.auth()?)
            .form(&self.form(text));
        let response: DeeplResponse = self.core.send_json(request).await?;
        let translation = response
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or_else(|| EngineError::UnexpectedResult("Empty translations list".to_string()))?;
        Ok(TranslationOutput::Text(translation))
    }

    async fn get_usage(&self) -> Result<Option<String>, EngineError> {
        let request = self
            .core
            .client()
            .get(self.url("usage"))
            .header("Authorization", self.auth()?);
        let usage: DeeplUsage = self.core.send_json(request).await?;
        Ok(Some(usage.report()))
    }
}
