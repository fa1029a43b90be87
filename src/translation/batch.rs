/*!
 * OpenAI batch flow.
 *
 * A whole job is uploaded as one JSONL file of chat-completions requests,
 * processed server-side within 24 hours and retrieved later. The batch and
 * file ids live in the job's cache so a later run can pick them up.
 */

use anyhow::Result;
use log::{debug, info, warn};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::cache::{Paragraph, TranslationCache};
use crate::engines::openai::{parse_chat_response, ChatFlavor, ChatgptTranslate};
use crate::engines::Engine;
use crate::errors::EngineError;

// @const: Cache info keys of a pending batch
pub const BATCH_ID_KEY: &str = "chatgpt_batch_id";
pub const FILE_ID_KEY: &str = "chatgpt_file_id";

/// Model families accepted by the batch API
pub const SUPPORTED_MODELS: &[&str] = &["gpt-4o", "gpt-4-turbo", "gpt-4", "gpt-3.5-turbo", "o1", "o3", "o4"];

const COMPLETION_WINDOW: &str = "24h";
const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Batch object as returned by the API
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchInfo {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub input_file_id: Option<String>,
    #[serde(default)]
    pub output_file_id: Option<String>,
    #[serde(default)]
    pub error_file_id: Option<String>,
    #[serde(default)]
    pub request_counts: Option<RequestCounts>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RequestCounts {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
}

impl BatchInfo {
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }

    /// No further status change will happen
    pub fn is_finished(&self) -> bool {
        matches!(self.status.as_str(), "completed" | "failed" | "expired" | "cancelled")
    }
}

#[derive(Debug, Deserialize)]
struct FileObject {
    id: String,
}

/// Batch client borrowing a configured ChatGPT engine
#[derive(Debug)]
pub struct ChatgptBatchTranslate<'a> {
    engine: &'a ChatgptTranslate,
}

impl<'a> ChatgptBatchTranslate<'a> {
    /// Fails with `UnsupportedModel` when the engine cannot use batches
    pub fn new(engine: &'a ChatgptTranslate) -> Result<Self, EngineError> {
        if engine.flavor() != ChatFlavor::OpenAi {
            return Err(EngineError::UnsupportedModel(format!(
                "{} does not support batch translation",
                engine.name()
            )));
        }
        let model = &engine.settings().model;
        if !is_supported_model(model) {
            return Err(EngineError::UnsupportedModel(model.clone()));
        }
        Ok(Self { engine })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.engine.api_base(), path.trim_start_matches('/'))
    }

    /// One request line per paragraph, keyed by paragraph id
    pub fn build_jsonl(&self, paragraphs: &[Paragraph]) -> String {
        paragraphs
            .iter()
            .filter(|paragraph| !paragraph.ignored)
            .map(|paragraph| {
                let mut body = self.engine.body(&paragraph.original);
                body["stream"] = json!(false);
                json!({
                    "custom_id": paragraph.id.to_string(),
                    "method": "POST",
                    "url": CHAT_COMPLETIONS_PATH,
                    "body": body,
                })
                .to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Upload the request file, returning its id
    pub async fn upload(&self, paragraphs: &[Paragraph]) -> Result<String, EngineError> {
        let content = self.build_jsonl(paragraphs);
        let part = Part::bytes(content.into_bytes())
            .file_name("batch.jsonl")
            .mime_str("application/jsonl")?;
        let form = Form::new().text("purpose", "batch").part("file", part);
        let request = self
            .engine
            .authorize(self.engine.core().client().post(self.url("files")))?
            .multipart(form);
        let file: FileObject = self.engine.core().send_json(request).await?;
        debug!("Uploaded batch file {}", file.id);
        Ok(file.id)
    }

    pub async fn delete_file(&self, file_id: &str) -> Result<bool, EngineError> {
        let request = self
            .engine
            .authorize(self.engine.core().client().delete(self.url(&format!("files/{}", file_id))))?;
        let body: Value = self.engine.core().send_json(request).await?;
        Ok(body["deleted"].as_bool().unwrap_or(false))
    }

    /// Start a batch over an uploaded file, returning the batch id
    pub async fn create(&self, file_id: &str) -> Result<String, EngineError> {
        let request = self
            .engine
            .authorize(self.engine.core().client().post(self.url("batches")))?
            .json(&json!({
                "input_file_id": file_id,
                "endpoint": CHAT_COMPLETIONS_PATH,
                "completion_window": COMPLETION_WINDOW,
            }));
        let batch: BatchInfo = self.engine.core().send_json(request).await?;
        info!("Created batch {} ({})", batch.id, batch.status);
        Ok(batch.id)
    }

    pub async fn check(&self, batch_id: &str) -> Result<BatchInfo, EngineError> {
        let request = self
            .engine
            .authorize(self.engine.core().client().get(self.url(&format!("batches/{}", batch_id))))?;
        self.engine.core().send_json(request).await
    }

    /// True when the batch is cancelling or cancelled
    pub async fn cancel(&self, batch_id: &str) -> Result<bool, EngineError> {
        let request = self
            .engine
            .authorize(self.engine.core().client().post(self.url(&format!("batches/{}/cancel", batch_id))))?;
        let batch: BatchInfo = self.engine.core().send_json(request).await?;
        Ok(matches!(batch.status.as_str(), "cancelling" | "cancelled"))
    }

    /// Translations of a completed batch by paragraph id
    pub async fn retrieve(&self, batch_id: &str) -> Result<HashMap<usize, String>, EngineError> {
        let batch = self.check(batch_id).await?;
        if !batch.is_completed() {
            return Err(EngineError::UnexpectedResult(format!(
                "Batch {} is {}",
                batch_id, batch.status
            )));
        }
        let output_file_id = batch
            .output_file_id
            .ok_or_else(|| EngineError::UnexpectedResult(format!("Batch {} has no output file", batch_id)))?;
        let request = self.engine.authorize(
            self.engine
                .core()
                .client()
                .get(self.url(&format!("files/{}/content", output_file_id))),
        )?;
        let content = self.engine.core().send_text(request).await?;
        Ok(parse_output(&content))
    }
}

/// Model name or dated snapshot of a supported family
pub fn is_supported_model(model: &str) -> bool {
    SUPPORTED_MODELS
        .iter()
        .any(|family| model == *family || model.starts_with(&format!("{}-", family)))
}

/// Parse the output JSONL; lines that failed are skipped
pub fn parse_output(content: &str) -> HashMap<usize, String> {
    let mut translations = HashMap::new();
    for line in content.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let record: Value = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping malformed batch line: {}", e);
                continue;
            }
        };
        let Some(id) = record["custom_id"].as_str().and_then(|id| id.parse::<usize>().ok()) else {
            warn!("Batch line without a usable custom_id");
            continue;
        };
        match parse_chat_response(&record["response"]["body"]) {
            Ok(text) => {
                translations.insert(id, text);
            }
            Err(e) => warn!("Batch request {} failed: {}", id, e),
        }
    }
    translations
}

/// Remember a pending batch in the job cache
pub fn save_ids(cache: &TranslationCache, batch_id: &str, file_id: &str) -> Result<()> {
    cache.set_info(BATCH_ID_KEY, batch_id)?;
    cache.set_info(FILE_ID_KEY, file_id)?;
    Ok(())
}

/// `(batch_id, file_id)` of the pending batch, if any
pub fn load_ids(cache: &TranslationCache) -> Result<Option<(String, String)>> {
    match (cache.get_info(BATCH_ID_KEY)?, cache.get_info(FILE_ID_KEY)?) {
        (Some(batch_id), Some(file_id)) => Ok(Some((batch_id, file_id))),
        _ => Ok(None),
    }
}

pub fn clear_ids(cache: &TranslationCache) -> Result<()> {
    cache.del_info(BATCH_ID_KEY)?;
    cache.del_info(FILE_ID_KEY)?;
    Ok(())
}

/// Write retrieved translations into the cache rows
pub fn apply_translations(
    cache: &TranslationCache,
    paragraphs: &mut [Paragraph],
    translations: &HashMap<usize, String>,
    engine: &dyn Engine,
) -> Result<usize> {
    let mut applied = 0;
    for paragraph in paragraphs.iter_mut() {
        let Some(translation) = translations.get(&paragraph.id) else {
            continue;
        };
        paragraph.translation = Some(translation.clone());
        paragraph.engine_name = Some(engine.name().to_string());
        paragraph.target_lang = Some(engine.target_lang());
        cache.update_paragraph(paragraph)?;
        applied += 1;
    }
    Ok(applied)
}
