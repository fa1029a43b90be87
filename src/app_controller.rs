use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::book::Book;
use crate::cache::{self, CacheDirectory, Paragraph, TranslationCache};
use crate::element::{ElementHandler, ElementSettings, Extraction};
use crate::engines::{Engine, EngineRegistry};
use crate::errors::TranslationError;
use crate::language_utils;
use crate::translation::{Glossary, Translation};

// @module: Application controller driving one translation job

/// Text encoding recorded in cache fingerprints
const SOURCE_ENCODING: &str = "utf-8";

/// What a job should do
#[derive(Debug, Clone, Default)]
pub struct JobOptions {
    // @field: Unpacked ebook directory
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    // @field: Overrides the engine's configured target language
    pub target_lang: Option<String>,
    pub source_lang: Option<String>,
    // @field: Translate again even when the cache has a translation
    pub fresh: bool,
    // @field: Only write back what the cache already holds
    pub cache_only: bool,
}

/// Outcome of a job
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobSummary {
    pub paragraphs: usize,
    pub translated: usize,
    pub cached: usize,
    pub failed: usize,
    pub canceled: bool,
    pub duration: Duration,
}

/// Main application controller for ebook translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    registry: EngineRegistry,
    // @field: Set to stop the running job at the next suspension point
    cancel: Arc<AtomicBool>,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry: EngineRegistry::from_config(&config),
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    /// Flag that cancels the running job when set
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Cache directory from the configuration, or the default one
    pub fn cache_directory(&self) -> CacheDirectory {
        CacheDirectory::new(
            self.config
                .cache_path
                .clone()
                .unwrap_or_else(CacheDirectory::default_path),
        )
    }

    /// Instantiate the configured engine with the job's languages
    pub fn create_engine(&self, options: &JobOptions) -> Result<Arc<dyn Engine>> {
        let engine = self
            .registry
            .create_from_config(&self.config)
            .with_context(|| format!("Failed to create engine '{}'", self.config.translate_engine))?;
        if let Some(source) = &options.source_lang {
            engine.set_source_lang(&language_utils::resolve_display_name(source))?;
        }
        if let Some(target) = &options.target_lang {
            engine.set_target_lang(&language_utils::resolve_display_name(target))?;
        }
        Ok(engine)
    }

    /// Quota report of the configured engine
    pub async fn usage(&self) -> Result<Option<String>> {
        let engine = self.create_engine(&JobOptions::default())?;
        Ok(engine.get_usage().await?)
    }

    /// Translate the ebook described by `options` with the configured engine
    pub async fn run(&self, options: &JobOptions) -> Result<JobSummary> {
        let engine = self.create_engine(options)?;
        self.run_with_engine(engine, options).await
    }

    fn open_cache(&self, options: &JobOptions, engine: &dyn Engine, merge_length: usize) -> Result<TranslationCache> {
        if !self.config.cache_enabled {
            return TranslationCache::in_memory();
        }
        let input = options
            .input_dir
            .canonicalize()
            .unwrap_or_else(|_| options.input_dir.clone());
        let fingerprint = cache::fingerprint(
            &input.to_string_lossy(),
            engine.name(),
            &engine.target_lang(),
            merge_length,
            SOURCE_ENCODING,
        );
        let directory = self.cache_directory();
        TranslationCache::open(directory.base(), &fingerprint)
    }

    fn load_glossary(&self, engine: &dyn Engine) -> Result<Option<Glossary>> {
        if !self.config.glossary_enabled {
            return Ok(None);
        }
        let Some(path) = &self.config.glossary_path else {
            warn!("Glossary enabled but no glossary_path configured");
            return Ok(None);
        };
        let mut glossary = Glossary::new(engine.placeholder().clone());
        glossary.load(path)?;
        Ok(Some(glossary))
    }

    /// Run a job with an already created engine
    pub async fn run_with_engine(&self, engine: Arc<dyn Engine>, options: &JobOptions) -> Result<JobSummary> {
        let start_time = Instant::now();
        if !options.input_dir.is_dir() {
            return Err(anyhow!("Input directory does not exist: {:?}", options.input_dir));
        }
        self.cancel.store(false, Ordering::SeqCst);

        let book = Book::load_dir(&options.input_dir)?;
        let target_lang = engine.target_lang();
        let settings = Rc::new(ElementSettings::from_config(
            &self.config,
            &target_lang,
            engine.placeholder().clone(),
        ));
        let extraction = Extraction::new(&self.config, Rc::clone(&settings));
        let elements = extraction.extract_book(&book)?;

        let merge_length = self.config.effective_merge_length();
        engine.set_merge_enabled(merge_length.is_some());
        let mut handler = match merge_length {
            Some(length) => ElementHandler::with_merge(
                engine.placeholder().clone(),
                engine.separator(),
                settings.position,
                length,
            ),
            None => ElementHandler::new(engine.placeholder().clone(), engine.separator(), settings.position),
        };
        let mut paragraphs = handler.prepare_original(elements);
        info!(
            "Prepared {} paragraphs from {} pages",
            paragraphs.len(),
            book.pages.len()
        );

        let cache = Arc::new(self.open_cache(options, engine.as_ref(), merge_length.unwrap_or(0))?);
        cache.save(&paragraphs)?;
        if let Some(title) = book.title() {
            cache.set_info("title", &title)?;
        }
        cache.set_info("engine_name", engine.name())?;
        cache.set_info("target_lang", &target_lang)?;
        cache.set_info("merge_length", &merge_length.unwrap_or(0).to_string())?;
        cache.set_info("plugin_version", env!("CARGO_PKG_VERSION"))?;

        let mut summary = JobSummary::default();
        let results = if options.cache_only {
            cache.all_paragraphs(true)?
        } else {
            let pending = cache.all_paragraphs(false)?;
            summary.paragraphs = pending.len();
            self.translate(Arc::clone(&engine), Arc::clone(&cache), pending, options.fresh, &mut summary)
                .await?
        };

        let translations: HashMap<usize, &Paragraph> = results.iter().map(|p| (p.id, p)).collect();
        for paragraph in paragraphs.iter_mut() {
            if let Some(result) = translations.get(&paragraph.id) {
                paragraph.translation = result.translation.clone();
            }
        }
        let cache = Arc::try_unwrap(cache).map_err(|_| anyhow!("Cache is still in use"))?;
        if summary.canceled {
            warn!(
                "Translation canceled, output not written; {} finished paragraphs kept in the cache",
                summary.translated + summary.cached
            );
            cache.close()?;
            summary.duration = start_time.elapsed();
            return Ok(summary);
        }
        handler.add_translations(&paragraphs);
        book.save_dir(&options.output_dir)?;
        cache.done()?;

        summary.duration = start_time.elapsed();
        info!(
            "Translation finished in {}: {} translated, {} cached, {} failed",
            Self::format_duration(summary.duration),
            summary.translated,
            summary.cached,
            summary.failed
        );
        Ok(summary)
    }

    async fn translate(
        &self,
        engine: Arc<dyn Engine>,
        cache: Arc<TranslationCache>,
        pending: Vec<Paragraph>,
        fresh: bool,
        summary: &mut JobSummary,
    ) -> Result<Vec<Paragraph>> {
        let progress_bar = ProgressBar::new(pending.len() as u64);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} paragraphs ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));

        let mut translation = Translation::new(engine.clone());
        if let Some(glossary) = self.load_glossary(engine.as_ref())? {
            translation.set_glossary(glossary);
        }
        translation.set_fresh(fresh);
        translation.set_log_translation(self.config.log_translation);

        let total = pending.len() as f64;
        let bar = progress_bar.clone();
        translation.set_progress(Arc::new(move |fraction, _| {
            bar.set_position((fraction * total).round() as u64);
        }));
        let bar = progress_bar.clone();
        translation.set_logging(Arc::new(move |message, is_error| {
            bar.suspend(|| {
                if is_error {
                    error!("{}", message);
                } else {
                    debug!("{}", message);
                }
            });
        }));
        let writer = Arc::clone(&cache);
        translation.set_callback(Arc::new(move |paragraph| {
            if paragraph.is_cache || paragraph.translation.is_none() {
                return;
            }
            if let Err(e) = writer.update_paragraph(paragraph) {
                error!("Failed to cache paragraph {}: {}", paragraph.id, e);
            }
        }));
        let cancel = Arc::clone(&self.cancel);
        translation.set_cancel_request(Arc::new(move || cancel.load(Ordering::SeqCst)));

        let results = match translation.handle(pending).await {
            Ok(results) => results,
            Err(TranslationError::NoContent) => {
                warn!("{}", TranslationError::NoContent);
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        progress_bar.finish_and_clear();

        summary.canceled = translation.is_canceled();
        summary.cached = results.iter().filter(|p| p.is_cache).count();
        summary.translated = results
            .iter()
            .filter(|p| !p.is_cache && p.translation.is_some())
            .count();
        summary.failed = results.iter().filter(|p| p.translation.is_none()).count();
        Ok(results)
    }

    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;
        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
