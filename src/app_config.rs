use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Name of the engine used for translation
    #[serde(default = "default_engine")]
    pub translate_engine: String,

    /// Placement of translated elements
    #[serde(default)]
    pub translation_position: TranslationPosition,

    /// Concatenate elements into larger requests
    #[serde(default)]
    pub merge_enabled: bool,

    /// Character budget of a merged request
    #[serde(default = "default_merge_length")]
    pub merge_length: usize,

    /// How user filter rules are interpreted
    #[serde(default)]
    pub rule_mode: RuleMode,

    /// What user filter rules are matched against
    #[serde(default)]
    pub filter_scope: FilterScope,

    // @field: Paragraphs matching these are kept but never translated
    #[serde(default)]
    pub filter_rules: Vec<String>,

    // @field: CSS selectors of subtrees to leave untouched
    #[serde(default)]
    pub ignore_rules: Vec<String>,

    // @field: CSS selectors always treated as one paragraph
    #[serde(default)]
    pub priority_rules: Vec<String>,

    // @field: CSS selectors of inline nodes replaced by placeholders
    #[serde(default)]
    pub reserve_rules: Vec<String>,

    #[serde(default)]
    pub glossary_enabled: bool,

    #[serde(default)]
    pub glossary_path: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Cache directory, platform data directory when unset
    #[serde(default)]
    pub cache_path: Option<PathBuf>,

    #[serde(default)]
    pub translation_color: Option<String>,

    #[serde(default)]
    pub original_color: Option<String>,

    #[serde(default)]
    pub column_gap: ColumnGap,

    /// Write a `lang` attribute on translated elements
    #[serde(default)]
    pub translation_lang: bool,

    /// Collapse runs of 4+ identical letters in engine output
    #[serde(default = "default_true")]
    pub condense_repeats: bool,

    /// Write the per-paragraph log block
    #[serde(default = "default_true")]
    pub log_translation: bool,

    #[serde(default)]
    pub proxy_uri: Option<String>,

    #[serde(default)]
    pub engine_preferences: HashMap<String, EnginePreferences>,

    /// Declarative engines: name -> JSON definition
    #[serde(default)]
    pub custom_engines: HashMap<String, String>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Where translated text goes relative to the source element
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationPosition {
    Above,
    #[default]
    Below,
    Before,
    After,
    Left,
    Right,
    Only,
}

impl TranslationPosition {
    /// Translation comes first in reading order
    pub fn is_leading(self) -> bool {
        matches!(self, Self::Above | Self::Before | Self::Left)
    }

    pub fn is_side_by_side(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }
}

impl std::str::FromStr for TranslationPosition {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "above" => Ok(Self::Above),
            "below" => Ok(Self::Below),
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "only" => Ok(Self::Only),
            _ => Err(anyhow!("Invalid translation position: {}", s)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuleMode {
    /// Literal, case-insensitive
    #[default]
    Normal,
    /// Literal, case-sensitive
    Case,
    Regex,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FilterScope {
    #[default]
    Text,
    Html,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GapType {
    #[default]
    Percentage,
    SpaceCount,
}

/// Middle column of side-by-side tables
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ColumnGap {
    #[serde(rename = "_type", default)]
    pub gap_type: GapType,

    #[serde(default = "default_gap_percentage")]
    pub percentage: u32,

    #[serde(default = "default_gap_space_count")]
    pub space_count: u32,
}

impl Default for ColumnGap {
    fn default() -> Self {
        Self {
            gap_type: GapType::default(),
            percentage: default_gap_percentage(),
            space_count: default_gap_space_count(),
        }
    }
}

/// Sampling strategy of generative engines; exactly one is sent
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Sampling {
    #[default]
    Temperature,
    TopP,
}

/// Per-engine preferences, every field optional
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct EnginePreferences {
    #[serde(default)]
    pub api_keys: Vec<String>,
    #[serde(default)]
    pub source_lang: Option<String>,
    #[serde(default)]
    pub target_lang: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub sampling: Option<Sampling>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default)]
    pub top_k: Option<u32>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub concurrency_limit: Option<usize>,
    /// Seconds between requests of one worker
    #[serde(default)]
    pub request_interval: Option<f64>,
    #[serde(default)]
    pub request_attempt: Option<u32>,
    /// Seconds
    #[serde(default)]
    pub request_timeout: Option<f64>,
    #[serde(default)]
    pub max_error_count: Option<usize>,
    #[serde(default)]
    pub stream: Option<bool>,
    // @field: Papago / Azure region
    #[serde(default)]
    pub region: Option<String>,
    // @field: Google Cloud project for the advanced API
    #[serde(default)]
    pub project_id: Option<String>,
    // @field: Azure OpenAI api-version query value
    #[serde(default)]
    pub api_version: Option<String>,
}

/// Log level configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_engine() -> String {
    "Google(Free)New".to_string()
}

fn default_merge_length() -> usize {
    1800
}

fn default_gap_percentage() -> u32 {
    10
}

fn default_gap_space_count() -> u32 {
    6
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open config file: {:?}", path))?;
        let config: Config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Save configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        std::fs::write(path.as_ref(), json)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.translate_engine.trim().is_empty() {
            return Err(anyhow!("Translation engine name is required"));
        }
        if self.merge_enabled && self.merge_length == 0 {
            return Err(anyhow!("Merge length must be greater than zero"));
        }
        if self.column_gap.gap_type == GapType::Percentage && self.column_gap.percentage >= 100 {
            return Err(anyhow!("Column gap percentage must be below 100"));
        }
        for color in [&self.translation_color, &self.original_color].into_iter().flatten() {
            if color.trim().is_empty() {
                return Err(anyhow!("Colors must not be empty strings"));
            }
        }
        if self.glossary_enabled && self.glossary_path.is_none() {
            return Err(anyhow!("Glossary is enabled but no glossary path is set"));
        }
        for (name, preferences) in &self.engine_preferences {
            if let (Some(_), Some(_)) = (preferences.temperature, preferences.top_p) {
                if preferences.sampling.is_none() {
                    return Err(anyhow!(
                        "Engine '{}' sets both temperature and top_p; choose one with 'sampling'",
                        name
                    ));
                }
            }
            if preferences.concurrency_limit.is_some_and(|limit| limit > 64) {
                return Err(anyhow!("Engine '{}' concurrency limit must be at most 64", name));
            }
            for (field, value) in [
                ("request_interval", preferences.request_interval),
                ("request_timeout", preferences.request_timeout),
            ] {
                if value.is_some_and(|seconds| !seconds.is_finite() || seconds < 0.0) {
                    return Err(anyhow!("Engine '{}' {} must be a non-negative number of seconds", name, field));
                }
            }
        }
        Ok(())
    }

    /// Preferences of an engine, empty when none are stored
    pub fn preferences(&self, engine_name: &str) -> EnginePreferences {
        self.engine_preferences.get(engine_name).cloned().unwrap_or_default()
    }

    /// Mutable preferences of an engine, created on demand
    pub fn preferences_mut(&mut self, engine_name: &str) -> &mut EnginePreferences {
        self.engine_preferences.entry(engine_name.to_string()).or_default()
    }

    /// Merge length applied to this job, `None` when merging is off
    pub fn effective_merge_length(&self) -> Option<usize> {
        self.merge_enabled.then_some(self.merge_length)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Self {
            translate_engine: default_engine(),
            translation_position: TranslationPosition::default(),
            merge_enabled: false,
            merge_length: default_merge_length(),
            rule_mode: RuleMode::default(),
            filter_scope: FilterScope::default(),
            filter_rules: Vec::new(),
            ignore_rules: Vec::new(),
            priority_rules: Vec::new(),
            reserve_rules: Vec::new(),
            glossary_enabled: false,
            glossary_path: None,
            cache_enabled: true,
            cache_path: None,
            translation_color: None,
            original_color: None,
            column_gap: ColumnGap::default(),
            translation_lang: false,
            condense_repeats: true,
            log_translation: true,
            proxy_uri: None,
            engine_preferences: HashMap::new(),
            custom_engines: HashMap::new(),
            log_level: LogLevel::default(),
        }
    }
}
