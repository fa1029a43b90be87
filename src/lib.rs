/*!
 * # ebook-translator
 *
 * A Rust library for translating ebooks with machine translation and AI
 * engines while keeping the book's structure intact.
 *
 * ## Features
 *
 * - Extract translatable paragraphs from XHTML pages, TOC entries, metadata,
 *   SRT subtitles and PGN comments
 * - Protect inline markup (images, footnote anchors, code) with placeholders
 * - Translate with built-in engines:
 *   - Google, DeepL, Baidu, Youdao, Papago, Microsoft Edge
 *   - ChatGPT, Azure ChatGPT, DeepSeek, Claude, Gemini
 *   - Custom engines declared as JSON
 * - Merge short paragraphs into larger requests and split them back
 * - Resume interrupted jobs from a per-job SQLite cache
 * - Bilingual layouts: above, below, before, after, side by side, or replace
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `book`: Unpacked ebook data model (pages, TOC, metadata, subtitles, games)
 * - `element`: Extraction and re-integration of translatable elements:
 *   - `element::extraction`: Page walk and filters
 *   - `element::page`: Page elements and translation placement
 *   - `element::handler`: Plain and merged paragraph handling
 * - `cache`: Per-job translation cache and cache directory management
 * - `engines`: Engine trait, shared engine core and engine implementations
 * - `translation`: Orchestrator, worker pool, glossary and batch flow
 * - `app_controller`: Main application controller
 * - `file_utils`: File system operations
 * - `language_utils`: Language names, ISO codes and text direction
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod book;
pub mod cache;
pub mod element;
pub mod engines;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::{Config, TranslationPosition};
pub use app_controller::{Controller, JobOptions, JobSummary};
pub use book::Book;
pub use cache::{Paragraph, TranslationCache};
pub use element::{Element, ElementHandler, Extraction};
pub use engines::{Engine, EngineRegistry, Placeholder};
pub use errors::{AppError, ConversionError, EngineError, TranslationError};
pub use translation::{Glossary, Translation};
