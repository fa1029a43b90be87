/*!
 * Translatable elements.
 *
 * An `Element` is one unit pulled out of a book: a page block, a TOC entry,
 * a metadata item, a subtitle block or a PGN comment. Elements are created
 * by [`extraction::Extraction`], owned by an [`handler::ElementHandler`] for
 * the duration of a job, and rewrite their document in place when a
 * translation comes back.
 */

use crate::app_config::{ColumnGap, Config, TranslationPosition};
use crate::engines::Placeholder;
use crate::language_utils;

pub mod dom;
pub mod extraction;
pub mod handler;
pub mod page;
pub mod text;

pub use dom::SelectorSet;
pub use extraction::Extraction;
pub use handler::ElementHandler;
pub use page::PageElement;
pub use text::{MetadataElement, PgnElement, SrtElement, TocElement};

/// Inline nodes replaced by placeholders before translation
pub const DEFAULT_RESERVE_RULES: &[&str] = &[
    "img", "code", "br", "hr", "sub", "sup", "kbd", "abbr", "wbr", "svg", "math", "script", "style", "video",
    "audio", "object", "iframe", "input", "textarea", "button",
];

/// Annotation nodes dropped from the text sent to engines
pub const DEFAULT_REMOVE_RULES: &[&str] = &["rt", "rp"];

/// Settings shared by every element of a job
#[derive(Debug)]
pub struct ElementSettings {
    pub position: TranslationPosition,
    pub translation_color: Option<String>,
    pub original_color: Option<String>,
    pub column_gap: ColumnGap,
    // @field: `dir` attribute of translated elements
    pub target_direction: String,
    // @field: `lang` attribute of translated elements, when enabled
    pub target_lang_tag: Option<String>,
    pub condense_repeats: bool,
    pub placeholder: Placeholder,
    pub reserve: SelectorSet,
    pub remove: SelectorSet,
}

impl Default for ElementSettings {
    fn default() -> Self {
        Self {
            position: TranslationPosition::default(),
            translation_color: None,
            original_color: None,
            column_gap: ColumnGap::default(),
            target_direction: "auto".to_string(),
            target_lang_tag: None,
            condense_repeats: true,
            placeholder: Placeholder::default(),
            reserve: SelectorSet::compile(DEFAULT_RESERVE_RULES),
            remove: SelectorSet::compile(DEFAULT_REMOVE_RULES),
        }
    }
}

impl ElementSettings {
    /// Settings of a job translating into `target_lang`
    pub fn from_config(config: &Config, target_lang: &str, placeholder: Placeholder) -> Self {
        let mut reserve: Vec<String> = DEFAULT_RESERVE_RULES.iter().map(|rule| rule.to_string()).collect();
        reserve.extend(config.reserve_rules.iter().cloned());
        Self {
            position: config.translation_position,
            translation_color: config.translation_color.clone(),
            original_color: config.original_color.clone(),
            column_gap: config.column_gap.clone(),
            target_direction: language_utils::text_direction(target_lang).to_string(),
            target_lang_tag: if config.translation_lang {
                language_utils::language_tag(target_lang)
            } else {
                None
            },
            condense_repeats: config.condense_repeats,
            placeholder,
            reserve: SelectorSet::compile(&reserve),
            remove: SelectorSet::compile(DEFAULT_REMOVE_RULES),
        }
    }
}

/// One translatable unit of any supported format
#[derive(Debug)]
pub enum Element {
    Page(PageElement),
    Toc(TocElement),
    Metadata(MetadataElement),
    Srt(SrtElement),
    Pgn(PgnElement),
}

impl Element {
    /// Serialized source, for diagnostics
    pub fn get_raw(&self) -> String {
        match self {
            Element::Page(element) => element.get_raw(),
            Element::Toc(element) => element.get_text(),
            Element::Metadata(element) => element.get_text(),
            Element::Srt(element) => element.get_raw(),
            Element::Pgn(element) => element.get_raw(),
        }
    }

    pub fn get_text(&self) -> String {
        match self {
            Element::Page(element) => element.get_text(),
            Element::Toc(element) => element.get_text(),
            Element::Metadata(element) => element.get_text(),
            Element::Srt(element) => element.get_text(),
            Element::Pgn(element) => element.get_text(),
        }
    }

    /// Text sent to the engine
    pub fn get_content(&mut self) -> String {
        match self {
            Element::Page(element) => element.get_content(),
            other => other.get_text(),
        }
    }

    pub fn get_attributes(&self) -> Option<String> {
        match self {
            Element::Page(element) => element.get_attributes(),
            _ => None,
        }
    }

    pub fn add_translation(&mut self, translation: Option<&str>) {
        match self {
            Element::Page(element) => element.add_translation(translation),
            Element::Toc(element) => element.add_translation(translation),
            Element::Metadata(element) => element.add_translation(translation),
            Element::Srt(element) => element.add_translation(translation),
            Element::Pgn(element) => element.add_translation(translation),
        }
    }

    pub fn get_translation(&self) -> Option<&str> {
        match self {
            Element::Page(element) => element.get_translation(),
            Element::Toc(element) => element.get_translation(),
            Element::Metadata(element) => element.get_translation(),
            Element::Srt(element) => element.get_translation(),
            Element::Pgn(element) => element.get_translation(),
        }
    }

    /// Identifier of the source page or file
    pub fn page_id(&self) -> Option<&str> {
        match self {
            Element::Page(element) => Some(element.page_id()),
            Element::Srt(element) => Some(element.page_id()),
            Element::Pgn(element) => Some(element.page_id()),
            Element::Toc(_) | Element::Metadata(_) => None,
        }
    }

    pub fn ignored(&self) -> bool {
        match self {
            Element::Page(element) => element.ignored(),
            _ => false,
        }
    }

    /// Only page elements can be ignored; other kinds keep their flag
    pub fn set_ignored(&mut self, ignored: bool) {
        if let Element::Page(element) = self {
            element.set_ignored(ignored);
        }
    }
}
