/*!
 * Element extraction.
 *
 * Walks the body of every page and picks the blocks worth translating.
 * Three rule sets steer the walk:
 * - priority selectors: always one paragraph, even with block children
 * - ignore selectors: kept in place, never translated or descended
 * - filter patterns: translated text that matches is flagged ignored
 */

use kuchiki::NodeRef;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::app_config::{Config, FilterScope, RuleMode};
use crate::book::pgn::PgnDocument;
use crate::book::srt::SrtDocument;
use crate::book::{is_page_media_type, Attachment, Book, Metadata, Page, TocHandle, METADATA_NAMES};
use crate::element::dom::{self, SelectorSet};
use crate::element::{Element, ElementSettings, MetadataElement, PageElement, PgnElement, SrtElement, TocElement};
use crate::errors::ConversionError;
use crate::file_utils::natural_cmp;

/// Paragraphs made only of digits, punctuation and symbols
static NOISE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[-\d\s.'\\"‘’“”,=~!@#$%^&º*|≈<>?/`—…+:–_(){}\[\]]+$"#).unwrap()
});

pub const DEFAULT_PRIORITY_RULES: &[&str] = &["p", "pre", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote"];

pub const DEFAULT_IGNORE_RULES: &[&str] = &["pre", "code", "script", "style", "svg", "math"];

fn with_defaults(defaults: &[&str], rules: &[String]) -> Vec<String> {
    defaults
        .iter()
        .map(|rule| rule.to_string())
        .chain(rules.iter().cloned())
        .collect()
}

/// Compile user filter rules according to `mode`
pub fn compile_filters(rules: &[String], mode: RuleMode) -> Vec<Regex> {
    let mut patterns = Vec::new();
    for rule in rules.iter().map(|rule| rule.trim()).filter(|rule| !rule.is_empty()) {
        let compiled = match mode {
            RuleMode::Normal => RegexBuilder::new(&regex::escape(rule)).case_insensitive(true).build(),
            RuleMode::Case => Regex::new(&regex::escape(rule)),
            RuleMode::Regex => Regex::new(rule),
        };
        match compiled {
            Ok(pattern) => patterns.push(pattern),
            Err(e) => warn!("Skipping invalid filter rule {:?}: {}", rule, e),
        }
    }
    patterns
}

#[derive(Debug)]
pub struct Extraction {
    priority: SelectorSet,
    ignore: SelectorSet,
    filters: Vec<Regex>,
    filter_scope: FilterScope,
    settings: Rc<ElementSettings>,
    canceled: Arc<AtomicBool>,
}

impl Extraction {
    pub fn new(config: &Config, settings: Rc<ElementSettings>) -> Self {
        Self {
            priority: SelectorSet::compile(&with_defaults(DEFAULT_PRIORITY_RULES, &config.priority_rules)),
            ignore: SelectorSet::compile(&with_defaults(DEFAULT_IGNORE_RULES, &config.ignore_rules)),
            filters: compile_filters(&config.filter_rules, config.rule_mode),
            filter_scope: config.filter_scope,
            settings,
            canceled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked between extraction stages
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.canceled)
    }

    pub fn set_canceled(&self, canceled: bool) {
        self.canceled.store(canceled, Ordering::SeqCst);
    }

    fn check_canceled(&self) -> Result<(), ConversionError> {
        if self.canceled.load(Ordering::SeqCst) {
            return Err(ConversionError::Abort);
        }
        Ok(())
    }

    /// Walkable pages in natural href order
    pub fn get_sorted_pages<'a>(&self, pages: &'a [Page]) -> Vec<&'a Page> {
        let mut sorted: Vec<&Page> = pages
            .iter()
            .filter(|page| is_page_media_type(&page.media_type))
            .collect();
        sorted.sort_by(|a, b| natural_cmp(&a.href, &b.href));
        sorted
    }

    /// Elements of every page, filters applied
    pub fn get_elements(&self, pages: &[Page]) -> Result<Vec<Element>, ConversionError> {
        let mut elements = Vec::new();
        for page in self.get_sorted_pages(pages) {
            self.check_canceled()?;
            let Some(body) = page.body() else {
                debug!("Page {} has no body", page.href);
                continue;
            };
            let mut nodes = Vec::new();
            self.extract_elements(&body, &mut nodes);
            if nodes.is_empty() {
                nodes.push((body, false));
            }
            for (node, ignored) in nodes {
                if dom::collapse_whitespace(&node.text_contents()).is_empty() {
                    continue;
                }
                let mut element = PageElement::new(node, &page.href, Rc::clone(&self.settings));
                element.set_ignored(ignored);
                elements.push(Element::Page(element));
            }
        }
        self.check_canceled()?;
        self.filter_elements(&mut elements);
        self.check_canceled()?;
        Ok(elements)
    }

    /// Collect `(node, ignored)` pairs below `root`
    fn extract_elements(&self, root: &NodeRef, out: &mut Vec<(NodeRef, bool)>) {
        for child in dom::element_children(root) {
            if self.ignore.matches(&child) {
                out.push((child, true));
            } else if self.priority.matches(&child)
                || !dom::has_block_descendant(&child)
                || dom::has_direct_text(&child)
            {
                out.push((child, false));
            } else {
                let before = out.len();
                self.extract_elements(&child, out);
                if out.len() == before {
                    out.push((child, false));
                }
            }
        }
    }

    /// Whether the text of an element is noise or matches a user filter
    pub fn is_filtered(&self, text: &str, raw: &str) -> bool {
        if NOISE_PATTERN.is_match(text) {
            return true;
        }
        let subject = match self.filter_scope {
            FilterScope::Text => text,
            FilterScope::Html => raw,
        };
        self.filters.iter().any(|pattern| pattern.is_match(subject))
    }

    pub fn filter_elements(&self, elements: &mut [Element]) {
        for element in elements.iter_mut().filter(|element| !element.ignored()) {
            if self.is_filtered(&element.get_text(), &element.get_raw()) {
                element.set_ignored(true);
            }
        }
    }

    /// TOC entries, depth first
    pub fn extract_toc(&self, toc: &[TocHandle]) -> Vec<Element> {
        let mut elements = Vec::new();
        for node in toc {
            if !node.borrow().title.trim().is_empty() {
                elements.push(Element::Toc(TocElement::new(Rc::clone(node), self.settings.position)));
            }
            let children = node.borrow().children.clone();
            elements.extend(self.extract_toc(&children));
        }
        elements
    }

    pub fn extract_metadata(&self, metadata: &Metadata) -> Vec<Element> {
        METADATA_NAMES
            .iter()
            .flat_map(|name| metadata.items_named(name))
            .filter(|item| !item.borrow().content.trim().is_empty())
            .map(|item| Element::Metadata(MetadataElement::new(item, self.settings.position)))
            .collect()
    }

    pub fn extract_srt(&self, subtitles: &[Attachment<SrtDocument>]) -> Vec<Element> {
        let mut elements = Vec::new();
        for subtitle in subtitles {
            for block in &subtitle.document.blocks {
                if block.borrow().text.trim().is_empty() {
                    continue;
                }
                elements.push(Element::Srt(SrtElement::new(
                    Rc::clone(block),
                    &subtitle.href,
                    self.settings.position,
                )));
            }
        }
        elements
    }

    pub fn extract_pgn(&self, games: &[Attachment<PgnDocument>]) -> Vec<Element> {
        let mut elements = Vec::new();
        for game in games {
            for comment in game.document.comments() {
                if comment.borrow().trim().is_empty() {
                    continue;
                }
                elements.push(Element::Pgn(PgnElement::new(comment, &game.href, self.settings.position)));
            }
        }
        elements
    }

    /// Every element of a book: pages, TOC, metadata, subtitles, games
    pub fn extract_book(&self, book: &Book) -> Result<Vec<Element>, ConversionError> {
        let mut elements = self.get_elements(&book.pages)?;
        elements.extend(self.extract_toc(&book.toc));
        self.check_canceled()?;
        elements.extend(self.extract_metadata(&book.metadata));
        self.check_canceled()?;
        elements.extend(self.extract_srt(&book.subtitles));
        elements.extend(self.extract_pgn(&book.games));
        self.check_canceled()?;
        debug!("Extracted {} elements", elements.len());
        Ok(elements)
    }
}
