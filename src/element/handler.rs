/*!
 * Element handler: turns elements into paragraphs and back.
 *
 * In plain mode every element is one paragraph. In merge mode consecutive
 * translatable elements are packed into paragraphs of at most
 * `merge_length` characters, each element's content followed by the
 * engine separator, and the translation is split back over the group.
 */

use log::{debug, warn};
use regex::{NoExpand, Regex};

use crate::app_config::TranslationPosition;
use crate::cache::Paragraph;
use crate::element::Element;
use crate::engines::Placeholder;

/// Joins translation fragments that end up in one slot
const FRAGMENT_JOINER: &str = "\n\n";

#[derive(Debug)]
pub struct ElementHandler {
    placeholder: Placeholder,
    separator: String,
    position: TranslationPosition,
    merge_length: Option<usize>,
    elements: Vec<Element>,
    // @field: Element ids of each merged paragraph, by paragraph id
    groups: Vec<Vec<usize>>,
}

impl ElementHandler {
    /// One paragraph per element
    pub fn new(placeholder: Placeholder, separator: &str, position: TranslationPosition) -> Self {
        Self {
            placeholder,
            separator: separator.to_string(),
            position,
            merge_length: None,
            elements: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Paragraphs of up to `merge_length` characters
    pub fn with_merge(placeholder: Placeholder, separator: &str, position: TranslationPosition, merge_length: usize) -> Self {
        Self {
            merge_length: Some(merge_length.max(1)),
            ..Self::new(placeholder, separator, position)
        }
    }

    pub fn is_merge(&self) -> bool {
        self.merge_length.is_some()
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Take ownership of `elements` and build the paragraphs to translate
    pub fn prepare_original(&mut self, elements: Vec<Element>) -> Vec<Paragraph> {
        self.elements = elements;
        self.groups.clear();
        match self.merge_length {
            None => self.prepare_plain(),
            Some(limit) => self.prepare_merged(limit),
        }
    }

    fn prepare_plain(&mut self) -> Vec<Paragraph> {
        self.elements
            .iter_mut()
            .enumerate()
            .map(|(id, element)| {
                let content = element.get_content();
                Paragraph::new(
                    id,
                    &element.get_raw(),
                    &content,
                    element.ignored(),
                    element.get_attributes(),
                    element.page_id().map(str::to_string),
                )
            })
            .collect()
    }

    fn prepare_merged(&mut self, limit: usize) -> Vec<Paragraph> {
        let separator = self.separator.clone();
        let mut paragraphs = Vec::new();
        let mut group: Vec<usize> = Vec::new();
        let mut raw = String::new();
        let mut content = String::new();
        let mut page: Option<String> = None;

        let mut flush = |group: &mut Vec<usize>, raw: &mut String, content: &mut String, page: &mut Option<String>, groups: &mut Vec<Vec<usize>>| {
            if group.is_empty() {
                return;
            }
            let id = groups.len();
            paragraphs.push(Paragraph::new(id, raw, content, false, None, page.take()));
            groups.push(std::mem::take(group));
            raw.clear();
            content.clear();
        };

        for (eid, element) in self.elements.iter_mut().enumerate() {
            if element.ignored() {
                continue;
            }
            let text = element.get_content();
            let length = text.chars().count() + separator.chars().count();
            if !group.is_empty() && content.chars().count() + length > limit {
                flush(&mut group, &mut raw, &mut content, &mut page, &mut self.groups);
            }
            if page.is_none() {
                page = element.page_id().map(str::to_string);
            }
            raw.push_str(&element.get_raw());
            raw.push('\n');
            content.push_str(&text);
            content.push_str(&separator);
            group.push(eid);
        }
        flush(&mut group, &mut raw, &mut content, &mut page, &mut self.groups);

        debug!(
            "Merged {} elements into {} paragraphs",
            self.elements.len(),
            paragraphs.len()
        );
        paragraphs
    }

    /// Write translations back into the elements
    ///
    /// Every element is visited, so elements without a translation still get
    /// their coloring and side-by-side layout.
    pub fn add_translations(&mut self, paragraphs: &[Paragraph]) {
        let translation_of = |id: usize| {
            paragraphs
                .iter()
                .find(|paragraph| paragraph.id == id)
                .filter(|paragraph| !paragraph.ignored)
                .and_then(|paragraph| {
                    paragraph
                        .translation
                        .as_ref()
                        .map(|translation| (paragraph.original.clone(), translation.clone()))
                })
        };

        if !self.is_merge() {
            for (eid, element) in self.elements.iter_mut().enumerate() {
                let translation = translation_of(eid).map(|(_, translation)| translation);
                element.add_translation(translation.as_deref());
            }
            return;
        }

        let mut slots: Vec<Option<String>> = vec![None; self.elements.len()];
        for (id, group) in self.groups.iter().enumerate() {
            let Some((original, translation)) = translation_of(id) else {
                continue;
            };
            let aligned = self.align_translation(&original, &translation, group.len());
            for (eid, fragment) in group.iter().zip(aligned) {
                slots[*eid] = fragment;
            }
        }
        for (element, slot) in self.elements.iter_mut().zip(slots) {
            element.add_translation(slot.as_deref());
        }
    }

    /// Rewrite legacy numbered separators into the real separator
    fn compatibilize(&self, text: &str) -> String {
        let pattern = format!(r"\s*{}\s*", self.placeholder.pattern(r"(?:0|[^0]\d*)"));
        match Regex::new(&pattern) {
            Ok(pattern) => pattern.replace_all(text, NoExpand(&self.separator)).into_owned(),
            Err(e) => {
                warn!("Invalid separator pattern: {}", e);
                text.to_string()
            }
        }
    }

    fn split(&self, text: &str) -> Vec<String> {
        text.split(self.separator.as_str())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Spread a merged translation over `count` elements
    pub fn align_translation(&self, original: &str, translation: &str, count: usize) -> Vec<Option<String>> {
        let (original, translation) = if translation.ends_with(self.separator.as_str()) {
            (original.to_string(), translation.to_string())
        } else {
            (self.compatibilize(original), self.compatibilize(translation))
        };
        let originals = self.split(&original);
        let mut translations = self.split(&translation);
        if originals.len() != count {
            debug!(
                "Merged original has {} parts for {} elements",
                originals.len(),
                count
            );
        }
        if count == 0 {
            return Vec::new();
        }

        let total = translations.len();
        if total > count {
            // Leading translations take the surplus in the first slot
            if self.position.is_leading() && !self.position.is_side_by_side() {
                let head = translations.drain(..total - count).collect::<Vec<_>>().join(FRAGMENT_JOINER);
                translations.insert(0, head);
            }
            let tail = translations.split_off(count - 1).join(FRAGMENT_JOINER);
            translations.push(tail);
            return translations.into_iter().map(Some).collect();
        }

        let mut slots: Vec<Option<String>> = translations.into_iter().map(Some).collect();
        if total < count {
            if self.position.is_side_by_side() || total == 0 {
                slots.resize(count, None);
            } else if self.position.is_leading() {
                slots.resize(count, None);
            } else {
                // The last translation covers the remaining originals
                let last = slots.pop().flatten();
                slots.resize(count - 1, None);
                slots.push(last);
            }
        }
        slots
    }
}
