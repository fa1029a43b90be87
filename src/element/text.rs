/*!
 * Elements over plain-text units: TOC entries, metadata items, subtitle
 * blocks and PGN comments. Each holds a shared handle into the document and
 * rewrites it in place.
 */

use crate::app_config::TranslationPosition;
use crate::book::pgn::CommentHandle;
use crate::book::srt::SrtHandle;
use crate::book::{MetadataHandle, TocHandle};

/// Join source and translation the way labels are joined
fn join_label(original: &str, translation: &str, position: TranslationPosition) -> String {
    match position {
        TranslationPosition::Only => translation.to_string(),
        position if position.is_leading() => format!("{} {}", translation, original),
        _ => format!("{} {}", original, translation),
    }
}

#[derive(Debug)]
pub struct TocElement {
    node: TocHandle,
    position: TranslationPosition,
    translation: Option<String>,
}

impl TocElement {
    pub fn new(node: TocHandle, position: TranslationPosition) -> Self {
        Self {
            node,
            position,
            translation: None,
        }
    }

    pub fn get_text(&self) -> String {
        self.node.borrow().title.trim().to_string()
    }

    pub fn add_translation(&mut self, translation: Option<&str>) {
        let Some(translation) = translation.map(str::trim) else {
            return;
        };
        let original = self.get_text();
        if translation.is_empty() || translation == original {
            return;
        }
        self.node.borrow_mut().title = join_label(&original, translation, self.position);
        self.translation = Some(translation.to_string());
    }

    pub fn get_translation(&self) -> Option<&str> {
        self.translation.as_deref()
    }
}

#[derive(Debug)]
pub struct MetadataElement {
    item: MetadataHandle,
    position: TranslationPosition,
    translation: Option<String>,
}

impl MetadataElement {
    pub fn new(item: MetadataHandle, position: TranslationPosition) -> Self {
        Self {
            item,
            position,
            translation: None,
        }
    }

    pub fn name(&self) -> String {
        self.item.borrow().name.clone()
    }

    pub fn get_text(&self) -> String {
        self.item.borrow().content.trim().to_string()
    }

    pub fn add_translation(&mut self, translation: Option<&str>) {
        let Some(translation) = translation.map(str::trim) else {
            return;
        };
        let original = self.get_text();
        if translation.is_empty() || translation == original {
            return;
        }
        self.item.borrow_mut().content = join_label(&original, translation, self.position);
        self.translation = Some(translation.to_string());
    }

    pub fn get_translation(&self) -> Option<&str> {
        self.translation.as_deref()
    }
}

#[derive(Debug)]
pub struct SrtElement {
    block: SrtHandle,
    page_id: String,
    position: TranslationPosition,
    translation: Option<String>,
}

impl SrtElement {
    pub fn new(block: SrtHandle, page_id: &str, position: TranslationPosition) -> Self {
        Self {
            block,
            page_id: page_id.to_string(),
            position,
            translation: None,
        }
    }

    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    pub fn get_raw(&self) -> String {
        self.block.borrow().to_string()
    }

    pub fn get_text(&self) -> String {
        self.block.borrow().text.clone()
    }

    /// Subtitle lines, kept line by line
    pub fn add_translation(&mut self, translation: Option<&str>) {
        let Some(translation) = translation.map(str::trim).filter(|t| !t.is_empty()) else {
            return;
        };
        let original = self.get_text();
        let text = match self.position {
            TranslationPosition::Only => translation.to_string(),
            position if position.is_leading() => format!("{}\n{}", translation, original),
            _ => format!("{}\n{}", original, translation),
        };
        self.block.borrow_mut().text = text;
        self.translation = Some(translation.to_string());
    }

    pub fn get_translation(&self) -> Option<&str> {
        self.translation.as_deref()
    }
}

#[derive(Debug)]
pub struct PgnElement {
    comment: CommentHandle,
    page_id: String,
    position: TranslationPosition,
    translation: Option<String>,
}

impl PgnElement {
    pub fn new(comment: CommentHandle, page_id: &str, position: TranslationPosition) -> Self {
        Self {
            comment,
            page_id: page_id.to_string(),
            position,
            translation: None,
        }
    }

    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    pub fn get_raw(&self) -> String {
        format!("{{{}}}", self.comment.borrow())
    }

    pub fn get_text(&self) -> String {
        self.comment.borrow().trim().to_string()
    }

    pub fn add_translation(&mut self, translation: Option<&str>) {
        let Some(translation) = translation.map(str::trim).filter(|t| !t.is_empty()) else {
            return;
        };
        let original = self.get_text();
        // Braces would end the comment early
        let translation = translation.replace(['{', '}'], "");
        let text = match self.position {
            TranslationPosition::Only => translation.clone(),
            position if position.is_leading() => format!("{} | {}", translation, original),
            _ => format!("{} | {}", original, translation),
        };
        *self.comment.borrow_mut() = text;
        self.translation = Some(translation);
    }

    pub fn get_translation(&self) -> Option<&str> {
        self.translation.as_deref()
    }
}
