/*!
 * Page elements: one block of an (X)HTML page.
 *
 * `get_content` turns the block into engine-safe text, swapping inline
 * fragments that must survive translation for numbered placeholders.
 * `add_translation` writes the engine output back next to (or instead of)
 * the source block.
 */

use kuchiki::NodeRef;
use log::warn;
use regex::{NoExpand, Regex};
use std::rc::Rc;

use crate::app_config::{GapType, TranslationPosition};
use crate::element::dom;
use crate::element::ElementSettings;
use crate::engines::placeholder::RESERVE_ID_WIDTH;

/// Tags that receive the translation inline, inside a `<span>`
pub const CELL_TAGS: &[&str] = &["li", "th", "td", "caption"];

/// Escape text for insertion as markup
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Cut runs of the same letter down to four
pub fn condense_repeats(text: &str) -> String {
    let mut condensed = String::with_capacity(text.len());
    let mut previous: Option<char> = None;
    let mut run = 0;
    for c in text.chars() {
        if previous == Some(c) && c.is_alphabetic() {
            run += 1;
        } else {
            previous = Some(c);
            run = 1;
        }
        if run <= 4 {
            condensed.push(c);
        }
    }
    condensed
}

fn is_break(node: &NodeRef) -> bool {
    dom::tag_name(node).as_deref() == Some("br")
}

/// Split nodes on `<br>` elements, dropping the breaks
fn split_on_breaks(nodes: &[NodeRef]) -> Vec<Vec<NodeRef>> {
    let mut segments = vec![Vec::new()];
    for node in nodes {
        if is_break(node) {
            segments.push(Vec::new());
        } else if let Some(last) = segments.last_mut() {
            last.push(node.clone());
        }
    }
    segments
}

#[derive(Debug)]
pub struct PageElement {
    node: NodeRef,
    page_id: String,
    ignored: bool,
    settings: Rc<ElementSettings>,
    reserved: Vec<String>,
    translation: Option<String>,
}

impl PageElement {
    pub fn new(node: NodeRef, page_id: &str, settings: Rc<ElementSettings>) -> Self {
        Self {
            node,
            page_id: page_id.to_string(),
            ignored: false,
            settings,
            reserved: Vec::new(),
            translation: None,
        }
    }

    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    pub fn ignored(&self) -> bool {
        self.ignored
    }

    pub fn set_ignored(&mut self, ignored: bool) {
        self.ignored = ignored;
    }

    pub fn get_raw(&self) -> String {
        self.node.to_string()
    }

    pub fn get_text(&self) -> String {
        dom::collapse_whitespace(&self.node.text_contents())
    }

    /// Source attributes as a JSON object
    pub fn get_attributes(&self) -> Option<String> {
        let attributes: serde_json::Map<String, serde_json::Value> = dom::attributes(&self.node)
            .into_iter()
            .map(|(name, value)| (name, serde_json::Value::String(value)))
            .collect();
        serde_json::to_string(&attributes).ok()
    }

    /// Serialized reserved fragments, by placeholder index
    pub fn reserved(&self) -> &[String] {
        &self.reserved
    }

    pub fn get_translation(&self) -> Option<&str> {
        self.translation.as_deref()
    }

    /// Engine-safe text of the element
    pub fn get_content(&mut self) -> String {
        let copy = dom::deep_clone(&self.node);

        let noise: Vec<NodeRef> = copy
            .descendants()
            .filter(|node| self.settings.remove.matches(node))
            .collect();
        for node in noise {
            node.detach();
        }

        let mut targets: Vec<NodeRef> = Vec::new();
        for node in copy.descendants() {
            if !self.settings.reserve.matches(&node) {
                continue;
            }
            if targets
                .iter()
                .any(|target| node.ancestors().any(|ancestor| ancestor == *target))
            {
                continue;
            }
            let target = Self::promote_anchor(&node);
            if target != node {
                targets.retain(|reserved| !reserved.ancestors().any(|ancestor| ancestor == target));
            }
            if !targets.contains(&target) {
                targets.push(target);
            }
        }

        self.reserved.clear();
        for (index, target) in targets.iter().enumerate() {
            self.reserved.push(target.to_string());
            let token = self.settings.placeholder.render_reserve(index);
            dom::replace_with(target, NodeRef::new_text(format!(" {} ", token)));
        }

        dom::collapse_whitespace(&copy.text_contents())
    }

    /// A `<sub>`/`<sup>` alone inside a link stands for the whole link
    fn promote_anchor(node: &NodeRef) -> NodeRef {
        let is_script = matches!(dom::tag_name(node).as_deref(), Some("sub") | Some("sup"));
        if is_script {
            if let Some(parent) = node.parent() {
                if dom::tag_name(&parent).as_deref() == Some("a")
                    && dom::collapse_whitespace(&parent.text_contents())
                        == dom::collapse_whitespace(&node.text_contents())
                {
                    return parent;
                }
            }
        }
        node.clone()
    }

    /// Markup of a translation with reserved fragments restored
    pub fn translation_markup(&self, translation: &str) -> String {
        let mut markup = escape_html(translation).replace('\n', "<br/>");
        if self.settings.condense_repeats {
            markup = condense_repeats(&markup);
        }
        for (index, raw) in self.reserved.iter().enumerate() {
            let id = format!("{:0width$}", index, width = RESERVE_ID_WIDTH);
            match Regex::new(&format!(r"\s*{}", self.settings.placeholder.pattern(&id))) {
                Ok(pattern) => markup = pattern.replace_all(&markup, NoExpand(raw)).into_owned(),
                Err(e) => warn!("Invalid placeholder pattern for {}: {}", id, e),
            }
        }
        markup
    }

    /// Attributes of a new translation element
    fn translation_attributes(&self, inherited: Vec<(String, String)>) -> Vec<(String, String)> {
        let mut attributes: Vec<(String, String)> = inherited
            .into_iter()
            .filter(|(name, _)| {
                !matches!(name.as_str(), "dir" | "lang")
                    && (name != "id" || self.settings.position == TranslationPosition::Only)
            })
            .collect();
        attributes.push(("dir".to_string(), self.settings.target_direction.clone()));
        if let Some(lang) = &self.settings.target_lang_tag {
            attributes.push(("lang".to_string(), lang.clone()));
        }
        if let Some(color) = &self.settings.translation_color {
            attributes.retain(|(name, _)| name != "style");
            attributes.push(("style".to_string(), format!("color:{}", color)));
        }
        attributes
    }

    /// Write a translation back into the page
    ///
    /// Ignored elements are left alone. Without a translation only the
    /// source coloring and the side-by-side layout are applied.
    pub fn add_translation(&mut self, translation: Option<&str>) {
        if self.ignored {
            return;
        }
        let position = self.settings.position;
        let inherited = dom::attributes(&self.node);

        let fragment = translation
            .map(|text| dom::parse_fragment(&self.translation_markup(text)));

        match fragment {
            Some(nodes) => {
                let tag = dom::tag_name(&self.node).unwrap_or_else(|| "p".to_string());
                if CELL_TAGS.contains(&tag.as_str()) {
                    self.add_to_cell(nodes);
                } else if !self.align_line_breaks(&nodes) {
                    let element = dom::new_element(&tag, &self.translation_attributes(inherited));
                    for node in nodes {
                        element.append(node);
                    }
                    self.translation = Some(element.to_string());
                    match position {
                        TranslationPosition::Below | TranslationPosition::After => {
                            self.node.insert_after(element)
                        }
                        TranslationPosition::Above | TranslationPosition::Before => {
                            self.node.insert_before(element)
                        }
                        TranslationPosition::Only => dom::replace_with(&self.node, element),
                        TranslationPosition::Left | TranslationPosition::Right => {
                            self.wrap_in_table(Some(element))
                        }
                    }
                }
            }
            None if position.is_side_by_side() => self.wrap_in_table(None),
            None => {}
        }

        if position != TranslationPosition::Only || translation.is_none() {
            self.color_original();
        }
    }

    fn span(&self, nodes: Vec<NodeRef>) -> NodeRef {
        let span = dom::new_element("span", &self.translation_attributes(Vec::new()));
        for node in nodes {
            span.append(node);
        }
        span
    }

    /// Inline placement for list items and table cells
    fn add_to_cell(&mut self, nodes: Vec<NodeRef>) {
        let node = self.node.clone();
        let break_node = || dom::new_element("br", &[]);
        if self.settings.position == TranslationPosition::Only {
            for child in node.children().collect::<Vec<_>>() {
                child.detach();
            }
            dom::set_attribute(&node, "dir", &self.settings.target_direction);
            for child in nodes {
                node.append(child);
            }
            self.translation = Some(dom::inner_html(&node));
            return;
        }

        let span = self.span(nodes);
        self.translation = Some(span.to_string());
        match self.settings.position {
            TranslationPosition::Above | TranslationPosition::Left => {
                node.prepend(break_node());
                node.prepend(span);
            }
            TranslationPosition::Before => {
                node.prepend(NodeRef::new_text(" "));
                node.prepend(span);
            }
            TranslationPosition::After => {
                node.append(NodeRef::new_text(" "));
                node.append(span);
            }
            _ => {
                node.append(break_node());
                node.append(span);
            }
        }
    }

    /// Pair each source line break with one translated line
    ///
    /// Applies when the source has direct `<br>` children and the
    /// translation carries exactly as many top-level breaks.
    fn align_line_breaks(&mut self, nodes: &[NodeRef]) -> bool {
        let leading = match self.settings.position {
            TranslationPosition::Above => true,
            TranslationPosition::Below => false,
            _ => return false,
        };
        let children: Vec<NodeRef> = self.node.children().collect();
        let source_breaks: Vec<NodeRef> = children.iter().filter(|c| is_break(c)).cloned().collect();
        let translated_breaks = nodes.iter().filter(|n| is_break(n)).count();
        if source_breaks.is_empty() || source_breaks.len() != translated_breaks {
            return false;
        }

        let source_segments = split_on_breaks(&children);
        let translated_segments = split_on_breaks(nodes);
        for child in &children {
            child.detach();
        }

        let mut spans = Vec::new();
        for (index, (segment, translated)) in source_segments
            .into_iter()
            .zip(translated_segments)
            .enumerate()
        {
            let span = self.span(translated);
            spans.push(span.to_string());
            if leading {
                self.node.append(span);
                self.node.append(dom::new_element("br", &[]));
                for node in segment {
                    self.node.append(node);
                }
            } else {
                for node in segment {
                    self.node.append(node);
                }
                self.node.append(dom::new_element("br", &[]));
                self.node.append(span);
            }
            if let Some(source_break) = source_breaks.get(index) {
                self.node.append(source_break.clone());
            }
        }
        self.translation = Some(spans.join("<br/>"));
        true
    }

    /// Two-column table holding the source and its translation
    fn wrap_in_table(&mut self, translation: Option<NodeRef>) {
        let gap = &self.settings.column_gap;
        let column = |width: Option<String>| {
            let mut attributes = vec![("valign".to_string(), "top".to_string())];
            if let Some(width) = width {
                attributes.push(("width".to_string(), width));
            }
            dom::new_element("td", &attributes)
        };

        let (outer_width, middle) = match gap.gap_type {
            GapType::Percentage => {
                let outer = 100u32.saturating_sub(gap.percentage) / 2;
                (
                    Some(format!("{}%", outer)),
                    dom::new_element("td", &[("width".to_string(), format!("{}%", gap.percentage))]),
                )
            }
            GapType::SpaceCount => {
                let middle = dom::new_element("td", &[]);
                middle.append(NodeRef::new_text("\u{a0}".repeat(gap.space_count as usize)));
                (None, middle)
            }
        };

        let original_column = column(outer_width.clone());
        let translation_column = column(outer_width);
        if let Some(translation) = translation {
            translation_column.append(translation);
        }

        let row = dom::new_element("tr", &[]);
        let (first, last) = if self.settings.position == TranslationPosition::Left {
            (translation_column, original_column.clone())
        } else {
            (original_column.clone(), translation_column)
        };
        row.append(first);
        row.append(middle);
        row.append(last);

        let table = dom::new_element("table", &[("width".to_string(), "100%".to_string())]);
        table.append(row);
        dom::replace_with(&self.node, table);
        original_column.append(self.node.clone());
    }

    /// Paint the source subtree with the original color
    fn color_original(&self) {
        let Some(color) = &self.settings.original_color else {
            return;
        };
        let style = format!("color:{}", color);
        for node in self.node.inclusive_descendants() {
            if dom::is_element(&node) && node.first_child().is_some() {
                dom::set_attribute(&node, "style", &style);
            }
        }
    }
}
