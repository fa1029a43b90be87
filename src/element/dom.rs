/*!
 * DOM helpers over kuchiki trees.
 */

use html5ever::{namespace_url, ns, LocalName, QualName};
use kuchiki::traits::TendrilSink;
use kuchiki::{Attribute, ExpandedName, NodeData, NodeRef, Selectors};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Tags whose presence makes an element block-level
pub const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "canvas", "dd", "details", "dialog", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hgroup",
    "hr", "li", "main", "nav", "noscript", "ol", "p", "pre", "section", "table", "tbody", "td", "tfoot", "th",
    "thead", "tr", "ul", "video",
];

/// Elements without content, written as `<tag/>` in XHTML
pub const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];

// Start tag closed with `/>`; quoted attribute values may hold `>` or `/`
static SELF_CLOSING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<([A-Za-z][\w:.-]*)((?:\s+[^\s"'>/=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?)*)\s*/>"#).unwrap()
});

/// Parse a full HTML document
pub fn parse_document(markup: &str) -> NodeRef {
    kuchiki::parse_html().one(markup)
}

/// Parse an XHTML document
///
/// The HTML parser ignores `/>` on ordinary elements, so `<a id="x"/>` is
/// expanded into `<a id="x"></a>` before parsing.
pub fn parse_xhtml(markup: &str) -> NodeRef {
    let expanded = SELF_CLOSING.replace_all(markup, |caps: &regex::Captures| {
        let name = &caps[1];
        if VOID_TAGS.contains(&name.to_ascii_lowercase().as_str()) {
            caps[0].to_string()
        } else {
            format!("<{}{}></{}>", name, &caps[2], name)
        }
    });
    parse_document(&expanded)
}

fn escape_xml(text: &str, in_attribute: bool, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' if in_attribute => output.push_str("&quot;"),
            '\u{a0}' => output.push_str("&#160;"),
            _ => output.push(c),
        }
    }
}

/// Serialize a tree with XML syntax
pub fn to_xhtml(node: &NodeRef) -> String {
    let mut output = String::new();
    write_xhtml(node, &mut output);
    output
}

fn write_xhtml(node: &NodeRef, output: &mut String) {
    match node.data() {
        NodeData::Document(_) | NodeData::DocumentFragment => {
            for child in node.children() {
                write_xhtml(&child, output);
            }
        }
        NodeData::Doctype(doctype) => {
            output.push_str("<!DOCTYPE ");
            output.push_str(&doctype.name);
            if !doctype.public_id.is_empty() {
                output.push_str(&format!(" PUBLIC \"{}\"", doctype.public_id));
                if !doctype.system_id.is_empty() {
                    output.push_str(&format!(" \"{}\"", doctype.system_id));
                }
            } else if !doctype.system_id.is_empty() {
                output.push_str(&format!(" SYSTEM \"{}\"", doctype.system_id));
            }
            output.push('>');
        }
        NodeData::Element(element) => {
            let name: &str = &element.name.local;
            output.push('<');
            output.push_str(name);
            for (key, attribute) in element.attributes.borrow().map.iter() {
                output.push(' ');
                if let Some(prefix) = &attribute.prefix {
                    output.push_str(prefix);
                    output.push(':');
                }
                output.push_str(&key.local);
                output.push_str("=\"");
                escape_xml(&attribute.value, true, output);
                output.push('"');
            }
            if node.first_child().is_none() && VOID_TAGS.contains(&name) {
                output.push_str("/>");
                return;
            }
            output.push('>');
            // Script and style content is raw text
            let raw_text = matches!(name, "script" | "style");
            for child in node.children() {
                match child.as_text() {
                    Some(text) if raw_text => output.push_str(&text.borrow()),
                    _ => write_xhtml(&child, output),
                }
            }
            output.push_str("</");
            output.push_str(name);
            output.push('>');
        }
        NodeData::Text(text) => escape_xml(&text.borrow(), false, output),
        NodeData::Comment(text) => {
            output.push_str("<!--");
            output.push_str(&text.borrow());
            output.push_str("-->");
        }
        NodeData::ProcessingInstruction(contents) => {
            let contents = contents.borrow();
            output.push_str(&format!("<?{} {}?>", contents.0, contents.1));
        }
    }
}

/// Parse markup as the content of a `<body>`, returning detached nodes
pub fn parse_fragment(markup: &str) -> Vec<NodeRef> {
    let document = parse_document(&format!("<html><body>{}</body></html>", markup));
    let Some(body) = body(&document) else {
        return Vec::new();
    };
    let nodes: Vec<NodeRef> = body.children().collect();
    for node in &nodes {
        node.detach();
    }
    nodes
}

pub fn body(document: &NodeRef) -> Option<NodeRef> {
    document
        .descendants()
        .find(|node| tag_name(node).as_deref() == Some("body"))
}

/// Local tag name of an element node
pub fn tag_name(node: &NodeRef) -> Option<String> {
    node.as_element().map(|element| element.name.local.to_string())
}

pub fn is_element(node: &NodeRef) -> bool {
    node.as_element().is_some()
}

/// Create a detached HTML element
pub fn new_element(tag: &str, attributes: &[(String, String)]) -> NodeRef {
    NodeRef::new_element(
        QualName::new(None, ns!(html), LocalName::from(tag)),
        attributes.iter().map(|(name, value)| {
            (
                ExpandedName::new(ns!(), LocalName::from(name.as_str())),
                Attribute {
                    prefix: None,
                    value: value.clone(),
                },
            )
        }),
    )
}

/// Attributes of an element as `(name, value)` pairs sorted by name
pub fn attributes(node: &NodeRef) -> Vec<(String, String)> {
    match node.as_element() {
        Some(element) => element
            .attributes
            .borrow()
            .map
            .iter()
            .map(|(name, attribute)| (name.local.to_string(), attribute.value.clone()))
            .collect(),
        None => Vec::new(),
    }
}

pub fn get_attribute(node: &NodeRef, name: &str) -> Option<String> {
    node.as_element()
        .and_then(|element| element.attributes.borrow().get(name).map(str::to_string))
}

pub fn set_attribute(node: &NodeRef, name: &str, value: &str) {
    if let Some(element) = node.as_element() {
        element
            .attributes
            .borrow_mut()
            .insert(LocalName::from(name), value.to_string());
    }
}

pub fn remove_attribute(node: &NodeRef, name: &str) {
    if let Some(element) = node.as_element() {
        element.attributes.borrow_mut().remove(LocalName::from(name));
    }
}

/// Recursive copy of a node and its subtree
pub fn deep_clone(node: &NodeRef) -> NodeRef {
    let copy = match node.data() {
        NodeData::Element(element) => NodeRef::new_element(
            element.name.clone(),
            element
                .attributes
                .borrow()
                .map
                .iter()
                .map(|(name, attribute)| (name.clone(), attribute.clone())),
        ),
        NodeData::Text(text) => return NodeRef::new_text(text.borrow().clone()),
        NodeData::Comment(comment) => return NodeRef::new_comment(comment.borrow().clone()),
        NodeData::ProcessingInstruction(pi) => {
            let pi = pi.borrow();
            return NodeRef::new_processing_instruction(pi.0.clone(), pi.1.clone());
        }
        NodeData::Doctype(doctype) => {
            return NodeRef::new_doctype(
                doctype.name.clone(),
                doctype.public_id.clone(),
                doctype.system_id.clone(),
            );
        }
        NodeData::Document(_) => NodeRef::new_document(),
        NodeData::DocumentFragment => NodeRef::new(NodeData::DocumentFragment),
    };
    for child in node.children() {
        copy.append(deep_clone(&child));
    }
    copy
}

/// Collapse whitespace runs to one space and trim
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Concatenated text of the direct text children
pub fn direct_text(node: &NodeRef) -> String {
    node.children()
        .filter_map(|child| child.as_text().map(|text| text.borrow().clone()))
        .collect()
}

pub fn has_direct_text(node: &NodeRef) -> bool {
    !direct_text(node).trim().is_empty()
}

/// Any descendant element is block-level
pub fn has_block_descendant(node: &NodeRef) -> bool {
    node.descendants()
        .filter_map(|descendant| tag_name(&descendant))
        .any(|tag| BLOCK_TAGS.contains(&tag.as_str()))
}

pub fn element_children(node: &NodeRef) -> Vec<NodeRef> {
    node.children().filter(is_element).collect()
}

/// Replace `node` with `replacement` in its parent
pub fn replace_with(node: &NodeRef, replacement: NodeRef) {
    node.insert_before(replacement);
    node.detach();
}

/// Serialize the children of a node
pub fn inner_html(node: &NodeRef) -> String {
    node.children().map(|child| child.to_string()).collect()
}

/// A set of CSS selectors, compiled once
#[derive(Default)]
pub struct SelectorSet {
    selectors: Vec<(String, Selectors)>,
}

impl std::fmt::Debug for SelectorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.selectors.iter().map(|(rule, _)| rule))
            .finish()
    }
}

impl SelectorSet {
    /// Compile `rules`, skipping the ones that do not parse
    pub fn compile<S: AsRef<str>>(rules: &[S]) -> Self {
        let mut selectors = Vec::new();
        for rule in rules {
            let rule = rule.as_ref().trim();
            if rule.is_empty() {
                continue;
            }
            match Selectors::compile(rule) {
                Ok(compiled) => selectors.push((rule.to_string(), compiled)),
                Err(()) => warn!("Skipping invalid selector: {}", rule),
            }
        }
        Self { selectors }
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn matches(&self, node: &NodeRef) -> bool {
        let Some(element) = node.clone().into_element_ref() else {
            return false;
        };
        self.selectors
            .iter()
            .any(|(_, selectors)| selectors.matches(&element))
    }
}
