/*!
 * Format-adapter data model.
 *
 * An ebook reaches the core as a manifest of parsed pages plus a table of
 * contents and a metadata mapping. Subtitle and chess-notation files are
 * carried alongside. The core reads and rewrites these objects in place;
 * packing them back into a container is somebody else's job.
 */

use anyhow::{Context, Result};
use kuchiki::NodeRef;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::element::dom;
use crate::file_utils::FileManager;

pub mod pgn;
pub mod srt;

pub use pgn::PgnDocument;
pub use srt::SrtDocument;

static XML_DECLARATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*<\?xml[^>]*\?>\s*").unwrap());

pub const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";
pub const HTML_MEDIA_TYPE: &str = "text/html";

/// Media types walked by extraction
pub fn is_page_media_type(media_type: &str) -> bool {
    matches!(media_type, XHTML_MEDIA_TYPE | HTML_MEDIA_TYPE)
}

/// A parsed page of the manifest
#[derive(Debug, Clone)]
pub struct Page {
    pub id: String,
    pub media_type: String,
    pub href: String,
    pub data: NodeRef,
    xml_declaration: Option<String>,
}

impl Page {
    pub fn new(id: &str, media_type: &str, href: &str, data: NodeRef) -> Self {
        Self {
            id: id.to_string(),
            media_type: media_type.to_string(),
            href: href.to_string(),
            data,
            xml_declaration: None,
        }
    }

    /// Parse XHTML markup, remembering its XML declaration
    pub fn from_xhtml(id: &str, href: &str, markup: &str) -> Self {
        let declaration = XML_DECLARATION
            .find(markup)
            .map(|m| m.as_str().trim().to_string());
        let body = XML_DECLARATION.replace(markup, "");
        Self {
            xml_declaration: declaration,
            ..Self::new(id, XHTML_MEDIA_TYPE, href, dom::parse_xhtml(&body))
        }
    }

    pub fn from_html(id: &str, href: &str, markup: &str) -> Self {
        Self::new(id, HTML_MEDIA_TYPE, href, dom::parse_document(markup))
    }

    pub fn body(&self) -> Option<NodeRef> {
        dom::body(&self.data)
    }

    pub fn is_xhtml(&self) -> bool {
        self.media_type == XHTML_MEDIA_TYPE
    }

    /// Serialize the page; XHTML pages are written with XML syntax
    pub fn serialize(&self) -> String {
        if !self.is_xhtml() {
            return self.data.to_string();
        }
        let markup = dom::to_xhtml(&self.data);
        match &self.xml_declaration {
            Some(declaration) => format!("{}\n{}", declaration, markup),
            None => markup,
        }
    }
}

/// One entry of the table of contents
#[derive(Debug, Clone, PartialEq)]
pub struct TocNode {
    pub title: String,
    pub children: Vec<TocHandle>,
}

pub type TocHandle = Rc<RefCell<TocNode>>;

impl TocNode {
    pub fn handle(title: &str, children: Vec<TocHandle>) -> TocHandle {
        Rc::new(RefCell::new(Self {
            title: title.to_string(),
            children,
        }))
    }
}

/// A metadata item with mutable content
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataItem {
    pub name: String,
    pub content: String,
}

pub type MetadataHandle = Rc<RefCell<MetadataItem>>;

/// Translatable metadata names, in extraction order
pub const METADATA_NAMES: &[&str] = &[
    "title",
    "creator",
    "publisher",
    "rights",
    "subject",
    "contributor",
    "description",
];

#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub items: Vec<MetadataHandle>,
}

impl Metadata {
    pub fn push(&mut self, name: &str, content: &str) -> MetadataHandle {
        let item = Rc::new(RefCell::new(MetadataItem {
            name: name.to_string(),
            content: content.to_string(),
        }));
        self.items.push(Rc::clone(&item));
        item
    }

    /// Items called `name`, in document order
    pub fn items_named(&self, name: &str) -> Vec<MetadataHandle> {
        self.items
            .iter()
            .filter(|item| item.borrow().name == name)
            .cloned()
            .collect()
    }

    pub fn title(&self) -> Option<String> {
        self.items_named("title")
            .first()
            .map(|item| item.borrow().content.clone())
    }
}

/// A file carried with the book
#[derive(Debug, Clone)]
pub struct Attachment<T> {
    pub href: String,
    pub document: T,
}

/// An unpacked ebook directory
#[derive(Debug, Default)]
pub struct Book {
    pub root: PathBuf,
    pub pages: Vec<Page>,
    pub toc: Vec<TocHandle>,
    pub metadata: Metadata,
    pub subtitles: Vec<Attachment<SrtDocument>>,
    pub games: Vec<Attachment<PgnDocument>>,
    // @field: Files copied through untouched
    pub resources: Vec<String>,
}

fn href_of(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

impl Book {
    /// Load every page, subtitle and game file below `root`
    pub fn load_dir<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let files = FileManager::list_relative_files(&root)?;

        let mut book = Self {
            root: root.clone(),
            ..Self::default()
        };
        for relative in files {
            let path = root.join(&relative);
            let href = href_of(&root, &path);
            let extension = path
                .extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .unwrap_or_default();

            match extension.as_str() {
                "srt" => {
                    let content = FileManager::read_to_string(&path)?;
                    match SrtDocument::parse(&content) {
                        Ok(document) => book.subtitles.push(Attachment { href, document }),
                        Err(e) => {
                            warn!("Copying {} untouched: {}", href, e);
                            book.resources.push(href);
                        }
                    }
                }
                "pgn" => {
                    let content = FileManager::read_to_string(&path)?;
                    book.games.push(Attachment {
                        href,
                        document: PgnDocument::parse(&content),
                    });
                }
                _ if FileManager::is_page_file(&path) => {
                    let content = FileManager::read_to_string(&path)?;
                    let id = format!("page{}", book.pages.len() + 1);
                    let page = if matches!(extension.as_str(), "html" | "htm") {
                        Page::from_html(&id, &href, &content)
                    } else {
                        Page::from_xhtml(&id, &href, &content)
                    };
                    book.pages.push(page);
                }
                _ => book.resources.push(href),
            }
        }

        debug!(
            "Loaded {} pages, {} subtitle files, {} game files from {:?}",
            book.pages.len(),
            book.subtitles.len(),
            book.games.len(),
            root
        );
        Ok(book)
    }

    /// Metadata title, else the first page `<title>`
    pub fn title(&self) -> Option<String> {
        self.metadata
            .title()
            .or_else(|| self.pages.iter().find_map(page_title))
    }

    /// Write pages, subtitles and games under `output`, copying the rest
    pub fn save_dir<P: AsRef<Path>>(&self, output: P) -> Result<()> {
        let output = output.as_ref();
        FileManager::ensure_dir(output)?;
        for page in &self.pages {
            FileManager::write_to_file(output.join(&page.href), &page.serialize())
                .with_context(|| format!("Failed to write page {}", page.href))?;
        }
        for subtitle in &self.subtitles {
            FileManager::write_to_file(output.join(&subtitle.href), &subtitle.document.to_string())?;
        }
        for game in &self.games {
            FileManager::write_to_file(output.join(&game.href), &game.document.to_string())?;
        }
        for resource in &self.resources {
            FileManager::copy_file(self.root.join(resource), output.join(resource))?;
        }
        Ok(())
    }
}

fn page_title(page: &Page) -> Option<String> {
    let title = page.data.select_first("title").ok()?;
    let text = dom::collapse_whitespace(&title.as_node().text_contents());
    (!text.is_empty()).then_some(text)
}
