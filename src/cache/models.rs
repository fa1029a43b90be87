/*!
 * Cached translation units.
 */

use serde::{Deserialize, Serialize};

use crate::engines::base::md5_hex;

/// A translatable unit emitted by extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    // @field: Dense sequence index within a job
    pub id: usize,

    // @field: Hex MD5 of id + content
    pub md5: String,

    // @field: Serialized source markup, for diagnostics
    pub raw: String,

    // @field: Text sent to the engine, placeholders included
    pub original: String,

    pub ignored: bool,

    // @field: Source element attributes as JSON
    pub attributes: Option<String>,

    pub page: Option<String>,

    pub translation: Option<String>,

    pub engine_name: Option<String>,

    pub target_lang: Option<String>,

    // @field: Ordinal shown to users, -1 until listed
    #[serde(skip, default = "default_row")]
    pub row: i64,

    #[serde(skip)]
    pub is_cache: bool,

    // @field: Last failure message
    #[serde(skip)]
    pub error: Option<String>,

    #[serde(skip, default = "default_aligned")]
    pub aligned: bool,
}

fn default_row() -> i64 {
    -1
}

fn default_aligned() -> bool {
    true
}

/// Content fingerprint of a paragraph
pub fn paragraph_md5(id: usize, content: &str) -> String {
    md5_hex(&format!("{}{}", id, content))
}

impl Paragraph {
    pub fn new(id: usize, raw: &str, original: &str, ignored: bool, attributes: Option<String>, page: Option<String>) -> Self {
        Self {
            id,
            md5: paragraph_md5(id, original),
            raw: raw.to_string(),
            original: original.to_string(),
            ignored,
            attributes,
            page,
            translation: None,
            engine_name: None,
            target_lang: None,
            row: default_row(),
            is_cache: false,
            error: None,
            aligned: default_aligned(),
        }
    }

    /// Same number of separator-delimited parts in original and translation
    pub fn is_alignment(&self, separator: &str) -> bool {
        let Some(translation) = &self.translation else {
            return false;
        };
        let count = |text: &str| text.trim().split(separator).count();
        count(&self.original) == count(translation)
    }

    /// Force a stable segment mapping when the counts differ
    ///
    /// The translation is rebuilt from its non-empty lines joined by the
    /// separator. `aligned` records whether the counts matched.
    pub fn do_aligment(&mut self, separator: &str) {
        if self.is_alignment(separator) {
            self.aligned = true;
            return;
        }
        self.aligned = false;
        if let Some(translation) = &self.translation {
            let lines: Vec<&str> = translation
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect();
            self.translation = Some(lines.join(separator));
        }
    }

    /// Translation was requested but never produced
    pub fn is_failed(&self) -> bool {
        !self.ignored && self.translation.is_none() && self.error.is_some()
    }
}
