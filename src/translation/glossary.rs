/*!
 * Glossary substitution.
 *
 * Terms are swapped for engine-safe placeholders before a paragraph is sent
 * and swapped back for their replacement afterwards, so engines never get a
 * chance to translate them.
 *
 * File format: UTF-8 text, one record per block of lines separated by a
 * blank line. The first line is the term, the optional second line its
 * replacement; a term without replacement is kept as is.
 */

use anyhow::{Context, Result};
use log::{debug, warn};
use regex::NoExpand;
use std::path::Path;

use crate::engines::Placeholder;
use crate::file_utils::FileManager;

#[derive(Debug, Clone)]
pub struct Glossary {
    placeholder: Placeholder,
    // @field: (term, replacement) pairs in file order
    entries: Vec<(String, String)>,
}

impl Glossary {
    /// Empty glossary rendering tokens with `placeholder`
    pub fn new(placeholder: Placeholder) -> Self {
        Self {
            placeholder,
            entries: Vec::new(),
        }
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = FileManager::read_to_string(path)
            .with_context(|| format!("Failed to read glossary: {}", path.display()))?;
        self.load_from_str(&content);
        debug!("Loaded {} glossary terms from {}", self.entries.len(), path.display());
        Ok(())
    }

    pub fn load_from_str(&mut self, content: &str) {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let normalized = content.replace("\r\n", "\n");
        let mut record: Vec<&str> = Vec::new();
        for line in normalized.lines().chain(std::iter::once("")) {
            let line = line.trim();
            if !line.is_empty() {
                record.push(line);
                continue;
            }
            match record.as_slice() {
                [] => {}
                [term] => self.entries.push((term.to_string(), term.to_string())),
                [term, replacement, rest @ ..] => {
                    if !rest.is_empty() {
                        warn!("Glossary record for '{}' has extra lines; ignoring them", term);
                    }
                    self.entries.push((term.to_string(), replacement.to_string()));
                }
            }
            record.clear();
        }
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Swap every term for its placeholder
    pub fn replace(&self, text: &str) -> String {
        let mut text = text.to_string();
        for (index, (term, _)) in self.entries.iter().enumerate() {
            if text.contains(term.as_str()) {
                text = text.replace(term.as_str(), &self.placeholder.render_glossary(index));
            }
        }
        text
    }

    /// Swap placeholders back for the replacement terms
    pub fn restore(&self, text: &str) -> String {
        let mut text = text.to_string();
        for (index, (_, replacement)) in self.entries.iter().enumerate() {
            match self.placeholder.glossary_matcher(index) {
                Ok(matcher) => {
                    text = matcher.replace_all(&text, NoExpand(replacement)).into_owned();
                }
                Err(e) => warn!("Skipping glossary term {}: {}", index, e),
            }
        }
        text
    }
}
