/*!
 * Placeholder tokens.
 *
 * Inline fragments that must survive translation (images, code spans, line
 * breaks, glossary terms) are swapped for numbered tokens before the text is
 * sent to an engine. Engines mangle those tokens in small ways: extra spaces,
 * doubled braces, changed case. The match pattern tolerates all of that.
 */

use regex::Regex;

use crate::errors::EngineError;

/// Slot replaced by the numeric id in both templates
const SLOT: &str = "{}";

/// Digits used for reserved inline elements
pub const RESERVE_ID_WIDTH: usize = 5;

/// Digits used for glossary terms, distinct from reserved ids
pub const GLOSSARY_ID_WIDTH: usize = 6;

/// A `(render_template, match_template)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    render_template: String,
    match_template: String,
}

impl Default for Placeholder {
    fn default() -> Self {
        Self {
            render_template: "{{id_{}}}".to_string(),
            match_template: r"(?:\{\s*)+(?i:id)\s*_\s*{}(?:\s*\})+".to_string(),
        }
    }
}

impl Placeholder {
    /// Build a pair, checking that the match template compiles
    pub fn new(render_template: &str, match_template: &str) -> Result<Self, EngineError> {
        if !render_template.contains(SLOT) || !match_template.contains(SLOT) {
            return Err(EngineError::InvalidEngineData(
                "Placeholder templates need an id slot".to_string(),
            ));
        }
        let placeholder = Self {
            render_template: render_template.to_string(),
            match_template: match_template.to_string(),
        };
        placeholder.matcher("0")?;
        Ok(placeholder)
    }

    /// Token for a raw id string
    pub fn render(&self, id: &str) -> String {
        self.render_template.replacen(SLOT, id, 1)
    }

    /// Token for a reserved element index
    pub fn render_reserve(&self, index: usize) -> String {
        self.render(&format!("{:0width$}", index, width = RESERVE_ID_WIDTH))
    }

    /// Token for a glossary entry index
    pub fn render_glossary(&self, index: usize) -> String {
        self.render(&format!("{:0width$}", index, width = GLOSSARY_ID_WIDTH))
    }

    /// Regular expression source matching the token of `id`
    ///
    /// `id` is inserted verbatim, so callers may pass a sub-pattern such as
    /// `\d+` to match every token.
    pub fn pattern(&self, id: &str) -> String {
        self.match_template.replacen(SLOT, id, 1)
    }

    pub fn matcher(&self, id: &str) -> Result<Regex, EngineError> {
        Regex::new(&self.pattern(id))
            .map_err(|e| EngineError::InvalidEngineData(format!("Invalid placeholder pattern: {}", e)))
    }

    pub fn reserve_matcher(&self, index: usize) -> Result<Regex, EngineError> {
        self.matcher(&format!("{:0width$}", index, width = RESERVE_ID_WIDTH))
    }

    pub fn glossary_matcher(&self, index: usize) -> Result<Regex, EngineError> {
        self.matcher(&format!("{:0width$}", index, width = GLOSSARY_ID_WIDTH))
    }
}
