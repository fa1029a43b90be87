/*!
 * Chess games in Portable Game Notation.
 *
 * Only the `{...}` comments carry prose, so a document is kept as a list of
 * verbatim text runs and comment handles that elements can rewrite.
 */

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared handle on the text of one comment
pub type CommentHandle = Rc<RefCell<String>>;

#[derive(Debug, Clone)]
pub enum PgnSegment {
    Text(String),
    Comment(CommentHandle),
}

#[derive(Debug, Clone, Default)]
pub struct PgnDocument {
    pub segments: Vec<PgnSegment>,
}

impl PgnDocument {
    /// Split `content` into text runs and comments
    ///
    /// An unterminated comment is kept as plain text.
    pub fn parse(content: &str) -> Self {
        let mut segments = Vec::new();
        let mut rest = content;
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}').map(|offset| open + offset) else {
                break;
            };
            if open > 0 {
                segments.push(PgnSegment::Text(rest[..open].to_string()));
            }
            segments.push(PgnSegment::Comment(Rc::new(RefCell::new(
                rest[open + 1..close].to_string(),
            ))));
            rest = &rest[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(PgnSegment::Text(rest.to_string()));
        }
        Self { segments }
    }

    pub fn comments(&self) -> Vec<CommentHandle> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                PgnSegment::Comment(comment) => Some(Rc::clone(comment)),
                PgnSegment::Text(_) => None,
            })
            .collect()
    }
}

impl fmt::Display for PgnDocument {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                PgnSegment::Text(text) => write!(f, "{}", text)?,
                PgnSegment::Comment(comment) => write!(f, "{{{}}}", comment.borrow())?,
            }
        }
        Ok(())
    }
}
