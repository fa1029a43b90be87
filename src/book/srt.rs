use anyhow::{anyhow, Result};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

// @module: SubRip subtitle documents

// @const: SRT timestamp regex
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{2}):(\d{2}):(\d{2})[,.](\d{3})").unwrap()
});

// @struct: One subtitle block
#[derive(Debug, Clone, PartialEq)]
pub struct SrtBlock {
    // @field: Sequence number as written in the file
    pub index: usize,

    pub start_ms: u64,

    pub end_ms: u64,

    // @field: Multi-line subtitle text
    pub text: String,
}

impl SrtBlock {
    pub fn new(index: usize, start_ms: u64, end_ms: u64, text: &str) -> Self {
        Self {
            index,
            start_ms,
            end_ms,
            text: text.to_string(),
        }
    }

    /// Format milliseconds as `HH:MM:SS,mmm`
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }

    pub fn time_range(&self) -> String {
        format!(
            "{} --> {}",
            Self::format_timestamp(self.start_ms),
            Self::format_timestamp(self.end_ms)
        )
    }
}

impl fmt::Display for SrtBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.index)?;
        writeln!(f, "{}", self.time_range())?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Shared handle so elements can rewrite block text in place
pub type SrtHandle = Rc<RefCell<SrtBlock>>;

// @struct: Parsed subtitle file
#[derive(Debug, Clone, Default)]
pub struct SrtDocument {
    pub blocks: Vec<SrtHandle>,
}

impl SrtDocument {
    /// Parse SRT content, skipping malformed blocks
    pub fn parse(content: &str) -> Result<Self> {
        let content = content.trim_start_matches('\u{feff}');
        let mut blocks = Vec::new();

        let mut current_index: Option<usize> = None;
        let mut current_range: Option<(u64, u64)> = None;
        let mut current_text = String::new();

        let mut finish = |index: Option<usize>, range: Option<(u64, u64)>, text: &mut String| {
            if let (Some(index), Some((start, end))) = (index, range) {
                if text.is_empty() {
                    warn!("Skipping empty subtitle block {}", index);
                } else {
                    blocks.push(Rc::new(RefCell::new(SrtBlock::new(index, start, end, text))));
                }
            }
            text.clear();
        };

        for (line_number, line) in content.lines().enumerate() {
            let trimmed = line.trim();

            if trimmed.is_empty() {
                if current_range.is_some() && !current_text.is_empty() {
                    finish(current_index.take(), current_range.take(), &mut current_text);
                }
                continue;
            }

            if current_index.is_none() && current_text.is_empty() {
                if let Ok(number) = trimmed.parse::<usize>() {
                    current_index = Some(number);
                    continue;
                }
            }

            if current_index.is_some() && current_range.is_none() {
                if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                    current_range = Some((timestamp_to_ms(&caps, 1), timestamp_to_ms(&caps, 5)));
                    continue;
                }
            }

            if current_range.is_some() {
                if !current_text.is_empty() {
                    current_text.push('\n');
                }
                current_text.push_str(trimmed);
            } else {
                warn!(
                    "Unexpected text at line {} before sequence number or timestamp: {}",
                    line_number + 1,
                    trimmed
                );
            }
        }
        finish(current_index, current_range, &mut current_text);

        if blocks.is_empty() && !content.trim().is_empty() {
            return Err(anyhow!("No valid subtitle blocks were found in the SRT content"));
        }
        Ok(Self { blocks })
    }
}

impl fmt::Display for SrtDocument {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for block in &self.blocks {
            write!(f, "{}", block.borrow())?;
        }
        Ok(())
    }
}

fn timestamp_to_ms(caps: &regex::Captures, start_idx: usize) -> u64 {
    let part = |offset: usize| -> u64 {
        caps.get(start_idx + offset)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    (part(0) * 3600 + part(1) * 60 + part(2)) * 1000 + part(3)
}
