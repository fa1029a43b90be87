use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+|\D+").unwrap());

/// Extensions treated as document pages when walking an unpacked book
pub const PAGE_EXTENSIONS: &[&str] = &["xhtml", "html", "htm", "xht"];

/// One chunk of a natural sort key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum NaturalChunk {
    Number(u128),
    Text(String),
}

/// Split a string into numeric and textual chunks so `ch2` sorts before `ch10`
pub fn natural_key(value: &str) -> Vec<NaturalChunk> {
    DIGITS
        .find_iter(value)
        .map(|chunk| {
            let text = chunk.as_str();
            match text.parse::<u128>() {
                Ok(number) if text.chars().all(|c| c.is_ascii_digit()) => NaturalChunk::Number(number),
                _ => NaturalChunk::Text(text.to_lowercase()),
            }
        })
        .collect()
}

/// Natural-numeric comparison of two strings
pub fn natural_cmp(left: &str, right: &str) -> Ordering {
    natural_key(left).cmp(&natural_key(right)).then_with(|| left.cmp(right))
}

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Every regular file below `dir`, paths relative to `dir`, naturally sorted
    pub fn list_relative_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            if entry.file_type().is_file() {
                let relative = entry
                    .path()
                    .strip_prefix(dir)
                    .with_context(|| format!("Path outside of {:?}", dir))?;
                files.push(relative.to_path_buf());
            }
        }
        files.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
        Ok(files)
    }

    /// Whether the path names an (X)HTML page
    pub fn is_page_file<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| PAGE_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path).with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))
    }

    /// Copy a file from one location to another, ensuring the target directory exists
    pub fn copy_file<P1: AsRef<Path>, P2: AsRef<Path>>(from: P1, to: P2) -> Result<()> {
        let from = from.as_ref();
        let to = to.as_ref();
        if !from.exists() {
            return Err(anyhow::anyhow!("Source file does not exist: {:?}", from));
        }
        if let Some(parent) = to.parent() {
            Self::ensure_dir(parent)?;
        }
        fs::copy(from, to).with_context(|| format!("Failed to copy {:?} to {:?}", from, to))?;
        Ok(())
    }
}
