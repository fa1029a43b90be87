/*!
 * Per-job translation cache.
 *
 * Every job (input book + engine + target language + merge length) owns one
 * SQLite file named after the job fingerprint. Extraction output is saved
 * once, translations are written back one paragraph at a time, and the file
 * is either kept (`close`) or removed (`destroy`) when the job ends.
 */

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rusqlite::{params, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::engines::base::md5_hex;

pub mod connection;
pub mod models;
pub mod schema;

pub use connection::CacheConnection;
pub use models::Paragraph;

/// Files below this size are considered torn writes and rebuilt
pub const FRESH_THRESHOLD_BYTES: u64 = 50_000;

/// Cache file extension
pub const CACHE_EXTENSION: &str = "db";

const PARAGRAPH_COLUMNS: &str =
    "id, md5, raw, original, ignored, attributes, page, translation, engine_name, target_lang";

/// Stable key of a translation job
pub fn fingerprint(input_path: &str, engine_name: &str, target_lang: &str, merge_length: usize, encoding: &str) -> String {
    md5_hex(&format!(
        "{}{}{}{}{}",
        input_path, engine_name, target_lang, merge_length, encoding
    ))
}

fn paragraph_from_row(row: &Row) -> rusqlite::Result<Paragraph> {
    let id: i64 = row.get(0)?;
    let ignored: i64 = row.get(4)?;
    let translation: Option<String> = row.get(7)?;
    Ok(Paragraph {
        id: id.max(0) as usize,
        md5: row.get(1)?,
        raw: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        original: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        ignored: ignored != 0,
        attributes: row.get(5)?,
        page: row.get(6)?,
        is_cache: translation.is_some(),
        translation,
        engine_name: row.get(8)?,
        target_lang: row.get(9)?,
        row: -1,
        error: None,
        aligned: true,
    })
}

fn id_list(ids: &[usize]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}

/// The cache of one translation job
#[derive(Debug)]
pub struct TranslationCache {
    connection: CacheConnection,
    fresh: bool,
    persistent: bool,
}

impl TranslationCache {
    /// Open the cache of job `fingerprint` inside `dir`
    pub fn open<P: AsRef<Path>>(dir: P, fingerprint: &str) -> Result<Self> {
        let path = dir
            .as_ref()
            .join(format!("{}.{}", fingerprint, CACHE_EXTENSION));
        let fresh = match std::fs::metadata(&path) {
            Ok(metadata) => metadata.len() < FRESH_THRESHOLD_BYTES,
            Err(_) => true,
        };
        debug!("Cache {:?} fresh: {}", path, fresh);
        Ok(Self {
            connection: CacheConnection::new(&path)?,
            fresh,
            persistent: true,
        })
    }

    /// Non-persistent cache living in memory
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            connection: CacheConnection::new_in_memory()?,
            fresh: true,
            persistent: false,
        })
    }

    pub fn path(&self) -> &Path {
        self.connection.path()
    }

    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn set_persistent(&mut self, persistent: bool) {
        self.persistent = persistent;
    }

    /// Store extraction output; no-op unless the cache is fresh
    ///
    /// Rows are upserted by id. A translation survives only when the md5 of
    /// its row is unchanged, so resuming a torn job keeps finished work.
    pub fn save(&self, paragraphs: &[Paragraph]) -> Result<()> {
        if !self.fresh {
            return Ok(());
        }
        self.connection.transaction(|tx| {
            tx.execute("DELETE FROM cache WHERE id >= ?1", params![paragraphs.len() as i64])?;
            let mut stmt = tx.prepare(
                "INSERT INTO cache (id, md5, raw, original, ignored, attributes, page) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
                 ON CONFLICT(id) DO UPDATE SET \
                     translation = CASE WHEN cache.md5 = excluded.md5 THEN cache.translation ELSE NULL END, \
                     engine_name = CASE WHEN cache.md5 = excluded.md5 THEN cache.engine_name ELSE NULL END, \
                     target_lang = CASE WHEN cache.md5 = excluded.md5 THEN cache.target_lang ELSE NULL END, \
                     md5 = excluded.md5, raw = excluded.raw, original = excluded.original, \
                     ignored = excluded.ignored, attributes = excluded.attributes, page = excluded.page",
            )?;
            for paragraph in paragraphs {
                stmt.execute(params![
                    paragraph.id as i64,
                    paragraph.md5,
                    paragraph.raw,
                    paragraph.original,
                    paragraph.ignored as i64,
                    paragraph.attributes,
                    paragraph.page,
                ])?;
            }
            Ok(())
        })
        .context("Failed to save paragraphs to cache")?;
        debug!("Saved {} paragraphs to cache", paragraphs.len());
        Ok(())
    }

    /// Non-ignored paragraphs in id order
    ///
    /// With `cache_only` set, untranslated paragraphs are skipped too.
    pub fn all_paragraphs(&self, cache_only: bool) -> Result<Vec<Paragraph>> {
        let mut sql = format!("SELECT {} FROM cache WHERE ignored = 0", PARAGRAPH_COLUMNS);
        if cache_only {
            sql.push_str(" AND translation IS NOT NULL");
        }
        sql.push_str(" ORDER BY id");
        let mut paragraphs = self.connection.execute(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], paragraph_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })?;
        for (row, paragraph) in paragraphs.iter_mut().enumerate() {
            paragraph.row = row as i64;
        }
        Ok(paragraphs)
    }

    pub fn paragraph(&self, id: usize) -> Result<Option<Paragraph>> {
        self.connection.execute(|conn| {
            let sql = format!("SELECT {} FROM cache WHERE id = ?1", PARAGRAPH_COLUMNS);
            Ok(conn
                .query_row(&sql, params![id as i64], paragraph_from_row)
                .optional()?)
        })
    }

    pub fn get_paragraphs(&self, ids: &[usize]) -> Result<Vec<Paragraph>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM cache WHERE id IN ({}) ORDER BY id",
            PARAGRAPH_COLUMNS,
            id_list(ids)
        );
        self.connection.execute(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], paragraph_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// Write back the translation of one paragraph
    pub fn update_paragraph(&self, paragraph: &Paragraph) -> Result<()> {
        self.connection.execute(|conn| {
            conn.execute(
                "UPDATE cache SET translation = ?1, engine_name = ?2, target_lang = ?3 WHERE id = ?4",
                params![
                    paragraph.translation,
                    paragraph.engine_name,
                    paragraph.target_lang,
                    paragraph.id as i64
                ],
            )?;
            Ok(())
        })
    }

    /// Soft removal; the rows stay but are no longer listed
    pub fn ignore_paragraphs(&self, ids: &[usize]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let sql = format!("UPDATE cache SET ignored = 1 WHERE id IN ({})", id_list(ids));
        self.connection.execute(|conn| {
            conn.execute(&sql, [])?;
            Ok(())
        })
    }

    pub fn delete_paragraphs(&self, ids: &[usize]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let sql = format!("DELETE FROM cache WHERE id IN ({})", id_list(ids));
        self.connection.execute(|conn| {
            conn.execute(&sql, [])?;
            Ok(())
        })
    }

    pub fn set_info(&self, key: &str, value: &str) -> Result<()> {
        self.connection.execute(|conn| {
            conn.execute(
                "INSERT INTO info (key, value) VALUES (?1, ?2) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        })
    }

    pub fn get_info(&self, key: &str) -> Result<Option<String>> {
        self.connection.execute(|conn| {
            Ok(conn
                .query_row("SELECT value FROM info WHERE key = ?1", params![key], |row| {
                    row.get::<_, Option<String>>(0)
                })
                .optional()?
                .flatten())
        })
    }

    pub fn del_info(&self, key: &str) -> Result<()> {
        self.connection.execute(|conn| {
            conn.execute("DELETE FROM info WHERE key = ?1", params![key])?;
            Ok(())
        })
    }

    /// Keep the cache file for the next run
    pub fn close(self) -> Result<()> {
        debug!("Closing cache {:?}", self.path());
        Ok(())
    }

    /// Remove the cache file
    pub fn destroy(self) -> Result<()> {
        let path = self.path().to_path_buf();
        let in_memory = self.connection.is_in_memory();
        drop(self);
        if !in_memory && path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove cache file: {:?}", path))?;
            debug!("Removed cache {:?}", path);
        }
        Ok(())
    }

    /// Finish the job: close a persistent cache, destroy anything else
    pub fn done(self) -> Result<()> {
        if self.persistent {
            self.close()
        } else {
            self.destroy()
        }
    }
}

/// One row of the cache management listing
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub title: String,
    pub engine: String,
    pub lang: String,
    pub merge: String,
    pub size_mb: f64,
    pub modified: String,
    pub filename: String,
}

/// The directory holding all job caches
#[derive(Debug, Clone)]
pub struct CacheDirectory {
    base: PathBuf,
}

impl CacheDirectory {
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }

    /// `<data dir>/ebook-translator/cache`
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ebook-translator")
            .join("cache")
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn cache_files(&self) -> Result<Vec<PathBuf>> {
        if !self.base.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.base)
            .with_context(|| format!("Failed to read cache directory: {:?}", self.base))?
        {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == CACHE_EXTENSION) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Describe every cache file
    pub fn list(&self) -> Result<Vec<CacheEntry>> {
        let mut entries = Vec::new();
        for path in self.cache_files()? {
            let info = read_info(&path).unwrap_or_else(|e| {
                warn!("Failed to read cache info from {:?}: {}", path, e);
                HashMap::new()
            });
            let metadata = std::fs::metadata(&path)?;
            let field = |key: &str| info.get(key).cloned().unwrap_or_else(|| "Unknown".to_string());
            entries.push(CacheEntry {
                title: field("title"),
                engine: field("engine_name"),
                lang: field("target_lang"),
                merge: field("merge_length"),
                size_mb: metadata.len() as f64 / (1000.0 * 1000.0),
                modified: format_mtime(metadata.modified().ok()),
                filename: path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            });
        }
        Ok(entries)
    }

    /// Sum of the sizes of all cache files in bytes
    pub fn total_size(&self) -> Result<u64> {
        let mut total = 0;
        for path in self.cache_files()? {
            total += std::fs::metadata(&path)?.len();
        }
        Ok(total)
    }

    /// Remove every cache file, returning how many were removed
    pub fn clean(&self) -> Result<usize> {
        let files = self.cache_files()?;
        for path in &files {
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to remove cache file: {:?}", path))?;
        }
        info!("Removed {} cache files from {:?}", files.len(), self.base);
        Ok(files.len())
    }

    /// Remove the cache file called `filename`
    pub fn remove(&self, filename: &str) -> Result<()> {
        let path = self.base.join(filename);
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to remove cache file: {:?}", path))
    }

    /// Move every cache file into `dest`, which becomes the new base
    pub fn move_to<P: AsRef<Path>>(&mut self, dest: P) -> Result<PathBuf> {
        let dest = dest.as_ref().to_path_buf();
        std::fs::create_dir_all(&dest)
            .with_context(|| format!("Failed to create cache directory: {:?}", dest))?;
        for path in self.cache_files()? {
            let Some(name) = path.file_name() else {
                continue;
            };
            let target = dest.join(name);
            std::fs::copy(&path, &target)
                .with_context(|| format!("Failed to copy {:?} to {:?}", path, target))?;
            std::fs::remove_file(&path)?;
        }
        info!("Moved cache from {:?} to {:?}", self.base, dest);
        self.base = dest.clone();
        Ok(dest)
    }
}

fn read_info(path: &Path) -> Result<HashMap<String, String>> {
    let conn = rusqlite::Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let mut stmt = conn.prepare("SELECT key, value FROM info")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
    })?;
    let mut info = HashMap::new();
    for row in rows {
        let (key, value) = row?;
        if let Some(value) = value {
            info.insert(key, value);
        }
    }
    Ok(info)
}

fn format_mtime(modified: Option<SystemTime>) -> String {
    match modified {
        Some(time) => chrono::DateTime::<chrono::Local>::from(time)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "Unknown".to_string(),
    }
}
