/*!
 * Tests for the translation cache
 */

use anyhow::Result;

use ebook_translator::cache::{fingerprint, CacheDirectory, Paragraph, TranslationCache};
use crate::common;

fn paragraphs() -> Vec<Paragraph> {
    vec![
        Paragraph::new(0, "<p>Hello</p>", "Hello", false, None, Some("ch1.xhtml".into())),
        Paragraph::new(1, "<p>123</p>", "123", true, None, Some("ch1.xhtml".into())),
        Paragraph::new(2, "<p>World</p>", "World", false, None, Some("ch2.xhtml".into())),
    ]
}

/// Test that a translation written in one run is read back in the next
#[test]
fn test_reopen_withSameFingerprint_shouldKeepTranslations() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let key = fingerprint("/books/a", "DeepL", "French", 0, "utf-8");

    let cache = TranslationCache::open(temp_dir.path(), &key)?;
    cache.save(&paragraphs())?;
    let mut first = cache.paragraph(0)?.expect("row 0 should exist");
    first.translation = Some("Bonjour".to_string());
    first.engine_name = Some("DeepL".to_string());
    first.target_lang = Some("French".to_string());
    cache.update_paragraph(&first)?;
    cache.close()?;

    let cache = TranslationCache::open(temp_dir.path(), &key)?;
    assert!(cache.is_fresh());
    cache.save(&paragraphs())?;
    let stored = cache.paragraph(0)?.expect("row 0 should exist");
    assert_eq!(stored.translation.as_deref(), Some("Bonjour"));
    assert_eq!(stored.engine_name.as_deref(), Some("DeepL"));
    assert!(stored.is_cache);
    let untranslated = cache.paragraph(2)?.expect("row 2 should exist");
    assert!(untranslated.translation.is_none());
    assert!(!untranslated.is_cache);
    Ok(())
}

/// Test that listings skip ignored rows and number the rest
#[test]
fn test_allParagraphs_shouldSkipIgnoredAndAssignRows() -> Result<()> {
    let cache = TranslationCache::in_memory()?;
    cache.save(&paragraphs())?;

    let listed = cache.all_paragraphs(false)?;

    let ids: Vec<usize> = listed.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![0, 2]);
    assert_eq!(listed[1].row, 1);
    assert_eq!(listed[1].page.as_deref(), Some("ch2.xhtml"));
    Ok(())
}

#[test]
fn test_getParagraphs_shouldReturnRequestedIdsInOrder() -> Result<()> {
    let cache = TranslationCache::in_memory()?;
    cache.save(&paragraphs())?;

    let found = cache.get_paragraphs(&[2, 0])?;
    assert_eq!(found.iter().map(|p| p.id).collect::<Vec<_>>(), vec![0, 2]);
    assert!(cache.get_paragraphs(&[])?.is_empty());

    cache.delete_paragraphs(&[2])?;
    assert!(cache.paragraph(2)?.is_none());
    Ok(())
}

/// Test that the cache directory listing reads the job info
#[test]
fn test_cacheDirectory_withJobInfo_shouldDescribeEntries() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let directory = CacheDirectory::new(temp_dir.path());
    let cache = TranslationCache::open(directory.base(), "job")?;
    cache.set_info("title", "Moby Dick")?;
    cache.set_info("engine_name", "DeepL")?;
    cache.set_info("target_lang", "French")?;
    cache.set_info("merge_length", "0")?;
    cache.close()?;
    common::create_test_file(temp_dir.path(), "notes.txt", "not a cache")?;

    let entries = directory.list()?;

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].title, "Moby Dick");
    assert_eq!(entries[0].engine, "DeepL");
    assert_eq!(entries[0].lang, "French");
    assert_eq!(entries[0].filename, "job.db");
    assert!(directory.total_size()? > 0);

    directory.remove("job.db")?;
    assert!(directory.list()?.is_empty());
    Ok(())
}

#[test]
fn test_cacheDirectory_withMissingBase_shouldBeEmpty() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let directory = CacheDirectory::new(temp_dir.path().join("nowhere"));
    assert!(directory.list()?.is_empty());
    assert_eq!(directory.total_size()?, 0);
    assert_eq!(directory.clean()?, 0);
    Ok(())
}
