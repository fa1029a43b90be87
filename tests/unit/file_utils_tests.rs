/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use std::cmp::Ordering;
use std::path::PathBuf;

use ebook_translator::file_utils::{natural_cmp, FileManager};
use crate::common;

/// Test that write_to_file creates missing parent directories
#[test]
fn test_writeToFile_withMissingParents_shouldCreateThem() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let target = temp_dir.path().join("OEBPS").join("text").join("ch1.xhtml");

    FileManager::write_to_file(&target, "<p>x</p>")?;

    assert_eq!(FileManager::read_to_string(&target)?, "<p>x</p>");
    Ok(())
}

/// Test that list_relative_files sorts chapter numbers naturally
#[test]
fn test_listRelativeFiles_withNumberedChapters_shouldSortNaturally() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    for name in ["ch10.xhtml", "ch2.xhtml", "ch1.xhtml"] {
        common::create_test_file(temp_dir.path(), name, "")?;
    }

    let files = FileManager::list_relative_files(temp_dir.path())?;

    assert_eq!(
        files,
        vec![PathBuf::from("ch1.xhtml"), PathBuf::from("ch2.xhtml"), PathBuf::from("ch10.xhtml")]
    );
    Ok(())
}

#[test]
fn test_isPageFile_shouldRecognizePageExtensions() {
    assert!(FileManager::is_page_file("text/ch1.xhtml"));
    assert!(FileManager::is_page_file("index.HTM"));
    assert!(!FileManager::is_page_file("style.css"));
    assert!(!FileManager::is_page_file("README"));
}

/// Test that copy_file refuses a missing source
#[test]
fn test_copyFile_withMissingSource_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let result = FileManager::copy_file(temp_dir.path().join("missing"), temp_dir.path().join("out"));
    assert!(result.is_err());
    Ok(())
}

#[test]
fn test_naturalCmp_shouldCompareNumbersByValue() {
    assert_eq!(natural_cmp("page9", "page10"), Ordering::Less);
    assert_eq!(natural_cmp("Page2", "page2"), Ordering::Less);
    assert_eq!(natural_cmp("b", "a10"), Ordering::Greater);
}
