/*!
 * Tests for extraction and re-integration over an unpacked book
 */

use anyhow::Result;
use std::rc::Rc;

use ebook_translator::app_config::{Config, TranslationPosition};
use ebook_translator::book::Book;
use ebook_translator::element::{ElementHandler, ElementSettings, Extraction};
use ebook_translator::engines::Placeholder;
use crate::common;

fn extract(config: &Config, book: &Book) -> Result<Vec<ebook_translator::element::Element>> {
    let settings = Rc::new(ElementSettings::from_config(config, "French", Placeholder::default()));
    Ok(Extraction::new(config, settings).extract_book(book)?)
}

/// Test that pages and subtitles become paragraphs in reading order
#[test]
fn test_prepareOriginal_withPagesAndSubtitles_shouldNumberEveryElement() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let book_dir = common::create_test_book(
        temp_dir.path(),
        &[("ch2.xhtml", "<p>Second</p>"), ("ch1.xhtml", "<p>First</p><p>42</p>")],
    )?;
    common::create_test_file(&book_dir, "movie.srt", "1\n00:00:01,000 --> 00:00:02,000\nHi\n")?;
    let config = Config::default();

    let book = Book::load_dir(&book_dir)?;
    let elements = extract(&config, &book)?;
    let mut handler = ElementHandler::new(Placeholder::default(), "\n\n", TranslationPosition::Below);
    let paragraphs = handler.prepare_original(elements);

    let summary: Vec<(usize, &str, bool, Option<&str>)> = paragraphs
        .iter()
        .map(|p| (p.id, p.original.as_str(), p.ignored, p.page.as_deref()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (0, "First", false, Some("ch1.xhtml")),
            (1, "42", true, Some("ch1.xhtml")),
            (2, "Second", false, Some("ch2.xhtml")),
            (3, "Hi", false, Some("movie.srt")),
        ]
    );
    Ok(())
}

/// Test that translations land next to their sources in every format
#[test]
fn test_addTranslations_withPlainMode_shouldRewriteBook() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let book_dir = common::create_test_book(temp_dir.path(), &[("ch1.xhtml", "<p>First</p><p>42</p>")])?;
    common::create_test_file(&book_dir, "movie.srt", "1\n00:00:01,000 --> 00:00:02,000\nHi\n")?;
    common::create_test_file(&book_dir, "style.css", "p { margin: 0 }")?;
    let config = Config::default();

    let book = Book::load_dir(&book_dir)?;
    let mut handler = ElementHandler::new(Placeholder::default(), "\n\n", TranslationPosition::Below);
    let mut paragraphs = handler.prepare_original(extract(&config, &book)?);
    paragraphs[0].translation = Some("Premier".to_string());
    paragraphs[2].translation = Some("Salut".to_string());
    handler.add_translations(&paragraphs);

    let output = temp_dir.path().join("out");
    book.save_dir(&output)?;

    let page = std::fs::read_to_string(output.join("ch1.xhtml"))?;
    assert!(page.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
    assert!(page.contains("<p>First</p><p dir=\"auto\">Premier</p><p>42</p></body>"));
    let subtitle = std::fs::read_to_string(output.join("movie.srt"))?;
    assert!(subtitle.contains("Hi\nSalut"));
    assert!(output.join("style.css").exists());
    Ok(())
}

/// Test that merged groups skip ignored elements and split back per element
#[test]
fn test_addTranslations_withMergeMode_shouldSkipIgnoredElements() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let book_dir = common::create_test_book(temp_dir.path(), &[("ch1.xhtml", "<p>a</p><p>123</p><p>b</p>")])?;
    let config = Config::default();

    let book = Book::load_dir(&book_dir)?;
    let mut handler =
        ElementHandler::with_merge(Placeholder::default(), "\n\n", TranslationPosition::Below, 1000);
    let mut paragraphs = handler.prepare_original(extract(&config, &book)?);
    assert_eq!(paragraphs.len(), 1);
    assert_eq!(paragraphs[0].original, "a\n\nb\n\n");

    paragraphs[0].translation = Some("A\n\nB\n\n".to_string());
    handler.add_translations(&paragraphs);
    let output = temp_dir.path().join("out");
    book.save_dir(&output)?;

    let page = std::fs::read_to_string(output.join("ch1.xhtml"))?;
    assert!(page.contains("<p>a</p><p dir=\"auto\">A</p><p>123</p><p>b</p><p dir=\"auto\">B</p>"));
    Ok(())
}

/// Test that a user ignore rule keeps a subtree out of translation
#[test]
fn test_extractBook_withIgnoreRule_shouldFlagSubtree() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let book_dir = common::create_test_book(
        temp_dir.path(),
        &[("ch1.xhtml", "<p>Keep</p><div class=\"credits\"><p>Skip</p></div>")],
    )?;
    let config = Config {
        ignore_rules: vec!["div.credits".to_string()],
        ..Config::default()
    };

    let book = Book::load_dir(&book_dir)?;
    let elements = extract(&config, &book)?;

    let flags: Vec<(String, bool)> = elements.iter().map(|e| (e.get_text(), e.ignored())).collect();
    assert_eq!(flags, vec![("Keep".to_string(), false), ("Skip".to_string(), true)]);
    Ok(())
}
