/*!
 * End-to-end book translation through the controller
 */

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ebook_translator::app_config::{Config, TranslationPosition};
use ebook_translator::app_controller::{Controller, JobOptions, JobSummary};
use crate::common;
use crate::common::mock_engines::ScriptedEngine;

fn options(book_dir: &Path, output_dir: PathBuf) -> JobOptions {
    JobOptions {
        input_dir: book_dir.to_path_buf(),
        output_dir,
        ..JobOptions::default()
    }
}

/// Run one job and return its summary with the written page
async fn translate_page(
    config: Config,
    engine: ScriptedEngine,
    book_dir: &Path,
    output_dir: PathBuf,
) -> Result<(JobSummary, String)> {
    common::init_test_logging();
    let controller = Controller::with_config(config)?;
    let summary = controller
        .run_with_engine(Arc::new(engine), &options(book_dir, output_dir.clone()))
        .await?;
    let page = std::fs::read_to_string(output_dir.join("ch1.xhtml"))?;
    Ok((summary, page))
}

/// Test that a single paragraph gets its translation below it
#[tokio::test]
async fn test_translate_withSingleParagraph_shouldInsertTranslationBelow() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let book_dir = common::create_test_book(temp_dir.path(), &[("ch1.xhtml", "<p>Hello World</p>")])?;
    let engine = ScriptedEngine::new(&[("Hello World", "你好世界")]);
    let tracker = engine.tracker();

    let (summary, page) =
        translate_page(common::test_config(temp_dir.path()), engine, &book_dir, temp_dir.path().join("out")).await?;

    assert!(page.contains("<p>Hello World</p><p dir=\"auto\">你好世界</p>"));
    assert_eq!(summary.translated, 1);
    assert_eq!(summary.failed, 0);
    assert!(!summary.canceled);
    assert_eq!(tracker.lock().call_count, 1);
    Ok(())
}

/// Test that inline images travel as placeholders and come back in place
#[tokio::test]
async fn test_translate_withInlineImage_shouldRestoreReservedElement() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let book_dir =
        common::create_test_book(temp_dir.path(), &[("ch1.xhtml", "<p>a<img src=\"w.jpg\"/> b</p>")])?;
    let engine = ScriptedEngine::new(&[("a {{id_00000}} b", "A {{id_00000}} B")]);
    let tracker = engine.tracker();

    let (_, page) =
        translate_page(common::test_config(temp_dir.path()), engine, &book_dir, temp_dir.path().join("out")).await?;

    assert_eq!(tracker.lock().requests, vec!["a {{id_00000}} b".to_string()]);
    assert!(page.contains("<p>a<img src=\"w.jpg\"/> b</p><p dir=\"auto\">A<img src=\"w.jpg\"/> B</p>"));
    Ok(())
}

fn merge_config(dir: &Path, position: TranslationPosition) -> Config {
    Config {
        merge_enabled: true,
        merge_length: 1000,
        translation_position: position,
        ..common::test_config(dir)
    }
}

/// Test that merged paragraphs go out as one request and split back
#[tokio::test]
async fn test_translate_withMerge_shouldSendOneRequest() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let book_dir = common::create_test_book(temp_dir.path(), &[("ch1.xhtml", "<p>a</p><p>b</p><p>c</p>")])?;
    let engine = ScriptedEngine::new(&[("a\n\nb\n\nc\n\n", "A\n\nB\n\nC\n\n")]);
    let tracker = engine.tracker();

    let (summary, page) = translate_page(
        merge_config(temp_dir.path(), TranslationPosition::Below),
        engine,
        &book_dir,
        temp_dir.path().join("out"),
    )
    .await?;

    assert_eq!(tracker.lock().call_count, 1);
    assert_eq!(summary.translated, 1);
    assert!(page.contains(
        "<p>a</p><p dir=\"auto\">A</p><p>b</p><p dir=\"auto\">B</p><p>c</p><p dir=\"auto\">C</p>"
    ));
    Ok(())
}

/// Test that surplus merged segments are folded into the last element
#[tokio::test]
async fn test_translate_withSurplusSegmentsBelow_shouldFoldIntoLastElement() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let book_dir = common::create_test_book(temp_dir.path(), &[("ch1.xhtml", "<p>a</p><p>b</p><p>c</p>")])?;
    let engine = ScriptedEngine::new(&[("a\n\nb\n\nc\n\n", "A\n\nB\n\nC\n\nD\n\nE\n\n")]);

    let (_, page) = translate_page(
        merge_config(temp_dir.path(), TranslationPosition::Below),
        engine,
        &book_dir,
        temp_dir.path().join("out"),
    )
    .await?;

    assert!(page.contains(
        "<p>a</p><p dir=\"auto\">A</p><p>b</p><p dir=\"auto\">B</p>\
         <p>c</p><p dir=\"auto\">C<br/><br/>D<br/><br/>E</p>"
    ));
    Ok(())
}

/// Test that surplus merged segments are folded into the first element when leading
#[tokio::test]
async fn test_translate_withSurplusSegmentsAbove_shouldFoldIntoFirstElement() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let book_dir = common::create_test_book(temp_dir.path(), &[("ch1.xhtml", "<p>a</p><p>b</p><p>c</p>")])?;
    let engine = ScriptedEngine::new(&[("a\n\nb\n\nc\n\n", "A\n\nB\n\nC\n\nD\n\nE\n\n")]);

    let (_, page) = translate_page(
        merge_config(temp_dir.path(), TranslationPosition::Above),
        engine,
        &book_dir,
        temp_dir.path().join("out"),
    )
    .await?;

    assert!(page.contains(
        "<p dir=\"auto\">A<br/><br/>B</p><p>a</p>\
         <p dir=\"auto\">C</p><p>b</p><p dir=\"auto\">D<br/><br/>E</p><p>c</p>"
    ));
    Ok(())
}

/// Test that numeric-only paragraphs are never sent nor touched
#[tokio::test]
async fn test_translate_withNumericParagraph_shouldLeaveItAlone() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let book_dir = common::create_test_book(temp_dir.path(), &[("ch1.xhtml", "<p>123</p><p>Text</p>")])?;
    let engine = ScriptedEngine::new(&[("Text", "Texte")]);
    let tracker = engine.tracker();

    let (summary, page) =
        translate_page(common::test_config(temp_dir.path()), engine, &book_dir, temp_dir.path().join("out")).await?;

    assert_eq!(tracker.lock().requests, vec!["Text".to_string()]);
    assert_eq!(summary.paragraphs, 1);
    assert!(page.contains("<p>123</p><p>Text</p><p dir=\"auto\">Texte</p>"));
    Ok(())
}

/// Test that a second identical run is served entirely from the cache
#[tokio::test]
async fn test_translate_twice_shouldServeSecondRunFromCache() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let book_dir = common::create_test_book(
        temp_dir.path(),
        &[("ch1.xhtml", "<p>Hello World</p><p>Good night</p>")],
    )?;
    let config = common::test_config(temp_dir.path());

    let first = ScriptedEngine::new(&[("Hello World", "你好世界"), ("Good night", "晚安")]);
    let (first_summary, first_page) =
        translate_page(config.clone(), first, &book_dir, temp_dir.path().join("out1")).await?;
    assert_eq!(first_summary.translated, 2);

    let second = ScriptedEngine::new(&[]);
    let tracker = second.tracker();
    let (second_summary, second_page) =
        translate_page(config, second, &book_dir, temp_dir.path().join("out2")).await?;

    assert_eq!(tracker.lock().call_count, 0);
    assert_eq!(second_summary.cached, 2);
    assert_eq!(second_summary.translated, 0);
    assert_eq!(first_page, second_page);
    Ok(())
}

/// Test that cache-only runs write back what the cache holds without calling the engine
#[tokio::test]
async fn test_translate_withCacheOnly_shouldNotCallEngine() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let book_dir = common::create_test_book(temp_dir.path(), &[("ch1.xhtml", "<p>Hello World</p>")])?;
    let config = common::test_config(temp_dir.path());

    let engine = ScriptedEngine::new(&[("Hello World", "你好世界")]);
    translate_page(config.clone(), engine, &book_dir, temp_dir.path().join("out1")).await?;

    let controller = Controller::with_config(config)?;
    let engine = ScriptedEngine::new(&[]);
    let tracker = engine.tracker();
    let job = JobOptions {
        cache_only: true,
        ..options(&book_dir, temp_dir.path().join("out2"))
    };
    controller.run_with_engine(Arc::new(engine), &job).await?;

    let page = std::fs::read_to_string(temp_dir.path().join("out2").join("ch1.xhtml"))?;
    assert_eq!(tracker.lock().call_count, 0);
    assert!(page.contains("<p dir=\"auto\">你好世界</p>"));
    Ok(())
}

/// Test that without a persistent cache every run asks the engine again
#[tokio::test]
async fn test_translate_withCacheDisabled_shouldTranslateAgain() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let book_dir = common::create_test_book(temp_dir.path(), &[("ch1.xhtml", "<p>Hello World</p>")])?;
    let config = Config {
        cache_enabled: false,
        ..common::test_config(temp_dir.path())
    };

    translate_page(config.clone(), ScriptedEngine::new(&[]), &book_dir, temp_dir.path().join("out1")).await?;
    let engine = ScriptedEngine::new(&[]);
    let tracker = engine.tracker();
    translate_page(config, engine, &book_dir, temp_dir.path().join("out2")).await?;

    assert_eq!(tracker.lock().call_count, 1);
    assert!(!temp_dir.path().join("cache").exists());
    Ok(())
}

/// Test that glossary terms bypass the engine and come back replaced
#[tokio::test]
async fn test_translate_withGlossary_shouldProtectTerms() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let book_dir =
        common::create_test_book(temp_dir.path(), &[("ch1.xhtml", "<p>A Muggle at Hogwarts</p>")])?;
    let config = Config {
        glossary_enabled: true,
        glossary_path: Some(common::sample_path("glossary.txt")),
        ..common::test_config(temp_dir.path())
    };
    let engine = ScriptedEngine::new(&[("A {{id_000001}} at {{id_000000}}", "Un {{id_000001}} à {{id_000000}}")]);
    let tracker = engine.tracker();

    let (_, page) = translate_page(config, engine, &book_dir, temp_dir.path().join("out")).await?;

    assert_eq!(tracker.lock().requests, vec!["A {{id_000001}} at {{id_000000}}".to_string()]);
    assert!(page.contains("<p dir=\"auto\">Un 麻瓜 à 霍格沃茨</p>"));
    Ok(())
}

/// Test that the only position replaces the source element
#[tokio::test]
async fn test_translate_withOnlyPosition_shouldReplaceSource() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let book_dir = common::create_test_book(temp_dir.path(), &[("ch1.xhtml", "<p id=\"x\">Hi</p>")])?;
    let config = Config {
        translation_position: TranslationPosition::Only,
        ..common::test_config(temp_dir.path())
    };
    let engine = ScriptedEngine::new(&[("Hi", "Salut")]);

    let (_, page) = translate_page(config, engine, &book_dir, temp_dir.path().join("out")).await?;

    assert!(page.contains("<body><p dir=\"auto\" id=\"x\">Salut</p></body>"));
    assert!(!page.contains(">Hi<"));
    Ok(())
}

const EPUB_PAGE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" xml:lang="en">
<head>
<title>Chapter 1</title>
<link rel="stylesheet" type="text/css" href="style.css"/>
</head>
<body>
<h1>Chapter One</h1>
<p>Hello<a id="n1"/> world</p>
<div class="sep"/>
<p>See <img alt="a&gt;b" src="i.png"/> here</p>
</body>
</html>"#;

/// Test that a typical EPUB page survives the round trip with its XML syntax
#[tokio::test]
async fn test_translate_withEpubPage_shouldKeepXhtmlStructure() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let book_dir = temp_dir.path().join("book");
    common::create_test_file(&book_dir, "ch1.xhtml", EPUB_PAGE)?;
    let engine = ScriptedEngine::new(&[]);
    let tracker = engine.tracker();

    let (summary, page) =
        translate_page(common::test_config(temp_dir.path()), engine, &book_dir, temp_dir.path().join("out")).await?;

    assert_eq!(
        tracker.lock().requests,
        vec!["Chapter One", "Hello world", "See {{id_00000}} here"]
    );
    assert_eq!(summary.paragraphs, 3);
    assert!(page.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!DOCTYPE html><html"));
    assert!(page.contains("xmlns:epub=\"http://www.idpf.org/2007/ops\""));
    assert!(page.contains("<title>Chapter 1</title>"));
    assert!(page.contains("href=\"style.css\""));
    assert!(page.contains("<p>Hello<a id=\"n1\"></a> world</p><p dir=\"auto\">[TRANSLATED] Hello world</p>"));
    assert!(page.contains("<div class=\"sep\"></div>"));
    assert!(page.contains("<p>See <img alt=\"a&gt;b\" src=\"i.png\"/> here</p>"));
    assert_eq!(page.matches("<img alt=\"a&gt;b\" src=\"i.png\"/>").count(), 2);
    assert!(!page.contains("a/>b"));
    Ok(())
}
