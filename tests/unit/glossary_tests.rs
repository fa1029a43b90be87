/*!
 * Tests for glossary loading and substitution
 */

use anyhow::Result;

use ebook_translator::engines::Placeholder;
use ebook_translator::translation::Glossary;
use crate::common;

/// Test that the bundled sample glossary loads every record
#[test]
fn test_load_withSampleFile_shouldReadAllRecords() -> Result<()> {
    let mut glossary = Glossary::new(Placeholder::default());
    glossary.load(common::sample_path("glossary.txt"))?;

    assert_eq!(glossary.len(), 3);
    assert_eq!(glossary.entries()[1], ("Muggle".to_string(), "麻瓜".to_string()));
    assert_eq!(glossary.entries()[2], ("Voldemort".to_string(), "Voldemort".to_string()));
    Ok(())
}

#[test]
fn test_load_withMissingFile_shouldFail() {
    let mut glossary = Glossary::new(Placeholder::default());
    assert!(glossary.load("non_existent_glossary_12345.txt").is_err());
    assert!(glossary.is_empty());
}

/// Test that tokens mangled by an engine still restore the replacement
#[test]
fn test_restore_withMangledTokens_shouldInsertReplacement() {
    let mut glossary = Glossary::new(Placeholder::default());
    glossary.load_from_str("Hogwarts\n霍格沃茨\n\nMuggle\n麻瓜\n");

    let sent = glossary.replace("The Muggle never saw Hogwarts.");
    assert_eq!(sent, "The {{id_000001}} never saw {{id_000000}}.");

    let received = "Le { ID_000001 } n'a jamais vu {{id_000000}}.";
    assert_eq!(glossary.restore(received), "Le 麻瓜 n'a jamais vu 霍格沃茨.");
}

/// Test that replacement text containing `$` is inserted literally
#[test]
fn test_restore_withDollarInReplacement_shouldNotExpand() {
    let mut glossary = Glossary::new(Placeholder::default());
    glossary.load_from_str("price\n$1 fee\n");

    let restored = glossary.restore(&glossary.replace("the price"));

    assert_eq!(restored, "the $1 fee");
}
