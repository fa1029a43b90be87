/*!
 * Tests for language utility functions
 */

use ebook_translator::language_utils::{
    get_language_name, language_tag, normalize_to_part1_or_part2t, resolve_display_name, text_direction, AUTO_DETECT,
};

/// Test that two-letter and three-letter codes resolve to English names
#[test]
fn test_getLanguageName_withValidCodes_shouldReturnName() {
    assert_eq!(get_language_name("en").unwrap(), "English");
    assert_eq!(get_language_name("DE").unwrap(), "German");
    assert_eq!(get_language_name("jpn").unwrap(), "Japanese");
}

#[test]
fn test_getLanguageName_withInvalidCode_shouldFail() {
    assert!(get_language_name("xx").is_err());
    assert!(get_language_name("english").is_err());
}

/// Test that codes without a 639-1 twin keep their 639-2/T form
#[test]
fn test_normalize_withPart2OnlyLanguage_shouldKeepThreeLetters() {
    assert_eq!(normalize_to_part1_or_part2t("deu").unwrap(), "de");
    assert_eq!(normalize_to_part1_or_part2t("haw").unwrap(), "haw");
}

#[test]
fn test_languageTag_withVariants_shouldUseRegionalTags() {
    assert_eq!(language_tag("Portuguese (Brazil)").as_deref(), Some("pt-BR"));
    assert_eq!(language_tag("Japanese").as_deref(), Some("ja"));
    assert_eq!(language_tag(AUTO_DETECT), None);
}

#[test]
fn test_textDirection_withRtlLanguages_shouldReturnRtl() {
    assert_eq!(text_direction("Hebrew"), "rtl");
    assert_eq!(text_direction("Persian"), "rtl");
    assert_eq!(text_direction("English"), "auto");
}

#[test]
fn test_resolveDisplayName_withUnknownValue_shouldPassThrough() {
    assert_eq!(resolve_display_name(" es "), "Spanish");
    assert_eq!(resolve_display_name("Klingon"), "Klingon");
}
