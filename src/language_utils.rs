use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities
///
/// Engines address languages by English display names ("French",
/// "Chinese (Simplified)"). This module maps those names and ISO 639 codes
/// onto each other and decides the text direction written into translated
/// elements.

/// Display name accepted by every engine for source-language detection
pub const AUTO_DETECT: &str = "Auto detect";

/// ISO 639-1 codes of right-to-left scripts
const RTL_CODES: &[&str] = &["ar", "he", "fa", "ur", "yi", "ps", "sd", "ug", "dv", "ku"];

/// Names whose language tag cannot be derived from the base name alone
const TAG_OVERRIDES: &[(&str, &str)] = &[
    ("Chinese (Simplified)", "zh-CN"),
    ("Chinese (Traditional)", "zh-TW"),
    ("Chinese (Literary)", "lzh"),
    ("Portuguese (Brazil)", "pt-BR"),
    ("Portuguese (Portugal)", "pt-PT"),
    ("English (American)", "en-US"),
    ("English (British)", "en-GB"),
    ("Norwegian", "no"),
];

/// Map ISO 639-2/B codes to their 639-2/T twins
fn bibliographic_to_terminology(code: &str) -> &str {
    match code {
        "fre" => "fra",
        "ger" => "deu",
        "dut" => "nld",
        "gre" => "ell",
        "chi" => "zho",
        "cze" => "ces",
        "ice" => "isl",
        "alb" => "sqi",
        "arm" => "hye",
        "baq" => "eus",
        "bur" => "mya",
        "per" => "fas",
        "geo" => "kat",
        "may" => "msa",
        "mac" => "mkd",
        "rum" => "ron",
        "slo" => "slk",
        "wel" => "cym",
        other => other,
    }
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible
/// Falls back to ISO 639-2/T if no ISO 639-1 code exists
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 {
        if Language::from_639_1(&normalized_code).is_some() {
            return Ok(normalized_code);
        }
    } else if normalized_code.len() == 3 {
        let part2t = bibliographic_to_terminology(&normalized_code);
        if let Some(lang) = Language::from_639_3(part2t) {
            if let Some(code_639_1) = lang.to_639_1() {
                return Ok(code_639_1.to_string());
            }
            return Ok(part2t.to_string());
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Get the English language name from an ISO code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = code.trim().to_lowercase();
    let lang = match normalized.len() {
        2 => Language::from_639_1(&normalized),
        3 => Language::from_639_3(bibliographic_to_terminology(&normalized)),
        _ => None,
    }
    .ok_or_else(|| anyhow!("Failed to get language from code: {}", code))?;

    Ok(lang.to_name().to_string())
}

/// Strip a parenthesized variant: "Chinese (Simplified)" -> "Chinese"
fn base_name(display_name: &str) -> &str {
    display_name
        .split_once('(')
        .map(|(base, _)| base.trim())
        .unwrap_or_else(|| display_name.trim())
}

/// Language tag for a display name, used for the `lang` attribute
pub fn language_tag(display_name: &str) -> Option<String> {
    if display_name == AUTO_DETECT {
        return None;
    }
    if let Some((_, tag)) = TAG_OVERRIDES.iter().find(|(name, _)| *name == display_name) {
        return Some((*tag).to_string());
    }
    if let Ok(code) = normalize_to_part1_or_part2t(display_name) {
        return Some(code);
    }
    let language = Language::from_name(base_name(display_name))?;
    Some(
        language
            .to_639_1()
            .map(str::to_string)
            .unwrap_or_else(|| language.to_639_3().to_string()),
    )
}

/// Resolve a CLI value that may be either a display name or an ISO code
pub fn resolve_display_name(value: &str) -> String {
    let value = value.trim();
    if value.len() <= 3 {
        if let Ok(name) = get_language_name(value) {
            return name;
        }
    }
    value.to_string()
}

/// `dir` attribute value for translated elements
pub fn text_direction(display_name: &str) -> &'static str {
    match language_tag(display_name) {
        Some(tag) => {
            let primary = tag.split('-').next().unwrap_or_default();
            if RTL_CODES.contains(&primary) { "rtl" } else { "auto" }
        }
        None => "auto",
    }
}
