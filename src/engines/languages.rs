/*!
 * Language code tables.
 *
 * Display names are shared by all engines; each family maps them to its own
 * codes. Generative engines take the display name itself.
 */

use super::base::LangCodes;

/// Google-style BCP 47 codes, also the base for the other tables
pub const GOOGLE: &[(&str, &str)] = &[
    ("Afrikaans", "af"),
    ("Albanian", "sq"),
    ("Amharic", "am"),
    ("Arabic", "ar"),
    ("Armenian", "hy"),
    ("Azerbaijani", "az"),
    ("Basque", "eu"),
    ("Belarusian", "be"),
    ("Bengali", "bn"),
    ("Bosnian", "bs"),
    ("Bulgarian", "bg"),
    ("Catalan", "ca"),
    ("Chinese (Simplified)", "zh-CN"),
    ("Chinese (Traditional)", "zh-TW"),
    ("Croatian", "hr"),
    ("Czech", "cs"),
    ("Danish", "da"),
    ("Dutch", "nl"),
    ("English", "en"),
    ("Esperanto", "eo"),
    ("Estonian", "et"),
    ("Filipino", "tl"),
    ("Finnish", "fi"),
    ("French", "fr"),
    ("Galician", "gl"),
    ("Georgian", "ka"),
    ("German", "de"),
    ("Greek", "el"),
    ("Gujarati", "gu"),
    ("Hebrew", "iw"),
    ("Hindi", "hi"),
    ("Hungarian", "hu"),
    ("Icelandic", "is"),
    ("Indonesian", "id"),
    ("Irish", "ga"),
    ("Italian", "it"),
    ("Japanese", "ja"),
    ("Kazakh", "kk"),
    ("Khmer", "km"),
    ("Korean", "ko"),
    ("Lao", "lo"),
    ("Latin", "la"),
    ("Latvian", "lv"),
    ("Lithuanian", "lt"),
    ("Macedonian", "mk"),
    ("Malay", "ms"),
    ("Mongolian", "mn"),
    ("Nepali", "ne"),
    ("Norwegian", "no"),
    ("Persian", "fa"),
    ("Polish", "pl"),
    ("Portuguese", "pt"),
    ("Romanian", "ro"),
    ("Russian", "ru"),
    ("Serbian", "sr"),
    ("Slovak", "sk"),
    ("Slovenian", "sl"),
    ("Spanish", "es"),
    ("Swahili", "sw"),
    ("Swedish", "sv"),
    ("Tamil", "ta"),
    ("Thai", "th"),
    ("Turkish", "tr"),
    ("Ukrainian", "uk"),
    ("Urdu", "ur"),
    ("Uzbek", "uz"),
    ("Vietnamese", "vi"),
    ("Welsh", "cy"),
];

pub const DEEPL_SOURCE: &[(&str, &str)] = &[
    ("Arabic", "AR"),
    ("Bulgarian", "BG"),
    ("Chinese", "ZH"),
    ("Czech", "CS"),
    ("Danish", "DA"),
    ("Dutch", "NL"),
    ("English", "EN"),
    ("Estonian", "ET"),
    ("Finnish", "FI"),
    ("French", "FR"),
    ("German", "DE"),
    ("Greek", "EL"),
    ("Hungarian", "HU"),
    ("Indonesian", "ID"),
    ("Italian", "IT"),
    ("Japanese", "JA"),
    ("Korean", "KO"),
    ("Latvian", "LV"),
    ("Lithuanian", "LT"),
    ("Norwegian", "NB"),
    ("Polish", "PL"),
    ("Portuguese", "PT"),
    ("Romanian", "RO"),
    ("Russian", "RU"),
    ("Slovak", "SK"),
    ("Slovenian", "SL"),
    ("Spanish", "ES"),
    ("Swedish", "SV"),
    ("Turkish", "TR"),
    ("Ukrainian", "UK"),
];

pub const DEEPL_TARGET: &[(&str, &str)] = &[
    ("Arabic", "AR"),
    ("Bulgarian", "BG"),
    ("Chinese (Simplified)", "ZH-HANS"),
    ("Chinese (Traditional)", "ZH-HANT"),
    ("Czech", "CS"),
    ("Danish", "DA"),
    ("Dutch", "NL"),
    ("English (American)", "EN-US"),
    ("English (British)", "EN-GB"),
    ("Estonian", "ET"),
    ("Finnish", "FI"),
    ("French", "FR"),
    ("German", "DE"),
    ("Greek", "EL"),
    ("Hungarian", "HU"),
    ("Indonesian", "ID"),
    ("Italian", "IT"),
    ("Japanese", "JA"),
    ("Korean", "KO"),
    ("Latvian", "LV"),
    ("Lithuanian", "LT"),
    ("Norwegian", "NB"),
    ("Polish", "PL"),
    ("Portuguese (Brazil)", "PT-BR"),
    ("Portuguese (Portugal)", "PT-PT"),
    ("Romanian", "RO"),
    ("Russian", "RU"),
    ("Slovak", "SK"),
    ("Slovenian", "SL"),
    ("Spanish", "ES"),
    ("Swedish", "SV"),
    ("Turkish", "TR"),
    ("Ukrainian", "UK"),
];

pub const BAIDU: &[(&str, &str)] = &[
    ("Chinese (Simplified)", "zh"),
    ("Chinese (Traditional)", "cht"),
    ("Chinese (Classical)", "wyw"),
    ("Cantonese", "yue"),
    ("English", "en"),
    ("Japanese", "jp"),
    ("Korean", "kor"),
    ("French", "fra"),
    ("Spanish", "spa"),
    ("Thai", "th"),
    ("Arabic", "ara"),
    ("Russian", "ru"),
    ("Portuguese", "pt"),
    ("German", "de"),
    ("Italian", "it"),
    ("Greek", "el"),
    ("Dutch", "nl"),
    ("Polish", "pl"),
    ("Bulgarian", "bul"),
    ("Estonian", "est"),
    ("Danish", "dan"),
    ("Finnish", "fin"),
    ("Czech", "cs"),
    ("Romanian", "rom"),
    ("Slovenian", "slo"),
    ("Swedish", "swe"),
    ("Hungarian", "hu"),
    ("Vietnamese", "vie"),
];

pub const YOUDAO: &[(&str, &str)] = &[
    ("Chinese (Simplified)", "zh-CHS"),
    ("Chinese (Traditional)", "zh-CHT"),
    ("English", "en"),
    ("Japanese", "ja"),
    ("Korean", "ko"),
    ("French", "fr"),
    ("Spanish", "es"),
    ("Portuguese", "pt"),
    ("Italian", "it"),
    ("Russian", "ru"),
    ("Vietnamese", "vi"),
    ("German", "de"),
    ("Arabic", "ar"),
    ("Indonesian", "id"),
    ("Thai", "th"),
    ("Dutch", "nl"),
    ("Turkish", "tr"),
    ("Polish", "pl"),
];

pub const PAPAGO: &[(&str, &str)] = &[
    ("Korean", "ko"),
    ("English", "en"),
    ("Japanese", "ja"),
    ("Chinese (Simplified)", "zh-CN"),
    ("Chinese (Traditional)", "zh-TW"),
    ("Vietnamese", "vi"),
    ("Thai", "th"),
    ("Indonesian", "id"),
    ("French", "fr"),
    ("Spanish", "es"),
    ("Russian", "ru"),
    ("German", "de"),
    ("Italian", "it"),
];

/// Microsoft differs from Google only in a handful of codes
const MICROSOFT_OVERRIDES: &[(&str, &str)] = &[
    ("Chinese (Simplified)", "zh-Hans"),
    ("Chinese (Traditional)", "zh-Hant"),
    ("Hebrew", "he"),
    ("Filipino", "fil"),
    ("Norwegian", "nb"),
    ("Serbian", "sr-Cyrl"),
];

pub fn google() -> LangCodes {
    LangCodes::symmetric(GOOGLE)
}

pub fn deepl() -> LangCodes {
    let owned = |table: &[(&str, &str)]| -> Vec<(String, String)> {
        table
            .iter()
            .map(|(name, code)| (name.to_string(), code.to_string()))
            .collect()
    };
    LangCodes::from_pairs(owned(DEEPL_SOURCE), owned(DEEPL_TARGET))
}

pub fn microsoft() -> LangCodes {
    let table: Vec<(&str, &str)> = GOOGLE
        .iter()
        .map(|&(name, google_code)| {
            let code = MICROSOFT_OVERRIDES
                .iter()
                .find(|(override_name, _)| *override_name == name)
                .map(|&(_, code)| code)
                .unwrap_or(google_code);
            (name, code)
        })
        .collect();
    LangCodes::symmetric(&table)
}

/// Generative engines are addressed with the display name itself
pub fn generative() -> LangCodes {
    let table: Vec<(&str, &str)> = GOOGLE
        .iter()
        .map(|&(name, _)| (name, name))
        .chain([("Chinese (Classical)", "Chinese (Classical)"), ("Cantonese", "Cantonese")])
        .collect();
    LangCodes::symmetric(&table)
}
