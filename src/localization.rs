//! Language codes and localized text maps.
//!
//! The catalog speaks in short locale codes (`it`, `en`), RDF literals carry
//! BCP 47 tags (`en-GB`), and the EU language authority table uses ISO 639-3
//! style codes (`ITA`, `ENG`). These helpers convert between the three.

use indexmap::IndexMap;

use crate::config::SUPPORTED_LOCALES;

/// Mapping from language code to text, in insertion order.
pub type LocalizedText = IndexMap<String, String>;

/// Mapping from field name to its localized values.
pub type LocalizedFields = IndexMap<String, LocalizedText>;

/// Catalog locale to EU language authority code. Also the allow-list of
/// languages imported from the language vocabulary.
pub const CATALOG_LANGUAGE_CODES: [(&str, &str); 6] = [
    ("it", "ITA"),
    ("de", "DEU"),
    ("en_GB", "ENG"),
    ("en", "ENG"),
    ("fr", "FRA"),
    ("es", "SPA"),
];

/// Normalizes an external language tag to a supported catalog locale.
///
/// `en-GB`, `en_GB` and `EN` all become `en`. Returns `None` for languages the
/// catalog does not support.
#[must_use]
pub fn normalize_lang(tag: &str) -> Option<&'static str> {
    let primary = tag
        .split(|c| c == '_' || c == '-')
        .next()
        .unwrap_or(tag)
        .to_ascii_lowercase();
    SUPPORTED_LOCALES.iter().copied().find(|l| *l == primary)
}

/// Returns the RDF language tag for a catalog locale (`en_GB` becomes `en`).
#[must_use]
pub fn xml_lang(lang: &str) -> &str {
    lang.split('_').next().unwrap_or(lang)
}

/// Maps a catalog locale to its EU language authority code.
#[must_use]
pub fn language_code(locale: &str) -> Option<&'static str> {
    CATALOG_LANGUAGE_CODES
        .iter()
        .find(|(l, _)| *l == locale)
        .map(|(_, code)| *code)
}

/// Returns true if an EU language authority code is in the import allow-list.
#[must_use]
pub fn is_allowed_language_code(code: &str) -> bool {
    CATALOG_LANGUAGE_CODES.iter().any(|(_, c)| *c == code)
}

/// Picks the text for `lang`, falling back to `default_lang` and then to any
/// available value.
#[must_use]
pub fn pick<'a>(text: &'a LocalizedText, lang: &str, default_lang: &str) -> Option<&'a str> {
    text.get(lang)
        .or_else(|| text.get(default_lang))
        .or_else(|| text.values().next())
        .map(String::as_str)
}
