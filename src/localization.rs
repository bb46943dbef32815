//! English display names for the language codes the deployment supports.
//! Used when flattening manager attributes for the contact-list sync.

static LANGUAGES: &[(&str, &str)] = &[
    ("ar", "Arabic"),
    ("bg", "Bulgarian"),
    ("bn", "Bengali"),
    ("cs", "Czech"),
    ("da", "Danish"),
    ("de", "German"),
    ("el", "Greek"),
    ("en", "English"),
    ("es", "Spanish"),
    ("fa", "Persian"),
    ("fi", "Finnish"),
    ("fr", "French"),
    ("he", "Hebrew"),
    ("hi", "Hindi"),
    ("hu", "Hungarian"),
    ("id", "Indonesian"),
    ("it", "Italian"),
    ("ja", "Japanese"),
    ("kn", "Kannada"),
    ("ko", "Korean"),
    ("ml", "Malayalam"),
    ("mr", "Marathi"),
    ("nl", "Dutch"),
    ("no", "Norwegian"),
    ("pl", "Polish"),
    ("pt", "Portuguese"),
    ("ro", "Romanian"),
    ("ru", "Russian"),
    ("sk", "Slovak"),
    ("sl", "Slovenian"),
    ("sv", "Swedish"),
    ("ta", "Tamil"),
    ("te", "Telugu"),
    ("th", "Thai"),
    ("tr", "Turkish"),
    ("uk", "Ukrainian"),
    ("vi", "Vietnamese"),
    ("zh", "Chinese"),
];

/// Display name for a language code, e.g. "hi" -> "Hindi". Region suffixes
/// ("pt-BR") fall back to the base language.
pub fn language_name(language_code: &str) -> Option<&'static str> {
    let code = language_code.trim().to_ascii_lowercase();
    if code.is_empty() {
        return None;
    }

    let base = code.split(['-', '_']).next().unwrap_or(&code);
    LANGUAGES
        .iter()
        .find(|(c, _)| *c == base)
        .map(|(_, name)| *name)
}
