/// Title and body of an uploaded document after normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    pub title: String,
    pub body: String,
}

/// Splits into lines, trims each, drops blank ones. The first surviving line is the
/// title and the rest, joined by `\n`, is the body. Applied identically to every
/// format so the fingerprint ignores incidental whitespace.
pub fn normalize_text(raw: &str) -> ExtractedText {
    let mut lines = raw.lines().map(str::trim).filter(|line| !line.is_empty());

    let Some(title) = lines.next() else {
        return ExtractedText::default();
    };

    ExtractedText {
        title: title.to_string(),
        body: lines.collect::<Vec<_>>().join("\n"),
    }
}

/// Removes decoder replacement characters, NULs and byte-order marks.
pub fn strip_invalid_markers(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '\u{FFFD}' | '\u{0}' | '\u{FEFF}'))
        .collect()
}
