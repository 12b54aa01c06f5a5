//! Text cleanup shared by the bank loader and question identity.

/// Mis-decoded UTF-8 sequences and typographic characters, longest first.
const REPLACEMENTS: &[(&str, &str)] = &[
    ("\u{e2}\u{20ac}\u{2122}", "'"),
    ("\u{e2}\u{20ac}\u{201c}", "\u{2013}"),
    ("\u{e2}\u{20ac}\u{201d}", "\u{2014}"),
    ("\u{e2}\u{20ac}\u{153}", "\""),
    ("\u{e2}\u{20ac}", "\""),
    ("\u{2019}", "'"),
    ("\u{2018}", "'"),
    ("\u{201c}", "\""),
    ("\u{201d}", "\""),
    ("\u{a0}", " "),
];

/// Trim, repair common encoding damage, drop control characters, and collapse
/// runs of whitespace.
#[must_use]
pub fn clean_text(raw: &str) -> String {
    let mut text = raw.trim().to_owned();
    for (from, to) in REPLACEMENTS {
        if text.contains(from) {
            text = text.replace(from, to);
        }
    }
    text.retain(|c| !c.is_control() || c.is_whitespace());
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case-insensitive comparison key for prompts.
#[must_use]
pub fn prompt_key(raw: &str) -> String {
    clean_text(raw).to_lowercase()
}
