//! Best-effort ASCII folding of text fields.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::types::UnifiedTable;

/// Placeholder for characters with no ASCII rendering.
const REPLACEMENT: char = '?';

/// Letters that do not decompose into an ASCII base plus combining marks.
const FOLDS: &[(char, &str)] = &[
    ('ß', "ss"),
    ('æ', "ae"),
    ('Æ', "AE"),
    ('œ', "oe"),
    ('Œ', "OE"),
    ('ø', "o"),
    ('Ø', "O"),
    ('đ', "d"),
    ('Đ', "D"),
    ('ð', "d"),
    ('Ð', "D"),
    ('þ', "th"),
    ('Þ', "TH"),
    ('ł', "l"),
    ('Ł', "L"),
    ('ª', "a"),
    ('º', "o"),
    ('°', "o"),
    ('\u{a0}', " "),
    ('–', "-"),
    ('—', "-"),
    ('‘', "'"),
    ('’', "'"),
    ('“', "\""),
    ('”', "\""),
];

/// Fold a string to ASCII.
///
/// # Examples
/// ```
/// use urna_harvester::transliterate::to_ascii;
///
/// assert_eq!(to_ascii("SÃO PAULO"), "SAO PAULO");
/// assert_eq!(to_ascii("Coligação 1ª"), "Coligacao 1a");
/// assert_eq!(to_ascii("日本"), "??");
/// ```
#[must_use]
pub fn to_ascii(text: &str) -> String {
    if text.is_ascii() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    for c in text.nfd() {
        if c.is_ascii() {
            out.push(c);
        } else if is_combining_mark(c) {
            continue;
        } else if let Some((_, folded)) = FOLDS.iter().find(|(from, _)| *from == c) {
            out.push_str(folded);
        } else {
            out.push(REPLACEMENT);
        }
    }
    out
}

/// Fold every field of a table to ASCII. Column names are left as they are.
#[must_use]
pub fn transliterate(mut table: UnifiedTable) -> UnifiedTable {
    let mut changed = 0usize;
    for field in table.rows.iter_mut().flatten() {
        if !field.is_ascii() {
            *field = to_ascii(field);
            changed += 1;
        }
    }
    tracing::debug!(fields = changed, "Transliterated table");
    table
}
