//! Canonical ⇄ display text conversion
//!
//! Canonical text always uses `.` for decimals and `,` between arguments.
//! Display text uses the separators of the active [`Locale`]. String literals
//! and bracketed fields are copied verbatim in both directions, as is any
//! character escaped with a backslash.

use crate::config::Locale;
use crate::lexer::{self, LexemeKind};
use measure_formula_core::{field, ErrorCode, ValidationMessages};
use once_cell::unsync::OnceCell;
use std::fmt;

/// Convert canonical text to the display form of `locale`
pub fn to_display_text(canonical: &str, locale: Locale) -> String {
    if locale.is_canonical() {
        return canonical.to_string();
    }
    map_separators(canonical, |c| match c {
        '.' => Some(locale.decimal_separator),
        ',' => Some(locale.argument_separator),
        _ => None,
    })
}

/// Convert display text of `locale` back to canonical text
pub fn to_canonical_text(display: &str, locale: Locale) -> String {
    if locale.is_canonical() {
        return display.to_string();
    }
    let canonical = Locale::CANONICAL;
    map_separators(display, |c| {
        if c == locale.decimal_separator {
            Some(canonical.decimal_separator)
        } else if c == locale.argument_separator {
            Some(canonical.argument_separator)
        } else {
            None
        }
    })
}

/// Region of formula text that separators never apply to
fn protected_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    match bytes[start] {
        b'"' => {
            let mut i = start + 1;
            while i < bytes.len() {
                if bytes[i] == b'"' {
                    if bytes.get(i + 1) == Some(&b'"') {
                        i += 2;
                        continue;
                    }
                    return Some(i + 1);
                }
                i += 1;
            }
            Some(bytes.len())
        }
        b'[' => Some(field::field_end(text, start).unwrap_or(bytes.len())),
        b'\\' => {
            let next = text[start + 1..].chars().next().map_or(0, char::len_utf8);
            Some(start + 1 + next)
        }
        _ => None,
    }
}

/// Visit the unprotected characters of `text` with their byte offsets
fn for_each_unprotected(text: &str, mut visit: impl FnMut(usize, char)) {
    let mut i = 0;
    while i < text.len() {
        if let Some(end) = protected_end(text, i) {
            i = end;
            continue;
        }
        let c = match text[i..].chars().next() {
            Some(c) => c,
            None => break,
        };
        visit(i, c);
        i += c.len_utf8();
    }
}

fn map_separators(text: &str, map: impl Fn(char) -> Option<char>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < text.len() {
        if let Some(end) = protected_end(text, i) {
            out.push_str(&text[i..end]);
            i = end;
            continue;
        }
        let c = match text[i..].chars().next() {
            Some(c) => c,
            None => break,
        };
        out.push(map(c).unwrap_or(c));
        i += c.len_utf8();
    }
    out
}

/// Report separators that don't belong to `locale` in display text
///
/// With a comma decimal mark, any `.` is a wrong decimal separator and a `,`
/// that isn't the decimal mark of a number literal (`1,5`, `,5`) is a wrong
/// argument separator. With the canonical separators only a `;` can be told
/// apart from a legitimate use.
pub fn check_separators(display: &str, locale: Locale) -> ValidationMessages {
    let mut messages = ValidationMessages::new();
    let marks = if locale.is_canonical() {
        Vec::new()
    } else {
        decimal_marks(display, locale)
    };

    for_each_unprotected(display, |offset, c| {
        if locale.is_canonical() {
            if c == Locale::COMMA_DECIMAL.argument_separator {
                messages.report(
                    ErrorCode::WrongArgumentSeparator,
                    format!(
                        "Unexpected '{}' at position {}, arguments are separated by '{}'",
                        c, offset, locale.argument_separator
                    ),
                );
            }
            return;
        }
        if c == Locale::CANONICAL.decimal_separator {
            messages.report(
                ErrorCode::WrongDecimalSeparator,
                format!(
                    "Unexpected '{}' at position {}, the decimal separator is '{}'",
                    c, offset, locale.decimal_separator
                ),
            );
        } else if c == Locale::CANONICAL.argument_separator
            && c == locale.decimal_separator
            && marks.binary_search(&offset).is_err()
        {
            messages.report(
                ErrorCode::WrongArgumentSeparator,
                format!(
                    "Unexpected '{}' at position {}, arguments are separated by '{}'",
                    c, offset, locale.argument_separator
                ),
            );
        }
    });

    if !messages.is_empty() {
        tracing::debug!(count = messages.len(), "separator guard rejected display text");
    }
    messages
}

/// Offsets of the decimal marks of number literals in display text, ascending
///
/// Separators are single bytes, so offsets in the canonical form are valid in
/// the display form.
fn decimal_marks(display: &str, locale: Locale) -> Vec<usize> {
    let canonical = to_canonical_text(display, locale);
    lexer::lex(&canonical)
        .into_iter()
        .filter(|l| l.kind == LexemeKind::Number)
        .filter_map(|l| {
            let mark = l.span.start + l.text(&canonical).find('.')?;
            // `1.` is a number to the lexer but `1,` is an argument separator
            canonical[mark + 1..l.span.end]
                .starts_with(|c: char| c.is_ascii_digit())
                .then_some(mark)
        })
        .collect()
}

/// Formula text with a canonical and a display form
///
/// One side is authoritative; the other is derived on first access. Setting
/// either side makes it authoritative and drops the derived one.
#[derive(Clone)]
pub struct FormulaText {
    locale: Locale,
    canonical: OnceCell<String>,
    display: OnceCell<String>,
}

impl FormulaText {
    /// The empty formula
    pub fn empty() -> Self {
        Self {
            locale: Locale::CANONICAL,
            canonical: OnceCell::with_value(String::new()),
            display: OnceCell::with_value(String::new()),
        }
    }

    pub fn from_canonical(text: impl Into<String>, locale: Locale) -> Self {
        Self {
            locale,
            canonical: OnceCell::with_value(text.into()),
            display: OnceCell::new(),
        }
    }

    pub fn from_display(text: impl Into<String>, locale: Locale) -> Self {
        Self {
            locale,
            canonical: OnceCell::new(),
            display: OnceCell::with_value(text.into()),
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn is_empty(&self) -> bool {
        self.canonical().trim().is_empty()
    }

    pub fn canonical(&self) -> &str {
        self.canonical.get_or_init(|| {
            let display = self.display.get().map_or("", String::as_str);
            to_canonical_text(display, self.locale)
        })
    }

    pub fn display(&self) -> &str {
        self.display.get_or_init(|| {
            let canonical = self.canonical.get().map_or("", String::as_str);
            to_display_text(canonical, self.locale)
        })
    }

    pub fn set_canonical(&mut self, text: impl Into<String>) {
        self.canonical = OnceCell::with_value(text.into());
        self.display = OnceCell::new();
    }

    pub fn set_display(&mut self, text: impl Into<String>) {
        self.display = OnceCell::with_value(text.into());
        self.canonical = OnceCell::new();
    }

    /// Same formula shown in another locale
    pub fn with_locale(&self, locale: Locale) -> Self {
        Self::from_canonical(self.canonical().to_string(), locale)
    }
}

impl Default for FormulaText {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for FormulaText {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl fmt::Debug for FormulaText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormulaText")
            .field("locale", &self.locale)
            .field("canonical", &self.canonical.get())
            .field("display", &self.display.get())
            .finish()
    }
}

impl fmt::Display for FormulaText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display())
    }
}
