//! Bracketed field reference grammar
//!
//! ```text
//! field     := "[" head "]" ( "." "[" suffix "]" )?
//! head      := ( ("d" | "p" | "h") "/" )? ( '"' datasource '"' ":" )? id
//! suffix    := ("p" | "h") "/" id
//! ```
//!
//! A head without a prefix is a measure. Parsing fails softly: malformed input
//! yields `None`, never a panic.

use std::fmt;
use std::ops::Range;

/// Head type of a field reference, classified by its prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldKind {
    Dimension,
    Property,
    Hierarchy,
    Measure,
    Unknown,
}

impl FieldKind {
    /// Classify a bare reference by its prefix (`[d/`, `[p/`, `[h/`, else measure)
    pub fn classify(text: &str) -> FieldKind {
        let Some(body) = text.trim_start().strip_prefix('[') else {
            return FieldKind::Unknown;
        };
        match body.get(..2) {
            Some("d/") => FieldKind::Dimension,
            Some("p/") => FieldKind::Property,
            Some("h/") => FieldKind::Hierarchy,
            _ => FieldKind::Measure,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            FieldKind::Dimension => "d/",
            FieldKind::Property => "p/",
            FieldKind::Hierarchy => "h/",
            FieldKind::Measure | FieldKind::Unknown => "",
        }
    }

    /// True for the dimension-side heads (dimension, property, hierarchy)
    pub fn is_dimension(self) -> bool {
        matches!(
            self,
            FieldKind::Dimension | FieldKind::Property | FieldKind::Hierarchy
        )
    }
}

/// Kind of the optional `.[x/..]` suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SuffixKind {
    Property,
    Hierarchy,
}

/// Optional `.[p/..]` / `.[h/..]` suffix of a field reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldSuffix {
    pub kind: SuffixKind,
    pub id: String,
}

/// A parsed field reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldReference {
    pub datasource: Option<String>,
    pub kind: FieldKind,
    pub id: String,
    pub suffix: Option<FieldSuffix>,
}

impl FieldReference {
    /// Reference to a dimension (`[d/id]`)
    pub fn dimension(id: impl Into<String>) -> Self {
        Self {
            datasource: None,
            kind: FieldKind::Dimension,
            id: id.into(),
            suffix: None,
        }
    }

    /// Reference to a measure (`[id]`)
    pub fn measure(id: impl Into<String>) -> Self {
        Self {
            datasource: None,
            kind: FieldKind::Measure,
            id: id.into(),
            suffix: None,
        }
    }

    pub fn with_datasource(mut self, datasource: impl Into<String>) -> Self {
        self.datasource = Some(datasource.into());
        self
    }

    pub fn with_property(mut self, id: impl Into<String>) -> Self {
        self.suffix = Some(FieldSuffix {
            kind: SuffixKind::Property,
            id: id.into(),
        });
        self
    }

    pub fn with_hierarchy(mut self, id: impl Into<String>) -> Self {
        self.suffix = Some(FieldSuffix {
            kind: SuffixKind::Hierarchy,
            id: id.into(),
        });
        self
    }

    /// Parse a complete field reference; `None` on malformed brackets or empty ids
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (head, rest) = split_bracket(text)?;
        let kind = FieldKind::classify(text);
        let body = &head[kind.prefix().len()..];
        let (datasource, id) = split_datasource(body)?;
        if id.trim().is_empty() {
            return None;
        }

        let suffix = if rest.is_empty() {
            None
        } else {
            let (inner, tail) = split_bracket(rest.strip_prefix('.')?)?;
            if !tail.is_empty() {
                return None;
            }
            let kind = match inner.get(..2) {
                Some("p/") => SuffixKind::Property,
                Some("h/") => SuffixKind::Hierarchy,
                _ => return None,
            };
            let id = &inner[2..];
            if id.trim().is_empty() || id.contains('"') {
                return None;
            }
            Some(FieldSuffix {
                kind,
                id: id.to_string(),
            })
        };

        Some(Self {
            datasource,
            kind,
            id: id.to_string(),
            suffix,
        })
    }

    /// Hierarchy id, if the reference carries a `.[h/..]` suffix or is a hierarchy head
    pub fn hierarchy(&self) -> Option<&str> {
        match &self.suffix {
            Some(FieldSuffix {
                kind: SuffixKind::Hierarchy,
                id,
            }) => Some(id),
            _ => None,
        }
    }

    /// Property id, if the reference carries a `.[p/..]` suffix
    pub fn property(&self) -> Option<&str> {
        match &self.suffix {
            Some(FieldSuffix {
                kind: SuffixKind::Property,
                id,
            }) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for FieldReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.kind.prefix())?;
        if let Some(ds) = &self.datasource {
            write!(f, "\"{}\":", ds)?;
        }
        write!(f, "{}]", self.id)?;
        match &self.suffix {
            Some(FieldSuffix {
                kind: SuffixKind::Property,
                id,
            }) => write!(f, ".[p/{}]", id),
            Some(FieldSuffix {
                kind: SuffixKind::Hierarchy,
                id,
            }) => write!(f, ".[h/{}]", id),
            None => Ok(()),
        }
    }
}

/// Split `[inner]rest`, honouring double quotes inside the brackets
fn split_bracket(text: &str) -> Option<(&str, &str)> {
    let body = text.strip_prefix('[')?;
    let mut in_quotes = false;
    for (i, c) in body.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ']' if !in_quotes => return Some((&body[..i], &body[i + 1..])),
            '[' if !in_quotes => return None,
            _ => {}
        }
    }
    None
}

/// Split an optional `"Model":` prefix off a head body
fn split_datasource(body: &str) -> Option<(Option<String>, &str)> {
    match body.strip_prefix('"') {
        Some(quoted) => {
            let end = quoted.find('"')?;
            let name = &quoted[..end];
            let id = quoted[end + 1..].strip_prefix(':')?;
            if name.is_empty() || id.contains('"') {
                return None;
            }
            Some((Some(name.to_string()), id))
        }
        None if body.contains('"') => None,
        None => Some((None, body)),
    }
}

/// Byte offset just past a field that starts at `start` (which must be `[`),
/// including an optional `.[..]` suffix. `None` for an unterminated bracket.
pub fn field_end(text: &str, start: usize) -> Option<usize> {
    let first = bracket_end(text, start)?;
    if text[first..].starts_with(".[") {
        if let Some(second) = bracket_end(text, first + 1) {
            return Some(second);
        }
    }
    Some(first)
}

fn bracket_end(text: &str, start: usize) -> Option<usize> {
    let rest = text.get(start..)?;
    if !rest.starts_with('[') {
        return None;
    }
    let mut in_quotes = false;
    for (i, c) in rest.char_indices().skip(1) {
        match c {
            '"' => in_quotes = !in_quotes,
            ']' if !in_quotes => return Some(start + i + 1),
            _ => {}
        }
    }
    None
}

/// Every bracketed span in a formula text, skipping string literals.
///
/// Each entry carries the parsed reference, or `None` when the brackets are
/// malformed. An unterminated bracket ends the scan.
pub fn references(text: &str) -> Vec<(Range<usize>, Option<FieldReference>)> {
    let mut out = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == b'"' {
                        if bytes.get(i + 1) == Some(&b'"') {
                            i += 2;
                            continue;
                        }
                        break;
                    }
                    i += 1;
                }
                i += 1;
            }
            b'[' => match field_end(text, i) {
                Some(end) => {
                    out.push((i..end, FieldReference::parse(&text[i..end])));
                    i = end;
                }
                None => break,
            },
            _ => i += 1,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_measure() {
        let f = FieldReference::parse("[Sales]").unwrap();
        assert_eq!(f, FieldReference::measure("Sales"));
    }

    #[test]
    fn test_parse_dimension_with_property() {
        let f = FieldReference::parse("[d/City].[p/Region]").unwrap();
        assert_eq!(f, FieldReference::dimension("City").with_property("Region"));
        assert_eq!(f.property(), Some("Region"));
        assert_eq!(f.hierarchy(), None);
    }

    #[test]
    fn test_parse_datasource_prefix() {
        let f = FieldReference::parse("[d/\"Model A\":City].[h/Geo]").unwrap();
        assert_eq!(f.datasource.as_deref(), Some("Model A"));
        assert_eq!(f.id, "City");
        assert_eq!(f.hierarchy(), Some("Geo"));

        let m = FieldReference::parse("[\"Model\":Sales]").unwrap();
        assert_eq!(m.kind, FieldKind::Measure);
        assert_eq!(m.datasource.as_deref(), Some("Model"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(FieldReference::parse("[Sales"), None);
        assert_eq!(FieldReference::parse("Sales]"), None);
        assert_eq!(FieldReference::parse("[d/]"), None);
        assert_eq!(FieldReference::parse("[d/City].[x/Foo]"), None);
        assert_eq!(FieldReference::parse("[d/City].[p/Region]x"), None);
        assert_eq!(FieldReference::parse("[d/\"Model:City]"), None);
    }

    #[test]
    fn test_classify() {
        assert_eq!(FieldKind::classify("[d/City]"), FieldKind::Dimension);
        assert_eq!(FieldKind::classify("[p/Region]"), FieldKind::Property);
        assert_eq!(FieldKind::classify("[h/Geo]"), FieldKind::Hierarchy);
        assert_eq!(FieldKind::classify("[Sales]"), FieldKind::Measure);
        assert_eq!(FieldKind::classify("Sales"), FieldKind::Unknown);
    }

    #[test]
    fn test_display_round_trips() {
        for text in [
            "[Sales]",
            "[d/City].[p/Region]",
            "[d/\"Model\":City].[h/Geo]",
            "[\"Model\":Sales]",
        ] {
            assert_eq!(FieldReference::parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn test_references_skip_strings() {
        let text = "RESTRICT([Sales], [d/City] = \"[Not a field]\") + [Cost]";
        let refs: Vec<_> = references(text)
            .into_iter()
            .filter_map(|(_, r)| r)
            .map(|r| r.to_string())
            .collect();
        assert_eq!(refs, vec!["[Sales]", "[d/City]", "[Cost]"]);
    }

    #[test]
    fn test_field_end_includes_suffix() {
        let text = "[d/City].[p/Region] = \"x\"";
        assert_eq!(field_end(text, 0), Some(19));
        assert_eq!(field_end("[open", 0), None);
    }
}
