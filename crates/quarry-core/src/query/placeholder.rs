//! Bind placeholder extraction and rewriting.

use std::collections::BTreeSet;
use std::ops::Range;

use super::mask::MaskedSql;

/// A bind marker found in SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    /// `:name`, stored without the colon.
    Named(String),
    /// `?`.
    Positional,
}

/// A placeholder and its byte range in the masked text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// The placeholder.
    pub placeholder: Placeholder,
    /// Byte range of the marker.
    pub span: Range<usize>,
}

/// Scans already-masked text for placeholders, left to right.
///
/// A named marker is `:` followed by a letter and then letters, digits or
/// underscores. A `:` preceded by another `:` (a cast such as `x::text`)
/// never starts a marker.
#[must_use]
pub fn scan(masked: &str) -> Vec<Occurrence> {
    let bytes = masked.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'?' => {
                found.push(Occurrence {
                    placeholder: Placeholder::Positional,
                    span: i..i + 1,
                });
                i += 1;
            }
            b':' if (i == 0 || bytes[i - 1] != b':')
                && bytes.get(i + 1).is_some_and(u8::is_ascii_alphabetic) =>
            {
                let start = i;
                i += 1;
                while bytes
                    .get(i)
                    .is_some_and(|c| c.is_ascii_alphanumeric() || *c == b'_')
                {
                    i += 1;
                }
                found.push(Occurrence {
                    placeholder: Placeholder::Named(masked[start + 1..i].to_string()),
                    span: start..i,
                });
            }
            _ => i += 1,
        }
    }

    found
}

/// Returns the distinct named placeholders of `sql`, ignoring markers inside
/// strings, comments and dollar-quoted blocks.
#[must_use]
pub fn named_placeholders(sql: &str) -> BTreeSet<String> {
    let masked = MaskedSql::new(sql);
    scan(masked.text())
        .into_iter()
        .filter_map(|occurrence| match occurrence.placeholder {
            Placeholder::Named(name) => Some(name),
            Placeholder::Positional => None,
        })
        .collect()
}

/// Rewrites placeholders outside protected spans.
///
/// `replace` receives every occurrence in order together with its index
/// among all occurrences and returns the replacement text, or `None` to
/// keep the marker.
pub fn rewrite<F>(sql: &str, mut replace: F) -> String
where
    F: FnMut(usize, &Placeholder) -> Option<String>,
{
    let masked = MaskedSql::new(sql);
    let text = masked.text();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;

    for (index, occurrence) in scan(text).iter().enumerate() {
        if let Some(replacement) = replace(index, &occurrence.placeholder) {
            out.push_str(&text[copied..occurrence.span.start]);
            out.push_str(&replacement);
            copied = occurrence.span.end;
        }
    }
    out.push_str(&text[copied..]);

    masked.restore(&out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(sql: &str) -> Vec<String> {
        named_placeholders(sql).into_iter().collect()
    }

    #[test]
    fn test_named_placeholders() {
        assert_eq!(
            names("SELECT * FROM t WHERE a = :a AND b = :b_2 OR c = :a"),
            vec!["a".to_string(), "b_2".to_string()]
        );
    }

    #[test]
    fn test_placeholder_at_start() {
        assert_eq!(names(":first"), vec!["first".to_string()]);
    }

    #[test]
    fn test_cast_is_not_a_placeholder() {
        assert_eq!(names("SELECT :v::text, x::int"), vec!["v".to_string()]);
    }

    #[test]
    fn test_must_start_with_letter() {
        assert!(names("SELECT :1, :_x").is_empty());
    }

    #[test]
    fn test_protected_spans_are_ignored() {
        assert!(names("SELECT ':year' -- :month\n/* :day */").is_empty());
        assert!(names("SELECT $$ :body $$").is_empty());
    }

    #[test]
    fn test_scan_positional() {
        let found = scan("a = ? AND b = ?");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].span, 4..5);
        assert_eq!(found[1].placeholder, Placeholder::Positional);
    }

    #[test]
    fn test_rewrite_keeps_protected_spans() {
        let sql = "SELECT '?', :name -- :name\nWHERE x = ?";
        let out = rewrite(sql, |index, placeholder| match placeholder {
            Placeholder::Named(name) => Some(format!("<{name}>")),
            Placeholder::Positional => Some(format!("${}", index + 1)),
        });
        assert_eq!(out, "SELECT '?', <name> -- :name\nWHERE x = $2");
    }

    #[test]
    fn test_rewrite_none_keeps_marker() {
        assert_eq!(rewrite("a = ?", |_, _| None), "a = ?");
    }
}
