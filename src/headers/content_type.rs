//! Splits a `Content-Type` header value into its media type and the one
//! parameter the classifier cares about (`charset` or `boundary`).

/// The pieces of a `Content-Type` value.
///
/// `charset` wins over `boundary`: when a charset parameter is present the
/// boundary is left unset. When only a boundary is present, `charset` is
/// `Some("")` so that applying the parts clears any earlier charset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentTypeParts {
    pub media_type: String,
    pub charset: Option<String>,
    pub boundary: Option<String>,
}

/// Splits `text/html; charset=UTF-8` style values.
///
/// Only the first parameter after the media type is inspected; anything past a
/// second `;` is ignored.
pub fn split_content_type(content: &str) -> ContentTypeParts {
    let mut pieces = content.split(';');
    let media_type = pieces.next().unwrap_or_default().trim().to_string();

    let Some(param) = pieces.next() else {
        return ContentTypeParts {
            media_type,
            ..Default::default()
        };
    };

    if let Some(charset) = value_after(param, "charset=") {
        ContentTypeParts {
            media_type,
            charset: Some(charset),
            boundary: None,
        }
    } else if let Some(boundary) = value_after(param, "boundary=") {
        ContentTypeParts {
            media_type,
            charset: Some(String::new()),
            boundary: Some(boundary),
        }
    } else {
        ContentTypeParts {
            media_type,
            ..Default::default()
        }
    }
}

/// Returns the text after a case-insensitive `label`, with quotes removed
/// and surrounding whitespace trimmed.
pub(crate) fn value_after(text: &str, label: &str) -> Option<String> {
    let start = find_ignore_ascii_case(text, label)? + label.len();
    let value: String = text[start..]
        .chars()
        .filter(|c| *c != '"' && *c != '\'')
        .collect();
    Some(value.trim().to_string())
}

pub(crate) fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    // ASCII lowercasing keeps byte offsets stable.
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}
