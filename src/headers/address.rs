//! Splits a single recipient string into a display name and an address.

use serde::Serialize;

/// A resolved `(display name, address)` pair.
///
/// `name` may be empty. After [`parse_address`] the `email` never carries the
/// surrounding angle brackets or whitespace, but it is not validated as an
/// RFC 5322 address; rejecting malformed values is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressEntry {
    pub name: String,
    pub email: String,
}

impl AddressEntry {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Parses `Foo Bar <foo@bar.com>` or a bare `foo@bar.com`.
///
/// The bracketed form is recognised when the input contains a `<`, at least
/// one character, then a `>`. The last `>` closes the address and the
/// right-most `<` that still leaves a non-empty address opens it, so
/// `"a <b> <c>"` yields name `a <b>` and email `c`. Anything that does not
/// match is returned trimmed as the email with an empty name.
pub fn parse_address(raw: &str) -> AddressEntry {
    match bracketed_span(raw) {
        Some((open, close)) => AddressEntry {
            name: strip_quotes(&raw[..open]),
            email: raw[open + 1..close].trim().to_string(),
        },
        None => AddressEntry {
            name: String::new(),
            email: raw.trim().to_string(),
        },
    }
}

fn bracketed_span(raw: &str) -> Option<(usize, usize)> {
    let close = raw.rfind('>')?;
    raw[..close]
        .rmatch_indices('<')
        .map(|(open, _)| open)
        .find(|&open| open + 1 < close)
        .map(|open| (open, close))
}

fn strip_quotes(name: &str) -> String {
    name.trim().trim_matches(|c| c == '"' || c == '\'').trim().to_string()
}
