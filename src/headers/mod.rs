//! Classification of legacy, free-form header input.
//!
//! Callers hand over either one text blob (`"From: a <a@x.com>\r\nCc: b@x.com"`)
//! or a list of header lines. Each line is classified and folded into a
//! [`ClassifiedHeaders`] accumulator: `From` and `Content-Type` feed singleton
//! fields, `Cc`/`Bcc`/`Reply-To` accumulate, and everything else is kept
//! verbatim in [`ExtraHeaders`].

pub mod address;
pub mod content_type;

pub use address::{parse_address, AddressEntry};
pub use content_type::{split_content_type, ContentTypeParts};

use content_type::{find_ignore_ascii_case, value_after};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Header input as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawHeaderInput {
    /// Newline separated header lines; `\r\n` is accepted.
    Text(String),
    Lines(Vec<String>),
}

impl Default for RawHeaderInput {
    fn default() -> Self {
        RawHeaderInput::Text(String::new())
    }
}

impl RawHeaderInput {
    pub fn is_empty(&self) -> bool {
        match self {
            RawHeaderInput::Text(text) => text.is_empty(),
            RawHeaderInput::Lines(lines) => lines.is_empty(),
        }
    }

    /// Normalizes both shapes into one line sequence.
    pub fn lines(&self) -> Vec<String> {
        if self.is_empty() {
            return Vec::new();
        }
        match self {
            RawHeaderInput::Text(text) => text
                .replace("\r\n", "\n")
                .split('\n')
                .map(str::to_string)
                .collect(),
            RawHeaderInput::Lines(lines) => lines.clone(),
        }
    }
}

impl From<&str> for RawHeaderInput {
    fn from(text: &str) -> Self {
        RawHeaderInput::Text(text.to_string())
    }
}

impl From<String> for RawHeaderInput {
    fn from(text: String) -> Self {
        RawHeaderInput::Text(text)
    }
}

impl From<Vec<String>> for RawHeaderInput {
    fn from(lines: Vec<String>) -> Self {
        RawHeaderInput::Lines(lines)
    }
}

impl From<Vec<&str>> for RawHeaderInput {
    fn from(lines: Vec<&str>) -> Self {
        RawHeaderInput::Lines(lines.into_iter().map(str::to_string).collect())
    }
}

/// Headers without a dedicated field, in first-seen order.
///
/// Lookup is case-insensitive. Setting a name that is already present
/// replaces both the stored spelling and the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraHeaders(Vec<(String, String)>);

impl ExtraHeaders {
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            Some(entry) => *entry = (name, value),
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Accumulated result of classifying every header line of one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedHeaders {
    pub from_name: Option<String>,
    pub from_email: Option<String>,
    pub content_type: Option<String>,
    pub charset: Option<String>,
    pub boundary: Option<String>,
    /// Raw, untrimmed pieces; turned into [`AddressEntry`] values later.
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub reply_to: Vec<String>,
    pub extra: ExtraHeaders,
}

type HeaderHandler = fn(&mut ClassifiedHeaders, &str);

/// Dispatch table keyed by lowercased header name.
///
/// * `from`, `content-type`: singletons, only overwritten by non-empty values.
/// * `cc`, `bcc`, `reply-to`: comma-split and appended, never reset.
/// * anything else falls through to [`ExtraHeaders`] (last write wins).
const HANDLERS: &[(&str, HeaderHandler)] = &[
    ("from", apply_from),
    ("content-type", apply_content_type),
    ("cc", append_cc),
    ("bcc", append_bcc),
    ("reply-to", append_reply_to),
];

impl ClassifiedHeaders {
    /// Folds one raw header line into the accumulator.
    ///
    /// Lines without a `:` are noise unless they carry a `boundary=` fragment
    /// (a folded `Content-Type` continuation).
    pub fn classify_line(&mut self, line: &str) {
        let Some((name, content)) = line.trim().split_once(':') else {
            if find_ignore_ascii_case(line, "boundary=").is_some() {
                self.boundary = value_after(line.trim(), "boundary=");
            } else {
                trace!("Discarding header line without a name: {:?}", line);
            }
            return;
        };

        let name = name.trim();
        let content = content.trim();
        let key = name.to_ascii_lowercase();

        match HANDLERS.iter().find(|(handled, _)| *handled == key) {
            Some((_, handler)) => handler(self, content),
            None => self.extra.insert(name, content),
        }
    }
}

/// Classifies every line, accumulating into `acc`.
pub fn classify<I, S>(lines: I, mut acc: ClassifiedHeaders) -> ClassifiedHeaders
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for line in lines {
        acc.classify_line(line.as_ref());
    }
    acc
}

fn apply_from(acc: &mut ClassifiedHeaders, content: &str) {
    match content.find('<') {
        Some(bracket) => {
            if bracket > 0 {
                // The character right before `<` is the separating space.
                let mut name = content[..bracket].to_string();
                name.pop();
                let name = name.replace('"', "").trim().to_string();
                if !name.is_empty() {
                    acc.from_name = Some(name);
                }
            }
            let email = content[bracket + 1..].replace('>', "").trim().to_string();
            if !email.is_empty() {
                acc.from_email = Some(email);
            }
        }
        None if !content.trim().is_empty() => {
            acc.from_email = Some(content.trim().to_string());
        }
        None => {}
    }
}

fn apply_content_type(acc: &mut ClassifiedHeaders, content: &str) {
    let parts = split_content_type(content);
    if !parts.media_type.is_empty() {
        acc.content_type = Some(parts.media_type);
    }
    if let Some(charset) = parts.charset {
        acc.charset = Some(charset);
    }
    if let Some(boundary) = parts.boundary {
        acc.boundary = Some(boundary);
    }
}

fn split_list(content: &str) -> impl Iterator<Item = String> + '_ {
    content.split(',').map(str::to_string)
}

fn append_cc(acc: &mut ClassifiedHeaders, content: &str) {
    acc.cc.extend(split_list(content));
}

fn append_bcc(acc: &mut ClassifiedHeaders, content: &str) {
    acc.bcc.extend(split_list(content));
}

fn append_reply_to(acc: &mut ClassifiedHeaders, content: &str) {
    acc.reply_to.extend(split_list(content));
}
