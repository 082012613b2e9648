//! Caller-facing input shapes, kept loose to accept legacy call styles.

use crate::headers::RawHeaderInput;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Recipients as given by the caller: one comma separated string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    Text(String),
    List(Vec<String>),
}

impl Recipients {
    /// Raw recipient strings. A text value is split on `,`; list items are
    /// taken as they are.
    pub fn entries(&self) -> Vec<String> {
        match self {
            Recipients::Text(text) => text.split(',').map(str::to_string).collect(),
            Recipients::List(list) => list.clone(),
        }
    }
}

impl From<&str> for Recipients {
    fn from(text: &str) -> Self {
        Recipients::Text(text.to_string())
    }
}

impl From<String> for Recipients {
    fn from(text: String) -> Self {
        Recipients::Text(text)
    }
}

impl From<Vec<String>> for Recipients {
    fn from(list: Vec<String>) -> Self {
        Recipients::List(list)
    }
}

impl From<Vec<&str>> for Recipients {
    fn from(list: Vec<&str>) -> Self {
        Recipients::List(list.into_iter().map(str::to_string).collect())
    }
}

/// Attachment paths: newline separated text or an explicit list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAttachments {
    Text(String),
    Paths(Vec<PathBuf>),
}

impl Default for RawAttachments {
    fn default() -> Self {
        RawAttachments::Paths(Vec::new())
    }
}

impl RawAttachments {
    /// Normalized path list. Blank lines and empty paths are dropped.
    pub fn paths(&self) -> Vec<PathBuf> {
        match self {
            RawAttachments::Text(text) => text
                .replace("\r\n", "\n")
                .split('\n')
                .filter(|line| !line.trim().is_empty())
                .map(PathBuf::from)
                .collect(),
            RawAttachments::Paths(paths) => paths
                .iter()
                .filter(|path| !path.as_os_str().is_empty())
                .cloned()
                .collect(),
        }
    }
}

impl From<&str> for RawAttachments {
    fn from(text: &str) -> Self {
        RawAttachments::Text(text.to_string())
    }
}

impl From<Vec<PathBuf>> for RawAttachments {
    fn from(paths: Vec<PathBuf>) -> Self {
        RawAttachments::Paths(paths)
    }
}

/// One send request in the shape of the legacy `mail()` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailRequest {
    pub to: Recipients,
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub headers: RawHeaderInput,
    #[serde(default)]
    pub attachments: RawAttachments,
    #[serde(default)]
    pub template_data: Map<String, Value>,
    #[serde(default)]
    pub template_id: Option<String>,
}

impl MailRequest {
    pub fn new(
        to: impl Into<Recipients>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            message: message.into(),
            headers: RawHeaderInput::default(),
            attachments: RawAttachments::default(),
            template_data: Map::new(),
            template_id: None,
        }
    }

    pub fn with_headers(mut self, headers: impl Into<RawHeaderInput>) -> Self {
        self.headers = headers.into();
        self
    }

    pub fn with_attachments(mut self, attachments: impl Into<RawAttachments>) -> Self {
        self.attachments = attachments.into();
        self
    }

    pub fn with_template_data(mut self, template_data: Map<String, Value>) -> Self {
        self.template_data = template_data;
        self
    }

    pub fn with_template_id(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = Some(template_id.into());
        self
    }
}
