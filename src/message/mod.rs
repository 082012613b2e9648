//! Assembly of the outbound message descriptor.
//!
//! [`MessageAssembler`] merges classified headers, configured defaults, the
//! normalized recipient lists, attachments and template data into one
//! [`OutboundMessage`]. It performs no delivery.

mod request;

pub use request::{MailRequest, RawAttachments, Recipients};

use crate::config::ConfigProvider;
use crate::error::MailError;
use crate::headers::{classify, parse_address, AddressEntry, ClassifiedHeaders, ExtraHeaders};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Category tag attached to every message.
pub const CATEGORY: &str = "Sent via sendgrid-mail";

/// Mime type used for every attachment; the content is not sniffed.
pub const ATTACHMENT_MIME_TYPE: &str = "application/text";

pub const ATTACHMENT_DISPOSITION: &str = "attachment";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub filename: String,
    /// Base64 (standard alphabet, padded) file content.
    pub content: String,
    pub mime_type: String,
    pub disposition: String,
}

/// The fully resolved message, ready for a [`DeliveryTransport`](crate::delivery::DeliveryTransport).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMessage {
    pub subject: String,
    pub from_email: String,
    pub from_name: String,
    pub to: Vec<AddressEntry>,
    pub cc: Vec<AddressEntry>,
    pub bcc: Vec<AddressEntry>,
    /// Every Reply-To entry, in header order; the transport decides how many it uses.
    pub reply_to: Vec<AddressEntry>,
    pub content_type: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
    pub template_id: Option<String>,
    pub template_data: Map<String, Value>,
    pub categories: Vec<String>,
    /// Headers without a dedicated field, forwarded as custom headers.
    pub headers: ExtraHeaders,
}

pub type ValueFilter = Arc<dyn Fn(String) -> String + Send + Sync>;

/// Override points applied to resolved values before they are fixed into
/// the message. Unset filters leave the value as it is.
#[derive(Clone, Default)]
pub struct Filters {
    from: Option<ValueFilter>,
    from_name: Option<ValueFilter>,
    content_type: Option<ValueFilter>,
    template_id: Option<ValueFilter>,
}

impl Filters {
    pub fn on_from(mut self, filter: impl Fn(String) -> String + Send + Sync + 'static) -> Self {
        self.from = Some(Arc::new(filter));
        self
    }

    pub fn on_from_name(
        mut self,
        filter: impl Fn(String) -> String + Send + Sync + 'static,
    ) -> Self {
        self.from_name = Some(Arc::new(filter));
        self
    }

    pub fn on_content_type(
        mut self,
        filter: impl Fn(String) -> String + Send + Sync + 'static,
    ) -> Self {
        self.content_type = Some(Arc::new(filter));
        self
    }

    pub fn on_template_id(
        mut self,
        filter: impl Fn(String) -> String + Send + Sync + 'static,
    ) -> Self {
        self.template_id = Some(Arc::new(filter));
        self
    }
}

fn apply(filter: &Option<ValueFilter>, value: String) -> String {
    match filter {
        Some(filter) => filter(value),
        None => value,
    }
}

/// Source of attachment bytes.
pub trait AttachmentReader: Send + Sync {
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}

/// Reads attachments from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsAttachmentReader;

impl AttachmentReader for FsAttachmentReader {
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

pub struct MessageAssembler<'a> {
    config: &'a dyn ConfigProvider,
    filters: &'a Filters,
    reader: &'a dyn AttachmentReader,
}

impl<'a> MessageAssembler<'a> {
    pub fn new(
        config: &'a dyn ConfigProvider,
        filters: &'a Filters,
        reader: &'a dyn AttachmentReader,
    ) -> Self {
        Self {
            config,
            filters,
            reader,
        }
    }

    /// Builds the outbound message for one request.
    ///
    /// Fails only when an attachment cannot be read; nothing is partially built.
    pub fn assemble(&self, request: &MailRequest) -> Result<OutboundMessage, MailError> {
        let headers = classify(request.headers.lines(), ClassifiedHeaders::default());

        let from_email = apply(
            &self.filters.from,
            non_empty(headers.from_email).unwrap_or_else(|| self.config.from_email().to_string()),
        );
        let from_name = apply(
            &self.filters.from_name,
            non_empty(headers.from_name).unwrap_or_else(|| self.config.from_name().to_string()),
        );

        let to = address_entries(&request.to.entries());
        let cc = address_entries(&headers.cc);
        let bcc = address_entries(&headers.bcc);
        let reply_to = address_entries(&headers.reply_to);

        let attachments = self.read_attachments(request)?;

        let content_type = apply(
            &self.filters.content_type,
            non_empty(headers.content_type)
                .unwrap_or_else(|| self.config.content_type().to_string()),
        );

        // An explicit id is used as given; only the configured default is filtered.
        let template_id = match request.template_id.clone().filter(|id| !id.trim().is_empty()) {
            Some(id) => Some(id),
            None => non_empty(Some(apply(
                &self.filters.template_id,
                self.config.template_id().to_string(),
            ))),
        };

        let mut template_data = Map::new();
        template_data.insert("subject".to_string(), Value::String(request.subject.clone()));
        template_data.insert("body".to_string(), Value::String(request.message.clone()));
        for (key, value) in &request.template_data {
            template_data.insert(key.clone(), value.clone());
        }

        debug!(
            "Assembled message from {} with {} to, {} cc, {} bcc, {} attachment(s), {} custom header(s)",
            from_email,
            to.len(),
            cc.len(),
            bcc.len(),
            attachments.len(),
            headers.extra.len()
        );

        Ok(OutboundMessage {
            subject: request.subject.clone(),
            from_email,
            from_name,
            to,
            cc,
            bcc,
            reply_to,
            content_type,
            body: request.message.clone(),
            attachments,
            template_id,
            template_data,
            categories: vec![CATEGORY.to_string()],
            headers: headers.extra,
        })
    }

    fn read_attachments(&self, request: &MailRequest) -> Result<Vec<Attachment>, MailError> {
        request
            .attachments
            .paths()
            .into_iter()
            .map(|path| {
                let bytes = self
                    .reader
                    .read(&path)
                    .map_err(|source| MailError::AttachmentRead {
                        path: path.clone(),
                        source,
                    })?;
                let filename = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                Ok(Attachment {
                    filename,
                    content: BASE64.encode(bytes),
                    mime_type: ATTACHMENT_MIME_TYPE.to_string(),
                    disposition: ATTACHMENT_DISPOSITION.to_string(),
                })
            })
            .collect()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parses raw recipient strings in order, skipping entries without an address.
fn address_entries(raw: &[String]) -> Vec<AddressEntry> {
    raw.iter()
        .map(|entry| parse_address(entry))
        .filter(|entry| {
            if entry.email.is_empty() {
                debug!("Skipping recipient without an address: {:?}", entry.name);
                false
            } else {
                true
            }
        })
        .collect()
}

#[cfg(test)]
mod tests;
