//! Public entry point: assemble, deliver, and turn every failure into a
//! `false` plus one report on the failure seam.

use crate::config::{Config, ConfigProvider};
use crate::delivery::{deliver, DeliveryReceipt, DeliveryTransport, SendGridTransport};
use crate::error::MailError;
use crate::headers::RawHeaderInput;
use crate::message::{
    AttachmentReader, Filters, FsAttachmentReader, MailRequest, MessageAssembler, OutboundMessage,
    RawAttachments, Recipients,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};

/// Context reported for a send that did not go through.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MailFailure {
    pub to: Recipients,
    pub subject: String,
    pub message: String,
    pub headers: RawHeaderInput,
    pub attachments: RawAttachments,
    /// Code raised by the transport; `None` for rejected statuses and local failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_path: Option<PathBuf>,
}

impl MailFailure {
    fn new(request: &MailRequest, err: &MailError) -> Self {
        Self {
            to: request.to.clone(),
            subject: request.subject.clone(),
            message: request.message.clone(),
            headers: request.headers.clone(),
            attachments: request.attachments.clone(),
            error_code: err.error_code(),
            error: err.to_string(),
            attachment_path: err.attachment_path().cloned(),
        }
    }
}

/// Observability seam for failed sends.
pub trait FailureReporter: Send + Sync {
    fn report(&self, failure: &MailFailure);
}

/// Reports failures as `error` level log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFailureReporter;

impl FailureReporter for LogFailureReporter {
    fn report(&self, failure: &MailFailure) {
        error!(
            to = ?failure.to,
            subject = %failure.subject,
            error_code = ?failure.error_code,
            attachment = ?failure.attachment_path,
            "Mail delivery failed: {}",
            failure.error
        );
    }
}

pub struct Mailer {
    config: Box<dyn ConfigProvider>,
    transport: Box<dyn DeliveryTransport>,
    filters: Filters,
    reader: Box<dyn AttachmentReader>,
    reporter: Box<dyn FailureReporter>,
}

impl Mailer {
    pub fn new(
        config: impl ConfigProvider + 'static,
        transport: impl DeliveryTransport + 'static,
    ) -> Self {
        Self {
            config: Box::new(config),
            transport: Box::new(transport),
            filters: Filters::default(),
            reader: Box::new(FsAttachmentReader),
            reporter: Box::new(LogFailureReporter),
        }
    }

    /// A mailer posting to the SendGrid API described by `config`.
    pub fn sendgrid(config: Config) -> Self {
        let transport = SendGridTransport::new(&config);
        Self::new(config, transport)
    }

    pub fn with_filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_attachment_reader(mut self, reader: impl AttachmentReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    pub fn with_reporter(mut self, reporter: impl FailureReporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    /// Builds the outbound message without sending it.
    pub fn assemble(&self, request: &MailRequest) -> Result<OutboundMessage, MailError> {
        MessageAssembler::new(self.config.as_ref(), &self.filters, self.reader.as_ref())
            .assemble(request)
    }

    /// Assembles and delivers, surfacing the failure cause.
    pub async fn try_mail(&self, request: &MailRequest) -> Result<DeliveryReceipt, MailError> {
        let message = self.assemble(request)?;
        let receipt = deliver(self.transport.as_ref(), &message).await?;
        info!("Mail '{}' accepted for {} recipient(s)", message.subject, message.to.len());
        Ok(receipt)
    }

    /// Sends one message. Returns `true` only when the API accepted it; any
    /// failure is reported once through the [`FailureReporter`] and yields `false`.
    pub async fn mail(&self, request: &MailRequest) -> bool {
        match self.try_mail(request).await {
            Ok(_) => true,
            Err(err) => {
                self.reporter.report(&MailFailure::new(request, &err));
                false
            }
        }
    }
}
