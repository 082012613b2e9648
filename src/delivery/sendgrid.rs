//! SendGrid v3 `mail/send` transport.

use super::{DeliveryError, DeliveryTransport, TransportResponse};
use crate::config::{Config, ConfigProvider};
use crate::headers::AddressEntry;
use crate::message::OutboundMessage;
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::Request;
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

type HttpsConn = hyper_rustls::HttpsConnector<HttpConnector>;
type MailHttpClient = Client<HttpsConn, Full<Bytes>>;

/// Header names the API refuses as custom headers.
const RESERVED_HEADERS: &[&str] = &[
    "to",
    "from",
    "subject",
    "cc",
    "bcc",
    "reply-to",
    "content-type",
    "content-transfer-encoding",
    "dkim-signature",
    "received",
    "x-sg-id",
    "x-sg-eid",
];

// --- Wire payload ---

#[derive(Debug, Serialize, PartialEq)]
pub struct EmailObject<'a> {
    pub email: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub name: &'a str,
}

impl<'a> From<&'a AddressEntry> for EmailObject<'a> {
    fn from(entry: &'a AddressEntry) -> Self {
        EmailObject {
            email: &entry.email,
            name: &entry.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Personalization<'a> {
    pub to: Vec<EmailObject<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<EmailObject<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<EmailObject<'a>>,
    pub dynamic_template_data: &'a Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct Content<'a> {
    #[serde(rename = "type")]
    pub content_type: &'a str,
    pub value: &'a str,
}

#[derive(Debug, Serialize)]
pub struct AttachmentObject<'a> {
    pub content: &'a str,
    #[serde(rename = "type")]
    pub mime_type: &'a str,
    pub filename: &'a str,
    pub disposition: &'a str,
}

/// Request body for `POST /v3/mail/send`.
#[derive(Debug, Serialize)]
pub struct MailSendPayload<'a> {
    pub personalizations: Vec<Personalization<'a>>,
    pub from: EmailObject<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<EmailObject<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reply_to_list: Vec<EmailObject<'a>>,
    pub subject: &'a str,
    pub content: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentObject<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<&'a str>,
    pub categories: &'a [String],
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<&'a str, &'a str>,
}

impl<'a> MailSendPayload<'a> {
    pub fn from_message(message: &'a OutboundMessage) -> Self {
        // One Reply-To goes in `reply_to`; several need `reply_to_list`.
        let (reply_to, reply_to_list) = match message.reply_to.as_slice() {
            [] => (None, Vec::new()),
            [single] => (Some(EmailObject::from(single)), Vec::new()),
            many => (None, email_objects(many)),
        };

        let headers = message
            .headers
            .iter()
            .filter(|(name, _)| {
                let reserved = RESERVED_HEADERS.iter().any(|r| r.eq_ignore_ascii_case(name));
                if reserved {
                    debug!("Dropping reserved custom header {}", name);
                }
                !reserved
            })
            .collect();

        MailSendPayload {
            personalizations: vec![Personalization {
                to: email_objects(&message.to),
                cc: email_objects(&message.cc),
                bcc: email_objects(&message.bcc),
                dynamic_template_data: &message.template_data,
            }],
            from: EmailObject {
                email: &message.from_email,
                name: &message.from_name,
            },
            reply_to,
            reply_to_list,
            subject: &message.subject,
            content: vec![Content {
                content_type: &message.content_type,
                value: &message.body,
            }],
            attachments: message
                .attachments
                .iter()
                .map(|a| AttachmentObject {
                    content: &a.content,
                    mime_type: &a.mime_type,
                    filename: &a.filename,
                    disposition: &a.disposition,
                })
                .collect(),
            template_id: message.template_id.as_deref(),
            categories: &message.categories,
            headers,
        }
    }
}

fn email_objects(list: &[AddressEntry]) -> Vec<EmailObject<'_>> {
    list.iter().map(EmailObject::from).collect()
}

// --- Transport ---

/// Builds a transport failure from an error chain.
///
/// The message lists every cause (`context: outer: ...: root`). The code is
/// the OS error number of the first `io::Error` in the chain, or a fixed
/// negative code for its kind when there is none.
pub(crate) fn transport_failure(
    context: &str,
    err: &(dyn std::error::Error + 'static),
) -> DeliveryError {
    let mut message = context.to_string();
    let mut code = None;
    let mut cause = Some(err);
    while let Some(current) = cause {
        message.push_str(": ");
        message.push_str(&current.to_string());
        if code.is_none() {
            code = current.downcast_ref::<std::io::Error>().map(io_error_code);
        }
        cause = current.source();
    }
    DeliveryError::Transport { code, message }
}

fn io_error_code(err: &std::io::Error) -> i64 {
    use std::io::ErrorKind;

    if let Some(errno) = err.raw_os_error() {
        return i64::from(errno);
    }
    match err.kind() {
        ErrorKind::ConnectionRefused => -2,
        ErrorKind::ConnectionReset => -3,
        ErrorKind::ConnectionAborted => -4,
        ErrorKind::NotConnected => -5,
        ErrorKind::AddrNotAvailable => -6,
        ErrorKind::BrokenPipe => -7,
        ErrorKind::TimedOut => -8,
        ErrorKind::UnexpectedEof => -9,
        ErrorKind::InvalidData => -10,
        _ => -1,
    }
}

pub struct SendGridTransport {
    api_url: String,
    api_key: String,
    timeout: Duration,
    client: MailHttpClient,
    user_agent: String,
}

impl SendGridTransport {
    pub fn new(config: &Config) -> Self {
        let builder = match HttpsConnectorBuilder::new().with_native_roots() {
            Ok(builder) => builder,
            Err(e) => {
                warn!("Native root certificates unavailable ({}), using bundled roots", e);
                HttpsConnectorBuilder::new().with_webpki_roots()
            }
        };
        #[cfg(debug_assertions)]
        let builder = builder.https_or_http();
        #[cfg(not(debug_assertions))]
        let builder = builder.https_only();
        let https = builder.enable_http1().build();

        let client: MailHttpClient = Client::builder(TokioExecutor::new()).build(https);

        let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

        Self {
            api_url: config.api_url.clone(),
            api_key: config.api_key().to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            client,
            user_agent,
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    async fn post(&self, json_body: String) -> Result<TransportResponse, DeliveryError> {
        let request = Request::builder()
            .method(hyper::Method::POST)
            .uri(&self.api_url)
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .header("user-agent", &self.user_agent)
            .body(Full::new(Bytes::from(json_body)))
            .map_err(|e| transport_failure("invalid request", &e))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| transport_failure(&format!("request to {} failed", self.api_url), &e))?;

        let status_code = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| transport_failure("failed to read response body", &e))?
            .to_bytes();

        Ok(TransportResponse {
            status_code,
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

#[async_trait]
impl DeliveryTransport for SendGridTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<TransportResponse, DeliveryError> {
        info!(
            "Sending mail from '{}' (Name: {}) to {} recipient(s) with subject: '{}'",
            message.from_email,
            message.from_name,
            message.to.len(),
            message.subject
        );

        let json_body = serde_json::to_string(&MailSendPayload::from_message(message))
            .map_err(|e| transport_failure("failed to encode payload", &e))?;

        let response = tokio::time::timeout(self.timeout, self.post(json_body))
            .await
            .map_err(|_| {
                let timed_out = std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("no answer within {}s", self.timeout.as_secs()),
                );
                transport_failure(&format!("request to {} timed out", self.api_url), &timed_out)
            })??;

        debug!(
            "Mail API answered {} with headers {:?} and body {:?}",
            response.status_code, response.headers, response.body
        );

        Ok(response)
    }
}
