//! The delivery seam: anything that can take an [`OutboundMessage`] and hand
//! it to a mail API.

pub mod sendgrid;

pub use sendgrid::SendGridTransport;

use crate::message::OutboundMessage;
use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

/// The only status the mail API uses to confirm a message was queued.
pub const ACCEPTED_STATUS: u16 = 202;

/// What the transport got back, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransportResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// A confirmed (`202 Accepted`) delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The transport itself failed (connection, timeout, encoding...).
    #[error("transport failure: {message}")]
    Transport { code: Option<i64>, message: String },

    /// The API answered with anything other than `202`.
    #[error("delivery not accepted (status {status})")]
    NotAccepted { status: u16, body: String },
}

#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<TransportResponse, DeliveryError>;
}

/// Sends `message` and collapses non-`202` answers into [`DeliveryError::NotAccepted`].
pub async fn deliver(
    transport: &dyn DeliveryTransport,
    message: &OutboundMessage,
) -> Result<DeliveryReceipt, DeliveryError> {
    accept(transport.send(message).await?)
}

pub fn accept(response: TransportResponse) -> Result<DeliveryReceipt, DeliveryError> {
    if response.status_code == ACCEPTED_STATUS {
        Ok(DeliveryReceipt {
            headers: response.headers,
            body: response.body,
        })
    } else {
        Err(DeliveryError::NotAccepted {
            status: response.status_code,
            body: response.body,
        })
    }
}
