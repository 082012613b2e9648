pub mod config;
pub mod delivery;
pub mod error;
pub mod headers;
pub mod mailer;
pub mod message;

pub use config::{Config, ConfigProvider};
pub use delivery::{DeliveryError, DeliveryReceipt, DeliveryTransport, SendGridTransport};
pub use error::MailError;
pub use headers::{AddressEntry, ClassifiedHeaders, RawHeaderInput};
pub use mailer::{FailureReporter, LogFailureReporter, MailFailure, Mailer};
pub use message::{Filters, MailRequest, OutboundMessage, RawAttachments, Recipients};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use std::io::Read;

/// Reads one JSON encoded [`MailRequest`] from stdin and sends it.
pub async fn run() -> Result<()> {
    info!(
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read mail request from stdin")?;
    let request: MailRequest =
        serde_json::from_str(&input).context("Failed to parse mail request JSON")?;

    let mailer = Mailer::sendgrid(config);
    if mailer.mail(&request).await {
        info!("Mail '{}' sent", request.subject);
        Ok(())
    } else {
        Err(anyhow!("Mail '{}' was not delivered", request.subject))
    }
}
