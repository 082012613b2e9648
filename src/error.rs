use crate::delivery::DeliveryError;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can make a single send fail.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("failed to read attachment {}: {source}", .path.display())]
    AttachmentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl MailError {
    /// Error code reported by the transport, if it raised one.
    pub fn error_code(&self) -> Option<i64> {
        match self {
            MailError::Delivery(DeliveryError::Transport { code, .. }) => *code,
            _ => None,
        }
    }

    /// The attachment that could not be read, if that is what failed.
    pub fn attachment_path(&self) -> Option<&PathBuf> {
        match self {
            MailError::AttachmentRead { path, .. } => Some(path),
            _ => None,
        }
    }
}
