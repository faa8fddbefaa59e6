//! Activation mailer that records dispatches in the structured log.
//!
//! Stands in for an SMTP transport. The token itself is never logged; only
//! the recipient and a digest prefix that support can correlate with the
//! `tokens` table.

use async_trait::async_trait;
use tracing::info;

use crate::domain::ports::{ActivationMailer, ActivationMailerError};
use crate::domain::{TokenPlaintext, User};

/// Sender identity stamped on every notice.
pub const DEFAULT_SENDER: &str = "Pastebin <no-reply@pastebin.local>";

/// Log-only activation mailer.
#[derive(Debug, Clone)]
pub struct LogActivationMailer {
    sender: String,
}

impl Default for LogActivationMailer {
    fn default() -> Self {
        Self::new(DEFAULT_SENDER)
    }
}

impl LogActivationMailer {
    /// Mailer sending as `sender`.
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

fn digest_prefix(token: &TokenPlaintext) -> String {
    token
        .hash()
        .as_bytes()
        .iter()
        .take(4)
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[async_trait]
impl ActivationMailer for LogActivationMailer {
    async fn send_activation(
        &self,
        user: &User,
        token: &TokenPlaintext,
    ) -> Result<(), ActivationMailerError> {
        info!(
            sender = %self.sender,
            recipient = user.email.as_ref(),
            user_id = %user.id,
            token_digest = %digest_prefix(token),
            "activation notice dispatched"
        );
        Ok(())
    }
}
