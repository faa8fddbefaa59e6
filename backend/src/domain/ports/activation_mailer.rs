//! Port for delivering activation tokens to newly registered users.

use async_trait::async_trait;

use crate::domain::{TokenPlaintext, User};

use super::define_port_error;

define_port_error! {
    /// Delivery failures.
    pub enum ActivationMailerError {
        /// The message could not be handed to the transport.
        Delivery { message: String } => "activation mail delivery failed: {message}",
    }
}

/// Outbound channel for activation tokens. Runs in the background after the
/// registration response has been sent.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivationMailer: Send + Sync {
    /// Deliver `token` to `user`.
    async fn send_activation(
        &self,
        user: &User,
        token: &TokenPlaintext,
    ) -> Result<(), ActivationMailerError>;
}

/// Mailer that drops every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureActivationMailer;

#[async_trait]
impl ActivationMailer for FixtureActivationMailer {
    async fn send_activation(
        &self,
        _user: &User,
        _token: &TokenPlaintext,
    ) -> Result<(), ActivationMailerError> {
        Ok(())
    }
}
