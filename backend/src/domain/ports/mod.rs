//! Ports at the hexagonal boundary. Adapters live under `crate::outbound`.

mod macros;
pub(crate) use macros::define_port_error;

mod activation_mailer;
mod paste_repository;
mod permission_store;
mod token_repository;
mod user_repository;
mod versioned_store;

#[cfg(test)]
pub use activation_mailer::MockActivationMailer;
pub use activation_mailer::{ActivationMailer, ActivationMailerError, FixtureActivationMailer};
#[cfg(test)]
pub use paste_repository::MockPasteRepository;
pub use paste_repository::{PasteRepository, PasteRepositoryError};
#[cfg(test)]
pub use permission_store::MockPermissionStore;
pub use permission_store::{PermissionStore, PermissionStoreError};
#[cfg(test)]
pub use token_repository::MockTokenRepository;
pub use token_repository::{TokenRepository, TokenRepositoryError};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{UserRepository, UserRepositoryError};
pub use versioned_store::VersionedStore;
