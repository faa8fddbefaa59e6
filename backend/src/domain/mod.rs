//! Domain primitives, ports and services.
//!
//! Types here are transport agnostic. Inbound adapters translate HTTP into
//! calls on the services; outbound adapters implement the ports.
//!
//! Public surface:
//! - [`Error`] and [`ErrorCode`]: API error payload and stable identifiers.
//! - [`User`], [`Identity`]: accounts and the resolved request identity.
//! - [`Paste`] and its draft, patch and filter types.
//! - [`VersionedMutator`]: optimistic read-modify-write over [`ports::VersionedStore`].
//! - [`AccountService`], [`PasteService`], [`TokenIssuer`]: use cases.

pub mod account_service;
pub mod background;
pub mod credentials;
pub mod error;
pub mod paste;
pub mod paste_service;
pub mod ports;
pub mod round_trip;
pub mod token;
pub mod token_issuer;
pub mod trace_id;
pub mod user;
pub mod validation;
pub mod versioned;

pub use self::account_service::{
    AccountService, INVALID_ACTIVATION_TOKEN, INVALID_CREDENTIALS, Registration,
};
pub use self::background::BackgroundTasks;
pub use self::credentials::{CredentialError, CredentialVault, PasswordHash, PlaintextPassword};
pub use self::error::{Error, ErrorCode, TRACE_ID_HEADER};
pub use self::paste::{Category, NewPaste, Paste, PasteDraft, PasteFilter, PasteId, PastePatch};
pub use self::paste_service::PasteService;
pub use self::round_trip::{EDIT_CONFLICT, NOT_FOUND, within};
pub use self::token::{
    ACTIVATION_TTL, AUTHENTICATION_TTL, IssuedToken, TokenHash, TokenPlaintext, TokenRecord,
    TokenScope,
};
pub use self::token_issuer::{TOKEN_NOT_FOUND, TokenIssuer};
pub use self::trace_id::TraceId;
pub use self::user::{Email, Identity, Login, NewUser, User, UserId, UserPatch, UserView};
pub use self::validation::FieldErrors;
pub use self::versioned::{
    MutationError, Patch, STORE_DEADLINE, Version, Versioned, VersionedMutator,
};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use pastebin::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
