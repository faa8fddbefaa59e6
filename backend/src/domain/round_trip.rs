//! Deadline-bounded store calls and the mapping from port errors to the
//! API error taxonomy.

use std::future::Future;
use std::time::Duration;

use tracing::error;

use super::Error;
use super::ports::{
    PasteRepositoryError, PermissionStoreError, TokenRepositoryError, UserRepositoryError,
};
use super::versioned::MutationError;

/// Message returned when an optimistic update loses.
pub const EDIT_CONFLICT: &str = "unable to update the record due to an edit conflict, please try again";
/// Message returned for missing resources.
pub const NOT_FOUND: &str = "the requested resource could not be found";

/// Await `fut`, failing with an internal error once `deadline` elapses.
pub async fn within<T, E, F>(deadline: Duration, operation: &'static str, fut: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, E>>,
    Error: From<E>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result.map_err(Error::from),
        Err(_) => {
            error!(operation, ?deadline, "store round trip timed out");
            Err(Error::internal(format!("{operation} timed out")))
        }
    }
}

macro_rules! map_store_error {
    ($error:ident) => {
        impl From<$error> for Error {
            fn from(err: $error) -> Self {
                match err {
                    $error::Connection { message } => Error::service_unavailable(message),
                    other => Error::internal(other.to_string()),
                }
            }
        }
    };
}

map_store_error!(UserRepositoryError);
map_store_error!(TokenRepositoryError);
map_store_error!(PermissionStoreError);
map_store_error!(PasteRepositoryError);

impl<S> From<MutationError<S>> for Error
where
    Error: From<S>,
{
    fn from(err: MutationError<S>) -> Self {
        match err {
            MutationError::NotFound => Error::not_found(NOT_FOUND),
            MutationError::VersionMismatch { .. } | MutationError::ConcurrentUpdate { .. } => {
                Error::conflict(EDIT_CONFLICT)
            }
            MutationError::Invalid(fields) => fields.into(),
            MutationError::Exhausted { read } => {
                error!(%read, "version counter exhausted");
                Error::internal("version counter exhausted")
            }
            MutationError::Timeout(deadline) => {
                error!(?deadline, "versioned mutation timed out");
                Error::internal("versioned mutation timed out")
            }
            MutationError::Store(source) => Error::from(source),
        }
    }
}
