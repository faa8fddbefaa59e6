//! Shared Diesel and pool error mapping for every repository adapter.
//!
//! Each port error carries `Connection` and `Query` variants; the
//! [`StoreErrorCtor`] impls below let one mapping serve all of them.
//! Unique-constraint violations are inspected by the adapters themselves
//! before falling back to [`map_diesel_error`].

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::ports::{
    PasteRepositoryError, PermissionStoreError, TokenRepositoryError, UserRepositoryError,
};

use super::pool::PoolError;

/// Port errors that can express connection and query failures.
pub(crate) trait StoreErrorCtor: Sized {
    fn connection_failed(message: String) -> Self;
    fn query_failed(message: String) -> Self;
}

macro_rules! impl_store_error_ctor {
    ($($error:ty),* $(,)?) => {
        $(
            impl StoreErrorCtor for $error {
                fn connection_failed(message: String) -> Self {
                    Self::connection(message)
                }

                fn query_failed(message: String) -> Self {
                    Self::query(message)
                }
            }
        )*
    };
}

impl_store_error_ctor!(
    UserRepositoryError,
    TokenRepositoryError,
    PasteRepositoryError,
    PermissionStoreError,
);

/// Pool checkout and build failures surface as connection errors.
pub(crate) fn map_pool_error<E: StoreErrorCtor>(error: PoolError) -> E {
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    E::connection_failed(message)
}

/// Classify a Diesel failure without leaking SQL details to callers.
pub(crate) fn map_diesel_error<E: StoreErrorCtor>(error: DieselError) -> E {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => E::query_failed("record not found".to_owned()),
        DieselError::QueryBuilderError(_) => E::query_failed("database query error".to_owned()),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _)
        | DieselError::BrokenTransactionManager => {
            E::connection_failed("database connection error".to_owned())
        }
        _ => E::query_failed("database error".to_owned()),
    }
}

/// Constraint name of a unique violation, if `error` is one.
pub(crate) fn unique_violation(error: &DieselError) -> Option<&str> {
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            Some(info.constraint_name().unwrap_or_default())
        }
        _ => None,
    }
}
