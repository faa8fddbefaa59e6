//! In-memory account storage.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use parking_lot::Mutex;

use crate::domain::ports::{UserRepository, UserRepositoryError};
use crate::domain::{Email, NewUser, User, UserId, Version};

#[derive(Default)]
struct Rows {
    next_id: i64,
    users: BTreeMap<i64, User>,
}

/// Account table held in process memory.
pub struct InMemoryUserRepository {
    clock: Arc<dyn Clock>,
    rows: Mutex<Rows>,
}

impl InMemoryUserRepository {
    /// Empty table stamping `created_at` from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            rows: Mutex::new(Rows::default()),
        }
    }

    /// Number of stored accounts.
    pub fn len(&self) -> usize {
        self.rows.lock().users.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(super) fn get(&self, id: UserId) -> Option<User> {
        self.rows.lock().users.get(&id.get()).cloned()
    }
}

fn same_email(a: &Email, b: &Email) -> bool {
    a.as_ref().eq_ignore_ascii_case(b.as_ref())
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: &NewUser) -> Result<User, UserRepositoryError> {
        let mut rows = self.rows.lock();
        if rows.users.values().any(|u| same_email(&u.email, &user.email)) {
            return Err(UserRepositoryError::duplicate_email());
        }
        if rows.users.values().any(|u| u.login == user.login) {
            return Err(UserRepositoryError::duplicate_login());
        }
        rows.next_id += 1;
        let stored = User {
            id: UserId::new(rows.next_id),
            login: user.login.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            activated: false,
            version: Version::INITIAL,
            created_at: self.clock.utc(),
        };
        rows.users.insert(stored.id.get(), stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserRepositoryError> {
        Ok(self.get(id))
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, UserRepositoryError> {
        Ok(self
            .rows
            .lock()
            .users
            .values()
            .find(|u| same_email(&u.email, email))
            .cloned())
    }

    async fn update_if_version(
        &self,
        user: &User,
        expected: Version,
    ) -> Result<Option<User>, UserRepositoryError> {
        let mut rows = self.rows.lock();
        let Some(stored) = rows.users.get_mut(&user.id.get()) else {
            return Ok(None);
        };
        if stored.version != expected {
            return Ok(None);
        }
        let mut updated = user.clone();
        updated.version = expected
            .next()
            .ok_or_else(|| UserRepositoryError::query("version counter exhausted"))?;
        *stored = updated.clone();
        Ok(Some(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Login, PasswordHash};
    use mockable::DefaultClock;
    use rstest::{fixture, rstest};

    fn new_user(login: &str, email: &str) -> NewUser {
        NewUser {
            login: Login::new(login).expect("login"),
            email: Email::new(email).expect("email"),
            password_hash: PasswordHash::from_stored("$2b$04$stored"),
        }
    }

    #[fixture]
    fn repo() -> InMemoryUserRepository {
        InMemoryUserRepository::new(Arc::new(DefaultClock))
    }

    #[rstest]
    #[tokio::test]
    async fn insert_assigns_ids_and_initial_version(repo: InMemoryUserRepository) {
        let first = repo.insert(&new_user("ada", "ada@example.com")).await.expect("first");
        let second = repo.insert(&new_user("bob", "bob@example.com")).await.expect("second");
        assert_eq!(first.id, UserId::new(1));
        assert_eq!(second.id, UserId::new(2));
        assert_eq!(first.version, Version::INITIAL);
        assert!(!first.activated);
    }

    #[rstest]
    #[case("ada", "ADA@example.com", UserRepositoryError::duplicate_email())]
    #[case("ada", "other@example.com", UserRepositoryError::duplicate_login())]
    #[tokio::test]
    async fn duplicates_are_rejected(
        repo: InMemoryUserRepository,
        #[case] login: &str,
        #[case] email: &str,
        #[case] expected: UserRepositoryError,
    ) {
        repo.insert(&new_user("ada", "ada@example.com")).await.expect("seed");
        let err = repo.insert(&new_user(login, email)).await.expect_err("duplicate");
        assert_eq!(err, expected);
    }

    #[rstest]
    #[tokio::test]
    async fn stale_version_leaves_row_untouched(repo: InMemoryUserRepository) {
        let user = repo.insert(&new_user("ada", "ada@example.com")).await.expect("seed");
        let mut activated = user.clone();
        activated.activated = true;

        let committed = repo
            .update_if_version(&activated, Version::INITIAL)
            .await
            .expect("update")
            .expect("row matched");
        assert_eq!(committed.version, Version::new(2));

        let stale = repo
            .update_if_version(&user, Version::INITIAL)
            .await
            .expect("update");
        assert!(stale.is_none());
        assert!(repo.get(user.id).expect("stored").activated);
    }

    #[rstest]
    #[tokio::test]
    async fn exhausted_version_is_an_error_and_keeps_the_row(repo: InMemoryUserRepository) {
        let user = repo.insert(&new_user("ada", "ada@example.com")).await.expect("seed");
        let last = Version::new(i32::MAX);
        if let Some(row) = repo.rows.lock().users.get_mut(&user.id.get()) {
            row.version = last;
        }
        let mut activated = user.clone();
        activated.activated = true;

        let err = repo
            .update_if_version(&activated, last)
            .await
            .expect_err("exhausted");
        assert_eq!(err, UserRepositoryError::query("version counter exhausted"));
        let stored = repo.get(user.id).expect("stored");
        assert!(!stored.activated);
        assert_eq!(stored.version, last);
    }
}
