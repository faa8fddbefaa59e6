//! Registration, activation and password authentication.

use std::sync::Arc;

use tracing::{error, info};

use super::background::BackgroundTasks;
use super::credentials::{CredentialVault, PasswordHash, PlaintextPassword};
use super::ports::{ActivationMailer, UserRepository, UserRepositoryError};
use super::round_trip::within;
use super::token::{ACTIVATION_TTL, AUTHENTICATION_TTL, IssuedToken, TokenScope};
use super::token_issuer::TokenIssuer;
use super::user::{Email, Login, NewUser, User, UserPatch};
use super::validation::FieldErrors;
use super::versioned::{STORE_DEADLINE, VersionedMutator};
use super::{Error, ErrorCode};

/// Message for a bad e-mail and password pair.
pub const INVALID_CREDENTIALS: &str = "invalid authentication credentials";
/// Field message for an unusable activation token.
pub const INVALID_ACTIVATION_TOKEN: &str = "invalid or expired activation token";

/// Raw registration input.
#[derive(Clone)]
pub struct Registration {
    pub login: String,
    pub email: String,
    pub password: String,
}

/// Account workflows.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    issuer: TokenIssuer,
    vault: CredentialVault,
    mailer: Arc<dyn ActivationMailer>,
    background: BackgroundTasks,
}

impl AccountService {
    /// Wire the service to its ports.
    pub fn new(
        users: Arc<dyn UserRepository>,
        issuer: TokenIssuer,
        vault: CredentialVault,
        mailer: Arc<dyn ActivationMailer>,
        background: BackgroundTasks,
    ) -> Self {
        Self {
            users,
            issuer,
            vault,
            mailer,
            background,
        }
    }

    /// Create an inactive account and mail its activation token.
    ///
    /// The activation notice is sent after this call returns; delivery
    /// failures are logged only.
    pub async fn register(&self, registration: Registration) -> Result<User, Error> {
        let Registration {
            login,
            email,
            password,
        } = registration;
        let mut errors = FieldErrors::new();
        let login = Login::new(login).map_err(|e| errors.extend(e)).ok();
        let email = Email::new(email).map_err(|e| errors.extend(e)).ok();
        let password = PlaintextPassword::new(password)
            .map_err(|e| errors.extend(e))
            .ok();
        let (Some(login), Some(email), Some(password)) = (login, email, password) else {
            return Err(errors.into());
        };

        let password_hash = self.hash_password(password).await?;
        let new_user = NewUser {
            login,
            email,
            password_hash,
        };
        let user = match within(STORE_DEADLINE, "user insert", async {
            Ok::<_, Error>(self.users.insert(&new_user).await)
        })
        .await?
        {
            Ok(user) => user,
            Err(UserRepositoryError::DuplicateEmail) => {
                return Err(FieldErrors::single(
                    "email",
                    "a user with this email address already exists",
                )
                .into());
            }
            Err(UserRepositoryError::DuplicateLogin) => {
                return Err(
                    FieldErrors::single("login", "a user with this login already exists").into(),
                );
            }
            Err(other) => return Err(other.into()),
        };
        info!(user_id = %user.id, "user registered");

        let issued = self
            .issuer
            .issue(user.id, ACTIVATION_TTL, TokenScope::Activation)
            .await?;
        let mailer = Arc::clone(&self.mailer);
        let recipient = user.clone();
        self.background.spawn("activation_mail", async move {
            if let Err(err) = mailer.send_activation(&recipient, &issued.plaintext).await {
                error!(user_id = %recipient.id, error = %err, "activation mail failed");
            }
        });
        Ok(user)
    }

    /// Activate the account owning activation token `raw` and revoke all of
    /// its activation tokens.
    pub async fn activate(&self, raw: &str) -> Result<User, Error> {
        let user = match self.issuer.resolve(TokenScope::Activation, raw).await {
            Ok(user) => user,
            Err(err) if matches!(err.code(), ErrorCode::InvalidRequest | ErrorCode::NotFound) => {
                return Err(FieldErrors::single("token", INVALID_ACTIVATION_TOKEN).into());
            }
            Err(err) => return Err(err),
        };

        let activated = VersionedMutator::new(self.users.as_ref())
            .apply::<User, _>(user.id, user.version, UserPatch::activate())
            .await?;
        self.issuer
            .revoke_all(TokenScope::Activation, activated.id)
            .await?;
        info!(user_id = %activated.id, "user activated");
        Ok(activated)
    }

    /// Exchange an e-mail and password for an authentication token.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<IssuedToken, Error> {
        let mut errors = FieldErrors::new();
        let email = Email::new(email).map_err(|e| errors.extend(e)).ok();
        let password = PlaintextPassword::new(password)
            .map_err(|e| errors.extend(e))
            .ok();
        let (Some(email), Some(password)) = (email, password) else {
            return Err(errors.into());
        };

        let user = within(
            STORE_DEADLINE,
            "user lookup",
            self.users.find_by_email(&email),
        )
        .await?
        .ok_or_else(|| Error::unauthorized(INVALID_CREDENTIALS))?;

        if !self
            .verify_password(password, user.password_hash.clone())
            .await?
        {
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        }

        self.issuer
            .issue(user.id, AUTHENTICATION_TTL, TokenScope::Authentication)
            .await
    }

    async fn hash_password(&self, password: PlaintextPassword) -> Result<PasswordHash, Error> {
        let vault = self.vault;
        tokio::task::spawn_blocking(move || vault.hash(&password))
            .await
            .map_err(|err| Error::internal(format!("password hashing task failed: {err}")))?
            .map_err(|err| Error::internal(err.to_string()))
    }

    async fn verify_password(
        &self,
        password: PlaintextPassword,
        hash: PasswordHash,
    ) -> Result<bool, Error> {
        let vault = self.vault;
        tokio::task::spawn_blocking(move || vault.verify(&password, &hash))
            .await
            .map_err(|err| Error::internal(format!("password verification task failed: {err}")))?
            .map_err(|err| Error::internal(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockActivationMailer, MockTokenRepository, MockUserRepository};
    use crate::domain::token::TokenPlaintext;
    use crate::domain::user::UserId;
    use crate::domain::versioned::Version;
    use chrono::Utc;
    use mockable::DefaultClock;
    use rstest::rstest;
    use std::time::Duration;
    use tokio::runtime::Handle;

    const PASSWORD: &str = "pa55word!";

    fn vault() -> CredentialVault {
        CredentialVault::with_cost(4)
    }

    fn stored_user(activated: bool) -> User {
        let password = PlaintextPassword::new(PASSWORD).expect("password");
        User {
            id: UserId::new(11),
            login: Login::new("grace").expect("login"),
            email: Email::new("grace@example.com").expect("email"),
            password_hash: vault().hash(&password).expect("hash"),
            activated,
            version: Version::INITIAL,
            created_at: Utc::now(),
        }
    }

    fn service(
        users: MockUserRepository,
        tokens: MockTokenRepository,
        mailer: MockActivationMailer,
        background: BackgroundTasks,
    ) -> AccountService {
        let issuer = TokenIssuer::new(Arc::new(tokens), Arc::new(DefaultClock));
        AccountService::new(Arc::new(users), issuer, vault(), Arc::new(mailer), background)
    }

    fn registration() -> Registration {
        Registration {
            login: "grace".to_owned(),
            email: "grace@example.com".to_owned(),
            password: PASSWORD.to_owned(),
        }
    }

    #[tokio::test]
    async fn register_inserts_issues_and_mails() {
        let mut users = MockUserRepository::new();
        users.expect_insert().times(1).returning(|new_user| {
            let mut user = stored_user(false);
            user.password_hash = new_user.password_hash.clone();
            Ok(user)
        });
        let mut tokens = MockTokenRepository::new();
        tokens
            .expect_insert()
            .withf(|record| record.scope == TokenScope::Activation)
            .times(1)
            .returning(|_| Ok(()));
        let mut mailer = MockActivationMailer::new();
        mailer
            .expect_send_activation()
            .times(1)
            .returning(|_, _| Ok(()));
        let background = BackgroundTasks::new(Handle::current());

        let user = service(users, tokens, mailer, background.clone())
            .register(registration())
            .await
            .expect("registered");

        assert!(!user.activated);
        assert!(background.wait(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn register_reports_all_invalid_fields() {
        let mut users = MockUserRepository::new();
        users.expect_insert().never();
        let background = BackgroundTasks::new(Handle::current());

        let err = service(
            users,
            MockTokenRepository::new(),
            MockActivationMailer::new(),
            background,
        )
        .register(Registration {
            login: "bad login".to_owned(),
            email: "nope".to_owned(),
            password: "short".to_owned(),
        })
        .await
        .expect_err("invalid");

        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        let fields = &err.details().expect("details")["fields"];
        assert!(fields.get("login").is_some());
        assert!(fields.get("email").is_some());
        assert!(fields.get("password").is_some());
    }

    #[rstest]
    #[case(UserRepositoryError::duplicate_email(), "email")]
    #[case(UserRepositoryError::duplicate_login(), "login")]
    #[tokio::test]
    async fn register_maps_duplicates_to_field_errors(
        #[case] failure: UserRepositoryError,
        #[case] field: &str,
    ) {
        let mut users = MockUserRepository::new();
        users
            .expect_insert()
            .returning(move |_| Err(failure.clone()));
        let background = BackgroundTasks::new(Handle::current());

        let err = service(
            users,
            MockTokenRepository::new(),
            MockActivationMailer::new(),
            background,
        )
        .register(registration())
        .await
        .expect_err("duplicate");

        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert!(err.details().expect("details")["fields"].get(field).is_some());
    }

    #[tokio::test]
    async fn activate_flips_flag_and_revokes_tokens() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(|_| Ok(Some(stored_user(false))));
        users
            .expect_update_if_version()
            .withf(|user, expected| user.activated && *expected == Version::INITIAL)
            .returning(|user, _| {
                let mut committed = user.clone();
                committed.version = committed.version.next().expect("room to advance");
                Ok(Some(committed))
            });
        let mut tokens = MockTokenRepository::new();
        tokens
            .expect_find_user_for_token()
            .returning(|_, _| Ok(Some(stored_user(false))));
        tokens
            .expect_delete_all_for_user()
            .withf(|scope, _| *scope == TokenScope::Activation)
            .times(1)
            .returning(|_, _| Ok(()));
        let background = BackgroundTasks::new(Handle::current());

        let user = service(users, tokens, MockActivationMailer::new(), background)
            .activate(TokenPlaintext::generate().expose())
            .await
            .expect("activated");

        assert!(user.activated);
        assert_eq!(user.version, Version::new(2));
    }

    #[rstest]
    #[case("malformed")]
    #[case("ABCDEFGHIJKLMNOPQRSTUVWXYZ")]
    #[tokio::test]
    async fn activate_rejects_unusable_tokens_as_field_errors(#[case] raw: &str) {
        let mut tokens = MockTokenRepository::new();
        tokens
            .expect_find_user_for_token()
            .returning(|_, _| Ok(None));
        let background = BackgroundTasks::new(Handle::current());

        let err = service(
            MockUserRepository::new(),
            tokens,
            MockActivationMailer::new(),
            background,
        )
        .activate(raw)
        .await
        .expect_err("unusable token");

        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert_eq!(
            err.details().expect("details")["fields"]["token"],
            INVALID_ACTIVATION_TOKEN
        );
    }

    #[tokio::test]
    async fn authenticate_issues_authentication_token() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|_| Ok(Some(stored_user(true))));
        let mut tokens = MockTokenRepository::new();
        tokens
            .expect_insert()
            .withf(|record| record.scope == TokenScope::Authentication)
            .returning(|_| Ok(()));
        let background = BackgroundTasks::new(Handle::current());

        let issued = service(users, tokens, MockActivationMailer::new(), background)
            .authenticate("grace@example.com", PASSWORD)
            .await
            .expect("authenticated");

        assert_eq!(issued.record.user_id, UserId::new(11));
    }

    #[rstest]
    #[case(true, "wrong-password")]
    #[case(false, PASSWORD)]
    #[tokio::test]
    async fn authenticate_rejects_bad_credentials(#[case] known: bool, #[case] password: &str) {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(move |_| Ok(known.then(|| stored_user(true))));
        let mut tokens = MockTokenRepository::new();
        tokens.expect_insert().never();
        let background = BackgroundTasks::new(Handle::current());

        let err = service(users, tokens, MockActivationMailer::new(), background)
            .authenticate("grace@example.com", password)
            .await
            .expect_err("rejected");

        assert_eq!(err.code(), ErrorCode::Unauthorized);
        assert_eq!(err.message(), INVALID_CREDENTIALS);
    }
}
