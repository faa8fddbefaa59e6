//! Shared harness for backend integration tests.
//!
//! Builds the full middleware stack over in-memory adapters and captures
//! activation tokens instead of mailing them.

use std::sync::Arc;
use std::time::Duration;

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use parking_lot::Mutex;
use serde_json::{Value, json};

use pastebin::domain::ports::{ActivationMailer, ActivationMailerError};
use pastebin::domain::{
    AccountService, BackgroundTasks, CredentialVault, PasteService, TokenIssuer, TokenPlaintext,
    User,
};
use pastebin::inbound::http::authentication::Authenticate;
use pastebin::inbound::http::health::HealthState;
use pastebin::inbound::http::state::HttpState;
use pastebin::inbound::http::{api_routes, json_config, payload_config, query_config};
use pastebin::middleware::{CatchPanic, Trace};
use pastebin::outbound::memory::InMemoryStores;

/// Password used by every account the harness creates.
pub const PASSWORD: &str = "correct horse";

/// Mailer that keeps the last token sent to each address.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    /// Most recent token mailed to `email`.
    pub fn token_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, token)| token.clone())
    }
}

#[async_trait]
impl ActivationMailer for RecordingMailer {
    async fn send_activation(
        &self,
        user: &User,
        token: &TokenPlaintext,
    ) -> Result<(), ActivationMailerError> {
        self.sent
            .lock()
            .push((user.email.as_ref().to_owned(), token.expose().to_owned()));
        Ok(())
    }
}

/// Services wired over in-memory adapters.
pub struct Harness {
    pub stores: InMemoryStores,
    pub state: HttpState,
    pub mailer: Arc<RecordingMailer>,
    pub background: BackgroundTasks,
}

impl Harness {
    /// Fresh harness; must run inside a Tokio runtime.
    pub fn new() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
        let stores = InMemoryStores::new(Arc::clone(&clock));
        let mailer = Arc::new(RecordingMailer::default());
        let background = BackgroundTasks::new(tokio::runtime::Handle::current());
        let issuer = TokenIssuer::new(stores.tokens.clone(), Arc::clone(&clock));
        let accounts = AccountService::new(
            stores.users.clone(),
            issuer.clone(),
            CredentialVault::with_cost(4),
            mailer.clone(),
            background.clone(),
        );
        let pastes = PasteService::new(stores.pastes.clone(), stores.permissions.clone(), clock);
        let state = HttpState::new(accounts, pastes, issuer, stores.permissions.clone());
        Self {
            stores,
            state,
            mailer,
            background,
        }
    }

    /// App with the production middleware stack, rate limiting aside.
    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody + use<>>,
            Error = actix_web::Error,
            InitError = (),
        > + use<>,
    > {
        App::new()
            .app_data(web::Data::new(HealthState::new("test")))
            .app_data(web::Data::new(self.state.clone()))
            .app_data(json_config())
            .app_data(payload_config())
            .app_data(query_config())
            .service(web::scope("/api/v1").configure(api_routes))
            .wrap(Authenticate::new(self.state.tokens.clone()))
            .wrap(CatchPanic)
            .wrap(Trace)
    }
}

/// Send `req` and decode the body as JSON; an empty body yields `Null`.
pub async fn send<S, B>(app: &S, req: actix_http::Request) -> (StatusCode, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let res = test::call_service(app, req).await;
    let status = res.status();
    let bytes = test::read_body(res).await;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

/// `Authorization` header value for `token`.
pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

/// Register `login`, optionally activate it, and return a bearer token.
pub async fn signed_up<S, B>(harness: &Harness, app: &S, login: &str, activate: bool) -> String
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let email = format!("{login}@example.com");
    let req = test::TestRequest::post()
        .uri("/api/v1/users")
        .set_json(json!({"login": login, "email": email, "password": PASSWORD}))
        .to_request();
    let (status, _) = send(app, req).await;
    assert_eq!(status, StatusCode::ACCEPTED, "register {login}");

    if activate {
        assert!(harness.background.wait(Duration::from_secs(5)).await);
        let token = harness.mailer.token_for(&email).expect("activation mail");
        let req = test::TestRequest::put()
            .uri("/api/v1/users/activated")
            .set_json(json!({"token": token}))
            .to_request();
        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::OK, "activate {login}: {body}");
    }

    let req = test::TestRequest::post()
        .uri("/api/v1/tokens/authentication")
        .set_json(json!({"email": email, "password": PASSWORD}))
        .to_request();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::CREATED, "login {login}");
    body["authenticationToken"]["token"]
        .as_str()
        .expect("token string")
        .to_owned()
}
