//! End-to-end paste flows through the full middleware stack.
//!
//! Accounts are registered, activated via the captured activation token and
//! authenticated with bearer tokens before touching pastes.

// Each test crate uses a different slice of the harness.
#[allow(dead_code)]
mod support;

use actix_web::http::StatusCode;
use actix_web::test;
use pastebin::domain::TRACE_ID_HEADER;
use rstest::rstest;
use serde_json::{Value, json};

use support::{Harness, bearer, send, signed_up};

fn new_paste() -> Value {
    json!({"title": "groceries", "category": 2, "text": "milk", "minutes": 60})
}

#[rstest]
#[actix_web::test]
async fn versioned_edit_flow() {
    let harness = Harness::new();
    let app = test::init_service(harness.app()).await;
    let token = signed_up(&harness, &app, "ada", true).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/pastes")
        .insert_header(bearer(&token))
        .set_json(new_paste())
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["paste"]["id"].as_i64().expect("id");
    assert_eq!(body["paste"]["version"], 1);
    let uri = format!("/api/v1/pastes/{id}");

    let req = test::TestRequest::patch()
        .uri(&uri)
        .insert_header(bearer(&token))
        .set_json(json!({"title": "shopping", "version": 1}))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paste"]["version"], 2);
    assert_eq!(body["paste"]["title"], "shopping");
    assert_eq!(body["paste"]["text"], "milk");

    let req = test::TestRequest::patch()
        .uri(&uri)
        .insert_header(bearer(&token))
        .set_json(json!({"title": "stale", "version": 1}))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");

    let req = test::TestRequest::get().uri(&uri).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paste"]["title"], "shopping");
    assert_eq!(body["paste"]["version"], 2);
}

#[derive(Debug, Clone, Copy)]
enum Caller {
    Anonymous,
    Inactive,
    Stranger,
    Owner,
}

#[rstest]
#[case(Caller::Anonymous, StatusCode::UNAUTHORIZED)]
#[case(Caller::Inactive, StatusCode::FORBIDDEN)]
#[case(Caller::Stranger, StatusCode::FORBIDDEN)]
#[case(Caller::Owner, StatusCode::NO_CONTENT)]
#[actix_web::test]
async fn delete_authorization_matrix(#[case] caller: Caller, #[case] expected: StatusCode) {
    let harness = Harness::new();
    let app = test::init_service(harness.app()).await;
    let owner = signed_up(&harness, &app, "owner", true).await;
    let req = test::TestRequest::post()
        .uri("/api/v1/pastes")
        .insert_header(bearer(&owner))
        .set_json(new_paste())
        .to_request();
    let (_, body) = send(&app, req).await;
    let uri = format!("/api/v1/pastes/{}", body["paste"]["id"]);

    let token = match caller {
        Caller::Anonymous => None,
        Caller::Inactive => Some(signed_up(&harness, &app, "sleepy", false).await),
        Caller::Stranger => Some(signed_up(&harness, &app, "stranger", true).await),
        Caller::Owner => Some(owner.clone()),
    };
    let mut req = test::TestRequest::delete().uri(&uri);
    if let Some(token) = token {
        req = req.insert_header(bearer(&token));
    }
    let res = test::call_service(&app, req.to_request()).await;
    assert_eq!(res.status(), expected, "{caller:?}");
    if expected != StatusCode::NO_CONTENT {
        assert!(res.headers().contains_key(TRACE_ID_HEADER));
    }

    let still_there = send(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    let expected_lookup = if expected == StatusCode::NO_CONTENT {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };
    assert_eq!(still_there.0, expected_lookup);
}

#[rstest]
#[actix_web::test]
async fn unknown_bearer_token_is_rejected_even_on_public_routes() {
    let harness = Harness::new();
    let app = test::init_service(harness.app()).await;
    let req = test::TestRequest::get()
        .uri("/api/v1/pastes")
        .insert_header(bearer("ABCDEFGHIJKLMNOPQRSTUVWXYZ"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        res.headers()
            .get("WWW-Authenticate")
            .and_then(|v| v.to_str().ok()),
        Some("Bearer")
    );
}

#[rstest]
#[actix_web::test]
async fn activation_token_does_not_authenticate() {
    let harness = Harness::new();
    let app = test::init_service(harness.app()).await;
    let req = test::TestRequest::post()
        .uri("/api/v1/users")
        .set_json(json!({
            "login": "ada",
            "email": "ada@example.com",
            "password": support::PASSWORD
        }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(
        harness
            .background
            .wait(std::time::Duration::from_secs(5))
            .await
    );
    let activation = harness
        .mailer
        .token_for("ada@example.com")
        .expect("activation mail");

    let req = test::TestRequest::post()
        .uri("/api/v1/pastes")
        .insert_header(bearer(&activation))
        .set_json(new_paste())
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
