//! Paste API handlers.
//!
//! ```text
//! GET    /api/v1/pastes?title=shop&category=2
//! POST   /api/v1/pastes {"title":"groceries","category":2,"text":"milk","minutes":60}
//! GET    /api/v1/pastes/{id}
//! PATCH  /api/v1/pastes/{id} {"text":"milk, eggs","version":1}
//! DELETE /api/v1/pastes/{id}
//! ```

use actix_web::http::header::LOCATION;
use actix_web::{HttpRequest, HttpResponse, delete, get, patch, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    Category, Error, FieldErrors, Paste, PasteDraft, PasteFilter, PastePatch, Version,
};

use super::ApiResult;
use super::authorization::{Activated, WritePermitted, paste_id_param};
use super::state::HttpState;

/// Listing filters for `GET /api/v1/pastes`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(deny_unknown_fields)]
pub struct ListPastesQuery {
    /// Case-insensitive title substring.
    pub title: Option<String>,
    /// Category code, 1..=3.
    pub category: Option<i64>,
}

impl TryFrom<ListPastesQuery> for PasteFilter {
    type Error = FieldErrors;

    fn try_from(query: ListPastesQuery) -> Result<Self, Self::Error> {
        let category = query
            .category
            .map(|code| {
                Category::from_code(code)
                    .ok_or_else(|| FieldErrors::single("category", "no such category"))
            })
            .transpose()?;
        let title = query
            .title
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty());
        Ok(Self { title, category })
    }
}

/// Creation body. Absent fields fail validation rather than parsing.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default, deny_unknown_fields)]
pub struct CreatePasteRequest {
    pub title: String,
    pub category: i64,
    pub text: String,
    /// Lifetime in minutes.
    pub minutes: i64,
}

/// Sparse update body; `version` is the version the client last read.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdatePasteRequest {
    pub title: Option<String>,
    pub category: Option<i64>,
    pub text: Option<String>,
    /// Minutes added to (or, when negative, removed from) the expiry.
    pub minutes: Option<i64>,
    #[schema(value_type = i32, example = 1)]
    pub version: Version,
}

/// `{"paste": ...}`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PasteEnvelope {
    pub paste: Paste,
}

/// `{"pastes": [...]}`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PastesEnvelope {
    pub pastes: Vec<Paste>,
}

/// List unexpired pastes, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/pastes",
    params(ListPastesQuery),
    responses(
        (status = 200, description = "Matching pastes", body = PastesEnvelope),
        (status = 400, description = "Invalid filter", body = Error),
        (status = 429, description = "Rate limited", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["pastes"],
    operation_id = "listPastes",
    security([])
)]
#[get("/pastes")]
pub async fn list_pastes(
    state: web::Data<HttpState>,
    query: web::Query<ListPastesQuery>,
) -> ApiResult<web::Json<PastesEnvelope>> {
    let filter = PasteFilter::try_from(query.into_inner())?;
    let pastes = state.pastes.list(&filter).await?;
    Ok(web::Json(PastesEnvelope { pastes }))
}

/// Fetch one unexpired paste.
#[utoipa::path(
    get,
    path = "/api/v1/pastes/{id}",
    params(("id" = i64, Path, description = "Paste identifier")),
    responses(
        (status = 200, description = "The paste", body = PasteEnvelope),
        (status = 400, description = "Malformed identifier", body = Error),
        (status = 404, description = "Missing or expired", body = Error)
    ),
    tags = ["pastes"],
    operation_id = "getPaste",
    security([])
)]
#[get("/pastes/{id}")]
pub async fn get_paste(
    state: web::Data<HttpState>,
    req: HttpRequest,
) -> ApiResult<web::Json<PasteEnvelope>> {
    let id = paste_id_param(&req)?;
    let paste = state.pastes.get(id).await?;
    Ok(web::Json(PasteEnvelope { paste }))
}

/// Create a paste; the author receives the write grant.
#[utoipa::path(
    post,
    path = "/api/v1/pastes",
    request_body = CreatePasteRequest,
    responses(
        (status = 201, description = "Created", body = PasteEnvelope,
            headers(("Location" = String, description = "Paste URL"))),
        (status = 400, description = "Validation failed", body = Error),
        (status = 401, description = "Not authenticated", body = Error),
        (status = 403, description = "Account not activated", body = Error)
    ),
    tags = ["pastes"],
    operation_id = "createPaste"
)]
#[post("/pastes")]
pub async fn create_paste(
    Activated(author): Activated,
    state: web::Data<HttpState>,
    payload: web::Json<CreatePasteRequest>,
) -> ApiResult<HttpResponse> {
    let CreatePasteRequest {
        title,
        category,
        text,
        minutes,
    } = payload.into_inner();
    let draft = PasteDraft::new(title, category, text, minutes)?;
    let paste = state.pastes.create(&author, draft).await?;
    Ok(HttpResponse::Created()
        .insert_header((LOCATION, format!("/api/v1/pastes/{}", paste.id)))
        .json(PasteEnvelope { paste }))
}

/// Apply a sparse update at the version the client read.
#[utoipa::path(
    patch,
    path = "/api/v1/pastes/{id}",
    params(("id" = i64, Path, description = "Paste identifier")),
    request_body = UpdatePasteRequest,
    responses(
        (status = 200, description = "Updated", body = PasteEnvelope),
        (status = 400, description = "Validation failed", body = Error),
        (status = 401, description = "Not authenticated", body = Error),
        (status = 403, description = "No write grant", body = Error),
        (status = 404, description = "Missing or expired", body = Error),
        (status = 409, description = "Edit conflict", body = Error)
    ),
    tags = ["pastes"],
    operation_id = "updatePaste"
)]
#[patch("/pastes/{id}")]
pub async fn update_paste(
    gate: WritePermitted,
    state: web::Data<HttpState>,
    body: web::Bytes,
) -> ApiResult<web::Json<PasteEnvelope>> {
    // Parsed only once the write grant is confirmed.
    let UpdatePasteRequest {
        title,
        category,
        text,
        minutes,
        version,
    } = parse_update(&body)?;
    let patch = PastePatch::new(title, category, text, minutes)?;
    let paste = state.pastes.update(gate.paste_id, version, patch).await?;
    Ok(web::Json(PasteEnvelope { paste }))
}

fn parse_update(body: &[u8]) -> Result<UpdatePasteRequest, Error> {
    serde_json::from_slice(body)
        .map_err(|err| Error::invalid_request(format!("Json deserialize error: {err}")))
}

/// Remove a paste. Responds 204 with an empty body.
#[utoipa::path(
    delete,
    path = "/api/v1/pastes/{id}",
    params(("id" = i64, Path, description = "Paste identifier")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Not authenticated", body = Error),
        (status = 403, description = "No write grant", body = Error),
        (status = 404, description = "Missing", body = Error)
    ),
    tags = ["pastes"],
    operation_id = "deletePaste"
)]
#[delete("/pastes/{id}")]
pub async fn delete_paste(
    gate: WritePermitted,
    state: web::Data<HttpState>,
) -> ApiResult<HttpResponse> {
    state.pastes.delete(gate.paste_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{PasteRepository, PermissionStore};
    use crate::domain::{Identity, NewPaste, User};
    use crate::inbound::http::test_utils::{app_as, memory_context, seed_user};
    use crate::outbound::memory::InMemoryStores;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use chrono::{TimeDelta, Utc};
    use rstest::rstest;
    use serde_json::{Value, json};

    fn routes(cfg: &mut web::ServiceConfig) {
        cfg.service(
            web::scope("/api/v1")
                .service(list_pastes)
                .service(create_paste)
                .service(get_paste)
                .service(update_paste)
                .service(delete_paste),
        );
    }

    async fn seed_paste(stores: &InMemoryStores, owner: Option<&User>, title: &str) -> Paste {
        let now = Utc::now();
        let paste = stores
            .pastes
            .insert(&NewPaste {
                title: title.to_owned(),
                category: Category::Home,
                text: "milk".to_owned(),
                created_at: now,
                expires_at: now + TimeDelta::hours(1),
            })
            .await
            .expect("seed paste");
        if let Some(owner) = owner {
            stores
                .permissions
                .grant(owner.id, paste.id)
                .await
                .expect("seed grant");
        }
        paste
    }

    #[actix_web::test]
    async fn create_returns_201_with_location_and_grants_author() {
        let ctx = memory_context();
        let author = seed_user(&ctx.stores, "ada", true).await;
        let app = test::init_service(
            app_as(ctx.state.clone(), Identity::User(author.clone())).configure(routes),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/v1/pastes")
            .set_json(json!({"title": "groceries", "category": 2, "text": "milk", "minutes": 60}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let location = res
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body: PasteEnvelope = test::read_body_json(res).await;
        assert_eq!(location, Some(format!("/api/v1/pastes/{}", body.paste.id)));
        assert_eq!(body.paste.version, Version::INITIAL);
        assert!(
            ctx.stores
                .permissions
                .has_write_permission(author.id, body.paste.id)
                .await
                .expect("lookup")
        );
    }

    #[actix_web::test]
    async fn create_reports_every_invalid_field() {
        let ctx = memory_context();
        let author = seed_user(&ctx.stores, "ada", true).await;
        let app =
            test::init_service(app_as(ctx.state, Identity::User(author)).configure(routes)).await;
        let req = test::TestRequest::post()
            .uri("/api/v1/pastes")
            .set_json(json!({"title": " ", "category": 7, "minutes": 0}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        let fields = &body["details"]["fields"];
        for field in ["title", "text", "category", "minutes"] {
            assert!(fields.get(field).is_some(), "missing error for {field}");
        }
    }

    #[actix_web::test]
    async fn create_stores_trimmed_title_and_text() {
        let ctx = memory_context();
        let author = seed_user(&ctx.stores, "ada", true).await;
        let app = test::init_service(
            app_as(ctx.state.clone(), Identity::User(author)).configure(routes),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/v1/pastes")
            .set_json(json!({
                "title": "  groceries  ",
                "category": 2,
                "text": "  milk \n",
                "minutes": 60
            }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: PasteEnvelope = test::read_body_json(res).await;

        let stored = ctx
            .stores
            .pastes
            .find_live(body.paste.id)
            .await
            .expect("lookup")
            .expect("stored paste");
        assert_eq!(stored.title, "groceries");
        assert_eq!(stored.text, "milk");
    }

    #[actix_web::test]
    async fn create_requires_activation() {
        let ctx = memory_context();
        let user = seed_user(&ctx.stores, "ada", false).await;
        let app =
            test::init_service(app_as(ctx.state, Identity::User(user)).configure(routes)).await;
        let req = test::TestRequest::post()
            .uri("/api/v1/pastes")
            .set_json(json!({"title": "t", "category": 1, "text": "x", "minutes": 5}))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::FORBIDDEN
        );
    }

    #[actix_web::test]
    async fn malformed_json_is_a_400_error_payload() {
        let ctx = memory_context();
        let author = seed_user(&ctx.stores, "ada", true).await;
        let app =
            test::init_service(app_as(ctx.state, Identity::User(author)).configure(routes)).await;
        let req = test::TestRequest::post()
            .uri("/api/v1/pastes")
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"title\":")
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["code"], "invalid_request");
    }

    #[actix_web::test]
    async fn anyone_can_read_and_filter() {
        let ctx = memory_context();
        seed_paste(&ctx.stores, None, "Shopping").await;
        let kept = seed_paste(&ctx.stores, None, "Chores").await;
        let app = test::init_service(app_as(ctx.state, Identity::Anonymous).configure(routes)).await;

        let req = test::TestRequest::get()
            .uri("/api/v1/pastes?title=chore&category=2")
            .to_request();
        let body: PastesEnvelope = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.pastes.len(), 1);
        assert_eq!(body.pastes[0].id, kept.id);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/pastes/{}", kept.id))
            .to_request();
        let body: PasteEnvelope = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.paste.title, "Chores");
    }

    #[rstest]
    #[case("/api/v1/pastes?category=4")]
    #[case("/api/v1/pastes?category=sport")]
    #[case("/api/v1/pastes?page=2")]
    #[actix_web::test]
    async fn bad_filters_are_rejected(#[case] uri: &str) {
        let ctx = memory_context();
        let app = test::init_service(app_as(ctx.state, Identity::Anonymous).configure(routes)).await;
        let res = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn missing_paste_is_404() {
        let ctx = memory_context();
        let app = test::init_service(app_as(ctx.state, Identity::Anonymous).configure(routes)).await;
        let req = test::TestRequest::get().uri("/api/v1/pastes/99").to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_web::test]
    async fn update_bumps_version_and_stale_retry_conflicts() {
        let ctx = memory_context();
        let owner = seed_user(&ctx.stores, "ada", true).await;
        let paste = seed_paste(&ctx.stores, Some(&owner), "groceries").await;
        let app =
            test::init_service(app_as(ctx.state, Identity::User(owner)).configure(routes)).await;
        let uri = format!("/api/v1/pastes/{}", paste.id);
        let patch = json!({"text": "  milk, eggs  ", "minutes": 30, "version": 1});

        let req = test::TestRequest::patch().uri(&uri).set_json(&patch).to_request();
        let body: PasteEnvelope = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.paste.version, Version::new(2));
        assert_eq!(body.paste.text, "milk, eggs");
        assert_eq!(body.paste.expires_at, paste.expires_at + TimeDelta::minutes(30));

        let req = test::TestRequest::patch().uri(&uri).set_json(&patch).to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn update_without_version_is_rejected() {
        let ctx = memory_context();
        let owner = seed_user(&ctx.stores, "ada", true).await;
        let paste = seed_paste(&ctx.stores, Some(&owner), "groceries").await;
        let app =
            test::init_service(app_as(ctx.state, Identity::User(owner)).configure(routes)).await;
        let req = test::TestRequest::patch()
            .uri(&format!("/api/v1/pastes/{}", paste.id))
            .set_json(json!({"title": "renamed"}))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[actix_web::test]
    async fn malformed_update_from_a_stranger_is_forbidden() {
        let ctx = memory_context();
        let owner = seed_user(&ctx.stores, "ada", true).await;
        let stranger = seed_user(&ctx.stores, "bob", true).await;
        let paste = seed_paste(&ctx.stores, Some(&owner), "groceries").await;
        let app =
            test::init_service(app_as(ctx.state, Identity::User(stranger)).configure(routes))
                .await;
        let req = test::TestRequest::patch()
            .uri(&format!("/api/v1/pastes/{}", paste.id))
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"title\":")
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::FORBIDDEN
        );
    }

    #[actix_web::test]
    async fn malformed_update_from_the_owner_is_a_400_error_payload() {
        let ctx = memory_context();
        let owner = seed_user(&ctx.stores, "ada", true).await;
        let paste = seed_paste(&ctx.stores, Some(&owner), "groceries").await;
        let app =
            test::init_service(app_as(ctx.state, Identity::User(owner)).configure(routes)).await;
        let req = test::TestRequest::patch()
            .uri(&format!("/api/v1/pastes/{}", paste.id))
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"title\":")
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["code"], "invalid_request");
    }

    #[actix_web::test]
    async fn shortening_past_creation_is_a_validation_error() {
        let ctx = memory_context();
        let owner = seed_user(&ctx.stores, "ada", true).await;
        let paste = seed_paste(&ctx.stores, Some(&owner), "groceries").await;
        let app =
            test::init_service(app_as(ctx.state, Identity::User(owner)).configure(routes)).await;
        let req = test::TestRequest::patch()
            .uri(&format!("/api/v1/pastes/{}", paste.id))
            .set_json(json!({"minutes": -120, "version": 1}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert!(body["details"]["fields"].get("minutes").is_some());
    }

    #[actix_web::test]
    async fn delete_returns_empty_204_then_404() {
        let ctx = memory_context();
        let owner = seed_user(&ctx.stores, "ada", true).await;
        let paste = seed_paste(&ctx.stores, Some(&owner), "groceries").await;
        let app =
            test::init_service(app_as(ctx.state, Identity::User(owner)).configure(routes)).await;
        let uri = format!("/api/v1/pastes/{}", paste.id);

        let res =
            test::call_service(&app, test::TestRequest::delete().uri(&uri).to_request()).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert!(test::read_body(res).await.is_empty());

        let res =
            test::call_service(&app, test::TestRequest::delete().uri(&uri).to_request()).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(ctx.stores.pastes.raw(paste.id).is_none());
    }
}
