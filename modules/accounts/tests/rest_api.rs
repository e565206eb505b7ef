mod common;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use accounts::api::rest::dto::{ClientDto, UserDto};
use accounts::Id;

async fn app() -> (Router, common::TestDb) {
    let (module, db) = common::module().await;
    (module.router(CancellationToken::new()), db)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn client_crud_over_http() -> Result<()> {
    let (app, _db) = app().await;

    let (status, body) = send(&app, "POST", "/clients", Some(json!({"name": "Acme"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let created: ClientDto = serde_json::from_value(body)?;
    assert_eq!(created.name, "Acme");

    let path = format!("/clients/{}", created.id);
    let (status, body) = send(&app, "GET", &path, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_value::<ClientDto>(body)?, created);

    let (status, body) = send(&app, "PATCH", &path, Some(json!({"name": "Acme Corp"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Acme Corp");
    assert_eq!(body["created_at"], json!(created.created_at));

    let (status, body) = send(&app, "GET", "/clients", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let (status, _) = send(&app, "DELETE", &path, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", &path, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
    assert_eq!(body["code"], "CLIENT_NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn users_carry_client_ids() -> Result<()> {
    let (app, _db) = app().await;

    let (_, a) = send(&app, "POST", "/clients", Some(json!({"name": "A"}))).await;
    let (_, b) = send(&app, "POST", "/clients", Some(json!({"name": "B"}))).await;

    let (status, body) = send(
        &app,
        "POST",
        "/users",
        Some(json!({"email": "ann@example.com", "enabled": true, "client_ids": [a["id"], b["id"]]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let user: UserDto = serde_json::from_value(body)?;
    assert_eq!(user.client_ids.len(), 2);

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/users/{}", user.id),
        Some(json!({"client_ids": [b["id"]]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["client_ids"], json!([b["id"]]));
    assert_eq!(body["email"], "ann@example.com");

    let (status, body) = send(&app, "GET", &format!("/users?ids={}", user.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["client_ids"], json!([b["id"]]));

    // No delete route for users.
    let (status, _) = send(&app, "DELETE", &format!("/users/{}", user.id), None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    Ok(())
}

#[tokio::test]
async fn bad_input_maps_to_problems() {
    let (app, _db) = app().await;

    let (status, body) = send(&app, "GET", "/clients/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MALFORMED_ID");
    assert_eq!(body["instance"], "/clients/not-a-uuid");

    // Version 1 UUID.
    let (status, _) = send(&app, "GET", "/users/6ba7b810-9dad-11d1-80b4-00c04fd430c8", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/users?ids=1,2", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "POST", "/users", Some(json!({"email": "nope"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["pointer"], "/email");

    let (status, body) = send(&app, "POST", "/clients", Some(json!({"nom": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_BODY");

    let (status, _) = send(
        &app,
        "POST",
        "/users",
        Some(json!({"email": "ok@example.com", "client_ids": ["bogus"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/users/{}", Id::new()),
        Some(json!({"enabled": false})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicates_are_conflicts() {
    let (app, _db) = app().await;

    send(&app, "POST", "/clients", Some(json!({"name": "Acme"}))).await;
    let (status, body) = send(&app, "POST", "/clients", Some(json!({"name": "Acme"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["detail"], "A client with this name already exists");

    let resp = app
        .clone()
        .oneshot(
            Request::post("/clients")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"name":"Acme"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE],
        "application/problem+json"
    );
}

#[tokio::test]
async fn shutdown_cancels_in_flight_requests() {
    let (module, _db) = common::module().await;
    let shutdown = CancellationToken::new();
    let app = module.router(shutdown.clone());
    shutdown.cancel();

    let (status, body) = send(&app, "POST", "/clients", Some(json!({"name": "Late"}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "CANCELLED");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (app, _db) = app().await;
    let (status, body) = send(&app, "GET", "/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/clients/{id}"]["patch"].is_object());
    assert!(body["components"]["schemas"]["UserDto"].is_object());
}
