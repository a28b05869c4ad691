use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::domain::{CategorySummary, EntityId, UserStatus, UserSummary};
use tokio::net::TcpListener;

use super::*;
use crate::error::ErrorKind;

#[derive(Clone, Default)]
struct TestServerState {
    list_requests: Arc<StdMutex<Vec<(Option<String>, HashMap<String, String>)>>>,
    broadcast_bodies: Arc<StdMutex<Vec<Value>>>,
}

fn user_json(id: &str, status: &str, personal_info: &str) -> Value {
    json!({
        "id": id,
        "email": format!("{id}@example.com"),
        "role": "attendee",
        "status": status,
        "personalInfo": personal_info,
        "createdAt": "2024-01-01T00:00:00Z"
    })
}

async fn list_users(
    State(state): State<TestServerState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.list_requests.lock().unwrap().push((auth, params));
    Json(json!({
        "success": true,
        "data": [user_json("u-1", "active", r#"{"firstName":"Ada","lastName":"Lovelace"}"#)],
        "meta": { "page": 2, "limit": 5, "total": 23, "totalPage": 5 }
    }))
}

async fn get_user(Path(id): Path<String>) -> Json<Value> {
    if id == "ghost" {
        // the backend answers 200 with a refusal envelope
        return Json(json!({ "success": false, "message": "user not found" }));
    }
    Json(json!({
        "success": true,
        "data": user_json(&id, "active", r#"{"firstName":"Grace"}"#)
    }))
}

async fn list_broken_users() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": [user_json("u-9", "active", "{firstName: broken}")],
        "meta": { "page": 1, "limit": 10, "total": 1, "totalPage": 1 }
    }))
}

async fn list_categories() -> Json<Value> {
    // full set, no meta: the client does its own pagination
    Json(json!({
        "success": true,
        "data": [
            { "id": "c-1", "name": "Music", "subcategories": [] },
            { "id": "c-2", "name": "Theatre", "subcategories": [] },
            { "id": "c-3", "name": "Sports", "subcategories": [] }
        ]
    }))
}

async fn block_user(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    if id == "locked" {
        return (
            StatusCode::CONFLICT,
            Json(json!({
                "success": false,
                "data": { "message": "user is already blocked" }
            })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "user blocked",
            "data": user_json(&id, "blocked", "{}")
        })),
    )
}

async fn delete_user(Path(_id): Path<String>) -> Json<Value> {
    Json(json!({ "success": true, "message": "user deleted" }))
}

async fn post_notification(
    State(state): State<TestServerState>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.broadcast_bodies.lock().unwrap().push(body);
    Json(json!({ "success": true, "message": "broadcast queued" }))
}

async fn spawn_admin_server() -> (String, TestServerState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = TestServerState::default();
    let app = Router::new()
        .route("/api/v1/admin/users", get(list_users))
        .route("/api/v1/admin/users/:id", get(get_user).delete(delete_user))
        .route("/api/v1/admin/users/:id/block", patch(block_user))
        .route("/api/v1/admin/broken-users", get(list_broken_users))
        .route("/api/v1/admin/categories", get(list_categories))
        .route("/api/v1/admin/notifications", post(post_notification))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/api/v1"), state)
}

fn source_for(base_url: &str) -> HttpDataSource {
    HttpDataSource::new(&Settings {
        api_base_url: base_url.to_string(),
        bearer_token: Some("test-token".into()),
        request_timeout_seconds: 5,
    })
    .expect("source")
}

#[tokio::test]
async fn fetch_list_sends_auth_pagination_and_filter_params() {
    let (base_url, state) = spawn_admin_server().await;
    let source = source_for(&base_url);

    let mut query = ListQuery::with_page_size(5);
    query.page = 2;
    query.search_term = "ada".to_string();
    query.filters.insert("status".into(), "active".into());

    let result: ListResult<UserSummary> = source
        .fetch_list("admin/users", &query)
        .await
        .expect("fetch");

    assert_eq!(result.source, PaginationSource::ServerPaginated);
    assert_eq!(result.meta.total, 23);
    assert_eq!(result.meta.total_pages, 5);
    let user = &result.items[0];
    assert_eq!(user.status, UserStatus::Active);
    assert_eq!(
        user.personal_info.as_ref().and_then(|i| i.first_name.as_deref()),
        Some("Ada")
    );

    let requests = state.list_requests.lock().unwrap();
    let (auth, params) = &requests[0];
    assert_eq!(auth.as_deref(), Some("Bearer test-token"));
    assert_eq!(params.get("page").map(String::as_str), Some("2"));
    assert_eq!(params.get("limit").map(String::as_str), Some("5"));
    assert_eq!(params.get("search").map(String::as_str), Some("ada"));
    assert_eq!(params.get("status").map(String::as_str), Some("active"));
}

#[tokio::test]
async fn list_without_meta_is_client_paginated() {
    let (base_url, _state) = spawn_admin_server().await;
    let source = source_for(&base_url);

    let result: ListResult<CategorySummary> = source
        .fetch_list("admin/categories", &ListQuery::default())
        .await
        .expect("fetch");

    assert_eq!(result.source, PaginationSource::ClientPaginated);
    assert_eq!(result.items.len(), 3);
    assert_eq!(result.meta.total, 3);
    assert_eq!(result.meta.total_pages, 1);
}

#[tokio::test]
async fn malformed_embedded_payload_is_a_decode_error() {
    let (base_url, _state) = spawn_admin_server().await;
    let source = source_for(&base_url);

    let err = DataSource::<UserSummary>::fetch_list(
        &source,
        "admin/broken-users",
        &ListQuery::default(),
    )
    .await
    .expect_err("must fail");

    assert_eq!(err.kind, ErrorKind::Decode);
    assert!(err.message.contains("personalInfo"));
}

#[tokio::test]
async fn fetch_one_decodes_the_entity_envelope() {
    let (base_url, _state) = spawn_admin_server().await;
    let source = source_for(&base_url);

    let user: UserSummary = source.fetch_one("admin/users", "u-7").await.expect("fetch");
    assert_eq!(user.id.as_str(), "u-7");
    assert_eq!(
        user.personal_info.and_then(|i| i.first_name),
        Some("Grace".to_string())
    );
}

#[tokio::test]
async fn refused_entity_envelope_relays_the_backend_message() {
    let (base_url, _state) = spawn_admin_server().await;
    let source = source_for(&base_url);

    let err = DataSource::<UserSummary>::fetch_one(&source, "admin/users", "ghost")
        .await
        .expect_err("must fail");

    assert_eq!(err.kind, ErrorKind::Fetch);
    assert!(err.message.contains("user not found"));
}

#[tokio::test]
async fn block_mutation_hits_the_action_route_and_returns_the_entity() {
    let (base_url, _state) = spawn_admin_server().await;
    let source = source_for(&base_url);

    let reply: MutationReply<UserSummary> = source
        .mutate("admin/users", &MutationIntent::block(EntityId::new("u-1")))
        .await
        .expect("mutate");

    assert_eq!(reply.message, "user blocked");
    assert_eq!(reply.entity.expect("entity").status, UserStatus::Blocked);
}

#[tokio::test]
async fn delete_mutation_uses_the_resource_id_route() {
    let (base_url, _state) = spawn_admin_server().await;
    let source = source_for(&base_url);

    let reply: MutationReply<UserSummary> = source
        .mutate("admin/users", &MutationIntent::delete(EntityId::new("u-1")))
        .await
        .expect("mutate");

    assert_eq!(reply.message, "user deleted");
    assert!(reply.entity.is_none());
}

#[tokio::test]
async fn broadcast_posts_its_payload_to_the_collection_root() {
    let (base_url, state) = spawn_admin_server().await;
    let source = source_for(&base_url);

    let reply: MutationReply<shared::domain::NotificationSummary> = source
        .mutate(
            "admin/notifications",
            &MutationIntent::broadcast(EntityId::new("n-1"), "Maintenance", "Down at midnight"),
        )
        .await
        .expect("mutate");
    assert_eq!(reply.message, "broadcast queued");

    let bodies = state.broadcast_bodies.lock().unwrap();
    assert_eq!(bodies[0]["title"], "Maintenance");
    assert_eq!(bodies[0]["body"], "Down at midnight");
}

#[tokio::test]
async fn backend_rejection_text_reaches_the_caller_verbatim() {
    let (base_url, _state) = spawn_admin_server().await;
    let source = source_for(&base_url);

    let err = DataSource::<UserSummary>::mutate(
        &source,
        "admin/users",
        &MutationIntent::block(EntityId::new("locked")),
    )
    .await
    .expect_err("must fail");

    assert_eq!(err.kind, ErrorKind::Mutation);
    assert!(err.message.contains("user is already blocked"));
}
