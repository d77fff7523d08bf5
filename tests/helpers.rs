//! Shared test server for integration tests.
//!
//! Binds an axum app to an ephemeral localhost port and returns the base
//! URL. Routes cover the behaviors the client is tested against: plain
//! bodies, form echo, redirect chains, cookie setting, and JSON.

#![allow(dead_code)]

use axum::extract::{Path, Query, RawQuery};
use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{AppendHeaders, IntoResponse};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;

#[derive(Deserialize)]
struct EchoForm {
    msg: String,
}

#[derive(Deserialize)]
struct JumpParams {
    to: String,
}

fn app() -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/test.txt", get(text_file))
        .route("/echo", post(echo))
        .route("/submit", post(submit))
        .route("/query", get(echo_query))
        .route("/hop/{n}", get(hop))
        .route("/jump", get(jump))
        .route("/login", get(login))
        .route("/cookie/one", get(cookie_one))
        .route("/whoami", get(whoami))
        .route("/json", get(json_body))
        .route("/not-json", get(not_json))
}

async fn hello() -> &'static str {
    "Hello World\n"
}

async fn text_file() -> impl IntoResponse {
    ([("content-type", "text/plain")], "Hello World")
}

async fn echo(Form(form): Form<EchoForm>) -> String {
    form.msg
}

/// Accepts a POST and redirects to `/`, which only serves GET.
async fn submit() -> impl IntoResponse {
    (StatusCode::FOUND, AppendHeaders([(LOCATION, "/")]), "")
}

async fn echo_query(RawQuery(query): RawQuery) -> String {
    query.unwrap_or_default()
}

/// Redirect chain: `/hop/{n}` bounces to `/hop/{n-1}` until `/hop/0`
/// delivers a 200.
async fn hop(Path(n): Path<u32>) -> impl IntoResponse {
    if n == 0 {
        (StatusCode::OK, HeaderMap::new(), "Redirected").into_response()
    } else {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, format!("/hop/{}", n - 1).parse().unwrap());
        (StatusCode::FOUND, headers, "").into_response()
    }
}

/// Redirects to an absolute URL supplied by the caller.
async fn jump(Query(params): Query<JumpParams>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.insert(LOCATION, params.to.parse().unwrap());
    (StatusCode::FOUND, headers, "")
}

/// Sets two cookies and redirects to `/whoami`.
async fn login() -> impl IntoResponse {
    (
        StatusCode::FOUND,
        AppendHeaders([
            (SET_COOKIE, "session=abc123; Path=/; HttpOnly"),
            (SET_COOKIE, "theme=dark"),
            (LOCATION, "/whoami"),
        ]),
        "",
    )
}

async fn cookie_one() -> impl IntoResponse {
    (AppendHeaders([(SET_COOKIE, "only=1")]), "one cookie set")
}

/// Echoes the request's `Cookie` header back in the body.
async fn whoami(headers: HeaderMap) -> String {
    headers
        .get(COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("no cookies")
        .to_string()
}

async fn json_body() -> Json<serde_json::Value> {
    Json(serde_json::json!({"msg": "Hello World"}))
}

async fn not_json() -> &'static str {
    "not json"
}

/// Starts the test server on an ephemeral port and returns its base URL.
pub async fn spawn_server() -> String {
    let _ = env_logger::builder().is_test(true).try_init();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test server");
    let addr = listener.local_addr().expect("test server address");
    tokio::spawn(async move {
        axum::serve(listener, app()).await.expect("test server");
    });
    format!("http://{addr}")
}
