// tests/http_clients.rs
//
// Feed, ntfy and Resend clients against throwaway local axum servers.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use active_calls_monitor::feed::source::{FeedSource, FetchError, HttpFeedSource};
use active_calls_monitor::feed::try_parse_bytes;
use active_calls_monitor::notify::message::{email_message, push_message};
use active_calls_monitor::notify::{EmailSink, NtfyClient, PushSink, ResendClient};
use active_calls_monitor::IncidentRecord;
use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

const FEED: &str = include_str!("fixtures/active_calls.xml");

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn record() -> IncidentRecord {
    IncidentRecord::new(
        "2025-00192513",
        "5/27/2025 13:36",
        "General investigation",
        "2400 BLOCK 29TH ST",
        "G8",
    )
}

#[tokio::test]
async fn feed_fetch_sends_user_agent_and_returns_body() {
    let seen_ua = Arc::new(Mutex::new(None::<String>));
    let ua = seen_ua.clone();
    let app = Router::new().route(
        "/activecadpolice.xml",
        get(move |headers: HeaderMap| {
            let ua = ua.clone();
            async move {
                *ua.lock().unwrap() = headers
                    .get("user-agent")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let mut body = vec![0xEF, 0xBB, 0xBF];
                body.extend_from_slice(FEED.as_bytes());
                body
            }
        }),
    );
    let addr = serve(app).await;

    let src = HttpFeedSource::new(format!("http://{addr}/activecadpolice.xml")).unwrap();
    let body = src.fetch().await.expect("fetch ok");
    let feed = try_parse_bytes(&body).expect("parse ok");
    assert_eq!(feed.records.len(), 4);

    let ua = seen_ua.lock().unwrap().clone().unwrap_or_default();
    assert!(ua.starts_with("Active-Calls-Monitor/"), "user agent was {ua:?}");
}

#[tokio::test]
async fn feed_non_2xx_is_a_transport_error() {
    let app = Router::new().route(
        "/activecadpolice.xml",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
    );
    let addr = serve(app).await;

    let src = HttpFeedSource::new(format!("http://{addr}/activecadpolice.xml")).unwrap();
    let err = src.fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Status(s) if s.as_u16() == 503));
    assert!(err.is_transport());
}

#[tokio::test]
async fn feed_refused_connection_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let src = HttpFeedSource::new(format!("http://{addr}/feed.xml")).unwrap();
    let err = src.fetch().await.unwrap_err();
    assert!(err.is_transport(), "got {err:?}");
}

#[tokio::test]
async fn ntfy_posts_plain_text_with_metadata_headers() {
    let captured: Arc<Mutex<Vec<(String, HeaderMap, String)>>> = Arc::default();
    let c = captured.clone();
    let app = Router::new().route(
        "/{topic}",
        post(move |Path(topic): Path<String>, headers: HeaderMap, body: String| {
            let c = c.clone();
            async move {
                c.lock().unwrap().push((topic, headers, body));
                StatusCode::OK
            }
        }),
    );
    let addr = serve(app).await;

    let client = NtfyClient::new(&format!("http://{addr}"), "police-watch");
    client.push(&push_message(&record(), "29TH")).await.expect("push ok");

    let calls = captured.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (topic, headers, body) = &calls[0];
    assert_eq!(topic, "police-watch");
    assert_eq!(headers.get("title").unwrap(), "Orlando PD Alert: 29TH");
    assert_eq!(headers.get("priority").unwrap(), "urgent");
    assert_eq!(headers.get("tags").unwrap(), "police,alert,orlando");
    assert!(body.contains("Location: 2400 BLOCK 29TH ST"));
}

#[tokio::test]
async fn ntfy_error_status_is_reported() {
    let app = Router::new().route(
        "/{topic}",
        post(|| async { StatusCode::TOO_MANY_REQUESTS }),
    );
    let addr = serve(app).await;

    let client = NtfyClient::new(&format!("http://{addr}"), "police-watch");
    let err = client.push(&push_message(&record(), "29TH")).await.unwrap_err();
    assert!(format!("{err:#}").contains("ntfy non-2xx"));
}

#[tokio::test]
async fn resend_receives_both_bodies_and_returns_id() {
    let captured: Arc<Mutex<Vec<(HeaderMap, Value)>>> = Arc::default();
    let c = captured.clone();
    let app = Router::new().route(
        "/emails",
        post(move |headers: HeaderMap, Json(v): Json<Value>| {
            let c = c.clone();
            async move {
                c.lock().unwrap().push((headers, v));
                Json(json!({ "id": "49a3999c-0ce1-4ea6-ab68-afcd6dc2e794" }))
            }
        }),
    );
    let addr = serve(app).await;

    let client = ResendClient::new(
        "re_test".into(),
        "Monitor <alerts@example.com>".parse().unwrap(),
        vec![
            "a@example.com".parse().unwrap(),
            "b@example.com".parse().unwrap(),
        ],
    )
    .with_endpoint(format!("http://{addr}/emails"));

    let id = client
        .send(&email_message(&record(), "29TH"))
        .await
        .expect("send ok");
    assert_eq!(id, "49a3999c-0ce1-4ea6-ab68-afcd6dc2e794");

    let calls = captured.lock().unwrap();
    let (headers, v) = &calls[0];
    assert_eq!(headers.get("authorization").unwrap(), "Bearer re_test");
    assert_eq!(v["subject"], "Orlando PD Alert: 29TH - General investigation");
    assert_eq!(v["to"], json!(["a@example.com", "b@example.com"]));
    assert!(v["from"].as_str().unwrap().contains("alerts@example.com"));
    assert!(v["html"].as_str().unwrap().contains("2400 BLOCK 29TH ST"));
    assert!(v["text"].as_str().unwrap().contains("Incident Number: 2025-00192513"));
}

#[tokio::test]
async fn resend_rejection_is_an_error() {
    let app = Router::new().route(
        "/emails",
        post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "message": "bad from" }))) }),
    );
    let addr = serve(app).await;

    let client = ResendClient::new(
        "re_test".into(),
        "alerts@example.com".parse().unwrap(),
        vec!["a@example.com".parse().unwrap()],
    )
    .with_endpoint(format!("http://{addr}/emails"));

    assert!(client.send(&email_message(&record(), "29TH")).await.is_err());
}
