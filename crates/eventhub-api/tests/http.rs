use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use eventhub_api::checkout::{Checkout, FixedCheckout};
use eventhub_api::{AppStateInner, router};
use eventhub_db::{Database, StoreOptions};

struct TestApp {
    _dir: TempDir,
    state: Arc<AppStateInner>,
    app: Router,
}

fn app() -> TestApp {
    app_with(Box::new(FixedCheckout::new(1250)))
}

fn app_with(checkout: Box<dyn Checkout>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("http.db"), &StoreOptions::default()).unwrap();
    db.seed_events(&[("Hack Night".to_string(), 500), ("Workshop".to_string(), 250)])
        .unwrap();

    let state = Arc::new(AppStateInner {
        db,
        checkout,
    });
    TestApp {
        _dir: dir,
        app: router(state.clone()),
        state,
    }
}

async fn get(app: &Router, uri: &str) -> Response {
    app.clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_form(app: &Router, uri: &str, body: &str) -> Response {
    app.clone()
        .oneshot(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn text(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(resp: &Response) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn full_flow() {
    let t = app();

    let resp = post_form(&t.app, "/register", "username=alice&password=pw1").await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login");

    let resp = post_form(&t.app, "/login", "username=alice&password=pw1").await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/events?user=alice");

    let resp = get(&t.app, "/events?user=alice").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = text(resp).await;
    assert!(body.contains("Hack Night"));
    assert!(body.contains("Workshop"));

    let resp = get(&t.app, "/register_event/1?user=alice").await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/my-events?user=alice");

    let resp = get(&t.app, "/my-events?user=alice").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = text(resp).await;
    assert!(body.contains("<td>Hack Night</td><td>500</td>"));
    assert!(!body.contains("Workshop"));
}

#[tokio::test]
async fn duplicate_username_is_inline_text() {
    let t = app();
    post_form(&t.app, "/register", "username=alice&password=pw1").await;

    let resp = post_form(&t.app, "/register", "username=alice&password=other").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(text(resp).await, "Username already exists. Try a different one.");
}

#[tokio::test]
async fn bad_login_rerenders_form() {
    let t = app();
    post_form(&t.app, "/register", "username=alice&password=pw1").await;

    let resp = post_form(&t.app, "/login", "username=alice&password=nope").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(header::LOCATION).is_none());
    let body = text(resp).await;
    assert!(body.contains("Invalid username or password"));
    assert!(body.contains(r#"action="/login""#));
}

#[tokio::test]
async fn unknown_event_redirects_to_events() {
    let t = app();

    let resp = get(&t.app, "/register_event/999?user=alice").await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/events?user=alice");
    assert_eq!(t.state.db.count_registrations("alice").unwrap(), 0);
}

#[tokio::test]
async fn repeat_registration_keeps_one_row() {
    let t = app();

    for _ in 0..3 {
        let resp = get(&t.app, "/register_event/2?user=bob").await;
        assert_eq!(location(&resp), "/my-events?user=bob");
    }
    assert_eq!(t.state.db.count_registrations("bob").unwrap(), 1);
}

#[tokio::test]
async fn identity_is_encoded_in_redirects() {
    let t = app();

    let resp = get(&t.app, "/register_event/1?user=a%20b%26c").await;
    assert_eq!(location(&resp), "/my-events?user=a+b%26c");
    assert_eq!(t.state.db.count_registrations("a b&c").unwrap(), 1);
}

#[tokio::test]
async fn empty_my_events() {
    let t = app();
    let resp = get(&t.app, "/my-events?user=nobody").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(text(resp).await.contains("not registered"));
}

#[tokio::test]
async fn checkout_shows_total() {
    let t = app();
    let resp = get(&t.app, "/checkout").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(text(resp).await.contains(r#"<span id="total">1250</span>"#));
}

struct UnreachableCheckout;

impl Checkout for UnreachableCheckout {
    fn total(&self) -> anyhow::Result<i64> {
        Err(anyhow::anyhow!("fee service <down>"))
    }
}

struct PanickingCheckout;

impl Checkout for PanickingCheckout {
    fn total(&self) -> anyhow::Result<i64> {
        panic!("fee table corrupt")
    }
}

#[tokio::test]
async fn checkout_failure_renders_fault_page() {
    let t = app_with(Box::new(UnreachableCheckout));

    let resp = get(&t.app, "/checkout").await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = text(resp).await;
    assert!(body.contains("fee service &lt;down&gt;"));
    assert!(!body.contains("<down>"));
}

#[tokio::test]
async fn checkout_panic_renders_fault_page() {
    let t = app_with(Box::new(PanickingCheckout));

    let resp = get(&t.app, "/checkout").await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(text(resp).await.contains("fee table corrupt"));

    // The server keeps answering after the panic.
    assert_eq!(text(get(&t.app, "/health").await).await, "ok");
}

#[tokio::test]
async fn missing_fields_and_identity_rejected() {
    let t = app();

    let resp = post_form(&t.app, "/register", "username=alice").await;
    assert!(resp.status().is_client_error());

    let resp = get(&t.app, "/events").await;
    assert!(resp.status().is_client_error());
}

#[tokio::test]
async fn pages_and_probes() {
    let t = app();

    assert_eq!(get(&t.app, "/register").await.status(), StatusCode::OK);
    assert_eq!(get(&t.app, "/login").await.status(), StatusCode::OK);
    assert_eq!(text(get(&t.app, "/health").await).await, "ok");

    let resp = get(&t.app, "/").await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations() {
    let t = app();

    let mut tasks = Vec::new();
    for i in 0..20 {
        let app = t.app.clone();
        let uri = format!("/register_event/{}?user=user{}", 1 + i % 2, i % 5);
        tasks.push(tokio::spawn(async move { get(&app, &uri).await.status() }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::FOUND);
    }

    for i in 0..5 {
        let user = format!("user{}", i);
        assert_eq!(t.state.db.count_registrations(&user).unwrap(), 2);
    }
}
