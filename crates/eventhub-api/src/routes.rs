use std::any::Any;

use axum::{Router, response::Response, routing::get};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::auth::{self, AppState, found};
use crate::error::{internal_error, panic_message};
use crate::events;

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/", get(|| async { found("/login") }))
        .route("/health", get(|| async { "ok" }))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/events", get(events::list_events))
        .route("/register_event/{event_id}", get(events::register_event))
        .route("/my-events", get(events::my_events))
        .route("/checkout", get(events::checkout))
        .with_state(state);

    with_layers(routes)
}

/// Panic recovery and request tracing, outermost last.
pub fn with_layers(routes: Router) -> Router {
    routes
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic_message(err.as_ref());
    error!("Handler panicked: {}", detail);
    internal_error(&detail)
}
