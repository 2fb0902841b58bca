use std::sync::Arc;

use axum::{
    Form,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use tracing::{error, info};

use eventhub_db::Database;
use eventhub_types::api::{LoginForm, RegisterForm};

use crate::checkout::Checkout;
use crate::engine;
use crate::error::AppError;
use crate::pages;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub checkout: Box<dyn Checkout>,
}

/// Run blocking store (and hashing) work off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&AppStateInner) -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            AppError::from(e)
        })?
}

/// 302 to `location`.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

pub async fn register_page() -> Html<String> {
    Html(pages::register())
}

pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    blocking(&state, move |s| {
        engine::create_user(&s.db, &form.username, &form.password)
    })
    .await?;

    Ok(found("/login"))
}

pub async fn login_page() -> Html<String> {
    Html(pages::login(None))
}

pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let identity = blocking(&state, move |s| {
        engine::authenticate(&s.db, &form.username, &form.password)
    })
    .await?;

    info!("{} logged in", identity);
    Ok(found(&pages::with_user("/events", &identity)))
}
