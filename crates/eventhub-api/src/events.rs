use axum::{
    extract::{Path, Query, State},
    response::{Html, Response},
};
use tracing::debug;

use eventhub_types::api::UserQuery;

use crate::auth::{AppState, blocking, found};
use crate::error::{AppError, UserFault};
use crate::{engine, pages, query};

pub async fn list_events(
    State(state): State<AppState>,
    Query(q): Query<UserQuery>,
) -> Result<Html<String>, UserFault> {
    let events = blocking(&state, |s| query::list_events(&s.db))
        .await
        .map_err(|e| e.for_user(&q.user))?;
    Ok(Html(pages::events(&q.user, &events)))
}

/// Identity comes straight from `?user=`; nothing checks it.
pub async fn register_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Query(q): Query<UserQuery>,
) -> Result<Response, UserFault> {
    let user = q.user.clone();
    let result = blocking(&state, move |s| {
        engine::register_for_event(&s.db, &user, event_id)
    })
    .await;

    match result {
        Ok(()) => Ok(found(&pages::with_user("/my-events", &q.user))),
        Err(AppError::EventNotFound(id)) => {
            debug!("Ignoring registration for unknown event {}", id);
            Ok(found(&pages::with_user("/events", &q.user)))
        }
        Err(e) => Err(e.for_user(&q.user)),
    }
}

pub async fn my_events(
    State(state): State<AppState>,
    Query(q): Query<UserQuery>,
) -> Result<Html<String>, UserFault> {
    let user = q.user.clone();
    let events = blocking(&state, move |s| query::list_my_events(&s.db, &user))
        .await
        .map_err(|e| e.for_user(&q.user))?;
    Ok(Html(pages::my_events(&q.user, &events)))
}

pub async fn checkout(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let total = blocking(&state, |s| Ok(s.checkout.total()?)).await?;
    Ok(Html(pages::checkout(total)))
}
