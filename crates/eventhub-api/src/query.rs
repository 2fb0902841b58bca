use eventhub_db::Database;
use eventhub_types::models::{Event, MyEvent};

use crate::error::AppError;

/// Every event, ordered by id.
pub fn list_events(db: &Database) -> Result<Vec<Event>, AppError> {
    let events = db
        .list_events()?
        .into_iter()
        .map(|row| Event {
            id: row.id,
            name: row.name,
            fee: row.fee,
        })
        .collect();
    Ok(events)
}

/// Events `identity` is registered for, as name and fee.
pub fn list_my_events(db: &Database, identity: &str) -> Result<Vec<MyEvent>, AppError> {
    let events = db
        .list_events_for_user(identity)?
        .into_iter()
        .map(|row| MyEvent {
            name: row.name,
            fee: row.fee,
        })
        .collect();
    Ok(events)
}
