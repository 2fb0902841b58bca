/// Database row types. These map directly to SQLite rows and stay distinct
/// from the eventhub-types models so the DB layer has no serde surface.

pub struct UserRow {
    pub username: String,
    pub password: String,
    pub created_at: String,
}

pub struct EventRow {
    pub id: i64,
    pub name: String,
    pub fee: i64,
}

/// A registration joined against its event.
pub struct MyEventRow {
    pub name: String,
    pub fee: i64,
}
