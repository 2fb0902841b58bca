pub mod auth;
pub mod checkout;
pub mod engine;
pub mod error;
pub mod events;
pub mod pages;
pub mod query;
pub mod routes;

pub use auth::{AppState, AppStateInner};
pub use error::AppError;
pub use routes::router;
