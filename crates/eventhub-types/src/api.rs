use serde::Deserialize;

// -- Auth forms --

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

// -- Identity --

/// Identity carried between pages as `?user=<name>`.
///
/// This is not authenticated: anyone can put any name here.
#[derive(Debug, Clone, Deserialize)]
pub struct UserQuery {
    pub user: String,
}

