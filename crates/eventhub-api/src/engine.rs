use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use std::sync::LazyLock;
use tracing::{debug, info};

use eventhub_db::{Database, RegistrationInsert, UserInsert};

use crate::error::AppError;

/// Hash verified against when the username does not exist, so a miss costs
/// the same Argon2 work as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> = LazyLock::new(|| {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(b"eventhub-dummy-password", &salt)
        .map(|hash| hash.to_string())
        .ok()
});

/// Create an account. Passwords are stored as Argon2id PHC strings.
pub fn create_user(db: &Database, username: &str, password: &str) -> Result<(), AppError> {
    // Skip the hash for the common duplicate case; the insert still decides.
    if db.get_user(username)?.is_some() {
        return Err(AppError::DuplicateUsername);
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Password hashing failed: {}", e))?
        .to_string();

    match db.insert_user(username, &password_hash)? {
        UserInsert::Created => {
            info!("User created: {}", username);
            Ok(())
        }
        UserInsert::UsernameTaken => Err(AppError::DuplicateUsername),
    }
}

/// Check a username/password pair and return the identity it grants.
///
/// An unknown username and a wrong password fail the same way.
pub fn authenticate(db: &Database, username: &str, password: &str) -> Result<String, AppError> {
    let Some(user) = db.get_user(username)? else {
        burn_verify(password);
        return Err(AppError::InvalidCredentials);
    };

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow!("Stored password for {} is not a valid hash: {}", username, e))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::InvalidCredentials)?;

    Ok(user.username)
}

fn burn_verify(password: &str) {
    if let Some(parsed) = DUMMY_HASH.as_deref().and_then(|h| PasswordHash::new(h).ok()) {
        let _ = Argon2::default().verify_password(password.as_bytes(), &parsed);
    }
}

/// Sign `identity` up for `event_id`. Registering twice is a no-op.
pub fn register_for_event(db: &Database, identity: &str, event_id: i64) -> Result<(), AppError> {
    match db.insert_registration(identity, event_id)? {
        RegistrationInsert::Created => {
            info!("{} registered for event {}", identity, event_id);
            Ok(())
        }
        RegistrationInsert::AlreadyRegistered => {
            debug!("{} already registered for event {}", identity, event_id);
            Ok(())
        }
        RegistrationInsert::EventNotFound => Err(AppError::EventNotFound(event_id)),
    }
}
