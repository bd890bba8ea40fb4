mod auth;

pub use auth::{require_auth, USER_SESSION_KEY, ADMIN_SESSION_KEY};
