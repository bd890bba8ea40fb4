use async_trait::async_trait;
use crate::errors::StoreResult;
use crate::models::{Reading, User, UserSummary};

/// Account and history persistence, keyed by unique username.
///
/// Each method is a single-key operation; there are no multi-user
/// transactions. History is append-only apart from `clear_history`.
#[async_trait]
pub trait UserStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    /// Inserts a new account. Fails with `StoreError::Duplicate` and leaves the
    /// existing record untouched if the username is taken.
    async fn create_user(&self, user: &User) -> StoreResult<()>;

    /// Loads the account with its full history.
    async fn find_user(&self, username: &str) -> StoreResult<Option<User>>;

    /// All accounts sorted by username.
    async fn list_users(&self) -> StoreResult<Vec<UserSummary>>;

    async fn set_password_hash(&self, username: &str, password_hash: &str) -> StoreResult<()>;

    /// Returns whether the user existed.
    async fn delete_user(&self, username: &str) -> StoreResult<bool>;

    async fn append_reading(&self, username: &str, reading: &Reading) -> StoreResult<()>;

    /// Empties the history and returns how many readings were removed.
    async fn clear_history(&self, username: &str) -> StoreResult<usize>;
}
