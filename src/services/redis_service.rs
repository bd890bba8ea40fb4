use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, Script};
use serde::{Deserialize, Serialize};
use crate::errors::{StoreError, StoreResult};
use crate::models::{Reading, User, UserSummary};
use super::store::UserStore;

// Credentials document; the history lives in its own list so that appends
// never rewrite the account.
#[derive(Debug, Serialize, Deserialize)]
struct StoredAccount {
    username: String,
    password_hash: String,
    #[serde(default)]
    is_admin: bool,
}

/// Key names under one namespace:
/// `user:<name>` JSON account, `history:<name>` list of JSON readings
/// (oldest first) and `users`, the set of all usernames.
#[derive(Debug, Clone)]
struct KeySpace {
    namespace: String,
}

impl KeySpace {
    fn user(&self, username: &str) -> String {
        format!("{}:user:{}", self.namespace, username)
    }

    fn history(&self, username: &str) -> String {
        format!("{}:history:{}", self.namespace, username)
    }

    fn users(&self) -> String {
        format!("{}:users", self.namespace)
    }
}

// Every write that depends on the account existing runs as one script, so a
// concurrent delete either happens entirely before or entirely after it.

// KEYS: user, history, users. ARGV: account JSON, username, readings...
// Any history left under the name is dropped so a new account starts empty.
const CREATE_USER: &str = r"
if not redis.call('SET', KEYS[1], ARGV[1], 'NX') then
    return 0
end
redis.call('SADD', KEYS[3], ARGV[2])
redis.call('DEL', KEYS[2])
for i = 3, #ARGV do
    redis.call('RPUSH', KEYS[2], ARGV[i])
end
return 1
";

// KEYS: user. ARGV: password hash. Returns 0 when the account is gone.
const SET_PASSWORD_HASH: &str = r"
local raw = redis.call('GET', KEYS[1])
if not raw then
    return 0
end
local account = cjson.decode(raw)
account.password_hash = ARGV[1]
redis.call('SET', KEYS[1], cjson.encode(account))
return 1
";

// KEYS: user, history. ARGV: reading JSON. Returns -1 when the account is gone.
const APPEND_READING: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return -1
end
return redis.call('RPUSH', KEYS[2], ARGV[1])
";

// KEYS: user, history. Returns the cleared length, or -1 when the account is gone.
const CLEAR_HISTORY: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return -1
end
local cleared = redis.call('LLEN', KEYS[2])
redis.call('DEL', KEYS[2])
return cleared
";

#[derive(Clone)]
struct Scripts {
    create_user: Script,
    set_password_hash: Script,
    append_reading: Script,
    clear_history: Script,
}

impl Scripts {
    fn new() -> Self {
        Self {
            create_user: Script::new(CREATE_USER),
            set_password_hash: Script::new(SET_PASSWORD_HASH),
            append_reading: Script::new(APPEND_READING),
            clear_history: Script::new(CLEAR_HISTORY),
        }
    }
}

#[derive(Clone)]
pub struct RedisService {
    conn: ConnectionManager,
    keys: KeySpace,
    scripts: Scripts,
}

impl RedisService {
    pub async fn connect(client: Client, namespace: impl Into<String>) -> redis::RedisResult<Self> {
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            keys: KeySpace { namespace: namespace.into() },
            scripts: Scripts::new(),
        })
    }

    async fn get_account(&self, username: &str) -> StoreResult<Option<StoredAccount>> {
        let mut conn = self.conn.clone();
        let data: Option<String> = conn.get(self.keys.user(username)).await?;
        data.map(|d| serde_json::from_str(&d))
            .transpose()
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl UserStore for RedisService {
    fn backend_tag(&self) -> &'static str {
        "redis"
    }

    async fn create_user(&self, user: &User) -> StoreResult<()> {
        let account = StoredAccount {
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            is_admin: user.is_admin,
        };

        let mut invocation = self.scripts.create_user.prepare_invoke();
        invocation
            .key(self.keys.user(&user.username))
            .key(self.keys.history(&user.username))
            .key(self.keys.users())
            .arg(serde_json::to_string(&account)?)
            .arg(&user.username);
        for reading in &user.history {
            invocation.arg(serde_json::to_string(reading)?);
        }

        let mut conn = self.conn.clone();
        let created: i64 = invocation.invoke_async(&mut conn).await?;
        if created == 0 {
            return Err(StoreError::Duplicate(user.username.clone()));
        }
        Ok(())
    }

    async fn find_user(&self, username: &str) -> StoreResult<Option<User>> {
        let mut conn = self.conn.clone();
        let (data, raw): (Option<String>, Vec<String>) = redis::pipe()
            .atomic()
            .get(self.keys.user(username))
            .lrange(self.keys.history(username), 0, -1)
            .query_async(&mut conn)
            .await?;

        let Some(data) = data else {
            return Ok(None);
        };
        let account: StoredAccount = serde_json::from_str(&data)?;
        let history = raw
            .iter()
            .map(|r| serde_json::from_str::<Reading>(r))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(User {
            username: account.username,
            password_hash: account.password_hash,
            history,
            is_admin: account.is_admin,
        }))
    }

    async fn list_users(&self) -> StoreResult<Vec<UserSummary>> {
        let mut conn = self.conn.clone();
        let mut names: Vec<String> = conn.smembers(self.keys.users()).await?;
        names.sort();

        let mut users = Vec::with_capacity(names.len());
        for name in names {
            match self.get_account(&name).await? {
                Some(account) => {
                    let reading_count: usize = conn.llen(self.keys.history(&name)).await?;
                    users.push(UserSummary {
                        username: account.username,
                        is_admin: account.is_admin,
                        reading_count,
                    });
                }
                None => tracing::warn!("User {} is listed but has no account record", name),
            }
        }
        Ok(users)
    }

    async fn set_password_hash(&self, username: &str, password_hash: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let updated: i64 = self
            .scripts
            .set_password_hash
            .key(self.keys.user(username))
            .arg(password_hash)
            .invoke_async(&mut conn)
            .await?;

        if updated == 0 {
            return Err(StoreError::NotFound(username.to_string()));
        }
        Ok(())
    }

    async fn delete_user(&self, username: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let (removed,): (usize,) = redis::pipe()
            .atomic()
            .del(self.keys.user(username))
            .del(self.keys.history(username)).ignore()
            .srem(self.keys.users(), username).ignore()
            .query_async(&mut conn)
            .await?;
        Ok(removed > 0)
    }

    async fn append_reading(&self, username: &str, reading: &Reading) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let length: i64 = self
            .scripts
            .append_reading
            .key(self.keys.user(username))
            .key(self.keys.history(username))
            .arg(serde_json::to_string(reading)?)
            .invoke_async(&mut conn)
            .await?;

        if length < 0 {
            return Err(StoreError::NotFound(username.to_string()));
        }
        Ok(())
    }

    async fn clear_history(&self, username: &str) -> StoreResult<usize> {
        let mut conn = self.conn.clone();
        let cleared: i64 = self
            .scripts
            .clear_history
            .key(self.keys.user(username))
            .key(self.keys.history(username))
            .invoke_async(&mut conn)
            .await?;

        usize::try_from(cleared).map_err(|_| StoreError::NotFound(username.to_string()))
    }
}
