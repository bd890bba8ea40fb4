use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use crate::config::{AdminConfig, Config};
use crate::errors::{AppError, AppResult};
use crate::services::{spawn_sampler, HostMetrics, SystemMonitor, UserStore};

// bcrypt is deliberately slow, so it runs on the blocking pool
pub async fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    let password = password.to_string();
    Ok(tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??)
}

pub async fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let password = password.to_string();
    let password_hash = password_hash.to_string();
    Ok(tokio::task::spawn_blocking(move || bcrypt::verify(password, &password_hash)).await??)
}

/// The configured administrator account. Only the bcrypt hash is kept.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub username: String,
    password_hash: String,
}

impl AdminCredentials {
    pub fn from_config(admin: &AdminConfig, bcrypt_cost: u32) -> AppResult<Self> {
        let password_hash = match (&admin.password_hash, &admin.password) {
            (Some(hash), _) if !hash.is_empty() => hash.clone(),
            (_, Some(plain)) if !plain.is_empty() => bcrypt::hash(plain, bcrypt_cost)?,
            _ => {
                return Err(AppError::AdminAuth(
                    "admin.password or admin.password_hash must be configured".into(),
                ))
            }
        };

        Ok(Self {
            username: admin.username.clone(),
            password_hash,
        })
    }

    pub async fn verify(&self, username: &str, password: &str) -> AppResult<bool> {
        if username != self.username {
            return Ok(false);
        }
        verify_password(password, &self.password_hash).await
    }
}

// Application state shared between handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub config: Arc<Config>,
    pub admin: Arc<AdminCredentials>,
    pub host_metrics: Arc<RwLock<HostMetrics>>,
}

impl AppState {
    pub fn new(store: Arc<dyn UserStore>, config: Config) -> AppResult<Self> {
        let admin = AdminCredentials::from_config(&config.admin, config.security.bcrypt_cost)?;
        let initial = SystemMonitor::new(Duration::ZERO).current();

        Ok(Self {
            store,
            admin: Arc::new(admin),
            host_metrics: Arc::new(RwLock::new(initial)),
            config: Arc::new(config),
        })
    }

    /// Keeps `host_metrics` fresh in the background so page loads never wait on a CPU sample.
    pub fn spawn_host_sampler(&self) -> JoinHandle<()> {
        let window = Duration::from_millis(self.config.admin.cpu_sample_ms);
        spawn_sampler(SystemMonitor::new(window), self.host_metrics.clone())
    }

    pub async fn hash_password(&self, password: &str) -> AppResult<String> {
        hash_password(password, self.config.security.bcrypt_cost).await
    }
}
