use chrono::{DateTime, Duration, Utc};
use numthread_core::{
    random_secret, DiscussionStore, JwtManager, MemoryStore, NumthreadError, PasswordManager,
    Settings,
};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DiscussionStore>,
    pub passwords: Arc<PasswordManager>,
    pub jwt: Arc<JwtManager>,
    pub settings: Arc<Settings>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(settings: Settings) -> numthread_core::Result<Self> {
        Self::with_store(settings, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(
        settings: Settings,
        store: Arc<dyn DiscussionStore>,
    ) -> numthread_core::Result<Self> {
        let ttl = i64::try_from(settings.auth.jwt_expiry_hours)
            .ok()
            .and_then(Duration::try_hours)
            .ok_or_else(|| {
                NumthreadError::Config(format!(
                    "auth.jwt_expiry_hours out of range: {}",
                    settings.auth.jwt_expiry_hours
                ))
            })?;

        let secret = match settings.auth.jwt_secret.clone() {
            Some(secret) => secret,
            None => {
                warn!("No JWT secret configured, using a random one; tokens will not survive a restart");
                random_secret()
            }
        };

        Ok(Self {
            store,
            passwords: Arc::new(PasswordManager::new()),
            jwt: Arc::new(JwtManager::new(secret, ttl)),
            settings: Arc::new(settings),
            started_at: Utc::now(),
        })
    }
}
