use crate::{Author, NumthreadError, Result, User, UserId};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: UserId,
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<&AuthContext> for Author {
    fn from(ctx: &AuthContext) -> Self {
        Self {
            user_id: ctx.user_id,
            username: ctx.username.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    username: String,
    iat: usize,
    exp: usize,
}

pub struct PasswordManager {
    argon2: Argon2<'static>,
}

impl Default for PasswordManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordManager {
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| NumthreadError::PasswordHash(e.to_string()))?;

        Ok(password_hash.to_string())
    }

    pub fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| NumthreadError::PasswordHash(e.to_string()))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}

/// Issues and checks HS256 bearer tokens.
pub struct JwtManager {
    secret: SecretString,
    ttl: Duration,
}

impl JwtManager {
    pub fn new(secret: SecretString, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn create_token(&self, user: &User) -> Result<String> {
        let issued_at = Utc::now();
        let expires_at = issued_at + self.ttl;

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            iat: issued_at.timestamp().max(0) as usize,
            exp: expires_at.timestamp().max(0) as usize,
        };

        let key = EncodingKey::from_secret(self.secret.expose_secret().as_bytes());
        encode(&Header::new(Algorithm::HS256), &claims, &key)
            .map_err(|e| NumthreadError::TokenGeneration(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<AuthContext> {
        let key = DecodingKey::from_secret(self.secret.expose_secret().as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data =
            decode::<Claims>(token, &key, &validation).map_err(|_| NumthreadError::InvalidToken)?;
        let claims = token_data.claims;

        Ok(AuthContext {
            user_id: Uuid::parse_str(&claims.sub).map_err(|_| NumthreadError::InvalidToken)?,
            username: claims.username,
            issued_at: DateTime::from_timestamp(claims.iat as i64, 0).unwrap_or_default(),
            expires_at: DateTime::from_timestamp(claims.exp as i64, 0).unwrap_or_default(),
        })
    }
}

/// A fresh signing secret for deployments that do not configure one.
pub fn random_secret() -> SecretString {
    let bytes: [u8; 32] = rand::random();
    SecretString::from(general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

#[derive(Debug, Clone)]
pub enum AuthEvent {
    Registered { user_id: UserId, username: String },
    LoginSucceeded { user_id: UserId, username: String },
    LoginFailed { username: String, reason: String },
    TokenRejected { reason: String },
}

pub struct AuthLogger;

impl AuthLogger {
    pub fn log_event(event: AuthEvent) {
        use tracing::{info, warn};

        match event {
            AuthEvent::Registered { user_id, username } => {
                info!(user_id = %user_id, username = %username, "User registered");
            }
            AuthEvent::LoginSucceeded { user_id, username } => {
                info!(user_id = %user_id, username = %username, "Authentication success");
            }
            AuthEvent::LoginFailed { username, reason } => {
                warn!(username = %username, reason = %reason, "Authentication failure");
            }
            AuthEvent::TokenRejected { reason } => {
                warn!(reason = %reason, "Bearer token rejected");
            }
        }
    }
}
