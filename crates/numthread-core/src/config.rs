use std::{collections::HashMap, env, path::Path};

use anyhow::{Context, Result};
use config as cfg;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::NumthreadError;

pub const ENV_PREFIX: &str = "NUMTHREAD";
pub const MIN_SECRET_LEN: usize = 16;

/// Deployment variables that override everything else, with the setting
/// each one maps to.
const LEGACY_OVERRIDES: [(&str, &str); 4] = [
    ("PORT", "server.port"),
    ("FRONTEND_URL", "server.frontend_url"),
    ("JWT_SECRET", "auth.jwt_secret"),
    ("JWT_EXPIRY_HOURS", "auth.jwt_expiry_hours"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Only origin allowed by CORS.
    pub frontend_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            frontend_url: "http://localhost:3000".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// A random secret is generated at startup when unset.
    pub jwt_secret: Option<SecretString>,
    pub jwt_expiry_hours: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_expiry_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Full,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Loads settings from the process environment.
    ///
    /// Sources, later ones winning: built-in defaults, `config_file` (or
    /// `config/default.{toml,yaml,json}` when present), `NUMTHREAD__*`
    /// variables, then `PORT`, `FRONTEND_URL`, `JWT_SECRET` and
    /// `JWT_EXPIRY_HOURS`.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        Self::load_from_sources(config_file, None)
    }

    /// Like [`Settings::load`], reading variables from `vars` instead of the
    /// process environment when given.
    pub fn load_from_sources(
        config_file: Option<&Path>,
        vars: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let mut builder = cfg::Config::builder();

        builder = match config_file {
            Some(path) => {
                info!("Using config file: {:?}", path);
                builder.add_source(cfg::File::from(path).required(true))
            }
            None => builder.add_source(cfg::File::with_name("config/default").required(false)),
        };

        builder = builder.add_source(
            cfg::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .source(vars.clone()),
        );

        for (var, key) in LEGACY_OVERRIDES {
            let value = match &vars {
                Some(vars) => vars.get(var).cloned(),
                None => env::var(var).ok(),
            };
            builder = builder
                .set_override_option(key, value)
                .with_context(|| format!("applying {var}"))?;
        }

        let settings: Settings = builder
            .build()
            .context("building configuration")?
            .try_deserialize()
            .context("deserializing configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> std::result::Result<(), NumthreadError> {
        if self.server.port == 0 {
            return Err(NumthreadError::Config("server.port must not be 0".into()));
        }
        let origin = &self.server.frontend_url;
        if origin.is_empty() || !origin.chars().all(|c| c.is_ascii_graphic()) {
            return Err(NumthreadError::Config(format!(
                "server.frontend_url is not a valid origin: {origin:?}"
            )));
        }
        if self.auth.jwt_expiry_hours == 0 {
            return Err(NumthreadError::Config(
                "auth.jwt_expiry_hours must be at least 1".into(),
            ));
        }
        if let Some(secret) = &self.auth.jwt_secret {
            if secret.expose_secret().chars().count() < MIN_SECRET_LEN {
                return Err(NumthreadError::Config(format!(
                    "auth.jwt_secret must be at least {MIN_SECRET_LEN} characters"
                )));
            }
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
