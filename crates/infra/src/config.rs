//! Configuration loading and representation.
//!
//! Everything comes from environment variables; `from_lookup` takes any
//! key → value source so tests do not have to touch the process environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use gateflow_approvals::{TemplateError, TemplateRegistry};

use crate::engine::EngineSettings;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has an invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("failed to read templates from {path}: {source}")]
    TemplatesIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid templates: {0}")]
    Templates(#[from] TemplateError),
}

/// Postgres settings, present when persistent stores are enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// `true` when `JWT_SECRET` was missing and the dev default is in use.
    pub jwt_secret_is_default: bool,
    pub templates_path: Option<PathBuf>,
    pub engine: EngineSettings,
    pub database: Option<DatabaseConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "BIND_ADDR",
                value: bind_raw.clone(),
                reason: e.to_string(),
            })?;

        let (jwt_secret, jwt_secret_is_default) = match get("JWT_SECRET") {
            Some(secret) => (secret, false),
            None => (DEV_JWT_SECRET.to_string(), true),
        };

        let defaults = EngineSettings::default();
        let engine = EngineSettings {
            max_attempts: parse_positive(&get, "FLOW_MAX_ATTEMPTS", defaults.max_attempts)?,
            request_timeout: Duration::from_millis(parse_positive(
                &get,
                "FLOW_REQUEST_TIMEOUT_MS",
                defaults.request_timeout.as_millis() as u32,
            )? as u64),
            audit_max_attempts: parse_positive(
                &get,
                "AUDIT_MAX_ATTEMPTS",
                defaults.audit_max_attempts,
            )?,
            ..defaults
        };

        let use_persistent = match get("USE_PERSISTENT_STORES") {
            None => false,
            Some(raw) => raw.trim().parse::<bool>().map_err(|e| ConfigError::Invalid {
                key: "USE_PERSISTENT_STORES",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
        };
        let database = if use_persistent {
            let url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
            Some(DatabaseConfig { url })
        } else {
            None
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            jwt_secret_is_default,
            templates_path: get("FLOW_TEMPLATES_PATH").map(PathBuf::from),
            engine,
            database,
        })
    }

    /// Template registry from `FLOW_TEMPLATES_PATH`, or the built-in set.
    pub fn load_templates(&self) -> Result<TemplateRegistry, ConfigError> {
        match &self.templates_path {
            None => Ok(TemplateRegistry::builtin()),
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| {
                    ConfigError::TemplatesIo {
                        path: path.clone(),
                        source,
                    }
                })?;
                Ok(TemplateRegistry::from_json(&raw)?)
            }
        }
    }
}

fn parse_positive<G>(get: &G, key: &'static str, default: u32) -> Result<u32, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<u32>() {
        Ok(0) => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "must be greater than zero".to_string(),
        }),
        Ok(v) => Ok(v),
        Err(e) => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: e.to_string(),
        }),
    }
}
