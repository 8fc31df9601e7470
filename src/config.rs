use std::env;
use thiserror::Error;

pub const DEFAULT_JWT_SECRET: &str = "your-secret-key-change-in-production";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Runtime configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub api_prefix: String,
    pub jwt_secret: String,
    pub jwt_expiry_minutes: i64,
    pub frontend_url: String,
    pub cors_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let frontend_url = "http://localhost:3000".to_string();
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 5001,
            db_path: "./data/todo.sled".to_string(),
            api_prefix: "/api".to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_expiry_minutes: 5,
            cors_origins: vec![frontend_url.clone()],
            frontend_url,
        }
    }
}

impl AppConfig {
    /// Loads `.env` (if any) and overlays environment variables on the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "PORT".to_string(),
                message: e.to_string(),
            })?,
            None => defaults.port,
        };

        let jwt_expiry_minutes = match lookup("JWT_EXPIRY_MINUTES") {
            Some(raw) => {
                let minutes = raw.trim().parse::<i64>().map_err(|e| ConfigError::InvalidValue {
                    key: "JWT_EXPIRY_MINUTES".to_string(),
                    message: e.to_string(),
                })?;
                if minutes <= 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "JWT_EXPIRY_MINUTES".to_string(),
                        message: "must be positive".to_string(),
                    });
                }
                minutes
            }
            None => defaults.jwt_expiry_minutes,
        };

        let frontend_url = lookup("FRONTEND_URL").unwrap_or(defaults.frontend_url);
        let cors_origins = match lookup("CORS_ORIGIN") {
            Some(raw) => raw
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            None => vec![frontend_url.clone()],
        };

        Ok(AppConfig {
            host: lookup("HOST").unwrap_or(defaults.host),
            port,
            db_path: lookup("DB_PATH").unwrap_or(defaults.db_path),
            api_prefix: normalize_prefix(&lookup("API_PREFIX").unwrap_or(defaults.api_prefix)),
            jwt_secret: lookup("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_expiry_minutes,
            frontend_url,
            cors_origins,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|origin| origin == "*")
    }
}

// "" and "/" both mean "mount at root"; otherwise a leading slash and no trailing one.
fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
