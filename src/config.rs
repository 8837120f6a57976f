use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "eCliniq";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND: &str = "0.0.0.0:3001";
pub const DEFAULT_TOKEN_TTL_HOURS: u32 = 24;
pub const DATABASE_FILE: &str = "medical-practice.db";

/// Development-only signing secret used when `JWT_SECRET` is unset.
pub const DEFAULT_JWT_SECRET: &str = "ecliniq-development-secret-change-me";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("Cannot determine home directory; set ECLINIQ_DB_PATH")]
    NoHomeDir,
}

/// Get the application data directory
/// ~/eCliniq/ on all platforms
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_NAME))
}

pub fn default_db_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join(DATABASE_FILE))
}

/// Log filter applied when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "ecliniq=info,ecliniq_lib=info,tower_http=warn"
}

/// Runtime settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_hours: u32,
}

impl AppConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind = match (get("ECLINIQ_BIND"), get("PORT")) {
            (Some(addr), _) => parse_value("ECLINIQ_BIND", &addr)?,
            (None, Some(port)) => {
                let port: u16 = parse_value("PORT", &port)?;
                SocketAddr::from(([0, 0, 0, 0], port))
            }
            (None, None) => parse_value("ECLINIQ_BIND", DEFAULT_BIND)?,
        };

        let db_path = match get("ECLINIQ_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_db_path().ok_or(ConfigError::NoHomeDir)?,
        };

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set; using the development secret");
                DEFAULT_JWT_SECRET.to_string()
            }
        };

        let token_ttl_hours = match get("ECLINIQ_TOKEN_TTL_HOURS") {
            Some(hours) => match parse_value::<u32>("ECLINIQ_TOKEN_TTL_HOURS", &hours)? {
                0 => {
                    return Err(ConfigError::InvalidValue {
                        key: "ECLINIQ_TOKEN_TTL_HOURS",
                        value: hours,
                    })
                }
                n => n,
            },
            None => DEFAULT_TOKEN_TTL_HOURS,
        };

        Ok(Self {
            bind,
            db_path,
            jwt_secret,
            token_ttl_hours,
        })
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}
