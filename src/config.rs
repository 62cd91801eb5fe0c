use std::env;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// One year.
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;
/// Thirty days.
const MAX_POST_RATE_WINDOW_SECS: i64 = 30 * 24 * 3600;

#[derive(Clone)]
pub struct Config {
    pub mongo_uri: String,
    pub database_name: String,
    pub jwt_secret: String,
    pub bind_address: String,
    pub frontend_origin: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub ip_hash_salt: String,
    /// Posts one ip hash may create per window.
    pub post_rate_limit: u64,
    pub post_rate_window_secs: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. The first present name in each
    /// alias list wins.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first_of = |keys: &[&str]| keys.iter().find_map(|k| lookup(k).filter(|v| !v.is_empty()));

        let mongo_uri = first_of(&["MONGODB_URI", "MONGO_URI"])
            .ok_or_else(|| ConfigError::MissingVar("MONGODB_URI".to_string()))?;
        let jwt_secret = first_of(&["JWT_SECRET", "NEXTAUTH_SECRET"])
            .ok_or_else(|| ConfigError::MissingVar("JWT_SECRET".to_string()))?;

        let bcrypt_cost = parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::InvalidValue(
                "BCRYPT_COST".to_string(),
                format!("{} is outside 4..=31", bcrypt_cost),
            ));
        }

        let token_ttl_hours: i64 = parse_or(&lookup, "TOKEN_TTL_HOURS", 24)?;
        let post_rate_window_secs: i64 = parse_or(&lookup, "POST_RATE_WINDOW_SECS", 3600)?;
        for (key, value, max) in [
            ("TOKEN_TTL_HOURS", token_ttl_hours, MAX_TOKEN_TTL_HOURS),
            ("POST_RATE_WINDOW_SECS", post_rate_window_secs, MAX_POST_RATE_WINDOW_SECS),
        ] {
            if !(1..=max).contains(&value) {
                return Err(ConfigError::InvalidValue(
                    key.to_string(),
                    format!("{} is outside 1..={}", value, max),
                ));
            }
        }

        Ok(Self {
            mongo_uri,
            database_name: lookup("DATABASE_NAME").unwrap_or_else(|| "therapy".to_string()),
            jwt_secret,
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            frontend_origin: lookup("FRONTEND_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            token_ttl_hours,
            bcrypt_cost,
            ip_hash_salt: lookup("IP_HASH_SALT").unwrap_or_else(|| "peer-support".to_string()),
            post_rate_limit: parse_or(&lookup, "POST_RATE_LIMIT", 5)?,
            post_rate_window_secs,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
