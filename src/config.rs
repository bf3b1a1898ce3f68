use std::env;

/// Upper bound for `TOKEN_TTL_HOURS`: one year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    MySql,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub admin_name: String,
    pub seed_sample_issues: bool,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub supabase_bucket: Option<String>,
    pub frontend_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let store_backend = match var("STORE_BACKEND").as_deref() {
            None | Some("mysql") => StoreBackend::MySql,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::InvalidEnvVar(
                    "STORE_BACKEND".to_string(),
                    format!("expected mysql or memory, got {}", other),
                ))
            }
        };

        let config = Config {
            store_backend,
            db_host: var("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
            db_port: parse_or("DB_PORT", var("DB_PORT"), 3306)?,
            db_user: var("DB_USER").unwrap_or_else(|| "server".to_string()),
            db_password: var("DB_PASSWORD").unwrap_or_default(),
            db_name: var("DB_NAME").unwrap_or_else(|| "issue_tracker".to_string()),
            port: parse_or("PORT", var("PORT"), 5000)?,
            jwt_secret: var("JWT_SECRET")
                .ok_or_else(|| ConfigError::MissingEnvVar("JWT_SECRET".to_string()))?,
            token_ttl_hours: parse_or("TOKEN_TTL_HOURS", var("TOKEN_TTL_HOURS"), 24)?,
            admin_email: var("ADMIN_EMAIL"),
            admin_password: var("ADMIN_PASSWORD"),
            admin_name: var("ADMIN_NAME").unwrap_or_else(|| "System Admin".to_string()),
            seed_sample_issues: parse_or("SEED_SAMPLE_ISSUES", var("SEED_SAMPLE_ISSUES"), false)?,
            supabase_url: var("SUPABASE_URL").map(|u| u.trim_end_matches('/').to_string()),
            supabase_key: var("SUPABASE_KEY"),
            supabase_bucket: var("SUPABASE_BUCKET"),
            frontend_url: var("FRONTEND_URL"),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidEnvVar("PORT".to_string(), "must be a valid port number".to_string()));
        }
        if self.token_ttl_hours <= 0 {
            return Err(ConfigError::InvalidEnvVar("TOKEN_TTL_HOURS".to_string(), "must be positive".to_string()));
        }
        if self.token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            return Err(ConfigError::InvalidEnvVar(
                "TOKEN_TTL_HOURS".to_string(),
                format!("must be at most {}", MAX_TOKEN_TTL_HOURS),
            ));
        }
        if self.store_backend == StoreBackend::MySql {
            if self.db_host.is_empty() {
                return Err(ConfigError::InvalidEnvVar("DB_HOST".to_string(), "cannot be empty".to_string()));
            }
            if self.db_name.is_empty() {
                return Err(ConfigError::InvalidEnvVar("DB_NAME".to_string(), "cannot be empty".to_string()));
            }
        }
        if self.admin_email.is_some() != self.admin_password.is_some() {
            return Err(ConfigError::InvalidEnvVar(
                "ADMIN_EMAIL".to_string(),
                "ADMIN_EMAIL and ADMIN_PASSWORD must be set together".to_string(),
            ));
        }
        Ok(())
    }

    /// Supabase settings, present only when all three variables are set.
    pub fn supabase(&self) -> Option<(&str, &str, &str)> {
        match (&self.supabase_url, &self.supabase_key, &self.supabase_bucket) {
            (Some(url), Some(key), Some(bucket)) => Some((url, key, bucket)),
            _ => None,
        }
    }

    pub fn database_url(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.db_user, self.db_password, self.db_host, self.db_port, self.db_name
        )
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(v) => v
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.store_backend, StoreBackend::MySql);
        assert_eq!(config.port, 5000);
        assert_eq!(config.db_port, 3306);
        assert_eq!(config.token_ttl_hours, 24);
        assert!(!config.seed_sample_issues);
        assert!(config.supabase().is_none());
        assert_eq!(config.database_url(), "mysql://server:@localhost:3306/issue_tracker");
    }

    #[test]
    fn test_jwt_secret_required() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingEnvVar(_))));
        assert!(matches!(load(&[("JWT_SECRET", "  ")]), Err(ConfigError::MissingEnvVar(_))));
    }

    #[test]
    fn test_invalid_values() {
        assert!(load(&[("JWT_SECRET", "x"), ("PORT", "http")]).is_err());
        assert!(load(&[("JWT_SECRET", "x"), ("STORE_BACKEND", "redis")]).is_err());
        assert!(load(&[("JWT_SECRET", "x"), ("TOKEN_TTL_HOURS", "0")]).is_err());
        assert!(load(&[("JWT_SECRET", "x"), ("ADMIN_EMAIL", "admin@community.com")]).is_err());
    }

    #[test]
    fn test_token_ttl_upper_bound() {
        let config = load(&[("JWT_SECRET", "x"), ("TOKEN_TTL_HOURS", "8760")]).unwrap();
        assert_eq!(config.token_ttl_hours, MAX_TOKEN_TTL_HOURS);

        let err = load(&[("JWT_SECRET", "x"), ("TOKEN_TTL_HOURS", "3000000000")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "TOKEN_TTL_HOURS"));
    }

    #[test]
    fn test_supabase_settings() {
        let config = load(&[
            ("JWT_SECRET", "x"),
            ("STORE_BACKEND", "memory"),
            ("SUPABASE_URL", "https://proj.supabase.co/"),
            ("SUPABASE_KEY", "service-key"),
            ("SUPABASE_BUCKET", "issue-photos"),
        ])
        .unwrap();
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(
            config.supabase(),
            Some(("https://proj.supabase.co", "service-key", "issue-photos"))
        );
    }
}
