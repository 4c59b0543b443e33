//! Immutable run configuration, built once at startup from environment
//! variables and never re-read from process-wide state inside a worker.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),
    #[error("environment variable {name} has an invalid value {value:?}: {reason}")]
    InvalidVar {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything a worker needs to run, resolved once and passed explicitly.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    pub json_base_path: PathBuf,
    pub import_batch_size: usize,
    pub log_path: PathBuf,
    pub backup_retention_days: u32,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
    pub pool_wait_timeout_secs: u64,
}

impl RunContext {
    /// Builds a `RunContext` from environment variables, applying the
    /// defaults documented for each variable. `DB_USER`, `DB_PASSWORD`, and
    /// `DB_NAME` have no default and are required.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            db_host: env_or("DB_HOST", "localhost"),
            db_port: env_parsed_or("DB_PORT", 3306)?,
            db_user: env_required("DB_USER")?,
            db_password: env_required("DB_PASSWORD")?,
            db_name: env_required("DB_NAME")?,
            json_base_path: PathBuf::from(env_or("JSON_BASE_PATH", "/database/JSON")),
            import_batch_size: env_parsed_or("IMPORT_BATCH_SIZE", 75_000)?,
            log_path: PathBuf::from(env_or("LOG_PATH", "./logs")),
            backup_retention_days: env_parsed_or("BACKUP_RETENTION_DAYS", 7)?,
            connect_timeout_secs: env_parsed_or("CONNECT_TIMEOUT_SECS", 180)?,
            read_timeout_secs: env_parsed_or("READ_TIMEOUT_SECS", 600)?,
            write_timeout_secs: env_parsed_or("WRITE_TIMEOUT_SECS", 600)?,
            pool_wait_timeout_secs: env_parsed_or("POOL_WAIT_TIMEOUT_SECS", 600)?,
        })
    }

    pub fn mysql_url(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.db_user, self.db_password, self.db_host, self.db_port, self.db_name
        )
    }

    /// A connection URL to the server without a database selected, used to
    /// issue `CREATE DATABASE IF NOT EXISTS` before the real pool connects.
    pub fn mysql_server_url(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/",
            self.db_user, self.db_password, self.db_host, self.db_port
        )
    }
}

fn env_or(name: &'static str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

fn env_parsed_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value.parse().map_err(|e: T::Err| ConfigError::InvalidVar {
            name,
            value,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            "DB_HOST", "DB_PORT", "DB_USER", "DB_PASSWORD", "DB_NAME", "JSON_BASE_PATH",
            "IMPORT_BATCH_SIZE", "LOG_PATH", "BACKUP_RETENTION_DAYS",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn missing_required_var_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        let err = RunContext::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("DB_USER")));
    }

    #[test]
    fn defaults_apply_when_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("DB_USER", "root");
        std::env::set_var("DB_PASSWORD", "secret");
        std::env::set_var("DB_NAME", "procurement");
        let ctx = RunContext::from_env().unwrap();
        assert_eq!(ctx.db_host, "localhost");
        assert_eq!(ctx.import_batch_size, 75_000);
        assert_eq!(ctx.json_base_path, PathBuf::from("/database/JSON"));
        clear_env();
    }
}
