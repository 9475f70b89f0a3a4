// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::content::location::CourseKey;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug)]
pub enum ConfigError {
    LoadError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::LoadError(msg) => write!(f, "Configuration load error: {}", msg),
            ConfigError::ValidationError(msg) => {
                write!(f, "Configuration validation error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub blocking: BlockingConfig,
    #[serde(default)]
    pub courses: Vec<CourseConfig>,
}

#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    pub store: StoreConfig,
    pub blocking: BlockingConfig,
    pub courses: Vec<CourseConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_workers() -> usize {
    4
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    pub jwt: JwtConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_jwt_issuer")]
    pub issuer: String,
    #[serde(default = "default_jwt_audience")]
    pub audience: String,
    #[serde(default = "default_jwt_expiration_hours")]
    pub expiration_hours: u64,
    #[serde(default = "default_jwt_cookie_name")]
    pub cookie_name: String,
}

fn default_jwt_issuer() -> String {
    "studio".to_string()
}

fn default_jwt_audience() -> String {
    "studio-authors".to_string()
}

fn default_jwt_expiration_hours() -> u64 {
    12
}

fn default_jwt_cookie_name() -> String {
    "studio_jwt".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    /// Snapshot the stores under `state/` after every write.
    #[serde(default = "default_store_persist")]
    pub persist: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            persist: default_store_persist(),
        }
    }
}

fn default_store_persist() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BlockingConfig {
    #[serde(default = "default_blocking_workers")]
    pub workers: usize,
    #[serde(default = "default_overflow_workers")]
    pub overflow_workers: usize,
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            workers: default_blocking_workers(),
            overflow_workers: default_overflow_workers(),
        }
    }
}

fn default_blocking_workers() -> usize {
    4
}

fn default_overflow_workers() -> usize {
    2
}

/// A course seeded at startup: its root node and locator mapping are
/// created when missing.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CourseConfig {
    pub org: String,
    pub course: String,
    pub run: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl CourseConfig {
    pub fn key(&self) -> Result<CourseKey, ConfigError> {
        CourseKey::new(&self.org, &self.course, &self.run)
            .map_err(|e| ConfigError::ValidationError(format!("Invalid course entry: {}", e)))
    }
}

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

impl Config {
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let config_path = root.join("config.yaml");
        let config_content = fs::read_to_string(&config_path).map_err(|e| {
            ConfigError::LoadError(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        let config: Config = serde_yaml::from_str(&config_content).map_err(|e| {
            ConfigError::LoadError(format!(
                "Failed to parse config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        Ok(config)
    }

    /// Loads and validates configuration at startup. If validation fails, the application should not start.
    pub fn load_and_validate(root: &Path) -> Result<ValidatedConfig, ConfigError> {
        Self::load(root)?.validate()
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        Self::validate_server(&self.server)?;
        Self::validate_logging(&self.logging)?;
        Self::validate_jwt(&self.auth.jwt)?;
        Self::validate_blocking(&self.blocking)?;
        Self::validate_courses(&self.courses)?;

        Ok(ValidatedConfig {
            server: self.server,
            app: self.app,
            logging: self.logging,
            auth: self.auth,
            store: self.store,
            blocking: self.blocking,
            courses: self.courses,
        })
    }

    fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
        if server.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "server.host cannot be empty".to_string(),
            ));
        }
        if server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must be greater than 0".to_string(),
            ));
        }
        if server.workers == 0 {
            return Err(ConfigError::ValidationError(
                "server.workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        let level = logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {}, got: {}",
                LOG_LEVELS.join(", "),
                logging.level
            )));
        }
        Ok(())
    }

    fn validate_jwt(jwt: &JwtConfig) -> Result<(), ConfigError> {
        if jwt.secret.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.jwt.secret cannot be empty".to_string(),
            ));
        }
        if jwt.expiration_hours == 0 {
            return Err(ConfigError::ValidationError(
                "auth.jwt.expiration_hours must be at least 1".to_string(),
            ));
        }
        if jwt.cookie_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.jwt.cookie_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_blocking(blocking: &BlockingConfig) -> Result<(), ConfigError> {
        if blocking.workers == 0 {
            return Err(ConfigError::ValidationError(
                "blocking.workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_courses(courses: &[CourseConfig]) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for course in courses {
            let key = course.key()?;
            if !seen.insert(key.package_id()) {
                return Err(ConfigError::ValidationError(format!(
                    "courses: duplicate entry '{}'",
                    key.package_id()
                )));
            }
        }
        Ok(())
    }
}
