// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::config::{Config, ConfigError, ValidatedConfig};
use crate::runtime_paths::RuntimePaths;
use std::error::Error;
use std::fmt;
use std::path::Path;

pub mod config;
pub mod root_guard;
pub mod users;

#[derive(Debug)]
pub struct BootstrapResult {
    pub validated_config: ValidatedConfig,
    pub runtime_paths: RuntimePaths,
    pub created_config: bool,
    pub created_users: bool,
}

#[derive(Debug)]
pub enum BootstrapError {
    Config(ConfigError),
    Io(std::io::Error),
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapError::Config(err) => write!(f, "{}", err),
            BootstrapError::Io(err) => write!(f, "Bootstrap I/O error: {}", err),
        }
    }
}

impl Error for BootstrapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BootstrapError::Config(err) => Some(err),
            BootstrapError::Io(err) => Some(err),
        }
    }
}

impl From<ConfigError> for BootstrapError {
    fn from(err: ConfigError) -> Self {
        BootstrapError::Config(err)
    }
}

impl From<std::io::Error> for BootstrapError {
    fn from(err: std::io::Error) -> Self {
        BootstrapError::Io(err)
    }
}

/// Prepares the runtime root: default config and users files when missing,
/// validated configuration, and the state directory.
pub fn bootstrap_runtime(root: &Path) -> Result<BootstrapResult, BootstrapError> {
    let root_path = root_guard::ensure_root_is_clean(root)?;

    let created_config = config::ensure_config(&root_path)?;

    let validated_config = Config::load_and_validate(&root_path)?;

    let created_users = users::ensure_users(&root_path)?;

    let runtime_paths = RuntimePaths::from_root(&root_path)?;

    Ok(BootstrapResult {
        validated_config,
        runtime_paths,
        created_config,
        created_users,
    })
}

pub(crate) fn log_action(message: impl AsRef<str>) {
    eprintln!("[bootstrap] {}", message.as_ref());
}

pub(crate) fn log_warning(message: impl AsRef<str>) {
    eprintln!("[bootstrap] WARNING: {}", message.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iam::types::YamlUser;
    use crate::util::test_fixtures::TestFixtureRoot;
    use std::collections::HashMap;
    use std::fs;

    #[test]
    fn bootstrap_creates_defaults_when_missing() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-default").unwrap();
        let result = bootstrap_runtime(fixture.path()).expect("bootstrap should succeed");

        assert!(result.created_config);
        assert!(result.created_users);
        assert_eq!(result.validated_config.courses.len(), 1);
        assert!(result.runtime_paths.state_dir.is_dir());

        let users_content = fs::read_to_string(fixture.path().join("users.yaml")).unwrap();
        let users: HashMap<String, YamlUser> = serde_yaml::from_str(&users_content).unwrap();
        let staff = users.get("staff@example.com").expect("staff user missing");
        assert!(staff.roles.iter().any(|role| role == "staff"));
    }

    #[test]
    fn bootstrap_is_idempotent() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-idempotent").unwrap();
        bootstrap_runtime(fixture.path()).expect("bootstrap should succeed");
        let config_before = fs::read_to_string(fixture.path().join("config.yaml")).unwrap();
        let users_before = fs::read_to_string(fixture.path().join("users.yaml")).unwrap();

        let second = bootstrap_runtime(fixture.path()).expect("bootstrap should succeed");
        assert!(!second.created_config);
        assert!(!second.created_users);
        assert_eq!(
            config_before,
            fs::read_to_string(fixture.path().join("config.yaml")).unwrap()
        );
        assert_eq!(
            users_before,
            fs::read_to_string(fixture.path().join("users.yaml")).unwrap()
        );
    }

    #[test]
    fn invalid_existing_config_stops_bootstrap() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-invalid").unwrap();
        fs::write(fixture.path().join("config.yaml"), "server: [\n").unwrap();

        let error = bootstrap_runtime(fixture.path()).expect_err("bootstrap should fail");
        assert!(matches!(error, BootstrapError::Config(ConfigError::LoadError(_))));
        assert!(!fixture.path().join("users.yaml").exists());
    }

    #[test]
    fn bootstrap_rejects_unexpected_root_entries() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-unexpected").unwrap();
        fs::write(fixture.path().join("notes.txt"), "do not use").unwrap();

        let error = bootstrap_runtime(fixture.path()).expect_err("bootstrap should fail");
        let message = error.to_string();
        assert!(message.contains("unexpected entries"));
        assert!(message.contains("notes.txt"));
    }
}
