// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::config::ConfigError;
use crate::content::yaml_store::SnapshotFile;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const ITEMS_SNAPSHOT: &str = "items.yaml";
const LOC_MAPPER_SNAPSHOT: &str = "loc_mapper.yaml";

#[derive(Debug, Clone)]
pub struct RuntimePaths {
    pub root: PathBuf,
    pub config_file: PathBuf,
    pub users_file: PathBuf,
    pub state_dir: PathBuf,
}

impl RuntimePaths {
    pub fn from_root(root: &Path) -> Result<Self, ConfigError> {
        let root_path = if root.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            root.to_path_buf()
        };

        if !root_path.exists() {
            fs::create_dir_all(&root_path)
                .map_err(|e| path_error("create runtime root", &root_path, e))?;
        }
        let root_canonical = root_path
            .canonicalize()
            .map_err(|e| path_error("canonicalize runtime root", &root_path, e))?;

        let config_file = root_canonical.join("config.yaml");
        ensure_file_writable(&config_file, "Config file must be writable")?;

        let users_file = root_canonical.join("users.yaml");
        ensure_file_writable(&users_file, "Users file must be writable")?;

        let state_dir = root_canonical.join("state");
        ensure_dir_exists(&state_dir)?;
        let state_dir = state_dir
            .canonicalize()
            .map_err(|e| path_error("canonicalize state directory", &state_dir, e))?;

        Ok(Self {
            root: root_canonical,
            config_file,
            users_file,
            state_dir,
        })
    }

    /// Both revisions of every content node.
    pub fn items_snapshot(&self) -> SnapshotFile {
        SnapshotFile::new(self.state_dir.join(ITEMS_SNAPSHOT), "items")
    }

    /// Course packages and their block id maps.
    pub fn loc_mapper_snapshot(&self) -> SnapshotFile {
        SnapshotFile::new(self.state_dir.join(LOC_MAPPER_SNAPSHOT), "locator map")
    }
}

fn ensure_dir_exists(path: &Path) -> Result<(), ConfigError> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| path_error("create directory", path, e))?;
    }
    ensure_dir_writable(path, "Directory must be writable")
}

fn path_error(action: &str, path: &Path, err: std::io::Error) -> ConfigError {
    ConfigError::ValidationError(format!("Failed to {} '{}': {}", action, path.display(), err))
}

fn ensure_dir_writable(path: &Path, context: &str) -> Result<(), ConfigError> {
    if !path.is_dir() {
        return Err(ConfigError::ValidationError(format!(
            "{} (not a directory): {}",
            context,
            path.display()
        )));
    }

    let probe_name = format!(".studio-write-check-{}", Uuid::new_v4());
    let probe_path = path.join(probe_name);

    let probe_result = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&probe_path);

    match probe_result {
        Ok(_) => {
            if let Err(err) = fs::remove_file(&probe_path) {
                return Err(ConfigError::ValidationError(format!(
                    "{} (unable to clean probe file {}): {}",
                    context,
                    probe_path.display(),
                    err
                )));
            }
            Ok(())
        }
        Err(err) => Err(ConfigError::ValidationError(format!(
            "{} ({}): {}",
            context,
            path.display(),
            err
        ))),
    }
}

fn ensure_file_writable(path: &Path, context: &str) -> Result<(), ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::ValidationError(format!(
            "{} (not a file): {}",
            context,
            path.display()
        )));
    }

    fs::OpenOptions::new()
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|err| {
            ConfigError::ValidationError(format!("{} ({}): {}", context, path.display(), err))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_fixtures::TestFixtureRoot;

    #[test]
    fn resolves_state_snapshots_under_root() {
        let fixture = TestFixtureRoot::new_unique("runtime-paths").unwrap();
        fs::write(fixture.path().join("config.yaml"), "").unwrap();
        fs::write(fixture.path().join("users.yaml"), "").unwrap();

        let paths = RuntimePaths::from_root(fixture.path()).unwrap();
        assert!(paths.state_dir.is_dir());
        assert_eq!(
            paths.items_snapshot().path(),
            paths.state_dir.join("items.yaml")
        );
        assert_eq!(
            paths.loc_mapper_snapshot().path(),
            paths.state_dir.join("loc_mapper.yaml")
        );
    }

    #[test]
    fn missing_users_file_is_rejected() {
        let fixture = TestFixtureRoot::new_unique("runtime-paths-users").unwrap();
        fs::write(fixture.path().join("config.yaml"), "").unwrap();

        let err = RuntimePaths::from_root(fixture.path()).unwrap_err();
        assert!(err.to_string().contains("Users file must be writable"));
    }
}
