// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::content::errors::ItemError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const MAX_TEMP_ATTEMPTS: u32 = 100;

/// A YAML state file replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
    label: &'static str,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>, label: &'static str) -> Self {
        Self {
            path: path.into(),
            label,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `None` when the file is missing or blank.
    pub fn load<T: DeserializeOwned>(&self) -> Result<Option<T>, ItemError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path).map_err(|err| {
            ItemError::store(format!("Failed to read {} snapshot: {}", self.label, err))
        })?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        serde_yaml::from_str(&raw).map(Some).map_err(|err| {
            ItemError::store(format!("Failed to parse {} snapshot: {}", self.label, err))
        })
    }

    pub fn save<T: Serialize>(&self, value: &T) -> Result<(), ItemError> {
        let encoded = serde_yaml::to_string(value).map_err(|err| {
            ItemError::store(format!("Failed to serialize {} snapshot: {}", self.label, err))
        })?;
        let dir = self.path.parent().ok_or_else(|| {
            ItemError::store(format!("{} snapshot path has no parent directory", self.label))
        })?;
        fs::create_dir_all(dir).map_err(|err| {
            ItemError::store(format!("Failed to create {} snapshot directory: {}", self.label, err))
        })?;

        let (mut file, temp_path) = self.open_temp(dir)?;
        let written = file
            .write_all(encoded.as_bytes())
            .and_then(|_| file.sync_all())
            .and_then(|_| fs::rename(&temp_path, &self.path));
        if let Err(err) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(ItemError::store(format!(
                "Failed to replace {} snapshot: {}",
                self.label, err
            )));
        }

        #[cfg(unix)]
        {
            if let Err(err) = fs::File::open(dir).and_then(|handle| handle.sync_all()) {
                log::warn!("{} snapshot directory sync failed: {}", self.label, err);
            }
        }
        Ok(())
    }

    fn open_temp(&self, dir: &Path) -> Result<(fs::File, PathBuf), ItemError> {
        let file_name = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ItemError::store(format!("{} snapshot file name is not valid UTF-8", self.label))
            })?;
        for attempt in 0..MAX_TEMP_ATTEMPTS {
            let temp_path = dir.join(format!(".{}.tmp.{}.{}", file_name, std::process::id(), attempt));
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&temp_path)
            {
                Ok(file) => return Ok((file, temp_path)),
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(err) => {
                    return Err(ItemError::store(format!(
                        "Failed to create temp {} snapshot: {}",
                        self.label, err
                    )));
                }
            }
        }
        Err(ItemError::store(format!(
            "Failed to create temp {} snapshot after {} attempts",
            self.label, MAX_TEMP_ATTEMPTS
        )))
    }
}
