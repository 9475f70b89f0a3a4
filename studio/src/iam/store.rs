// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::types::{IamError, User, UsersData, YamlUsersData};
use super::validation::validate_email_field;
use std::path::PathBuf;
use std::sync::RwLock;

pub trait UserStore: Send + Sync {
    fn load(&self) -> Result<UsersData, IamError>;
}

/// Reads `users.yaml` (email -> name and roles).
pub struct FileUserStore {
    users_file: PathBuf,
}

impl FileUserStore {
    pub fn new(users_file: PathBuf) -> Result<Self, IamError> {
        if users_file.as_os_str().is_empty() {
            return Err(IamError::ConfigurationError(
                "Users file path is empty".to_string(),
            ));
        }

        Ok(Self { users_file })
    }

    fn parse_users(content: &str) -> Result<UsersData, IamError> {
        if content.trim().is_empty() {
            return Ok(UsersData::new());
        }
        let yaml_users: YamlUsersData = serde_yaml::from_str(content)
            .map_err(|e| IamError::ParseError(format!("Failed to parse users file: {}", e)))?;

        yaml_users
            .into_iter()
            .map(|(email, yaml_user)| {
                validate_email_field(&email).map_err(|reason| {
                    IamError::ParseError(format!("Invalid user entry '{}': {}", email, reason))
                })?;
                Ok((email.clone(), yaml_user.into_user(email)))
            })
            .collect()
    }
}

impl UserStore for FileUserStore {
    fn load(&self) -> Result<UsersData, IamError> {
        let content = std::fs::read_to_string(&self.users_file)
            .map_err(|e| IamError::FileError(format!("Failed to read users file: {}", e)))?;
        let users = Self::parse_users(&content)?;
        log::info!(
            "Loaded {} user(s) from {}",
            users.len(),
            self.users_file.display()
        );
        Ok(users)
    }
}

pub struct MemoryUserStore {
    users: RwLock<UsersData>,
}

impl MemoryUserStore {
    pub fn new(initial: UsersData) -> Self {
        Self {
            users: RwLock::new(initial),
        }
    }

    pub fn from_users(users: Vec<User>) -> Self {
        let data = users
            .into_iter()
            .map(|user| (user.email.clone(), user))
            .collect();
        Self::new(data)
    }
}

impl UserStore for MemoryUserStore {
    fn load(&self) -> Result<UsersData, IamError> {
        match self.users.read() {
            Ok(guard) => Ok(guard.clone()),
            Err(poisoned) => {
                log::error!("MemoryUserStore lock poisoned on read; recovering");
                Ok(poisoned.into_inner().clone())
            }
        }
    }
}
