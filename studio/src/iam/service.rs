// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::store::UserStore;
use super::types::{IamError, User, UsersData};
use std::sync::{Arc, RwLock};

/// Read side of the user directory loaded from `users.yaml`.
#[derive(Clone)]
pub struct IamService {
    users_data: Arc<RwLock<UsersData>>,
    store: Arc<dyn UserStore>,
}

impl IamService {
    pub fn new(store: Arc<dyn UserStore>) -> Result<Self, IamError> {
        let users = store.load()?;
        Ok(IamService {
            users_data: Arc::new(RwLock::new(users)),
            store,
        })
    }

    /// Re-reads the store, replacing the in-memory directory.
    pub fn reload(&self) -> Result<(), IamError> {
        let users = self.store.load()?;
        match self.users_data.write() {
            Ok(mut guard) => *guard = users,
            Err(poisoned) => {
                log::error!("Users lock poisoned during reload; recovering");
                *poisoned.into_inner() = users;
                self.users_data.clear_poison();
            }
        }
        Ok(())
    }

    fn with_users_read<T>(
        &self,
        f: impl FnOnce(&UsersData) -> Result<T, IamError>,
    ) -> Result<T, IamError> {
        match self.users_data.read() {
            Ok(guard) => f(&guard),
            Err(_) => {
                log::error!("Users lock poisoned on read; reloading from disk");
                self.reload()?;
                let guard = self.users_data.read().map_err(|_| {
                    IamError::ConfigurationError(
                        "Users lock poisoned after recovery attempt".to_string(),
                    )
                })?;
                f(&guard)
            }
        }
    }

    /// Get a user by email. Users without roles count as disabled.
    pub fn get_user(&self, email: &str) -> Result<Option<User>, IamError> {
        log::debug!("Looking up user in IAM service: {}", email);
        self.with_users_read(|users| match users.get(email) {
            Some(user) if user.roles.is_empty() => {
                log::debug!("User found but has no roles (disabled): {}", email);
                Ok(None)
            }
            Some(user) => Ok(Some(user.clone())),
            None => {
                log::debug!("User not found in IAM service: {}", email);
                Ok(None)
            }
        })
    }

    pub fn list_users(&self) -> Result<Vec<User>, IamError> {
        self.with_users_read(|users| Ok(users.values().cloned().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iam::store::MemoryUserStore;

    fn user(email: &str, roles: &[&str]) -> User {
        User {
            email: email.to_string(),
            name: email.to_string(),
            roles: roles.iter().map(|role| role.to_string()).collect(),
        }
    }

    #[test]
    fn users_without_roles_are_disabled() {
        let store = MemoryUserStore::from_users(vec![
            user("staff@example.com", &["staff"]),
            user("idle@example.com", &[]),
        ]);
        let service = IamService::new(Arc::new(store)).unwrap();
        assert!(service.get_user("staff@example.com").unwrap().is_some());
        assert!(service.get_user("idle@example.com").unwrap().is_none());
        assert!(service.get_user("nobody@example.com").unwrap().is_none());
        assert_eq!(service.list_users().unwrap().len(), 2);
    }
}
