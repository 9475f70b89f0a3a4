// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::jwt::{JwtError, JwtService};
use super::service::IamService;
use super::store::{FileUserStore, UserStore};
use super::types::{IamError, User};
use super::validation::validate_email_field;
use crate::config::ValidatedConfig;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug)]
pub enum UserServiceError {
    Iam(IamError),
    Jwt(JwtError),
}

impl fmt::Display for UserServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserServiceError::Iam(err) => write!(f, "{}", err),
            UserServiceError::Jwt(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for UserServiceError {}

impl From<IamError> for UserServiceError {
    fn from(err: IamError) -> Self {
        UserServiceError::Iam(err)
    }
}

impl From<JwtError> for UserServiceError {
    fn from(err: JwtError) -> Self {
        UserServiceError::Jwt(err)
    }
}

pub type UserServiceResult<T> = Result<T, UserServiceError>;

/// Token issuing and verification on top of the user directory.
pub struct UserServices {
    jwt_service: JwtService,
    iam_service: IamService,
}

impl UserServices {
    pub fn new(config: &ValidatedConfig, users_file: &Path) -> UserServiceResult<Self> {
        let store = FileUserStore::new(users_file.to_path_buf())?;
        Self::new_with_store(config, Arc::new(store))
    }

    pub fn new_with_store(
        config: &ValidatedConfig,
        store: Arc<dyn UserStore>,
    ) -> UserServiceResult<Self> {
        Ok(Self {
            jwt_service: JwtService::new(&config.auth.jwt),
            iam_service: IamService::new(store)?,
        })
    }

    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }

    pub fn get_user(&self, email: &str) -> UserServiceResult<Option<User>> {
        Ok(self.iam_service.get_user(email)?)
    }

    /// Issues a token for an enabled user.
    pub fn issue_token(&self, email: &str) -> UserServiceResult<String> {
        validate_email_field(email).map_err(IamError::InvalidEmail)?;
        let user = self
            .iam_service
            .get_user(email)?
            .ok_or_else(|| IamError::UserNotFound(email.to_string()))?;
        Ok(self.jwt_service.create_token(&user)?)
    }

    /// The current user behind a token, if the token verifies and the user
    /// still exists with at least one role. Roles come from the directory,
    /// not from the token.
    pub fn validate_jwt(&self, token: &str) -> Option<User> {
        let claims = match self.jwt_service.verify_token(token) {
            Ok(claims) => claims,
            Err(err) => {
                log::debug!("Rejected bearer token: {}", err);
                return None;
            }
        };
        match self.iam_service.get_user(&claims.sub) {
            Ok(user) => user,
            Err(err) => {
                log::error!("User lookup failed for {}: {}", claims.sub, err);
                None
            }
        }
    }
}
