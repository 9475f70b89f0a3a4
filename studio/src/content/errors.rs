// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemErrorKind {
    Permission,
    NotFound,
    InvalidAddress,
    Validation,
    UnknownView,
    Store,
    Busy,
}

#[derive(Debug, Clone)]
pub struct ItemError {
    kind: ItemErrorKind,
    message: String,
}

impl ItemError {
    pub fn new(kind: ItemErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Self::new(ItemErrorKind::Permission, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ItemErrorKind::NotFound, message)
    }

    pub fn invalid_address(message: impl Into<String>) -> Self {
        Self::new(ItemErrorKind::InvalidAddress, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ItemErrorKind::Validation, message)
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ItemErrorKind::Store, message)
    }

    pub fn kind(&self) -> ItemErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} error: {}", self.kind, self.message)
    }
}

impl Error for ItemError {}

pub type ItemResult<T> = Result<T, ItemError>;
