// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::content::errors::{ItemError, ItemErrorKind, ItemResult};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

const DEFAULT_BLOCKING_WORKERS: usize = 4;
const DEFAULT_OVERFLOW_WORKERS: usize = 2;

/// Bounded hand-off of store work from request handlers to blocking threads.
/// Fails fast with `Busy` once both the regular and overflow permits are
/// taken.
#[derive(Clone)]
pub struct BlockingPool {
    blocking: Arc<Semaphore>,
    overflow: Arc<Semaphore>,
}

impl BlockingPool {
    pub fn new(blocking_workers: usize, overflow_workers: usize) -> Self {
        Self {
            blocking: Arc::new(Semaphore::new(blocking_workers)),
            overflow: Arc::new(Semaphore::new(overflow_workers)),
        }
    }

    pub fn default_pool() -> Self {
        Self::new(DEFAULT_BLOCKING_WORKERS, DEFAULT_OVERFLOW_WORKERS)
    }

    pub async fn run_blocking<F, R>(&self, context: &'static str, task: F) -> ItemResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let permit = match self.blocking.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => match self.overflow.clone().try_acquire_owned() {
                Ok(permit) => {
                    log::warn!(
                        "Blocking pool overflow used for {} (pool saturated)",
                        context
                    );
                    permit
                }
                Err(_) => {
                    return Err(ItemError::new(
                        ItemErrorKind::Busy,
                        format!("{}: blocking pool saturated", context),
                    ));
                }
            },
        };

        Self::spawn_with_permit(context, permit, task).await
    }

    async fn spawn_with_permit<F, R>(
        context: &'static str,
        _permit: OwnedSemaphorePermit,
        task: F,
    ) -> ItemResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        tokio::task::spawn_blocking(task)
            .await
            .map_err(|err| ItemError::store(format!("{}: blocking task failed: {}", context, err)))
    }
}
