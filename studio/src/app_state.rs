// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use std::sync::Arc;

use crate::blocking::BlockingPool;
use crate::config::ValidatedConfig;
use crate::content::{ItemEngine, ItemError, ItemResult, LocMapper, StoreRegistry, ensure_course};
use crate::runtime_paths::RuntimePaths;

pub struct AppState {
    pub engine: ItemEngine,
    pub blocking: BlockingPool,
}

impl AppState {
    pub fn new(engine: ItemEngine, blocking: BlockingPool) -> Self {
        Self { engine, blocking }
    }

    /// Opens the stores (snapshotted under `state/` when persistence is on)
    /// and seeds the configured courses.
    pub fn from_config(
        config: &ValidatedConfig,
        runtime_paths: &RuntimePaths,
    ) -> ItemResult<Self> {
        let (stores, mapper) = if config.store.persist {
            (
                StoreRegistry::persistent(runtime_paths.items_snapshot())?,
                LocMapper::persistent(runtime_paths.loc_mapper_snapshot())?,
            )
        } else {
            (StoreRegistry::in_memory(), LocMapper::in_memory())
        };
        Self::with_stores(config, stores, Arc::new(mapper))
    }

    /// Non-persistent state for tests and throwaway runs.
    pub fn in_memory(config: &ValidatedConfig) -> ItemResult<Self> {
        Self::with_stores(config, StoreRegistry::in_memory(), Arc::new(LocMapper::in_memory()))
    }

    fn with_stores(
        config: &ValidatedConfig,
        stores: StoreRegistry,
        mapper: Arc<LocMapper>,
    ) -> ItemResult<Self> {
        for course in &config.courses {
            let key = course
                .key()
                .map_err(|err| ItemError::validation(err.to_string()))?;
            let root = ensure_course(&stores, &mapper, &key, course.display_name.as_deref())?;
            log::info!("Course {} available at {}", key.course_id(), root);
        }
        let blocking = BlockingPool::new(config.blocking.workers, config.blocking.overflow_workers);
        Ok(Self::new(ItemEngine::new(stores, mapper), blocking))
    }

    /// Runs an engine call on the blocking pool.
    pub async fn run<F, R>(&self, context: &'static str, task: F) -> ItemResult<R>
    where
        F: FnOnce(&ItemEngine) -> ItemResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let engine = self.engine.clone();
        self.blocking
            .run_blocking(context, move || task(&engine))
            .await?
    }
}
