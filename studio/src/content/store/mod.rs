// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

mod memory;

pub use memory::{DirectStore, DraftStore, ItemBacking};

use crate::content::block_types::is_direct_only;
use crate::content::errors::ItemResult;
use crate::content::location::Location;
use crate::content::node::{ContentNode, PublishState};
use crate::content::yaml_store::SnapshotFile;
use std::sync::Arc;

/// Node storage keyed by location.
pub trait ContentStore: Send + Sync {
    fn name(&self) -> &'static str;

    fn get_item(&self, location: &Location) -> ItemResult<ContentNode>;

    fn has_item(&self, location: &Location) -> bool {
        self.get_item(location).is_ok()
    }

    /// Fails when something is already stored at the node's location.
    fn create_item(&self, node: ContentNode, user: Option<&str>) -> ItemResult<()>;

    fn update_item(&self, node: ContentNode, user: Option<&str>) -> ItemResult<()>;

    fn delete_item(&self, location: &Location, all_versions: bool) -> ItemResult<()>;

    /// Nodes whose child list, as seen by this store, contains `location`.
    fn get_parent_locations(&self, location: &Location) -> Vec<Location>;

    /// Non-detached nodes of the course that cannot be reached from its root.
    fn get_orphans(&self, course_root: &Location) -> ItemResult<Vec<Location>>;

    fn as_publisher(&self) -> Option<&dyn PublishStore> {
        None
    }
}

/// Draft/publish transitions, only offered by versioned stores.
pub trait PublishStore: Send + Sync {
    fn publish(&self, location: &Location, user: Option<&str>) -> ItemResult<()>;

    fn unpublish(&self, location: &Location) -> ItemResult<()>;

    fn convert_to_draft(&self, location: &Location) -> ItemResult<()>;

    fn publish_state(&self, location: &Location) -> ItemResult<PublishState>;
}

/// Picks the store that handles a category.
#[derive(Clone)]
pub struct StoreRegistry {
    draft: Arc<DraftStore>,
    direct: Arc<DirectStore>,
}

impl StoreRegistry {
    pub fn in_memory() -> Self {
        Self::from_backing(Arc::new(ItemBacking::new(None)))
    }

    /// Loads the snapshot if one exists and rewrites it after every change.
    pub fn persistent(snapshot: SnapshotFile) -> ItemResult<Self> {
        let backing = ItemBacking::load(snapshot)?;
        Ok(Self::from_backing(Arc::new(backing)))
    }

    fn from_backing(backing: Arc<ItemBacking>) -> Self {
        Self {
            draft: Arc::new(DraftStore::new(backing.clone())),
            direct: Arc::new(DirectStore::new(backing)),
        }
    }

    pub fn for_category(&self, category: &str) -> &dyn ContentStore {
        if is_direct_only(category) {
            self.direct.as_ref()
        } else {
            self.draft.as_ref()
        }
    }

    pub fn for_location(&self, location: &Location) -> &dyn ContentStore {
        self.for_category(&location.category)
    }

    pub fn draft(&self) -> &dyn ContentStore {
        self.draft.as_ref()
    }

    pub fn direct(&self) -> &dyn ContentStore {
        self.direct.as_ref()
    }

    /// Every view, published first.
    pub fn views(&self) -> [&dyn ContentStore; 2] {
        [self.direct.as_ref(), self.draft.as_ref()]
    }
}
