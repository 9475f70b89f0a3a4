// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::{ContentStore, PublishStore};
use crate::content::block_types::{is_detached, is_direct_only};
use crate::content::errors::{ItemError, ItemResult};
use crate::content::location::Location;
use crate::content::node::{ContentNode, PublishState};
use crate::content::yaml_store::SnapshotFile;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Revisions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    published: Option<ContentNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    draft: Option<ContentNode>,
}

impl Revisions {
    fn is_empty(&self) -> bool {
        self.published.is_none() && self.draft.is_none()
    }

    fn draft_preferred(&self) -> Option<&ContentNode> {
        self.draft.as_ref().or(self.published.as_ref())
    }

    fn published_only(&self) -> Option<&ContentNode> {
        self.published.as_ref()
    }

    fn draft_only(&self) -> Option<&ContentNode> {
        self.draft.as_ref()
    }
}

type ItemMap = HashMap<Location, Revisions>;

/// Both revisions of every node, shared by the draft and direct views.
pub struct ItemBacking {
    items: RwLock<ItemMap>,
    snapshot: Option<SnapshotFile>,
}

impl ItemBacking {
    pub fn new(snapshot: Option<SnapshotFile>) -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            snapshot,
        }
    }

    pub fn load(snapshot: SnapshotFile) -> ItemResult<Self> {
        let stored: BTreeMap<Location, Revisions> = snapshot.load()?.unwrap_or_default();
        log::info!(
            "Loaded {} item(s) from {}",
            stored.len(),
            snapshot.path().display()
        );
        Ok(Self {
            items: RwLock::new(stored.into_iter().collect()),
            snapshot: Some(snapshot),
        })
    }

    fn read<R>(&self, f: impl FnOnce(&ItemMap) -> R) -> ItemResult<R> {
        let items = self
            .items
            .read()
            .map_err(|_| ItemError::store("item store lock poisoned"))?;
        Ok(f(&items))
    }

    fn write<R>(&self, f: impl FnOnce(&mut ItemMap) -> ItemResult<R>) -> ItemResult<R> {
        let mut items = self
            .items
            .write()
            .map_err(|_| ItemError::store("item store lock poisoned"))?;
        let result = f(&mut items)?;
        if let Some(snapshot) = &self.snapshot {
            let ordered: BTreeMap<&Location, &Revisions> = items.iter().collect();
            snapshot.save(&ordered)?;
        }
        Ok(result)
    }
}

fn not_found(location: &Location) -> ItemError {
    ItemError::not_found(format!("Item not found: {}", location))
}

fn parents_of(
    items: &ItemMap,
    location: &Location,
    view: fn(&Revisions) -> Option<&ContentNode>,
) -> Vec<Location> {
    let mut parents: Vec<Location> = items
        .iter()
        .filter_map(|(key, revisions)| {
            view(revisions)
                .filter(|node| node.children.contains(location))
                .map(|_| key.clone())
        })
        .collect();
    parents.sort();
    parents
}

fn orphans_of(
    items: &ItemMap,
    course_root: &Location,
    view: fn(&Revisions) -> Option<&ContentNode>,
) -> ItemResult<Vec<Location>> {
    let root = items
        .get(course_root)
        .and_then(view)
        .ok_or_else(|| not_found(course_root))?;

    let mut reachable: HashSet<&Location> = HashSet::new();
    let mut queue: VecDeque<&ContentNode> = VecDeque::from([root]);
    reachable.insert(&root.location);
    while let Some(node) = queue.pop_front() {
        for child in &node.children {
            if reachable.insert(child) {
                if let Some(child_node) = items.get(child).and_then(view) {
                    queue.push_back(child_node);
                }
            }
        }
    }

    let mut orphans: Vec<Location> = items
        .iter()
        .filter(|(location, revisions)| {
            location.same_course(course_root)
                && view(revisions).is_some()
                && !is_detached(&location.category)
                && !reachable.contains(location)
        })
        .map(|(location, _)| location.clone())
        .collect();
    orphans.sort();
    Ok(orphans)
}

/// Draft-preferring view: edits land in a draft revision unless the
/// category is stored direct-only.
pub struct DraftStore {
    backing: Arc<ItemBacking>,
}

impl DraftStore {
    pub fn new(backing: Arc<ItemBacking>) -> Self {
        Self { backing }
    }
}

impl ContentStore for DraftStore {
    fn name(&self) -> &'static str {
        "draft"
    }

    fn get_item(&self, location: &Location) -> ItemResult<ContentNode> {
        self.backing
            .read(|items| {
                items
                    .get(location)
                    .and_then(Revisions::draft_preferred)
                    .cloned()
            })?
            .ok_or_else(|| not_found(location))
    }

    fn create_item(&self, mut node: ContentNode, user: Option<&str>) -> ItemResult<()> {
        node.touch(user);
        self.backing.write(|items| {
            let entry = items.entry(node.location.clone()).or_default();
            if !entry.is_empty() {
                return Err(ItemError::validation(format!(
                    "Item already exists: {}",
                    node.location
                )));
            }
            log::debug!("Created {} in draft store", node.location);
            if is_direct_only(node.category()) {
                entry.published = Some(node);
            } else {
                entry.draft = Some(node);
            }
            Ok(())
        })
    }

    fn update_item(&self, mut node: ContentNode, user: Option<&str>) -> ItemResult<()> {
        node.touch(user);
        self.backing.write(|items| {
            let entry = items
                .get_mut(&node.location)
                .filter(|entry| !entry.is_empty())
                .ok_or_else(|| not_found(&node.location))?;
            if is_direct_only(node.category()) {
                entry.draft = None;
                entry.published = Some(node);
            } else {
                entry.draft = Some(node);
            }
            Ok(())
        })
    }

    fn delete_item(&self, location: &Location, all_versions: bool) -> ItemResult<()> {
        self.backing.write(|items| {
            let entry = items
                .get_mut(location)
                .filter(|entry| !entry.is_empty())
                .ok_or_else(|| not_found(location))?;
            if all_versions || is_direct_only(&location.category) {
                entry.draft = None;
                entry.published = None;
            } else if entry.draft.take().is_none() {
                entry.published = None;
            }
            if entry.is_empty() {
                items.remove(location);
            }
            log::debug!(
                "Deleted {} from draft store (all_versions={})",
                location,
                all_versions
            );
            Ok(())
        })
    }

    fn get_parent_locations(&self, location: &Location) -> Vec<Location> {
        self.backing
            .read(|items| parents_of(items, location, Revisions::draft_only))
            .unwrap_or_default()
    }

    fn get_orphans(&self, course_root: &Location) -> ItemResult<Vec<Location>> {
        self.backing
            .read(|items| orphans_of(items, course_root, Revisions::draft_preferred))?
    }

    fn as_publisher(&self) -> Option<&dyn PublishStore> {
        Some(self)
    }
}

impl PublishStore for DraftStore {
    fn publish(&self, location: &Location, user: Option<&str>) -> ItemResult<()> {
        self.backing.write(|items| {
            let entry = items
                .get_mut(location)
                .filter(|entry| !entry.is_empty())
                .ok_or_else(|| not_found(location))?;
            if let Some(mut draft) = entry.draft.take() {
                draft.touch(user);
                entry.published = Some(draft);
                log::debug!("Published {}", location);
            }
            Ok(())
        })
    }

    fn unpublish(&self, location: &Location) -> ItemResult<()> {
        if is_direct_only(&location.category) {
            return Ok(());
        }
        self.backing.write(|items| {
            let entry = items
                .get_mut(location)
                .filter(|entry| !entry.is_empty())
                .ok_or_else(|| not_found(location))?;
            if let Some(published) = entry.published.take() {
                if entry.draft.is_none() {
                    entry.draft = Some(published);
                }
                log::debug!("Unpublished {}", location);
            }
            Ok(())
        })
    }

    fn convert_to_draft(&self, location: &Location) -> ItemResult<()> {
        if is_direct_only(&location.category) {
            return Ok(());
        }
        self.backing.write(|items| {
            let entry = items
                .get_mut(location)
                .filter(|entry| !entry.is_empty())
                .ok_or_else(|| not_found(location))?;
            if entry.draft.is_none() {
                entry.draft = entry.published.clone();
            }
            Ok(())
        })
    }

    fn publish_state(&self, location: &Location) -> ItemResult<PublishState> {
        self.backing
            .read(|items| {
                items.get(location).and_then(|entry| {
                    match (entry.draft.is_some(), entry.published.is_some()) {
                        (false, true) => Some(PublishState::Public),
                        (true, true) => Some(PublishState::Draft),
                        (true, false) => Some(PublishState::Private),
                        (false, false) => None,
                    }
                })
            })?
            .ok_or_else(|| not_found(location))
    }
}

/// Published-only view without draft support.
pub struct DirectStore {
    backing: Arc<ItemBacking>,
}

impl DirectStore {
    pub fn new(backing: Arc<ItemBacking>) -> Self {
        Self { backing }
    }
}

impl ContentStore for DirectStore {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn get_item(&self, location: &Location) -> ItemResult<ContentNode> {
        self.backing
            .read(|items| {
                items
                    .get(location)
                    .and_then(Revisions::published_only)
                    .cloned()
            })?
            .ok_or_else(|| not_found(location))
    }

    fn create_item(&self, mut node: ContentNode, user: Option<&str>) -> ItemResult<()> {
        node.touch(user);
        self.backing.write(|items| {
            let entry = items.entry(node.location.clone()).or_default();
            if entry.published.is_some() {
                return Err(ItemError::validation(format!(
                    "Item already exists: {}",
                    node.location
                )));
            }
            log::debug!("Created {} in direct store", node.location);
            entry.published = Some(node);
            Ok(())
        })
    }

    fn update_item(&self, mut node: ContentNode, user: Option<&str>) -> ItemResult<()> {
        node.touch(user);
        self.backing.write(|items| {
            let entry = items
                .get_mut(&node.location)
                .filter(|entry| entry.published.is_some())
                .ok_or_else(|| not_found(&node.location))?;
            entry.published = Some(node);
            Ok(())
        })
    }

    fn delete_item(&self, location: &Location, all_versions: bool) -> ItemResult<()> {
        self.backing.write(|items| {
            let entry = items
                .get_mut(location)
                .filter(|entry| entry.published.is_some())
                .ok_or_else(|| not_found(location))?;
            entry.published = None;
            if all_versions {
                entry.draft = None;
            }
            if entry.is_empty() {
                items.remove(location);
            }
            log::debug!(
                "Deleted {} from direct store (all_versions={})",
                location,
                all_versions
            );
            Ok(())
        })
    }

    fn get_parent_locations(&self, location: &Location) -> Vec<Location> {
        self.backing
            .read(|items| parents_of(items, location, Revisions::published_only))
            .unwrap_or_default()
    }

    fn get_orphans(&self, course_root: &Location) -> ItemResult<Vec<Location>> {
        self.backing
            .read(|items| orphans_of(items, course_root, Revisions::published_only))?
    }
}
