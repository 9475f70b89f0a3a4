// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::content::errors::{ItemError, ItemResult};
use crate::content::location::{CourseKey, DEFAULT_BRANCH, Locator, Location};
use crate::content::yaml_store::SnapshotFile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Translates between client locators and storage locations.
pub trait LocatorTranslator: Send + Sync {
    /// `None` when the package or block id is not mapped.
    fn translate_locator(&self, locator: &Locator) -> Option<Location>;

    /// Root location of the course the locator belongs to.
    fn course_location(&self, locator: &Locator) -> Option<Location>;

    /// Locator for `location` within the course `package_id`. Registers a
    /// block id first when `add_entry_if_missing` is set.
    fn translate_location(
        &self,
        package_id: &str,
        location: &Location,
        add_entry_if_missing: bool,
    ) -> ItemResult<Locator>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct BlockEntry {
    category: String,
    name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CourseEntry {
    key: CourseKey,
    #[serde(default)]
    block_map: BTreeMap<String, BlockEntry>,
}

impl CourseEntry {
    fn new(key: CourseKey) -> Self {
        let root = key.root_location();
        let mut block_map = BTreeMap::new();
        block_map.insert(
            root.name.clone(),
            BlockEntry {
                category: root.category.clone(),
                name: root.name.clone(),
            },
        );
        Self { key, block_map }
    }

    fn location_for(&self, block_id: &str) -> Option<Location> {
        let entry = self.block_map.get(block_id)?;
        Some(Location {
            org: self.key.org.clone(),
            course: self.key.course.clone(),
            category: entry.category.clone(),
            name: entry.name.clone(),
        })
    }

    fn block_id_for(&self, location: &Location) -> Option<&str> {
        self.block_map
            .iter()
            .find(|(_, entry)| entry.category == location.category && entry.name == location.name)
            .map(|(block_id, _)| block_id.as_str())
    }

    /// Prefers the location name and falls back to category-qualified ids on collision.
    fn allocate_block_id(&mut self, location: &Location) -> String {
        let mut candidate = location.name.clone();
        let mut attempt = 0;
        while self.block_map.contains_key(&candidate) {
            attempt += 1;
            candidate = if attempt == 1 {
                format!("{}_{}", location.category, location.name)
            } else {
                format!("{}_{}{}", location.category, location.name, attempt)
            };
        }
        self.block_map.insert(
            candidate.clone(),
            BlockEntry {
                category: location.category.clone(),
                name: location.name.clone(),
            },
        );
        candidate
    }
}

/// In-process mapping table with one entry per registered course.
pub struct LocMapper {
    courses: RwLock<BTreeMap<String, CourseEntry>>,
    snapshot: Option<SnapshotFile>,
}

impl LocMapper {
    pub fn in_memory() -> Self {
        Self {
            courses: RwLock::new(BTreeMap::new()),
            snapshot: None,
        }
    }

    pub fn persistent(snapshot: SnapshotFile) -> ItemResult<Self> {
        let courses: BTreeMap<String, CourseEntry> = snapshot.load()?.unwrap_or_default();
        log::info!(
            "Loaded locator map for {} course(s) from {}",
            courses.len(),
            snapshot.path().display()
        );
        Ok(Self {
            courses: RwLock::new(courses),
            snapshot: Some(snapshot),
        })
    }

    /// Adds the course if it is not mapped yet; the root block id is the run.
    pub fn register_course(&self, key: &CourseKey) -> ItemResult<Locator> {
        let package_id = key.package_id();
        self.write(|courses| {
            if !courses.contains_key(&package_id) {
                log::info!("Registered course {} in locator map", package_id);
                courses.insert(package_id.clone(), CourseEntry::new(key.clone()));
            }
            Ok(())
        })?;
        Locator::new(&package_id, DEFAULT_BRANCH, None, &key.run)
            .map_err(|err| ItemError::invalid_address(err.to_string()))
    }

    pub fn course_key(&self, package_id: &str) -> Option<CourseKey> {
        self.courses
            .read()
            .ok()
            .and_then(|courses| courses.get(package_id).map(|entry| entry.key.clone()))
    }

    fn write<R>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, CourseEntry>) -> ItemResult<R>,
    ) -> ItemResult<R> {
        let mut courses = self
            .courses
            .write()
            .map_err(|_| ItemError::store("locator map lock poisoned"))?;
        let result = f(&mut courses)?;
        if let Some(snapshot) = &self.snapshot {
            snapshot.save(&*courses)?;
        }
        Ok(result)
    }
}

impl LocatorTranslator for LocMapper {
    fn translate_locator(&self, locator: &Locator) -> Option<Location> {
        let courses = self.courses.read().ok()?;
        courses
            .get(&locator.package_id)?
            .location_for(&locator.block_id)
    }

    fn course_location(&self, locator: &Locator) -> Option<Location> {
        let courses = self.courses.read().ok()?;
        courses
            .get(&locator.package_id)
            .map(|entry| entry.key.root_location())
    }

    fn translate_location(
        &self,
        package_id: &str,
        location: &Location,
        add_entry_if_missing: bool,
    ) -> ItemResult<Locator> {
        let unknown_course =
            || ItemError::invalid_address(format!("Unknown course package: {}", package_id));
        let known = {
            let courses = self
                .courses
                .read()
                .map_err(|_| ItemError::store("locator map lock poisoned"))?;
            let entry = courses.get(package_id).ok_or_else(unknown_course)?;
            if entry.key.org != location.org || entry.key.course != location.course {
                return Err(ItemError::invalid_address(format!(
                    "{} does not belong to course {}",
                    location, package_id
                )));
            }
            entry.block_id_for(location).map(str::to_string)
        };

        let block_id = match known {
            Some(block_id) => block_id,
            None if add_entry_if_missing => self.write(|courses| {
                let entry = courses.get_mut(package_id).ok_or_else(unknown_course)?;
                Ok(match entry.block_id_for(location) {
                    Some(block_id) => block_id.to_string(),
                    None => entry.allocate_block_id(location),
                })
            })?,
            None => {
                return Err(ItemError::invalid_address(format!(
                    "No locator mapped for {}",
                    location
                )));
            }
        };

        Locator::new(package_id, DEFAULT_BRANCH, None, &block_id)
            .map_err(|err| ItemError::invalid_address(err.to_string()))
    }
}
