// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

pub mod block_types;
pub mod engine;
pub mod errors;
pub mod fields;
pub mod grading;
pub mod loc_mapper;
pub mod location;
pub mod node;
pub mod render;
pub mod static_urls;
pub mod store;
pub mod subtitles;
pub mod yaml_store;

pub use engine::{
    CreateRequest, DuplicateRequest, ItemEngine, ItemRecord, PublishAction, RenderedView,
    SaveRequest, ensure_course,
};
pub use errors::{ItemError, ItemErrorKind, ItemResult};
pub use loc_mapper::{LocMapper, LocatorTranslator};
pub use location::{CourseKey, Locator, Location};
pub use store::StoreRegistry;
