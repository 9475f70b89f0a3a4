// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

mod context;
mod engine;

pub use context::{XBlockContext, component_context, container_component_context, error_context};
pub use engine::{MiniJinjaEngine, TemplateEngine};

pub const STUDIO_VIEW_TEMPLATE: &str = "xblock/studio_view.html";
pub const STUDENT_VIEW_TEMPLATE: &str = "xblock/student_view.html";
pub const CONTAINER_COMPONENT_TEMPLATE: &str = "xblock/container_xblock_component.html";
pub const COMPONENT_TEMPLATE: &str = "xblock/component.html";
pub const HTML_ERROR_TEMPLATE: &str = "xblock/html_error.html";
