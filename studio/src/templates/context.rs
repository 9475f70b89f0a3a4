// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use minijinja::{Value, context};
use serde::Serialize;

const STUDIO_RUNTIME: &str = "studio";

/// Shared `xblock_context` handed to every xblock view template.
#[derive(Debug, Clone, Serialize)]
pub struct XBlockContext {
    pub runtime_type: &'static str,
    pub container_view: bool,
    pub read_only: bool,
    pub root_xblock: String,
}

impl XBlockContext {
    pub fn new(root_xblock: &str, container_view: bool, read_only: bool) -> Self {
        Self {
            runtime_type: STUDIO_RUNTIME,
            container_view,
            read_only,
            root_xblock: root_xblock.to_string(),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::from_serialize(self)
    }
}

pub fn container_component_context(
    xblock_context: &XBlockContext,
    label: &str,
    locator: &str,
) -> Value {
    context! {
        xblock_context => xblock_context.to_value(),
        label => label,
        locator => locator,
    }
}

pub fn component_context(xblock_context: &XBlockContext, label: &str, preview: &str) -> Value {
    context! {
        xblock_context => xblock_context.to_value(),
        label => label,
        preview => preview,
    }
}

pub fn error_context(message: &str) -> Value {
    context! { message => message }
}
