// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::content::block_types::DISPLAY_NAME_FIELD;
use crate::content::location::Location;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DATA_FIELD: &str = "data";

/// One authored block. Children are held as location keys into the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    pub location: Location,
    #[serde(default)]
    pub content: Map<String, Value>,
    #[serde(default)]
    pub children: Vec<Location>,
    /// Explicitly set settings. A key holding `null` is an explicit null,
    /// an absent key falls back to the inherited or default value.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_on: Option<DateTime<Utc>>,
}

impl ContentNode {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            content: Map::new(),
            children: Vec::new(),
            metadata: Map::new(),
            edited_by: None,
            edited_on: None,
        }
    }

    pub fn category(&self) -> &str {
        &self.location.category
    }

    pub fn data(&self) -> Option<&Value> {
        self.content.get(DATA_FIELD)
    }

    pub fn set_data(&mut self, data: Value) {
        self.content.insert(DATA_FIELD.to_string(), data);
    }

    pub fn display_name(&self) -> Option<&str> {
        self.metadata.get(DISPLAY_NAME_FIELD).and_then(Value::as_str)
    }

    pub fn set_display_name(&mut self, name: impl Into<String>) {
        self.metadata
            .insert(DISPLAY_NAME_FIELD.to_string(), Value::String(name.into()));
    }

    pub(crate) fn touch(&mut self, user: Option<&str>) {
        self.edited_by = user.map(str::to_string);
        self.edited_on = Some(Utc::now());
    }
}

/// Derived from which revisions of a node exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishState {
    /// Only a published revision.
    Public,
    /// A draft revision on top of a published one.
    Draft,
    /// A draft revision that was never published.
    Private,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_name_reads_string_metadata_only() {
        let location = Location::new("MITx", "999", "html", "intro").unwrap();
        let mut node = ContentNode::new(location);
        assert_eq!(node.display_name(), None);
        node.metadata.insert("display_name".to_string(), Value::Null);
        assert_eq!(node.display_name(), None);
        node.set_display_name("Intro");
        assert_eq!(node.display_name(), Some("Intro"));
    }

    #[test]
    fn yaml_snapshot_keeps_child_order() {
        let parent = Location::new("MITx", "999", "vertical", "v1").unwrap();
        let mut node = ContentNode::new(parent.clone());
        node.children = vec![parent.replace_category_name("html", "b"), parent.replace_category_name("html", "a")];
        node.set_data(json!("<p/>"));
        let yaml = serde_yaml::to_string(&node).unwrap();
        let back: ContentNode = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, node);
        assert_eq!(back.children[0].name, "b");
    }
}
