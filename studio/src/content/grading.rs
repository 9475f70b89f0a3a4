// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::content::node::ContentNode;
use serde::Serialize;
use serde_json::Value;

pub const NOT_GRADED: &str = "notgraded";
const FORMAT_FIELD: &str = "format";
const GRADED_FIELD: &str = "graded";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionGrader {
    #[serde(rename = "graderType")]
    pub grader_type: String,
    pub location: String,
}

/// Grader type of a section: its assignment format, or `notgraded`.
pub fn section_grader_type(node: &ContentNode) -> String {
    node.metadata
        .get(FORMAT_FIELD)
        .and_then(Value::as_str)
        .filter(|format| !format.is_empty())
        .unwrap_or(NOT_GRADED)
        .to_string()
}

/// Applies a grader type to the node's settings and returns the stored value.
pub fn update_section_grader_type(node: &mut ContentNode, grader_type: &str) -> String {
    if grader_type != NOT_GRADED {
        node.metadata
            .insert(FORMAT_FIELD.to_string(), Value::String(grader_type.to_string()));
        node.metadata.insert(GRADED_FIELD.to_string(), Value::Bool(true));
    } else {
        node.metadata.remove(FORMAT_FIELD);
        node.metadata.remove(GRADED_FIELD);
    }
    log::debug!("Grader type of {} set to {}", node.location, grader_type);
    section_grader_type(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::location::Location;
    use serde_json::json;

    fn section() -> ContentNode {
        ContentNode::new(Location::new("MITx", "999", "sequential", "s1").unwrap())
    }

    #[test]
    fn ungraded_section_reports_notgraded() {
        assert_eq!(section_grader_type(&section()), NOT_GRADED);
    }

    #[test]
    fn setting_a_grader_marks_section_graded() {
        let mut node = section();
        assert_eq!(update_section_grader_type(&mut node, "Homework"), "Homework");
        assert_eq!(node.metadata["format"], json!("Homework"));
        assert_eq!(node.metadata["graded"], json!(true));
    }

    #[test]
    fn notgraded_clears_format_and_graded() {
        let mut node = section();
        update_section_grader_type(&mut node, "Exam");
        assert_eq!(update_section_grader_type(&mut node, NOT_GRADED), NOT_GRADED);
        assert!(!node.metadata.contains_key("format"));
        assert!(!node.metadata.contains_key("graded"));
    }
}
