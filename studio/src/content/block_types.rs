// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::content::fields::{FieldDef, FieldType};
use serde_json::{Map, Value, json};
use std::collections::HashMap;

/// Categories that are never listed in a parent's children.
pub const DETACHED_CATEGORIES: &[&str] = &["about", "static_tab", "course_info"];

/// Categories stored without draft revisions.
pub const DIRECT_ONLY_CATEGORIES: &[&str] = &[
    "course",
    "chapter",
    "sequential",
    "about",
    "static_tab",
    "course_info",
];

/// Categories created on first access instead of failing with not found.
pub const CREATE_IF_NOT_FOUND: &[&str] = &["course_info"];

pub const DETACHED_TAG: &str = "detached";
pub const DISPLAY_NAME_FIELD: &str = "display_name";

pub fn is_direct_only(category: &str) -> bool {
    DIRECT_ONLY_CATEGORIES.contains(&category)
}

pub fn is_detached(category: &str) -> bool {
    DETACHED_CATEGORIES.contains(&category)
}

pub fn creates_if_not_found(category: &str) -> bool {
    CREATE_IF_NOT_FOUND.contains(&category)
}

/// Boilerplate a new block can be seeded from.
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    pub id: String,
    pub metadata: Map<String, Value>,
    pub data: Option<Value>,
}

impl BlockTemplate {
    fn new(id: &str, display_name: &str, data: Option<Value>) -> Self {
        let mut metadata = Map::new();
        metadata.insert(
            DISPLAY_NAME_FIELD.to_string(),
            Value::String(display_name.to_string()),
        );
        Self {
            id: id.to_string(),
            metadata,
            data,
        }
    }

    fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

#[derive(Debug, Clone)]
pub struct BlockType {
    pub category: String,
    pub has_children: bool,
    pub class_tags: Vec<String>,
    fields: Vec<FieldDef>,
    templates: Vec<BlockTemplate>,
}

impl BlockType {
    fn new(category: &str, has_children: bool) -> Self {
        let class_tags = if is_detached(category) {
            vec![DETACHED_TAG.to_string()]
        } else {
            Vec::new()
        };
        Self {
            category: category.to_string(),
            has_children,
            class_tags,
            fields: common_fields(),
            templates: Vec::new(),
        }
    }

    fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    fn template(mut self, template: BlockTemplate) -> Self {
        self.templates.push(template);
        self
    }

    pub fn is_detached(&self) -> bool {
        self.class_tags.iter().any(|tag| tag == DETACHED_TAG)
    }

    pub fn field_def(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn get_template(&self, id: &str) -> Option<&BlockTemplate> {
        self.templates.iter().find(|template| template.id == id)
    }

    pub fn templates(&self) -> &[BlockTemplate] {
        &self.templates
    }
}

fn common_fields() -> Vec<FieldDef> {
    vec![
        FieldDef::new(DISPLAY_NAME_FIELD, FieldType::String, Value::Null),
        FieldDef::new("start", FieldType::Date, Value::Null).inheritable(),
        FieldDef::new("due", FieldType::Date, Value::Null).inheritable(),
        FieldDef::new("graceperiod", FieldType::Timedelta, Value::Null).inheritable(),
        FieldDef::new("format", FieldType::String, Value::Null).inheritable(),
        FieldDef::new("graded", FieldType::Boolean, json!(false)).inheritable(),
        FieldDef::new("showanswer", FieldType::String, json!("finished")).inheritable(),
        FieldDef::new("rerandomize", FieldType::String, json!("never")).inheritable(),
        FieldDef::new("days_early_for_beta", FieldType::Float, Value::Null).inheritable(),
        FieldDef::new("visible_to_staff_only", FieldType::Boolean, json!(false)).inheritable(),
        FieldDef::new("xqa_key", FieldType::String, Value::Null).inheritable(),
    ]
}

/// Category -> block type lookup used by create, save and render.
#[derive(Debug, Clone)]
pub struct BlockTypeRegistry {
    types: HashMap<String, BlockType>,
}

impl BlockTypeRegistry {
    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    pub fn register(&mut self, block_type: BlockType) {
        self.types.insert(block_type.category.clone(), block_type);
    }

    pub fn get(&self, category: &str) -> Option<&BlockType> {
        self.types.get(category)
    }

    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = self.types.keys().map(String::as_str).collect();
        categories.sort_unstable();
        categories
    }

    pub fn builtin() -> Self {
        let mut registry = Self::empty();

        registry.register(
            BlockType::new("course", true)
                .field(FieldDef::new("end", FieldType::Date, Value::Null))
                .field(FieldDef::new("advertised_start", FieldType::String, Value::Null))
                .field(FieldDef::new("tabs", FieldType::List, json!([])))
                .field(FieldDef::new("grading_policy", FieldType::Dict, Value::Null))
                .field(FieldDef::new("course_image", FieldType::String, json!("images_course_image.jpg"))),
        );
        registry.register(BlockType::new("chapter", true));
        registry.register(BlockType::new("sequential", true));
        registry.register(BlockType::new("vertical", true));
        registry.register(
            BlockType::new("html", false)
                .field(FieldDef::new("editor", FieldType::String, json!("visual")))
                .template(BlockTemplate::new(
                    "announcement.yaml",
                    "Announcement",
                    Some(json!("<ol><li><h2>Date</h2>Announcement text</li></ol>")),
                ))
                .template(BlockTemplate::new(
                    "raw.yaml",
                    "Raw HTML",
                    Some(json!("<p>This template is similar to the Text template.</p>")),
                ).with_metadata("editor", json!("raw"))),
        );
        registry.register(
            BlockType::new("problem", false)
                .field(FieldDef::new("weight", FieldType::Float, Value::Null))
                .field(FieldDef::new("max_attempts", FieldType::Integer, Value::Null))
                .field(FieldDef::new("markdown", FieldType::String, Value::Null))
                .template(BlockTemplate::new(
                    "multiplechoice.yaml",
                    "Multiple Choice",
                    Some(json!(
                        "<problem><multiplechoiceresponse><choicegroup type=\"MultipleChoice\"><choice correct=\"false\">one</choice><choice correct=\"true\">two</choice></choicegroup></multiplechoiceresponse></problem>"
                    )),
                ))
                .template(BlockTemplate::new(
                    "numericalresponse.yaml",
                    "Numerical Input",
                    Some(json!(
                        "<problem><numericalresponse answer=\"42\"><formulaequationinput/></numericalresponse></problem>"
                    )),
                ).with_metadata("markdown", json!("= 42"))),
        );
        registry.register(
            BlockType::new("video", false)
                .field(FieldDef::new("youtube_id_1_0", FieldType::String, json!("OEoXaMPEzfM")))
                .field(FieldDef::new("sub", FieldType::String, json!("")))
                .field(FieldDef::new("transcripts", FieldType::Dict, json!({})))
                .field(FieldDef::new("show_captions", FieldType::Boolean, json!(true)))
                .field(FieldDef::new("start_time", FieldType::Timedelta, Value::Null))
                .field(FieldDef::new("end_time", FieldType::Timedelta, Value::Null)),
        );
        registry.register(
            BlockType::new("discussion", false)
                .field(FieldDef::new("discussion_id", FieldType::String, Value::Null))
                .field(FieldDef::new("discussion_category", FieldType::String, json!("Week 1")))
                .field(FieldDef::new("discussion_target", FieldType::String, json!("Topic-Level Student-Visible Label"))),
        );
        registry.register(BlockType::new("about", false));
        registry.register(BlockType::new("static_tab", false));
        registry.register(
            BlockType::new("course_info", false)
                .field(FieldDef::new("items", FieldType::List, json!([]))),
        );

        registry
    }
}

impl Default for BlockTypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
