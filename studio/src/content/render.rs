// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::content::block_types::BlockType;
use crate::content::node::ContentNode;
use crate::templates::{
    MiniJinjaEngine, STUDENT_VIEW_TEMPLATE, STUDIO_VIEW_TEMPLATE, TemplateEngine, XBlockContext,
};
use minijinja::context;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

pub const STUDIO_VIEW: &str = "studio_view";
pub const STUDENT_VIEW: &str = "student_view";
pub const CONTAINER_PREVIEW: &str = "container_preview";

const STUDIO_CSS: &str = "/static/css/xblock/studio.css";
const PREVIEW_CSS: &str = "/static/css/xblock/preview.css";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FragmentResource {
    pub kind: String,
    pub data: String,
    pub mimetype: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<String>,
}

impl FragmentResource {
    pub fn url(url: &str, mimetype: &str, placement: &str) -> Self {
        Self {
            kind: "url".to_string(),
            data: url.to_string(),
            mimetype: mimetype.to_string(),
            placement: Some(placement.to_string()),
        }
    }
}

/// Rendered markup plus the resources the page must load for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub content: String,
    pub resources: Vec<FragmentResource>,
}

impl Fragment {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            resources: Vec::new(),
        }
    }

    pub fn add_resource(&mut self, resource: FragmentResource) {
        self.resources.push(resource);
    }
}

#[derive(Debug, Clone)]
pub struct RenderError {
    message: String,
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RenderError {}

impl From<minijinja::Error> for RenderError {
    fn from(err: minijinja::Error) -> Self {
        RenderError::new(err.to_string())
    }
}

/// Everything a renderer needs for one view of one block.
pub struct ViewRequest<'a> {
    pub node: &'a ContentNode,
    pub block_type: &'a BlockType,
    pub view_name: &'a str,
    pub context: &'a XBlockContext,
    /// Direct children that still exist, in child-list order.
    pub children: &'a [ContentNode],
}

pub trait BlockRenderer: Send + Sync {
    fn render_view(&self, request: &ViewRequest<'_>) -> Result<Fragment, RenderError>;

    fn render_template(
        &self,
        template_name: &str,
        context: minijinja::Value,
    ) -> Result<String, RenderError>;
}

/// Display label: the display name, or the category when unnamed.
pub fn block_label(node: &ContentNode) -> String {
    node.display_name()
        .map(str::to_string)
        .unwrap_or_else(|| node.category().to_string())
}

/// Pairs each resource with the hex SHA-256 of its JSON form, dropping
/// repeats and keeping first-seen order.
pub fn hash_resources(resources: &[FragmentResource]) -> Vec<(String, FragmentResource)> {
    let mut seen = HashSet::new();
    let mut hashed = Vec::new();
    for resource in resources {
        let encoded = match serde_json::to_vec(resource) {
            Ok(encoded) => encoded,
            Err(err) => {
                log::warn!("Skipping unserializable fragment resource: {}", err);
                continue;
            }
        };
        let digest = format!("{:x}", Sha256::digest(&encoded));
        if seen.insert(digest.clone()) {
            hashed.push((digest, resource.clone()));
        }
    }
    hashed
}

#[derive(Serialize)]
struct FieldRow {
    name: String,
    field_type: &'static str,
    value: String,
    explicit: bool,
}

#[derive(Serialize)]
struct ChildRow {
    location: String,
    category: String,
    label: String,
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Renders block views from the embedded MiniJinja templates.
pub struct TemplateRenderer {
    engine: Arc<dyn TemplateEngine>,
}

impl TemplateRenderer {
    pub fn new(engine: Arc<dyn TemplateEngine>) -> Self {
        Self { engine }
    }

    fn studio_view(&self, request: &ViewRequest<'_>) -> Result<Fragment, RenderError> {
        let node = request.node;
        let fields: Vec<FieldRow> = request
            .block_type
            .fields()
            .iter()
            .map(|field| {
                let explicit = node.metadata.get(&field.name);
                FieldRow {
                    name: field.name.clone(),
                    field_type: field.field_type.name(),
                    value: display_value(explicit.unwrap_or(&field.default)),
                    explicit: explicit.is_some(),
                }
            })
            .collect();
        let has_data = node.data().is_some() || !request.block_type.has_children;
        let data = node.data().map(display_value).unwrap_or_default();

        let html = self.engine.render(
            STUDIO_VIEW_TEMPLATE,
            context! {
                category => node.category(),
                location => node.location.url(),
                fields => minijinja::Value::from_serialize(&fields),
                has_data => has_data,
                data => data,
            },
        )?;
        let mut fragment = Fragment::new(html);
        fragment.add_resource(FragmentResource::url(STUDIO_CSS, "text/css", "head"));
        fragment.add_resource(FragmentResource::url(
            &format!("/static/js/xblock/{}_editor.js", node.category()),
            "application/javascript",
            "foot",
        ));
        Ok(fragment)
    }

    fn preview(&self, request: &ViewRequest<'_>) -> Result<Fragment, RenderError> {
        let node = request.node;
        let body = match node.data() {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(markup)) => markup.clone(),
            Some(_) => {
                return Err(RenderError::new(format!(
                    "data of {} is not renderable markup",
                    node.location
                )));
            }
        };
        let children: Vec<ChildRow> = request
            .children
            .iter()
            .map(|child| ChildRow {
                location: child.location.url(),
                category: child.category().to_string(),
                label: block_label(child),
            })
            .collect();

        let html = self.engine.render(
            STUDENT_VIEW_TEMPLATE,
            context! {
                xblock_context => request.context.to_value(),
                category => node.category(),
                location => node.location.url(),
                label => block_label(node),
                body => body,
                children => minijinja::Value::from_serialize(&children),
            },
        )?;
        let mut fragment = Fragment::new(html);
        fragment.add_resource(FragmentResource::url(PREVIEW_CSS, "text/css", "head"));
        match node.category() {
            "video" => fragment.add_resource(FragmentResource::url(
                "/static/js/xblock/video.js",
                "application/javascript",
                "foot",
            )),
            "problem" => fragment.add_resource(FragmentResource::url(
                "/static/js/capa/display.js",
                "application/javascript",
                "foot",
            )),
            _ => {}
        }
        Ok(fragment)
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new(Arc::new(MiniJinjaEngine::new()))
    }
}

impl BlockRenderer for TemplateRenderer {
    fn render_view(&self, request: &ViewRequest<'_>) -> Result<Fragment, RenderError> {
        match request.view_name {
            STUDIO_VIEW => self.studio_view(request),
            STUDENT_VIEW | CONTAINER_PREVIEW => self.preview(request),
            other => Err(RenderError::new(format!(
                "{} blocks have no view named {}",
                request.node.category(),
                other
            ))),
        }
    }

    fn render_template(
        &self,
        template_name: &str,
        context: minijinja::Value,
    ) -> Result<String, RenderError> {
        Ok(self.engine.render(template_name, context)?)
    }
}
