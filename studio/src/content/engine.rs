// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::content::block_types::{
    BlockType, BlockTypeRegistry, creates_if_not_found, is_detached, is_direct_only,
};
use crate::content::errors::{ItemError, ItemErrorKind, ItemResult};
use crate::content::grading::{SectionGrader, section_grader_type, update_section_grader_type};
use crate::content::loc_mapper::{LocMapper, LocatorTranslator};
use crate::content::location::{CourseKey, Locator, Location};
use crate::content::node::{ContentNode, PublishState};
use crate::content::render::{
    BlockRenderer, CONTAINER_PREVIEW, Fragment, FragmentResource, STUDENT_VIEW, STUDIO_VIEW,
    TemplateRenderer, ViewRequest, block_label, hash_resources,
};
use crate::content::static_urls::replace_static_urls;
use crate::content::store::{ContentStore, PublishStore, StoreRegistry};
use crate::content::subtitles::{SubtitleManager, TranscriptRecorder};
use crate::iam::{AccessCheck, RoleAccess, User};
use crate::templates::{
    COMPONENT_TEMPLATE, CONTAINER_COMPONENT_TEMPLATE, HTML_ERROR_TEMPLATE, XBlockContext,
    component_context, container_component_context, error_context,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

const HANDOUTS_BLOCK: &str = "handouts";
const COURSE_INFO_CATEGORY: &str = "course_info";
const VIDEO_CATEGORY: &str = "video";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishAction {
    MakePublic,
    MakePrivate,
    CreateDraft,
}

#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub parent_locator: Locator,
    pub category: String,
    pub display_name: Option<String>,
    pub boilerplate: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DuplicateRequest {
    pub parent_locator: Locator,
    pub source_locator: Locator,
    pub display_name: Option<String>,
}

/// Edits applied by a save. Every part is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveRequest {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub children: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default)]
    pub nullout: Option<Vec<String>>,
    #[serde(default, rename = "graderType")]
    pub grader_type: Option<String>,
    #[serde(default)]
    pub publish: Option<PublishAction>,
}

/// `{id, data, metadata}` view of a node, plus the grader type after a
/// grading change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRecord {
    pub id: String,
    pub data: Value,
    pub metadata: Map<String, Value>,
    #[serde(rename = "graderType", skip_serializing_if = "Option::is_none")]
    pub grader_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedView {
    pub html: String,
    pub resources: Vec<(String, FragmentResource)>,
}

/// Python-style truthiness used to decide whether a save carries new data.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_none_or(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

fn fresh_name() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Item operations over the store, mapper and collaborators. Holds no
/// state of its own between calls.
#[derive(Clone)]
pub struct ItemEngine {
    stores: StoreRegistry,
    mapper: Arc<dyn LocatorTranslator>,
    block_types: Arc<BlockTypeRegistry>,
    access: Arc<dyn AccessCheck>,
    subtitles: Arc<dyn SubtitleManager>,
    renderer: Arc<dyn BlockRenderer>,
}

impl ItemEngine {
    pub fn new(stores: StoreRegistry, mapper: Arc<dyn LocatorTranslator>) -> Self {
        Self {
            stores,
            mapper,
            block_types: Arc::new(BlockTypeRegistry::builtin()),
            access: Arc::new(RoleAccess),
            subtitles: Arc::new(TranscriptRecorder::new()),
            renderer: Arc::new(TemplateRenderer::default()),
        }
    }

    pub fn with_block_types(mut self, block_types: Arc<BlockTypeRegistry>) -> Self {
        self.block_types = block_types;
        self
    }

    pub fn with_access(mut self, access: Arc<dyn AccessCheck>) -> Self {
        self.access = access;
        self
    }

    pub fn with_subtitles(mut self, subtitles: Arc<dyn SubtitleManager>) -> Self {
        self.subtitles = subtitles;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn BlockRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn stores(&self) -> &StoreRegistry {
        &self.stores
    }

    pub fn mapper(&self) -> &dyn LocatorTranslator {
        self.mapper.as_ref()
    }

    // ----- address helpers -----

    fn resolve(&self, locator: &Locator) -> ItemResult<Location> {
        self.mapper.translate_locator(locator).ok_or_else(|| {
            ItemError::invalid_address(format!("No location mapped for locator {}", locator))
        })
    }

    fn course_of(&self, locator: &Locator) -> ItemResult<Location> {
        self.mapper.course_location(locator).ok_or_else(|| {
            ItemError::invalid_address(format!("Unknown course package: {}", locator.package_id))
        })
    }

    fn require_course_access(&self, user: &User, locator: &Locator) -> ItemResult<Location> {
        let course = self.course_of(locator)?;
        if !self.access.has_course_access(user, &course) {
            log::warn!("{} denied access to {}", user.email, course);
            return Err(ItemError::permission(format!(
                "No access to course {}",
                locator.package_id
            )));
        }
        Ok(course)
    }

    fn block_type(&self, category: &str) -> ItemResult<&BlockType> {
        self.block_types
            .get(category)
            .ok_or_else(|| ItemError::validation(format!("Unknown block category: {}", category)))
    }

    fn publisher(&self) -> ItemResult<&dyn PublishStore> {
        self.stores
            .draft()
            .as_publisher()
            .ok_or_else(|| ItemError::store("draft store has no publish support"))
    }

    /// Fetches the node, creating an empty one for auto-creatable categories.
    fn get_or_create(&self, location: &Location, user: Option<&str>) -> ItemResult<ContentNode> {
        let store = self.stores.for_location(location);
        match store.get_item(location) {
            Ok(node) => Ok(node),
            Err(err) if err.kind() == ItemErrorKind::NotFound => {
                if !creates_if_not_found(&location.category) {
                    return Err(err);
                }
                log::info!("Creating missing {} on first access", location);
                store.create_item(ContentNode::new(location.clone()), user)?;
                store.get_item(location)
            }
            Err(err) => Err(err),
        }
    }

    /// Post-order walk of the subtree under `node`. Missing children are
    /// skipped; each location is visited once.
    fn walk_post_order(
        &self,
        node: &ContentNode,
        visited: &mut HashSet<Location>,
        action: &mut dyn FnMut(&ContentNode) -> ItemResult<()>,
    ) -> ItemResult<()> {
        if !visited.insert(node.location.clone()) {
            return Ok(());
        }
        for child in &node.children {
            match self.stores.for_location(child).get_item(child) {
                Ok(child_node) => self.walk_post_order(&child_node, visited, action)?,
                Err(err) if err.kind() == ItemErrorKind::NotFound => {
                    log::warn!("Skipping missing child {} of {}", child, node.location);
                }
                Err(err) => return Err(err),
            }
        }
        action(node)
    }

    fn recurse(
        &self,
        node: &ContentNode,
        mut action: impl FnMut(&ContentNode) -> ItemResult<()>,
    ) -> ItemResult<()> {
        let mut visited = HashSet::new();
        self.walk_post_order(node, &mut visited, &mut action)
    }

    fn existing_children(&self, node: &ContentNode) -> ItemResult<Vec<ContentNode>> {
        let mut children = Vec::with_capacity(node.children.len());
        for child in &node.children {
            match self.stores.for_location(child).get_item(child) {
                Ok(child_node) => children.push(child_node),
                Err(err) if err.kind() == ItemErrorKind::NotFound => {
                    log::warn!("Child {} of {} is missing", child, node.location);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(children)
    }

    // ----- create -----

    pub fn create_item(&self, request: &CreateRequest, user: &User) -> ItemResult<Locator> {
        let parent_location = self.resolve(&request.parent_locator)?;
        self.require_course_access(user, &request.parent_locator)?;
        let block_type = self.block_type(&request.category)?;

        let parent_store = self.stores.for_location(&parent_location);
        let mut parent = parent_store.get_item(&parent_location)?;
        let dest_location = parent_location.replace_category_name(&request.category, &fresh_name());

        let mut node = ContentNode::new(dest_location.clone());
        if let Some(template_id) = &request.boilerplate {
            match block_type.get_template(template_id) {
                Some(template) => {
                    node.metadata = template.metadata.clone();
                    if let Some(data) = &template.data {
                        node.set_data(data.clone());
                    }
                }
                None => log::debug!(
                    "No boilerplate {} for {}; using defaults",
                    template_id,
                    request.category
                ),
            }
        }
        if let Some(display_name) = &request.display_name {
            node.set_display_name(display_name.clone());
        }

        self.stores
            .for_category(&request.category)
            .create_item(node, Some(&user.email))?;

        if !block_type.is_detached() {
            parent.children.push(dest_location.clone());
            parent_store.update_item(parent, Some(&user.email))?;
        }
        log::info!("{} created {}", user.email, dest_location);

        self.mapper
            .translate_location(&request.parent_locator.package_id, &dest_location, true)
    }

    // ----- duplicate -----

    pub fn duplicate_item(&self, request: &DuplicateRequest, user: &User) -> ItemResult<Locator> {
        let parent_location = self.resolve(&request.parent_locator)?;
        let source_location = self.resolve(&request.source_locator)?;
        self.require_course_access(user, &request.parent_locator)?;
        self.require_course_access(user, &request.source_locator)?;
        if !source_location.same_course(&parent_location) {
            return Err(ItemError::invalid_address(format!(
                "Cannot duplicate {} into another course",
                source_location
            )));
        }

        let dest = self.duplicate(
            &parent_location,
            &source_location,
            request.display_name.as_deref(),
            user,
        )?;
        self.mapper
            .translate_location(&request.parent_locator.package_id, &dest, true)
    }

    /// Copies `source` and its subtree under fresh names and links the copy
    /// into `parent`, right after the source when the source is its child.
    pub fn duplicate(
        &self,
        parent_location: &Location,
        source_location: &Location,
        display_name: Option<&str>,
        user: &User,
    ) -> ItemResult<Location> {
        let mut ancestors = Vec::new();
        let dest =
            self.duplicate_subtree(source_location, display_name, user, &mut ancestors)?;

        if !is_detached(&dest.category) {
            let parent_store = self.stores.for_location(parent_location);
            let mut parent = parent_store.get_item(parent_location)?;
            match parent
                .children
                .iter()
                .position(|child| child == source_location)
            {
                Some(index) => parent.children.insert(index + 1, dest.clone()),
                None => parent.children.push(dest.clone()),
            }
            parent_store.update_item(parent, Some(&user.email))?;
        }
        log::info!("{} duplicated {} as {}", user.email, source_location, dest);
        Ok(dest)
    }

    fn duplicate_subtree(
        &self,
        source_location: &Location,
        display_name: Option<&str>,
        user: &User,
        ancestors: &mut Vec<Location>,
    ) -> ItemResult<Location> {
        if ancestors.contains(source_location) {
            return Err(ItemError::validation(format!(
                "Child reference cycle through {}",
                source_location
            )));
        }
        let source = self
            .stores
            .for_location(source_location)
            .get_item(source_location)?;
        let dest_location = source_location.replace_name(&fresh_name());

        let mut copy = ContentNode::new(dest_location.clone());
        copy.metadata = source.metadata.clone();
        copy.content = source.content.clone();
        let label = match (display_name, source.display_name()) {
            (Some(name), _) => name.to_string(),
            (None, Some(name)) => format!("Duplicate of '{}'", name),
            (None, None) => format!("Duplicate of {}", source.category()),
        };
        copy.set_display_name(label);

        let store = self.stores.for_location(&dest_location);
        store.create_item(copy, Some(&user.email))?;

        if !source.children.is_empty() {
            ancestors.push(source_location.clone());
            let mut children = Vec::with_capacity(source.children.len());
            for child in &source.children {
                children.push(self.duplicate_subtree(child, None, user, ancestors)?);
            }
            ancestors.pop();

            let mut copy = store.get_item(&dest_location)?;
            copy.children = children;
            store.update_item(copy, Some(&user.email))?;
        }
        Ok(dest_location)
    }

    // ----- save -----

    /// Resolves the locator of a save, mapping an unmapped `handouts` block
    /// to the course's `course_info/handouts` node.
    fn resolve_for_save(&self, locator: &Locator) -> ItemResult<(Locator, Location)> {
        if let Some(location) = self.mapper.translate_locator(locator) {
            return Ok((locator.clone(), location));
        }
        if locator.block_id != HANDOUTS_BLOCK {
            return Err(ItemError::invalid_address(format!(
                "No location mapped for locator {}",
                locator
            )));
        }
        let course = self.course_of(locator)?;
        let location = course.replace_category_name(COURSE_INFO_CATEGORY, HANDOUTS_BLOCK);
        let mapped = self
            .mapper
            .translate_location(&locator.package_id, &location, true)?;
        Ok((mapped, location))
    }

    pub fn save_item(
        &self,
        locator: &Locator,
        request: &SaveRequest,
        user: &User,
    ) -> ItemResult<ItemRecord> {
        self.require_course_access(user, locator)?;
        let (locator, location) = self.resolve_for_save(locator)?;
        self.save(&locator, &location, request, user)
    }

    pub fn save(
        &self,
        locator: &Locator,
        location: &Location,
        request: &SaveRequest,
        user: &User,
    ) -> ItemResult<ItemRecord> {
        let children = request
            .children
            .as_deref()
            .map(|children| self.resolve_children(location, children))
            .transpose()?;
        let editor = Some(user.email.as_str());
        let store = self.stores.for_location(location);
        let mut node = self.get_or_create(location, editor)?;
        let old_metadata = node.metadata.clone();

        match request.publish {
            Some(PublishAction::MakePrivate) => {
                let publisher = self.publisher()?;
                self.recurse(&node, |item| publisher.unpublish(&item.location))?;
            }
            Some(PublishAction::CreateDraft) => {
                let publisher = self.publisher()?;
                self.recurse(&node, |item| publisher.convert_to_draft(&item.location))?;
            }
            _ => {}
        }

        let data = match &request.data {
            Some(data) if is_truthy(data) => {
                node.set_data(data.clone());
                data.clone()
            }
            _ => Value::Object(node.content.clone()),
        };

        if let Some(children) = children {
            node.children = children;
        }

        if request.nullout.is_some() || request.metadata.is_some() {
            let block_type = self.block_type(node.category())?;
            for key in request.nullout.iter().flatten() {
                if block_type.field_def(key).is_none() {
                    return Err(unknown_field(key, node.category()));
                }
                node.metadata.insert(key.clone(), Value::Null);
            }
            for (key, value) in request.metadata.iter().flatten() {
                let field = block_type
                    .field_def(key)
                    .ok_or_else(|| unknown_field(key, node.category()))?;
                if value.is_null() {
                    node.metadata.remove(key);
                } else {
                    let coerced = field.from_json(value).map_err(|err| {
                        log::debug!("Rejected metadata for {}: {}", location, err);
                        ItemError::validation("Invalid data")
                    })?;
                    node.metadata.insert(key.clone(), coerced);
                }
            }
            if node.category() == VIDEO_CATEGORY {
                self.subtitles
                    .manage_subtitles_save(&node, &old_metadata, &user.email)?;
            }
        }

        store.update_item(node.clone(), editor)?;

        let mut record = ItemRecord {
            id: locator.to_string(),
            data,
            metadata: node.metadata.clone(),
            grader_type: None,
        };

        if let Some(grader_type) = &request.grader_type {
            let applied = update_section_grader_type(&mut node, grader_type);
            store.update_item(node.clone(), editor)?;
            record.grader_type = Some(applied);
        }

        if request.publish == Some(PublishAction::MakePublic) {
            self.recurse(&node, |item| {
                match self.stores.for_location(&item.location).as_publisher() {
                    Some(publisher) => publisher.publish(&item.location, editor),
                    None => Ok(()),
                }
            })?;
        }

        log::info!("{} saved {}", user.email, location);
        Ok(record)
    }

    /// Child locators of a save, all of which must live in the course of
    /// `location`.
    fn resolve_children(
        &self,
        location: &Location,
        children: &[String],
    ) -> ItemResult<Vec<Location>> {
        let mut resolved = Vec::with_capacity(children.len());
        for raw in children {
            let child_locator = Locator::parse(raw).map_err(|err| {
                ItemError::invalid_address(format!("Invalid child locator {}: {}", raw, err))
            })?;
            let child = self.resolve(&child_locator)?;
            if !child.same_course(location) {
                return Err(ItemError::invalid_address(format!(
                    "Child {} does not belong to the course of {}",
                    child, location
                )));
            }
            resolved.push(child);
        }
        Ok(resolved)
    }

    // ----- delete -----

    pub fn delete_item(
        &self,
        locator: &Locator,
        cascade_children: bool,
        all_versions: bool,
        user: &User,
    ) -> ItemResult<()> {
        self.require_course_access(user, locator)?;
        let location = self.resolve(locator)?;
        self.delete(&location, cascade_children, all_versions, user)
    }

    pub fn delete(
        &self,
        location: &Location,
        cascade_children: bool,
        all_versions: bool,
        user: &User,
    ) -> ItemResult<()> {
        let store = self.stores.for_location(location);
        let item = store.get_item(location)?;

        if cascade_children {
            self.recurse(&item, |node| {
                self.stores
                    .for_location(&node.location)
                    .delete_item(&node.location, all_versions)
            })?;
        } else {
            store.delete_item(location, all_versions)?;
        }

        if all_versions {
            for view in self.stores.views() {
                detach_from_parents(view, location, &user.email)?;
            }
        }
        log::info!(
            "{} deleted {} (recurse={}, all_versions={})",
            user.email,
            location,
            cascade_children,
            all_versions
        );
        Ok(())
    }

    // ----- orphans -----

    pub fn list_orphans(&self, locator: &Locator, user: &User) -> ItemResult<Vec<Location>> {
        self.require_course_access(user, locator)?;
        let root = self.resolve(locator)?;
        self.stores.draft().get_orphans(&root)
    }

    pub fn delete_orphans(&self, locator: &Locator, user: &User) -> ItemResult<Vec<Location>> {
        if !self.access.is_staff(user) {
            return Err(ItemError::permission("Deleting orphans requires staff access"));
        }
        let root = self.resolve(locator)?;
        let orphans = self.stores.draft().get_orphans(&root)?;
        for orphan in &orphans {
            self.stores.draft().delete_item(orphan, true)?;
        }
        log::info!("{} deleted {} orphan(s) under {}", user.email, orphans.len(), root);
        Ok(orphans)
    }

    // ----- read path -----

    pub fn item_info(&self, locator: &Locator, user: &User) -> ItemResult<ItemRecord> {
        self.require_course_access(user, locator)?;
        let location = self.resolve(locator)?;
        let node = self.get_or_create(&location, Some(&user.email))?;

        let data = match node.data() {
            None => Value::String(String::new()),
            Some(Value::String(text)) => Value::String(replace_static_urls(
                text,
                &location.org,
                &location.course,
            )),
            Some(other) => other.clone(),
        };
        Ok(ItemRecord {
            id: locator.to_string(),
            data,
            metadata: node.metadata,
            grader_type: None,
        })
    }

    pub fn section_grader(&self, locator: &Locator, user: &User) -> ItemResult<SectionGrader> {
        self.require_course_access(user, locator)?;
        let location = self.resolve(locator)?;
        let node = self.stores.for_location(&location).get_item(&location)?;
        Ok(SectionGrader {
            grader_type: section_grader_type(&node),
            location: locator.to_string(),
        })
    }

    fn is_read_only(&self, node: &ContentNode) -> ItemResult<bool> {
        if is_direct_only(node.category()) {
            return Ok(false);
        }
        Ok(self.publisher()?.publish_state(&node.location)? == PublishState::Public)
    }

    /// Renders a view, turning render failures into an inline error fragment.
    fn render_or_error(&self, request: &ViewRequest<'_>) -> ItemResult<Fragment> {
        match self.renderer.render_view(request) {
            Ok(fragment) => Ok(fragment),
            Err(err) => {
                log::debug!(
                    "Unable to render {} for {}: {}",
                    request.view_name,
                    request.node.location,
                    err
                );
                let html = self
                    .renderer
                    .render_template(HTML_ERROR_TEMPLATE, error_context(err.message()))
                    .map_err(|err| ItemError::store(err.to_string()))?;
                Ok(Fragment::new(html))
            }
        }
    }

    pub fn rendered_view(
        &self,
        locator: &Locator,
        view_name: &str,
        user: &User,
    ) -> ItemResult<RenderedView> {
        self.require_course_access(user, locator)?;
        let location = self.resolve(locator)?;
        let node = self.stores.for_location(&location).get_item(&location)?;
        let block_type = self.block_type(node.category())?;
        let read_only = self.is_read_only(&node)?;
        let root = location.url();

        let fragment = match view_name {
            STUDIO_VIEW => {
                let context = XBlockContext::new(&root, false, read_only);
                self.render_or_error(&ViewRequest {
                    node: &node,
                    block_type,
                    view_name,
                    context: &context,
                    children: &[],
                })?
            }
            STUDENT_VIEW if block_type.has_children => {
                let context = XBlockContext::new(&root, false, read_only);
                let html = self
                    .renderer
                    .render_template(
                        CONTAINER_COMPONENT_TEMPLATE,
                        container_component_context(
                            &context,
                            &block_label(&node),
                            &locator.to_string(),
                        ),
                    )
                    .map_err(|err| ItemError::store(err.to_string()))?;
                return Ok(RenderedView {
                    html,
                    resources: Vec::new(),
                });
            }
            STUDENT_VIEW | CONTAINER_PREVIEW => {
                let is_container_view = view_name == CONTAINER_PREVIEW;
                let context = XBlockContext::new(&root, is_container_view, read_only);
                let children = self.existing_children(&node)?;
                let mut fragment = self.render_or_error(&ViewRequest {
                    node: &node,
                    block_type,
                    view_name,
                    context: &context,
                    children: &children,
                })?;
                if !is_container_view {
                    fragment.content = self
                        .renderer
                        .render_template(
                            COMPONENT_TEMPLATE,
                            component_context(&context, &block_label(&node), &fragment.content),
                        )
                        .map_err(|err| ItemError::store(err.to_string()))?;
                }
                fragment
            }
            other => {
                return Err(ItemError::new(
                    ItemErrorKind::UnknownView,
                    format!("Unknown view: {}", other),
                ));
            }
        };

        Ok(RenderedView {
            html: fragment.content,
            resources: hash_resources(&fragment.resources),
        })
    }
}

fn unknown_field(key: &str, category: &str) -> ItemError {
    ItemError::validation(format!("Unknown field {} for {} blocks", key, category))
}

/// Removes `location` from the child list of every parent seen by `view`.
fn detach_from_parents(view: &dyn ContentStore, location: &Location, user: &str) -> ItemResult<()> {
    for parent_location in view.get_parent_locations(location) {
        let mut parent = view.get_item(&parent_location)?;
        parent.children.retain(|child| child != location);
        view.update_item(parent, Some(user))?;
        log::debug!(
            "Removed {} from {} in {} view",
            location,
            parent_location,
            view.name()
        );
    }
    Ok(())
}

/// Registers the course with the mapper and creates its root node when
/// missing. Returns the root locator.
pub fn ensure_course(
    stores: &StoreRegistry,
    mapper: &LocMapper,
    key: &CourseKey,
    display_name: Option<&str>,
) -> ItemResult<Locator> {
    let root_locator = mapper.register_course(key)?;
    let root = key.root_location();
    let store = stores.for_location(&root);
    if !store.has_item(&root) {
        let mut node = ContentNode::new(root.clone());
        if let Some(name) = display_name {
            node.set_display_name(name);
        }
        store.create_item(node, None)?;
        log::info!("Seeded course root {}", root);
    }
    Ok(root_locator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PACKAGE: &str = "MITx.999.2014";

    struct Fixture {
        engine: ItemEngine,
        mapper: Arc<LocMapper>,
        root: Locator,
        subtitles: Arc<TranscriptRecorder>,
    }

    fn author() -> User {
        User {
            email: "author@example.com".to_string(),
            name: "Author".to_string(),
            roles: vec!["instructor:MITx/999".to_string()],
        }
    }

    fn staff() -> User {
        User {
            email: "staff@example.com".to_string(),
            name: "Staff".to_string(),
            roles: vec!["staff".to_string()],
        }
    }

    fn outsider() -> User {
        User {
            email: "outsider@example.com".to_string(),
            name: "Outsider".to_string(),
            roles: vec!["instructor:MITx/101".to_string()],
        }
    }

    fn fixture() -> Fixture {
        let stores = StoreRegistry::in_memory();
        let mapper = Arc::new(LocMapper::in_memory());
        let key = CourseKey::new("MITx", "999", "2014").unwrap();
        let root = ensure_course(&stores, &mapper, &key, Some("Robots")).unwrap();
        let subtitles = Arc::new(TranscriptRecorder::new());
        let engine = ItemEngine::new(stores, mapper.clone()).with_subtitles(subtitles.clone());
        Fixture {
            engine,
            mapper,
            root,
            subtitles,
        }
    }

    /// Registers MITx/101/2015 next to the fixture course and returns a
    /// chapter created in it.
    fn other_course_chapter(f: &Fixture) -> Locator {
        let key = CourseKey::new("MITx", "101", "2015").unwrap();
        let root = ensure_course(f.engine.stores(), &f.mapper, &key, Some("Other")).unwrap();
        f.engine
            .create_item(
                &CreateRequest {
                    parent_locator: root,
                    category: "chapter".to_string(),
                    display_name: Some("Theirs".to_string()),
                    boilerplate: None,
                },
                &outsider(),
            )
            .unwrap()
    }

    fn create(engine: &ItemEngine, parent: &Locator, category: &str, name: Option<&str>) -> Locator {
        engine
            .create_item(
                &CreateRequest {
                    parent_locator: parent.clone(),
                    category: category.to_string(),
                    display_name: name.map(str::to_string),
                    boilerplate: None,
                },
                &author(),
            )
            .unwrap()
    }

    fn node(engine: &ItemEngine, locator: &Locator) -> ContentNode {
        let location = engine.mapper().translate_locator(locator).unwrap();
        engine.stores().for_location(&location).get_item(&location).unwrap()
    }

    fn location(engine: &ItemEngine, locator: &Locator) -> Location {
        engine.mapper().translate_locator(locator).unwrap()
    }

    /// course -> chapter -> sequential -> vertical -> [html, problem]
    fn outline(f: &Fixture) -> (Locator, Locator, Locator, Locator, Locator) {
        let chapter = create(&f.engine, &f.root, "chapter", Some("Week 1"));
        let sequential = create(&f.engine, &chapter, "sequential", Some("Lesson"));
        let vertical = create(&f.engine, &sequential, "vertical", Some("Unit"));
        let html = create(&f.engine, &vertical, "html", Some("Intro"));
        let problem = create(&f.engine, &vertical, "problem", None);
        (chapter, sequential, vertical, html, problem)
    }

    #[test]
    fn created_locator_resolves_to_new_child() {
        let f = fixture();
        let chapter = create(&f.engine, &f.root, "chapter", Some("Week 1"));
        let chapter_loc = location(&f.engine, &chapter);
        assert_eq!(chapter_loc.category, "chapter");
        assert_eq!(chapter_loc.name.len(), 32);
        assert_eq!(node(&f.engine, &chapter).display_name(), Some("Week 1"));
        assert_eq!(node(&f.engine, &f.root).children, vec![chapter_loc]);
    }

    #[test]
    fn create_seeds_from_boilerplate_and_overrides_name() {
        let f = fixture();
        let (_, _, vertical, _, _) = outline(&f);
        let locator = f
            .engine
            .create_item(
                &CreateRequest {
                    parent_locator: vertical,
                    category: "problem".to_string(),
                    display_name: Some("Answer".to_string()),
                    boilerplate: Some("numericalresponse.yaml".to_string()),
                },
                &author(),
            )
            .unwrap();
        let created = node(&f.engine, &locator);
        assert_eq!(created.display_name(), Some("Answer"));
        assert!(created.data().is_some());
    }

    #[test]
    fn detached_create_is_not_linked_into_parent() {
        let f = fixture();
        let tab = create(&f.engine, &f.root, "static_tab", Some("Syllabus"));
        assert!(f.engine.stores().direct().has_item(&location(&f.engine, &tab)));
        assert!(node(&f.engine, &f.root).children.is_empty());
    }

    #[test]
    fn create_checks_access_and_category() {
        let f = fixture();
        let request = CreateRequest {
            parent_locator: f.root.clone(),
            category: "chapter".to_string(),
            display_name: None,
            boilerplate: None,
        };
        let err = f.engine.create_item(&request, &outsider()).unwrap_err();
        assert_eq!(err.kind(), ItemErrorKind::Permission);

        let unknown = CreateRequest {
            category: "hologram".to_string(),
            ..request
        };
        let err = f.engine.create_item(&unknown, &author()).unwrap_err();
        assert_eq!(err.kind(), ItemErrorKind::Validation);
    }

    #[test]
    fn duplicate_copies_subtree_after_source() {
        let f = fixture();
        let (_, sequential, vertical, html, _) = outline(&f);
        let sequential_loc = location(&f.engine, &sequential);
        let vertical_loc = location(&f.engine, &vertical);
        let original_vertical = node(&f.engine, &vertical);

        let dest = f
            .engine
            .duplicate(&sequential_loc, &vertical_loc, None, &author())
            .unwrap();
        let stores = f.engine.stores();
        let copy = stores.for_location(&dest).get_item(&dest).unwrap();
        assert_eq!(copy.display_name(), Some("Duplicate of 'Unit'"));
        assert_eq!(copy.children.len(), 2);
        for (copied, original) in copy.children.iter().zip(&original_vertical.children) {
            assert_ne!(copied, original);
            assert_eq!(copied.category, original.category);
        }
        let html_copy = stores.draft().get_item(&copy.children[0]).unwrap();
        assert_eq!(html_copy.display_name(), Some("Duplicate of 'Intro'"));
        let problem_copy = stores.draft().get_item(&copy.children[1]).unwrap();
        assert_eq!(problem_copy.display_name(), Some("Duplicate of problem"));

        assert_eq!(
            node(&f.engine, &sequential).children,
            vec![vertical_loc.clone(), dest]
        );
        assert_eq!(node(&f.engine, &vertical), original_vertical);
        assert_eq!(node(&f.engine, &html).display_name(), Some("Intro"));
    }

    #[test]
    fn duplicate_into_other_parent_appends_with_given_name() {
        let f = fixture();
        let (chapter, _, _, html, _) = outline(&f);
        let other_unit = {
            let sequential = create(&f.engine, &chapter, "sequential", None);
            create(&f.engine, &sequential, "vertical", None)
        };
        let locator = f
            .engine
            .duplicate_item(
                &DuplicateRequest {
                    parent_locator: other_unit.clone(),
                    source_locator: html,
                    display_name: Some("Copy".to_string()),
                },
                &author(),
            )
            .unwrap();
        assert_eq!(node(&f.engine, &locator).display_name(), Some("Copy"));
        assert_eq!(
            node(&f.engine, &other_unit).children,
            vec![location(&f.engine, &locator)]
        );
    }

    #[test]
    fn duplicate_rejects_child_cycles() {
        let f = fixture();
        let (_, sequential, vertical, _, _) = outline(&f);
        let vertical_loc = location(&f.engine, &vertical);
        let stores = f.engine.stores();
        let mut looped = stores.draft().get_item(&vertical_loc).unwrap();
        looped.children.push(vertical_loc.clone());
        stores.draft().update_item(looped, None).unwrap();

        let err = f
            .engine
            .duplicate(&location(&f.engine, &sequential), &vertical_loc, None, &author())
            .unwrap_err();
        assert_eq!(err.kind(), ItemErrorKind::Validation);
    }

    #[test]
    fn duplicate_from_another_course_is_rejected_untouched() {
        let f = fixture();
        let theirs = other_course_chapter(&f);
        let other_root = Locator::new("MITx.101.2015", "draft", None, "2015").unwrap();
        let other_root_children = node(&f.engine, &other_root).children;
        let request = DuplicateRequest {
            parent_locator: f.root.clone(),
            source_locator: theirs,
            display_name: None,
        };

        let err = f.engine.duplicate_item(&request, &author()).unwrap_err();
        assert_eq!(err.kind(), ItemErrorKind::Permission);

        let err = f.engine.duplicate_item(&request, &staff()).unwrap_err();
        assert_eq!(err.kind(), ItemErrorKind::InvalidAddress);

        assert!(node(&f.engine, &f.root).children.is_empty());
        assert_eq!(node(&f.engine, &other_root).children, other_root_children);
        for root in [&f.root, &other_root] {
            let orphans = f
                .engine
                .stores()
                .draft()
                .get_orphans(&location(&f.engine, root))
                .unwrap();
            assert!(orphans.is_empty(), "{:?}", orphans);
        }
    }

    #[test]
    fn save_refuses_children_from_another_course() {
        let f = fixture();
        let (chapter, sequential, _, _, _) = outline(&f);
        let theirs = other_course_chapter(&f);
        let request = SaveRequest {
            children: Some(vec![sequential.to_string(), theirs.to_string()]),
            ..SaveRequest::default()
        };

        for user in [author(), staff()] {
            let err = f.engine.save_item(&chapter, &request, &user).unwrap_err();
            assert_eq!(err.kind(), ItemErrorKind::InvalidAddress);
        }
        assert_eq!(
            node(&f.engine, &chapter).children,
            vec![location(&f.engine, &sequential)]
        );

        f.engine.delete_item(&chapter, true, true, &author()).unwrap();
        let other_root = Locator::new("MITx.101.2015", "draft", None, "2015").unwrap();
        assert_eq!(
            node(&f.engine, &other_root).children,
            vec![location(&f.engine, &theirs)]
        );
        assert!(f.engine.stores().draft().has_item(&location(&f.engine, &theirs)));
    }

    #[test]
    fn metadata_null_and_nullout_differ() {
        let f = fixture();
        let (_, _, _, html, _) = outline(&f);
        let cleared = f
            .engine
            .save_item(
                &html,
                &SaveRequest {
                    metadata: Some(json!({"display_name": null}).as_object().unwrap().clone()),
                    ..SaveRequest::default()
                },
                &author(),
            )
            .unwrap();
        assert!(!cleared.metadata.contains_key("display_name"));

        let nulled = f
            .engine
            .save_item(
                &html,
                &SaveRequest {
                    nullout: Some(vec!["display_name".to_string()]),
                    ..SaveRequest::default()
                },
                &author(),
            )
            .unwrap();
        assert_eq!(nulled.metadata.get("display_name"), Some(&Value::Null));
        assert_ne!(cleared.metadata, nulled.metadata);
    }

    #[test]
    fn save_coerces_and_rejects_metadata() {
        let f = fixture();
        let (_, _, _, _, problem) = outline(&f);
        let saved = f
            .engine
            .save_item(
                &problem,
                &SaveRequest {
                    metadata: Some(json!({"graded": "true"}).as_object().unwrap().clone()),
                    ..SaveRequest::default()
                },
                &author(),
            )
            .unwrap();
        assert_eq!(saved.metadata.get("graded"), Some(&json!(true)));

        let err = f
            .engine
            .save_item(
                &problem,
                &SaveRequest {
                    metadata: Some(json!({"graded": [1]}).as_object().unwrap().clone()),
                    ..SaveRequest::default()
                },
                &author(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ItemErrorKind::Validation);
        assert_eq!(err.message(), "Invalid data");

        let err = f
            .engine
            .save_item(
                &problem,
                &SaveRequest {
                    nullout: Some(vec!["no_such_field".to_string()]),
                    ..SaveRequest::default()
                },
                &author(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ItemErrorKind::Validation);
    }

    #[test]
    fn save_without_data_reports_content_fields() {
        let f = fixture();
        let (_, _, _, html, _) = outline(&f);
        f.engine
            .save_item(
                &html,
                &SaveRequest {
                    data: Some(json!("<p>Hi</p>")),
                    ..SaveRequest::default()
                },
                &author(),
            )
            .unwrap();
        let record = f
            .engine
            .save_item(
                &html,
                &SaveRequest {
                    data: Some(json!("")),
                    ..SaveRequest::default()
                },
                &author(),
            )
            .unwrap();
        assert_eq!(record.data, json!({"data": "<p>Hi</p>"}));
        assert_eq!(node(&f.engine, &html).data(), Some(&json!("<p>Hi</p>")));
    }

    #[test]
    fn save_replaces_children_and_rejects_unknown_locators() {
        let f = fixture();
        let (_, _, vertical, html, problem) = outline(&f);
        f.engine
            .save_item(
                &vertical,
                &SaveRequest {
                    children: Some(vec![problem.to_string(), html.to_string()]),
                    ..SaveRequest::default()
                },
                &author(),
            )
            .unwrap();
        assert_eq!(
            node(&f.engine, &vertical).children,
            vec![location(&f.engine, &problem), location(&f.engine, &html)]
        );

        let err = f
            .engine
            .save_item(
                &vertical,
                &SaveRequest {
                    children: Some(vec![format!("{}/branch/draft/block/nope", PACKAGE)]),
                    ..SaveRequest::default()
                },
                &author(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ItemErrorKind::InvalidAddress);
    }

    #[test]
    fn make_public_publishes_the_updated_data() {
        let f = fixture();
        let (_, _, vertical, html, _) = outline(&f);
        f.engine
            .save_item(
                &vertical,
                &SaveRequest {
                    publish: Some(PublishAction::MakePublic),
                    ..SaveRequest::default()
                },
                &author(),
            )
            .unwrap();
        f.engine
            .save_item(
                &html,
                &SaveRequest {
                    data: Some(json!("<p>new</p>")),
                    publish: Some(PublishAction::MakePublic),
                    ..SaveRequest::default()
                },
                &author(),
            )
            .unwrap();
        let html_loc = location(&f.engine, &html);
        let published = f.engine.stores().direct().get_item(&html_loc).unwrap();
        assert_eq!(published.data(), Some(&json!("<p>new</p>")));
        let publisher = f.engine.stores().draft().as_publisher().unwrap();
        assert_eq!(publisher.publish_state(&html_loc).unwrap(), PublishState::Public);
    }

    #[test]
    fn make_private_and_create_draft_recurse() {
        let f = fixture();
        let (_, _, vertical, html, _) = outline(&f);
        let publish = SaveRequest {
            publish: Some(PublishAction::MakePublic),
            ..SaveRequest::default()
        };
        f.engine.save_item(&vertical, &publish, &author()).unwrap();
        let publisher = f.engine.stores().draft().as_publisher().unwrap();
        let html_loc = location(&f.engine, &html);

        let draft = SaveRequest {
            publish: Some(PublishAction::CreateDraft),
            ..SaveRequest::default()
        };
        f.engine.save_item(&vertical, &draft, &author()).unwrap();
        assert_eq!(publisher.publish_state(&html_loc).unwrap(), PublishState::Draft);

        f.engine.save_item(&vertical, &publish, &author()).unwrap();
        let private = SaveRequest {
            publish: Some(PublishAction::MakePrivate),
            ..SaveRequest::default()
        };
        f.engine.save_item(&vertical, &private, &author()).unwrap();
        assert_eq!(publisher.publish_state(&html_loc).unwrap(), PublishState::Private);
    }

    #[test]
    fn grader_type_is_merged_into_result() {
        let f = fixture();
        let (_, sequential, _, _, _) = outline(&f);
        let record = f
            .engine
            .save_item(
                &sequential,
                &SaveRequest {
                    grader_type: Some("Homework".to_string()),
                    ..SaveRequest::default()
                },
                &author(),
            )
            .unwrap();
        assert_eq!(record.grader_type.as_deref(), Some("Homework"));
        let grader = f.engine.section_grader(&sequential, &author()).unwrap();
        assert_eq!(grader.grader_type, "Homework");
        assert_eq!(grader.location, sequential.to_string());
    }

    #[test]
    fn video_metadata_edits_reach_subtitle_hook() {
        let f = fixture();
        let (_, _, vertical, _, _) = outline(&f);
        let video = create(&f.engine, &vertical, "video", None);
        f.engine
            .save_item(
                &video,
                &SaveRequest {
                    metadata: Some(json!({"sub": "abc"}).as_object().unwrap().clone()),
                    ..SaveRequest::default()
                },
                &author(),
            )
            .unwrap();
        let changes = f.subtitles.changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "sub");
        assert_eq!(changes[0].new, Some(json!("abc")));
    }

    #[test]
    fn handouts_are_created_on_first_save() {
        let f = fixture();
        let handouts = Locator::new(PACKAGE, "draft", None, "handouts").unwrap();
        let record = f
            .engine
            .save_item(
                &handouts,
                &SaveRequest {
                    data: Some(json!("<ol></ol>")),
                    ..SaveRequest::default()
                },
                &author(),
            )
            .unwrap();
        let stored = Location::new("MITx", "999", "course_info", "handouts").unwrap();
        assert_eq!(
            f.engine.stores().direct().get_item(&stored).unwrap().data(),
            Some(&json!("<ol></ol>"))
        );
        let mapped = Locator::parse(&record.id).unwrap();
        assert_eq!(f.engine.mapper().translate_locator(&mapped), Some(stored));
    }

    #[test]
    fn cascade_delete_all_versions_repairs_parents() {
        let f = fixture();
        let (_, sequential, vertical, html, problem) = outline(&f);
        let publish = SaveRequest {
            publish: Some(PublishAction::MakePublic),
            ..SaveRequest::default()
        };
        f.engine.save_item(&vertical, &publish, &author()).unwrap();

        f.engine
            .delete_item(&vertical, true, true, &author())
            .unwrap();

        let stores = f.engine.stores();
        for removed in [&vertical, &html, &problem] {
            let loc = location(&f.engine, removed);
            assert!(!stores.draft().has_item(&loc));
            assert!(!stores.direct().has_item(&loc));
        }
        assert!(node(&f.engine, &sequential).children.is_empty());
    }

    #[test]
    fn delete_missing_item_is_not_found() {
        let f = fixture();
        let (_, _, _, html, _) = outline(&f);
        f.engine.delete_item(&html, false, true, &author()).unwrap();
        let err = f
            .engine
            .delete_item(&html, false, true, &author())
            .unwrap_err();
        assert_eq!(err.kind(), ItemErrorKind::NotFound);
    }

    #[test]
    fn orphans_are_listed_and_deleted_by_staff_only() {
        let f = fixture();
        let (_, _, vertical, html, _) = outline(&f);
        let html_loc = location(&f.engine, &html);
        f.engine
            .save_item(
                &vertical,
                &SaveRequest {
                    children: Some(Vec::new()),
                    ..SaveRequest::default()
                },
                &author(),
            )
            .unwrap();

        let orphans = f.engine.list_orphans(&f.root, &author()).unwrap();
        assert!(orphans.contains(&html_loc));
        assert_eq!(orphans.len(), 2);

        let err = f.engine.delete_orphans(&f.root, &author()).unwrap_err();
        assert_eq!(err.kind(), ItemErrorKind::Permission);
        let deleted = f.engine.delete_orphans(&f.root, &staff()).unwrap();
        assert_eq!(deleted, orphans);
        assert!(f.engine.list_orphans(&f.root, &author()).unwrap().is_empty());
    }

    #[test]
    fn item_info_rewrites_static_urls() {
        let f = fixture();
        let (_, _, _, html, problem) = outline(&f);
        f.engine
            .save_item(
                &html,
                &SaveRequest {
                    data: Some(json!("<img src=\"/static/img/a.png\"/>")),
                    ..SaveRequest::default()
                },
                &author(),
            )
            .unwrap();
        let info = f.engine.item_info(&html, &author()).unwrap();
        assert_eq!(info.data, json!("<img src=\"/c4x/MITx/999/asset/img_a.png\"/>"));
        assert_eq!(info.id, html.to_string());
        assert_eq!(info.metadata.get("display_name"), Some(&json!("Intro")));

        let empty = f.engine.item_info(&problem, &author()).unwrap();
        assert_eq!(empty.data, json!(""));
    }

    #[test]
    fn item_info_requires_course_access() {
        let f = fixture();
        let err = f.engine.item_info(&f.root, &outsider()).unwrap_err();
        assert_eq!(err.kind(), ItemErrorKind::Permission);
        let unknown = Locator::new("Other.1.2", "draft", None, "2").unwrap();
        let err = f.engine.item_info(&unknown, &author()).unwrap_err();
        assert_eq!(err.kind(), ItemErrorKind::InvalidAddress);
    }

    #[test]
    fn student_view_of_container_links_to_container_page() {
        let f = fixture();
        let (_, _, vertical, _, _) = outline(&f);
        let view = f
            .engine
            .rendered_view(&vertical, STUDENT_VIEW, &author())
            .unwrap();
        assert!(view.html.contains("Unit"));
        assert!(view.resources.is_empty());
    }

    #[test]
    fn student_view_of_leaf_is_wrapped_and_read_only_once_public() {
        let f = fixture();
        let (_, _, _, html, _) = outline(&f);
        let view = f.engine.rendered_view(&html, STUDENT_VIEW, &author()).unwrap();
        assert!(view.html.contains("component-label"));
        assert!(!view.html.contains("data-read-only"));
        assert!(!view.resources.is_empty());

        f.engine
            .save_item(
                &html,
                &SaveRequest {
                    publish: Some(PublishAction::MakePublic),
                    ..SaveRequest::default()
                },
                &author(),
            )
            .unwrap();
        let view = f.engine.rendered_view(&html, STUDENT_VIEW, &author()).unwrap();
        assert!(view.html.contains("data-read-only=\"true\""));
    }

    #[test]
    fn render_failure_becomes_error_fragment() {
        let f = fixture();
        let (_, _, _, html, _) = outline(&f);
        f.engine
            .save_item(
                &html,
                &SaveRequest {
                    data: Some(json!({"not": "markup"})),
                    ..SaveRequest::default()
                },
                &author(),
            )
            .unwrap();
        let view = f
            .engine
            .rendered_view(&html, CONTAINER_PREVIEW, &author())
            .unwrap();
        assert!(view.html.contains("not renderable"));
        assert!(view.resources.is_empty());
    }

    #[test]
    fn unknown_view_is_reported() {
        let f = fixture();
        let err = f
            .engine
            .rendered_view(&f.root, "fancy_view", &author())
            .unwrap_err();
        assert_eq!(err.kind(), ItemErrorKind::UnknownView);
    }
}
