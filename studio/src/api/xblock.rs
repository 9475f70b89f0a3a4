// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::{HttpRequest, HttpResponse, Result, web};
use serde::Deserialize;
use serde_json::json;

use super::{
    LocatorPath, accepts_json, error_response, not_acceptable, parse_locator, query_flag,
    require_user,
};
use crate::app_state::AppState;
use crate::content::{CreateRequest, DuplicateRequest, ItemError, SaveRequest};

const GRADER_TYPE_FIELD: &str = "graderType";

/// `fields` is a comma separated list; asking for `graderType` anywhere in it
/// selects the section grader view.
fn requests_grader_type(fields: Option<&str>) -> bool {
    fields.is_some_and(|fields| {
        fields
            .split(',')
            .any(|field| field.trim() == GRADER_TYPE_FIELD)
    })
}

#[derive(Debug, Deserialize)]
pub struct ItemQuery {
    #[serde(default)]
    fields: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    recurse: Option<String>,
    #[serde(default)]
    all_versions: Option<String>,
}

/// Body of a create or duplicate call. A `duplicate_source_locator` makes it
/// a duplicate.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
    parent_locator: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    boilerplate: Option<String>,
    #[serde(default)]
    duplicate_source_locator: Option<String>,
}

pub async fn missing_package_id() -> Result<HttpResponse> {
    Ok(HttpResponse::BadRequest()
        .content_type("text/plain; charset=utf-8")
        .body("Only instance creation is supported without a package_id."))
}

pub async fn get_item(
    req: HttpRequest,
    path: web::Path<LocatorPath>,
    query: web::Query<ItemQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(response) => return Ok(response),
    };
    if !accepts_json(&req) {
        return Ok(not_acceptable());
    }
    let locator = match path.locator() {
        Ok(locator) => locator,
        Err(err) => return Ok(error_response(&err)),
    };

    if requests_grader_type(query.fields.as_deref()) {
        let result = app_state
            .run("xblock.grader_type", move |engine| {
                engine.section_grader(&locator, &user)
            })
            .await;
        return Ok(match result {
            Ok(grader) => HttpResponse::Ok().json(grader),
            Err(err) => error_response(&err),
        });
    }

    let result = app_state
        .run("xblock.get", move |engine| engine.item_info(&locator, &user))
        .await;
    Ok(match result {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(err) => error_response(&err),
    })
}

pub async fn save_item(
    req: HttpRequest,
    path: web::Path<LocatorPath>,
    body: web::Json<SaveRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(response) => return Ok(response),
    };
    let locator = match path.locator() {
        Ok(locator) => locator,
        Err(err) => return Ok(error_response(&err)),
    };
    let request = body.into_inner();

    let result = app_state
        .run("xblock.save", move |engine| {
            engine.save_item(&locator, &request, &user)
        })
        .await;
    Ok(match result {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(err) => error_response(&err),
    })
}

pub async fn create_item(
    req: HttpRequest,
    body: web::Json<CreateBody>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(response) => return Ok(response),
    };
    let body = body.into_inner();
    let parent_locator = match parse_locator(&body.parent_locator) {
        Ok(locator) => locator,
        Err(err) => return Ok(error_response(&err)),
    };

    let result = if let Some(source) = &body.duplicate_source_locator {
        let source_locator = match parse_locator(source) {
            Ok(locator) => locator,
            Err(err) => return Ok(error_response(&err)),
        };
        let request = DuplicateRequest {
            parent_locator,
            source_locator,
            display_name: body.display_name,
        };
        app_state
            .run("xblock.duplicate", move |engine| {
                engine.duplicate_item(&request, &user)
            })
            .await
    } else {
        let Some(category) = body.category.filter(|category| !category.is_empty()) else {
            return Ok(error_response(&ItemError::validation(
                "category is required to create an item",
            )));
        };
        let request = CreateRequest {
            parent_locator,
            category,
            display_name: body.display_name,
            boilerplate: body.boilerplate,
        };
        app_state
            .run("xblock.create", move |engine| engine.create_item(&request, &user))
            .await
    };

    Ok(match result {
        Ok(locator) => HttpResponse::Ok().json(json!({ "locator": locator.to_string() })),
        Err(err) => error_response(&err),
    })
}

pub async fn delete_item(
    req: HttpRequest,
    path: web::Path<LocatorPath>,
    query: web::Query<DeleteQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let user = match require_user(&req) {
        Ok(user) => user,
        Err(response) => return Ok(response),
    };
    let locator = match path.locator() {
        Ok(locator) => locator,
        Err(err) => return Ok(error_response(&err)),
    };
    let recurse = query_flag(&query.recurse);
    let all_versions = query_flag(&query.all_versions);

    let result = app_state
        .run("xblock.delete", move |engine| {
            engine.delete_item(&locator, recurse, all_versions, &user)
        })
        .await;
    Ok(match result {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(err) => error_response(&err),
    })
}
