// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::{HttpRequest, HttpResponse, Result, web};
use serde_json::json;

use super::{LocatorPath, error_response, require_user};
use crate::app_state::AppState;

pub async fn list_orphans(
    req: HttpRequest,
    path: web::Path<LocatorPath>,
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

    let result = app_state
        .run("orphan.list", move |engine| engine.list_orphans(&locator, &user))
        .await;
    Ok(match result {
        Ok(orphans) => HttpResponse::Ok().json(orphans),
        Err(err) => error_response(&err),
    })
}

pub async fn delete_orphans(
    req: HttpRequest,
    path: web::Path<LocatorPath>,
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

    let result = app_state
        .run("orphan.delete", move |engine| {
            engine.delete_orphans(&locator, &user)
        })
        .await;
    Ok(match result {
        Ok(deleted) => HttpResponse::Ok().json(json!({ "deleted": deleted })),
        Err(err) => error_response(&err),
    })
}
