// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::{HttpRequest, HttpResponse, Result, web};
use serde::Deserialize;

use super::{accepts_json, error_response, not_acceptable, require_user};
use crate::app_state::AppState;
use crate::content::{ItemError, Locator};

#[derive(Debug, Deserialize)]
pub struct ViewPath {
    package_id: String,
    branch: String,
    block: String,
    view_name: String,
}

impl ViewPath {
    fn locator(&self) -> Result<Locator, ItemError> {
        Locator::new(&self.package_id, &self.branch, None, &self.block)
            .map_err(|err| ItemError::invalid_address(format!("Invalid locator: {}", err)))
    }
}

/// `{html, resources}` for one view of a block.
pub async fn xblock_view(
    req: HttpRequest,
    path: web::Path<ViewPath>,
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
    let view_name = path.into_inner().view_name;

    let result = app_state
        .run("xblock.view", move |engine| {
            engine.rendered_view(&locator, &view_name, &user)
        })
        .await;
    Ok(match result {
        Ok(view) => HttpResponse::Ok().json(view),
        Err(err) => error_response(&err),
    })
}
