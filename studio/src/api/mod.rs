// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::error::InternalError;
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use serde_json::json;

use crate::content::{ItemError, ItemErrorKind, Locator};
use crate::iam::{AuthRequest, User};

mod orphans;
mod views;
mod xblock;

const LOCATOR_PATH: &str = "/{package_id}/branch/{branch}/block/{block}";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config()).service(
        web::resource("/xblock")
            .route(web::post().to(xblock::create_item))
            .route(web::put().to(xblock::create_item))
            .route(web::get().to(xblock::missing_package_id))
            .route(web::delete().to(xblock::missing_package_id)),
    )
    .service(
        web::resource(format!("/xblock{}", LOCATOR_PATH))
            .route(web::get().to(xblock::get_item))
            .route(web::post().to(xblock::save_item))
            .route(web::put().to(xblock::save_item))
            .route(web::delete().to(xblock::delete_item)),
    )
    .service(
        web::resource(format!("/xblock{}/{{view_name}}", LOCATOR_PATH))
            .route(web::get().to(views::xblock_view)),
    )
    .service(
        web::resource(format!("/orphan{}", LOCATOR_PATH))
            .route(web::get().to(orphans::list_orphans))
            .route(web::delete().to(orphans::delete_orphans)),
    );
}

/// Malformed request bodies answer 400 with a JSON error.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(json!({
            "error": format!("Invalid request body: {}", err)
        }));
        InternalError::from_response(err, response).into()
    })
}

/// The locator segments of an item URL.
#[derive(Debug, Deserialize)]
pub struct LocatorPath {
    pub package_id: String,
    pub branch: String,
    pub block: String,
}

impl LocatorPath {
    pub fn locator(&self) -> Result<Locator, ItemError> {
        Locator::new(&self.package_id, &self.branch, None, &self.block)
            .map_err(|err| ItemError::invalid_address(format!("Invalid locator: {}", err)))
    }
}

pub fn parse_locator(raw: &str) -> Result<Locator, ItemError> {
    Locator::parse(raw)
        .map_err(|err| ItemError::invalid_address(format!("Invalid locator {}: {}", raw, err)))
}

/// The authenticated user, or the 401 response to send instead.
pub fn require_user(req: &HttpRequest) -> Result<User, HttpResponse> {
    req.user_info().ok_or_else(|| {
        log::debug!("Unauthenticated request to {}", req.path());
        HttpResponse::Unauthorized().json(json!({
            "error": "Authentication required"
        }))
    })
}

/// A missing Accept header counts as accepting JSON.
pub fn accepts_json(req: &HttpRequest) -> bool {
    let Some(accept) = req.headers().get(header::ACCEPT) else {
        return true;
    };
    let Ok(accept) = accept.to_str() else {
        return false;
    };
    accept.split(',').any(|entry| {
        let media = entry.split(';').next().unwrap_or("").trim();
        media.is_empty()
            || media.eq_ignore_ascii_case("application/json")
            || media == "application/*"
            || media == "*/*"
    })
}

pub fn not_acceptable() -> HttpResponse {
    HttpResponse::NotAcceptable().json(json!({
        "error": "Only application/json responses are available"
    }))
}

pub fn error_response(err: &ItemError) -> HttpResponse {
    let body = json!({ "error": err.message() });
    match err.kind() {
        ItemErrorKind::Permission => HttpResponse::Forbidden().json(body),
        ItemErrorKind::NotFound | ItemErrorKind::InvalidAddress | ItemErrorKind::UnknownView => {
            HttpResponse::NotFound().json(body)
        }
        ItemErrorKind::Validation => HttpResponse::BadRequest().json(body),
        ItemErrorKind::Busy => {
            log::warn!("Rejected request: {}", err);
            HttpResponse::ServiceUnavailable()
                .insert_header((header::RETRY_AFTER, "1"))
                .json(body)
        }
        ItemErrorKind::Store => {
            log::error!("Item operation failed: {}", err);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

/// Truthy query flags: present and not `false`/`0`/empty.
pub fn query_flag(value: &Option<String>) -> bool {
    match value.as_deref() {
        None => false,
        Some(raw) => {
            let raw = raw.trim();
            !(raw.is_empty() || raw == "0" || raw.eq_ignore_ascii_case("false"))
        }
    }
}
