// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

mod common;

use actix_web::http::{StatusCode, header};
use actix_web::test;
use serde_json::json;

use common::{ROOT_LOCATOR, add_auth_headers, create_outline, read_json, xblock_uri};

fn view_uri(locator: &str, view_name: &str) -> String {
    format!("{}/{}", xblock_uri(locator), view_name)
}

#[actix_web::test]
async fn leaf_student_view_returns_fragment() {
    let harness = common::TestHarness::new().await;
    let app = test::init_service(common::build_test_app(harness.app_bundle())).await;
    let session = harness.author_auth();
    let outline = create_outline(&app, &session).await;

    let req = add_auth_headers(
        test::TestRequest::get().uri(&view_uri(&outline.html, "student_view")),
        &session,
    )
    .insert_header((header::ACCEPT, "application/json"))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    let html = body["html"].as_str().expect("html");
    assert!(html.contains("component-label"));
    assert!(!html.contains("data-read-only"));

    let resources = body["resources"].as_array().expect("resources");
    assert!(!resources.is_empty());
    for pair in resources {
        let pair = pair.as_array().expect("hash and resource");
        assert_eq!(pair.len(), 2);
        assert!(pair[0].is_string());
        assert!(pair[1]["kind"].is_string());
    }
}

#[actix_web::test]
async fn published_leaf_renders_read_only() {
    let harness = common::TestHarness::new().await;
    let app = test::init_service(common::build_test_app(harness.app_bundle())).await;
    let session = harness.author_auth();
    let outline = create_outline(&app, &session).await;

    let req = add_auth_headers(test::TestRequest::put().uri(&xblock_uri(&outline.html)), &session)
        .set_json(json!({"publish": "make_public"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = add_auth_headers(
        test::TestRequest::get().uri(&view_uri(&outline.html, "student_view")),
        &session,
    )
    .to_request();
    let body = read_json(test::call_service(&app, req).await).await;
    assert!(body["html"].as_str().expect("html").contains("data-read-only=\"true\""));
}

#[actix_web::test]
async fn container_student_view_links_to_container() {
    let harness = common::TestHarness::new().await;
    let app = test::init_service(common::build_test_app(harness.app_bundle())).await;
    let session = harness.author_auth();
    let outline = create_outline(&app, &session).await;

    let req = add_auth_headers(
        test::TestRequest::get().uri(&view_uri(&outline.vertical, "student_view")),
        &session,
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert!(body["html"].as_str().expect("html").contains("Unit"));
    assert_eq!(body["resources"], json!([]));
}

#[actix_web::test]
async fn unknown_view_and_html_accept_are_rejected() {
    let harness = common::TestHarness::new().await;
    let app = test::init_service(common::build_test_app(harness.app_bundle())).await;
    let session = harness.author_auth();

    let req = add_auth_headers(
        test::TestRequest::get().uri(&view_uri(ROOT_LOCATOR, "fancy_view")),
        &session,
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(read_json(resp).await["error"].is_string());

    let req = add_auth_headers(
        test::TestRequest::get().uri(&view_uri(ROOT_LOCATOR, "student_view")),
        &session,
    )
    .insert_header((header::ACCEPT, "text/html"))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_ACCEPTABLE);
}
