// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

#![allow(dead_code)]

use actix_http::Request;
use actix_web::body::BoxBody;
use actix_web::cookie::Cookie;
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::{StatusCode, header};
use actix_web::{App, HttpRequest, HttpResponse, Result, test, web};
use serde_json::{Value, json};
use std::sync::Arc;
use studio::api;
use studio::app_state::AppState;
use studio::config::ValidatedConfig;
use studio::iam::{JwtAuthMiddlewareFactory, MemoryUserStore, User, UserServices};
use studio::util::TestConfigBuilder;
use studio::util::test_fixtures::TestFixtureRoot;

pub const PACKAGE_ID: &str = "MITx.999.2014";
pub const ROOT_LOCATOR: &str = "MITx.999.2014/branch/draft/block/2014";

pub const AUTHOR_EMAIL: &str = "author@example.com";
pub const STAFF_EMAIL: &str = "staff@example.com";
pub const OUTSIDER_EMAIL: &str = "outsider@example.com";

pub struct TestHarness {
    pub fixture: TestFixtureRoot,
    pub config: Arc<ValidatedConfig>,
    pub app_state: Arc<AppState>,
    pub user_services: Arc<UserServices>,
    pub author: User,
    pub staff: User,
    pub outsider: User,
}

pub struct AuthSession {
    pub user: User,
    pub jwt_token: String,
    pub cookie: Cookie<'static>,
}

#[derive(Clone)]
pub struct AppBundle {
    pub app_state: Arc<AppState>,
    pub user_services: Arc<UserServices>,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_config(TestConfigBuilder::new().build())
    }

    pub fn with_config(config: ValidatedConfig) -> Self {
        let fixture = TestFixtureRoot::new_unique("api-test-suite").expect("fixture root");
        fixture.init_runtime_layout().expect("fixture layout");
        let runtime_paths = fixture.runtime_paths().expect("runtime paths");

        let author = user(AUTHOR_EMAIL, "Course Author", &["instructor:MITx/999"]);
        let staff = user(STAFF_EMAIL, "Studio Staff", &["staff"]);
        let outsider = user(OUTSIDER_EMAIL, "Other Author", &["instructor:MITx/101"]);

        let store = MemoryUserStore::from_users(vec![
            author.clone(),
            staff.clone(),
            outsider.clone(),
        ]);
        let user_services =
            Arc::new(UserServices::new_with_store(&config, Arc::new(store)).expect("user services"));
        let app_state =
            Arc::new(AppState::from_config(&config, &runtime_paths).expect("app state"));

        Self {
            fixture,
            config: Arc::new(config),
            app_state,
            user_services,
            author,
            staff,
            outsider,
        }
    }

    pub fn author_auth(&self) -> AuthSession {
        self.session_for(&self.author)
    }

    pub fn staff_auth(&self) -> AuthSession {
        self.session_for(&self.staff)
    }

    pub fn outsider_auth(&self) -> AuthSession {
        self.session_for(&self.outsider)
    }

    fn session_for(&self, user: &User) -> AuthSession {
        let jwt_service = self.user_services.jwt_service();
        let token = jwt_service.create_token(user).expect("jwt token");
        let cookie = Cookie::new(jwt_service.cookie_name().to_string(), token.clone());
        AuthSession {
            user: user.clone(),
            jwt_token: token,
            cookie,
        }
    }

    pub fn app_bundle(&self) -> AppBundle {
        AppBundle {
            app_state: self.app_state.clone(),
            user_services: self.user_services.clone(),
        }
    }
}

fn user(email: &str, name: &str, roles: &[&str]) -> User {
    User {
        email: email.to_string(),
        name: name.to_string(),
        roles: roles.iter().map(|role| role.to_string()).collect(),
    }
}

pub fn build_test_app(
    bundle: AppBundle,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::from(bundle.app_state))
        .app_data(web::Data::from(bundle.user_services))
        .wrap(JwtAuthMiddlewareFactory)
        .configure(api::configure)
        .default_service(web::route().to(test_default_not_found))
}

async fn test_default_not_found(req: HttpRequest) -> Result<HttpResponse> {
    Ok(HttpResponse::NotFound()
        .content_type("text/plain; charset=utf-8")
        .body(format!("No route for {}", req.path())))
}

pub fn add_auth_headers(
    req: actix_web::test::TestRequest,
    session: &AuthSession,
) -> actix_web::test::TestRequest {
    req.insert_header((
        header::AUTHORIZATION,
        format!("Bearer {}", session.jwt_token),
    ))
}

pub fn add_auth_cookie(
    req: actix_web::test::TestRequest,
    session: &AuthSession,
) -> actix_web::test::TestRequest {
    req.cookie(session.cookie.clone())
}

pub fn xblock_uri(locator: &str) -> String {
    format!("/xblock/{}", locator)
}

pub fn orphan_uri(locator: &str) -> String {
    format!("/orphan/{}", locator)
}

pub async fn read_json(resp: ServiceResponse<BoxBody>) -> Value {
    let body = test::read_body(resp).await;
    serde_json::from_slice(&body).expect("json body")
}

/// Creates an item through the API and returns its locator string.
pub async fn create_item<S>(
    app: &S,
    session: &AuthSession,
    parent: &str,
    category: &str,
    display_name: Option<&str>,
) -> String
where
    S: Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error>,
{
    let mut payload = json!({
        "parent_locator": parent,
        "category": category,
    });
    if let Some(name) = display_name {
        payload["display_name"] = json!(name);
    }
    let req = add_auth_headers(test::TestRequest::post().uri("/xblock"), session)
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::OK, "create {}", category);
    let body = read_json(resp).await;
    body["locator"].as_str().expect("locator").to_string()
}

/// chapter -> sequential -> vertical -> html under the course root.
pub async fn create_outline<S>(app: &S, session: &AuthSession) -> Outline
where
    S: Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error>,
{
    let chapter = create_item(app, session, ROOT_LOCATOR, "chapter", Some("Week 1")).await;
    let sequential = create_item(app, session, &chapter, "sequential", Some("Lesson")).await;
    let vertical = create_item(app, session, &sequential, "vertical", Some("Unit")).await;
    let html = create_item(app, session, &vertical, "html", Some("Intro")).await;
    Outline {
        chapter,
        sequential,
        vertical,
        html,
    }
}

pub struct Outline {
    pub chapter: String,
    pub sequential: String,
    pub vertical: String,
    pub html: String,
}
