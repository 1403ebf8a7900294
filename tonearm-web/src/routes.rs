// Tonearm - Content management and storefront backend for hi-fi brands
// Copyright (C) 2025 Tonearm Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use axum::extract::DefaultBodyLimit;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tonearm_core::{
    CarouselSlide, Category, Dealer, Download, Faq, FeaturedItem, FooterLink, HomeVideo,
    NewsArticle, Page, Product,
};
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::{
    config::Backend,
    handlers::{
        self,
        admin::{resource_routes, sortable_routes},
    },
    rate_limit::{login_rate_limit_middleware, MFA_PATH, SIGN_IN_PATH},
    visits::visit_logging_middleware,
    AppState,
};

/// Where locally stored files are served; matches the hosted public URL shape
pub const PUBLIC_STORAGE_PATH: &str = "/storage/v1/object/public";

pub fn create_router(state: AppState) -> Router {
    let max_upload_size = state.config.max_upload_size;

    let storefront = Router::new()
        .route("/", get(handlers::home_page))
        .route("/products/{category}", get(handlers::category_page))
        .route("/product/{slug}", get(handlers::product_page))
        .route("/news", get(handlers::news_list))
        .route("/news/{slug}", get(handlers::news_detail))
        .route("/downloads", get(handlers::downloads_page))
        .route("/dealers", get(handlers::dealers_page))
        .route("/support", get(handlers::support_page))
        .route("/pages/{slug}", get(handlers::static_page))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            visit_logging_middleware,
        ));

    let auth = Router::new()
        .route(
            SIGN_IN_PATH,
            get(handlers::sign_in_form).post(handlers::sign_in_submit),
        )
        .route(MFA_PATH, get(handlers::mfa_form).post(handlers::mfa_submit))
        .route(
            "/Auth/SignOut",
            get(handlers::sign_out).post(handlers::sign_out),
        )
        .layer(middleware::from_fn_with_state(
            state.login_rate_limiter.clone(),
            login_rate_limit_middleware,
        ));

    let manage = Router::new()
        .route("/Manage", get(handlers::dashboard_handler))
        .route(
            "/Manage/Settings",
            get(handlers::settings_page).post(handlers::save_setting),
        )
        .route("/Manage/Settings/delete", post(handlers::delete_setting))
        .route("/Manage/Security", get(handlers::security_page))
        .route("/Manage/Security/enroll", post(handlers::start_enrollment))
        .route("/Manage/Security/verify", post(handlers::verify_enrollment))
        .route("/Manage/Security/unenroll", post(handlers::unenroll))
        .route("/Manage/upload/{target}", post(handlers::upload_handler))
        .merge(sortable_routes::<Category>())
        .merge(sortable_routes::<Product>())
        .merge(resource_routes::<NewsArticle>())
        .merge(resource_routes::<Page>())
        .merge(sortable_routes::<Dealer>())
        .merge(sortable_routes::<Download>())
        .merge(sortable_routes::<Faq>())
        .merge(sortable_routes::<CarouselSlide>())
        .merge(sortable_routes::<FeaturedItem>())
        .merge(sortable_routes::<HomeVideo>())
        .merge(sortable_routes::<FooterLink>());

    let mut router = Router::new()
        .route("/.health", get(handlers::health))
        .route("/robots.txt", get(handlers::robots_txt))
        .merge(storefront)
        .merge(auth)
        .merge(manage);

    if state.config.backend == Backend::Local {
        router = router.nest_service(
            PUBLIC_STORAGE_PATH,
            ServeDir::new(&state.config.storage_dir),
        );
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(max_upload_size))
                .layer(TraceLayer::new_for_http()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mfa::{INVALID_CODE, NOT_AN_ADMIN};
    use crate::session::SESSION_COOKIE;
    use crate::test_helpers::{create_test_app, TestApp};
    use axum::http::{header, HeaderValue, StatusCode};
    use axum_test::multipart::MultipartForm;
    use axum_test::TestServer;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use tonearm_db::testing::VALID_CODE;
    use tonearm_db::{FactorStatus, Query};

    const PASSWORD: &str = "correct horse battery";
    const STORAGE: &str = "https://storage.test/storage/v1/object/public";

    fn server(app: &TestApp) -> TestServer {
        TestServer::new(create_router(app.state.clone())).expect("Failed to create test server")
    }

    fn header_value(value: &str) -> HeaderValue {
        HeaderValue::from_str(value).unwrap()
    }

    fn location(response: &axum_test::TestResponse) -> String {
        response.header(header::LOCATION).to_str().unwrap().to_string()
    }

    /// Only the calls whose order matters for a cascade delete
    fn row_and_storage_calls(app: &TestApp) -> Vec<String> {
        app.log
            .calls()
            .into_iter()
            .filter(|call| call.starts_with("delete:") || call.starts_with("remove:"))
            .collect()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app().await.unwrap();
        let response = server(&app).get("/.health").await;
        response.assert_status_ok();
        response.assert_text("OK");
    }

    #[tokio::test]
    async fn test_robots_txt_hides_admin_areas() {
        let app = create_test_app().await.unwrap();
        let response = server(&app).get("/robots.txt").await;
        response.assert_status_ok();
        let text = response.text();
        assert!(text.contains("Disallow: /Manage"));
        assert!(text.contains("Disallow: /Auth"));
    }

    #[tokio::test]
    async fn test_home_page_records_visit() {
        let app = create_test_app().await.unwrap();
        let response = server(&app)
            .get("/")
            .add_header(header::USER_AGENT, header_value("test-agent"))
            .await;
        response.assert_status_ok();
        assert!(app.log.contains("insert:visit_logs"));

        let visits = app.state.visits().recent(5).await.unwrap();
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].path, "/");
        assert_eq!(visits[0].user_agent.as_deref(), Some("test-agent"));
    }

    #[tokio::test]
    async fn test_missing_product_is_not_found_and_not_logged() {
        let app = create_test_app().await.unwrap();
        let response = server(&app).get("/product/nothing-here").await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert!(!app.log.contains("insert:visit_logs"));
    }

    #[tokio::test]
    async fn test_product_page_shows_active_product() {
        let app = create_test_app().await.unwrap();
        let mut product = Product::new("Reference Turntable".into());
        product.slug = "reference-turntable".into();
        product.price = Some(4999.0);
        app.state.repo::<Product>().create(&product).await.unwrap();

        let response = server(&app).get("/product/reference-turntable").await;
        response.assert_status_ok();
        let html = response.text();
        assert!(html.contains("Reference Turntable"));
        assert!(html.contains("4,999.00"));
    }

    #[tokio::test]
    async fn test_manage_requires_sign_in() {
        let app = create_test_app().await.unwrap();
        let response = server(&app).get("/Manage").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), SIGN_IN_PATH);
    }

    #[tokio::test]
    async fn test_sign_in_without_factors_reaches_dashboard() {
        let app = create_test_app().await.unwrap();
        app.add_admin("admin@tonearm.test", PASSWORD).await.unwrap();
        let server = server(&app);

        let response = server
            .post(SIGN_IN_PATH)
            .form(&[("email", "admin@tonearm.test"), ("password", PASSWORD)])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/Manage");

        let session = response.cookie(SESSION_COOKIE);
        let dashboard = server
            .get("/Manage")
            .add_header(header::COOKIE, header_value(&format!("{}={}", SESSION_COOKIE, session.value())))
            .await;
        dashboard.assert_status_ok();
        assert!(dashboard.text().contains("Dashboard"));
    }

    #[tokio::test]
    async fn test_sign_in_with_factor_defers_admin_check_until_code() {
        let app = create_test_app().await.unwrap();
        let (user, _) = app.add_admin("admin@tonearm.test", PASSWORD).await.unwrap();
        app.auth.add_factor(&user.id, FactorStatus::Verified);
        app.log.clear();
        let server = server(&app);

        let response = server
            .post(SIGN_IN_PATH)
            .form(&[("email", "admin@tonearm.test"), ("password", PASSWORD)])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), MFA_PATH);
        assert!(app.log.contains("auth:challenge"));
        assert!(!app.log.contains("select:admin_users"));

        let session_cookie = format!("{}={}", SESSION_COOKIE, response.cookie(SESSION_COOKIE).value());

        // Pending sessions cannot reach the admin area yet
        let blocked = server
            .get("/Manage")
            .add_header(header::COOKIE, header_value(&session_cookie))
            .await;
        assert_eq!(location(&blocked), MFA_PATH);

        let verified = server
            .post(MFA_PATH)
            .add_header(header::COOKIE, header_value(&session_cookie))
            .form(&[("code", VALID_CODE)])
            .await;
        verified.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&verified), "/Manage");
        assert!(app.log.contains("select:admin_users"));
    }

    #[tokio::test]
    async fn test_malformed_code_keeps_mfa_session() {
        let app = create_test_app().await.unwrap();
        let (user, _) = app.add_admin("admin@tonearm.test", PASSWORD).await.unwrap();
        app.auth.add_factor(&user.id, FactorStatus::Verified);
        let server = server(&app);

        let response = server
            .post(SIGN_IN_PATH)
            .form(&[("email", "admin@tonearm.test"), ("password", PASSWORD)])
            .await;
        let session_cookie = format!("{}={}", SESSION_COOKIE, response.cookie(SESSION_COOKIE).value());
        app.log.clear();

        let rejected = server
            .post(MFA_PATH)
            .add_header(header::COOKIE, header_value(&session_cookie))
            .form(&[("code", "12ab")])
            .await;
        rejected.assert_status_ok();
        assert!(rejected.text().contains(INVALID_CODE));
        assert!(!app.log.contains("auth:verify"));
        assert!(!app.log.contains("auth:sign_out"));
        assert_eq!(app.state.sessions.len().await, 1);
    }

    #[tokio::test]
    async fn test_wrong_code_signs_out() {
        let app = create_test_app().await.unwrap();
        let (user, _) = app.add_admin("admin@tonearm.test", PASSWORD).await.unwrap();
        app.auth.add_factor(&user.id, FactorStatus::Verified);
        let server = server(&app);

        let response = server
            .post(SIGN_IN_PATH)
            .form(&[("email", "admin@tonearm.test"), ("password", PASSWORD)])
            .await;
        let session_cookie = format!("{}={}", SESSION_COOKIE, response.cookie(SESSION_COOKIE).value());

        let rejected = server
            .post(MFA_PATH)
            .add_header(header::COOKIE, header_value(&session_cookie))
            .form(&[("code", "654321")])
            .await;
        rejected.assert_status(StatusCode::SEE_OTHER);
        assert!(location(&rejected).starts_with(SIGN_IN_PATH));
        assert!(app.log.contains("auth:sign_out"));
        assert!(app.state.sessions.is_empty().await);
    }

    #[tokio::test]
    async fn test_non_admin_is_signed_out() {
        let app = create_test_app().await.unwrap();
        app.auth.add_user("visitor@tonearm.test", PASSWORD);

        let response = server(&app)
            .post(SIGN_IN_PATH)
            .form(&[("email", "visitor@tonearm.test"), ("password", PASSWORD)])
            .await;
        response.assert_status_ok();
        assert!(response.text().contains(NOT_AN_ADMIN));
        assert!(app.log.contains("auth:sign_out"));
        assert!(app.state.sessions.is_empty().await);
    }

    #[tokio::test]
    async fn test_deactivated_admin_loses_session() {
        let app = create_test_app().await.unwrap();
        let session_cookie = app.admin_cookie("admin@tonearm.test").await.unwrap();
        assert_eq!(app.state.sessions.len().await, 1);

        let admin = app
            .state
            .admins()
            .find_by_email("admin@tonearm.test")
            .await
            .unwrap()
            .unwrap();
        app.state.admins().deactivate(&admin.user_id).await.unwrap();

        let response = server(&app)
            .get("/Manage")
            .add_header(header::COOKIE, header_value(&session_cookie))
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert!(location(&response).starts_with(SIGN_IN_PATH));
        assert!(app.log.contains("auth:sign_out"));
        assert!(app.state.sessions.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_provider_token_is_refreshed() {
        let app = create_test_app().await.unwrap();
        let session_cookie = app.admin_cookie("admin@tonearm.test").await.unwrap();
        let id = session_cookie
            .trim_start_matches(&format!("{}=", SESSION_COOKIE))
            .to_string();
        app.state
            .sessions
            .update(&id, |session| {
                session.auth.expires_at = Some(Utc::now() - Duration::minutes(5))
            })
            .await
            .unwrap();

        let response = server(&app)
            .get("/Manage/Security")
            .add_header(header::COOKIE, header_value(&session_cookie))
            .await;
        response.assert_status_ok();
        assert!(response.text().contains("Two-factor authentication"));
        assert!(app.log.contains("auth:refresh"));
        assert!(app.log.contains("auth:list_factors"));
        assert!(!app.log.contains("auth:sign_out"));

        let stored = app.state.sessions.get(&id).await.unwrap();
        assert!(!stored.auth.needs_refresh(Utc::now()));
    }

    #[tokio::test]
    async fn test_malformed_setting_is_not_written() {
        let app = create_test_app().await.unwrap();
        app.state
            .site_config()
            .set("site_name", serde_json::json!("Tonearm Audio"))
            .await
            .unwrap();
        let session_cookie = app.admin_cookie("admin@tonearm.test").await.unwrap();

        let response = server(&app)
            .post("/Manage/Settings")
            .add_header(header::COOKIE, header_value(&session_cookie))
            .form(&[("key", "site_name"), ("value", "{\"unclosed\": ")])
            .await;
        response.assert_status_ok();
        assert!(response.text().contains("Invalid JSON"));
        assert!(!app.log.contains("insert:site_config"));
        assert!(!app.log.contains("update:site_config"));

        let stored = app.state.site_config().get_value("site_name").await.unwrap();
        assert_eq!(stored, Some(serde_json::json!("Tonearm Audio")));
    }

    #[tokio::test]
    async fn test_page_number_past_the_end_is_clamped() {
        let app = create_test_app().await.unwrap();
        let session_cookie = app.admin_cookie("admin@tonearm.test").await.unwrap();
        let huge = usize::MAX.to_string();

        server(&app)
            .get(&format!("/news?page={}", huge))
            .await
            .assert_status_ok();
        server(&app)
            .get(&format!("/Manage/faqs?page={}", huge))
            .add_header(header::COOKIE, header_value(&session_cookie))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_carousel_without_image_is_rejected_locally() {
        let app = create_test_app().await.unwrap();
        let session_cookie = app.admin_cookie("admin@tonearm.test").await.unwrap();

        let form = MultipartForm::new()
            .add_text("title", "Spring launch")
            .add_text("image_url", "")
            .add_text("is_active", "on");
        let response = server(&app)
            .post("/Manage/carousel/new")
            .add_header(header::COOKIE, header_value(&session_cookie))
            .multipart(form)
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("An image is required for every slide"));
        assert!(!app.log.contains("insert:carousel_slides"));
        assert!(!app.log.contains("update:carousel_slides"));
    }

    #[tokio::test]
    async fn test_failed_toggle_shows_original_value() {
        let app = create_test_app().await.unwrap();
        let session_cookie = app.admin_cookie("admin@tonearm.test").await.unwrap();
        let product = app
            .state
            .repo::<Product>()
            .create(&Product::new("Phono Stage".into()))
            .await
            .unwrap();
        let id = product.id.unwrap();
        app.tables.fail_updates(true);

        let response = server(&app)
            .post(&format!("/Manage/products/{}/toggle/is_active", id))
            .add_header(header::COOKIE, header_value(&session_cookie))
            .await;

        response.assert_status_ok();
        let html = response.text();
        assert!(html.contains("Service unavailable"));
        assert!(html.contains("Active: on"));
        assert!(app.log.contains("update:products"));

        let stored = app.state.repo::<Product>().find_by_id(id).await.unwrap().unwrap();
        assert!(stored.is_active);
    }

    #[tokio::test]
    async fn test_toggle_flips_flag() {
        let app = create_test_app().await.unwrap();
        let session_cookie = app.admin_cookie("admin@tonearm.test").await.unwrap();
        let faq = app
            .state
            .repo::<Faq>()
            .create(&Faq::new("Does it play 78s?".into(), "Yes.".into()))
            .await
            .unwrap();
        let id = faq.id.unwrap();

        let response = server(&app)
            .post(&format!("/Manage/faqs/{}/toggle/is_active?page=1", id))
            .add_header(header::COOKIE, header_value(&session_cookie))
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/Manage/faqs?page=1");
        let stored = app.state.repo::<Faq>().find_by_id(id).await.unwrap().unwrap();
        assert!(!stored.is_active);
    }

    #[tokio::test]
    async fn test_dealer_delete_removes_row_then_files_per_bucket() {
        let app = create_test_app().await.unwrap();
        let session_cookie = app.admin_cookie("admin@tonearm.test").await.unwrap();
        let mut dealer = Dealer::new("Nordic Hi-Fi".into(), "Norway".into());
        dealer.logo_url = Some(format!("{}/images/dealers/logo.png", STORAGE));
        dealer.cover_image = Some(format!("{}/general/dealers/cover.jpg", STORAGE));
        let dealer = app.state.repo::<Dealer>().create(&dealer).await.unwrap();
        app.log.clear();

        let response = server(&app)
            .post(&format!("/Manage/dealers/{}/delete", dealer.id.unwrap()))
            .add_header(header::COOKIE, header_value(&session_cookie))
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/Manage/dealers");
        assert_eq!(
            row_and_storage_calls(&app),
            vec!["delete:dealers", "remove:general", "remove:images"]
        );
    }

    #[tokio::test]
    async fn test_dealer_delete_survives_storage_failure() {
        let app = create_test_app().await.unwrap();
        let session_cookie = app.admin_cookie("admin@tonearm.test").await.unwrap();
        let mut dealer = Dealer::new("Tokyo Audio".into(), "Japan".into());
        dealer.logo_url = Some(format!("{}/images/dealers/tokyo.png", STORAGE));
        let dealer = app.state.repo::<Dealer>().create(&dealer).await.unwrap();
        app.storage.fail_removes(true);

        let response = server(&app)
            .post(&format!("/Manage/dealers/{}/delete", dealer.id.unwrap()))
            .add_header(header::COOKIE, header_value(&session_cookie))
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        let remaining = app.state.repo::<Dealer>().count(&Query::new()).await.unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_sign_out_clears_session() {
        let app = create_test_app().await.unwrap();
        let session_cookie = app.admin_cookie("admin@tonearm.test").await.unwrap();

        let response = server(&app)
            .post("/Auth/SignOut")
            .add_header(header::COOKIE, header_value(&session_cookie))
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert!(app.log.contains("auth:sign_out"));
        assert!(app.state.sessions.is_empty().await);
    }
}
