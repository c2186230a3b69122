//! Tests for the sign-in flow and session endpoints.

use actix_web::http::StatusCode;
use actix_web::http::header::LOCATION;
use actix_web::test;
use rstest::rstest;
use serde_json::Value;

use super::*;
use crate::domain::Role;
use crate::domain::ports::ProfileRepository;
use crate::inbound::http::test_utils::{BASE_URL, Harness, session_cookie, sign_in_cookie};

fn location(res: &actix_web::dev::ServiceResponse) -> String {
    res.headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header")
        .to_owned()
}

/// Path and query of an absolute redirect on the test site.
fn local_path(location: &str) -> String {
    location
        .strip_prefix(BASE_URL)
        .expect("redirect stays on site")
        .to_owned()
}

#[rstest]
#[case::readonly(Role::Readonly, "/products?page=2")]
#[case::admin(Role::Admin, "/products?page=2")]
#[case::pending(Role::Pending, "/pending-approval")]
#[actix_web::test]
async fn callback_lands_on_destination_for_role(#[case] role: Role, #[case] expected: &str) {
    let harness = Harness::new();
    harness.seed_dev_profile(role).await;
    let app = test::init_service(harness.app()).await;

    let start = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/auth/sign-in?next=%2Fproducts%3Fpage%3D2")
            .to_request(),
    )
    .await;
    assert_eq!(start.status(), StatusCode::FOUND);
    let callback_path = local_path(&location(&start));
    assert!(callback_path.starts_with("/auth/callback?code="), "{callback_path}");
    let cookie = session_cookie(&start).expect("pending sign-in cookie");

    let done = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&callback_path)
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(done.status(), StatusCode::FOUND);
    assert_eq!(local_path(&location(&done)), expected);
    assert!(session_cookie(&done).is_some());
}

#[actix_web::test]
async fn first_sign_in_creates_a_pending_profile() {
    let harness = Harness::new();
    let app = test::init_service(harness.app()).await;

    let start =
        test::call_service(&app, test::TestRequest::get().uri("/auth/sign-in").to_request()).await;
    let callback_path = local_path(&location(&start));
    let cookie = session_cookie(&start).expect("cookie");
    let done = test::call_service(
        &app,
        test::TestRequest::get().uri(&callback_path).cookie(cookie).to_request(),
    )
    .await;

    assert_eq!(local_path(&location(&done)), "/pending-approval");
    let profiles = harness.profiles.list().await.expect("profiles");
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].role, Role::Pending);
}

#[rstest]
#[case::provider_error("/auth/callback?error=access_denied&error_description=nope", Some("nope"))]
#[case::missing_code("/auth/callback", None)]
#[case::no_pending_sign_in("/auth/callback?code=abc", Some("sign-in expired, please try again"))]
#[actix_web::test]
async fn failed_callbacks_return_to_login(#[case] uri: &str, #[case] message: Option<&str>) {
    let harness = Harness::new();
    let app = test::init_service(harness.app()).await;

    let res = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;

    assert_eq!(res.status(), StatusCode::FOUND);
    let url = url::Url::parse(&location(&res)).expect("absolute redirect");
    assert_eq!(url.path(), "/login");
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(pairs.contains(&("error".into(), "auth_failed".into())));
    let found = pairs
        .iter()
        .find(|(key, _)| key == "message")
        .map(|(_, value)| value.as_str());
    assert_eq!(found, message);
}

#[actix_web::test]
async fn bad_code_returns_to_login() {
    let harness = Harness::new();
    let app = test::init_service(harness.app()).await;

    let start =
        test::call_service(&app, test::TestRequest::get().uri("/auth/sign-in").to_request()).await;
    let cookie = session_cookie(&start).expect("cookie");
    let res = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/auth/callback?code=forged")
            .cookie(cookie)
            .to_request(),
    )
    .await;

    let target = location(&res);
    assert!(target.starts_with(&format!("{BASE_URL}/login?error=auth_failed")), "{target}");
}

#[actix_web::test]
async fn session_reports_signed_out_without_cookie() {
    let harness = Harness::new();
    let app = test::init_service(harness.app()).await;

    let res = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/v1/auth/session").to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["phase"], "unauthenticated");
    assert_eq!(body["isLoading"], false);
    assert!(body["profile"].is_null());
}

#[actix_web::test]
async fn session_reports_profile_when_signed_in() {
    let harness = Harness::new();
    let profile = harness.account("viewer@invento.test", Role::Readonly).await;
    let app = test::init_service(harness.app()).await;
    let cookie = sign_in_cookie(&app, profile.id).await;

    let res = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/auth/session")
            .cookie(cookie)
            .to_request(),
    )
    .await;

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["phase"], "authenticated");
    assert_eq!(body["profile"]["email"], "viewer@invento.test");
    assert_eq!(body["profile"]["role"], "readonly");
}

#[actix_web::test]
async fn sign_out_revokes_the_provider_session() {
    let harness = Harness::new();
    let profile = harness.account("viewer@invento.test", Role::Readonly).await;
    let app = test::init_service(harness.app()).await;
    let cookie = sign_in_cookie(&app, profile.id).await;

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/auth/sign-out")
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    // The old cookie still carries the revoked tokens.
    let res = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/products")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn sign_out_without_session_is_a_no_op() {
    let harness = Harness::new();
    let app = test::init_service(harness.app()).await;

    let res = test::call_service(
        &app,
        test::TestRequest::post().uri("/api/v1/auth/sign-out").to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}
