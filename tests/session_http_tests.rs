// SPDX-License-Identifier: MIT

//! End-to-end HTTP session flow against the Firestore emulator.
//!
//! Exercises cookie transport: login sets http-only token cookies, the
//! refresh endpoint accepts the cookie, and logout emits removal cookies.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use tower::ServiceExt;

mod common;

fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

/// "name=value; Path=/; ..." → "value"
fn cookie_value(cookie: &str) -> String {
    cookie
        .split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(_, v)| v.to_string())
        .unwrap()
}

fn json_request(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_http_session_flow_with_cookies() {
    require_emulator!();

    let (app, _) = common::create_emulator_app().await;
    let username = format!("ivy-{}", uuid::Uuid::new_v4().simple());
    let email = format!("{}@x.com", username);

    // Register
    let response = app
        .clone()
        .oneshot(json_request(
            "/api/v1/users/register",
            format!(
                r#"{{"username":"{username}","email":"{email}","fullname":"Ivy","password":"pw123"}}"#
            ),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Login sets both token cookies
    let response = app
        .clone()
        .oneshot(json_request(
            "/api/v1/users/login",
            format!(r#"{{"identifier":"{username}","password":"pw123"}}"#),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookie_headers(&response);
    let access_cookie = find_cookie(&cookies, "access_token");
    let refresh_cookie = find_cookie(&cookies, "refresh_token");

    for cookie in [&access_cookie, &refresh_cookie] {
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("SameSite=Lax"));
        // test_default frontend is plain-http localhost
        assert!(!cookie.contains("Secure"));
    }

    // Refresh accepts the cookie and rotates it
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/refresh-token")
                .header(
                    header::COOKIE,
                    format!("refresh_token={}", cookie_value(&refresh_cookie)),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let rotated = find_cookie(&set_cookie_headers(&response), "refresh_token");
    assert_ne!(cookie_value(&rotated), cookie_value(&refresh_cookie));

    // The superseded cookie is rejected
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/refresh-token")
                .header(
                    header::COOKIE,
                    format!("refresh_token={}", cookie_value(&refresh_cookie)),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Logout with the access cookie returns removal cookies
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/logout")
                .header(
                    header::COOKIE,
                    format!("access_token={}", cookie_value(&access_cookie)),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let removals = set_cookie_headers(&response);
    for name in ["access_token", "refresh_token"] {
        let cookie = find_cookie(&removals, name);
        assert!(cookie.contains("Max-Age=0"));
    }

    // After logout, even the newest refresh token is dead
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/refresh-token")
                .header(
                    header::COOKIE,
                    format!("refresh_token={}", cookie_value(&rotated)),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_email_registration_http_conflict() {
    require_emulator!();

    let (app, _) = common::create_emulator_app().await;
    let username = format!("judy-{}", uuid::Uuid::new_v4().simple());
    let email = format!("{}@x.com", username);

    let body = format!(
        r#"{{"username":"{username}","email":"{email}","fullname":"Judy","password":"pw123"}}"#
    );

    let response = app
        .clone()
        .oneshot(json_request("/api/v1/users/register", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Different username, same email
    let body = format!(
        r#"{{"username":"{username}2","email":"{email}","fullname":"Judy","password":"pw123"}}"#
    );
    let response = app
        .clone()
        .oneshot(json_request("/api/v1/users/register", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
