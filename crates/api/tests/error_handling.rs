//! Tests for `AppError` and `ActionReply` -> HTTP response mapping.
//!
//! These call `IntoResponse` directly and need no HTTP server.

use std::collections::BTreeMap;

use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use formaction_api::error::AppError;
use formaction_api::response::ActionReply;
use formaction_core::{ActionResponse, ControlFlow, RedirectKind};
use http_body_util::BodyExt;

/// Helper: convert a response into its status code and parsed JSON body.
async fn to_parts(response: axum::response::Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

// ---------------------------------------------------------------------------
// Test: AppError::BadRequest maps to 400 with BAD_REQUEST code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bad_request_error_returns_400() {
    let err = AppError::BadRequest("unreadable body".into());

    let (status, json) = to_parts(err.into_response()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "unreadable body");
}

// ---------------------------------------------------------------------------
// Test: AppError::UnsupportedMediaType maps to 415
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unsupported_media_type_returns_415() {
    let err = AppError::UnsupportedMediaType("text/plain".into());

    let (status, json) = to_parts(err.into_response()).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(json["code"], "UNSUPPORTED_MEDIA_TYPE");
}

// ---------------------------------------------------------------------------
// Test: envelopes render as 200 JSON whether ok or not
// ---------------------------------------------------------------------------

#[tokio::test]
async fn envelopes_render_as_200_json() {
    let reply = ActionReply(Ok(ActionResponse::ok(serde_json::json!({ "id": 3 }))));
    let (status, json) = to_parts(reply.into_response()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert_eq!(json["data"]["id"], 3);

    let mut field_errors = BTreeMap::new();
    field_errors.insert("email".to_string(), vec!["Invalid email".to_string()]);
    let reply: ActionReply<()> = ActionReply(Ok(ActionResponse::invalid(field_errors)));
    let (status, json) = to_parts(reply.into_response()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], false);
    assert_eq!(json["fieldErrors"]["email"][0], "Invalid email");
}

// ---------------------------------------------------------------------------
// Test: redirect kinds map to their status codes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn redirects_map_to_status_codes() {
    let cases = [
        (RedirectKind::SeeOther, StatusCode::SEE_OTHER),
        (RedirectKind::Temporary, StatusCode::TEMPORARY_REDIRECT),
        (RedirectKind::Permanent, StatusCode::PERMANENT_REDIRECT),
    ];

    for (kind, expected) in cases {
        let reply: ActionReply<()> = ActionReply(Err(ControlFlow::Redirect {
            location: "/done".into(),
            kind,
        }));
        let response = reply.into_response();
        assert_eq!(response.status(), expected, "kind = {kind}");
        assert_eq!(response.headers()[LOCATION], "/done");
    }
}

// ---------------------------------------------------------------------------
// Test: not-found signal maps to 404 with NOT_FOUND code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn not_found_signal_returns_404() {
    let reply: ActionReply<()> = ActionReply(Err(ControlFlow::NotFound));

    let (status, json) = to_parts(reply.into_response()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}
