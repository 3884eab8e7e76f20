//! Integration tests for the contact form actions, end to end through the
//! router and middleware stack.

mod common;

use axum::http::header::LOCATION;
use axum::http::StatusCode;
use common::{body_json, build_test_app, post_form, post_raw, post_undeclared, test_config};

const VALID: &[(&str, &str)] = &[
    ("name", "Ada Lovelace"),
    ("email", "ada@example.com"),
    ("message", "I would like to know more."),
];

fn with(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
    let mut pairs = VALID.to_vec();
    pairs.extend_from_slice(extra);
    pairs
}

// ---------------------------------------------------------------------------
// Test: valid submission returns a success envelope with the stored id
// ---------------------------------------------------------------------------

#[tokio::test]
async fn valid_submission_returns_ok_envelope() {
    let app = build_test_app(test_config());
    let response = post_form(app, "/actions/contact", VALID).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["data"]["id"], 1);
    assert!(json["formError"].is_null());
    assert!(json["fieldErrors"].is_null());
}

// ---------------------------------------------------------------------------
// Test: invalid fields come back as per-field messages, still with 200
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_fields_return_field_errors() {
    let app = build_test_app(test_config());
    let response = post_form(
        app,
        "/actions/contact",
        &[("name", "Ada"), ("email", "nope"), ("message", "short")],
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["ok"], false);
    assert_eq!(json["fieldErrors"]["email"][0], "Invalid email address");
    assert_eq!(
        json["fieldErrors"]["message"][0],
        "Message must be between 10 and 2000 characters"
    );
    assert!(json["fieldErrors"].get("name").is_none());
}

// ---------------------------------------------------------------------------
// Test: a missing required field reads as "Required"
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_required_field_is_required() {
    let app = build_test_app(test_config());
    let response = post_form(
        app,
        "/actions/contact",
        &[("name", ""), ("email", "ada@example.com"), ("message", "I would like to know more.")],
    )
    .await;

    let json = body_json(response).await;
    assert_eq!(json["ok"], false);
    assert_eq!(json["fieldErrors"]["name"][0], "Required");
}

// ---------------------------------------------------------------------------
// Test: an empty optional field is treated as absent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_optional_field_is_accepted() {
    let app = build_test_app(test_config());
    let response = post_form(
        app,
        "/actions/contact",
        &with(&[("subject", ""), ("subscribe", "")]),
    )
    .await;

    let json = body_json(response).await;
    assert_eq!(json["ok"], true);
}

// ---------------------------------------------------------------------------
// Test: a duplicate submission is rejected with a form-level message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_submission_returns_form_error() {
    let app = build_test_app(test_config());

    let first = post_form(app.clone(), "/actions/contact", VALID).await;
    assert_eq!(body_json(first).await["ok"], true);

    let second = post_form(app, "/actions/contact", VALID).await;
    assert_eq!(second.status(), StatusCode::OK);
    let json = body_json(second).await;
    assert_eq!(json["ok"], false);
    assert_eq!(json["formError"], "This message has already been sent");
    assert!(json["fieldErrors"].is_null());
}

// ---------------------------------------------------------------------------
// Test: return_to triggers a 303 redirect
// ---------------------------------------------------------------------------

#[tokio::test]
async fn return_to_redirects_with_see_other() {
    let app = build_test_app(test_config());
    let response = post_form(app, "/actions/contact", &with(&[("return_to", "/thanks")])).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/thanks");
}

// ---------------------------------------------------------------------------
// Test: an off-site return_to is ignored
// ---------------------------------------------------------------------------

#[tokio::test]
async fn off_site_return_to_is_ignored() {
    let app = build_test_app(test_config());
    let response = post_form(
        app,
        "/actions/contact",
        &with(&[("return_to", "//evil.example/phish")]),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ok"], true);
}

// ---------------------------------------------------------------------------
// Test: a full store produces the generic message and leaks nothing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unexpected_failure_returns_generic_message() {
    let mut config = test_config();
    config.contact_capacity = 1;
    let app = build_test_app(config);

    let first = post_form(app.clone(), "/actions/contact", VALID).await;
    assert_eq!(body_json(first).await["ok"], true);

    let second = post_form(
        app,
        "/actions/contact",
        &[
            ("name", "Grace Hopper"),
            ("email", "grace@example.com"),
            ("message", "Another message entirely."),
        ],
    )
    .await;

    assert_eq!(second.status(), StatusCode::OK);
    let json = body_json(second).await;
    assert_eq!(json["ok"], false);
    assert_eq!(json["formError"], "Something went wrong. We have been notified!");
    assert!(!json.to_string().contains("full"));
}

// ---------------------------------------------------------------------------
// Test: the configured generic message replaces the default
// ---------------------------------------------------------------------------

#[tokio::test]
async fn configured_generic_message_is_used() {
    let mut config = test_config();
    config.contact_capacity = 0;
    config.generic_error_message = Some("Please try again later".into());
    let app = build_test_app(config);

    let response = post_form(app, "/actions/contact", VALID).await;

    let json = body_json(response).await;
    assert_eq!(json["formError"], "Please try again later");
}

// ---------------------------------------------------------------------------
// Test: multipart submissions, including file parts, are accepted
// ---------------------------------------------------------------------------

#[tokio::test]
async fn multipart_submission_with_file_is_accepted() {
    let app = build_test_app(test_config());
    let boundary = "formboundary42";
    let body = format!(
        "--{b}\r\n\
         Content-Disposition: form-data; name=\"name\"\r\n\r\n\
         Ada Lovelace\r\n\
         --{b}\r\n\
         Content-Disposition: form-data; name=\"email\"\r\n\r\n\
         ada@example.com\r\n\
         --{b}\r\n\
         Content-Disposition: form-data; name=\"message\"\r\n\r\n\
         Please see the attached notes.\r\n\
         --{b}\r\n\
         Content-Disposition: form-data; name=\"attachment\"; filename=\"notes.txt\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         analytical engine\r\n\
         --{b}--\r\n",
        b = boundary
    );

    let response = post_raw(
        app,
        "/actions/contact",
        &format!("multipart/form-data; boundary={boundary}"),
        body.into_bytes(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["data"]["id"], 1);
}

// ---------------------------------------------------------------------------
// Test: non-form content types are rejected before the action runs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn json_body_is_unsupported_media_type() {
    let app = build_test_app(test_config());
    let response = post_raw(
        app,
        "/actions/contact",
        "application/json",
        br#"{"name":"Ada"}"#.to_vec(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNSUPPORTED_MEDIA_TYPE");
}

// ---------------------------------------------------------------------------
// Test: archiving an existing message succeeds
// ---------------------------------------------------------------------------

#[tokio::test]
async fn archive_existing_message() {
    let app = build_test_app(test_config());
    post_form(app.clone(), "/actions/contact", VALID).await;

    let response = post_form(app, "/actions/contact/archive", &[("id", "1")]).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["data"]["id"], 1);
}

// ---------------------------------------------------------------------------
// Test: archiving an unknown message is a 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn archive_unknown_message_returns_404() {
    let app = build_test_app(test_config());
    let response = post_form(app, "/actions/contact/archive", &[("id", "99")]).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Test: archiving without an id is a business error
// ---------------------------------------------------------------------------

#[tokio::test]
async fn archive_without_id_returns_form_error() {
    let app = build_test_app(test_config());
    let response = post_form(app, "/actions/contact/archive", &[]).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["ok"], false);
    assert_eq!(json["formError"], "A message id is required");
}

// ---------------------------------------------------------------------------
// Test: every invalid field is reported in one response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn all_invalid_fields_are_reported_together() {
    let app = build_test_app(test_config());
    let response = post_form(
        app,
        "/actions/contact",
        &[("name", ""), ("email", "nope"), ("message", "short"), ("subscribe", "perhaps")],
    )
    .await;

    let json = body_json(response).await;
    assert_eq!(json["ok"], false);
    let fields = json["fieldErrors"].as_object().unwrap();
    assert_eq!(fields.len(), 4);
    assert_eq!(json["fieldErrors"]["name"][0], "Required");
    assert_eq!(json["fieldErrors"]["email"][0], "Invalid email address");
    assert_eq!(json["fieldErrors"]["subscribe"][0], "Expected a boolean");
}

// ---------------------------------------------------------------------------
// Test: a body without a content type is read as urlencoded
// ---------------------------------------------------------------------------

#[tokio::test]
async fn body_without_content_type_is_read_as_urlencoded() {
    let app = build_test_app(test_config());
    let response = post_undeclared(app, "/actions/contact/archive", "id=5").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}
