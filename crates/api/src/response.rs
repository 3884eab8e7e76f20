//! HTTP rendering of dispatcher outcomes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use formaction_core::{ActionResponse, ControlFlow, RedirectKind};
use serde::Serialize;
use serde_json::json;

/// What an action handler returns to axum.
///
/// Envelopes render as `200` JSON, whatever their `ok` flag; the client
/// decides how to present field and form errors. Control-flow signals become
/// real HTTP navigation.
#[derive(Debug)]
pub struct ActionReply<T>(pub Result<ActionResponse<T>, ControlFlow>);

impl<T> From<Result<ActionResponse<T>, ControlFlow>> for ActionReply<T> {
    fn from(outcome: Result<ActionResponse<T>, ControlFlow>) -> Self {
        Self(outcome)
    }
}

impl<T: Serialize> IntoResponse for ActionReply<T> {
    fn into_response(self) -> Response {
        match self.0 {
            Ok(envelope) => Json(envelope).into_response(),
            Err(ControlFlow::Redirect { location, kind }) => match kind {
                RedirectKind::SeeOther => Redirect::to(&location).into_response(),
                RedirectKind::Temporary => Redirect::temporary(&location).into_response(),
                RedirectKind::Permanent => Redirect::permanent(&location).into_response(),
            },
            Err(ControlFlow::NotFound) => (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": "Not found",
                    "code": "NOT_FOUND",
                })),
            )
                .into_response(),
        }
    }
}
