//! Handlers for the contact form actions.
//!
//! Each handler forwards the raw submission to its action and renders the
//! outcome. Request headers feed the error reporter's context.

use axum::extract::State;
use axum::http::HeaderMap;

use crate::actions::Receipt;
use crate::extract::{FormSubmission, HeaderContext};
use crate::response::ActionReply;
use crate::state::AppState;

/// POST /actions/contact
pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    FormSubmission(form): FormSubmission,
) -> ActionReply<Receipt> {
    let context = HeaderContext::new(&headers);
    ActionReply(state.actions.contact.call_with(form, &context).await)
}

/// POST /actions/contact/archive
pub async fn archive(
    State(state): State<AppState>,
    headers: HeaderMap,
    FormSubmission(form): FormSubmission,
) -> ActionReply<Receipt> {
    let context = HeaderContext::new(&headers);
    ActionReply(state.actions.archive.call_with(form, &context).await)
}
