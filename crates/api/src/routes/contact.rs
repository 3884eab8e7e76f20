use axum::routing::post;
use axum::Router;

use crate::handlers::contact;
use crate::state::AppState;

/// Contact form actions.
///
/// ```text
/// POST /contact            submit
/// POST /contact/archive    archive
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/contact", post(contact::submit))
        .route("/contact/archive", post(contact::archive))
}
