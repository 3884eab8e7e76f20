pub mod contact;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/actions` route tree.
pub fn action_routes() -> Router<AppState> {
    Router::new().merge(contact::router())
}
