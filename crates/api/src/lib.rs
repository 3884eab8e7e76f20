//! HTTP front end for form actions.
//!
//! Reads form submissions (urlencoded or multipart), hands them to
//! [`formaction_core`] action handlers and renders the outcome: envelopes as
//! JSON, redirects and not-found signals as real HTTP responses.

pub mod actions;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
