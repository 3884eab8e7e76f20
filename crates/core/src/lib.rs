//! Typed dispatch for form-driven server actions.
//!
//! A raw [`FormData`] submission is decoded into a nested tree, validated by
//! an optional [`Schema`], handed to a business function, and every outcome
//! is folded into an [`ActionResponse`]. Framework navigation signals
//! ([`ControlFlow`]) are the only thing that escapes the envelope.

pub mod action;
pub mod config;
pub mod envelope;
pub mod error;
pub mod form;
pub mod report;
pub mod schema;

pub use action::{ActionArgs, ActionBuilder, ActionHandler, IntoActionResponse, NoInput};
pub use config::{ActionConfig, RuntimeMode};
pub use envelope::{ActionResponse, FieldErrors};
pub use error::{ActionError, ActionResult, ControlFlow, RedirectKind};
pub use form::{FormData, FormValue, UploadedFile};
pub use report::{ErrorContext, ErrorReporter, RequestContext};
pub use schema::{FormSchema, Schema, SchemaExt};
