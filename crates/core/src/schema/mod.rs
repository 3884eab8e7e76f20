//! Input schemas: validation and coercion of a decoded form tree.
//!
//! - [`Schema`] -- the async-capable contract every input schema satisfies.
//! - [`FormSchema`] -- serde + `validator` backed schema for a typed struct.
//! - [`SchemaExt::refine`] -- async post-validation checks (e.g. uniqueness).
//! - [`schema_fn`] -- ad-hoc schema from an async closure.

mod coerce;

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::envelope::FieldErrors;

pub use coerce::CoerceError;

/// Validates and coerces a decoded submission into a typed value.
///
/// Rejection is not an error: it yields the per-field messages shown to the
/// end user.
#[async_trait]
pub trait Schema: Send + Sync + 'static {
    type Output: Send + 'static;

    async fn safe_parse(&self, data: Value) -> Result<Self::Output, FieldErrors>;
}

/// Schema for a struct that derives `Deserialize` and `Validate`.
pub struct FormSchema<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> FormSchema<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for FormSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for FormSchema<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Schema for FormSchema<T>
where
    T: DeserializeOwned + Validate + Send + 'static,
{
    type Output = T;

    async fn safe_parse(&self, data: Value) -> Result<T, FieldErrors> {
        let mut collected = coerce::deserialize_collecting::<T>(data);
        let Some(parsed) = collected.value.take() else {
            return Err(collected.errors);
        };

        if let Err(invalid) = parsed.validate() {
            for (path, messages) in flatten_validation_errors(&invalid) {
                if !collected.is_patched(&path) {
                    collected.errors.entry(path).or_default().extend(messages);
                }
            }
        }

        if collected.errors.is_empty() {
            Ok(parsed)
        } else {
            Err(collected.errors)
        }
    }
}

/// Flatten nested `validator` errors into dotted field paths.
///
/// Each message is the rule's custom message when set, otherwise its code.
pub fn flatten_validation_errors(errors: &ValidationErrors) -> FieldErrors {
    let mut out = FieldErrors::new();
    collect(errors, "", &mut out);
    out
}

fn collect(errors: &ValidationErrors, prefix: &str, out: &mut FieldErrors) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                out.entry(path).or_default().extend(list.iter().map(message_for));
            }
            ValidationErrorsKind::Struct(inner) => collect(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(inner, &format!("{path}.{index}"), out);
                }
            }
        }
    }
}

fn message_for(error: &ValidationError) -> String {
    error
        .message
        .as_ref()
        .map(|message| message.to_string())
        .unwrap_or_else(|| error.code.to_string())
}

/// Combinators available on every schema.
pub trait SchemaExt: Schema + Sized {
    /// Run `check` on the parsed value; it may reject with field errors.
    fn refine<F, Fut>(self, check: F) -> Refined<Self, F>
    where
        F: Fn(Self::Output) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Self::Output, FieldErrors>> + Send + 'static,
    {
        Refined { inner: self, check }
    }
}

impl<S: Schema> SchemaExt for S {}

/// A schema followed by an async check. See [`SchemaExt::refine`].
pub struct Refined<S, F> {
    inner: S,
    check: F,
}

#[async_trait]
impl<S, F, Fut> Schema for Refined<S, F>
where
    S: Schema,
    F: Fn(S::Output) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<S::Output, FieldErrors>> + Send + 'static,
{
    type Output = S::Output;

    async fn safe_parse(&self, data: Value) -> Result<S::Output, FieldErrors> {
        let parsed = self.inner.safe_parse(data).await?;
        (self.check)(parsed).await
    }
}

/// Schema backed by an async closure over the decoded tree.
pub struct FnSchema<F> {
    f: F,
}

/// Build a schema from `f`.
pub fn schema_fn<F, Fut, O>(f: F) -> FnSchema<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, FieldErrors>> + Send + 'static,
    O: Send + 'static,
{
    FnSchema { f }
}

#[async_trait]
impl<F, Fut, O> Schema for FnSchema<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, FieldErrors>> + Send + 'static,
    O: Send + 'static,
{
    type Output = O;

    async fn safe_parse(&self, data: Value) -> Result<O, FieldErrors> {
        (self.f)(data).await
    }
}

/// Deserialize without coercion rules beyond the form defaults and no
/// `validator` pass. Useful for inputs with no field constraints.
pub fn deserialize_form<T: DeserializeOwned>(data: Value) -> Result<T, FieldErrors> {
    let mut collected = coerce::deserialize_collecting::<T>(data);
    match collected.value.take() {
        Some(parsed) if collected.errors.is_empty() => Ok(parsed),
        _ => Err(collected.errors),
    }
}
