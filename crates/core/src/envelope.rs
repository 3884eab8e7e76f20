//! Uniform response envelope returned by every action handler.
//!
//! A response is either a success carrying a payload or a failure carrying
//! an optional form-level message and optional per-field messages. The two
//! shapes are enum variants, so a payload and an error can never coexist.
//!
//! On the wire the envelope is a flat object clients branch on via `ok`:
//!
//! ```text
//! { "ok": true,  "data": {...}, "formError": null, "fieldErrors": null }
//! { "ok": false, "data": null,  "formError": "...", "fieldErrors": { "email": ["..."] } }
//! ```

use std::collections::BTreeMap;

use serde::de::value::UnitDeserializer;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Per-field validation messages keyed by field path (`email`, `address.city`, `tags.0`).
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Result of one action invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResponse<T> {
    /// The action succeeded.
    Ok { data: T },
    /// The action failed in a way the end user may see.
    Err {
        form_error: Option<String>,
        field_errors: Option<FieldErrors>,
    },
}

impl<T> ActionResponse<T> {
    /// Success envelope carrying `data`.
    pub fn ok(data: T) -> Self {
        Self::Ok { data }
    }

    /// Success envelope carrying the default payload.
    pub fn ok_default() -> Self
    where
        T: Default,
    {
        Self::Ok { data: T::default() }
    }

    /// Failure envelope with a form-level message and no field errors.
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Err {
            form_error: Some(message.into()),
            field_errors: None,
        }
    }

    /// Failure envelope with neither a form-level message nor field errors.
    pub fn fail_silent() -> Self {
        Self::Err {
            form_error: None,
            field_errors: None,
        }
    }

    /// Failure envelope carrying field errors and no form-level message.
    pub fn invalid(field_errors: FieldErrors) -> Self {
        Self::Err {
            form_error: None,
            field_errors: Some(field_errors),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Ok { data } => Some(data),
            Self::Err { .. } => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Ok { data } => Some(data),
            Self::Err { .. } => None,
        }
    }

    pub fn form_error(&self) -> Option<&str> {
        match self {
            Self::Err { form_error, .. } => form_error.as_deref(),
            Self::Ok { .. } => None,
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Err { field_errors, .. } => field_errors.as_ref(),
            Self::Ok { .. } => None,
        }
    }

    /// Transform the success payload, leaving failures untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ActionResponse<U> {
        match self {
            Self::Ok { data } => ActionResponse::Ok { data: f(data) },
            Self::Err {
                form_error,
                field_errors,
            } => ActionResponse::Err {
                form_error,
                field_errors,
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRef<'a, T> {
    ok: bool,
    data: Option<&'a T>,
    form_error: Option<&'a str>,
    field_errors: Option<&'a FieldErrors>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireOwned<T> {
    ok: bool,
    data: Option<T>,
    form_error: Option<String>,
    field_errors: Option<FieldErrors>,
}

impl<T: Serialize> Serialize for ActionResponse<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            Self::Ok { data } => WireRef {
                ok: true,
                data: Some(data),
                form_error: None,
                field_errors: None,
            },
            Self::Err {
                form_error,
                field_errors,
            } => WireRef {
                ok: false,
                data: None,
                form_error: form_error.as_deref(),
                field_errors: field_errors.as_ref(),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for ActionResponse<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireOwned::<T>::deserialize(deserializer)?;
        if !wire.ok {
            return Ok(Self::Err {
                form_error: wire.form_error,
                field_errors: wire.field_errors,
            });
        }
        if wire.form_error.is_some() || wire.field_errors.is_some() {
            return Err(serde::de::Error::custom(
                "success envelope must not carry errors",
            ));
        }
        // A unit-like payload serializes as `null`, which reads back as `None`.
        let data = match wire.data {
            Some(data) => data,
            None => T::deserialize(UnitDeserializer::<D::Error>::new())?,
        };
        Ok(Self::Ok { data })
    }
}
