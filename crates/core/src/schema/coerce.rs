//! Coercing deserializer over a decoded form tree.
//!
//! Form values arrive as strings. This deserializer hands them to serde
//! as-is, except when the target type asks for a number or boolean, in which
//! case the string is parsed. An object entry holding `null` (an empty field)
//! is treated as absent, so serde applies `None`, the field default, or
//! reports it as required. Errors carry the path of the offending field.
//!
//! [`deserialize_collecting`] keeps going past a failing field by standing in
//! a neutral value for it, so one pass reports every bad field.

use serde::de::{
    self, DeserializeSeed, Deserializer, IntoDeserializer, MapAccess, SeqAccess, Unexpected,
    Visitor,
};
use serde::de::DeserializeOwned;
use serde::forward_to_deserialize_any;
use serde_json::{json, Map, Value};

use crate::envelope::FieldErrors;

/// A deserialization failure at a specific field path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CoerceError {
    path: Vec<String>,
    message: String,
}

impl CoerceError {
    fn within(mut self, segment: impl Into<String>) -> Self {
        self.path.insert(0, segment.into());
        self
    }

    /// Dotted path of the field, empty for root-level failures.
    pub fn path(&self) -> String {
        self.path.join(".")
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn into_field_errors(self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.insert(self.path(), vec![self.message]);
        errors
    }
}

impl de::Error for CoerceError {
    fn custom<M: std::fmt::Display>(msg: M) -> Self {
        CoerceError {
            path: Vec::new(),
            message: msg.to_string(),
        }
    }

    fn invalid_type(unexp: Unexpected<'_>, exp: &dyn de::Expected) -> Self {
        match unexp {
            Unexpected::Unit | Unexpected::Option => Self::custom("Required"),
            other => Self::custom(format!("Expected {exp}, received {other}")),
        }
    }

    fn missing_field(field: &'static str) -> Self {
        CoerceError {
            path: vec![field.to_string()],
            message: "Required".to_string(),
        }
    }
}

/// Deserializer wrapper that coerces string leaves on demand.
pub(crate) struct Coerce(pub(crate) Value);

macro_rules! coerce_signed {
    ($($method:ident),*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CoerceError> {
            match self.0 {
                Value::String(text) => match text.trim().parse::<i64>() {
                    Ok(n) => visitor.visit_i64(n),
                    Err(_) => Err(de::Error::custom("Expected a whole number")),
                },
                other => Coerce(other).deserialize_any(visitor),
            }
        }
    )*};
}

macro_rules! coerce_unsigned {
    ($($method:ident),*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CoerceError> {
            match self.0 {
                Value::String(text) => match text.trim().parse::<u64>() {
                    Ok(n) => visitor.visit_u64(n),
                    Err(_) => Err(de::Error::custom("Expected a non-negative whole number")),
                },
                other => Coerce(other).deserialize_any(visitor),
            }
        }
    )*};
}

macro_rules! coerce_float {
    ($($method:ident),*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CoerceError> {
            match self.0 {
                Value::String(text) => match text.trim().parse::<f64>() {
                    Ok(n) if n.is_finite() => visitor.visit_f64(n),
                    _ => Err(de::Error::custom("Expected a number")),
                },
                other => Coerce(other).deserialize_any(visitor),
            }
        }
    )*};
}

impl<'de> Deserializer<'de> for Coerce {
    type Error = CoerceError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CoerceError> {
        match self.0 {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    visitor.visit_u64(u)
                } else if let Some(i) = n.as_i64() {
                    visitor.visit_i64(i)
                } else {
                    visitor.visit_f64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(text) => visitor.visit_string(text),
            Value::Array(items) => visitor.visit_seq(SeqCoerce::new(items)),
            Value::Object(map) => visitor.visit_map(MapCoerce::new(map)),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CoerceError> {
        match self.0 {
            Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "on" | "1" | "yes" => visitor.visit_bool(true),
                "false" | "off" | "0" | "no" => visitor.visit_bool(false),
                _ => Err(de::Error::custom("Expected a boolean")),
            },
            other => Coerce(other).deserialize_any(visitor),
        }
    }

    coerce_signed!(deserialize_i8, deserialize_i16, deserialize_i32, deserialize_i64);
    coerce_unsigned!(deserialize_u8, deserialize_u16, deserialize_u32, deserialize_u64);
    coerce_float!(deserialize_f32, deserialize_f64);

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CoerceError> {
        match self.0 {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(Coerce(other)),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, CoerceError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, CoerceError> {
        match self.0 {
            Value::String(text) => visitor.visit_enum(text.into_deserializer()),
            other => other
                .deserialize_enum(name, variants, visitor)
                .map_err(|e| de::Error::custom(e.to_string())),
        }
    }

    forward_to_deserialize_any! {
        i128 u128 char str string bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}

struct SeqCoerce {
    items: std::vec::IntoIter<Value>,
    index: usize,
}

impl SeqCoerce {
    fn new(items: Vec<Value>) -> Self {
        Self {
            items: items.into_iter(),
            index: 0,
        }
    }
}

impl<'de> SeqAccess<'de> for SeqCoerce {
    type Error = CoerceError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, CoerceError> {
        let Some(item) = self.items.next() else {
            return Ok(None);
        };
        let index = self.index;
        self.index += 1;
        seed.deserialize(Coerce(item))
            .map(Some)
            .map_err(|e| e.within(index.to_string()))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

struct MapCoerce {
    entries: serde_json::map::IntoIter,
    pending: Option<(String, Value)>,
}

impl MapCoerce {
    fn new(map: Map<String, Value>) -> Self {
        Self {
            entries: map.into_iter(),
            pending: None,
        }
    }
}

impl<'de> MapAccess<'de> for MapCoerce {
    type Error = CoerceError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, CoerceError> {
        let Some((key, value)) = self.entries.by_ref().find(|(_, value)| !value.is_null()) else {
            return Ok(None);
        };
        let parsed = seed
            .deserialize(Coerce(Value::String(key.clone())))
            .map_err(|e| e.within(key.clone()))?;
        self.pending = Some((key, value));
        Ok(Some(parsed))
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, CoerceError> {
        let Some((key, value)) = self.pending.take() else {
            return Err(de::Error::custom("value requested before key"));
        };
        seed.deserialize(Coerce(value)).map_err(|e| e.within(key))
    }

    fn size_hint(&self) -> Option<usize> {
        None
    }
}

/// Most stand-ins tried while collecting the errors of one submission.
const MAX_REPAIRS: usize = 64;

/// Outcome of [`deserialize_collecting`].
pub(crate) struct Collected<T> {
    /// The value, built with stand-ins for every failing field.
    pub(crate) value: Option<T>,
    pub(crate) errors: FieldErrors,
    /// Paths whose submitted value was replaced by a stand-in.
    patched: Vec<Vec<String>>,
}

impl<T> Collected<T> {
    /// Whether the dotted `path` lies at or under a replaced field.
    pub(crate) fn is_patched(&self, path: &str) -> bool {
        self.patched.iter().any(|segments| {
            let prefix = segments.join(".");
            path == prefix || path.starts_with(&format!("{prefix}."))
        })
    }
}

/// Deserialize `data`, recording each failing field and standing in a
/// neutral value for it until the whole value builds.
///
/// Errors under a field that was already replaced are not recorded again.
pub(crate) fn deserialize_collecting<T: DeserializeOwned>(mut data: Value) -> Collected<T> {
    let mut errors = FieldErrors::new();
    let mut patched: Vec<Vec<String>> = Vec::new();

    for _ in 0..MAX_REPAIRS {
        let err = match T::deserialize(Coerce(data.clone())) {
            Ok(value) => {
                return Collected {
                    value: Some(value),
                    errors,
                    patched,
                }
            }
            Err(err) => err,
        };

        if !patched.iter().any(|prefix| err.path.starts_with(prefix)) {
            errors.entry(err.path()).or_default().push(err.message.clone());
        }
        if err.path.is_empty() || patched.contains(&err.path) || !stand_in::<T>(&mut data, &err.path) {
            break;
        }
        patched.push(err.path);
    }

    Collected {
        value: None,
        errors,
        patched,
    }
}

/// Replace the value at `path` with the first neutral value that moves the
/// failure elsewhere. Returns `false` when none does.
fn stand_in<T: DeserializeOwned>(data: &mut Value, path: &[String]) -> bool {
    for candidate in [json!(""), json!(0), json!(false), json!([]), json!({})] {
        let mut trial = data.clone();
        if !set_path(&mut trial, path, candidate) {
            return false;
        }
        let fixed = match T::deserialize(Coerce(trial.clone())) {
            Ok(_) => true,
            Err(err) => err.path != path,
        };
        if fixed {
            *data = trial;
            return true;
        }
    }
    false
}

fn set_path(root: &mut Value, path: &[String], value: Value) -> bool {
    let Some((last, parents)) = path.split_last() else {
        return false;
    };

    let mut cursor = root;
    for segment in parents {
        let next = match cursor {
            Value::Object(map) => map.get_mut(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
            _ => None,
        };
        match next {
            Some(next) => cursor = next,
            None => return false,
        }
    }

    match cursor {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            true
        }
        Value::Array(items) => match last.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        },
        _ => false,
    }
}
