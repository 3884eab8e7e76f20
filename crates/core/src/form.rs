//! Raw form submissions and their decoding into a nested JSON tree.
//!
//! Field names use dot and bracket notation:
//!
//! ```text
//! name              -> { "name": .. }
//! address.city      -> { "address": { "city": .. } }
//! tags[0]           -> { "tags": [ .. ] }
//! tags[]            -> appended to "tags"
//! items[1].sku      -> { "items": [ null, { "sku": .. } ] }
//! ```
//!
//! Empty text values decode to `null` so an unfilled optional field reads as
//! "not provided" rather than `""`.

use std::collections::HashSet;

use serde_json::{json, Map, Value};

/// Largest explicit array index accepted in a field name.
pub const MAX_ARRAY_INDEX: usize = 1000;

/// Most values one submission may decode to, counting array padding.
pub const MAX_DECODED_VALUES: usize = 10_000;

/// A file part of a multipart submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Value of a single submitted field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File(UploadedFile),
}

impl FormValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(text) => Some(text),
            FormValue::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            FormValue::File(file) => Some(file),
            FormValue::Text(_) => None,
        }
    }
}

/// An ordered, undecoded form submission.
///
/// Entries keep submission order and names may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, FormValue)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries
            .push((name.into(), FormValue::Text(value.into())));
    }

    pub fn append_file(&mut self, name: impl Into<String>, file: UploadedFile) {
        self.entries.push((name.into(), FormValue::File(file)));
    }

    /// First value submitted under `name`.
    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FormValue::as_text)
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FormValue> + 'a {
        self.entries
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for FormData
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut form = FormData::new();
        for (key, value) in iter {
            form.append_text(key, value);
        }
        form
    }
}

/// Failure to turn a submission into a nested tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Malformed field name `{key}`: {reason}")]
    MalformedPath { key: String, reason: &'static str },

    #[error("Duplicate field `{path}`")]
    DuplicateKey { path: String },

    #[error("Field `{path}` is used both as a value and as a container")]
    TypeConflict { path: String },

    #[error("Array index {index} in `{path}` exceeds the maximum of {max}")]
    IndexOutOfRange {
        path: String,
        index: usize,
        max: usize,
    },

    #[error("Submission decodes to more than {max} values (at `{path}`)")]
    TooLarge { path: String, max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
    Push,
}

/// Bookkeeping shared by every field of one decode.
#[derive(Default)]
struct DecodeState {
    /// Resolved paths of written leaves, `null` leaves included.
    written: HashSet<Vec<String>>,
    /// Values allocated so far, array padding included.
    allocated: usize,
}

impl DecodeState {
    fn allocate(&mut self, count: usize, name: &str) -> Result<(), DecodeError> {
        self.allocated = self.allocated.saturating_add(count);
        if self.allocated > MAX_DECODED_VALUES {
            return Err(DecodeError::TooLarge {
                path: name.to_string(),
                max: MAX_DECODED_VALUES,
            });
        }
        Ok(())
    }
}

/// Decode a flat submission into a nested JSON object.
pub fn decode(form: &FormData) -> Result<Value, DecodeError> {
    let mut root = Value::Object(Map::new());
    let mut state = DecodeState::default();
    for (name, value) in form.iter() {
        let segments = parse_path(name)?;
        insert(&mut root, &mut state, &segments, leaf_value(value), name)?;
    }
    Ok(root)
}

fn leaf_value(value: &FormValue) -> Value {
    match value {
        FormValue::Text(text) if text.is_empty() => Value::Null,
        FormValue::Text(text) => Value::String(text.clone()),
        FormValue::File(file) => json!({
            "fileName": file.file_name,
            "contentType": file.content_type,
            "size": file.bytes.len(),
        }),
    }
}

fn parse_path(key: &str) -> Result<Vec<Segment>, DecodeError> {
    let malformed = |reason: &'static str| DecodeError::MalformedPath {
        key: key.to_string(),
        reason,
    };

    let head_end = key.find(['.', '[']).unwrap_or(key.len());
    if head_end == 0 {
        return Err(malformed("field name must start with a key"));
    }

    let mut segments = vec![Segment::Key(key[..head_end].to_string())];
    let mut rest = &key[head_end..];

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('.') {
            let end = after.find(['.', '[']).unwrap_or(after.len());
            if end == 0 {
                return Err(malformed("empty key segment"));
            }
            segments.push(Segment::Key(after[..end].to_string()));
            rest = &after[end..];
        } else if let Some(after) = rest.strip_prefix('[') {
            let close = after.find(']').ok_or_else(|| malformed("unclosed bracket"))?;
            let inner = &after[..close];
            let segment = if inner.is_empty() {
                Segment::Push
            } else if inner.bytes().all(|b| b.is_ascii_digit()) {
                inner
                    .parse::<usize>()
                    .map(Segment::Index)
                    .map_err(|_| malformed("array index is too large"))?
            } else {
                return Err(malformed("array index must be a non-negative integer"));
            };
            segments.push(segment);
            rest = &after[close + 1..];
        } else {
            return Err(malformed("expected `.` or `[` after `]`"));
        }
    }

    Ok(segments)
}

fn insert(
    root: &mut Value,
    state: &mut DecodeState,
    segments: &[Segment],
    leaf: Value,
    name: &str,
) -> Result<(), DecodeError> {
    let Some((last, parents)) = segments.split_last() else {
        return Err(DecodeError::MalformedPath {
            key: name.to_string(),
            reason: "empty field name",
        });
    };

    let mut resolved = Vec::with_capacity(segments.len());
    let mut cursor = root;
    for (i, segment) in parents.iter().enumerate() {
        let next = &segments[i + 1];
        let (slot, existed) = slot_mut(cursor, segment, state, &mut resolved, name)?;
        if !existed {
            *slot = empty_container(next);
        }
        let fits = matches!(
            (&*slot, next),
            (Value::Object(_), Segment::Key(_))
                | (Value::Array(_), Segment::Index(_) | Segment::Push)
        );
        if !fits {
            return Err(DecodeError::TypeConflict {
                path: name.to_string(),
            });
        }
        cursor = slot;
    }

    let (slot, existed) = slot_mut(cursor, last, state, &mut resolved, name)?;
    if existed {
        return Err(DecodeError::DuplicateKey {
            path: name.to_string(),
        });
    }
    *slot = leaf;
    state.written.insert(resolved);
    Ok(())
}

fn empty_container(next: &Segment) -> Value {
    match next {
        Segment::Key(_) => Value::Object(Map::new()),
        Segment::Index(_) | Segment::Push => Value::Array(Vec::new()),
    }
}

/// Locate (creating if needed) the slot `segment` addresses inside `parent`,
/// and append its resolved name to `resolved`.
///
/// The flag reports whether the slot was already occupied. Array padding is
/// vacant; a `null` leaf written by the submission is not.
fn slot_mut<'a>(
    parent: &'a mut Value,
    segment: &Segment,
    state: &mut DecodeState,
    resolved: &mut Vec<String>,
    name: &str,
) -> Result<(&'a mut Value, bool), DecodeError> {
    match (parent, segment) {
        (Value::Object(map), Segment::Key(key)) => {
            resolved.push(key.clone());
            let existed = map.contains_key(key);
            if !existed {
                state.allocate(1, name)?;
            }
            Ok((map.entry(key.clone()).or_insert(Value::Null), existed))
        }
        (Value::Array(items), Segment::Index(index)) => {
            let index = *index;
            if index > MAX_ARRAY_INDEX {
                return Err(DecodeError::IndexOutOfRange {
                    path: name.to_string(),
                    index,
                    max: MAX_ARRAY_INDEX,
                });
            }
            if index >= items.len() {
                state.allocate(index + 1 - items.len(), name)?;
                items.resize(index + 1, Value::Null);
            }
            resolved.push(index.to_string());
            let existed = !items[index].is_null() || state.written.contains(resolved.as_slice());
            Ok((&mut items[index], existed))
        }
        (Value::Array(items), Segment::Push) => {
            if items.len() > MAX_ARRAY_INDEX {
                return Err(DecodeError::IndexOutOfRange {
                    path: name.to_string(),
                    index: items.len(),
                    max: MAX_ARRAY_INDEX,
                });
            }
            state.allocate(1, name)?;
            resolved.push(items.len().to_string());
            items.push(Value::Null);
            let last = items.len() - 1;
            Ok((&mut items[last], false))
        }
        _ => Err(DecodeError::TypeConflict {
            path: name.to_string(),
        }),
    }
}
