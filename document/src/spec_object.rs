//! Building section objects from raw document data, and merging them.

use apispec_core::{ModelRegistry, Reference, ResolutionContext};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use tracing::{debug, trace, warn};

use crate::config::RequiredPolicy;
use crate::error::{DocumentError, Result};
use crate::objects::{Attr, AttrKind, ObjectKind};

/// A built attribute value.
#[derive(Debug, Clone)]
pub enum AttrValue {
    /// String, number or boolean.
    Scalar(JsonValue),
    /// Sequence of raw values.
    List(Vec<JsonValue>),
    /// Nested section object.
    Object(Box<SpecObject>),
    /// Sequence of section objects.
    Objects(Vec<SpecObject>),
    /// Section objects by key.
    Keyed(IndexMap<String, SpecObject>),
    /// Names of the compiled models, in declaration order.
    Definitions(Vec<String>),
    /// Pointer to another node.
    Reference(Reference),
    /// Verbatim value.
    Raw(JsonValue),
}

impl AttrValue {
    /// Returns the string, if this is a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Scalar(v) => v.as_str(),
            _ => None,
        }
    }
}

/// State shared by one build pass.
pub struct BuildContext<'a> {
    /// Worklist that collects every pointer met while building.
    pub references: &'a mut ResolutionContext,
    /// Registry that definitions compile into.
    pub models: &'a mut ModelRegistry,
    /// What to do about missing required attributes.
    pub policy: RequiredPolicy,
}

/// A node of the document tree.
///
/// Attributes are stored by storage name (`$ref` as `ref`). The section
/// key an object was built under (`/pets`, `200`, a parameter name) is
/// bookkeeping and is never written back out.
#[derive(Debug, Clone)]
pub struct SpecObject {
    kind: &'static ObjectKind,
    key: Option<String>,
    attrs: IndexMap<String, AttrValue>,
}

impl SpecObject {
    /// Builds an object of `kind` from `raw`.
    ///
    /// Declared keys are built in declaration order; unrecognized keys are
    /// logged and dropped. An object holding `$ref` is a reference stub and
    /// is not checked for its other required keys.
    ///
    /// # Errors
    ///
    /// [`DocumentError::InvalidAttribute`] for values of the wrong shape,
    /// [`DocumentError::MissingRequiredField`] under
    /// [`RequiredPolicy::Error`], and definition compile errors.
    pub fn build(kind: &'static ObjectKind, raw: &JsonValue, cx: &mut BuildContext<'_>) -> Result<Self> {
        build_object(kind, None, raw, cx, true)
    }

    /// Builds an object of `kind` without demanding its own required keys.
    ///
    /// Used for included documents, which usually carry only a slice of a
    /// complete document. Nested objects are still checked.
    ///
    /// # Errors
    ///
    /// As [`build`](Self::build).
    pub fn build_fragment(
        kind: &'static ObjectKind,
        raw: &JsonValue,
        cx: &mut BuildContext<'_>,
    ) -> Result<Self> {
        build_object(kind, None, raw, cx, false)
    }

    /// Kind of this object.
    pub fn kind(&self) -> &'static ObjectKind {
        self.kind
    }

    /// Section key this object was built under, if any.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Attribute stored under `name`.
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// Returns `true` if `name` is set.
    pub fn is_set(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    /// String attribute `name`.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttrValue::as_str)
    }

    /// Nested object `name`.
    pub fn object(&self, name: &str) -> Option<&SpecObject> {
        match self.get(name)? {
            AttrValue::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Keyed collection `name`.
    pub fn keyed(&self, name: &str) -> Option<&IndexMap<String, SpecObject>> {
        match self.get(name)? {
            AttrValue::Keyed(map) => Some(map),
            _ => None,
        }
    }

    /// Object sequence `name`.
    pub fn objects(&self, name: &str) -> Option<&[SpecObject]> {
        match self.get(name)? {
            AttrValue::Objects(items) => Some(items),
            _ => None,
        }
    }

    /// The `$ref` pointer, for reference stubs.
    pub fn reference(&self) -> Option<&Reference> {
        match self.get("ref")? {
            AttrValue::Reference(reference) => Some(reference),
            _ => None,
        }
    }

    /// Set attributes in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merges `other` into this object.
    ///
    /// Sequence attributes are appended, mapping attributes are overlaid
    /// with `other` winning on key collisions, and attributes only `other`
    /// sets are taken over. For scalars and nested objects set on both
    /// sides this object's value is kept.
    pub fn merge(&mut self, other: SpecObject) {
        for (name, incoming) in other.attrs {
            let Some(existing) = self.attrs.get_mut(&name) else {
                self.attrs.insert(name, incoming);
                continue;
            };
            match (existing, incoming) {
                (AttrValue::List(ours), AttrValue::List(theirs)) => ours.extend(theirs),
                (AttrValue::Objects(ours), AttrValue::Objects(theirs)) => ours.extend(theirs),
                (AttrValue::Keyed(ours), AttrValue::Keyed(theirs)) => {
                    for (key, object) in theirs {
                        ours.insert(key, object);
                    }
                }
                (AttrValue::Definitions(ours), AttrValue::Definitions(theirs)) => {
                    for model in theirs {
                        if !ours.contains(&model) {
                            ours.push(model);
                        }
                    }
                }
                (AttrValue::Raw(JsonValue::Object(ours)), AttrValue::Raw(JsonValue::Object(theirs))) => {
                    for (key, value) in theirs {
                        ours.insert(key, value);
                    }
                }
                (AttrValue::Raw(JsonValue::Array(ours)), AttrValue::Raw(JsonValue::Array(theirs))) => {
                    ours.extend(theirs)
                }
                _ => debug!(object = self.kind.name, attribute = %name, "Keeping existing value on merge"),
            }
        }
    }
}

fn invalid(kind: &ObjectKind, key: &str, reason: impl Into<String>) -> DocumentError {
    DocumentError::InvalidAttribute {
        object: kind.name.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn build_object(
    kind: &'static ObjectKind,
    key: Option<String>,
    raw: &JsonValue,
    cx: &mut BuildContext<'_>,
    check_required: bool,
) -> Result<SpecObject> {
    let shorthand;
    let raw = match (raw, kind.shorthand) {
        (JsonValue::String(text), Some(attr)) => {
            let mut map = serde_json::Map::new();
            map.insert(attr.to_string(), JsonValue::String(text.clone()));
            shorthand = JsonValue::Object(map);
            &shorthand
        }
        _ => raw,
    };
    let map = raw.as_object().ok_or_else(|| {
        invalid(kind, key.as_deref().unwrap_or(kind.name), "expected a mapping")
    })?;
    let is_stub = map.contains_key("$ref");

    let mut attrs = IndexMap::new();
    for attr in kind.attrs {
        match map.get(attr.key) {
            None | Some(JsonValue::Null) => {
                if attr.required && check_required && !is_stub {
                    missing(kind, key.as_deref(), attr, cx.policy)?;
                } else {
                    trace!(object = kind.name, attribute = attr.key, "Optional attribute not set");
                }
            }
            Some(value) => {
                let built = build_attr(kind, attr, value, cx)?;
                attrs.insert(attr.storage_name().to_string(), built);
            }
        }
    }

    for unknown in map.keys().filter(|k| kind.attr(k).is_none()) {
        debug!(object = kind.name, key = %unknown, "Ignoring unrecognized key");
    }

    Ok(SpecObject { kind, key, attrs })
}

fn missing(kind: &ObjectKind, key: Option<&str>, attr: &Attr, policy: RequiredPolicy) -> Result<()> {
    let object = match key {
        Some(key) => format!("{} '{key}'", kind.name),
        None => kind.name.to_string(),
    };
    match policy {
        RequiredPolicy::Warn => {
            warn!(object = %object, attribute = attr.key, "Missing required attribute");
            Ok(())
        }
        RequiredPolicy::Error => Err(DocumentError::MissingRequiredField {
            object,
            key: attr.key.to_string(),
        }),
    }
}

fn build_attr(
    kind: &'static ObjectKind,
    attr: &Attr,
    value: &JsonValue,
    cx: &mut BuildContext<'_>,
) -> Result<AttrValue> {
    match attr.kind {
        AttrKind::Scalar => match value {
            JsonValue::Array(_) | JsonValue::Object(_) => {
                Err(invalid(kind, attr.key, "expected a scalar value"))
            }
            scalar => Ok(AttrValue::Scalar(scalar.clone())),
        },
        AttrKind::OneOf(choices) => match value.as_str() {
            Some(text) if choices.iter().any(|c| *c == text) => Ok(AttrValue::Scalar(value.clone())),
            _ => Err(invalid(
                kind,
                attr.key,
                format!("{value} is not one of {}", choices.join(", ")),
            )),
        },
        AttrKind::List => match value {
            JsonValue::Array(items) => Ok(AttrValue::List(items.clone())),
            _ => Err(invalid(kind, attr.key, "expected a sequence")),
        },
        AttrKind::Object(nested) => {
            build_object(nested, None, value, cx, true).map(|o| AttrValue::Object(Box::new(o)))
        }
        AttrKind::Objects(nested) => {
            let items = value
                .as_array()
                .ok_or_else(|| invalid(kind, attr.key, "expected a sequence"))?;
            items
                .iter()
                .map(|item| {
                    let key = nested
                        .key_attr
                        .and_then(|k| item.get(k))
                        .and_then(JsonValue::as_str)
                        .or_else(|| nested.shorthand.and(item.as_str()))
                        .map(str::to_string);
                    build_object(nested, key, item, cx, true)
                })
                .collect::<Result<Vec<_>>>()
                .map(AttrValue::Objects)
        }
        AttrKind::Keyed(nested) => {
            let map = value
                .as_object()
                .ok_or_else(|| invalid(kind, attr.key, "expected a mapping"))?;
            let mut built = IndexMap::with_capacity(map.len());
            for (key, item) in map {
                built.insert(key.clone(), build_object(nested, Some(key.clone()), item, cx, true)?);
            }
            Ok(AttrValue::Keyed(built))
        }
        AttrKind::Definitions => {
            let map = value
                .as_object()
                .ok_or_else(|| invalid(kind, attr.key, "expected a mapping"))?;
            let mut names = Vec::with_capacity(map.len());
            for (name, schema) in map {
                cx.models.compile(name, schema, cx.references)?;
                names.push(name.clone());
            }
            Ok(AttrValue::Definitions(names))
        }
        AttrKind::Reference => match value.as_str() {
            Some(pointer) => Ok(AttrValue::Reference(cx.references.reference(pointer))),
            None => Err(invalid(kind, attr.key, "expected a pointer string")),
        },
        AttrKind::Raw => Ok(AttrValue::Raw(value.clone())),
    }
}
