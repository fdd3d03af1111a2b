//! Field specs and the descriptors compiled from them.
//!
//! A [`FieldSpec`] is one property of a schema as written in the document.
//! [`FieldDescriptor::compile`] turns it into a typed slot with a default
//! value and an ordered list of [`Validator`]s. The descriptor kind is
//! chosen in this order:
//!
//! 1. `enum` present: membership check only (numbers compare by value,
//!    and a missing `type` is inferred from the members);
//! 2. `type: array`: a [`TypedSequence`] whose element type comes from
//!    `items`;
//! 3. numeric with `minimum`/`maximum`: type check plus an exclusive range;
//! 4. string with `pattern`: type check plus a fully anchored regex;
//! 5. otherwise a plain type check.
//!
//! String fields with `format: date` or `format: date-time` also carry a
//! format check, and a property holding only `$ref` becomes a
//! model-instance slot.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Result, SchemaError};
use crate::model::ModelInstance;
use crate::reference::{Reference, ResolutionContext, TargetKind};
use crate::registry::{ModelLookup, ModelRegistry};
use crate::sequence::{ElementType, TypedSequence};
use crate::value::{PrimitiveType, Value, decode_binary};

/// One schema property as written in the document.
///
/// Unknown keys (`example`, `readOnly`, vendor extensions, ...) are
/// ignored here; the model keeps the raw property for output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Declared type name.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Property-level required flag.
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    /// Exclusive lower bound for numeric fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    /// Exclusive upper bound for numeric fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// Regex the whole string value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Allowed values.
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<JsonValue>>,
    /// Element spec for arrays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<FieldSpec>>,
    /// Explicit default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,
    /// Format hint (`byte`, `binary`, `date`, `date-time`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Pointer to another definition.
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl FieldSpec {
    /// Creates a spec for `type_name` with everything else unset.
    pub fn of_type(type_name: &str) -> Self {
        Self {
            type_name: Some(type_name.to_string()),
            ..Default::default()
        }
    }

    /// Marks the field spec as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets exclusive bounds.
    pub fn with_bounds(mut self, minimum: Option<f64>, maximum: Option<f64>) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    /// Sets the pattern.
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    /// Sets the allowed values.
    pub fn with_enum<I, T>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<JsonValue>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the element spec.
    pub fn with_items(mut self, items: FieldSpec) -> Self {
        self.items = Some(Box::new(items));
        self
    }

    /// Creates a spec that only points at another definition.
    pub fn reference(pointer: &str) -> Self {
        Self {
            reference: Some(pointer.to_string()),
            ..Default::default()
        }
    }
}

/// Type category a schema type name maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredType {
    /// A primitive type.
    Primitive(PrimitiveType),
    /// `array`.
    Array,
}

/// Maps a schema type name to its runtime type.
///
/// # Errors
///
/// [`SchemaError::UnsupportedType`] naming the type for anything unmapped.
///
/// # Examples
///
/// ```
/// use apispec_core::{DeclaredType, PrimitiveType, type_from_name};
///
/// assert_eq!(type_from_name("long").unwrap(), DeclaredType::Primitive(PrimitiveType::Integer));
/// assert_eq!(type_from_name("array").unwrap(), DeclaredType::Array);
/// assert!(type_from_name("object").is_err());
/// ```
pub fn type_from_name(name: &str) -> Result<DeclaredType> {
    let declared = match name {
        "integer" | "long" => DeclaredType::Primitive(PrimitiveType::Integer),
        "float" | "double" | "number" => DeclaredType::Primitive(PrimitiveType::Float),
        "string" => DeclaredType::Primitive(PrimitiveType::String),
        "byte" | "binary" => DeclaredType::Primitive(PrimitiveType::Binary),
        "boolean" => DeclaredType::Primitive(PrimitiveType::Boolean),
        "array" => DeclaredType::Array,
        other => return Err(SchemaError::UnsupportedType(other.to_string())),
    };
    Ok(declared)
}

fn declared_type(field: &str, spec: &FieldSpec) -> Result<DeclaredType> {
    let Some(name) = spec.type_name.as_deref() else {
        return match &spec.enum_values {
            Some(values) => enum_member_type(field, values).map(DeclaredType::Primitive),
            None => Err(SchemaError::UnsupportedType("(missing)".to_string())),
        };
    };
    match type_from_name(name)? {
        DeclaredType::Primitive(PrimitiveType::String)
            if matches!(spec.format.as_deref(), Some("byte" | "binary")) =>
        {
            Ok(DeclaredType::Primitive(PrimitiveType::Binary))
        }
        declared => Ok(declared),
    }
}

/// Primitive type shared by every member of an untyped `enum`.
fn enum_member_type(field: &str, values: &[JsonValue]) -> Result<PrimitiveType> {
    let member_type = |value: &JsonValue| match value {
        JsonValue::String(_) => Some(PrimitiveType::String),
        JsonValue::Bool(_) => Some(PrimitiveType::Boolean),
        JsonValue::Number(n) if n.is_i64() || n.is_u64() => Some(PrimitiveType::Integer),
        JsonValue::Number(_) => Some(PrimitiveType::Float),
        _ => None,
    };
    let mut inferred: Option<PrimitiveType> = None;
    for value in values {
        let Some(t) = member_type(value) else {
            return Err(invalid_enum(field, format!("unsupported enum member {value}")));
        };
        inferred = match (inferred, t) {
            (None, t) => Some(t),
            (Some(a), b) if a == b => Some(a),
            (Some(PrimitiveType::Integer | PrimitiveType::Float), PrimitiveType::Integer | PrimitiveType::Float) => {
                Some(PrimitiveType::Float)
            }
            _ => return Err(invalid_enum(field, "enum members of mixed types need a declared type".to_string())),
        };
    }
    inferred.ok_or_else(|| invalid_enum(field, "enum without a type must list at least one member".to_string()))
}

fn invalid_enum(field: &str, reason: String) -> SchemaError {
    SchemaError::InvalidSchema {
        name: field.to_string(),
        reason,
    }
}

/// Runtime type of a descriptor slot.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// A primitive value.
    Primitive(PrimitiveType),
    /// A typed sequence.
    Array(ElementType),
    /// An instance of a referenced model.
    Model(Reference),
}

impl FieldType {
    fn describe(&self) -> String {
        match self {
            FieldType::Primitive(t) => t.name().to_string(),
            FieldType::Array(element) => format!("array of {}", element.describe()),
            FieldType::Model(reference) => ElementType::Model(reference.clone()).describe(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// String formats with a dedicated check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    /// `YYYY-MM-DD`.
    Date,
    /// RFC 3339 timestamp.
    DateTime,
}

/// One check in a descriptor's validator list.
#[derive(Debug, Clone)]
pub enum Validator {
    /// Value must be a primitive of this type.
    Type(PrimitiveType),
    /// Value must be a number strictly between the bounds.
    ExclusiveRange {
        /// Exclusive lower bound.
        minimum: Option<f64>,
        /// Exclusive upper bound.
        maximum: Option<f64>,
    },
    /// Value must be a string fully matching the (anchored) regex.
    Pattern(Regex),
    /// Value must equal one of these.
    OneOf(Vec<JsonValue>),
    /// Value must parse in this format.
    Format(StringFormat),
    /// Value must be an instance of the referenced model.
    Instance(Reference),
}

impl Validator {
    /// Applies this check to `value` assigned to `field`.
    ///
    /// # Errors
    ///
    /// [`SchemaError::TypeMismatch`] or [`SchemaError::ConstraintViolation`].
    pub fn check(&self, field: &str, value: &Value) -> Result<()> {
        match self {
            Validator::Type(expected) => {
                if value.primitive_type() == Some(*expected) {
                    Ok(())
                } else {
                    Err(type_mismatch(field, expected.name(), value))
                }
            }
            Validator::ExclusiveRange { minimum, maximum } => {
                let number = value
                    .as_number()
                    .ok_or_else(|| type_mismatch(field, "number", value))?;
                if let Some(min) = minimum {
                    if number <= *min {
                        return Err(violation(
                            field,
                            format!("value {number} is too small, minimum is {min} (exclusive)"),
                        ));
                    }
                }
                if let Some(max) = maximum {
                    if number >= *max {
                        return Err(violation(
                            field,
                            format!("value {number} is too large, maximum is {max} (exclusive)"),
                        ));
                    }
                }
                Ok(())
            }
            Validator::Pattern(regex) => {
                let text = value
                    .as_str()
                    .ok_or_else(|| type_mismatch(field, "string", value))?;
                if regex.is_match(text) {
                    Ok(())
                } else {
                    Err(violation(
                        field,
                        format!("'{text}' does not match pattern {}", regex.as_str()),
                    ))
                }
            }
            Validator::OneOf(allowed) => {
                let json = value.to_json();
                if allowed.iter().any(|member| same_member(member, &json)) {
                    Ok(())
                } else {
                    let choices: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
                    Err(violation(
                        field,
                        format!("{json} is not one of [{}]", choices.join(", ")),
                    ))
                }
            }
            Validator::Format(format) => {
                let text = value
                    .as_str()
                    .ok_or_else(|| type_mismatch(field, "string", value))?;
                let valid = match format {
                    StringFormat::Date => chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok(),
                    StringFormat::DateTime => chrono::DateTime::parse_from_rfc3339(text).is_ok(),
                };
                if valid {
                    Ok(())
                } else {
                    Err(violation(field, format!("'{text}' is not a valid {format:?}")))
                }
            }
            Validator::Instance(reference) => {
                let target = reference
                    .target()
                    .ok_or_else(|| SchemaError::UnresolvedReference(reference.pointer().into()))?;
                match value {
                    Value::Model(instance)
                        if target.kind == TargetKind::Definition
                            && instance.model_name() == target.name =>
                    {
                        Ok(())
                    }
                    _ => Err(type_mismatch(field, &target.name, value)),
                }
            }
        }
    }
}

/// JSON equality, except that numbers compare by value (`1` matches `1.0`).
fn same_member(member: &JsonValue, value: &JsonValue) -> bool {
    match (member.as_f64(), value.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => member == value,
    }
}

fn type_mismatch(field: &str, expected: &str, value: &Value) -> SchemaError {
    SchemaError::TypeMismatch {
        field: field.to_string(),
        expected: expected.to_string(),
        found: value.type_name(),
    }
}

fn violation(field: &str, reason: String) -> SchemaError {
    SchemaError::ConstraintViolation {
        field: field.to_string(),
        reason,
    }
}

/// A compiled, validated attribute slot.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: String,
    field_type: FieldType,
    required: bool,
    default: Option<Value>,
    validators: Vec<Validator>,
    spec: FieldSpec,
}

impl FieldDescriptor {
    /// Compiles `spec` into a descriptor named `name`.
    ///
    /// `required` overrides the field spec's own flag (model-level `required`
    /// lists feed in here). References met in `$ref` properties and array
    /// `items` are created through `context` so a later resolution pass
    /// binds them.
    ///
    /// # Errors
    ///
    /// [`SchemaError::UnsupportedType`] for an unmapped type name,
    /// [`SchemaError::InvalidPattern`] for a bad regex,
    /// [`SchemaError::InvalidSchema`] for an array without `items`, and
    /// any error converting an explicit `default`.
    pub fn compile(
        name: &str,
        spec: &FieldSpec,
        required: bool,
        context: &mut ResolutionContext,
    ) -> Result<Self> {
        let field_type = match &spec.reference {
            Some(pointer) if spec.type_name.is_none() => FieldType::Model(context.reference(pointer)),
            _ => match declared_type(name, spec)? {
                DeclaredType::Primitive(t) => FieldType::Primitive(t),
                DeclaredType::Array => FieldType::Array(element_type(name, spec.items.as_deref(), context)?),
            },
        };

        let mut validators = Vec::new();
        if let Some(values) = &spec.enum_values {
            validators.push(Validator::OneOf(values.clone()));
        } else {
            match &field_type {
                FieldType::Array(_) => {}
                FieldType::Model(reference) => validators.push(Validator::Instance(reference.clone())),
                FieldType::Primitive(t) => {
                    validators.push(Validator::Type(*t));
                    let numeric = matches!(t, PrimitiveType::Integer | PrimitiveType::Float);
                    if numeric && (spec.minimum.is_some() || spec.maximum.is_some()) {
                        validators.push(Validator::ExclusiveRange {
                            minimum: spec.minimum,
                            maximum: spec.maximum,
                        });
                    }
                    if *t == PrimitiveType::String {
                        if let Some(pattern) = &spec.pattern {
                            validators.push(Validator::Pattern(anchored(name, pattern)?));
                        }
                        match spec.format.as_deref() {
                            Some("date") => validators.push(Validator::Format(StringFormat::Date)),
                            Some("date-time") => {
                                validators.push(Validator::Format(StringFormat::DateTime))
                            }
                            _ => {}
                        }
                    }
                }
            }
        }

        let mut descriptor = Self {
            name: name.to_string(),
            field_type,
            required,
            default: None,
            validators,
            spec: spec.clone(),
        };
        descriptor.default = descriptor.initial_default()?;
        Ok(descriptor)
    }

    fn initial_default(&self) -> Result<Option<Value>> {
        if let Some(raw) = &self.spec.default {
            if matches!(self.field_type, FieldType::Model(_)) {
                tracing::warn!(field = %self.name, "Ignoring default on a referenced model field");
                return Ok(None);
            }
            let value = self.value_from_json(raw, &ModelRegistry::new())?;
            return self.check_shape(value).map(Some);
        }
        if self.spec.enum_values.is_some() {
            return Ok(None);
        }
        Ok(match &self.field_type {
            FieldType::Primitive(t) => Some(t.zero()),
            FieldType::Array(element) => Some(Value::Array(TypedSequence::new(element.clone()))),
            FieldType::Model(_) => None,
        })
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runtime type of the slot.
    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    /// Whether the field must be supplied at construction.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Value an omitted optional field takes; `None` means unset.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Validators applied on every assignment, in order.
    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// The field spec this descriptor was compiled from.
    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }

    /// An empty sequence of this field's element type, for array fields.
    pub fn empty_sequence(&self) -> Option<TypedSequence> {
        match &self.field_type {
            FieldType::Array(element) => Some(TypedSequence::new(element.clone())),
            _ => None,
        }
    }

    /// Validates `value` for assignment and returns the value to store.
    ///
    /// Array values are re-collected into a sequence of this field's
    /// element type, checking every element.
    ///
    /// # Errors
    ///
    /// Fails on the first violated type or constraint; nothing is coerced.
    pub fn check(&self, value: Value) -> Result<Value> {
        let value = self.check_shape(value)?;
        for validator in &self.validators {
            validator.check(&self.name, &value)?;
        }
        Ok(value)
    }

    fn check_shape(&self, value: Value) -> Result<Value> {
        match (&self.field_type, value) {
            (FieldType::Array(element), Value::Array(seq)) => {
                TypedSequence::from_values(element.clone(), seq.into_items())
                    .map(Value::Array)
                    .map_err(|err| match err {
                        SchemaError::TypeMismatch { expected, found, .. } => SchemaError::TypeMismatch {
                            field: self.name.clone(),
                            expected: format!("array of {expected}"),
                            found: format!("array containing {found}"),
                        },
                        other => other,
                    })
            }
            (FieldType::Array(_), other) => Err(type_mismatch(&self.name, "array", &other)),
            (_, value) => Ok(value),
        }
    }

    /// Converts raw document data into a value of this field's type.
    ///
    /// JSON integers are accepted for float fields, binary fields expect
    /// base64 text and referenced models are instantiated through `models`.
    /// Constraints are not checked here; assignment does that.
    ///
    /// # Errors
    ///
    /// [`SchemaError::TypeMismatch`] for data of the wrong shape,
    /// [`SchemaError::UnresolvedReference`] if a referenced model cannot be
    /// found.
    pub fn value_from_json(&self, json: &JsonValue, models: &dyn ModelLookup) -> Result<Value> {
        match &self.field_type {
            FieldType::Primitive(t) => primitive_from_json(&self.name, *t, json),
            FieldType::Array(element) => element_from_json(
                &self.name,
                &ElementType::Array(Box::new(element.clone())),
                json,
                models,
            ),
            FieldType::Model(reference) => instance_from_json(reference, json, models).map(Value::Model),
        }
    }
}

/// Compiles a standalone descriptor using the field spec's own required flag.
///
/// References in the field spec are created unregistered; resolve them by hand
/// or compile through a [`ModelRegistry`] instead.
///
/// # Examples
///
/// ```
/// use apispec_core::{FieldSpec, Value, make_descriptor};
///
/// let weight = make_descriptor(
///     "weight",
///     &FieldSpec::of_type("integer").with_bounds(Some(0.0), Some(500.0)),
/// ).unwrap();
///
/// assert!(weight.check(Value::from(20)).is_ok());
/// assert!(weight.check(Value::from(0)).is_err());
/// assert!(weight.check(Value::from(500)).is_err());
/// assert_eq!(weight.default_value(), Some(&Value::from(0)));
/// ```
pub fn make_descriptor(name: &str, spec: &FieldSpec) -> Result<FieldDescriptor> {
    FieldDescriptor::compile(name, spec, spec.required, &mut ResolutionContext::new())
}

fn anchored(field: &str, pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|err| SchemaError::InvalidPattern {
        field: field.to_string(),
        pattern: pattern.to_string(),
        reason: err.to_string(),
    })
}

fn element_type(
    field: &str,
    items: Option<&FieldSpec>,
    context: &mut ResolutionContext,
) -> Result<ElementType> {
    let items = items.ok_or_else(|| SchemaError::InvalidSchema {
        name: field.to_string(),
        reason: "array field declares no items".to_string(),
    })?;
    if let Some(pointer) = &items.reference {
        return Ok(ElementType::Model(context.reference(pointer)));
    }
    match declared_type(field, items)? {
        DeclaredType::Primitive(t) => Ok(ElementType::Primitive(t)),
        DeclaredType::Array => Ok(ElementType::Array(Box::new(element_type(
            field,
            items.items.as_deref(),
            context,
        )?))),
    }
}

pub(crate) fn json_type_name(json: &JsonValue) -> String {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(n) if n.is_f64() => "float",
        JsonValue::Number(_) => "integer",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
    .to_string()
}

fn json_mismatch(field: &str, expected: &str, json: &JsonValue) -> SchemaError {
    SchemaError::TypeMismatch {
        field: field.to_string(),
        expected: expected.to_string(),
        found: json_type_name(json),
    }
}

fn primitive_from_json(field: &str, t: PrimitiveType, json: &JsonValue) -> Result<Value> {
    let value = match t {
        PrimitiveType::Integer => json.as_i64().map(Value::Integer),
        PrimitiveType::Float => json.as_f64().map(Value::Float),
        PrimitiveType::String => json.as_str().map(|s| Value::String(s.to_string())),
        PrimitiveType::Boolean => json.as_bool().map(Value::Boolean),
        PrimitiveType::Binary => match json.as_str() {
            Some(text) => {
                let bytes = decode_binary(text).ok_or_else(|| {
                    violation(field, "binary value is not valid base64".to_string())
                })?;
                Some(Value::Binary(bytes))
            }
            None => None,
        },
    };
    value.ok_or_else(|| json_mismatch(field, t.name(), json))
}

fn element_from_json(
    field: &str,
    element: &ElementType,
    json: &JsonValue,
    models: &dyn ModelLookup,
) -> Result<Value> {
    match element {
        ElementType::Primitive(t) => primitive_from_json(field, *t, json),
        ElementType::Array(inner) => {
            let items = json
                .as_array()
                .ok_or_else(|| json_mismatch(field, "array", json))?;
            let values = items
                .iter()
                .map(|item| element_from_json(field, inner, item, models))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::list(values))
        }
        ElementType::Model(reference) => instance_from_json(reference, json, models).map(Value::Model),
        ElementType::Any => loose_from_json(field, json),
    }
}

fn loose_from_json(field: &str, json: &JsonValue) -> Result<Value> {
    match json {
        JsonValue::Bool(b) => Ok(Value::Boolean(*b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Ok(Value::Integer(i)),
            None => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| json_mismatch(field, "number", json)),
        },
        JsonValue::String(s) => Ok(Value::String(s.clone())),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| loose_from_json(field, item))
            .collect::<Result<Vec<_>>>()
            .map(Value::list),
        JsonValue::Null | JsonValue::Object(_) => Err(json_mismatch(field, "primitive or array", json)),
    }
}

fn instance_from_json(
    reference: &Reference,
    json: &JsonValue,
    models: &dyn ModelLookup,
) -> Result<ModelInstance> {
    let model = models
        .model(reference)
        .ok_or_else(|| SchemaError::UnresolvedReference(reference.pointer().to_string()))?;
    model.instantiate(json, models)
}
