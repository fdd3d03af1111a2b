//! Tagged runtime values held by model instances.
//!
//! Every compiled model stores its fields as [`Value`]s. An unset field is
//! simply absent from the instance; there is no null variant, so "unset"
//! can never be confused with a zero value.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value as JsonValue;

use crate::model::ModelInstance;
use crate::sequence::TypedSequence;

/// Primitive type a field or sequence element can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// Signed 64-bit integer (`integer`, `long`).
    Integer,
    /// 64-bit float (`float`, `double`, `number`).
    Float,
    /// UTF-8 string.
    String,
    /// Boolean.
    Boolean,
    /// Raw bytes (`byte`, `binary`), base64 on the wire.
    Binary,
}

impl PrimitiveType {
    /// Returns the schema type name used in messages and output.
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Integer => "integer",
            PrimitiveType::Float => "float",
            PrimitiveType::String => "string",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Binary => "binary",
        }
    }

    /// The zero value for this type.
    pub fn zero(self) -> Value {
        match self {
            PrimitiveType::Integer => Value::Integer(0),
            PrimitiveType::Float => Value::Float(0.0),
            PrimitiveType::String => Value::String(String::new()),
            PrimitiveType::Boolean => Value::Boolean(false),
            PrimitiveType::Binary => Value::Binary(Vec::new()),
        }
    }
}

/// A field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Integer value.
    Integer(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// Boolean value.
    Boolean(bool),
    /// Byte string.
    Binary(Vec<u8>),
    /// Element-type checked sequence.
    Array(TypedSequence),
    /// Instance of a compiled model.
    Model(ModelInstance),
}

impl Value {
    /// Builds an array value from loose items.
    ///
    /// The sequence accepts anything; assigning it through an array
    /// descriptor re-checks every element against the declared type.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(TypedSequence::untyped(items))
    }

    /// Returns the primitive type of this value, if it is a primitive.
    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        match self {
            Value::Integer(_) => Some(PrimitiveType::Integer),
            Value::Float(_) => Some(PrimitiveType::Float),
            Value::String(_) => Some(PrimitiveType::String),
            Value::Boolean(_) => Some(PrimitiveType::Boolean),
            Value::Binary(_) => Some(PrimitiveType::Binary),
            Value::Array(_) | Value::Model(_) => None,
        }
    }

    /// Short type description used in error messages.
    pub fn type_name(&self) -> String {
        match self {
            Value::Array(_) => "array".to_string(),
            Value::Model(instance) => instance.model_name().to_string(),
            other => other
                .primitive_type()
                .map(|t| t.name().to_string())
                .unwrap_or_default(),
        }
    }

    /// Returns the integer, if this is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the float, if this is one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string slice, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the sequence, if this is an array.
    pub fn as_sequence(&self) -> Option<&TypedSequence> {
        match self {
            Value::Array(seq) => Some(seq),
            _ => None,
        }
    }

    /// Returns the model instance, if this is one.
    pub fn as_model(&self) -> Option<&ModelInstance> {
        match self {
            Value::Model(instance) => Some(instance),
            _ => None,
        }
    }

    /// Numeric view used by range checks.
    pub(crate) fn as_number(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Serializes into the JSON shape used by documents.
    ///
    /// Binary values become base64 text; model instances become objects
    /// with their set fields only.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Integer(v) => JsonValue::from(*v),
            Value::Float(v) => JsonValue::from(*v),
            Value::String(v) => JsonValue::String(v.clone()),
            Value::Boolean(v) => JsonValue::Bool(*v),
            Value::Binary(bytes) => JsonValue::String(BASE64.encode(bytes)),
            Value::Array(seq) => JsonValue::Array(seq.iter().map(Value::to_json).collect()),
            Value::Model(instance) => instance.to_json(),
        }
    }
}

/// Decodes base64 text into bytes.
pub(crate) fn decode_binary(text: &str) -> Option<Vec<u8>> {
    BASE64.decode(text).ok()
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

impl From<ModelInstance> for Value {
    fn from(v: ModelInstance) -> Self {
        Value::Model(v)
    }
}

impl From<TypedSequence> for Value {
    fn from(v: TypedSequence) -> Self {
        Value::Array(v)
    }
}
