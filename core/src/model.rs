//! Schema-to-model compiler.
//!
//! [`compile_model`] turns a schema into a [`ModelType`]: one
//! [`FieldDescriptor`] per property, required fields first, each group in
//! declaration order. Instances are built with [`ModelType::construct`]
//! (positional values for the leading fields, named values for the rest)
//! or from raw document data with [`ModelType::instantiate`].

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, warn};

use crate::error::{Result, SchemaError};
use crate::fields::{FieldDescriptor, FieldSpec, json_type_name};
use crate::reference::ResolutionContext;
use crate::registry::{ModelLookup, ModelRegistry};
use crate::sequence::TypedSequence;
use crate::value::Value;

/// A compiled record type.
#[derive(Debug)]
pub struct ModelType {
    name: String,
    fields: Vec<FieldDescriptor>,
    required_count: usize,
    properties: Map<String, JsonValue>,
    extra: Map<String, JsonValue>,
    required_list: Vec<String>,
    examples: Vec<JsonValue>,
    single_example: bool,
    description: Option<String>,
}

/// Object schema keys the compiler interprets; anything else is carried
/// through to [`ModelType::to_schema`] untouched.
const SCHEMA_KEYS: &[&str] = &["type", "required", "properties", "examples", "example", "description"];

/// Compiles `schema` into a standalone model named `name`.
///
/// `schema` is either a bare mapping of property name to field spec, or a
/// full object schema with `properties`, an optional `required` list and
/// optional `examples` / `example` payloads. Pointers inside the schema are
/// left unresolved; compile through a [`ModelRegistry`] to have them bound.
///
/// # Errors
///
/// [`SchemaError::UnsupportedType`] naming the first unmapped type, and
/// [`SchemaError::InvalidSchema`] for malformed schemas.
///
/// # Examples
///
/// ```
/// use apispec_core::{Arguments, compile_model};
/// use serde_json::json;
///
/// let set = compile_model("Set", &json!({
///     "reps": {"type": "integer", "required": true},
///     "weight": {"type": "integer", "minimum": 0}
/// })).unwrap();
///
/// let ok = set.construct(Arguments::new().kwarg("reps", 20).kwarg("weight", 20)).unwrap();
/// assert_eq!(ok.get("reps").and_then(|v| v.as_i64()), Some(20));
/// assert!(set.construct(Arguments::new().kwarg("weight", 20)).is_err());
/// ```
pub fn compile_model(name: &str, schema: &JsonValue) -> Result<Rc<ModelType>> {
    compile_model_with(name, schema, &mut ResolutionContext::new())
}

/// Like [`compile_model`], registering every pointer in `context`.
pub fn compile_model_with(
    name: &str,
    schema: &JsonValue,
    context: &mut ResolutionContext,
) -> Result<Rc<ModelType>> {
    let object = schema.as_object().ok_or_else(|| SchemaError::InvalidSchema {
        name: name.to_string(),
        reason: format!("schema must be a mapping, got {}", json_type_name(schema)),
    })?;

    let full_form = object.get("type").is_some_and(JsonValue::is_string)
        || object
            .get("properties")
            .and_then(JsonValue::as_object)
            .is_some_and(|map| map.values().all(JsonValue::is_object));

    let mut required_list = Vec::new();
    let mut examples = Vec::new();
    let mut single_example = false;
    let mut description = None;
    let mut extra = Map::new();
    let empty = Map::new();

    let properties = if full_form {
        if let Some(declared) = object.get("type").and_then(JsonValue::as_str) {
            if declared != "object" {
                return Err(SchemaError::UnsupportedType(declared.to_string()));
            }
        }
        required_list = match object.get("required") {
            None => Vec::new(),
            Some(JsonValue::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| SchemaError::InvalidSchema {
                        name: name.to_string(),
                        reason: "required list must contain only strings".to_string(),
                    })
                })
                .collect::<Result<Vec<String>>>()?,
            Some(other) => {
                return Err(SchemaError::InvalidSchema {
                    name: name.to_string(),
                    reason: format!("required must be a list, got {}", json_type_name(other)),
                });
            }
        };
        match (object.get("examples"), object.get("example")) {
            (Some(JsonValue::Array(items)), _) => examples = items.clone(),
            (_, Some(single)) => {
                examples = vec![single.clone()];
                single_example = true;
            }
            _ => {}
        }
        description = object
            .get("description")
            .and_then(JsonValue::as_str)
            .map(str::to_string);
        extra = object
            .iter()
            .filter(|(key, _)| !SCHEMA_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        match object.get("properties") {
            None => &empty,
            Some(JsonValue::Object(map)) => map,
            Some(other) => {
                return Err(SchemaError::InvalidSchema {
                    name: name.to_string(),
                    reason: format!("properties must be a mapping, got {}", json_type_name(other)),
                });
            }
        }
    } else {
        object
    };

    let mut specs = IndexMap::new();
    let mut raw_properties = Map::new();
    for (property, raw) in properties {
        if !raw.is_object() {
            warn!(model = name, property = %property, "Skipping property that is not a mapping");
            continue;
        }
        let spec: FieldSpec =
            serde_json::from_value(raw.clone()).map_err(|err| SchemaError::InvalidSchema {
                name: format!("{name}.{property}"),
                reason: err.to_string(),
            })?;
        specs.insert(property.clone(), spec);
        raw_properties.insert(property.clone(), raw.clone());
    }

    let mut required = Vec::new();
    let mut optional = Vec::new();
    for (property, spec) in &specs {
        let is_required = spec.required || required_list.iter().any(|r| r == property);
        let descriptor = FieldDescriptor::compile(property, spec, is_required, context)?;
        if is_required {
            required.push(descriptor);
        } else {
            optional.push(descriptor);
        }
    }

    for missing in required_list.iter().filter(|r| !specs.contains_key(*r)) {
        warn!(model = name, field = %missing, "Required field has no property definition");
    }

    let required_count = required.len();
    let mut fields = required;
    fields.extend(optional);

    debug!(model = name, fields = fields.len(), required = required_count, "Compiled model");

    Ok(Rc::new(ModelType {
        name: name.to_string(),
        fields,
        required_count,
        properties: raw_properties,
        extra,
        required_list,
        examples,
        single_example,
        description,
    }))
}

/// Constructor arguments: leading positional values, then named ones.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    positional: Vec<Value>,
    named: Vec<(String, Value)>,
}

impl Arguments {
    /// Creates an empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional value.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Appends a named value.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.push((name.into(), value.into()));
        self
    }
}

impl ModelType {
    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-form description from the schema.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// All descriptors, required first.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Required descriptors in declaration order.
    pub fn required_fields(&self) -> &[FieldDescriptor] {
        &self.fields[..self.required_count]
    }

    /// Optional descriptors in declaration order.
    pub fn optional_fields(&self) -> &[FieldDescriptor] {
        &self.fields[self.required_count..]
    }

    /// Descriptor for `name`.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|d| d.name() == name)
    }

    /// Field names in constructor order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(FieldDescriptor::name)
    }

    /// Example payloads declared by the schema.
    pub fn examples(&self) -> &[JsonValue] {
        &self.examples
    }

    /// Builds an instance, validating every supplied value.
    ///
    /// Positional values bind to fields in constructor order. Omitted
    /// optional fields take their descriptor default (or stay unset).
    ///
    /// # Errors
    ///
    /// [`SchemaError::TooManyArguments`], [`SchemaError::UnknownField`],
    /// [`SchemaError::DuplicateArgument`],
    /// [`SchemaError::MissingRequiredField`], or the first assignment error.
    pub fn construct(self: &Rc<Self>, args: Arguments) -> Result<ModelInstance> {
        if args.positional.len() > self.fields.len() {
            return Err(SchemaError::TooManyArguments {
                model: self.name.clone(),
                expected: self.fields.len(),
                given: args.positional.len(),
            });
        }

        let mut supplied: IndexMap<String, Value> = self
            .fields
            .iter()
            .zip(args.positional)
            .map(|(descriptor, value)| (descriptor.name().to_string(), value))
            .collect();
        for (name, value) in args.named {
            if self.field(&name).is_none() {
                return Err(self.unknown(&name));
            }
            if supplied.contains_key(&name) {
                return Err(SchemaError::DuplicateArgument {
                    model: self.name.clone(),
                    field: name,
                });
            }
            supplied.insert(name, value);
        }

        let mut values = IndexMap::with_capacity(self.fields.len());
        for descriptor in &self.fields {
            match supplied.shift_remove(descriptor.name()) {
                Some(value) => {
                    values.insert(descriptor.name().to_string(), descriptor.check(value)?);
                }
                None if descriptor.is_required() => {
                    return Err(SchemaError::MissingRequiredField {
                        model: self.name.clone(),
                        field: descriptor.name().to_string(),
                    });
                }
                None => {
                    if let Some(default) = descriptor.default_value() {
                        values.insert(descriptor.name().to_string(), default.clone());
                    }
                }
            }
        }

        Ok(ModelInstance {
            model: Rc::clone(self),
            values,
        })
    }

    /// Builds an instance from raw document data.
    ///
    /// `null` entries count as omitted. Nested model fields are
    /// instantiated through `models`.
    ///
    /// # Errors
    ///
    /// [`SchemaError::TypeMismatch`] if `json` is not a mapping, plus any
    /// conversion or [`construct`](Self::construct) error.
    pub fn instantiate(self: &Rc<Self>, json: &JsonValue, models: &dyn ModelLookup) -> Result<ModelInstance> {
        let object = json.as_object().ok_or_else(|| SchemaError::TypeMismatch {
            field: self.name.clone(),
            expected: "object".to_string(),
            found: json_type_name(json),
        })?;
        let mut args = Arguments::new();
        for (key, raw) in object {
            if raw.is_null() {
                continue;
            }
            let descriptor = self.field(key).ok_or_else(|| self.unknown(key))?;
            args = args.kwarg(key.as_str(), descriptor.value_from_json(raw, models)?);
        }
        self.construct(args)
    }

    /// Builds one instance per declared example.
    ///
    /// Returns `None` when the schema declares no examples.
    pub fn generate_examples(self: &Rc<Self>, models: &dyn ModelLookup) -> Option<Result<Vec<ModelInstance>>> {
        if self.examples.is_empty() {
            return None;
        }
        Some(
            self.examples
                .iter()
                .map(|example| self.instantiate(example, models))
                .collect(),
        )
    }

    /// Renders the model back into an object schema.
    ///
    /// Properties are written as they were read, including keys the
    /// compiler does not interpret.
    pub fn to_schema(&self) -> JsonValue {
        let mut schema = Map::new();
        schema.insert("type".to_string(), JsonValue::from("object"));
        if let Some(description) = &self.description {
            schema.insert("description".to_string(), JsonValue::from(description.as_str()));
        }
        if !self.required_list.is_empty() {
            schema.insert("required".to_string(), JsonValue::from(self.required_list.clone()));
        }
        schema.insert("properties".to_string(), JsonValue::Object(self.properties.clone()));
        match (self.single_example, self.examples.first()) {
            (true, Some(example)) => {
                schema.insert("example".to_string(), example.clone());
            }
            (false, Some(_)) => {
                schema.insert("examples".to_string(), JsonValue::from(self.examples.clone()));
            }
            _ => {}
        }
        for (key, value) in &self.extra {
            schema.insert(key.clone(), value.clone());
        }
        JsonValue::Object(schema)
    }

    fn unknown(&self, field: &str) -> SchemaError {
        SchemaError::UnknownField {
            model: self.name.clone(),
            field: field.to_string(),
        }
    }
}

/// An instance of a compiled model.
///
/// Each instance owns its values; unset fields are absent.
#[derive(Clone)]
pub struct ModelInstance {
    model: Rc<ModelType>,
    values: IndexMap<String, Value>,
}

impl ModelInstance {
    /// The model this instance was built from.
    pub fn model(&self) -> &Rc<ModelType> {
        &self.model
    }

    /// Name of the model.
    pub fn model_name(&self) -> &str {
        &self.model.name
    }

    /// Value of `field`, if set.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Returns `true` if `field` holds a value.
    pub fn is_set(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// Assigns `value` to `field` through its descriptor.
    ///
    /// # Errors
    ///
    /// [`SchemaError::UnknownField`] or the descriptor's assignment error;
    /// the previous value is kept on failure.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        let descriptor = self.model.field(field).ok_or_else(|| self.model.unknown(field))?;
        let checked = descriptor.check(value.into())?;
        self.values.insert(field.to_string(), checked);
        Ok(())
    }

    /// Clears `field`, returning its previous value.
    ///
    /// # Errors
    ///
    /// [`SchemaError::UnknownField`] for undeclared fields.
    pub fn unset(&mut self, field: &str) -> Result<Option<Value>> {
        if self.model.field(field).is_none() {
            return Err(self.model.unknown(field));
        }
        Ok(self.values.shift_remove(field))
    }

    /// Mutable access to an array field's sequence, creating it if unset.
    ///
    /// # Errors
    ///
    /// [`SchemaError::UnknownField`], or [`SchemaError::TypeMismatch`] if
    /// the field is not an array.
    pub fn sequence_mut(&mut self, field: &str) -> Result<&mut TypedSequence> {
        let descriptor = self.model.field(field).ok_or_else(|| self.model.unknown(field))?;
        let empty = descriptor.empty_sequence().ok_or_else(|| SchemaError::TypeMismatch {
            field: field.to_string(),
            expected: descriptor.field_type().to_string(),
            found: "array".to_string(),
        })?;
        match self.values.entry(field.to_string()).or_insert(Value::Array(empty)) {
            Value::Array(seq) => Ok(seq),
            other => Err(SchemaError::TypeMismatch {
                field: field.to_string(),
                expected: "array".to_string(),
                found: other.type_name(),
            }),
        }
    }

    /// Set fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.model
            .fields
            .iter()
            .filter_map(|d| self.values.get(d.name()).map(|v| (d.name(), v)))
    }

    /// Serializes the set fields as a JSON object.
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.iter()
                .map(|(name, value)| (name.to_string(), value.to_json()))
                .collect(),
        )
    }
}

impl PartialEq for ModelInstance {
    fn eq(&self, other: &Self) -> bool {
        self.model.name == other.model.name && self.values == other.values
    }
}

impl fmt::Debug for ModelInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.model_name());
        for (name, value) in self.iter() {
            s.field(name, value);
        }
        s.finish()
    }
}

impl fmt::Display for ModelInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.model_name())?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={}", value.to_json())?;
        }
        f.write_str(")")
    }
}

/// Compiles every schema in `definitions` into `registry`, then resolves
/// the pointers they declared.
///
/// Convenience for callers that only need models, not a whole document.
///
/// # Errors
///
/// The first compile error; resolution failures are logged and left
/// unresolved.
pub fn compile_definitions(definitions: &JsonValue) -> Result<ModelRegistry> {
    let mut registry = ModelRegistry::new();
    let mut context = ResolutionContext::new();
    if let Some(map) = definitions.as_object() {
        for (name, schema) in map {
            registry.compile(name, schema, &mut context)?;
        }
    }
    context.resolve_all(&registry);
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn set_model() -> Rc<ModelType> {
        compile_model(
            "Set",
            &json!({
                "reps": {"type": "integer", "required": true},
                "weight": {"type": "integer", "minimum": 0}
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_required_fields_come_first() {
        let model = compile_model(
            "Workout",
            &json!({
                "type": "object",
                "required": ["date"],
                "properties": {
                    "notes": {"type": "string"},
                    "date": {"type": "string", "format": "date"},
                    "rating": {"type": "integer", "required": true}
                }
            }),
        )
        .unwrap();
        let names: Vec<&str> = model.field_names().collect();
        assert_eq!(names, ["date", "rating", "notes"]);
        assert_eq!(model.required_fields().len(), 2);
        assert_eq!(model.optional_fields()[0].name(), "notes");
    }

    #[test]
    fn test_set_scenario() {
        let set = set_model();
        assert!(set.construct(Arguments::new().kwarg("reps", 20).kwarg("weight", 20)).is_ok());
        assert_eq!(
            set.construct(Arguments::new().kwarg("weight", 20)).unwrap_err(),
            SchemaError::MissingRequiredField {
                model: "Set".into(),
                field: "reps".into()
            }
        );
        for weight in [-1, 0] {
            assert!(matches!(
                set.construct(Arguments::new().kwarg("reps", 20).kwarg("weight", weight)),
                Err(SchemaError::ConstraintViolation { .. })
            ));
        }
    }

    #[test]
    fn test_positional_arguments_bind_in_order() {
        let set = set_model();
        let instance = set.construct(Arguments::new().arg(5).arg(60)).unwrap();
        assert_eq!(instance.get("reps"), Some(&Value::from(5)));
        assert_eq!(instance.get("weight"), Some(&Value::from(60)));

        assert!(matches!(
            set.construct(Arguments::new().arg(1).arg(2).arg(3)),
            Err(SchemaError::TooManyArguments { expected: 2, given: 3, .. })
        ));
        assert!(matches!(
            set.construct(Arguments::new().arg(5).kwarg("reps", 6)),
            Err(SchemaError::DuplicateArgument { .. })
        ));
        assert!(matches!(
            set.construct(Arguments::new().arg(5).kwarg("tempo", 6)),
            Err(SchemaError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_optional_fields_take_defaults() {
        let set = set_model();
        let instance = set.construct(Arguments::new().arg(8)).unwrap();
        assert_eq!(instance.get("weight"), Some(&Value::from(0)));
    }

    #[test]
    fn test_unsupported_type_fails_whole_model() {
        let err = compile_model(
            "Broken",
            &json!({"ok": {"type": "string"}, "bad": {"type": "decimal"}}),
        )
        .unwrap_err();
        assert_eq!(err, SchemaError::UnsupportedType("decimal".into()));
    }

    #[test]
    fn test_non_mapping_property_is_skipped() {
        let model = compile_model("Loose", &json!({"a": {"type": "string"}, "b": 3})).unwrap();
        assert_eq!(model.field_names().collect::<Vec<_>>(), ["a"]);
    }

    #[test]
    fn test_instances_do_not_share_storage() {
        let set = set_model();
        let mut first = set.construct(Arguments::new().arg(1)).unwrap();
        let second = set.construct(Arguments::new().arg(1)).unwrap();
        first.set("weight", 40).unwrap();
        assert_eq!(second.get("weight"), Some(&Value::from(0)));
    }

    #[test]
    fn test_failed_set_keeps_previous_value() {
        let set = set_model();
        let mut instance = set.construct(Arguments::new().arg(1).arg(10)).unwrap();
        assert!(instance.set("weight", -5).is_err());
        assert!(instance.set("weight", "heavy").is_err());
        assert_eq!(instance.get("weight"), Some(&Value::from(10)));
        assert!(instance.set("tempo", 1).is_err());
    }

    #[test]
    fn test_sequence_mut_checks_elements() {
        let model = compile_model(
            "Tagged",
            &json!({"tags": {"type": "array", "items": {"type": "string"}}}),
        )
        .unwrap();
        let mut instance = model.construct(Arguments::new()).unwrap();
        let tags = instance.sequence_mut("tags").unwrap();
        tags.append(Value::from("legs")).unwrap();
        assert!(tags.append(Value::from(1)).is_err());
        assert_eq!(instance.get("tags").and_then(Value::as_sequence).map(|s| s.len()), Some(1));
    }

    #[test]
    fn test_instantiate_and_examples() {
        let model = compile_model(
            "Set",
            &json!({
                "type": "object",
                "properties": {
                    "reps": {"type": "integer", "required": true},
                    "weight": {"type": "double"}
                },
                "examples": [{"reps": 5, "weight": 100}, {"reps": 3, "weight": null}]
            }),
        )
        .unwrap();
        let registry = ModelRegistry::new();
        let examples = model.generate_examples(&registry).unwrap().unwrap();
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].get("weight"), Some(&Value::from(100.0)));
        assert_eq!(examples[1].get("weight"), Some(&Value::from(0.0)));

        assert!(set_model().generate_examples(&registry).is_none());
        assert!(model.instantiate(&json!({"reps": 1, "tempo": 2}), &registry).is_err());
    }

    #[test]
    fn test_display_lists_set_fields() {
        let set = set_model();
        let instance = set.construct(Arguments::new().arg(5).arg(60)).unwrap();
        assert_eq!(instance.to_string(), "Set(reps=5, weight=60)");
    }

    #[test]
    fn test_to_schema_renders_object_form() {
        let schema = set_model().to_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["reps"], json!({"type": "integer", "required": true}));
        assert_eq!(schema["properties"]["weight"], json!({"type": "integer", "minimum": 0}));
    }

    #[test]
    fn test_to_schema_keeps_uninterpreted_keys() {
        let model = compile_model(
            "Dog",
            &json!({
                "type": "object",
                "title": "A dog",
                "x-owner": "kennel",
                "properties": {
                    "name": {"type": "string", "maxLength": 10, "example": "rex", "readOnly": true, "x-tag": "a"},
                    "age": {"type": "integer", "minimum": 0}
                }
            }),
        )
        .unwrap();
        let schema = model.to_schema();
        assert_eq!(
            schema["properties"],
            json!({
                "name": {"type": "string", "maxLength": 10, "example": "rex", "readOnly": true, "x-tag": "a"},
                "age": {"type": "integer", "minimum": 0}
            })
        );
        assert_eq!(schema["title"], "A dog");
        assert_eq!(schema["x-owner"], "kennel");

        let reloaded = compile_model("Dog", &schema).unwrap();
        assert_eq!(reloaded.to_schema(), schema);
    }

    #[test]
    fn test_bare_field_named_properties() {
        let model = compile_model(
            "Listing",
            &json!({
                "properties": {"type": "string"},
                "count": {"type": "integer"}
            }),
        )
        .unwrap();
        assert_eq!(model.field_names().collect::<Vec<_>>(), ["properties", "count"]);

        let full = compile_model("Listing", &json!({"properties": {"count": {"type": "integer"}}})).unwrap();
        assert_eq!(full.field_names().collect::<Vec<_>>(), ["count"]);
    }
}
