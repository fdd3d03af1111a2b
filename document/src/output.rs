//! Writing a compiled document back out as YAML or JSON.

use std::path::Path;

use serde_json::{Map, Value as JsonValue};

use crate::error::Result;
use crate::loader::Document;
use crate::spec_object::{AttrValue, SpecObject};

/// Output text format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    /// YAML (the default).
    #[default]
    Yaml,
    /// Pretty-printed JSON.
    Json,
}

impl DocumentFormat {
    /// Picks the format from a file extension; anything but `.json` is YAML.
    ///
    /// # Examples
    ///
    /// ```
    /// use apispec_document::DocumentFormat;
    ///
    /// assert_eq!(DocumentFormat::from_path("out/api.json"), DocumentFormat::Json);
    /// assert_eq!(DocumentFormat::from_path("api.yml"), DocumentFormat::Yaml);
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

impl Document {
    /// Renders the document tree as a JSON value.
    ///
    /// Attributes appear in declared order under their document keys
    /// (`ref` goes back to `$ref`); definitions are rendered from the
    /// compiled models. Section keys and other bookkeeping are left out.
    pub fn to_value(&self) -> JsonValue {
        self.object_to_value(self.root())
    }

    /// Renders the document as text.
    ///
    /// # Errors
    ///
    /// [`JsonError`](crate::DocumentError::JsonError) or
    /// [`YamlError`](crate::DocumentError::YamlError) if serialization fails.
    pub fn render(&self, format: DocumentFormat) -> Result<String> {
        let value = self.to_value();
        let text = match format {
            DocumentFormat::Yaml => serde_yaml::to_string(&value)?,
            DocumentFormat::Json => {
                let mut text = serde_json::to_string_pretty(&value)?;
                text.push('\n');
                text
            }
        };
        Ok(text)
    }

    /// Writes the document to `path`, in the format its extension names.
    ///
    /// # Errors
    ///
    /// Serialization errors, or [`IoError`](crate::DocumentError::IoError)
    /// if the file cannot be written.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self.render(DocumentFormat::from_path(path))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    fn object_to_value(&self, object: &SpecObject) -> JsonValue {
        let mut map = Map::new();
        for attr in object.kind().attrs {
            if let Some(value) = object.get(attr.storage_name()) {
                map.insert(attr.key.to_string(), self.attr_to_value(value));
            }
        }
        JsonValue::Object(map)
    }

    fn attr_to_value(&self, value: &AttrValue) -> JsonValue {
        match value {
            AttrValue::Scalar(v) | AttrValue::Raw(v) => v.clone(),
            AttrValue::List(items) => JsonValue::Array(items.clone()),
            AttrValue::Object(object) => self.object_to_value(object),
            AttrValue::Objects(items) => {
                JsonValue::Array(items.iter().map(|o| self.object_to_value(o)).collect())
            }
            AttrValue::Keyed(map) => JsonValue::Object(
                map.iter()
                    .map(|(key, object)| (key.clone(), self.object_to_value(object)))
                    .collect(),
            ),
            AttrValue::Definitions(names) => JsonValue::Object(
                names
                    .iter()
                    .filter_map(|name| {
                        self.models()
                            .get(name)
                            .map(|model| (name.clone(), model.to_schema()))
                    })
                    .collect(),
            ),
            AttrValue::Reference(reference) => JsonValue::String(reference.pointer().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::LoadConfig;

    fn document() -> Document {
        Document::from_value(
            &json!({
                "x-internal": true,
                "swagger": "2.0",
                "info": {"title": "Gym", "version": "1.0"},
                "paths": {
                    "/sets": {"get": {"responses": {"200": {
                        "description": "all sets",
                        "schema": {"type": "array", "items": {"$ref": "#/definitions/Set"}}
                    }}}}
                },
                "definitions": {
                    "Set": {"reps": {"type": "integer", "required": true}}
                },
                "tags": ["legs"]
            }),
            LoadConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_to_value_restores_document_keys() {
        let value = document().to_value();
        assert!(value.get("x-internal").is_none());
        assert_eq!(
            value["paths"]["/sets"]["get"]["responses"]["200"]["schema"]["items"]["$ref"],
            "#/definitions/Set"
        );
        assert_eq!(value["definitions"]["Set"]["type"], "object");
        assert_eq!(value["tags"], json!([{"name": "legs"}]));
    }

    #[test]
    fn test_to_value_keeps_declared_order() {
        let value = document().to_value();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["swagger", "info", "paths", "definitions", "tags"]);
    }

    #[test]
    fn test_render_json_reparses() {
        let text = document().render(DocumentFormat::Json).unwrap();
        let reparsed: JsonValue = serde_json::from_str(&text).unwrap();
        assert_eq!(reparsed, document().to_value());
    }
}
