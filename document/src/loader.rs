//! Document assembly: parse, build, merge includes, then resolve.
//!
//! ```no_run
//! use apispec_document::{Document, LoadConfig};
//!
//! let document = Document::from_path("main.yaml", LoadConfig::default()).unwrap();
//! for failure in document.failures() {
//!     eprintln!("unresolved: {}", failure.pointer);
//! }
//! if let Some(set) = document.definition("Set") {
//!     println!("Set has {} fields", set.fields().len());
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use apispec_core::{
    ModelLookup, ModelRegistry, ModelType, Reference, ResolutionContext, ResolutionFailure,
    ResolutionReport, Resolver, Target, TargetKind,
};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::config::LoadConfig;
use crate::error::{DocumentError, Result};
use crate::objects::SWAGGER;
use crate::spec_object::{BuildContext, SpecObject};

const INCLUDE_DIRECTIVE: &str = "#include:";

/// A node a resolved reference points at.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    /// A compiled model.
    Definition(&'a Rc<ModelType>),
    /// A root-level parameter.
    Parameter(&'a SpecObject),
    /// A root-level response.
    Response(&'a SpecObject),
}

/// A fully built and resolved API document.
#[derive(Debug)]
pub struct Document {
    root: SpecObject,
    models: ModelRegistry,
    config: LoadConfig,
    source: Option<PathBuf>,
    includes: Vec<PathBuf>,
    resolution: ResolutionReport,
}

impl Document {
    /// Builds a document from parsed data.
    ///
    /// Every pointer met while building is resolved once the tree is
    /// complete; pointers that fail are logged and kept in
    /// [`failures`](Self::failures). Includes are not followed, since there
    /// is no file to resolve them against.
    ///
    /// # Errors
    ///
    /// [`DocumentError::NotAMapping`], definition compile errors, and the
    /// build errors of [`SpecObject::build`].
    pub fn from_value(raw: &JsonValue, config: LoadConfig) -> Result<Self> {
        let mut references = ResolutionContext::new();
        let mut document = Self::build(raw, config, &mut references)?;
        document.resolution = references.resolve_all(&document);
        Ok(document)
    }

    /// Parses YAML or JSON text and builds a document from it.
    ///
    /// # Errors
    ///
    /// [`DocumentError::YamlError`] for unparsable text, then as
    /// [`from_value`](Self::from_value).
    pub fn parse(text: &str, config: LoadConfig) -> Result<Self> {
        Self::from_value(&parse_text(text)?, config)
    }

    /// Loads the document at `path`, then merges its includes if enabled.
    ///
    /// Resolution waits until every include is merged, so the root may
    /// point at definitions that only an include declares.
    ///
    /// # Errors
    ///
    /// [`DocumentError::IoError`] if a file cannot be read, plus any parse,
    /// build or include error.
    pub fn from_path(path: impl AsRef<Path>, config: LoadConfig) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut references = ResolutionContext::new();
        let mut document = Self::build(&parse_text(&text)?, config, &mut references)?;
        document.source = Some(path.to_path_buf());
        info!(path = %path.display(), definitions = document.models.len(), "Loaded document");

        if document.config.includes.enabled {
            document.load_includes_from(path, &text, &mut references)?;
        }
        document.resolution = references.resolve_all(&document);
        Ok(document)
    }

    fn build(raw: &JsonValue, config: LoadConfig, references: &mut ResolutionContext) -> Result<Self> {
        if !raw.is_object() {
            return Err(DocumentError::NotAMapping);
        }
        let mut models = ModelRegistry::new();
        let root = {
            let mut cx = BuildContext {
                references,
                models: &mut models,
                policy: config.required_fields,
            };
            SpecObject::build(&SWAGGER, raw, &mut cx)?
        };
        Ok(Self {
            root,
            models,
            config,
            source: None,
            includes: Vec::new(),
            resolution: ResolutionReport::default(),
        })
    }

    /// Merges the includes declared by the source file.
    ///
    /// [`from_path`](Self::from_path) already does this when includes are
    /// enabled. Does nothing for documents not loaded from a file.
    ///
    /// # Errors
    ///
    /// As [`from_path`](Self::from_path).
    pub fn load_includes(&mut self) -> Result<()> {
        let Some(source) = self.source.clone() else {
            debug!("Document has no source file; skipping includes");
            return Ok(());
        };
        let text = std::fs::read_to_string(&source)?;
        let mut references = ResolutionContext::new();
        self.load_includes_from(&source, &text, &mut references)?;
        let report = references.resolve_all(&*self);
        self.resolution.absorb(report);
        Ok(())
    }

    fn load_includes_from(
        &mut self,
        source: &Path,
        text: &str,
        references: &mut ResolutionContext,
    ) -> Result<()> {
        let mut visited = HashSet::new();
        let mut stack = vec![canonical(source)];
        visited.insert(canonical(source));
        self.include_all(source, text, 1, &mut stack, &mut visited, references)
    }

    /// Merges the includes of `file`, depth first.
    fn include_all(
        &mut self,
        file: &Path,
        text: &str,
        depth: usize,
        stack: &mut Vec<PathBuf>,
        visited: &mut HashSet<PathBuf>,
        references: &mut ResolutionContext,
    ) -> Result<()> {
        for include in extract_includes(text) {
            let path = include_path(file, &include);
            let key = canonical(&path);
            if stack.contains(&key) {
                warn!(path = %path.display(), from = %file.display(), "Skipping include cycle");
                continue;
            }
            if !visited.insert(key.clone()) {
                debug!(path = %path.display(), "Already included");
                continue;
            }
            if depth > self.config.includes.max_depth {
                return Err(DocumentError::IncludeDepthExceeded {
                    path,
                    limit: self.config.includes.max_depth,
                });
            }

            let included = std::fs::read_to_string(&path)?;
            self.merge_fragment(&parse_text(&included)?, references)?;
            info!(path = %path.display(), depth, "Merged include");
            self.includes.push(path.clone());

            stack.push(key);
            self.include_all(&path, &included, depth + 1, stack, visited, references)?;
            stack.pop();
        }
        Ok(())
    }

    /// Merges another document's data into this one.
    ///
    /// The data is built as a fragment (its own top-level required keys
    /// are not demanded), merged into the root, and the pointers it
    /// introduced are resolved against the merged tree. Pointers that
    /// already failed are not retried.
    ///
    /// # Errors
    ///
    /// Build and definition compile errors.
    pub fn merge_value(&mut self, raw: &JsonValue) -> Result<()> {
        let mut references = ResolutionContext::new();
        self.merge_fragment(raw, &mut references)?;
        let report = references.resolve_all(&*self);
        self.resolution.absorb(report);
        Ok(())
    }

    /// Builds `raw` as a fragment and merges it, leaving its pointers queued.
    fn merge_fragment(&mut self, raw: &JsonValue, references: &mut ResolutionContext) -> Result<()> {
        if raw.is_null() {
            return Ok(());
        }
        let other = {
            let mut cx = BuildContext {
                references,
                models: &mut self.models,
                policy: self.config.required_fields,
            };
            SpecObject::build_fragment(&SWAGGER, raw, &mut cx)?
        };
        self.root.merge(other);
        Ok(())
    }

    /// The root section object.
    pub fn root(&self) -> &SpecObject {
        &self.root
    }

    /// Compiled models.
    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    /// Configuration the document was loaded with.
    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// File the document was loaded from.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Included files, in merge order.
    pub fn includes(&self) -> &[PathBuf] {
        &self.includes
    }

    /// References that failed to resolve.
    pub fn failures(&self) -> &[ResolutionFailure] {
        &self.resolution.failures
    }

    /// Outcome of every resolution pass run on this document.
    pub fn resolution(&self) -> &ResolutionReport {
        &self.resolution
    }

    /// Model named `name`.
    pub fn definition(&self, name: &str) -> Option<&Rc<ModelType>> {
        self.models.get(name)
    }

    /// Root-level parameter named `name`.
    pub fn parameter(&self, name: &str) -> Option<&SpecObject> {
        self.section(TargetKind::Parameter)?.get(name)
    }

    /// Root-level response named `name`.
    pub fn response(&self, name: &str) -> Option<&SpecObject> {
        self.section(TargetKind::Response)?.get(name)
    }

    /// Path items by URL template.
    pub fn paths(&self) -> Option<&IndexMap<String, SpecObject>> {
        self.root.keyed("paths")
    }

    /// Follows a resolved reference to the node it points at.
    pub fn deref(&self, reference: &Reference) -> Option<Node<'_>> {
        let target = reference.target()?;
        match target.kind {
            TargetKind::Definition => self.models.deref(reference).map(Node::Definition),
            TargetKind::Parameter => self
                .section(TargetKind::Parameter)?
                .get_index(target.index)
                .map(|(_, object)| Node::Parameter(object)),
            TargetKind::Response => self
                .section(TargetKind::Response)?
                .get_index(target.index)
                .map(|(_, object)| Node::Response(object)),
        }
    }

    fn section(&self, kind: TargetKind) -> Option<&IndexMap<String, SpecObject>> {
        self.root.keyed(kind.section())
    }
}

impl Resolver for Document {
    fn resolve_local(&self, section: &str, name: &str) -> Option<Target> {
        let kind = [TargetKind::Definition, TargetKind::Parameter, TargetKind::Response]
            .into_iter()
            .find(|kind| kind.section() == section)?;
        match kind {
            TargetKind::Definition => self.models.resolve_local(section, name),
            other => self
                .section(other)?
                .get_index_of(name)
                .map(|index| Target::new(other, index, name)),
        }
    }
}

impl ModelLookup for Document {
    fn model(&self, reference: &Reference) -> Option<Rc<ModelType>> {
        self.models.model(reference)
    }
}

/// Lists the `#include:` directives in `text`, in order.
///
/// # Examples
///
/// ```
/// use apispec_document::extract_includes;
///
/// let text = "#include:definitions.yaml\n# a comment\n#include: paths/pets.yaml\nswagger: '2.0'\n";
/// assert_eq!(extract_includes(text), ["definitions.yaml", "paths/pets.yaml"]);
/// ```
pub fn extract_includes(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.strip_prefix(INCLUDE_DIRECTIVE))
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(str::to_string)
        .collect()
}

fn include_path(including: &Path, include: &str) -> PathBuf {
    let include = Path::new(include);
    if include.is_absolute() {
        return include.to_path_buf();
    }
    match including.parent() {
        Some(dir) => dir.join(include),
        None => include.to_path_buf(),
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Parses YAML (or JSON) text into a JSON value.
///
/// Mapping keys that YAML reads as numbers or booleans (response codes
/// such as `200`) become strings.
///
/// # Errors
///
/// [`DocumentError::YamlError`] for unparsable text.
pub fn parse_text(text: &str) -> Result<JsonValue> {
    let blank = text.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    });
    if blank {
        return Ok(JsonValue::Null);
    }
    let yaml: serde_yaml::Value = serde_yaml::from_str(text)?;
    Ok(yaml_to_json(yaml))
}

fn yaml_to_json(value: serde_yaml::Value) -> JsonValue {
    use serde_yaml::Value as Yaml;

    match value {
        Yaml::Null => JsonValue::Null,
        Yaml::Bool(b) => JsonValue::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                JsonValue::from(i)
            } else if let Some(u) = n.as_u64() {
                JsonValue::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(JsonValue::Null, JsonValue::Number)
            }
        }
        Yaml::String(s) => JsonValue::String(s),
        Yaml::Sequence(items) => JsonValue::Array(items.into_iter().map(yaml_to_json).collect()),
        Yaml::Mapping(map) => JsonValue::Object(
            map.into_iter()
                .map(|(key, value)| (yaml_key(key), yaml_to_json(value)))
                .collect(),
        ),
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => s,
        Yaml::Number(n) => n.to_string(),
        Yaml::Bool(b) => b.to_string(),
        Yaml::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::RequiredPolicy;

    const PETSTORE: &str = r##"
swagger: "2.0"
info:
  title: Petstore
  version: "1.0"
paths:
  /pets/{id}:
    get:
      parameters:
        - $ref: "#/parameters/petId"
      responses:
        200:
          description: A pet
          schema:
            $ref: "#/definitions/Pet"
        404:
          $ref: "#/responses/NotFound"
parameters:
  petId:
    name: id
    in: path
    required: true
    type: integer
responses:
  NotFound:
    description: No such pet
definitions:
  Pet:
    type: object
    required: [name]
    properties:
      name: {type: string}
      tag: {type: string}
"##;

    #[test]
    fn test_response_codes_become_string_keys() {
        let value = parse_text("200: ok\ntrue: yes\n").unwrap();
        assert_eq!(value, json!({"200": "ok", "true": "yes"}));
    }

    #[test]
    fn test_every_local_pointer_resolves() {
        let document = Document::parse(PETSTORE, LoadConfig::default()).unwrap();
        assert!(document.failures().is_empty());

        let get = document.paths().unwrap()["/pets/{id}"].object("get").unwrap();
        let parameter = &get.objects("parameters").unwrap()[0];
        let reference = parameter.reference().unwrap();
        assert!(matches!(
            document.deref(reference),
            Some(Node::Parameter(p)) if p.str("name") == Some("id")
        ));

        let responses = get.keyed("responses").unwrap();
        let schema = responses["200"].object("schema").unwrap();
        assert!(matches!(
            document.deref(schema.reference().unwrap()),
            Some(Node::Definition(model)) if model.name() == "Pet"
        ));
        assert!(matches!(
            document.deref(responses["404"].reference().unwrap()),
            Some(Node::Response(r)) if r.str("description") == Some("No such pet")
        ));
    }

    #[test]
    fn test_missing_target_leaves_reference_unresolved() {
        let raw = json!({
            "info": {"title": "t", "version": "1"},
            "paths": {},
            "definitions": {
                "Workout": {"best": {"$ref": "#/definitions/DoesNotExist"}}
            }
        });
        let document = Document::from_value(&raw, LoadConfig::default()).unwrap();
        assert_eq!(document.failures().len(), 1);
        assert_eq!(document.failures()[0].pointer, "#/definitions/DoesNotExist");

        let workout = document.definition("Workout").unwrap();
        let apispec_core::FieldType::Model(reference) = workout.fields()[0].field_type() else {
            panic!("expected a model field");
        };
        assert!(!reference.is_resolved());
        assert!(document.deref(reference).is_none());
        assert_eq!(reference.to_string(), "<Reference: #/definitions/DoesNotExist>");
    }

    #[test]
    fn test_remote_pointer_is_reported_not_fatal() {
        let raw = json!({
            "info": {"title": "t", "version": "1"},
            "paths": {},
            "responses": {"Remote": {"$ref": "https://example.com/api.yaml#/Error"}}
        });
        let document = Document::from_value(&raw, LoadConfig::default()).unwrap();
        assert!(matches!(
            &document.failures()[0].error,
            apispec_core::SchemaError::UnimplementedReferenceKind { kind, .. } if kind == "remote"
        ));
    }

    #[test]
    fn test_strict_policy_rejects_missing_info_title() {
        let raw = json!({"info": {"version": "1"}, "paths": {}});
        assert!(Document::from_value(&raw, LoadConfig::default()).is_ok());
        let config = LoadConfig {
            required_fields: RequiredPolicy::Error,
            ..LoadConfig::default()
        };
        assert!(matches!(
            Document::from_value(&raw, config),
            Err(DocumentError::MissingRequiredField { .. })
        ));
    }

    #[test]
    fn test_non_mapping_root_is_rejected() {
        assert!(matches!(
            Document::parse("- a\n- b\n", LoadConfig::default()),
            Err(DocumentError::NotAMapping)
        ));
    }

    #[test]
    fn test_merge_value_resolves_new_pointers() {
        let mut document = Document::parse(PETSTORE, LoadConfig::default()).unwrap();
        document
            .merge_value(&json!({
                "definitions": {
                    "Owner": {"pets": {"type": "array", "items": {"$ref": "#/definitions/Pet"}}}
                }
            }))
            .unwrap();
        assert!(document.failures().is_empty());
        assert_eq!(document.models().names().collect::<Vec<_>>(), ["Pet", "Owner"]);
    }

    #[test]
    fn test_include_paths_are_relative_to_including_file() {
        assert_eq!(
            include_path(Path::new("specs/main.yaml"), "defs/pets.yaml"),
            PathBuf::from("specs/defs/pets.yaml")
        );
        assert_eq!(
            include_path(Path::new("specs/main.yaml"), "/abs/pets.yaml"),
            PathBuf::from("/abs/pets.yaml")
        );
    }
}
