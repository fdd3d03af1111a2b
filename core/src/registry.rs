//! Arena of compiled models, the target of `#/definitions/...` pointers.

use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::Result;
use crate::model::{ModelType, compile_model_with};
use crate::reference::{Reference, ResolutionContext, Resolver, Target, TargetKind};

/// Finds the model a resolved reference points at.
pub trait ModelLookup {
    /// Returns the model behind `reference`, or `None` if it is unresolved
    /// or does not point at a definition.
    fn model(&self, reference: &Reference) -> Option<Rc<ModelType>>;
}

/// Compiled models keyed by name, in compile order.
///
/// Indices are stable: replacing a model keeps the slot of the one it
/// replaces, so targets bound earlier stay valid.
#[derive(Debug, Default, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, Rc<ModelType>>,
}

impl ModelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles `schema` as `name` and stores it.
    ///
    /// # Errors
    ///
    /// Any compile error; the registry is unchanged in that case.
    pub fn compile(
        &mut self,
        name: &str,
        schema: &JsonValue,
        context: &mut ResolutionContext,
    ) -> Result<Rc<ModelType>> {
        let model = compile_model_with(name, schema, context)?;
        self.insert(Rc::clone(&model));
        Ok(model)
    }

    /// Stores `model`, replacing any model of the same name. Returns its index.
    pub fn insert(&mut self, model: Rc<ModelType>) -> usize {
        let (index, previous) = self.models.insert_full(model.name().to_string(), model);
        if previous.is_some() {
            debug!(index, "Replaced model definition");
        }
        index
    }

    /// Model named `name`.
    pub fn get(&self, name: &str) -> Option<&Rc<ModelType>> {
        self.models.get(name)
    }

    /// Model stored at `index`.
    pub fn get_index(&self, index: usize) -> Option<&Rc<ModelType>> {
        self.models.get_index(index).map(|(_, model)| model)
    }

    /// Index of the model named `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.models.get_index_of(name)
    }

    /// Returns `true` if a model named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Number of models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns `true` if empty.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Model names in compile order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// Models in compile order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<ModelType>> {
        self.models.values()
    }

    /// Follows a resolved definition reference into the arena.
    pub fn deref(&self, reference: &Reference) -> Option<&Rc<ModelType>> {
        let target = reference.target()?;
        if target.kind != TargetKind::Definition {
            return None;
        }
        self.get_index(target.index)
    }
}

impl Resolver for ModelRegistry {
    fn resolve_local(&self, section: &str, name: &str) -> Option<Target> {
        if section != TargetKind::Definition.section() {
            return None;
        }
        self.index_of(name)
            .map(|index| Target::new(TargetKind::Definition, index, name))
    }
}

impl ModelLookup for ModelRegistry {
    fn model(&self, reference: &Reference) -> Option<Rc<ModelType>> {
        self.deref(reference).cloned()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::Arguments;
    use crate::value::Value;

    #[test]
    fn test_forward_reference_resolves_after_definition_compiles() {
        let mut registry = ModelRegistry::new();
        let mut context = ResolutionContext::new();
        registry
            .compile(
                "Exercise",
                &json!({"sets": {"type": "array", "items": {"$ref": "#/definitions/Set"}}}),
                &mut context,
            )
            .unwrap();
        registry
            .compile("Set", &json!({"reps": {"type": "integer", "required": true}}), &mut context)
            .unwrap();

        let report = context.resolve_all(&registry);
        assert!(report.is_complete());

        let set = registry.get("Set").unwrap();
        let exercise = registry.get("Exercise").unwrap();
        let mut instance = exercise.construct(Arguments::new()).unwrap();
        let sets = instance.sequence_mut("sets").unwrap();
        sets.append(Value::from(set.construct(Arguments::new().arg(5)).unwrap()))
            .unwrap();
        assert_eq!(sets.len(), 1);
    }

    #[test]
    fn test_replace_keeps_index() {
        let mut registry = ModelRegistry::new();
        let mut context = ResolutionContext::new();
        registry.compile("A", &json!({}), &mut context).unwrap();
        registry.compile("B", &json!({}), &mut context).unwrap();
        registry
            .compile("A", &json!({"x": {"type": "string"}}), &mut context)
            .unwrap();

        assert_eq!(registry.index_of("A"), Some(0));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("A").unwrap().fields().len(), 1);
    }

    #[test]
    fn test_deref_ignores_other_sections() {
        let mut registry = ModelRegistry::new();
        registry.compile("A", &json!({}), &mut ResolutionContext::new()).unwrap();

        assert!(registry.resolve_local("parameters", "A").is_none());
        let reference = Reference::new("#/definitions/A");
        reference.resolve(&registry).unwrap();
        assert_eq!(registry.deref(&reference).map(|m| m.name()), Some("A"));
        assert!(registry.deref(&Reference::new("#/definitions/A")).is_none());
    }
}
