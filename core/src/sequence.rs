//! Element-type checked sequences backing array fields.

use crate::error::{Result, SchemaError};
use crate::reference::{Reference, TargetKind};
use crate::value::{PrimitiveType, Value};

/// Declared element type of a [`TypedSequence`].
#[derive(Debug, Clone, PartialEq)]
pub enum ElementType {
    /// Elements must be primitives of this type.
    Primitive(PrimitiveType),
    /// Elements must themselves be arrays of the inner type.
    Array(Box<ElementType>),
    /// Elements must be instances of the model the reference resolves to.
    Model(Reference),
    /// No check. Only used for loose literals built with [`Value::list`].
    Any,
}

impl ElementType {
    /// Checks that `value` is an instance of this element type.
    ///
    /// # Errors
    ///
    /// [`SchemaError::TypeMismatch`] for a value of the wrong type,
    /// [`SchemaError::UnresolvedReference`] when the element type is a
    /// model reference that has not been resolved.
    pub fn check(&self, value: &Value) -> Result<()> {
        match self {
            ElementType::Any => Ok(()),
            ElementType::Primitive(expected) => {
                if value.primitive_type() == Some(*expected) {
                    Ok(())
                } else {
                    Err(self.mismatch(value))
                }
            }
            ElementType::Array(inner) => match value {
                Value::Array(seq) => seq.iter().try_for_each(|item| inner.check(item)),
                _ => Err(self.mismatch(value)),
            },
            ElementType::Model(reference) => {
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
                    _ => Err(self.mismatch(value)),
                }
            }
        }
    }

    /// Human-readable type description.
    pub fn describe(&self) -> String {
        match self {
            ElementType::Primitive(t) => t.name().to_string(),
            ElementType::Array(inner) => format!("array of {}", inner.describe()),
            ElementType::Model(reference) => match reference.target() {
                Some(target) => target.name.clone(),
                None => reference.pointer().to_string(),
            },
            ElementType::Any => "any".to_string(),
        }
    }

    fn mismatch(&self, value: &Value) -> SchemaError {
        SchemaError::TypeMismatch {
            field: "item".to_string(),
            expected: self.describe(),
            found: value.type_name(),
        }
    }
}

/// An ordered sequence whose elements are checked on every mutation.
///
/// A rejected mutation leaves the sequence unchanged.
///
/// # Examples
///
/// ```
/// use apispec_core::{ElementType, PrimitiveType, TypedSequence, Value};
///
/// let mut seq = TypedSequence::new(ElementType::Primitive(PrimitiveType::Integer));
/// seq.append(Value::from(1)).unwrap();
/// seq.insert(0, Value::from(0)).unwrap();
///
/// assert!(seq.append(Value::from("two")).is_err());
/// assert!(seq.extend([Value::from(2), Value::from(false)]).is_err());
/// assert_eq!(seq.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct TypedSequence {
    element: ElementType,
    items: Vec<Value>,
}

impl TypedSequence {
    /// Creates an empty sequence of `element`.
    pub fn new(element: ElementType) -> Self {
        Self {
            element,
            items: Vec::new(),
        }
    }

    /// Creates a sequence from `items`, checking each one.
    ///
    /// # Errors
    ///
    /// Fails with the first element that is not of type `element`.
    pub fn from_values(element: ElementType, items: impl IntoIterator<Item = Value>) -> Result<Self> {
        let mut seq = Self::new(element);
        seq.extend(items)?;
        Ok(seq)
    }

    /// Creates an unchecked sequence.
    pub fn untyped(items: impl IntoIterator<Item = Value>) -> Self {
        Self {
            element: ElementType::Any,
            items: items.into_iter().collect(),
        }
    }

    /// Declared element type.
    pub fn element(&self) -> &ElementType {
        &self.element
    }

    /// Appends one element.
    ///
    /// # Errors
    ///
    /// Rejects elements that are not of the declared type.
    pub fn append(&mut self, value: Value) -> Result<()> {
        self.element.check(&value)?;
        self.items.push(value);
        Ok(())
    }

    /// Inserts one element at `index`; an index past the end appends.
    ///
    /// # Errors
    ///
    /// Rejects elements that are not of the declared type.
    pub fn insert(&mut self, index: usize, value: Value) -> Result<()> {
        self.element.check(&value)?;
        let index = index.min(self.items.len());
        self.items.insert(index, value);
        Ok(())
    }

    /// Appends every element of `values`, or none of them.
    ///
    /// # Errors
    ///
    /// Fails with the first element that is not of the declared type; the
    /// sequence is left as it was.
    pub fn extend(&mut self, values: impl IntoIterator<Item = Value>) -> Result<()> {
        let values: Vec<Value> = values.into_iter().collect();
        for value in &values {
            self.element.check(value)?;
        }
        self.items.extend(values);
        Ok(())
    }

    /// Removes and returns the element at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Value> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Element at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over the elements.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    /// Elements as a slice.
    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }

    /// Consumes the sequence, returning its elements.
    pub fn into_items(self) -> Vec<Value> {
        self.items
    }
}

impl PartialEq for TypedSequence {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<'a> IntoIterator for &'a TypedSequence {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{Resolver, Target};

    fn strings() -> TypedSequence {
        TypedSequence::new(ElementType::Primitive(PrimitiveType::String))
    }

    #[test]
    fn test_append_rejects_wrong_type_and_leaves_sequence_unchanged() {
        let mut seq = strings();
        seq.append("a".into()).unwrap();

        let err = seq.append(Value::from(1)).unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { .. }));
        assert_eq!(seq.as_slice(), &[Value::from("a")]);
    }

    #[test]
    fn test_insert_checks_and_clamps_index() {
        let mut seq = strings();
        seq.insert(10, "b".into()).unwrap();
        seq.insert(0, "a".into()).unwrap();
        assert!(seq.insert(1, Value::from(true)).is_err());
        assert_eq!(seq.as_slice(), &[Value::from("a"), Value::from("b")]);
    }

    #[test]
    fn test_extend_is_all_or_nothing() {
        let mut seq = strings();
        seq.append("a".into()).unwrap();

        let result = seq.extend(vec![Value::from("b"), Value::from(2.5), Value::from("c")]);
        assert!(result.is_err());
        assert_eq!(seq.len(), 1);

        seq.extend(vec![Value::from("b"), Value::from("c")]).unwrap();
        assert_eq!(seq.len(), 3);
    }

    #[test]
    fn test_nested_arrays_check_inner_elements() {
        let element = ElementType::Array(Box::new(ElementType::Primitive(PrimitiveType::Integer)));
        let mut seq = TypedSequence::new(element);

        seq.append(Value::list([Value::from(1), Value::from(2)])).unwrap();
        assert!(seq.append(Value::list([Value::from("x")])).is_err());
        assert!(seq.append(Value::from(1)).is_err());
    }

    #[test]
    fn test_unresolved_model_element_rejects_everything() {
        let reference = Reference::new("#/definitions/Set");
        let mut seq = TypedSequence::new(ElementType::Model(reference));
        assert_eq!(
            seq.append(Value::from(1)).unwrap_err(),
            SchemaError::UnresolvedReference("#/definitions/Set".into())
        );
    }

    #[test]
    fn test_model_element_rejects_non_definition_targets() {
        struct ToParameter;
        impl Resolver for ToParameter {
            fn resolve_local(&self, _: &str, name: &str) -> Option<Target> {
                Some(Target::new(TargetKind::Parameter, 0, name))
            }
        }
        let reference = Reference::new("#/parameters/limit");
        reference.resolve(&ToParameter).unwrap();
        let mut seq = TypedSequence::new(ElementType::Model(reference));
        assert!(matches!(
            seq.append(Value::from("limit")),
            Err(SchemaError::TypeMismatch { .. })
        ));
    }
}
