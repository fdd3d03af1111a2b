//! Schema-to-model compiler and deferred reference resolution.
//!
//! This crate turns the `definitions` of an API document into validated
//! runtime types:
//!
//! - [`FieldDescriptor`]: a typed, constrained attribute slot compiled from
//!   a [`FieldSpec`] (integer/float/string/boolean/binary, ranges, patterns,
//!   enums, arrays).
//! - [`ModelType`]: a record type compiled from a schema by
//!   [`compile_model`], with a validating constructor and example generation.
//! - [`TypedSequence`]: the element-checked value behind array fields.
//! - [`Reference`]: a `$ref` pointer bound to an arena index once the whole
//!   document exists, drained from a [`ResolutionContext`] worklist.
//! - [`ModelRegistry`]: the arena of compiled models that
//!   `#/definitions/...` pointers resolve into.
//!
//! # Example
//!
//! ```
//! use apispec_core::*;
//! use serde_json::json;
//!
//! let models = compile_definitions(&json!({
//!     "Exercise": {
//!         "name": {"type": "string", "required": true},
//!         "sets": {"type": "array", "items": {"$ref": "#/definitions/Set"}}
//!     },
//!     "Set": {
//!         "reps": {"type": "integer", "required": true},
//!         "weight": {"type": "integer", "minimum": 0}
//!     }
//! })).unwrap();
//!
//! let set = models.get("Set").unwrap();
//! let exercise = models.get("Exercise").unwrap();
//!
//! let mut squat = exercise.construct(Arguments::new().arg("squat")).unwrap();
//! let heavy = set.construct(Arguments::new().kwarg("reps", 5).kwarg("weight", 140)).unwrap();
//! squat.sequence_mut("sets").unwrap().append(heavy.into()).unwrap();
//!
//! assert!(set.construct(Arguments::new().kwarg("reps", 5).kwarg("weight", 0)).is_err());
//! assert_eq!(squat.to_json()["sets"][0]["weight"], 140);
//! ```

mod error;
mod fields;
mod model;
mod reference;
mod registry;
mod sequence;
mod value;

pub use error::{Result, SchemaError};
pub use fields::{
    DeclaredType, FieldDescriptor, FieldSpec, FieldType, StringFormat, Validator, make_descriptor,
    type_from_name,
};
pub use model::{Arguments, ModelInstance, ModelType, compile_definitions, compile_model, compile_model_with};
pub use reference::{
    PointerKind, Reference, ResolutionContext, ResolutionFailure, ResolutionReport, Resolver, Target,
    TargetKind, parse_pointer,
};
pub use registry::{ModelLookup, ModelRegistry};
pub use sequence::{ElementType, TypedSequence};
pub use value::{PrimitiveType, Value};
