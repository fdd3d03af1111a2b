//! Swagger document assembly on top of the schema compiler.
//!
//! This crate loads a YAML or JSON API document and turns it into a tree
//! of section objects with compiled, cross-referenced definitions:
//!
//! 1. the text is parsed and the root [`SpecObject`] tree is built from the
//!    declarative section kinds in [`objects`], compiling `definitions`
//!    into a [`ModelRegistry`](apispec_core::ModelRegistry);
//! 2. every `$ref` met along the way is resolved against the finished tree;
//! 3. documents named by `#include:` comment lines are merged in, depth
//!    first.
//!
//! # Quick start
//!
//! ```
//! use apispec_document::{Document, DocumentFormat, LoadConfig};
//!
//! let document = Document::parse(r##"
//! info: {title: Gym, version: "1.0"}
//! paths: {}
//! definitions:
//!   Set:
//!     reps: {type: integer, required: true}
//!     weight: {type: integer, minimum: 0}
//! "##, LoadConfig::default()).unwrap();
//!
//! assert!(document.failures().is_empty());
//! assert_eq!(document.definition("Set").unwrap().required_fields().len(), 1);
//!
//! let yaml = document.render(DocumentFormat::Yaml).unwrap();
//! assert!(yaml.contains("reps"));
//! ```

mod config;
mod error;
mod loader;
pub mod objects;
mod output;
mod spec_object;

pub use config::{IncludeConfig, LoadConfig, RequiredPolicy};
pub use error::{DocumentError, Result};
pub use loader::{Document, Node, extract_includes, parse_text};
pub use output::DocumentFormat;
pub use spec_object::{AttrValue, BuildContext, SpecObject};
