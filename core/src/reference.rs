//! Deferred `$ref` pointers and the resolution worklist.
//!
//! A [`Reference`] is created the moment a pointer is encountered, before
//! the node it names has necessarily been parsed. Every reference created
//! through a [`ResolutionContext`] is pushed onto its worklist; once the
//! whole document tree exists, [`ResolutionContext::resolve_all`] drains the
//! worklist (last registered first) against a [`Resolver`].
//!
//! Clones of a reference share one target slot, so resolving any clone
//! resolves all of them, and a slot is written at most once.
//!
//! # Example
//!
//! ```
//! use apispec_core::{Reference, ResolutionContext, Resolver, Target, TargetKind};
//!
//! struct OnlySet;
//!
//! impl Resolver for OnlySet {
//!     fn resolve_local(&self, section: &str, name: &str) -> Option<Target> {
//!         (section == "definitions" && name == "Set")
//!             .then(|| Target::new(TargetKind::Definition, 0, "Set"))
//!     }
//! }
//!
//! let mut context = ResolutionContext::new();
//! let found = context.reference("#/definitions/Set");
//! let missing = context.reference("#/definitions/Nope");
//!
//! let report = context.resolve_all(&OnlySet);
//! assert!(context.is_empty());
//! assert_eq!(report.resolved, 1);
//! assert!(found.is_resolved());
//! assert!(!missing.is_resolved());
//! assert_eq!(missing.to_string(), "<Reference: #/definitions/Nope>");
//! ```

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::error::{Result, SchemaError};

/// Section of the document a resolved reference points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// A compiled model under `#/definitions`.
    Definition,
    /// A root-level parameter under `#/parameters`.
    Parameter,
    /// A root-level response under `#/responses`.
    Response,
}

impl TargetKind {
    /// Returns the document section name for this kind.
    pub fn section(self) -> &'static str {
        match self {
            TargetKind::Definition => "definitions",
            TargetKind::Parameter => "parameters",
            TargetKind::Response => "responses",
        }
    }
}

/// Arena position of a resolved reference.
///
/// `index` is the position of the node inside the arena for `kind` (the
/// model registry or the document's keyed section); `name` is the entry
/// key, kept so that type checks do not need the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Section the target lives in.
    pub kind: TargetKind,
    /// Index into that section's arena.
    pub index: usize,
    /// Entry key within the section.
    pub name: String,
}

impl Target {
    /// Creates a target.
    pub fn new(kind: TargetKind, index: usize, name: impl Into<String>) -> Self {
        Self {
            kind,
            index,
            name: name.into(),
        }
    }
}

/// Syntactic category of a pointer, decided by its prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerKind {
    /// `#/<section>/<name>` inside the current document.
    Local {
        /// First path segment (`definitions`, `parameters`, ...).
        section: String,
        /// Second path segment, JSON-pointer decoded.
        name: String,
    },
    /// Anything starting with `http`.
    Remote,
    /// Any other pointer, taken as a path on disk.
    RelativeFile,
}

/// Classifies `pointer`.
///
/// # Errors
///
/// Returns [`SchemaError::ReferenceNotFound`] for a local pointer with
/// fewer than two path segments.
///
/// # Examples
///
/// ```
/// use apispec_core::{PointerKind, parse_pointer};
///
/// assert_eq!(
///     parse_pointer("#/definitions/Set").unwrap(),
///     PointerKind::Local { section: "definitions".into(), name: "Set".into() },
/// );
/// assert_eq!(parse_pointer("https://example.com/api.yaml").unwrap(), PointerKind::Remote);
/// assert_eq!(parse_pointer("common.yaml#/Pet").unwrap(), PointerKind::RelativeFile);
/// assert!(parse_pointer("#/definitions").is_err());
/// ```
pub fn parse_pointer(pointer: &str) -> Result<PointerKind> {
    if let Some(path) = pointer.strip_prefix('#') {
        let mut segments = path.trim_start_matches('/').split('/');
        let section = segments.next().filter(|s| !s.is_empty());
        let name = segments.next().filter(|s| !s.is_empty());
        return match (section, name) {
            (Some(section), Some(name)) => Ok(PointerKind::Local {
                section: decode_segment(section),
                name: decode_segment(name),
            }),
            _ => Err(SchemaError::ReferenceNotFound(pointer.to_string())),
        };
    }
    if pointer.starts_with("http") {
        return Ok(PointerKind::Remote);
    }
    Ok(PointerKind::RelativeFile)
}

fn decode_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Looks up local pointer targets in a fully built document.
///
/// Implementors answer for whichever sections they own; returning `None`
/// makes the reference fail with [`SchemaError::ReferenceNotFound`].
pub trait Resolver {
    /// Finds the entry `name` in `section`.
    fn resolve_local(&self, section: &str, name: &str) -> Option<Target>;
}

/// A pointer standing in for a node defined elsewhere in the document.
///
/// The pointer string, the resolved flag and the target handle are the
/// reference's own state. Everything else is reached through an explicit
/// `deref` on the arena that owns the target (see
/// [`ModelRegistry::deref`](crate::ModelRegistry::deref)).
#[derive(Clone)]
pub struct Reference {
    pointer: Rc<str>,
    slot: Rc<OnceCell<Target>>,
}

impl Reference {
    /// Creates an unresolved reference that is not registered anywhere.
    ///
    /// Use [`ResolutionContext::reference`] to have it resolved by a pass.
    pub fn new(pointer: impl AsRef<str>) -> Self {
        Self {
            pointer: Rc::from(pointer.as_ref()),
            slot: Rc::new(OnceCell::new()),
        }
    }

    /// Returns the pointer string.
    pub fn pointer(&self) -> &str {
        &self.pointer
    }

    /// Returns `true` once a target has been bound.
    pub fn is_resolved(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Returns the bound target, if any. Never triggers resolution.
    pub fn target(&self) -> Option<&Target> {
        self.slot.get()
    }

    /// Returns `true` when both handles share the same target slot.
    pub fn shares_target(&self, other: &Reference) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }

    /// Resolves this reference against `resolver`.
    ///
    /// An already resolved reference returns its target without consulting
    /// the resolver.
    ///
    /// # Errors
    ///
    /// [`SchemaError::ReferenceNotFound`] when a local pointer has no match,
    /// [`SchemaError::UnimplementedReferenceKind`] for remote and
    /// relative-file pointers. The reference stays unresolved in both cases.
    pub fn resolve<R: Resolver + ?Sized>(&self, resolver: &R) -> Result<&Target> {
        if let Some(target) = self.slot.get() {
            return Ok(target);
        }
        let target = match parse_pointer(&self.pointer)? {
            PointerKind::Local { section, name } => resolver
                .resolve_local(&section, &name)
                .ok_or_else(|| SchemaError::ReferenceNotFound(self.pointer.to_string()))?,
            PointerKind::Remote => {
                return Err(SchemaError::UnimplementedReferenceKind {
                    pointer: self.pointer.to_string(),
                    kind: "remote".to_string(),
                });
            }
            PointerKind::RelativeFile => {
                return Err(SchemaError::UnimplementedReferenceKind {
                    pointer: self.pointer.to_string(),
                    kind: "relative file".to_string(),
                });
            }
        };
        Ok(self.slot.get_or_init(|| target))
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.pointer == other.pointer
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("pointer", &&*self.pointer)
            .field("target", &self.slot.get())
            .finish()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot.get() {
            Some(target) => write!(f, "<{:?}: {}>", target.kind, target.name),
            None => write!(f, "<Reference: {}>", self.pointer),
        }
    }
}

/// A reference the resolution pass could not bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionFailure {
    /// Pointer of the failed reference.
    pub pointer: String,
    /// Why it failed.
    pub error: SchemaError,
}

/// Outcome of draining a [`ResolutionContext`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    /// Number of references bound (including ones already bound).
    pub resolved: usize,
    /// References left permanently unresolved, in pop order.
    pub failures: Vec<ResolutionFailure>,
}

impl ResolutionReport {
    /// Returns `true` if every reference resolved.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Folds another report into this one.
    pub fn absorb(&mut self, other: ResolutionReport) {
        self.resolved += other.resolved;
        self.failures.extend(other.failures);
    }
}

/// Worklist of references awaiting the resolution pass.
///
/// Scoped to one document-load lifecycle: create it before building,
/// drain it once the tree is complete, then drop it.
#[derive(Debug, Default)]
pub struct ResolutionContext {
    pending: Vec<Reference>,
}

impl ResolutionContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a reference for `pointer` and registers it.
    pub fn reference(&mut self, pointer: impl AsRef<str>) -> Reference {
        let reference = Reference::new(pointer);
        self.register(reference.clone());
        reference
    }

    /// Registers an existing reference handle.
    pub fn register(&mut self, reference: Reference) {
        self.pending.push(reference);
    }

    /// Number of references awaiting resolution.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if no references are pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pointers of pending references, in registration order.
    pub fn pending_pointers(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(|r| r.pointer())
    }

    /// Drains the worklist, most recently registered first.
    ///
    /// Each reference is attempted exactly once. Failures are logged and
    /// recorded in the report; the context is always empty afterwards.
    pub fn resolve_all<R: Resolver + ?Sized>(&mut self, resolver: &R) -> ResolutionReport {
        let mut report = ResolutionReport::default();
        while let Some(reference) = self.pending.pop() {
            match reference.resolve(resolver) {
                Ok(target) => {
                    debug!(pointer = reference.pointer(), target = %target.name, "Resolved reference");
                    report.resolved += 1;
                }
                Err(error) => {
                    warn!(pointer = reference.pointer(), error = %error, "Failed to resolve reference");
                    report.failures.push(ResolutionFailure {
                        pointer: reference.pointer().to_string(),
                        error,
                    });
                }
            }
        }
        info!(
            resolved = report.resolved,
            failed = report.failures.len(),
            "Reference resolution pass complete"
        );
        report
    }
}
