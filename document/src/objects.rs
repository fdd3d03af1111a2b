//! Declarative section kinds.
//!
//! Each [`ObjectKind`] lists the attributes a section of the document may
//! carry and how each one is built. The tables are plain statics; the
//! build and merge logic that walks them lives in
//! [`spec_object`](crate::spec_object).

/// How an attribute's raw value is turned into an
/// [`AttrValue`](crate::AttrValue).
#[derive(Debug, Clone, Copy)]
pub enum AttrKind {
    /// A string, number or boolean.
    Scalar,
    /// A string restricted to the listed values.
    OneOf(&'static [&'static str]),
    /// A sequence kept as-is.
    List,
    /// A nested section object.
    Object(&'static ObjectKind),
    /// A sequence of section objects.
    Objects(&'static ObjectKind),
    /// A mapping of section key to section object.
    Keyed(&'static ObjectKind),
    /// The model definitions, compiled into the document's registry.
    Definitions,
    /// A `$ref` pointer.
    Reference,
    /// Kept verbatim.
    Raw,
}

/// One declared attribute of a section kind.
#[derive(Debug, Clone, Copy)]
pub struct Attr {
    /// Key in the raw document.
    pub key: &'static str,
    /// Whether the key must be present.
    pub required: bool,
    /// How the value is built.
    pub kind: AttrKind,
}

impl Attr {
    /// Name the attribute is stored under; `$ref` becomes `ref`.
    pub fn storage_name(&self) -> &'static str {
        if self.key == "$ref" { "ref" } else { self.key }
    }
}

/// A section kind: a name and its fixed attribute list.
#[derive(Debug)]
pub struct ObjectKind {
    /// Kind name used in logs and errors.
    pub name: &'static str,
    /// Declared attributes in output order.
    pub attrs: &'static [Attr],
    /// Attribute a bare string builds (tags may be plain names).
    pub shorthand: Option<&'static str>,
    /// Attribute whose value keys an object built inside a sequence.
    pub key_attr: Option<&'static str>,
}

impl ObjectKind {
    /// Declared attribute for `key`.
    pub fn attr(&self, key: &str) -> Option<&'static Attr> {
        self.attrs.iter().find(|a| a.key == key)
    }

    /// Declared attribute stored under `name`.
    pub fn attr_by_storage(&self, name: &str) -> Option<&'static Attr> {
        self.attrs.iter().find(|a| a.storage_name() == name)
    }
}

const fn req(key: &'static str, kind: AttrKind) -> Attr {
    Attr {
        key,
        required: true,
        kind,
    }
}

const fn opt(key: &'static str, kind: AttrKind) -> Attr {
    Attr {
        key,
        required: false,
        kind,
    }
}

/// Allowed parameter locations.
pub const PARAMETER_LOCATIONS: &[&str] = &["query", "header", "path", "formData", "body"];

/// Contact details for the API.
pub static CONTACT: ObjectKind = ObjectKind {
    name: "Contact",
    attrs: &[
        opt("name", AttrKind::Scalar),
        opt("url", AttrKind::Scalar),
        opt("email", AttrKind::Scalar),
    ],
    shorthand: None,
    key_attr: None,
};

/// License of the API.
pub static LICENSE: ObjectKind = ObjectKind {
    name: "License",
    attrs: &[req("name", AttrKind::Scalar), opt("url", AttrKind::Scalar)],
    shorthand: None,
    key_attr: None,
};

/// API metadata.
pub static INFO: ObjectKind = ObjectKind {
    name: "Info",
    attrs: &[
        req("title", AttrKind::Scalar),
        opt("description", AttrKind::Scalar),
        opt("termsOfService", AttrKind::Scalar),
        opt("contact", AttrKind::Object(&CONTACT)),
        opt("license", AttrKind::Object(&LICENSE)),
        req("version", AttrKind::Scalar),
    ],
    shorthand: None,
    key_attr: None,
};

/// External documentation link.
pub static DOCUMENTATION: ObjectKind = ObjectKind {
    name: "Documentation",
    attrs: &[opt("description", AttrKind::Scalar), req("url", AttrKind::Scalar)],
    shorthand: None,
    key_attr: None,
};

/// A tag; a bare string is taken as its name.
pub static TAG: ObjectKind = ObjectKind {
    name: "Tag",
    attrs: &[
        req("name", AttrKind::Scalar),
        opt("description", AttrKind::Scalar),
        opt("externalDocs", AttrKind::Object(&DOCUMENTATION)),
    ],
    shorthand: Some("name"),
    key_attr: Some("name"),
};

/// Element schema of an array schema.
pub static SCHEMA_ITEMS: ObjectKind = ObjectKind {
    name: "Items",
    attrs: &[
        opt("$ref", AttrKind::Reference),
        opt("type", AttrKind::Scalar),
        opt("format", AttrKind::Scalar),
        opt("items", AttrKind::Raw),
        opt("enum", AttrKind::List),
    ],
    shorthand: None,
    key_attr: None,
};

/// Payload schema of a body parameter or response.
pub static SCHEMA: ObjectKind = ObjectKind {
    name: "Schema",
    attrs: &[
        opt("$ref", AttrKind::Reference),
        opt("title", AttrKind::Scalar),
        opt("type", AttrKind::Scalar),
        opt("format", AttrKind::Scalar),
        opt("description", AttrKind::Scalar),
        opt("items", AttrKind::Object(&SCHEMA_ITEMS)),
        opt("properties", AttrKind::Raw),
        opt("required", AttrKind::List),
        opt("additionalProperties", AttrKind::Raw),
        opt("enum", AttrKind::List),
        opt("example", AttrKind::Raw),
    ],
    shorthand: None,
    key_attr: None,
};

/// An operation parameter.
pub static PARAMETER: ObjectKind = ObjectKind {
    name: "Parameter",
    attrs: &[
        opt("$ref", AttrKind::Reference),
        req("name", AttrKind::Scalar),
        req("in", AttrKind::OneOf(PARAMETER_LOCATIONS)),
        opt("description", AttrKind::Scalar),
        opt("required", AttrKind::Scalar),
        opt("schema", AttrKind::Object(&SCHEMA)),
        opt("type", AttrKind::Scalar),
        opt("format", AttrKind::Scalar),
        opt("allowEmptyValue", AttrKind::Scalar),
        opt("items", AttrKind::Raw),
        opt("collectionFormat", AttrKind::Scalar),
        opt("default", AttrKind::Raw),
        opt("maximum", AttrKind::Scalar),
        opt("exclusiveMaximum", AttrKind::Scalar),
        opt("minimum", AttrKind::Scalar),
        opt("exclusiveMinimum", AttrKind::Scalar),
        opt("maxLength", AttrKind::Scalar),
        opt("minLength", AttrKind::Scalar),
        opt("pattern", AttrKind::Scalar),
        opt("maxItems", AttrKind::Scalar),
        opt("minItems", AttrKind::Scalar),
        opt("uniqueItems", AttrKind::Scalar),
        opt("enum", AttrKind::List),
        opt("multipleOf", AttrKind::Scalar),
    ],
    shorthand: None,
    key_attr: Some("name"),
};

/// A response, keyed by status code.
pub static RESPONSE: ObjectKind = ObjectKind {
    name: "Response",
    attrs: &[
        opt("$ref", AttrKind::Reference),
        req("description", AttrKind::Scalar),
        opt("schema", AttrKind::Object(&SCHEMA)),
        opt("headers", AttrKind::Raw),
        opt("examples", AttrKind::Raw),
    ],
    shorthand: None,
    key_attr: None,
};

/// One HTTP operation on a path.
pub static OPERATION: ObjectKind = ObjectKind {
    name: "Operation",
    attrs: &[
        opt("tags", AttrKind::List),
        opt("summary", AttrKind::Scalar),
        opt("description", AttrKind::Scalar),
        opt("externalDocs", AttrKind::Object(&DOCUMENTATION)),
        opt("operationId", AttrKind::Scalar),
        opt("consumes", AttrKind::List),
        opt("produces", AttrKind::List),
        opt("parameters", AttrKind::Objects(&PARAMETER)),
        req("responses", AttrKind::Keyed(&RESPONSE)),
        opt("schemes", AttrKind::List),
        opt("deprecated", AttrKind::Scalar),
        opt("security", AttrKind::Raw),
    ],
    shorthand: None,
    key_attr: None,
};

/// HTTP methods a path may declare, in output order.
pub const OPERATION_METHODS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch"];

/// A path item, keyed by its URL template.
pub static PATH: ObjectKind = ObjectKind {
    name: "Path",
    attrs: &[
        opt("$ref", AttrKind::Reference),
        opt("get", AttrKind::Object(&OPERATION)),
        opt("put", AttrKind::Object(&OPERATION)),
        opt("post", AttrKind::Object(&OPERATION)),
        opt("delete", AttrKind::Object(&OPERATION)),
        opt("options", AttrKind::Object(&OPERATION)),
        opt("head", AttrKind::Object(&OPERATION)),
        opt("patch", AttrKind::Object(&OPERATION)),
        opt("parameters", AttrKind::Objects(&PARAMETER)),
    ],
    shorthand: None,
    key_attr: None,
};

/// The document root.
pub static SWAGGER: ObjectKind = ObjectKind {
    name: "Swagger",
    attrs: &[
        opt("swagger", AttrKind::Scalar),
        req("info", AttrKind::Object(&INFO)),
        opt("host", AttrKind::Scalar),
        opt("basePath", AttrKind::Scalar),
        opt("schemes", AttrKind::List),
        opt("consumes", AttrKind::List),
        opt("produces", AttrKind::List),
        req("paths", AttrKind::Keyed(&PATH)),
        opt("definitions", AttrKind::Definitions),
        opt("parameters", AttrKind::Keyed(&PARAMETER)),
        opt("responses", AttrKind::Keyed(&RESPONSE)),
        opt("securityDefinitions", AttrKind::Raw),
        opt("security", AttrKind::Raw),
        opt("tags", AttrKind::Objects(&TAG)),
        opt("externalDocs", AttrKind::Object(&DOCUMENTATION)),
    ],
    shorthand: None,
    key_attr: None,
};
