//! Structural description of a codec's value type.
//!
//! Schemas do not take part in decoding. They are used for optionality
//! checks when rendering endpoints and as the hook a documentation exporter
//! would read.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaKind {
    String,
    Integer,
    Number,
    Boolean,
    Binary,
    Array(Box<Schema>),
    /// A structured value, named after its Rust type.
    Object(String),
    /// Anything at all, e.g. a raw query or header list.
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub kind: SchemaKind,
    pub optional: bool,
    /// Refinement of `kind`, e.g. `int64` or `uuid`.
    pub format: Option<String>,
    pub description: Option<String>,
}

impl Schema {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            optional: false,
            format: None,
            description: None,
        }
    }

    pub fn string() -> Self {
        Self::new(SchemaKind::String)
    }

    pub fn integer(format: &str) -> Self {
        Self::new(SchemaKind::Integer).with_format(format)
    }

    pub fn number(format: &str) -> Self {
        Self::new(SchemaKind::Number).with_format(format)
    }

    pub fn boolean() -> Self {
        Self::new(SchemaKind::Boolean)
    }

    pub fn binary() -> Self {
        Self::new(SchemaKind::Binary)
    }

    pub fn object<T>() -> Self {
        let name = std::any::type_name::<T>();
        let short = name.rsplit("::").next().unwrap_or(name);
        Self::new(SchemaKind::Object(short.to_string()))
    }

    pub fn any() -> Self {
        Self::new(SchemaKind::Any)
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn as_optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// An array of `self`. Arrays may be empty, so they are optional.
    pub fn as_array(self) -> Self {
        let mut array = Self::new(SchemaKind::Array(Box::new(self)));
        array.optional = true;
        array
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SchemaKind::String => f.write_str("string")?,
            SchemaKind::Integer => f.write_str("integer")?,
            SchemaKind::Number => f.write_str("number")?,
            SchemaKind::Boolean => f.write_str("boolean")?,
            SchemaKind::Binary => f.write_str("binary")?,
            SchemaKind::Array(item) => write!(f, "[{item}]")?,
            SchemaKind::Object(name) => f.write_str(name)?,
            SchemaKind::Any => f.write_str("any")?,
        }
        if let Some(format) = &self.format {
            write!(f, "({format})")?;
        }
        if self.optional {
            f.write_str("?")?;
        }
        Ok(())
    }
}
