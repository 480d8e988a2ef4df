//! Runtime representation of CTF type declarations.
//!
//! Every [`Type`] knows its alignment (in bits) and how to decode itself from a
//! [`BitRead`] cursor into a [`Value`]. Types are immutable once built and are
//! shared through `Arc`s between the declarations that use them.

use crate::error::Error;
use crate::reader::BitRead;
use std::str::FromStr;
use std::sync::Arc;

pub use enumeration::{EnumRange, EnumType};
pub use float::FloatType;
pub use integer::IntType;
pub use string::StringType;
pub use structure::{Field, FieldKind, StructType};
pub use value::{Record, Value};
pub use variant::{VariantSelector, VariantType};

pub(crate) mod enumeration;
pub(crate) mod float;
pub(crate) mod integer;
pub(crate) mod string;
pub(crate) mod structure;
pub(crate) mod value;
pub(crate) mod variant;

#[derive(Clone, Debug)]
pub enum Type {
    Int(Arc<IntType>),
    Enum(Arc<EnumType>),
    String(StringType),
    Struct(Arc<StructType>),
    Variant(Arc<VariantType>),
    Float(Arc<FloatType>),
}

impl Type {
    /// Alignment in bits, always a power of two
    pub fn align(&self) -> u32 {
        match self {
            Type::Int(t) => t.align(),
            Type::Enum(t) => t.container().align(),
            Type::String(t) => t.align(),
            Type::Struct(t) => t.align(),
            Type::Variant(t) => t.align(),
            Type::Float(t) => t.align(),
        }
    }

    pub fn decode<R: BitRead + ?Sized>(&self, r: &mut R) -> Result<Value, Error> {
        match self {
            Type::Int(t) => t.decode(r),
            Type::Enum(t) => t.decode(r),
            Type::String(t) => t.decode(r).map(Value::Str),
            Type::Struct(t) => t.decode(r).map(Value::Record),
            Type::Variant(t) => Err(Error::DetachedVariant(
                t.name().unwrap_or("<anonymous>").to_owned(),
            )),
            Type::Float(t) => t.decode(r).map(Value::Float),
        }
    }

    /// The integer declaration behind this type, if any
    pub fn as_int(&self) -> Option<&IntType> {
        match self {
            Type::Int(t) => Some(t),
            Type::Enum(t) => Some(t.container()),
            _ => None,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Type::Int(_) => "integer",
            Type::Enum(_) => "enum",
            Type::String(_) => "string",
            Type::Struct(_) => "struct",
            Type::Variant(_) => "variant",
            Type::Float(_) => "floating_point",
        }
    }
}

/// Character encoding attached to integers and strings
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum Encoding {
    #[default]
    None,
    Utf8,
    Ascii,
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Encoding::None),
            "UTF8" | "utf8" => Ok(Encoding::Utf8),
            "ASCII" | "ascii" => Ok(Encoding::Ascii),
            _ => Err(format!("'{s}' is not an encoding")),
        }
    }
}

/// Length of one array dimension in a member declaration
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArrayLen {
    Fixed(usize),
    /// Length is held by an earlier sibling field
    Field(String),
}

/// A struct or variant member as written in the metadata, before the
/// enclosing struct resolves sibling references.
#[derive(Clone, Debug)]
pub struct MemberDecl {
    pub name: String,
    pub ty: Type,
    pub dims: Vec<ArrayLen>,
}

impl MemberDecl {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            dims: Vec::new(),
        }
    }

    pub fn with_dims(mut self, dims: Vec<ArrayLen>) -> Self {
        self.dims = dims;
        self
    }
}
