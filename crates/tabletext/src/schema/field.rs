// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field type tags and descriptors.

/// Scalar type kinds.
///
/// Integer widths share the `Value::Int` lane at runtime; the kind bounds
/// the accepted range on decode and selects conversions on get/set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl ScalarKind {
    /// Inclusive integer bounds, `None` for non-integer kinds.
    pub fn int_bounds(&self) -> Option<(i64, i64)> {
        match self {
            Self::I8 => Some((i64::from(i8::MIN), i64::from(i8::MAX))),
            Self::I16 => Some((i64::from(i16::MIN), i64::from(i16::MAX))),
            Self::I32 => Some((i64::from(i32::MIN), i64::from(i32::MAX))),
            Self::I64 => Some((i64::MIN, i64::MAX)),
            Self::Bool | Self::F32 | Self::F64 => None,
        }
    }

    /// True for the floating-point kinds.
    pub fn is_float(&self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

/// Type tag for a persisted field or collection component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Primitive scalar.
    Scalar(ScalarKind),
    /// UTF-8 string (reference semantics: may hold null).
    Str,
    /// Enum constant of a registered enum, by registered enum name.
    Enum(String),
    /// Array or ordered collection of the element type. Length is
    /// implicit in the encoding; multi-dimensional arrays nest.
    List(Box<FieldType>),
    /// Map with scalar/string/enum keys.
    Map {
        key: Box<FieldType>,
        value: Box<FieldType>,
    },
    /// Nested object of the named registered type (which may be a base
    /// type; the concrete subtype tag travels with the encoded block).
    Object(String),
    /// A component type that generated registration code could not name
    /// (the type-erased-generic case). Never encodable; rejected at
    /// registration.
    Erased,
}

impl FieldType {
    /// List of the given element type.
    pub fn list(element: impl Into<FieldType>) -> Self {
        Self::List(Box::new(element.into()))
    }

    /// Map from `key` to `value`.
    pub fn map(key: impl Into<FieldType>, value: impl Into<FieldType>) -> Self {
        Self::Map {
            key: Box::new(key.into()),
            value: Box::new(value.into()),
        }
    }

    /// Nested object of the named registered type.
    pub fn object(type_name: impl Into<String>) -> Self {
        Self::Object(type_name.into())
    }

    /// Enum constant of the named registered enum.
    pub fn enumeration(enum_name: impl Into<String>) -> Self {
        Self::Enum(enum_name.into())
    }

    /// True when any component of this type is `Erased`.
    pub fn contains_erased(&self) -> bool {
        match self {
            Self::Erased => true,
            Self::List(elem) => elem.contains_erased(),
            Self::Map { key, value } => key.contains_erased() || value.contains_erased(),
            Self::Scalar(_) | Self::Str | Self::Enum(_) | Self::Object(_) => false,
        }
    }

    /// True when this type may be used as a map key.
    pub fn valid_map_key(&self) -> bool {
        matches!(self, Self::Scalar(_) | Self::Str | Self::Enum(_))
    }

    /// True for reference-semantics types, which may hold an explicit
    /// null.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Self::Str | Self::List(_) | Self::Map { .. } | Self::Object(_)
        )
    }

    /// Short shape name, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Scalar(ScalarKind::Bool) => "bool",
            Self::Scalar(ScalarKind::F32 | ScalarKind::F64) => "float",
            Self::Scalar(_) => "int",
            Self::Str => "string",
            Self::Enum(_) => "enum",
            Self::List(_) => "list",
            Self::Map { .. } => "map",
            Self::Object(_) => "object",
            Self::Erased => "erased",
        }
    }

    /// Visit every enum name referenced by this type, including nested
    /// list/map components.
    pub(crate) fn for_each_enum(&self, visit: &mut dyn FnMut(&str)) {
        match self {
            Self::Enum(name) => visit(name),
            Self::List(elem) => elem.for_each_enum(visit),
            Self::Map { key, value } => {
                key.for_each_enum(visit);
                value.for_each_enum(visit);
            }
            Self::Scalar(_) | Self::Str | Self::Object(_) | Self::Erased => {}
        }
    }
}

impl From<ScalarKind> for FieldType {
    fn from(kind: ScalarKind) -> Self {
        Self::Scalar(kind)
    }
}

/// A persisted field of a registered type: name plus declared type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name as it appears in the text grammar.
    pub name: String,
    /// Declared type.
    pub ty: FieldType,
}

impl FieldDescriptor {
    /// Create a new field descriptor.
    pub fn new(name: impl Into<String>, ty: impl Into<FieldType>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}
