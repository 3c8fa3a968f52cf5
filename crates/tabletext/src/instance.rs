// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Live object-graph carrier.
//!
//! An [`Instance`] pairs a registered schema with its current value tree.
//! Game code creates instances (fresh via [`Registry::instantiate`] or by
//! decoding), mutates them through the typed `get`/`set` surface between
//! turns, and hands them to encode/diff/merge. Freshly constructed
//! instances hold every schema field, in schema order, at its default:
//! zero/false scalars, empty strings, the first enum variant, empty
//! lists/maps, and null nested objects.

use crate::schema::{ClassSchema, FieldType, Registry, ScalarKind};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Errors for typed instance field access.
#[derive(Debug)]
pub enum InstanceError {
    FieldNotFound(String),
    TypeMismatch { expected: String, got: String },
    InvalidOperation(String),
}

impl fmt::Display for InstanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldNotFound(name) => write!(f, "field not found: {}", name),
            Self::TypeMismatch { expected, got } => {
                write!(f, "type mismatch: expected {}, got {}", expected, got)
            }
            Self::InvalidOperation(msg) => write!(f, "invalid operation: {}", msg),
        }
    }
}

impl std::error::Error for InstanceError {}

/// One live object graph: a schema plus its value tree.
#[derive(Debug, Clone)]
pub struct Instance {
    schema: Arc<ClassSchema>,
    value: Value,
}

impl Instance {
    /// Create a default-valued instance of the schema.
    pub fn new(schema: &Arc<ClassSchema>, registry: &Registry) -> Self {
        let value = if schema.custom().is_some() {
            // Custom-codec types own their value shape; start null.
            Value::Null
        } else {
            let fields = schema
                .fields()
                .iter()
                .map(|f| (f.name.clone(), default_value(&f.ty, registry)))
                .collect();
            Value::Object {
                type_name: schema.type_name().to_string(),
                fields,
            }
        };
        Self {
            schema: schema.clone(),
            value,
        }
    }

    /// Wrap an existing value tree (used by the decoder and by custom
    /// codecs).
    pub fn from_value(schema: &Arc<ClassSchema>, value: Value) -> Self {
        Self {
            schema: schema.clone(),
            value,
        }
    }

    /// The instance's schema.
    pub fn schema(&self) -> &Arc<ClassSchema> {
        &self.schema
    }

    /// The registered type name.
    pub fn type_name(&self) -> &str {
        self.schema.type_name()
    }

    /// The underlying value tree.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Mutable access to the value tree.
    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    /// Consume into the value tree.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Typed field read.
    pub fn get<T: FromValue>(&self, name: &str) -> Result<T, InstanceError> {
        T::from_value(self.get_field(name)?)
    }

    /// Typed field write. The field must exist in the schema.
    pub fn set<T: IntoValue>(&mut self, name: &str, value: T) -> Result<(), InstanceError> {
        self.set_value(name, value.into_value())
    }

    /// Raw field read.
    pub fn get_field(&self, name: &str) -> Result<&Value, InstanceError> {
        if self.schema.field(name).is_none() {
            return Err(InstanceError::FieldNotFound(name.to_string()));
        }
        self.value
            .get_field(name)
            .ok_or_else(|| InstanceError::FieldNotFound(name.to_string()))
    }

    /// Raw mutable field read.
    pub fn get_field_mut(&mut self, name: &str) -> Result<&mut Value, InstanceError> {
        if self.schema.field(name).is_none() {
            return Err(InstanceError::FieldNotFound(name.to_string()));
        }
        self.value
            .get_field_mut(name)
            .ok_or_else(|| InstanceError::FieldNotFound(name.to_string()))
    }

    /// Raw field write. The field must exist in the schema.
    pub fn set_value(&mut self, name: &str, value: Value) -> Result<(), InstanceError> {
        if self.schema.field(name).is_none() {
            return Err(InstanceError::FieldNotFound(name.to_string()));
        }
        if self.value.set_field(name, value) {
            Ok(())
        } else {
            Err(InstanceError::InvalidOperation(
                "instance value is not an object".to_string(),
            ))
        }
    }
}

/// Default value for a declared field type.
pub(crate) fn default_value(ty: &FieldType, registry: &Registry) -> Value {
    match ty {
        FieldType::Scalar(ScalarKind::Bool) => Value::Bool(false),
        FieldType::Scalar(ScalarKind::F32 | ScalarKind::F64) => Value::Float(0.0),
        FieldType::Scalar(_) => Value::Int(0),
        FieldType::Str => Value::Str(String::new()),
        FieldType::Enum(name) => match registry.enum_variants(name).and_then(|v| v.first()) {
            Some(first) => Value::Enum(first.clone()),
            None => Value::Enum(String::new()),
        },
        FieldType::List(_) => Value::List(Vec::new()),
        FieldType::Map { .. } => Value::Map(Vec::new()),
        FieldType::Object(_) => Value::Null,
        FieldType::Erased => Value::Null,
    }
}

/// Conversion from a stored [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, InstanceError>;
}

/// Conversion into a stored [`Value`].
pub trait IntoValue {
    fn into_value(self) -> Value;
}

macro_rules! impl_from_int {
    ($ty:ty) => {
        impl FromValue for $ty {
            fn from_value(value: &Value) -> Result<Self, InstanceError> {
                match value {
                    Value::Int(v) => <$ty>::try_from(*v).map_err(|_| {
                        InstanceError::TypeMismatch {
                            expected: stringify!($ty).to_string(),
                            got: format!("int {}", v),
                        }
                    }),
                    other => Err(InstanceError::TypeMismatch {
                        expected: stringify!($ty).to_string(),
                        got: other.kind_name().to_string(),
                    }),
                }
            }
        }
    };
}

impl_from_int!(i8);
impl_from_int!(i16);
impl_from_int!(i32);
impl_from_int!(i64);

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, InstanceError> {
        value.as_bool().ok_or_else(|| InstanceError::TypeMismatch {
            expected: "bool".to_string(),
            got: value.kind_name().to_string(),
        })
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, InstanceError> {
        value.as_f64().ok_or_else(|| InstanceError::TypeMismatch {
            expected: "f64".to_string(),
            got: value.kind_name().to_string(),
        })
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, InstanceError> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, InstanceError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| InstanceError::TypeMismatch {
                expected: "string".to_string(),
                got: value.kind_name().to_string(),
            })
    }
}

impl<T: Into<Value>> IntoValue for T {
    fn into_value(self) -> Value {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;

    fn board_registry() -> Registry {
        let mut reg = Registry::new();
        reg.register_enum("Side", &["RED", "BLACK"]).unwrap();
        reg.register(
            SchemaBuilder::new("Board")
                .field("turn", ScalarKind::I32)
                .field("score", ScalarKind::F64)
                .string_field("label")
                .enum_field("next", "Side")
                .list_field("cells", ScalarKind::I8)
                .map_field("captures", ScalarKind::I32, ScalarKind::I32)
                .object_field("last", "Board"),
        )
        .unwrap();
        reg
    }

    #[test]
    fn fresh_instance_has_schema_order_defaults() {
        let reg = board_registry();
        let inst = reg.instantiate("Board").unwrap();

        assert_eq!(inst.get::<i32>("turn").unwrap(), 0);
        assert_eq!(inst.get::<f64>("score").unwrap(), 0.0);
        assert_eq!(inst.get::<String>("label").unwrap(), "");
        assert_eq!(inst.get_field("next").unwrap().enum_name(), Some("RED"));
        assert_eq!(inst.get_field("cells").unwrap().as_list().unwrap().len(), 0);
        assert!(inst.get_field("last").unwrap().is_null());

        // Fields present in schema order.
        if let Value::Object { fields, .. } = inst.value() {
            let names: Vec<_> = fields.iter().map(|(n, _)| n.as_str()).collect();
            assert_eq!(
                names,
                vec!["turn", "score", "label", "next", "cells", "captures", "last"]
            );
        } else {
            panic!("expected object value");
        }
    }

    #[test]
    fn typed_get_set() {
        let reg = board_registry();
        let mut inst = reg.instantiate("Board").unwrap();

        inst.set("turn", 7i32).unwrap();
        inst.set("label", "midgame").unwrap();
        assert_eq!(inst.get::<i32>("turn").unwrap(), 7);
        assert_eq!(inst.get::<String>("label").unwrap(), "midgame");

        assert!(inst.set("missing", 1i32).is_err());
        assert!(inst.get::<String>("turn").is_err());
    }

    #[test]
    fn int_narrowing_checked() {
        let reg = board_registry();
        let mut inst = reg.instantiate("Board").unwrap();
        inst.set("turn", 300i32).unwrap();
        assert!(inst.get::<i8>("turn").is_err());
        assert_eq!(inst.get::<i64>("turn").unwrap(), 300);
    }
}
