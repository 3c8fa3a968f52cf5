// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic value tree: the intermediate form every codec stage operates over.
//!
//! A [`Value`] is what the encoder writes out as text, what the decoder
//! rebuilds from text, and what the diff/merge engines walk. Scalars carry
//! their parsed representation; composites nest recursively. `Object` keeps
//! its registered type tag so polymorphic fields can be resolved back to
//! the correct concrete schema on decode.

/// A dynamic value that can hold any persisted game-state shape.
///
/// Map entries and object fields are kept as insertion-ordered pairs so
/// encoded output is deterministic (full instances hold object fields in
/// schema order).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit null (reference field with no object, or removed map key
    /// inside a patch).
    Null,
    Bool(bool),
    /// All integer widths share one lane; the field's declared
    /// `ScalarKind` bounds it on decode.
    Int(i64),
    Float(f64),
    Str(String),
    /// Enum constant, stored by name.
    Enum(String),
    /// Arrays and ordered collections. Length is implicit; `Null`
    /// elements are legal and preserved (sparse arrays).
    List(Vec<Value>),
    /// Map entries as ordered pairs. Keys are scalar/string/enum values.
    Map(Vec<(Value, Value)>),
    /// Nested object with its concrete registered type name.
    Object {
        type_name: String,
        fields: Vec<(String, Value)>,
    },
}

impl Value {
    /// Check if value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Get enum constant name.
    pub fn enum_name(&self) -> Option<&str> {
        match self {
            Self::Enum(name) => Some(name),
            _ => None,
        }
    }

    /// Try to get as list slice.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as map entry slice.
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Get the concrete type tag of an object value.
    pub fn object_type(&self) -> Option<&str> {
        match self {
            Self::Object { type_name, .. } => Some(type_name),
            _ => None,
        }
    }

    /// Look up an object field by name.
    pub fn get_field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Object { fields, .. } => {
                fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// Look up a mutable object field by name.
    pub fn get_field_mut(&mut self, name: &str) -> Option<&mut Value> {
        match self {
            Self::Object { fields, .. } => {
                fields.iter_mut().find(|(n, _)| n == name).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// Set an object field, replacing in place to preserve field order.
    /// Returns false when this value is not an object.
    pub fn set_field(&mut self, name: &str, value: Value) -> bool {
        match self {
            Self::Object { fields, .. } => {
                if let Some(slot) = fields.iter_mut().find(|(n, _)| n == name) {
                    slot.1 = value;
                } else {
                    fields.push((name.to_string(), value));
                }
                true
            }
            _ => false,
        }
    }

    /// Look up a map entry by key.
    pub fn map_get(&self, key: &Value) -> Option<&Value> {
        match self {
            Self::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Insert or replace a map entry. Returns false when this value is
    /// not a map.
    pub fn map_insert(&mut self, key: Value, value: Value) -> bool {
        match self {
            Self::Map(entries) => {
                if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
                    slot.1 = value;
                } else {
                    entries.push((key, value));
                }
                true
            }
            _ => false,
        }
    }

    /// Remove a map entry by key. Returns false when the key was absent
    /// or this value is not a map.
    pub fn map_remove(&mut self, key: &Value) -> bool {
        match self {
            Self::Map(entries) => {
                let before = entries.len();
                entries.retain(|(k, _)| k != key);
                entries.len() != before
            }
            _ => false,
        }
    }

    /// Short shape name, used in error messages.
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Enum(_) => "enum",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Object { .. } => "object",
        }
    }
}

// Conversion impls for the common game-state primitives.
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Self::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_accessors() {
        let v = Value::from(42i32);
        assert_eq!(v.as_i64(), Some(42));
        assert_eq!(v.as_f64(), None);

        let v = Value::from("hello");
        assert_eq!(v.as_str(), Some("hello"));
        assert!(!v.is_null());
        assert!(Value::Null.is_null());
    }

    #[test]
    fn list_from_vec() {
        let v = Value::from(vec![1i32, 2, 3]);
        let list = v.as_list().expect("list");
        assert_eq!(list.len(), 3);
        assert_eq!(list[2].as_i64(), Some(3));
    }

    #[test]
    fn option_maps_to_null() {
        let v = Value::from(None::<i32>);
        assert!(v.is_null());
        let v = Value::from(Some(5i32));
        assert_eq!(v.as_i64(), Some(5));
    }

    #[test]
    fn object_field_access() {
        let mut v = Value::Object {
            type_name: "Point".to_string(),
            fields: vec![("x".to_string(), Value::Int(10))],
        };
        assert_eq!(v.object_type(), Some("Point"));
        assert_eq!(v.get_field("x").and_then(Value::as_i64), Some(10));
        assert!(v.get_field("y").is_none());

        v.set_field("x", Value::Int(11));
        v.set_field("y", Value::Int(20));
        assert_eq!(v.get_field("x").and_then(Value::as_i64), Some(11));
        assert_eq!(v.get_field("y").and_then(Value::as_i64), Some(20));
    }

    #[test]
    fn map_entry_access() {
        let mut v = Value::Map(vec![(Value::Int(0), Value::Int(1))]);
        assert_eq!(v.map_get(&Value::Int(0)).and_then(Value::as_i64), Some(1));

        assert!(v.map_insert(Value::Int(1), Value::Int(2)));
        assert_eq!(v.as_map().map(<[_]>::len), Some(2));

        assert!(v.map_remove(&Value::Int(0)));
        assert!(!v.map_remove(&Value::Int(0)));
        assert!(v.map_get(&Value::Int(0)).is_none());
    }

    #[test]
    fn enum_constant() {
        let v = Value::Enum("RED".to_string());
        assert_eq!(v.enum_name(), Some("RED"));
        assert_eq!(v.as_str(), None);
    }
}
