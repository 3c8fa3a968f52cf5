// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent schema declaration.
//!
//! A [`SchemaBuilder`] is the `registerAllFields` surface: registration
//! code hands it every persisted field in declaration order, then passes
//! the builder to [`Registry::register`](crate::Registry::register),
//! which validates and flattens the inheritance chain.

use crate::schema::class::CustomCodec;
use crate::schema::field::{FieldDescriptor, FieldType};

/// Builder describing one type's persisted fields before registration.
#[derive(Debug)]
pub struct SchemaBuilder {
    pub(crate) type_name: String,
    pub(crate) base: Option<String>,
    pub(crate) fields: Vec<FieldDescriptor>,
    pub(crate) omitted: Vec<String>,
    pub(crate) custom: Option<CustomCodec>,
}

impl SchemaBuilder {
    /// Start a schema for the named type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            base: None,
            fields: Vec::new(),
            omitted: Vec::new(),
            custom: None,
        }
    }

    /// Inherit the fields of an already-registered base type
    /// (base fields come first in encode order).
    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Add a field of any type.
    pub fn field(mut self, name: impl Into<String>, ty: impl Into<FieldType>) -> Self {
        self.fields.push(FieldDescriptor::new(name, ty));
        self
    }

    /// Add a string field.
    pub fn string_field(self, name: impl Into<String>) -> Self {
        self.field(name, FieldType::Str)
    }

    /// Add an enum field (the enum must be registered first).
    pub fn enum_field(self, name: impl Into<String>, enum_name: impl Into<String>) -> Self {
        self.field(name, FieldType::enumeration(enum_name))
    }

    /// Add a list/array field of the given element type.
    pub fn list_field(self, name: impl Into<String>, element: impl Into<FieldType>) -> Self {
        self.field(name, FieldType::list(element))
    }

    /// Add a map field.
    pub fn map_field(
        self,
        name: impl Into<String>,
        key: impl Into<FieldType>,
        value: impl Into<FieldType>,
    ) -> Self {
        self.field(name, FieldType::map(key, value))
    }

    /// Add a nested-object field of the named registered type (which may
    /// be a base type for polymorphic fields).
    pub fn object_field(self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.field(name, FieldType::object(type_name))
    }

    /// Suppress an inherited (or own) field from persistence.
    pub fn omit(mut self, name: impl Into<String>) -> Self {
        self.omitted.push(name.into());
        self
    }

    /// Opt this type out of schema traversal with its own encode/decode
    /// pair.
    pub fn custom(mut self, codec: CustomCodec) -> Self {
        self.custom = Some(codec);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::ScalarKind;

    #[test]
    fn fields_keep_declaration_order() {
        let b = SchemaBuilder::new("Board")
            .field("turn", ScalarKind::I32)
            .string_field("label")
            .list_field("cells", ScalarKind::I8)
            .map_field("scores", ScalarKind::I32, ScalarKind::I32)
            .object_field("last_move", "Move");

        let names: Vec<_> = b.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["turn", "label", "cells", "scores", "last_move"]);
    }

    #[test]
    fn extends_and_omit_recorded() {
        let b = SchemaBuilder::new("King")
            .extends("Piece")
            .field("crowned", ScalarKind::Bool)
            .omit("scratch");
        assert_eq!(b.base.as_deref(), Some("Piece"));
        assert_eq!(b.omitted, vec!["scratch"]);
    }
}
