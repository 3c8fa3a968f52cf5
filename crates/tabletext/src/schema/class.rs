// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Immutable per-type schemas.

use crate::schema::field::FieldDescriptor;
use crate::value::Value;
use std::sync::Arc;

/// Escape hatch for types that opt out of schema-driven traversal and
/// carry their own compact payload (`TypeName "payload"` in the grammar).
///
/// The encoder and decoder check for this capability before introspecting
/// fields. The decode side reports failures as plain strings, which the
/// decoder wraps into a positioned decode error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomCodec {
    pub encode: fn(&Value) -> String,
    pub decode: fn(&str) -> Result<Value, String>,
}

/// Schema of one registered type: its name, optional base schema, and the
/// flattened, base-first field list.
///
/// Built once by [`Registry::register`](crate::Registry::register) and
/// immutable afterwards; shared via `Arc` for the process lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassSchema {
    type_name: String,
    base: Option<Arc<ClassSchema>>,
    /// Own plus inherited fields, base-first, omissions already applied.
    fields: Vec<FieldDescriptor>,
    custom: Option<CustomCodec>,
}

impl ClassSchema {
    pub(crate) fn new(
        type_name: String,
        base: Option<Arc<ClassSchema>>,
        fields: Vec<FieldDescriptor>,
        custom: Option<CustomCodec>,
    ) -> Self {
        Self {
            type_name,
            base,
            fields,
            custom,
        }
    }

    /// Fully-qualified registered type name (e.g. `checkers::Board`).
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Last `::` segment of the type name, used when qualifier stripping
    /// is enabled.
    pub fn short_name(&self) -> &str {
        self.type_name
            .rsplit("::")
            .next()
            .unwrap_or(&self.type_name)
    }

    /// Base schema, if this type extends another registered type.
    pub fn base(&self) -> Option<&Arc<ClassSchema>> {
        self.base.as_ref()
    }

    /// Flattened persisted fields in encode order (base-first).
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a field index by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Custom codec capability, if this type opts out of field traversal.
    pub fn custom(&self) -> Option<&CustomCodec> {
        self.custom.as_ref()
    }

    /// True when this schema is `name` or inherits from it.
    pub fn derives_from(&self, name: &str) -> bool {
        if self.type_name == name {
            return true;
        }
        let mut current = self.base.as_ref();
        while let Some(schema) = current {
            if schema.type_name == name {
                return true;
            }
            current = schema.base.as_ref();
        }
        false
    }
}
