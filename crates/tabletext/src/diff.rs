// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sparse patch generation.
//!
//! `diff(base, target)` emits, in the document grammar, the smallest
//! field set that turns `base` into `target` when applied with
//! [`decode_into`](crate::text::decode_into). Equal instances diff to
//! the empty string.
//!
//! Patch shapes mirror the merge rules:
//! - changed scalars, strings and enums are rewritten in full;
//! - maps list only added or changed entries, plus `key=null` for
//!   removals;
//! - lists are written at the target's length, with same-typed object
//!   elements shrunk to per-element patches (`Tag {}` when unchanged);
//! - same-typed nested objects recurse; a type change or null
//!   transition writes the whole target object.

use crate::compare::value_equals;
use crate::config::CodecConfig;
use crate::instance::Instance;
use crate::schema::{ClassSchema, FieldType, Registry};
use crate::text::{encode, render_document, EncodeError};
use crate::value::Value;

/// Compute the textual patch that transforms `base` into `target`.
pub fn diff(
    base: &Instance,
    target: &Instance,
    registry: &Registry,
    config: &CodecConfig,
) -> Result<String, EncodeError> {
    if base.type_name() != target.type_name() {
        return Err(EncodeError::SchemaMismatch {
            left: base.type_name().to_string(),
            right: target.type_name().to_string(),
        });
    }
    if base.schema().custom().is_some() {
        // Opaque payloads have no field structure to narrow.
        if value_equals(base.value(), target.value()) {
            return Ok(String::new());
        }
        return encode(target, registry, config);
    }

    let differ = Differ { registry };
    let fields = differ.diff_object_fields(base.schema(), base.value(), target.value())?;
    if fields.is_empty() {
        return Ok(String::new());
    }
    log::debug!(
        "[diff] {}: {} of {} fields changed",
        base.type_name(),
        fields.len(),
        base.schema().fields().len()
    );
    render_document(base.schema(), &fields, registry, config)
}

struct Differ<'a> {
    registry: &'a Registry,
}

impl Differ<'_> {
    /// Sparse field list for two full objects of the same schema.
    fn diff_object_fields(
        &self,
        schema: &ClassSchema,
        base: &Value,
        target: &Value,
    ) -> Result<Vec<(String, Value)>, EncodeError> {
        let mut out = Vec::new();
        for descriptor in schema.fields() {
            let name = &descriptor.name;
            let b = base.get_field(name).unwrap_or(&Value::Null);
            let t = target.get_field(name).unwrap_or(&Value::Null);
            if value_equals(b, t) {
                continue;
            }
            out.push((name.clone(), self.diff_value(b, t, &descriptor.ty, name)?));
        }
        Ok(out)
    }

    fn diff_value(
        &self,
        base: &Value,
        target: &Value,
        ty: &FieldType,
        field: &str,
    ) -> Result<Value, EncodeError> {
        match ty {
            FieldType::Map { .. } => Ok(self.diff_map(base, target)),
            FieldType::List(element) => self.diff_list(base, target, element, field),
            FieldType::Object(_) => self.diff_nested(base, target, field),
            // Scalars, strings and enums rewrite in full.
            _ => Ok(target.clone()),
        }
    }

    /// Added and changed entries verbatim, removed keys as `key=null`.
    /// A target that is not a map (a null transition) is written
    /// wholesale, like lists and nested objects.
    fn diff_map(&self, base: &Value, target: &Value) -> Value {
        let empty: &[(Value, Value)] = &[];
        let base_entries = base.as_map().unwrap_or(empty);
        let Some(target_entries) = target.as_map() else {
            return target.clone();
        };

        let mut out = Vec::new();
        for (k, v) in target_entries {
            let changed = match base.map_get(k) {
                Some(existing) => !value_equals(existing, v),
                None => true,
            };
            if changed {
                out.push((k.clone(), v.clone()));
            }
        }
        for (k, _) in base_entries {
            if target.map_get(k).is_none() {
                out.push((k.clone(), Value::Null));
            }
        }
        Value::Map(out)
    }

    /// The patch carries the target's full length. Elements that are
    /// objects of the same concrete type on both sides shrink to an
    /// element patch; everything else is the target element verbatim.
    fn diff_list(
        &self,
        base: &Value,
        target: &Value,
        element: &FieldType,
        field: &str,
    ) -> Result<Value, EncodeError> {
        let empty: &[Value] = &[];
        let base_items = base.as_list().unwrap_or(empty);
        let Some(target_items) = target.as_list() else {
            return Ok(target.clone());
        };

        let mut out = Vec::with_capacity(target_items.len());
        for (i, t) in target_items.iter().enumerate() {
            let b = base_items.get(i).unwrap_or(&Value::Null);
            if matches!(element, FieldType::Object(_)) {
                out.push(self.diff_nested(b, t, field)?);
            } else {
                out.push(t.clone());
            }
        }
        Ok(Value::List(out))
    }

    /// Same concrete type on both sides recurses into a sparse object;
    /// any other transition writes the target wholesale.
    fn diff_nested(&self, base: &Value, target: &Value, field: &str) -> Result<Value, EncodeError> {
        let (Some(base_tag), Some(target_tag)) = (base.object_type(), target.object_type()) else {
            return Ok(target.clone());
        };
        if base_tag != target_tag {
            return Ok(target.clone());
        }
        let schema = self
            .registry
            .schema(target_tag)
            .ok_or_else(|| EncodeError::UnknownType {
                field: field.to_string(),
                type_name: target_tag.to_string(),
            })?;
        if schema.custom().is_some() {
            return Ok(target.clone());
        }
        let fields = self.diff_object_fields(schema, base, target)?;
        Ok(Value::Object {
            type_name: target_tag.to_string(),
            fields,
        })
    }
}
