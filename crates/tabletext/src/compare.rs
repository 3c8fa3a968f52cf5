// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Structural equality and checksums over value trees.
//!
//! Both walks agree on the same notion of identity: floats compare by
//! bit pattern (so NaN equals NaN and `-0.0` differs from `0.0`), maps
//! are order-insensitive, lists and object fields are positional. Two
//! trees that are `value_equals` always produce the same checksum.

use crate::instance::Instance;
use crate::value::Value;
use std::hash::{Hash, Hasher};

/// Structural equality of two instances.
pub fn deep_equals(a: &Instance, b: &Instance) -> bool {
    a.type_name() == b.type_name() && value_equals(a.value(), b.value())
}

/// 64-bit structural checksum of an instance.
pub fn checksum(instance: &Instance) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    instance.type_name().hash(&mut hasher);
    hash_value(instance.value(), &mut hasher);
    hasher.finish()
}

/// Structural equality of two value trees.
pub fn value_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x.to_bits() == y.to_bits(),
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Enum(x), Value::Enum(y)) => x == y,
        (Value::List(x), Value::List(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| value_equals(a, b))
        }
        (Value::Map(x), Value::Map(y)) => {
            // Entry order is an encoding artifact, not identity.
            // Containment holds both ways; hand-built maps may repeat
            // an entry.
            x.len() == y.len() && map_contains(x, y) && map_contains(y, x)
        }
        (
            Value::Object {
                type_name: tx,
                fields: fx,
            },
            Value::Object {
                type_name: ty,
                fields: fy,
            },
        ) => {
            tx == ty
                && fx.len() == fy.len()
                && fx
                    .iter()
                    .zip(fy)
                    .all(|((na, va), (nb, vb))| na == nb && value_equals(va, vb))
        }
        _ => false,
    }
}

fn map_contains(x: &[(Value, Value)], y: &[(Value, Value)]) -> bool {
    x.iter().all(|(k, v)| {
        y.iter()
            .any(|(k2, v2)| value_equals(k, k2) && value_equals(v, v2))
    })
}

fn hash_value<H: Hasher>(value: &Value, hasher: &mut H) {
    match value {
        Value::Null => 0u8.hash(hasher),
        Value::Bool(v) => {
            1u8.hash(hasher);
            v.hash(hasher);
        }
        Value::Int(v) => {
            2u8.hash(hasher);
            v.hash(hasher);
        }
        Value::Float(v) => {
            3u8.hash(hasher);
            v.to_bits().hash(hasher);
        }
        Value::Str(v) => {
            4u8.hash(hasher);
            v.hash(hasher);
        }
        Value::Enum(v) => {
            5u8.hash(hasher);
            v.hash(hasher);
        }
        Value::List(items) => {
            6u8.hash(hasher);
            items.len().hash(hasher);
            for item in items {
                hash_value(item, hasher);
            }
        }
        Value::Map(entries) => {
            // XOR of independently hashed entries keeps the digest
            // insensitive to entry order, matching `value_equals`.
            7u8.hash(hasher);
            entries.len().hash(hasher);
            let mut combined = 0u64;
            for (k, v) in entries {
                let mut entry = std::collections::hash_map::DefaultHasher::new();
                hash_value(k, &mut entry);
                hash_value(v, &mut entry);
                combined ^= entry.finish();
            }
            combined.hash(hasher);
        }
        Value::Object { type_name, fields } => {
            8u8.hash(hasher);
            type_name.hash(hasher);
            for (name, value) in fields {
                name.hash(hasher);
                hash_value(value, hasher);
            }
        }
    }
}
