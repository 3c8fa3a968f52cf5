// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema-driven text emission.
//!
//! Walks an instance's value tree in schema order and writes the line
//! grammar (see [`crate::text`]). Full instances always carry every
//! schema field, so full encodes are unambiguous about null vs absent;
//! the diff engine reuses the same writer on field-sparse objects.

use crate::config::CodecConfig;
use crate::instance::Instance;
use crate::schema::{ClassSchema, FieldType, Registry, ScalarKind};
use crate::value::Value;
use std::fmt;

/// Errors for text encoding (also produced by the diff engine, which is
/// an encoder-equivalent traversal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Value shape does not match the field's declared type.
    TypeMismatch {
        field: String,
        expected: String,
        got: String,
    },
    /// A field name not present in the schema.
    UnknownField { field: String },
    /// A nested object carries an unregistered type tag.
    UnknownType { field: String, type_name: String },
    /// A nested object's concrete type does not derive from the field's
    /// declared type.
    NotAssignable {
        field: String,
        declared: String,
        got: String,
    },
    /// Diff called with instances of two different schemas.
    SchemaMismatch { left: String, right: String },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch {
                field,
                expected,
                got,
            } => write!(
                f,
                "field '{}': expected {} value, got {}",
                field, expected, got
            ),
            Self::UnknownField { field } => write!(f, "field '{}' not in schema", field),
            Self::UnknownType { field, type_name } => {
                write!(f, "field '{}': unregistered type '{}'", field, type_name)
            }
            Self::NotAssignable {
                field,
                declared,
                got,
            } => write!(
                f,
                "field '{}': type '{}' is not a '{}'",
                field, got, declared
            ),
            Self::SchemaMismatch { left, right } => {
                write!(f, "cannot diff '{}' against '{}'", left, right)
            }
        }
    }
}

impl std::error::Error for EncodeError {}

/// Serialize an instance to the text grammar.
pub fn encode(
    instance: &Instance,
    registry: &Registry,
    config: &CodecConfig,
) -> Result<String, EncodeError> {
    let schema = instance.schema();
    if let Some(custom) = schema.custom() {
        // Escape-hatch types carry one opaque payload line.
        let payload = (custom.encode)(instance.value());
        return Ok(format!(
            "{} {}\n",
            type_tag(schema, config),
            quote(&payload)
        ));
    }
    match instance.value() {
        Value::Object { fields, .. } => render_document(schema, fields, registry, config),
        other => Err(EncodeError::TypeMismatch {
            field: schema.type_name().to_string(),
            expected: "object".to_string(),
            got: other.kind_name().to_string(),
        }),
    }
}

/// Render an object's present fields as a top-level document. Shared
/// with the diff engine, whose objects are field-sparse.
pub(crate) fn render_document(
    schema: &ClassSchema,
    fields: &[(String, Value)],
    registry: &Registry,
    config: &CodecConfig,
) -> Result<String, EncodeError> {
    let mut writer = Writer {
        out: String::new(),
        registry,
        config,
    };
    writer.write_fields(schema, fields, 0)?;
    Ok(writer.out)
}

fn type_tag<'a>(schema: &'a ClassSchema, config: &CodecConfig) -> &'a str {
    if config.strip_qualifiers {
        schema.short_name()
    } else {
        schema.type_name()
    }
}

struct Writer<'a> {
    out: String,
    registry: &'a Registry,
    config: &'a CodecConfig,
}

impl Writer<'_> {
    fn indent(&mut self, level: usize) {
        for _ in 0..level {
            self.out.push_str("  ");
        }
    }

    fn write_fields(
        &mut self,
        schema: &ClassSchema,
        fields: &[(String, Value)],
        level: usize,
    ) -> Result<(), EncodeError> {
        for (name, value) in fields {
            let descriptor = schema
                .field(name)
                .ok_or_else(|| EncodeError::UnknownField {
                    field: name.clone(),
                })?;
            self.indent(level);
            self.out.push_str(name);
            self.out.push('=');
            self.write_value(value, &descriptor.ty, name, level)?;
            self.out.push('\n');
        }
        Ok(())
    }

    fn write_value(
        &mut self,
        value: &Value,
        ty: &FieldType,
        field: &str,
        level: usize,
    ) -> Result<(), EncodeError> {
        if value.is_null() {
            // Scalars cannot be null; reference types carry the explicit
            // marker (omission is reserved for patches).
            if ty.is_reference() {
                self.out.push_str("null");
                return Ok(());
            }
            return Err(EncodeError::TypeMismatch {
                field: field.to_string(),
                expected: ty.kind_name().to_string(),
                got: "null".to_string(),
            });
        }

        match ty {
            FieldType::Scalar(kind) => self.write_scalar(value, *kind, field),
            FieldType::Str => match value {
                Value::Str(s) => {
                    self.out.push_str(&quote(s));
                    Ok(())
                }
                other => Err(self.mismatch(field, ty, other)),
            },
            FieldType::Enum(_) => match value {
                Value::Enum(constant) => {
                    self.out.push_str(constant);
                    Ok(())
                }
                other => Err(self.mismatch(field, ty, other)),
            },
            FieldType::List(element) => match value {
                Value::List(items) => {
                    if items.is_empty() {
                        self.out.push_str("[]");
                        return Ok(());
                    }
                    self.out.push_str("[ ");
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            self.out.push_str(", ");
                        }
                        if item.is_null() {
                            // Sparse array slots are legal for any
                            // element type.
                            self.out.push_str("null");
                        } else {
                            self.write_value(item, element, field, level)?;
                        }
                    }
                    self.out.push_str(" ]");
                    Ok(())
                }
                other => Err(self.mismatch(field, ty, other)),
            },
            FieldType::Map { key, value: val } => match value {
                Value::Map(entries) => {
                    if entries.is_empty() {
                        self.out.push_str("{}");
                        return Ok(());
                    }
                    self.out.push_str("{ ");
                    for (i, (k, v)) in entries.iter().enumerate() {
                        if i > 0 {
                            self.out.push_str(", ");
                        }
                        self.write_value(k, key, field, level)?;
                        self.out.push('=');
                        if v.is_null() {
                            // Only patches carry null map values (key
                            // removal); full instances never store them.
                            self.out.push_str("null");
                        } else {
                            self.write_value(v, val, field, level)?;
                        }
                    }
                    self.out.push_str(" }");
                    Ok(())
                }
                other => Err(self.mismatch(field, ty, other)),
            },
            FieldType::Object(declared) => self.write_object(value, declared, field, level),
            FieldType::Erased => Err(self.mismatch(field, ty, value)),
        }
    }

    fn write_scalar(
        &mut self,
        value: &Value,
        kind: ScalarKind,
        field: &str,
    ) -> Result<(), EncodeError> {
        match (value, kind) {
            (Value::Bool(v), ScalarKind::Bool) => {
                self.out.push_str(if *v { "true" } else { "false" });
                Ok(())
            }
            (Value::Int(v), ScalarKind::I8 | ScalarKind::I16 | ScalarKind::I32 | ScalarKind::I64) => {
                self.out.push_str(&v.to_string());
                Ok(())
            }
            (Value::Float(v), ScalarKind::F32 | ScalarKind::F64) => {
                self.out.push_str(&format_float(*v));
                Ok(())
            }
            (other, _) => Err(self.mismatch(field, &FieldType::Scalar(kind), other)),
        }
    }

    fn write_object(
        &mut self,
        value: &Value,
        declared: &str,
        field: &str,
        level: usize,
    ) -> Result<(), EncodeError> {
        // Custom-codec types delegate before any field introspection;
        // their stored value shape is opaque to the codec.
        if let Some(declared_schema) = self.registry.schema(declared) {
            if let Some(custom) = declared_schema.custom() {
                let payload = (custom.encode)(value);
                self.out.push_str(type_tag(declared_schema, self.config));
                self.out.push(' ');
                self.out.push_str(&quote(&payload));
                return Ok(());
            }
        }

        let Value::Object { type_name, fields } = value else {
            return Err(self.mismatch(field, &FieldType::object(declared), value));
        };
        let schema = self
            .registry
            .schema(type_name)
            .ok_or_else(|| EncodeError::UnknownType {
                field: field.to_string(),
                type_name: type_name.clone(),
            })?;
        if !schema.derives_from(declared) {
            return Err(EncodeError::NotAssignable {
                field: field.to_string(),
                declared: declared.to_string(),
                got: type_name.clone(),
            });
        }

        self.out.push_str(type_tag(schema, self.config));
        if fields.is_empty() {
            self.out.push_str(" {}");
            return Ok(());
        }
        self.out.push_str(" {\n");
        self.write_fields(schema, fields, level + 1)?;
        self.indent(level);
        self.out.push('}');
        Ok(())
    }

    fn mismatch(&self, field: &str, ty: &FieldType, value: &Value) -> EncodeError {
        EncodeError::TypeMismatch {
            field: field.to_string(),
            expected: ty.kind_name().to_string(),
            got: value.kind_name().to_string(),
        }
    }
}

/// Float literal form that survives a round trip (`{:?}` always keeps a
/// `.` or exponent, and spells non-finite values NaN/inf/-inf).
fn format_float(v: f64) -> String {
    format!("{:?}", v)
}

/// Quote and escape a string literal.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;

    fn registry() -> Registry {
        let mut reg = Registry::new();
        reg.register_enum("Side", &["RED", "BLACK"]).unwrap();
        reg.register(
            SchemaBuilder::new("Move")
                .field("from", ScalarKind::I32)
                .field("to", ScalarKind::I32),
        )
        .unwrap();
        reg.register(
            SchemaBuilder::new("Board")
                .field("turn", ScalarKind::I32)
                .field("rating", ScalarKind::F64)
                .field("active", ScalarKind::Bool)
                .string_field("label")
                .enum_field("next", "Side")
                .list_field("cells", FieldType::list(ScalarKind::I32))
                .map_field("captures", ScalarKind::I32, ScalarKind::I32)
                .object_field("last", "Move"),
        )
        .unwrap();
        reg
    }

    fn sample(reg: &Registry) -> Instance {
        let mut inst = reg.instantiate("Board").unwrap();
        inst.set("turn", 3i32).unwrap();
        inst.set("rating", 1.5f64).unwrap();
        inst.set("active", true).unwrap();
        inst.set("label", "mid \"game\"\n").unwrap();
        inst.set_value("next", Value::Enum("BLACK".to_string())).unwrap();
        inst.set_value(
            "cells",
            Value::List(vec![
                Value::List(vec![Value::Int(10), Value::Int(20)]),
                Value::List(vec![Value::Int(30)]),
            ]),
        )
        .unwrap();
        inst.set_value(
            "captures",
            Value::Map(vec![(Value::Int(0), Value::Int(2))]),
        )
        .unwrap();
        inst.set_value(
            "last",
            Value::Object {
                type_name: "Move".to_string(),
                fields: vec![
                    ("from".to_string(), Value::Int(12)),
                    ("to".to_string(), Value::Int(16)),
                ],
            },
        )
        .unwrap();
        inst
    }

    #[test]
    fn full_encode_grammar() {
        let reg = registry();
        let text = encode(&sample(&reg), &reg, &CodecConfig::new()).unwrap();
        let expected = "turn=3\n\
                        rating=1.5\n\
                        active=true\n\
                        label=\"mid \\\"game\\\"\\n\"\n\
                        next=BLACK\n\
                        cells=[ [ 10, 20 ], [ 30 ] ]\n\
                        captures={ 0=2 }\n\
                        last=Move {\n  from=12\n  to=16\n}\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn null_reference_fields_are_explicit() {
        let reg = registry();
        let inst = reg.instantiate("Board").unwrap();
        let text = encode(&inst, &reg, &CodecConfig::new()).unwrap();
        assert!(text.contains("last=null\n"));
        assert!(text.contains("cells=[]\n"));
        assert!(text.contains("captures={}\n"));
        assert!(text.contains("label=\"\"\n"));
    }

    #[test]
    fn null_scalar_rejected() {
        let reg = registry();
        let mut inst = reg.instantiate("Board").unwrap();
        inst.set_value("turn", Value::Null).unwrap();
        let err = encode(&inst, &reg, &CodecConfig::new()).unwrap_err();
        assert!(matches!(err, EncodeError::TypeMismatch { .. }));
    }

    #[test]
    fn sparse_list_nulls_preserved() {
        let reg = registry();
        let mut inst = reg.instantiate("Board").unwrap();
        inst.set_value(
            "cells",
            Value::List(vec![
                Value::Null,
                Value::List(vec![Value::Int(1)]),
                Value::Null,
            ]),
        )
        .unwrap();
        let text = encode(&inst, &reg, &CodecConfig::new()).unwrap();
        assert!(text.contains("cells=[ null, [ 1 ], null ]\n"));
    }

    #[test]
    fn unregistered_nested_type_rejected() {
        let reg = registry();
        let mut inst = reg.instantiate("Board").unwrap();
        inst.set_value(
            "last",
            Value::Object {
                type_name: "Ghost".to_string(),
                fields: Vec::new(),
            },
        )
        .unwrap();
        let err = encode(&inst, &reg, &CodecConfig::new()).unwrap_err();
        assert!(matches!(err, EncodeError::UnknownType { .. }));
    }

    #[test]
    fn float_literals_round_trippable() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(-0.25), "-0.25");
        assert_eq!(format_float(f64::NAN), "NaN");
        assert_eq!(format_float(f64::INFINITY), "inf");
    }

    #[test]
    fn qualifier_stripping_on_tags() {
        let mut reg = Registry::new();
        reg.register(
            SchemaBuilder::new("games::checkers::Move")
                .field("from", ScalarKind::I32),
        )
        .unwrap();
        reg.register(
            SchemaBuilder::new("games::checkers::Board")
                .object_field("last", "games::checkers::Move"),
        )
        .unwrap();

        let mut inst = reg.instantiate("games::checkers::Board").unwrap();
        inst.set_value(
            "last",
            Value::Object {
                type_name: "games::checkers::Move".to_string(),
                fields: vec![("from".to_string(), Value::Int(1))],
            },
        )
        .unwrap();

        let qualified = encode(&inst, &reg, &CodecConfig::new()).unwrap();
        assert!(qualified.contains("last=games::checkers::Move {"));

        let stripped =
            encode(&inst, &reg, &CodecConfig::new().strip_qualifiers(true)).unwrap();
        assert!(stripped.contains("last=Move {"));
    }
}
