// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-lifetime schema registry and type resolver.
//!
//! A [`Registry`] is an explicit value populated during single-threaded
//! startup (one `register` call per type, one `register_enum` per enum)
//! and read-only afterwards; callers share it behind `Arc` once
//! registration is complete. Registration fails closed: a malformed
//! schema is a structural program bug and is rejected immediately, never
//! deferred to first serialize.

use crate::instance::Instance;
use crate::schema::builder::SchemaBuilder;
use crate::schema::class::ClassSchema;
use crate::schema::field::FieldDescriptor;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Errors produced by schema/enum registration and type resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A field's component type is type-erased and cannot be encoded.
    ErasedComponent { type_name: String, field: String },
    /// The same field name appears twice in the flattened schema.
    DuplicateField { type_name: String, field: String },
    /// Map key type is not scalar/string/enum.
    InvalidMapKey { type_name: String, field: String },
    /// A field references an enum that has not been registered yet.
    EnumNotRegistered {
        type_name: String,
        field: String,
        enum_name: String,
    },
    /// `extends` names a type that has not been registered yet.
    UnknownBase { type_name: String, base: String },
    /// `omit` names a field absent from the flattened schema.
    UnknownOmit { type_name: String, field: String },
    /// Re-registration with a different shape than the existing schema.
    ConflictingRegistration(String),
    /// Enum re-registration with a different variant list.
    ConflictingEnum(String),
    /// Enum registered with no variants.
    EmptyEnum(String),
    /// Type name (or tag) not registered.
    UnknownType(String),
    /// A stripped type tag matches more than one registered type.
    AmbiguousType(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ErasedComponent { type_name, field } => write!(
                f,
                "{}.{}: component type is erased and cannot be persisted",
                type_name, field
            ),
            Self::DuplicateField { type_name, field } => {
                write!(f, "{}: duplicate field '{}'", type_name, field)
            }
            Self::InvalidMapKey { type_name, field } => write!(
                f,
                "{}.{}: map keys must be scalar, string or enum",
                type_name, field
            ),
            Self::EnumNotRegistered {
                type_name,
                field,
                enum_name,
            } => write!(
                f,
                "{}.{}: enum '{}' must be registered first",
                type_name, field, enum_name
            ),
            Self::UnknownBase { type_name, base } => {
                write!(f, "{}: unknown base type '{}'", type_name, base)
            }
            Self::UnknownOmit { type_name, field } => {
                write!(f, "{}: cannot omit unknown field '{}'", type_name, field)
            }
            Self::ConflictingRegistration(name) => write!(
                f,
                "type '{}' already registered with a different shape",
                name
            ),
            Self::ConflictingEnum(name) => write!(
                f,
                "enum '{}' already registered with different variants",
                name
            ),
            Self::EmptyEnum(name) => write!(f, "enum '{}' has no variants", name),
            Self::UnknownType(name) => write!(f, "unknown type '{}'", name),
            Self::AmbiguousType(name) => {
                write!(f, "type tag '{}' matches more than one registered type", name)
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// In-memory store of registered type schemas and enum variant tables.
#[derive(Debug, Default)]
pub struct Registry {
    schemas: HashMap<String, Arc<ClassSchema>>,
    enums: HashMap<String, Vec<String>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type from its builder.
    ///
    /// Validates every field, flattens the inheritance chain base-first,
    /// applies omissions, and caches the resulting immutable schema.
    /// Registering the identical shape again is a no-op that returns the
    /// cached schema; a different shape under the same name is an error.
    pub fn register(&mut self, builder: SchemaBuilder) -> Result<Arc<ClassSchema>, RegistryError> {
        let type_name = builder.type_name.clone();

        for field in &builder.fields {
            self.validate_field(&type_name, field)?;
        }

        let base = match &builder.base {
            Some(base_name) => Some(
                self.schemas
                    .get(base_name)
                    .cloned()
                    .ok_or_else(|| RegistryError::UnknownBase {
                        type_name: type_name.clone(),
                        base: base_name.clone(),
                    })?,
            ),
            None => None,
        };

        // Flatten: inherited fields first, own fields after.
        let mut fields: Vec<FieldDescriptor> = base
            .as_ref()
            .map(|b| b.fields().to_vec())
            .unwrap_or_default();
        fields.extend(builder.fields);

        for omitted in &builder.omitted {
            let before = fields.len();
            fields.retain(|f| f.name != *omitted);
            if fields.len() == before {
                return Err(RegistryError::UnknownOmit {
                    type_name,
                    field: omitted.clone(),
                });
            }
        }

        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(RegistryError::DuplicateField {
                    type_name,
                    field: field.name.clone(),
                });
            }
        }

        let schema = ClassSchema::new(type_name.clone(), base, fields, builder.custom);

        if let Some(existing) = self.schemas.get(&type_name) {
            if **existing == schema {
                return Ok(existing.clone());
            }
            return Err(RegistryError::ConflictingRegistration(type_name));
        }

        let schema = Arc::new(schema);
        log::trace!(
            "[registry] registered type {} ({} fields)",
            type_name,
            schema.fields().len()
        );
        self.schemas.insert(type_name, schema.clone());
        Ok(schema)
    }

    fn validate_field(
        &self,
        type_name: &str,
        field: &FieldDescriptor,
    ) -> Result<(), RegistryError> {
        if field.ty.contains_erased() {
            return Err(RegistryError::ErasedComponent {
                type_name: type_name.to_string(),
                field: field.name.clone(),
            });
        }
        if let crate::FieldType::Map { key, .. } = &field.ty {
            if !key.valid_map_key() {
                return Err(RegistryError::InvalidMapKey {
                    type_name: type_name.to_string(),
                    field: field.name.clone(),
                });
            }
        }
        let mut missing_enum = None;
        field.ty.for_each_enum(&mut |enum_name| {
            if missing_enum.is_none() && !self.enums.contains_key(enum_name) {
                missing_enum = Some(enum_name.to_string());
            }
        });
        if let Some(enum_name) = missing_enum {
            return Err(RegistryError::EnumNotRegistered {
                type_name: type_name.to_string(),
                field: field.name.clone(),
                enum_name,
            });
        }
        Ok(())
    }

    /// Register an enum's constant names. The first variant is the
    /// default for freshly constructed instances. Idempotent on the
    /// identical variant list.
    pub fn register_enum(
        &mut self,
        name: impl Into<String>,
        variants: &[&str],
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if variants.is_empty() {
            return Err(RegistryError::EmptyEnum(name));
        }
        let variants: Vec<String> = variants.iter().map(|v| (*v).to_string()).collect();
        if let Some(existing) = self.enums.get(&name) {
            if *existing == variants {
                return Ok(());
            }
            return Err(RegistryError::ConflictingEnum(name));
        }
        log::trace!(
            "[registry] registered enum {} ({} variants)",
            name,
            variants.len()
        );
        self.enums.insert(name, variants);
        Ok(())
    }

    /// Look up a schema by its exact registered name.
    pub fn schema(&self, type_name: &str) -> Option<&Arc<ClassSchema>> {
        self.schemas.get(type_name)
    }

    /// Look up an enum's variant names.
    pub fn enum_variants(&self, name: &str) -> Option<&[String]> {
        self.enums.get(name).map(Vec::as_slice)
    }

    /// Resolve a type tag read from encoded text.
    ///
    /// Exact match first; with `strip_qualifiers` a bare tag also matches
    /// a single registered type by its last `::` segment (more than one
    /// candidate is an error since the payload cannot be decoded safely).
    pub fn resolve(
        &self,
        tag: &str,
        strip_qualifiers: bool,
    ) -> Result<&Arc<ClassSchema>, RegistryError> {
        if let Some(schema) = self.schemas.get(tag) {
            return Ok(schema);
        }
        if strip_qualifiers && !tag.contains("::") {
            let mut found = None;
            for schema in self.schemas.values() {
                if schema.short_name() == tag {
                    if found.is_some() {
                        return Err(RegistryError::AmbiguousType(tag.to_string()));
                    }
                    found = Some(schema);
                }
            }
            if let Some(schema) = found {
                return Ok(schema);
            }
        }
        Err(RegistryError::UnknownType(tag.to_string()))
    }

    /// Construct a default-valued instance of a registered type.
    pub fn instantiate(&self, type_name: &str) -> Result<Instance, RegistryError> {
        let schema = self
            .schemas
            .get(type_name)
            .ok_or_else(|| RegistryError::UnknownType(type_name.to_string()))?;
        Ok(Instance::new(schema, self))
    }

    /// All registered type names, sorted for determinism.
    pub fn list_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered types.
    pub fn type_count(&self) -> usize {
        self.schemas.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::{FieldType, ScalarKind};

    #[test]
    fn register_and_lookup() {
        let mut reg = Registry::new();
        reg.register(
            SchemaBuilder::new("Point")
                .field("x", ScalarKind::I32)
                .field("y", ScalarKind::I32),
        )
        .unwrap();
        assert_eq!(reg.type_count(), 1);
        assert_eq!(reg.schema("Point").unwrap().fields().len(), 2);
    }

    #[test]
    fn reregister_identical_is_noop() {
        let mut reg = Registry::new();
        let first = reg
            .register(SchemaBuilder::new("Point").field("x", ScalarKind::I32))
            .unwrap();
        let second = reg
            .register(SchemaBuilder::new("Point").field("x", ScalarKind::I32))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reg.type_count(), 1);
    }

    #[test]
    fn reregister_different_shape_rejected() {
        let mut reg = Registry::new();
        reg.register(SchemaBuilder::new("Point").field("x", ScalarKind::I32))
            .unwrap();
        let err = reg
            .register(SchemaBuilder::new("Point").field("x", ScalarKind::I64))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::ConflictingRegistration("Point".to_string())
        );
    }

    #[test]
    fn erased_component_fails_closed() {
        let mut reg = Registry::new();
        let err = reg
            .register(SchemaBuilder::new("Bag").list_field("items", FieldType::Erased))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::ErasedComponent {
                type_name: "Bag".to_string(),
                field: "items".to_string(),
            }
        );
    }

    #[test]
    fn object_keyed_map_rejected() {
        let mut reg = Registry::new();
        let err = reg
            .register(SchemaBuilder::new("Bad").map_field(
                "lookup",
                FieldType::object("Point"),
                ScalarKind::I32,
            ))
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidMapKey { .. }));
    }

    #[test]
    fn enum_must_be_registered_first() {
        let mut reg = Registry::new();
        let err = reg
            .register(SchemaBuilder::new("Card").enum_field("suit", "Suit"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::EnumNotRegistered { .. }));

        reg.register_enum("Suit", &["HEARTS", "SPADES", "CLUBS", "DIAMONDS"])
            .unwrap();
        reg.register(SchemaBuilder::new("Card").enum_field("suit", "Suit"))
            .unwrap();
    }

    #[test]
    fn enum_nested_in_map_checked() {
        let mut reg = Registry::new();
        let err = reg
            .register(SchemaBuilder::new("Tally").map_field(
                "wins",
                FieldType::enumeration("Side"),
                ScalarKind::I32,
            ))
            .unwrap_err();
        assert!(matches!(err, RegistryError::EnumNotRegistered { .. }));
    }

    #[test]
    fn inheritance_flattens_base_first() {
        let mut reg = Registry::new();
        reg.register(SchemaBuilder::new("Piece").field("square", ScalarKind::I32))
            .unwrap();
        let king = reg
            .register(
                SchemaBuilder::new("King")
                    .extends("Piece")
                    .field("crowned", ScalarKind::Bool),
            )
            .unwrap();
        let names: Vec<_> = king.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["square", "crowned"]);
        assert!(king.derives_from("Piece"));
    }

    #[test]
    fn omit_suppresses_base_field() {
        let mut reg = Registry::new();
        reg.register(
            SchemaBuilder::new("Piece")
                .field("square", ScalarKind::I32)
                .field("cache", ScalarKind::I32),
        )
        .unwrap();
        let pawn = reg
            .register(
                SchemaBuilder::new("Pawn")
                    .extends("Piece")
                    .omit("cache")
                    .field("rank", ScalarKind::I8),
            )
            .unwrap();
        assert!(pawn.field("cache").is_none());
        assert!(pawn.field("square").is_some());
    }

    #[test]
    fn omit_unknown_field_rejected() {
        let mut reg = Registry::new();
        let err = reg
            .register(SchemaBuilder::new("Point").field("x", ScalarKind::I32).omit("z"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownOmit { .. }));
    }

    #[test]
    fn unknown_base_rejected() {
        let mut reg = Registry::new();
        let err = reg
            .register(SchemaBuilder::new("King").extends("Piece"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownBase { .. }));
    }

    #[test]
    fn duplicate_field_rejected() {
        let mut reg = Registry::new();
        let err = reg
            .register(
                SchemaBuilder::new("Point")
                    .field("x", ScalarKind::I32)
                    .field("x", ScalarKind::I32),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateField { .. }));
    }

    #[test]
    fn resolve_stripped_tag() {
        let mut reg = Registry::new();
        reg.register(SchemaBuilder::new("games::checkers::Board").field("turn", ScalarKind::I32))
            .unwrap();

        assert!(reg.resolve("games::checkers::Board", false).is_ok());
        assert!(reg.resolve("Board", false).is_err());
        assert_eq!(
            reg.resolve("Board", true).unwrap().type_name(),
            "games::checkers::Board"
        );

        reg.register(SchemaBuilder::new("games::chess::Board").field("turn", ScalarKind::I32))
            .unwrap();
        assert_eq!(
            reg.resolve("Board", true).unwrap_err(),
            RegistryError::AmbiguousType("Board".to_string())
        );
    }

    #[test]
    fn enum_registration_rules() {
        let mut reg = Registry::new();
        assert_eq!(
            reg.register_enum("Empty", &[]).unwrap_err(),
            RegistryError::EmptyEnum("Empty".to_string())
        );
        reg.register_enum("Side", &["RED", "BLACK"]).unwrap();
        reg.register_enum("Side", &["RED", "BLACK"]).unwrap();
        assert_eq!(
            reg.register_enum("Side", &["RED"]).unwrap_err(),
            RegistryError::ConflictingEnum("Side".to_string())
        );
        assert_eq!(
            reg.enum_variants("Side").map(<[_]>::len),
            Some(2)
        );
    }

    #[test]
    fn list_types_sorted() {
        let mut reg = Registry::new();
        reg.register(SchemaBuilder::new("Zebra").field("x", ScalarKind::I32))
            .unwrap();
        reg.register(SchemaBuilder::new("Alpha").field("x", ScalarKind::I32))
            .unwrap();
        assert_eq!(reg.list_types(), vec!["Alpha", "Zebra"]);
    }
}
