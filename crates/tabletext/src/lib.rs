// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # tabletext - schema-driven text codec for game state
//!
//! A human-readable object-graph codec built around explicit schemas:
//! every persisted type registers its fields once at startup, and the
//! encoder, decoder, diff and merge engines all traverse that schema
//! rather than the data. The format is line-oriented `field=value` text,
//! diffable by eye and by the built-in patch engine.
//!
//! ## Quick Start
//!
//! ```rust
//! use tabletext::{CodecConfig, Registry, ScalarKind, SchemaBuilder};
//!
//! let mut registry = Registry::new();
//! registry.register(
//!     SchemaBuilder::new("Board")
//!         .field("turn", ScalarKind::I32)
//!         .string_field("label"),
//! )?;
//!
//! let config = CodecConfig::new();
//! let mut board = registry.instantiate("Board")?;
//! board.set("turn", 3i32)?;
//! board.set("label", "midgame")?;
//!
//! let text = tabletext::encode(&board, &registry, &config)?;
//! assert_eq!(text, "turn=3\nlabel=\"midgame\"\n");
//!
//! let decoded = tabletext::decode(&text, "Board", &registry, &config)?;
//! assert!(tabletext::deep_equals(&board, &decoded));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                         Registry                             |
//! |   SchemaBuilder -> ClassSchema (flattened inheritance)       |
//! +--------------------------------------------------------------+
//! |                      Value / Instance                        |
//! |   typed get/set over a dynamic tree, schema defaults         |
//! +--------------------------------------------------------------+
//! |                        Text codec                            |
//! |   encode | decode | diff | merge  (one grammar, one applier) |
//! +--------------------------------------------------------------+
//! |                        Comparison                            |
//! |   deep_equals | checksum  (shared identity rules)            |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Registry`] | Registered schemas and enums, type-tag resolution |
//! | [`SchemaBuilder`] | Declares one type's persisted fields |
//! | [`Instance`] | A typed value tree bound to its schema |
//! | [`Value`] | Dynamic node: scalar, string, enum, list, map, object |
//! | [`CodecConfig`] | Strict-unknown-fields and qualifier-stripping toggles |
//!
//! ## Patch Semantics
//!
//! [`diff`] emits only changed fields in the same grammar; [`merge`]
//! applies such a patch in place. Map entries upsert (`key=null`
//! removes), lists adopt the patch's length with per-element object
//! patches, and nested objects of the same concrete type patch field
//! by field. `merge(base, diff(base, target))` always converges to
//! structural equality with `target`.

pub mod compare;
pub mod config;
pub mod diff;
pub mod instance;
pub mod merge;
pub mod schema;
pub mod text;
pub mod value;

pub use compare::{checksum, deep_equals, value_equals};
pub use config::CodecConfig;
pub use diff::diff;
pub use instance::{Instance, InstanceError};
pub use merge::merge;
pub use schema::{
    ClassSchema, CustomCodec, FieldDescriptor, FieldType, Registry, RegistryError, ScalarKind,
    SchemaBuilder,
};
pub use text::{decode, decode_into, encode, DecodeError, EncodeError};
pub use value::Value;
