// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema model: field type tags, per-type schemas, fluent builders and
//! the process-lifetime registry.

mod builder;
mod class;
mod field;
mod registry;

pub use builder::SchemaBuilder;
pub use class::{ClassSchema, CustomCodec};
pub use field::{FieldDescriptor, FieldType, ScalarKind};
pub use registry::{Registry, RegistryError};
