// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Patch application.
//!
//! A merge is the dual of [`diff`](crate::diff::diff): applying
//! `diff(base, target)` onto `base` makes it structurally equal to
//! `target`. The heavy lifting lives in the decoder's applier, shared
//! with full decodes; this entry point exists so callers read
//! `merge(&mut state, patch, ...)` at the call site.

use crate::config::CodecConfig;
use crate::instance::Instance;
use crate::schema::Registry;
use crate::text::{decode_into, DecodeError};

/// Apply an encoded patch (or full document) onto an existing instance.
pub fn merge(
    instance: &mut Instance,
    patch: &str,
    registry: &Registry,
    config: &CodecConfig,
) -> Result<(), DecodeError> {
    decode_into(instance, patch, registry, config)
}
