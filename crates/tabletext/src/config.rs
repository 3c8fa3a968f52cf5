// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Codec configuration.
//!
//! The two boundary toggles from the protocol design, carried as an
//! explicit value passed to encode/decode entry points rather than
//! process-global state. Save-file loading wants the lenient defaults;
//! strict network protocols flip `strict_unknown_fields` to catch schema
//! drift early.

/// Behavior toggles consumed at the codec boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecConfig {
    /// When set, a field name absent from the target schema is a decode
    /// error instead of being skipped.
    pub strict_unknown_fields: bool,
    /// When set, nested type tags are written without their `::`
    /// qualifiers and bare tags resolve by suffix, which stays portable across
    /// differently-organized builds of the same schema.
    pub strip_qualifiers: bool,
}

impl CodecConfig {
    /// Lenient defaults: unknown fields skipped, fully-qualified tags.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle strict unknown-field handling.
    pub fn strict_unknown_fields(mut self, on: bool) -> Self {
        self.strict_unknown_fields = on;
        self
    }

    /// Toggle qualifier stripping on type tags.
    pub fn strip_qualifiers(mut self, on: bool) -> Self {
        self.strip_qualifiers = on;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_lenient() {
        let config = CodecConfig::new();
        assert!(!config.strict_unknown_fields);
        assert!(!config.strip_qualifiers);
    }

    #[test]
    fn chained_setters() {
        let config = CodecConfig::new()
            .strict_unknown_fields(true)
            .strip_qualifiers(true);
        assert!(config.strict_unknown_fields);
        assert!(config.strip_qualifiers);
    }
}
