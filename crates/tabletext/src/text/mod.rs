// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The line-oriented text grammar and its codec.
//!
//! A document is a sequence of `field=value` assignments. Values:
//!
//! ```text
//! turn=3                      integer scalar
//! rating=1.5                  float scalar (NaN / inf / -inf spelled bare)
//! active=true                 bool
//! label="two\nlines"          quoted string, escapes \" \\ \n \t \r
//! next=BLACK                  enum constant
//! last=Move { from=12 to=16 } nested object, tagged with its concrete type
//! cells=[ 1, 2, null ]        list; null marks an empty slot
//! captures={ 0=2, 5=1 }       map (a brace block with no type tag)
//! last=null                   explicit null reference
//! stamp=Clock "14:02:07"      custom-codec type with an opaque payload
//! ```
//!
//! Whitespace and newlines are insignificant outside string literals;
//! commas are optional separators. Patches produced by the diff engine
//! use the same grammar with fields omitted, so one parser serves both
//! full decode and merge.

mod decode;
mod encode;

pub use decode::{decode, decode_into, DecodeError};
pub use encode::{encode, EncodeError};

pub(crate) use encode::render_document;
