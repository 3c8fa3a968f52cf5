// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Text parsing and patch application.
//!
//! Decoding runs in two stages. A hand-written lexer/recursive-descent
//! parser turns the input into an untyped [`Node`] tree, then the
//! applier walks the tree against the target schema and writes typed
//! values into a base instance. Full decodes and merges share the
//! applier: a full decode is a patch applied to a default-valued
//! instance, which keeps the tolerant-decode semantics (missing fields
//! keep their defaults) in one place.

use crate::config::CodecConfig;
use crate::instance::{default_value, Instance};
use crate::schema::{ClassSchema, FieldType, Registry, RegistryError, ScalarKind};
use crate::value::Value;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::Arc;

/// Errors produced while parsing or applying encoded text. Every
/// variant carries the 1-based input line it was detected on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Malformed input text.
    Syntax { line: usize, message: String },
    /// A type tag that resolves to no registered type.
    UnknownType { line: usize, type_name: String },
    /// A bare type tag matching more than one registered type.
    AmbiguousType { line: usize, type_name: String },
    /// A field name absent from the schema, in strict mode.
    UnknownField { line: usize, field: String },
    /// A value whose shape does not match the field's declared type.
    TypeMismatch {
        line: usize,
        field: String,
        expected: String,
        got: String,
    },
    /// An integer literal outside the field's scalar width.
    IntOutOfRange {
        line: usize,
        field: String,
        value: i64,
    },
    /// An identifier that is not a constant of the field's enum.
    UnknownEnumConstant {
        line: usize,
        field: String,
        constant: String,
    },
    /// A nested object whose concrete type does not derive from the
    /// field's declared type.
    NotAssignable {
        line: usize,
        field: String,
        declared: String,
        got: String,
    },
    /// A custom codec rejected its payload.
    CustomCodec {
        line: usize,
        type_name: String,
        message: String,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax { line, message } => write!(f, "line {}: {}", line, message),
            Self::UnknownType { line, type_name } => {
                write!(f, "line {}: unknown type '{}'", line, type_name)
            }
            Self::AmbiguousType { line, type_name } => {
                write!(f, "line {}: ambiguous type tag '{}'", line, type_name)
            }
            Self::UnknownField { line, field } => {
                write!(f, "line {}: unknown field '{}'", line, field)
            }
            Self::TypeMismatch {
                line,
                field,
                expected,
                got,
            } => write!(
                f,
                "line {}: field '{}': expected {}, got {}",
                line, field, expected, got
            ),
            Self::IntOutOfRange { line, field, value } => {
                write!(f, "line {}: field '{}': {} out of range", line, field, value)
            }
            Self::UnknownEnumConstant {
                line,
                field,
                constant,
            } => write!(
                f,
                "line {}: field '{}': unknown enum constant '{}'",
                line, field, constant
            ),
            Self::NotAssignable {
                line,
                field,
                declared,
                got,
            } => write!(
                f,
                "line {}: field '{}': type '{}' is not a '{}'",
                line, field, got, declared
            ),
            Self::CustomCodec {
                line,
                type_name,
                message,
            } => write!(f, "line {}: custom codec for '{}': {}", line, type_name, message),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decode a full document into a fresh instance of the named type.
///
/// Fields absent from the text keep their schema defaults, so text
/// written against an older schema still decodes.
pub fn decode(
    text: &str,
    type_name: &str,
    registry: &Registry,
    config: &CodecConfig,
) -> Result<Instance, DecodeError> {
    let schema = registry
        .schema(type_name)
        .ok_or_else(|| DecodeError::UnknownType {
            line: 0,
            type_name: type_name.to_string(),
        })?
        .clone();
    let mut instance = Instance::new(&schema, registry);
    decode_into(&mut instance, text, registry, config)?;
    Ok(instance)
}

/// Apply encoded text onto an existing instance in place.
///
/// This is the merge primitive: only the fields present in the text are
/// touched. Nested objects of the same concrete type are patched field
/// by field; a tag naming a different type replaces the object with a
/// default-valued one before the patch applies. Map entries upsert,
/// with a `null` value removing the key. Lists adopt the patch's
/// length, element patches applying over the retained prefix.
pub fn decode_into(
    instance: &mut Instance,
    text: &str,
    registry: &Registry,
    config: &CodecConfig,
) -> Result<(), DecodeError> {
    let applier = Applier { registry, config };
    if instance.schema().custom().is_some() {
        let mut parser = Parser::new(text);
        let (tag, payload, line) = parser.parse_custom_document()?;
        let schema = applier.resolve(&tag, line)?.clone();
        if schema.type_name() != instance.type_name() {
            return Err(DecodeError::NotAssignable {
                line,
                field: tag,
                declared: instance.type_name().to_string(),
                got: schema.type_name().to_string(),
            });
        }
        let value = applier.run_custom(&schema, &payload, line)?;
        *instance.value_mut() = value;
        return Ok(());
    }

    let mut parser = Parser::new(text);
    let fields = parser.parse_document()?;
    let schema = instance.schema().clone();
    applier.apply_fields(&schema, instance.value_mut(), fields)
}

// ---------------------------------------------------------------------------
// Untyped parse tree

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Bare identifier: an enum constant.
    Ident(String),
    List(Vec<Node>),
    Map(Vec<(Node, Node)>),
    Object {
        tag: String,
        fields: Vec<(String, Node, usize)>,
    },
    /// `Tag "payload"` custom-codec form.
    Custom { tag: String, payload: String },
}

impl Node {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Ident(_) => "identifier",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Object { .. } => "object",
            Self::Custom { .. } => "custom payload",
        }
    }
}

// ---------------------------------------------------------------------------
// Lexer

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Eq,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Ident(s) => format!("'{}'", s),
            Self::Int(v) => format!("'{}'", v),
            Self::Float(v) => format!("'{:?}'", v),
            Self::Str(_) => "string literal".to_string(),
            Self::Eq => "'='".to_string(),
            Self::LBrace => "'{'".to_string(),
            Self::RBrace => "'}'".to_string(),
            Self::LBracket => "'['".to_string(),
            Self::RBracket => "']'".to_string(),
            Self::Comma => "','".to_string(),
        }
    }
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
        }
    }

    fn syntax(&self, message: impl Into<String>) -> DecodeError {
        DecodeError::Syntax {
            line: self.line,
            message: message.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch == '\n' {
                self.line += 1;
                self.chars.next();
            } else if ch.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
    }

    /// Next token, or `None` at end of input. Newlines are whitespace;
    /// the grammar is brace- and comma-delimited.
    fn next_token(&mut self) -> Result<Option<Token>, DecodeError> {
        self.skip_whitespace();
        let Some(&ch) = self.chars.peek() else {
            return Ok(None);
        };
        let token = match ch {
            '=' => {
                self.chars.next();
                Token::Eq
            }
            '{' => {
                self.chars.next();
                Token::LBrace
            }
            '}' => {
                self.chars.next();
                Token::RBrace
            }
            '[' => {
                self.chars.next();
                Token::LBracket
            }
            ']' => {
                self.chars.next();
                Token::RBracket
            }
            ',' => {
                self.chars.next();
                Token::Comma
            }
            '"' => self.lex_string()?,
            '-' | '0'..='9' => self.lex_number()?,
            c if is_ident_start(c) => self.lex_ident(),
            other => return Err(self.syntax(format!("unexpected character '{}'", other))),
        };
        Ok(Some(token))
    }

    fn lex_string(&mut self) -> Result<Token, DecodeError> {
        self.chars.next(); // opening quote
        let mut out = String::new();
        loop {
            match self.chars.next() {
                None => return Err(self.syntax("unterminated string literal")),
                Some('"') => return Ok(Token::Str(out)),
                Some('\\') => match self.chars.next() {
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(other) => {
                        return Err(self.syntax(format!("invalid escape '\\{}'", other)))
                    }
                    None => return Err(self.syntax("unterminated string literal")),
                },
                Some('\n') => {
                    // Raw newlines must be escaped; reaching one means
                    // the closing quote is missing.
                    return Err(self.syntax("unterminated string literal"));
                }
                Some(other) => out.push(other),
            }
        }
    }

    fn lex_number(&mut self) -> Result<Token, DecodeError> {
        let mut raw = String::new();
        if self.chars.peek() == Some(&'-') {
            raw.push('-');
            self.chars.next();
            // `-inf` lexes as a negative float, not minus-identifier.
            if self.chars.peek() == Some(&'i') {
                let ident = self.lex_ident_text();
                if ident == "inf" {
                    return Ok(Token::Float(f64::NEG_INFINITY));
                }
                return Err(self.syntax(format!("unexpected '-{}'", ident)));
            }
        }
        let mut is_float = false;
        while let Some(&ch) = self.chars.peek() {
            match ch {
                '0'..='9' => raw.push(ch),
                '.' | 'e' | 'E' => {
                    is_float = true;
                    raw.push(ch);
                }
                '+' | '-' if raw.ends_with(['e', 'E']) => raw.push(ch),
                _ => break,
            }
            self.chars.next();
        }
        if is_float {
            raw.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| self.syntax(format!("invalid float literal '{}'", raw)))
        } else {
            raw.parse::<i64>()
                .map(Token::Int)
                .map_err(|_| self.syntax(format!("invalid integer literal '{}'", raw)))
        }
    }

    fn lex_ident(&mut self) -> Token {
        let text = self.lex_ident_text();
        Token::Ident(text)
    }

    fn lex_ident_text(&mut self) -> String {
        let mut out = String::new();
        while let Some(&ch) = self.chars.peek() {
            if is_ident_continue(ch) {
                out.push(ch);
                self.chars.next();
            } else {
                break;
            }
        }
        out
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

/// Identifiers cover field names, enum constants and qualified type
/// tags, so path separators are part of the token.
fn is_ident_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == ':' || ch == '.'
}

// ---------------------------------------------------------------------------
// Parser

struct Parser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Option<Token>>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            lexer: Lexer::new(input),
            peeked: None,
        }
    }

    fn line(&self) -> usize {
        self.lexer.line
    }

    fn syntax(&self, message: impl Into<String>) -> DecodeError {
        DecodeError::Syntax {
            line: self.lexer.line,
            message: message.into(),
        }
    }

    fn peek(&mut self) -> Result<Option<&Token>, DecodeError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token()?);
        }
        Ok(self.peeked.as_ref().and_then(Option::as_ref))
    }

    fn next(&mut self) -> Result<Option<Token>, DecodeError> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.lexer.next_token(),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), DecodeError> {
        match self.next()? {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(self.syntax(format!(
                "expected {}, found {}",
                expected.describe(),
                token.describe()
            ))),
            None => Err(self.syntax(format!(
                "expected {}, found end of input",
                expected.describe()
            ))),
        }
    }

    /// Top-level document: a field list running to end of input.
    fn parse_document(&mut self) -> Result<Vec<(String, Node, usize)>, DecodeError> {
        let fields = self.parse_fields(None)?;
        match self.next()? {
            None => Ok(fields),
            Some(token) => Err(self.syntax(format!("unexpected {}", token.describe()))),
        }
    }

    /// Top-level custom-codec document: `Tag "payload"`.
    fn parse_custom_document(&mut self) -> Result<(String, String, usize), DecodeError> {
        let line = self.line();
        let tag = match self.next()? {
            Some(Token::Ident(tag)) => tag,
            other => {
                return Err(self.syntax(format!(
                    "expected type tag, found {}",
                    describe_opt(other.as_ref())
                )))
            }
        };
        let payload = match self.next()? {
            Some(Token::Str(payload)) => payload,
            other => {
                return Err(self.syntax(format!(
                    "expected payload string, found {}",
                    describe_opt(other.as_ref())
                )))
            }
        };
        match self.next()? {
            None => Ok((tag, payload, line)),
            Some(token) => Err(self.syntax(format!("unexpected {}", token.describe()))),
        }
    }

    /// `name=value` sequence, optionally comma-separated, until the
    /// terminator token (or end of input when `terminator` is `None`).
    fn parse_fields(
        &mut self,
        terminator: Option<&Token>,
    ) -> Result<Vec<(String, Node, usize)>, DecodeError> {
        let mut fields = Vec::new();
        loop {
            while self.peek()? == Some(&Token::Comma) {
                self.next()?;
            }
            match self.peek()? {
                None => break,
                Some(token) if Some(token) == terminator => break,
                Some(Token::Ident(_)) => {}
                Some(token) => {
                    let found = token.describe();
                    return Err(self.syntax(format!("expected field name, found {}", found)));
                }
            }
            let line = self.line();
            let Some(Token::Ident(name)) = self.next()? else {
                unreachable!("peeked an identifier");
            };
            self.expect(Token::Eq)?;
            let value = self.parse_value()?;
            fields.push((name, value, line));
        }
        Ok(fields)
    }

    fn parse_value(&mut self) -> Result<Node, DecodeError> {
        match self.next()? {
            Some(Token::Int(v)) => Ok(Node::Int(v)),
            Some(Token::Float(v)) => Ok(Node::Float(v)),
            Some(Token::Str(s)) => Ok(Node::Str(s)),
            Some(Token::LBracket) => self.parse_list(),
            Some(Token::LBrace) => self.parse_map(),
            Some(Token::Ident(id)) => self.parse_ident_value(id),
            other => Err(self.syntax(format!(
                "expected value, found {}",
                describe_opt(other.as_ref())
            ))),
        }
    }

    /// Keywords, enum constants, `Tag { ... }` objects and
    /// `Tag "payload"` custom forms all start with an identifier.
    fn parse_ident_value(&mut self, id: String) -> Result<Node, DecodeError> {
        match id.as_str() {
            "null" => return Ok(Node::Null),
            "true" => return Ok(Node::Bool(true)),
            "false" => return Ok(Node::Bool(false)),
            "NaN" => return Ok(Node::Float(f64::NAN)),
            "inf" => return Ok(Node::Float(f64::INFINITY)),
            _ => {}
        }
        match self.peek()? {
            Some(Token::LBrace) => {
                self.next()?;
                let fields = self.parse_fields(Some(&Token::RBrace))?;
                self.expect(Token::RBrace)?;
                Ok(Node::Object { tag: id, fields })
            }
            Some(Token::Str(_)) => {
                let Some(Token::Str(payload)) = self.next()? else {
                    unreachable!("peeked a string literal");
                };
                Ok(Node::Custom { tag: id, payload })
            }
            _ => Ok(Node::Ident(id)),
        }
    }

    fn parse_list(&mut self) -> Result<Node, DecodeError> {
        let mut items = Vec::new();
        loop {
            while self.peek()? == Some(&Token::Comma) {
                self.next()?;
            }
            match self.peek()? {
                Some(Token::RBracket) => {
                    self.next()?;
                    return Ok(Node::List(items));
                }
                None => return Err(self.syntax("unterminated list")),
                _ => items.push(self.parse_value()?),
            }
        }
    }

    /// A bare brace block is a map; `Tag { ... }` objects are consumed
    /// by [`Self::parse_ident_value`] before reaching here.
    fn parse_map(&mut self) -> Result<Node, DecodeError> {
        let mut entries = Vec::new();
        loop {
            while self.peek()? == Some(&Token::Comma) {
                self.next()?;
            }
            match self.peek()? {
                Some(Token::RBrace) => {
                    self.next()?;
                    return Ok(Node::Map(entries));
                }
                None => return Err(self.syntax("unterminated map")),
                _ => {
                    let key = self.parse_value()?;
                    self.expect(Token::Eq)?;
                    let value = self.parse_value()?;
                    entries.push((key, value));
                }
            }
        }
    }
}

fn describe_opt(token: Option<&Token>) -> String {
    match token {
        Some(t) => t.describe(),
        None => "end of input".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Applier

struct Applier<'a> {
    registry: &'a Registry,
    config: &'a CodecConfig,
}

impl Applier<'_> {
    fn resolve(&self, tag: &str, line: usize) -> Result<&Arc<ClassSchema>, DecodeError> {
        self.registry
            .resolve(tag, self.config.strip_qualifiers)
            .map_err(|err| match err {
                RegistryError::AmbiguousType(name) => DecodeError::AmbiguousType {
                    line,
                    type_name: name,
                },
                _ => DecodeError::UnknownType {
                    line,
                    type_name: tag.to_string(),
                },
            })
    }

    fn run_custom(
        &self,
        schema: &ClassSchema,
        payload: &str,
        line: usize,
    ) -> Result<Value, DecodeError> {
        let codec = schema
            .custom()
            .ok_or_else(|| DecodeError::TypeMismatch {
                line,
                field: schema.type_name().to_string(),
                expected: "object".to_string(),
                got: "custom payload".to_string(),
            })?;
        (codec.decode)(payload).map_err(|message| DecodeError::CustomCodec {
            line,
            type_name: schema.type_name().to_string(),
            message,
        })
    }

    fn apply_fields(
        &self,
        schema: &ClassSchema,
        target: &mut Value,
        fields: Vec<(String, Node, usize)>,
    ) -> Result<(), DecodeError> {
        for (name, node, line) in fields {
            let Some(descriptor) = schema.field(&name) else {
                if self.config.strict_unknown_fields {
                    return Err(DecodeError::UnknownField { line, field: name });
                }
                log::debug!("[decode] skipping unknown field '{}' (line {})", name, line);
                continue;
            };
            let Some(slot) = target.get_field_mut(&name) else {
                // Base values are always built from the schema, so every
                // declared field has a slot.
                return Err(DecodeError::UnknownField { line, field: name });
            };
            self.apply_value(slot, node, &descriptor.ty, &name, line)?;
        }
        Ok(())
    }

    fn apply_value(
        &self,
        slot: &mut Value,
        node: Node,
        ty: &FieldType,
        field: &str,
        line: usize,
    ) -> Result<(), DecodeError> {
        if node == Node::Null {
            if ty.is_reference() {
                *slot = Value::Null;
                return Ok(());
            }
            return Err(self.mismatch(field, ty, &node, line));
        }

        match ty {
            FieldType::Scalar(kind) => self.apply_scalar(slot, node, *kind, field, line),
            FieldType::Str => match node {
                Node::Str(s) => {
                    *slot = Value::Str(s);
                    Ok(())
                }
                other => Err(self.mismatch(field, ty, &other, line)),
            },
            FieldType::Enum(enum_name) => match node {
                Node::Ident(constant) => {
                    let known = self
                        .registry
                        .enum_variants(enum_name)
                        .is_some_and(|variants| variants.iter().any(|v| v == &constant));
                    if !known {
                        return Err(DecodeError::UnknownEnumConstant {
                            line,
                            field: field.to_string(),
                            constant,
                        });
                    }
                    *slot = Value::Enum(constant);
                    Ok(())
                }
                other => Err(self.mismatch(field, ty, &other, line)),
            },
            FieldType::List(element) => match node {
                Node::List(items) => self.apply_list(slot, items, element, field, line),
                other => Err(self.mismatch(field, ty, &other, line)),
            },
            FieldType::Map { key, value } => match node {
                Node::Map(entries) => self.apply_map(slot, entries, key, value, field, line),
                other => Err(self.mismatch(field, ty, &other, line)),
            },
            FieldType::Object(declared) => self.apply_object(slot, node, declared, field, line),
            FieldType::Erased => Err(self.mismatch(field, ty, &node, line)),
        }
    }

    fn apply_scalar(
        &self,
        slot: &mut Value,
        node: Node,
        kind: ScalarKind,
        field: &str,
        line: usize,
    ) -> Result<(), DecodeError> {
        match (node, kind) {
            (Node::Bool(v), ScalarKind::Bool) => {
                *slot = Value::Bool(v);
                Ok(())
            }
            (Node::Int(v), _) if kind.int_bounds().is_some() => {
                let (min, max) = kind.int_bounds().unwrap_or((i64::MIN, i64::MAX));
                if v < min || v > max {
                    return Err(DecodeError::IntOutOfRange {
                        line,
                        field: field.to_string(),
                        value: v,
                    });
                }
                *slot = Value::Int(v);
                Ok(())
            }
            (Node::Float(v), ScalarKind::F32 | ScalarKind::F64) => {
                *slot = Value::Float(v);
                Ok(())
            }
            // Whole-valued float fields may have been written as bare
            // integers by other producers.
            (Node::Int(v), ScalarKind::F32 | ScalarKind::F64) => {
                *slot = Value::Float(v as f64);
                Ok(())
            }
            (other, _) => Err(self.mismatch(field, &FieldType::Scalar(kind), &other, line)),
        }
    }

    /// The list adopts the patch's length. Retained elements serve as
    /// the base for per-element patches, so an empty `Tag {}` element
    /// means "unchanged"; new positions start from the element default.
    fn apply_list(
        &self,
        slot: &mut Value,
        items: Vec<Node>,
        element: &FieldType,
        field: &str,
        line: usize,
    ) -> Result<(), DecodeError> {
        let mut old = match std::mem::replace(slot, Value::Null) {
            Value::List(items) => items,
            _ => Vec::new(),
        };
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            if item == Node::Null {
                // Null slots are legal in lists of any element type.
                out.push(Value::Null);
                continue;
            }
            let mut base = if i < old.len() {
                std::mem::replace(&mut old[i], Value::Null)
            } else {
                default_value(element, self.registry)
            };
            self.apply_value(&mut base, item, element, field, line)?;
            out.push(base);
        }
        *slot = Value::List(out);
        Ok(())
    }

    /// Map entries upsert; a `null` value removes the key. Entries not
    /// named in the patch are untouched.
    fn apply_map(
        &self,
        slot: &mut Value,
        entries: Vec<(Node, Node)>,
        key_ty: &FieldType,
        value_ty: &FieldType,
        field: &str,
        line: usize,
    ) -> Result<(), DecodeError> {
        if !matches!(slot, Value::Map(_)) {
            *slot = Value::Map(Vec::new());
        }
        for (key_node, value_node) in entries {
            if key_node == Node::Null {
                return Err(self.mismatch(field, key_ty, &key_node, line));
            }
            let mut key = Value::Null;
            self.apply_value(&mut key, key_node, key_ty, field, line)?;
            if value_node == Node::Null {
                slot.map_remove(&key);
                continue;
            }
            let mut base = slot.map_get(&key).cloned().unwrap_or(Value::Null);
            self.apply_value(&mut base, value_node, value_ty, field, line)?;
            slot.map_insert(key, base);
        }
        Ok(())
    }

    /// Nested objects patch in place when the tag names the current
    /// concrete type; a different (assignable) tag replaces the object
    /// with fresh defaults first, so stale fields of the old type never
    /// leak through.
    fn apply_object(
        &self,
        slot: &mut Value,
        node: Node,
        declared: &str,
        field: &str,
        line: usize,
    ) -> Result<(), DecodeError> {
        match node {
            Node::Object { tag, fields } => {
                let schema = self.resolve(&tag, line)?.clone();
                if !schema.derives_from(declared) {
                    return Err(DecodeError::NotAssignable {
                        line,
                        field: field.to_string(),
                        declared: declared.to_string(),
                        got: schema.type_name().to_string(),
                    });
                }
                let same_type = matches!(
                    slot,
                    Value::Object { type_name, .. } if type_name == schema.type_name()
                );
                if !same_type {
                    *slot = Instance::new(&schema, self.registry).into_value();
                }
                self.apply_fields(&schema, slot, fields)
            }
            Node::Custom { tag, payload } => {
                let schema = self.resolve(&tag, line)?.clone();
                if !schema.derives_from(declared) {
                    return Err(DecodeError::NotAssignable {
                        line,
                        field: field.to_string(),
                        declared: declared.to_string(),
                        got: schema.type_name().to_string(),
                    });
                }
                *slot = self.run_custom(&schema, &payload, line)?;
                Ok(())
            }
            other => Err(self.mismatch(field, &FieldType::object(declared), &other, line)),
        }
    }

    fn mismatch(&self, field: &str, ty: &FieldType, node: &Node, line: usize) -> DecodeError {
        DecodeError::TypeMismatch {
            line,
            field: field.to_string(),
            expected: ty.kind_name().to_string(),
            got: node.kind_name().to_string(),
        }
    }
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
                .string_field("label")
                .enum_field("next", "Side")
                .list_field("cells", FieldType::list(ScalarKind::I32))
                .map_field("captures", ScalarKind::I32, ScalarKind::I32)
                .object_field("last", "Move"),
        )
        .unwrap();
        reg
    }

    #[test]
    fn full_document_decodes() {
        let reg = registry();
        let text = "turn=3\n\
                    rating=1.5\n\
                    label=\"mid \\\"game\\\"\"\n\
                    next=BLACK\n\
                    cells=[ [ 10, 20 ], [ 30 ] ]\n\
                    captures={ 0=2, 5=1 }\n\
                    last=Move {\n  from=12\n  to=16\n}\n";
        let inst = decode(text, "Board", &reg, &CodecConfig::new()).unwrap();
        assert_eq!(inst.get::<i32>("turn").unwrap(), 3);
        assert_eq!(inst.get::<f64>("rating").unwrap(), 1.5);
        assert_eq!(inst.get::<String>("label").unwrap(), "mid \"game\"");
        assert_eq!(
            inst.get_field("next").unwrap(),
            &Value::Enum("BLACK".to_string())
        );
        assert_eq!(
            inst.get_field("cells").unwrap(),
            &Value::List(vec![
                Value::List(vec![Value::Int(10), Value::Int(20)]),
                Value::List(vec![Value::Int(30)]),
            ])
        );
        let last = inst.get_field("last").unwrap();
        assert_eq!(last.object_type(), Some("Move"));
        assert_eq!(last.get_field("from"), Some(&Value::Int(12)));
    }

    #[test]
    fn missing_fields_keep_defaults() {
        let reg = registry();
        let inst = decode("turn=7\n", "Board", &reg, &CodecConfig::new()).unwrap();
        assert_eq!(inst.get::<i32>("turn").unwrap(), 7);
        assert_eq!(inst.get::<String>("label").unwrap(), "");
        assert_eq!(inst.get_field("last").unwrap(), &Value::Null);
    }

    #[test]
    fn unknown_field_tolerated_then_strict() {
        let reg = registry();
        let text = "turn=1\nghost=42\n";
        let inst = decode(text, "Board", &reg, &CodecConfig::new()).unwrap();
        assert_eq!(inst.get::<i32>("turn").unwrap(), 1);

        let strict = CodecConfig::new().strict_unknown_fields(true);
        let err = decode(text, "Board", &reg, &strict).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownField {
                line: 2,
                field: "ghost".to_string()
            }
        );
    }

    #[test]
    fn merge_touches_only_named_fields() {
        let reg = registry();
        let mut inst = decode("turn=3\nlabel=\"keep\"\n", "Board", &reg, &CodecConfig::new())
            .unwrap();
        decode_into(&mut inst, "turn=4\n", &reg, &CodecConfig::new()).unwrap();
        assert_eq!(inst.get::<i32>("turn").unwrap(), 4);
        assert_eq!(inst.get::<String>("label").unwrap(), "keep");
    }

    #[test]
    fn map_patch_upserts_and_removes() {
        let reg = registry();
        let mut inst = decode(
            "captures={ 0=1, 3=9 }\n",
            "Board",
            &reg,
            &CodecConfig::new(),
        )
        .unwrap();
        decode_into(
            &mut inst,
            "captures={ 1=2, 3=null }\n",
            &reg,
            &CodecConfig::new(),
        )
        .unwrap();
        let map = inst.get_field("captures").unwrap();
        assert_eq!(map.map_get(&Value::Int(0)), Some(&Value::Int(1)));
        assert_eq!(map.map_get(&Value::Int(1)), Some(&Value::Int(2)));
        assert_eq!(map.map_get(&Value::Int(3)), None);
    }

    #[test]
    fn empty_object_element_leaves_list_slot_unchanged() {
        let mut reg = registry();
        reg.register(
            SchemaBuilder::new("Roster").list_field("moves", FieldType::object("Move")),
        )
        .unwrap();
        let mut inst = decode(
            "moves=[ Move { from=1, to=2 }, Move { from=3, to=4 } ]\n",
            "Roster",
            &reg,
            &CodecConfig::new(),
        )
        .unwrap();
        decode_into(
            &mut inst,
            "moves=[ Move {}, Move { to=9 } ]\n",
            &reg,
            &CodecConfig::new(),
        )
        .unwrap();
        let moves = inst.get_field("moves").unwrap().as_list().unwrap();
        assert_eq!(moves[0].get_field("from"), Some(&Value::Int(1)));
        assert_eq!(moves[0].get_field("to"), Some(&Value::Int(2)));
        assert_eq!(moves[1].get_field("from"), Some(&Value::Int(3)));
        assert_eq!(moves[1].get_field("to"), Some(&Value::Int(9)));
    }

    #[test]
    fn list_patch_sets_length() {
        let reg = registry();
        let mut inst = decode(
            "cells=[ [ 1 ], [ 2 ], [ 3 ] ]\n",
            "Board",
            &reg,
            &CodecConfig::new(),
        )
        .unwrap();
        decode_into(&mut inst, "cells=[ [ 9 ] ]\n", &reg, &CodecConfig::new()).unwrap();
        assert_eq!(
            inst.get_field("cells").unwrap(),
            &Value::List(vec![Value::List(vec![Value::Int(9)])])
        );
    }

    #[test]
    fn sparse_list_round_trip() {
        let reg = registry();
        let inst = decode(
            "cells=[ null, [ 5 ], null ]\n",
            "Board",
            &reg,
            &CodecConfig::new(),
        )
        .unwrap();
        assert_eq!(
            inst.get_field("cells").unwrap(),
            &Value::List(vec![
                Value::Null,
                Value::List(vec![Value::Int(5)]),
                Value::Null,
            ])
        );
    }

    #[test]
    fn type_errors_carry_lines() {
        let reg = registry();
        let err = decode("turn=3\nturn=\"oops\"\n", "Board", &reg, &CodecConfig::new())
            .unwrap_err();
        assert_eq!(
            err,
            DecodeError::TypeMismatch {
                line: 2,
                field: "turn".to_string(),
                expected: "int".to_string(),
                got: "string".to_string(),
            }
        );
    }

    #[test]
    fn unknown_enum_constant_rejected() {
        let reg = registry();
        let err = decode("next=GREEN\n", "Board", &reg, &CodecConfig::new()).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownEnumConstant { .. }));
    }

    #[test]
    fn syntax_errors_report_line() {
        let reg = registry();
        let err = decode("turn=3\nlabel \"x\"\n", "Board", &reg, &CodecConfig::new())
            .unwrap_err();
        assert!(matches!(err, DecodeError::Syntax { line: 2, .. }));
    }

    #[test]
    fn unterminated_string_rejected() {
        let reg = registry();
        let err = decode("label=\"open\n", "Board", &reg, &CodecConfig::new()).unwrap_err();
        assert!(matches!(err, DecodeError::Syntax { .. }));
    }

    #[test]
    fn non_finite_floats_parse() {
        let reg = registry();
        let inst = decode("rating=NaN\n", "Board", &reg, &CodecConfig::new()).unwrap();
        assert!(inst.get::<f64>("rating").unwrap().is_nan());
        let inst = decode("rating=-inf\n", "Board", &reg, &CodecConfig::new()).unwrap();
        assert_eq!(inst.get::<f64>("rating").unwrap(), f64::NEG_INFINITY);
    }

    #[test]
    fn qualified_tags_resolve_short_when_configured() {
        let mut reg = Registry::new();
        reg.register(SchemaBuilder::new("games::Move").field("from", ScalarKind::I32))
            .unwrap();
        reg.register(
            SchemaBuilder::new("games::Board").object_field("last", "games::Move"),
        )
        .unwrap();

        let text = "last=Move { from=2 }\n";
        let err = decode(text, "games::Board", &reg, &CodecConfig::new()).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownType { .. }));

        let config = CodecConfig::new().strip_qualifiers(true);
        let inst = decode(text, "games::Board", &reg, &config).unwrap();
        assert_eq!(
            inst.get_field("last").unwrap().object_type(),
            Some("games::Move")
        );
    }

    #[test]
    fn int_out_of_range_rejected() {
        let mut reg = Registry::new();
        reg.register(SchemaBuilder::new("Tiny").field("v", ScalarKind::I8))
            .unwrap();
        let err = decode("v=200\n", "Tiny", &reg, &CodecConfig::new()).unwrap_err();
        assert!(matches!(err, DecodeError::IntOutOfRange { .. }));
    }
}
