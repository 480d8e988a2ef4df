//! Recursive descent parser for TSDL, one method per production.
//!
//! The grammar accepted is the subset of CTF 1.8 that LTTng writes. Any
//! structural problem ends the parse with an error; there is no recovery.

use crate::error::Error;
use crate::metadata::lexer::{Keyword, Lexer, Token};
use crate::metadata::scope::Scope;
use crate::metadata::{
    ClockDesc, EnvValue, EventClass, Metadata, MetadataOptions, StreamDesc,
};
use crate::schema::{
    ArrayLen, Encoding, EnumRange, EnumType, FloatType, IntType, MemberDecl, StringType,
    StructType, Type, VariantType,
};
use crate::types::ByteOrder;
use std::collections::btree_map::Entry as MapEntry;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Right-hand side of `name = value;`
#[derive(Clone, Debug, PartialEq)]
enum AttrValue {
    Int(i128),
    Str(String),
    /// Bare or dotted identifier, e.g. `le` or `clock.monotonic.value`
    Ident(String),
}

/// One statement of a `trace`, `stream`, `event`, `clock` or `env` block
#[derive(Debug)]
enum Entry {
    Value(AttrValue),
    Type(Type),
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<(Token, usize)>,
    line: usize,
    scope: Scope,
    options: MetadataOptions,
    md: Metadata,
}

impl<'a> Parser<'a> {
    pub fn new(text: &'a str, options: MetadataOptions) -> Self {
        Self {
            lexer: Lexer::new(text),
            peeked: None,
            line: 1,
            scope: Scope::new(),
            options,
            md: Metadata::default(),
        }
    }

    /// Parse the whole input
    pub fn parse(mut self) -> Result<Metadata, Error> {
        loop {
            let tok = self.next()?;
            match tok {
                Token::Eof => break,
                Token::Keyword(Keyword::Typealias) => self.typealias()?,
                Token::Keyword(Keyword::Trace) => self.trace()?,
                Token::Keyword(Keyword::Env) => self.env()?,
                Token::Keyword(Keyword::Clock) => self.clock()?,
                Token::Keyword(Keyword::Stream) => self.stream()?,
                Token::Keyword(Keyword::Event) => self.event()?,
                Token::Keyword(Keyword::Callsite) => {
                    self.block()?;
                }
                Token::Keyword(kw @ (Keyword::Struct | Keyword::Variant | Keyword::Enum)) => {
                    self.compound(kw)?;
                    self.expect(Token::Semicolon)?;
                }
                other => return Err(self.unexpected(&other, "a top-level declaration")),
            }
        }
        if self.md.streams.is_empty() {
            self.md.streams.insert(0, StreamDesc::default());
        }
        Ok(self.md)
    }

    fn next(&mut self) -> Result<Token, Error> {
        if let Some((tok, line)) = self.peeked.take() {
            self.line = line;
            return Ok(tok);
        }
        let tok = self.lexer.next_token()?;
        self.line = self.lexer.line();
        Ok(tok)
    }

    fn peek(&mut self) -> Result<&Token, Error> {
        let peeked = match self.peeked.take() {
            Some(p) => p,
            None => (self.lexer.next_token()?, self.lexer.line()),
        };
        Ok(&self.peeked.insert(peeked).0)
    }

    fn syntax(&self, msg: impl Into<String>) -> Error {
        Error::Syntax {
            line: self.line,
            msg: msg.into(),
        }
    }

    fn unexpected(&self, found: &Token, wanted: &str) -> Error {
        self.syntax(format!("expected {wanted}, found {found}"))
    }

    fn expect(&mut self, wanted: Token) -> Result<(), Error> {
        let tok = self.next()?;
        if tok == wanted {
            Ok(())
        } else {
            Err(self.unexpected(&tok, &wanted.to_string()))
        }
    }

    fn accept(&mut self, wanted: &Token) -> Result<bool, Error> {
        if self.peek()? == wanted {
            self.next()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn integer(&mut self) -> Result<u64, Error> {
        match self.next()? {
            Token::Integer(v) => Ok(v),
            other => Err(self.unexpected(&other, "an integer")),
        }
    }

    /// Optionally negative integer literal
    fn signed_integer(&mut self) -> Result<i128, Error> {
        let negative = self.accept(&Token::Minus)?;
        let v = i128::from(self.integer()?);
        Ok(if negative { -v } else { v })
    }

    fn ident(&mut self) -> Result<String, Error> {
        match self.next()? {
            Token::Ident(s) => Ok(s),
            other => Err(self.unexpected(&other, "an identifier")),
        }
    }

    fn peek_is_type_word(&mut self) -> Result<bool, Error> {
        Ok(matches!(
            self.peek()?,
            Token::Ident(_)
                | Token::Keyword(
                    Keyword::Unsigned
                        | Keyword::Signed
                        | Keyword::Long
                        | Keyword::Short
                        | Keyword::Void
                )
        ))
    }

    /// A run of identifiers, as in `unsigned long` or `uint32_t field`
    fn type_words(&mut self) -> Result<Vec<String>, Error> {
        let mut words = Vec::new();
        while self.peek_is_type_word()? {
            if let Some(w) = self.next()?.word() {
                words.push(w);
            }
        }
        Ok(words)
    }

    /// `a.b.c`, where keywords are allowed as components
    fn dotted(&mut self, first: String) -> Result<String, Error> {
        let mut path = first;
        while self.accept(&Token::Dot)? {
            let tok = self.next()?;
            let w = tok
                .word()
                .ok_or_else(|| self.unexpected(&tok, "a name after '.'"))?;
            path.push('.');
            path.push_str(&w);
        }
        Ok(path)
    }

    fn value(&mut self) -> Result<AttrValue, Error> {
        match self.peek()? {
            Token::Minus | Token::Integer(_) => Ok(AttrValue::Int(self.signed_integer()?)),
            Token::Str(_) => match self.next()? {
                Token::Str(s) => Ok(AttrValue::Str(s)),
                other => Err(self.unexpected(&other, "a string")),
            },
            _ => {
                let tok = self.next()?;
                let first = tok
                    .word()
                    .ok_or_else(|| self.unexpected(&tok, "a value"))?;
                Ok(AttrValue::Ident(self.dotted(first)?))
            }
        }
    }

    /// `{ lhs = value; lhs := type; ... };`
    fn block(&mut self) -> Result<Vec<(String, Entry)>, Error> {
        self.expect(Token::LBrace)?;
        let mut entries = Vec::new();
        loop {
            let tok = self.next()?;
            match tok {
                Token::RBrace => break,
                Token::Keyword(Keyword::Typealias) => self.typealias()?,
                tok => {
                    let first = tok
                        .word()
                        .ok_or_else(|| self.unexpected(&tok, "an attribute name or '}'"))?;
                    let lhs = self.dotted(first)?;
                    let entry = match self.next()? {
                        Token::Assign => Entry::Value(self.value()?),
                        Token::TypeAssign => Entry::Type(self.type_specifier()?),
                        other => return Err(self.unexpected(&other, "'=' or ':='")),
                    };
                    self.expect(Token::Semicolon)?;
                    entries.push((lhs, entry));
                }
            }
        }
        self.expect(Token::Semicolon)?;
        Ok(entries)
    }

    /// `typealias <type> := <name words>;`
    fn typealias(&mut self) -> Result<(), Error> {
        let ty = self.type_specifier()?;
        self.expect(Token::TypeAssign)?;
        let words = self.type_words()?;
        if words.is_empty() {
            let tok = self.next()?;
            return Err(self.unexpected(&tok, "an alias name"));
        }
        self.expect(Token::Semicolon)?;
        let name = words.join(" ");
        debug!(alias = %name, kind = ty.kind(), "typealias");
        self.scope.add_alias(name, ty);
        Ok(())
    }

    /// Any type specifier, either a compound declaration or an alias name
    fn type_specifier(&mut self) -> Result<Type, Error> {
        match self.peek()?.clone() {
            Token::Keyword(
                kw @ (Keyword::Struct
                | Keyword::Variant
                | Keyword::Enum
                | Keyword::Integer
                | Keyword::FloatingPoint
                | Keyword::String),
            ) => {
                self.next()?;
                self.compound(kw)
            }
            _ => {
                let words = self.type_words()?;
                if words.is_empty() {
                    let tok = self.next()?;
                    return Err(self.unexpected(&tok, "a type"));
                }
                self.alias(&words.join(" "))
            }
        }
    }

    fn alias(&self, name: &str) -> Result<Type, Error> {
        self.scope.alias(name).cloned()
    }

    /// The rest of a keyword-introduced type specifier
    fn compound(&mut self, kw: Keyword) -> Result<Type, Error> {
        match kw {
            Keyword::Integer => self.integer_type().map(Type::Int),
            Keyword::FloatingPoint => self.float_type(),
            Keyword::String => self.string_type(),
            Keyword::Struct => self.struct_type().map(Type::Struct),
            Keyword::Variant => self.variant_type().map(Type::Variant),
            Keyword::Enum => self.enum_type().map(Type::Enum),
            other => Err(self.syntax(format!("'{other}' is not a type"))),
        }
    }

    /// `{ name = value; ... }` without a trailing `;`
    fn type_attrs(&mut self) -> Result<Vec<(String, AttrValue)>, Error> {
        self.expect(Token::LBrace)?;
        let mut attrs = Vec::new();
        loop {
            let tok = self.next()?;
            if tok == Token::RBrace {
                return Ok(attrs);
            }
            let first = tok
                .word()
                .ok_or_else(|| self.unexpected(&tok, "an attribute name or '}'"))?;
            let name = self.dotted(first)?;
            self.expect(Token::Assign)?;
            attrs.push((name, self.value()?));
            self.expect(Token::Semicolon)?;
        }
    }

    fn integer_type(&mut self) -> Result<Arc<IntType>, Error> {
        let attrs = self.type_attrs()?;
        let mut size = None;
        let mut align = None;
        let mut signed = false;
        let mut byte_order = None;
        let mut base = 10;
        let mut encoding = Encoding::None;
        let mut map = None;
        for (name, value) in attrs {
            match name.as_str() {
                "size" => size = Some(self.u32_attr(&name, &value)?),
                "align" => align = Some(self.u32_attr(&name, &value)?),
                "signed" => signed = self.bool_attr(&name, &value)?,
                "byte_order" => byte_order = self.byte_order_attr(&value)?,
                "base" => base = self.base_attr(&value)?,
                "encoding" => encoding = self.encoding_attr(&value)?,
                "map" => map = Some(self.text_attr(&name, value)?),
                _ => debug!(attribute = %name, "Ignoring unknown integer attribute"),
            }
        }
        let size = size.ok_or_else(|| self.syntax("integer declaration without a size"))?;
        let int = IntType::new(size, align, signed)?
            .with_byte_order(byte_order)
            .with_base(base)
            .with_encoding(encoding)
            .with_map(map);
        Ok(self.scope.intern_int(int))
    }

    fn float_type(&mut self) -> Result<Type, Error> {
        let attrs = self.type_attrs()?;
        let mut exp_dig = None;
        let mut mant_dig = None;
        let mut align = None;
        let mut byte_order = None;
        for (name, value) in attrs {
            match name.as_str() {
                "exp_dig" => exp_dig = Some(self.u32_attr(&name, &value)?),
                "mant_dig" => mant_dig = Some(self.u32_attr(&name, &value)?),
                "align" => align = Some(self.u32_attr(&name, &value)?),
                "byte_order" => byte_order = self.byte_order_attr(&value)?,
                _ => debug!(attribute = %name, "Ignoring unknown floating_point attribute"),
            }
        }
        let (exp_dig, mant_dig) = exp_dig
            .zip(mant_dig)
            .ok_or_else(|| self.syntax("floating_point declaration needs exp_dig and mant_dig"))?;
        let float = FloatType::new(exp_dig, mant_dig, align)?
            .with_byte_order(byte_order)
            .with_policy(self.options.float_policy);
        Ok(Type::Float(Arc::new(float)))
    }

    fn string_type(&mut self) -> Result<Type, Error> {
        let mut encoding = StringType::default().encoding();
        if self.peek()? == &Token::LBrace {
            for (name, value) in self.type_attrs()? {
                match name.as_str() {
                    "encoding" => encoding = self.encoding_attr(&value)?,
                    _ => debug!(attribute = %name, "Ignoring unknown string attribute"),
                }
            }
        }
        Ok(Type::String(StringType::new(encoding)))
    }

    /// `struct [NAME] [{ members }] [align(N)]`
    fn struct_type(&mut self) -> Result<Arc<StructType>, Error> {
        let name = match self.peek()? {
            Token::Ident(_) => Some(self.ident()?),
            _ => None,
        };
        if self.peek()? != &Token::LBrace {
            return match name {
                Some(name) => self.scope.struct_named(&name),
                None => {
                    let tok = self.next()?;
                    Err(self.unexpected(&tok, "a struct name or body"))
                }
            };
        }
        let decls = self.members()?;
        let mut min_align = 1;
        if self.accept(&Token::Keyword(Keyword::Align))? {
            self.expect(Token::LParen)?;
            let n = self.integer()?;
            self.expect(Token::RParen)?;
            min_align = u32::try_from(n).map_err(|_| Error::InvalidAlignment(n))?;
        }
        let ty = StructType::build(name.clone(), decls, min_align)?;
        if let Some(name) = name {
            self.scope.add_struct(name, ty.clone());
        }
        Ok(ty)
    }

    /// `variant [NAME] [<tag>] [{ members }]`
    fn variant_type(&mut self) -> Result<Arc<VariantType>, Error> {
        let name = match self.peek()? {
            Token::Ident(_) => Some(self.ident()?),
            _ => None,
        };
        let tag = if self.accept(&Token::Lt)? {
            let first = self.ident()?;
            let tag = self.dotted(first)?;
            self.expect(Token::Gt)?;
            Some(tag)
        } else {
            None
        };
        if self.peek()? != &Token::LBrace {
            let name = match name {
                Some(name) => name,
                None => {
                    let tok = self.next()?;
                    return Err(self.unexpected(&tok, "a variant name or body"));
                }
            };
            let declared = self.scope.variant_named(&name)?;
            return Ok(match tag {
                Some(tag) => Arc::new(declared.with_tag(tag)),
                None => declared,
            });
        }
        let branches = self.members()?;
        let ty = Arc::new(VariantType::new(name.clone(), tag, branches));
        if let Some(name) = name {
            self.scope.add_variant(name, ty.clone());
        }
        Ok(ty)
    }

    /// `enum [NAME] [: int-type] [{ enumerators }]`
    fn enum_type(&mut self) -> Result<Arc<EnumType>, Error> {
        let name = match self.peek()? {
            Token::Ident(_) => Some(self.ident()?),
            _ => None,
        };
        let container = if self.accept(&Token::Colon)? {
            Some(self.enum_container()?)
        } else {
            None
        };
        if self.peek()? != &Token::LBrace {
            return match name {
                Some(name) if container.is_none() => self.scope.enum_named(&name),
                _ => {
                    let tok = self.next()?;
                    Err(self.unexpected(&tok, "an enumerator list"))
                }
            };
        }
        let container = container.ok_or_else(|| {
            self.syntax(format!(
                "enum '{}' doesn't declare its container integer type",
                name.as_deref().unwrap_or("<anonymous>")
            ))
        })?;
        let ranges = self.enumerators()?;
        let ty = Arc::new(EnumType::new(name.clone(), container, ranges));
        if let Some(name) = name {
            self.scope.add_enum(name, ty.clone());
        }
        Ok(ty)
    }

    fn enum_container(&mut self) -> Result<Arc<IntType>, Error> {
        if self.accept(&Token::Keyword(Keyword::Integer))? {
            return self.integer_type();
        }
        let words = self.type_words()?;
        match self.alias(&words.join(" "))? {
            Type::Int(int) => Ok(int),
            other => Err(self.syntax(format!(
                "enum container must be an integer, found {}",
                other.kind()
            ))),
        }
    }

    /// `{ A, B = 3, C = 4 ... 9, "d" = -1 }`; an enumerator without a value
    /// follows the previous one
    fn enumerators(&mut self) -> Result<Vec<EnumRange>, Error> {
        self.expect(Token::LBrace)?;
        let mut ranges = Vec::new();
        let mut next_value: i128 = 0;
        loop {
            let label = match self.next()? {
                Token::RBrace => break,
                Token::Str(s) => s,
                tok => tok
                    .word()
                    .ok_or_else(|| self.unexpected(&tok, "an enumerator"))?,
            };
            let (low, high) = if self.accept(&Token::Assign)? {
                let low = self.signed_integer()?;
                let high = if self.accept(&Token::Ellipsis)? {
                    self.signed_integer()?
                } else {
                    low
                };
                (low, high)
            } else {
                (next_value, next_value)
            };
            if high < low {
                return Err(self.syntax(format!("enumerator '{label}' has an empty range")));
            }
            ranges.push(EnumRange::new(low, high, &label));
            next_value = high + 1;
            match self.next()? {
                Token::Comma => continue,
                Token::RBrace => break,
                other => return Err(self.unexpected(&other, "',' or '}'")),
            }
        }
        Ok(ranges)
    }

    /// `{ member; ... }`
    fn members(&mut self) -> Result<Vec<MemberDecl>, Error> {
        self.expect(Token::LBrace)?;
        let mut decls = Vec::new();
        loop {
            match self.peek()? {
                Token::RBrace => {
                    self.next()?;
                    return Ok(decls);
                }
                Token::Keyword(Keyword::Typealias) => {
                    self.next()?;
                    self.typealias()?;
                }
                _ => self.member(&mut decls)?,
            }
        }
    }

    /// `type declarator[dims] [, declarator[dims]]* ;`
    fn member(&mut self, decls: &mut Vec<MemberDecl>) -> Result<(), Error> {
        let (ty, mut name) = if self.peek_is_type_word()? {
            let mut words = self.type_words()?;
            if words.len() < 2 {
                let tok = self.next()?;
                return Err(self.unexpected(&tok, "a field name"));
            }
            let name = words.pop().unwrap_or_default();
            (self.alias(&words.join(" "))?, name)
        } else {
            let ty = self.type_specifier()?;
            (ty, self.declarator_name()?)
        };
        loop {
            let dims = self.dims()?;
            decls.push(MemberDecl::new(name, ty.clone()).with_dims(dims));
            match self.next()? {
                Token::Semicolon => return Ok(()),
                Token::Comma => name = self.declarator_name()?,
                other => return Err(self.unexpected(&other, "';'")),
            }
        }
    }

    fn declarator_name(&mut self) -> Result<String, Error> {
        let tok = self.next()?;
        tok.word()
            .ok_or_else(|| self.unexpected(&tok, "a field name"))
    }

    /// Zero or more `[N]` or `[field]`
    fn dims(&mut self) -> Result<Vec<ArrayLen>, Error> {
        let mut dims = Vec::new();
        while self.accept(&Token::LBracket)? {
            let len = match self.next()? {
                Token::Integer(n) => ArrayLen::Fixed(
                    usize::try_from(n).map_err(|_| self.syntax("array length is too large"))?,
                ),
                tok => {
                    let first = tok
                        .word()
                        .ok_or_else(|| self.unexpected(&tok, "an array length"))?;
                    ArrayLen::Field(self.dotted(first)?)
                }
            };
            self.expect(Token::RBracket)?;
            dims.push(len);
        }
        Ok(dims)
    }

    fn trace(&mut self) -> Result<(), Error> {
        for (name, entry) in self.block()? {
            match (name.as_str(), entry) {
                ("major", Entry::Value(v)) => self.md.trace.major = self.u64_attr(&name, &v)?,
                ("minor", Entry::Value(v)) => self.md.trace.minor = self.u64_attr(&name, &v)?,
                ("uuid", Entry::Value(v)) => self.md.trace.uuid = Some(self.uuid_attr(v)?),
                ("byte_order", Entry::Value(v)) => {
                    self.md.trace.byte_order = self.byte_order_attr(&v)?.ok_or_else(|| {
                        self.syntax("the trace byte order can't be 'native'")
                    })?;
                }
                ("packet.header", Entry::Type(t)) => {
                    self.md.trace.packet_header = Some(self.struct_entry(&name, t)?)
                }
                (other, _) => debug!(attribute = other, "Ignoring trace attribute"),
            }
        }
        Ok(())
    }

    fn env(&mut self) -> Result<(), Error> {
        for (name, entry) in self.block()? {
            let value = match entry {
                Entry::Value(AttrValue::Int(v)) => match i64::try_from(v) {
                    Ok(v) => EnvValue::Int(v),
                    Err(_) => EnvValue::Str(v.to_string()),
                },
                Entry::Value(AttrValue::Str(s) | AttrValue::Ident(s)) => EnvValue::Str(s),
                Entry::Type(_) => {
                    return Err(self.syntax(format!("env entry '{name}' can't be a type")))
                }
            };
            self.md.env.insert(name, value);
        }
        Ok(())
    }

    fn clock(&mut self) -> Result<(), Error> {
        let mut clock = ClockDesc::default();
        for (name, entry) in self.block()? {
            let value = match entry {
                Entry::Value(v) => v,
                Entry::Type(_) => {
                    return Err(self.syntax(format!("clock attribute '{name}' can't be a type")))
                }
            };
            match name.as_str() {
                "name" => clock.name = self.text_attr(&name, value)?,
                "uuid" => clock.uuid = Some(self.uuid_attr(value)?),
                "description" => clock.description = Some(self.text_attr(&name, value)?),
                "freq" => clock.freq = self.u64_attr(&name, &value)?,
                "offset" => clock.offset = self.i64_attr(&name, &value)?,
                "offset_s" => clock.offset_s = self.i64_attr(&name, &value)?,
                "precision" => clock.precision = self.u64_attr(&name, &value)?,
                "absolute" => clock.absolute = self.bool_attr(&name, &value)?,
                other => debug!(attribute = other, "Ignoring clock attribute"),
            }
        }
        self.md.clocks.push(clock);
        Ok(())
    }

    fn stream(&mut self) -> Result<(), Error> {
        let mut stream = StreamDesc::default();
        for (name, entry) in self.block()? {
            match (name.as_str(), entry) {
                ("id", Entry::Value(v)) => stream.id = self.u64_attr(&name, &v)?,
                ("packet.context", Entry::Type(t)) => {
                    stream.packet_context = Some(self.struct_entry(&name, t)?)
                }
                ("event.header", Entry::Type(t)) => {
                    stream.event_header = Some(self.struct_entry(&name, t)?)
                }
                ("event.context", Entry::Type(t)) => {
                    stream.event_context = Some(self.struct_entry(&name, t)?)
                }
                (other, _) => debug!(attribute = other, "Ignoring stream attribute"),
            }
        }
        match self.md.streams.entry(stream.id) {
            MapEntry::Occupied(mut e) => {
                warn!(stream_id = stream.id, "Stream declared twice, keeping the last one");
                e.insert(stream);
            }
            MapEntry::Vacant(e) => {
                e.insert(stream);
            }
        }
        Ok(())
    }

    fn event(&mut self) -> Result<(), Error> {
        let mut event = EventClass::default();
        for (name, entry) in self.block()? {
            match (name.as_str(), entry) {
                ("name", Entry::Value(v)) => event.name = self.text_attr(&name, v)?,
                ("id", Entry::Value(v)) => event.id = self.u64_attr(&name, &v)?,
                ("stream_id", Entry::Value(v)) => event.stream_id = self.u64_attr(&name, &v)?,
                ("loglevel", Entry::Value(v)) => event.loglevel = Some(self.i64_attr(&name, &v)?),
                ("model.emf.uri", Entry::Value(v)) => {
                    event.model_emf_uri = Some(self.text_attr(&name, v)?)
                }
                ("context", Entry::Type(t)) => event.context = Some(self.struct_entry(&name, t)?),
                ("fields", Entry::Type(t)) => event.fields = Some(self.struct_entry(&name, t)?),
                (other, _) => debug!(attribute = other, "Ignoring event attribute"),
            }
        }
        let key = (event.stream_id, event.id);
        if let Some(prev) = self.md.events.insert(key, Arc::new(event)) {
            warn!(
                stream_id = key.0,
                id = key.1,
                name = %prev.name,
                "Event declared twice, keeping the last one"
            );
        }
        Ok(())
    }

    fn struct_entry(&self, name: &str, ty: Type) -> Result<Arc<StructType>, Error> {
        match ty {
            Type::Struct(s) => Ok(s),
            other => Err(self.syntax(format!(
                "'{name}' must be a struct, found {}",
                other.kind()
            ))),
        }
    }

    fn u64_attr(&self, name: &str, value: &AttrValue) -> Result<u64, Error> {
        match value {
            AttrValue::Int(v) => u64::try_from(*v)
                .map_err(|_| self.syntax(format!("'{name}' must not be negative"))),
            _ => Err(self.syntax(format!("'{name}' must be an integer"))),
        }
    }

    fn u32_attr(&self, name: &str, value: &AttrValue) -> Result<u32, Error> {
        let v = self.u64_attr(name, value)?;
        u32::try_from(v).map_err(|_| self.syntax(format!("'{name}' is too large")))
    }

    fn i64_attr(&self, name: &str, value: &AttrValue) -> Result<i64, Error> {
        match value {
            AttrValue::Int(v) => {
                i64::try_from(*v).map_err(|_| self.syntax(format!("'{name}' is out of range")))
            }
            _ => Err(self.syntax(format!("'{name}' must be an integer"))),
        }
    }

    fn bool_attr(&self, name: &str, value: &AttrValue) -> Result<bool, Error> {
        match value {
            AttrValue::Int(v) => Ok(*v != 0),
            AttrValue::Ident(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            AttrValue::Ident(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            _ => Err(self.syntax(format!("'{name}' must be a boolean"))),
        }
    }

    fn text_attr(&self, name: &str, value: AttrValue) -> Result<String, Error> {
        match value {
            AttrValue::Str(s) | AttrValue::Ident(s) => Ok(s),
            AttrValue::Int(_) => Err(self.syntax(format!("'{name}' must be a name or string"))),
        }
    }

    fn uuid_attr(&self, value: AttrValue) -> Result<Uuid, Error> {
        let s = self.text_attr("uuid", value)?;
        Uuid::parse_str(&s).map_err(|e| self.syntax(format!("invalid uuid '{s}': {e}")))
    }

    /// `None` stands for the trace's native byte order
    fn byte_order_attr(&self, value: &AttrValue) -> Result<Option<ByteOrder>, Error> {
        match value {
            AttrValue::Ident(s) => match s.as_str() {
                "native" => Ok(None),
                "big_endian" => Ok(Some(ByteOrder::BigEndian)),
                "little_endian" => Ok(Some(ByteOrder::LittleEndian)),
                other => other.parse().map(Some).map_err(|e| self.syntax(e)),
            },
            _ => Err(self.syntax("'byte_order' must be native, le, be or network")),
        }
    }

    fn base_attr(&self, value: &AttrValue) -> Result<u32, Error> {
        let base = match value {
            AttrValue::Int(v @ (2 | 8 | 10 | 16)) => *v as u32,
            AttrValue::Ident(s) => match s.as_str() {
                "decimal" | "dec" | "d" | "i" | "u" => 10,
                "hexadecimal" | "hex" | "x" | "X" | "p" => 16,
                "octal" | "oct" | "o" => 8,
                "binary" | "b" => 2,
                other => return Err(self.syntax(format!("unknown integer base '{other}'"))),
            },
            _ => return Err(self.syntax("'base' must be 2, 8, 10 or 16")),
        };
        Ok(base)
    }

    fn encoding_attr(&self, value: &AttrValue) -> Result<Encoding, Error> {
        match value {
            AttrValue::Ident(s) | AttrValue::Str(s) => s.parse().map_err(|e| self.syntax(e)),
            AttrValue::Int(_) => Err(self.syntax("'encoding' must be none, UTF8 or ASCII")),
        }
    }
}
