//! The recursive-descent parser: token stream in, `Uxf` tree out.
//!
//! Parsing runs through fixed states: header (handled by the lexer), an
//! optional file comment, imports, ttype definitions, then exactly one
//! top-level list, map, or table. The ttype registry is built as the
//! definitions are read, so every table and declared vtype is validated
//! against it during value construction.

use std::collections::HashSet;
use std::mem::take;

use indexmap::IndexMap;

use crate::check::{conforms, used_ttypes};
use crate::event::{Error, Events};
use crate::import::{self, ImportContext};
use crate::lexer::{self, Token, TokenKind};
use crate::list::List;
use crate::map::{Key, Map};
use crate::table::Table;
use crate::tclass::{Field, TClass};
use crate::util::{is_builtin_type_name, is_container_type_name, is_ktype_name};
use crate::value::Value;
use crate::{Options, Uxf};

/// Parses one document. `is_import` limits the parse to the header,
/// imports, and ttype definitions, which is all an imported file may
/// contribute.
pub(crate) fn parse(
    text: &str,
    filename: &str,
    options: &Options,
    events: &mut Events<'_>,
    ctx: &mut ImportContext,
    is_import: bool,
) -> Result<Uxf, Error> {
    let previous = events.swap_filename(filename);
    ctx.loading.push(import::normalize_source(filename, ctx.loading.last()));
    let result = parse_inner(text, options, events, ctx, is_import);
    ctx.loading.pop();
    events.swap_filename(&previous);
    result
}

fn parse_inner(
    text: &str,
    options: &Options,
    events: &mut Events<'_>,
    ctx: &mut ImportContext,
    is_import: bool,
) -> Result<Uxf, Error> {
    let (custom, tokens) = lexer::tokenize(text, events)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        options,
        events,
        ctx,
        tclasses: IndexMap::new(),
        imports: IndexMap::new(),
        is_import,
    };
    parser.run(custom)
}

struct Parser<'a, 'h> {
    tokens: &'a [Token],
    pos: usize,
    options: &'a Options,
    events: &'a mut Events<'h>,
    ctx: &'a mut ImportContext,
    tclasses: IndexMap<String, TClass>,
    imports: IndexMap<String, String>,
    is_import: bool,
}

impl<'a, 'h> Parser<'a, 'h> {
    fn peek(&self) -> &'a Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> &'a Token {
        let token = self.peek();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn run(&mut self, custom: String) -> Result<Uxf, Error> {
        let mut uxo = Uxf::new(&custom);
        // An optional file comment comes immediately after the header.
        if let TokenKind::Comment(comment) = &self.peek().kind {
            uxo.set_comment(Some(comment.as_str()));
            self.advance();
        }
        while let TokenKind::Import(source) = &self.peek().kind {
            let lineno = self.peek().lineno;
            self.advance();
            self.handle_import(source.clone(), lineno)?;
        }
        while matches!(self.peek().kind, TokenKind::TClassBegin) {
            self.advance();
            self.parse_tclass_def()?;
        }
        self.check_field_vtypes()?;
        if self.is_import {
            // An imported file contributes only its ttypes; any value it
            // has is deliberately ignored.
            uxo.replace_tclasses(take(&mut self.tclasses), take(&mut self.imports));
            return Ok(uxo);
        }
        let value = self.parse_top_value()?;
        match &self.peek().kind {
            TokenKind::Eof => {}
            kind => {
                let lineno = self.peek().lineno;
                return Err(self.events.fatal(
                    510,
                    lineno,
                    format!("unexpected {} after the top-level value", describe(kind)),
                ));
            }
        }
        uxo.replace_tclasses(take(&mut self.tclasses), take(&mut self.imports));
        uxo.replace_value(value);
        self.finish(&mut uxo);
        Ok(uxo)
    }

    /// Unused-ttype warnings, then the drop-first-then-inline passes.
    fn finish(&mut self, uxo: &mut Uxf) {
        let mut used = HashSet::new();
        used_ttypes(uxo.value(), &mut used);
        let mut unused: Vec<String> = uxo
            .tclasses()
            .keys()
            .filter(|name| !used.contains(*name))
            .cloned()
            .collect();
        unused.sort();
        if !unused.is_empty() {
            let lineno = self.peek().lineno;
            let names: Vec<String> = unused.iter().map(|n| format!("{n:?}")).collect();
            let message = if names.len() == 1 {
                format!("unused ttype: {}", names[0])
            } else {
                format!("unused ttypes: {}", names.join(", "))
            };
            self.events.warning(422, lineno, message);
            if self.options.drop_unused {
                uxo.drop_tclasses(&unused);
            }
        }
        if self.options.replace_imports {
            uxo.clear_imports();
        }
    }

    fn handle_import(&mut self, source: String, lineno: usize) -> Result<(), Error> {
        let Some(tclasses) =
            import::resolve(&source, lineno, self.options, self.events, self.ctx)?
        else {
            return Ok(()); // resolution failed non-fatally; already reported
        };
        for tclass in tclasses {
            self.register(tclass, lineno, Some(source.as_str()))?;
        }
        Ok(())
    }

    fn parse_tclass_def(&mut self) -> Result<(), Error> {
        let lineno = self.peek().lineno;
        let mut comment = None;
        if let TokenKind::Comment(text) = &self.peek().kind {
            comment = Some(text.clone());
            self.advance();
        }
        let name = match &self.peek().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                name
            }
            TokenKind::Type(name) => {
                return Err(self.events.fatal(
                    304,
                    lineno,
                    format!("may not redefine the built-in type {name:?}"),
                ))
            }
            TokenKind::TClassEnd => {
                return Err(self.events.fatal(298, lineno, "a ttype definition needs a name"))
            }
            kind => {
                return Err(self.events.fatal(
                    418,
                    lineno,
                    format!("expected a ttype name, got {}", describe(kind)),
                ))
            }
        };
        let mut fields = Vec::new();
        loop {
            let token = self.peek();
            match &token.kind {
                TokenKind::TClassEnd => {
                    self.advance();
                    break;
                }
                TokenKind::Identifier(fname) => {
                    let field = Field::new(fname, None)
                        .map_err(|err| self.events.fatal(err.code, token.lineno, err.message))?;
                    fields.push(field);
                    self.advance();
                }
                TokenKind::FieldDef { name: fname, vtype } => {
                    let field = Field::new(fname, Some(vtype.as_str()))
                        .map_err(|err| self.events.fatal(err.code, token.lineno, err.message))?;
                    fields.push(field);
                    self.advance();
                }
                TokenKind::Type(tname) => {
                    return Err(self.events.fatal(
                        304,
                        token.lineno,
                        format!("a field may not be named after the built-in type {tname:?}"),
                    ))
                }
                kind => {
                    return Err(self.events.fatal(
                        418,
                        token.lineno,
                        format!("expected a field name in ttype {name:?}, got {}", describe(kind)),
                    ))
                }
            }
        }
        let tclass = TClass::new(&name, fields, comment.as_deref())
            .map_err(|err| self.events.fatal(err.code, lineno, err.message))?;
        self.register(tclass, lineno, None)
    }

    /// Adds a tclass to the registry. Identical duplicates are free; a
    /// conflict with an imported definition is 528, any other conflict
    /// is 544.
    fn register(
        &mut self,
        tclass: TClass,
        lineno: usize,
        source: Option<&str>,
    ) -> Result<(), Error> {
        let name = tclass.ttype().to_string();
        match self.tclasses.get(&name) {
            None => {
                self.tclasses.insert(name.clone(), tclass);
                if let Some(source) = source {
                    self.imports.insert(name, source.to_string());
                }
                Ok(())
            }
            Some(existing) if existing.is_equivalent(&tclass, true, false) => Ok(()),
            Some(_) => {
                let imported = self.imports.contains_key(&name);
                if source.is_none() && imported {
                    Err(self.events.fatal(
                        528,
                        lineno,
                        format!("ttype {name:?} conflicts with an imported definition"),
                    ))
                } else {
                    Err(self.events.fatal(
                        544,
                        lineno,
                        format!("conflicting ttype definitions for {name}"),
                    ))
                }
            }
        }
    }

    /// Every field vtype that names a ttype must be registered by the
    /// time all imports and definitions have been read.
    fn check_field_vtypes(&mut self) -> Result<(), Error> {
        let mut missing = None;
        for tclass in self.tclasses.values() {
            for field in tclass.fields() {
                if let Some(vtype) = field.vtype() {
                    if !is_builtin_type_name(vtype) && !self.tclasses.contains_key(vtype) {
                        missing = Some((tclass.ttype().to_string(), field.name().to_string(),
                                        vtype.to_string()));
                    }
                }
            }
        }
        if let Some((ttype, fname, vtype)) = missing {
            return Err(self.events.fatal(
                500,
                self.peek().lineno,
                format!("unknown type {vtype:?} for field {fname:?} of ttype {ttype:?}"),
            ));
        }
        Ok(())
    }

    fn parse_top_value(&mut self) -> Result<Value, Error> {
        let token = self.peek();
        let lineno = token.lineno;
        match &token.kind {
            TokenKind::ListBegin => {
                self.advance();
                Ok(Value::List(self.parse_list(lineno)?))
            }
            TokenKind::MapBegin => {
                self.advance();
                Ok(Value::Map(self.parse_map(lineno)?))
            }
            TokenKind::TableBegin => {
                self.advance();
                Ok(Value::Table(self.parse_table(lineno)?))
            }
            // An empty top level is legal: the value is an empty list.
            TokenKind::Eof => Ok(Value::List(List::new())),
            TokenKind::Comment(_) => {
                Err(self.events.fatal(190, lineno, "comment in an illegal position"))
            }
            TokenKind::Import(_) => Err(self.events.fatal(
                416,
                lineno,
                "imports must precede ttype definitions and the value",
            )),
            kind => Err(self.events.fatal(
                402,
                lineno,
                format!(
                    "a UXF file's top-level value must be a list, map, or table, got {}",
                    describe(kind)
                ),
            )),
        }
    }

    fn parse_value_token(&mut self) -> Result<Value, Error> {
        let token = self.advance();
        let lineno = token.lineno;
        Ok(match &token.kind {
            TokenKind::Null => Value::Null,
            TokenKind::Bool(b) => Value::Bool(*b),
            TokenKind::Int(i) => Value::Int(*i),
            TokenKind::Real(r) => Value::Real(*r),
            TokenKind::Str(s) => Value::Str(s.clone()),
            TokenKind::Bytes(b) => Value::Bytes(b.clone()),
            TokenKind::Date(d) => Value::Date(*d),
            TokenKind::DateTime(dt) => Value::DateTime(*dt),
            TokenKind::ListBegin => Value::List(self.parse_list(lineno)?),
            TokenKind::MapBegin => Value::Map(self.parse_map(lineno)?),
            TokenKind::TableBegin => Value::Table(self.parse_table(lineno)?),
            kind => unreachable!("callers dispatch values only, got {}", describe(kind)),
        })
    }

    /// Applies a declared vtype to a parsed value: ints widen to a
    /// declared real with warning 496, reals never narrow (fatal 498),
    /// and a ttype vtype demands a table of that ttype (fatal 454).
    fn typecheck(
        &mut self,
        value: Value,
        declared: Option<&str>,
        lineno: usize,
    ) -> Result<Value, Error> {
        let Some(vtype) = declared else { return Ok(value) };
        if value.is_null() {
            return Ok(value);
        }
        if vtype == "real" {
            if let Value::Int(i) = value {
                self.events
                    .warning(496, lineno, format!("int {i} coerced to real"));
                return Ok(Value::Real(i as f64));
            }
        }
        if vtype == "int" {
            if let Value::Real(r) = value {
                return Err(self.events.fatal(
                    498,
                    lineno,
                    format!("expected int, got real {r}"),
                ));
            }
        }
        if conforms(&value, vtype) {
            return Ok(value);
        }
        if !is_builtin_type_name(vtype) {
            return Err(self.events.fatal(
                454,
                lineno,
                format!("expected a table of ttype {vtype}, got {}", value.typename()),
            ));
        }
        Err(self.events.fatal(
            498,
            lineno,
            format!("expected {vtype}, got {}", value.typename()),
        ))
    }

    fn parse_list(&mut self, start_lineno: usize) -> Result<List, Error> {
        let mut lst = List::new();
        if let TokenKind::Comment(comment) = &self.peek().kind {
            lst.set_comment(Some(comment.as_str()));
            self.advance();
        }
        match &self.peek().kind {
            TokenKind::Type(name) => {
                lst.set_vtype_unchecked(name);
                self.advance();
            }
            TokenKind::Identifier(name) => {
                if self.tclasses.contains_key(name.as_str()) {
                    lst.set_vtype_unchecked(name);
                    self.advance();
                } else {
                    let lineno = self.peek().lineno;
                    return Err(self.events.fatal(
                        446,
                        lineno,
                        format!("expected a vtype or value, got unknown {name:?}"),
                    ));
                }
            }
            _ => {}
        }
        let vtype = lst.vtype().map(str::to_string);
        loop {
            let token = self.peek();
            let lineno = token.lineno;
            match &token.kind {
                TokenKind::ListEnd => {
                    self.advance();
                    return Ok(lst);
                }
                TokenKind::Eof => {
                    return Err(self.events.fatal(
                        510,
                        start_lineno,
                        "unterminated list",
                    ))
                }
                TokenKind::MapEnd | TokenKind::TableEnd => {
                    let kind = describe(&token.kind);
                    return Err(self.events.fatal(
                        512,
                        lineno,
                        format!("expected ']', got {kind}"),
                    ));
                }
                TokenKind::Comment(_) => {
                    return Err(self.events.fatal(190, lineno, "comment in an illegal position"))
                }
                TokenKind::Type(name) => {
                    return Err(self.events.fatal(
                        272,
                        lineno,
                        format!("unexpected type name {name:?} in list items"),
                    ))
                }
                TokenKind::Identifier(name) | TokenKind::FieldDef { name, .. } => {
                    return Err(self.events.fatal(
                        458,
                        lineno,
                        format!("unexpected identifier {name:?} in list items"),
                    ))
                }
                _ => {
                    let value = self.parse_value_token()?;
                    let value = self.typecheck(value, vtype.as_deref(), lineno)?;
                    lst.push_unchecked(value);
                }
            }
        }
    }

    fn parse_map(&mut self, start_lineno: usize) -> Result<Map, Error> {
        let mut map = Map::new();
        if let TokenKind::Comment(comment) = &self.peek().kind {
            map.set_comment(Some(comment.as_str()));
            self.advance();
        }
        let mut ktype = None;
        let mut vtype = None;
        match &self.peek().kind {
            TokenKind::Type(name) if is_ktype_name(name) => {
                ktype = Some(name.clone());
                self.advance();
                match &self.peek().kind {
                    TokenKind::Type(name) => {
                        vtype = Some(name.clone());
                        self.advance();
                    }
                    TokenKind::Identifier(name) => {
                        if self.tclasses.contains_key(name.as_str()) {
                            vtype = Some(name.clone());
                            self.advance();
                        } else {
                            let lineno = self.peek().lineno;
                            return Err(self.events.fatal(
                                446,
                                lineno,
                                format!("expected a vtype or key, got unknown {name:?}"),
                            ));
                        }
                    }
                    _ => {}
                }
            }
            TokenKind::Type(name) if is_container_type_name(name) => {
                let lineno = self.peek().lineno;
                return Err(self.events.fatal(
                    448,
                    lineno,
                    format!("a map ktype may not be the container type {name:?}"),
                ));
            }
            TokenKind::Type(name) => {
                let lineno = self.peek().lineno;
                return Err(self.events.fatal(
                    294,
                    lineno,
                    format!("map keys may not be {name}"),
                ));
            }
            TokenKind::Identifier(name) => {
                let lineno = self.peek().lineno;
                return Err(self.events.fatal(
                    273,
                    lineno,
                    format!("expected a map ktype, got unknown {name:?}"),
                ));
            }
            _ => {}
        }
        map.set_types_unchecked(ktype.as_deref(), vtype.as_deref());
        loop {
            let token = self.peek();
            let lineno = token.lineno;
            let key = match &token.kind {
                TokenKind::MapEnd => {
                    self.advance();
                    return Ok(map);
                }
                TokenKind::Eof => {
                    return Err(self.events.fatal(510, start_lineno, "unterminated map"))
                }
                TokenKind::ListEnd | TokenKind::TableEnd => {
                    let kind = describe(&token.kind);
                    return Err(self.events.fatal(
                        512,
                        lineno,
                        format!("expected '}}', got {kind}"),
                    ));
                }
                TokenKind::Comment(_) => {
                    return Err(self.events.fatal(190, lineno, "comment in an illegal position"))
                }
                TokenKind::Type(name) => {
                    return Err(self.events.fatal(
                        276,
                        lineno,
                        format!("too many map types, unexpected {name:?}"),
                    ))
                }
                TokenKind::Identifier(name) => {
                    return Err(self.events.fatal(
                        458,
                        lineno,
                        format!("unexpected identifier {name:?} in map entries"),
                    ))
                }
                TokenKind::Int(i) => {
                    self.advance();
                    Key::Int(*i)
                }
                TokenKind::Str(s) => {
                    self.advance();
                    Key::Str(s.clone())
                }
                TokenKind::Bytes(b) => {
                    self.advance();
                    Key::Bytes(b.clone())
                }
                TokenKind::Date(d) => {
                    self.advance();
                    Key::Date(*d)
                }
                TokenKind::DateTime(dt) => {
                    self.advance();
                    Key::DateTime(*dt)
                }
                TokenKind::ListBegin | TokenKind::MapBegin | TokenKind::TableBegin => {
                    return Err(self.events.fatal(
                        290,
                        lineno,
                        "map keys may not be collections",
                    ))
                }
                kind => {
                    return Err(self.events.fatal(
                        294,
                        lineno,
                        format!(
                            "map keys must be int, date, datetime, str, or bytes, got {}",
                            describe(kind)
                        ),
                    ))
                }
            };
            if let Some(ktype) = ktype.as_deref() {
                if key.typename() != ktype {
                    return Err(self.events.fatal(
                        294,
                        lineno,
                        format!("expected {ktype} map key, got {}", key.typename()),
                    ));
                }
            }
            let token = self.peek();
            let lineno = token.lineno;
            match &token.kind {
                TokenKind::MapEnd => {
                    return Err(self.events.fatal(440, lineno, "map entry missing its value"))
                }
                TokenKind::Eof => {
                    return Err(self.events.fatal(510, start_lineno, "unterminated map"))
                }
                TokenKind::ListEnd | TokenKind::TableEnd => {
                    let kind = describe(&token.kind);
                    return Err(self.events.fatal(
                        512,
                        lineno,
                        format!("expected '}}', got {kind}"),
                    ));
                }
                TokenKind::Comment(_) => {
                    return Err(self.events.fatal(190, lineno, "comment in an illegal position"))
                }
                TokenKind::Type(name) => {
                    return Err(self.events.fatal(
                        272,
                        lineno,
                        format!("unexpected type name {name:?} in map entries"),
                    ))
                }
                TokenKind::Identifier(name) | TokenKind::FieldDef { name, .. } => {
                    return Err(self.events.fatal(
                        458,
                        lineno,
                        format!("unexpected identifier {name:?} in map entries"),
                    ))
                }
                _ => {
                    let value = self.parse_value_token()?;
                    let value = self.typecheck(value, vtype.as_deref(), lineno)?;
                    map.insert_unchecked(key, value);
                }
            }
        }
    }

    fn parse_table(&mut self, start_lineno: usize) -> Result<Table, Error> {
        let mut comment = None;
        if let TokenKind::Comment(text) = &self.peek().kind {
            comment = Some(text.clone());
            self.advance();
        }
        let token = self.peek();
        let lineno = token.lineno;
        let tclass = match &token.kind {
            TokenKind::Identifier(name) => match self.tclasses.get(name.as_str()) {
                Some(tclass) => tclass.clone(),
                None => {
                    return Err(self.events.fatal(
                        450,
                        lineno,
                        format!("expected table ttype, got unknown {name:?}"),
                    ))
                }
            },
            kind => {
                return Err(self.events.fatal(
                    450,
                    lineno,
                    format!("expected table ttype, got {}", describe(kind)),
                ))
            }
        };
        self.advance();
        let arity = tclass.len();
        let field_vtypes: Vec<Option<String>> = tclass
            .fields()
            .iter()
            .map(|f| f.vtype().map(str::to_string))
            .collect();
        let fieldless = tclass.is_fieldless();
        let mut table = Table::new(tclass, comment.as_deref());
        let mut record: Vec<Value> = Vec::new();
        loop {
            let token = self.peek();
            let lineno = token.lineno;
            match &token.kind {
                TokenKind::TableEnd => {
                    self.advance();
                    if !record.is_empty() {
                        return Err(self.events.fatal(
                            486,
                            lineno,
                            format!(
                                "incomplete record for ttype {:?}: got {} of {arity} values",
                                table.ttype(),
                                record.len()
                            ),
                        ));
                    }
                    return Ok(table);
                }
                TokenKind::Eof => {
                    return Err(self.events.fatal(486, start_lineno, "unterminated table"))
                }
                TokenKind::ListEnd | TokenKind::MapEnd => {
                    let kind = describe(&token.kind);
                    return Err(self.events.fatal(
                        512,
                        lineno,
                        format!("expected ')', got {kind}"),
                    ));
                }
                TokenKind::Comment(_) => {
                    return Err(self.events.fatal(190, lineno, "comment in an illegal position"))
                }
                TokenKind::Identifier(name)
                | TokenKind::FieldDef { name, .. } => {
                    return Err(self.events.fatal(
                        274,
                        lineno,
                        format!("unexpected identifier {name:?} in table records"),
                    ))
                }
                TokenKind::Type(name) => {
                    return Err(self.events.fatal(
                        274,
                        lineno,
                        format!("unexpected type name {name:?} in table records"),
                    ))
                }
                _ => {
                    if fieldless {
                        return Err(self.events.fatal(
                            334,
                            lineno,
                            format!(
                                "fieldless ttype {:?} may not have records",
                                table.ttype()
                            ),
                        ));
                    }
                    let declared = field_vtypes[record.len()].clone();
                    let value = self.parse_value_token()?;
                    let value = self.typecheck(value, declared.as_deref(), lineno)?;
                    record.push(value);
                    if record.len() == arity {
                        table.push_unchecked(take(&mut record));
                    }
                }
            }
        }
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Import(_) => "an import".to_string(),
        TokenKind::TClassBegin => "'='".to_string(),
        TokenKind::TClassEnd => "the end of a ttype definition".to_string(),
        TokenKind::ListBegin => "'['".to_string(),
        TokenKind::ListEnd => "']'".to_string(),
        TokenKind::MapBegin => "'{'".to_string(),
        TokenKind::MapEnd => "'}'".to_string(),
        TokenKind::TableBegin => "'('".to_string(),
        TokenKind::TableEnd => "')'".to_string(),
        TokenKind::Comment(_) => "a comment".to_string(),
        TokenKind::Identifier(name) => format!("identifier {name:?}"),
        TokenKind::Type(name) => format!("type name {name:?}"),
        TokenKind::FieldDef { name, .. } => format!("field {name:?}"),
        TokenKind::Str(_) => "a string".to_string(),
        TokenKind::Bytes(_) => "bytes".to_string(),
        TokenKind::Int(i) => format!("int {i}"),
        TokenKind::Real(r) => format!("real {r}"),
        TokenKind::Date(_) => "a date".to_string(),
        TokenKind::DateTime(_) => "a datetime".to_string(),
        TokenKind::Bool(b) => format!("{}", if *b { "yes" } else { "no" }),
        TokenKind::Null => "null".to_string(),
        TokenKind::Eof => "end of input".to_string(),
    }
}
