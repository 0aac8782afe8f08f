//! The streaming lexer: UTF-8 text in, tokens with line numbers out.
//!
//! The lexer owns the header contract (the `uxf 1` line) and every literal
//! form: strings with `&` continuations, hex bytes, numbers, dates, and
//! datetimes. Scanner failures raise numbered fatal events in the 100–270
//! range, each carrying the line it arose on.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::event::{Error, Events};
use crate::util::is_builtin_type_name;

/// What a single token is, with its payload.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum TokenKind {
    /// An `!import` line's text (path, URL, or system name).
    Import(String),
    /// A `=` starting a ttype definition.
    TClassBegin,
    /// The newline (or EOF) ending a ttype definition.
    TClassEnd,
    ListBegin,
    ListEnd,
    MapBegin,
    MapEnd,
    TableBegin,
    TableEnd,
    /// A `#<…>` comment.
    Comment(String),
    /// A bare identifier (ttype reference, field name, …).
    Identifier(String),
    /// A built-in type name.
    Type(String),
    /// A `name:vtype` pair inside a ttype definition.
    FieldDef { name: String, vtype: String },
    Str(String),
    Bytes(Vec<u8>),
    Int(i64),
    Real(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Bool(bool),
    Null,
    Eof,
}

/// A token plus the 1-based line it started on.
#[derive(Clone, Debug)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub lineno: usize,
}

/// Tokenizes a whole document. Returns the header's custom text and the
/// token stream, which always ends with [`TokenKind::Eof`].
pub(crate) fn tokenize(
    text: &str,
    events: &mut Events<'_>,
) -> Result<(String, Vec<Token>), Error> {
    let mut lexer = Lexer {
        text,
        pos: 0,
        lineno: 1,
        in_tclass: false,
        tokens: Vec::new(),
        events,
    };
    let custom = lexer.read_header()?;
    lexer.scan()?;
    Ok((custom, lexer.tokens))
}

struct Lexer<'t, 'e, 'h> {
    text: &'t str,
    pos: usize,
    lineno: usize,
    in_tclass: bool,
    tokens: Vec<Token>,
    events: &'e mut Events<'h>,
}

impl<'t, 'e, 'h> Lexer<'t, 'e, 'h> {
    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn peek2(&self) -> Option<char> {
        let mut chars = self.text[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.lineno += 1;
        }
        Some(c)
    }

    fn push(&mut self, kind: TokenKind, lineno: usize) {
        self.tokens.push(Token { kind, lineno });
    }

    /// Reads the mandatory `uxf VERSION [custom]` header line.
    fn read_header(&mut self) -> Result<String, Error> {
        // Blank lines before the header are tolerated.
        while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\n')) {
            self.bump();
        }
        let hline = self.lineno;
        let start = self.pos;
        while !matches!(self.peek(), None | Some('\n')) {
            self.bump();
        }
        let line = self.text[start..self.pos].trim_end_matches('\r');
        self.bump(); // the newline, if any
        let word0 = line.split_whitespace().next().unwrap_or("");
        if word0 != "uxf" {
            if word0.eq_ignore_ascii_case("uxf") {
                return Err(self
                    .events
                    .fatal(130, hline, "the header magic must be lowercase 'uxf'"));
            }
            return Err(self.events.fatal(110, hline, "missing UXF file header"));
        }
        let rest = line["uxf".len()..].trim_start();
        let (version_word, custom) = match rest.find(char::is_whitespace) {
            Some(i) => (&rest[..i], rest[i..].trim()),
            None => (rest, ""),
        };
        if version_word.is_empty() {
            return Err(self.events.fatal(120, hline, "missing UXF file version"));
        }
        let version: f64 = match version_word.parse() {
            Ok(v) => v,
            Err(_) => {
                return Err(self.events.fatal(
                    151,
                    hline,
                    format!("invalid UXF file version {version_word:?}"),
                ))
            }
        };
        if version > 1.0 {
            return Err(self.events.fatal(
                141,
                hline,
                format!("version {version_word} is not supported, max is 1"),
            ));
        }
        Ok(custom.to_string())
    }

    /// Skips whitespace; a newline ends any open ttype definition.
    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' && self.in_tclass {
                self.in_tclass = false;
                let lineno = self.lineno;
                self.push(TokenKind::TClassEnd, lineno);
            }
            if matches!(c, ' ' | '\t' | '\r' | '\n') {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn scan(&mut self) -> Result<(), Error> {
        loop {
            self.skip_ws();
            let lineno = self.lineno;
            let Some(c) = self.peek() else { break };
            match c {
                '[' => {
                    self.bump();
                    self.push(TokenKind::ListBegin, lineno);
                }
                ']' => {
                    self.bump();
                    self.push(TokenKind::ListEnd, lineno);
                }
                '{' => {
                    self.bump();
                    self.push(TokenKind::MapBegin, lineno);
                }
                '}' => {
                    self.bump();
                    self.push(TokenKind::MapEnd, lineno);
                }
                '(' => {
                    if self.peek2() == Some(':') {
                        let bytes = self.read_bytes()?;
                        self.push(TokenKind::Bytes(bytes), lineno);
                    } else {
                        self.bump();
                        self.push(TokenKind::TableBegin, lineno);
                    }
                }
                ')' => {
                    self.bump();
                    self.push(TokenKind::TableEnd, lineno);
                }
                '#' => {
                    self.bump();
                    if self.peek() != Some('<') {
                        // 160 at the file-comment position, 180 later.
                        let code = if self.tokens.is_empty() { 160 } else { 180 };
                        return Err(self.events.fatal(
                            code,
                            lineno,
                            "a comment must be a string, expected '<' after '#'",
                        ));
                    }
                    let s = self.read_string_chunks()?;
                    self.push(TokenKind::Comment(s), lineno);
                }
                '<' => {
                    let s = self.read_string_chunks()?;
                    self.push(TokenKind::Str(s), lineno);
                }
                '!' => {
                    self.bump();
                    let start = self.pos;
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.bump();
                    }
                    let source = self.text[start..self.pos].trim().to_string();
                    if source.is_empty() {
                        return Err(self.events.fatal(170, lineno, "empty import"));
                    }
                    self.push(TokenKind::Import(source), lineno);
                }
                '=' => {
                    self.bump();
                    self.in_tclass = true;
                    self.push(TokenKind::TClassBegin, lineno);
                }
                '?' => {
                    self.bump();
                    self.push(TokenKind::Null, lineno);
                }
                '-' | '+' | '0'..='9' => {
                    let kind = self.read_number(lineno)?;
                    self.push(kind, lineno);
                }
                c if c.is_alphabetic() || c == '_' => {
                    let kind = self.read_word(lineno)?;
                    self.push(kind, lineno);
                }
                _ => {
                    return Err(self
                        .events
                        .fatal(170, lineno, format!("invalid character {c:?}")))
                }
            }
        }
        if self.in_tclass {
            self.in_tclass = false;
            let lineno = self.lineno;
            self.push(TokenKind::TClassEnd, lineno);
        }
        let lineno = self.lineno;
        self.push(TokenKind::Eof, lineno);
        Ok(())
    }

    /// Reads one `<…>` chunk, unescaping `&lt;`, `&gt;`, and `&amp;`.
    fn read_string(&mut self) -> Result<String, Error> {
        let lineno = self.lineno;
        self.bump(); // '<'
        let start = self.pos;
        loop {
            match self.peek() {
                Some('>') => break,
                Some(_) => {
                    self.bump();
                }
                None => {
                    return Err(self.events.fatal(270, lineno, "unterminated string"));
                }
            }
        }
        let raw = &self.text[start..self.pos];
        self.bump(); // '>'
        Ok(unescape(raw))
    }

    /// Reads a string and any whitespace-surrounded `&` continuations,
    /// concatenating the chunks.
    fn read_string_chunks(&mut self) -> Result<String, Error> {
        let mut s = self.read_string()?;
        loop {
            let save_pos = self.pos;
            let save_lineno = self.lineno;
            // Continuations bind more tightly than ttype-def line ends.
            let save_in_tclass = self.in_tclass;
            self.in_tclass = false;
            self.skip_ws();
            if self.peek() == Some('&') {
                self.bump();
                self.skip_ws();
                self.in_tclass = save_in_tclass;
                if self.peek() != Some('<') {
                    let lineno = self.lineno;
                    return Err(self.events.fatal(
                        170,
                        lineno,
                        "expected a string chunk after '&'",
                    ));
                }
                s.push_str(&self.read_string()?);
            } else {
                self.pos = save_pos;
                self.lineno = save_lineno;
                self.in_tclass = save_in_tclass;
                return Ok(s);
            }
        }
    }

    /// Reads a `(:…:)` hex bytes literal; whitespace between digits is
    /// allowed, the digit count must be even.
    fn read_bytes(&mut self) -> Result<Vec<u8>, Error> {
        let lineno = self.lineno;
        self.bump(); // '('
        self.bump(); // ':'
        let mut digits = Vec::new();
        loop {
            match self.peek() {
                Some(':') if self.peek2() == Some(')') => {
                    self.bump();
                    self.bump();
                    break;
                }
                Some(c) if c.is_ascii_hexdigit() => {
                    digits.push(c.to_digit(16).unwrap() as u8);
                    self.bump();
                }
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some(c) => {
                    let lineno = self.lineno;
                    return Err(self.events.fatal(
                        200,
                        lineno,
                        format!("invalid hex digit {c:?} in bytes"),
                    ));
                }
                None => {
                    return Err(self.events.fatal(270, lineno, "unterminated bytes"));
                }
            }
        }
        if digits.len() % 2 != 0 {
            return Err(self.events.fatal(
                200,
                lineno,
                "bytes must contain an even number of hex digits",
            ));
        }
        Ok(digits.chunks(2).map(|pair| (pair[0] << 4) | pair[1]).collect())
    }

    /// Reads an identifier, keyword, type name, or `name:vtype` pair.
    fn read_word(&mut self, lineno: usize) -> Result<TokenKind, Error> {
        let word = self.read_name();
        Ok(match word.as_str() {
            "yes" => TokenKind::Bool(true),
            "no" => TokenKind::Bool(false),
            "null" => TokenKind::Null,
            _ if is_builtin_type_name(&word) => TokenKind::Type(word),
            _ => {
                if self.peek() == Some(':') {
                    self.bump();
                    let vtype = self.read_name();
                    if vtype.is_empty() {
                        return Err(self.events.fatal(
                            170,
                            lineno,
                            format!("expected a type after {word}:"),
                        ));
                    }
                    TokenKind::FieldDef { name: word, vtype }
                } else {
                    TokenKind::Identifier(word)
                }
            }
        })
    }

    fn read_name(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        self.text[start..self.pos].to_string()
    }

    /// Reads an int, real, date, or datetime; the literal's shape decides
    /// which.
    fn read_number(&mut self, lineno: usize) -> Result<TokenKind, Error> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }
        while matches!(
            self.peek(),
            Some('0'..='9' | '.' | 'e' | 'E' | '+' | '-' | ':' | 'T' | 'Z' | 'z')
        ) {
            self.bump();
        }
        let s = &self.text[start..self.pos];
        match self.peek() {
            Some('_') => {
                return Err(self.events.fatal(
                    170,
                    lineno,
                    format!("invalid character '_' after number {s:?}"),
                ))
            }
            Some(c) if c.is_alphanumeric() => {
                return Err(self.events.fatal(
                    460,
                    lineno,
                    format!("trailing junk {c:?} after number {s:?}"),
                ))
            }
            _ => {}
        }
        let body = &s[usize::from(s.starts_with('-') || s.starts_with('+'))..];
        if s.contains('T') {
            self.parse_datetime(s, lineno)
        } else if body.matches('-').count() >= 2 {
            Ok(TokenKind::Date(self.parse_date_part(s, lineno)?))
        } else if s.contains(['.', 'e', 'E']) {
            match s.parse::<f64>() {
                Ok(r) => Ok(TokenKind::Real(r)),
                Err(_) if s.contains(['e', 'E']) => {
                    Err(self.events.fatal(210, lineno, format!("invalid real {s:?}")))
                }
                Err(_) => Err(self.events.fatal(220, lineno, format!("invalid number {s:?}"))),
            }
        } else {
            match s.parse::<i64>() {
                Ok(i) => Ok(TokenKind::Int(i)),
                Err(_) if body.bytes().all(|b| b.is_ascii_digit()) && !body.is_empty() => {
                    // Lexically valid but out of the platform's range.
                    self.events.warning(
                        218,
                        lineno,
                        format!("integer {s} is out of range, saturated"),
                    );
                    Ok(TokenKind::Int(if s.starts_with('-') {
                        i64::MIN
                    } else {
                        i64::MAX
                    }))
                }
                Err(_) => Err(self.events.fatal(220, lineno, format!("invalid number {s:?}"))),
            }
        }
    }

    fn parse_date_part(&mut self, s: &str, lineno: usize) -> Result<NaiveDate, Error> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
            return Err(self.events.fatal(220, lineno, format!("invalid date {s:?}")));
        }
        let y: i32 = parts[0].parse().map_err(|_| {
            self.events.fatal(220, lineno, format!("invalid date {s:?}"))
        })?;
        let m: u32 = parts[1].parse().map_err(|_| {
            self.events.fatal(220, lineno, format!("invalid date {s:?}"))
        })?;
        let d: u32 = parts[2].parse().map_err(|_| {
            self.events.fatal(220, lineno, format!("invalid date {s:?}"))
        })?;
        NaiveDate::from_ymd_opt(y, m, d)
            .ok_or_else(|| self.events.fatal(231, lineno, format!("invalid date {s:?}")))
    }

    fn parse_datetime(&mut self, s: &str, lineno: usize) -> Result<TokenKind, Error> {
        let (dpart, tpart) = s.split_once('T').unwrap();
        let date = self.parse_date_part(dpart, lineno)?;
        // Split off a trailing offset: Z, or +HH:MM / -HH:MM.
        let (timepart, offset) = match tpart.find(['+', '-']) {
            Some(i) => (&tpart[..i], Some(&tpart[i..])),
            None => match tpart.strip_suffix(['Z', 'z']) {
                Some(t) => (t, None),
                None => (tpart, None),
            },
        };
        let time = self.parse_time_part(timepart, s, lineno)?;
        if let Some(offset) = offset {
            self.check_offset(offset, s, lineno)?;
        }
        Ok(TokenKind::DateTime(NaiveDateTime::new(date, time)))
    }

    fn parse_time_part(&mut self, t: &str, s: &str, lineno: usize) -> Result<NaiveTime, Error> {
        let parts: Vec<&str> = t.split(':').collect();
        if parts.is_empty()
            || parts.len() > 3
            || parts
                .iter()
                .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(self.events.fatal(220, lineno, format!("invalid datetime {s:?}")));
        }
        let h: u32 = parts[0].parse().map_err(|_| {
            self.events.fatal(220, lineno, format!("invalid datetime {s:?}"))
        })?;
        let m: u32 = parts.get(1).unwrap_or(&"0").parse().map_err(|_| {
            self.events.fatal(220, lineno, format!("invalid datetime {s:?}"))
        })?;
        let sec: u32 = parts.get(2).unwrap_or(&"0").parse().map_err(|_| {
            self.events.fatal(220, lineno, format!("invalid datetime {s:?}"))
        })?;
        NaiveTime::from_hms_opt(h, m, sec)
            .ok_or_else(|| self.events.fatal(231, lineno, format!("invalid datetime {s:?}")))
    }

    /// Offsets are validated and then discarded: values are stored at
    /// naive 1-second resolution.
    fn check_offset(&mut self, offset: &str, s: &str, lineno: usize) -> Result<(), Error> {
        let digits = &offset[1..];
        let ok = matches!(digits.split(':').collect::<Vec<_>>().as_slice(),
            [h, m] if h.len() == 2 && m.len() == 2
                && h.bytes().all(|b| b.is_ascii_digit())
                && m.bytes().all(|b| b.is_ascii_digit()));
        if ok {
            Ok(())
        } else {
            Err(self.events.fatal(
                231,
                lineno,
                format!("invalid datetime offset in {s:?}"),
            ))
        }
    }
}

fn unescape(raw: &str) -> String {
    raw.replace("&lt;", "<").replace("&gt;", ">").replace("&amp;", "&")
}

/// XML-escapes string content for output: `&`, `<`, and `>`.
pub(crate) fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
