//! The writer: canonical scalar rendering plus an Oppen-style two-pass
//! pretty-printer.
//!
//! The document's value is first flattened (via the visitor) into a finite
//! token stream of `{Begin, End, Str, Rws, Rnl, Eof}`. A measuring pass
//! computes each group's one-line width (a group containing a required
//! newline can never fit), and the emit pass then decides per `Begin`
//! whether its whole group goes on the current line (replaceable
//! whitespace becomes a single space) or wraps (one extra indent level,
//! replaceable whitespace becomes a line break).

use crate::lexer::escape;
use crate::map::Key;
use crate::value::Value;
use crate::visit::{visit, Visit};
use crate::{Options, Uxf};

const INF: usize = usize::MAX / 2;

/// Serialises a whole document.
pub(crate) fn to_text(uxo: &Uxf, options: &Options) -> String {
    let wrap_width = options.wrap_width.clamp(40, 999);
    let realdp = options.realdp.map(|dp| dp.min(15));
    let mut out = String::new();
    out.push_str("uxf 1");
    if !uxo.custom().is_empty() {
        out.push(' ');
        out.push_str(uxo.custom());
    }
    out.push('\n');
    if let Some(comment) = uxo.comment() {
        push_prelude_comment(&mut out, comment, wrap_width);
        out.push('\n');
    }
    // Imports, one per line, in first-appearance order.
    let mut seen = Vec::new();
    for source in uxo.imports().values() {
        if !seen.contains(&source.as_str()) {
            seen.push(source);
            out.push('!');
            out.push_str(source);
            out.push('\n');
        }
    }
    // Locally defined ttypes, sorted case-insensitively by name.
    let mut names: Vec<&str> = uxo
        .tclasses()
        .keys()
        .map(String::as_str)
        .filter(|name| !uxo.imports().contains_key(*name))
        .collect();
    names.sort_by_key(|name| (name.to_lowercase(), name.to_string()));
    for name in names {
        let tclass = &uxo.tclasses()[name];
        out.push('=');
        if let Some(comment) = tclass.comment() {
            push_prelude_comment(&mut out, comment, wrap_width);
            out.push(' ');
        }
        out.push_str(tclass.ttype());
        for field in tclass.fields() {
            out.push(' ');
            out.push_str(field.name());
            if let Some(vtype) = field.vtype() {
                out.push(':');
                out.push_str(vtype);
            }
        }
        out.push('\n');
    }
    let mut builder = Builder {
        tokens: Vec::new(),
        frames: Vec::new(),
        wrap_width,
        realdp,
    };
    visit(uxo, &mut |event| builder.event(event));
    Writer {
        out: &mut out,
        wrap_width,
        indent: &options.indent,
        pos: 0,
    }
    .render(&builder.tokens);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn push_prelude_comment(out: &mut String, comment: &str, wrap_width: usize) {
    let chunks = split_text(&escape(comment), wrap_width.saturating_sub(4).max(1));
    for (i, chunk) in chunks.iter().enumerate() {
        if i > 0 {
            out.push_str(" &\n");
        }
        if i == 0 {
            out.push('#');
        }
        out.push('<');
        out.push_str(chunk);
        out.push('>');
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Tok {
    Begin,
    End,
    Str(String),
    /// Replaceable whitespace: a space when the group fits, a line break
    /// when it wraps.
    Rws,
    /// A required line break.
    Rnl,
    Eof,
}

struct Frame {
    /// How many children have been emitted so far.
    count: usize,
    /// Whether the opening carried a comment or type, so the first child
    /// still needs a separator.
    lead_sep: bool,
    /// Tables with more than one record force one record per line.
    multirecord: bool,
    is_table: bool,
}

struct Builder {
    tokens: Vec<Tok>,
    frames: Vec<Frame>,
    wrap_width: usize,
    realdp: Option<u8>,
}

impl Builder {
    fn event(&mut self, event: Visit<'_>) {
        match event {
            Visit::UxfBegin(_) => {}
            Visit::UxfEnd => self.tokens.push(Tok::Eof),
            Visit::ListBegin(lst) => {
                self.separate();
                self.tokens.push(Tok::Begin);
                self.tokens.push(Tok::Str("[".to_string()));
                if let Some(comment) = lst.comment() {
                    self.string_tokens(comment, "#");
                }
                if let Some(vtype) = lst.vtype() {
                    if lst.comment().is_some() {
                        self.tokens.push(Tok::Rws);
                    }
                    self.tokens.push(Tok::Str(vtype.to_string()));
                }
                self.frames.push(Frame {
                    count: 0,
                    lead_sep: lst.comment().is_some() || lst.vtype().is_some(),
                    multirecord: false,
                    is_table: false,
                });
            }
            Visit::ListEnd => {
                self.frames.pop();
                self.tokens.push(Tok::Str("]".to_string()));
                self.tokens.push(Tok::End);
            }
            Visit::MapBegin(map) => {
                self.separate();
                self.tokens.push(Tok::Begin);
                self.tokens.push(Tok::Str("{".to_string()));
                if let Some(comment) = map.comment() {
                    self.string_tokens(comment, "#");
                }
                if let Some(ktype) = map.ktype() {
                    if map.comment().is_some() {
                        self.tokens.push(Tok::Rws);
                    }
                    let mut types = ktype.to_string();
                    if let Some(vtype) = map.vtype() {
                        types.push(' ');
                        types.push_str(vtype);
                    }
                    self.tokens.push(Tok::Str(types));
                }
                self.frames.push(Frame {
                    count: 0,
                    lead_sep: map.comment().is_some() || map.ktype().is_some(),
                    multirecord: false,
                    is_table: false,
                });
            }
            Visit::MapEnd => {
                self.frames.pop();
                self.tokens.push(Tok::Str("}".to_string()));
                self.tokens.push(Tok::End);
            }
            Visit::ItemBegin(key) => {
                self.separate();
                self.tokens.push(Tok::Begin);
                self.key_tokens(key);
                self.tokens.push(Tok::Rws);
                self.frames.push(Frame {
                    count: 1, // the key; its value needs no separator
                    lead_sep: false,
                    multirecord: false,
                    is_table: false,
                });
            }
            Visit::ItemEnd => {
                self.frames.pop();
                self.tokens.push(Tok::End);
            }
            Visit::TableBegin(table) => {
                self.separate();
                self.tokens.push(Tok::Begin);
                self.tokens.push(Tok::Str("(".to_string()));
                if let Some(comment) = table.comment() {
                    self.string_tokens(comment, "#");
                    self.tokens.push(Tok::Rws);
                }
                self.tokens.push(Tok::Str(table.ttype().to_string()));
                self.frames.push(Frame {
                    count: 0,
                    lead_sep: true,
                    multirecord: table.len() > 1,
                    is_table: true,
                });
            }
            Visit::TableEnd => {
                self.frames.pop();
                self.tokens.push(Tok::Str(")".to_string()));
                self.tokens.push(Tok::End);
            }
            Visit::RecordBegin => {
                self.separate();
                self.tokens.push(Tok::Begin);
                self.frames.push(Frame {
                    count: 0,
                    lead_sep: false,
                    multirecord: false,
                    is_table: false,
                });
            }
            Visit::RecordEnd => {
                self.frames.pop();
                self.tokens.push(Tok::End);
            }
            Visit::Scalar(value) => {
                self.separate();
                self.scalar_tokens(value);
            }
        }
    }

    /// Emits the separator owed before the next child of the current
    /// container, if any.
    fn separate(&mut self) {
        let Some(frame) = self.frames.last_mut() else { return };
        if frame.count == 0 {
            if frame.lead_sep {
                self.tokens.push(Tok::Rws);
            }
        } else if frame.is_table && frame.multirecord {
            self.tokens.push(Tok::Rnl);
        } else {
            self.tokens.push(Tok::Rws);
        }
        frame.count += 1;
    }

    fn scalar_tokens(&mut self, value: &Value) {
        match value {
            Value::Null => self.tokens.push(Tok::Str("?".to_string())),
            Value::Bool(true) => self.tokens.push(Tok::Str("yes".to_string())),
            Value::Bool(false) => self.tokens.push(Tok::Str("no".to_string())),
            Value::Int(i) => self.tokens.push(Tok::Str(i.to_string())),
            Value::Real(r) => self.tokens.push(Tok::Str(format_real(*r, self.realdp))),
            Value::Date(d) => self.tokens.push(Tok::Str(d.format("%Y-%m-%d").to_string())),
            Value::DateTime(dt) => self
                .tokens
                .push(Tok::Str(dt.format("%Y-%m-%dT%H:%M:%S").to_string())),
            Value::Str(s) => self.string_tokens(s, ""),
            Value::Bytes(b) => self.bytes_tokens(b),
            Value::List(_) | Value::Map(_) | Value::Table(_) => {
                unreachable!("the visitor never yields a collection as a scalar")
            }
        }
    }

    fn key_tokens(&mut self, key: &Key) {
        match key {
            Key::Int(i) => self.tokens.push(Tok::Str(i.to_string())),
            Key::Date(d) => self.tokens.push(Tok::Str(d.format("%Y-%m-%d").to_string())),
            Key::DateTime(dt) => self
                .tokens
                .push(Tok::Str(dt.format("%Y-%m-%dT%H:%M:%S").to_string())),
            Key::Str(s) => self.string_tokens(s, ""),
            Key::Bytes(b) => self.bytes_tokens(b),
        }
    }

    /// Renders a string, splitting it into `&`-joined chunks when it is
    /// longer than the wrap width; `prefix` is `#` for comments.
    fn string_tokens(&mut self, s: &str, prefix: &str) {
        let text = escape(s);
        if text.chars().count() + 2 >= self.wrap_width {
            let span = self.wrap_width.saturating_sub(4).max(1);
            let chunks = split_text(&text, span);
            for (i, chunk) in chunks.iter().enumerate() {
                if i > 0 {
                    self.tokens.push(Tok::Rws);
                    self.tokens.push(Tok::Str("&".to_string()));
                    self.tokens.push(Tok::Rws);
                }
                let prefix = if i == 0 { prefix } else { "" };
                self.tokens.push(Tok::Str(format!("{prefix}<{chunk}>")));
            }
        } else {
            self.tokens.push(Tok::Str(format!("{prefix}<{text}>")));
        }
    }

    fn bytes_tokens(&mut self, bytes: &[u8]) {
        let mut hex = String::with_capacity(bytes.len() * 2);
        for byte in bytes {
            hex.push_str(&format!("{byte:02X}"));
        }
        if hex.len() + 4 >= self.wrap_width {
            let span = self.wrap_width - 2;
            self.tokens.push(Tok::Str("(:".to_string()));
            let chars: Vec<char> = hex.chars().collect();
            for (i, chunk) in chars.chunks(span).enumerate() {
                if i > 0 {
                    self.tokens.push(Tok::Rws);
                }
                self.tokens.push(Tok::Str(chunk.iter().collect()));
            }
            self.tokens.push(Tok::Str(":)".to_string()));
        } else {
            self.tokens.push(Tok::Str(format!("(:{hex}:)")));
        }
    }
}

/// Splits `text` at the last whitespace within each `span`-character
/// window, like the original writer: whole-window chunks while whitespace
/// can be found, then hard splits for whatever is left.
fn split_text(text: &str, span: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let window = span.min(chars.len() - start);
        let split = (start..start + window)
            .rev()
            .find(|&i| chars[i] == ' ' || chars[i] == '\n');
        match split {
            Some(i) => {
                chunks.push(chars[start..=i].iter().collect());
                start = i + 1;
            }
            None => break,
        }
    }
    // No more whitespace to split on: hard-split the remainder.
    while start < chars.len() {
        let end = (start + span).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        start = end;
    }
    chunks
}

fn format_real(r: f64, realdp: Option<u8>) -> String {
    let mut value = r;
    if let Some(dp) = realdp {
        if let Ok(rounded) = format!("{:.*}", dp as usize, value).parse::<f64>() {
            value = rounded;
        }
    }
    let mut text = format!("{value}");
    if !text.contains(['.', 'e', 'E', 'N', 'i']) {
        text.push_str(".0");
    }
    text
}

struct Writer<'o> {
    out: &'o mut String,
    wrap_width: usize,
    indent: &'o str,
    pos: usize,
}

impl<'o> Writer<'o> {
    fn render(mut self, tokens: &[Tok]) {
        let flat = flat_lengths(tokens);
        let mut broken: Vec<bool> = Vec::new();
        let mut depth = 0usize;
        for (i, token) in tokens.iter().enumerate() {
            match token {
                Tok::Begin => {
                    let fits = self.pos + flat[i] <= self.wrap_width;
                    if !fits {
                        depth += 1;
                    }
                    broken.push(!fits);
                }
                Tok::End => {
                    if broken.pop() == Some(true) {
                        depth -= 1;
                    }
                }
                Tok::Str(s) => {
                    self.out.push_str(s);
                    match s.rfind('\n') {
                        Some(at) => self.pos = s[at + 1..].chars().count(),
                        None => self.pos += s.chars().count(),
                    }
                }
                Tok::Rws => {
                    if broken.last().copied().unwrap_or(false) {
                        self.newline(depth);
                    } else {
                        self.out.push(' ');
                        self.pos += 1;
                    }
                }
                Tok::Rnl => self.newline(depth),
                Tok::Eof => break,
            }
        }
    }

    fn newline(&mut self, depth: usize) {
        self.out.push('\n');
        for _ in 0..depth {
            self.out.push_str(self.indent);
        }
        self.pos = depth * self.indent.chars().count();
    }
}

/// The measuring pass: the one-line width of every group, `INF` when the
/// group contains a required newline or an embedded line break.
fn flat_lengths(tokens: &[Tok]) -> Vec<usize> {
    let mut flat = vec![0usize; tokens.len()];
    let mut stack: Vec<(usize, usize)> = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        let add = |stack: &mut Vec<(usize, usize)>, n: usize| {
            if let Some((_, acc)) = stack.last_mut() {
                *acc = acc.saturating_add(n).min(INF);
            }
        };
        match token {
            Tok::Begin => stack.push((i, 0)),
            Tok::End => {
                if let Some((begin, acc)) = stack.pop() {
                    flat[begin] = acc;
                    add(&mut stack, acc);
                }
            }
            Tok::Str(s) => {
                let len = if s.contains('\n') { INF } else { s.chars().count() };
                add(&mut stack, len);
            }
            Tok::Rws => add(&mut stack, 1),
            Tok::Rnl => add(&mut stack, INF),
            Tok::Eof => {}
        }
    }
    flat
}
