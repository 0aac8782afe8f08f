//! Reads and writes Uniform eXchange Format (UXF) files.
//!
//! UXF is a plain-text, human-editable, typed data interchange format: a
//! strictly-typed superset of JSON with user-defined record classes
//! (ttypes), typed lists and maps, comments, dates, bytes, and file-level
//! imports. This crate is the core codec: the lexer, parser, type system,
//! in-memory value model, pretty-printer, comparator, and import
//! resolver.
//!
//! # References
//! * <https://uxf.github.io/>

#![forbid(unused_must_use)]
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::collapsible_if)]
#![allow(clippy::needless_lifetimes)]

mod check;
mod compare;
mod event;
mod import;
mod lexer;
mod list;
mod map;
mod parser;
mod pretty;
mod table;
mod tclass;
mod util;
mod value;
mod visit;

pub use check::conforms;
pub use compare::{compare, Compare};
pub use event::{Error, Event, Events, OnEventFn, Severity};
pub use list::List;
pub use map::{Key, Map};
pub use table::{Record, Table};
pub use tclass::{Field, TClass, TClassBuilder};
pub use value::Value;
pub use visit::{visit, Visit};

use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use indexmap::IndexMap;

use import::ImportContext;

#[cfg(test)]
#[static_init::dynamic]
static INIT_LOGGER: () = env_logger::builder()
    .format_timestamp(None)
    .filter_level(log::LevelFilter::Debug)
    .is_test(true)
    .init();

/// The gzip magic; files starting with it are decompressed transparently.
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Options accepted by the load and dump entry points.
///
/// Loading uses `drop_unused`, `replace_imports`, and `timeout`; dumping
/// uses `wrap_width`, `indent`, and `realdp`. One struct serves both so a
/// load/dump round trip needs a single value.
#[derive(Clone, Debug)]
pub struct Options {
    /// Drop every ttype (and its import entry) the value never uses.
    pub drop_unused: bool,
    /// Clear the imports, keeping their ttypes as if defined locally.
    pub replace_imports: bool,
    /// The wrap column for output, clamped into 40..=999.
    pub wrap_width: usize,
    /// One indent level of output, normally some spaces.
    pub indent: String,
    /// Round reals to this many decimal places on output (0..=15).
    pub realdp: Option<u8>,
    /// How long an import's HTTP GET may take.
    pub timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            drop_unused: false,
            replace_imports: false,
            wrap_width: 96,
            indent: "   ".to_string(),
            realdp: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// An in-memory UXF document.
///
/// A `Uxf` owns its ttype registry and its single top-level value: a
/// list, map, or table, with an empty list standing in for an empty
/// document. The `imports` mapping records, for every imported ttype,
/// the import source that supplied it.
#[derive(Clone, Debug)]
pub struct Uxf {
    custom: String,
    comment: Option<String>,
    imports: IndexMap<String, String>,
    tclasses: IndexMap<String, TClass>,
    value: Value,
}

impl Default for Uxf {
    /// An empty document: no custom text, no ttypes, an empty list value.
    fn default() -> Self {
        Uxf::new("")
    }
}

impl Uxf {
    /// Creates an empty document; `custom` is the free text carried on
    /// the header line.
    pub fn new(custom: &str) -> Self {
        Uxf {
            custom: custom.to_string(),
            comment: None,
            imports: IndexMap::new(),
            tclasses: IndexMap::new(),
            value: Value::List(List::new()),
        }
    }

    /// The header's custom text; empty when there is none.
    pub fn custom(&self) -> &str {
        &self.custom
    }

    /// Sets the header's custom text.
    pub fn set_custom(&mut self, custom: &str) {
        self.custom = custom.to_string();
    }

    /// The file-level comment, if any.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Sets or clears the file-level comment.
    pub fn set_comment(&mut self, comment: Option<&str>) {
        self.comment = comment.map(str::to_string);
    }

    /// For each imported ttype, the import source that supplied it.
    pub fn imports(&self) -> &IndexMap<String, String> {
        &self.imports
    }

    /// The ttype registry, in definition order.
    pub fn tclasses(&self) -> &IndexMap<String, TClass> {
        &self.tclasses
    }

    /// Looks up one tclass by ttype name.
    pub fn tclass(&self, ttype: &str) -> Option<&TClass> {
        self.tclasses.get(ttype)
    }

    /// Registers tclasses. Identical duplicates are allowed; a
    /// conflicting redefinition fails with 690.
    pub fn add_tclasses<I>(&mut self, tclasses: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = TClass>,
    {
        for tclass in tclasses {
            match self.tclasses.get(tclass.ttype()) {
                None => {
                    self.tclasses.insert(tclass.ttype().to_string(), tclass);
                }
                Some(existing) if existing.is_equivalent(&tclass, true, false) => {}
                Some(_) => {
                    return Err(Error::new(
                        690,
                        format!("conflicting ttype definition for {:?}", tclass.ttype()),
                    ))
                }
            }
        }
        Ok(())
    }

    /// Replaces the whole registry; every key must equal its tclass's
    /// nonempty ttype (694 otherwise).
    pub fn set_tclasses(&mut self, tclasses: IndexMap<String, TClass>) -> Result<(), Error> {
        for (key, tclass) in &tclasses {
            if key.is_empty() || key != tclass.ttype() {
                return Err(Error::new(
                    694,
                    format!("tclass registry key {key:?} must equal the ttype {:?}",
                            tclass.ttype()),
                ));
            }
        }
        self.tclasses = tclasses;
        Ok(())
    }

    /// The top-level value: always a list, map, or table.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Mutable access to the top-level value.
    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    /// Replaces the top-level value.
    ///
    /// Fails with 100 unless the value is a list, map, or table. The
    /// tclass of every table in the assigned tree is registered
    /// automatically (690 on conflict).
    pub fn set_value(&mut self, value: Value) -> Result<(), Error> {
        if !matches!(value, Value::List(_) | Value::Map(_) | Value::Table(_)) {
            return Err(Error::new(
                100,
                format!(
                    "a Uxf value must be a list, map, or table, got {}",
                    value.typename()
                ),
            ));
        }
        let mut tclasses = Vec::new();
        collect_tclasses(&value, &mut tclasses);
        self.add_tclasses(tclasses)?;
        self.value = value;
        Ok(())
    }

    /// Walks the document depth-first; see [`Visit`].
    pub fn visit<F: FnMut(Visit<'_>)>(&self, visitor: &mut F) {
        visit::visit(self, visitor);
    }

    pub(crate) fn replace_value(&mut self, value: Value) {
        self.value = value;
    }

    pub(crate) fn replace_tclasses(
        &mut self,
        tclasses: IndexMap<String, TClass>,
        imports: IndexMap<String, String>,
    ) {
        self.tclasses = tclasses;
        self.imports = imports;
    }

    pub(crate) fn drop_tclasses(&mut self, names: &[String]) {
        for name in names {
            self.tclasses.shift_remove(name);
            self.imports.shift_remove(name);
        }
    }

    pub(crate) fn clear_imports(&mut self) {
        self.imports.clear();
    }
}

fn collect_tclasses(value: &Value, out: &mut Vec<TClass>) {
    match value {
        Value::List(lst) => {
            for item in lst {
                collect_tclasses(item, out);
            }
        }
        Value::Map(map) => {
            for (_, item) in map {
                collect_tclasses(item, out);
            }
        }
        Value::Table(table) => {
            out.push(table.tclass().clone());
            for record in table {
                for item in record {
                    collect_tclasses(item, out);
                }
            }
        }
        _ => {}
    }
}

/// Reads a source file as text, gunzipping when the gzip magic leads.
pub(crate) fn read_source_text(path: &Path) -> Result<String, Error> {
    let io_error = |message: String| Error {
        code: 102,
        filename: path.display().to_string(),
        lineno: 0,
        message,
    };
    let bytes = std::fs::read(path)
        .map_err(|err| io_error(format!("failed to read UXF text: {err}")))?;
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut text = String::new();
        GzDecoder::new(bytes.as_slice())
            .read_to_string(&mut text)
            .map_err(|err| io_error(format!("failed to read gzipped UXF text: {err}")))?;
        Ok(text)
    } else {
        String::from_utf8(bytes)
            .map_err(|err| io_error(format!("UXF text must be UTF-8: {err}")))
    }
}

fn make_events<'a>(filename: &str, on_event: Option<OnEventFn<'a>>) -> Events<'a> {
    match on_event {
        Some(handler) => Events::with_handler(filename, handler),
        None => Events::new(filename, true),
    }
}

/// Loads a document from a file (gzipped or plain) with default options;
/// warnings go to stderr.
pub fn load(path: impl AsRef<Path>) -> Result<Uxf, Error> {
    load_with(path, &Options::default(), None)
}

/// Loads a document from a file, with options and an optional event
/// callback.
pub fn load_with(
    path: impl AsRef<Path>,
    options: &Options,
    on_event: Option<OnEventFn<'_>>,
) -> Result<Uxf, Error> {
    let path = path.as_ref();
    let filename = path.display().to_string();
    let text = read_source_text(path)?;
    let mut events = make_events(&filename, on_event);
    let mut ctx = ImportContext::new();
    parser::parse(&text, &filename, options, &mut events, &mut ctx, false)
}

/// Parses a document from a string with default options; warnings go to
/// stderr.
pub fn loads(text: &str) -> Result<Uxf, Error> {
    loads_with(text, "-", &Options::default(), None)
}

/// Parses a document from a string. `filename` is used in events (and as
/// the base for relative imports when it names a real file).
pub fn loads_with(
    text: &str,
    filename: &str,
    options: &Options,
    on_event: Option<OnEventFn<'_>>,
) -> Result<Uxf, Error> {
    let mut events = make_events(filename, on_event);
    let mut ctx = ImportContext::new();
    parser::parse(text, filename, options, &mut events, &mut ctx, false)
}

/// Serialises a document to a string with default options.
pub fn dumps(uxo: &Uxf) -> Result<String, Error> {
    dumps_with(uxo, &Options::default(), None)
}

/// Serialises a document to a string.
///
/// A full type recheck runs first; violations are reported through the
/// event callback but do not stop the dump.
pub fn dumps_with(
    uxo: &Uxf,
    options: &Options,
    on_event: Option<OnEventFn<'_>>,
) -> Result<String, Error> {
    let mut events = make_events("-", on_event);
    check::check_document(uxo, &mut events);
    Ok(pretty::to_text(uxo, options))
}

/// Writes a document to a file with default options; a path ending in
/// `.gz` is gzipped.
pub fn dump(path: impl AsRef<Path>, uxo: &Uxf) -> Result<(), Error> {
    dump_with(path, uxo, &Options::default(), None)
}

/// Writes a document to a file, with options and an optional event
/// callback.
pub fn dump_with(
    path: impl AsRef<Path>,
    uxo: &Uxf,
    options: &Options,
    on_event: Option<OnEventFn<'_>>,
) -> Result<(), Error> {
    let path = path.as_ref();
    let filename = path.display().to_string();
    let mut events = make_events(&filename, on_event);
    check::check_document(uxo, &mut events);
    let text = pretty::to_text(uxo, options);
    let io_error = |message: String| Error {
        code: 104,
        filename: filename.clone(),
        lineno: 0,
        message,
    };
    if path.extension().is_some_and(|ext| ext == "gz") {
        let file = std::fs::File::create(path)
            .map_err(|err| io_error(format!("failed to write UXF text: {err}")))?;
        let mut encoder = GzEncoder::new(file, flate2::Compression::default());
        encoder
            .write_all(text.as_bytes())
            .and_then(|()| encoder.finish().map(|_| ()))
            .map_err(|err| io_error(format!("failed to write gzipped UXF text: {err}")))?;
    } else {
        std::fs::write(path, text.as_bytes())
            .map_err(|err| io_error(format!("failed to write UXF text: {err}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_must_be_a_collection() {
        let mut uxo = Uxf::new("");
        assert_eq!(uxo.set_value(Value::Str("data".into())).unwrap_err().code, 100);
        uxo.set_value(Value::List(List::new())).unwrap();
    }

    #[test]
    fn set_value_registers_tclasses() {
        let tclass = TClass::from_names("point", &["x", "y"]).unwrap();
        let mut table = Table::new(tclass, None);
        table.push(vec![Value::Int(1), Value::Int(2)]).unwrap();
        let mut uxo = Uxf::new("");
        uxo.set_value(Value::Table(table)).unwrap();
        assert!(uxo.tclass("point").is_some());
    }

    #[test]
    fn conflicting_tclasses_rejected() {
        let mut uxo = Uxf::new("");
        let err = uxo
            .add_tclasses([
                TClass::fieldless("a").unwrap(),
                TClass::fieldless("b").unwrap(),
                TClass::from_names("a", &["x", "y"]).unwrap(),
            ])
            .unwrap_err();
        assert_eq!(err.code, 690);
    }

    #[test]
    fn registry_keys_must_match() {
        let mut uxo = loads("uxf 1\n[]\n").unwrap();
        let mut registry = IndexMap::new();
        registry.insert(String::new(), TClass::from_names("one", &["a", "b"]).unwrap());
        assert_eq!(uxo.set_tclasses(registry).unwrap_err().code, 694);
    }
}
