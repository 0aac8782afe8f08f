//! The UXF value model: a tagged variant over scalars and collections.

use chrono::{NaiveDate, NaiveDateTime};

use crate::list::List;
use crate::map::Map;
use crate::table::Table;

/// Any value a UXF document can hold.
///
/// Scalars are stored directly; collections own their contents. The tag is
/// the single source of truth for runtime type checks (see
/// [`conforms`](crate::check::conforms)).
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// The null value, written `?`.
    Null,
    /// `yes` or `no`.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// An IEEE 754 double.
    Real(f64),
    /// A UTF-8 string, written `<…>` with XML escapes.
    Str(String),
    /// Raw bytes, written `(:…:)` in hex.
    Bytes(Vec<u8>),
    /// A calendar date, written `YYYY-MM-DD`.
    Date(NaiveDate),
    /// A date and time at 1-second resolution, written `YYYY-MM-DDTHH:MM:SS`.
    DateTime(NaiveDateTime),
    /// An insertion-ordered list.
    List(List),
    /// An insertion-ordered map with unique keys.
    Map(Map),
    /// A table of records conforming to a ttype.
    Table(Table),
}

impl Value {
    /// The UXF name of this value's type, e.g. `"int"` or `"list"`.
    pub fn typename(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Real(_) => "real",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Table(_) => "table",
        }
    }

    /// True for every variant except the collections.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::List(_) | Value::Map(_) | Value::Table(_))
    }

    /// True for lists, maps, and tables.
    pub fn is_collection(&self) -> bool {
        !self.is_scalar()
    }

    /// True for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The boolean, if this is a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer, if this is an int.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The real, if this is a real; an int is widened.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(r) => Some(*r),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// The string slice, if this is a str.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The byte slice, if this is a bytes value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// The date, if this is a date.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// The datetime, if this is a datetime.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Borrows the list, if this is a list.
    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(lst) => Some(lst),
            _ => None,
        }
    }

    /// Mutably borrows the list, if this is a list.
    pub fn as_list_mut(&mut self) -> Option<&mut List> {
        match self {
            Value::List(lst) => Some(lst),
            _ => None,
        }
    }

    /// Borrows the map, if this is a map.
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Mutably borrows the map, if this is a map.
    pub fn as_map_mut(&mut self) -> Option<&mut Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Borrows the table, if this is a table.
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Mutably borrows the table, if this is a table.
    pub fn as_table_mut(&mut self) -> Option<&mut Table> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<List> for Value {
    fn from(lst: List) -> Self {
        Value::List(lst)
    }
}

impl From<Map> for Value {
    fn from(m: Map) -> Self {
        Value::Map(m)
    }
}

impl From<Table> for Value {
    fn from(t: Table) -> Self {
        Value::Table(t)
    }
}
