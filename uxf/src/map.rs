//! An insertion-ordered map with typed keys.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;

use crate::check::conforms;
use crate::event::Error;
use crate::util::{check_vtype_name, is_ktype_name};
use crate::value::Value;

/// A map key: the hashable subset of the scalar types.
///
/// Reals, booleans, and null may not be keys; collections certainly may
/// not. The ordering is variant-first, then value, which gives the
/// comparator a stable tie-break when two keys share a string form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// An integer key.
    Int(i64),
    /// A date key.
    Date(NaiveDate),
    /// A datetime key.
    DateTime(NaiveDateTime),
    /// A string key.
    Str(String),
    /// A bytes key.
    Bytes(Vec<u8>),
}

impl Key {
    /// The UXF name of this key's type.
    pub fn typename(&self) -> &'static str {
        match self {
            Key::Int(_) => "int",
            Key::Date(_) => "date",
            Key::DateTime(_) => "datetime",
            Key::Str(_) => "str",
            Key::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Display for Key {
    /// The plain text form, used for key sorting; the writer renders keys
    /// through the same canonical scalar formatting as values.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{i}"),
            Key::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Key::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            Key::Str(s) => write!(f, "{s}"),
            Key::Bytes(b) => {
                for byte in b {
                    write!(f, "{byte:02X}")?;
                }
                Ok(())
            }
        }
    }
}

impl TryFrom<Value> for Key {
    type Error = Error;

    /// Fails with 290 for a collection and 294 for any other non-key
    /// scalar (notably reals).
    fn try_from(value: Value) -> Result<Self, Error> {
        match value {
            Value::Int(i) => Ok(Key::Int(i)),
            Value::Date(d) => Ok(Key::Date(d)),
            Value::DateTime(dt) => Ok(Key::DateTime(dt)),
            Value::Str(s) => Ok(Key::Str(s)),
            Value::Bytes(b) => Ok(Key::Bytes(b)),
            Value::List(_) | Value::Map(_) | Value::Table(_) => Err(Error::new(
                290,
                format!("map keys may not be collections, got {}", value.typename()),
            )),
            _ => Err(Error::new(
                294,
                format!(
                    "map keys must be int, date, datetime, str, or bytes, got {}",
                    value.typename()
                ),
            )),
        }
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Value {
        match key {
            Key::Int(i) => Value::Int(i),
            Key::Date(d) => Value::Date(d),
            Key::DateTime(dt) => Value::DateTime(dt),
            Key::Str(s) => Value::Str(s),
            Key::Bytes(b) => Value::Bytes(b),
        }
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Key {
        Key::Int(i)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Key {
        Key::Str(s.to_string())
    }
}

impl From<NaiveDate> for Key {
    fn from(d: NaiveDate) -> Key {
        Key::Date(d)
    }
}

/// An insertion-ordered mapping from [`Key`] to [`Value`] with optional
/// declared ktype and vtype and an optional comment.
///
/// Insertion order is preserved for serialisation only; comparison is
/// order-independent in every mode.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Map {
    ktype: Option<String>,
    vtype: Option<String>,
    comment: Option<String>,
    entries: IndexMap<Key, Value>,
}

impl Map {
    /// Creates an empty untyped map.
    pub fn new() -> Self {
        Map::default()
    }

    /// Creates an empty map with a declared ktype and optional vtype.
    ///
    /// The ktype must be one of `int`, `date`, `datetime`, `str`, `bytes`
    /// (code 294 otherwise).
    pub fn with_types(ktype: &str, vtype: Option<&str>) -> Result<Self, Error> {
        if !is_ktype_name(ktype) {
            return Err(Error::new(
                294,
                format!("map ktype must be int, date, datetime, str, or bytes, got {ktype:?}"),
            ));
        }
        if let Some(vtype) = vtype {
            check_vtype_name(vtype).map_err(|(code, msg)| Error::new(code, msg))?;
        }
        Ok(Map {
            ktype: Some(ktype.to_string()),
            vtype: vtype.map(str::to_string),
            comment: None,
            entries: IndexMap::new(),
        })
    }

    /// The declared key type, if any.
    pub fn ktype(&self) -> Option<&str> {
        self.ktype.as_deref()
    }

    /// The declared value type, if any.
    pub fn vtype(&self) -> Option<&str> {
        self.vtype.as_deref()
    }

    /// The map's comment, if any.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Sets or clears the comment.
    pub fn set_comment(&mut self, comment: Option<&str>) {
        self.comment = comment.map(str::to_string);
    }

    /// Inserts an entry, enforcing the declared ktype and vtype.
    ///
    /// Returns the previous value for the key, if any. A key of the wrong
    /// type fails with 294; a value that does not conform fails with 290.
    pub fn insert<K, V>(&mut self, key: K, value: V) -> Result<Option<Value>, Error>
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        let key = key.into();
        let mut value = value.into();
        if let Some(ktype) = self.ktype.as_deref() {
            if key.typename() != ktype {
                return Err(Error::new(
                    294,
                    format!("expected {ktype} map key, got {}", key.typename()),
                ));
            }
        }
        if let Some(vtype) = self.vtype.as_deref() {
            if vtype == "real" {
                if let Value::Int(i) = value {
                    value = Value::Real(i as f64);
                }
            }
            if !conforms(&value, vtype) {
                return Err(Error::new(
                    290,
                    format!("expected {vtype} map value, got {}", value.typename()),
                ));
            }
        }
        Ok(self.entries.insert(key, value))
    }

    /// Borrows the value for `key`.
    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Mutably borrows the value for `key`.
    pub fn get_mut(&mut self, key: &Key) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    /// Removes the entry for `key`, preserving the order of the rest.
    pub fn remove(&mut self, key: &Key) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    /// True if the map has an entry for `key`.
    pub fn contains_key(&self, key: &Key) -> bool {
        self.entries.contains_key(key)
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, Key, Value> {
        self.entries.iter()
    }

    /// Iterates over keys in insertion order.
    pub fn keys(&self) -> indexmap::map::Keys<'_, Key, Value> {
        self.entries.keys()
    }

    /// Iterates over values in insertion order.
    pub fn values(&self) -> indexmap::map::Values<'_, Key, Value> {
        self.entries.values()
    }

    pub(crate) fn insert_unchecked(&mut self, key: Key, value: Value) {
        self.entries.insert(key, value);
    }

    pub(crate) fn set_types_unchecked(&mut self, ktype: Option<&str>, vtype: Option<&str>) {
        self.ktype = ktype.map(str::to_string);
        self.vtype = vtype.map(str::to_string);
    }
}

impl<'a> IntoIterator for &'a Map {
    type Item = (&'a Key, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, Key, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_typed() {
        let mut m = Map::with_types("str", Some("int")).unwrap();
        m.insert("x", 1).unwrap();
        assert_eq!(m.insert(7i64, 2).unwrap_err().code, 294);
        assert_eq!(m.insert("y", "z").unwrap_err().code, 290);
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn real_is_not_a_ktype() {
        assert_eq!(Map::with_types("real", None).unwrap_err().code, 294);
    }

    #[test]
    fn collection_keys_rejected() {
        let err = Key::try_from(Value::List(crate::list::List::new())).unwrap_err();
        assert_eq!(err.code, 290);
        let err = Key::try_from(Value::Real(7.9)).unwrap_err();
        assert_eq!(err.code, 294);
    }

    #[test]
    fn insertion_order_kept() {
        let mut m = Map::new();
        m.insert("z", 1).unwrap();
        m.insert("a", 2).unwrap();
        let keys: Vec<_> = m.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["z", "a"]);
    }
}
