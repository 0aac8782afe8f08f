//! An insertion-ordered, optionally typed list.

use std::ops::{Index, IndexMut};

use crate::check::conforms;
use crate::event::Error;
use crate::util::check_vtype_name;
use crate::value::Value;

/// An ordered sequence of [`Value`]s with an optional declared item vtype
/// and an optional comment.
///
/// When a vtype is declared, the checked mutators enforce it: an int is
/// silently widened for a declared `real`, anything else that does not
/// conform fails with code 290. `null` is always accepted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct List {
    vtype: Option<String>,
    comment: Option<String>,
    items: Vec<Value>,
}

impl List {
    /// Creates an empty untyped list.
    pub fn new() -> Self {
        List::default()
    }

    /// Creates an empty list whose items must conform to `vtype`.
    pub fn with_vtype(vtype: &str) -> Result<Self, Error> {
        check_vtype_name(vtype).map_err(|(code, msg)| Error::new(code, msg))?;
        Ok(List {
            vtype: Some(vtype.to_string()),
            comment: None,
            items: Vec::new(),
        })
    }

    /// The declared item vtype, if any.
    pub fn vtype(&self) -> Option<&str> {
        self.vtype.as_deref()
    }

    /// The list's comment, if any.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Sets or clears the comment.
    pub fn set_comment(&mut self, comment: Option<&str>) {
        self.comment = comment.map(str::to_string);
    }

    /// Appends `value`, enforcing the declared vtype.
    pub fn push<V: Into<Value>>(&mut self, value: V) -> Result<(), Error> {
        let value = self.coerce(value.into())?;
        self.items.push(value);
        Ok(())
    }

    /// Inserts `value` at `index`, enforcing the declared vtype.
    pub fn insert<V: Into<Value>>(&mut self, index: usize, value: V) -> Result<(), Error> {
        let value = self.coerce(value.into())?;
        self.items.insert(index, value);
        Ok(())
    }

    /// Removes and returns the item at `index`, if it exists.
    pub fn remove(&mut self, index: usize) -> Option<Value> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    /// Borrows the item at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    /// Mutably borrows the item at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.items.get_mut(index)
    }

    /// The number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if there are no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over the items in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    /// Iterates mutably over the items.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Value> {
        self.items.iter_mut()
    }

    // The parser performs its own conformance checks with source positions,
    // so it bypasses the mutation-API checks.
    pub(crate) fn push_unchecked(&mut self, value: Value) {
        self.items.push(value);
    }

    pub(crate) fn set_vtype_unchecked(&mut self, vtype: &str) {
        self.vtype = Some(vtype.to_string());
    }

    fn coerce(&self, value: Value) -> Result<Value, Error> {
        let Some(vtype) = self.vtype.as_deref() else {
            return Ok(value);
        };
        if vtype == "real" {
            if let Value::Int(i) = value {
                return Ok(Value::Real(i as f64));
            }
        }
        if conforms(&value, vtype) {
            Ok(value)
        } else {
            Err(Error::new(
                290,
                format!("expected {vtype} in list, got {}", value.typename()),
            ))
        }
    }
}

impl Index<usize> for List {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.items[index]
    }
}

impl IndexMut<usize> for List {
    fn index_mut(&mut self, index: usize) -> &mut Value {
        &mut self.items[index]
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
