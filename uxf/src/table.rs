//! Tables: ordered records conforming to a tclass.

use crate::check::conforms;
use crate::event::Error;
use crate::tclass::TClass;
use crate::value::Value;

/// A record is a positional tuple whose arity equals the tclass's field
/// count.
pub type Record = Vec<Value>;

/// A table: a tclass, an optional comment, and an ordered sequence of
/// records.
///
/// The tclass travels with the table; its identity is its ttype name, so
/// serialising a table only requires that name to exist in the owning
/// document's registry.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    tclass: TClass,
    comment: Option<String>,
    records: Vec<Record>,
}

impl Table {
    /// Creates an empty table of the given tclass.
    pub fn new(tclass: TClass, comment: Option<&str>) -> Self {
        Table {
            tclass,
            comment: comment.map(str::to_string),
            records: Vec::new(),
        }
    }

    /// The ttype name of this table's tclass.
    pub fn ttype(&self) -> &str {
        self.tclass.ttype()
    }

    /// The table's tclass.
    pub fn tclass(&self) -> &TClass {
        &self.tclass
    }

    /// The table's comment, if any.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Sets or clears the comment.
    pub fn set_comment(&mut self, comment: Option<&str>) {
        self.comment = comment.map(str::to_string);
    }

    /// Appends a record.
    ///
    /// Fails with 334 for a fieldless tclass, 332 for an arity mismatch,
    /// and 290 for a field value that does not conform to its declared
    /// vtype. An int is silently widened for a field declared `real`.
    pub fn push(&mut self, record: Record) -> Result<(), Error> {
        let record = self.coerce(record)?;
        self.records.push(record);
        Ok(())
    }

    /// Inserts a record at `row`, with the same checks as [`Table::push`].
    pub fn insert(&mut self, row: usize, record: Record) -> Result<(), Error> {
        let record = self.coerce(record)?;
        self.records.insert(row, record);
        Ok(())
    }

    /// Replaces the record at `row`, with the same checks as
    /// [`Table::push`].
    pub fn set(&mut self, row: usize, record: Record) -> Result<(), Error> {
        let record = self.coerce(record)?;
        self.records[row] = record;
        Ok(())
    }

    /// Removes and returns the record at `row`, if it exists.
    pub fn remove(&mut self, row: usize) -> Option<Record> {
        if row < self.records.len() {
            Some(self.records.remove(row))
        } else {
            None
        }
    }

    /// Borrows the record at `row`.
    pub fn get(&self, row: usize) -> Option<&Record> {
        self.records.get(row)
    }

    /// Mutably borrows the record at `row`.
    pub fn get_mut(&mut self, row: usize) -> Option<&mut Record> {
        self.records.get_mut(row)
    }

    /// The first record.
    pub fn first(&self) -> Option<&Record> {
        self.records.first()
    }

    /// The second record.
    pub fn second(&self) -> Option<&Record> {
        self.records.get(1)
    }

    /// The third record.
    pub fn third(&self) -> Option<&Record> {
        self.records.get(2)
    }

    /// The fourth record.
    pub fn fourth(&self) -> Option<&Record> {
        self.records.get(3)
    }

    /// The last record.
    pub fn last(&self) -> Option<&Record> {
        self.records.last()
    }

    /// The value of the named field in the record at `row`.
    pub fn field(&self, row: usize, name: &str) -> Option<&Value> {
        let index = self.tclass.field_index(name)?;
        self.records.get(row)?.get(index)
    }

    /// Mutable access to the named field in the record at `row`.
    pub fn field_mut(&mut self, row: usize, name: &str) -> Option<&mut Value> {
        let index = self.tclass.field_index(name)?;
        self.records.get_mut(row)?.get_mut(index)
    }

    /// The number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates over the records in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Iterates mutably over the records.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Record> {
        self.records.iter_mut()
    }

    pub(crate) fn push_unchecked(&mut self, record: Record) {
        self.records.push(record);
    }

    fn coerce(&self, mut record: Record) -> Result<Record, Error> {
        if self.tclass.is_fieldless() {
            return Err(Error::new(
                334,
                format!("fieldless ttype {:?} may not have records", self.ttype()),
            ));
        }
        if record.len() != self.tclass.len() {
            return Err(Error::new(
                332,
                format!(
                    "ttype {:?} expects records of {} values, got {}",
                    self.ttype(),
                    self.tclass.len(),
                    record.len()
                ),
            ));
        }
        for (value, field) in record.iter_mut().zip(self.tclass.fields()) {
            let Some(vtype) = field.vtype() else { continue };
            if vtype == "real" {
                if let Value::Int(i) = value {
                    *value = Value::Real(*i as f64);
                    continue;
                }
            }
            if !conforms(value, vtype) {
                return Err(Error::new(
                    290,
                    format!(
                        "field {:?} of ttype {:?} expects {vtype}, got {}",
                        field.name(),
                        self.ttype(),
                        value.typename()
                    ),
                ));
            }
        }
        Ok(record)
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
