//! User-defined record classes: fields and tclasses.

use crate::event::Error;
use crate::util::{check_identifier, check_vtype_name};

/// One field of a [`TClass`]: a name and an optional declared vtype.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    name: String,
    vtype: Option<String>,
}

impl Field {
    /// Creates a field, validating the name (codes 300–310) and, when
    /// given, the vtype's well-formedness.
    ///
    /// Whether a vtype that names a ttype is actually registered is only
    /// known once a whole document has been parsed; that check is the
    /// parser's (code 500).
    pub fn new(name: &str, vtype: Option<&str>) -> Result<Self, Error> {
        check_identifier(name).map_err(|(code, msg)| Error::new(code, msg))?;
        if let Some(vtype) = vtype {
            check_vtype_name(vtype).map_err(|(code, msg)| Error::new(code, msg))?;
        }
        Ok(Field {
            name: name.to_string(),
            vtype: vtype.map(str::to_string),
        })
    }

    /// The field's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field's declared vtype, if any.
    pub fn vtype(&self) -> Option<&str> {
        self.vtype.as_deref()
    }
}

/// A user-defined record class: a ttype name, an optional comment, and an
/// ordered sequence of fields.
///
/// A `TClass` with no fields is a fieldless marker; tables of it may hold
/// no records and the bare `(Name)` form is its only value.
#[derive(Clone, Debug, PartialEq)]
pub struct TClass {
    ttype: String,
    comment: Option<String>,
    fields: Vec<Field>,
}

impl TClass {
    /// Creates a tclass. The ttype must be a nonempty valid identifier
    /// (298 when empty) and field names must be unique, compared
    /// case-insensitively (336).
    pub fn new(ttype: &str, fields: Vec<Field>, comment: Option<&str>) -> Result<Self, Error> {
        if ttype.is_empty() {
            return Err(Error::new(298, "a ttype name must be nonempty"));
        }
        check_identifier(ttype).map_err(|(code, msg)| Error::new(code, msg))?;
        for (i, field) in fields.iter().enumerate() {
            if fields[..i]
                .iter()
                .any(|f| f.name().eq_ignore_ascii_case(field.name()))
            {
                return Err(Error::new(
                    336,
                    format!("duplicate field name {:?} in ttype {ttype:?}", field.name()),
                ));
            }
        }
        Ok(TClass {
            ttype: ttype.to_string(),
            comment: comment.map(str::to_string),
            fields,
        })
    }

    /// Creates a fieldless tclass.
    pub fn fieldless(ttype: &str) -> Result<Self, Error> {
        TClass::new(ttype, Vec::new(), None)
    }

    /// Creates a tclass from bare field names (no vtypes), a convenience
    /// for building tables programmatically.
    pub fn from_names(ttype: &str, names: &[&str]) -> Result<Self, Error> {
        let mut fields = Vec::with_capacity(names.len());
        for name in names {
            fields.push(Field::new(name, None)?);
        }
        TClass::new(ttype, fields, None)
    }

    /// The ttype name.
    pub fn ttype(&self) -> &str {
        &self.ttype
    }

    /// The tclass's comment, if any.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// The ordered fields.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The number of fields, i.e. the arity of every record.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if this tclass has no fields.
    pub fn is_fieldless(&self) -> bool {
        self.fields.is_empty()
    }

    /// The index of the named field, if present.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }

    /// Structural equality with comparison-mode flags: comments may be
    /// ignored, and declared field vtypes may be ignored.
    pub fn is_equivalent(&self, other: &TClass, ignore_comments: bool, ignore_types: bool) -> bool {
        if self.ttype != other.ttype || self.fields.len() != other.fields.len() {
            return false;
        }
        if !ignore_comments && !crate::compare::eq_text(self.comment(), other.comment()) {
            return false;
        }
        self.fields.iter().zip(other.fields.iter()).all(|(a, b)| {
            a.name() == b.name() && (ignore_types || a.vtype() == b.vtype())
        })
    }
}

/// Builds a [`TClass`] a field at a time, rejecting duplicates as they
/// are appended (338) rather than at the end.
#[derive(Clone, Debug, Default)]
pub struct TClassBuilder {
    ttype: String,
    comment: Option<String>,
    fields: Vec<Field>,
}

impl TClassBuilder {
    /// Starts a builder for the given ttype name; the name is validated
    /// by [`TClassBuilder::build`].
    pub fn new(ttype: &str) -> Self {
        TClassBuilder {
            ttype: ttype.to_string(),
            comment: None,
            fields: Vec::new(),
        }
    }

    /// Sets the comment.
    pub fn comment(&mut self, comment: &str) -> &mut Self {
        self.comment = Some(comment.to_string());
        self
    }

    /// Appends a field by name; fails with 338 if the name (compared
    /// case-insensitively) is already present.
    pub fn append(&mut self, name: &str, vtype: Option<&str>) -> Result<&mut Self, Error> {
        if self
            .fields
            .iter()
            .any(|f| f.name().eq_ignore_ascii_case(name))
        {
            return Err(Error::new(
                338,
                format!("field {name:?} is already in ttype {:?}", self.ttype),
            ));
        }
        self.fields.push(Field::new(name, vtype)?);
        Ok(self)
    }

    /// Finishes the builder; fails with 298 for an empty ttype name.
    pub fn build(self) -> Result<TClass, Error> {
        TClass::new(&self.ttype, self.fields, self.comment.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttype_must_be_nonempty() {
        assert_eq!(TClass::new("", Vec::new(), None).unwrap_err().code, 298);
        assert_eq!(TClassBuilder::new("").build().unwrap_err().code, 298);
    }

    #[test]
    fn field_name_rules() {
        assert_eq!(Field::new("1st", None).unwrap_err().code, 300);
        assert_eq!(Field::new("yes", None).unwrap_err().code, 302);
        assert_eq!(Field::new("int", None).unwrap_err().code, 304);
        assert_eq!(Field::new(&"x".repeat(80), None).unwrap_err().code, 306);
        assert_eq!(Field::new("x-5", None).unwrap_err().code, 310);
    }

    #[test]
    fn duplicate_fields() {
        assert_eq!(
            TClass::from_names("t1", &["a", "b", "c", "b"]).unwrap_err().code,
            336
        );
        let mut builder = TClassBuilder::new("T1");
        builder.append("A", None).unwrap();
        builder.append("B", None).unwrap();
        builder.append("C", None).unwrap();
        builder.append("a", None).unwrap_err();
        let err = builder.append("c", None).unwrap_err();
        assert_eq!(err.code, 338);
    }

    #[test]
    fn field_lookup() {
        let tclass = TClass::from_names("point", &["x", "y"]).unwrap();
        assert_eq!(tclass.field_index("y"), Some(1));
        assert_eq!(tclass.field_index("z"), None);
        assert!(!tclass.is_fieldless());
        assert_eq!(tclass.len(), 2);
    }
}
