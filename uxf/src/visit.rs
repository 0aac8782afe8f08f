//! Depth-first traversal of a document as a stream of typed events.

use crate::list::List;
use crate::map::{Key, Map};
use crate::table::Table;
use crate::value::Value;
use crate::Uxf;

/// One traversal event.
///
/// Events are emitted in document order; every `…Begin` is matched by
/// exactly one `…End` at the same nesting depth. Map entries are bracketed
/// by `ItemBegin` (which carries the key) and `ItemEnd`; table records by
/// `RecordBegin`/`RecordEnd`. `Scalar` is never a collection.
#[derive(Debug)]
pub enum Visit<'a> {
    /// The start of the document.
    UxfBegin(&'a Uxf),
    /// The end of the document.
    UxfEnd,
    /// The start of a list.
    ListBegin(&'a List),
    /// The end of the current list.
    ListEnd,
    /// The start of a map.
    MapBegin(&'a Map),
    /// The end of the current map.
    MapEnd,
    /// The start of one map entry, carrying its key.
    ItemBegin(&'a Key),
    /// The end of the current map entry.
    ItemEnd,
    /// The start of a table.
    TableBegin(&'a Table),
    /// The end of the current table.
    TableEnd,
    /// The start of one table record.
    RecordBegin,
    /// The end of the current record.
    RecordEnd,
    /// A scalar value.
    Scalar(&'a Value),
}

/// Walks `uxo` depth-first, feeding every event to `visitor`.
pub fn visit<F: FnMut(Visit<'_>)>(uxo: &Uxf, visitor: &mut F) {
    visitor(Visit::UxfBegin(uxo));
    visit_value(uxo.value(), visitor);
    visitor(Visit::UxfEnd);
}

fn visit_value<F: FnMut(Visit<'_>)>(value: &Value, visitor: &mut F) {
    match value {
        Value::List(lst) => {
            visitor(Visit::ListBegin(lst));
            for item in lst {
                visit_value(item, visitor);
            }
            visitor(Visit::ListEnd);
        }
        Value::Map(map) => {
            visitor(Visit::MapBegin(map));
            for (key, item) in map {
                visitor(Visit::ItemBegin(key));
                visit_value(item, visitor);
                visitor(Visit::ItemEnd);
            }
            visitor(Visit::MapEnd);
        }
        Value::Table(table) => {
            visitor(Visit::TableBegin(table));
            for record in table {
                visitor(Visit::RecordBegin);
                for item in record {
                    visit_value(item, visitor);
                }
                visitor(Visit::RecordEnd);
            }
            visitor(Visit::TableEnd);
        }
        scalar => visitor(Visit::Scalar(scalar)),
    }
}
