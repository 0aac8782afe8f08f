//! Type conformance: the single place runtime type checks live.

use std::collections::HashSet;

use crate::event::Events;
use crate::value::Value;
use crate::Uxf;

/// True if `value` satisfies the declared type name `vtype`.
///
/// Policy: `null` conforms to everything; an int conforms to a declared
/// `real` (widening); container names match the container tag; any other
/// name is a ttype and requires a table of that ttype.
pub fn conforms(value: &Value, vtype: &str) -> bool {
    if value.is_null() {
        return true;
    }
    match vtype {
        "bool" | "bytes" | "date" | "datetime" | "int" | "str" | "list" | "map" | "table" => {
            value.typename() == vtype
        }
        "real" => matches!(value, Value::Real(_) | Value::Int(_)),
        ttype => match value {
            Value::Table(t) => t.ttype() == ttype,
            _ => false,
        },
    }
}

/// Collects the ttype names used anywhere in `value`, including by tables
/// nested inside lists, maps, and other tables, and by declared vtypes.
pub(crate) fn used_ttypes(value: &Value, used: &mut HashSet<String>) {
    let note = |name: Option<&str>, used: &mut HashSet<String>| {
        if let Some(name) = name {
            if !crate::util::is_builtin_type_name(name) {
                used.insert(name.to_string());
            }
        }
    };
    match value {
        Value::List(lst) => {
            note(lst.vtype(), used);
            for item in lst {
                used_ttypes(item, used);
            }
        }
        Value::Map(m) => {
            note(m.vtype(), used);
            for (_, v) in m {
                used_ttypes(v, used);
            }
        }
        Value::Table(t) => {
            used.insert(t.ttype().to_string());
            for field in t.tclass().fields() {
                note(field.vtype(), used);
            }
            for record in t {
                for v in record {
                    used_ttypes(v, used);
                }
            }
        }
        _ => {}
    }
}

/// The whole-document recheck run before every dump.
///
/// Walks the tree and reports (without repairing) every violation of the
/// declared types: 290 for list/map/field values, 294 for map keys, and
/// 694 for a table whose ttype is missing from the document's registry.
pub(crate) fn check_document(uxo: &Uxf, events: &mut Events) {
    check_value(uxo, uxo.value(), events);
}

fn check_value(uxo: &Uxf, value: &Value, events: &mut Events) {
    match value {
        Value::List(lst) => {
            if let Some(vtype) = lst.vtype() {
                for item in lst {
                    if !conforms(item, vtype) {
                        events.error(
                            290,
                            0,
                            format!("list expects {vtype}, got {}", item.typename()),
                        );
                    }
                }
            }
            for item in lst {
                check_value(uxo, item, events);
            }
        }
        Value::Map(m) => {
            if let Some(ktype) = m.ktype() {
                for key in m.keys() {
                    if key.typename() != ktype {
                        events.error(
                            294,
                            0,
                            format!("map expects {ktype} keys, got {}", key.typename()),
                        );
                    }
                }
            }
            if let Some(vtype) = m.vtype() {
                for v in m.values() {
                    if !conforms(v, vtype) {
                        events.error(
                            290,
                            0,
                            format!("map expects {vtype} values, got {}", v.typename()),
                        );
                    }
                }
            }
            for (_, v) in m {
                check_value(uxo, v, events);
            }
        }
        Value::Table(t) => {
            if uxo.tclass(t.ttype()).is_none() {
                events.error(
                    694,
                    0,
                    format!("table ttype {:?} is not registered", t.ttype()),
                );
            }
            for record in t {
                for (v, field) in record.iter().zip(t.tclass().fields()) {
                    if let Some(vtype) = field.vtype() {
                        if !conforms(v, vtype) {
                            events.error(
                                290,
                                0,
                                format!(
                                    "field {:?} of ttype {:?} expects {vtype}, got {}",
                                    field.name(),
                                    t.ttype(),
                                    v.typename()
                                ),
                            );
                        }
                    }
                }
                for v in record {
                    check_value(uxo, v, events);
                }
            }
        }
        _ => {}
    }
}
