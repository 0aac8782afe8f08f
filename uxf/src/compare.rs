//! Comparing documents, from bit-faithful to untyped equivalence.

use crate::check::used_ttypes;
use crate::list::List;
use crate::map::{Key, Map};
use crate::table::Table;
use crate::util::isclose;
use crate::value::Value;
use crate::Uxf;

/// How strictly [`compare`] matches two documents.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Compare {
    /// Identical shape including comments, declared types, and imports.
    /// Map entries compare order-independently in every mode.
    Exact,
    /// As [`Compare::Exact`], but every comment is ignored.
    IgnoreComments,
    /// Unused ttypes are dropped, imports are taken as their expansions,
    /// and comments are ignored.
    Equivalent,
    /// As [`Compare::Equivalent`], and declared list/map/field vtypes are
    /// ignored too.
    UntypedEquivalent,
}

struct Cmp {
    ignore_comments: bool,
    equivalent: bool,
    untyped: bool,
}

impl Cmp {
    fn from(mode: Compare) -> Self {
        match mode {
            Compare::Exact => Cmp { ignore_comments: false, equivalent: false, untyped: false },
            Compare::IgnoreComments => {
                Cmp { ignore_comments: true, equivalent: false, untyped: false }
            }
            Compare::Equivalent => Cmp { ignore_comments: true, equivalent: true, untyped: false },
            Compare::UntypedEquivalent => {
                Cmp { ignore_comments: true, equivalent: true, untyped: true }
            }
        }
    }
}

/// An empty comment and an absent comment compare equal.
pub(crate) fn eq_text(a: Option<&str>, b: Option<&str>) -> bool {
    a.unwrap_or("") == b.unwrap_or("")
}

/// Compares two documents under the given mode.
pub fn compare(a: &Uxf, b: &Uxf, mode: Compare) -> bool {
    let cmp = Cmp::from(mode);
    if a.custom() != b.custom() {
        return false;
    }
    if !cmp.ignore_comments && !eq_text(a.comment(), b.comment()) {
        return false;
    }
    if !cmp.equivalent {
        // Imports must match pairwise, in order.
        if a.imports().len() != b.imports().len()
            || a.imports().iter().zip(b.imports()).any(|(x, y)| x != y)
        {
            return false;
        }
    }
    if !cmp.untyped && !eq_tclass_registries(a, b, &cmp) {
        return false;
    }
    eq_value(a.value(), b.value(), &cmp)
}

fn eq_tclass_registries(a: &Uxf, b: &Uxf, cmp: &Cmp) -> bool {
    let keep = |uxo: &Uxf| -> Vec<String> {
        let mut names: Vec<String> = if cmp.equivalent {
            let mut used = std::collections::HashSet::new();
            used_ttypes(uxo.value(), &mut used);
            uxo.tclasses().keys().filter(|n| used.contains(*n)).cloned().collect()
        } else {
            uxo.tclasses().keys().cloned().collect()
        };
        names.sort();
        names
    };
    let a_names = keep(a);
    let b_names = keep(b);
    if a_names != b_names {
        return false;
    }
    a_names.iter().all(|name| {
        a.tclasses()[name].is_equivalent(&b.tclasses()[name], cmp.ignore_comments, cmp.untyped)
    })
}

fn eq_value(a: &Value, b: &Value, cmp: &Cmp) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Real(x), Value::Real(y)) => isclose(*x, *y),
        // Cross-numeric equality only under the equivalence modes.
        (Value::Int(x), Value::Real(y)) | (Value::Real(y), Value::Int(x)) => {
            cmp.equivalent && isclose(*x as f64, *y)
        }
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Bytes(x), Value::Bytes(y)) => x == y,
        (Value::Date(x), Value::Date(y)) => x == y,
        (Value::DateTime(x), Value::DateTime(y)) => x == y,
        (Value::List(x), Value::List(y)) => eq_list(x, y, cmp),
        (Value::Map(x), Value::Map(y)) => eq_map(x, y, cmp),
        (Value::Table(x), Value::Table(y)) => eq_table(x, y, cmp),
        _ => false,
    }
}

fn eq_list(a: &List, b: &List, cmp: &Cmp) -> bool {
    if !cmp.ignore_comments && !eq_text(a.comment(), b.comment()) {
        return false;
    }
    if !cmp.untyped && a.vtype() != b.vtype() {
        return false;
    }
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| eq_value(x, y, cmp))
}

fn eq_map(a: &Map, b: &Map, cmp: &Cmp) -> bool {
    if !cmp.ignore_comments && !eq_text(a.comment(), b.comment()) {
        return false;
    }
    if !cmp.untyped && (a.ktype() != b.ktype() || a.vtype() != b.vtype()) {
        return false;
    }
    if a.len() != b.len() {
        return false;
    }
    // Map comparison is order-independent in every mode: entries are
    // compared sorted by the string form of the key. Insertion order is a
    // serialisation property, not part of a map's value.
    let sorted = |m: &Map| -> Vec<(Key, Value)> {
        let mut entries: Vec<(Key, Value)> =
            m.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        entries.sort_by(|(x, _), (y, _)| {
            x.to_string().cmp(&y.to_string()).then_with(|| x.cmp(y))
        });
        entries
    };
    sorted(a)
        .iter()
        .zip(sorted(b).iter())
        .all(|((ka, va), (kb, vb))| ka == kb && eq_value(va, vb, cmp))
}

fn eq_table(a: &Table, b: &Table, cmp: &Cmp) -> bool {
    if a.ttype() != b.ttype() {
        return false;
    }
    if !cmp.ignore_comments && !eq_text(a.comment(), b.comment()) {
        return false;
    }
    if !cmp.untyped && !a.tclass().is_equivalent(b.tclass(), cmp.ignore_comments, cmp.untyped) {
        return false;
    }
    a.len() == b.len()
        && a.iter().zip(b.iter()).all(|(ra, rb)| {
            ra.len() == rb.len() && ra.iter().zip(rb.iter()).all(|(x, y)| eq_value(x, y, cmp))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loads;

    #[test]
    fn exact_implies_equivalent() {
        let a = loads("uxf 1\n=p x:int y:int\n(p 1 2 3 4)\n").unwrap();
        let b = loads("uxf 1\n=p x:int y:int\n(p 1 2 3 4)\n").unwrap();
        assert!(compare(&a, &b, Compare::Exact));
        assert!(compare(&a, &b, Compare::Equivalent));
    }

    #[test]
    fn comments_matter_only_to_exact() {
        let a = loads("uxf 1\n[#<note> 1 2]\n").unwrap();
        let b = loads("uxf 1\n[1 2]\n").unwrap();
        assert!(!compare(&a, &b, Compare::Exact));
        assert!(compare(&a, &b, Compare::IgnoreComments));
        assert!(compare(&a, &b, Compare::Equivalent));
    }

    #[test]
    fn map_order_never_matters() {
        let a = loads("uxf 1\n{<x> 1 <y> 2}\n").unwrap();
        let b = loads("uxf 1\n{<y> 2 <x> 1}\n").unwrap();
        assert!(compare(&a, &b, Compare::Exact));
        assert!(compare(&a, &b, Compare::Equivalent));
    }

    #[test]
    fn unused_ttypes_ignored_when_equivalent() {
        let a = loads("uxf 1\n=p x y\n=unused a\n[(p 1 2)]\n").unwrap();
        let b = loads("uxf 1\n=p x y\n[(p 1 2)]\n").unwrap();
        assert!(!compare(&a, &b, Compare::Exact));
        assert!(compare(&a, &b, Compare::Equivalent));
    }

    #[test]
    fn vtypes_ignored_only_when_untyped() {
        let a = loads("uxf 1\n[int 1 2]\n").unwrap();
        let b = loads("uxf 1\n[1 2]\n").unwrap();
        assert!(!compare(&a, &b, Compare::Equivalent));
        assert!(compare(&a, &b, Compare::UntypedEquivalent));
    }

    #[test]
    fn reals_use_isclose() {
        let a = loads("uxf 1\n[349.85]\n").unwrap();
        let b = loads("uxf 1\n[349.850]\n").unwrap();
        assert!(compare(&a, &b, Compare::Exact));
    }
}
