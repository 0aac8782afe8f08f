//! Identifier rules and small shared helpers.

/// The maximum length (in characters) of a ttype or field identifier.
pub const MAX_IDENTIFIER_LEN: usize = 60;

/// Words that can never be used as identifiers.
pub const RESERVED_WORDS: [&str; 3] = ["no", "null", "yes"];

/// All the built-in type names, scalar and container.
pub const TYPE_NAMES: [&str; 10] = [
    "bool", "bytes", "date", "datetime", "int", "list", "map", "real", "str", "table",
];

/// The type names a map key may be declared as.
pub const KTYPE_NAMES: [&str; 5] = ["bytes", "date", "datetime", "int", "str"];

/// True for `int`, `real`, `str`, etc.
pub fn is_builtin_type_name(name: &str) -> bool {
    TYPE_NAMES.contains(&name)
}

/// True for `list`, `map`, and `table`.
pub fn is_container_type_name(name: &str) -> bool {
    matches!(name, "list" | "map" | "table")
}

/// True if `name` is legal as a map ktype.
pub fn is_ktype_name(name: &str) -> bool {
    KTYPE_NAMES.contains(&name)
}

/// Validates a ttype or field identifier.
///
/// On failure returns the stable code and a message: 300 bad start,
/// 302 reserved word, 304 built-in type name, 306 too long, 310 bad
/// character. The empty string fails with 300; TClass construction maps
/// that case to its own 298.
pub fn check_identifier(name: &str) -> Result<(), (u16, String)> {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => {
            return Err((
                300,
                format!("identifiers must start with a letter or underscore, got {name:?}"),
            ))
        }
    }
    if RESERVED_WORDS.contains(&name) {
        return Err((302, format!("identifiers may not be the reserved word {name:?}")));
    }
    if is_builtin_type_name(name) {
        return Err((304, format!("identifiers may not be the built-in type name {name:?}")));
    }
    if name.chars().count() > MAX_IDENTIFIER_LEN {
        return Err((
            306,
            format!("identifiers may be at most {MAX_IDENTIFIER_LEN} characters, got {name:?}"),
        ));
    }
    if let Some(c) = name.chars().find(|&c| !(c.is_alphanumeric() || c == '_')) {
        return Err((310, format!("invalid character {c:?} in identifier {name:?}")));
    }
    Ok(())
}

/// Validates a declared vtype: either a built-in type name or a
/// well-formed identifier (the identifier need not be registered yet).
pub fn check_vtype_name(name: &str) -> Result<(), (u16, String)> {
    if is_builtin_type_name(name) {
        return Ok(());
    }
    check_identifier(name)
}

/// Relative-tolerance float comparison used by the comparator.
///
/// Matches `math.isclose` with a relative tolerance of 1e-9 and an
/// absolute tolerance of zero.
pub fn isclose(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs())
}
