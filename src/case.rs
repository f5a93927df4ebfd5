//! Case conversion between protobuf naming conventions and Elm identifiers.

/// Converts a protobuf name (`snake_case`, `SCREAMING_SNAKE` or `camelCase`)
/// to an Elm type or constructor name.
pub(crate) fn to_pascal_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut uppercase_next = true;
    let mut prev_lower = false;

    for ch in name.chars() {
        if ch == '_' || ch == '-' || ch == '.' {
            uppercase_next = true;
            prev_lower = false;
        } else if uppercase_next {
            result.push(ch.to_ascii_uppercase());
            uppercase_next = false;
            prev_lower = ch.is_ascii_lowercase();
        } else if ch.is_ascii_uppercase() {
            // Keep an existing camel hump, but lowercase runs of capitals
            // so SCREAMING_SNAKE labels come out as ScreamingSnake.
            if prev_lower {
                result.push(ch);
            } else {
                result.push(ch.to_ascii_lowercase());
            }
            prev_lower = false;
        } else {
            result.push(ch);
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        }
    }

    result
}

/// Converts a protobuf name to an Elm value or record field name.
pub(crate) fn to_lower_camel_case(name: &str) -> String {
    let pascal = to_pascal_case(name);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => pascal,
    }
}

/// Whether `s` is usable as an Elm identifier without escaping, ignoring
/// keyword clashes.
pub(crate) fn is_valid_ident(s: &str) -> bool {
    !s.is_empty()
        && s.as_bytes()[0].is_ascii_alphabetic()
        && s.as_bytes()[1..]
            .iter()
            .all(|&ch| ch.is_ascii_alphanumeric() || ch == b'_')
}
