//! Naming-convention helpers shared by the emitters.

/// Convert a rule or token name to PascalCase.
///
/// Words may be separated by `_`, `-`, or `.`; interior capitals are kept,
/// so camelCase input only has its first letter raised.
///
/// # Examples
/// ```
/// use bnfgen_core::utils::to_pascal_case;
/// assert_eq!(to_pascal_case("add_expr"), "AddExpr");
/// assert_eq!(to_pascal_case("mulExpr"), "MulExpr");
/// assert_eq!(to_pascal_case("MulExpr"), "MulExpr");
/// ```
pub fn to_pascal_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut capitalize_next = true;
    for c in s.chars() {
        if matches!(c, '_' | '-' | '.') {
            capitalize_next = true;
            continue;
        }
        if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }
    result
}

/// Convert a rule or token name to UPPER_SNAKE, inserting `_` at camel humps.
///
/// # Examples
/// ```
/// use bnfgen_core::utils::to_upper_snake;
/// assert_eq!(to_upper_snake("addExpr"), "ADD_EXPR");
/// assert_eq!(to_upper_snake("add_expr"), "ADD_EXPR");
/// ```
pub fn to_upper_snake(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;
    for c in s.chars() {
        if matches!(c, '_' | '-' | '.') {
            result.push('_');
            prev_lower = false;
            continue;
        }
        if c.is_ascii_uppercase() && prev_lower {
            result.push('_');
        }
        prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        result.push(c.to_ascii_uppercase());
    }
    result
}

/// Whether `s` is shaped like an identifier (and can name a token constant).
pub fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
