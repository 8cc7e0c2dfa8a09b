mod types;
mod value;

pub use types::*;
pub use value::*;

/// PascalCase identifier fragment built from a user facing name.
///
/// `"base color"` becomes `BaseColor`, `"roughness_2"` becomes `Roughness2`.
/// Returns an empty string when the name has no usable characters.
pub fn sanitize_identifier(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    for part in name.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            result.push(first.to_ascii_uppercase());
            result.extend(chars);
        }
    }

    if result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, '_');
    }

    result
}

/// Plain identifier or member access such as `l_0` or `i.vTextureCoords.xy`.
pub fn is_reference(code: &str) -> bool {
    !code.is_empty()
        && !code.starts_with('.')
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// True for code that can be used as an operand without parentheses:
/// identifiers, literals, member access and a single call expression.
pub fn is_atomic_expression(code: &str) -> bool {
    let code = code.trim();
    if code.is_empty() {
        return false;
    }

    if code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return true;
    }

    // `name( ... )` or `name( ... ).xyz` where the first paren closes at the call end
    let Some(open) = code.find('(') else {
        return false;
    };

    let head = &code[..open];
    if head.is_empty()
        || !head
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == ':')
    {
        return false;
    }

    let mut depth = 0usize;
    for (index, c) in code.char_indices().skip(open) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let rest = &code[index + 1..];
                    return rest
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
                }
            }
            _ => {}
        }
    }

    false
}
