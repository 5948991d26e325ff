//! Identifier case conversion.

/// Convert CamelCase (or snake_case) to snake_case.
///
/// Runs of capitals are kept together, so `HTTPRequest` becomes `http_request`.
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::new();

    for (i, &ch) in chars.iter().enumerate() {
        if ch == '-' || ch == ' ' {
            if !result.ends_with('_') {
                result.push('_');
            }
            continue;
        }
        if ch.is_uppercase() {
            let prev = if i > 0 { chars.get(i - 1) } else { None };
            let next = chars.get(i + 1);
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary && !result.ends_with('_') {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}

/// Convert to lowerCamelCase.
pub fn to_camel_case(s: &str) -> String {
    let pascal = to_pascal_case(s);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Convert to PascalCase.
pub fn to_pascal_case(s: &str) -> String {
    to_snake_case(s)
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Applies a serde `rename_all` rule to an identifier.
///
/// Unknown rules leave the identifier untouched.
pub fn apply_rename_rule(rule: &str, ident: &str) -> String {
    match rule {
        "lowercase" => ident.to_lowercase(),
        "UPPERCASE" => ident.to_uppercase(),
        "snake_case" => to_snake_case(ident),
        "SCREAMING_SNAKE_CASE" => to_snake_case(ident).to_uppercase(),
        "kebab-case" => to_snake_case(ident).replace('_', "-"),
        "SCREAMING-KEBAB-CASE" => to_snake_case(ident).replace('_', "-").to_uppercase(),
        "camelCase" => to_camel_case(ident),
        "PascalCase" => to_pascal_case(ident),
        _ => ident.to_string(),
    }
}
