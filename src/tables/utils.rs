// src/tables/utils.rs

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Header names that hold a year's value start with a digit (`2002`, `2003`, ...).
pub fn is_year_column(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_digit())
}
