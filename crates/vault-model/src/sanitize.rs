//! Name sanitization, applied to album names and per-file
//! names read out of decrypted headers before they're shown to a caller
//! or used as a glob target.

/// Trim, map `""`/`"."`/`".."` to their placeholder forms, and replace
/// non-printable characters with the Unicode replacement character.
pub fn sanitize_name(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed {
        "" => return "(noname)".to_string(),
        "." => return "(dot)".to_string(),
        ".." => return "(dotdot)".to_string(),
        _ => {}
    }
    trimmed
        .chars()
        .map(|c| if is_printable(c) { c } else { '\u{FFFD}' })
        .collect()
}

fn is_printable(c: char) -> bool {
    !c.is_control() || c == ' '
}

/// Append `" (n)"` disambiguation suffixes, starting at 1, until `name`
/// is not already in `taken`.
pub fn disambiguate(name: &str, taken: &std::collections::HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }
    let mut n = 1;
    loop {
        let candidate = format!("{name} ({n})");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
