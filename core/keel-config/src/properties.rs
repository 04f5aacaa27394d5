//! Minimal reader for `.properties` style attribute files.

/// Parses `key=value` / `key: value` lines, preserving declaration order.
///
/// Blank lines and lines starting with `#` or `!` are skipped. A trailing
/// backslash joins the next line onto the current value. Lines without a
/// separator declare a key with an empty value.
pub fn parse_properties(text: &str) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    let mut pending = String::new();

    for line in text.lines() {
        let line = line.trim_start();
        if pending.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
            continue;
        }

        if let Some(continued) = line.strip_suffix('\\') {
            pending.push_str(continued);
            continue;
        }
        pending.push_str(line);

        if let Some(entry) = split_entry(&pending) {
            entries.push(entry);
        }
        pending.clear();
    }

    if let Some(entry) = split_entry(&pending) {
        entries.push(entry);
    }

    entries
}

fn split_entry(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match line.find(['=', ':']) {
        Some(idx) => Some((
            line[..idx].trim_end().to_string(),
            line[idx + 1..].trim_start().to_string(),
        )),
        None => Some((line.to_string(), String::new())),
    }
}
