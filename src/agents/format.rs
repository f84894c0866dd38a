//! Structural checks on finalized wellness answers

/// True when the text carries a heading or a list marker
pub fn is_structured(text: &str) -> bool {
    text.lines().map(str::trim).any(|line| is_heading(line) || is_list_item(line))
}

fn is_heading(line: &str) -> bool {
    line.starts_with('#') || (line.len() > 4 && line.starts_with("**") && line.ends_with("**"))
}

fn is_list_item(line: &str) -> bool {
    if ["* ", "- ", "• "].iter().any(|m| line.starts_with(m)) {
        return true;
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && (line[digits..].starts_with(". ") || line[digits..].starts_with(") "))
}

/// Reshape a single paragraph into a headed bullet list, one sentence per bullet
pub fn reshape(text: &str, heading: &str) -> String {
    let mut out = format!("**{}**\n", heading);
    for sentence in sentences(text) {
        out.push_str("\n* ");
        out.push_str(&sentence);
    }
    out
}

fn sentences(text: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            flush(&mut current, &mut result);
            continue;
        }
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_none_or(|n| n.is_whitespace()) {
            flush(&mut current, &mut result);
        }
    }
    flush(&mut current, &mut result);
    result
}

fn flush(current: &mut String, result: &mut Vec<String>) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        result.push(trimmed.to_string());
    }
    current.clear();
}
