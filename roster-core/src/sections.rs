//! Scalar and aggregate fields outside repeating records
//!
//! Replies usually carry a few one-off values next to their records: a
//! "Gate: PASS" line, a "## Summary" paragraph, a bullet list of goals.

use crate::extract_field;

/// First value for `label` anywhere in the lines
pub fn find_field<S: AsRef<str>>(lines: &[S], label: &str) -> Option<String> {
    lines
        .iter()
        .map(|line| line.as_ref().trim())
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| extract_field(line, label))
}

/// Lines under the first `#` heading that contains `title`, up to the next heading
fn section_lines<'a, S: AsRef<str>>(lines: &'a [S], title: &str) -> Vec<&'a str> {
    let mut body = Vec::new();
    let mut inside = false;

    for line in lines {
        let trimmed = line.as_ref().trim();
        if trimmed.starts_with('#') {
            if inside {
                break;
            }
            inside = trimmed.contains(title);
            continue;
        }
        if inside {
            body.push(trimmed);
        }
    }

    body
}

/// Body text of a section, blank lines collapsed at the edges
pub fn section<S: AsRef<str>>(lines: &[S], title: &str) -> Option<String> {
    let body = section_lines(lines, title).join("\n");
    let body = body.trim();
    (!body.is_empty()).then(|| body.to_string())
}

/// Bullet and numbered items of a section
pub fn section_items<S: AsRef<str>>(lines: &[S], title: &str) -> Vec<String> {
    section_lines(lines, title)
        .into_iter()
        .filter_map(list_item)
        .collect()
}

/// Text of a markdown list item ("- a", "* a", "+ a", "3. a")
pub fn list_item(line: &str) -> Option<String> {
    let line = line.trim();
    let text = if let Some(rest) = line.strip_prefix(['-', '*', '+']) {
        rest
    } else {
        let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            return None;
        }
        line[digits..].strip_prefix(['.', ')'])?
    };

    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
