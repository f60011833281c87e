const MAX_NAME_LEN: usize = 120;
const FALLBACK_NAME: &str = "download";

/// Windows-safe local file name for an artifact the backend calls `remote`.
///
/// Forbidden characters become `_`, runs of `_` collapse, reserved device names
/// get a `_` suffix, and long names are cut while keeping the extension.
pub fn local_file_name(remote: &str) -> String {
    let cleaned: String = remote
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = collapse_underscores(cleaned.trim_matches(&['_', ' ', '.'][..]));
    if cleaned.is_empty() {
        return FALLBACK_NAME.to_string();
    }

    let (stem, extension) = match cleaned.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() <= 16 => (stem.to_string(), Some(ext)),
        _ => (cleaned.clone(), None),
    };

    let budget = MAX_NAME_LEN.saturating_sub(extension.map_or(0, |ext| ext.len() + 1));
    let mut stem = truncate_at_char_boundary(stem, budget);
    if is_reserved_windows_name(&stem) {
        stem.push('_');
    }
    match extension {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    }
}

fn collapse_underscores(input: &str) -> String {
    let mut compacted = String::with_capacity(input.len());
    let mut prev_underscore = false;
    for c in input.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }
    compacted
}

fn truncate_at_char_boundary(mut text: String, max: usize) -> String {
    if text.len() > max {
        let mut end = max;
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
