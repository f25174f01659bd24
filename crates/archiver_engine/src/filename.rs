use sha2::{Digest, Sha256};

const MAX_STEM_LEN: usize = 80;

/// Windows-safe, deterministic filename: `{sanitized_title}--{short_hash(key)}.{extension}`
pub fn deterministic_filename(title: &str, key: &str, extension: &str) -> String {
    let stem = sanitize_title(title);
    let hash = short_hash(key);
    format!("{stem}--{hash}.{extension}")
}

fn sanitize_title(input: &str) -> String {
    let mut compacted = String::with_capacity(input.len());
    let mut prev_underscore = false;
    for c in input.chars() {
        let c = if is_forbidden(c) { '_' } else { c };
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        compacted.push(c);
    }

    let mut stem = compacted.trim_matches(&['_', ' ', '.'][..]).to_string();
    if stem.is_empty() {
        stem = "untitled".to_string();
    }
    if stem.len() > MAX_STEM_LEN {
        let mut end = MAX_STEM_LEN;
        while !stem.is_char_boundary(end) {
            end -= 1;
        }
        stem.truncate(end);
    }
    if is_reserved_windows_name(&stem) {
        stem.push('_');
    }
    stem
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

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().take(4).map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_deterministic_and_safe() {
        let fname = deterministic_filename("My: Title?/Bad", "1,2", "md");
        assert!(fname.starts_with("My_ Title_Bad--"), "{fname}");
        assert!(fname.ends_with(".md"));
        assert_eq!(fname, deterministic_filename("My: Title?/Bad", "1,2", "md"));
        assert_ne!(fname, deterministic_filename("My: Title?/Bad", "1,3", "md"));
    }

    #[test]
    fn reserved_and_empty_names_are_patched() {
        assert!(deterministic_filename("CON", "k", "md").starts_with("CON_--"));
        assert!(deterministic_filename(" ..", "k", "md").starts_with("untitled--"));
    }

    #[test]
    fn long_titles_are_cut_on_char_boundaries() {
        let title = "\u{e9}".repeat(100);
        let fname = deterministic_filename(&title, "k", "md");
        let stem = fname.split("--").next().unwrap();
        assert!(stem.len() <= MAX_STEM_LEN);
    }
}
