//! Display titles derived from raw folder and file names.

use std::path::Path;
use unicode_normalization::UnicodeNormalization;

const SEPARATORS: &[char] = &[' ', '.', '-', '_', ')', ':', '\u{2013}', '\u{2014}'];

/// Strip a leading index such as `"01 "`, `"01 - "`, `"3. "`, `"1.2 "` or `"07_"`.
///
/// The prefix is only removed when digits are followed by at least one
/// separator, so `"3D Modelling"` is left alone. Names that consist of nothing
/// but the index keep their raw form.
pub fn strip_index_prefix(name: &str) -> &str {
    let bytes = name.as_bytes();
    let mut i = digit_run(bytes, 0);
    if i == 0 {
        return name;
    }

    // Dotted numbering: "1.2", "1.2.3"
    while i < bytes.len() && bytes[i] == b'.' {
        let next = digit_run(bytes, i + 1);
        if next == i + 1 {
            break;
        }
        i = next;
    }

    let rest = &name[i..];
    let stripped = rest.trim_start_matches(SEPARATORS);
    if stripped.len() == rest.len() || stripped.trim().is_empty() {
        return name;
    }
    stripped
}

fn digit_run(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    i
}

/// Title for a course or section folder.
pub fn folder_title(name: &str) -> String {
    strip_index_prefix(name).trim().nfc().collect()
}

/// Title for a lesson file: the stem with any index prefix removed.
pub fn lesson_title(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    folder_title(stem)
}
