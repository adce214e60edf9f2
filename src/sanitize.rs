/// Characters rejected by at least one of the filesystems that end up
/// opening exported archives (NTFS being the strictest).
const INVALID_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const MAX_SEGMENT_CHARS: usize = 255;

/// Reduces an arbitrary user-supplied title to a string usable as a single
/// path segment. Empty input yields empty output; callers supply their own
/// fallback (usually an ordinal prefix).
pub fn sanitize_filename(input: &str) -> String {
    let mut cleaned: String = input
        .chars()
        .filter(|ch| !INVALID_CHARS.contains(ch) && !ch.is_control())
        .collect();
    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", "");
    }
    let mut trimmed = cleaned.as_str();
    loop {
        let next = trimmed.trim().trim_start_matches('.');
        if next == trimmed {
            break;
        }
        trimmed = next;
    }
    trimmed
        .chars()
        .take(MAX_SEGMENT_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// 1-indexed ordinal, zero-padded to the decimal width of `total` with a
/// minimum of two digits, so archive entries sort correctly as plain strings.
pub fn ordinal_prefix(index: usize, total: usize) -> String {
    let width = total.max(1).to_string().len().max(2);
    format!("{index:0width$}")
}

/// Folder name for one exported item: the bare ordinal, or
/// `"{ordinal} - {sanitized title}"` when the item has a usable title.
pub fn item_folder_name(index: usize, total: usize, title: Option<&str>) -> String {
    let prefix = ordinal_prefix(index, total);
    match title.map(sanitize_filename).filter(|title| !title.is_empty()) {
        Some(title) => format!("{prefix} - {title}"),
        None => prefix,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_invalid_characters() {
        assert_eq!(sanitize_filename("a<b>c:d\"e/f\\g|h?i*j"), "abcdefghij");
    }

    #[test]
    fn strips_dotdot_and_leading_dots() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename(". . .name"), "name");
        assert_eq!(sanitize_filename("a...b"), "a.b");
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(sanitize_filename("  My Title  "), "My Title");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(sanitize_filename(""), "");
        assert_eq!(sanitize_filename("..."), "");
        assert_eq!(sanitize_filename("   "), "");
    }

    #[test]
    fn truncates_to_255_chars() {
        let long = "x".repeat(400);
        assert_eq!(sanitize_filename(&long).chars().count(), 255);
    }

    #[test]
    fn idempotent() {
        let inputs = [
            "plain title",
            "../..//weird\\name",
            ". leading dots ..",
            "  spaced  ",
            &"y".repeat(300),
            "ünïcödé ☀ title",
        ];
        for input in inputs {
            let once = sanitize_filename(input);
            assert_eq!(sanitize_filename(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn ordinal_minimum_two_digits() {
        assert_eq!(ordinal_prefix(1, 3), "01");
        assert_eq!(ordinal_prefix(3, 3), "03");
        assert_eq!(ordinal_prefix(10, 10), "10");
    }

    #[test]
    fn ordinal_widens_for_large_bundles() {
        assert_eq!(ordinal_prefix(1, 120), "001");
        assert_eq!(ordinal_prefix(99, 120), "099");
        assert_eq!(ordinal_prefix(120, 120), "120");
    }

    #[test]
    fn folder_names() {
        assert_eq!(item_folder_name(1, 3, Some("My Title")), "01 - My Title");
        assert_eq!(item_folder_name(2, 3, None), "02");
        assert_eq!(item_folder_name(3, 3, Some("///")), "03");
    }
}
