use std::sync::OnceLock;

use regex::Regex;

use crate::MARKER;

/// Maximum length, in characters, of a sanitized output segment.
pub const OUTPUT_LIMIT: usize = 2048;

fn csi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\[\??[0-9;]*[a-zA-Z]").expect("CSI regex"))
}

fn osc_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\].*?\x07").expect("OSC regex"))
}

fn prompt_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"{}.*?%\s*", regex::escape(MARKER))).expect("prompt regex")
    })
}

fn blank_lines_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("blank-line regex"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

/// Clean one raw output segment for publishing.
///
/// Applies, in order: lossy UTF-8 decoding, CSI and OSC escape stripping,
/// carriage-return removal, prompt-remnant removal (the [`MARKER`] through
/// the next `%` and trailing whitespace), blank-line collapsing with
/// surrounding trim, whitespace-run collapsing, and a hard truncation to
/// [`OUTPUT_LIMIT`] characters.
///
/// Deterministic and side-effect free. Lossy by design: cursor movement,
/// colors, and layout do not survive.
pub fn sanitize_output(raw: &[u8]) -> String {
    let decoded = String::from_utf8_lossy(raw);
    let no_csi = csi_re().replace_all(&decoded, "");
    let no_osc = osc_re().replace_all(&no_csi, "");
    let normalized = no_osc.replace('\r', "");
    let no_prompt = prompt_re().replace_all(&normalized, "");
    let no_blanks = blank_lines_re().replace_all(&no_prompt, "\n");
    let trimmed = no_blanks.trim();
    let collapsed = whitespace_re().replace_all(trimmed, " ");
    truncate_chars(&collapsed, OUTPUT_LIMIT)
}

/// Truncate to at most `limit` characters, respecting char boundaries.
fn truncate_chars(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_ansi_and_collapses() {
        let raw = b"\x1b[31mHello\x1b[0m\r\nWorld\x1b]0;title\x07\n\n\nBye";
        assert_eq!(sanitize_output(raw), "Hello World Bye");
    }

    #[test]
    fn test_strips_private_mode_csi() {
        let raw = b"\x1b[?2004hready\x1b[?2004l";
        assert_eq!(sanitize_output(raw), "ready");
    }

    #[test]
    fn test_removes_prompt_remnants() {
        let raw = b"(seance) user@host ~ % echo hi\nhi\n(seance) user@host ~ % ";
        assert_eq!(sanitize_output(raw), "echo hi hi");
    }

    #[test]
    fn test_invalid_utf8_becomes_replacement_char() {
        let raw = b"ok \xff\xfe done";
        let cleaned = sanitize_output(raw);
        assert!(cleaned.starts_with("ok "));
        assert!(cleaned.contains('\u{fffd}'));
        assert!(cleaned.ends_with("done"));
    }

    #[test]
    fn test_truncates_to_output_limit() {
        let raw: Vec<u8> = std::iter::repeat(b'x').take(OUTPUT_LIMIT + 100).collect();
        let cleaned = sanitize_output(&raw);
        assert_eq!(cleaned.chars().count(), OUTPUT_LIMIT);
    }

    #[test]
    fn test_truncation_respects_multibyte_boundaries() {
        let text = "é".repeat(OUTPUT_LIMIT + 5);
        let cleaned = sanitize_output(text.as_bytes());
        assert_eq!(cleaned.chars().count(), OUTPUT_LIMIT);
        assert!(cleaned.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_empty_and_whitespace_only() {
        assert_eq!(sanitize_output(b""), "");
        assert_eq!(sanitize_output(b"  \r\n  \n\t"), "");
    }

    #[test]
    fn test_blank_line_runs_collapse_before_whitespace_collapse() {
        let raw = b"a\n\n\n\nb\n\nc";
        assert_eq!(sanitize_output(raw), "a b c");
    }
}
