use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: char = '…';

/// Display width of a string in terminal columns.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate `s` to at most `max_width` columns, ending in `…` when cut.
///
/// Returns `Cow::Borrowed` when the string already fits.
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    if max_width == 0 {
        return Cow::Borrowed("");
    }

    // Leave one column for the ellipsis
    let budget = max_width - 1;
    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }

    let mut out = String::with_capacity(end + ELLIPSIS.len_utf8());
    out.push_str(s[..end].trim_end());
    out.push(ELLIPSIS);
    Cow::Owned(out)
}

/// Remove terminal control characters and escape sequences from
/// server-supplied text before it reaches the terminal.
///
/// CSI (`ESC [ ... final`) and OSC (`ESC ] ... BEL|ESC \`) sequences are
/// dropped whole. Newlines and tabs become spaces since every caller renders
/// a single line.
pub fn sanitize_line(s: &str) -> Cow<'_, str> {
    let dirty = |c: char| c.is_control() || c == '\u{7f}';
    if !s.chars().any(dirty) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\x1b' => match chars.peek() {
                Some('[') => {
                    chars.next();
                    for n in chars.by_ref() {
                        if ('\x40'..='\x7e').contains(&n) {
                            break;
                        }
                    }
                }
                Some(']') => {
                    chars.next();
                    while let Some(n) = chars.next() {
                        if n == '\x07' {
                            break;
                        }
                        if n == '\x1b' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            },
            '\t' | '\n' | '\r' => out.push(' '),
            c if dirty(c) => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_is_borrowed() {
        assert!(matches!(truncate_to_width("Short", 10), Cow::Borrowed("Short")));
        assert_eq!(truncate_to_width("12345", 5), "12345");
    }

    #[test]
    fn truncates_with_ellipsis() {
        assert_eq!(truncate_to_width("Hello World", 8), "Hello W…");
        assert_eq!(truncate_to_width("Hello World", 7), "Hello…");
        assert_eq!(truncate_to_width("Test", 1), "…");
        assert_eq!(truncate_to_width("Test", 0), "");
    }

    #[test]
    fn wide_characters_count_double() {
        assert_eq!(display_width("日本語"), 6);
        assert_eq!(truncate_to_width("日本語テスト", 7), "日本語…");
        // A wide char that doesn't fit is dropped rather than split
        assert_eq!(truncate_to_width("日本語", 4), "日…");
    }

    #[test]
    fn result_never_exceeds_width() {
        for s in ["Hello 🎉 World", "mixed 世界 text", "ascii only here"] {
            for w in 0..20 {
                assert!(display_width(&truncate_to_width(s, w)) <= w, "{:?} @ {}", s, w);
            }
        }
    }

    #[test]
    fn clean_text_is_borrowed() {
        assert!(matches!(sanitize_line("plain headline"), Cow::Borrowed(_)));
    }

    #[test]
    fn strips_escape_sequences() {
        assert_eq!(sanitize_line("\x1b[31mRed\x1b[0m text"), "Red text");
        assert_eq!(sanitize_line("\x1b]0;evil title\x07safe"), "safe");
        assert_eq!(sanitize_line("\x1b]0;evil title\x1b\\safe"), "safe");
        assert_eq!(sanitize_line("bare\x1bescape"), "bareescape");
    }

    #[test]
    fn flattens_whitespace_controls_and_drops_others() {
        assert_eq!(sanitize_line("two\nlines\tand\x00nul\x7f"), "two lines andnul");
    }
}
