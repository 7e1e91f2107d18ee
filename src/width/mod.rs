//! Display width helpers.
//!
//! Labels in the outline may carry ANSI styling from the host, so widths are
//! measured on the stripped text.

use unicode_width::UnicodeWidthChar;

/// Compute the display width of a string after stripping ANSI escapes.
pub fn display_width(text: &str) -> usize {
    let clean = strip_ansi_escapes::strip(text);
    let clean_str = String::from_utf8_lossy(&clean);
    unicode_width::UnicodeWidthStr::width(&*clean_str)
}

/// Strip ANSI escapes and cut `text` to at most `width` display columns,
/// ending with `…` when something was cut.
pub fn fit_to_width(text: &str, width: usize) -> String {
    let clean = strip_ansi_escapes::strip(text);
    let clean = String::from_utf8_lossy(&clean);
    if unicode_width::UnicodeWidthStr::width(&*clean) <= width {
        return clean.into_owned();
    }
    if width == 0 {
        return String::new();
    }

    let budget = width - 1;
    let mut out = String::new();
    let mut used = 0;
    for ch in clean.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}
