//! Escaping of XML text and attribute content

/// Whether a character can appear in an XML 1.0 document as-is.
///
/// Everything else is written as a single space.
fn is_representable(ch: char) -> bool {
    let cp = ch as u32;
    !(cp < 0x09
        || (cp > 0x0A && cp < 0x0D)
        || (cp > 0x0D && cp < 0x20)
        || (0xD800..=0xDFFF).contains(&cp)
        || cp > 0xFFFD)
}

fn escape_into(input: &str, out: &mut String, attribute: bool) {
    for ch in input.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' if attribute => out.push_str("&quot;"),
            c if !is_representable(c) => out.push(' '),
            c => out.push(c),
        }
    }
}

/// Escape the content of a text node.
///
/// Line breaks are normalized to CRLF first.
pub fn escape_text(input: &str) -> String {
    let normalized = normalize_line_breaks(input);
    let mut out = String::with_capacity(normalized.len());
    escape_into(&normalized, &mut out, false);
    out
}

/// Escape an attribute value
pub fn escape_attr(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    escape_into(input, &mut out, true);
    out
}

/// Turn lone `\n`, lone `\r` and `\r\n` into `\r\n`
pub fn normalize_line_breaks(input: &str) -> String {
    if !input.contains(['\n', '\r']) {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len() + 8);
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\r\n");
            }
            '\n' => out.push_str("\r\n"),
            c => out.push(c),
        }
    }
    out
}

/// Whether a text run must carry `xml:space="preserve"`
pub fn needs_space_preserve(text: &str) -> bool {
    let first = text.chars().next();
    let last = text.chars().next_back();
    first.is_some_and(char::is_whitespace) || last.is_some_and(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text_substitutions() {
        let input = "a<b>&\"c\"\td\u{1}e";
        assert_eq!(escape_text(input), "a&lt;b&gt;&amp;\"c\"\td e");
    }

    #[test]
    fn test_escape_attr_quotes() {
        assert_eq!(escape_attr("say \"hi\" & <go>"), "say &quot;hi&quot; &amp; &lt;go&gt;");
    }

    #[test]
    fn test_control_ranges_become_spaces() {
        assert_eq!(escape_text("\u{0B}\u{0C}\u{0E}\u{1F}"), "    ");
        assert_eq!(escape_attr("x\u{FFFE}y"), "x y");
        assert_eq!(escape_attr("emoji\u{1F600}"), "emoji ");
        // tab, CR and LF survive
        assert_eq!(escape_attr("\t\r\n"), "\t\r\n");
    }

    #[test]
    fn test_line_breaks_normalized() {
        assert_eq!(escape_text("a\nb\rc\r\nd"), "a\r\nb\r\nc\r\nd");
        assert_eq!(normalize_line_breaks("plain"), "plain");
    }

    #[test]
    fn test_space_preserve_detection() {
        assert!(needs_space_preserve(" lead"));
        assert!(needs_space_preserve("trail\t"));
        assert!(needs_space_preserve("\n"));
        assert!(!needs_space_preserve("in side"));
        assert!(!needs_space_preserve(""));
    }
}
