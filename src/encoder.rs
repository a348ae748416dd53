//! Encoders for the contexts a dynamic value can land in.
//!
//! Each encoder is total over `char` and deterministic.  The `encode_*`
//! functions return a new `String`, the `write_*` functions write to
//! any [`fmt::Write`], so the output may go directly to a formatter or
//! an existing buffer.
use std::fmt::{self, Write};

/// Where in a document a value is about to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputContext {
    /// There is no place for arbitrary text here, write nothing.
    Suppress,
    /// Html text or a plain attribute value.
    Html,
    /// Script content or a script-valued attribute.
    Js,
    /// An url-valued attribute.
    Uri,
    /// A css string.
    Css,
}

/// Placeholder for code points that don't fit in a percent-encoded byte.
const URI_PLACEHOLDER: &str = "%3F";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Whitespace {
    Escape,
    Keep,
    LineBreaks,
}

/// Encode `value` as appropriate for `context`.
///
/// # Examples
/// ```
/// use ructe_autoescape::{encode, OutputContext};
/// assert_eq!(encode("a<b", OutputContext::Html), "a&lt;b");
/// assert_eq!(encode("a<b", OutputContext::Js), r"'a\x3cb'");
/// assert_eq!(encode("a<b", OutputContext::Suppress), "");
/// ```
pub fn encode(value: &str, context: OutputContext) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    // Writing to a String never fails.
    let _ = write_encoded(&mut out, value, context);
    out
}

/// Write `value` to `out`, encoded as appropriate for `context`.
pub fn write_encoded(
    out: &mut impl Write,
    value: &str,
    context: OutputContext,
) -> fmt::Result {
    match context {
        OutputContext::Suppress => Ok(()),
        OutputContext::Html => write_html(out, value),
        OutputContext::Js => write_js(out, value),
        OutputContext::Uri => write_uri(out, value),
        OutputContext::Css => write_css(out, value),
    }
}

/// Html-encode `value`.
///
/// ```
/// use ructe_autoescape::encode_html;
/// assert_eq!(encode_html("<script>"), "&lt;script&gt;");
/// assert_eq!(encode_html("a b"), "a&#32;b");
/// ```
pub fn encode_html(value: &str) -> String {
    collect(value, write_html)
}

/// Html-encode `value`, but keep tabs, line breaks and spaces.
pub fn encode_html_whitespace(value: &str) -> String {
    collect(value, write_html_whitespace)
}

/// Html-encode `value`, keeping spaces and turning newlines to `<br>`.
pub fn encode_html_line_breaks(value: &str) -> String {
    collect(value, write_html_line_breaks)
}

/// Encode `value` as a single-quoted javascript string literal.
pub fn encode_js(value: &str) -> String {
    collect(value, write_js)
}

/// Percent-encode `value` for use in an url.
pub fn encode_uri(value: &str) -> String {
    collect(value, write_uri)
}

/// Encode `value` as a single-quoted css string.
pub fn encode_css(value: &str) -> String {
    collect(value, write_css)
}

/// Nothing at all, whatever the value.
pub fn suppress(_value: &str) -> String {
    String::new()
}

fn collect(
    value: &str,
    f: impl FnOnce(&mut String, &str) -> fmt::Result,
) -> String {
    let mut out = String::with_capacity(value.len());
    let _ = f(&mut out, value);
    out
}

pub fn write_html(out: &mut impl Write, value: &str) -> fmt::Result {
    write_html_impl(out, value, Whitespace::Escape)
}

pub fn write_html_whitespace(out: &mut impl Write, value: &str) -> fmt::Result {
    write_html_impl(out, value, Whitespace::Keep)
}

pub fn write_html_line_breaks(
    out: &mut impl Write,
    value: &str,
) -> fmt::Result {
    write_html_impl(out, value, Whitespace::LineBreaks)
}

fn is_html_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ',' | '.' | '-' | '_')
}

fn write_html_impl(
    out: &mut impl Write,
    value: &str,
    ws: Whitespace,
) -> fmt::Result {
    // Runs of safe characters are copied in one go.
    let mut safe_from = 0;
    for (i, c) in value.char_indices() {
        let keep = is_html_safe(c)
            || (ws != Whitespace::Escape && matches!(c, ' ' | '\t'))
            || (ws == Whitespace::Keep && matches!(c, '\n' | '\r'));
        if keep {
            continue;
        }
        out.write_str(&value[safe_from..i])?;
        safe_from = i + c.len_utf8();
        match c {
            '<' => out.write_str("&lt;")?,
            '>' => out.write_str("&gt;")?,
            '&' => out.write_str("&amp;")?,
            '"' => out.write_str("&quot;")?,
            '\'' => out.write_str("&#39;")?,
            '/' => out.write_str("&#47;")?,
            '=' => out.write_str("&#61;")?,
            '\n' if ws == Whitespace::LineBreaks => out.write_str("<br>")?,
            '\r' if ws == Whitespace::LineBreaks => (),
            '\t' | '\n' | '\r' => write!(out, "&#{};", u32::from(c))?,
            c if u32::from(c) < 0x20 => write!(out, "\\x{:02x}", u32::from(c))?,
            c => write!(out, "&#{};", u32::from(c))?,
        }
    }
    out.write_str(&value[safe_from..])
}

pub fn write_js(out: &mut impl Write, value: &str) -> fmt::Result {
    out.write_char('\'')?;
    for c in value.chars() {
        let n = u32::from(c);
        if c.is_ascii_alphanumeric() {
            out.write_char(c)?;
        } else if n <= 0x7f {
            write!(out, "\\x{:02x}", n)?;
        } else {
            let mut units = [0; 2];
            for unit in c.encode_utf16(&mut units) {
                write!(out, "\\u{:04x}", unit)?;
            }
        }
    }
    out.write_char('\'')
}

fn is_uri_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '-' | '#' | '?' | '=')
}

pub fn write_uri(out: &mut impl Write, value: &str) -> fmt::Result {
    for c in value.chars() {
        let n = u32::from(c);
        if is_uri_safe(c) {
            out.write_char(c)?;
        } else if n <= 0xff {
            write!(out, "%{:02X}", n)?;
        } else {
            out.write_str(URI_PLACEHOLDER)?;
        }
    }
    Ok(())
}

pub fn write_css(out: &mut impl Write, value: &str) -> fmt::Result {
    out.write_char('\'')?;
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            out.write_char(c)?;
        } else {
            write!(out, "\\{:x} ", u32::from(c))?;
        }
    }
    out.write_char('\'')
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn html_plain() {
        assert_eq!(encode_html("Hello"), "Hello");
        assert_eq!(encode_html("x-1.2,3_y"), "x-1.2,3_y");
        assert_eq!(encode_html(""), "");
    }

    #[test]
    fn html_markup() {
        assert_eq!(encode_html("<script>"), "&lt;script&gt;");
        assert_eq!(
            encode_html("<a href='x'>\"&\"</a>"),
            "&lt;a&#32;href&#61;&#39;x&#39;&gt;&quot;&amp;&quot;&lt;&#47;a&gt;"
        );
    }

    #[test]
    fn html_double_encoded() {
        assert_eq!(encode_html("&lt;"), "&amp;lt;");
        assert_eq!(encode_html(&encode_html("<")), "&amp;lt;");
    }

    #[test]
    fn html_control_and_unicode() {
        assert_eq!(encode_html("a\0b\x1b"), "a\\x00b\\x1b");
        assert_eq!(encode_html("a\tb\n"), "a&#9;b&#10;");
        assert_eq!(encode_html("räksmörgås"), "r&#228;ksm&#246;rg&#229;s");
        assert_eq!(encode_html("😀"), "&#128512;");
    }

    #[test]
    fn html_whitespace_variants() {
        assert_eq!(encode_html_whitespace("a b\tc\r\nd<"), "a b\tc\r\nd&lt;");
        assert_eq!(encode_html_whitespace("\x07"), "\\x07");
        assert_eq!(
            encode_html_line_breaks("one\r\ntwo <3"),
            "one<br>two &lt;3"
        );
    }

    #[test]
    fn js_breakout() {
        assert_eq!(
            encode_js("'); alert(1); //"),
            r"'\x27\x29\x3b\x20alert\x281\x29\x3b\x20\x2f\x2f'"
        );
        assert_eq!(encode_js("</script>"), r"'\x3c\x2fscript\x3e'");
        assert_eq!(encode_js(""), "''");
    }

    #[test]
    fn js_unicode() {
        assert_eq!(encode_js("\u{e9}"), r"'\u00e9'");
        assert_eq!(encode_js("\u{2028}"), r"'\u2028'");
        assert_eq!(encode_js("\u{1f600}"), r"'\ud83d\ude00'");
    }

    #[test]
    fn uri() {
        assert_eq!(encode_uri("/path/to.html?q=1#top"), "/path/to.html?q=1#top");
        assert_eq!(
            encode_uri("javascript:alert(1)"),
            "javascript%3Aalert%281%29"
        );
        assert_eq!(encode_uri("a b&c\"d"), "a%20b%26c%22d");
        assert_eq!(encode_uri("é"), "%E9");
        assert_eq!(encode_uri("€"), "%3F");
    }

    #[test]
    fn css() {
        assert_eq!(encode_css("red"), "'red'");
        assert_eq!(encode_css("a;b"), r"'a\3b b'");
        assert_eq!(encode_css("</style>"), r"'\3c \2f style\3e '");
    }

    #[test]
    fn suppressed() {
        assert_eq!(suppress("<anything>"), "");
        assert_eq!(encode("<anything>", OutputContext::Suppress), "");
    }

    #[test]
    fn dispatch() {
        let v = "a'b";
        assert_eq!(encode(v, OutputContext::Html), encode_html(v));
        assert_eq!(encode(v, OutputContext::Js), encode_js(v));
        assert_eq!(encode(v, OutputContext::Uri), encode_uri(v));
        assert_eq!(encode(v, OutputContext::Css), encode_css(v));
    }

    /// Every bmp char, and a sample of the rest.
    fn some_chars() -> impl Iterator<Item = char> {
        (0..0x1_0000)
            .chain((0x1_0000..=0x10_ffff).step_by(251))
            .filter_map(char::from_u32)
    }

    #[test]
    fn html_is_total_and_safe() {
        for c in some_chars() {
            let s = format!("x{}y", c);
            for out in [
                encode_html(&s),
                encode_html_whitespace(&s),
                encode_html_line_breaks(&s),
            ] {
                assert!(
                    !out.contains(&['"', '\'', '/', '='][..]),
                    "{:?} -> {:?}",
                    c,
                    out
                );
                assert!(
                    !out.replace("<br>", "").contains(&['<', '>'][..]),
                    "{:?} -> {:?}",
                    c,
                    out
                );
                assert!(
                    out.chars().all(|c| u32::from(c) >= 0x20
                        || matches!(c, '\t' | '\r' | '\n')),
                    "{:?} -> {:?}",
                    c,
                    out
                );
            }
            let out = encode_html(&s);
            assert!(out.is_ascii(), "{:?} -> {:?}", c, out);
            assert!(!out.contains(char::is_whitespace), "{:?}", c);
        }
    }

    #[test]
    fn js_is_total_and_safe() {
        for c in some_chars() {
            let out = encode_js(&c.to_string());
            let inner = &out[1..out.len() - 1];
            assert!(out.starts_with('\'') && out.ends_with('\''));
            assert!(
                inner.chars().all(|c| c.is_ascii_alphanumeric() || c == '\\'),
                "{:?} -> {:?}",
                c,
                out
            );
        }
    }

    #[test]
    fn uri_and_css_are_total_and_safe() {
        for c in some_chars() {
            let uri = encode_uri(&c.to_string());
            assert!(uri.chars().all(|c| is_uri_safe(c) || c == '%'));
            let css = encode_css(&c.to_string());
            let inner = &css[1..css.len() - 1];
            assert!(
                inner
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '\\' || c == ' '),
                "{:?} -> {:?}",
                c,
                css
            );
        }
    }
}
