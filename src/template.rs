//! A minimal template front end for auto-escaped rendering.
//!
//! A template is literal html text with `@name` references to values.
//! `@@` is a literal `@` and `@* comments *@` are left out.
//! All output, literal and substituted, goes through a
//! [`MarkupContextTracker`], so each value is encoded for the context
//! it lands in.
use crate::adapter::AutoEscape;
use crate::errors::{Error, Result};
use crate::parseresult::{describe_errors, PResult};
use crate::tracker::MarkupContextTracker;
use itertools::Itertools;
use nom::branch::alt;
use nom::bytes::complete::{is_not, tag, take_until, take_while};
use nom::character::complete::alpha1;
use nom::combinator::{all_consuming, cut, map, map_res, recognize, value};
use nom::error::context;
use nom::multi::many0;
use nom::sequence::{pair, preceded, terminated};
use nom::Parser;
use std::borrow::{Borrow, Cow};
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::io::Write;
use std::str::from_utf8;

/// A source of values for the references in a template.
pub trait Values {
    /// The value for `name`, if any.
    fn value(&self, name: &str) -> Option<Cow<'_, str>>;
}

impl<K, V, S> Values for HashMap<K, V, S>
where
    K: Borrow<str> + Hash + Eq,
    V: AsRef<str>,
    S: BuildHasher,
{
    fn value(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(|v| Cow::Borrowed(v.as_ref()))
    }
}

impl<K, V> Values for BTreeMap<K, V>
where
    K: Borrow<str> + Ord,
    V: AsRef<str>,
{
    fn value(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(|v| Cow::Borrowed(v.as_ref()))
    }
}

/// A part of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    Reference(String),
    Comment,
}

/// A parsed template.
///
/// # Examples
///
/// ```
/// use ructe_autoescape::{AutoEscape, Template};
/// use std::collections::HashMap;
/// # fn main() -> ructe_autoescape::Result<()> {
/// let page = Template::parse(
///     "<a href=\"@url\" onclick=\"track(@id)\">@title</a>@raw_footer",
/// )?;
/// let values = HashMap::from([
///     ("url", "/a b"),
///     ("id", "1'"),
///     ("title", "<Home>"),
///     ("raw_footer", "<hr />"),
/// ]);
/// let out = page.render(&values, &AutoEscape::default(), Vec::new())?;
/// assert_eq!(
///     String::from_utf8(out).unwrap(),
///     r#"<a href="/a%20b" onclick="track('1\x27')">&lt;Home&gt;</a><hr />"#,
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    parts: Vec<Part>,
}

impl Template {
    /// Parse a template.
    ///
    /// A syntax error is reported with the offending line and a
    /// marker at the position of the error.
    pub fn parse(src: &str) -> Result<Template> {
        match template(src.as_bytes()) {
            Ok((_, parts)) => Ok(Template { parts }),
            Err(err) => {
                let msg = describe_errors(src.as_bytes(), &err);
                Err(Error::Template(if msg.is_empty() {
                    "Invalid template".into()
                } else {
                    msg
                }))
            }
        }
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// The names referenced in this template, each name once.
    pub fn references(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Reference(name) => Some(name.as_str()),
                _ => None,
            })
            .unique()
            .collect()
    }

    /// Render this template with `values` to `out`.
    ///
    /// A reference without a value renders as nothing.
    /// Returns `out` when done.
    pub fn render<W: Write>(
        &self,
        values: &impl Values,
        escape: &AutoEscape,
        out: W,
    ) -> Result<W> {
        let mut tracker = MarkupContextTracker::new(out);
        for part in &self.parts {
            match part {
                Part::Text(text) => tracker.push_str(text)?,
                Part::Reference(name) => {
                    let value = values.value(name);
                    if value.is_none() {
                        log::debug!("No value for @{}", name);
                    }
                    escape.insert_into(&mut tracker, name, value.as_deref())?;
                }
                Part::Comment => (),
            }
        }
        tracker.flush()?;
        Ok(tracker.into_inner())
    }
}

fn template(input: &[u8]) -> PResult<Vec<Part>> {
    all_consuming(many0(part)).parse(input)
}

fn part(input: &[u8]) -> PResult<Part> {
    alt((
        map(map_res(is_not("@"), from_utf8), |text: &str| {
            Part::Text(text.to_owned())
        }),
        preceded(
            tag("@"),
            cut(context(
                "Expected a name, \"@\" or a comment after \"@\"",
                alt((
                    value(Part::Text("@".to_owned()), tag("@")),
                    preceded(tag("*"), comment_rest),
                    map(map_res(name, from_utf8), |name: &str| {
                        Part::Reference(name.to_owned())
                    }),
                )),
            )),
        ),
    ))
    .parse(input)
}

/// The rest of a comment, after the opening `@*`.
fn comment_rest(input: &[u8]) -> PResult<Part> {
    value(
        Part::Comment,
        cut(context(
            "Unterminated comment",
            terminated(take_until("*@"), tag("*@")),
        )),
    )
    .parse(input)
}

fn name(input: &[u8]) -> PResult<&[u8]> {
    recognize(pair(
        alpha1,
        take_while(|c: u8| c.is_ascii_alphanumeric() || c == b'_'),
    ))
    .parse(input)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeMap;

    fn text(s: &str) -> Part {
        Part::Text(s.into())
    }

    fn reference(s: &str) -> Part {
        Part::Reference(s.into())
    }

    #[test]
    fn parse_parts() {
        let t = Template::parse("<p>@name, @@ @* note *@@raw_x!</p>").unwrap();
        assert_eq!(
            t.parts(),
            &[
                text("<p>"),
                reference("name"),
                text(", "),
                text("@"),
                text(" "),
                Part::Comment,
                reference("raw_x"),
                text("!</p>"),
            ]
        );
    }

    #[test]
    fn parse_empty() {
        assert_eq!(Template::parse("").unwrap().parts(), &[]);
    }

    #[test]
    fn references_are_unique() {
        let t = Template::parse("@a @b @a @c1 @b").unwrap();
        assert_eq!(t.references(), ["a", "b", "c1"]);
    }

    #[test]
    fn bad_reference() {
        match Template::parse("<p>\n  @ oops</p>") {
            Err(Error::Template(msg)) => assert_eq!(
                msg,
                "   2:  @ oops</p>\n\
                 \x20       ^ Expected a name, \"@\" or a comment after \"@\"\n"
            ),
            other => panic!("Expected template error, got {:?}", other),
        }
    }

    #[test]
    fn unterminated_comment() {
        match Template::parse("a @* b") {
            Err(Error::Template(msg)) => {
                assert!(msg.contains("Unterminated comment"), "{}", msg)
            }
            other => panic!("Expected template error, got {:?}", other),
        }
    }

    fn render(src: &str, values: &[(&str, &str)]) -> Result<String> {
        let values = values.iter().copied().collect::<BTreeMap<_, _>>();
        let out = Template::parse(src)?.render(
            &values,
            &AutoEscape::default(),
            Vec::new(),
        )?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn render_contexts() {
        let values = [
            ("text", "<b>"),
            ("url", "javascript:alert(1)"),
            ("code", "');alert(1)//"),
        ];
        assert_eq!(
            render(
                "<p title=\"@text\">@text</p>\
                 <a href=\"@url\">x</a>\
                 <button onclick=\"go(@code)\">\
                 <script>var x = @code;</script>",
                &values
            )
            .unwrap(),
            "<p title=\"&lt;b&gt;\">&lt;b&gt;</p>\
             <a href=\"javascript%3Aalert%281%29\">x</a>\
             <button onclick=\"go('\\x27\\x29\\x3balert\\x281\\x29\\x2f\\x2f')\">\
             <script>var x = '\\x27\\x29\\x3balert\\x281\\x29\\x2f\\x2f';</script>"
        );
    }

    #[test]
    fn render_missing_and_suppressed() {
        assert_eq!(
            render("<p @text style=\"@text\">@missing</p>", &[("text", "x")])
                .unwrap(),
            "<p  style=\"\"></p>"
        );
    }

    #[test]
    fn render_raw() {
        assert_eq!(
            render("<div>@raw_body</div>", &[("raw_body", "<em>hi</em>")])
                .unwrap(),
            "<div><em>hi</em></div>"
        );
    }

    #[test]
    fn render_malformed() {
        match render("<p>@raw_bad</p>", &[("raw_bad", "<1>")]) {
            Err(Error::Markup(err)) => {
                assert_eq!((err.line, err.column), (1, 5))
            }
            other => panic!("Expected markup error, got {:?}", other),
        }
    }

    #[test]
    fn render_hashmap() {
        let values: HashMap<String, String> =
            [("who".to_string(), "you & me".to_string())].into();
        let out = Template::parse("Hi @who")
            .unwrap()
            .render(&values, &AutoEscape::default(), Vec::new())
            .unwrap();
        assert_eq!(out, b"Hi you&#32;&amp;&#32;me");
    }
}
