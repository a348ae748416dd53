//! Context-aware auto-escaping for html template output.
//!
//! When a template substitutes a value into an html document, the
//! correct way to encode it depends on where in the document the
//! value lands.
//! Text content needs html entities, an `onclick` attribute needs a
//! javascript string literal, an `href` needs url encoding, and in a
//! tag name there is no safe way to write arbitrary text at all.
//!
//! This crate tracks the structure of the document as it is written
//! and picks the encoding automatically, so template authors don't
//! have to choose an encoder for each value.
//!
//! # How it works
//!
//! Literal template text is pushed, chunk by chunk, through a
//! [`MarkupContextTracker`], a strict single-pass state machine that
//! forwards the text to the real output and keeps track of whether it
//! is in text content, a tag, an attribute value, a script or a style
//! element.
//! Each time the template engine is about to substitute a value, it
//! asks an [`AutoEscape`] what to write, which asks the tracker for the
//! current [`OutputContext`] and encodes the value for it.
//!
//! ```
//! use ructe_autoescape::{AutoEscape, MarkupContextTracker};
//! # fn main() -> ructe_autoescape::Result<()> {
//! let escape = AutoEscape::default();
//! let mut out = MarkupContextTracker::new(Vec::new());
//! out.push_str("<p>Hello, ")?;
//! escape.insert_into(&mut out, "name", Some("<World>"))?;
//! out.push_str("!</p><a onclick=\"greet(")?;
//! escape.insert_into(&mut out, "name", Some("'World'"))?;
//! out.push_str(")\">Greet</a>")?;
//! assert_eq!(
//!     String::from_utf8(out.into_inner()).unwrap(),
//!     "<p>Hello, &lt;World&gt;!</p>\
//!      <a onclick=\"greet('\\x27World\\x27')\">Greet</a>",
//! );
//! # Ok(())
//! # }
//! ```
//!
//! A reference with the raw prefix (`raw_` by default) is written as
//! is.  Use it only for values that are already valid markup.
//!
//! # Failing closed
//!
//! The tracker does not try to recover from markup it does not
//! understand.
//! Anything malformed, such as a tag name starting with a digit, a
//! stray `<` in text, or control characters in text, is a
//! [`ParseError`] with the line and column of the offending character,
//! and the tracker rejects everything after it.
//! Html comments and doctype declarations are not supported.
//!
//! Values in `style` and `content` attributes, and in `style`
//! elements, are suppressed rather than encoded, since there is no
//! encoding that is safe in general for those.
//!
//! # Templates
//!
//! For simple uses, the [`Template`] type parses templates with
//! `@name` references and renders them with auto-escaping.
//!
//! ```
//! use ructe_autoescape::{AutoEscape, Template};
//! use std::collections::BTreeMap;
//! # fn main() -> ructe_autoescape::Result<()> {
//! let tpl = Template::parse("<a href=\"/user/@id\">@name</a>")?;
//! let values = BTreeMap::from([("id", "1 2"), ("name", "Tom & Jerry")]);
//! let out = tpl.render(&values, &AutoEscape::default(), Vec::new())?;
//! assert_eq!(
//!     out,
//!     b"<a href=\"/user/1%202\">Tom&#32;&amp;&#32;Jerry</a>",
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Logging
//!
//! The crate logs through the [`log`] facade: parse failures as
//! warnings, unencoded and missing values at debug level.
#![forbid(unsafe_code)]

mod adapter;
pub mod encoder;
mod errors;
pub mod names;
mod parseresult;
mod template;
mod tracker;

pub use crate::adapter::{AutoEscape, DEFAULT_RAW_PREFIX};
pub use crate::encoder::{
    encode, encode_css, encode_html, encode_html_line_breaks,
    encode_html_whitespace, encode_js, encode_uri, suppress, write_encoded,
    OutputContext,
};
pub use crate::errors::{
    Error, ParseError, ParseErrorKind, Result, PARSE_ERROR_PREFIX,
};
pub use crate::template::{Part, Template, Values};
pub use crate::tracker::{
    MarkupContextTracker, ParseState, Position, QuoteKind, SchemeBuffer,
};
