//! Recognition of tag names, attribute names and value prefixes.
//!
//! All tables here are fixed `match` expressions over lower-cased
//! ASCII names, as accumulated in a [`NameBuffer`].
use crate::errors::ParseErrorKind;
use std::fmt;

/// Max length of a tag or attribute name.
pub const NAME_CAPACITY: usize = 20;

/// Number of leading attribute value characters scanned for a scheme.
pub const PREFIX_WINDOW: usize = 10;

/// A small bounded buffer for a name, lower-cased as it grows.
///
/// Only ASCII can be pushed, so the content is always valid utf-8.
#[derive(Clone, Copy)]
pub struct NameBuffer<const N: usize = NAME_CAPACITY> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> NameBuffer<N> {
    pub const fn new() -> Self {
        NameBuffer { buf: [0; N], len: 0 }
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Append `c`, lower-cased.
    ///
    /// Fails if `c` is not ascii or the buffer is full.
    pub fn push(&mut self, c: char) -> Result<(), ParseErrorKind> {
        if !c.is_ascii() {
            return Err(ParseErrorKind::NonAsciiName(c));
        }
        if self.len == N {
            return Err(ParseErrorKind::NameTooLong);
        }
        self.buf[self.len] = (c as u8).to_ascii_lowercase();
        self.len += 1;
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }
}

impl<const N: usize> Default for NameBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PartialEq for NameBuffer<N> {
    fn eq(&self, other: &Self) -> bool {
        self.buf[..self.len] == other.buf[..other.len]
    }
}

impl<const N: usize> Eq for NameBuffer<N> {}

impl<const N: usize> fmt::Debug for NameBuffer<N> {
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        write!(out, "NameBuffer({:?})", self.as_str())
    }
}

/// True if `c` may start a tag or attribute name.
pub fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic()
}

/// True if `c` may appear in a tag or attribute name.
pub fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

/// Whitespace as far as markup structure is concerned.
pub fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

/// Elements whose content is not markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawText {
    Script,
    Style,
}

impl RawText {
    /// The end tag, without the leading `<`.
    pub fn end_tag(self) -> &'static str {
        match self {
            RawText::Script => "/script",
            RawText::Style => "/style",
        }
    }
}

/// Check if an (opening) tag name starts script or style content.
pub fn raw_text_element(name: &str) -> Option<RawText> {
    match name {
        "script" => Some(RawText::Script),
        "style" => Some(RawText::Style),
        _ => None,
    }
}

/// The language of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrValueContext {
    Html,
    Css,
    Js,
    Uri,
    Data,
    Content,
    ActionScript,
}

/// Classify an attribute by its (lower-cased) name.
pub fn classify_attribute(name: &str) -> AttrValueContext {
    match name {
        "href" | "src" | "background" | "dynsrc" | "lowsrc" | "data" => {
            AttrValueContext::Uri
        }
        "onabort" | "onblur" | "onchange" | "onclick" | "ondblclick"
        | "ondragdrop" | "onerror" | "onfocus" | "onkeydown"
        | "onkeypress" | "onkeyup" | "onload" | "onmousedown"
        | "onmousemove" | "onmouseout" | "onmouseover" | "onmouseup"
        | "onmove" | "onreset" | "onresize" | "onselect" | "onsubmit"
        | "onunload" | "onreadystatechange" => AttrValueContext::Js,
        // Any other handler is script too, browsers keep adding them.
        name if name.len() > 2 && name.starts_with("on") => {
            AttrValueContext::Js
        }
        "style" => AttrValueContext::Css,
        "content" => AttrValueContext::Content,
        _ => AttrValueContext::Html,
    }
}

/// Classify an attribute value by the (lower-cased) scheme before its
/// first colon.
pub fn classify_value_prefix(scheme: &str) -> Option<AttrValueContext> {
    match scheme {
        "javascript" | "livescript" | "mocha" | "vbscript" => {
            Some(AttrValueContext::Js)
        }
        "asfunction" => Some(AttrValueContext::ActionScript),
        "data" => Some(AttrValueContext::Data),
        _ => None,
    }
}

/// Only attributes classified by name as these may be reclassified by
/// the scheme of their value.
pub fn prefix_may_reclassify(context: AttrValueContext) -> bool {
    matches!(context, AttrValueContext::Html | AttrValueContext::Uri)
}
