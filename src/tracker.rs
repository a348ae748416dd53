//! The markup state machine.
use crate::encoder::OutputContext;
use crate::errors::{ParseError, ParseErrorKind, Result};
use crate::names::{
    classify_attribute, classify_value_prefix, is_name_char, is_name_start,
    is_space, prefix_may_reclassify, raw_text_element, AttrValueContext,
    NameBuffer, RawText, PREFIX_WINDOW,
};
use std::io::{self, Write};

/// The quoting of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteKind {
    None,
    Single,
    Double,
}

impl QuoteKind {
    fn ends_value(self, c: char) -> bool {
        match self {
            QuoteKind::None => is_space(c) || c == '>',
            QuoteKind::Single => c == '\'',
            QuoteKind::Double => c == '"',
        }
    }
}

/// Leading characters of an attribute value, while looking for a scheme.
pub type SchemeBuffer = NameBuffer<PREFIX_WINDOW>;

/// Where in the markup structure the tracker is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Text content.
    Body,
    /// After `<`, reading a tag name.
    TagName { closing: bool },
    /// Between attributes of a tag.
    InsideTag,
    /// After a `/` in a tag, expecting `>`.
    TagEmptyEnding,
    /// Reading an attribute name.
    AttrName,
    /// After an attribute name.
    AttrNameAfter { context: AttrValueContext },
    /// After `=`, before the value.
    AttrValueBefore { context: AttrValueContext },
    /// Inside an attribute value.
    ///
    /// The `scheme` buffer is present as long as the value may still
    /// turn out to start with a scheme.
    AttrValue {
        quote: QuoteKind,
        context: AttrValueContext,
        scheme: Option<SchemeBuffer>,
    },
    /// Content of a `script` element.
    Script,
    /// Possibly reading the `</script` end tag, `matched` chars so far.
    ScriptEnd { matched: usize },
    /// Content of a `style` element.
    Style,
    /// Possibly reading the `</style` end tag, `matched` chars so far.
    StyleEnd { matched: usize },
    /// Parsing failed, nothing more is accepted.
    Invalid,
}

impl ParseState {
    /// The context a value written in this state would land in.
    pub fn output_context(&self) -> OutputContext {
        match self {
            ParseState::Body => OutputContext::Html,
            ParseState::Script | ParseState::ScriptEnd { .. } => {
                OutputContext::Js
            }
            ParseState::AttrValue { context, .. } => match context {
                AttrValueContext::Html => OutputContext::Html,
                AttrValueContext::Js | AttrValueContext::ActionScript => {
                    OutputContext::Js
                }
                AttrValueContext::Uri | AttrValueContext::Data => {
                    OutputContext::Uri
                }
                AttrValueContext::Css | AttrValueContext::Content => {
                    OutputContext::Suppress
                }
            },
            _ => OutputContext::Suppress,
        }
    }

    fn raw_text(kind: RawText) -> Self {
        match kind {
            RawText::Script => ParseState::Script,
            RawText::Style => ParseState::Style,
        }
    }

    fn raw_text_end(kind: RawText, matched: usize) -> Self {
        match kind {
            RawText::Script => ParseState::ScriptEnd { matched },
            RawText::Style => ParseState::StyleEnd { matched },
        }
    }
}

/// A line and column in the tracked document, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    fn advance(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

/// Whether the state machine is done with a character.
enum Step {
    Done,
    Again,
}

/// Tracks where in an html document output is written.
///
/// Each literal chunk of a rendered document is pushed through the
/// tracker, which forwards it unmodified to the underlying `sink`.
/// At any point, [`current_output_context`] tells how a dynamic value
/// written right there must be encoded.
///
/// The tracker is strict: markup it can't classify with certainty is
/// rejected with a [`ParseError`], after which the tracker is invalid
/// and rejects anything more.
/// For literal text, everything before the offending character is
/// forwarded to the sink.  A substituted value pushed with
/// [`push_value`] is forwarded whole or not at all.
///
/// # Examples
///
/// ```
/// use ructe_autoescape::{MarkupContextTracker, OutputContext};
/// # fn main() -> ructe_autoescape::Result<()> {
/// let mut tracker = MarkupContextTracker::new(Vec::new());
/// tracker.push_str("<p>Hello ")?;
/// assert_eq!(tracker.current_output_context(), OutputContext::Html);
/// tracker.push_str("<a href=\"")?;
/// assert_eq!(tracker.current_output_context(), OutputContext::Uri);
/// tracker.push_str("\" onclick=\"")?;
/// assert_eq!(tracker.current_output_context(), OutputContext::Js);
/// tracker.push_str("\">")?;
/// assert_eq!(tracker.into_inner(), b"<p>Hello <a href=\"\" onclick=\"\">");
/// # Ok(())
/// # }
/// ```
///
/// [`current_output_context`]: MarkupContextTracker::current_output_context
/// [`push_value`]: MarkupContextTracker::push_value
pub struct MarkupContextTracker<W> {
    sink: W,
    state: ParseState,
    /// The tag or attribute name being read.
    name: NameBuffer,
    /// Content to expect after the current tag.
    after_tag: Option<RawText>,
    position: Position,
    /// Bytes of an incomplete utf-8 sequence from `io::Write`.
    partial: Vec<u8>,
}

impl<W: Write> MarkupContextTracker<W> {
    /// Create a tracker for a new document, written to `sink`.
    pub fn new(sink: W) -> Self {
        MarkupContextTracker {
            sink,
            state: ParseState::Body,
            name: NameBuffer::new(),
            after_tag: None,
            position: Position::default(),
            partial: Vec::new(),
        }
    }

    /// The context a value written right now would land in.
    pub fn current_output_context(&self) -> OutputContext {
        self.state.output_context()
    }

    pub fn state(&self) -> &ParseState {
        &self.state
    }

    /// Position of the next character to be consumed.
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_invalid(&self) -> bool {
        self.state == ParseState::Invalid
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Direct access to the sink.
    ///
    /// Anything written directly is not seen by the tracker.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Consume literal `text` and forward it to the sink.
    ///
    /// On a parse error, the part of `text` before the offending
    /// character is still forwarded.
    /// Fails if an incomplete utf-8 sequence from `io::Write` is pending.
    pub fn push_str(&mut self, text: &str) -> Result<()> {
        self.no_pending_bytes()?;
        self.push_text(text)
    }

    pub fn push_char(&mut self, c: char) -> Result<()> {
        self.push_str(c.encode_utf8(&mut [0; 4]))
    }

    /// Consume a substituted value and forward it to the sink.
    ///
    /// Unlike [`push_str`], this is all or nothing: if any part of
    /// `text` fails to parse, none of it is forwarded.
    ///
    /// [`push_str`]: MarkupContextTracker::push_str
    pub fn push_value(&mut self, text: &str) -> Result<()> {
        self.no_pending_bytes()?;
        match self.consume_str(text) {
            Ok(()) => self.forward(text),
            Err((_, err)) => Err(err.into()),
        }
    }

    fn push_text(&mut self, text: &str) -> Result<()> {
        match self.consume_str(text) {
            Ok(()) => self.forward(text),
            Err((valid, err)) => {
                self.forward(&text[..valid])?;
                Err(err.into())
            }
        }
    }

    /// Run `text` through the state machine.
    ///
    /// On failure, returns the length of the accepted part of `text`
    /// with the error.
    fn consume_str(&mut self, text: &str) -> Result<(), (usize, ParseError)> {
        if self.is_invalid() {
            return Err((0, self.fail(ParseErrorKind::AlreadyFailed)));
        }
        for (i, c) in text.char_indices() {
            if let Err(kind) = self.consume(c) {
                return Err((i, self.fail(kind)));
            }
            self.position.advance(c);
        }
        Ok(())
    }

    /// Text must not overtake a partial character written by `io::Write`.
    fn no_pending_bytes(&mut self) -> Result<()> {
        if self.partial.is_empty() || self.is_invalid() {
            return Ok(());
        }
        self.partial.clear();
        Err(self.fail(ParseErrorKind::InvalidUtf8).into())
    }

    fn forward(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        if let Err(err) = self.sink.write_all(text.as_bytes()) {
            self.state = ParseState::Invalid;
            return Err(err.into());
        }
        Ok(())
    }

    fn fail(&mut self, kind: ParseErrorKind) -> ParseError {
        self.state = ParseState::Invalid;
        let err = ParseError {
            kind,
            line: self.position.line,
            column: self.position.column,
        };
        log::warn!("{}", err);
        err
    }
}

impl<W> MarkupContextTracker<W> {
    fn consume(&mut self, c: char) -> Result<(), ParseErrorKind> {
        while let Step::Again = self.step(c)? {}
        Ok(())
    }

    fn step(&mut self, c: char) -> Result<Step, ParseErrorKind> {
        match self.state {
            ParseState::Body => {
                if c == '<' {
                    self.name.clear();
                    self.state = ParseState::TagName { closing: false };
                } else if is_forbidden_control(c) {
                    return Err(ParseErrorKind::ControlCharacter(c));
                }
            }
            ParseState::TagName { closing } => {
                if c == '/' && !closing && self.name.is_empty() {
                    self.state = ParseState::TagName { closing: true };
                } else if is_name_char(c)
                    && (is_name_start(c) || !self.name.is_empty())
                {
                    self.name.push(c)?;
                } else if self.name.is_empty() {
                    return Err(if is_space(c) || c == '>' {
                        ParseErrorKind::EmptyName
                    } else {
                        ParseErrorKind::InvalidNameStart(c)
                    });
                } else if is_space(c) || c == '>' {
                    self.after_tag = if closing {
                        None
                    } else {
                        raw_text_element(self.name.as_str())
                    };
                    if let Some(kind) = self.after_tag {
                        log::trace!("Entering {:?} content", kind);
                    }
                    self.state = ParseState::InsideTag;
                    return Ok(Step::Again);
                } else {
                    return Err(ParseErrorKind::InvalidAfterName(c));
                }
            }
            ParseState::InsideTag => {
                if c == '>' {
                    self.state = self.content_state();
                } else if c == '/' {
                    self.state = ParseState::TagEmptyEnding;
                } else if is_name_start(c) {
                    self.name.clear();
                    self.state = ParseState::AttrName;
                    return Ok(Step::Again);
                } else if !is_space(c) {
                    return Err(ParseErrorKind::InvalidInTag(c));
                }
            }
            ParseState::TagEmptyEnding => {
                if c != '>' {
                    return Err(ParseErrorKind::InvalidEmptyTagEnding(c));
                }
                self.state = self.content_state();
            }
            ParseState::AttrName => {
                if is_name_char(c) {
                    self.name.push(c)?;
                } else if is_space(c) || matches!(c, '=' | '/' | '>') {
                    if self.name.is_empty() {
                        return Err(ParseErrorKind::EmptyName);
                    }
                    let context = classify_attribute(self.name.as_str());
                    self.state = ParseState::AttrNameAfter { context };
                    return Ok(Step::Again);
                } else {
                    return Err(ParseErrorKind::InvalidAfterName(c));
                }
            }
            ParseState::AttrNameAfter { context } => {
                if c == '=' {
                    self.state = ParseState::AttrValueBefore { context };
                } else if c == '/' {
                    self.state = ParseState::TagEmptyEnding;
                } else if c == '>' {
                    self.state = ParseState::InsideTag;
                    return Ok(Step::Again);
                } else if is_name_start(c) {
                    self.name.clear();
                    self.state = ParseState::AttrName;
                    return Ok(Step::Again);
                } else if !is_space(c) {
                    return Err(ParseErrorKind::InvalidAfterName(c));
                }
            }
            ParseState::AttrValueBefore { context } => {
                let quote = match c {
                    '"' => QuoteKind::Double,
                    '\'' => QuoteKind::Single,
                    _ => QuoteKind::None,
                };
                self.state = ParseState::AttrValue {
                    quote,
                    context,
                    scheme: Some(SchemeBuffer::new()),
                };
                if quote == QuoteKind::None {
                    return Ok(Step::Again);
                }
            }
            ParseState::AttrValue {
                quote,
                context,
                scheme,
            } => {
                if quote.ends_value(c) {
                    self.state = ParseState::InsideTag;
                    if quote == QuoteKind::None {
                        return Ok(Step::Again);
                    }
                } else if let Some(scheme) = scheme {
                    let (context, scheme) = scan_scheme(context, scheme, c);
                    self.state = ParseState::AttrValue {
                        quote,
                        context,
                        scheme,
                    };
                }
            }
            ParseState::Script => {
                return Ok(self.raw_text_step(RawText::Script, None, c));
            }
            ParseState::ScriptEnd { matched } => {
                return Ok(self.raw_text_step(RawText::Script, Some(matched), c));
            }
            ParseState::Style => {
                return Ok(self.raw_text_step(RawText::Style, None, c));
            }
            ParseState::StyleEnd { matched } => {
                return Ok(self.raw_text_step(RawText::Style, Some(matched), c));
            }
            ParseState::Invalid => return Err(ParseErrorKind::AlreadyFailed),
        }
        Ok(Step::Done)
    }

    /// Script or style content, where only the end tag matters.
    ///
    /// `matched` is the number of end tag characters seen after a `<`,
    /// or `None` when not in a possible end tag.
    fn raw_text_step(
        &mut self,
        kind: RawText,
        matched: Option<usize>,
        c: char,
    ) -> Step {
        let end_tag = kind.end_tag().as_bytes();
        match matched {
            None => {
                if c == '<' {
                    self.state = ParseState::raw_text_end(kind, 0);
                }
                Step::Done
            }
            Some(n) if n < end_tag.len() => {
                if c.is_ascii() && (c as u8).to_ascii_lowercase() == end_tag[n] {
                    self.state = ParseState::raw_text_end(kind, n + 1);
                    Step::Done
                } else {
                    self.state = ParseState::raw_text(kind);
                    Step::Again
                }
            }
            Some(_) => {
                if is_space(c) || c == '>' || c == '/' {
                    self.after_tag = None;
                    self.state = ParseState::InsideTag;
                } else {
                    self.state = ParseState::raw_text(kind);
                }
                Step::Again
            }
        }
    }

    fn content_state(&self) -> ParseState {
        self.after_tag
            .map_or(ParseState::Body, ParseState::raw_text)
    }
}

/// Control characters are not allowed in text, except tab and newlines.
fn is_forbidden_control(c: char) -> bool {
    (c as u32) < 0x20 && !matches!(c, '\t' | '\r' | '\n')
}

/// Scan one character of an attribute value for a scheme prefix.
///
/// Returns the possibly refined context, and the buffer if scanning
/// should continue.
fn scan_scheme(
    context: AttrValueContext,
    mut scheme: SchemeBuffer,
    c: char,
) -> (AttrValueContext, Option<SchemeBuffer>) {
    if c == ':' {
        if prefix_may_reclassify(context) {
            if let Some(refined) = classify_value_prefix(scheme.as_str()) {
                log::trace!(
                    "Value prefix {:?} makes {:?} attribute {:?}",
                    scheme.as_str(),
                    context,
                    refined,
                );
                return (refined, None);
            }
        }
        (context, None)
    } else if is_space(c) {
        // Browsers ignore whitespace in schemes.
        (context, Some(scheme))
    } else if scheme.is_full() || scheme.push(c).is_err() {
        (context, None)
    } else {
        (context, Some(scheme))
    }
}

impl<W: Write> Write for MarkupContextTracker<W> {
    /// Consume utf-8 text.
    ///
    /// A multi-byte character may be split between calls.
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.partial.extend_from_slice(data);
        let (valid, broken) = match std::str::from_utf8(&self.partial) {
            Ok(s) => (s.len(), false),
            Err(e) => (e.valid_up_to(), e.error_len().is_some()),
        };
        let rest = self.partial.split_off(valid);
        let text = std::mem::replace(&mut self.partial, rest);
        let text = String::from_utf8(text)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.push_text(&text)?;
        if broken {
            self.partial.clear();
            let err = self.fail(ParseErrorKind::InvalidUtf8);
            return Err(crate::Error::from(err).into());
        }
        Ok(data.len())
    }

    /// Flush the sink.
    ///
    /// Fails if the last write ended inside a utf-8 sequence.
    fn flush(&mut self) -> io::Result<()> {
        self.no_pending_bytes()?;
        self.sink.flush()
    }
}
