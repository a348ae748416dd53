use crate::encoder::{encode, OutputContext};
use crate::errors::Result;
use crate::tracker::MarkupContextTracker;
use std::borrow::Cow;
use std::io::Write;

/// Default prefix for references that are written without encoding.
pub const DEFAULT_RAW_PREFIX: &str = "raw_";

/// Decides what to write when a template substitutes a value.
///
/// This is the hook a template engine calls for each dynamic value.
/// The value is encoded for the context the tracker is in, unless the
/// name of the reference has the raw prefix, which means the template
/// author takes responsibility for the value being valid markup.
///
/// # Examples
///
/// ```
/// use ructe_autoescape::{AutoEscape, MarkupContextTracker};
/// # fn main() -> ructe_autoescape::Result<()> {
/// let escape = AutoEscape::default();
/// let mut tracker = MarkupContextTracker::new(Vec::new());
/// tracker.push_str("<p>")?;
/// escape.insert_into(&mut tracker, "name", Some("Tom & Jerry"))?;
/// escape.insert_into(&mut tracker, "raw_extra", Some("<br />"))?;
/// tracker.push_str("<a href=\"/search?q=")?;
/// escape.insert_into(&mut tracker, "query", Some("a b"))?;
/// tracker.push_str("\">search</a></p>")?;
/// assert_eq!(
///     String::from_utf8(tracker.into_inner()).unwrap(),
///     "<p>Tom&#32;&amp;&#32;Jerry<br /><a href=\"/search?q=a%20b\">search</a></p>",
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AutoEscape {
    raw_prefix: Cow<'static, str>,
}

impl AutoEscape {
    /// Create an `AutoEscape` with [`DEFAULT_RAW_PREFIX`].
    pub fn new() -> Self {
        AutoEscape {
            raw_prefix: Cow::Borrowed(DEFAULT_RAW_PREFIX),
        }
    }

    /// Use another prefix to mark references that are not encoded.
    ///
    /// An empty prefix is ignored, it would turn off all encoding.
    pub fn with_raw_prefix(
        mut self,
        prefix: impl Into<Cow<'static, str>>,
    ) -> Self {
        let prefix = prefix.into();
        if prefix.is_empty() {
            log::warn!("Ignoring empty raw prefix");
        } else {
            self.raw_prefix = prefix;
        }
        self
    }

    pub fn raw_prefix(&self) -> &str {
        &self.raw_prefix
    }

    /// True if the value of `reference` should be written as is.
    pub fn is_raw(&self, reference: &str) -> bool {
        reference.starts_with(&*self.raw_prefix)
    }

    /// The text to write for `value`, referenced as `reference`, in the
    /// given context.
    ///
    /// Returns `None` if there is no value.
    pub fn insert_in<'v>(
        &self,
        context: OutputContext,
        reference: &str,
        value: Option<&'v str>,
    ) -> Option<Cow<'v, str>> {
        let value = value?;
        if self.is_raw(reference) {
            log::debug!("Writing {:?} unencoded", reference);
            Some(Cow::Borrowed(value))
        } else {
            Some(Cow::Owned(encode(value, context)))
        }
    }

    /// The text to write for `value` at the current position of `tracker`.
    ///
    /// Once `tracker` is invalid, that is nothing, even for raw values.
    pub fn insert<'v, W: Write>(
        &self,
        tracker: &MarkupContextTracker<W>,
        reference: &str,
        value: Option<&'v str>,
    ) -> Option<Cow<'v, str>> {
        if tracker.is_invalid() {
            return value.map(|_| Cow::Borrowed(""));
        }
        self.insert_in(tracker.current_output_context(), reference, value)
    }

    /// Write `value` through `tracker`.
    ///
    /// The written text is parsed by the tracker like literal text, so
    /// the tracker stays in sync with the document.
    /// If the text does not parse, none of it is written.
    pub fn insert_into<W: Write>(
        &self,
        tracker: &mut MarkupContextTracker<W>,
        reference: &str,
        value: Option<&str>,
    ) -> Result<()> {
        match self.insert(tracker, reference, value) {
            Some(text) => tracker.push_value(&text),
            None => Ok(()),
        }
    }
}

impl Default for AutoEscape {
    fn default() -> Self {
        Self::new()
    }
}
