use std::fmt;
use std::io;

/// Fixed text starting every markup parse failure message.
pub const PARSE_ERROR_PREFIX: &str = "Markup parse error";

/// The reason a [`MarkupContextTracker`] refused its input.
///
/// [`MarkupContextTracker`]: crate::MarkupContextTracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A raw control character in body text.
    ControlCharacter(char),
    /// A tag or attribute name started with something else than a letter.
    InvalidNameStart(char),
    /// A character that may not follow a tag or attribute name.
    InvalidAfterName(char),
    /// A character that can't appear between attributes of a tag.
    InvalidInTag(char),
    /// A name longer than the name buffer.
    NameTooLong,
    /// A character outside ascii in a name.
    NonAsciiName(char),
    /// A `<` or `</` without a tag name.
    EmptyName,
    /// A `/` inside a tag not directly followed by `>`.
    InvalidEmptyTagEnding(char),
    /// Bytes written through `io::Write` that were not UTF-8.
    InvalidUtf8,
    /// The tracker already failed and rejects everything.
    AlreadyFailed,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseErrorKind::ControlCharacter(c) => {
                write!(out, "control character {:?} in text", c)
            }
            ParseErrorKind::InvalidNameStart(c) => {
                write!(out, "a name can't start with {:?}", c)
            }
            ParseErrorKind::InvalidAfterName(c) => {
                write!(out, "unexpected {:?} after name", c)
            }
            ParseErrorKind::InvalidInTag(c) => {
                write!(out, "unexpected {:?} inside tag", c)
            }
            ParseErrorKind::NameTooLong => out.write_str("name too long"),
            ParseErrorKind::NonAsciiName(c) => {
                write!(out, "non-ascii {:?} in name", c)
            }
            ParseErrorKind::EmptyName => out.write_str("missing tag name"),
            ParseErrorKind::InvalidEmptyTagEnding(c) => {
                write!(out, "expected '>' after '/', got {:?}", c)
            }
            ParseErrorKind::InvalidUtf8 => out.write_str("invalid utf-8"),
            ParseErrorKind::AlreadyFailed => {
                out.write_str("document already failed to parse")
            }
        }
    }
}

/// A markup parse failure, at a 1-based line and column.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {kind} at line {line}, column {column}", PARSE_ERROR_PREFIX)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: usize,
    pub column: usize,
}

/// Any error from rendering auto-escaped output.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Markup(#[from] ParseError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Template syntax error:\n{0}")]
    Template(String),
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err {
            Error::Io(err) => err,
            err => io::Error::new(io::ErrorKind::InvalidData, err),
        }
    }
}

/// A result where the error type defaults to [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn message_has_prefix_and_position() {
        let err = ParseError {
            kind: ParseErrorKind::InvalidNameStart('1'),
            line: 1,
            column: 2,
        };
        assert_eq!(
            err.to_string(),
            "Markup parse error: a name can't start with '1' \
             at line 1, column 2"
        );
    }

    #[test]
    fn markup_error_as_io_error() {
        let err: io::Error = Error::from(ParseError {
            kind: ParseErrorKind::NameTooLong,
            line: 3,
            column: 20,
        })
        .into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().starts_with(PARSE_ERROR_PREFIX));
    }
}
