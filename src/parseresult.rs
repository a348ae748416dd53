use nom::{Err, IResult};
use nom_language::error::{VerboseError, VerboseErrorKind};
use std::fmt::Write;
use std::str::from_utf8;

/// Parser result, with verbose error.
pub type PResult<'a, O> = IResult<&'a [u8], O, VerboseError<&'a [u8]>>;

/// Describe the errors of a failed template parse.
///
/// Each error with a message is shown as the offending line of `src`,
/// with a marker under the position of the error.
pub fn describe_errors(src: &[u8], error: &Err<VerboseError<&[u8]>>) -> String {
    let mut out = String::new();
    match error {
        Err::Failure(VerboseError { errors })
        | Err::Error(VerboseError { errors }) => {
            for (rest, kind) in errors.iter().rev() {
                if let Some(message) = message(kind) {
                    let at = SourceLine::at(src, src.len() - rest.len());
                    at.mark(&mut out, &message);
                }
            }
        }
        Err::Incomplete(needed) => {
            SourceLine::at(src, 0).mark(&mut out, &format!("{:?}", needed));
        }
    }
    out
}

fn message(kind: &VerboseErrorKind) -> Option<String> {
    match kind {
        VerboseErrorKind::Context(msg) => Some((*msg).into()),
        VerboseErrorKind::Char(ch) => Some(format!("Expected {:?}", ch)),
        VerboseErrorKind::Nom(_) => None,
    }
}

/// A line of template source, and a column in it.
struct SourceLine<'a> {
    line_no: usize,
    column: usize,
    text: &'a str,
}

impl<'a> SourceLine<'a> {
    /// Find the line and column of byte offset `pos` in `src`.
    fn at(src: &'a [u8], pos: usize) -> Self {
        let before = &src[..pos];
        let start = before
            .iter()
            .rposition(|c| *c == b'\n')
            .map_or(0, |nl| nl + 1);
        let text = src[start..]
            .split(|c| *c == b'\n')
            .next()
            .and_then(|s| from_utf8(s).ok())
            .unwrap_or("(Failed to display line)");
        SourceLine {
            line_no: bytecount::count(before, b'\n') + 1,
            column: from_utf8(&src[start..pos])
                .map_or(pos - start, |s| s.chars().count())
                + 1,
            text,
        }
    }

    fn mark(&self, out: &mut String, message: &str) {
        // Writing to a String never fails.
        let _ = writeln!(
            out,
            "{:>4}:{}\n     {:>col$} {}",
            self.line_no,
            self.text,
            "^",
            message,
            col = self.column,
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn source_line_position() {
        let src = "first\nsecond line\nåäö x".as_bytes();
        let at = SourceLine::at(src, 9);
        assert_eq!((at.line_no, at.column, at.text), (2, 4, "second line"));
        let at = SourceLine::at(src, src.len() - 1);
        assert_eq!((at.line_no, at.column, at.text), (3, 5, "åäö x"));
        let at = SourceLine::at(src, 0);
        assert_eq!((at.line_no, at.column), (1, 1));
    }

    #[test]
    fn marked_line() {
        let mut out = String::new();
        SourceLine::at(b"a\n  @!", 5).mark(&mut out, "Oops");
        assert_eq!(out, "   2:  @!\n        ^ Oops\n");
    }
}
