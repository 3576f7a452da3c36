//! Convenience functions to load [`Model`]s from file

// spell-checker:ignore termcolor

use std::fmt;
use std::path::Path;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term::termcolor::ColorChoice;
use codespan_reporting::term::termcolor::{StandardStream, WriteColor};
use codespan_reporting::term::{emit, Config};
use nom::error::{ContextError, ErrorKind, ParseError};
use nom::Offset;

use crate::blif;
use crate::Model;

struct ParserReport<I>(Vec<(I, ParserError)>);

enum ParserError {
    Nom(ErrorKind),
    Char(char),
    Context(&'static str),
}

impl<I> ParseError<I> for ParserReport<I> {
    fn from_error_kind(input: I, kind: ErrorKind) -> Self {
        ParserReport(vec![(input, ParserError::Nom(kind))])
    }

    fn append(input: I, kind: ErrorKind, mut other: Self) -> Self {
        other.0.push((input, ParserError::Nom(kind)));
        other
    }

    fn from_char(input: I, c: char) -> Self {
        ParserReport(vec![(input, ParserError::Char(c))])
    }
}

impl<I> ContextError<I> for ParserReport<I> {
    fn add_context(input: I, ctx: &'static str, mut other: Self) -> Self {
        match other.0[0].1 {
            ParserError::Context(_) => {}
            // Assume that the context is a better description
            _ => other.0.clear(),
        }
        other.0.push((input, ParserError::Context(ctx)));
        other
    }
}

/// Parse the BLIF models in `input`, emitting errors to `writer`
///
/// `file_id` is an identifier for the file used for error reporting. `config`
/// configures how diagnostics are rendered.
///
/// If you simply want to parse a file with error reporting to stderr, you are
/// probably looking for [`load_file()`].
pub fn parse<S: AsRef<str> + Clone + fmt::Display>(
    input: &[u8],
    file_id: S,
    writer: &mut dyn WriteColor,
    config: &Config,
) -> Option<Vec<Model>> {
    let errors = match blif::parse::<ParserReport<_>>()(input) {
        Ok((rest, models)) => {
            debug_assert!(rest.is_empty());
            return Some(models);
        }
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => e.0,
        Err(nom::Err::Incomplete(_)) => unreachable!("only using complete parsers"),
    };

    let range = move |span: &[u8]| {
        let offset = input.offset(span);
        let end = offset + span.len();
        if end > input.len() {
            offset..offset
        } else {
            offset..end
        }
    };

    let mut labels = Vec::with_capacity(errors.len());
    let mut errors = errors.into_iter().map(|(span, err)| {
        (
            span,
            match err {
                ParserError::Nom(e) => format!("Expected {}", e.description()),
                ParserError::Char(c) => format!("Expected '{c}'"),
                ParserError::Context(msg) => msg.to_string(),
            },
        )
    });
    let (span, error) = errors.next()?;
    labels.push(Label::primary((), range(span)).with_message(error));
    for (span, error) in errors {
        labels.push(Label::secondary((), range(span)).with_message(error));
    }

    let diagnostic = Diagnostic::error()
        .with_message("parsing failed")
        .with_labels(labels);

    let file = SimpleFile::new(file_id, String::from_utf8_lossy(input));
    emit(writer, config, &file, &diagnostic).ok();

    None
}

fn parse_to_stderr(src: &[u8], file_id: String) -> Option<Vec<Model>> {
    let config = Config::default();
    let writer = StandardStream::stderr(ColorChoice::Auto);
    let mut write_lock = writer.lock();
    parse(src, file_id, &mut write_lock, &config)
}

/// Parse the BLIF models in `src`, reporting errors to stderr
///
/// `name` is used in error messages. Returns `Some(models)` on success, `None`
/// on error.
pub fn load_str(src: &str, name: &str) -> Option<Vec<Model>> {
    parse_to_stderr(src.as_bytes(), name.to_string())
}

/// Load and parse the BLIF file at `path`, reporting errors to stderr
///
/// Returns `Some(models)` on success, `None` on error.
pub fn load_file(path: impl AsRef<Path>) -> Option<Vec<Model>> {
    let path = path.as_ref();
    let src = match std::fs::read(path) {
        Ok(src) => src,
        Err(err) => {
            eprintln!("error: could not read '{}' ({err})", path.display());
            return None;
        }
    };
    parse_to_stderr(&src, path.to_string_lossy().into_owned())
}
