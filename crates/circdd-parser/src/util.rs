//! Parsing helpers

use memchr::memchr2;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_till1};
use nom::character::complete::{char, line_ending, not_line_ending, space0, space1};
use nom::combinator::{eof, opt, value};
use nom::error::{ContextError, ErrorKind, ParseError};
use nom::multi::{many0_count, many1_count};
use nom::sequence::{preceded, tuple};
use nom::{Err, IResult};

/// Backslash followed by a line break, which joins two physical lines
fn line_continuation<'a, E: ParseError<&'a [u8]>>(input: &'a [u8]) -> IResult<&'a [u8], (), E> {
    value((), tuple((tag("\\"), space0, line_ending)))(input)
}

/// Optional spaces, tabs and line continuations
pub fn ws0<'a, E: ParseError<&'a [u8]>>(input: &'a [u8]) -> IResult<&'a [u8], (), E> {
    value((), many0_count(alt((value((), space1), line_continuation))))(input)
}

/// At least one space, tab or line continuation
pub fn ws1<'a, E: ParseError<&'a [u8]>>(input: &'a [u8]) -> IResult<&'a [u8], (), E> {
    value((), many1_count(alt((value((), space1), line_continuation))))(input)
}

fn comment<'a, E: ParseError<&'a [u8]>>(input: &'a [u8]) -> IResult<&'a [u8], (), E> {
    value((), preceded(char('#'), not_line_ending))(input)
}

/// Optional whitespace and comment, followed by a line break or the end of
/// input
pub fn eol<'a, E: ParseError<&'a [u8]>>(input: &'a [u8]) -> IResult<&'a [u8], (), E> {
    value((), tuple((ws0, opt(comment), alt((line_ending, eof)))))(input)
}

/// Any number of empty or comment-only lines
pub fn blank_lines<'a, E: ParseError<&'a [u8]>>(input: &'a [u8]) -> IResult<&'a [u8], (), E> {
    value((), many0_count(tuple((ws0, opt(comment), line_ending))))(input)
}

/// Skip the remainder of the current line
pub fn skip_line<'a, E: ParseError<&'a [u8]>>(input: &'a [u8]) -> IResult<&'a [u8], (), E> {
    value((), tuple((not_line_ending, opt(line_ending))))(input)
}

/// Signal name or other whitespace-separated token
pub fn token<'a, E: ParseError<&'a [u8]>>(input: &'a [u8]) -> IResult<&'a [u8], &'a [u8], E> {
    take_till1(|c: u8| c.is_ascii_whitespace() || c == b'#' || c == b'\\')(input)
}

pub fn word_span(input: &[u8]) -> &[u8] {
    for (i, &b) in input.iter().enumerate() {
        match b {
            b' ' | b'\t' | b'\n' | b'\r' => return &input[..i],
            _ => {}
        }
    }
    input
}

#[inline]
pub fn line_span(input: &[u8]) -> &[u8] {
    match memchr2(b'\n', b'\r', input) {
        Some(i) => &input[..i],
        None => input,
    }
}

#[inline]
pub fn fail<I: Clone, O, E: ParseError<I> + ContextError<I>>(
    span: I,
    msg: &'static str,
) -> IResult<I, O, E> {
    Err(Err::Failure(E::add_context(
        span.clone(),
        msg,
        E::from_error_kind(span, ErrorKind::Fail),
    )))
}

#[cfg(test)]
mod tests {
    use nom::error::Error;

    use super::*;

    #[test]
    fn continuation_is_whitespace() {
        let (rest, ()) = ws1::<Error<_>>(b" \\\n  b").unwrap();
        assert_eq!(rest, b"b");
        assert!(ws1::<Error<_>>(b"b").is_err());
    }

    #[test]
    fn blank_and_comment_lines() {
        let (rest, ()) = blank_lines::<Error<_>>(b"\n  # foo\n\t\n.model").unwrap();
        assert_eq!(rest, b".model");
        let (rest, ()) = eol::<Error<_>>(b"  # trailing").unwrap();
        assert!(rest.is_empty());
    }

    #[test]
    fn spans() {
        assert_eq!(word_span(b"abc def"), b"abc");
        assert_eq!(line_span(b"abc def\nghi"), b"abc def");
        assert_eq!(token::<Error<_>>(b"n1#x").unwrap(), (&b"#x"[..], &b"n1"[..]));
    }
}
