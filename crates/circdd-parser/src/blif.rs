//! BLIF parser
//!
//! Supported directives are `.model`, `.inputs`, `.outputs`, `.names`,
//! `.latch` and `.end`. Other directives are skipped up to the end of their
//! line. A file may contain several models.
//!
//! Cover rows of a `.names` gate consist of an input plane (`1`, `0` or `-`
//! per input) and an output value. The output value of the first row
//! determines whether the rows describe the ON-set (`1`) or the OFF-set
//! (`0`) of the gate. In the latter case, the gate's output signal is marked
//! as complemented. Rows with output `-` are ignored. A single-input gate
//! whose only row is `0 1` is stored as the complement of `1 1`.

use nom::bytes::complete::take_while1;
use nom::character::complete::char;
use nom::error::{ContextError, ParseError};
use nom::multi::many0;
use nom::sequence::preceded;
use nom::IResult;

use crate::util::{blank_lines, eol, fail, line_span, skip_line, token, word_span, ws0, ws1};
use crate::{Gate, Latch, Literal, Model};

fn name(token: &[u8]) -> String {
    String::from_utf8_lossy(token).into_owned()
}

/// `.keyword`, returns the keyword without the dot
fn directive<'a, E>(input: &'a [u8]) -> IResult<&'a [u8], &'a [u8], E>
where
    E: ParseError<&'a [u8]>,
{
    preceded(
        ws0,
        preceded(
            char('.'),
            take_while1(|c: u8| c.is_ascii_alphanumeric() || c == b'_'),
        ),
    )(input)
}

/// Whitespace-separated tokens up to the end of the line
fn token_list<'a, E>(input: &'a [u8]) -> IResult<&'a [u8], Vec<&'a [u8]>, E>
where
    E: ParseError<&'a [u8]>,
{
    let (input, tokens) = many0(preceded(ws1, token))(input)?;
    let (input, _) = eol(input)?;
    Ok((input, tokens))
}

/// Parse the cover rows following a `.names` line
fn cover<'a, E>(names_line: &'a [u8], input: &'a [u8]) -> IResult<&'a [u8], Gate, E>
where
    E: ParseError<&'a [u8]> + ContextError<&'a [u8]>,
{
    let (mut input, mut signals) = token_list(input)?;
    let Some(output) = signals.pop() else {
        return fail(line_span(names_line), "'.names' requires an output signal");
    };
    let num_inputs = signals.len();
    let mut gate = Gate::new(name(output), signals.into_iter().map(name).collect());

    let mut on_set: Option<bool> = None;
    loop {
        (input, _) = blank_lines(input)?;
        let (row, _) = ws0(input)?;
        match row.first() {
            None | Some(b'.') => break,
            _ => {}
        }

        if num_inputs == 0 {
            let (rest, value) = token(row)?;
            gate.constant = match value {
                b"1" => true,
                b"0" => false,
                _ => return fail(word_span(value), "expected '0' or '1'"),
            };
            (input, _) = eol(rest)?;
            continue;
        }

        let Ok((rest, plane)) = token::<E>(row) else {
            return fail(line_span(row), "expected a cover row");
        };
        let Ok((rest, value)) = preceded(ws1, token::<E>)(rest) else {
            return fail(line_span(row), "expected an output value after the input plane");
        };
        if plane.len() != num_inputs {
            return fail(plane, "the input plane length does not match the number of inputs");
        }
        let value = match value {
            b"1" => Some(true),
            b"0" => Some(false),
            b"-" => None,
            _ => return fail(value, "expected '0', '1' or '-'"),
        };
        (input, _) = eol(rest)?;

        let Some(value) = value else {
            continue;
        };
        match on_set {
            None => {
                on_set = Some(value);
                gate.output.complemented = !value;
            }
            Some(on) if on != value => {
                return fail(
                    line_span(row),
                    "all rows of a cover must have the same output value",
                );
            }
            Some(_) => {}
        }

        let mut literals = Vec::with_capacity(num_inputs);
        for (i, c) in plane.iter().enumerate() {
            match c {
                b'1' => literals.push(Literal::new(i, false)),
                b'0' => literals.push(Literal::new(i, true)),
                b'-' => {}
                _ => return fail(&plane[i..i + 1], "expected '0', '1' or '-'"),
            }
        }
        gate.rows.push(literals);
    }

    // An inverter is recorded as the complement of its input
    if let [row] = &mut gate.rows[..] {
        if let [literal] = &mut row[..] {
            if num_inputs == 1 && literal.is_negative() && !gate.output.complemented {
                *literal = Literal::new(0, false);
                gate.output.complemented = true;
            }
        }
    }

    Ok((input, gate))
}

fn model<'a, E>(input: &'a [u8]) -> IResult<&'a [u8], Model, E>
where
    E: ParseError<&'a [u8]> + ContextError<&'a [u8]>,
{
    let model_line = input;
    match directive::<E>(input) {
        Ok((_, b"model")) => {}
        _ => return fail(line_span(model_line), "expected '.model'"),
    }
    let (input, _) = directive(input)?;
    let (mut input, names) = token_list(input)?;
    let Some(&model_name) = names.first() else {
        return fail(line_span(model_line), "'.model' requires a name");
    };
    let mut model = Model::new(name(model_name));

    loop {
        (input, _) = blank_lines(input)?;
        if input.is_empty() {
            break;
        }
        let line = input;
        let Ok((rest, keyword)) = directive::<E>(line) else {
            return fail(line_span(line), "expected a directive");
        };
        match keyword {
            b"inputs" => {
                let (rest, names) = token_list(rest)?;
                model.inputs.extend(names.into_iter().map(name));
                input = rest;
            }
            b"outputs" => {
                let (rest, names) = token_list(rest)?;
                model.outputs.extend(names.into_iter().map(name));
                input = rest;
            }
            b"names" => {
                let (rest, gate) = cover(line, rest)?;
                model.gates.push(gate);
                input = rest;
            }
            b"latch" => {
                let (rest, tokens) = token_list(rest)?;
                let [latch_input, latch_output, ..] = tokens[..] else {
                    return fail(line_span(line), "'.latch' requires an input and an output");
                };
                model.latches.push(Latch {
                    input: name(latch_input),
                    output: name(latch_output),
                    init: tokens.len() > 2 && tokens.last() == Some(&&b"1"[..]),
                });
                input = rest;
            }
            b"end" => {
                (input, _) = eol(rest)?;
                break;
            }
            // the next model starts without an `.end`
            b"model" => break,
            _ => {
                (input, _) = skip_line(rest)?;
            }
        }
    }

    Ok((input, model))
}

/// Parse all models of a BLIF file
pub fn parse<'a, E>() -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], Vec<Model>, E>
where
    E: ParseError<&'a [u8]> + ContextError<&'a [u8]>,
{
    move |input| {
        let mut models = Vec::new();
        let (mut input, _) = blank_lines(input)?;
        while !input.is_empty() {
            let (rest, model) = model(input)?;
            models.push(model);
            (input, _) = blank_lines(rest)?;
        }
        Ok((input, models))
    }
}
