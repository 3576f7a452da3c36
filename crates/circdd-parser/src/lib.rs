//! Reader for flattened circuit descriptions in the Berkeley Logic Interchange
//! Format (BLIF)
//!
//! ## Example
//!
//! ```no_run
//! # use circdd_parser::load_file::load_file;
//! let Some(models) = load_file("adder.blif") else {
//!     return; // an error message has been printed to stderr
//! };
//! for model in &models {
//!     println!("{model}");
//! }
//! ```
//!
//! ## Feature flags
#![doc = document_features::document_features!()]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::fmt;

pub mod blif;
mod util;

#[cfg(feature = "load-file")]
pub mod load_file;

/// Reference to one of a gate's inputs inside a cover row
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Literal {
    input: usize,
    negative: bool,
}

impl Literal {
    /// Create a literal for the gate input with index `input`
    #[inline]
    pub const fn new(input: usize, negative: bool) -> Self {
        Self { input, negative }
    }

    /// Index into [`Gate::inputs`]
    #[inline]
    pub const fn input(self) -> usize {
        self.input
    }

    /// Whether the input appears complemented
    #[inline]
    pub const fn is_negative(self) -> bool {
        self.negative
    }
}

/// A named signal, possibly complemented
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Signal {
    /// Name of the signal
    pub name: String,
    /// Whether the reference is complemented
    pub complemented: bool,
}

impl Signal {
    /// Plain reference to `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            complemented: false,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.complemented {
            f.write_str("-")?;
        }
        f.write_str(&self.name)
    }
}

/// Combinational gate given as a sum of products
///
/// The function of the gate is the disjunction of its rows, each row being
/// the conjunction of its literals. If [`Gate::output`] is complemented, the
/// gate computes the complement of that disjunction. A gate without inputs is
/// the constant [`Gate::constant`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Gate {
    /// Output signal
    pub output: Signal,
    /// Input signal names
    pub inputs: Vec<String>,
    /// Cover rows
    pub rows: Vec<Vec<Literal>>,
    /// Value of a gate without inputs
    pub constant: bool,
}

impl Gate {
    /// Create a gate without rows
    pub fn new(output: impl Into<String>, inputs: Vec<String>) -> Self {
        Self {
            output: Signal::new(output),
            inputs,
            rows: Vec::new(),
            constant: false,
        }
    }

    /// Create a constant gate
    pub fn constant(output: impl Into<String>, value: bool) -> Self {
        Self {
            constant: value,
            ..Self::new(output, Vec::new())
        }
    }

    /// Name of the gate, i.e. the name of its output signal
    #[inline]
    pub fn name(&self) -> &str {
        &self.output.name
    }

    /// Whether this gate has no inputs
    #[inline]
    pub fn is_constant(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Name of the input that `literal` refers to
    #[inline]
    pub fn input_name(&self, literal: Literal) -> &str {
        &self.inputs[literal.input]
    }

    fn fmt_literal(&self, f: &mut fmt::Formatter<'_>, literal: Literal) -> fmt::Result {
        let sign = if literal.negative { "-" } else { "" };
        write!(f, " {sign}{}", self.input_name(literal))
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Gate: {}", self.name())?;
        write!(f, "{} =", self.output)?;
        if self.is_constant() {
            let value = if self.constant { "TRUE" } else { "FALSE" };
            return writeln!(f, " {value}");
        }
        if let [row] = &self.rows[..] {
            for &literal in row {
                self.fmt_literal(f, literal)?;
            }
        } else {
            for (i, row) in self.rows.iter().enumerate() {
                if i > 0 {
                    f.write_str(" +")?;
                }
                if let [literal] = row[..] {
                    self.fmt_literal(f, literal)?;
                } else {
                    f.write_str(" (")?;
                    for &literal in row {
                        self.fmt_literal(f, literal)?;
                    }
                    f.write_str(" )")?;
                }
            }
        }
        writeln!(f)
    }
}

/// Register with an initial value
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Latch {
    /// Next-state input
    pub input: String,
    /// Current-state output
    pub output: String,
    /// Value after reset
    pub init: bool,
}

/// A flattened circuit
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct Model {
    /// Model name
    pub name: String,
    /// Primary inputs in declaration order
    pub inputs: Vec<String>,
    /// Primary outputs in declaration order
    pub outputs: Vec<String>,
    /// Gates in declaration order
    pub gates: Vec<Gate>,
    /// Latches in declaration order
    pub latches: Vec<Latch>,
}

impl Model {
    /// Create an empty model
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model: {}", self.name)?;
        f.write_str("Input:")?;
        for input in &self.inputs {
            write!(f, " {input}")?;
        }
        f.write_str("\nOutput:")?;
        for output in &self.outputs {
            write!(f, " {output}")?;
        }
        writeln!(f)?;
        for gate in &self.gates {
            write!(f, "{gate}")?;
        }
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_gates() {
        let mut and = Gate::new("o", vec!["a".into(), "b".into()]);
        and.rows.push(vec![Literal::new(0, false), Literal::new(1, true)]);
        assert_eq!(and.to_string(), "Gate: o\no = a -b\n");

        let mut or = Gate::new("p", vec!["a".into(), "b".into(), "c".into()]);
        or.output.complemented = true;
        or.rows.push(vec![Literal::new(0, false)]);
        or.rows.push(vec![Literal::new(1, false), Literal::new(2, false)]);
        assert_eq!(or.to_string(), "Gate: p\n-p = a + ( b c )\n");

        assert_eq!(Gate::constant("k", true).to_string(), "Gate: k\nk = TRUE\n");
    }

    #[test]
    fn display_model() {
        let mut model = Model::new("m");
        model.inputs = vec!["a".into(), "b".into()];
        model.outputs = vec!["z".into()];
        model.gates.push(Gate::constant("z", false));
        assert_eq!(
            model.to_string(),
            "Model: m\nInput: a b\nOutput: z\nGate: z\nz = FALSE\n\n"
        );
    }
}
