//! Gate synthesis and liveness-based reclamation

use bitvec::bitvec;
use bitvec::vec::BitVec;

use circdd_core::{Engine, VarNo};
use circdd_parser::Gate;

use crate::registry::Registry;

/// Current representation of every signal, indexed by variable number
///
/// Every entry holds one protection in the engine. Entries that are not built
/// yet or no longer needed hold the constant false function and are not
/// marked as built.
pub struct LiveTable<E: Engine> {
    entries: Vec<E::Edge>,
    built: BitVec,
}

impl<E: Engine> LiveTable<E> {
    /// Create a table with `len` entries, all set to false
    pub fn new(engine: &mut E, len: usize) -> Self {
        let f = engine.f();
        for _ in 0..len {
            engine.protect(f);
        }
        Self {
            entries: vec![f; len],
            built: bitvec![0; len],
        }
    }

    /// Whether `var` has been built and not flushed since
    #[inline]
    pub fn is_built(&self, var: VarNo) -> bool {
        self.built[var as usize]
    }

    /// Current representation of `var`
    ///
    /// Panics if `var` has not been built yet or has already been flushed.
    #[inline]
    pub fn get(&self, var: VarNo, registry: &Registry) -> E::Edge {
        assert!(
            self.is_built(var),
            "signal '{}' is read before it was built or after it was flushed",
            registry.name(var)
        );
        self.entries[var as usize]
    }

    fn replace(&mut self, engine: &mut E, var: VarNo, edge: E::Edge) {
        engine.protect(edge);
        let old = std::mem::replace(&mut self.entries[var as usize], edge);
        engine.unprotect(old);
    }

    /// Overwrite the entry of `var` with `edge` and mark it as built
    pub fn set(&mut self, engine: &mut E, var: VarNo, edge: E::Edge) {
        self.replace(engine, var, edge);
        self.built.set(var as usize, true);
    }

    /// Reset the entry of `var` to false
    #[inline]
    pub fn flush(&mut self, engine: &mut E, var: VarNo) {
        let f = engine.f();
        self.replace(engine, var, f);
        self.built.set(var as usize, false);
    }

    /// Drop all entries
    pub fn release(&mut self, engine: &mut E) {
        for edge in self.entries.drain(..) {
            engine.unprotect(edge);
        }
        self.built.clear();
    }
}

/// Build the function of `gate` from the live representations of its
/// operands
///
/// `operands[i]` is the variable number of `gate.inputs[i]`. Rows are
/// combined in declaration order, and so are the literals within a row.
///
/// Panics if an operand that occurs in a row is not built.
pub fn synthesize<E: Engine>(
    engine: &mut E,
    gate: &Gate,
    operands: &[VarNo],
    live: &LiveTable<E>,
    registry: &Registry,
) -> E::Edge {
    debug_assert_eq!(gate.inputs.len(), operands.len());
    let res = if gate.is_constant() {
        if gate.constant {
            engine.t()
        } else {
            engine.f()
        }
    } else {
        let mut acc = engine.f();
        for row in &gate.rows {
            let mut term = engine.t();
            for &literal in row {
                let mut edge = live.get(operands[literal.input()], registry);
                if literal.is_negative() {
                    edge = engine.not(edge);
                }
                term = engine.and(term, edge);
            }
            acc = engine.or(acc, term);
        }
        acc
    };

    if gate.output.complemented {
        engine.not(res)
    } else {
        res
    }
}

/// Release one consumption of each operand of a just synthesized gate
///
/// An operand whose count drops to zero is flushed from the live table.
/// Panics if a count would become negative.
pub fn reclaim<E: Engine>(
    engine: &mut E,
    live: &mut LiveTable<E>,
    counts: &mut [u32],
    operands: &[VarNo],
    registry: &Registry,
) {
    for &var in operands {
        let count = &mut counts[var as usize];
        assert!(
            *count > 0,
            "consumption count of signal '{}' would become negative",
            registry.name(var)
        );
        *count -= 1;
        if *count == 0 {
            live.flush(engine, var);
        }
    }
}
