//! Structural initial-order heuristics
//!
//! Both heuristics walk the gates backwards from the declared outputs and
//! place primary inputs in the order they are reached, so inputs feeding the
//! same logic end up close together. The resulting order lists variables from
//! the top level down and covers all of `1..=budget`: inputs not reached from
//! any output gate and reserved variables are appended in increasing order.

use bitvec::bitvec;
use bitvec::vec::BitVec;
use rustc_hash::FxHashSet;

use circdd_core::util::{Rng, RngExt};
use circdd_core::VarNo;
use circdd_parser::Model;

use crate::registry::Registry;

struct Placement<'a> {
    registry: &'a Registry,
    order: Vec<VarNo>,
    placed: BitVec,
}

impl<'a> Placement<'a> {
    fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            order: Vec::with_capacity(registry.budget() as usize),
            placed: bitvec![0; registry.budget() as usize + 1],
        }
    }

    fn place(&mut self, var: VarNo) {
        if self.registry.is_input(var) && !self.placed[var as usize] {
            self.placed.set(var as usize, true);
            self.order.push(var);
        }
    }

    fn finish(mut self) -> Vec<VarNo> {
        for var in 1..=self.registry.budget() {
            if !self.placed[var as usize] {
                self.order.push(var);
            }
        }
        self.order
    }
}

/// Gates driving the declared outputs, without duplicates
fn output_gates(model: &Model, registry: &Registry) -> Vec<usize> {
    let mut seen = FxHashSet::default();
    model
        .outputs
        .iter()
        .filter_map(|name| registry.driver(registry.get(name)?))
        .filter(|&gate| seen.insert(gate))
        .collect()
}

/// Length of the longest path from each gate to a primary input, indexed by
/// gate
///
/// A gate whose operands are all inputs has depth 1.
pub fn fanin_depths(model: &Model, registry: &Registry) -> Vec<u32> {
    let n = model.gates.len();
    let mut depths: Vec<Option<u32>> = vec![None; n];
    let mut on_stack = bitvec![0; n];

    for root in 0..n {
        if depths[root].is_some() {
            continue;
        }
        let mut stack = vec![(root, 0usize)];
        on_stack.set(root, true);
        while let Some((gate, next)) = stack.last_mut() {
            let gate = *gate;
            let operands = registry.operands(gate);
            if *next < operands.len() {
                let var = operands[*next];
                *next += 1;
                if let Some(operand) = registry.driver(var) {
                    // a gate on the stack closes a cycle, skip it
                    if depths[operand].is_none() && !on_stack[operand] {
                        on_stack.set(operand, true);
                        stack.push((operand, 0));
                    }
                }
                continue;
            }

            stack.pop();
            on_stack.set(gate, false);
            let deepest = operands
                .iter()
                .filter_map(|&var| registry.driver(var))
                .map(|operand| depths[operand].unwrap_or(0))
                .max()
                .unwrap_or(0);
            depths[gate] = Some(deepest + 1);
        }
    }

    depths.into_iter().map(|d| d.unwrap_or(0)).collect()
}

/// Order the inputs by repeatedly expanding the deepest pending gate
///
/// The worklist starts with the output gates. Each expanded gate places its
/// unplaced input operands and adds its unexpanded gate operands to the
/// worklist. Among gates of equal depth, the one declared first is expanded
/// first.
pub fn depth_order(model: &Model, registry: &Registry) -> Vec<VarNo> {
    let depths = fanin_depths(model, registry);
    let sort = |worklist: &mut Vec<usize>| {
        // deepest last, ties broken towards the lower gate index
        worklist.sort_unstable_by(|&a, &b| depths[a].cmp(&depths[b]).then(b.cmp(&a)));
        worklist.dedup();
    };

    let mut placement = Placement::new(registry);
    let mut expanded = bitvec![0; model.gates.len()];
    let mut worklist = output_gates(model, registry);
    sort(&mut worklist);

    while let Some(gate) = worklist.pop() {
        if expanded[gate] {
            continue;
        }
        expanded.set(gate, true);
        for &var in registry.operands(gate) {
            match registry.driver(var) {
                Some(operand) if !expanded[operand] => worklist.push(operand),
                Some(_) => {}
                None => placement.place(var),
            }
        }
        sort(&mut worklist);
    }

    placement.finish()
}

/// Randomized depth-first order
///
/// Starts from the output gates in random order and visits each gate's
/// operands in random order. `rng` is the only source of randomness, so the
/// result is reproducible for a fixed seed.
pub fn dfs_order(model: &Model, registry: &Registry, rng: &mut Rng) -> Vec<VarNo> {
    let mut placement = Placement::new(registry);
    let mut visited = bitvec![0; model.gates.len()];
    let mut stack = output_gates(model, registry);
    rng.shuffle(&mut stack);

    let mut operands = Vec::new();
    while let Some(gate) = stack.pop() {
        if visited[gate] {
            continue;
        }
        visited.set(gate, true);
        operands.clear();
        operands.extend_from_slice(registry.operands(gate));
        rng.shuffle(&mut operands);
        for &var in &operands {
            match registry.driver(var) {
                Some(operand) if !visited[operand] => stack.push(operand),
                Some(_) => {}
                None => placement.place(var),
            }
        }
    }

    placement.finish()
}
