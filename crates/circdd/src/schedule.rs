//! Dependency scheduling of the synthesis steps

use bitvec::bitvec;
use bitvec::vec::BitVec;

use circdd_core::VarNo;
use circdd_parser::Model;

use crate::registry::Registry;
use crate::BuildError;

/// One entry of the synthesis order
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Step {
    /// Build the primary input with the given variable number
    Leaf(VarNo),
    /// Synthesize `gate` (an index into [`Model::gates`]) whose output is
    /// `var`
    Gate {
        /// Output variable
        var: VarNo,
        /// Gate index
        gate: usize,
    },
}

impl Step {
    /// The variable this step produces
    #[inline]
    pub fn var(self) -> VarNo {
        match self {
            Step::Leaf(var) | Step::Gate { var, .. } => var,
        }
    }
}

/// Synthesis order together with the consumption counts
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Schedule {
    /// Every step comes after the steps producing its operands
    pub order: Vec<Step>,
    /// Number of pending consumers, indexed by variable number
    ///
    /// A declared output counts as one consumer that never goes away, so its
    /// representation is retained until capture.
    pub counts: Vec<u32>,
}

/// Compute the synthesis order and the consumption counts for the declared
/// outputs of `model`
///
/// Gates that no output depends on are not scheduled. Each scheduled signal
/// occurs exactly once in the order, no matter how many gates consume it.
pub fn schedule(model: &Model, registry: &Registry) -> Result<Schedule, BuildError> {
    let mut schedule = Schedule {
        order: Vec::with_capacity(registry.num_signals()),
        counts: vec![0; registry.table_len()],
    };
    let mut expanding = bitvec![0; model.gates.len()];

    for output in &model.outputs {
        let Some(var) = registry.get(output) else {
            return Err(BuildError::UndrivenSignal(output.clone()));
        };
        if schedule.counts[var as usize] > 0 {
            schedule.counts[var as usize] += 1;
            continue;
        }
        match registry.driver(var) {
            Some(gate) => schedule.expand(registry, gate, &mut expanding)?,
            None if registry.is_input(var) => schedule.leaf(var),
            None => return Err(BuildError::UndrivenSignal(output.clone())),
        }
    }

    log::debug!(
        "scheduled {} of {} signals",
        schedule.order.len(),
        registry.num_signals()
    );
    Ok(schedule)
}

impl Schedule {
    fn leaf(&mut self, var: VarNo) {
        self.order.push(Step::Leaf(var));
        self.counts[var as usize] = 1;
    }

    /// Schedule `root` after all of its not yet scheduled operands
    fn expand(
        &mut self,
        registry: &Registry,
        root: usize,
        expanding: &mut BitVec,
    ) -> Result<(), BuildError> {
        // (gate, index of the next operand to visit)
        let mut stack = vec![(root, 0usize)];
        expanding.set(root, true);

        while let Some((gate, next)) = stack.last_mut() {
            let gate = *gate;
            let operands = registry.operands(gate);
            if *next == operands.len() {
                stack.pop();
                expanding.set(gate, false);
                let var = registry.gate_output(gate);
                self.order.push(Step::Gate { var, gate });
                self.counts[var as usize] += 1;
                continue;
            }
            let var = operands[*next];
            *next += 1;

            if self.counts[var as usize] > 0 {
                self.counts[var as usize] += 1;
                continue;
            }
            match registry.driver(var) {
                Some(operand) => {
                    if expanding[operand] {
                        let name = registry.name(var).to_string();
                        return Err(BuildError::CombinationalCycle(name));
                    }
                    expanding.set(operand, true);
                    stack.push((operand, 0));
                }
                None if registry.is_input(var) => self.leaf(var),
                None => {
                    let name = registry.name(var).to_string();
                    return Err(BuildError::UndrivenSignal(name));
                }
            }
        }
        Ok(())
    }
}
