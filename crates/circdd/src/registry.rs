//! Signal registry: a stable variable number for every named signal

use rustc_hash::FxHashMap;

use circdd_core::VarNo;
use circdd_parser::Model;

use crate::BuildError;

/// Mapping from signal names to variable numbers
///
/// Primary inputs are numbered `1..=k` in declaration order. These are the
/// only signals that become engine variables. All other signals (gate
/// operands and outputs, latch terminals) are numbered from `budget + 1`
/// onwards in the order they are first seen when walking over the gates and
/// then the latches. Numbers `k + 1..=budget` are reserved to align the
/// variable count of several models and name no signal.
///
/// The registry also resolves the gates' operand and output names, so later
/// phases work on numbers only.
#[derive(Clone, Debug)]
pub struct Registry {
    vars: FxHashMap<String, VarNo>,
    /// Indexed by variable number, empty for number 0 and reserved numbers
    names: Vec<String>,
    num_inputs: VarNo,
    budget: VarNo,
    /// Gate driving each signal, indexed by variable number
    drivers: Vec<Option<usize>>,
    gate_operands: Vec<Vec<VarNo>>,
    gate_outputs: Vec<VarNo>,
}

/// Assign every signal of `model` a variable number
///
/// `budget` is the number of engine variables, see [`Registry`]. Fails if the
/// model has more primary inputs than `budget`, or if a signal is driven by
/// more than one gate.
pub fn register_all(model: &Model, budget: VarNo) -> Result<Registry, BuildError> {
    let num_inputs = model.inputs.len() as VarNo;
    if num_inputs > budget {
        return Err(BuildError::BudgetTooSmall {
            inputs: num_inputs,
            budget,
        });
    }

    let mut registry = Registry {
        vars: FxHashMap::default(),
        names: vec![String::new()],
        num_inputs: 0,
        budget,
        drivers: vec![None],
        gate_operands: Vec::with_capacity(model.gates.len()),
        gate_outputs: Vec::with_capacity(model.gates.len()),
    };
    for input in &model.inputs {
        registry.insert(input);
    }
    registry.num_inputs = registry.names.len() as VarNo - 1;
    registry.names.resize(budget as usize + 1, String::new());
    registry.drivers.resize(budget as usize + 1, None);

    for (i, gate) in model.gates.iter().enumerate() {
        let operands = gate.inputs.iter().map(|name| registry.insert(name)).collect();
        let output = registry.insert(gate.name());
        if registry.drivers[output as usize].replace(i).is_some() {
            return Err(BuildError::MultipleDrivers(gate.name().to_string()));
        }
        registry.gate_operands.push(operands);
        registry.gate_outputs.push(output);
    }
    for latch in &model.latches {
        registry.insert(&latch.input);
        registry.insert(&latch.output);
    }

    Ok(registry)
}

impl Registry {
    fn insert(&mut self, name: &str) -> VarNo {
        if let Some(&var) = self.vars.get(name) {
            return var;
        }
        let var = self.names.len() as VarNo;
        self.vars.insert(name.to_string(), var);
        self.names.push(name.to_string());
        self.drivers.push(None);
        var
    }

    /// Variable number of `name`
    ///
    /// Panics if `name` is not a signal of the model.
    #[track_caller]
    pub fn var(&self, name: &str) -> VarNo {
        match self.vars.get(name) {
            Some(&var) => var,
            None => panic!("signal '{name}' is not registered"),
        }
    }

    /// Variable number of `name`, if registered
    #[inline]
    pub fn get(&self, name: &str) -> Option<VarNo> {
        self.vars.get(name).copied()
    }

    /// Name of the signal numbered `var`
    #[inline]
    pub fn name(&self, var: VarNo) -> &str {
        &self.names[var as usize]
    }

    /// Number of primary inputs
    #[inline]
    pub fn num_inputs(&self) -> VarNo {
        self.num_inputs
    }

    /// Number of engine variables
    #[inline]
    pub fn budget(&self) -> VarNo {
        self.budget
    }

    /// Number of registered signals
    #[inline]
    pub fn num_signals(&self) -> usize {
        self.vars.len()
    }

    /// One more than the largest variable number, i.e. the size of tables
    /// indexed by variable number
    #[inline]
    pub fn table_len(&self) -> usize {
        self.names.len()
    }

    /// Whether `var` is a primary input
    #[inline]
    pub fn is_input(&self, var: VarNo) -> bool {
        var >= 1 && var <= self.num_inputs
    }

    /// Index of the gate driving `var`
    #[inline]
    pub fn driver(&self, var: VarNo) -> Option<usize> {
        self.drivers[var as usize]
    }

    /// Operand variables of gate `gate`, in declaration order
    #[inline]
    pub fn operands(&self, gate: usize) -> &[VarNo] {
        &self.gate_operands[gate]
    }

    /// Output variable of gate `gate`
    #[inline]
    pub fn gate_output(&self, gate: usize) -> VarNo {
        self.gate_outputs[gate]
    }
}
