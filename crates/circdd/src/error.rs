//! Error types

use thiserror::Error;

use circdd_core::{ConfigError, LevelNo, VarNo};

use crate::builder::State;

/// Misuse of the builder interface or a circuit that cannot be built
///
/// Internal consistency violations (e.g., a consumption count dropping below
/// zero) are not reported through this type, they panic.
#[derive(Error, Clone, PartialEq, Eq, Debug)]
pub enum BuildError {
    /// Invalid engine configuration, e.g., an unknown reorder heuristic
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The shared variable budget cannot hold the model's primary inputs
    #[error("the variable budget {budget} is smaller than the number of primary inputs ({inputs})")]
    BudgetTooSmall {
        /// Number of primary inputs
        inputs: VarNo,
        /// Requested budget
        budget: VarNo,
    },

    /// A signal that needs to be built is neither a primary input nor the
    /// output of a gate
    #[error("signal '{0}' is neither a primary input nor driven by a gate")]
    UndrivenSignal(String),

    /// Two gates drive the same signal
    #[error("signal '{0}' is driven by more than one gate")]
    MultipleDrivers(String),

    /// A gate depends on its own output
    #[error("combinational cycle through signal '{0}'")]
    CombinationalCycle(String),

    /// The operation is not available in the builder's current state
    #[error("cannot {operation} while the builder is {state}")]
    WrongState {
        /// Name of the operation
        operation: &'static str,
        /// State of the builder
        state: State,
    },

    /// The given order is not a permutation of all variables
    #[error("{order:?} is not a permutation of the variables 1..={num_vars}")]
    InvalidOrder {
        /// The rejected order
        order: Vec<VarNo>,
        /// Number of variables
        num_vars: VarNo,
    },

    /// A level (or level window) outside the variable order
    #[error("level {level} is out of range for {num_vars} variables")]
    InvalidLevel {
        /// The offending level
        level: LevelNo,
        /// Number of variables
        num_vars: VarNo,
    },

    /// The builders to unify do not share the same variable count
    #[error("cannot unify variable orders of different lengths ({0} and {1})")]
    VarCountMismatch(VarNo, VarNo),
}
