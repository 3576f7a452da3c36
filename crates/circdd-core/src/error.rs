//! Error types

use thiserror::Error;

/// Misuse of the configuration interface
#[derive(Error, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ConfigError {
    /// The reorder heuristic name is not known
    #[error("unknown reorder heuristic '{0}'")]
    UnknownHeuristic(String),
}
