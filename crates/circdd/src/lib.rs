//! Dependency-scheduled construction of decision diagrams for flattened
//! circuits, with variable order optimization
//!
//! A [`ModelBuilder`] takes a [`Model`] as read by [`circdd_parser`] and builds
//! the function of every declared output in an [`Engine`]:
//!
//! 1. [`registry::register_all()`] numbers all signals. Only primary inputs
//!    become engine variables.
//! 2. [`schedule::schedule()`] orders the gates the outputs depend on such that
//!    operands come first, and counts how often each signal is consumed.
//! 3. [`synth::synthesize()`] builds one gate from its operands. Afterwards,
//!    [`synth::reclaim()`] releases operands without pending consumers.
//! 4. Whenever the node count passes a threshold, the whole variable order is
//!    optimized.
//!
//! After building, the order can be optimized further, set explicitly or
//! unified with the order of another builder (see [`unify`]).
//!
//! ## Example
//!
//! ```
//! use circdd::ModelBuilder;
//! use circdd_parser::{Gate, Literal, Model};
//!
//! let mut model = Model::new("and2");
//! model.inputs = vec!["a".into(), "b".into()];
//! model.outputs = vec!["o".into()];
//! let mut gate = Gate::new("o", vec!["a".into(), "b".into()]);
//! gate.rows.push(vec![Literal::new(0, false), Literal::new(1, false)]);
//! model.gates.push(gate);
//!
//! let mut builder = ModelBuilder::new(&model)?;
//! builder.initialize("LARC")?;
//! builder.build_model()?;
//! builder.optimize()?;
//! let stats = builder.output_status()?;
//! assert_eq!(stats.total_nodes, 2);
//! builder.release();
//! # Ok::<(), circdd::BuildError>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use circdd_core::util::{seeded_rng, Rng};
pub use circdd_core::{Engine, LevelNo, NodeStats, ReorderPolicy, ReorderStats, VarNo};
pub use circdd_forest::{Forest, ForestConfig};
pub use circdd_parser::Model;

mod builder;
mod error;
pub mod order;
pub mod registry;
pub mod schedule;
pub mod synth;
pub mod unify;

pub use builder::{BuilderConfig, ModelBuilder, ReorderStrategy, State, DEFAULT_SIZE_THRESHOLD};
pub use error::BuildError;
pub use unify::{gradual_unify_orders, unify_orders, UnifyStats};
