//! The model builder and its lifecycle

use std::fmt;
use std::ops::RangeInclusive;
use std::time::Instant;

use rustc_hash::FxHashSet;

use circdd_core::util::Rng;
use circdd_core::{is_total_order, Engine, LevelNo, NodeStats, ReorderPolicy, ReorderStats, VarNo};
use circdd_forest::Forest;
use circdd_parser::Model;

use crate::registry::{register_all, Registry};
use crate::schedule::{schedule, Schedule, Step};
use crate::synth::{reclaim, synthesize, LiveTable};
use crate::{order, BuildError};

/// Initial node count above which synthesis pauses to reorder
pub const DEFAULT_SIZE_THRESHOLD: usize = 100_000;

/// How [`ModelBuilder::reorder()`] and [`ModelBuilder::swap_adjacent()`] are
/// carried out
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum ReorderStrategy {
    /// Permute the levels of the existing engine by adjacent swaps
    #[default]
    InPlace,
    /// Create a fresh engine with the target order and rebuild the outputs in
    /// it
    Rebuild,
}

/// Lifecycle state of a [`ModelBuilder`]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum State {
    /// No engine yet, the variable budget may still change
    Unconfigured,
    /// Signals are numbered and the engine exists
    Registered,
    /// The synthesis order is known
    Scheduled,
    /// Gates are being synthesized
    Synthesizing,
    /// Output functions are recorded
    Captured,
    /// The engine and every function in it are gone
    Released,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            State::Unconfigured => "unconfigured",
            State::Registered => "registered",
            State::Scheduled => "scheduled",
            State::Synthesizing => "synthesizing",
            State::Captured => "captured",
            State::Released => "released",
        })
    }
}

/// Configuration of a [`ModelBuilder`]
#[derive(Clone, Debug)]
pub struct BuilderConfig<C> {
    /// How to carry out explicit reorders
    pub strategy: ReorderStrategy,
    /// Initial node count that triggers a reorder pass during synthesis
    pub size_threshold: usize,
    /// Engine configuration
    pub engine: C,
}

impl<C: Default> Default for BuilderConfig<C> {
    fn default() -> Self {
        Self {
            strategy: ReorderStrategy::default(),
            size_threshold: DEFAULT_SIZE_THRESHOLD,
            engine: C::default(),
        }
    }
}

/// Builds the output functions of a [`Model`] in an [`Engine`] and optimizes
/// their variable order
///
/// Typical usage: [`Self::set_num_vars()`] to align several models,
/// [`Self::initialize()`] with a reorder heuristic, [`Self::build_model()`],
/// then any number of [`Self::optimize()`] or [`Self::reorder()`] calls and
/// finally [`Self::release()`].
pub struct ModelBuilder<'m, E: Engine = Forest> {
    model: &'m Model,
    registry: Registry,
    config: BuilderConfig<E::Config>,
    state: State,
    engine: Option<E>,
    schedule: Option<Schedule>,
    /// Declared outputs (without duplicates), each protected once
    outputs: Vec<(String, E::Edge)>,
    limit: usize,
}

impl<'m> ModelBuilder<'m> {
    /// Create a builder using a [`Forest`] with the default configuration
    ///
    /// The variable budget is the number of primary inputs of `model`.
    pub fn new(model: &'m Model) -> Result<Self, BuildError> {
        Self::with_config(model, BuilderConfig::default())
    }
}

impl<'m, E: Engine> ModelBuilder<'m, E> {
    /// Create a builder for `model`
    ///
    /// Fails if a signal of `model` is driven by several gates.
    pub fn with_config(model: &'m Model, config: BuilderConfig<E::Config>) -> Result<Self, BuildError> {
        let registry = register_all(model, model.inputs.len() as VarNo)?;
        Ok(Self {
            model,
            registry,
            limit: config.size_threshold,
            config,
            state: State::Unconfigured,
            engine: None,
            schedule: None,
            outputs: Vec::new(),
        })
    }

    fn wrong_state(&self, operation: &'static str) -> BuildError {
        BuildError::WrongState {
            operation,
            state: self.state,
        }
    }

    fn expect_state(&self, state: State, operation: &'static str) -> Result<(), BuildError> {
        if self.state == state {
            Ok(())
        } else {
            Err(self.wrong_state(operation))
        }
    }

    fn engine_for(&mut self, operation: &'static str) -> Result<&mut E, BuildError> {
        match self.engine.as_mut() {
            Some(engine) => Ok(engine),
            None => Err(BuildError::WrongState {
                operation,
                state: self.state,
            }),
        }
    }

    /// The model
    #[inline]
    pub fn model(&self) -> &'m Model {
        self.model
    }

    /// Name of the model
    #[inline]
    pub fn name(&self) -> &str {
        &self.model.name
    }

    /// The signal registry
    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Current lifecycle state
    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    /// The engine, if initialized and not released
    #[inline]
    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    /// Mutable access to the engine, if initialized and not released
    #[inline]
    pub fn engine_mut(&mut self) -> Option<&mut E> {
        self.engine.as_mut()
    }

    /// The synthesis order and the remaining consumption counts, available
    /// after [`Self::build_model()`]
    #[inline]
    pub fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_ref()
    }

    /// Node count that triggers the next reorder pass during synthesis
    #[inline]
    pub fn size_limit(&self) -> usize {
        self.limit
    }

    /// Set the variable budget
    ///
    /// Several models built with the same budget have the same variable
    /// count, which is required to unify their orders. Only possible before
    /// [`Self::initialize()`].
    pub fn set_num_vars(&mut self, num_vars: VarNo) -> Result<(), BuildError> {
        self.expect_state(State::Unconfigured, "change the variable budget")?;
        self.registry = register_all(self.model, num_vars)?;
        Ok(())
    }

    /// Number of engine variables (the budget)
    #[inline]
    pub fn num_vars(&self) -> VarNo {
        self.registry.budget()
    }

    /// Number of primary inputs
    #[inline]
    pub fn actual_num_vars(&self) -> VarNo {
        self.model.inputs.len() as VarNo
    }

    /// Number of named signals
    #[inline]
    pub fn num_signals(&self) -> usize {
        self.registry.num_signals()
    }

    /// Create the engine with the reorder heuristic named `heuristic`
    ///
    /// See [`ReorderPolicy`] for the recognized names.
    pub fn initialize(&mut self, heuristic: &str) -> Result<(), BuildError> {
        self.expect_state(State::Unconfigured, "initialize")?;
        let policy: ReorderPolicy = heuristic.parse()?;
        self.initialize_with_policy(policy)
    }

    /// Create the engine with the given reorder heuristic
    pub fn initialize_with_policy(&mut self, policy: ReorderPolicy) -> Result<(), BuildError> {
        self.expect_state(State::Unconfigured, "initialize")?;
        let num_vars = self.num_vars();
        self.engine = Some(E::new(num_vars, policy, &self.config.engine));
        self.limit = self.config.size_threshold;
        self.state = State::Registered;
        log::debug!(
            "initialized {} with {num_vars} variables, heuristic {policy}",
            self.model.name
        );
        Ok(())
    }

    /// [`Self::initialize()`] with the default heuristic followed by
    /// [`Self::build_model()`]
    pub fn build(&mut self) -> Result<(), BuildError> {
        self.initialize_with_policy(ReorderPolicy::default())?;
        self.build_model()
    }

    /// Synthesize the declared outputs
    ///
    /// Gates are built in dependency order. An intermediate result is released
    /// as soon as its last consumer is built. Whenever the node count exceeds
    /// the size limit, the whole order is optimized and the limit is set to
    /// twice the resulting node count.
    pub fn build_model(&mut self) -> Result<(), BuildError> {
        self.expect_state(State::Registered, "build the model")?;
        let mut schedule = schedule(self.model, &self.registry)?;
        self.state = State::Scheduled;

        let model = self.model;
        let registry = &self.registry;
        let Some(engine) = self.engine.as_mut() else {
            return Err(BuildError::WrongState {
                operation: "build the model",
                state: self.state,
            });
        };
        self.state = State::Synthesizing;
        let start = Instant::now();

        let mut live = LiveTable::new(engine, registry.table_len());
        for &step in &schedule.order {
            match step {
                Step::Leaf(var) => {
                    log::debug!("building input {}", registry.name(var));
                    let edge = engine.var(var);
                    live.set(engine, var, edge);
                }
                Step::Gate { var, gate } => {
                    log::debug!("building gate {}", registry.name(var));
                    let operands = registry.operands(gate);
                    let edge = synthesize(engine, &model.gates[gate], operands, &live, registry);
                    reclaim(engine, &mut live, &mut schedule.counts, operands, registry);
                    live.set(engine, var, edge);
                }
            }

            if engine.num_nodes() > self.limit {
                engine.clear_cache();
                if engine.num_nodes() > self.limit {
                    if let Some(levels) = all_levels(engine.num_vars()) {
                        reduce(engine, levels);
                    }
                    self.limit = 2 * engine.num_nodes();
                    log::debug!("size limit is now {}", self.limit);
                }
            }
        }

        let mut seen = FxHashSet::default();
        let mut outputs = Vec::with_capacity(model.outputs.len());
        for name in &model.outputs {
            if !seen.insert(name.as_str()) {
                continue;
            }
            let edge = live.get(registry.var(name), registry);
            engine.protect(edge);
            outputs.push((name.clone(), edge));
        }
        live.release(engine);

        log::info!(
            "built {} ({} steps) in {:?}: {} nodes",
            model.name,
            schedule.order.len(),
            start.elapsed(),
            engine.num_nodes()
        );
        self.outputs = outputs;
        self.schedule = Some(schedule);
        self.state = State::Captured;
        Ok(())
    }

    /// Reduce the node count by reordering all variables
    pub fn optimize(&mut self) -> Result<ReorderStats, BuildError> {
        let engine = self.engine_for("optimize")?;
        match all_levels(engine.num_vars()) {
            Some(levels) => Ok(reduce(engine, levels)),
            None => Ok(ReorderStats::default()),
        }
    }

    /// Reduce the node count by reordering the variables in levels
    /// `top..=bottom`
    pub fn optimize_window(&mut self, top: LevelNo, bottom: LevelNo) -> Result<ReorderStats, BuildError> {
        let engine = self.engine_for("optimize")?;
        let num_vars = engine.num_vars();
        if bottom >= num_vars || top > bottom {
            let level = if top > bottom { top } else { bottom };
            return Err(BuildError::InvalidLevel { level, num_vars });
        }
        Ok(reduce(engine, top..=bottom))
    }

    /// Current variable order, `order[i]` being the variable at level `i`
    pub fn get_variable_order(&self) -> Result<Vec<VarNo>, BuildError> {
        match &self.engine {
            Some(engine) => Ok(engine.var_order().to_vec()),
            None => Err(self.wrong_state("read the variable order")),
        }
    }

    /// Establish `order`, a permutation of `1..=num_vars()` listing the
    /// variables from the top level down
    ///
    /// Nothing happens if `order` is the current order.
    pub fn reorder(&mut self, order: &[VarNo]) -> Result<(), BuildError> {
        let num_vars = self.num_vars();
        if !is_total_order(order, num_vars) {
            return Err(BuildError::InvalidOrder {
                order: order.to_vec(),
                num_vars,
            });
        }
        let strategy = self.config.strategy;
        let engine = self.engine_for("reorder")?;
        if engine.var_order() == order {
            return Ok(());
        }

        let start = Instant::now();
        match strategy {
            ReorderStrategy::InPlace => engine.set_var_order(order),
            ReorderStrategy::Rebuild => self.rebuild(order)?,
        }
        log::info!(
            "reordered {} in {:?}: {} nodes",
            self.model.name,
            start.elapsed(),
            self.num_nodes()?
        );
        Ok(())
    }

    fn rebuild(&mut self, order: &[VarNo]) -> Result<(), BuildError> {
        let mut roots: Vec<E::Edge> = self.outputs.iter().map(|&(_, edge)| edge).collect();
        self.engine_for("rebuild")?.rebuild(order, &mut roots);
        for ((_, edge), root) in self.outputs.iter_mut().zip(roots) {
            *edge = root;
        }
        Ok(())
    }

    /// Swap the variables at `level` and `level + 1`
    pub fn swap_adjacent(&mut self, level: LevelNo) -> Result<(), BuildError> {
        let strategy = self.config.strategy;
        let engine = self.engine_for("swap variables")?;
        let num_vars = engine.num_vars();
        if level + 1 >= num_vars {
            return Err(BuildError::InvalidLevel { level, num_vars });
        }
        match strategy {
            ReorderStrategy::InPlace => engine.swap_adjacent(level),
            ReorderStrategy::Rebuild => {
                let mut order = engine.var_order().to_vec();
                order.swap(level as usize, level as usize + 1);
                self.rebuild(&order)?;
            }
        }
        log::trace!("swapped levels {level} and {}", level + 1);
        Ok(())
    }

    /// Current number of nodes (possibly including unreclaimed garbage)
    pub fn num_nodes(&self) -> Result<usize, BuildError> {
        match &self.engine {
            Some(engine) => Ok(engine.num_nodes()),
            None => Err(self.wrong_state("count nodes")),
        }
    }

    /// Reset the peak node count
    pub fn reset_stat(&mut self) -> Result<(), BuildError> {
        self.engine_for("reset statistics")?.reset_peak();
        Ok(())
    }

    /// Drop the engine's caches and report the peak and current node count
    pub fn output_status(&mut self) -> Result<NodeStats, BuildError> {
        let engine = self.engine_for("report the status")?;
        engine.clear_cache();
        let stats = engine.stats();
        log::debug!(
            "{}: peak {}, total {} nodes",
            self.model.name,
            stats.peak_nodes,
            stats.total_nodes
        );
        Ok(stats)
    }

    /// The output functions in declaration order, available after
    /// [`Self::build_model()`]
    #[inline]
    pub fn outputs(&self) -> &[(String, E::Edge)] {
        &self.outputs
    }

    /// The function of output `name`
    pub fn output(&self, name: &str) -> Option<E::Edge> {
        self.outputs
            .iter()
            .find(|(output, _)| output == name)
            .map(|&(_, edge)| edge)
    }

    /// Drop the engine together with all functions
    pub fn release(&mut self) {
        self.outputs.clear();
        self.engine = None;
        self.state = State::Released;
        log::debug!("released {}", self.model.name);
    }

    /// Structural order placing the inputs of deep logic cones first, see
    /// [`order::depth_order()`]
    pub fn depth_order(&self) -> Vec<VarNo> {
        order::depth_order(self.model, &self.registry)
    }

    /// Randomized depth-first order, see [`order::dfs_order()`]
    pub fn dfs_order(&self, rng: &mut Rng) -> Vec<VarNo> {
        order::dfs_order(self.model, &self.registry, rng)
    }
}

fn all_levels(num_vars: VarNo) -> Option<RangeInclusive<LevelNo>> {
    (num_vars > 0).then(|| 0..=num_vars - 1)
}

/// Run the engine's window reduction, checking that it does not grow
fn reduce<E: Engine>(engine: &mut E, levels: RangeInclusive<LevelNo>) -> ReorderStats {
    engine.clear_cache();
    let before = engine.num_nodes();
    let start = Instant::now();
    let stats = engine.reduce_window(levels.clone());
    let after = engine.num_nodes();
    assert!(
        after <= before,
        "reordering levels {levels:?} increased the node count from {before} to {after}"
    );
    log::info!(
        "optimized levels {}..={}: {before} -> {after} nodes in {:?}",
        levels.start(),
        levels.end(),
        start.elapsed()
    );
    stats
}

#[cfg(test)]
mod tests {
    use circdd_core::ConfigError;
    use circdd_parser::Gate;

    use super::*;

    fn model() -> Model {
        let mut model = Model::new("m");
        model.inputs = vec!["a".into(), "b".into()];
        model.outputs = vec!["o".into()];
        let mut gate = Gate::new("o", vec!["a".into(), "b".into()]);
        gate.rows.push(vec![
            circdd_parser::Literal::new(0, false),
            circdd_parser::Literal::new(1, false),
        ]);
        model.gates.push(gate);
        model
    }

    #[test]
    fn lifecycle() {
        let model = model();
        let mut builder = ModelBuilder::new(&model).unwrap();
        assert_eq!(builder.state(), State::Unconfigured);
        assert_eq!(builder.num_vars(), 2);
        assert_eq!(builder.actual_num_vars(), 2);
        assert_eq!(builder.num_signals(), 3);
        assert!(matches!(
            builder.build_model(),
            Err(BuildError::WrongState {
                state: State::Unconfigured,
                ..
            })
        ));
        assert!(builder.get_variable_order().is_err());

        builder.set_num_vars(4).unwrap();
        assert_eq!(builder.registry().var("o"), 5);
        builder.initialize("LM").unwrap();
        assert_eq!(builder.state(), State::Registered);
        assert_eq!(builder.engine().unwrap().policy(), ReorderPolicy::LowestMemory);
        assert!(builder.set_num_vars(5).is_err());
        assert!(builder.initialize("LI").is_err());

        builder.build_model().unwrap();
        assert_eq!(builder.state(), State::Captured);
        assert_eq!(builder.get_variable_order().unwrap().len(), 4);
        assert!(builder.output("o").is_some());
        assert!(builder.build_model().is_err());

        builder.release();
        assert_eq!(builder.state(), State::Released);
        assert!(builder.outputs().is_empty());
        assert!(builder.output_status().is_err());
    }

    #[test]
    fn configuration_errors() {
        let model = model();
        let mut builder = ModelBuilder::new(&model).unwrap();
        assert_eq!(
            builder.set_num_vars(1).unwrap_err(),
            BuildError::BudgetTooSmall {
                inputs: 2,
                budget: 1
            }
        );
        assert_eq!(
            builder.initialize("FOO").unwrap_err(),
            BuildError::Config(ConfigError::UnknownHeuristic("FOO".into()))
        );
        assert_eq!(builder.state(), State::Unconfigured);

        builder.build().unwrap();
        assert!(matches!(
            builder.reorder(&[1, 1]),
            Err(BuildError::InvalidOrder { .. })
        ));
        assert_eq!(
            builder.swap_adjacent(1).unwrap_err(),
            BuildError::InvalidLevel {
                level: 1,
                num_vars: 2
            }
        );
        assert!(builder.optimize_window(1, 0).is_err());
        assert!(builder.optimize_window(0, 2).is_err());
    }

    #[test]
    fn state_names() {
        assert_eq!(State::Captured.to_string(), "captured");
        let err = BuildError::WrongState {
            operation: "reorder",
            state: State::Released,
        };
        assert_eq!(err.to_string(), "cannot reorder while the builder is released");
    }
}
