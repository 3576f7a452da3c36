//! BDD forest on top of OxiDD
//!
//! [`Forest`] is the [`Engine`] implementation used by the circdd builder. The
//! diagrams themselves live in an [`oxidd::bdd`] manager; this crate adds the
//! handle table the builder works with, peak tracking, and the reordering
//! layer (policy-driven permutation, window sifting and rebuilding) on top of
//! [`oxidd_reorder::level_down()`].
//!
//! An [`Edge`] is a `Copy` index into the handle table. Equal functions share
//! a slot, so handle equality is function equality. Slot 0 holds the constant
//! false, slot 1 the constant true.
//!
//! Our variable `v` is OxiDD variable `num_vars - v`. A fresh manager places
//! its variables in increasing order from the top, hence variable 1 starts at
//! the bottom-most level.

#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

use std::ops::RangeInclusive;

use oxidd::bdd::{BDDFunction, BDDManagerRef};
use oxidd::util::AllocResult;
use oxidd::{BooleanFunction, Function, Manager, ManagerRef};
use oxidd_core::{HasLevel, Node};
use rustc_hash::{FxHashMap, FxHashSet};

use circdd_core::util::{seeded_rng, Rng};
use circdd_core::{is_total_order, Engine, LevelNo, ReorderPolicy, ReorderStats, VarNo};

mod rebuild;
mod reorder;

const FALSE: u32 = 0;
const TRUE: u32 = 1;

/// Handle to a function in a [`Forest`]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Edge(u32);

impl Edge {
    /// Whether this is one of the two constants
    #[inline]
    pub fn is_terminal(self) -> bool {
        self.0 <= TRUE
    }
}

/// Configuration of a [`Forest`]
#[derive(Clone, Debug)]
pub struct ForestConfig {
    /// Seed for randomized reorder decisions
    pub seed: u64,
    /// Sifting stops moving a variable in one direction once the node count
    /// exceeds the best count seen so far by this factor
    pub max_growth: f64,
    /// Number of inner nodes the manager reserves (address) space for
    ///
    /// The index-based manager cannot grow beyond this.
    pub inner_node_capacity: usize,
    /// Capacity of the apply cache in entries (lower bound)
    pub apply_cache_capacity: usize,
    /// Number of threads for concurrent operations
    pub threads: u32,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_growth: 1.2,
            inner_node_capacity: 1 << 24,
            apply_cache_capacity: 1 << 16,
            threads: 1,
        }
    }
}

/// Reduced ordered BDD forest
pub struct Forest {
    manager: BDDManagerRef,
    /// Handle table, `None` for free slots
    funcs: Vec<Option<BDDFunction>>,
    /// Protection count per slot
    protects: Vec<u32>,
    index: FxHashMap<BDDFunction, u32>,
    free: Vec<u32>,
    /// `order[level]` is the variable at `level`
    order: Vec<VarNo>,
    peak_nodes: usize,
    policy: ReorderPolicy,
    rng: Rng,
    config: ForestConfig,
}

/// Unwrap `value` or abort the process like OxiDD does when running out of
/// node slots
fn handle_oom<T>(value: AllocResult<T>) -> T {
    match value {
        Ok(v) => v,
        Err(_) => {
            eprintln!("Out of memory");
            std::process::abort();
        }
    }
}

/// Level of the top-most node of `f`, `None` for the constants
fn top_level(f: &BDDFunction) -> Option<LevelNo> {
    f.with_manager_shared(|manager, edge| match manager.get_node(edge) {
        Node::Inner(node) => Some(node.level()),
        Node::Terminal(_) => None,
    })
}

impl Forest {
    /// Create a forest with the bottom-up initial order: variable `num_vars`
    /// at level 0 and variable 1 at the last level
    pub fn new(num_vars: VarNo, policy: ReorderPolicy, config: ForestConfig) -> Self {
        let manager = oxidd::bdd::new_manager(
            config.inner_node_capacity,
            config.apply_cache_capacity,
            config.threads,
        );
        let (f, t) = manager.with_manager_exclusive(|manager| {
            manager.add_vars(num_vars);
            (BDDFunction::f(manager), BDDFunction::t(manager))
        });

        let mut index = FxHashMap::default();
        index.insert(f.clone(), FALSE);
        index.insert(t.clone(), TRUE);
        Self {
            manager,
            funcs: vec![Some(f), Some(t)],
            protects: vec![0, 0],
            index,
            free: Vec::new(),
            order: (1..=num_vars).rev().collect(),
            peak_nodes: 0,
            policy,
            rng: seeded_rng(config.seed),
            config,
        }
    }

    /// Create a forest where `order[i]` is placed at level `i`
    ///
    /// Panics if `order` is not a permutation of `1..=order.len()`.
    pub fn with_order(order: &[VarNo], policy: ReorderPolicy, config: ForestConfig) -> Self {
        let num_vars = order.len() as VarNo;
        assert!(
            is_total_order(order, num_vars),
            "`order` must be a permutation of 1..={num_vars}"
        );
        let mut forest = Self::new(num_vars, policy, config);
        // There are no nodes yet, so the swaps are free.
        let oxidd_order: Vec<_> = order.iter().map(|&v| forest.oxidd_var(v)).collect();
        forest.manager.with_manager_exclusive(|manager| {
            oxidd_reorder::set_var_order_seq(manager, &oxidd_order);
        });
        forest.order.copy_from_slice(order);
        forest
    }

    /// The reorder policy used by [`Engine::set_var_order()`]
    #[inline]
    pub fn policy(&self) -> ReorderPolicy {
        self.policy
    }

    /// Number of nodes at `level`, including nodes not collected yet
    #[inline]
    pub fn level_size(&self, level: LevelNo) -> usize {
        use oxidd_core::LevelView;
        self.manager
            .with_manager_shared(|manager| manager.level(level).len())
    }

    /// Number of distinct inner nodes reachable from `roots`
    pub fn node_count(&self, roots: &[Edge]) -> usize {
        let mut visited = FxHashSet::default();
        let mut stack: Vec<BDDFunction> = roots.iter().map(|&e| self.func(e).clone()).collect();
        while let Some(f) = stack.pop() {
            let Some((hi, lo)) = f.cofactors() else {
                continue;
            };
            if visited.insert(f) {
                stack.push(hi);
                stack.push(lo);
            }
        }
        visited.len()
    }

    /// Evaluate `f` under `assignment`, where `assignment[v - 1]` is the value
    /// of variable `v`
    pub fn eval(&self, f: Edge, assignment: &[bool]) -> bool {
        let mut f = self.func(f).clone();
        while let (Some(level), Some((hi, lo))) = (top_level(&f), f.cofactors()) {
            let var = self.order[level as usize];
            f = if assignment[var as usize - 1] { hi } else { lo };
        }
        f == *self.func(Edge(TRUE))
    }

    /// If-then-else: `(f ∧ g) ∨ (¬f ∧ h)`
    pub fn ite(&mut self, f: Edge, g: Edge, h: Edge) -> Edge {
        let res = handle_oom(self.func(f).ite(self.func(g), self.func(h)));
        self.intern(res)
    }

    #[inline]
    fn oxidd_var(&self, var: VarNo) -> VarNo {
        self.num_vars() - var
    }

    /// The function behind `e`
    ///
    /// Panics if the slot of `e` has been reclaimed.
    fn func(&self, e: Edge) -> &BDDFunction {
        match &self.funcs[e.0 as usize] {
            Some(f) => f,
            None => panic!("{e:?} has been reclaimed"),
        }
    }

    /// Get the slot of `f`, allocating one if needed
    fn intern(&mut self, f: BDDFunction) -> Edge {
        self.touch();
        if let Some(&slot) = self.index.get(&f) {
            return Edge(slot);
        }
        let slot = match self.free.pop() {
            Some(slot) => {
                self.funcs[slot as usize] = Some(f.clone());
                slot
            }
            None => {
                self.funcs.push(Some(f.clone()));
                self.protects.push(0);
                (self.funcs.len() - 1) as u32
            }
        };
        self.index.insert(f, slot);
        Edge(slot)
    }

    #[inline]
    fn touch(&mut self) {
        self.peak_nodes = self.peak_nodes.max(self.num_nodes());
    }

    /// Release every unprotected slot and collect the nodes that are no longer
    /// referenced
    fn gc(&mut self) {
        for slot in TRUE + 1..self.funcs.len() as u32 {
            if self.protects[slot as usize] != 0 {
                continue;
            }
            if let Some(f) = self.funcs[slot as usize].take() {
                self.index.remove(&f);
                self.free.push(slot);
            }
        }
        self.collect_nodes();
    }

    /// Run OxiDD's garbage collection, leaving the handle table alone
    fn collect_nodes(&mut self) {
        let collected = self.manager.with_manager_shared(|manager| manager.gc());
        log::trace!(
            "garbage collection: removed {collected} nodes, {} remaining",
            self.num_nodes()
        );
    }
}

impl Engine for Forest {
    type Edge = Edge;
    type Config = ForestConfig;

    fn new(num_vars: VarNo, policy: ReorderPolicy, config: &ForestConfig) -> Self {
        Forest::new(num_vars, policy, config.clone())
    }

    #[inline]
    fn num_vars(&self) -> VarNo {
        self.order.len() as VarNo
    }

    #[inline]
    fn t(&self) -> Edge {
        Edge(TRUE)
    }
    #[inline]
    fn f(&self) -> Edge {
        Edge(FALSE)
    }

    fn var(&mut self, var: VarNo) -> Edge {
        assert!(
            var >= 1 && var <= self.num_vars(),
            "variable {var} out of range 1..={}",
            self.num_vars()
        );
        let var = self.oxidd_var(var);
        let f = self
            .manager
            .with_manager_shared(|manager| handle_oom(BDDFunction::var(manager, var)));
        self.intern(f)
    }

    fn not(&mut self, f: Edge) -> Edge {
        let res = handle_oom(self.func(f).not());
        self.intern(res)
    }
    fn and(&mut self, f: Edge, g: Edge) -> Edge {
        let res = handle_oom(self.func(f).and(self.func(g)));
        self.intern(res)
    }
    fn or(&mut self, f: Edge, g: Edge) -> Edge {
        let res = handle_oom(self.func(f).or(self.func(g)));
        self.intern(res)
    }

    fn protect(&mut self, f: Edge) {
        if f.is_terminal() {
            return;
        }
        assert!(
            self.funcs[f.0 as usize].is_some(),
            "{f:?} has been reclaimed"
        );
        self.protects[f.0 as usize] += 1;
    }
    fn unprotect(&mut self, f: Edge) {
        if f.is_terminal() {
            return;
        }
        let count = &mut self.protects[f.0 as usize];
        assert!(*count > 0, "unprotecting an unprotected edge {f:?}");
        *count -= 1;
    }

    #[inline]
    fn num_nodes(&self) -> usize {
        self.manager
            .with_manager_shared(|manager| manager.num_inner_nodes())
    }
    #[inline]
    fn peak_nodes(&self) -> usize {
        self.peak_nodes
    }
    fn reset_peak(&mut self) {
        self.peak_nodes = self.num_nodes();
    }

    #[inline]
    fn var_order(&self) -> &[VarNo] {
        &self.order
    }
    fn var_to_level(&self, var: VarNo) -> LevelNo {
        match self.order.iter().position(|&v| v == var) {
            Some(level) => level as LevelNo,
            None => panic!("variable {var} out of range 1..={}", self.num_vars()),
        }
    }

    fn swap_adjacent(&mut self, upper: LevelNo) {
        self.gc();
        self.swap_levels(upper);
    }

    fn set_var_order(&mut self, order: &[VarNo]) {
        Forest::set_var_order(self, order)
    }

    fn reduce_window(&mut self, levels: RangeInclusive<LevelNo>) -> ReorderStats {
        Forest::reduce_window(self, levels)
    }

    fn clear_cache(&mut self) {
        self.gc();
    }

    fn rebuild(&mut self, order: &[VarNo], roots: &mut [Edge]) {
        Forest::rebuild(self, order, roots)
    }
}
