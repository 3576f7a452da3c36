//! Core traits and types shared by the circdd crates
//!
//! # Overview
//!
//! The most central trait is [`Engine`]. An engine owns a forest of reduced
//! ordered binary decision diagrams over a fixed set of variables and hands
//! out lightweight [`Engine::Edge`] handles to identify the functions stored
//! in it. The circuit builder in the `circdd` crate is written against this
//! trait only, so it never inspects diagram structure itself.
//!
//! Variables and levels are distinct concepts: a variable ([`VarNo`]) is a
//! stable identity, whereas a level ([`LevelNo`]) is a position in the current
//! variable order. Level 0 is the top-most level. Reordering changes the
//! mapping between the two, but never the variable numbers.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::fmt;
use std::hash::Hash;
use std::ops::RangeInclusive;

mod error;
mod policy;
pub mod util;

pub use error::ConfigError;
pub use policy::ReorderPolicy;

/// Type of variable numbers
///
/// Variables are numbered starting from 1.
pub type VarNo = u32;

/// Type of level numbers
///
/// Level 0 is the top-most level, the terminals are below the last level.
pub type LevelNo = u32;

/// Node count statistics of an engine
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct NodeStats {
    /// Maximum number of inner nodes since the last peak reset
    pub peak_nodes: usize,
    /// Current number of inner nodes
    pub total_nodes: usize,
}

impl fmt::Display for NodeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Peak Node: {}", self.peak_nodes)?;
        write!(f, "Total Node: {}", self.total_nodes)
    }
}

/// Statistics collected during a window reduction pass
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct ReorderStats {
    /// Number of adjacent level swaps performed
    pub swaps: usize,
    /// Number of inner nodes before the pass
    pub initial_size: usize,
    /// Number of inner nodes after the pass
    pub final_size: usize,
}

impl ReorderStats {
    /// Relative size reduction in percent
    pub fn reduction_percent(&self) -> f64 {
        if self.initial_size == 0 {
            return 0.0;
        }
        100.0 * (1.0 - self.final_size as f64 / self.initial_size as f64)
    }
}

/// Symbolic function engine
///
/// An engine stores boolean functions over the variables `1..=num_vars()` as
/// a shared, reduced, ordered decision diagram forest.
///
/// # Handles
///
/// [`Self::Edge`] is a plain `Copy` ticket into the engine. A handle is
/// *protected* while its protection count (see [`Self::protect()`]) is
/// positive. Protected handles stay valid until the engine is dropped.
/// Unprotected handles are only valid until the next call to
/// [`Self::clear_cache()`] or any of the reordering operations
/// ([`Self::swap_adjacent()`], [`Self::set_var_order()`],
/// [`Self::reduce_window()`], [`Self::rebuild()`]), which may reclaim the
/// nodes they point to.
///
/// Dropping the engine releases every function derived from it.
pub trait Engine: Sized {
    /// Handle to a function stored in the engine
    type Edge: Copy + Eq + Hash + fmt::Debug;

    /// Engine specific configuration
    type Config: Clone + Default + fmt::Debug;

    /// Create a new engine for `num_vars` binary variables
    ///
    /// `policy` selects how [`Self::set_var_order()`] resolves inversions
    /// between the current and the target order.
    fn new(num_vars: VarNo, policy: ReorderPolicy, config: &Self::Config) -> Self;

    /// Number of variables
    fn num_vars(&self) -> VarNo;

    /// The constant true function
    fn t(&self) -> Self::Edge;
    /// The constant false function
    fn f(&self) -> Self::Edge;
    /// The function that is true iff variable `var` is true
    ///
    /// Panics if `var` is not in `1..=num_vars()`.
    fn var(&mut self, var: VarNo) -> Self::Edge;

    /// Complement of `f`
    fn not(&mut self, f: Self::Edge) -> Self::Edge;
    /// Conjunction of `f` and `g`
    fn and(&mut self, f: Self::Edge, g: Self::Edge) -> Self::Edge;
    /// Disjunction of `f` and `g`
    fn or(&mut self, f: Self::Edge, g: Self::Edge) -> Self::Edge;

    /// Increment the protection count of `f`
    fn protect(&mut self, f: Self::Edge);
    /// Decrement the protection count of `f`
    ///
    /// The nodes of `f` are not reclaimed immediately, but may be reclaimed by
    /// the next garbage collection.
    fn unprotect(&mut self, f: Self::Edge);

    /// Current number of inner nodes, including nodes that are no longer
    /// reachable but have not been collected yet
    fn num_nodes(&self) -> usize;
    /// Maximum of [`Self::num_nodes()`] since the last call to
    /// [`Self::reset_peak()`]
    fn peak_nodes(&self) -> usize;
    /// Reset the peak node count to the current node count
    fn reset_peak(&mut self);

    /// Current order, indexed by level
    fn var_order(&self) -> &[VarNo];
    /// Level of `var`
    fn var_to_level(&self, var: VarNo) -> LevelNo;
    /// Variable at `level`
    #[inline]
    fn level_to_var(&self, level: LevelNo) -> VarNo {
        self.var_order()[level as usize]
    }

    /// Swap the variables at `upper` and `upper + 1`
    fn swap_adjacent(&mut self, upper: LevelNo);
    /// Permute the variables such that `order[i]` is at level `i`
    ///
    /// `order` must be a permutation of `1..=num_vars()`. This is a no-op if
    /// `order` is already the current order.
    fn set_var_order(&mut self, order: &[VarNo]);
    /// Heuristically reduce the number of nodes by moving the variables within
    /// `levels`
    ///
    /// The number of nodes after the pass is never larger than before.
    fn reduce_window(&mut self, levels: RangeInclusive<LevelNo>) -> ReorderStats;

    /// Drop the computation caches and reclaim unreachable nodes
    ///
    /// Afterwards, [`Self::num_nodes()`] equals the number of nodes reachable
    /// from protected handles.
    fn clear_cache(&mut self);

    /// Replace the engine's contents by a fresh engine using `order`
    ///
    /// Every handle in `roots` is translated into the new engine and protected
    /// there once per occurrence. All other handles become invalid.
    fn rebuild(&mut self, order: &[VarNo], roots: &mut [Self::Edge]);

    /// Snapshot of the node statistics
    #[inline]
    fn stats(&self) -> NodeStats {
        NodeStats {
            peak_nodes: self.peak_nodes(),
            total_nodes: self.num_nodes(),
        }
    }
}

/// Check that `order` is a permutation of `1..=num_vars`
pub fn is_total_order(order: &[VarNo], num_vars: VarNo) -> bool {
    if order.len() != num_vars as usize {
        return false;
    }
    let mut seen = vec![false; num_vars as usize];
    for &var in order {
        if var == 0 || var > num_vars || seen[var as usize - 1] {
            return false;
        }
        seen[var as usize - 1] = true;
    }
    true
}
