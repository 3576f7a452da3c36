//! Dynamic variable reordering
//!
//! All algorithms here are built on [`Forest::swap_levels()`], which exchanges
//! two adjacent levels in place using [`oxidd_reorder::level_down()`]. Node
//! identities are preserved, so the handle table stays valid across swaps.

use std::cmp::Reverse;
use std::ops::RangeInclusive;

use oxidd::{Manager, ManagerRef};

use circdd_core::util::RngExt;
use circdd_core::{is_total_order, Engine, LevelNo, ReorderPolicy, ReorderStats, VarNo};

use crate::Forest;

impl Forest {
    /// Swap the variables at levels `upper` and `upper + 1` in place
    ///
    /// Afterwards, the nodes that became unreachable are collected, so
    /// [`Engine::num_nodes()`] is exact again if it was exact before.
    pub(crate) fn swap_levels(&mut self, upper: LevelNo) {
        let lower = upper + 1;
        assert!(
            lower < self.num_vars(),
            "cannot swap level {upper} with level {lower}, there are only {} levels",
            self.num_vars()
        );
        log::trace!(
            "swap: var {} (level {upper}) <-> var {} (level {lower})",
            self.order[upper as usize],
            self.order[lower as usize]
        );

        self.manager.with_manager_exclusive(|manager| {
            manager.reorder(|manager| {
                // SAFETY: we are inside `reorder()` and `manager` is derived
                // from the exclusive reference
                unsafe { oxidd_reorder::level_down(manager, upper) }
            })
        });
        self.order.swap(upper as usize, lower as usize);
        self.touch();
        self.collect_nodes();
    }

    /// Permute the variables such that `order[i]` ends up at level `i`
    ///
    /// The order is established by adjacent swaps. Every swap removes exactly
    /// one inversion, the configured [`ReorderPolicy`] decides which one.
    ///
    /// Panics if `order` is not a permutation of `1..=num_vars`.
    pub fn set_var_order(&mut self, order: &[VarNo]) {
        assert!(
            is_total_order(order, self.num_vars()),
            "`order` must be a permutation of 1..={}",
            self.num_vars()
        );
        if self.order == order {
            return;
        }
        self.gc();

        // `target[l]` is the level that the variable currently at level `l`
        // must be moved to
        let mut target = vec![0; order.len()];
        for (level, &var) in order.iter().enumerate() {
            target[self.var_to_level(var) as usize] = level as u32;
        }

        let swaps = self.resolve_inversions(&mut target);
        log::debug!(
            "set_var_order ({}): {swaps} swaps, {} nodes",
            self.policy,
            self.num_nodes()
        );
        debug_assert_eq!(self.order, order);
    }

    fn step(&mut self, target: &mut [u32], upper: usize) {
        debug_assert!(target[upper] > target[upper + 1]);
        self.swap_levels(upper as LevelNo);
        target.swap(upper, upper + 1);
    }

    fn resolve_inversions(&mut self, target: &mut [u32]) -> usize {
        let mut swaps = 0;
        let mut inversions = Vec::new();
        loop {
            inversions.clear();
            inversions.extend(
                (0..target.len().saturating_sub(1)).filter(|&i| target[i] > target[i + 1]),
            );
            let (Some(&first), Some(&last)) = (inversions.first(), inversions.last()) else {
                return swaps;
            };

            match self.policy {
                ReorderPolicy::LowestInversion => {
                    self.step(target, first);
                    swaps += 1;
                }
                ReorderPolicy::HighestInversion => {
                    self.step(target, last);
                    swaps += 1;
                }
                ReorderPolicy::SinkDown => {
                    let mut i = first;
                    while i + 1 < target.len() && target[i] > target[i + 1] {
                        self.step(target, i);
                        swaps += 1;
                        i += 1;
                    }
                }
                ReorderPolicy::BubbleUp => {
                    let mut i = last;
                    loop {
                        self.step(target, i);
                        swaps += 1;
                        if i == 0 || target[i - 1] <= target[i] {
                            break;
                        }
                        i -= 1;
                    }
                }
                ReorderPolicy::LowestCost => {
                    let i = inversions
                        .iter()
                        .copied()
                        .min_by_key(|&i| {
                            self.level_size(i as LevelNo) + self.level_size(i as LevelNo + 1)
                        })
                        .unwrap_or(first);
                    self.step(target, i);
                    swaps += 1;
                }
                ReorderPolicy::LowestMemory => {
                    let i = inversions
                        .iter()
                        .copied()
                        .min_by_key(|&i| self.level_size(i as LevelNo))
                        .unwrap_or(first);
                    self.step(target, i);
                    swaps += 1;
                }
                ReorderPolicy::Random => {
                    let i = inversions[self.rng.generate_range(0..inversions.len())];
                    self.step(target, i);
                    swaps += 1;
                }
                ReorderPolicy::LowestAverageRelativeCost => {
                    // For every variable that must move down, consider the
                    // run of levels directly below it that it has to cross.
                    // Choose the one that crosses the fewest nodes per swap.
                    let mut best: Option<(f64, usize, usize)> = None;
                    for &i in &inversions {
                        let mut j = i + 1;
                        while j + 1 < target.len() && target[j + 1] < target[i] {
                            j += 1;
                        }
                        let crossed: usize =
                            (i..=j).map(|l| self.level_size(l as LevelNo)).sum();
                        let cost = crossed as f64 / (j - i) as f64;
                        if best.map_or(true, |(c, _, _)| cost < c) {
                            best = Some((cost, i, j));
                        }
                    }
                    let (_, i, j) = best.unwrap_or((0.0, first, first + 1));
                    for l in i..j {
                        self.step(target, l);
                        swaps += 1;
                    }
                }
            }
        }
    }

    /// Sift the variables within `levels` to reduce the number of nodes
    ///
    /// Variables are processed by decreasing number of nodes at their level.
    /// Each variable is moved through every position of the window and put
    /// back at the position with the fewest nodes. A direction is abandoned
    /// once the node count grows beyond [`ForestConfig::max_growth`] times the
    /// best count.
    ///
    /// [`ForestConfig::max_growth`]: crate::ForestConfig::max_growth
    pub fn reduce_window(&mut self, levels: RangeInclusive<LevelNo>) -> ReorderStats {
        self.gc();
        let (top, bottom) = (*levels.start(), *levels.end());
        let size = self.num_nodes();
        let mut stats = ReorderStats {
            swaps: 0,
            initial_size: size,
            final_size: size,
        };
        if top >= bottom {
            return stats;
        }
        assert!(
            bottom < self.num_vars(),
            "level {bottom} out of range, there are only {} levels",
            self.num_vars()
        );

        let mut vars: Vec<(usize, VarNo)> = levels
            .map(|l| (self.level_size(l), self.order[l as usize]))
            .collect();
        vars.sort_by_key(|&(size, _)| Reverse(size));

        for (_, var) in vars {
            stats.swaps += self.sift(var, top, bottom);
        }

        stats.final_size = self.num_nodes();
        assert!(
            stats.final_size <= stats.initial_size,
            "sifting increased the node count from {} to {}",
            stats.initial_size,
            stats.final_size
        );
        log::debug!(
            "sifting levels {top}..={bottom}: {} -> {} nodes ({:.1}% reduction), {} swaps",
            stats.initial_size,
            stats.final_size,
            stats.reduction_percent(),
            stats.swaps
        );
        stats
    }

    /// Returns the number of swaps
    fn sift(&mut self, var: VarNo, top: LevelNo, bottom: LevelNo) -> usize {
        let start = self.var_to_level(var);
        let mut best = (self.num_nodes(), start);
        let mut level = start;
        let mut swaps = 0;

        if bottom - start <= start - top {
            level = self.sift_down(level, bottom, &mut best, &mut swaps);
            level = self.sift_up(level, top, &mut best, &mut swaps);
        } else {
            level = self.sift_up(level, top, &mut best, &mut swaps);
            level = self.sift_down(level, bottom, &mut best, &mut swaps);
        }

        while level < best.1 {
            self.swap_levels(level);
            level += 1;
            swaps += 1;
        }
        while level > best.1 {
            self.swap_levels(level - 1);
            level -= 1;
            swaps += 1;
        }
        debug_assert_eq!(self.num_nodes(), best.0);
        log::trace!(
            "sifted var {var} from level {start} to level {level}, {} nodes",
            best.0
        );
        swaps
    }

    fn sift_down(
        &mut self,
        mut level: LevelNo,
        bottom: LevelNo,
        best: &mut (usize, LevelNo),
        swaps: &mut usize,
    ) -> LevelNo {
        while level < bottom {
            self.swap_levels(level);
            level += 1;
            *swaps += 1;
            if self.record(level, best) {
                break;
            }
        }
        level
    }

    fn sift_up(
        &mut self,
        mut level: LevelNo,
        top: LevelNo,
        best: &mut (usize, LevelNo),
        swaps: &mut usize,
    ) -> LevelNo {
        while level > top {
            self.swap_levels(level - 1);
            level -= 1;
            *swaps += 1;
            if self.record(level, best) {
                break;
            }
        }
        level
    }

    /// Update `best`, returns whether the growth limit is exceeded
    #[inline]
    fn record(&self, level: LevelNo, best: &mut (usize, LevelNo)) -> bool {
        let size = self.num_nodes();
        if size < best.0 {
            *best = (size, level);
            false
        } else {
            size as f64 > self.config.max_growth * best.0 as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use circdd_core::{Engine, ReorderPolicy};

    use crate::{Edge, Forest, ForestConfig};

    /// `x1 ∧ x2 ∨ x3 ∧ x4 ∨ x5 ∧ x6`, whose size depends heavily on the order
    fn pairs(f: &mut Forest) -> Edge {
        let mut acc = f.f();
        for i in 0..3 {
            let a = f.var(2 * i + 1);
            let b = f.var(2 * i + 2);
            let ab = f.and(a, b);
            acc = f.or(acc, ab);
        }
        f.protect(acc);
        acc
    }

    fn truth_table(f: &Forest, e: Edge, n: usize) -> Vec<bool> {
        (0..1u32 << n)
            .map(|bits| {
                let assignment: Vec<bool> = (0..n).map(|i| bits & (1 << i) != 0).collect();
                f.eval(e, &assignment)
            })
            .collect()
    }

    #[test]
    fn swap_preserves_function() {
        let mut f = Forest::new(6, ReorderPolicy::default(), ForestConfig::default());
        let e = pairs(&mut f);
        let expected = truth_table(&f, e, 6);
        f.clear_cache();
        for level in [0, 2, 4, 1, 3, 0] {
            f.swap_adjacent(level);
            assert_eq!(truth_table(&f, e, 6), expected);
            assert_eq!(f.num_nodes(), f.node_count(&[e]));
        }
    }

    #[test]
    fn swap_twice_is_identity() {
        let mut f = Forest::new(6, ReorderPolicy::default(), ForestConfig::default());
        let e = pairs(&mut f);
        f.clear_cache();
        let order = f.var_order().to_vec();
        let size = f.num_nodes();
        f.swap_adjacent(2);
        assert_ne!(f.var_order(), &order[..]);
        f.swap_adjacent(2);
        assert_eq!(f.var_order(), &order[..]);
        assert_eq!(f.num_nodes(), size);
        assert_eq!(f.node_count(&[e]), size);
    }

    #[test]
    fn every_policy_reaches_target() {
        let target = [1, 3, 5, 2, 4, 6];
        let mut sizes = Vec::new();
        for policy in ReorderPolicy::ALL {
            let mut f = Forest::new(6, policy, ForestConfig::default());
            let e = pairs(&mut f);
            let expected = truth_table(&f, e, 6);
            f.set_var_order(&target);
            assert_eq!(f.var_order(), &target, "{policy}");
            assert_eq!(truth_table(&f, e, 6), expected, "{policy}");
            sizes.push(f.num_nodes());
        }
        // the result does not depend on the path
        assert!(sizes.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn set_current_order_is_noop() {
        let mut f = Forest::new(6, ReorderPolicy::default(), ForestConfig::default());
        pairs(&mut f);
        f.clear_cache();
        let order = f.var_order().to_vec();
        let (nodes, peak) = (f.num_nodes(), f.peak_nodes());
        f.set_var_order(&order);
        assert_eq!(f.num_nodes(), nodes);
        assert_eq!(f.peak_nodes(), peak);
    }

    #[test]
    fn sifting_never_grows() {
        let mut f = Forest::new(6, ReorderPolicy::default(), ForestConfig::default());
        let e = pairs(&mut f);
        let expected = truth_table(&f, e, 6);
        // interleaved pairs are the worst case
        f.set_var_order(&[1, 3, 5, 2, 4, 6]);
        let before = f.num_nodes();
        let stats = f.reduce_window(0..=5);
        assert_eq!(stats.initial_size, before);
        assert!(stats.final_size <= before);
        assert!(stats.final_size < before, "sifting should find a better order");
        assert_eq!(f.num_nodes(), stats.final_size);
        assert_eq!(truth_table(&f, e, 6), expected);
    }

    #[test]
    fn window_limits_movement() {
        let mut f = Forest::new(6, ReorderPolicy::default(), ForestConfig::default());
        pairs(&mut f);
        f.set_var_order(&[1, 3, 5, 2, 4, 6]);
        f.reduce_window(2..=4);
        let order = f.var_order();
        assert_eq!(&order[..2], &[1, 3]);
        assert_eq!(order[5], 6);

        let empty = f.reduce_window(3..=3);
        assert_eq!(empty.swaps, 0);
    }
}
