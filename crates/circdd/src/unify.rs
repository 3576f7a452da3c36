//! Unification of the variable orders of two builders
//!
//! Both procedures scan the levels from the top down. Where the orders
//! disagree, the variable one builder has at the current level is moved up to
//! that level in the other builder by adjacent swaps. Of the two possible
//! moves, the one with fewer swaps is taken (the second builder moves on a
//! tie). Levels above the current one already agree and are never touched
//! again.

use std::time::Instant;

use circdd_core::{Engine, LevelNo, VarNo};

use crate::{BuildError, ModelBuilder};

/// Growth factor of the node budget in [`gradual_unify_orders()`]
pub const GROWTH_BUDGET: f64 = 1.2;

/// Summary of a unification
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct UnifyStats {
    /// Adjacent swaps applied to each builder
    pub swaps: [usize; 2],
    /// Window optimizations run on each builder
    pub optimizations: [usize; 2],
}

fn budget(nodes: usize) -> usize {
    (nodes as f64 * GROWTH_BUDGET) as usize
}

/// Bring `a` and `b` to a common variable order with few adjacent swaps
///
/// Afterwards, both builders report the same order.
pub fn unify_orders<'m, E: Engine>(
    a: &mut ModelBuilder<'m, E>,
    b: &mut ModelBuilder<'m, E>,
) -> Result<UnifyStats, BuildError> {
    unify(a, b, false)
}

/// Like [`unify_orders()`], but bounds transient growth
///
/// Each builder gets a node budget of [`GROWTH_BUDGET`] times its size at the
/// start. When a move makes a builder exceed its budget, the levels below the
/// current one are optimized and the budget is recomputed from the new size.
pub fn gradual_unify_orders<'m, E: Engine>(
    a: &mut ModelBuilder<'m, E>,
    b: &mut ModelBuilder<'m, E>,
) -> Result<UnifyStats, BuildError> {
    unify(a, b, true)
}

fn unify<'m, E: Engine>(
    a: &mut ModelBuilder<'m, E>,
    b: &mut ModelBuilder<'m, E>,
    gradual: bool,
) -> Result<UnifyStats, BuildError> {
    if a.num_vars() != b.num_vars() {
        return Err(BuildError::VarCountMismatch(a.num_vars(), b.num_vars()));
    }
    let n = a.num_vars() as usize;
    let start = Instant::now();
    log::info!("unifying the variable orders of {} and {}", a.name(), b.name());

    a.reset_stat()?;
    b.reset_stat()?;
    let mut limits = [0; 2];
    if gradual {
        limits[0] = budget(a.output_status()?.total_nodes);
        limits[1] = budget(b.output_status()?.total_nodes);
    }

    let mut builders = [a, b];
    let mut orders = [
        builders[0].get_variable_order()?,
        builders[1].get_variable_order()?,
    ];
    let mut stats = UnifyStats::default();

    for i in 0..n {
        if orders[0][i] == orders[1][i] {
            continue;
        }
        // distance of the variable the other builder has at level `i`
        let distance = |mine: &[VarNo], other: &[VarNo]| -> usize {
            match mine[i..].iter().position(|&var| var == other[i]) {
                Some(d) => d,
                None => unreachable!("orders are permutations of the same variables"),
            }
        };
        let da = distance(&orders[0][..], &orders[1][..]);
        let db = distance(&orders[1][..], &orders[0][..]);
        let (x, d) = if da < db { (0, da) } else { (1, db) };

        let builder = &mut builders[x];
        for level in (i..i + d).rev() {
            builder.swap_adjacent(level as LevelNo)?;
        }
        orders[x][i..=i + d].rotate_right(1);
        stats.swaps[x] += d;

        if gradual && builder.num_nodes()? > limits[x] {
            if i + 1 < n - 1 {
                builder.optimize_window(i as LevelNo + 1, n as LevelNo - 1)?;
                orders[x] = builder.get_variable_order()?;
                stats.optimizations[x] += 1;
            }
            limits[x] = budget(builder.output_status()?.total_nodes);
        }
    }

    debug_assert_eq!(orders[0], orders[1]);
    debug_assert_eq!(builders[0].get_variable_order()?, orders[0]);
    debug_assert_eq!(builders[1].get_variable_order()?, orders[1]);
    log::info!(
        "unified in {:?} with {} + {} swaps",
        start.elapsed(),
        stats.swaps[0],
        stats.swaps[1]
    );
    Ok(stats)
}
