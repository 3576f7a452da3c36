use circdd_core::util::{seeded_rng, RngExt};
use circdd_core::{Engine, ReorderPolicy};
use circdd_forest::{Edge, Forest, ForestConfig};

const NUM_VARS: u32 = 6;

fn assignments() -> Vec<Vec<bool>> {
    (0..1u32 << NUM_VARS)
        .map(|bits| (0..NUM_VARS).map(|i| bits & (1 << i) != 0).collect())
        .collect()
}

fn truth_table(f: &Forest, e: Edge) -> Vec<bool> {
    assignments().iter().map(|a| f.eval(e, a)).collect()
}

/// Build a few random functions and protect them
fn random_functions(f: &mut Forest, seed: u64) -> Vec<Edge> {
    let mut rng = seeded_rng(seed);
    let mut pool: Vec<Edge> = (1..=NUM_VARS).map(|v| f.var(v)).collect();
    for _ in 0..24 {
        let a = pool[rng.generate_range(0..pool.len())];
        let b = pool[rng.generate_range(0..pool.len())];
        let r = match rng.generate_range(0..3u8) {
            0 => f.and(a, b),
            1 => f.or(a, b),
            _ => f.not(a),
        };
        pool.push(r);
    }
    let roots = pool.split_off(pool.len() - 4);
    for &r in &roots {
        f.protect(r);
    }
    roots
}

#[test]
fn reordering_preserves_functions() {
    for policy in ReorderPolicy::ALL {
        let config = ForestConfig {
            seed: 7,
            ..Default::default()
        };
        let mut f = Forest::new(NUM_VARS, policy, config);
        let roots = random_functions(&mut f, 1);
        let expected: Vec<_> = roots.iter().map(|&r| truth_table(&f, r)).collect();

        let mut rng = seeded_rng(3);
        let mut order: Vec<u32> = (1..=NUM_VARS).collect();
        for _ in 0..5 {
            rng.shuffle(&mut order);
            f.set_var_order(&order);
            assert_eq!(f.var_order(), &order[..]);
            f.clear_cache();
            assert_eq!(f.num_nodes(), f.node_count(&roots));
            for (&r, e) in roots.iter().zip(&expected) {
                assert_eq!(&truth_table(&f, r), e, "policy {policy}");
            }
        }

        f.reduce_window(0..=NUM_VARS - 1);
        for (&r, e) in roots.iter().zip(&expected) {
            assert_eq!(&truth_table(&f, r), e, "policy {policy}");
        }
    }
}

#[test]
fn unprotected_results_are_collected() {
    let mut f = Forest::new(NUM_VARS, ReorderPolicy::default(), ForestConfig::default());
    let roots = random_functions(&mut f, 5);
    f.clear_cache();
    let live = f.num_nodes();
    assert_eq!(live, f.node_count(&roots));

    let a = f.var(1);
    let b = f.var(2);
    let _garbage = f.and(a, b);
    assert!(f.num_nodes() >= live);
    f.clear_cache();
    assert_eq!(f.num_nodes(), live);

    for &r in &roots {
        f.unprotect(r);
    }
    f.clear_cache();
    assert_eq!(f.num_nodes(), 0);
}

#[test]
fn rebuild_matches_in_place_reorder() {
    let order = [3, 1, 6, 2, 5, 4];

    let mut in_place = Forest::new(NUM_VARS, ReorderPolicy::default(), ForestConfig::default());
    let roots = random_functions(&mut in_place, 11);
    in_place.set_var_order(&order);
    in_place.clear_cache();

    let mut rebuilt = Forest::new(NUM_VARS, ReorderPolicy::default(), ForestConfig::default());
    let mut rebuilt_roots = random_functions(&mut rebuilt, 11);
    rebuilt.rebuild(&order, &mut rebuilt_roots);
    rebuilt.clear_cache();

    assert_eq!(in_place.var_order(), rebuilt.var_order());
    assert_eq!(in_place.num_nodes(), rebuilt.num_nodes());
    for (&a, &b) in roots.iter().zip(&rebuilt_roots) {
        assert_eq!(truth_table(&in_place, a), truth_table(&rebuilt, b));
    }
}

#[test]
fn handles_stay_canonical_across_reordering() {
    let mut f = Forest::new(NUM_VARS, ReorderPolicy::default(), ForestConfig::default());
    let a = f.var(2);
    let b = f.var(5);
    let g = f.and(a, b);
    f.protect(g);

    f.set_var_order(&[5, 1, 2, 3, 4, 6]);
    f.swap_adjacent(1);
    f.reduce_window(0..=NUM_VARS - 1);

    let a = f.var(2);
    let b = f.var(5);
    assert_eq!(f.and(b, a), g);
    assert_eq!(f.node_count(&[g]), 2);
}

#[test]
fn peak_covers_reordering() {
    let mut f = Forest::new(NUM_VARS, ReorderPolicy::default(), ForestConfig::default());
    random_functions(&mut f, 9);
    f.clear_cache();
    f.reset_peak();
    let before = f.num_nodes();
    f.set_var_order(&[6, 5, 4, 3, 2, 1]);
    f.clear_cache();
    assert!(f.peak_nodes() >= before);
    assert!(f.peak_nodes() >= f.num_nodes());
}
