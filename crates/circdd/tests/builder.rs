mod util;

use circdd::schedule::Step;
use circdd::{
    BuildError, BuilderConfig, Engine, Forest, ForestConfig, ModelBuilder, ReorderStrategy, VarNo,
};
use circdd_core::is_total_order;
use circdd_core::util::{seeded_rng, RngExt};

use util::{adder, assignment, check_adder, check_parity, parity, parse};

#[test]
fn and_gate() {
    let models = parse(".model and2\n.inputs a b\n.outputs o\n.names a b o\n11 1\n.end\n");
    let mut builder = ModelBuilder::new(&models[0]).unwrap();
    builder.build().unwrap();
    let o = builder.output("o").unwrap();

    let forest = builder.engine_mut().unwrap();
    let a = forest.var(1);
    let b = forest.var(2);
    assert_eq!(forest.and(a, b), o);
}

#[test]
fn inverter_is_complemented() {
    let models = parse(".model inv\n.inputs a\n.outputs o\n.names a o\n0 1\n.end\n");
    assert!(models[0].gates[0].output.complemented);

    let mut builder = ModelBuilder::new(&models[0]).unwrap();
    builder.build().unwrap();
    let o = builder.output("o").unwrap();
    let forest = builder.engine_mut().unwrap();
    let a = forest.var(1);
    assert_eq!(forest.not(a), o);
}

#[test]
fn shared_gate_counts() {
    let models = parse(
        ".model chain\n.inputs a b c\n.outputs g3\n\
         .names a b g1\n11 1\n\
         .names g1 c g2\n1- 1\n-1 1\n\
         .names g1 g2 g3\n10 1\n01 1\n.end\n",
    );
    let model = &models[0];
    let mut builder = ModelBuilder::new(model).unwrap();
    let registry_schedule = circdd::schedule::schedule(model, builder.registry()).unwrap();
    let g1 = builder.registry().var("g1");
    let g1_steps = registry_schedule
        .order
        .iter()
        .filter(|step| step.var() == g1)
        .count();
    assert_eq!(g1_steps, 1);
    assert_eq!(registry_schedule.counts[g1 as usize], 2);

    builder.build().unwrap();
    let schedule = builder.schedule().unwrap();
    assert_eq!(schedule.order, registry_schedule.order);
    let g3 = builder.registry().var("g3");
    for step in &schedule.order {
        let count = schedule.counts[step.var() as usize];
        if step.var() == g3 {
            assert_eq!(count, 1);
        } else {
            assert_eq!(count, 0, "{step:?}");
        }
    }
    assert!(matches!(schedule.order[0], Step::Leaf(1)));

    // g3 = (a ∧ b) ⊕ ((a ∧ b) ∨ c) = ¬(a ∧ b) ∧ c
    let forest = builder.engine().unwrap();
    let out = builder.output("g3").unwrap();
    for bits in 0..8 {
        let asg = assignment(bits, 3);
        assert_eq!(forest.eval(out, &asg), !(asg[0] && asg[1]) && asg[2]);
    }
    builder.release();
}

#[test]
fn adder_is_correct() {
    let models = parse(&adder(3));
    let mut builder = ModelBuilder::new(&models[0]).unwrap();
    builder.initialize("LI").unwrap();
    builder.build_model().unwrap();
    check_adder(&builder, 3);

    let before = builder.output_status().unwrap().total_nodes;
    let stats = builder.optimize().unwrap();
    let after = builder.output_status().unwrap().total_nodes;
    assert!(after <= before);
    assert!(stats.final_size <= stats.initial_size);
    check_adder(&builder, 3);
}

#[test]
fn reorder_current_order_is_idempotent() {
    let models = parse(&adder(3));
    for strategy in [ReorderStrategy::InPlace, ReorderStrategy::Rebuild] {
        let config = BuilderConfig {
            strategy,
            ..Default::default()
        };
        let mut builder = ModelBuilder::<Forest>::with_config(&models[0], config).unwrap();
        builder.build().unwrap();
        let status = builder.output_status().unwrap();
        let order = builder.get_variable_order().unwrap();

        builder.reorder(&order).unwrap();
        assert_eq!(builder.output_status().unwrap(), status);
        assert_eq!(builder.get_variable_order().unwrap(), order);
    }
}

#[test]
fn random_reorders_preserve_outputs() {
    let models = parse(&adder(3));
    for strategy in [ReorderStrategy::InPlace, ReorderStrategy::Rebuild] {
        let config = BuilderConfig {
            strategy,
            ..Default::default()
        };
        let mut builder = ModelBuilder::<Forest>::with_config(&models[0], config).unwrap();
        builder.initialize("RAN").unwrap();
        builder.build_model().unwrap();

        let mut rng = seeded_rng(1);
        let mut order = builder.get_variable_order().unwrap();
        for _ in 0..4 {
            rng.shuffle(&mut order);
            builder.reorder(&order).unwrap();
            builder.reset_stat().unwrap();
            assert_eq!(builder.get_variable_order().unwrap(), order);
            check_adder(&builder, 3);
        }

        builder.swap_adjacent(0).unwrap();
        order.swap(0, 1);
        assert_eq!(builder.get_variable_order().unwrap(), order);
        check_adder(&builder, 3);
    }
}

#[test]
fn interleaved_order_is_smaller() {
    let models = parse(&adder(4));
    let mut builder = ModelBuilder::new(&models[0]).unwrap();
    builder.build().unwrap();

    // carry-in at the top, then a0 b0 a1 b1 ...
    let n = 4;
    let mut interleaved = vec![2 * n + 1];
    for i in 1..=n {
        interleaved.extend([i, n + i]);
    }
    let separated: Vec<VarNo> = (1..=2 * n + 1).rev().collect();

    builder.reorder(&separated).unwrap();
    let large = builder.output_status().unwrap().total_nodes;
    builder.reorder(&interleaved).unwrap();
    let small = builder.output_status().unwrap().total_nodes;
    assert!(small < large, "{small} >= {large}");
    check_adder(&builder, 4);
}

#[test]
fn size_trigger_optimizes() {
    let models = parse(&adder(4));
    let config = BuilderConfig {
        size_threshold: 4,
        ..Default::default()
    };
    let mut builder = ModelBuilder::<Forest>::with_config(&models[0], config).unwrap();
    builder.build().unwrap();
    assert_ne!(builder.size_limit(), 4);
    assert_eq!(builder.size_limit() % 2, 0);
    check_adder(&builder, 4);
}

#[test]
fn structural_orders() {
    let models = parse(&adder(3));
    let mut builder = ModelBuilder::new(&models[0]).unwrap();
    builder.set_num_vars(8).unwrap();

    let depth = builder.depth_order();
    assert!(is_total_order(&depth, 8));
    // the reserved variable comes last
    assert_eq!(depth[7], 8);
    let dfs = builder.dfs_order(&mut seeded_rng(3));
    assert!(is_total_order(&dfs, 8));

    builder
        .initialize_with_policy(circdd::ReorderPolicy::default())
        .unwrap();
    builder.reorder(&depth).unwrap();
    builder.build_model().unwrap();
    assert_eq!(builder.get_variable_order().unwrap(), depth);
    check_adder(&builder, 3);
}

#[test]
fn aligned_budget() {
    let models = parse(".model m\n.inputs a b\n.outputs a o\n.names b o\n1 1\n.end\n");
    let mut builder = ModelBuilder::new(&models[0]).unwrap();
    builder.set_num_vars(5).unwrap();
    builder.build().unwrap();
    assert_eq!(builder.num_vars(), 5);
    assert_eq!(builder.actual_num_vars(), 2);
    assert_eq!(builder.get_variable_order().unwrap().len(), 5);

    // a bare input as output
    let a = builder.output("a").unwrap();
    let forest = builder.engine_mut().unwrap();
    assert_eq!(forest.var(1), a);
    assert_eq!(builder.outputs().len(), 2);
}

#[test]
fn latch_outputs_are_undriven() {
    let models = parse(
        ".model seq\n.inputs i\n.outputs o\n.latch o q 0\n.names i q o\n11 1\n.end\n",
    );
    let mut builder = ModelBuilder::new(&models[0]).unwrap();
    assert_eq!(
        builder.build().unwrap_err(),
        BuildError::UndrivenSignal("q".into())
    );
}

#[test]
fn generic_engine_config() {
    let models = parse(&adder(2));
    let config = BuilderConfig {
        engine: ForestConfig {
            seed: 99,
            max_growth: 2.0,
            inner_node_capacity: 1 << 10,
            apply_cache_capacity: 64,
            threads: 1,
        },
        ..Default::default()
    };
    let mut builder: ModelBuilder<'_, Forest> = ModelBuilder::with_config(&models[0], config).unwrap();
    builder.initialize("RAN").unwrap();
    builder.build_model().unwrap();
    builder.optimize_window(1, 3).unwrap();
    check_adder(&builder, 2);
    assert_eq!(builder.engine().unwrap().num_vars(), 5);
}

#[test]
fn off_set_covers() {
    let models = parse(&parity(3));
    let mut builder = ModelBuilder::new(&models[0]).unwrap();
    builder.build().unwrap();
    check_parity(&builder, 3);
    builder.optimize().unwrap();
    check_parity(&builder, 3);
}
