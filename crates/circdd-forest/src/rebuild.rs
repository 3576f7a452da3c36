//! Reordering by rebuilding
//!
//! Instead of permuting the levels in place, [`Forest::rebuild()`] creates a
//! fresh manager that already has the target order and re-creates the roots
//! there bottom-up via if-then-else on the variables.

use oxidd::bdd::BDDFunction;
use oxidd::BooleanFunction;
use rustc_hash::FxHashMap;

use circdd_core::{is_total_order, Engine, VarNo};

use crate::{handle_oom, top_level, Edge, Forest, TRUE};

impl Forest {
    /// Replace this forest by a fresh one using `order` and re-create `roots`
    /// in it
    ///
    /// Every element of `roots` is translated and protected once in the new
    /// forest. All other edges become invalid. The peak node count restarts
    /// with the new forest.
    pub fn rebuild(&mut self, order: &[VarNo], roots: &mut [Edge]) {
        assert!(
            is_total_order(order, self.num_vars()),
            "`order` must be a permutation of 1..={}",
            self.num_vars()
        );
        let mut target = Forest::with_order(order, self.policy, self.config.clone());
        std::mem::swap(&mut target.rng, &mut self.rng);

        let mut translated = FxHashMap::default();
        for root in roots.iter_mut() {
            let f = self.func(*root).clone();
            let f = self.translate(f, &mut target, &mut translated);
            let e = target.intern(f);
            target.protect(e);
            *root = e;
        }
        drop(translated);

        log::debug!(
            "rebuilt {} roots: {} -> {} nodes",
            roots.len(),
            self.num_nodes(),
            target.num_nodes()
        );
        *self = target;
    }

    fn translate(
        &self,
        f: BDDFunction,
        target: &mut Forest,
        translated: &mut FxHashMap<BDDFunction, BDDFunction>,
    ) -> BDDFunction {
        let (Some(level), Some((hi, lo))) = (top_level(&f), f.cofactors()) else {
            let value = f == *self.func(Edge(TRUE));
            return target.func(if value { target.t() } else { target.f() }).clone();
        };
        if let Some(res) = translated.get(&f) {
            return res.clone();
        }
        let hi = self.translate(hi, target, translated);
        let lo = self.translate(lo, target, translated);
        let var = target.var(self.order[level as usize]);
        let res = handle_oom(target.func(var).ite(&hi, &lo));
        target.touch();
        translated.insert(f, res.clone());
        res
    }
}
