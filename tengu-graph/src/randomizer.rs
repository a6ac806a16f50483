//! Deterministic randomizer selection. A graph and an individual random op may each carry an
//! optional seed; which generator backs a given call follows a fixed precedence so that runs with
//! a seeded graph are reproducible while unseeded graphs still produce usable randomness.

use std::cell::RefCell;
use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;

/// The two seeds a random op call may be influenced by.
#[derive(Clone, Copy, Debug, Default)]
pub struct Seeds {
    pub graph_seed: Option<u64>,
    pub op_seed: Option<u64>,
}

/// Session-scoped generators keyed by graph identity or by op tag, reused across calls that share
/// a key so repeated draws from the same seeded source advance rather than reset.
#[derive(Default)]
pub struct Randomizer {
    by_graph: RefCell<HashMap<u64, StdRng>>,
    by_op: RefCell<HashMap<String, StdRng>>,
}

impl Randomizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against the rng selected for `seeds`/`op_tag`, per the precedence rule:
    /// 1. both seeds set → fresh generator seeded with `graph_seed ^ op_seed`, not retained.
    /// 2. only `graph_seed` set → generator retained under the graph's identity.
    /// 3. only `op_seed` set → generator retained under the op tag.
    /// 4. neither set → a fresh, non-reproducible generator from entropy, not retained.
    pub fn with_rng<R>(&self, seeds: Seeds, op_tag: &str, f: impl FnOnce(&mut StdRng) -> R) -> R {
        match (seeds.graph_seed, seeds.op_seed) {
            (Some(g), Some(o)) => {
                let mut rng = StdRng::seed_from_u64(g ^ o);
                f(&mut rng)
            }
            (Some(g), None) => {
                let mut generators = self.by_graph.borrow_mut();
                let rng = generators.entry(g).or_insert_with(|| StdRng::seed_from_u64(g));
                f(rng)
            }
            (None, Some(o)) => {
                let mut generators = self.by_op.borrow_mut();
                let rng = generators.entry(op_tag.to_string()).or_insert_with(|| StdRng::seed_from_u64(o));
                f(rng)
            }
            (None, None) => {
                let mut rng = StdRng::from_entropy();
                f(&mut rng)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn same_graph_and_op_seed_is_deterministic() {
        let a = Randomizer::new();
        let b = Randomizer::new();
        let seeds = Seeds {
            graph_seed: Some(7),
            op_seed: Some(3),
        };
        let x: f32 = a.with_rng(seeds, "uniform", |rng| rng.gen());
        let y: f32 = b.with_rng(seeds, "uniform", |rng| rng.gen());
        assert_eq!(x, y);
    }

    #[test]
    fn graph_scoped_generator_advances_across_calls() {
        let r = Randomizer::new();
        let seeds = Seeds {
            graph_seed: Some(1),
            op_seed: None,
        };
        let x: f32 = r.with_rng(seeds, "uniform", |rng| rng.gen());
        let y: f32 = r.with_rng(seeds, "uniform", |rng| rng.gen());
        assert_ne!(x, y);
    }

    #[test]
    fn op_scoped_seed_is_deterministic_across_randomizers() {
        let a = Randomizer::new();
        let b = Randomizer::new();
        let seeds = Seeds {
            graph_seed: None,
            op_seed: Some(5),
        };
        let x: f32 = a.with_rng(seeds, "uniform", |rng| rng.gen());
        let y: f32 = b.with_rng(seeds, "uniform", |rng| rng.gen());
        assert_eq!(x, y);
    }

    #[test]
    fn op_scoped_generator_advances_across_calls() {
        let r = Randomizer::new();
        let seeds = Seeds {
            graph_seed: None,
            op_seed: Some(5),
        };
        let x: f32 = r.with_rng(seeds, "uniform", |rng| rng.gen());
        let y: f32 = r.with_rng(seeds, "uniform", |rng| rng.gen());
        assert_ne!(x, y);
    }
}
