// SPDX-License-Identifier: Apache-2.0

//! End-to-end tests of the resynthesis engine over an in-memory XAG.

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use xag_resyn::cache::CachePaths;
use xag_resyn::engine::{Outcome, ResynParams, Resynthesizer};
use xag_resyn::error::Error;
use xag_resyn::solver::{Lit, SatSolve, SolveOutcome};
use xag_resyn::tt::TruthTable;
use xag_resyn::xag::Xag;

const MAJ3: u64 = 0xe8;

fn zero_arrival_inputs(net: &mut Xag, num_vars: u8) -> Vec<(xag_resyn::xag::Signal, u32)> {
    (0..num_vars).map(|i| (net.input(i), 0)).collect()
}

#[test]
fn maj3_drops_to_depth_one() {
    let mut engine = Resynthesizer::new(ResynParams::default());
    let func = TruthTable::from_word(3, MAJ3);
    let mut net = Xag::new(3);
    let inputs = zero_arrival_inputs(&mut net, 3);

    match engine.resynthesize(&mut net, &func, &inputs, 2).unwrap() {
        Outcome::Improved { signal, depth } => {
            assert_eq!(depth, 1);
            assert_eq!(net.simulate(signal, 3), func);
            assert_eq!(net.mult_depth(signal), 1);
        }
        Outcome::NoChange => panic!("majority has a depth-1 implementation"),
    }
    assert_eq!(engine.stats().sat, 1);
}

#[test]
fn depth_bound_already_met_is_no_change() {
    let mut engine = Resynthesizer::new(ResynParams::default());
    let func = TruthTable::from_word(3, MAJ3);
    let mut net = Xag::new(3);
    let inputs = zero_arrival_inputs(&mut net, 3);

    // Nothing sits below depth 1 for a nonlinear function.
    let outcome = engine.resynthesize(&mut net, &func, &inputs, 1).unwrap();
    assert_eq!(outcome, Outcome::NoChange);
    assert_eq!(engine.stats().instances, 0);
}

#[test]
fn affine_functions_are_left_alone() {
    let mut engine = Resynthesizer::new(ResynParams::default());
    // Three-input parity.
    let func = TruthTable::from_word(3, 0x96);
    let mut net = Xag::new(3);
    let inputs = zero_arrival_inputs(&mut net, 3);
    let before = net.num_nodes();

    let outcome = engine.resynthesize(&mut net, &func, &inputs, 10).unwrap();
    assert_eq!(outcome, Outcome::NoChange);
    assert_eq!(engine.stats().instances, 0);
    assert_eq!(net.num_nodes(), before);
}

#[test]
fn every_three_var_function_is_reproduced() {
    let mut engine = Resynthesizer::new(ResynParams::default());
    for word in 0u64..256 {
        let func = TruthTable::from_word(3, word);
        let mut net = Xag::new(3);
        let inputs = zero_arrival_inputs(&mut net, 3);
        match engine.resynthesize(&mut net, &func, &inputs, 5).unwrap() {
            Outcome::Improved { signal, depth } => {
                assert!(
                    func.algebraic_degree() > Some(1),
                    "affine {:02x} improved",
                    word
                );
                assert!(depth < 5);
                assert_eq!(net.simulate(signal, 3), func, "function {:02x}", word);
            }
            Outcome::NoChange => {
                assert!(
                    func.algebraic_degree() <= Some(1),
                    "no implementation found for {:02x}",
                    word
                );
            }
        }
    }
}

#[test]
fn random_four_var_functions_are_reproduced() {
    // Any four-variable function fits three AND gates at depth at most
    // three, so a depth bound of 4 covers every sample. Pruning clauses keep
    // the refutations at the deeper fences tractable.
    let params = ResynParams {
        advanced_constraints: true,
        ..ResynParams::default()
    };
    let mut engine = Resynthesizer::new(params);
    let mut rng = StdRng::seed_from_u64(23);
    for _ in 0..12 {
        let word = rng.r#gen::<u64>() & 0xffff;
        let func = TruthTable::from_word(4, word);
        let mut net = Xag::new(4);
        let inputs = zero_arrival_inputs(&mut net, 4);
        match engine.resynthesize(&mut net, &func, &inputs, 4).unwrap() {
            Outcome::Improved { signal, depth } => {
                assert!(depth < 4);
                assert_eq!(net.simulate(signal, 4), func, "function {:04x}", word);
            }
            Outcome::NoChange => {
                assert!(
                    func.algebraic_degree() <= Some(1),
                    "no implementation found for {:04x}",
                    word
                );
            }
        }
    }
}

#[test]
fn late_input_forces_a_deeper_fence() {
    // f = !a & !b & !c is its own canonical representative, so the arrival
    // depths pass through the classifier untouched. With the last input
    // arriving at depth 2, a balanced depth-2 tree cannot consume it; the
    // best circuit chains it on top at overall depth 3.
    let func = TruthTable::from_word(3, 0x01);

    let mut engine = Resynthesizer::new(ResynParams::default());
    let mut net = Xag::new(3);
    let inputs = vec![(net.input(0), 0u32), (net.input(1), 0), (net.input(2), 2)];
    match engine.resynthesize(&mut net, &func, &inputs, 4).unwrap() {
        Outcome::Improved { signal, depth } => {
            assert_eq!(depth, 3);
            assert_eq!(net.simulate(signal, 3), func);
        }
        Outcome::NoChange => panic!("depth 3 is achievable"),
    }
    // The depth-2 attempts must have been refuted along the way.
    assert!(engine.stats().unsat >= 1);

    // And below the achievable depth, nothing is found.
    let mut engine = Resynthesizer::new(ResynParams::default());
    let mut net = Xag::new(3);
    let inputs = vec![(net.input(0), 0u32), (net.input(1), 0), (net.input(2), 2)];
    let outcome = engine.resynthesize(&mut net, &func, &inputs, 3).unwrap();
    assert_eq!(outcome, Outcome::NoChange);
}

#[test]
fn staggered_two_var_and() {
    let func = TruthTable::from_word(2, 0x8);
    let mut engine = Resynthesizer::new(ResynParams::default());
    let mut net = Xag::new(2);
    let inputs = vec![(net.input(0), 3u32), (net.input(1), 0)];
    match engine.resynthesize(&mut net, &func, &inputs, 5).unwrap() {
        Outcome::Improved { signal, depth } => {
            assert_eq!(depth, 4);
            assert_eq!(net.simulate(signal, 2), func);
        }
        Outcome::NoChange => panic!("a single AND at depth 4 suffices"),
    }
}

#[test]
fn repeated_queries_hit_the_cache() {
    let mut engine = Resynthesizer::new(ResynParams::default());
    let func = TruthTable::from_word(3, MAJ3);

    let mut net = Xag::new(3);
    let inputs = zero_arrival_inputs(&mut net, 3);
    let first = engine.resynthesize(&mut net, &func, &inputs, 2).unwrap();
    assert!(matches!(first, Outcome::Improved { .. }));
    let instances = engine.stats().instances;

    let mut net2 = Xag::new(3);
    let inputs2 = zero_arrival_inputs(&mut net2, 3);
    let second = engine.resynthesize(&mut net2, &func, &inputs2, 2).unwrap();
    assert!(matches!(second, Outcome::Improved { .. }));
    assert_eq!(engine.stats().instances, instances);
    assert_eq!(engine.stats().cache_hits, 1);
}

#[test]
fn cache_persists_across_engines() {
    let dir = tempfile::tempdir().unwrap();
    let func = TruthTable::from_word(3, MAJ3);

    {
        let mut engine = Resynthesizer::with_cache_paths(
            ResynParams::default(),
            CachePaths::in_dir(dir.path()),
        )
        .unwrap();
        let mut net = Xag::new(3);
        let inputs = zero_arrival_inputs(&mut net, 3);
        let outcome = engine.resynthesize(&mut net, &func, &inputs, 2).unwrap();
        assert!(matches!(outcome, Outcome::Improved { .. }));
        engine.flush_cache().unwrap();
    }

    let mut engine = Resynthesizer::with_cache_paths(
        ResynParams::default(),
        CachePaths::in_dir(dir.path()),
    )
    .unwrap();
    let mut net = Xag::new(3);
    let inputs = zero_arrival_inputs(&mut net, 3);
    match engine.resynthesize(&mut net, &func, &inputs, 2).unwrap() {
        Outcome::Improved { signal, depth } => {
            assert_eq!(depth, 1);
            assert_eq!(net.simulate(signal, 3), func);
        }
        Outcome::NoChange => panic!("persisted solution should be found"),
    }
    assert_eq!(engine.stats().instances, 0);
    assert_eq!(engine.stats().cache_hits, 1);
}

/// A solver that always gives up within its budget.
struct GiveUp {
    vars: u32,
}

impl SatSolve for GiveUp {
    fn new_var(&mut self) -> Lit {
        self.vars += 1;
        Lit::positive(self.vars - 1)
    }

    fn add_clause(&mut self, _lits: &[Lit]) {}

    fn solve(&mut self, _assumptions: &[Lit], _budget: u64) -> Result<SolveOutcome, Error> {
        Ok(SolveOutcome::BudgetExceeded)
    }

    fn value(&self, _lit: Lit) -> bool {
        false
    }
}

#[test]
fn budget_failures_block_smaller_budgets_only() {
    let dir = tempfile::tempdir().unwrap();
    let func = TruthTable::from_word(3, MAJ3);
    let limited = ResynParams {
        conflict_limit: 10,
        ..ResynParams::default()
    };

    // First pass gives up everywhere and records the failures.
    {
        let mut engine = Resynthesizer::with_cache_paths(
            limited.clone(),
            CachePaths::in_dir(dir.path()),
        )
        .unwrap()
        .with_solver_factory(Box::new(|| Box::new(GiveUp { vars: 0 })));
        let mut net = Xag::new(3);
        let inputs = zero_arrival_inputs(&mut net, 3);
        let outcome = engine.resynthesize(&mut net, &func, &inputs, 2).unwrap();
        assert_eq!(outcome, Outcome::NoChange);
        assert!(engine.stats().budget_exceeded >= 1);
        engine.flush_cache().unwrap();
    }

    // The same budget is blocked by the blacklist without touching a solver.
    {
        let mut engine = Resynthesizer::with_cache_paths(
            limited.clone(),
            CachePaths::in_dir(dir.path()),
        )
        .unwrap();
        let mut net = Xag::new(3);
        let inputs = zero_arrival_inputs(&mut net, 3);
        let outcome = engine.resynthesize(&mut net, &func, &inputs, 2).unwrap();
        assert_eq!(outcome, Outcome::NoChange);
        assert_eq!(engine.stats().instances, 0);
        assert!(engine.stats().blacklist_hits >= 1);
    }

    // A larger budget retries and succeeds.
    let roomier = ResynParams {
        conflict_limit: 100,
        ..ResynParams::default()
    };
    let mut engine =
        Resynthesizer::with_cache_paths(roomier, CachePaths::in_dir(dir.path())).unwrap();
    let mut net = Xag::new(3);
    let inputs = zero_arrival_inputs(&mut net, 3);
    match engine.resynthesize(&mut net, &func, &inputs, 2).unwrap() {
        Outcome::Improved { signal, .. } => {
            assert_eq!(net.simulate(signal, 3), func);
        }
        Outcome::NoChange => panic!("larger budget should retry the instance"),
    }
    assert!(engine.stats().instances >= 1);
}

#[test]
fn gate_count_objective_finds_minimum_ands() {
    let mut engine = Resynthesizer::new(ResynParams::default());

    // maj(a,b,c) needs exactly one AND.
    let maj3 = TruthTable::from_word(3, MAJ3);
    let mut net = Xag::new(3);
    let inputs: Vec<_> = (0..3).map(|i| net.input(i)).collect();
    let (signal, count) = engine
        .synthesize_min_gates(&mut net, &maj3, &inputs, 3)
        .unwrap()
        .expect("majority is realizable");
    assert_eq!(count, 1);
    assert_eq!(net.simulate(signal, 3), maj3);

    // and3 has degree 3, so two ANDs are both necessary and sufficient.
    let and3 = TruthTable::from_word(3, 0x80);
    let mut net = Xag::new(3);
    let inputs: Vec<_> = (0..3).map(|i| net.input(i)).collect();
    let (signal, count) = engine
        .synthesize_min_gates(&mut net, &and3, &inputs, 3)
        .unwrap()
        .expect("and3 is realizable");
    assert_eq!(count, 2);
    assert_eq!(net.simulate(signal, 3), and3);
}

#[test]
fn gate_count_objective_handles_affine_and_bounds() {
    let mut engine = Resynthesizer::new(ResynParams::default());

    // Parity is free of AND gates entirely.
    let parity = TruthTable::from_word(3, 0x96);
    let mut net = Xag::new(3);
    let inputs: Vec<_> = (0..3).map(|i| net.input(i)).collect();
    let (signal, count) = engine
        .synthesize_min_gates(&mut net, &parity, &inputs, 2)
        .unwrap()
        .expect("parity is affine");
    assert_eq!(count, 0);
    assert_eq!(net.simulate(signal, 3), parity);

    // A bound below the multiplicative complexity finds nothing.
    let and3 = TruthTable::from_word(3, 0x80);
    let mut net = Xag::new(3);
    let inputs: Vec<_> = (0..3).map(|i| net.input(i)).collect();
    let outcome = engine
        .synthesize_min_gates(&mut net, &and3, &inputs, 1)
        .unwrap();
    assert_eq!(outcome, None);
}

#[test]
fn gate_count_queries_hit_the_cache() {
    let mut engine = Resynthesizer::new(ResynParams::default());
    let maj3 = TruthTable::from_word(3, MAJ3);

    let mut net = Xag::new(3);
    let inputs: Vec<_> = (0..3).map(|i| net.input(i)).collect();
    let first = engine
        .synthesize_min_gates(&mut net, &maj3, &inputs, 3)
        .unwrap();
    assert!(first.is_some());
    let instances = engine.stats().instances;

    let mut net2 = Xag::new(3);
    let inputs2: Vec<_> = (0..3).map(|i| net2.input(i)).collect();
    let second = engine
        .synthesize_min_gates(&mut net2, &maj3, &inputs2, 3)
        .unwrap();
    assert!(second.is_some());
    assert_eq!(engine.stats().instances, instances);
    assert_eq!(engine.stats().cache_hits, 1);

    // The depth search keys are untouched by the gate-count entries.
    let mut net3 = Xag::new(3);
    let inputs3 = zero_arrival_inputs(&mut net3, 3);
    let depth_outcome = engine.resynthesize(&mut net3, &maj3, &inputs3, 2).unwrap();
    assert!(matches!(depth_outcome, Outcome::Improved { .. }));
    assert!(engine.stats().instances > instances);
}

#[test]
fn input_arity_mismatch_is_an_error() {
    let mut engine = Resynthesizer::new(ResynParams::default());
    let func = TruthTable::from_word(3, MAJ3);
    let mut net = Xag::new(3);
    let inputs = vec![(net.input(0), 0u32)];
    let err = engine
        .resynthesize(&mut net, &func, &inputs, 2)
        .unwrap_err();
    assert!(matches!(err, Error::InvariantViolation(_)));
}
