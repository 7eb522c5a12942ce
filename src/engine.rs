// SPDX-License-Identifier: Apache-2.0

//! The resynthesis driver.
//!
//! One call answers one question: can this cut function, with these input
//! arrival depths, be realized at a multiplicative depth below the current
//! one? The flow is: classify the function, carry the arrival depths into
//! canonical variable space, bound the multiplicative complexity, schedule
//! every admissible fence, then walk target depths upward. At each depth,
//! each candidate fence is resolved through the cache, the blacklist, or the
//! SAT solver; the first satisfiable instance wins, is verified by
//! simulation, recorded, and replayed through the inverse transform into the
//! caller's network.
//!
//! All negative outcomes (unclassifiable function, no admissible fence,
//! search exhaustion) are `NoChange`, never errors.

use std::time::{Duration, Instant};

use log::{debug, info};

use crate::cache::{
    CacheKey, CacheLookup, CachePaths, FailureKind, HOST_INPUTS, SynthesisCache,
};
use crate::canon::{Classified, Classifier, Transform, transform_arrivals};
use crate::encode::{EncodeOptions, Instance, encode, encode_min_gates};
use crate::error::Error;
use crate::fence::{AND_FENCES, AndFence};
use crate::mc::{DegreeBound, McOracle};
use crate::network::{NetworkBuilder, splice_cone};
use crate::schedule::{FenceState, derive_signature};
use crate::solver::{SatSolve, SolveOutcome, VarisatAdapter};
use crate::tt::TruthTable;
use crate::xag::Signal;

#[derive(Debug, Clone)]
pub struct ResynParams {
    /// Conflict budget per instance; zero means unbounded.
    pub conflict_limit: u64,
    /// Enables the pruning clauses in the encoder.
    pub advanced_constraints: bool,
    /// Re-simulates every freshly extracted solution against the
    /// representative; a mismatch is an invariant violation.
    pub verify_solutions: bool,
    /// Step budget for the classifier.
    pub classify_budget: usize,
}

impl Default for ResynParams {
    fn default() -> Self {
        ResynParams {
            conflict_limit: 0,
            advanced_constraints: false,
            verify_solutions: true,
            classify_budget: crate::canon::DEFAULT_STEP_BUDGET,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ResynStats {
    pub instances: u64,
    pub sat: u64,
    pub unsat: u64,
    pub budget_exceeded: u64,
    pub cache_hits: u64,
    pub blacklist_hits: u64,
    pub unclassifiable: u64,
    pub time_classify: Duration,
    pub time_solving: Duration,
}

impl std::fmt::Display for ResynStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "[i] solving time   = {:>5.2} secs", self.time_solving.as_secs_f64())?;
        writeln!(f, "[i] classify time  = {:>5.2} secs", self.time_classify.as_secs_f64())?;
        writeln!(
            f,
            "[i] instances      = {} ({} sat, {} unsat, {} budget)",
            self.instances, self.sat, self.unsat, self.budget_exceeded
        )?;
        write!(
            f,
            "[i] cache          = {} hits, {} blacklist hits",
            self.cache_hits, self.blacklist_hits
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<S> {
    /// No implementation below the current depth was found.
    NoChange,
    /// A better implementation was spliced into the caller's network.
    Improved { signal: S, depth: u32 },
}

pub type SolverFactory = Box<dyn FnMut() -> Box<dyn SatSolve>>;

pub struct Resynthesizer {
    params: ResynParams,
    stats: ResynStats,
    classifier: Classifier,
    cache: SynthesisCache,
    mc_oracle: Box<dyn McOracle>,
    solver_factory: SolverFactory,
}

impl Resynthesizer {
    pub fn new(params: ResynParams) -> Self {
        let classify_budget = params.classify_budget;
        Resynthesizer {
            params,
            stats: ResynStats::default(),
            classifier: Classifier::new(classify_budget),
            cache: SynthesisCache::new(),
            mc_oracle: Box::new(DegreeBound),
            solver_factory: Box::new(|| Box::new(VarisatAdapter::new())),
        }
    }

    /// Like [`new`](Self::new), with the cache persisted at `paths`.
    pub fn with_cache_paths(params: ResynParams, paths: CachePaths) -> Result<Self, Error> {
        let mut engine = Resynthesizer::new(params);
        engine.cache = SynthesisCache::load(paths)?;
        Ok(engine)
    }

    pub fn with_mc_oracle(mut self, oracle: Box<dyn McOracle>) -> Self {
        self.mc_oracle = oracle;
        self
    }

    pub fn with_solver_factory(mut self, factory: SolverFactory) -> Self {
        self.solver_factory = factory;
        self
    }

    pub fn stats(&self) -> &ResynStats {
        &self.stats
    }

    /// Flushes the persistent cache now instead of at drop time.
    pub fn flush_cache(&mut self) -> Result<(), Error> {
        self.cache.save()
    }

    /// Attempts to re-synthesize `func` below `current_depth`. `inputs`
    /// pairs each function variable with its caller-side signal and arrival
    /// depth. On improvement the new cone has been built through `net`.
    pub fn resynthesize<N: NetworkBuilder>(
        &mut self,
        net: &mut N,
        func: &TruthTable,
        inputs: &[(N::Signal, u32)],
        current_depth: u32,
    ) -> Result<Outcome<N::Signal>, Error> {
        if inputs.len() != func.num_vars() as usize {
            return Err(Error::InvariantViolation(format!(
                "{} inputs for a {}-variable function",
                inputs.len(),
                func.num_vars()
            )));
        }

        let t_classify = Instant::now();
        let classified = self.classifier.classify(func);
        self.stats.time_classify += t_classify.elapsed();
        let Classified::Canonical { repr, ops } = classified else {
            self.stats.unclassifiable += 1;
            return Ok(Outcome::NoChange);
        };
        // Classifiable implies word-backed.
        let repr_word = repr.as_word().ok_or_else(|| {
            Error::InvariantViolation("canonical representative is not word-backed".to_string())
        })?;

        let Some(mc_bound) = self.mc_oracle.mc_lower_bound(&repr) else {
            self.stats.unclassifiable += 1;
            return Ok(Outcome::NoChange);
        };
        if mc_bound == 0 {
            // Affine functions carry no AND gates; nothing to optimize.
            return Ok(Outcome::NoChange);
        }

        let n = func.num_vars() as usize;
        let sigs: Vec<N::Signal> = inputs.iter().map(|(s, _)| *s).collect();
        let mut arrivals: Vec<u32> = inputs.iter().map(|(_, d)| *d).collect();
        transform_arrivals(&mut arrivals, &ops);

        // Arrival-sorted slot order (stable, so ties keep variable order).
        let mut slot_to_var: Vec<usize> = (0..n).collect();
        slot_to_var.sort_by_key(|&i| arrivals[i]);
        let arr_sorted: Vec<u32> = slot_to_var.iter().map(|&i| arrivals[i]).collect();

        let mut states: Vec<(&'static AndFence, Option<FenceState>)> = AND_FENCES
            .iter()
            .map(|fence| {
                if fence.mc < mc_bound {
                    (fence, None)
                } else {
                    (fence, Some(FenceState::init(fence, &arr_sorted)))
                }
            })
            .collect();

        let Some(mut md) = states
            .iter()
            .filter_map(|(_, s)| s.as_ref().map(|s| s.md_expected))
            .min()
        else {
            return Ok(Outcome::NoChange);
        };
        if md >= current_depth {
            return Ok(Outcome::NoChange);
        }
        debug!(
            "resynthesizing {} ({} vars, repr {:x}, mc >= {}) below depth {}",
            func,
            n,
            repr_word,
            mc_bound,
            current_depth
        );

        loop {
            for (fence, slot) in states.iter_mut() {
                let Some(state) = slot else { continue };
                if state.md_expected != md {
                    continue;
                }

                let sig_sorted = derive_signature(&arr_sorted, &state.schedule);
                let mut signature = vec![0u8; crate::cache::SIGNATURE_TAG_LEN + n];
                signature[0] = fence.mc;
                signature[1] = fence.md;
                let mut schedule = vec![0u8; n];
                for (slot_idx, &var) in slot_to_var.iter().enumerate() {
                    signature[crate::cache::SIGNATURE_TAG_LEN + var] = sig_sorted[slot_idx];
                    schedule[var] = state.schedule[slot_idx];
                }
                let key = CacheKey {
                    num_vars: func.num_vars(),
                    repr: repr_word,
                    signature,
                };

                match self.cache.lookup(&key, self.params.conflict_limit) {
                    CacheLookup::Hit(host_sig) => {
                        self.stats.cache_hits += 1;
                        debug!("cache hit at depth {}", md);
                        let out = replay_transforms(&self.cache, net, &sigs, &ops, host_sig);
                        return Ok(Outcome::Improved { signal: out, depth: md });
                    }
                    CacheLookup::Blacklisted => {
                        self.stats.blacklist_hits += 1;
                    }
                    CacheLookup::Miss => {
                        let outcome = self.solve_instance(&repr, fence, &schedule, &key)?;
                        if let Some(host_sig) = outcome {
                            info!("improved to depth {} using fence {:?}", md, fence.levels);
                            let out =
                                replay_transforms(&self.cache, net, &sigs, &ops, host_sig);
                            return Ok(Outcome::Improved { signal: out, depth: md });
                        }
                    }
                }

                if !state.advance() {
                    *slot = None;
                }
            }

            md += 1;
            if md >= current_depth {
                return Ok(Outcome::NoChange);
            }
            if states.iter().all(|(_, s)| s.is_none()) {
                return Ok(Outcome::NoChange);
            }
        }
    }

    /// Finds an implementation of `func` with the fewest AND gates, trying
    /// counts upward from the multiplicative-complexity bound to `max_gates`
    /// inclusive. XOR gates are free under this objective; the AND count is
    /// what sets the T-gate cost of the circuit in fault-tolerant
    /// arithmetic. Depth plays no role, so there is no arrival or fence
    /// machinery: each count is one fence-free instance, resolved through
    /// the same cache, blacklist, and solver path as the depth search.
    ///
    /// Returns the spliced signal and its AND count, or `None` when no
    /// implementation within the bound was found. Affine functions come back
    /// with a count of zero.
    pub fn synthesize_min_gates<N: NetworkBuilder>(
        &mut self,
        net: &mut N,
        func: &TruthTable,
        inputs: &[N::Signal],
        max_gates: u8,
    ) -> Result<Option<(N::Signal, u8)>, Error> {
        if inputs.len() != func.num_vars() as usize {
            return Err(Error::InvariantViolation(format!(
                "{} inputs for a {}-variable function",
                inputs.len(),
                func.num_vars()
            )));
        }

        let t_classify = Instant::now();
        let classified = self.classifier.classify(func);
        self.stats.time_classify += t_classify.elapsed();
        let Classified::Canonical { repr, ops } = classified else {
            self.stats.unclassifiable += 1;
            return Ok(None);
        };
        let repr_word = repr.as_word().ok_or_else(|| {
            Error::InvariantViolation("canonical representative is not word-backed".to_string())
        })?;
        let Some(mc_bound) = self.mc_oracle.mc_lower_bound(&repr) else {
            self.stats.unclassifiable += 1;
            return Ok(None);
        };

        let n = func.num_vars() as usize;
        debug!(
            "minimizing AND count of {} ({} vars, repr {:x}, mc >= {})",
            func, n, repr_word, mc_bound
        );

        for count in mc_bound..=max_gates {
            // Gate-count keys carry the count in the first tag byte and zero
            // everywhere else; depth keys always have a nonzero second tag
            // byte (the fence depth), so the two key families never collide.
            let mut signature = vec![0u8; crate::cache::SIGNATURE_TAG_LEN + n];
            signature[0] = count;
            let key = CacheKey {
                num_vars: func.num_vars(),
                repr: repr_word,
                signature,
            };

            match self.cache.lookup(&key, self.params.conflict_limit) {
                CacheLookup::Hit(host_sig) => {
                    self.stats.cache_hits += 1;
                    debug!("cache hit at {} AND gates", count);
                    let out = replay_transforms(&self.cache, net, inputs, &ops, host_sig);
                    return Ok(Some((out, count)));
                }
                CacheLookup::Blacklisted => {
                    self.stats.blacklist_hits += 1;
                }
                CacheLookup::Miss => {
                    let mut solver = (self.solver_factory)();
                    let instance = encode_min_gates(
                        solver.as_mut(),
                        &repr,
                        count as usize,
                        &EncodeOptions {
                            advanced_constraints: self.params.advanced_constraints,
                        },
                    )?;
                    if let Some(host_sig) = self.run_instance(&repr, solver, instance, &key)? {
                        info!("realized with {} AND gates", count);
                        let out = replay_transforms(&self.cache, net, inputs, &ops, host_sig);
                        return Ok(Some((out, count)));
                    }
                }
            }
        }
        Ok(None)
    }

    /// Encodes and solves one fence instance.
    fn solve_instance(
        &mut self,
        repr: &TruthTable,
        fence: &AndFence,
        schedule: &[u8],
        key: &CacheKey,
    ) -> Result<Option<Signal>, Error> {
        let mut solver = (self.solver_factory)();
        let instance = encode(
            solver.as_mut(),
            repr,
            fence,
            schedule,
            &EncodeOptions {
                advanced_constraints: self.params.advanced_constraints,
            },
        )?;
        self.run_instance(repr, solver, instance, key)
    }

    /// Solves an already-encoded instance; on SAT the solution is extracted
    /// into the host, verified, and cached.
    fn run_instance(
        &mut self,
        repr: &TruthTable,
        mut solver: Box<dyn SatSolve>,
        instance: Instance,
        key: &CacheKey,
    ) -> Result<Option<Signal>, Error> {
        self.stats.instances += 1;
        let t_solve = Instant::now();
        let result = solver.solve(&instance.assumptions, self.params.conflict_limit);
        self.stats.time_solving += t_solve.elapsed();
        match result? {
            SolveOutcome::Sat => {
                self.stats.sat += 1;
                let host_sig = self.extract_into_host(solver.as_ref(), &instance);
                if self.params.verify_solutions {
                    let got = self.cache.host().simulate(host_sig, repr.num_vars());
                    if got != *repr {
                        return Err(Error::InvariantViolation(format!(
                            "extracted circuit implements {} instead of {}",
                            got, repr
                        )));
                    }
                }
                self.cache.record_solution(key, host_sig);
                Ok(Some(host_sig))
            }
            SolveOutcome::Unsat => {
                self.stats.unsat += 1;
                self.cache.record_failure(key, FailureKind::Unsat);
                Ok(None)
            }
            SolveOutcome::BudgetExceeded => {
                self.stats.budget_exceeded += 1;
                self.cache.record_failure(
                    key,
                    FailureKind::BudgetExceeded(self.params.conflict_limit),
                );
                Ok(None)
            }
        }
    }

    /// Rebuilds the model's circuit inside the cache host, one XOR side at a
    /// time, and returns the output signal (polarity included).
    fn extract_into_host(&mut self, solver: &dyn SatSolve, instance: &Instance) -> Signal {
        let host = self.cache.host_mut();
        let mut nodes: Vec<Signal> = (0..instance.num_vars).map(|i| host.input(i)).collect();
        for g in 0..instance.num_gates {
            let left = selected_xor(host, solver, &instance.sel[2 * g], &nodes);
            let right = selected_xor(host, solver, &instance.sel[2 * g + 1], &nodes);
            let out = host.and(left, right);
            nodes.push(out);
        }
        let po = selected_xor(host, solver, &instance.sel[2 * instance.num_gates], &nodes);
        if instance.invert { !po } else { po }
    }
}

fn selected_xor(
    host: &mut crate::xag::Xag,
    solver: &dyn SatSolve,
    row: &[crate::solver::Lit],
    nodes: &[Signal],
) -> Signal {
    let picked: Vec<Signal> = row
        .iter()
        .enumerate()
        .filter(|&(_, &l)| solver.value(l))
        .map(|(j, _)| nodes[j])
        .collect();
    host.nary_xor(&picked)
}

/// Replays the classifier's transform sequence forward over the caller's
/// input signals, then splices the canonical cone through them.
///
/// With `f = t1(t2(...tm(repr)))`, walking `t1..tm` over the signal vector
/// builds exactly the inputs the canonical circuit must see: swaps permute,
/// input complements negate, linear combinations insert an XOR; disjoint
/// output XORs and output complements are folded into the result.
fn replay_transforms<N: NetworkBuilder>(
    cache: &SynthesisCache,
    net: &mut N,
    inputs: &[N::Signal],
    ops: &[Transform],
    host_sig: Signal,
) -> N::Signal {
    let mut vars: Vec<N::Signal> = inputs.to_vec();
    let mut xor_terms: Vec<N::Signal> = Vec::new();
    let mut out_negated = false;

    for op in ops {
        match *op {
            Transform::SwapVars(i, j) => vars.swap(i as usize, j as usize),
            Transform::FlipVar(i) => {
                vars[i as usize] = net.create_not(vars[i as usize]);
            }
            Transform::LinearCombine(i, j) => {
                vars[i as usize] = net.create_xor(vars[i as usize], vars[j as usize]);
            }
            Transform::DisjointXor(i) => xor_terms.push(vars[i as usize]),
            Transform::FlipOutput => out_negated = !out_negated,
        }
    }

    // The canonical cone only references the first `num_vars` host inputs;
    // pad the rest with constants.
    let mut leaves = vars.clone();
    while leaves.len() < HOST_INPUTS as usize {
        leaves.push(net.constant(false));
    }
    let mut out = splice_cone(cache.host(), host_sig, &leaves, net);
    for term in xor_terms {
        out = net.create_xor(out, term);
    }
    if out_negated {
        out = net.create_not(out);
    }
    out
}
