// SPDX-License-Identifier: Apache-2.0

//! Thin boundary between the encoder and the SAT backend.
//!
//! The encoder and driver only speak [`SatSolve`]; the default backend is
//! varisat. Keeping the trait small makes instances testable against stub
//! solvers, including the budget-exhaustion path that varisat itself cannot
//! produce.

use std::collections::HashSet;

use varisat::ExtendFormula;

use crate::error::Error;

/// A literal in DIMACS convention: variable index plus one, negative when
/// complemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lit(i32);

impl Lit {
    /// The positive literal of variable `var` (zero-based).
    pub fn positive(var: u32) -> Lit {
        Lit(var as i32 + 1)
    }

    pub fn var(self) -> u32 {
        (self.0.unsigned_abs()) - 1
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl std::ops::Not for Lit {
    type Output = Lit;

    fn not(self) -> Lit {
        Lit(-self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveOutcome {
    Sat,
    Unsat,
    /// The solver gave up within the conflict budget without an answer.
    BudgetExceeded,
}

pub trait SatSolve {
    /// Allocates a fresh variable, returned as its positive literal.
    fn new_var(&mut self) -> Lit;

    fn add_clause(&mut self, lits: &[Lit]);

    /// Solves under `assumptions`. A `conflict_budget` of zero means
    /// unbounded.
    fn solve(&mut self, assumptions: &[Lit], conflict_budget: u64) -> Result<SolveOutcome, Error>;

    /// Model value of a literal; only meaningful after a `Sat` outcome.
    fn value(&self, lit: Lit) -> bool;
}

/// [`SatSolve`] over `varisat`. varisat exposes no conflict-limit interface,
/// so the budget is advisory here: this adapter never reports
/// `BudgetExceeded` on its own.
pub struct VarisatAdapter {
    solver: varisat::Solver<'static>,
    lits: Vec<varisat::Lit>,
    model: HashSet<varisat::Lit>,
}

impl VarisatAdapter {
    pub fn new() -> Self {
        VarisatAdapter {
            solver: varisat::Solver::new(),
            lits: Vec::new(),
            model: HashSet::new(),
        }
    }

    fn to_backend(&self, lit: Lit) -> varisat::Lit {
        let base = self.lits[lit.var() as usize];
        if lit.is_negative() { !base } else { base }
    }
}

impl Default for VarisatAdapter {
    fn default() -> Self {
        VarisatAdapter::new()
    }
}

impl SatSolve for VarisatAdapter {
    fn new_var(&mut self) -> Lit {
        let backend = self.solver.new_lit();
        self.lits.push(backend);
        Lit(self.lits.len() as i32)
    }

    fn add_clause(&mut self, lits: &[Lit]) {
        let mapped: Vec<varisat::Lit> = lits.iter().map(|&l| self.to_backend(l)).collect();
        self.solver.add_clause(&mapped);
    }

    fn solve(&mut self, assumptions: &[Lit], _conflict_budget: u64) -> Result<SolveOutcome, Error> {
        let mapped: Vec<varisat::Lit> = assumptions.iter().map(|&l| self.to_backend(l)).collect();
        self.solver.assume(&mapped);
        match self.solver.solve() {
            Ok(true) => {
                self.model = self
                    .solver
                    .model()
                    .map(|m| m.into_iter().collect())
                    .unwrap_or_default();
                Ok(SolveOutcome::Sat)
            }
            Ok(false) => Ok(SolveOutcome::Unsat),
            Err(e) => Err(Error::Solver(format!("{}", e))),
        }
    }

    fn value(&self, lit: Lit) -> bool {
        let backend = self.lits[lit.var() as usize];
        let positive = self.model.contains(&backend);
        positive != lit.is_negative()
    }
}
