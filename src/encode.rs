// SPDX-License-Identifier: Apache-2.0

//! CNF encoding of a single exact-synthesis instance.
//!
//! An instance asks: can `func` be realized by a given AND-gate arrangement?
//! Each AND gate has two fanin sides; each side is an XOR (linear
//! combination) over the inputs and the gates it may see, chosen by one
//! selection variable per candidate signal. Function consistency is encoded
//! per truth-table bit with Tseitin AND/XOR clauses; the output side's value
//! per bit is returned as an assumption literal so one solver can in
//! principle be reused across polarities.
//!
//! Two instance shapes share that core. [`encode`] places the gates on a
//! fence: a gate at level `d` sees the inputs and the gates strictly below
//! `d`, subject to structural and schedule clauses. [`encode_min_gates`] is
//! fence-free: gate `g` sees the inputs and gates `0..g`, with no depth or
//! schedule constraints, which is the shape the gate-count objective needs.
//!
//! Bit 0 is skipped: the function is normalized so the all-zero assignment
//! maps to 0 (tracked by `invert`), and every side evaluates to 0 there by
//! construction.

use crate::error::Error;
use crate::fence::AndFence;
use crate::solver::{Lit, SatSolve};
use crate::tt::TruthTable;

#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeOptions {
    /// Adds satisfiability-preserving pruning clauses (no empty side, no
    /// subset side, no useless signal, lexicographic side ordering).
    pub advanced_constraints: bool,
}

/// A truth value during encoding: either settled or a solver literal.
#[derive(Debug, Clone, Copy)]
enum Tv {
    Const(bool),
    Lit(Lit),
}

pub struct Instance {
    pub num_vars: u8,
    pub num_gates: usize,
    /// Selection literals: rows `2g`/`2g+1` are gate `g`'s sides, the last
    /// row is the output side. Row `r` has one literal per candidate signal.
    pub sel: Vec<Vec<Lit>>,
    /// Assumption literals forcing the output bits; pass these to `solve`.
    pub assumptions: Vec<Lit>,
    /// Whether the synthesized output must be complemented to produce the
    /// original function.
    pub invert: bool,
}

/// Tseitin clauses for `out <-> a & b`.
fn tseitin_and(solver: &mut dyn SatSolve, a: Lit, b: Lit, out: Lit) {
    solver.add_clause(&[!a, !b, out]);
    solver.add_clause(&[a, !out]);
    solver.add_clause(&[b, !out]);
}

/// Tseitin clauses for `out <-> a ^ b`.
fn tseitin_xor(solver: &mut dyn SatSolve, a: Lit, b: Lit, out: Lit) {
    solver.add_clause(&[!a, !b, !out]);
    solver.add_clause(&[a, b, !out]);
    solver.add_clause(&[a, !b, out]);
    solver.add_clause(&[!a, b, out]);
}

fn tv_and(solver: &mut dyn SatSolve, a: Tv, b: Tv) -> Tv {
    match (a, b) {
        (Tv::Const(false), _) | (_, Tv::Const(false)) => Tv::Const(false),
        (Tv::Const(true), other) | (other, Tv::Const(true)) => other,
        (Tv::Lit(la), Tv::Lit(lb)) => {
            let out = solver.new_var();
            tseitin_and(solver, la, lb, out);
            Tv::Lit(out)
        }
    }
}

/// XOR-folds `lits` with a constant `parity` folded into the polarity.
fn xor_fold(solver: &mut dyn SatSolve, lits: &[Lit], parity: bool) -> Tv {
    let Some((&first, rest)) = lits.split_first() else {
        return Tv::Const(parity);
    };
    let mut acc = first;
    for &l in rest {
        let out = solver.new_var();
        tseitin_xor(solver, acc, l, out);
        acc = out;
    }
    Tv::Lit(if parity { !acc } else { acc })
}

/// A fresh literal equivalent to `a == b`.
fn eq_lit(solver: &mut dyn SatSolve, a: Lit, b: Lit) -> Lit {
    let x = solver.new_var();
    tseitin_xor(solver, a, b, x);
    !x
}

/// The value of one fanin side at one truth bit: the XOR of every selected
/// candidate's truth value.
fn side_value(solver: &mut dyn SatSolve, row: &[Lit], truth: &[Tv]) -> Tv {
    let mut parity = false;
    let mut lits = Vec::new();
    for (j, &s) in row.iter().enumerate() {
        match truth[j] {
            Tv::Const(false) => {}
            Tv::Const(true) => lits.push(s),
            Tv::Lit(t) => match tv_and(solver, Tv::Lit(s), Tv::Lit(t)) {
                Tv::Lit(l) => lits.push(l),
                Tv::Const(c) => parity ^= c,
            },
        }
    }
    xor_fold(solver, &lits, parity)
}

/// Function consistency, one truth bit at a time, over any selection-row
/// layout. Returns the output assumption literals.
fn add_function_clauses(
    solver: &mut dyn SatSolve,
    sel: &[Vec<Lit>],
    normal: &TruthTable,
) -> Vec<Lit> {
    let n = normal.num_vars() as usize;
    let num_gates = (sel.len() - 1) / 2;
    let mut assumptions = Vec::with_capacity(normal.num_bits() - 1);
    for b in 1..normal.num_bits() {
        // Truth values of candidate signals at this bit; inputs are
        // constants, gates get filled in below.
        let mut truth: Vec<Tv> = (0..n).map(|j| Tv::Const((b >> j) & 1 == 1)).collect();

        for g in 0..num_gates {
            let left = side_value(solver, &sel[2 * g], &truth);
            let right = side_value(solver, &sel[2 * g + 1], &truth);
            truth.push(tv_and(solver, left, right));
        }

        let target = normal.get_bit(b);
        match side_value(solver, &sel[2 * num_gates], &truth) {
            Tv::Lit(po) => assumptions.push(if target { po } else { !po }),
            Tv::Const(c) => {
                if c != target {
                    // No assignment can fix a settled mismatch.
                    solver.add_clause(&[]);
                }
            }
        }
    }
    assumptions
}

fn add_pruning_clauses(solver: &mut dyn SatSolve, sel: &[Vec<Lit>], normal: &TruthTable) {
    let num_gates = (sel.len() - 1) / 2;
    add_no_useless_signal(solver, sel, normal);
    add_no_empty_side(solver, sel);
    add_no_subset_side(solver, sel, num_gates);
    add_side_ordering(solver, sel, num_gates);
}

/// Encodes a fence instance: can `func` be realized by `fence` under
/// `schedule`?
pub fn encode(
    solver: &mut dyn SatSolve,
    func: &TruthTable,
    fence: &AndFence,
    schedule: &[u8],
    options: &EncodeOptions,
) -> Result<Instance, Error> {
    let num_vars = func.num_vars();
    let n = num_vars as usize;
    let num_gates = fence.total_gates();
    if schedule.len() != n {
        return Err(Error::InvariantViolation(format!(
            "schedule has {} slots for {} variables",
            schedule.len(),
            n
        )));
    }
    if schedule.iter().any(|&s| s > fence.md) {
        return Err(Error::InvariantViolation(
            "schedule level exceeds fence depth".to_string(),
        ));
    }

    let invert = func.get_bit(0);
    let normal = if invert { func.invert() } else { func.clone() };

    // Per-gate fence levels and candidate-signal counts.
    let mut level_of_gate = Vec::with_capacity(num_gates);
    for (d, &count) in fence.levels.iter().enumerate() {
        for _ in 0..count {
            level_of_gate.push(d as u8);
        }
    }

    // Selection variables: gates first (in fence order), output side last.
    let mut sel: Vec<Vec<Lit>> = Vec::with_capacity(2 * num_gates + 1);
    for g in 0..num_gates {
        let len = n + fence.gates_below(level_of_gate[g]);
        for _ in 0..2 {
            sel.push((0..len).map(|_| solver.new_var()).collect());
        }
    }
    sel.push((0..n + num_gates).map(|_| solver.new_var()).collect());

    let assumptions = add_function_clauses(solver, &sel, &normal);

    // Structure: every gate above the bottom level uses at least one gate
    // from the level directly beneath it.
    for g in 0..num_gates {
        let d = level_of_gate[g];
        if d == 0 {
            continue;
        }
        let lo = n + fence.gates_below(d - 1);
        let hi = n + fence.gates_below(d);
        let mut clause = Vec::with_capacity(2 * (hi - lo));
        clause.extend_from_slice(&sel[2 * g][lo..hi]);
        clause.extend_from_slice(&sel[2 * g + 1][lo..hi]);
        solver.add_clause(&clause);
    }

    // Schedule: a variable stays unused below its availability level.
    for (j, &avail) in schedule.iter().enumerate() {
        for g in 0..num_gates {
            if level_of_gate[g] < avail {
                solver.add_clause(&[!sel[2 * g][j]]);
                solver.add_clause(&[!sel[2 * g + 1][j]]);
            }
        }
    }

    if options.advanced_constraints {
        add_pruning_clauses(solver, &sel, &normal);
    }

    Ok(Instance {
        num_vars,
        num_gates,
        sel,
        assumptions,
        invert,
    })
}

/// Encodes a fence-free instance: can `func` be realized with exactly
/// `num_gates` AND gates in some topological order? Gate `g` sees the inputs
/// and gates `0..g`; depth plays no role. With zero gates the output side is
/// a plain XOR over the inputs, so affine functions are in range too.
pub fn encode_min_gates(
    solver: &mut dyn SatSolve,
    func: &TruthTable,
    num_gates: usize,
    options: &EncodeOptions,
) -> Result<Instance, Error> {
    let num_vars = func.num_vars();
    let n = num_vars as usize;

    let invert = func.get_bit(0);
    let normal = if invert { func.invert() } else { func.clone() };

    let mut sel: Vec<Vec<Lit>> = Vec::with_capacity(2 * num_gates + 1);
    for g in 0..num_gates {
        for _ in 0..2 {
            sel.push((0..n + g).map(|_| solver.new_var()).collect());
        }
    }
    sel.push((0..n + num_gates).map(|_| solver.new_var()).collect());

    let assumptions = add_function_clauses(solver, &sel, &normal);

    // The normalized constant function is realized by the empty output side,
    // which the no-empty-side clause would refute.
    if options.advanced_constraints && normal.count_ones() != 0 {
        add_pruning_clauses(solver, &sel, &normal);
    }

    Ok(Instance {
        num_vars,
        num_gates,
        sel,
        assumptions,
        invert,
    })
}

/// Every signal the function depends on appears in some side.
fn add_no_useless_signal(solver: &mut dyn SatSolve, sel: &[Vec<Lit>], normal: &TruthTable) {
    let n = normal.num_vars() as usize;
    let num_signals = n + (sel.len() - 1) / 2;
    for j in 0..num_signals {
        if j < n && !normal.depends_on(j as u8) {
            continue;
        }
        let clause: Vec<Lit> = sel
            .iter()
            .filter(|row| j < row.len())
            .map(|row| row[j])
            .collect();
        solver.add_clause(&clause);
    }
}

fn add_no_empty_side(solver: &mut dyn SatSolve, sel: &[Vec<Lit>]) {
    for row in sel {
        solver.add_clause(row);
    }
}

/// Neither side of a gate selects a subset of the other.
fn add_no_subset_side(solver: &mut dyn SatSolve, sel: &[Vec<Lit>], num_gates: usize) {
    for g in 0..num_gates {
        let (left, right) = (&sel[2 * g], &sel[2 * g + 1]);
        let mut only_left = Vec::with_capacity(left.len());
        let mut only_right = Vec::with_capacity(left.len());
        for j in 0..left.len() {
            let a = solver.new_var();
            tseitin_and(solver, left[j], !right[j], a);
            only_left.push(a);
            let b = solver.new_var();
            tseitin_and(solver, !left[j], right[j], b);
            only_right.push(b);
        }
        solver.add_clause(&only_left);
        solver.add_clause(&only_right);
    }
}

/// Symmetry breaking: the left side is lexicographically no greater than the
/// right one, with the lowest signal index as the most significant position.
fn add_side_ordering(solver: &mut dyn SatSolve, sel: &[Vec<Lit>], num_gates: usize) {
    for g in 0..num_gates {
        let (left, right) = (&sel[2 * g], &sel[2 * g + 1]);
        let len = left.len();
        solver.add_clause(&[!left[0], right[0]]);
        if len == 1 {
            continue;
        }
        let mut eq_prefix = eq_lit(solver, left[0], right[0]);
        for j in 1..len {
            solver.add_clause(&[!eq_prefix, !left[j], right[j]]);
            if j + 1 < len {
                let eq_here = eq_lit(solver, left[j], right[j]);
                let next = solver.new_var();
                tseitin_and(solver, eq_prefix, eq_here, next);
                eq_prefix = next;
            }
        }
    }
}
