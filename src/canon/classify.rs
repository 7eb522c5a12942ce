// SPDX-License-Identifier: Apache-2.0

//! Bounded canonicalization of cut functions.
//!
//! Functions of up to four variables are classified under the full transform
//! vocabulary (permutation, input/output complement, linear input
//! combination, disjoint output XOR) by an exhaustive closure search: the
//! representative is the numerically smallest reachable table, and the
//! recorded transform sequence replays the function into it. Five- and
//! six-variable functions fall back to plain NPN enumeration, which always
//! terminates; the classes are coarser but equal representatives still imply
//! equivalence. Anything larger, or any search that exhausts its step budget,
//! is reported as unclassifiable, which callers treat as a normal negative
//! outcome.

use std::collections::{HashMap, VecDeque};

use crate::canon::transform::Transform;
use crate::tt::{MAX_WORD_VARS, TruthTable};

pub const DEFAULT_STEP_BUDGET: usize = 4_000_000;

/// Variable count above which closure search gives way to NPN enumeration.
const CLOSURE_MAX_VARS: u8 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    Canonical {
        repr: TruthTable,
        /// Applying these transforms in order maps the classified function to
        /// `repr`; being involutions, the reversed sequence maps back.
        ops: Vec<Transform>,
    },
    Unclassifiable,
}

pub struct Classifier {
    step_budget: usize,
    memo: HashMap<(u8, u64), Classified>,
}

impl Classifier {
    pub fn new(step_budget: usize) -> Self {
        Classifier {
            step_budget,
            memo: HashMap::new(),
        }
    }

    pub fn classify(&mut self, tt: &TruthTable) -> Classified {
        let Some(word) = tt.as_word() else {
            return Classified::Unclassifiable;
        };
        let k = tt.num_vars();
        if let Some(hit) = self.memo.get(&(k, word)) {
            return hit.clone();
        }
        let result = if k <= CLOSURE_MAX_VARS {
            closure_classify(word, k, self.step_budget)
        } else if k <= MAX_WORD_VARS {
            npn_classify(word, k, self.step_budget)
        } else {
            Classified::Unclassifiable
        };
        self.memo.insert((k, word), result.clone());
        result
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Classifier::new(DEFAULT_STEP_BUDGET)
    }
}

fn generators(k: u8) -> Vec<Transform> {
    let mut gens = vec![Transform::FlipOutput];
    for i in 0..k {
        gens.push(Transform::FlipVar(i));
        gens.push(Transform::DisjointXor(i));
        for j in 0..k {
            if i < j {
                gens.push(Transform::SwapVars(i, j));
            }
            if i != j {
                gens.push(Transform::LinearCombine(i, j));
            }
        }
    }
    gens
}

/// Exhaustive closure over the transform group, recording parent edges so the
/// path to the minimum can be replayed.
fn closure_classify(start: u64, k: u8, budget: usize) -> Classified {
    let gens = generators(k);
    // child word -> (parent word, transform taking parent to child)
    let mut parent: HashMap<u64, (u64, Transform)> = HashMap::new();
    parent.insert(start, (start, Transform::FlipOutput)); // sentinel entry
    let mut queue: VecDeque<u64> = VecDeque::new();
    queue.push_back(start);
    let mut steps = 0usize;

    while let Some(w) = queue.pop_front() {
        for &g in &gens {
            steps += 1;
            if steps > budget {
                return Classified::Unclassifiable;
            }
            let nw = g.apply_word(w, k);
            parent.entry(nw).or_insert_with(|| {
                queue.push_back(nw);
                (w, g)
            });
        }
    }

    let repr = parent.keys().copied().min().unwrap_or(start);
    let mut ops = Vec::new();
    let mut cursor = repr;
    while cursor != start {
        let (p, g) = parent[&cursor];
        ops.push(g);
        cursor = p;
    }
    ops.reverse();
    Classified::Canonical {
        repr: TruthTable::from_word(k, repr),
        ops,
    }
}

/// NPN canonicalization by full enumeration, emitting the winning transform
/// as a sequence of elementary ops (input complements, then swaps realizing
/// the permutation, then the output complement).
fn npn_classify(start: u64, k: u8, budget: usize) -> Classified {
    let mut best = start;
    let mut best_ops: Vec<Transform> = Vec::new();
    let mut steps = 0usize;

    let mut ops = Vec::with_capacity(k as usize * 2 + 1);
    for perm in permutations(k) {
        let swaps = perm_to_swaps(&perm);
        for neg_mask in 0u32..(1u32 << k) {
            for out_neg in [false, true] {
                ops.clear();
                for i in 0..k {
                    if (neg_mask >> i) & 1 == 1 {
                        ops.push(Transform::FlipVar(i));
                    }
                }
                ops.extend_from_slice(&swaps);
                if out_neg {
                    ops.push(Transform::FlipOutput);
                }

                steps += ops.len() + 1;
                if steps > budget {
                    return Classified::Unclassifiable;
                }
                let cand = ops.iter().fold(start, |w, op| op.apply_word(w, k));
                if cand < best {
                    best = cand;
                    best_ops = ops.clone();
                }
            }
        }
    }

    Classified::Canonical {
        repr: TruthTable::from_word(k, best),
        ops: best_ops,
    }
}

fn permutations(k: u8) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    let mut arr: Vec<u8> = (0..k).collect();
    permute_rec(&mut arr, 0, &mut out);
    out
}

fn permute_rec(arr: &mut Vec<u8>, pos: usize, out: &mut Vec<Vec<u8>>) {
    if pos == arr.len() {
        out.push(arr.clone());
        return;
    }
    for i in pos..arr.len() {
        arr.swap(pos, i);
        permute_rec(arr, pos + 1, out);
        arr.swap(pos, i);
    }
}

/// Decomposes a target arrangement into a sequence of `SwapVars` ops.
fn perm_to_swaps(perm: &[u8]) -> Vec<Transform> {
    let mut arr: Vec<u8> = (0..perm.len() as u8).collect();
    let mut swaps = Vec::new();
    for i in 0..perm.len() {
        let j = arr[i..].iter().position(|&v| v == perm[i]).map(|p| p + i);
        if let Some(j) = j {
            if j != i {
                arr.swap(i, j);
                swaps.push(Transform::SwapVars(i as u8, j as u8));
            }
        }
    }
    swaps
}
