// SPDX-License-Identifier: Apache-2.0

//! The transform vocabulary under which functions are classified.
//!
//! Every transform is an involution on truth tables, so a sequence inverts to
//! itself in reverse order. `SwapVars`/`FlipVar`/`FlipOutput` generate the
//! NPN group; `LinearCombine` and `DisjointXor` extend it with the XOR-free
//! operations of an XAG.

use crate::tt::TruthTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Exchange variables `i` and `j`.
    SwapVars(u8, u8),
    /// Complement variable `i`.
    FlipVar(u8),
    /// Complement the output.
    FlipOutput,
    /// Substitute `x_i` with `x_i ^ x_j` (`i != j`).
    LinearCombine(u8, u8),
    /// XOR variable `i` into the output.
    DisjointXor(u8),
}

impl Transform {
    /// Index of the assignment whose function value lands at assignment `x`.
    fn source_index(&self, x: usize) -> usize {
        match *self {
            Transform::SwapVars(i, j) => {
                let bi = (x >> i) & 1;
                let bj = (x >> j) & 1;
                if bi != bj {
                    x ^ (1 << i) ^ (1 << j)
                } else {
                    x
                }
            }
            Transform::FlipVar(i) => x ^ (1 << i),
            Transform::LinearCombine(i, j) => {
                if (x >> j) & 1 == 1 {
                    x ^ (1 << i)
                } else {
                    x
                }
            }
            Transform::FlipOutput | Transform::DisjointXor(_) => x,
        }
    }

    /// Applies the transform to a word-backed table.
    pub(crate) fn apply_word(&self, w: u64, num_vars: u8) -> u64 {
        let bits = 1usize << num_vars;
        match *self {
            Transform::FlipOutput => {
                let mask = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
                !w & mask
            }
            Transform::DisjointXor(i) => {
                let mut out = 0u64;
                for x in 0..bits {
                    let b = (w >> x) & 1 == 1;
                    if b ^ ((x >> i) & 1 == 1) {
                        out |= 1u64 << x;
                    }
                }
                out
            }
            _ => {
                let mut out = 0u64;
                for x in 0..bits {
                    if (w >> self.source_index(x)) & 1 == 1 {
                        out |= 1u64 << x;
                    }
                }
                out
            }
        }
    }

    pub fn apply(&self, tt: &TruthTable) -> TruthTable {
        if let Some(w) = tt.as_word() {
            return TruthTable::from_word(tt.num_vars(), self.apply_word(w, tt.num_vars()));
        }
        let mut out = TruthTable::zero(tt.num_vars());
        for x in 0..tt.num_bits() {
            let b = match *self {
                Transform::FlipOutput => !tt.get_bit(x),
                Transform::DisjointXor(i) => tt.get_bit(x) ^ ((x >> i) & 1 == 1),
                _ => tt.get_bit(self.source_index(x)),
            };
            out.set_bit(x, b);
        }
        out
    }
}

pub fn apply_all(tt: &TruthTable, ops: &[Transform]) -> TruthTable {
    ops.iter().fold(tt.clone(), |acc, op| op.apply(&acc))
}

/// Maps per-variable arrival depths into the transformed function's variable
/// slots. Complements are free in an XAG; `LinearCombine` costs one XOR whose
/// arrival is the later of the two operands.
pub fn transform_arrivals(depths: &mut [u32], ops: &[Transform]) {
    for op in ops {
        match *op {
            Transform::SwapVars(i, j) => depths.swap(i as usize, j as usize),
            Transform::LinearCombine(i, j) => {
                depths[i as usize] = depths[i as usize].max(depths[j as usize]);
            }
            Transform::FlipVar(_) | Transform::FlipOutput | Transform::DisjointXor(_) => {}
        }
    }
}
