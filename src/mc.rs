// SPDX-License-Identifier: Apache-2.0

//! Lower bounds on multiplicative complexity.
//!
//! The search only needs a lower bound to discard fences that are too small;
//! an underestimate costs solver time, never correctness. The default oracle
//! uses the algebraic degree (any function of degree d needs at least d - 1
//! AND gates), which is invariant under the classifier's transform group.
//! Callers holding exact per-class tables can supply them via [`McTable`].

use std::collections::HashMap;

use crate::tt::TruthTable;

pub trait McOracle {
    /// A lower bound on the number of AND gates needed to realize `tt`;
    /// `None` when no bound can be produced for this table.
    fn mc_lower_bound(&self, tt: &TruthTable) -> Option<u8>;
}

/// `MC(f) >= deg(f) - 1`, with affine functions at zero.
#[derive(Debug, Default)]
pub struct DegreeBound;

impl McOracle for DegreeBound {
    fn mc_lower_bound(&self, tt: &TruthTable) -> Option<u8> {
        let deg = tt.algebraic_degree()?;
        Some(deg.saturating_sub(1) as u8)
    }
}

/// Exact multiplicative complexities keyed by canonical representative, with
/// the degree bound as a fallback for missing entries.
#[derive(Debug, Default)]
pub struct McTable {
    by_repr: HashMap<(u8, u64), u8>,
}

impl McTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, repr: &TruthTable, mc: u8) {
        if let Some(w) = repr.as_word() {
            self.by_repr.insert((repr.num_vars(), w), mc);
        }
    }
}

impl McOracle for McTable {
    fn mc_lower_bound(&self, tt: &TruthTable) -> Option<u8> {
        let w = tt.as_word()?;
        match self.by_repr.get(&(tt.num_vars(), w)) {
            Some(&mc) => Some(mc),
            None => DegreeBound.mc_lower_bound(tt),
        }
    }
}
