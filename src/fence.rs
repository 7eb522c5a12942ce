// SPDX-License-Identifier: Apache-2.0

//! The static catalogue of AND fences.
//!
//! A fence fixes how many AND gates sit at each multiplicative level; every
//! synthesized circuit is an instance of exactly one fence. The catalogue
//! covers all fences with up to 15 gates and up to 3 levels, ordered by level
//! count and then gate count, so a linear scan visits cheaper shapes first.
//! Each fence carries its baseline scheduling requirement: how many inputs
//! must already be available at the bottom levels for the shape to be
//! realizable at all.

use once_cell::sync::Lazy;

#[derive(Debug, Clone)]
pub struct AndFence {
    /// AND gates per multiplicative level, bottom first.
    pub levels: &'static [u8],
    /// Minimum number of inputs that must be available at each level.
    pub baseline: &'static [u8],
    /// Total AND gates.
    pub mc: u8,
    /// Multiplicative depth (number of levels).
    pub md: u8,
}

impl AndFence {
    pub fn total_gates(&self) -> usize {
        self.mc as usize
    }

    /// Number of gates strictly below `level`.
    pub fn gates_below(&self, level: u8) -> usize {
        self.levels[..level as usize]
            .iter()
            .map(|&n| n as usize)
            .sum()
    }
}

#[rustfmt::skip]
static FENCE_SHAPES: &[(&[u8], &[u8])] = &[
    (&[1], &[2]),
    (&[2], &[3]),
    (&[3], &[3]),
    (&[4], &[3]),
    (&[5], &[3]),
    (&[6], &[3]),
    (&[7], &[3]),
    (&[8], &[3]),
    (&[9], &[3]),
    (&[10], &[4]),
    (&[11], &[4]),
    (&[12], &[4]),
    (&[13], &[4]),
    (&[14], &[4]),
    (&[15], &[4]),
    (&[1, 1], &[2, 0]),
    (&[1, 2], &[2, 0]),
    (&[2, 1], &[3, 0]),
    (&[1, 3], &[2, 0]),
    (&[2, 2], &[3, 0]),
    (&[3, 1], &[3, 0]),
    (&[1, 4], &[2, 0]),
    (&[2, 3], &[3, 0]),
    (&[3, 2], &[3, 0]),
    (&[4, 1], &[3, 0]),
    (&[1, 5], &[2, 0]),
    (&[2, 4], &[3, 0]),
    (&[3, 3], &[3, 0]),
    (&[4, 2], &[3, 0]),
    (&[5, 1], &[3, 0]),
    (&[1, 6], &[2, 0]),
    (&[2, 5], &[3, 0]),
    (&[3, 4], &[3, 0]),
    (&[4, 3], &[3, 0]),
    (&[5, 2], &[3, 0]),
    (&[6, 1], &[3, 0]),
    (&[1, 7], &[2, 0]),
    (&[2, 6], &[3, 0]),
    (&[3, 5], &[3, 0]),
    (&[4, 4], &[3, 0]),
    (&[5, 3], &[3, 0]),
    (&[6, 2], &[3, 0]),
    (&[7, 1], &[3, 0]),
    (&[1, 1, 1], &[2, 0, 0]),
    (&[1, 1, 2], &[2, 0, 0]),
    (&[1, 2, 1], &[2, 0, 0]),
    (&[2, 1, 1], &[3, 0, 0]),
    (&[1, 1, 3], &[2, 0, 0]),
    (&[1, 2, 2], &[2, 0, 0]),
    (&[1, 3, 1], &[2, 0, 0]),
    (&[2, 1, 2], &[3, 0, 0]),
    (&[2, 2, 1], &[3, 0, 0]),
    (&[3, 1, 1], &[3, 0, 0]),
    (&[1, 1, 4], &[2, 0, 0]),
    (&[1, 2, 3], &[2, 0, 0]),
    (&[1, 3, 2], &[2, 0, 0]),
    (&[1, 4, 1], &[2, 0, 0]),
    (&[2, 1, 3], &[3, 0, 0]),
    (&[2, 2, 2], &[3, 0, 0]),
    (&[2, 3, 1], &[3, 0, 0]),
    (&[3, 1, 2], &[3, 0, 0]),
    (&[3, 2, 1], &[3, 0, 0]),
    (&[4, 1, 1], &[3, 0, 0]),
    (&[1, 1, 5], &[2, 0, 0]),
    (&[1, 2, 4], &[2, 0, 0]),
    (&[1, 3, 3], &[2, 0, 0]),
    (&[1, 4, 2], &[2, 0, 0]),
    (&[1, 5, 1], &[2, 0, 0]),
    (&[2, 1, 4], &[3, 0, 0]),
    (&[2, 2, 3], &[3, 0, 0]),
    (&[2, 3, 2], &[3, 0, 0]),
    (&[2, 4, 1], &[3, 0, 0]),
    (&[3, 1, 3], &[3, 0, 0]),
    (&[3, 2, 2], &[3, 0, 0]),
    (&[3, 3, 1], &[3, 0, 0]),
    (&[4, 1, 2], &[3, 0, 0]),
    (&[4, 2, 1], &[3, 0, 0]),
    (&[5, 1, 1], &[3, 0, 0]),
];

pub static AND_FENCES: Lazy<Vec<AndFence>> = Lazy::new(|| {
    FENCE_SHAPES
        .iter()
        .map(|&(levels, baseline)| AndFence {
            levels,
            baseline,
            mc: levels.iter().sum(),
            md: levels.len() as u8,
        })
        .collect()
});
