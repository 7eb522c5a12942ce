// SPDX-License-Identifier: Apache-2.0

//! Truth tables over up to 16 variables.
//!
//! Tables with at most [`MAX_WORD_VARS`] variables are backed by a single
//! `u64`; wider tables fall back to a word vector behind the same API. All
//! synthesis machinery operates on the word-backed form; the wide form exists
//! so callers can hand in large cut functions and get a clean
//! "unclassifiable" answer instead of a panic.

use std::fmt;

/// Largest variable count representable in a single backing word.
pub const MAX_WORD_VARS: u8 = 6;

/// Bit pattern of the i-th projection within a 64-bit word.
const VAR_PATTERN: [u64; 6] = [
    0xAAAA_AAAA_AAAA_AAAA,
    0xCCCC_CCCC_CCCC_CCCC,
    0xF0F0_F0F0_F0F0_F0F0,
    0xFF00_FF00_FF00_FF00,
    0xFFFF_0000_FFFF_0000,
    0xFFFF_FFFF_0000_0000,
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Words {
    Word(u64),
    Wide(Vec<u64>),
}

/// An immutable-sized truth table; bit `x` holds `f(x)` where assignment `x`
/// has variable `i` in bit position `i`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TruthTable {
    num_vars: u8,
    words: Words,
}

fn word_mask(num_vars: u8) -> u64 {
    if num_vars >= MAX_WORD_VARS {
        u64::MAX
    } else {
        (1u64 << (1usize << num_vars)) - 1
    }
}

impl TruthTable {
    /// An all-zero table over `num_vars` variables.
    pub fn zero(num_vars: u8) -> Self {
        assert!(num_vars <= 16);
        if num_vars <= MAX_WORD_VARS {
            TruthTable {
                num_vars,
                words: Words::Word(0),
            }
        } else {
            TruthTable {
                num_vars,
                words: Words::Wide(vec![0; 1usize << (num_vars - MAX_WORD_VARS)]),
            }
        }
    }

    /// Builds a word-backed table; bits beyond `2^num_vars` are masked off.
    pub fn from_word(num_vars: u8, bits: u64) -> Self {
        assert!(num_vars <= MAX_WORD_VARS);
        TruthTable {
            num_vars,
            words: Words::Word(bits & word_mask(num_vars)),
        }
    }

    /// Parses a hex string (most significant digit first) into a table.
    pub fn from_hex(num_vars: u8, s: &str) -> Option<Self> {
        let mut tt = TruthTable::zero(num_vars);
        let digits: Vec<u8> = s
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<Vec<u8>>>()?;
        if digits.len() > (tt.num_bits() + 3) / 4 {
            return None;
        }
        for (pos, d) in digits.iter().rev().enumerate() {
            for b in 0..4 {
                let idx = pos * 4 + b;
                if idx < tt.num_bits() && (d >> b) & 1 == 1 {
                    tt.set_bit(idx, true);
                }
            }
        }
        Some(tt)
    }

    /// The i-th projection function over `num_vars` variables.
    pub fn var(num_vars: u8, i: u8) -> Self {
        assert!(i < num_vars);
        if num_vars <= MAX_WORD_VARS {
            TruthTable::from_word(num_vars, VAR_PATTERN[i as usize])
        } else {
            let mut tt = TruthTable::zero(num_vars);
            for x in 0..tt.num_bits() {
                if (x >> i) & 1 == 1 {
                    tt.set_bit(x, true);
                }
            }
            tt
        }
    }

    pub fn num_vars(&self) -> u8 {
        self.num_vars
    }

    pub fn num_bits(&self) -> usize {
        1usize << self.num_vars
    }

    /// The backing word for tables of at most [`MAX_WORD_VARS`] variables.
    pub fn as_word(&self) -> Option<u64> {
        match self.words {
            Words::Word(w) => Some(w),
            Words::Wide(_) => None,
        }
    }

    pub fn get_bit(&self, idx: usize) -> bool {
        debug_assert!(idx < self.num_bits());
        match &self.words {
            Words::Word(w) => (w >> idx) & 1 == 1,
            Words::Wide(ws) => (ws[idx / 64] >> (idx % 64)) & 1 == 1,
        }
    }

    pub fn set_bit(&mut self, idx: usize, value: bool) {
        debug_assert!(idx < self.num_bits());
        match &mut self.words {
            Words::Word(w) => {
                if value {
                    *w |= 1u64 << idx;
                } else {
                    *w &= !(1u64 << idx);
                }
            }
            Words::Wide(ws) => {
                if value {
                    ws[idx / 64] |= 1u64 << (idx % 64);
                } else {
                    ws[idx / 64] &= !(1u64 << (idx % 64));
                }
            }
        }
    }

    pub fn invert(&self) -> Self {
        let mut out = self.clone();
        match &mut out.words {
            Words::Word(w) => *w = !*w & word_mask(self.num_vars),
            Words::Wide(ws) => {
                for w in ws.iter_mut() {
                    *w = !*w;
                }
            }
        }
        out
    }

    pub fn count_ones(&self) -> u32 {
        match &self.words {
            Words::Word(w) => w.count_ones(),
            Words::Wide(ws) => ws.iter().map(|w| w.count_ones()).sum(),
        }
    }

    /// Whether the function depends on variable `i`.
    pub fn depends_on(&self, i: u8) -> bool {
        debug_assert!(i < self.num_vars);
        let step = 1usize << i;
        (0..self.num_bits())
            .step_by(step * 2)
            .flat_map(|base| base..base + step)
            .any(|x| self.get_bit(x) != self.get_bit(x + step))
    }

    /// Degree of the algebraic normal form; `None` for wide tables.
    pub fn algebraic_degree(&self) -> Option<u32> {
        let w = self.as_word()?;
        // In-place Moebius transform.
        let mut anf = w;
        for i in 0..self.num_vars {
            let shift = 1usize << i;
            anf ^= (anf & !VAR_PATTERN[i as usize]) << shift;
        }
        anf &= word_mask(self.num_vars);
        let mut deg = 0u32;
        let mut rest = anf;
        while rest != 0 {
            let idx = 63 - rest.leading_zeros();
            deg = deg.max(idx.count_ones());
            rest &= !(1u64 << idx);
        }
        if anf == 0 { Some(0) } else { Some(deg) }
    }
}

impl fmt::Display for TruthTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = (self.num_bits() + 3) / 4;
        for pos in (0..digits).rev() {
            let mut d = 0u32;
            for b in 0..4 {
                let idx = pos * 4 + b;
                if idx < self.num_bits() && self.get_bit(idx) {
                    d |= 1 << b;
                }
            }
            write!(f, "{:x}", d)?;
        }
        Ok(())
    }
}
