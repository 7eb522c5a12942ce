// SPDX-License-Identifier: Apache-2.0

//! A hash-consed XOR-AND graph arena.
//!
//! Nodes live in an append-only vector with node 0 as the constant false and
//! the inputs right after it; edges carry a complement bit so inverters are
//! free. Structural hashing plus constant/trivial folding keep the arena
//! canonical: rebuilding the same circuit yields the same node indices,
//! which is what makes the persisted cache format stable across runs.

use std::collections::HashMap;

use crate::tt::TruthTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signal {
    pub index: u32,
    pub complement: bool,
}

impl Signal {
    pub fn new(index: u32, complement: bool) -> Self {
        Signal { index, complement }
    }

    /// `(index << 1) | complement`, the persisted edge encoding.
    pub fn encode(self) -> u64 {
        ((self.index as u64) << 1) | (self.complement as u64)
    }

    pub fn decode(enc: u64) -> Self {
        Signal {
            index: (enc >> 1) as u32,
            complement: enc & 1 == 1,
        }
    }
}

impl std::ops::Not for Signal {
    type Output = Signal;

    fn not(self) -> Signal {
        Signal {
            index: self.index,
            complement: !self.complement,
        }
    }
}

impl std::ops::BitXor<bool> for Signal {
    type Output = Signal;

    fn bitxor(self, rhs: bool) -> Signal {
        Signal {
            index: self.index,
            complement: self.complement ^ rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XagNode {
    Const,
    Input(u8),
    And(Signal, Signal),
    Xor(Signal, Signal),
}

#[derive(Debug, Clone)]
pub struct Xag {
    nodes: Vec<XagNode>,
    interned: HashMap<XagNode, u32>,
    num_inputs: u8,
}

impl Xag {
    pub fn new(num_inputs: u8) -> Self {
        let mut nodes = vec![XagNode::Const];
        for i in 0..num_inputs {
            nodes.push(XagNode::Input(i));
        }
        Xag {
            nodes,
            interned: HashMap::new(),
            num_inputs,
        }
    }

    pub fn num_inputs(&self) -> u8 {
        self.num_inputs
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, index: u32) -> XagNode {
        self.nodes[index as usize]
    }

    pub fn get_constant(&self, value: bool) -> Signal {
        Signal::new(0, value)
    }

    pub fn input(&self, i: u8) -> Signal {
        debug_assert!(i < self.num_inputs);
        Signal::new(1 + i as u32, false)
    }

    fn intern(&mut self, node: XagNode) -> u32 {
        if let Some(&idx) = self.interned.get(&node) {
            return idx;
        }
        let idx = self.nodes.len() as u32;
        self.nodes.push(node);
        self.interned.insert(node, idx);
        idx
    }

    pub fn and(&mut self, a: Signal, b: Signal) -> Signal {
        if a.index == b.index {
            return if a.complement == b.complement {
                a
            } else {
                self.get_constant(false)
            };
        }
        if a.index == 0 {
            return if a.complement { b } else { a };
        }
        if b.index == 0 {
            return if b.complement { a } else { b };
        }
        let (x, y) = if (a.index, a.complement) <= (b.index, b.complement) {
            (a, b)
        } else {
            (b, a)
        };
        Signal::new(self.intern(XagNode::And(x, y)), false)
    }

    pub fn xor(&mut self, a: Signal, b: Signal) -> Signal {
        if a.index == b.index {
            return self.get_constant(a.complement != b.complement);
        }
        if a.index == 0 {
            return b ^ a.complement;
        }
        if b.index == 0 {
            return a ^ b.complement;
        }
        // Complements are pushed to the output edge.
        let out_c = a.complement ^ b.complement;
        let (x, y) = if a.index <= b.index { (a, b) } else { (b, a) };
        let node = XagNode::Xor(x ^ x.complement, y ^ y.complement);
        Signal::new(self.intern(node), out_c)
    }

    pub fn nary_xor(&mut self, sigs: &[Signal]) -> Signal {
        let mut acc = self.get_constant(false);
        for &s in sigs {
            acc = self.xor(acc, s);
        }
        acc
    }

    /// Gate node indices in `root`'s cone, ascending (arena order is
    /// topological).
    pub fn cone_gates(&self, root: Signal) -> Vec<u32> {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![root.index];
        let mut gates = Vec::new();
        while let Some(idx) = stack.pop() {
            if seen[idx as usize] {
                continue;
            }
            seen[idx as usize] = true;
            match self.nodes[idx as usize] {
                XagNode::And(a, b) | XagNode::Xor(a, b) => {
                    gates.push(idx);
                    stack.push(a.index);
                    stack.push(b.index);
                }
                XagNode::Const | XagNode::Input(_) => {}
            }
        }
        gates.sort_unstable();
        gates
    }

    /// Evaluates `root`'s cone as a truth table over `num_vars` inputs.
    pub fn simulate(&self, root: Signal, num_vars: u8) -> TruthTable {
        debug_assert!(num_vars <= self.num_inputs);
        let mut values: Vec<TruthTable> = Vec::with_capacity(root.index as usize + 1);
        for idx in 0..=root.index {
            let tt = match self.nodes[idx as usize] {
                XagNode::Const => TruthTable::zero(num_vars),
                XagNode::Input(i) => {
                    if i < num_vars {
                        TruthTable::var(num_vars, i)
                    } else {
                        TruthTable::zero(num_vars)
                    }
                }
                XagNode::And(a, b) => {
                    let ta = resolve_tt(&values, a);
                    let tb = resolve_tt(&values, b);
                    and_tt(&ta, &tb)
                }
                XagNode::Xor(a, b) => {
                    let ta = resolve_tt(&values, a);
                    let tb = resolve_tt(&values, b);
                    xor_tt(&ta, &tb)
                }
            };
            values.push(tt);
        }
        let out = values[root.index as usize].clone();
        if root.complement { out.invert() } else { out }
    }

    /// Multiplicative depth of `root`'s cone, with inputs at depth zero.
    pub fn mult_depth(&self, root: Signal) -> u32 {
        let mut depth = vec![0u32; root.index as usize + 1];
        for idx in 0..=root.index as usize {
            depth[idx] = match self.nodes[idx] {
                XagNode::Const | XagNode::Input(_) => 0,
                XagNode::And(a, b) => {
                    depth[a.index as usize].max(depth[b.index as usize]) + 1
                }
                XagNode::Xor(a, b) => depth[a.index as usize].max(depth[b.index as usize]),
            };
        }
        depth[root.index as usize]
    }
}

fn resolve_tt(values: &[TruthTable], s: Signal) -> TruthTable {
    let tt = values[s.index as usize].clone();
    if s.complement { tt.invert() } else { tt }
}

fn and_tt(a: &TruthTable, b: &TruthTable) -> TruthTable {
    let mut out = TruthTable::zero(a.num_vars());
    for x in 0..out.num_bits() {
        out.set_bit(x, a.get_bit(x) && b.get_bit(x));
    }
    out
}

fn xor_tt(a: &TruthTable, b: &TruthTable) -> TruthTable {
    let mut out = TruthTable::zero(a.num_vars());
    for x in 0..out.num_bits() {
        out.set_bit(x, a.get_bit(x) != b.get_bit(x));
    }
    out
}
