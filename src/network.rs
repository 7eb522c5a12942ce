// SPDX-License-Identifier: Apache-2.0

//! The seam between the engine and the caller's circuit representation.
//!
//! The engine never manipulates the caller's network directly; it only emits
//! gates through [`NetworkBuilder`]. [`Xag`] implements the trait so tests
//! and the CLI can act as their own caller; real hosts implement it over
//! whatever node type they use, and their own structural hashing dedups the
//! spliced gates.

use crate::xag::{Signal, Xag, XagNode};

pub trait NetworkBuilder {
    type Signal: Copy + PartialEq + std::fmt::Debug;

    fn constant(&mut self, value: bool) -> Self::Signal;
    fn create_and(&mut self, a: Self::Signal, b: Self::Signal) -> Self::Signal;
    fn create_xor(&mut self, a: Self::Signal, b: Self::Signal) -> Self::Signal;
    fn create_not(&mut self, a: Self::Signal) -> Self::Signal;
}

impl NetworkBuilder for Xag {
    type Signal = Signal;

    fn constant(&mut self, value: bool) -> Signal {
        self.get_constant(value)
    }

    fn create_and(&mut self, a: Signal, b: Signal) -> Signal {
        self.and(a, b)
    }

    fn create_xor(&mut self, a: Signal, b: Signal) -> Signal {
        self.xor(a, b)
    }

    fn create_not(&mut self, a: Signal) -> Signal {
        !a
    }
}

/// Copies `root`'s cone out of `host` into `dst`, substituting `leaves` for
/// the host inputs. Complemented edges become `create_not` calls; the
/// builder decides whether those are free.
pub fn splice_cone<N: NetworkBuilder>(
    host: &Xag,
    root: Signal,
    leaves: &[N::Signal],
    dst: &mut N,
) -> N::Signal {
    let gates = host.cone_gates(root);
    let mut mapped: std::collections::HashMap<u32, N::Signal> =
        std::collections::HashMap::with_capacity(gates.len());

    let resolve = |mapped: &std::collections::HashMap<u32, N::Signal>,
                   dst: &mut N,
                   s: Signal|
     -> N::Signal {
        let base = match host.node(s.index) {
            XagNode::Const => dst.constant(false),
            XagNode::Input(i) => leaves[i as usize],
            XagNode::And(..) | XagNode::Xor(..) => mapped[&s.index],
        };
        if s.complement {
            dst.create_not(base)
        } else {
            base
        }
    };

    for idx in gates {
        let out = match host.node(idx) {
            XagNode::And(a, b) => {
                let fa = resolve(&mapped, dst, a);
                let fb = resolve(&mapped, dst, b);
                dst.create_and(fa, fb)
            }
            XagNode::Xor(a, b) => {
                let fa = resolve(&mapped, dst, a);
                let fb = resolve(&mapped, dst, b);
                dst.create_xor(fa, fb)
            }
            XagNode::Const | XagNode::Input(_) => continue,
        };
        mapped.insert(idx, out);
    }

    resolve(&mapped, dst, root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tt::TruthTable;
    use pretty_assertions::assert_eq;

    #[test]
    fn splice_preserves_function_under_leaf_permutation() {
        let mut host = Xag::new(3);
        let a = host.input(0);
        let b = host.input(1);
        let c = host.input(2);
        let ab = host.and(a, b);
        let f = host.xor(ab, !c);

        let mut dst = Xag::new(3);
        // Swap the first two leaves on the way in.
        let leaves = [dst.input(1), dst.input(0), dst.input(2)];
        let out = splice_cone(&host, f, &leaves, &mut dst);

        let want = host.simulate(f, 3); // symmetric in a/b
        assert_eq!(dst.simulate(out, 3), want);
    }

    #[test]
    fn splice_constant_root() {
        let host = Xag::new(2);
        let mut dst = Xag::new(2);
        let leaves = [dst.input(0), dst.input(1)];
        let t = splice_cone(&host, host.get_constant(true), &leaves, &mut dst);
        assert_eq!(t, dst.get_constant(true));
    }
}
