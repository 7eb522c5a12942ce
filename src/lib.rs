// SPDX-License-Identifier: Apache-2.0

//! Exact SAT-based local resynthesis of XOR-AND graph cuts, minimizing
//! multiplicative depth under per-input arrival depths.
//!
//! The crate is aimed at cost models where AND gates dominate, as in
//! homomorphic encryption and secure multi-party computation: XOR gates are
//! free, and circuit cost is the depth of the deepest chain of ANDs. Given a
//! cut function and the depths at which its inputs become available, the
//! [`engine::Resynthesizer`] searches for a replacement cone whose overall
//! multiplicative depth beats the current one, and on success emits it
//! through the caller's [`network::NetworkBuilder`].
//!
//! A second objective minimizes the AND-gate count instead
//! ([`engine::Resynthesizer::synthesize_min_gates`]), which tracks T-gate
//! cost in fault-tolerant settings.
//!
//! The search classifies the function into a canonical representative,
//! enumerates AND fence shapes in order of multiplicative depth, schedules
//! input availability onto fence levels, and asks a SAT solver whether the
//! representative fits each shape. Solved and refuted instances are cached
//! on disk, so repeated runs over similar netlists converge to pure lookups.

pub mod cache;
pub mod canon;
pub mod encode;
pub mod engine;
pub mod error;
pub mod fence;
pub mod mc;
pub mod network;
pub mod schedule;
pub mod solver;
pub mod tt;
pub mod xag;

pub use engine::{Outcome, ResynParams, ResynStats, Resynthesizer};
pub use error::Error;
pub use network::NetworkBuilder;
pub use tt::TruthTable;
