// SPDX-License-Identifier: Apache-2.0

//! Persistent result cache and blacklist.
//!
//! Solved instances live as cones in a private host XAG whose six inputs
//! stand for canonical variables; the cache maps `(representative,
//! signature)` keys to host signals, the blacklist maps the same keys to the
//! failure evidence. Because the host is hash-consed and append-only,
//! writing it out as a flat edge list and re-reading it reproduces the same
//! arena indices, which keeps the two companion files consistent.
//!
//! On disk: the host file holds one gate per line as two `2*node+complement`
//! integers (an AND when the first encoding is smaller, an XOR written
//! operands-reversed otherwise); the solution and blacklist files group
//! their entries by input count, separated by blank lines, each line being
//! the representative word, the signature bytes, and one final integer (the
//! encoded host signal for solutions; for the blacklist, `0` for a proven
//! UNSAT or the conflict budget that was exhausted).

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::Error;
use crate::xag::{Signal, Xag, XagNode};

/// Canonical variables the host provides; also the largest classifiable
/// input count.
pub const HOST_INPUTS: u8 = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    pub num_vars: u8,
    /// Backing word of the canonical representative.
    pub repr: u64,
    /// Fence-qualified scheduling signature.
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The instance is unsatisfiable; never retry.
    Unsat,
    /// The solver gave up within this conflict budget; retry only with a
    /// larger one.
    BudgetExceeded(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(Signal),
    Blacklisted,
    Miss,
}

#[derive(Debug, Clone)]
pub struct CachePaths {
    pub host: PathBuf,
    pub solutions: PathBuf,
    pub blacklist: PathBuf,
}

impl CachePaths {
    pub fn in_dir(dir: &Path) -> Self {
        CachePaths {
            host: dir.join("resyn_xag_cache"),
            solutions: dir.join("resyn_cache"),
            blacklist: dir.join("resyn_blacklist"),
        }
    }
}

type KeyMap<V> = Vec<HashMap<(u64, Vec<u8>), V>>;

pub struct SynthesisCache {
    host: Xag,
    solutions: KeyMap<Signal>,
    blacklist: KeyMap<FailureKind>,
    paths: Option<CachePaths>,
    loaded_entries: usize,
    dirty: bool,
}

impl SynthesisCache {
    pub fn new() -> Self {
        SynthesisCache {
            host: Xag::new(HOST_INPUTS),
            solutions: vec![HashMap::new(); HOST_INPUTS as usize + 1],
            blacklist: vec![HashMap::new(); HOST_INPUTS as usize + 1],
            paths: None,
            loaded_entries: 0,
            dirty: false,
        }
    }

    /// Loads a cache from `paths`; missing files yield an empty cache. The
    /// same paths are used by [`save`](Self::save) and the drop-time flush.
    pub fn load(paths: CachePaths) -> Result<Self, Error> {
        let mut cache = SynthesisCache::new();
        if paths.host.exists() {
            let text = fs::read_to_string(&paths.host)?;
            cache.parse_host(&text)?;
        }
        if paths.solutions.exists() {
            let text = fs::read_to_string(&paths.solutions)?;
            cache.parse_solutions(&text)?;
        }
        if paths.blacklist.exists() {
            let text = fs::read_to_string(&paths.blacklist)?;
            cache.parse_blacklist(&text)?;
        }
        cache.loaded_entries = cache.entry_count();
        debug!(
            "loaded synthesis cache: {} solutions, {} blacklist entries",
            cache.solutions.iter().map(|m| m.len()).sum::<usize>(),
            cache.blacklist.iter().map(|m| m.len()).sum::<usize>()
        );
        cache.paths = Some(paths);
        Ok(cache)
    }

    pub fn host(&self) -> &Xag {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut Xag {
        self.dirty = true;
        &mut self.host
    }

    pub fn lookup(&self, key: &CacheKey, conflict_budget: u64) -> CacheLookup {
        let group = key.num_vars as usize;
        let map_key = (key.repr, key.signature.clone());
        if let Some(&sig) = self.solutions[group].get(&map_key) {
            return CacheLookup::Hit(sig);
        }
        match self.blacklist[group].get(&map_key) {
            Some(FailureKind::Unsat) => CacheLookup::Blacklisted,
            Some(FailureKind::BudgetExceeded(recorded)) => {
                // A bounded failure only covers budgets no larger than the
                // recorded one; unbounded (zero) always retries.
                if conflict_budget != 0 && conflict_budget <= *recorded {
                    CacheLookup::Blacklisted
                } else {
                    CacheLookup::Miss
                }
            }
            None => CacheLookup::Miss,
        }
    }

    pub fn record_solution(&mut self, key: &CacheKey, signal: Signal) {
        self.solutions[key.num_vars as usize].insert((key.repr, key.signature.clone()), signal);
        self.dirty = true;
    }

    pub fn record_failure(&mut self, key: &CacheKey, kind: FailureKind) {
        // A give-up under an unbounded budget covers every bounded retry,
        // and the on-disk payload 0 is reserved for proven UNSAT.
        let kind = match kind {
            FailureKind::BudgetExceeded(0) => FailureKind::BudgetExceeded(u64::MAX),
            other => other,
        };
        let entry = self.blacklist[key.num_vars as usize]
            .entry((key.repr, key.signature.clone()));
        use std::collections::hash_map::Entry;
        match entry {
            Entry::Vacant(v) => {
                v.insert(kind);
            }
            Entry::Occupied(mut o) => match (*o.get(), kind) {
                // A proven UNSAT supersedes any budget evidence.
                (FailureKind::Unsat, _) => {}
                (_, FailureKind::Unsat) => {
                    o.insert(FailureKind::Unsat);
                }
                (FailureKind::BudgetExceeded(old), FailureKind::BudgetExceeded(new)) => {
                    if new > old {
                        o.insert(FailureKind::BudgetExceeded(new));
                    }
                }
            },
        }
        self.dirty = true;
    }

    fn entry_count(&self) -> usize {
        self.solutions.iter().map(|m| m.len()).sum::<usize>()
            + self.blacklist.iter().map(|m| m.len()).sum::<usize>()
    }

    /// Writes all three files; skipped when nothing changed since load.
    pub fn save(&mut self) -> Result<(), Error> {
        let Some(paths) = self.paths.clone() else {
            return Ok(());
        };
        if !self.dirty && self.entry_count() == self.loaded_entries {
            debug!("cache unchanged, skipping write");
            return Ok(());
        }
        self.write_host(&paths.host)?;
        self.write_solutions(&paths.solutions)?;
        self.write_blacklist(&paths.blacklist)?;
        self.loaded_entries = self.entry_count();
        self.dirty = false;
        Ok(())
    }

    fn parse_host(&mut self, text: &str) -> Result<(), Error> {
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut it = line.split_whitespace();
            let a = parse_u64(it.next(), lineno)?;
            let b = parse_u64(it.next(), lineno)?;
            if it.next().is_some() {
                return Err(Error::CacheFormat {
                    line: lineno + 1,
                    message: "expected exactly two fanin encodings".to_string(),
                });
            }
            let sa = self.decode_checked(a, lineno)?;
            let sb = self.decode_checked(b, lineno)?;
            // Operand order encodes the gate type.
            if a > b {
                self.host.xor(sa, sb);
            } else {
                self.host.and(sa, sb);
            }
        }
        Ok(())
    }

    fn decode_checked(&self, enc: u64, lineno: usize) -> Result<Signal, Error> {
        let s = Signal::decode(enc);
        if (s.index as usize) >= self.host.num_nodes() {
            return Err(Error::CacheFormat {
                line: lineno + 1,
                message: format!("fanin {} references a node not yet defined", enc),
            });
        }
        Ok(s)
    }

    fn parse_groups(
        text: &str,
        mut on_entry: impl FnMut(u8, u64, Vec<u8>, u64, usize) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let mut var_cnt: u8 = 0;
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                var_cnt += 1;
                if var_cnt > HOST_INPUTS {
                    break;
                }
                continue;
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();
            // representative + fence tag (2) + one byte per variable + payload
            let expected = 1 + SIGNATURE_TAG_LEN + var_cnt as usize + 1;
            if tokens.len() != expected {
                return Err(Error::CacheFormat {
                    line: lineno + 1,
                    message: format!(
                        "expected {} tokens in the {}-variable group, found {}",
                        expected,
                        var_cnt,
                        tokens.len()
                    ),
                });
            }
            let repr = parse_u64(Some(tokens[0]), lineno)?;
            let mut signature = Vec::with_capacity(tokens.len() - 2);
            for tok in &tokens[1..tokens.len() - 1] {
                signature.push(parse_u64(Some(tok), lineno)? as u8);
            }
            let payload = parse_u64(Some(tokens[tokens.len() - 1]), lineno)?;
            on_entry(var_cnt, repr, signature, payload, lineno)?;
        }
        Ok(())
    }

    fn parse_solutions(&mut self, text: &str) -> Result<(), Error> {
        let num_nodes = self.host.num_nodes();
        let mut parsed: Vec<(u8, u64, Vec<u8>, Signal)> = Vec::new();
        Self::parse_groups(text, |vars, repr, signature, payload, lineno| {
            let s = Signal::decode(payload);
            if (s.index as usize) >= num_nodes {
                return Err(Error::CacheFormat {
                    line: lineno + 1,
                    message: format!("solution references unknown host node {}", s.index),
                });
            }
            parsed.push((vars, repr, signature, s));
            Ok(())
        })?;
        for (vars, repr, signature, s) in parsed {
            self.solutions[vars as usize].insert((repr, signature), s);
        }
        Ok(())
    }

    fn parse_blacklist(&mut self, text: &str) -> Result<(), Error> {
        let mut parsed: Vec<(u8, u64, Vec<u8>, FailureKind)> = Vec::new();
        Self::parse_groups(text, |vars, repr, signature, payload, _| {
            let kind = if payload == 0 {
                FailureKind::Unsat
            } else {
                FailureKind::BudgetExceeded(payload)
            };
            parsed.push((vars, repr, signature, kind));
            Ok(())
        })?;
        for (vars, repr, signature, kind) in parsed {
            self.blacklist[vars as usize].insert((repr, signature), kind);
        }
        Ok(())
    }

    fn write_host(&self, path: &Path) -> Result<(), Error> {
        let mut out = fs::File::create(path)?;
        for idx in 0..self.host.num_nodes() {
            match self.host.node(idx as u32) {
                XagNode::Const | XagNode::Input(_) => {}
                XagNode::And(a, b) => {
                    // AND operands are stored ascending.
                    writeln!(out, "{} {}", a.encode(), b.encode())?;
                }
                XagNode::Xor(a, b) => {
                    // XOR is written descending so the reader can tell the
                    // gate types apart.
                    writeln!(out, "{} {}", b.encode(), a.encode())?;
                }
            }
        }
        Ok(())
    }

    fn write_solutions(&self, path: &Path) -> Result<(), Error> {
        let mut out = fs::File::create(path)?;
        for group in &self.solutions {
            for ((repr, signature), signal) in group {
                write_entry_line(&mut out, *repr, signature, signal.encode())?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    fn write_blacklist(&self, path: &Path) -> Result<(), Error> {
        let mut out = fs::File::create(path)?;
        for group in &self.blacklist {
            for ((repr, signature), kind) in group {
                let payload = match kind {
                    FailureKind::Unsat => 0,
                    FailureKind::BudgetExceeded(budget) => *budget,
                };
                write_entry_line(&mut out, *repr, signature, payload)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

/// Leading signature bytes that qualify the fence shape (mc, md).
pub const SIGNATURE_TAG_LEN: usize = 2;

fn write_entry_line(
    out: &mut impl Write,
    repr: u64,
    signature: &[u8],
    payload: u64,
) -> Result<(), Error> {
    write!(out, "{}", repr)?;
    for byte in signature {
        write!(out, " {}", byte)?;
    }
    writeln!(out, " {}", payload)?;
    Ok(())
}

fn parse_u64(tok: Option<&str>, lineno: usize) -> Result<u64, Error> {
    let tok = tok.ok_or_else(|| Error::CacheFormat {
        line: lineno + 1,
        message: "missing token".to_string(),
    })?;
    tok.parse::<u64>().map_err(|_| Error::CacheFormat {
        line: lineno + 1,
        message: format!("not an unsigned integer: {:?}", tok),
    })
}

impl Default for SynthesisCache {
    fn default() -> Self {
        SynthesisCache::new()
    }
}

impl Drop for SynthesisCache {
    fn drop(&mut self) {
        if let Err(e) = self.save() {
            warn!("failed to flush synthesis cache: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(num_vars: u8, repr: u64, sig: &[u8]) -> CacheKey {
        CacheKey {
            num_vars,
            repr,
            signature: sig.to_vec(),
        }
    }

    #[test]
    fn record_and_lookup() {
        let mut cache = SynthesisCache::new();
        let host = cache.host_mut();
        let a = host.input(0);
        let b = host.input(1);
        let ab = host.and(a, b);
        let k = key(3, 0xe8, &[1, 1, 0, 0, 0]);
        assert_eq!(cache.lookup(&k, 0), CacheLookup::Miss);
        cache.record_solution(&k, ab);
        assert_eq!(cache.lookup(&k, 0), CacheLookup::Hit(ab));
        // Same repr under a different signature stays a miss.
        let other = key(3, 0xe8, &[1, 1, 0, 0, 1]);
        assert_eq!(cache.lookup(&other, 0), CacheLookup::Miss);
    }

    #[test]
    fn blacklist_budget_rule() {
        let mut cache = SynthesisCache::new();
        let k = key(3, 0x80, &[2, 2, 0, 0, 0]);
        cache.record_failure(&k, FailureKind::BudgetExceeded(100));
        assert_eq!(cache.lookup(&k, 100), CacheLookup::Blacklisted);
        assert_eq!(cache.lookup(&k, 50), CacheLookup::Blacklisted);
        // A larger or unbounded budget warrants a retry.
        assert_eq!(cache.lookup(&k, 200), CacheLookup::Miss);
        assert_eq!(cache.lookup(&k, 0), CacheLookup::Miss);
        // Proven UNSAT supersedes and blocks everything.
        cache.record_failure(&k, FailureKind::Unsat);
        assert_eq!(cache.lookup(&k, 0), CacheLookup::Blacklisted);
        cache.record_failure(&k, FailureKind::BudgetExceeded(999));
        assert_eq!(cache.lookup(&k, 0), CacheLookup::Blacklisted);
    }

    #[test]
    fn budget_failures_keep_the_largest() {
        let mut cache = SynthesisCache::new();
        let k = key(2, 0x8, &[1, 1, 0, 0]);
        cache.record_failure(&k, FailureKind::BudgetExceeded(10));
        cache.record_failure(&k, FailureKind::BudgetExceeded(30));
        cache.record_failure(&k, FailureKind::BudgetExceeded(20));
        assert_eq!(cache.lookup(&k, 30), CacheLookup::Blacklisted);
        assert_eq!(cache.lookup(&k, 31), CacheLookup::Miss);
    }

    #[test]
    fn unbounded_budget_failures_never_become_unsat() {
        let dir = tempfile::tempdir().unwrap();
        let paths = CachePaths::in_dir(dir.path());
        let k = key(3, 0x80, &[2, 2, 0, 0, 0]);
        {
            let mut cache = SynthesisCache::load(paths.clone()).unwrap();
            cache.record_failure(&k, FailureKind::BudgetExceeded(0));
            // Every bounded budget is covered, unbounded still retries.
            assert_eq!(cache.lookup(&k, 5), CacheLookup::Blacklisted);
            assert_eq!(cache.lookup(&k, 0), CacheLookup::Miss);
            cache.save().unwrap();
        }
        let reloaded = SynthesisCache::load(paths).unwrap();
        assert_eq!(reloaded.lookup(&k, 5), CacheLookup::Blacklisted);
        assert_eq!(reloaded.lookup(&k, 0), CacheLookup::Miss);
    }

    #[test]
    fn persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let paths = CachePaths::in_dir(dir.path());

        let sol_key = key(3, 0xe8, &[1, 1, 0, 0, 0]);
        let fail_key = key(3, 0x80, &[1, 1, 0, 0, 0]);
        let budget_key = key(4, 0x1234, &[2, 2, 0, 0, 1, 3]);
        let expected_sig;
        {
            let mut cache = SynthesisCache::load(paths.clone()).unwrap();
            let host = cache.host_mut();
            let a = host.input(0);
            let b = host.input(1);
            let c = host.input(2);
            let ab = host.and(a, b);
            let sig = host.xor(ab, !c);
            expected_sig = sig;
            cache.record_solution(&sol_key, sig);
            cache.record_failure(&fail_key, FailureKind::Unsat);
            cache.record_failure(&budget_key, FailureKind::BudgetExceeded(42));
            cache.save().unwrap();
        }

        let reloaded = SynthesisCache::load(paths).unwrap();
        // Hash-consed reconstruction reproduces the same arena indices.
        assert_eq!(reloaded.lookup(&sol_key, 0), CacheLookup::Hit(expected_sig));
        assert_eq!(reloaded.lookup(&fail_key, 0), CacheLookup::Blacklisted);
        assert_eq!(reloaded.lookup(&budget_key, 42), CacheLookup::Blacklisted);
        assert_eq!(reloaded.lookup(&budget_key, 43), CacheLookup::Miss);
        // The reloaded host implements the same cone.
        let tt = reloaded.host().simulate(expected_sig, 3);
        let mut check = Xag::new(3);
        let a = check.input(0);
        let b = check.input(1);
        let c = check.input(2);
        let ab = check.and(a, b);
        let want = check.xor(ab, !c);
        assert_eq!(tt, check.simulate(want, 3));
    }

    #[test]
    fn missing_files_mean_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SynthesisCache::load(CachePaths::in_dir(dir.path())).unwrap();
        assert_eq!(
            cache.lookup(&key(3, 0xe8, &[1, 1, 0, 0, 0]), 0),
            CacheLookup::Miss
        );
    }

    #[test]
    fn malformed_lines_are_format_errors() {
        let dir = tempfile::tempdir().unwrap();
        let paths = CachePaths::in_dir(dir.path());
        std::fs::write(&paths.host, "4 x\n").unwrap();
        assert!(matches!(
            SynthesisCache::load(paths),
            Err(Error::CacheFormat { .. })
        ));
    }
}
