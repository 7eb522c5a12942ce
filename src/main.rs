// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, ValueEnum};

use xag_resyn::cache::CachePaths;
use xag_resyn::engine::{Outcome, ResynParams, Resynthesizer};
use xag_resyn::tt::TruthTable;
use xag_resyn::xag::Xag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Objective {
    /// Minimize multiplicative depth under the input arrival depths.
    Depth,
    /// Minimize the AND-gate count; XORs are free, depth plays no role.
    Gates,
}

/// Re-synthesizes a single cut function to a lower multiplicative depth or
/// a minimal AND-gate count.
#[derive(Parser, Debug)]
struct Args {
    /// Truth table of the cut function, as a hex string (e.g. "e8").
    tt: String,

    /// Number of input variables (1 to 6).
    #[arg(long)]
    num_vars: u8,

    /// Comma-separated arrival depth per input, e.g. "0,0,2". Defaults to
    /// all zeros.
    #[arg(long)]
    arrivals: Option<String>,

    /// Current multiplicative depth to beat. Defaults to a trivial upper
    /// bound derived from the arrivals.
    #[arg(long)]
    depth: Option<u32>,

    /// Target metric to optimize.
    #[arg(long, value_enum, default_value = "depth")]
    objective: Objective,

    /// Largest AND count to try under the gate objective.
    #[arg(long, default_value_t = 8)]
    max_gates: u8,

    /// Directory holding the persistent solution cache and blacklist.
    #[arg(long)]
    cache_dir: Option<std::path::PathBuf>,

    /// Conflict budget per SAT instance (0 = unbounded).
    #[arg(long, default_value_t = 0)]
    conflict_limit: u64,

    /// Whether to add the solver-guiding pruning constraints.
    #[arg(long, default_value_t = false)]
    #[arg(action = clap::ArgAction::Set)]
    advanced_constraints: bool,

    /// Whether to re-simulate solutions against the target function.
    #[arg(long, default_value_t = true)]
    #[arg(action = clap::ArgAction::Set)]
    verify: bool,
}

fn parse_arrivals(args: &Args) -> Result<Vec<u32>> {
    let Some(ref s) = args.arrivals else {
        return Ok(vec![0; args.num_vars as usize]);
    };
    let arrivals: Vec<u32> = s
        .split(',')
        .map(|tok| tok.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .with_context(|| format!("invalid arrival list: {}", s))?;
    if arrivals.len() != args.num_vars as usize {
        bail!(
            "expected {} arrival depths, got {}",
            args.num_vars,
            arrivals.len()
        );
    }
    Ok(arrivals)
}

fn main() -> Result<()> {
    let _ = env_logger::builder().try_init();
    let args = Args::parse();

    if args.num_vars == 0 || args.num_vars > 6 {
        bail!("--num-vars must be between 1 and 6");
    }
    let func = TruthTable::from_hex(args.num_vars, &args.tt)
        .ok_or_else(|| anyhow!("invalid truth table {:?} for {} vars", args.tt, args.num_vars))?;
    let arrivals = parse_arrivals(&args)?;

    // Any function fits in an AND ladder over the arrived inputs.
    let max_arrival = arrivals.iter().copied().max().unwrap_or(0);
    let depth = args
        .depth
        .unwrap_or(max_arrival + args.num_vars as u32 + 1);

    let params = ResynParams {
        conflict_limit: args.conflict_limit,
        advanced_constraints: args.advanced_constraints,
        verify_solutions: args.verify,
        ..ResynParams::default()
    };
    let mut engine = match args.cache_dir {
        Some(ref dir) => Resynthesizer::with_cache_paths(params, CachePaths::in_dir(dir))?,
        None => Resynthesizer::new(params),
    };

    let mut net = Xag::new(args.num_vars);
    let inputs: Vec<_> = (0..args.num_vars)
        .map(|i| (net.input(i), arrivals[i as usize]))
        .collect();

    match args.objective {
        Objective::Depth => match engine.resynthesize(&mut net, &func, &inputs, depth)? {
            Outcome::Improved { signal, depth: new_depth } => {
                println!("[i] improved: depth {} (bound was {})", new_depth, depth);
                println!("[i] function   = {}", net.simulate(signal, args.num_vars));
                println!("[i] mult depth = {}", net.mult_depth(signal));
            }
            Outcome::NoChange => {
                println!("[i] no implementation below depth {} found", depth);
            }
        },
        Objective::Gates => {
            let sigs: Vec<_> = inputs.iter().map(|(s, _)| *s).collect();
            match engine.synthesize_min_gates(&mut net, &func, &sigs, args.max_gates)? {
                Some((signal, count)) => {
                    println!("[i] realized with {} AND gates", count);
                    println!("[i] function   = {}", net.simulate(signal, args.num_vars));
                    println!("[i] mult depth = {}", net.mult_depth(signal));
                }
                None => {
                    println!("[i] no implementation within {} AND gates found", args.max_gates);
                }
            }
        }
    }
    println!("{}", engine.stats());
    engine.flush_cache()?;
    Ok(())
}
